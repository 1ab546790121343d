use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;

use common::Tick;

const CHANNEL_CAPACITY: usize = 1024;

/// Per-symbol tick fan-out hub.
///
/// Collaborators publish pre-normalized ticks; aggregator tasks subscribe
/// per symbol. Slow subscribers lag and drop rather than backpressure the
/// publisher.
#[derive(Clone, Default)]
pub struct TickFeed {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Tick>>>>,
}

impl TickFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to ticks for `symbol`, creating its channel on first use.
    pub fn subscribe(&self, symbol: &str) -> broadcast::Receiver<Tick> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(symbol.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish a tick to its symbol's subscribers. Ticks for symbols with no
    /// channel yet are dropped.
    pub fn publish(&self, tick: Tick) {
        let sender = {
            let channels = self.channels.lock().unwrap();
            channels.get(&tick.symbol).cloned()
        };
        match sender {
            // Ignore send errors (no active receivers).
            Some(sender) => {
                let _ = sender.send(tick);
            }
            None => debug!(symbol = %tick.symbol, "Dropping tick for unsubscribed symbol"),
        }
    }
}
