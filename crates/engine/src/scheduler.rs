use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use common::Candle;

/// Debounced live-candle publication for one (symbol, period) key.
///
/// Rapid successive ticks coalesce into a single emission: every call to
/// `schedule` cancels any not-yet-fired pending task and schedules a new
/// one, so there is at most one pending emission per key and subscribers
/// observe at most one update per debounce window. The fired task reads the
/// latest candle at fire time, never a stale snapshot captured at schedule
/// time.
pub struct RedrawScheduler {
    delay: Duration,
    tx: broadcast::Sender<Candle>,
    latest: Arc<Mutex<Option<Candle>>>,
    pending: Option<JoinHandle<()>>,
}

impl RedrawScheduler {
    pub fn new(delay: Duration) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            delay,
            tx,
            latest: Arc::new(Mutex::new(None)),
            pending: None,
        }
    }

    /// Subscribe to debounced candle emissions.
    pub fn subscribe(&self) -> broadcast::Receiver<Candle> {
        self.tx.subscribe()
    }

    /// Record `candle` as the latest state and (re)schedule an emission
    /// after the debounce delay, cancelling any pending one.
    pub fn schedule(&mut self, candle: Candle) {
        *self.latest.lock().unwrap() = Some(candle);

        if let Some(pending) = self.pending.take() {
            pending.abort();
        }

        let delay = self.delay;
        let tx = self.tx.clone();
        let latest = Arc::clone(&self.latest);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let snapshot = latest.lock().unwrap().clone();
            if let Some(candle) = snapshot {
                // Ignore send errors (no active receivers).
                let _ = tx.send(candle);
            }
        }));
    }
}

impl Drop for RedrawScheduler {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
