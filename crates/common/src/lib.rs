pub mod config;
pub mod error;
pub mod source;
pub mod store;
pub mod types;

pub use config::{Config, UniverseConfig};
pub use error::{Error, Result};
pub use source::HistoricalSource;
pub use store::CandleStore;
pub use types::*;
