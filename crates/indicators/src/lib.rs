pub mod ema;
pub mod macd;
pub mod stc;

pub use ema::{ema, sma};
pub use macd::{Macd, MacdPoint};
pub use stc::{KWindow, Stc};
