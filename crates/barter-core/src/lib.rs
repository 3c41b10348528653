pub mod constants;
pub mod error;
pub mod rates;
pub mod trade;
pub mod types;

pub use constants::*;
pub use error::BarterError;
pub use rates::OracleSnapshot;
pub use trade::{CombinedState, L2State, TradeRecord};
pub use types::*;
