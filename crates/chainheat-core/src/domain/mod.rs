//! Canonical domain models for options chains.

mod chain;
mod contract;
mod symbol;
mod timestamp;

pub use chain::ChainSnapshot;
pub use contract::{OptionContract, OptionType, OptionTypeFilter};
pub use symbol::{OccSymbol, Symbol};
pub use timestamp::{CaptureTime, ExpiryDate};
