use serde::{Deserialize, Serialize};

use crate::domain::{CaptureTime, ExpiryDate, OptionContract, OptionType, Symbol};
use crate::ValidationError;

/// Full options chain for one underlying at one capture instant.
///
/// Persisted verbatim to the snapshot cache; derived views (expirations,
/// strikes, per-side subsets) are computed on demand, not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub underlying: Symbol,
    pub underlying_price: f64,
    pub captured_at: CaptureTime,
    pub contracts: Vec<OptionContract>,
}

impl ChainSnapshot {
    pub fn new(
        underlying: Symbol,
        underlying_price: f64,
        captured_at: CaptureTime,
        contracts: Vec<OptionContract>,
    ) -> Result<Self, ValidationError> {
        if !underlying_price.is_finite() || underlying_price <= 0.0 {
            return Err(ValidationError::NonPositiveUnderlying);
        }
        for contract in &contracts {
            if contract.underlying != underlying {
                return Err(ValidationError::UnderlyingMismatch {
                    occ: contract.symbol.clone(),
                    expected: underlying.as_str().to_owned(),
                });
            }
        }

        Ok(Self {
            underlying,
            underlying_price,
            captured_at,
            contracts,
        })
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Unique expiration dates, sorted ascending.
    pub fn expirations(&self) -> Vec<ExpiryDate> {
        let mut dates: Vec<ExpiryDate> = self.contracts.iter().map(|c| c.expiration).collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    /// Unique strike prices, sorted ascending.
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.contracts.iter().map(|c| c.strike).collect();
        strikes.sort_unstable_by(f64::total_cmp);
        strikes.dedup();
        strikes
    }

    pub fn calls(&self) -> Vec<&OptionContract> {
        self.side(OptionType::Call)
    }

    pub fn puts(&self) -> Vec<&OptionContract> {
        self.side(OptionType::Put)
    }

    fn side(&self, option_type: OptionType) -> Vec<&OptionContract> {
        self.contracts
            .iter()
            .filter(|c| c.option_type == option_type)
            .collect()
    }
}
