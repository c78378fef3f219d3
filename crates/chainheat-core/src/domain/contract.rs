use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::{ExpiryDate, Symbol};
use crate::ValidationError;

/// Call/put side of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl Display for OptionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract-side filter used by fetching and grid building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionTypeFilter {
    Call,
    Put,
    Both,
}

impl OptionTypeFilter {
    pub const fn matches(self, option_type: OptionType) -> bool {
        match self {
            Self::Call => matches!(option_type, OptionType::Call),
            Self::Put => matches!(option_type, OptionType::Put),
            Self::Both => true,
        }
    }

    /// Upstream query parameter value, `None` for `Both`.
    pub const fn as_query_param(self) -> Option<&'static str> {
        match self {
            Self::Call => Some("call"),
            Self::Put => Some("put"),
            Self::Both => None,
        }
    }
}

/// One tradable option instance as observed at fetch time.
///
/// Constructed once per fetch and never mutated; downstream consumers only
/// filter and derive views. Greeks and implied volatility are absent when the
/// venue did not supply them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub symbol: String,
    pub underlying: Symbol,
    pub expiration: ExpiryDate,
    pub strike: f64,
    pub option_type: OptionType,
    pub open_interest: u64,
    pub volume: u64,
    pub bid: f64,
    pub ask: f64,
    pub last_price: f64,
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
    pub implied_volatility: Option<f64>,
}

impl OptionContract {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        underlying: Symbol,
        expiration: ExpiryDate,
        strike: f64,
        option_type: OptionType,
        open_interest: u64,
        volume: u64,
        bid: f64,
        ask: f64,
        last_price: f64,
        delta: Option<f64>,
        gamma: Option<f64>,
        theta: Option<f64>,
        vega: Option<f64>,
        implied_volatility: Option<f64>,
    ) -> Result<Self, ValidationError> {
        if !strike.is_finite() || strike <= 0.0 {
            return Err(ValidationError::NonPositiveStrike);
        }
        validate_non_negative("bid", bid)?;
        validate_non_negative("ask", ask)?;
        validate_non_negative("last_price", last_price)?;
        if let Some(value) = delta {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { field: "delta" });
            }
            if !(-1.0..=1.0).contains(&value) {
                return Err(ValidationError::DeltaOutOfRange { value });
            }
        }
        if let Some(value) = implied_volatility {
            validate_non_negative("implied_volatility", value)?;
        }

        Ok(Self {
            symbol: symbol.into(),
            underlying,
            expiration,
            strike,
            option_type,
            open_interest,
            volume,
            bid,
            ask,
            last_price,
            delta,
            gamma,
            theta,
            vega,
            implied_volatility,
        })
    }

    /// Strike over spot. 1.0 means at-the-money.
    pub fn moneyness(&self, underlying_price: f64) -> f64 {
        self.strike / underlying_price
    }

    /// Calendar days to expiration relative to `today`.
    pub fn dte(&self, today: Date) -> i64 {
        self.expiration.dte(today)
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn contract(delta: Option<f64>) -> Result<OptionContract, ValidationError> {
        OptionContract::new(
            "AAPL240621C00190000",
            Symbol::parse("AAPL").expect("valid"),
            ExpiryDate::new(date!(2024 - 06 - 21)),
            190.0,
            OptionType::Call,
            1_200,
            340,
            4.95,
            5.05,
            5.0,
            delta,
            None,
            None,
            None,
            Some(0.28),
        )
    }

    #[test]
    fn builds_contract_with_partial_greeks() {
        let built = contract(Some(0.55)).expect("must build");
        assert_eq!(built.option_type, OptionType::Call);
        assert!(built.gamma.is_none());
    }

    #[test]
    fn rejects_out_of_range_delta() {
        let err = contract(Some(1.5)).expect_err("must fail");
        assert!(matches!(err, ValidationError::DeltaOutOfRange { .. }));
    }

    #[test]
    fn rejects_non_positive_strike() {
        let err = OptionContract::new(
            "AAPL240621C00000000",
            Symbol::parse("AAPL").expect("valid"),
            ExpiryDate::new(date!(2024 - 06 - 21)),
            0.0,
            OptionType::Call,
            0,
            0,
            0.0,
            0.0,
            0.0,
            None,
            None,
            None,
            None,
            None,
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NonPositiveStrike));
    }

    #[test]
    fn moneyness_and_dte_are_derived_not_stored() {
        let built = contract(None).expect("must build");
        assert!((built.moneyness(200.0) - 0.95).abs() < 1e-12);
        assert_eq!(built.dte(date!(2024 - 06 - 11)), 10);
    }

    #[test]
    fn filter_matches_sides() {
        assert!(OptionTypeFilter::Both.matches(OptionType::Put));
        assert!(OptionTypeFilter::Call.matches(OptionType::Call));
        assert!(!OptionTypeFilter::Put.matches(OptionType::Call));
        assert_eq!(OptionTypeFilter::Put.as_query_param(), Some("put"));
        assert_eq!(OptionTypeFilter::Both.as_query_param(), None);
    }
}
