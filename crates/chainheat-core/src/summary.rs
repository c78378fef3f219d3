//! Aggregate chain statistics printed alongside the heatmap.

use serde::Serialize;
use time::Date;

use crate::domain::{ChainSnapshot, OptionType};

/// Totals for one contract side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeBreakdown {
    pub contracts: usize,
    pub open_interest: u64,
    pub volume: u64,
}

/// Whole-chain statistics computed in one pass over the snapshot.
///
/// Integer totals are exact u64 sums; the ranges are `None` when the chain is
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquiditySummary {
    pub total_contracts: usize,
    pub total_open_interest: u64,
    pub total_volume: u64,
    pub calls: TypeBreakdown,
    pub puts: TypeBreakdown,
    pub expirations: usize,
    pub strikes: usize,
    pub dte_range: Option<(i64, i64)>,
    pub moneyness_range: Option<(f64, f64)>,
}

impl LiquiditySummary {
    pub fn compute(chain: &ChainSnapshot, today: Date) -> Self {
        let mut calls = TypeBreakdown::default();
        let mut puts = TypeBreakdown::default();
        let mut dte_range: Option<(i64, i64)> = None;
        let mut moneyness_range: Option<(f64, f64)> = None;

        for contract in &chain.contracts {
            let side = match contract.option_type {
                OptionType::Call => &mut calls,
                OptionType::Put => &mut puts,
            };
            side.contracts += 1;
            side.open_interest += contract.open_interest;
            side.volume += contract.volume;

            let dte = contract.dte(today);
            dte_range = Some(match dte_range {
                Some((lo, hi)) => (lo.min(dte), hi.max(dte)),
                None => (dte, dte),
            });

            let moneyness = contract.moneyness(chain.underlying_price);
            moneyness_range = Some(match moneyness_range {
                Some((lo, hi)) => (lo.min(moneyness), hi.max(moneyness)),
                None => (moneyness, moneyness),
            });
        }

        Self {
            total_contracts: chain.len(),
            total_open_interest: calls.open_interest + puts.open_interest,
            total_volume: calls.volume + puts.volume,
            calls,
            puts,
            expirations: chain.expirations().len(),
            strikes: chain.strikes().len(),
            dte_range,
            moneyness_range,
        }
    }
}
