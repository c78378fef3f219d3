//! Liquidity aggregation: pivot a flat chain into a dense (Y, DTE) grid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use time::Date;

use crate::domain::{ChainSnapshot, OptionContract, OptionTypeFilter};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("value mode '{mode}' is declared but not implemented by the grid builder")]
    UnsupportedValueMode { mode: &'static str },
}

/// Quantity plotted on the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YAxis {
    Strike,
    Moneyness,
    Delta,
}

impl YAxis {
    pub const fn axis_label(self) -> &'static str {
        match self {
            Self::Strike => "Strike price ($)",
            Self::Moneyness => "Moneyness (strike/spot)",
            Self::Delta => "Delta",
        }
    }
}

/// Metric aggregated into each grid cell.
///
/// The spread modes are part of the declared surface but the builder rejects
/// them with [`GridError::UnsupportedValueMode`] instead of mis-rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueMode {
    OiAbsolute,
    OiPercent,
    VolumeAbsolute,
    VolumePercent,
    SpreadAbsolute,
    SpreadPercent,
    SpreadPerDelta,
}

impl ValueMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OiAbsolute => "oi_absolute",
            Self::OiPercent => "oi_percent",
            Self::VolumeAbsolute => "volume_absolute",
            Self::VolumePercent => "volume_percent",
            Self::SpreadAbsolute => "spread_absolute",
            Self::SpreadPercent => "spread_percent",
            Self::SpreadPerDelta => "spread_per_delta",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::OiAbsolute => "Open interest",
            Self::OiPercent => "Open interest (% of DTE)",
            Self::VolumeAbsolute => "Volume",
            Self::VolumePercent => "Volume (% of DTE)",
            Self::SpreadAbsolute => "Bid-ask spread ($)",
            Self::SpreadPercent => "Bid-ask spread (% of mid)",
            Self::SpreadPerDelta => "Bid-ask spread per delta",
        }
    }

    pub const fn is_percent(self) -> bool {
        matches!(self, Self::OiPercent | Self::VolumePercent)
    }

    const fn is_spread(self) -> bool {
        matches!(
            self,
            Self::SpreadAbsolute | Self::SpreadPercent | Self::SpreadPerDelta
        )
    }

    /// Integer metric backing the implemented modes.
    const fn metric(self, contract: &OptionContract) -> u64 {
        match self {
            Self::OiAbsolute | Self::OiPercent => contract.open_interest,
            Self::VolumeAbsolute | Self::VolumePercent => contract.volume,
            // rejected before projection
            Self::SpreadAbsolute | Self::SpreadPercent | Self::SpreadPerDelta => 0,
        }
    }
}

/// Parameters governing aggregation plus cosmetic passthrough for the
/// renderer. A plain configuration value, never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub y_axis: YAxis,
    pub value_mode: ValueMode,
    pub option_type: OptionTypeFilter,
    pub min_dte: i64,
    pub max_dte: i64,
    pub min_moneyness: f64,
    pub max_moneyness: f64,
    pub colorscale: String,
    pub title: Option<String>,
    pub show_annotations: bool,
    pub width: usize,
    pub height: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            y_axis: YAxis::Strike,
            value_mode: ValueMode::OiAbsolute,
            option_type: OptionTypeFilter::Both,
            min_dte: 0,
            max_dte: 90,
            min_moneyness: 0.8,
            max_moneyness: 1.2,
            colorscale: String::from("Viridis"),
            title: None,
            show_annotations: false,
            width: 1200,
            height: 800,
        }
    }
}

/// Dense 2D grid of aggregated liquidity: rows are the chosen Y quantity,
/// columns are DTE, both sorted ascending over the observed distinct values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityGrid {
    y_values: Vec<f64>,
    dte_values: Vec<i64>,
    cells: Vec<Vec<f64>>,
    y_axis: YAxis,
    value_mode: ValueMode,
}

impl LiquidityGrid {
    /// Build the grid for one snapshot.
    ///
    /// Returns `Ok(None)` when no contract survives filtering, which callers
    /// must distinguish from a populated all-zero grid. DTE is recomputed
    /// against `today` at build time; the result is invariant to the input
    /// contract ordering.
    pub fn build(
        chain: &ChainSnapshot,
        config: &GridConfig,
        today: Date,
    ) -> Result<Option<Self>, GridError> {
        if config.value_mode.is_spread() {
            return Err(GridError::UnsupportedValueMode {
                mode: config.value_mode.as_str(),
            });
        }

        // Derive DTE and moneyness, then filter. The filters commute but both
        // derived columns must exist before filtering.
        let mut selected: Vec<(&OptionContract, i64, f64)> = Vec::new();
        for contract in &chain.contracts {
            if !config.option_type.matches(contract.option_type) {
                continue;
            }
            let dte = contract.dte(today);
            if dte < config.min_dte || dte > config.max_dte {
                continue;
            }
            let moneyness = contract.moneyness(chain.underlying_price);
            if matches!(config.y_axis, YAxis::Moneyness)
                && !(config.min_moneyness..=config.max_moneyness).contains(&moneyness)
            {
                continue;
            }
            selected.push((contract, dte, moneyness));
        }

        if selected.is_empty() {
            return Ok(None);
        }

        // Per-DTE metric totals over the filtered set, for the percent modes.
        let mut dte_totals: BTreeMap<i64, u64> = BTreeMap::new();
        if config.value_mode.is_percent() {
            for (contract, dte, _) in &selected {
                *dte_totals.entry(*dte).or_insert(0) += config.value_mode.metric(contract);
            }
        }

        let points: Vec<(f64, i64, f64)> = selected
            .iter()
            .map(|(contract, dte, moneyness)| {
                let y = match config.y_axis {
                    YAxis::Strike => contract.strike,
                    YAxis::Moneyness => *moneyness,
                    // Missing delta is treated as exactly zero, which keeps
                    // the contract on the grid but conflates "no greek data"
                    // with a genuinely zero delta.
                    YAxis::Delta => contract.delta.unwrap_or(0.0),
                };
                let metric = config.value_mode.metric(contract);
                let value = if config.value_mode.is_percent() {
                    let total = dte_totals.get(dte).copied().unwrap_or(0);
                    let divisor = if total == 0 { 1 } else { total };
                    metric as f64 / divisor as f64 * 100.0
                } else {
                    metric as f64
                };
                (y, *dte, value)
            })
            .collect();

        let mut y_values: Vec<f64> = points.iter().map(|(y, _, _)| *y).collect();
        y_values.sort_unstable_by(f64::total_cmp);
        y_values.dedup();

        let mut dte_values: Vec<i64> = points.iter().map(|(_, dte, _)| *dte).collect();
        dte_values.sort_unstable();
        dte_values.dedup();

        let mut cells = vec![vec![0.0_f64; dte_values.len()]; y_values.len()];
        for (y, dte, value) in points {
            let row = y_values
                .binary_search_by(|probe| probe.total_cmp(&y))
                .expect("row keys cover every projected point");
            let col = dte_values
                .binary_search(&dte)
                .expect("column keys cover every projected point");
            cells[row][col] += value;
        }

        Ok(Some(Self {
            y_values,
            dte_values,
            cells,
            y_axis: config.y_axis,
            value_mode: config.value_mode,
        }))
    }

    pub fn y_values(&self) -> &[f64] {
        &self.y_values
    }

    pub fn dte_values(&self) -> &[i64] {
        &self.dte_values
    }

    /// Row-major cell matrix: `cells()[row][col]` is the aggregated value for
    /// `(y_values()[row], dte_values()[col])`.
    pub fn cells(&self) -> &[Vec<f64>] {
        &self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> f64 {
        self.cells[row][col]
    }

    pub const fn y_axis(&self) -> YAxis {
        self.y_axis
    }

    pub const fn value_mode(&self) -> ValueMode {
        self.value_mode
    }

    /// Sum of every cell.
    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }
}
