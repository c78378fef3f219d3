//! Serde views of the Alpaca REST payloads the fetcher consumes.
//!
//! Only the fields chainheat reads are modeled; unknown fields are ignored so
//! upstream additions do not break deserialization.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::{OccSymbol, OptionContract, Symbol};
use crate::ValidationError;

/// `GET /v2/stocks/{symbol}/quotes/latest` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct LatestQuoteEnvelope {
    pub quote: Option<StockQuote>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StockQuote {
    #[serde(rename = "bp")]
    pub bid_price: f64,
    #[serde(rename = "ap")]
    pub ask_price: f64,
}

impl StockQuote {
    pub fn midpoint(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }
}

/// One page of `GET /v2/options/contracts`.
#[derive(Debug, Deserialize)]
pub(crate) struct ContractListingPage {
    #[serde(default)]
    pub option_contracts: Vec<ListedContract>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListedContract {
    pub symbol: String,
}

/// `GET /v1beta1/options/snapshots` envelope. The map is keyed by OCC symbol;
/// BTreeMap keeps iteration order deterministic across runs.
#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotBatch {
    #[serde(default)]
    pub snapshots: BTreeMap<String, OptionSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OptionSnapshot {
    pub latest_quote: Option<OptionQuote>,
    pub latest_trade: Option<OptionTrade>,
    pub daily_bar: Option<DailyBar>,
    pub greeks: Option<GreeksPayload>,
    pub implied_volatility: Option<f64>,
    pub open_interest: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionQuote {
    #[serde(rename = "bp")]
    pub bid_price: f64,
    #[serde(rename = "ap")]
    pub ask_price: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionTrade {
    #[serde(rename = "p")]
    pub price: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DailyBar {
    #[serde(rename = "v")]
    pub volume: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GreeksPayload {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

impl OptionSnapshot {
    /// Normalize one snapshot into the domain contract model. Expiration,
    /// side, and strike come from the OCC symbol; missing prices default to
    /// zero the way the venue reports untraded contracts.
    pub fn to_contract(
        &self,
        occ_symbol: &str,
        underlying: &Symbol,
    ) -> Result<OptionContract, ValidationError> {
        let occ = OccSymbol::parse(occ_symbol)?;

        let (bid, ask) = self
            .latest_quote
            .as_ref()
            .map_or((0.0, 0.0), |q| (q.bid_price, q.ask_price));
        let last_price = self.latest_trade.as_ref().map_or(0.0, |t| t.price);
        let volume = self.daily_bar.as_ref().map_or(0, |b| b.volume);

        let (delta, gamma, theta, vega) = self
            .greeks
            .as_ref()
            .map_or((None, None, None, None), |g| {
                (g.delta, g.gamma, g.theta, g.vega)
            });

        OptionContract::new(
            occ_symbol,
            underlying.clone(),
            occ.expiration,
            occ.strike,
            occ.option_type,
            self.open_interest.unwrap_or(0),
            volume,
            bid,
            ask,
            last_price,
            delta,
            gamma,
            theta,
            vega,
            self.implied_volatility,
        )
    }
}
