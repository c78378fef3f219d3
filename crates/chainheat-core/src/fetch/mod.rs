//! Chain acquisition against the Alpaca REST API.
//!
//! One fetch is three upstream calls: the underlying's latest stock quote,
//! the paginated contract listing from the trading API, and option snapshots
//! in batches from the market-data API. Snapshot batches fail soft: a bad
//! batch is logged and skipped so a partial chain still renders.

mod alpaca;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::cache::{CacheError, SnapshotCache};
use crate::domain::{CaptureTime, ChainSnapshot, ExpiryDate, OptionTypeFilter, Symbol};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::ValidationError;

use alpaca::{ContractListingPage, LatestQuoteEnvelope, SnapshotBatch};

/// Snapshot endpoint cap on symbols per request.
const SNAPSHOT_BATCH_SIZE: usize = 100;
/// Page size for the contract listing endpoint.
const CONTRACT_PAGE_LIMIT: usize = 500;

const DATA_HOST: &str = "https://data.alpaca.markets";
const PAPER_TRADING_HOST: &str = "https://paper-api.alpaca.markets";
const LIVE_TRADING_HOST: &str = "https://api.alpaca.markets";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(
        "Alpaca credentials required; set ALPACA_API_KEY and ALPACA_SECRET_KEY \
         or pass them explicitly"
    )]
    MissingCredentials,
    #[error("no usable quote for {symbol}")]
    QuoteUnavailable { symbol: Symbol },
    #[error("transport failure: {0}")]
    Transport(#[from] HttpError),
    #[error("upstream returned status {status} for {url}")]
    UpstreamStatus { status: u16, url: String },
    #[error("malformed {context} payload: {source}")]
    Malformed {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// API key pair plus the paper/live toggle that selects the trading host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlpacaCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub paper: bool,
}

impl AlpacaCredentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>, paper: bool) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            paper,
        }
    }

    /// Read `ALPACA_API_KEY`, `ALPACA_SECRET_KEY`, and `ALPACA_PAPER` from the
    /// environment. Paper trading is the default; only an explicit
    /// `false`/`0`/`no` selects the live host.
    pub fn from_env() -> Result<Self, FetchError> {
        Self::from_values(
            std::env::var("ALPACA_API_KEY").ok(),
            std::env::var("ALPACA_SECRET_KEY").ok(),
            std::env::var("ALPACA_PAPER").ok(),
        )
    }

    /// Resolve credentials from raw, possibly absent values. Empty keys count
    /// as absent.
    fn from_values(
        api_key: Option<String>,
        secret_key: Option<String>,
        paper_flag: Option<String>,
    ) -> Result<Self, FetchError> {
        let api_key = api_key.filter(|value| !value.is_empty());
        let secret_key = secret_key.filter(|value| !value.is_empty());
        let (Some(api_key), Some(secret_key)) = (api_key, secret_key) else {
            return Err(FetchError::MissingCredentials);
        };

        let paper = !matches!(
            paper_flag.unwrap_or_default().to_ascii_lowercase().as_str(),
            "false" | "0" | "no"
        );

        Ok(Self {
            api_key,
            secret_key,
            paper,
        })
    }

    pub const fn trading_host(&self) -> &'static str {
        if self.paper {
            PAPER_TRADING_HOST
        } else {
            LIVE_TRADING_HOST
        }
    }
}

/// Server-side filters applied to the contract listing request.
///
/// Moneyness bounds win over explicit strike bounds because they need the
/// just-fetched underlying price to resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchParams {
    pub min_dte: i64,
    pub max_dte: i64,
    pub option_type: OptionTypeFilter,
    pub strike_bounds: Option<(f64, f64)>,
    pub moneyness_bounds: Option<(f64, f64)>,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            min_dte: 0,
            max_dte: 90,
            option_type: OptionTypeFilter::Both,
            strike_bounds: None,
            moneyness_bounds: None,
        }
    }
}

/// Fetches full chains and optionally persists them to a snapshot cache.
pub struct ChainFetcher {
    http: Arc<dyn HttpClient>,
    credentials: AlpacaCredentials,
    cache: Option<SnapshotCache>,
}

impl ChainFetcher {
    pub fn new(http: Arc<dyn HttpClient>, credentials: AlpacaCredentials) -> Self {
        Self {
            http,
            credentials,
            cache: None,
        }
    }

    /// Enable write-through caching of every fetched chain.
    pub fn with_cache(mut self, cache: SnapshotCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&SnapshotCache> {
        self.cache.as_ref()
    }

    /// Fetch a full chain snapshot live from the venue.
    pub async fn fetch(
        &self,
        symbol: &Symbol,
        params: &FetchParams,
    ) -> Result<ChainSnapshot, FetchError> {
        let captured_at = CaptureTime::now();
        let underlying_price = self.underlying_price(symbol).await?;
        debug!(%symbol, underlying_price, "resolved underlying quote");

        let occ_symbols = self
            .list_contract_symbols(symbol, params, underlying_price)
            .await?;
        info!(%symbol, contracts = occ_symbols.len(), "listed option contracts");

        let mut contracts = Vec::with_capacity(occ_symbols.len());
        for (index, batch) in occ_symbols.chunks(SNAPSHOT_BATCH_SIZE).enumerate() {
            let joined = batch.join(",");
            let url = format!(
                "{DATA_HOST}/v1beta1/options/snapshots?symbols={}",
                urlencoding::encode(&joined)
            );
            let page: SnapshotBatch = match self.get_json(&url, "option snapshot").await {
                Ok(page) => page,
                Err(error) => {
                    warn!(batch = index + 1, %error, "skipping failed snapshot batch");
                    continue;
                }
            };

            for (occ_symbol, snapshot) in &page.snapshots {
                match snapshot.to_contract(occ_symbol, symbol) {
                    Ok(contract) => contracts.push(contract),
                    Err(error) => {
                        warn!(occ_symbol, %error, "skipping unparseable contract");
                    }
                }
            }
        }

        let chain = ChainSnapshot::new(symbol.clone(), underlying_price, captured_at, contracts)?;
        if let Some(cache) = &self.cache {
            let entry = cache.save(&chain)?;
            debug!(path = %entry.display(), "cached chain snapshot");
        }
        Ok(chain)
    }

    /// Serve from the cache when a recent-enough capture exists, otherwise
    /// fetch live.
    pub async fn fetch_cached_or_live(
        &self,
        symbol: &Symbol,
        max_age_minutes: i64,
        params: &FetchParams,
    ) -> Result<ChainSnapshot, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(chain) = cache.load_latest(symbol)? {
                let age = chain.captured_at.elapsed_since(CaptureTime::now());
                if age < Duration::minutes(max_age_minutes) {
                    info!(%symbol, age_seconds = age.whole_seconds(), "serving chain from cache");
                    return Ok(chain);
                }
                debug!(%symbol, age_seconds = age.whole_seconds(), "cached chain too old");
            }
        }
        self.fetch(symbol, params).await
    }

    async fn underlying_price(&self, symbol: &Symbol) -> Result<f64, FetchError> {
        let url = format!("{DATA_HOST}/v2/stocks/{symbol}/quotes/latest");
        let envelope: LatestQuoteEnvelope = self.get_json(&url, "stock quote").await?;
        let midpoint = envelope
            .quote
            .map(|quote| quote.midpoint())
            .unwrap_or(0.0);
        if !midpoint.is_finite() || midpoint <= 0.0 {
            return Err(FetchError::QuoteUnavailable {
                symbol: symbol.clone(),
            });
        }
        Ok(midpoint)
    }

    /// Walk the paginated contract listing and collect OCC symbols.
    async fn list_contract_symbols(
        &self,
        symbol: &Symbol,
        params: &FetchParams,
        underlying_price: f64,
    ) -> Result<Vec<String>, FetchError> {
        let today = OffsetDateTime::now_utc().date();
        let min_expiration = ExpiryDate::new(today + Duration::days(params.min_dte));
        let max_expiration = ExpiryDate::new(today + Duration::days(params.max_dte));

        let mut base = format!(
            "{}/v2/options/contracts?underlying_symbols={}&expiration_date_gte={}&expiration_date_lte={}&limit={}",
            self.credentials.trading_host(),
            symbol,
            min_expiration,
            max_expiration,
            CONTRACT_PAGE_LIMIT,
        );
        if let Some(side) = params.option_type.as_query_param() {
            base.push_str(&format!("&type={side}"));
        }
        if let Some((min_strike, max_strike)) = resolve_strike_bounds(params, underlying_price) {
            base.push_str(&format!(
                "&strike_price_gte={min_strike}&strike_price_lte={max_strike}"
            ));
        }

        let mut occ_symbols = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let url = match &page_token {
                Some(token) => format!("{base}&page_token={}", urlencoding::encode(token)),
                None => base.clone(),
            };
            let page: ContractListingPage = self.get_json(&url, "contract listing").await?;
            occ_symbols.extend(page.option_contracts.into_iter().map(|c| c.symbol));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(occ_symbols)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        context: &'static str,
    ) -> Result<T, FetchError> {
        let request = HttpRequest::get(url)
            .with_header("APCA-API-KEY-ID", &self.credentials.api_key)
            .with_header("APCA-API-SECRET-KEY", &self.credentials.secret_key);

        let response = self.http.execute(request).await?;
        if !response.is_success() {
            return Err(FetchError::UpstreamStatus {
                status: response.status,
                url: url.to_owned(),
            });
        }
        serde_json::from_str(&response.body).map_err(|source| FetchError::Malformed {
            context,
            source,
        })
    }
}

/// Moneyness bounds scale off the spot price and take precedence over
/// explicit strike bounds.
fn resolve_strike_bounds(params: &FetchParams, underlying_price: f64) -> Option<(f64, f64)> {
    if let Some((min_m, max_m)) = params.moneyness_bounds {
        return Some((underlying_price * min_m, underlying_price * max_m));
    }
    params.strike_bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paper_flag_selects_trading_host() {
        let paper = AlpacaCredentials::new("key", "secret", true);
        let live = AlpacaCredentials::new("key", "secret", false);
        assert_eq!(paper.trading_host(), "https://paper-api.alpaca.markets");
        assert_eq!(live.trading_host(), "https://api.alpaca.markets");
    }

    #[test]
    fn missing_or_empty_keys_are_rejected() {
        let missing = AlpacaCredentials::from_values(None, Some("secret".into()), None)
            .expect_err("must fail");
        assert!(matches!(missing, FetchError::MissingCredentials));

        let empty =
            AlpacaCredentials::from_values(Some(String::new()), Some("secret".into()), None)
                .expect_err("must fail");
        assert!(matches!(empty, FetchError::MissingCredentials));
    }

    #[test]
    fn paper_flag_defaults_on_and_only_explicit_opt_out_goes_live() {
        let creds = |flag: Option<&str>| {
            AlpacaCredentials::from_values(
                Some("key".into()),
                Some("secret".into()),
                flag.map(String::from),
            )
            .expect("credentials resolve")
        };

        assert!(creds(None).paper);
        assert!(creds(Some("true")).paper);
        assert!(creds(Some("anything")).paper);
        assert!(!creds(Some("false")).paper);
        assert!(!creds(Some("FALSE")).paper);
        assert!(!creds(Some("0")).paper);
        assert!(!creds(Some("no")).paper);
    }

    #[test]
    fn moneyness_bounds_override_strike_bounds() {
        let params = FetchParams {
            strike_bounds: Some((50.0, 60.0)),
            moneyness_bounds: Some((0.8, 1.2)),
            ..FetchParams::default()
        };
        let (lo, hi) = resolve_strike_bounds(&params, 100.0).expect("bounds resolved");
        assert!((lo - 80.0).abs() < 1e-9);
        assert!((hi - 120.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_strike_bounds_pass_through() {
        let params = FetchParams {
            strike_bounds: Some((50.0, 60.0)),
            ..FetchParams::default()
        };
        assert_eq!(
            resolve_strike_bounds(&params, 100.0),
            Some((50.0, 60.0))
        );
        assert_eq!(resolve_strike_bounds(&FetchParams::default(), 100.0), None);
    }

    #[test]
    fn default_params_cover_ninety_days_both_sides() {
        let params = FetchParams::default();
        assert_eq!(params.min_dte, 0);
        assert_eq!(params.max_dte, 90);
        assert_eq!(params.option_type, OptionTypeFilter::Both);
    }
}
