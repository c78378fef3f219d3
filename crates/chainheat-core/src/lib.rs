//! # Chainheat Core
//!
//! Domain models, data acquisition, and liquidity aggregation for the
//! chainheat options-chain visualizer.
//!
//! ## Overview
//!
//! - **Canonical domain models** for option contracts and chain snapshots
//! - **Fetcher** against the Alpaca REST API with write-through caching
//! - **Filesystem snapshot cache** keyed by ticker and capture time
//! - **Liquidity grid** pivoting a chain into a dense (Y, DTE) matrix
//! - **Summary statistics** for whole-chain reporting
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Filesystem snapshot cache |
//! | [`domain`] | Domain models (Symbol, OptionContract, ChainSnapshot) |
//! | [`error`] | Validation error type |
//! | [`fetch`] | Alpaca chain fetcher |
//! | [`grid`] | Liquidity grid construction |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`summary`] | Chain summary statistics |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chainheat_core::{
//!     AlpacaCredentials, ChainFetcher, FetchParams, GridConfig, LiquidityGrid,
//!     ReqwestHttpClient, Symbol,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = ChainFetcher::new(
//!         Arc::new(ReqwestHttpClient::new()),
//!         AlpacaCredentials::from_env()?,
//!     );
//!     let chain = fetcher
//!         .fetch(&Symbol::parse("AAPL")?, &FetchParams::default())
//!         .await?;
//!
//!     let today = time::OffsetDateTime::now_utc().date();
//!     if let Some(grid) = LiquidityGrid::build(&chain, &GridConfig::default(), today)? {
//!         println!("total open interest on grid: {}", grid.total());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod grid;
pub mod http_client;
pub mod summary;

pub use cache::{CacheError, CacheSize, SnapshotCache, SnapshotMetadata};
pub use domain::{
    CaptureTime, ChainSnapshot, ExpiryDate, OccSymbol, OptionContract, OptionType,
    OptionTypeFilter, Symbol,
};
pub use error::ValidationError;
pub use fetch::{AlpacaCredentials, ChainFetcher, FetchError, FetchParams};
pub use grid::{GridConfig, GridError, LiquidityGrid, ValueMode, YAxis};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use summary::{LiquiditySummary, TypeBreakdown};
