//! CLI argument definitions for chainheat.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `heatmap` | Fetch a chain and render a liquidity heatmap |
//! | `cache list` | List cached chain snapshots |
//! | `cache size` | Report cache entry count and bytes |
//! | `cache clear` | Remove cached snapshots |
//!
//! # Examples
//!
//! ```bash
//! # Default open-interest heatmap for AAPL
//! chainheat heatmap AAPL
//!
//! # Moneyness axis, per-DTE percentages
//! chainheat heatmap SPY --y-axis moneyness --value oi_percent
//!
//! # 3D surface over a tighter expiry window
//! chainheat heatmap QQQ --dte-min 7 --dte-max 45 --plot-type 3d
//!
//! # Reuse a recent snapshot instead of hitting the API
//! chainheat heatmap TSLA --use-cached --summary
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};

use chainheat_core::{OptionTypeFilter, ValueMode, YAxis};

/// Options-chain liquidity heatmaps from Alpaca market data.
///
/// Fetches the full options chain for a ticker, caches the snapshot on disk,
/// and renders an interactive heatmap of open interest, volume, or bid-ask
/// spread across strike and expiry.
#[derive(Debug, Parser)]
#[command(
    name = "chainheat",
    author,
    version,
    about = "Options-chain liquidity heatmaps from Alpaca market data",
    long_about = "chainheat fetches an options chain from Alpaca, caches the snapshot on disk, \
and renders where liquidity concentrates across strike and expiry.\n\
\n\
Credentials come from the environment:\n\
  ALPACA_API_KEY      Alpaca API key (required)\n\
  ALPACA_SECRET_KEY   Alpaca secret key (required)\n\
  ALPACA_PAPER        Set to 'false' for the live trading host (default: true)\n\
\n\
Use 'chainheat <command> --help' for command-specific help."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch an options chain and render a liquidity heatmap.
    ///
    /// # Examples
    ///
    ///   chainheat heatmap AAPL
    ///   chainheat heatmap SPY --y-axis moneyness --value oi_percent
    ///   chainheat heatmap NVDA --plot-type split --output nvda_sides
    Heatmap(HeatmapArgs),

    /// Manage the local snapshot cache.
    Cache(CacheArgs),
}

/// Arguments for the `heatmap` command.
#[derive(Debug, Args)]
pub struct HeatmapArgs {
    /// Stock ticker symbol (e.g., AAPL, SPY, QQQ).
    pub ticker: String,

    /// Quantity plotted on the vertical axis.
    #[arg(long, value_enum, default_value_t = YAxisArg::Strike)]
    pub y_axis: YAxisArg,

    /// Metric aggregated into each cell.
    ///
    /// Liquidity: oi_*, volume_*. Spread: spread_absolute ($),
    /// spread_percent (% of mid), spread_per_delta.
    #[arg(long, value_enum, default_value_t = ValueArg::OiAbsolute)]
    pub value: ValueArg,

    /// Contract side filter.
    #[arg(long, value_enum, default_value_t = OptionTypeArg::Both)]
    pub option_type: OptionTypeArg,

    /// Minimum days to expiration (inclusive).
    #[arg(long, default_value_t = 0)]
    pub dte_min: i64,

    /// Maximum days to expiration (inclusive).
    #[arg(long, default_value_t = 90)]
    pub dte_max: i64,

    /// Minimum moneyness (strike/spot) filter.
    #[arg(long, default_value_t = 0.8)]
    pub moneyness_min: f64,

    /// Maximum moneyness (strike/spot) filter.
    #[arg(long, default_value_t = 1.2)]
    pub moneyness_max: f64,

    /// Plot style: flat heatmap, 3D surface, or side-by-side calls/puts.
    #[arg(long, value_enum, default_value_t = PlotType::Heatmap)]
    pub plot_type: PlotType,

    /// Plotly colorscale name (Viridis, Plasma, Cividis, ...).
    #[arg(long, default_value = "Viridis")]
    pub colorscale: String,

    /// Output filename without extension. Defaults to
    /// {ticker}_liquidity_{timestamp}.
    #[arg(long)]
    pub output: Option<String>,

    /// Output format. Static formats require a build with the
    /// 'static-export' feature.
    #[arg(long, value_enum, default_value_t = ExportFormat::Html)]
    pub format: ExportFormat,

    /// Directory for cached snapshots.
    #[arg(long, default_value = "data")]
    pub cache_dir: String,

    /// Disable snapshot caching for this run.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Reuse a cached snapshot when a recent enough one exists.
    #[arg(long, default_value_t = false)]
    pub use_cached: bool,

    /// Freshness window for --use-cached, in minutes.
    #[arg(long, default_value_t = 15)]
    pub max_age_minutes: i64,

    /// Open the rendered HTML in the default browser.
    #[arg(long, default_value_t = false)]
    pub show: bool,

    /// Print chain summary statistics before rendering.
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    /// Overlay cell values on the heatmap.
    #[arg(long, default_value_t = false)]
    pub annotations: bool,

    /// Figure width in pixels.
    #[arg(long, default_value_t = 1200)]
    pub width: usize,

    /// Figure height in pixels.
    #[arg(long, default_value_t = 800)]
    pub height: usize,
}

/// Arguments for the `cache` command group.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Directory for cached snapshots.
    #[arg(long, global = true, default_value = "data")]
    pub cache_dir: String,

    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache management subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List cached snapshots, newest first.
    List {
        /// Restrict the listing to one ticker.
        ticker: Option<String>,
    },

    /// Report entry count and total bytes on disk.
    Size {
        /// Restrict the report to one ticker.
        ticker: Option<String>,
    },

    /// Remove cached snapshots.
    Clear(CacheClearArgs),
}

/// Arguments for `cache clear`.
#[derive(Debug, Args)]
pub struct CacheClearArgs {
    /// Restrict removal to one ticker.
    pub ticker: Option<String>,

    /// Only remove snapshots older than this many days.
    #[arg(long)]
    pub older_than_days: Option<i64>,

    /// Skip the confirmation prompt.
    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum YAxisArg {
    /// Strike price in dollars.
    Strike,
    /// Strike over spot; 1.0 is at-the-money.
    Moneyness,
    /// Contract delta (contracts without greeks land on zero).
    Delta,
}

impl From<YAxisArg> for YAxis {
    fn from(value: YAxisArg) -> Self {
        match value {
            YAxisArg::Strike => Self::Strike,
            YAxisArg::Moneyness => Self::Moneyness,
            YAxisArg::Delta => Self::Delta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ValueArg {
    /// Raw open interest.
    OiAbsolute,
    /// Open interest as a percentage of its DTE column.
    OiPercent,
    /// Raw daily volume.
    VolumeAbsolute,
    /// Volume as a percentage of its DTE column.
    VolumePercent,
    /// Bid-ask spread in dollars.
    SpreadAbsolute,
    /// Bid-ask spread as a percentage of the mid price.
    SpreadPercent,
    /// Bid-ask spread divided by delta.
    SpreadPerDelta,
}

impl From<ValueArg> for ValueMode {
    fn from(value: ValueArg) -> Self {
        match value {
            ValueArg::OiAbsolute => Self::OiAbsolute,
            ValueArg::OiPercent => Self::OiPercent,
            ValueArg::VolumeAbsolute => Self::VolumeAbsolute,
            ValueArg::VolumePercent => Self::VolumePercent,
            ValueArg::SpreadAbsolute => Self::SpreadAbsolute,
            ValueArg::SpreadPercent => Self::SpreadPercent,
            ValueArg::SpreadPerDelta => Self::SpreadPerDelta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum OptionTypeArg {
    Call,
    Put,
    Both,
}

impl From<OptionTypeArg> for OptionTypeFilter {
    fn from(value: OptionTypeArg) -> Self {
        match value {
            OptionTypeArg::Call => Self::Call,
            OptionTypeArg::Put => Self::Put,
            OptionTypeArg::Both => Self::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlotType {
    /// Flat 2D heatmap.
    #[value(name = "heatmap")]
    Heatmap,
    /// 3D surface with liquidity on the z axis.
    #[value(name = "3d")]
    Surface,
    /// Side-by-side calls and puts heatmaps.
    #[value(name = "split")]
    Split,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum ExportFormat {
    Html,
    Png,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}
