//! The `heatmap` command: fetch, summarize, render, save.

use std::sync::Arc;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::warn;

use chainheat_core::{
    AlpacaCredentials, ChainFetcher, FetchParams, GridConfig, LiquiditySummary,
    ReqwestHttpClient, SnapshotCache, Symbol,
};

use crate::cli::{ExportFormat, HeatmapArgs, PlotType};
use crate::error::CliError;
use crate::render;

pub async fn run(args: HeatmapArgs) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.ticker)?;
    let credentials = AlpacaCredentials::from_env()?;

    let mut fetcher = ChainFetcher::new(Arc::new(ReqwestHttpClient::new()), credentials);
    if !args.no_cache {
        fetcher = fetcher.with_cache(SnapshotCache::new(&args.cache_dir));
    }

    let params = FetchParams {
        min_dte: args.dte_min,
        max_dte: args.dte_max,
        option_type: args.option_type.into(),
        strike_bounds: None,
        moneyness_bounds: Some((args.moneyness_min, args.moneyness_max)),
    };

    println!("Fetching options chain for {symbol}...");
    let chain = if args.use_cached {
        fetcher
            .fetch_cached_or_live(&symbol, args.max_age_minutes, &params)
            .await?
    } else {
        fetcher.fetch(&symbol, &params).await?
    };
    println!("Fetched {} contracts", chain.len());
    println!("Underlying price: ${:.2}", chain.underlying_price);

    let today = OffsetDateTime::now_utc().date();

    if args.summary {
        print_summary(&LiquiditySummary::compute(&chain, today));
    }

    let config = GridConfig {
        y_axis: args.y_axis.into(),
        value_mode: args.value.into(),
        option_type: args.option_type.into(),
        min_dte: args.dte_min,
        max_dte: args.dte_max,
        min_moneyness: args.moneyness_min,
        max_moneyness: args.moneyness_max,
        colorscale: args.colorscale.clone(),
        title: None,
        show_annotations: args.annotations,
        width: args.width,
        height: args.height,
    };

    println!("Creating {} visualization...", plot_type_label(args.plot_type));
    let plot = render::build_plot(&chain, &config, args.plot_type, today)?;

    let output_stem = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_stem(&symbol));
    let path = render::save(&plot, &output_stem, args.format, args.width, args.height)?;
    println!("Saved: {}", path.display());

    if args.show {
        if args.format == ExportFormat::Html {
            let absolute = path.canonicalize()?;
            webbrowser::open(&format!("file://{}", absolute.display()))?;
        } else {
            warn!("--show only opens html output in a browser");
        }
    }

    Ok(())
}

fn print_summary(summary: &LiquiditySummary) {
    println!();
    println!("=== Liquidity Summary ===");
    println!("Total Contracts: {}", summary.total_contracts);
    println!("Total Open Interest: {}", summary.total_open_interest);
    println!("Total Volume: {}", summary.total_volume);
    println!(
        "Calls: {} contracts, OI: {}, Vol: {}",
        summary.calls.contracts, summary.calls.open_interest, summary.calls.volume
    );
    println!(
        "Puts: {} contracts, OI: {}, Vol: {}",
        summary.puts.contracts, summary.puts.open_interest, summary.puts.volume
    );
    println!("Expirations: {}", summary.expirations);
    println!("Strikes: {}", summary.strikes);
    if let Some((lo, hi)) = summary.dte_range {
        println!("DTE Range: {lo} - {hi}");
    }
    if let Some((lo, hi)) = summary.moneyness_range {
        println!("Moneyness Range: {lo:.2} - {hi:.2}");
    }
    println!();
}

const fn plot_type_label(plot_type: PlotType) -> &'static str {
    match plot_type {
        PlotType::Heatmap => "heatmap",
        PlotType::Surface => "3d",
        PlotType::Split => "split",
    }
}

fn default_output_stem(symbol: &Symbol) -> String {
    const STAMP: &[FormatItem<'static>] =
        format_description!("[year][month][day]_[hour][minute][second]");
    let stamp = OffsetDateTime::now_utc()
        .format(STAMP)
        .unwrap_or_else(|_| String::from("now"));
    format!("{}_liquidity_{stamp}", symbol.as_str().to_ascii_lowercase())
}
