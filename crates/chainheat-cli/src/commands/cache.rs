//! The `cache` command group: list, size, clear.

use std::io::Write;

use chainheat_core::{CaptureTime, SnapshotCache, Symbol};

use crate::cli::{CacheArgs, CacheClearArgs, CacheCommand};
use crate::error::CliError;

pub fn run(args: CacheArgs) -> Result<(), CliError> {
    let cache = SnapshotCache::new(&args.cache_dir);
    match args.command {
        CacheCommand::List { ticker } => list(&cache, ticker.as_deref()),
        CacheCommand::Size { ticker } => size(&cache, ticker.as_deref()),
        CacheCommand::Clear(clear_args) => clear(&cache, &clear_args),
    }
}

fn list(cache: &SnapshotCache, ticker: Option<&str>) -> Result<(), CliError> {
    let symbol = ticker.map(Symbol::parse).transpose()?;
    let mut entries = cache.list_cached()?;
    if let Some(symbol) = &symbol {
        entries.retain(|entry| entry.underlying == *symbol);
    }
    if entries.is_empty() {
        println!("Cache is empty");
        return Ok(());
    }

    println!(
        "{:<10} {:<21} {:>12} {:>10} {:>7} {:>7}",
        "TICKER", "CAPTURED", "UNDERLYING", "CONTRACTS", "CALLS", "PUTS"
    );
    for entry in entries {
        println!(
            "{:<10} {:<21} {:>12.2} {:>10} {:>7} {:>7}",
            entry.underlying.as_str(),
            entry.captured_at.dir_name(),
            entry.underlying_price,
            entry.contract_count,
            entry.call_count,
            entry.put_count,
        );
    }
    Ok(())
}

fn size(cache: &SnapshotCache, ticker: Option<&str>) -> Result<(), CliError> {
    let symbol = ticker.map(Symbol::parse).transpose()?;
    let size = cache.size(symbol.as_ref())?;
    println!("{} snapshot(s), {} bytes on disk", size.entries, size.bytes);
    Ok(())
}

fn clear(cache: &SnapshotCache, args: &CacheClearArgs) -> Result<(), CliError> {
    let symbol = args.ticker.as_deref().map(Symbol::parse).transpose()?;
    let cutoff = args.older_than_days.map(CaptureTime::days_ago);

    if !args.yes && !confirm_clear(symbol.as_ref(), args.older_than_days)? {
        println!("Aborted");
        return Ok(());
    }

    let removed = cache.clear(symbol.as_ref(), cutoff)?;
    println!("Removed {removed} snapshot(s)");
    Ok(())
}

fn confirm_clear(symbol: Option<&Symbol>, older_than_days: Option<i64>) -> Result<bool, CliError> {
    let scope = match symbol {
        Some(symbol) => format!("snapshots for {symbol}"),
        None => String::from("all snapshots"),
    };
    match older_than_days {
        Some(days) => print!("Remove {scope} older than {days} day(s)? [y/N] "),
        None => print!("Remove {scope}? [y/N] "),
    }
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
