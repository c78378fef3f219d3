//! Filesystem cache of captured chain snapshots.
//!
//! Layout: `<base>/<TICKER>/<YYYY-MM-DD-HH-MM-SS>/` with the full chain in
//! `options_chain.json` and a small `metadata.json` beside it so listings do
//! not deserialize whole chains. Directory names are second-precision UTC
//! timestamps, so lexicographic order is chronological order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{CaptureTime, ChainSnapshot, Symbol};

const SNAPSHOT_FILE: &str = "options_chain.json";
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache entry at {path} is not valid JSON: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_owned(),
            source,
        }
    }

    fn serialization(path: &Path, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.to_owned(),
            source,
        }
    }
}

/// Listing-level view of one cached capture, small enough to inspect without
/// deserializing the full chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub underlying: Symbol,
    pub captured_at: CaptureTime,
    pub underlying_price: f64,
    pub contract_count: usize,
    pub call_count: usize,
    pub put_count: usize,
    pub expiration_count: usize,
    pub strike_count: usize,
    #[serde(skip)]
    pub path: PathBuf,
}

impl SnapshotMetadata {
    fn for_chain(chain: &ChainSnapshot, path: PathBuf) -> Self {
        Self {
            underlying: chain.underlying.clone(),
            captured_at: chain.captured_at,
            underlying_price: chain.underlying_price,
            contract_count: chain.len(),
            call_count: chain.calls().len(),
            put_count: chain.puts().len(),
            expiration_count: chain.expirations().len(),
            strike_count: chain.strikes().len(),
            path,
        }
    }
}

/// Totals reported by `chainheat cache size`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSize {
    pub entries: usize,
    pub bytes: u64,
}

/// Snapshot store rooted at a base directory.
///
/// Entries whose directory name does not parse as a capture timestamp are
/// ignored everywhere: listings skip them, `clear` leaves them in place.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    base: PathBuf,
}

impl SnapshotCache {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    /// Persist one snapshot; returns the entry directory. Saving the same
    /// capture instant twice overwrites in place.
    pub fn save(&self, chain: &ChainSnapshot) -> Result<PathBuf, CacheError> {
        let entry = self
            .base
            .join(chain.underlying.as_str())
            .join(chain.captured_at.dir_name());
        fs::create_dir_all(&entry).map_err(|e| CacheError::io(&entry, e))?;

        let snapshot_path = entry.join(SNAPSHOT_FILE);
        let chain_json = serde_json::to_string_pretty(chain)
            .map_err(|e| CacheError::serialization(&snapshot_path, e))?;
        fs::write(&snapshot_path, chain_json).map_err(|e| CacheError::io(&snapshot_path, e))?;

        let metadata_path = entry.join(METADATA_FILE);
        let metadata = SnapshotMetadata::for_chain(chain, entry.clone());
        let metadata_json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| CacheError::serialization(&metadata_path, e))?;
        fs::write(&metadata_path, metadata_json).map_err(|e| CacheError::io(&metadata_path, e))?;

        Ok(entry)
    }

    /// Load the chain captured at an exact instant, `None` when absent.
    pub fn load(
        &self,
        symbol: &Symbol,
        at: CaptureTime,
    ) -> Result<Option<ChainSnapshot>, CacheError> {
        let path = self
            .base
            .join(symbol.as_str())
            .join(at.dir_name())
            .join(SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        self.read_chain(&path).map(Some)
    }

    /// Load the most recent cached chain for a symbol.
    ///
    /// Corrupt entries are skipped with a warning so one bad capture does not
    /// hide older good ones.
    pub fn load_latest(&self, symbol: &Symbol) -> Result<Option<ChainSnapshot>, CacheError> {
        let mut captures = self.captures_for(symbol)?;
        captures.sort_unstable_by(|a, b| b.cmp(a));

        for at in captures {
            let path = self
                .base
                .join(symbol.as_str())
                .join(at.dir_name())
                .join(SNAPSHOT_FILE);
            match self.read_chain(&path) {
                Ok(chain) => return Ok(Some(chain)),
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable cache entry");
                }
            }
        }
        Ok(None)
    }

    /// Load the metadata document for one capture, `None` when absent.
    pub fn load_metadata(
        &self,
        symbol: &Symbol,
        at: CaptureTime,
    ) -> Result<Option<SnapshotMetadata>, CacheError> {
        let entry = self.base.join(symbol.as_str()).join(at.dir_name());
        if !entry.join(METADATA_FILE).exists() {
            return Ok(None);
        }
        self.read_metadata(&entry).map(Some)
    }

    /// Capture instants cached for one symbol, newest first.
    pub fn captures(&self, symbol: &Symbol) -> Result<Vec<CaptureTime>, CacheError> {
        let mut captures = self.captures_for(symbol)?;
        captures.reverse();
        Ok(captures)
    }

    /// Metadata for every cached capture, newest first.
    pub fn list_cached(&self) -> Result<Vec<SnapshotMetadata>, CacheError> {
        let mut entries = Vec::new();
        for symbol in self.symbols()? {
            for at in self.captures_for(&symbol)? {
                let entry = self.base.join(symbol.as_str()).join(at.dir_name());
                match self.read_metadata(&entry) {
                    Ok(metadata) => entries.push(metadata),
                    Err(error) => {
                        warn!(path = %entry.display(), %error, "skipping unreadable cache entry");
                    }
                }
            }
        }
        entries.sort_by(|a, b| b.captured_at.cmp(&a.captured_at));
        Ok(entries)
    }

    /// Entry count and total bytes across valid cache entries, optionally
    /// restricted to one symbol.
    pub fn size(&self, symbol: Option<&Symbol>) -> Result<CacheSize, CacheError> {
        let symbols = match symbol {
            Some(one) => vec![one.clone()],
            None => self.symbols()?,
        };
        let mut size = CacheSize::default();
        for symbol in symbols {
            for at in self.captures_for(&symbol)? {
                let entry = self.base.join(symbol.as_str()).join(at.dir_name());
                size.entries += 1;
                size.bytes += dir_bytes(&entry)?;
            }
        }
        Ok(size)
    }

    /// Remove cached captures, optionally restricted to one symbol and/or to
    /// captures strictly older than a cutoff. Returns the number removed.
    pub fn clear(
        &self,
        symbol: Option<&Symbol>,
        older_than: Option<CaptureTime>,
    ) -> Result<usize, CacheError> {
        let symbols = match symbol {
            Some(one) => vec![one.clone()],
            None => self.symbols()?,
        };

        let mut removed = 0;
        for sym in symbols {
            let symbol_dir = self.base.join(sym.as_str());
            for at in self.captures_for(&sym)? {
                if let Some(cutoff) = older_than {
                    if at >= cutoff {
                        continue;
                    }
                }
                let entry = symbol_dir.join(at.dir_name());
                fs::remove_dir_all(&entry).map_err(|e| CacheError::io(&entry, e))?;
                removed += 1;
            }
            // Drop the per-symbol directory once its last entry is gone.
            if symbol_dir.exists()
                && fs::read_dir(&symbol_dir)
                    .map_err(|e| CacheError::io(&symbol_dir, e))?
                    .next()
                    .is_none()
            {
                fs::remove_dir(&symbol_dir).map_err(|e| CacheError::io(&symbol_dir, e))?;
            }
        }
        Ok(removed)
    }

    fn read_chain(&self, path: &Path) -> Result<ChainSnapshot, CacheError> {
        let raw = fs::read_to_string(path).map_err(|e| CacheError::io(path, e))?;
        serde_json::from_str(&raw).map_err(|e| CacheError::serialization(path, e))
    }

    fn read_metadata(&self, entry: &Path) -> Result<SnapshotMetadata, CacheError> {
        let path = entry.join(METADATA_FILE);
        let raw = fs::read_to_string(&path).map_err(|e| CacheError::io(&path, e))?;
        let mut metadata: SnapshotMetadata =
            serde_json::from_str(&raw).map_err(|e| CacheError::serialization(&path, e))?;
        metadata.path = entry.to_owned();
        Ok(metadata)
    }

    /// Symbols with a cache directory, in directory order.
    fn symbols(&self) -> Result<Vec<Symbol>, CacheError> {
        let mut symbols = Vec::new();
        for entry in read_dir_or_empty(&self.base)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str().map(str::to_owned)) else {
                continue;
            };
            if !entry.is_dir() {
                continue;
            }
            match Symbol::parse(&name) {
                Ok(symbol) => symbols.push(symbol),
                Err(_) => {
                    warn!(name, "ignoring non-symbol directory in cache root");
                }
            }
        }
        symbols.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(symbols)
    }

    /// Parseable capture timestamps under one symbol, ascending.
    fn captures_for(&self, symbol: &Symbol) -> Result<Vec<CaptureTime>, CacheError> {
        let symbol_dir = self.base.join(symbol.as_str());
        let mut captures = Vec::new();
        for entry in read_dir_or_empty(&symbol_dir)? {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !entry.is_dir() {
                continue;
            }
            if let Ok(at) = CaptureTime::parse_dir_name(name) {
                captures.push(at);
            }
        }
        captures.sort_unstable();
        Ok(captures)
    }
}

fn read_dir_or_empty(dir: &Path) -> Result<Vec<PathBuf>, CacheError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CacheError::io(dir, e))? {
        let entry = entry.map_err(|e| CacheError::io(dir, e))?;
        paths.push(entry.path());
    }
    Ok(paths)
}

fn dir_bytes(dir: &Path) -> Result<u64, CacheError> {
    let mut total = 0;
    for path in read_dir_or_empty(dir)? {
        let meta = fs::metadata(&path).map_err(|e| CacheError::io(&path, e))?;
        if meta.is_dir() {
            total += dir_bytes(&path)?;
        } else {
            total += meta.len();
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpiryDate, OptionContract, OptionType};
    use tempfile::TempDir;
    use time::macros::date;

    fn chain_at(symbol: &str, at: &str, strikes: &[f64]) -> ChainSnapshot {
        let underlying = Symbol::parse(symbol).expect("valid");
        let contracts = strikes
            .iter()
            .map(|strike| {
                OptionContract::new(
                    format!("{symbol}240621C{:08}", (strike * 1000.0) as u64),
                    underlying.clone(),
                    ExpiryDate::new(date!(2024 - 06 - 21)),
                    *strike,
                    OptionType::Call,
                    10,
                    1,
                    1.0,
                    1.1,
                    1.05,
                    None,
                    None,
                    None,
                    None,
                    None,
                )
                .expect("valid contract")
            })
            .collect();
        ChainSnapshot::new(
            underlying,
            190.0,
            CaptureTime::parse(at).expect("utc"),
            contracts,
        )
        .expect("valid snapshot")
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        let chain = chain_at("AAPL", "2024-06-11T14:30:00Z", &[190.0, 195.0]);

        let entry = cache.save(&chain).expect("save succeeds");
        assert!(entry.join("options_chain.json").exists());
        assert!(entry.join("metadata.json").exists());

        let loaded = cache
            .load(&chain.underlying, chain.captured_at)
            .expect("load succeeds")
            .expect("entry present");
        assert_eq!(loaded, chain);
    }

    #[test]
    fn load_latest_prefers_newest_capture() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        cache
            .save(&chain_at("AAPL", "2024-06-10T14:30:00Z", &[190.0]))
            .expect("save");
        let newer = chain_at("AAPL", "2024-06-11T14:30:00Z", &[195.0]);
        cache.save(&newer).expect("save");

        let latest = cache
            .load_latest(&newer.underlying)
            .expect("load succeeds")
            .expect("entry present");
        assert_eq!(latest, newer);
    }

    #[test]
    fn load_latest_skips_corrupt_entry() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        let good = chain_at("AAPL", "2024-06-10T14:30:00Z", &[190.0]);
        cache.save(&good).expect("save");
        let bad = cache
            .save(&chain_at("AAPL", "2024-06-11T14:30:00Z", &[195.0]))
            .expect("save");
        fs::write(bad.join(SNAPSHOT_FILE), "{not json").expect("corrupt");

        let latest = cache
            .load_latest(&good.underlying)
            .expect("load succeeds")
            .expect("falls back to older entry");
        assert_eq!(latest, good);
    }

    #[test]
    fn missing_entry_and_empty_base_are_not_errors() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path().join("never-created"));
        let symbol = Symbol::parse("AAPL").expect("valid");

        assert!(cache
            .load(&symbol, CaptureTime::parse("2024-06-11T14:30:00Z").expect("utc"))
            .expect("load succeeds")
            .is_none());
        assert!(cache.load_latest(&symbol).expect("load succeeds").is_none());
        assert!(cache.list_cached().expect("list succeeds").is_empty());
        assert_eq!(cache.size(None).expect("size succeeds"), CacheSize::default());
    }

    #[test]
    fn list_is_newest_first_across_symbols() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        cache
            .save(&chain_at("AAPL", "2024-06-10T14:30:00Z", &[190.0]))
            .expect("save");
        cache
            .save(&chain_at("SPY", "2024-06-11T09:00:00Z", &[540.0, 545.0]))
            .expect("save");

        let listing = cache.list_cached().expect("list succeeds");
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].underlying.as_str(), "SPY");
        assert_eq!(listing[0].contract_count, 2);
        assert_eq!(listing[1].underlying.as_str(), "AAPL");
        assert!(listing[0].path.exists());
    }

    #[test]
    fn size_counts_entries_and_bytes() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        cache
            .save(&chain_at("AAPL", "2024-06-10T14:30:00Z", &[190.0]))
            .expect("save");
        cache
            .save(&chain_at("AAPL", "2024-06-11T14:30:00Z", &[195.0]))
            .expect("save");

        let size = cache.size(None).expect("size succeeds");
        assert_eq!(size.entries, 2);
        assert!(size.bytes > 0);

        let spy = Symbol::parse("SPY").expect("valid");
        let filtered = cache.size(Some(&spy)).expect("size succeeds");
        assert_eq!(filtered, CacheSize::default());
    }

    #[test]
    fn metadata_carries_counts_without_full_chain() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        let chain = chain_at("AAPL", "2024-06-11T14:30:00Z", &[190.0, 195.0]);
        cache.save(&chain).expect("save");

        let metadata = cache
            .load_metadata(&chain.underlying, chain.captured_at)
            .expect("load succeeds")
            .expect("metadata present");
        assert_eq!(metadata.contract_count, 2);
        assert_eq!(metadata.call_count, 2);
        assert_eq!(metadata.put_count, 0);
        assert_eq!(metadata.expiration_count, 1);
        assert_eq!(metadata.strike_count, 2);
        assert!((metadata.underlying_price - 190.0).abs() < f64::EPSILON);

        let absent = cache
            .load_metadata(
                &chain.underlying,
                CaptureTime::parse("2020-01-01T00:00:00Z").expect("utc"),
            )
            .expect("load succeeds");
        assert!(absent.is_none());
    }

    #[test]
    fn captures_are_listed_newest_first() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        cache
            .save(&chain_at("AAPL", "2024-06-10T14:30:00Z", &[190.0]))
            .expect("save");
        cache
            .save(&chain_at("AAPL", "2024-06-11T14:30:00Z", &[195.0]))
            .expect("save");

        let aapl = Symbol::parse("AAPL").expect("valid");
        let captures = cache.captures(&aapl).expect("list succeeds");
        assert_eq!(captures.len(), 2);
        assert!(captures[0] > captures[1]);
    }

    #[test]
    fn clear_respects_symbol_and_age_filters() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        let aapl = Symbol::parse("AAPL").expect("valid");
        cache
            .save(&chain_at("AAPL", "2024-06-01T14:30:00Z", &[190.0]))
            .expect("save");
        cache
            .save(&chain_at("AAPL", "2024-06-11T14:30:00Z", &[195.0]))
            .expect("save");
        cache
            .save(&chain_at("SPY", "2024-06-01T14:30:00Z", &[540.0]))
            .expect("save");

        let cutoff = CaptureTime::parse("2024-06-05T00:00:00Z").expect("utc");
        let removed = cache.clear(Some(&aapl), Some(cutoff)).expect("clear succeeds");
        assert_eq!(removed, 1);
        assert_eq!(cache.size(None).expect("size succeeds").entries, 2);

        let removed = cache.clear(None, None).expect("clear succeeds");
        assert_eq!(removed, 2);
        assert_eq!(cache.size(None).expect("size succeeds").entries, 0);
    }

    #[test]
    fn clear_ignores_unparseable_directories() {
        let dir = TempDir::new().expect("tempdir");
        let cache = SnapshotCache::new(dir.path());
        cache
            .save(&chain_at("AAPL", "2024-06-11T14:30:00Z", &[190.0]))
            .expect("save");
        let stray = dir.path().join("AAPL").join("scratch-notes");
        fs::create_dir_all(&stray).expect("mkdir");

        let removed = cache.clear(None, None).expect("clear succeeds");
        assert_eq!(removed, 1);
        assert!(stray.exists());
    }
}
