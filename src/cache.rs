//! Parsed-record cache for blockchain logs.
//!
//! Long runs produce logs that take noticeably longer to tokenize than
//! to aggregate, so the parsed records are cached next to the log as
//! `<name>.records.zst`: a bincode payload inside a zstd frame, stamped
//! with the source file's length and mtime. A regenerated log no longer
//! matches its stamp and the cache is ignored. Cache trouble is never
//! fatal; a miss just means parsing again.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use color_eyre::eyre::{eyre, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::parser::TaggedScan;

const CACHE_VERSION: u32 = 1;
const COMPRESSION_LEVEL: i32 = 3;

/// Identity of the source log a cache was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SourceStamp {
    len: u64,
    mtime: Option<SystemTime>,
}

/// On-disk cache layout.
#[derive(Debug, Deserialize)]
struct CacheFile {
    version: u32,
    stamp: SourceStamp,
    scan: TaggedScan,
}

/// Serialize-side twin of [`CacheFile`] borrowing the scan; bincode
/// encodes both layouts identically.
#[derive(Debug, Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    stamp: SourceStamp,
    scan: &'a TaggedScan,
}

/// Cache location for a log: the log's own file name with
/// `.records.zst` appended, in the same directory.
pub fn cache_path(input: &Path) -> PathBuf {
    let mut name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".records.zst");
    input.with_file_name(name)
}

fn stamp(input: &Path) -> Option<SourceStamp> {
    let meta = fs::metadata(input).ok()?;
    Some(SourceStamp {
        len: meta.len(),
        mtime: meta.modified().ok(),
    })
}

/// Load the cached scan for a log. `None` means no usable cache:
/// missing, unreadable, wrong version, or out of date.
pub fn load(input: &Path) -> Option<TaggedScan> {
    let path = cache_path(input);
    let compressed = fs::read(&path).ok()?;
    let bytes = match zstd::decode_all(compressed.as_slice()) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("Ignoring unreadable record cache {}: {}", path.display(), err);
            return None;
        }
    };
    let cached: CacheFile = match bincode::deserialize(&bytes) {
        Ok(cached) => cached,
        Err(err) => {
            warn!("Ignoring corrupt record cache {}: {}", path.display(), err);
            return None;
        }
    };
    if cached.version != CACHE_VERSION {
        debug!(
            "Record cache {} has version {}, expected {}",
            path.display(),
            cached.version,
            CACHE_VERSION
        );
        return None;
    }
    if stamp(input).as_ref() != Some(&cached.stamp) {
        debug!("Record cache {} is out of date", path.display());
        return None;
    }
    info!(
        "Loaded {} cached record(s) from {}",
        cached.scan.records.len(),
        path.display()
    );
    Some(cached.scan)
}

/// Write the cache for a log.
pub fn store(input: &Path, scan: &TaggedScan) -> Result<()> {
    let stamp = stamp(input)
        .ok_or_else(|| eyre!("Failed to stat source log: {}", input.display()))?;
    let cached = CacheFileRef {
        version: CACHE_VERSION,
        stamp,
        scan,
    };
    let bytes = bincode::serialize(&cached).context("Failed to serialize record cache")?;
    let compressed = zstd::encode_all(bytes.as_slice(), COMPRESSION_LEVEL)
        .context("Failed to compress record cache")?;
    let path = cache_path(input);
    fs::write(&path, &compressed)
        .with_context(|| format!("Failed to write record cache: {}", path.display()))?;
    debug!(
        "Wrote record cache {} ({} bytes compressed)",
        path.display(),
        compressed.len()
    );
    Ok(())
}
