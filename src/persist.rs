//! Disk I/O helpers: load from file, in-place overwrite and atomic write.
//!
//! [`WriteMode::Overwrite`](crate::WriteMode::Overwrite) truncates the target
//! and writes into it, so a crash mid-write can leave a short or empty file.
//! [`atomic_write`] goes through a sibling temp file and a rename instead,
//! which is close to atomic on most local filesystems (no hard guarantees on
//! FAT32 or network shares).

use crate::error::{Error, Result};
use crate::serializer::JsonSerializer;
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads and decodes the file at `path`. A missing file is created empty; a
/// missing or zero-length file yields an empty map (not an error).
pub fn load(path: &Path, serializer: &JsonSerializer) -> Result<Map<String, Value>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)?;
            tracing::debug!(target: "json_store", path = %path.display(), "created empty store file");
            return Ok(Map::new());
        }
        Err(e) => return Err(Error::Io(e.to_string())),
    };
    if bytes.is_empty() {
        return Ok(Map::new());
    }
    serializer.deserialize(&bytes)
}

/// Truncate `path` and write `bytes` into it, then sync.
pub fn overwrite(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Cut the file at `path` down to zero bytes, creating it if needed.
pub fn truncate(path: &Path) -> Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    Ok(())
}

/// Write `bytes` to `<path>.tmp` and then rename over `path`. This avoids
/// leaving a half-written file if the process crashes mid-write.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path_for(path);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
    path.with_extension(format!("{ext}.tmp"))
}
