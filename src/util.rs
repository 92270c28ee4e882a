use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compact UTC stamp used in run ids and run-manifest filenames.
pub fn run_stamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%dT%H%M%SZ").to_string()
}

/// All manifests for one cache root live together under manifests/.
pub fn manifest_dir(cache_root: &Path) -> PathBuf {
    cache_root.join("manifests")
}

pub fn default_db_path(cache_root: &Path) -> PathBuf {
    cache_root.join("wellmine.sqlite")
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Digest of one source filing, recorded in the inventory and in each
/// mining run's manifest so re-mines of an unchanged filing are
/// recognizable.
pub fn filing_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open filing for hashing: {}", path.display()))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .with_context(|| format!("failed to read filing for hashing: {}", path.display()))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_manifest<T: Serialize>(path: &Path, manifest: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let data = serde_json::to_vec_pretty(manifest)
        .with_context(|| format!("failed to serialize manifest: {}", path.display()))?;

    let mut file = File::create(path)
        .with_context(|| format!("failed to create manifest file: {}", path.display()))?;
    file.write_all(&data)
        .with_context(|| format!("failed to write manifest file: {}", path.display()))?;
    file.write_all(b"\n")
        .with_context(|| format!("failed to finalize manifest file: {}", path.display()))?;

    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
