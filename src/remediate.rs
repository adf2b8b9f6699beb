//! Image path remediation.
//!
//! Points every record whose `image_url` is not a local asset url (an old
//! object-storage link, a dead external url) at a local image instead. Local
//! assets are assigned round-robin in filename order, records in id order.
//! Hidden records are included. All updates happen in one transaction.

use crate::store::{SqliteStore, StoreError};
use rusqlite::params;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemediateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no local images in {}", .0.display())]
    NoAssets(PathBuf),
}

impl From<rusqlite::Error> for RemediateError {
    fn from(e: rusqlite::Error) -> Self {
        RemediateError::Store(StoreError::Sqlite(e))
    }
}

const ASSET_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Image filenames in `dir`, sorted. Empty when the directory is missing.
pub fn local_assets(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| ASSET_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        })
        .collect();
    names.sort();
    names
}

/// Pair each record id with an asset, cycling through `assets`.
pub fn round_robin<'a>(ids: &[i64], assets: &'a [String]) -> Vec<(i64, &'a str)> {
    if assets.is_empty() {
        return Vec::new();
    }
    ids.iter()
        .enumerate()
        .map(|(i, id)| (*id, assets[i % assets.len()].as_str()))
        .collect()
}

/// Rewrite non-local image urls. Returns the number of updated records.
pub fn remediate_image_paths(
    store: &mut SqliteStore,
    asset_dir: &Path,
    url_prefix: &str,
) -> Result<usize, RemediateError> {
    let conn = store.connection_mut();
    let ids: Vec<i64> = {
        let mut stmt = conn.prepare(
            "SELECT id FROM content_library WHERE substr(image_url, 1, length(?1)) != ?1 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![url_prefix], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        ids
    };
    if ids.is_empty() {
        tracing::info!("no records need remediation");
        return Ok(0);
    }

    let assets = local_assets(asset_dir);
    if assets.is_empty() {
        return Err(RemediateError::NoAssets(asset_dir.to_path_buf()));
    }

    let tx = conn.transaction()?;
    for (id, asset) in round_robin(&ids, &assets) {
        tx.execute(
            "UPDATE content_library SET image_url = ?1 WHERE id = ?2",
            params![format!("{url_prefix}{asset}"), id],
        )?;
    }
    tx.commit()?;
    tracing::info!(updated = ids.len(), assets = assets.len(), "image paths remediated");
    Ok(ids.len())
}
