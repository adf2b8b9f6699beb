//! Permanent homes for rendered images.
//!
//! An [`AssetSink`] takes the compositor's draft file and makes it reachable
//! under a public url. Two sinks exist:
//!
//! - [`LocalAssetSink`]: moves the file into the static asset directory that
//!   the freeze step copies into the site.
//! - [`ObjectStorageSink`]: uploads to an object store over HTTP, then deletes
//!   the local draft.
//!
//! Both support [`AssetSink::remove`], used by the gateway to undo a placement
//! when the database insert that should follow it fails.

use crate::config::{ObjectStorageConfig, StorageConfig};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to place asset {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("upload failed: {0}")]
    Upload(String),
}

/// Where a placed asset lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation {
    Local(PathBuf),
    Remote { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub filename: String,
    /// Url written into the quote record.
    pub url: String,
    pub location: AssetLocation,
}

pub trait AssetSink {
    /// Take ownership of the draft at `local` and store it as `filename`.
    fn store(&self, local: &Path, filename: &str) -> Result<StoredAsset, SinkError>;

    /// Undo a previous [`store`](Self::store).
    fn remove(&self, asset: &StoredAsset) -> Result<(), SinkError>;
}

/// Move `from` to `to`, copying when a plain rename is not possible
/// (e.g. across filesystems). An existing `to` is never replaced.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if to.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "target already exists",
        ));
    }
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_then_remove(from, to, |p| std::fs::remove_file(p))
}

/// Copy `from` into a newly created `to`, then delete `from` with
/// `remove_source`. On any failure `to` is deleted again so only one copy
/// of the file survives.
fn copy_then_remove(
    from: &Path,
    to: &Path,
    remove_source: impl FnOnce(&Path) -> std::io::Result<()>,
) -> std::io::Result<()> {
    let mut source = std::fs::File::open(from)?;
    let mut target = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)?;
    let copied = std::io::copy(&mut source, &mut target)
        .and_then(|_| target.sync_all())
        .and_then(|()| remove_source(from));
    drop(target);
    if let Err(e) = copied {
        if let Err(cleanup) = std::fs::remove_file(to) {
            tracing::warn!(path = %to.display(), error = %cleanup, "partial asset copy left behind");
        }
        return Err(e);
    }
    Ok(())
}

/// Stores assets in a local directory served as static files.
pub struct LocalAssetSink {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalAssetSink {
    pub fn new(dir: &Path, url_prefix: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            url_prefix: url_prefix.to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.asset_dir, &config.asset_url_prefix)
    }
}

impl AssetSink for LocalAssetSink {
    fn store(&self, local: &Path, filename: &str) -> Result<StoredAsset, SinkError> {
        let target = self.dir.join(filename);
        std::fs::create_dir_all(&self.dir)
            .and_then(|()| move_file(local, &target))
            .map_err(|source| SinkError::Persist {
                path: target.clone(),
                source,
            })?;
        tracing::debug!(path = %target.display(), "asset stored");
        Ok(StoredAsset {
            filename: filename.to_string(),
            url: format!("{}{filename}", self.url_prefix),
            location: AssetLocation::Local(target),
        })
    }

    fn remove(&self, asset: &StoredAsset) -> Result<(), SinkError> {
        match &asset.location {
            AssetLocation::Local(path) => {
                std::fs::remove_file(path).map_err(|source| SinkError::Persist {
                    path: path.clone(),
                    source,
                })
            }
            AssetLocation::Remote { key } => Err(SinkError::Upload(format!(
                "local sink cannot remove remote object {key}"
            ))),
        }
    }
}

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(alias = "access_token", alias = "securityToken")]
    token: String,
}

/// Extract the bearer token from a token endpoint's JSON reply.
pub fn parse_token(body: &str) -> Option<String> {
    serde_json::from_str::<TokenResponse>(body)
        .ok()
        .map(|t| t.token)
        .filter(|t| !t.is_empty())
}

/// Uploads assets to an HTTP object store.
///
/// Before each upload a short-lived token is requested from the token
/// endpoint. If that fails the static access key is used instead.
pub struct ObjectStorageSink {
    client: Client,
    config: ObjectStorageConfig,
    static_key: Option<String>,
}

impl ObjectStorageSink {
    /// Build a sink whose static access key is read from the environment
    /// variable named by `access_key_env`.
    pub fn new(config: &ObjectStorageConfig) -> Result<Self, SinkError> {
        let static_key = std::env::var(&config.access_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_static_key(config, static_key)
    }

    pub fn with_static_key(
        config: &ObjectStorageConfig,
        static_key: Option<String>,
    ) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .map_err(|e| SinkError::Upload(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
            static_key,
        })
    }

    pub fn object_key(&self, filename: &str) -> String {
        format!("{}{filename}", self.config.key_prefix)
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.config.endpoint.trim_end_matches('/'))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}{key}", self.config.public_url_prefix)
    }

    fn fetch_token(&self, endpoint: &str) -> Result<String, String> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("token endpoint returned {}", response.status()));
        }
        let body = response.text().map_err(|e| e.to_string())?;
        parse_token(&body).ok_or_else(|| "token missing from response".to_string())
    }

    /// Token for the next request: temporary if available, static otherwise.
    fn credentials(&self) -> Result<String, SinkError> {
        if let Some(endpoint) = &self.config.token_endpoint {
            match self.fetch_token(endpoint) {
                Ok(token) => return Ok(token),
                Err(e) => {
                    tracing::warn!(error = %e, "token exchange failed, using static access key");
                }
            }
        }
        self.static_key.clone().ok_or_else(|| {
            SinkError::Upload(format!(
                "no credentials: {} is not set",
                self.config.access_key_env
            ))
        })
    }
}

impl AssetSink for ObjectStorageSink {
    fn store(&self, local: &Path, filename: &str) -> Result<StoredAsset, SinkError> {
        let bytes = std::fs::read(local).map_err(|source| SinkError::Persist {
            path: local.to_path_buf(),
            source,
        })?;
        let key = self.object_key(filename);
        let token = self.credentials()?;
        let response = self
            .client
            .put(self.object_url(&key))
            .bearer_auth(token)
            .body(bytes)
            .send()
            .map_err(|e| SinkError::Upload(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SinkError::Upload(format!(
                "PUT {key} returned {}",
                response.status()
            )));
        }
        if let Err(e) = std::fs::remove_file(local) {
            tracing::warn!(path = %local.display(), error = %e, "uploaded draft could not be deleted");
        }
        tracing::debug!(key = %key, "asset uploaded");
        Ok(StoredAsset {
            filename: filename.to_string(),
            url: self.public_url(&key),
            location: AssetLocation::Remote { key },
        })
    }

    fn remove(&self, asset: &StoredAsset) -> Result<(), SinkError> {
        let AssetLocation::Remote { key } = &asset.location else {
            return Err(SinkError::Upload(format!(
                "object sink cannot remove local file {}",
                asset.filename
            )));
        };
        let token = self.credentials()?;
        let response = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(token)
            .send()
            .map_err(|e| SinkError::Upload(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SinkError::Upload(format!(
                "DELETE {key} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// The sink selected by configuration: object storage when configured,
/// otherwise the local asset directory.
pub fn sink_from_config(config: &StorageConfig) -> Result<Box<dyn AssetSink>, SinkError> {
    Ok(match &config.object {
        Some(object) => Box::new(ObjectStorageSink::new(object)?),
        None => Box::new(LocalAssetSink::from_config(config)),
    })
}

impl<T: AssetSink + ?Sized> AssetSink for Box<T> {
    fn store(&self, local: &Path, filename: &str) -> Result<StoredAsset, SinkError> {
        (**self).store(local, filename)
    }

    fn remove(&self, asset: &StoredAsset) -> Result<(), SinkError> {
        (**self).remove(asset)
    }
}
