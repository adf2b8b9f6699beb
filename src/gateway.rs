//! All-or-nothing persistence of one quote and its image.
//!
//! ```text
//! validate ──► place asset ──► insert row ──► done
//!    │              │               │
//!    ▼              ▼               ▼
//! Validation   Persist/Upload   remove asset, then Persist
//! ```
//!
//! The asset always exists before the row that references it. If the row
//! cannot be written the asset is removed again, so no orphan image is left
//! in the sink. A failed removal is logged and the insert error is still the
//! one reported.

use crate::assets::{AssetSink, SinkError};
use crate::naming::{asset_filename, now_millis};
use crate::store::{QuoteStore, StoreError};
use crate::types::{Category, NewQuote, QuoteDraft, QuoteRecord};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("invalid quote: {0}")]
    Validation(String),
    #[error("failed to persist quote: {0}")]
    Persist(String),
    #[error("failed to upload image: {0}")]
    Upload(String),
}

impl From<StoreError> for CommitError {
    fn from(e: StoreError) -> Self {
        CommitError::Persist(e.to_string())
    }
}

impl From<SinkError> for CommitError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::Persist { .. } => CommitError::Persist(e.to_string()),
            SinkError::Upload(msg) => CommitError::Upload(msg),
        }
    }
}

pub struct ContentGateway<S, A> {
    store: S,
    sink: A,
    categories: Vec<Category>,
    asset_prefix: String,
}

impl<S: QuoteStore, A: AssetSink> ContentGateway<S, A> {
    pub fn new(store: S, sink: A, categories: &[Category], asset_prefix: &str) -> Self {
        Self {
            store,
            sink,
            categories: categories.to_vec(),
            asset_prefix: asset_prefix.to_string(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Check a draft against the configured categories and require both texts.
    pub fn validate(&self, draft: &QuoteDraft) -> Result<Category, CommitError> {
        let category = draft
            .category
            .parse::<Category>()
            .map_err(|e| CommitError::Validation(e.to_string()))?;
        if !self.categories.contains(&category) {
            return Err(CommitError::Validation(format!(
                "category {category} is not configured"
            )));
        }
        if draft.text_en.trim().is_empty() {
            return Err(CommitError::Validation("text_en is empty".to_string()));
        }
        if draft.text_cn.trim().is_empty() {
            return Err(CommitError::Validation("text_cn is empty".to_string()));
        }
        Ok(category)
    }

    /// Persist `draft` with the image at `local_image`. `seq` is the record's
    /// position in the run and disambiguates filenames.
    pub fn commit_quote(
        &mut self,
        draft: &QuoteDraft,
        local_image: &Path,
        seq: usize,
    ) -> Result<QuoteRecord, CommitError> {
        let category = self.validate(draft)?;

        let ext = local_image
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_lowercase();
        let filename = asset_filename(&self.asset_prefix, now_millis(), seq, &ext);
        let asset = self.sink.store(local_image, &filename)?;

        let quote = NewQuote {
            category,
            text_en: draft.text_en.trim().to_string(),
            text_cn: draft.text_cn.trim().to_string(),
            image_url: asset.url.clone(),
        };
        match self.store.insert_published(&quote) {
            Ok(record) => Ok(record),
            Err(insert_error) => {
                if let Err(cleanup_error) = self.sink.remove(&asset) {
                    tracing::error!(
                        asset = %asset.filename,
                        error = %cleanup_error,
                        "failed to remove asset after insert failure"
                    );
                }
                Err(insert_error.into())
            }
        }
    }
}
