//! One generation run.
//!
//! ```text
//! FETCH ──► for each draft: VALIDATE ──► RENDER ──► COMMIT ──► SUMMARIZE
//! ```
//!
//! A failed fetch ends the run with an error. An empty fetch ends it with a
//! zero-success summary before anything is rendered. Failures of single
//! records are logged, counted and skipped; the loop always continues.
//!
//! Runs are not idempotent: two runs over identical drafts insert two sets
//! of records.

use crate::assets::AssetSink;
use crate::gateway::{CommitError, ContentGateway};
use crate::generator::{GenerationError, QuoteSource};
use crate::imaging::{ImageRenderer, RenderError};
use crate::naming::{asset_filename, now_millis};
use crate::store::QuoteStore;
use crate::types::{Category, QuoteDraft, QuoteRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Characters of `text_en` shown when a record fails.
const LOG_PREFIX_CHARS: usize = 30;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

/// What to ask for in one run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub categories: Vec<Category>,
    pub quotes_per_category: usize,
    pub asset_prefix: String,
    /// Extension of the rendered image files.
    pub image_ext: String,
}

impl RunPlan {
    pub fn requested(&self) -> usize {
        self.categories.len() * self.quotes_per_category
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    pub category: String,
    pub text_prefix: String,
    pub reason: String,
}

/// Outcome of one run. Logged and printed, never stored.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub requested: usize,
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successes per configured category, zero for categories with none.
    pub per_category: BTreeMap<Category, usize>,
    pub failures: Vec<FailedRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    fn start(requested: usize, categories: &[Category]) -> Self {
        let now = Utc::now();
        Self {
            requested,
            received: 0,
            succeeded: 0,
            failed: 0,
            per_category: categories.iter().map(|c| (*c, 0)).collect(),
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// A run counts as successful when at least one record was stored.
    pub fn is_success(&self) -> bool {
        self.succeeded > 0
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    fn record_success(&mut self, record: &QuoteRecord) {
        self.succeeded += 1;
        *self.per_category.entry(record.category).or_insert(0) += 1;
    }

    fn record_failure(&mut self, draft: &QuoteDraft, error: &RecordError) {
        self.failed += 1;
        self.failures.push(FailedRecord {
            category: draft.category.clone(),
            text_prefix: draft.text_prefix(LOG_PREFIX_CHARS),
            reason: error.to_string(),
        });
    }
}

/// Draft image owned by one loop iteration. Deleted on drop if still there.
struct DraftImage(PathBuf);

impl Drop for DraftImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => tracing::debug!(path = %self.0.display(), "draft image removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.0.display(), error = %e, "draft image left behind"),
        }
    }
}

pub struct Pipeline<Q, R, S, A> {
    source: Q,
    renderer: R,
    gateway: ContentGateway<S, A>,
    plan: RunPlan,
}

impl<Q, R, S, A> Pipeline<Q, R, S, A>
where
    Q: QuoteSource,
    R: ImageRenderer,
    S: QuoteStore,
    A: AssetSink,
{
    pub fn new(source: Q, renderer: R, gateway: ContentGateway<S, A>, plan: RunPlan) -> Self {
        Self {
            source,
            renderer,
            gateway,
            plan,
        }
    }

    pub fn gateway(&self) -> &ContentGateway<S, A> {
        &self.gateway
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_gateway(self) -> ContentGateway<S, A> {
        self.gateway
    }

    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let requested = self.plan.requested();
        let mut summary = RunSummary::start(requested, &self.plan.categories);
        tracing::info!(
            requested,
            categories = self.plan.categories.len(),
            "generation run started"
        );

        let drafts = self.source.fetch(requested, &self.plan.categories)?;
        summary.received = drafts.len();
        if drafts.is_empty() {
            tracing::error!("no quotes received, run aborted");
            summary.finished_at = Utc::now();
            return Ok(summary);
        }

        for (seq, draft) in drafts.iter().enumerate() {
            match self.process_record(draft, seq) {
                Ok(record) => {
                    tracing::info!(
                        id = record.id,
                        category = %record.category,
                        image = %record.image_url,
                        "quote stored"
                    );
                    summary.record_success(&record);
                }
                Err(error) => {
                    tracing::error!(
                        category = %draft.category,
                        text = %draft.text_prefix(LOG_PREFIX_CHARS),
                        error = %error,
                        "quote failed"
                    );
                    summary.record_failure(draft, &error);
                }
            }
        }

        summary.finished_at = Utc::now();
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed().num_milliseconds(),
            "generation run finished"
        );
        Ok(summary)
    }

    fn process_record(&mut self, draft: &QuoteDraft, seq: usize) -> Result<QuoteRecord, RecordError> {
        self.gateway.validate(draft)?;
        let target = asset_filename(&self.plan.asset_prefix, now_millis(), seq, &self.plan.image_ext);
        let image = DraftImage(self.renderer.render(draft.text_en.trim(), &target)?);
        Ok(self.gateway.commit_quote(draft, &image.0, seq)?)
    }
}
