//! Shared test utilities for the daily-vibes test suite.
//!
//! Provides draft builders, a canned [`QuoteSource`], and a seeded store
//! so pipeline and freeze tests don't repeat setup.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let source = StaticSource::new(vec![draft("morning", "Rise and shine")]);
//! let store = seeded_store(&[(Category::Morning, "Rise"), (Category::Gratitude, "Thanks")]);
//! ```

use crate::generator::{AttemptError, GenerationError, QuoteSource};
use crate::provider::ProviderError;
use crate::store::{QuoteStore, SqliteStore};
use crate::types::{Category, NewQuote, QuoteDraft};

// =========================================================================
// Drafts
// =========================================================================

/// A draft with both texts filled in.
pub fn draft(category: &str, text_en: &str) -> QuoteDraft {
    QuoteDraft {
        category: category.to_string(),
        text_en: text_en.to_string(),
        text_cn: format!("{text_en}（中文）"),
    }
}

/// Quote source that returns the same drafts on every fetch, or always fails.
pub struct StaticSource {
    drafts: Option<Vec<QuoteDraft>>,
}

impl StaticSource {
    pub fn new(drafts: Vec<QuoteDraft>) -> Self {
        Self {
            drafts: Some(drafts),
        }
    }

    pub fn failing() -> Self {
        Self {
            drafts: None,
        }
    }
}

impl QuoteSource for StaticSource {
    fn fetch(&self, _count: usize, _categories: &[Category]) -> Result<Vec<QuoteDraft>, GenerationError> {
        self.drafts.clone().ok_or(GenerationError::Exhausted {
            attempts: 1,
            last: AttemptError::Provider(ProviderError::Transport("offline".to_string())),
        })
    }
}

// =========================================================================
// Store fixtures
// =========================================================================

/// In-memory store with one published record per `(category, text)` pair,
/// inserted in order (ids 1, 2, ...).
pub fn seeded_store(rows: &[(Category, &str)]) -> SqliteStore {
    let mut store = SqliteStore::in_memory().unwrap();
    for (i, (category, text)) in rows.iter().enumerate() {
        store
            .insert_published(&NewQuote {
                category: *category,
                text_en: text.to_string(),
                text_cn: format!("{text}（中文）"),
                image_url: format!("/static/images/quote_00000{i}_{i}.jpg"),
            })
            .unwrap();
    }
    store
}
