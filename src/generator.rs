//! Quote generation: prompt construction, response cleanup and retries.
//!
//! [`QuoteGenerator`] wraps any [`TextProvider`] with the prompt and the one
//! retry policy used for both failure modes:
//!
//! | Failure | Backoff before the next attempt |
//! |---|---|
//! | Provider call failed (transport, status, envelope) | `transport_backoff` |
//! | Completion text is not a JSON array of drafts | `parse_backoff` |
//!
//! After `max_attempts` the last error is returned as
//! [`GenerationError::Exhausted`]. A reply with fewer drafts than requested
//! is accepted with a warning.

use crate::config::RetryConfig;
use crate::provider::{ProviderError, TextProvider};
use crate::types::{Category, QuoteDraft};
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttemptError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("response is not a JSON array of quotes: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("quote generation failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: AttemptError },
}

/// Bounded retry with a separate backoff per failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub parse_backoff: Duration,
    pub transport_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            parse_backoff: Duration::from_secs(config.parse_backoff_secs),
            transport_backoff: Duration::from_secs(config.transport_backoff_secs),
        }
    }

    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            parse_backoff: Duration::ZERO,
            transport_backoff: Duration::ZERO,
        }
    }

    fn backoff_for(&self, error: &AttemptError) -> Duration {
        match error {
            AttemptError::Provider(_) => self.transport_backoff,
            AttemptError::Parse(_) => self.parse_backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Anything that can produce a batch of quote drafts.
pub trait QuoteSource {
    fn fetch(&self, count: usize, categories: &[Category]) -> Result<Vec<QuoteDraft>, GenerationError>;
}

pub const SYSTEM_PROMPT: &str = "You are a creative content curator specializing in \
inspirational quotes across different themes. Strictly output raw JSON only. \
Do not use Markdown (no ```json).";

/// User prompt asking for `count` quotes spread over `categories`.
pub fn build_user_prompt(count: usize, categories: &[Category]) -> String {
    let per_category = if categories.is_empty() {
        count
    } else {
        count / categories.len()
    };
    let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
    let names = names.join(", ");

    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Generate {count} UNIQUE quotes across {} categories.\n",
        categories.len()
    );
    let _ = writeln!(prompt, "**Categories:**\n{names}\n");
    let _ = writeln!(prompt, "**Requirements:**");
    let _ = writeln!(prompt, "- Generate exactly {per_category} quotes for EACH category");
    prompt.push_str(
        "- Each quote must be UNIQUE and distinctly different\n\
         - Keep quotes concise (under 25 words)\n\
         - Use vivid imagery and metaphors\n\
         - Avoid cliché phrases\n\
         - Draw from diverse sources: literature, philosophy, poetry, wisdom traditions\n\n",
    );
    let _ = writeln!(prompt, "**Category Themes:**");
    for category in categories {
        let _ = writeln!(prompt, "- {}: {}", category, category.theme());
    }
    let _ = writeln!(prompt, "\nFormat (JSON only):");
    let _ = writeln!(
        prompt,
        "[\n    {{\n        \"text_cn\": \"Chinese translation - warm and poetic\",\n        \
         \"text_en\": \"Original English quote - unique and creative\",\n        \
         \"category\": \"one of: {names}\"\n    }}\n]\n"
    );
    let _ = write!(
        prompt,
        "IMPORTANT: Generate exactly {count} quotes, {per_category} for each of the {} categories.",
        categories.len()
    );
    prompt
}

/// Remove markdown code fences the model adds despite being told not to.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse a cleaned completion into drafts.
///
/// Only the outer shape must be a JSON array. Each element is converted on
/// its own, so a malformed element yields an empty draft that fails
/// validation instead of failing the whole reply.
pub fn parse_drafts(text: &str) -> Result<Vec<QuoteDraft>, serde_json::Error> {
    let items: Vec<serde_json::Value> = serde_json::from_str(&strip_fences(text))?;
    Ok(items.iter().map(QuoteDraft::from_value).collect())
}

/// The production [`QuoteSource`]: a provider plus the retry policy.
pub struct QuoteGenerator<P> {
    provider: P,
    policy: RetryPolicy,
}

impl<P: TextProvider> QuoteGenerator<P> {
    pub fn new(provider: P, policy: RetryPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn attempt(&self, user_prompt: &str) -> Result<Vec<QuoteDraft>, AttemptError> {
        let raw = self.provider.complete(SYSTEM_PROMPT, user_prompt)?;
        Ok(parse_drafts(&raw)?)
    }
}

impl<P: TextProvider> QuoteSource for QuoteGenerator<P> {
    fn fetch(&self, count: usize, categories: &[Category]) -> Result<Vec<QuoteDraft>, GenerationError> {
        let user_prompt = build_user_prompt(count, categories);
        let max = self.policy.max_attempts;
        let mut attempt = 1;
        loop {
            tracing::info!(attempt, max, provider = %self.provider.describe(), "requesting quotes");
            match self.attempt(&user_prompt) {
                Ok(drafts) => {
                    if drafts.len() < count {
                        tracing::warn!(
                            received = drafts.len(),
                            expected = count,
                            "provider returned fewer quotes than requested"
                        );
                    }
                    tracing::info!(received = drafts.len(), "quotes received");
                    return Ok(drafts);
                }
                Err(error) => {
                    tracing::error!(attempt, max, error = %error, "quote request failed");
                    if attempt >= max {
                        return Err(GenerationError::Exhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }
                    let backoff = self.policy.backoff_for(&error);
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                    }
                    attempt += 1;
                }
            }
        }
    }
}
