//! Shared types used across the generation and publishing stages.
//!
//! A quote moves through two shapes: a [`QuoteDraft`] as it comes back from the
//! text-generation service, and a [`QuoteRecord`] once the store has assigned it
//! an id, an image url and a status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of content categories.
///
/// The configured category set is a subset of these; drafts are checked
/// against the configured set, not just against this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Morning,
    Motivation,
    Gratitude,
    Mindfulness,
    Positivity,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Morning,
        Category::Motivation,
        Category::Gratitude,
        Category::Mindfulness,
        Category::Positivity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Morning => "morning",
            Category::Motivation => "motivation",
            Category::Gratitude => "gratitude",
            Category::Mindfulness => "mindfulness",
            Category::Positivity => "positivity",
        }
    }

    /// Theme hint handed to the text-generation service.
    pub fn theme(self) -> &'static str {
        match self {
            Category::Morning => "sunrise, new beginnings, fresh starts, dawn",
            Category::Motivation => "strength, perseverance, achieving goals, success",
            Category::Gratitude => "thankfulness, appreciation, counting blessings",
            Category::Mindfulness => "being present, meditation, inner peace, awareness",
            Category::Positivity => "optimism, positive thinking, spreading joy",
        }
    }

    /// Display title for page headings ("morning" → "Morning").
    pub fn title(self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0:?}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A quote as returned by the text-generation service.
///
/// The category stays a raw string here: the service is free to invent
/// categories, and rejecting them is the gateway's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteDraft {
    pub category: String,
    pub text_en: String,
    pub text_cn: String,
}

impl QuoteDraft {
    /// Build a draft from one element of the service's reply array.
    ///
    /// Fields that are missing or not strings become empty, and a non-object
    /// element becomes an all-empty draft. Validation rejects those later, so
    /// one bad element only fails its own record.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            category: field("category"),
            text_en: field("text_en"),
            text_cn: field("text_cn"),
        }
    }

    /// First `max` characters of the English text, for log lines.
    pub fn text_prefix(&self, max: usize) -> String {
        let mut prefix: String = self.text_en.chars().take(max).collect();
        if self.text_en.chars().count() > max {
            prefix.push_str("...");
        }
        prefix
    }
}

/// Visibility of a stored quote. Only `Published` rows are ever read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Hidden,
    Published,
}

impl Status {
    pub fn as_flag(self) -> i64 {
        match self {
            Status::Hidden => 0,
            Status::Published => 1,
        }
    }

    pub fn from_flag(flag: i64) -> Self {
        if flag == 0 {
            Status::Hidden
        } else {
            Status::Published
        }
    }
}

/// A validated quote ready to be inserted, with its image already in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuote {
    pub category: Category,
    pub text_en: String,
    pub text_cn: String,
    pub image_url: String,
}

/// A persisted quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRecord {
    pub id: i64,
    pub category: Category,
    pub text_en: String,
    pub text_cn: String,
    pub image_url: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("Morning".parse::<Category>().unwrap(), Category::Morning);
        assert_eq!(" GRATITUDE ".parse::<Category>().unwrap(), Category::Gratitude);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "unknown".parse::<Category>().unwrap_err();
        assert_eq!(err, UnknownCategory("unknown".to_string()));
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Mindfulness).unwrap();
        assert_eq!(json, "\"mindfulness\"");
    }

    #[test]
    fn category_title_capitalizes() {
        assert_eq!(Category::Positivity.title(), "Positivity");
    }

    #[test]
    fn draft_missing_fields_default_to_empty() {
        let draft: QuoteDraft = serde_json::from_str(r#"{"text_en": "Hi"}"#).unwrap();
        assert_eq!(draft.text_en, "Hi");
        assert!(draft.category.is_empty());
        assert!(draft.text_cn.is_empty());
    }

    #[test]
    fn draft_from_value_blanks_wrong_types() {
        let value = serde_json::json!({"category": null, "text_en": "Hi", "text_cn": 7});
        let draft = QuoteDraft::from_value(&value);
        assert_eq!(draft.text_en, "Hi");
        assert!(draft.category.is_empty());
        assert!(draft.text_cn.is_empty());

        assert_eq!(
            QuoteDraft::from_value(&serde_json::json!("oops")),
            QuoteDraft::default()
        );
    }

    #[test]
    fn text_prefix_truncates_on_char_boundary() {
        let draft = QuoteDraft {
            text_en: "Über alles, the morning light".to_string(),
            ..Default::default()
        };
        assert_eq!(draft.text_prefix(4), "Über...");
        assert_eq!(draft.text_prefix(100), "Über alles, the morning light");
    }

    #[test]
    fn status_flag_round_values() {
        assert_eq!(Status::Published.as_flag(), 1);
        assert_eq!(Status::from_flag(0), Status::Hidden);
        assert_eq!(Status::from_flag(1), Status::Published);
    }
}
