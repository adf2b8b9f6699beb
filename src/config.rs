//! Application configuration.
//!
//! Handles loading, validating, and merging `daily-vibes.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [generation]
//! categories = ["morning", "motivation", "gratitude", "mindfulness", "positivity"]
//! quotes_per_category = 3
//! asset_prefix = "quote"        # Filename prefix for published images
//!
//! [provider]
//! kind = "openai"               # openai (any compatible endpoint) | gemini
//! model = "glm-4.7"
//! # base_url = "https://open.bigmodel.cn/api/paas/v4"
//! api_key_env = "DAILY_VIBES_API_KEY"
//! temperature = 1.0
//! max_tokens = 8192
//!
//! [retry]
//! max_attempts = 3
//! parse_backoff_secs = 5
//! transport_backoff_secs = 10
//!
//! [image]
//! background_dir = "assets/backgrounds"
//! font_paths = ["PlayfairDisplay.ttf", "..."]
//! font_size = 60
//! wrap_width = 25
//! margin_x = 100
//! overlay_alpha = 80
//! fallback_color = [255, 165, 0]
//! watermark = "DailyMorningVibes.com"
//! watermark_position = [350, 950]
//! watermark_size = 40
//! quality = 90
//! format = "jpg"                # jpg | png
//!
//! [storage]
//! database = "daily-vibes.db"
//! asset_dir = "static/images"
//! asset_url_prefix = "/static/images/"
//! work_dir = "."
//!
//! [site]
//! output_dir = "build"
//! static_dir = "static"
//! pages_dir = "pages"
//! title = "Daily Morning Vibes"
//! domain = "dailymorningvibes.com"
//! base_url = "https://dailymorningvibes.com"
//! index_limit = 20
//! sitemap_limit = 1000
//!
//! [logging]
//! level = "info"
//! format = "text"               # text | json
//! # dir = "logs"                # Also write generator_YYYYMMDD.log here
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::logging::LoggingConfig;
use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("environment variable {0} is not set")]
    MissingSecret(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub provider: ProviderConfig,
    pub retry: RetryConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub site: SiteConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.categories.is_empty() {
            return Err(ConfigError::Validation(
                "generation.categories must not be empty".into(),
            ));
        }
        let unique: HashSet<_> = self.generation.categories.iter().collect();
        if unique.len() != self.generation.categories.len() {
            return Err(ConfigError::Validation(
                "generation.categories must not repeat a category".into(),
            ));
        }
        if self.generation.quotes_per_category == 0 {
            return Err(ConfigError::Validation(
                "generation.quotes_per_category must be at least 1".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.image.quality == 0 || self.image.quality > 100 {
            return Err(ConfigError::Validation("image.quality must be 1-100".into()));
        }
        if self.image.font_size == 0 || self.image.watermark_size == 0 {
            return Err(ConfigError::Validation(
                "image.font_size and image.watermark_size must be non-zero".into(),
            ));
        }
        if self.image.wrap_width == 0 {
            return Err(ConfigError::Validation(
                "image.wrap_width must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// What one generation run asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Categories to request; drafts outside this set are rejected.
    pub categories: Vec<Category>,
    /// Quotes requested per category on each run.
    pub quotes_per_category: usize,
    /// Filename prefix for published images (`quote_123456_0.jpg`).
    pub asset_prefix: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            quotes_per_category: 3,
            asset_prefix: "quote".to_string(),
        }
    }
}

/// Which text-generation API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    Openai,
    /// Google Gemini `generateContent`.
    Gemini,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    /// API root; when absent the kind's public endpoint is used.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ProviderConfig {
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => match self.kind {
                ProviderKind::Openai => "https://open.bigmodel.cn/api/paas/v4".to_string(),
                ProviderKind::Gemini => {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }
            },
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingSecret(self.api_key_env.clone()))
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Openai,
            model: "glm-4.7".to_string(),
            base_url: None,
            api_key_env: "DAILY_VIBES_API_KEY".to_string(),
            temperature: 1.0,
            max_tokens: 8192,
        }
    }
}

/// Retry bounds for the text-generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Pause after a response that was not valid JSON.
    pub parse_backoff_secs: u64,
    /// Pause after a failed HTTP call.
    pub transport_backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            parse_backoff_secs: 5,
            transport_backoff_secs: 10,
        }
    }
}

/// Encoded format of composited images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Image compositing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageConfig {
    /// Directory of background photos; one is picked at random per image.
    pub background_dir: PathBuf,
    /// Font files tried in order; the first that loads wins.
    pub font_paths: Vec<PathBuf>,
    pub font_size: u32,
    /// Wrap quote text at this many characters per line.
    pub wrap_width: usize,
    /// Left edge of the text block in pixels.
    pub margin_x: u32,
    /// Opacity of the black overlay (0 = none, 255 = black).
    pub overlay_alpha: u8,
    /// Canvas color when no background photo is available.
    pub fallback_color: [u8; 3],
    pub watermark: String,
    pub watermark_position: [u32; 2],
    pub watermark_size: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            background_dir: PathBuf::from("assets/backgrounds"),
            font_paths: vec![
                PathBuf::from("PlayfairDisplay.ttf"),
                PathBuf::from("Arial.ttf"),
                PathBuf::from("/System/Library/Fonts/Supplemental/Arial.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"),
            ],
            font_size: 60,
            wrap_width: 25,
            margin_x: 100,
            overlay_alpha: 80,
            fallback_color: [255, 165, 0],
            watermark: "DailyMorningVibes.com".to_string(),
            watermark_position: [350, 950],
            watermark_size: 40,
            quality: 90,
            format: OutputFormat::Jpg,
        }
    }
}

/// Where quotes and their images are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database file.
    pub database: PathBuf,
    /// Permanent home of published images.
    pub asset_dir: PathBuf,
    /// Public URL prefix for images in `asset_dir`.
    pub asset_url_prefix: String,
    /// Scratch directory for draft images.
    pub work_dir: PathBuf,
    /// Upload images to object storage instead of `asset_dir`.
    pub object: Option<ObjectStorageConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("daily-vibes.db"),
            asset_dir: PathBuf::from("static/images"),
            asset_url_prefix: "/static/images/".to_string(),
            work_dir: PathBuf::from("."),
            object: None,
        }
    }
}

/// Object storage bucket reached over plain HTTP PUT/DELETE.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectStorageConfig {
    /// Bucket root, e.g. `https://bucket.oss-cn-hangzhou.aliyuncs.com`.
    pub endpoint: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Public URL prefix objects are served from.
    pub public_url_prefix: String,
    /// Environment variable holding the long-lived access key.
    #[serde(default = "default_access_key_env")]
    pub access_key_env: String,
    /// Endpoint that exchanges the access key for a short-lived token.
    #[serde(default)]
    pub token_endpoint: Option<String>,
}

fn default_key_prefix() -> String {
    "daily_quotes/".to_string()
}

fn default_access_key_env() -> String {
    "DAILY_VIBES_STORAGE_KEY".to_string()
}

/// Static site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub output_dir: PathBuf,
    /// Copied verbatim to `<output_dir>/static/`.
    pub static_dir: PathBuf,
    /// Markdown files here become top-level pages (`about.md` → `about.html`).
    pub pages_dir: PathBuf,
    pub title: String,
    /// Written verbatim to `CNAME`.
    pub domain: String,
    /// Absolute site root used in the sitemap.
    pub base_url: String,
    /// Quotes shown on the home and category pages.
    pub index_limit: usize,
    pub sitemap_limit: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("build"),
            static_dir: PathBuf::from("static"),
            pages_dir: PathBuf::from("pages"),
            title: "Daily Morning Vibes".to_string(),
            domain: "dailymorningvibes.com".to_string(),
            base_url: "https://dailymorningvibes.com".to_string(),
            index_limit: 20,
            sitemap_limit: 1000,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file, falling back to stock defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# daily-vibes configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Generation
# ---------------------------------------------------------------------------
[generation]
# Categories requested on every run. Quotes in any other category are rejected.
categories = ["morning", "motivation", "gratitude", "mindfulness", "positivity"]

# How many quotes to request for each category per run.
quotes_per_category = 3

# Filename prefix of published images: <prefix>_<millis>_<n>.jpg
asset_prefix = "quote"

# ---------------------------------------------------------------------------
# Text-generation provider
# ---------------------------------------------------------------------------
[provider]
# "openai" speaks the OpenAI chat-completions protocol (ZhipuAI, SiliconFlow,
# DeepSeek, ...). "gemini" speaks Google's generateContent.
kind = "openai"
model = "glm-4.7"

# API root. Defaults to the public endpoint of the chosen kind.
# base_url = "https://open.bigmodel.cn/api/paas/v4"

# The API key is read from this environment variable.
api_key_env = "DAILY_VIBES_API_KEY"

temperature = 1.0
max_tokens = 8192

# ---------------------------------------------------------------------------
# Retries (text-generation call only)
# ---------------------------------------------------------------------------
[retry]
max_attempts = 3
parse_backoff_secs = 5
transport_backoff_secs = 10

# ---------------------------------------------------------------------------
# Image compositing (canvas is always 1080x1080)
# ---------------------------------------------------------------------------
[image]
# One file is picked at random; an empty or missing directory gives a plain canvas.
background_dir = "assets/backgrounds"

# Tried in order. If none loads, a built-in bitmap font is used.
font_paths = [
    "PlayfairDisplay.ttf",
    "Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
]
font_size = 60

# Characters per line before wrapping.
wrap_width = 25
margin_x = 100

# Black overlay opacity, 0-255.
overlay_alpha = 80
fallback_color = [255, 165, 0]

watermark = "DailyMorningVibes.com"
watermark_position = [350, 950]
watermark_size = 40

quality = 90
format = "jpg"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
database = "daily-vibes.db"
asset_dir = "static/images"
asset_url_prefix = "/static/images/"
work_dir = "."

# Upload to object storage instead of asset_dir:
# [storage.object]
# endpoint = "https://my-bucket.oss-cn-hangzhou.aliyuncs.com"
# key_prefix = "daily_quotes/"
# public_url_prefix = "https://my-bucket.oss-cn-hangzhou.aliyuncs.com/"
# access_key_env = "DAILY_VIBES_STORAGE_KEY"
# token_endpoint = "https://sts.example.com/token"

# ---------------------------------------------------------------------------
# Static site
# ---------------------------------------------------------------------------
[site]
output_dir = "build"
static_dir = "static"
pages_dir = "pages"
title = "Daily Morning Vibes"
domain = "dailymorningvibes.com"
base_url = "https://dailymorningvibes.com"
index_limit = 20
sitemap_limit = 1000

# ---------------------------------------------------------------------------
# Logging (DAILY_VIBES_LOG overrides level)
# ---------------------------------------------------------------------------
[logging]
level = "info"
format = "text"
# dir = "logs"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_requests_fifteen_quotes() {
        let config = AppConfig::default();
        assert_eq!(config.generation.categories.len(), 5);
        assert_eq!(config.generation.quotes_per_category, 3);
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.generation.categories, defaults.generation.categories);
        assert_eq!(config.image.font_paths, defaults.image.font_paths);
        assert_eq!(config.site.domain, defaults.site.domain);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.storage.object.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[generation]
categories = ["morning", "gratitude"]

[image]
wrap_width = 30
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.generation.categories,
            vec![Category::Morning, Category::Gratitude]
        );
        assert_eq!(config.image.wrap_width, 30);
        // Defaults preserved
        assert_eq!(config.image.font_size, 60);
        assert_eq!(config.generation.quotes_per_category, 3);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("daily-vibes.toml")).unwrap();
        assert_eq!(config.site.output_dir, PathBuf::from("build"));
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily-vibes.toml");
        fs::write(
            &path,
            r#"
[provider]
kind = "gemini"
model = "gemini-2.0-flash"

[storage.object]
endpoint = "https://bucket.example.com"
public_url_prefix = "https://cdn.example.com/"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        let object = config.storage.object.unwrap();
        assert_eq!(object.key_prefix, "daily_quotes/");
        assert_eq!(object.access_key_env, "DAILY_VIBES_STORAGE_KEY");
        assert!(object.token_endpoint.is_none());
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily-vibes.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let toml = r#"
[image]
wrap_widht = 30
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_category_rejected() {
        let toml = r#"
[generation]
categories = ["morning", "evening"]
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn validate_empty_categories() {
        let mut config = AppConfig::default();
        config.generation.categories.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_duplicate_categories() {
        let mut config = AppConfig::default();
        config.generation.categories = vec![Category::Morning, Category::Morning];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_zero_attempts() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_quality_out_of_range() {
        let mut config = AppConfig::default();
        config.image.quality = 0;
        assert!(config.validate().is_err());
        config.image.quality = 101;
        assert!(config.validate().is_err());
        config.image.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("daily-vibes.toml");
        fs::write(&path, "[generation]\nquotes_per_category = 0\n").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn merge_toml_deep_nested() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[site]\ntitle = \"Evening Vibes\"").unwrap();
        let merged = merge_toml(base, overlay);
        let config: AppConfig = merged.try_into().unwrap();
        assert_eq!(config.site.title, "Evening Vibes");
        assert_eq!(config.site.domain, "dailymorningvibes.com");
    }

    #[test]
    fn resolved_base_url_defaults_per_kind() {
        let mut provider = ProviderConfig::default();
        assert_eq!(
            provider.resolved_base_url(),
            "https://open.bigmodel.cn/api/paas/v4"
        );
        provider.kind = ProviderKind::Gemini;
        assert!(provider.resolved_base_url().contains("generativelanguage"));
        provider.base_url = Some("https://api.siliconflow.cn/v1/".to_string());
        assert_eq!(provider.resolved_base_url(), "https://api.siliconflow.cn/v1");
    }

    #[test]
    fn api_key_missing_env_is_error() {
        let provider = ProviderConfig {
            api_key_env: "DAILY_VIBES_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            provider.api_key(),
            Err(ConfigError::MissingSecret(name)) if name == "DAILY_VIBES_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
