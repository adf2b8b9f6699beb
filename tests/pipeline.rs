//! End-to-end generation runs with the real compositor, SQLite store and
//! local asset sink. Only the text source is scripted.

use daily_vibes::assets::LocalAssetSink;
use daily_vibes::config::ImageConfig;
use daily_vibes::gateway::ContentGateway;
use daily_vibes::generator::{GenerationError, QuoteSource};
use daily_vibes::imaging::RustCompositor;
use daily_vibes::pipeline::{Pipeline, RunPlan};
use daily_vibes::store::{QuoteStore, SqliteStore};
use daily_vibes::types::{Category, QuoteDraft};
use std::path::Path;
use tempfile::TempDir;

struct FixedSource(Vec<QuoteDraft>);

impl QuoteSource for FixedSource {
    fn fetch(&self, _count: usize, _categories: &[Category]) -> Result<Vec<QuoteDraft>, GenerationError> {
        Ok(self.0.clone())
    }
}

fn draft(category: &str, text_en: &str) -> QuoteDraft {
    QuoteDraft {
        category: category.to_string(),
        text_en: text_en.to_string(),
        text_cn: "每天都是新的开始".to_string(),
    }
}

fn files_in(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn generated_quotes_are_rendered_and_stored() {
    let tmp = TempDir::new().unwrap();
    let image_config = ImageConfig {
        background_dir: tmp.path().join("backgrounds"),
        font_paths: Vec::new(),
        ..ImageConfig::default()
    };
    let work_dir = tmp.path().join("work");
    let asset_dir = tmp.path().join("images");

    let source = FixedSource(vec![
        draft("morning", "Every sunrise is an invitation to begin again."),
        draft("weather", "Clouds are just the sky thinking out loud."),
        draft("gratitude", "Thank the small things; they add up."),
    ]);
    let gateway = ContentGateway::new(
        SqliteStore::open(&tmp.path().join("vibes.db")).unwrap(),
        LocalAssetSink::new(&asset_dir, "/static/images/"),
        &Category::ALL,
        "quote",
    );
    let plan = RunPlan {
        categories: Category::ALL.to_vec(),
        quotes_per_category: 1,
        asset_prefix: "quote".to_string(),
        image_ext: "jpg".to_string(),
    };
    let mut pipeline = Pipeline::new(
        source,
        RustCompositor::from_config(&image_config, &work_dir),
        gateway,
        plan,
    );

    let summary = pipeline.run().unwrap();
    assert_eq!(summary.received, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures[0].category, "weather");

    let store = pipeline.into_gateway().into_store();
    let records = store.published(None, None).unwrap();
    assert_eq!(records.len(), 2);

    let images = files_in(&asset_dir);
    assert_eq!(images.len(), 2);
    for record in &records {
        let filename = record.image_url.trim_start_matches("/static/images/");
        assert!(images.contains(&filename.to_string()), "{filename} missing");
        let decoded = image::open(asset_dir.join(filename)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1080, 1080));
    }

    // Draft files never outlive the run
    assert!(files_in(&work_dir).is_empty());
}

#[test]
fn empty_batch_stores_nothing() {
    let tmp = TempDir::new().unwrap();
    let gateway = ContentGateway::new(
        SqliteStore::in_memory().unwrap(),
        LocalAssetSink::new(&tmp.path().join("images"), "/static/images/"),
        &Category::ALL,
        "quote",
    );
    let plan = RunPlan {
        categories: Category::ALL.to_vec(),
        quotes_per_category: 3,
        asset_prefix: "quote".to_string(),
        image_ext: "jpg".to_string(),
    };
    let image_config = ImageConfig {
        font_paths: Vec::new(),
        background_dir: tmp.path().join("none"),
        ..ImageConfig::default()
    };
    let mut pipeline = Pipeline::new(
        FixedSource(Vec::new()),
        RustCompositor::from_config(&image_config, &tmp.path().join("work")),
        gateway,
        plan,
    );

    let summary = pipeline.run().unwrap();
    assert!(!summary.is_success());
    assert_eq!(summary.requested, 15);
    assert!(files_in(&tmp.path().join("images")).is_empty());
    assert!(pipeline.gateway().store().published(None, None).unwrap().is_empty());
}
