//! Static site freeze.
//!
//! Turns the published content of the store into a plain file tree that any
//! static host can serve.
//!
//! ## Steps
//!
//! 1. **Enumerate**: read every published record and every markdown page.
//!    A failed read stops here; the previous output is left untouched. A
//!    single unreadable row is logged and left out of the site.
//! 2. **Reset**: delete and recreate the output directory.
//! 3. **Copy static files**: `site.static_dir` → `<output>/static/`.
//! 4. **Freeze routes** at their URL paths (no extension for parameterized routes).
//! 5. **Normalize**: every extensionless file under `quote/` and `category/`
//!    gets `.html` appended.
//! 6. **Deploy files**: `vercel.json` and `CNAME`.
//!
//! ## Output Structure
//!
//! ```text
//! build/
//! ├── index.html                 # Latest quotes
//! ├── about.html                 # One per pages/*.md
//! ├── sitemap.xml
//! ├── category/
//! │   ├── morning.html
//! │   └── ...
//! ├── quote/
//! │   ├── 1.html
//! │   └── ...
//! ├── static/images/...          # Copied assets
//! ├── vercel.json                # cleanUrls: /quote/1 serves quote/1.html
//! └── CNAME
//! ```
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Markdown pages go through pulldown-cmark.

use crate::config::SiteConfig;
use crate::store::{QuoteStore, StoreError};
use crate::types::{Category, QuoteRecord};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FreezeError {
    #[error("failed to enumerate published content: {0}")]
    Enumeration(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("refusing to use {} as output directory", .0.display())]
    OutputDir(PathBuf),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Route directories whose files are written without an extension.
pub const PARAMETERIZED_ROUTES: &[&str] = &["quote", "category"];

const CSS: &str = include_str!("../static/style.css");

/// A markdown page from the pages directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Output stem: `about.md` → `about`.
    pub slug: String,
    /// First `# ` heading, or the slug with dashes as spaces.
    pub title: String,
    pub body: String,
}

/// What a freeze wrote.
#[derive(Debug, Clone, Default)]
pub struct FreezeReport {
    pub output_dir: PathBuf,
    pub quote_pages: usize,
    pub category_pages: usize,
    pub pages: Vec<String>,
    pub sitemap_urls: usize,
    pub static_files: usize,
    /// Files that got `.html` appended during normalization.
    pub normalized: usize,
    /// Published rows left out because they could not be read.
    pub skipped: usize,
}

/// Everything read from the store and the pages directory before writing.
struct Snapshot {
    records: Vec<QuoteRecord>,
    skipped: usize,
    pages: Vec<Page>,
}

/// Published records, newest first, and the number of corrupt rows skipped.
fn load_published<S: QuoteStore>(store: &S) -> Result<(Vec<QuoteRecord>, usize), StoreError> {
    let ids = store.published_ids()?;
    let mut records = Vec::with_capacity(ids.len());
    let mut skipped = 0;
    for id in ids.into_iter().rev() {
        match store.find_published(id) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(StoreError::Corrupt { id, reason }) => {
                tracing::warn!(id, reason = %reason, "skipping corrupt quote");
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok((records, skipped))
}

pub fn freeze<S: QuoteStore>(
    store: &S,
    categories: &[Category],
    site: &SiteConfig,
) -> Result<FreezeReport, FreezeError> {
    let (records, skipped) = load_published(store)?;
    let snapshot = Snapshot {
        records,
        skipped,
        pages: load_pages(&site.pages_dir)?,
    };
    tracing::info!(
        quotes = snapshot.records.len(),
        skipped = snapshot.skipped,
        pages = snapshot.pages.len(),
        "published content enumerated"
    );

    let output = &site.output_dir;
    reset_output_dir(output)?;

    let mut report = FreezeReport {
        output_dir: output.clone(),
        skipped: snapshot.skipped,
        ..FreezeReport::default()
    };
    report.static_files = copy_static(&site.static_dir, &output.join("static"))?;

    let nav = NavContext {
        site_title: &site.title,
        categories,
        pages: &snapshot.pages,
    };

    // Records are newest first
    let latest: Vec<&QuoteRecord> = snapshot.records.iter().take(site.index_limit).collect();
    write_route(output, "index.html", render_index(&nav, &latest, None))?;

    for category in categories {
        let quotes: Vec<&QuoteRecord> = snapshot
            .records
            .iter()
            .filter(|r| r.category == *category)
            .take(site.index_limit)
            .collect();
        let route = format!("category/{category}");
        write_route(output, &route, render_index(&nav, &quotes, Some(*category)))?;
        report.category_pages += 1;
    }

    for record in &snapshot.records {
        let route = format!("quote/{}", record.id);
        write_route(output, &route, render_quote_page(&nav, record))?;
        report.quote_pages += 1;
    }

    let sitemap_ids: Vec<i64> = snapshot
        .records
        .iter()
        .take(site.sitemap_limit)
        .map(|r| r.id)
        .collect();
    fs::write(
        output.join("sitemap.xml"),
        render_sitemap(&site.base_url, &sitemap_ids),
    )?;
    report.sitemap_urls = sitemap_ids.len();

    for page in &snapshot.pages {
        let route = format!("{}.html", page.slug);
        write_route(output, &route, render_markdown_page(&nav, page))?;
        report.pages.push(route);
    }

    report.normalized = normalize_extensions(output, PARAMETERIZED_ROUTES)?;
    write_deploy_files(output, &site.domain)?;

    tracing::info!(
        output = %output.display(),
        quotes = report.quote_pages,
        normalized = report.normalized,
        "site frozen"
    );
    Ok(report)
}

fn reset_output_dir(output: &Path) -> Result<(), FreezeError> {
    let is_unsafe = output.as_os_str().is_empty()
        || output.parent().is_none()
        || output == Path::new(".")
        || output == Path::new("..");
    if is_unsafe {
        return Err(FreezeError::OutputDir(output.to_path_buf()));
    }
    if output.exists() {
        fs::remove_dir_all(output)?;
    }
    fs::create_dir_all(output)?;
    Ok(())
}

/// Copy a directory tree. A missing source copies nothing.
fn copy_static(src: &Path, dst: &Path) -> Result<usize, FreezeError> {
    if !src.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(src).into_iter().filter_map(|e| e.ok()) {
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

fn write_route(output: &Path, route: &str, markup: Markup) -> std::io::Result<()> {
    let path = output.join(route);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, markup.into_string())
}

/// Append `.html` to every extensionless file under the given route
/// directories. Returns the number of renamed files.
pub fn normalize_extensions(output: &Path, route_dirs: &[&str]) -> std::io::Result<usize> {
    let mut renamed = 0;
    for dir in route_dirs {
        let root = output.join(dir);
        if !root.is_dir() {
            continue;
        }
        let files: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.path().extension().is_none())
            .map(|e| e.into_path())
            .collect();
        for file in files {
            let mut with_ext = file.clone().into_os_string();
            with_ext.push(".html");
            fs::rename(&file, &with_ext)?;
            renamed += 1;
        }
    }
    Ok(renamed)
}

/// Deployment descriptor. Identical on every freeze.
pub fn vercel_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "cleanUrls": true,
        "trailingSlash": false,
    }))
}

fn write_deploy_files(output: &Path, domain: &str) -> Result<(), FreezeError> {
    fs::write(output.join("vercel.json"), vercel_json()?)?;
    fs::write(output.join("CNAME"), domain)?;
    Ok(())
}

/// Read `*.md` files from `dir`, sorted by filename. A missing dir has no pages.
pub fn load_pages(dir: &Path) -> std::io::Result<Vec<Page>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "md"))
        .collect();
    paths.sort();

    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(slug) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let body = fs::read_to_string(&path)?;
        pages.push(Page {
            slug: slug.to_string(),
            title: page_title(&body, slug),
            body,
        });
    }
    Ok(pages)
}

fn page_title(body: &str, slug: &str) -> String {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| slug.replace('-', " "))
}

pub fn render_sitemap(base_url: &str, ids: &[i64]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for id in ids {
        xml.push_str(&format!("  <url><loc>{base}/quote/{id}</loc></url>\n"));
    }
    xml.push_str("</urlset>\n");
    xml
}

// ============================================================================
// HTML Components
// ============================================================================

struct NavContext<'a> {
    site_title: &'a str,
    categories: &'a [Category],
    pages: &'a [Page],
}

impl NavContext<'_> {
    /// Link to the category page, or plain text when no page was frozen for it.
    fn category_link(&self, category: Category) -> Markup {
        html! {
            @if self.categories.contains(&category) {
                a.quote-category href={ "/category/" (category) } { (category.title()) }
            } @else {
                span.quote-category { (category.title()) }
            }
        }
    }
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

fn site_header(nav: &NavContext, current: Option<Category>) -> Markup {
    html! {
        header.site-header {
            a.site-title href="/" { (nav.site_title) }
            nav.categories {
                ul {
                    @for category in nav.categories {
                        li class=[(current == Some(*category)).then_some("current")] {
                            a href={ "/category/" (category) } { (category.title()) }
                        }
                    }
                }
            }
        }
    }
}

fn site_footer(nav: &NavContext) -> Markup {
    html! {
        footer.site-footer {
            @for page in nav.pages {
                a href={ "/" (page.slug) ".html" } { (page.title) }
            }
        }
    }
}

fn quote_card(nav: &NavContext, record: &QuoteRecord) -> Markup {
    html! {
        article.quote-card {
            a href={ "/quote/" (record.id) } {
                img src=(record.image_url) alt=(record.text_en) loading="lazy";
            }
            p.quote-text { (record.text_en) }
            (nav.category_link(record.category))
        }
    }
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Home page, or a category page when `category` is set.
fn render_index(nav: &NavContext, quotes: &[&QuoteRecord], category: Option<Category>) -> Markup {
    let title = match category {
        Some(c) => format!("{} · {}", c.title(), nav.site_title),
        None => nav.site_title.to_string(),
    };
    let content = html! {
        (site_header(nav, category))
        main.quote-grid {
            @if quotes.is_empty() {
                p.empty { "No quotes yet." }
            }
            @for record in quotes {
                (quote_card(nav, record))
            }
        }
        (site_footer(nav))
    };
    base_document(&title, content)
}

fn render_quote_page(nav: &NavContext, record: &QuoteRecord) -> Markup {
    let content = html! {
        (site_header(nav, Some(record.category)))
        main.quote-detail {
            img src=(record.image_url) alt=(record.text_en);
            blockquote { (record.text_en) }
            p.meta {
                (nav.category_link(record.category))
                " · "
                time datetime=(record.created_at.to_rfc3339()) {
                    (record.created_at.format("%Y-%m-%d"))
                }
            }
        }
        (site_footer(nav))
    };
    base_document(&format!("{} · {}", record.text_en, nav.site_title), content)
}

fn render_markdown_page(nav: &NavContext, page: &Page) -> Markup {
    let parser = Parser::new(&page.body);
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);

    let content = html! {
        (site_header(nav, None))
        main.text-page {
            article { (PreEscaped(body_html)) }
        }
        (site_footer(nav))
    };
    base_document(&format!("{} · {}", page.title, nav.site_title), content)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::seeded_store;
    use crate::types::Status;

    fn site(root: &Path) -> SiteConfig {
        SiteConfig {
            output_dir: root.join("build"),
            static_dir: root.join("static"),
            pages_dir: root.join("pages"),
            ..SiteConfig::default()
        }
    }

    /// Store whose reads fail.
    struct BrokenStore;

    impl QuoteStore for BrokenStore {
        fn insert_published(
            &mut self,
            _quote: &crate::types::NewQuote,
        ) -> Result<QuoteRecord, StoreError> {
            Err(StoreError::Io(std::io::Error::other("read only")))
        }

        fn published(
            &self,
            _category: Option<Category>,
            _limit: Option<usize>,
        ) -> Result<Vec<QuoteRecord>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("connection refused")))
        }

        fn find_published(&self, _id: i64) -> Result<Option<QuoteRecord>, StoreError> {
            Ok(None)
        }

        fn set_status(&mut self, _id: i64, _status: Status) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[test]
    fn three_published_quotes_give_three_detail_pages() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&[
            (Category::Morning, "one"),
            (Category::Gratitude, "two"),
            (Category::Morning, "three"),
        ]);
        let site = site(tmp.path());

        let report = freeze(&store, &Category::ALL, &site).unwrap();
        assert_eq!(report.quote_pages, 3);

        let mut files: Vec<String> = fs::read_dir(site.output_dir.join("quote"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["1.html", "2.html", "3.html"]);
    }

    #[test]
    fn category_pages_exist_for_every_configured_category() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&[(Category::Morning, "Rise and shine")]);
        let site = site(tmp.path());

        let report = freeze(&store, &[Category::Morning, Category::Mindfulness], &site).unwrap();
        assert_eq!(report.category_pages, 2);
        let morning = fs::read_to_string(site.output_dir.join("category/morning.html")).unwrap();
        assert!(morning.contains("Rise and shine"));
        let mindful =
            fs::read_to_string(site.output_dir.join("category/mindfulness.html")).unwrap();
        assert!(mindful.contains("No quotes yet."));
    }

    #[test]
    fn hidden_quotes_are_not_frozen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut store = seeded_store(&[(Category::Morning, "a"), (Category::Morning, "b")]);
        store.set_status(1, Status::Hidden).unwrap();
        let site = site(tmp.path());

        freeze(&store, &Category::ALL, &site).unwrap();
        assert!(!site.output_dir.join("quote/1.html").exists());
        assert!(site.output_dir.join("quote/2.html").exists());
    }

    #[test]
    fn corrupt_row_is_skipped_not_fatal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut store = seeded_store(&[(Category::Morning, "first")]);
        store
            .connection_mut()
            .execute(
                "INSERT INTO content_library (category, text_cn, text_en, image_url, status, created_at)
                 VALUES ('weather', '', 'x', '/x.jpg', 1, '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        store
            .insert_published(&crate::types::NewQuote {
                category: Category::Gratitude,
                text_en: "third".to_string(),
                text_cn: "三".to_string(),
                image_url: "/static/images/q.jpg".to_string(),
            })
            .unwrap();
        let site = site(tmp.path());

        let report = freeze(&store, &Category::ALL, &site).unwrap();
        assert_eq!(report.quote_pages, 2);
        assert_eq!(report.skipped, 1);
        assert!(site.output_dir.join("quote/1.html").exists());
        assert!(!site.output_dir.join("quote/2.html").exists());
        assert!(site.output_dir.join("quote/3.html").exists());

        let index = fs::read_to_string(site.output_dir.join("index.html")).unwrap();
        let third = index.find("third").unwrap();
        let first = index.find("first").unwrap();
        assert!(third < first);
    }

    #[test]
    fn unfrozen_category_is_not_linked() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&[(Category::Gratitude, "Thanks")]);
        let site = site(tmp.path());

        let report = freeze(&store, &[Category::Morning], &site).unwrap();
        assert_eq!(report.category_pages, 1);
        assert!(!site.output_dir.join("category/gratitude.html").exists());
        let page = fs::read_to_string(site.output_dir.join("quote/1.html")).unwrap();
        assert!(!page.contains("/category/gratitude"));
        let index = fs::read_to_string(site.output_dir.join("index.html")).unwrap();
        assert!(!index.contains("/category/gratitude"));
        assert!(index.contains("/category/morning"));
    }

    #[test]
    fn enumeration_failure_leaves_previous_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let site = site(tmp.path());
        fs::create_dir_all(&site.output_dir).unwrap();
        fs::write(site.output_dir.join("index.html"), "previous").unwrap();

        let err = freeze(&BrokenStore, &Category::ALL, &site).unwrap_err();
        assert!(matches!(err, FreezeError::Enumeration(_)));
        assert_eq!(
            fs::read_to_string(site.output_dir.join("index.html")).unwrap(),
            "previous"
        );
    }

    #[test]
    fn output_is_reset_between_freezes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let site = site(tmp.path());
        fs::create_dir_all(&site.output_dir).unwrap();
        fs::write(site.output_dir.join("stale.html"), "old").unwrap();

        freeze(&seeded_store(&[]), &Category::ALL, &site).unwrap();
        assert!(!site.output_dir.join("stale.html").exists());
        assert!(site.output_dir.join("index.html").exists());
    }

    #[test]
    fn deploy_files_are_written() {
        let tmp = tempfile::TempDir::new().unwrap();
        let site = SiteConfig {
            domain: "example.org".to_string(),
            ..site(tmp.path())
        };
        freeze(&seeded_store(&[]), &Category::ALL, &site).unwrap();

        assert_eq!(
            fs::read_to_string(site.output_dir.join("CNAME")).unwrap(),
            "example.org"
        );
        let vercel: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(site.output_dir.join("vercel.json")).unwrap())
                .unwrap();
        assert_eq!(vercel["cleanUrls"], true);
        assert_eq!(vercel["trailingSlash"], false);
    }

    #[test]
    fn vercel_json_is_stable() {
        assert_eq!(vercel_json().unwrap(), vercel_json().unwrap());
    }

    #[test]
    fn static_files_and_pages_are_copied() {
        let tmp = tempfile::TempDir::new().unwrap();
        let site = site(tmp.path());
        fs::create_dir_all(site.static_dir.join("images")).unwrap();
        fs::write(site.static_dir.join("images/q.jpg"), b"img").unwrap();
        fs::create_dir_all(&site.pages_dir).unwrap();
        fs::write(site.pages_dir.join("about.md"), "# About Us\n\nHello *there*.").unwrap();
        fs::write(site.pages_dir.join("notes.txt"), "ignored").unwrap();

        let report = freeze(&seeded_store(&[]), &Category::ALL, &site).unwrap();
        assert_eq!(report.static_files, 1);
        assert!(site.output_dir.join("static/images/q.jpg").exists());
        assert_eq!(report.pages, vec!["about.html"]);
        let about = fs::read_to_string(site.output_dir.join("about.html")).unwrap();
        assert!(about.contains("<em>there</em>"));
        assert!(about.contains("About Us"));
    }

    #[test]
    fn sitemap_respects_limit_and_base_url() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&[
            (Category::Morning, "a"),
            (Category::Morning, "b"),
            (Category::Morning, "c"),
        ]);
        let site = SiteConfig {
            base_url: "https://example.org/".to_string(),
            sitemap_limit: 2,
            ..site(tmp.path())
        };
        let report = freeze(&store, &Category::ALL, &site).unwrap();
        assert_eq!(report.sitemap_urls, 2);
        let xml = fs::read_to_string(site.output_dir.join("sitemap.xml")).unwrap();
        assert!(xml.contains("<loc>https://example.org/quote/3</loc>"));
        assert!(xml.contains("<loc>https://example.org/quote/2</loc>"));
        assert!(!xml.contains("/quote/1<"));
    }

    #[test]
    fn normalize_only_touches_extensionless_route_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path();
        fs::create_dir_all(out.join("quote")).unwrap();
        fs::write(out.join("quote/7"), "x").unwrap();
        fs::write(out.join("quote/8.html"), "x").unwrap();
        fs::write(out.join("CNAME"), "x").unwrap();

        assert_eq!(normalize_extensions(out, PARAMETERIZED_ROUTES).unwrap(), 1);
        assert!(out.join("quote/7.html").exists());
        assert!(out.join("quote/8.html").exists());
        assert!(out.join("CNAME").exists());
    }

    #[test]
    fn current_directory_is_not_an_output_dir() {
        let site = SiteConfig {
            output_dir: PathBuf::from("."),
            ..SiteConfig::default()
        };
        assert!(matches!(
            freeze(&seeded_store(&[]), &Category::ALL, &site),
            Err(FreezeError::OutputDir(_))
        ));
    }

    #[test]
    fn page_title_falls_back_to_slug() {
        assert_eq!(page_title("no heading", "privacy-policy"), "privacy policy");
        assert_eq!(page_title("intro\n# Terms\n", "terms"), "Terms");
    }

    #[test]
    fn quote_text_is_escaped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = seeded_store(&[(Category::Morning, "<script>alert(1)</script>")]);
        let site = site(tmp.path());
        freeze(&store, &Category::ALL, &site).unwrap();
        let page = fs::read_to_string(site.output_dir.join("quote/1.html")).unwrap();
        assert!(!page.contains("<script>alert"));
        assert!(page.contains("&lt;script&gt;"));
    }
}
