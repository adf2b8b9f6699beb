use clap::{Parser, Subcommand};
use daily_vibes::assets;
use daily_vibes::config::{self, AppConfig, ProviderKind};
use daily_vibes::freeze;
use daily_vibes::gateway::ContentGateway;
use daily_vibes::generator::{QuoteGenerator, RetryPolicy};
use daily_vibes::imaging::RustCompositor;
use daily_vibes::imaging::backgrounds::list_background_files;
use daily_vibes::imaging::fonts::font_loads;
use daily_vibes::logging;
use daily_vibes::output::{self, CheckReport};
use daily_vibes::pipeline::{Pipeline, RunPlan, RunSummary};
use daily_vibes::provider;
use daily_vibes::remediate;
use daily_vibes::store::{QuoteStore, SqliteStore};
use daily_vibes::types::Status;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daily-vibes")]
#[command(about = "Generate, store and publish daily inspirational quotes")]
#[command(long_about = "\
Generate, store and publish daily inspirational quotes

Each generation run asks a text-generation service for a batch of quotes,
renders every quote onto a 1080x1080 image, and stores the pair. Freezing
turns the published library into a static site.

Files used (all configurable):

  daily-vibes.toml                 # Config (optional; stock defaults otherwise)
  daily-vibes.db                   # SQLite content library
  assets/backgrounds/              # Background photos, one picked per image
  static/images/                   # Rendered images, copied into the site
  pages/*.md                       # Extra site pages (about, privacy, terms)
  build/                           # Frozen site output

The API key is read from the environment variable named by provider.api_key_env
(default DAILY_VIBES_API_KEY). Set DAILY_VIBES_LOG to override the log filter.

Run 'daily-vibes gen-config' to generate a documented daily-vibes.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = "daily-vibes.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one generation batch: fetch, render and store quotes
    Generate,
    /// Build the static site from published quotes
    Freeze,
    /// Generate a batch, then freeze the site
    Publish,
    /// Hide a quote from the site
    Hide { id: i64 },
    /// Publish a previously hidden quote
    Show { id: i64 },
    /// Point non-local image urls at local images, round-robin
    Remediate,
    /// Validate config and report which fonts, backgrounds and secrets resolve
    Check,
    /// Print a stock daily-vibes.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    logging::init_logging(&config.logging)?;

    match cli.command {
        Command::Generate => {
            let summary = run_generation(&config)?;
            output::print_run_summary(&summary);
            ensure_success(&summary)?;
        }
        Command::Freeze => {
            let store = SqliteStore::open(&config.storage.database)?;
            let report = freeze::freeze(&store, &config.generation.categories, &config.site)?;
            output::print_freeze_report(&report);
        }
        Command::Publish => {
            println!("==> Generating quotes");
            let summary = run_generation(&config)?;
            output::print_run_summary(&summary);
            ensure_success(&summary)?;

            println!("==> Freezing site \u{2192} {}", config.site.output_dir.display());
            let store = SqliteStore::open(&config.storage.database)?;
            let report = freeze::freeze(&store, &config.generation.categories, &config.site)?;
            output::print_freeze_report(&report);
        }
        Command::Hide { id } => set_status(&config, id, Status::Hidden)?,
        Command::Show { id } => set_status(&config, id, Status::Published)?,
        Command::Remediate => {
            let mut store = SqliteStore::open(&config.storage.database)?;
            let updated = remediate::remediate_image_paths(
                &mut store,
                &config.storage.asset_dir,
                &config.storage.asset_url_prefix,
            )?;
            println!("Updated {} image paths", updated);
        }
        Command::Check => {
            output::print_check_report(&check(&cli.config, &config));
            println!("==> Config is valid");
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Wire the production providers together and run one batch.
fn run_generation(config: &AppConfig) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let text_provider = provider::from_config(&config.provider)?;
    let source = QuoteGenerator::new(text_provider, RetryPolicy::from_config(&config.retry));
    let renderer = RustCompositor::from_config(&config.image, &config.storage.work_dir);
    let store = SqliteStore::open(&config.storage.database)?;
    let sink = assets::sink_from_config(&config.storage)?;
    let gateway = ContentGateway::new(
        store,
        sink,
        &config.generation.categories,
        &config.generation.asset_prefix,
    );
    let plan = RunPlan {
        categories: config.generation.categories.clone(),
        quotes_per_category: config.generation.quotes_per_category,
        asset_prefix: config.generation.asset_prefix.clone(),
        image_ext: config.image.format.extension().to_string(),
    };

    let mut pipeline = Pipeline::new(source, renderer, gateway, plan);
    Ok(pipeline.run()?)
}

fn ensure_success(summary: &RunSummary) -> Result<(), Box<dyn std::error::Error>> {
    if summary.is_success() {
        Ok(())
    } else {
        Err("no quotes were stored".into())
    }
}

fn set_status(config: &AppConfig, id: i64, status: Status) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteStore::open(&config.storage.database)?;
    if !store.set_status(id, status)? {
        return Err(format!("no quote with id {id}").into());
    }
    let verb = match status {
        Status::Hidden => "Hidden",
        Status::Published => "Published",
    };
    println!("{} quote {}", verb, id);
    Ok(())
}

fn check(config_path: &std::path::Path, config: &AppConfig) -> CheckReport {
    CheckReport {
        config_path: config_path.to_path_buf(),
        config_found: config_path.exists(),
        provider: format!(
            "{} {} at {}",
            match config.provider.kind {
                ProviderKind::Openai => "openai",
                ProviderKind::Gemini => "gemini",
            },
            config.provider.model,
            config.provider.resolved_base_url()
        ),
        api_key_env: config.provider.api_key_env.clone(),
        api_key_set: config.provider.api_key().is_ok(),
        categories: config
            .generation
            .categories
            .iter()
            .map(|c| c.to_string())
            .collect(),
        fonts: config
            .image
            .font_paths
            .iter()
            .map(|p| (p.clone(), font_loads(p)))
            .collect(),
        background_dir: config.image.background_dir.clone(),
        background_files: list_background_files(&config.image.background_dir).len(),
        database: config.storage.database.clone(),
    }
}
