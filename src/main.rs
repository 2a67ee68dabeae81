//! Wiring & DI. Entry point: parse the CLI, bootstrap adapters, inject into
//! services, dispatch one subcommand. No business logic here.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wiki_migrate::adapters::azure::AzureDevOpsClient;
use wiki_migrate::adapters::mediawiki::MediaWikiClient;
use wiki_migrate::adapters::persistence::CheckpointJson;
use wiki_migrate::ports::{CheckpointStore, WikiSource, WikiTarget};
use wiki_migrate::shared::config::AppConfig;
use wiki_migrate::usecases::{
    MigrateOptions, MigrateService, PlanService, PreviewService, TemplateService, ValidateService,
};

#[derive(Parser)]
#[command(name = "wiki-migrate")]
#[command(version)]
#[command(about = "Migrate Azure DevOps wiki pages to MediaWiki", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug-level logs)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate wiki pages into the target MediaWiki
    Migrate {
        /// Wiki to migrate (default: first wiki in the project)
        #[arg(long)]
        wiki: Option<String>,

        /// Convert and log without writing to MediaWiki
        #[arg(long)]
        dry_run: bool,

        /// Pages per batch (overrides BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Only these page paths, comma-separated
        #[arg(long, value_delimiter = ',')]
        pages: Vec<String>,

        /// Skip pages whose path matches this regex
        #[arg(long)]
        exclude_pattern: Option<String>,

        /// Only pages modified after this date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_modified_after)]
        modified_after: Option<DateTime<Utc>>,

        /// Resume from this page path, dropping everything listed before it
        #[arg(long)]
        resume_from: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Analyze the source wiki and estimate migration effort
    Plan {
        /// Wiki to analyze (default: first wiki in the project)
        #[arg(long)]
        wiki: Option<String>,
    },

    /// Preview conversions without writing anything
    Preview {
        /// Wiki to preview (default: first wiki in the project)
        #[arg(long)]
        wiki: Option<String>,

        /// Preview a single page by path
        #[arg(long)]
        page: Option<String>,

        /// Sample size when no --page is given
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },

    /// Validate migrated content on the target wiki
    Validate,

    /// Import template files into the target wiki
    ImportTemplates {
        /// Directory with *.mediawiki / *.wiki files
        #[arg(long, env = "TEMPLATE_DIR", default_value = "templates")]
        dir: PathBuf,

        /// List what would be imported without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    wiki_migrate::adapters::ui::print_welcome();

    let cfg = AppConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Migrate {
            wiki,
            dry_run,
            batch_size,
            pages,
            exclude_pattern,
            modified_after,
            resume_from,
            yes,
        } => {
            let options = MigrateOptions {
                wiki_name: wiki.or_else(|| cfg.azure_wiki_name.clone()),
                dry_run,
                batch_size: batch_size.unwrap_or_else(|| cfg.batch_size_or_default()),
                pages,
                exclude_pattern,
                modified_after,
                resume_from,
            };
            run_migrate(&cfg, options, yes).await?;
        }
        Commands::Plan { wiki } => {
            let wiki = wiki.or_else(|| cfg.azure_wiki_name.clone());
            run_plan(&cfg, wiki).await?;
        }
        Commands::Preview { wiki, page, sample } => {
            let wiki = wiki.or_else(|| cfg.azure_wiki_name.clone());
            run_preview(&cfg, wiki, page, sample).await?;
        }
        Commands::Validate => {
            run_validate(&cfg).await?;
        }
        Commands::ImportTemplates { dir, dry_run } => {
            run_import_templates(&cfg, &dir, dry_run).await?;
        }
    }

    Ok(())
}

/// Accepts a plain date (midnight UTC) or a full RFC 3339 timestamp.
fn parse_modified_after(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = s.parse::<DateTime<Utc>>() {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("invalid date '{}': use YYYY-MM-DD or RFC 3339", s))
}

async fn run_migrate(cfg: &AppConfig, options: MigrateOptions, yes: bool) -> anyhow::Result<()> {
    require_azure(cfg)?;
    require_mediawiki(cfg)?;

    if !options.dry_run && !yes {
        let confirmed = inquire::Confirm::new("Write pages to MediaWiki?")
            .with_default(false)
            .with_help_message("Run with --dry-run first to preview the changes")
            .prompt()?;
        if !confirmed {
            info!("migration cancelled");
            return Ok(());
        }
    }

    let source = azure_source(cfg);
    let target = mediawiki_target(cfg)?;
    let checkpoint_impl = CheckpointJson::new(cfg.checkpoint_file_or_default());
    checkpoint_impl
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let checkpoint: Arc<dyn CheckpointStore> = Arc::new(checkpoint_impl);

    let service = MigrateService::new(source, target, checkpoint, cfg.report_dir_or_default());
    let outcome = service
        .migrate(&options)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("\n✅ Migration complete!");
    println!("   Migrated: {}", outcome.migrated);
    println!("   Skipped:  {}", outcome.skipped);
    println!("   Failed:   {}", outcome.failed);
    if outcome.failed > 0 {
        println!(
            "   Manual-review report written under {}",
            cfg.report_dir_or_default().display()
        );
    }

    Ok(())
}

async fn run_plan(cfg: &AppConfig, wiki: Option<String>) -> anyhow::Result<()> {
    require_azure(cfg)?;

    let service = PlanService::new(azure_source(cfg), cfg.report_dir_or_default());
    match service
        .plan(wiki.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?
    {
        Some(path) => println!("\n📊 Analysis report: {}", path.display()),
        None => println!("\nNo wikis found in the project."),
    }

    Ok(())
}

async fn run_preview(
    cfg: &AppConfig,
    wiki: Option<String>,
    page: Option<String>,
    sample: usize,
) -> anyhow::Result<()> {
    require_azure(cfg)?;

    let service = PreviewService::new(azure_source(cfg), cfg.report_dir_or_default());
    let report = match page {
        Some(path) => service.preview_one(wiki.as_deref(), &path).await,
        None => service.preview_sample(wiki.as_deref(), sample).await,
    }
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    match report {
        Some(path) => println!("\n👀 Preview report: {}", path.display()),
        None => println!("\nNo wikis found in the project."),
    }

    Ok(())
}

async fn run_validate(cfg: &AppConfig) -> anyhow::Result<()> {
    require_mediawiki(cfg)?;

    let service = ValidateService::new(
        mediawiki_target(cfg)?,
        cfg.mediawiki_base_url().unwrap_or_default(),
        cfg.report_dir_or_default(),
    );
    let outcome = service
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("\n✅ Validation complete!");
    println!("   Pages found:     {}", outcome.pages_found);
    println!(
        "   Accessible:      {} ({:.1}%)",
        outcome.pages_accessible, outcome.accessibility_rate
    );
    println!("   Content quality: {:.1}%", outcome.quality_rate);
    println!("   Content issues:  {}", outcome.total_issues);
    println!("   Broken links:    {}", outcome.broken_links);
    println!("   Report: {}", outcome.report_path.display());

    Ok(())
}

async fn run_import_templates(
    cfg: &AppConfig,
    dir: &std::path::Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    require_mediawiki(cfg)?;

    let service = TemplateService::new(mediawiki_target(cfg)?);
    let outcome = service
        .import_dir(dir, dry_run)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("\n✅ Template import complete!");
    println!("   Imported: {}", outcome.imported);
    println!("   Failed:   {}", outcome.failed);

    Ok(())
}

fn require_azure(cfg: &AppConfig) -> anyhow::Result<()> {
    let missing = cfg.missing_azure_vars();
    if !missing.is_empty() {
        anyhow::bail!(
            "Missing required Azure DevOps variables: {}. Set them in .env or the environment.",
            missing.join(", ")
        );
    }
    Ok(())
}

fn require_mediawiki(cfg: &AppConfig) -> anyhow::Result<()> {
    let missing = cfg.missing_mediawiki_vars();
    if !missing.is_empty() {
        anyhow::bail!(
            "Missing required MediaWiki variables: {}. Set them in .env or the environment.",
            missing.join(", ")
        );
    }
    let url = cfg.mediawiki_url.as_deref().unwrap_or_default();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("MEDIAWIKI_URL must start with http:// or https:// (got '{}')", url);
    }
    Ok(())
}

fn azure_source(cfg: &AppConfig) -> Arc<dyn WikiSource> {
    Arc::new(AzureDevOpsClient::new(
        cfg.azure_devops_org.as_deref().unwrap_or_default(),
        cfg.azure_devops_project.as_deref().unwrap_or_default(),
        cfg.azure_devops_token.clone().unwrap_or_default(),
    ))
}

fn mediawiki_target(cfg: &AppConfig) -> anyhow::Result<Arc<dyn WikiTarget>> {
    let client = MediaWikiClient::new(
        &cfg.mediawiki_base_url().unwrap_or_default(),
        cfg.mediawiki_username.clone().unwrap_or_default(),
        cfg.mediawiki_password.clone().unwrap_or_default(),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(Arc::new(client))
}
