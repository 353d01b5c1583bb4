//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{info, warn};
use url::Url;

use taxonomy_core::{PipelineOptions, RunStats, validate_value};
use taxonomy_output::{
    OutputPaths, Provenance, WrittenFile, append_rejected, build_choices, read_json,
    write_choices, write_document,
};
use taxonomy_shared::{
    AppConfig, RejectMode, RunConfig, RunMetadata, TaxonomyError, config_file_path, init_config,
    load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Taxonomy builder: directory pages in, validated taxonomies out.
#[derive(Parser)]
#[command(
    name = "taxonomy",
    version,
    about = "Build validated category taxonomies from saved directory pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.taxonomy-builder/taxonomy.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build a taxonomy from one saved page.
    Build {
        /// Saved directory page (HTML).
        #[arg(long)]
        html: PathBuf,

        /// Taxonomy output file (choices and rejected log go beside it).
        #[arg(long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Build one taxonomy per `*.html` file in a directory, in parallel.
    Batch {
        /// Directory of saved pages.
        #[arg(long)]
        html_dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Validate a taxonomy JSON file and report every violation.
    Validate {
        /// Taxonomy file to check.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print the resolved configuration and run a built-in sample page.
    SelfCheck {
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Per-run overrides shared by the pipeline commands.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RunArgs {
    /// Profile name (dev, ci, prod, or one defined in the config file).
    #[arg(long, env = "TB_PROFILE")]
    pub profile: Option<String>,

    /// Base URL relative links are resolved against.
    #[arg(long, env = "TB_BASE_URL")]
    pub base_url: Option<String>,

    /// Source tag recorded in the document.
    #[arg(long)]
    pub source: Option<String>,

    /// Document version (defaults to the builder version).
    #[arg(long)]
    pub version_tag: Option<String>,

    /// Malformed-row policy: fail-fast or collect.
    #[arg(long)]
    pub reject_mode: Option<String>,

    /// List all-in links in the choices file.
    #[arg(long)]
    pub include_all_in: bool,

    /// Output directory.
    #[arg(long, env = "TB_OUTPUT_DIR")]
    pub out_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "taxonomy=info",
        1 => "taxonomy=debug",
        _ => "taxonomy=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so JSON printed on stdout stays parseable.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build { html, out, run } => cmd_build(config_path, &html, out.as_deref(), &run).await,
        Command::Batch { html_dir, run } => cmd_batch(config_path, &html_dir, &run).await,
        Command::Validate { file } => cmd_validate(&file).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
        Command::SelfCheck { run } => cmd_self_check(config_path, &run).await,
    }
}

// ---------------------------------------------------------------------------
// Configuration resolution
// ---------------------------------------------------------------------------

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Config file + profile + command-line overrides.
fn resolve_run_config(config_path: Option<&Path>, args: &RunArgs) -> Result<RunConfig> {
    let app = load_app_config(config_path)?;
    let mut run = RunConfig::resolve(&app, args.profile.as_deref())?;

    if let Some(base) = &args.base_url {
        run.base_url = Url::parse(base).map_err(|e| eyre!("invalid base URL '{base}': {e}"))?;
    }
    if let Some(source) = &args.source {
        run.source = source.clone();
    }
    if let Some(mode) = &args.reject_mode {
        run.reject_mode = mode.parse::<RejectMode>()?;
    }
    if args.include_all_in {
        run.include_all_in_choices = true;
    }
    if let Some(dir) = &args.out_dir {
        run.output_dir = dir.clone();
    }
    Ok(run)
}

fn document_version(args: &RunArgs) -> String {
    args.version_tag
        .clone()
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
}

// ---------------------------------------------------------------------------
// Shared run execution
// ---------------------------------------------------------------------------

/// What one page run produced on disk.
struct RunSummary {
    stats: RunStats,
    taxonomy: WrittenFile,
    choices: WrittenFile,
    rejected_logged: usize,
}

/// Read `html`, run the pipeline, and write every output for it.
fn execute(
    run: &RunConfig,
    html: &Path,
    paths: &OutputPaths,
    version: &str,
) -> taxonomy_shared::Result<RunSummary> {
    let markup = std::fs::read_to_string(html).map_err(|e| TaxonomyError::io(html, e))?;
    let provenance = Provenance::new(&run.profile, &run.source);
    let metadata = RunMetadata {
        version: version.to_string(),
        source: run.source.clone(),
        collected_at: Utc::now(),
    };

    let output = taxonomy_core::run(&markup, &run.base_url, metadata, &PipelineOptions::from(run))?;

    let taxonomy = write_document(&paths.taxonomy, &output.document, Some(&provenance), run.pretty)?;
    let choices = build_choices(&output.document, run.include_all_in_choices);
    let choices = write_choices(&paths.choices, &choices, run.pretty)?;
    let rejected_logged = append_rejected(&paths.rejected, &output.rejected)?;

    info!(
        run_id = %provenance.run_id,
        html = %html.display(),
        items = output.document.items().len(),
        rejected = rejected_logged,
        "run written"
    );

    Ok(RunSummary {
        stats: output.stats,
        taxonomy,
        choices,
        rejected_logged,
    })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(config_path: Option<&Path>, html: &Path, out: Option<&Path>, args: &RunArgs) -> Result<()> {
    let run = resolve_run_config(config_path, args)?;
    let paths = match out {
        Some(out) => OutputPaths::beside(out),
        None => OutputPaths::in_dir(&run.output_dir),
    };

    info!(
        html = %html.display(),
        profile = %run.profile,
        reject_mode = %run.reject_mode,
        "building taxonomy"
    );

    let start = Instant::now();
    let summary = execute(&run, html, &paths, &document_version(args))
        .wrap_err_with(|| format!("failed to build taxonomy from {}", html.display()))?;
    let stats = &summary.stats;

    println!();
    println!("  Taxonomy built successfully!");
    println!("  Strategy:   {}", stats.strategy);
    println!(
        "  Items:      {} categories, {} subcategories, {} all-in",
        stats.categories, stats.subcategories, stats.all_in
    );
    println!("  Duplicates: {}", stats.duplicates_dropped);
    println!("  Rejected:   {}", stats.rejected);
    println!("  Taxonomy:   {} ({})", summary.taxonomy.path.display(), &summary.taxonomy.sha256[..12]);
    println!("  Choices:    {}", summary.choices.path.display());
    if summary.rejected_logged > 0 {
        println!("  Rejected log: {}", paths.rejected.display());
    }
    println!("  Time:       {:.2}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_batch(config_path: Option<&Path>, html_dir: &Path, args: &RunArgs) -> Result<()> {
    let run = Arc::new(resolve_run_config(config_path, args)?);
    let version = document_version(args);

    let mut pages: Vec<PathBuf> = std::fs::read_dir(html_dir)
        .wrap_err_with(|| format!("cannot read {}", html_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")))
        .collect();
    pages.sort();

    if pages.is_empty() {
        return Err(eyre!("no .html files found in {}", html_dir.display()));
    }

    info!(pages = pages.len(), dir = %html_dir.display(), "starting batch");

    let bar = ProgressBar::new(pages.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| eyre!("invalid progress template: {e}"))?
            .progress_chars("=> "),
    );

    // Runs share nothing but the read-only config.
    let mut tasks = JoinSet::new();
    for page in pages {
        let run = Arc::clone(&run);
        let version = version.clone();
        tasks.spawn_blocking(move || {
            let stem = page
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "page".to_string());
            let paths = OutputPaths::for_stem(&run.output_dir, &stem);
            let result = execute(&run, &page, &paths, &version);
            (page, result)
        });
    }

    let mut succeeded = 0usize;
    let mut failures: Vec<(PathBuf, String)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (page, result) = joined.wrap_err("batch task panicked")?;
        let name = page.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        match result {
            Ok(summary) => {
                succeeded += 1;
                let stats = &summary.stats;
                let items = stats.categories + stats.subcategories + stats.all_in;
                bar.set_message(format!("{name}: {items} items"));
            }
            Err(e) => {
                warn!(page = %page.display(), error = %e, "run failed");
                bar.set_message(format!("{name}: failed"));
                failures.push((page, e.to_string()));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!();
    println!("  Batch complete: {succeeded} succeeded, {} failed", failures.len());
    println!("  Output:         {}", run.output_dir.display());
    for (page, error) in &failures {
        println!("  ✗ {}: {error}", page.display());
    }
    println!();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(eyre!("{} of {} runs failed", failures.len(), succeeded + failures.len()))
    }
}

async fn cmd_validate(file: &Path) -> Result<()> {
    let value = read_json(file)?;
    match validate_value(&value) {
        Ok(doc) => {
            println!("{}: valid ({} items)", file.display(), doc.items().len());
            Ok(())
        }
        Err(TaxonomyError::Schema { violations }) => {
            println!("{}: {} violation(s)", file.display(), violations.len());
            for v in &violations {
                println!("  - {v}");
            }
            Err(eyre!("{} failed validation", file.display()))
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// A minimal page in the primary layout.
const SELF_CHECK_PAGE: &str = r#"<section class="category">
  <h2 class="category--title"><a href="/it-services">IT Services</a></h2>
  <ul class="subcategories">
    <li><a class="subcategory-link" href="/it-services/msp?utm_source=check">Managed Services</a></li>
  </ul>
  <a class="all-in" href="/it-services">All in IT Services</a>
</section>"#;

async fn cmd_self_check(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let run = resolve_run_config(config_path, args)?;
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    let metadata = RunMetadata {
        version: document_version(args),
        source: "self-check".to_string(),
        collected_at: Utc::now(),
    };
    let sample = taxonomy_core::run(SELF_CHECK_PAGE, &run.base_url, metadata, &PipelineOptions::from(&run));
    let sample_report = match &sample {
        Ok(out) => serde_json::json!({ "ok": true, "stats": out.stats }),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
    };

    let report = serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "config_file": config_file.display().to_string(),
        "config_file_exists": config_file.exists(),
        "profile": run.profile,
        "base_url": run.base_url.as_str(),
        "source": run.source,
        "output_dir": run.output_dir.display().to_string(),
        "reject_mode": run.reject_mode,
        "include_all_in_choices": run.include_all_in_choices,
        "pretty": run.pretty,
        "strategies": run.strategies,
        "url_policy": run.url_policy,
        "sample_run": sample_report,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    sample.map(|_| ()).wrap_err("self-check sample run failed")
}
