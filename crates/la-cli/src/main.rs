mod server;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use la_core::{ExprError, ExprId, parse_str, time::unix_to_iso8601};
use la_store::{StoreError, Workspace};
use rmcp::{ServiceExt, transport::stdio};

#[derive(Parser)]
#[command(name = "la", about = "Linear-algebra expression evaluator and MCP server")]
struct Cli {
    /// Owner recorded on stored expressions
    #[arg(long, global = true, default_value = "")]
    owner: String,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Evaluate an expression and store it
    Eval {
        /// Expression text, e.g. "2 * [1,2,3]"
        text: String,

        /// Evaluate only; do not store the expression
        #[arg(long)]
        no_store: bool,

        /// Print matrices with their rows kept
        #[arg(long)]
        nested: bool,
    },

    /// Parse an expression and print its normalised form
    Check {
        text: String,
    },

    /// Show one stored expression
    Show {
        id: String,
    },

    /// List stored expressions, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Suggest stored expressions similar to the given ones
    Suggest {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Number of suggestions (defaults to the configured count)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Show store statistics
    Stats,

    /// Export stored expressions to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import expressions from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn open_workspace() -> Result<Workspace> {
    Workspace::open(None).context("failed to open workspace")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Eval {
            text,
            no_store,
            nested,
        } => cmd_eval(&cli, text, !*no_store, *nested),
        Commands::Check { text } => cmd_check(text),
        Commands::Show { id } => cmd_show(id),
        Commands::History { limit } => cmd_history(*limit),
        Commands::Suggest { ids, k } => cmd_suggest(ids, *k),
        Commands::Stats => cmd_stats(),
        Commands::Export { path } => cmd_export(path),
        Commands::Import { path } => cmd_import(path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let (kind, message) = describe_error(&err);
            eprintln!("error[{kind}]: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Kind tag and message for a failed command. Expression failures keep their
/// own kind; anything else is tagged by where it came from.
fn describe_error(err: &anyhow::Error) -> (&'static str, String) {
    for cause in err.chain() {
        if let Some(store_err) = cause.downcast_ref::<StoreError>() {
            return match store_err {
                StoreError::Expression(e) => (e.kind().as_str(), e.to_string()),
                StoreError::NotFound(_) => ("not_found", store_err.to_string()),
                StoreError::InvalidData(_) => ("invalid_data", format!("{err:#}")),
                StoreError::Sqlite(_) => ("storage", format!("{err:#}")),
            };
        }
        if let Some(e) = cause.downcast_ref::<ExprError>() {
            return (e.kind().as_str(), e.to_string());
        }
    }
    ("internal", format!("{err:#}"))
}

fn parse_id(text: &str) -> Result<ExprId> {
    ExprId::parse_str(text).with_context(|| format!("invalid expression id '{text}'"))
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let workspace = open_workspace()?;
    tracing::info!("starting MCP server on {}", workspace.base_dir().display());

    let server = server::LaServer::new(workspace, &cli.owner);
    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

fn cmd_eval(cli: &Cli, text: &str, persist: bool, nested: bool) -> Result<()> {
    let workspace = open_workspace()?;
    let outcome = workspace.eval(text, &cli.owner, persist)?;

    if nested {
        println!("{}", outcome.value.nested_text());
    } else {
        println!("{}", outcome.canonical);
    }
    if let Some(record) = &outcome.record {
        println!("id: {}", record.id);
    }
    if cli.verbose {
        eprintln!(
            "--- shape={}, cached={} ---",
            outcome.value.shape(),
            outcome.cached
        );
    }
    Ok(())
}

fn cmd_check(text: &str) -> Result<()> {
    let ast = parse_str(text)?;
    println!("{ast}");
    Ok(())
}

fn cmd_show(id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let workspace = open_workspace()?;
    let record = workspace.store().get(id)?;
    let value = workspace.store().value_of(id)?;

    println!("id:       {}", record.id);
    println!("source:   {}", record.source);
    println!("value:    {}", record.canonical);
    println!("shape:    {}", value.shape());
    println!("created:  {}", unix_to_iso8601(record.created_at));
    println!("owner:    {}", record.owner);
    Ok(())
}

fn cmd_history(limit: usize) -> Result<()> {
    let workspace = open_workspace()?;
    let records = workspace.store().list(limit)?;

    if records.is_empty() {
        println!("(no expressions stored)");
    }
    for record in records {
        println!("{}  {}  => {}", record.id, record.source, record.canonical);
    }
    Ok(())
}

fn cmd_suggest(ids: &[String], k: Option<usize>) -> Result<()> {
    let ids = ids
        .iter()
        .map(|id| parse_id(id))
        .collect::<Result<Vec<_>>>()?;
    let workspace = open_workspace()?;
    let suggestions = workspace.suggest(&ids, k)?;

    if suggestions.is_empty() {
        println!("(no suggestions)");
    }
    for s in suggestions {
        println!(
            "{:.3}  {}  {}  => {}",
            s.score, s.record.id, s.record.source, s.record.canonical
        );
    }
    Ok(())
}

fn cmd_stats() -> Result<()> {
    let workspace = open_workspace()?;
    let store = workspace.store();
    let count = store.count().context("failed to count expressions")?;
    let (cache_entries, cache_hits) = store.cache_stats().context("failed to read cache")?;
    let schema = store.get_metadata("schema_version")?.unwrap_or_default();

    println!("data_dir:     {}", workspace.base_dir().display());
    println!("expressions:  {count}");
    println!("cache:        entries={cache_entries}, hits={cache_hits}");
    println!("schema:       v{schema}");
    println!("default_k:    {}", workspace.config().recommender.default_k);
    Ok(())
}

fn cmd_export(path: &Path) -> Result<()> {
    let workspace = open_workspace()?;
    workspace
        .store()
        .export_json_file(path)
        .with_context(|| format!("failed to export to {}", path.display()))?;

    println!(
        "exported {} expressions to {}",
        workspace.store().count()?,
        path.display()
    );
    Ok(())
}

fn cmd_import(path: &Path) -> Result<()> {
    let workspace = open_workspace()?;
    let summary = workspace
        .store()
        .import_json_file(path)
        .context("failed to import JSON")?;

    println!(
        "imported from {}. imported={}, skipped={}, rejected={}",
        path.display(),
        summary.imported,
        summary.skipped,
        summary.rejected
    );
    Ok(())
}
