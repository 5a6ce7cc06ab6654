//! Pagewright CLI - preview, export and validate book files

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate jobs argument (must be at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "pagewright")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the paginated layout of a book
    Preview {
        /// Book file path
        book: PathBuf,

        /// Output the document model as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export a book to another format
    Export {
        /// Book file path
        book: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (pdf, docx, txt, html)
        #[arg(short, long, default_value = "pdf")]
        format: String,
    },

    /// Batch export every book in a directory
    Batch {
        /// Directory of .book files
        input_dir: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output format (pdf, docx, txt, html)
        #[arg(short, long, default_value = "pdf")]
        format: String,

        /// Number of parallel jobs (must be at least 1)
        #[arg(short, long, default_value = "4", value_parser = parse_jobs)]
        jobs: usize,
    },

    /// Validate a book file and report malformed markup
    Validate {
        /// Book file path
        book: PathBuf,

        /// Fail on any malformed directive
        #[arg(long)]
        strict: bool,
    },

    /// Show or change the persisted page configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print every setting
    Show,

    /// Change a single setting
    Set {
        /// Setting name, e.g. font_size
        key: String,

        /// New value
        value: String,
    },

    /// Restore the defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "pagewright_cli=debug,pagewright_core=debug"
    } else {
        "pagewright_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = cli.settings.as_deref();

    match cli.command {
        Commands::Preview { book, json } => commands::preview(&book, json, settings),

        Commands::Export {
            book,
            output,
            format,
        } => commands::export(&book, &output, &format, settings),

        Commands::Batch {
            input_dir,
            output_dir,
            format,
            jobs,
        } => commands::batch(&input_dir, &output_dir, &format, jobs, settings),

        Commands::Validate { book, strict } => commands::validate(&book, strict),

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(settings),
            ConfigAction::Set { key, value } => commands::config_set(&key, &value, settings),
            ConfigAction::Reset => commands::config_reset(settings),
        },
    }
}
