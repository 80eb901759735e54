//! Markup CLI - render markup documents to HTML.
//!
//! Provides commands for:
//! - `render`: Render files or stdin to HTML
//! - `list`: Show registered languages and whether their tools are installed

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use markup_config::{CliSettings, Config};
use markup_engine::Engine;
use tracing_subscriber::EnvFilter;

use commands::{ListArgs, RenderArgs};
use error::CliError;
use output::Output;

/// Targets enabled at debug level by `--verbose`.
const VERBOSE_FILTER: &str = "markup=debug,markup_engine=debug,markup_config=debug";

/// Markup - render markup documents to HTML.
#[derive(Parser)]
#[command(name = "markup", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command.
#[derive(Args)]
struct GlobalArgs {
    /// Path to configuration file (default: auto-discover markup.toml).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Timeout for external renderer commands in seconds (0 disables).
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Do not register the built-in languages.
    #[arg(long, global = true)]
    no_builtins: bool,
}

impl GlobalArgs {
    /// Load configuration and build the rendering engine.
    fn engine(&self) -> Result<Engine, CliError> {
        let cli_settings = CliSettings {
            timeout_secs: self.timeout,
            builtins: self.no_builtins.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "Loaded configuration");
        }
        Ok(Engine::new(config.build_registry()?))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render documents to HTML.
    Render(RenderArgs),
    /// List registered languages.
    List(ListArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG for markup crates, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = cli.global.engine().and_then(|engine| match cli.command {
        Commands::Render(args) => args.execute(&engine),
        Commands::List(args) => args.execute(&engine),
    });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
