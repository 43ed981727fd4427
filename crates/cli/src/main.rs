//! querygate CLI: the main entry point.
//!
//! Commands:
//! - `check`    : validate a structured SELECT request against a context
//! - `resolve`  : resolve the parameters of a stored-procedure tool call
//! - `context`  : list, show, or render the agent prompt of contexts
//! - `config`   : validate, show, or locate the configuration
//! - `doctor`   : diagnose configuration and context documents

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser)]
#[command(
    name = "querygate",
    about = "querygate: SQL and stored-procedure guardrails for text-to-SQL agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.querygate/config.toml)
    #[arg(long, global = true, env = "QUERYGATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a structured SELECT request; exits 2 when denied
    Check {
        /// Context whose SELECT policy applies
        #[arg(short, long)]
        context: String,

        /// JSON request file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        request: String,
    },

    /// Resolve tool parameters; exits 2 when rejected
    Resolve {
        /// Context whose tool catalog applies
        #[arg(short, long)]
        context: String,

        /// Agent-facing tool name
        #[arg(short, long)]
        tool: String,

        /// Known arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Inspect knowledge contexts
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration and context documents
    Doctor,
}

#[derive(Subcommand)]
enum ContextAction {
    /// List loaded contexts
    List,
    /// Print a context document as JSON
    Show { name: String },
    /// Print the prompt section an agent receives for a context
    Prompt { name: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate the configuration file
    Validate,
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Logging settings come from the config when it loads; a broken config
    // is reported by the command itself.
    let log = commands::load_config(config_path)
        .map(|c| c.log)
        .unwrap_or_default();
    init_tracing(cli.verbose, &log.level, log.json);

    let code = match cli.command {
        Commands::Check { context, request } => {
            commands::check::run(config_path, &context, &request).await?
        }
        Commands::Resolve {
            context,
            tool,
            args,
        } => commands::resolve::run(config_path, &context, &tool, &args).await?,
        Commands::Context { action } => match action {
            ContextAction::List => commands::context::list(config_path).await?,
            ContextAction::Show { name } => commands::context::show(config_path, &name).await?,
            ContextAction::Prompt { name } => {
                commands::context::prompt(config_path, &name).await?
            }
        },
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate(config_path).await?,
            ConfigAction::Show => commands::config_cmd::show(config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(config_path).await?,
        },
        Commands::Doctor => commands::doctor::run(config_path).await?,
    };

    Ok(code)
}

fn init_tracing(verbose: bool, level: &str, json: bool) {
    let filter = if verbose { "debug" } else { level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
