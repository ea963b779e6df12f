//! fixhub - Ticket lifecycle and assignment service
//!
//! This is the main entry point for the fixhub binary. It parses the command
//! line, loads configuration, installs logging and dispatches to the command
//! handlers.

use clap::Parser;
use fixhub::cli::{Cli, Commands, OutputFormatter, handlers};
use fixhub::config::Config;
use fixhub::error::{FixhubError, Result};
use std::process;
use tracing_subscriber::EnvFilter;

/// Main entry point for the fixhub CLI
fn main() {
    let cli = Cli::parse();
    let formatter = OutputFormatter::new(cli.json, cli.no_color);

    if let Err(e) = run(cli, &formatter) {
        handle_error(&e, &formatter);
        process::exit(1);
    }
}

/// Load configuration, set up logging and run the requested command
fn run(cli: Cli, formatter: &OutputFormatter) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);
    dispatch_command(cli.command, config, formatter)
}

/// `RUST_LOG` wins over `logging.level`; `--verbose` forces debug
fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    // Logs go to stderr so JSON output on stdout stays parseable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn dispatch_command(command: Commands, config: Config, formatter: &OutputFormatter) -> Result<()> {
    match command {
        #[cfg(feature = "api")]
        Commands::Serve { host, port } => {
            handlers::handle_serve_command(config, host, port, formatter)
        },
        Commands::Config { command } => {
            handlers::handle_config_command(&command, &config, formatter)
        },
        Commands::Check => handlers::handle_check_command(&config, formatter),
    }
}

/// Handle errors and display them to the user
///
/// Prints the user-facing message and any suggestions; in JSON mode the
/// error is also emitted as a JSON document on stdout.
fn handle_error(error: &FixhubError, formatter: &OutputFormatter) {
    formatter.error(&error.user_message());

    let suggestions = error.suggestions();
    if !suggestions.is_empty() && !formatter.is_json() {
        formatter.info("\nSuggestions:");
        for suggestion in &suggestions {
            formatter.info(&format!("  • {suggestion}"));
        }
    }

    if formatter.is_json() {
        let _ = formatter.print_json(&serde_json::json!({
            "status": "error",
            "error": error.kind().as_str(),
            "message": error.user_message(),
            "suggestions": suggestions,
            "recoverable": error.is_recoverable(),
            "is_config_error": error.is_config_error(),
        }));
    }

    if tracing::enabled!(tracing::Level::DEBUG) {
        eprintln!("\nDebug information:");
        eprintln!("{error:?}");
    }
}
