use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use issuedeck::cli::{Cli, Commands, ConfigAction, generate_completions};
use issuedeck::commands::{
    cmd_config_path, cmd_config_set, cmd_config_show, cmd_query, cmd_search,
};

const LOG_ENV: &str = "ISSUEDECK_LOG";

/// Log to stderr, filtered by ISSUEDECK_LOG, then RUST_LOG, then `warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Search {
            filters,
            page,
            output,
        } => cmd_search(&filters, page, output).await,
        Commands::Query { filters, output } => cmd_query(&filters, output),
        Commands::Config { action } => match action {
            ConfigAction::Show { output } => cmd_config_show(output),
            ConfigAction::Set { key, value } => cmd_config_set(&key, &value),
            ConfigAction::Path => cmd_config_path(),
        },
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
