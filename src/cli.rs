use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use jiff::civil::Date;
use std::io;

use crate::types::{SearchMode, VALID_MODES};

#[derive(Parser)]
#[command(name = "issuedeck")]
#[command(about = "Filter-driven issue search for remote ticket trackers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search the tracker with the given filters
    #[command(visible_alias = "s")]
    Search {
        #[command(flatten)]
        filters: FilterArgs,

        /// Result page to show (clamped to the available pages)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Print the query the filters compile to, without searching
    #[command(visible_alias = "q")]
    Query {
        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        #[command(flatten)]
        output: OutputOptions,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., search.page_size)
        key: String,

        /// Value to set
        value: String,
    },

    /// Print the path of the project config file
    Path,
}

/// Output format flags shared by every command that prints results
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// The filter panel, expressed as command-line flags
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Categorical filter, e.g. --filter Cliente=Acme (repeatable)
    #[arg(short, long = "filter", value_name = "NAME=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,

    /// Free text, or a ticket key such as CC-123
    #[arg(short, long)]
    pub text: Option<String>,

    /// Created on or after (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub created_from: Option<Date>,

    /// Created on or before (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub created_to: Option<Date>,

    /// Completed on or after (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub completed_from: Option<Date>,

    /// Completed on or before (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub completed_to: Option<Date>,

    /// Raw query, used verbatim
    #[arg(long, value_name = "QUERY")]
    pub raw: Option<String>,

    /// Search mode: basic, date, raw (inferred from the other flags when omitted)
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<SearchMode>,
}

impl FilterArgs {
    pub fn dates(&self) -> [(&'static str, Option<Date>); 4] {
        use crate::filter::{COMPLETED_FROM, COMPLETED_TO, CREATED_FROM, CREATED_TO};
        [
            (CREATED_FROM, self.created_from),
            (CREATED_TO, self.created_to),
            (COMPLETED_FROM, self.completed_from),
            (COMPLETED_TO, self.completed_to),
        ]
    }

    /// Explicit `--mode`, else raw when `--raw` is given, date when any
    /// date is given, basic otherwise
    pub fn effective_mode(&self) -> SearchMode {
        if let Some(mode) = self.mode {
            return mode;
        }
        if self.raw.is_some() {
            SearchMode::Raw
        } else if self.dates().iter().any(|(_, d)| d.is_some()) {
            SearchMode::Date
        } else {
            SearchMode::Basic
        }
    }
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("filter name is empty in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

fn parse_date(s: &str) -> Result<Date, String> {
    s.trim()
        .parse::<Date>()
        .map_err(|e| format!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}

fn parse_mode(s: &str) -> Result<SearchMode, String> {
    s.parse().map_err(|_| {
        format!(
            "invalid mode '{}'. Must be one of: {}",
            s,
            VALID_MODES.join(", ")
        )
    })
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "issuedeck", &mut io::stdout());
}
