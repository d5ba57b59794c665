//! Command implementations behind the `issuedeck` binary.

mod config;
mod query;
mod search;

pub use config::{cmd_config_path, cmd_config_set, cmd_config_show};
pub use query::cmd_query;
pub use search::cmd_search;

use serde_json::Value;

use crate::cli::{FilterArgs, OutputOptions};
use crate::config::Config;
use crate::error::Result;
use crate::filter::{ControlEvent, FilterPanel, TEXT_CONTROL};

/// What a command prints: JSON always, plus an optional human-readable form
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output: OutputOptions) -> Result<()> {
        match self.text {
            Some(text) if !output.json => println!("{text}"),
            _ => print_json(&self.json)?,
        }
        Ok(())
    }
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The standard panel for the configured fields, plus a selector for any
/// `--filter` name the config does not know
pub(crate) fn panel_for(config: &Config, args: &FilterArgs) -> FilterPanel {
    let mut names: Vec<String> = config.query.fields.keys().cloned().collect();
    if !names.contains(&config.search.primary_field) {
        names.insert(0, config.search.primary_field.clone());
    }
    for (name, _) in &args.filters {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    FilterPanel::standard(names)
}

/// The control events that reproduce `args` on a fresh panel
pub(crate) fn filter_events(args: &FilterArgs) -> Vec<ControlEvent> {
    let mut events: Vec<ControlEvent> = args
        .filters
        .iter()
        .map(|(name, value)| ControlEvent::Select {
            control: name.clone(),
            display: value.clone(),
        })
        .collect();

    if let Some(ref text) = args.text {
        events.push(ControlEvent::SetText {
            control: TEXT_CONTROL.to_string(),
            text: text.clone(),
        });
    }

    for (control, date) in args.dates() {
        if let Some(date) = date {
            events.push(ControlEvent::SetDate {
                control: control.to_string(),
                date: Some(date),
            });
            events.push(ControlEvent::SetDateChecked {
                control: control.to_string(),
                checked: true,
            });
        }
    }

    events
}
