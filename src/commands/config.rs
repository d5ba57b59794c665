//! Configuration commands.
//!
//! - `config show`: Display current configuration
//! - `config set`: Set a configuration value
//! - `config path`: Print the project config file location

use owo_colors::OwoColorize;
use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::config::Config;
use crate::error::Result;

/// Mask a sensitive value by showing only the first 2 and last 2 characters
fn mask_sensitive_value(value: &str) -> String {
    let char_count = value.chars().count();
    if char_count > 4 {
        let first: String = value.chars().take(2).collect();
        let last: String = value.chars().skip(char_count - 2).collect();
        format!("{first}...{last}")
    } else {
        "****".to_string()
    }
}

fn or_unset(value: Option<String>) -> String {
    value.unwrap_or_else(|| "not configured".dimmed().to_string())
}

/// Show current configuration
pub fn cmd_config_show(output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let base_url = config.base_url().ok().map(|u| u.to_string());
    let token = config.token().map(|t| mask_sensitive_value(&t));

    let json_output = json!({
        "remote": {
            "base_url": base_url,
            "project": config.remote.project,
        },
        "auth": {
            "token_configured": token.is_some(),
        },
        "remote_timeout": config.remote_timeout,
        "search": {
            "debounce_ms": config.search.debounce_ms,
            "page_size": config.search.page_size,
            "primary_field": config.search.primary_field,
        },
        "query": {
            "order_by": config.query.order_by,
            "terminal_statuses": config.query.terminal_statuses,
            "fields": config.query.fields,
        },
        "config_file": Config::config_path().to_string_lossy(),
    });

    let mut text = String::new();
    text.push_str(&format!("{}\n\n", "Configuration:".cyan().bold()));

    text.push_str(&format!("{}:\n", "remote".cyan()));
    text.push_str(&format!("  base_url: {}\n", or_unset(base_url)));
    text.push_str(&format!("  project: {}\n", config.remote.project));
    text.push_str(&format!("  timeout: {}s\n\n", config.remote_timeout));

    text.push_str(&format!("{}:\n", "auth".cyan()));
    text.push_str(&format!("  token: {}\n\n", or_unset(token)));

    text.push_str(&format!("{}:\n", "search".cyan()));
    text.push_str(&format!("  debounce_ms: {}\n", config.search.debounce_ms));
    text.push_str(&format!("  page_size: {}\n", config.search.page_size));
    text.push_str(&format!("  primary_field: {}\n\n", config.search.primary_field));

    text.push_str(&format!("{}:\n", "query".cyan()));
    text.push_str(&format!("  order_by: {}\n", config.query.order_by));
    for (name, field) in &config.query.fields {
        text.push_str(&format!("  {name} -> {field}\n"));
    }

    text.push('\n');
    text.push_str(&format!(
        "{}",
        format!("Config file: {}", Config::config_path().display()).dimmed()
    ));

    CommandOutput::new(json_output).with_text(text).print(output)
}

/// Set a configuration value
pub fn cmd_config_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;

    let shown = if key == "auth.token" {
        mask_sensitive_value(value)
    } else {
        value.to_string()
    };
    println!("Set {} = {}", key.cyan(), shown);
    Ok(())
}

/// Print the project config file path
pub fn cmd_config_path() -> Result<()> {
    println!("{}", Config::config_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_sensitive_value() {
        assert_eq!(mask_sensitive_value("tok_abcdef"), "to...ef");
        assert_eq!(mask_sensitive_value("abcd"), "****");
    }
}
