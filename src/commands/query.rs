use serde_json::json;

use super::{CommandOutput, filter_events, panel_for};
use crate::cli::{FilterArgs, OutputOptions};
use crate::config::Config;
use crate::error::Result;
use crate::filter::{FilterPanel, FilterStateBuilder, ValueResolver};
use crate::query::QueryCompiler;
use crate::types::{CompiledQuery, SearchMode};

/// Build the panel described by `args` and compile it
pub(crate) fn compile_filters(
    config: &Config,
    args: &FilterArgs,
) -> Result<(FilterPanel, CompiledQuery)> {
    let mut panel = panel_for(config, args);
    for event in filter_events(args) {
        panel.apply(&event)?;
    }
    let mode = args.effective_mode();
    panel.set_mode(mode);
    if let Some(ref raw) = args.raw {
        panel.set_raw_query(raw);
    }

    let builder = FilterStateBuilder::new(ValueResolver::from_config(&config.ui));
    let filters = builder.build(mode, &panel);
    let query = QueryCompiler::from_config(config).compile(&filters)?;
    Ok((panel, query))
}

/// Print the query the given filters compile to
pub fn cmd_query(args: &FilterArgs, output: OutputOptions) -> Result<()> {
    let config = Config::load()?;
    let (panel, query) = compile_filters(&config, args)?;
    let mode: SearchMode = panel.mode();

    CommandOutput::new(json!({
        "mode": mode.to_string(),
        "query": query.as_str(),
    }))
    .with_text(query.to_string())
    .print(output)
}
