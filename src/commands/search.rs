use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::json;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tokio::sync::mpsc;

use super::{CommandOutput, filter_events, panel_for};
use crate::cli::{FilterArgs, OutputOptions};
use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::filter::DependencyResolver;
use crate::remote::JiraClient;
use crate::search::{
    ChannelObserver, SchedulerEvent, SchedulerHandle, SchedulerSettings, SearchOutcome,
    SearchScheduler, populate_selectors,
};
use crate::types::{Issue, ResultPage};

use super::query::compile_filters;

/// A row in the search results table
#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Summary")]
    summary: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl From<&Issue> for IssueRow {
    fn from(issue: &Issue) -> Self {
        Self {
            key: issue.key.clone(),
            status: issue.status.clone(),
            summary: issue.summary.clone(),
            assignee: issue.assignee.clone().unwrap_or_else(|| "-".to_string()),
            updated: issue
                .updated
                .as_deref()
                .map(|u| u.chars().take(10).collect())
                .unwrap_or_default(),
        }
    }
}

/// Wait for the next resolved search, turning failures into errors
async fn next_page(events: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> Result<ResultPage> {
    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::Resolved(SearchOutcome::Page(page)) => return Ok(page),
            SchedulerEvent::Resolved(SearchOutcome::Failed(failure)) => {
                return Err(DeckError::Other(failure.to_string()));
            }
            SchedulerEvent::ValidationError(failure) => {
                return Err(DeckError::Other(failure.message));
            }
            SchedulerEvent::ControlsDisabled(_) => {}
        }
    }
    Err(DeckError::SchedulerClosed)
}

async fn apply_filters(
    tracker: &JiraClient,
    handle: &SchedulerHandle,
    args: &FilterArgs,
) -> Result<()> {
    // Option lists let display names resolve to canonical values
    let names: Vec<String> = args.filters.iter().map(|(name, _)| name.clone()).collect();
    populate_selectors(tracker, handle, &names).await?;

    for event in filter_events(args) {
        handle.apply(event)?;
    }
    handle.set_mode(args.effective_mode())?;
    if let Some(ref raw) = args.raw {
        handle.set_raw_query(raw)?;
    }
    Ok(())
}

/// Search the tracker and print one page of results
pub async fn cmd_search(args: &FilterArgs, page: u32, output: OutputOptions) -> Result<()> {
    let config = Config::load()?;

    // Reject invalid filters before touching the network
    compile_filters(&config, args)?;

    let tracker = Arc::new(JiraClient::from_config(&config)?);
    let (observer, mut events) = ChannelObserver::new();
    let handle = SearchScheduler::spawn(
        Arc::clone(&tracker),
        panel_for(&config, args),
        DependencyResolver::new(),
        observer,
        SchedulerSettings::from_config(&config),
    )?;

    apply_filters(&tracker, &handle, args).await?;
    handle.ready()?;
    handle.search()?;
    let mut result = next_page(&mut events).await?;

    if page > 1 && result.page_count() > 1 {
        handle.go_to_page(page)?;
        result = next_page(&mut events).await?;
    }

    let view = handle.view().await?;
    let query = view.current_query.unwrap_or_default();

    let json_output = json!({
        "query": query,
        "page": result.page,
        "page_count": result.page_count(),
        "page_size": result.page_size,
        "total": result.total,
        "has_previous": result.has_previous(),
        "has_next": result.has_next(),
        "issues": result.issues,
    });

    let mut text = String::new();
    text.push_str(&format!("{}\n", query.dimmed()));
    if result.issues.is_empty() {
        text.push_str("No issues found");
    } else {
        let rows: Vec<IssueRow> = result.issues.iter().map(IssueRow::from).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        text.push_str(&table.to_string());
    }
    text.push('\n');

    let mut nav = format!(
        "Page {} of {} ({} issues)",
        result.page,
        result.page_count(),
        result.total
    );
    if result.has_next() {
        nav.push_str(&format!(" · next: --page {}", result.page + 1));
    }
    text.push_str(&nav.cyan().to_string());

    CommandOutput::new(json_output).with_text(text).print(output)
}
