//! The search scheduler.
//!
//! One tokio task owns the filter panel, the dependency links, the pager,
//! and the scheduling state. Everything else talks to it through a
//! [`SchedulerHandle`]. Work that has to await (the remote search and
//! dependent option loads) runs in spawned tasks which report back on a
//! completion channel, tagged with the generation they were started under.
//!
//! Scheduling rules:
//! - A qualifying filter change (re)starts the debounce deadline.
//! - When the deadline passes, a fresh search runs unless one is in flight.
//! - At most one search is in flight. Changes and manual searches arriving
//!   meanwhile are remembered and start a new debounce cycle once it resolves.
//! - Until [`SchedulerHandle::ready`] is called, controls are updated but
//!   nothing triggers a search.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::filter::builder::{FilterPanel, FilterStateBuilder};
use crate::filter::control::{Control, ControlEvent};
use crate::filter::dependency::{DependencyResolver, LoadOutcome, LoadedOptions};
use crate::filter::resolver::ValueResolver;
use crate::query::QueryCompiler;
use crate::remote::IssueTracker;
use crate::search::pager::{self, ResultPager};
use crate::search::trigger::TriggerPolicy;
use crate::types::{
    FilterKind, ResultPage, SearchFailure, SearchMode, SearchRequest, SearchResponse, SelectOption,
};

/// Everything the scheduler needs besides the panel and the tracker
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub debounce: Duration,
    pub page_size: u32,
    pub primary_field: String,
    pub remote_timeout: Duration,
    pub builder: FilterStateBuilder,
    pub compiler: QueryCompiler,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            page_size: config.search.page_size,
            primary_field: config.search.primary_field.clone(),
            remote_timeout: config.remote_timeout(),
            builder: FilterStateBuilder::new(ValueResolver::from_config(&config.ui)),
            compiler: QueryCompiler::from_config(config),
        }
    }
}

/// How one search request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Page(ResultPage),
    /// The previous page and query are still current
    Failed(SearchFailure),
}

/// Callbacks into the surrounding UI
pub trait SearchObserver: Send + Sync + 'static {
    /// Called exactly once per dispatched request
    fn on_search_resolved(&self, outcome: &SearchOutcome);

    /// Brackets the in-flight period
    fn on_controls_should_disable(&self, disabled: bool);

    /// The filters could not be compiled; nothing was dispatched
    fn on_validation_error(&self, failure: &SearchFailure);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Resolved(SearchOutcome),
    ControlsDisabled(bool),
    ValidationError(SearchFailure),
}

/// Observer that forwards every callback into a channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    events: mpsc::UnboundedSender<SchedulerEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SchedulerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { events }, rx)
    }

    fn send(&self, event: SchedulerEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.events.send(event);
    }
}

impl SearchObserver for ChannelObserver {
    fn on_search_resolved(&self, outcome: &SearchOutcome) {
        self.send(SchedulerEvent::Resolved(outcome.clone()));
    }

    fn on_controls_should_disable(&self, disabled: bool) {
        self.send(SchedulerEvent::ControlsDisabled(disabled));
    }

    fn on_validation_error(&self, failure: &SearchFailure) {
        self.send(SchedulerEvent::ValidationError(failure.clone()));
    }
}

/// Read-only copy of one control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlView {
    pub name: String,
    pub kind: FilterKind,
    pub displayed: String,
    pub value: Option<String>,
    pub enabled: bool,
    pub options: Vec<SelectOption>,
}

/// Read-only copy of the scheduler's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub mode: SearchMode,
    pub raw_query: String,
    pub controls: Vec<ControlView>,
    pub ready: bool,
    pub searching: bool,
    pub search_pending: bool,
    pub current_query: Option<String>,
    pub page: Option<ResultPage>,
}

impl PanelView {
    pub fn control(&self, name: &str) -> Option<&ControlView> {
        self.controls.iter().find(|c| c.name == name)
    }
}

#[derive(Debug)]
enum PageTarget {
    Page(u32),
    Next,
    Previous,
}

#[derive(Debug)]
enum Command {
    Ready,
    Control(ControlEvent),
    SetRawQuery(String),
    SetMode(SearchMode),
    Search,
    Page(PageTarget),
    View(oneshot::Sender<PanelView>),
}

#[derive(Debug)]
enum Completion {
    Search {
        generation: u64,
        request: SearchRequest,
        result: Result<SearchResponse>,
    },
    Options(LoadedOptions),
}

/// Cloneable front door to a running scheduler
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| DeckError::SchedulerClosed)
    }

    /// Initial population is done; filter changes may trigger searches
    pub fn ready(&self) -> Result<()> {
        self.send(Command::Ready)
    }

    pub fn apply(&self, event: ControlEvent) -> Result<()> {
        self.send(Command::Control(event))
    }

    pub fn select(&self, control: &str, display: &str) -> Result<()> {
        self.apply(ControlEvent::Select {
            control: control.to_string(),
            display: display.to_string(),
        })
    }

    pub fn set_text(&self, control: &str, text: &str) -> Result<()> {
        self.apply(ControlEvent::SetText {
            control: control.to_string(),
            text: text.to_string(),
        })
    }

    pub fn set_date(&self, control: &str, date: Option<jiff::civil::Date>) -> Result<()> {
        self.apply(ControlEvent::SetDate {
            control: control.to_string(),
            date,
        })
    }

    pub fn set_date_enabled(&self, control: &str, checked: bool) -> Result<()> {
        self.apply(ControlEvent::SetDateChecked {
            control: control.to_string(),
            checked,
        })
    }

    pub fn set_options(&self, control: &str, options: Vec<SelectOption>) -> Result<()> {
        self.apply(ControlEvent::SetOptions {
            control: control.to_string(),
            options,
        })
    }

    pub fn set_raw_query(&self, raw: &str) -> Result<()> {
        self.send(Command::SetRawQuery(raw.to_string()))
    }

    pub fn set_mode(&self, mode: SearchMode) -> Result<()> {
        self.send(Command::SetMode(mode))
    }

    /// Manual trigger (search button or Enter key)
    pub fn search(&self) -> Result<()> {
        self.send(Command::Search)
    }

    pub fn go_to_page(&self, page: u32) -> Result<()> {
        self.send(Command::Page(PageTarget::Page(page)))
    }

    pub fn next_page(&self) -> Result<()> {
        self.send(Command::Page(PageTarget::Next))
    }

    pub fn previous_page(&self) -> Result<()> {
        self.send(Command::Page(PageTarget::Previous))
    }

    pub async fn view(&self) -> Result<PanelView> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::View(tx))?;
        rx.await.map_err(|_| DeckError::SchedulerClosed)
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    ready: bool,
    /// Generation of the search in flight
    in_flight: Option<u64>,
    deadline: Option<Instant>,
    rerun_after_flight: bool,
}

pub struct SearchScheduler<T, O> {
    tracker: Arc<T>,
    observer: O,
    panel: FilterPanel,
    dependencies: DependencyResolver,
    settings: SchedulerSettings,
    pager: ResultPager,
    trigger: TriggerPolicy,
    state: SchedulerState,
    search_generation: u64,
    completions: mpsc::UnboundedSender<Completion>,
}

impl<T, O> SearchScheduler<T, O>
where
    T: IssueTracker + 'static,
    O: SearchObserver,
{
    /// Validate the setup and start the owner task. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        tracker: Arc<T>,
        panel: FilterPanel,
        dependencies: DependencyResolver,
        observer: O,
        settings: SchedulerSettings,
    ) -> Result<SchedulerHandle> {
        dependencies.validate(&panel)?;
        if !panel.contains(&settings.primary_field) {
            tracing::warn!(
                field = %settings.primary_field,
                "primary field is not a registered control"
            );
        }

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let scheduler = Self {
            tracker,
            observer,
            panel,
            dependencies,
            pager: ResultPager::new(settings.page_size),
            trigger: TriggerPolicy::new(settings.primary_field.clone()),
            settings,
            state: SchedulerState::default(),
            search_generation: 0,
            completions: completions_tx,
        };
        tokio::spawn(scheduler.run(commands_rx, completions_rx));

        Ok(SchedulerHandle {
            commands: commands_tx,
        })
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            let deadline = self.state.deadline;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = sleep_until(deadline), if deadline.is_some() => self.on_deadline(),
            }
        }
        tracing::debug!("search scheduler stopped");
    }

    fn resolver(&self) -> &ValueResolver {
        self.settings.builder.resolver()
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Ready => {
                if !self.state.ready {
                    self.state.ready = true;
                    tracing::debug!("search scheduler ready");
                }
            }
            Command::Control(event) => self.on_control(event),
            Command::SetRawQuery(raw) => self.panel.set_raw_query(&raw),
            Command::SetMode(mode) => self.panel.set_mode(mode),
            Command::Search => self.on_manual_search(),
            Command::Page(target) => self.on_page(target),
            Command::View(reply) => {
                let _ = reply.send(self.view());
            }
        }
    }

    fn on_control(&mut self, event: ControlEvent) {
        let name = event.control().to_string();
        let changed = match self.panel.apply(&event) {
            Ok(changed) => changed,
            Err(e) => {
                tracing::warn!(control = %name, error = %e, "ignoring control event");
                return;
            }
        };
        if !changed {
            return;
        }

        if self.dependencies.has_children(&name) {
            let loads = self.dependencies.on_parent_changed(
                &name,
                &mut self.panel,
                self.settings.builder.resolver(),
            );
            for load in loads {
                let completions = self.completions.clone();
                let child = load.child.clone();
                let generation = load.generation;
                tokio::spawn(async move {
                    let loaded = AssertUnwindSafe(load.run())
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| LoadedOptions {
                            child,
                            generation,
                            result: Err(DeckError::Other("option loader panicked".to_string())),
                        });
                    let _ = completions.send(Completion::Options(loaded));
                });
            }
        }

        if !event.is_filter_change() {
            return;
        }
        if !self.state.ready {
            tracing::debug!(control = %name, "suppressing auto-search until ready");
            return;
        }
        if !self
            .trigger
            .qualifies(&name, &self.panel, self.settings.builder.resolver())
        {
            tracing::debug!(control = %name, "change does not qualify for auto-search");
            return;
        }

        self.note_pending_change();
    }

    /// Debounce, or remember the change for after the in-flight search
    fn note_pending_change(&mut self) {
        if self.state.in_flight.is_some() {
            self.state.rerun_after_flight = true;
            return;
        }
        self.state.deadline = Some(Instant::now() + self.settings.debounce);
    }

    fn on_deadline(&mut self) {
        self.state.deadline = None;
        if !self.state.ready {
            return;
        }
        if self.state.in_flight.is_some() {
            self.state.rerun_after_flight = true;
            return;
        }
        self.run_fresh_search();
    }

    fn on_manual_search(&mut self) {
        if !self.state.ready {
            tracing::debug!("dropping manual search before ready");
            return;
        }
        self.state.deadline = None;
        if self.state.in_flight.is_some() {
            self.state.rerun_after_flight = true;
            return;
        }
        self.run_fresh_search();
    }

    fn on_page(&mut self, target: PageTarget) {
        if !self.state.ready {
            tracing::debug!("dropping page change before ready");
            return;
        }
        if self.state.in_flight.is_some() {
            tracing::debug!(?target, "dropping page change while a search is in flight");
            return;
        }

        let request = match target {
            PageTarget::Page(n) => self.pager.page_request(n),
            PageTarget::Next => self.pager.next_request(),
            PageTarget::Previous => self.pager.previous_request(),
        };
        match request {
            Some(request) => self.dispatch(request),
            None => tracing::debug!("no page to navigate to"),
        }
    }

    fn run_fresh_search(&mut self) {
        let filters = self
            .settings
            .builder
            .build(self.panel.mode(), &self.panel);
        match self.settings.compiler.compile(&filters) {
            Ok(query) => {
                let request = self.pager.fresh_request(query);
                self.dispatch(request);
            }
            Err(e) => {
                tracing::warn!(error = %e, "search not dispatched");
                self.observer.on_validation_error(&SearchFailure::from(&e));
            }
        }
    }

    fn dispatch(&mut self, request: SearchRequest) {
        self.search_generation += 1;
        let generation = self.search_generation;
        self.state.in_flight = Some(generation);
        self.panel.set_all_enabled(false);
        self.observer.on_controls_should_disable(true);

        tracing::info!(
            query = %request.query,
            page = request.page,
            offset = request.offset(),
            generation,
            "dispatching search"
        );

        let tracker = Arc::clone(&self.tracker);
        let completions = self.completions.clone();
        let timeout = self.settings.remote_timeout;
        tokio::spawn(async move {
            let result = AssertUnwindSafe(pager::execute(tracker.as_ref(), &request, timeout))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(DeckError::Other("search task panicked".to_string())));
            let _ = completions.send(Completion::Search {
                generation,
                request,
                result,
            });
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Search {
                generation,
                request,
                result,
            } => self.on_search_finished(generation, request, result),
            Completion::Options(loaded) => {
                if self.dependencies.complete(loaded, &mut self.panel) != LoadOutcome::Stale
                    && self.state.in_flight.is_some()
                {
                    self.panel.set_all_enabled(false);
                }
            }
        }
    }

    fn on_search_finished(
        &mut self,
        generation: u64,
        request: SearchRequest,
        result: Result<SearchResponse>,
    ) {
        if self.state.in_flight != Some(generation) {
            tracing::debug!(generation, "discarding stale search result");
            return;
        }
        self.state.in_flight = None;

        let outcome = match result {
            Ok(response) => {
                let page = self.pager.accept(request, response);
                tracing::info!(total = page.total, page = page.page, "search resolved");
                SearchOutcome::Page(page)
            }
            Err(e) => {
                tracing::warn!(error = %e, "search failed, keeping previous results");
                SearchOutcome::Failed(SearchFailure::from(&e))
            }
        };

        self.panel.set_all_enabled(true);
        self.observer.on_search_resolved(&outcome);
        self.observer.on_controls_should_disable(false);

        if std::mem::take(&mut self.state.rerun_after_flight) {
            self.state.deadline = Some(Instant::now() + self.settings.debounce);
        }
    }

    fn view(&self) -> PanelView {
        let resolver = self.resolver();
        PanelView {
            mode: self.panel.mode(),
            raw_query: self.panel.raw_query().to_string(),
            controls: self
                .panel
                .controls()
                .map(|control| ControlView {
                    name: control.name().to_string(),
                    kind: control.kind(),
                    displayed: control.displayed_text(),
                    value: control.current_canonical_value(resolver),
                    enabled: control.is_enabled(),
                    options: control.options().to_vec(),
                })
                .collect(),
            ready: self.state.ready,
            searching: self.state.in_flight.is_some(),
            search_pending: self.state.deadline.is_some() || self.state.rerun_after_flight,
            current_query: self.pager.current_query().map(|q| q.to_string()),
            page: self.pager.current_page().cloned(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Fill each named selector with its options from the tracker. A field
/// whose options fail to load keeps only "show all".
pub async fn populate_selectors<T: IssueTracker>(
    tracker: &T,
    handle: &SchedulerHandle,
    fields: &[String],
) -> Result<()> {
    let loads = fields.iter().map(|field| async move {
        let options = tracker.load_options(field).await;
        (field, options)
    });

    for (field, options) in futures::future::join_all(loads).await {
        let options = options.unwrap_or_else(|e| {
            tracing::warn!(field = %field, error = %e, "failed to load options");
            Vec::new()
        });
        handle.set_options(field, options)?;
    }
    Ok(())
}
