//! Tests for the search scheduler, run on a paused tokio clock against an
//! in-memory tracker: debounce, single-flight, start-up suppression,
//! paging, failure handling, and dependent reloads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};

use crate::config::Config;
use crate::error::{DeckError, Result};
use crate::filter::builder::{FilterPanel, TEXT_CONTROL};
use crate::filter::dependency::{DependencyLink, DependencyResolver, FnLoader, OptionLoader};
use crate::remote::IssueTracker;
use crate::search::scheduler::{
    ChannelObserver, SchedulerEvent, SchedulerHandle, SchedulerSettings, SearchOutcome,
    SearchScheduler, populate_selectors,
};
use crate::types::{CompiledQuery, Issue, SearchMode, SearchResponse, SelectOption};

// ============================================================================
// Helpers
// ============================================================================

const DEBOUNCE: Duration = Duration::from_millis(400);

const ACME_QUERY: &str = r#""Cliente" = "Acme" ORDER BY updated DESC"#;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recorded {
    query: String,
    offset: u32,
    limit: u32,
}

struct FakeTracker {
    requests: Mutex<Vec<Recorded>>,
    total: u32,
    fail: AtomicBool,
    gate: Semaphore,
}

impl FakeTracker {
    fn new(total: u32) -> Arc<Self> {
        Arc::new(Self::with_gate(total, Semaphore::MAX_PERMITS))
    }

    /// Searches block until `release` is called
    fn gated(total: u32) -> Arc<Self> {
        Arc::new(Self::with_gate(total, 0))
    }

    fn with_gate(total: u32, permits: usize) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            total,
            fail: AtomicBool::new(false),
            gate: Semaphore::new(permits),
        }
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

impl IssueTracker for FakeTracker {
    async fn search_issues(
        &self,
        query: &CompiledQuery,
        offset: u32,
        limit: u32,
    ) -> Result<SearchResponse> {
        self.requests.lock().unwrap().push(Recorded {
            query: query.to_string(),
            offset,
            limit,
        });
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(DeckError::Api("connection reset".to_string()));
        }

        let issues = (offset..(offset + limit).min(self.total))
            .map(|n| Issue {
                key: format!("CC-{}", n + 1),
                summary: format!("issue {}", n + 1),
                status: "Open".to_string(),
                assignee: None,
                updated: None,
            })
            .collect();
        Ok(SearchResponse {
            issues,
            total: self.total,
        })
    }

    async fn load_options(&self, field: &str) -> Result<Vec<SelectOption>> {
        if field == "Area" {
            return Err(DeckError::Api("no autocomplete for Area".to_string()));
        }
        Ok(vec![SelectOption::new("Acme Corp", "10042")])
    }

    async fn load_child_options(
        &self,
        _field: &str,
        _parent_field: &str,
        _parent_value: Option<&str>,
    ) -> Result<Vec<SelectOption>> {
        Ok(vec![])
    }
}

fn panel() -> FilterPanel {
    FilterPanel::standard(["Cliente", "Area", "Stato"])
}

fn start(
    tracker: &Arc<FakeTracker>,
    dependencies: DependencyResolver,
) -> (SchedulerHandle, mpsc::UnboundedReceiver<SchedulerEvent>) {
    let (observer, events) = ChannelObserver::new();
    let handle = SearchScheduler::spawn(
        Arc::clone(tracker),
        panel(),
        dependencies,
        observer,
        SchedulerSettings::from_config(&Config::default()),
    )
    .unwrap();
    (handle, events)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> SchedulerEvent {
    tokio::time::timeout(Duration::from_secs(600), events.recv())
        .await
        .expect("timed out waiting for a scheduler event")
        .expect("scheduler stopped")
}

async fn next_outcome(events: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> SearchOutcome {
    loop {
        if let SchedulerEvent::Resolved(outcome) = next_event(events).await {
            return outcome;
        }
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}

// ============================================================================
// Debounce
// ============================================================================

/// Three quick changes produce one request built from the last one.
#[tokio::test(start_paused = true)]
async fn test_debounce_collapses_rapid_changes() {
    let tracker = FakeTracker::new(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Cliente", "Initech").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.select("Cliente", "Globex").unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.select("Cliente", "Acme").unwrap();

    tokio::time::sleep(DEBOUNCE - Duration::from_millis(1)).await;
    handle.view().await.unwrap();
    assert!(tracker.requests().is_empty());

    next_outcome(&mut events).await;
    settle().await;

    let requests = tracker.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].query, ACME_QUERY);
}

/// Pressing search while the quiet period runs fires at once and cancels
/// the timer.
#[tokio::test(start_paused = true)]
async fn test_manual_search_cancels_pending_timer() {
    let tracker = FakeTracker::new(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Cliente", "Acme").unwrap();
    handle.search().unwrap();
    next_outcome(&mut events).await;
    settle().await;

    assert_eq!(tracker.requests().len(), 1);
    assert!(!handle.view().await.unwrap().search_pending);
}

#[tokio::test(start_paused = true)]
async fn test_secondary_change_after_clearing_everything_does_not_search() {
    let tracker = FakeTracker::new(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Area", "Backend").unwrap();
    next_outcome(&mut events).await;

    handle.select("Area", "All").unwrap();
    settle().await;
    assert_eq!(tracker.requests().len(), 1);
}

// ============================================================================
// Single-flight
// ============================================================================

/// Changes during a search wait for it and then run once.
#[tokio::test(start_paused = true)]
async fn test_single_flight_with_rerun() {
    let tracker = FakeTracker::gated(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Cliente", "Acme").unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;
    assert_eq!(tracker.requests().len(), 1);
    assert!(handle.view().await.unwrap().searching);

    handle.select("Stato", "Aperto").unwrap();
    handle.search().unwrap();
    tokio::time::sleep(DEBOUNCE * 5).await;
    assert_eq!(tracker.requests().len(), 1);

    tracker.release(10);
    next_outcome(&mut events).await;
    next_outcome(&mut events).await;
    settle().await;

    let requests = tracker.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].query,
        r#""Cliente" = "Acme" AND status = "Open" ORDER BY updated DESC"#
    );
}

#[tokio::test(start_paused = true)]
async fn test_controls_disabled_for_flight_duration() {
    let tracker = FakeTracker::gated(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Cliente", "Acme").unwrap();
    handle.search().unwrap();
    assert_eq!(next_event(&mut events).await, SchedulerEvent::ControlsDisabled(true));

    let view = handle.view().await.unwrap();
    assert!(view.controls.iter().all(|c| !c.enabled));

    tracker.release(1);
    assert!(matches!(
        next_event(&mut events).await,
        SchedulerEvent::Resolved(SearchOutcome::Page(_))
    ));
    assert_eq!(next_event(&mut events).await, SchedulerEvent::ControlsDisabled(false));
    assert!(handle.view().await.unwrap().controls.iter().all(|c| c.enabled));
}

// ============================================================================
// Start-up suppression
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_no_search_before_ready() {
    let tracker = FakeTracker::new(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());

    handle.select("Cliente", "Acme").unwrap();
    handle.search().unwrap();
    settle().await;
    assert!(tracker.requests().is_empty());

    let view = handle.view().await.unwrap();
    assert!(!view.ready);
    assert_eq!(view.control("Cliente").unwrap().displayed, "Acme");

    handle.ready().unwrap();
    handle.select("Area", "Backend").unwrap();
    next_outcome(&mut events).await;
    assert_eq!(tracker.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_populate_selectors_before_ready() {
    let tracker = FakeTracker::new(3);
    let (handle, _events) = start(&tracker, DependencyResolver::new());

    populate_selectors(
        tracker.as_ref(),
        &handle,
        &["Cliente".to_string(), "Area".to_string()],
    )
    .await
    .unwrap();
    handle.select("Cliente", "Acme Corp").unwrap();
    settle().await;

    let view = handle.view().await.unwrap();
    assert!(tracker.requests().is_empty());
    assert_eq!(view.control("Cliente").unwrap().value.as_deref(), Some("10042"));
    assert_eq!(view.control("Area").unwrap().options.len(), 1);
}

// ============================================================================
// Paging
// ============================================================================

/// Paging reuses the searched query even after the filters were edited.
#[tokio::test(start_paused = true)]
async fn test_go_to_page_reuses_stored_query() {
    let tracker = FakeTracker::new(237);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Cliente", "Acme").unwrap();
    handle.search().unwrap();
    next_outcome(&mut events).await;

    handle.select("Stato", "Chiuso").unwrap();
    handle.go_to_page(3).unwrap();
    let SearchOutcome::Page(page) = next_outcome(&mut events).await else {
        panic!("expected a page");
    };
    assert_eq!(page.page, 3);
    assert_eq!(page.total, 237);
    assert!(page.has_previous() && page.has_next());

    let requests = tracker.requests();
    assert_eq!(
        requests[1],
        Recorded {
            query: ACME_QUERY.to_string(),
            offset: 100,
            limit: 50,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_next_and_previous_page() {
    let tracker = FakeTracker::new(120);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();
    handle.search().unwrap();
    next_outcome(&mut events).await;

    handle.previous_page().unwrap();
    handle.next_page().unwrap();
    let SearchOutcome::Page(page) = next_outcome(&mut events).await else {
        panic!("expected a page");
    };
    assert_eq!(page.page, 2);

    handle.next_page().unwrap();
    let SearchOutcome::Page(page) = next_outcome(&mut events).await else {
        panic!("expected a page");
    };
    assert_eq!(page.page, 3);
    assert!(!page.has_next());

    let offsets: Vec<u32> = tracker.requests().iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 50, 100]);
}

#[tokio::test(start_paused = true)]
async fn test_paging_dropped_while_in_flight() {
    let tracker = FakeTracker::gated(237);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.search().unwrap();
    handle.go_to_page(2).unwrap();
    handle.view().await.unwrap();
    tracker.release(10);
    next_outcome(&mut events).await;
    settle().await;

    assert_eq!(tracker.requests().len(), 1);
}

// ============================================================================
// Failures
// ============================================================================

/// A failed search leaves the last good page and query in place.
#[tokio::test(start_paused = true)]
async fn test_failure_keeps_last_page() {
    let tracker = FakeTracker::new(237);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.ready().unwrap();

    handle.select("Cliente", "Acme").unwrap();
    handle.search().unwrap();
    let SearchOutcome::Page(good) = next_outcome(&mut events).await else {
        panic!("expected a page");
    };

    tracker.fail.store(true, Ordering::SeqCst);
    handle.select("Stato", "Open").unwrap();
    handle.search().unwrap();
    let SearchOutcome::Failed(failure) = next_outcome(&mut events).await else {
        panic!("expected a failure");
    };
    assert_eq!(failure.kind, "FetchError");

    let view = handle.view().await.unwrap();
    assert!(!view.searching);
    assert_eq!(view.page, Some(good));
    assert_eq!(view.current_query.as_deref(), Some(ACME_QUERY));
}

#[tokio::test(start_paused = true)]
async fn test_blank_raw_query_is_reported_not_dispatched() {
    let tracker = FakeTracker::new(3);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.set_mode(SearchMode::Raw).unwrap();
    handle.set_raw_query("   ").unwrap();
    handle.ready().unwrap();
    handle.search().unwrap();

    let SchedulerEvent::ValidationError(failure) = next_event(&mut events).await else {
        panic!("expected a validation error");
    };
    assert_eq!(failure.kind, "ValidationError");
    settle().await;
    assert!(tracker.requests().is_empty());
}

// ============================================================================
// Query precedence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_ticket_key_wins_over_other_filters() {
    let tracker = FakeTracker::new(1);
    let (handle, mut events) = start(&tracker, DependencyResolver::new());
    handle.select("Cliente", "Acme").unwrap();
    handle.select("Stato", "Open").unwrap();
    handle.set_text(TEXT_CONTROL, "cc-123").unwrap();
    handle.ready().unwrap();
    handle.search().unwrap();
    next_outcome(&mut events).await;

    assert_eq!(tracker.requests()[0].query, r#"key = "CC-123""#);
}

// ============================================================================
// Dependent selectors
// ============================================================================

fn slow_for_acme() -> Arc<dyn OptionLoader> {
    Arc::new(FnLoader(|parent: Option<String>| async move {
        let parent = parent.unwrap_or_default();
        let delay = if parent == "Acme" { 300 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(vec![SelectOption::new(
            format!("{parent} child"),
            format!("{parent}-child"),
        )])
    }))
}

#[tokio::test(start_paused = true)]
async fn test_parent_change_resets_child_and_discards_stale_load() {
    let tracker = FakeTracker::new(3);
    let mut dependencies = DependencyResolver::new();
    dependencies
        .attach(DependencyLink::new("Cliente", "Area", slow_for_acme()))
        .unwrap();
    let (handle, _events) = start(&tracker, dependencies);

    handle.select("Cliente", "Acme").unwrap();
    let view = handle.view().await.unwrap();
    let area = view.control("Area").unwrap();
    assert_eq!(area.value, None);
    assert!(!area.enabled);

    handle.select("Cliente", "Globex").unwrap();
    settle().await;

    let view = handle.view().await.unwrap();
    let area = view.control("Area").unwrap();
    assert!(area.enabled);
    assert_eq!(area.displayed, "All");
    assert_eq!(area.options.len(), 2);
    assert_eq!(area.options[1].display, "Globex child");
}

fn failing_after(delay: Duration) -> Arc<dyn OptionLoader> {
    Arc::new(FnLoader(move |_parent: Option<String>| async move {
        tokio::time::sleep(delay).await;
        Err::<Vec<SelectOption>, _>(DeckError::Api("option service unavailable".to_string()))
    }))
}

/// A loader that panics degrades the child instead of leaving it loading.
#[tokio::test(start_paused = true)]
async fn test_panicking_loader_degrades_child() {
    let tracker = FakeTracker::new(3);
    let mut dependencies = DependencyResolver::new();
    let loader: Arc<dyn OptionLoader> = Arc::new(FnLoader(|parent: Option<String>| async move {
        if parent.is_some() {
            panic!("option loader blew up");
        }
        Ok::<_, DeckError>(Vec::<SelectOption>::new())
    }));
    dependencies
        .attach(DependencyLink::new("Cliente", "Area", loader))
        .unwrap();
    let (handle, _events) = start(&tracker, dependencies);

    handle.select("Cliente", "Acme").unwrap();
    settle().await;

    let view = handle.view().await.unwrap();
    let area = view.control("Area").unwrap();
    assert!(area.enabled);
    assert_eq!(area.displayed, "All");
    assert_eq!(area.options, vec![SelectOption::show_all()]);
    assert_eq!(area.value, None);
}

/// A load that fails mid-search leaves only "show all", disabled with the
/// rest of the panel until the search resolves.
#[tokio::test(start_paused = true)]
async fn test_failed_load_during_flight_degrades_child() {
    let tracker = FakeTracker::gated(3);
    let mut dependencies = DependencyResolver::new();
    dependencies
        .attach(DependencyLink::new(
            "Cliente",
            "Area",
            failing_after(DEBOUNCE * 3),
        ))
        .unwrap();
    let (handle, mut events) = start(&tracker, dependencies);
    handle.ready().unwrap();

    handle.select("Cliente", "Acme").unwrap();
    tokio::time::sleep(DEBOUNCE * 2).await;
    assert!(handle.view().await.unwrap().searching);

    settle().await;
    let view = handle.view().await.unwrap();
    assert!(view.searching);
    let area = view.control("Area").unwrap();
    assert_eq!(area.displayed, "All");
    assert_eq!(area.options, vec![SelectOption::show_all()]);
    assert!(!area.enabled);

    tracker.release(1);
    next_outcome(&mut events).await;

    let view = handle.view().await.unwrap();
    let area = view.control("Area").unwrap();
    assert!(area.enabled);
    assert_eq!(area.options, vec![SelectOption::show_all()]);
    assert_eq!(area.value, None);
}
