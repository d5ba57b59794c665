//! The remote ticket tracker.
//!
//! The search engine only needs two things from the tracker: run a query
//! for one offset/limit window, and list the values a categorical field can
//! take (optionally constrained by a parent field's value).

pub mod error;
pub mod jira;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::dependency::OptionLoader;
use crate::types::{CompiledQuery, SearchResponse, SelectOption};

pub use error::ApiError;
pub use jira::JiraClient;

/// Common interface for remote trackers
pub trait IssueTracker: Send + Sync {
    /// Run `query` and return the issues in `[offset, offset + limit)`
    fn search_issues(
        &self,
        query: &CompiledQuery,
        offset: u32,
        limit: u32,
    ) -> impl Future<Output = Result<SearchResponse>> + Send;

    /// Every value the field can take
    fn load_options(&self, field: &str) -> impl Future<Output = Result<Vec<SelectOption>>> + Send;

    /// Values of `field` compatible with `parent_field = parent_value`.
    /// `None` means the parent is unconstrained.
    fn load_child_options(
        &self,
        field: &str,
        parent_field: &str,
        parent_value: Option<&str>,
    ) -> impl Future<Output = Result<Vec<SelectOption>>> + Send;
}

/// Loads a child selector's options from the tracker
pub struct TrackerChildLoader<T> {
    tracker: Arc<T>,
    field: String,
    parent_field: String,
}

impl<T: IssueTracker> TrackerChildLoader<T> {
    pub fn new(tracker: Arc<T>, field: impl Into<String>, parent_field: impl Into<String>) -> Self {
        Self {
            tracker,
            field: field.into(),
            parent_field: parent_field.into(),
        }
    }
}

#[async_trait]
impl<T: IssueTracker + 'static> OptionLoader for TrackerChildLoader<T> {
    async fn load(&self, parent_value: Option<String>) -> Result<Vec<SelectOption>> {
        self.tracker
            .load_child_options(&self.field, &self.parent_field, parent_value.as_deref())
            .await
    }
}
