//! Result paging over the last successfully executed query.

use std::time::Duration;

use crate::error::{DeckError, Result};
use crate::remote::IssueTracker;
use crate::types::{
    CompiledQuery, RequestOrigin, ResultPage, SearchRequest, SearchResponse, page_count,
};

/// Run one request against the tracker, bounded by `timeout`
pub async fn execute<T: IssueTracker>(
    tracker: &T,
    request: &SearchRequest,
    timeout: Duration,
) -> Result<SearchResponse> {
    let call = tracker.search_issues(&request.query, request.offset(), request.page_size);
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(DeckError::RemoteTimeout {
            seconds: timeout.as_secs(),
        }),
    }
}

/// Holds the query and page currently on screen
#[derive(Debug, Clone)]
pub struct ResultPager {
    page_size: u32,
    query: Option<CompiledQuery>,
    page: Option<ResultPage>,
}

impl ResultPager {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
            query: None,
            page: None,
        }
    }

    pub fn current_query(&self) -> Option<&CompiledQuery> {
        self.query.as_ref()
    }

    pub fn current_page(&self) -> Option<&ResultPage> {
        self.page.as_ref()
    }

    /// A filter-driven request. Repeating the displayed query keeps the
    /// current page; any other query starts from page one.
    pub fn fresh_request(&self, query: CompiledQuery) -> SearchRequest {
        let page = match (&self.query, &self.page) {
            (Some(current), Some(page)) if *current == query => page.page,
            _ => 1,
        };
        SearchRequest {
            query,
            page,
            page_size: self.page_size,
            origin: RequestOrigin::Fresh,
        }
    }

    /// Re-issue the stored query at page `n`, clamped to the known page
    /// range. `None` until a search has succeeded.
    pub fn page_request(&self, n: u32) -> Option<SearchRequest> {
        let query = self.query.clone()?;
        let total = self.page.as_ref().map_or(0, |p| p.total);
        let last = page_count(total, self.page_size);
        Some(SearchRequest {
            query,
            page: n.clamp(1, last),
            page_size: self.page_size,
            origin: RequestOrigin::Paging,
        })
    }

    pub fn next_request(&self) -> Option<SearchRequest> {
        let page = self.page.as_ref().filter(|p| p.has_next())?;
        self.page_request(page.page + 1)
    }

    pub fn previous_request(&self) -> Option<SearchRequest> {
        let page = self.page.as_ref().filter(|p| p.has_previous())?;
        self.page_request(page.page - 1)
    }

    /// Record a successful response. Only fresh requests replace the
    /// stored query.
    pub fn accept(&mut self, request: SearchRequest, response: SearchResponse) -> ResultPage {
        if request.origin == RequestOrigin::Fresh {
            self.query = Some(request.query);
        }
        let page = ResultPage {
            issues: response.issues,
            total: response.total,
            page: request.page,
            page_size: request.page_size,
        };
        self.page = Some(page.clone());
        page
    }
}
