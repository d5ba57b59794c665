use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::DeckError;

pub const DECK_DIR: &str = ".issuedeck";

/// Displayed text of the placeholder shown while a dependent selector reloads
pub const LOADING_PLACEHOLDER: &str = "Loading...";

/// Displayed text of the leading "show all" option of every selector
pub const SHOW_ALL: &str = "All";

/// Which set of filter controls drives the query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Basic,
    Date,
    Raw,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Basic => write!(f, "basic"),
            SearchMode::Date => write!(f, "date"),
            SearchMode::Raw => write!(f, "raw"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(SearchMode::Basic),
            "date" => Ok(SearchMode::Date),
            "raw" => Ok(SearchMode::Raw),
            _ => Err(DeckError::Other(format!("invalid search mode: {s}"))),
        }
    }
}

pub const VALID_MODES: &[&str] = &["basic", "date", "raw"];

/// The timestamp a date filter constrains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateAxis {
    Created,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    Categorical,
    FreeText,
    DateFrom(DateAxis),
    DateTo(DateAxis),
}

/// A named filter criterion with its resolved canonical value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    pub name: String,
    pub canonical_value: String,
    pub kind: FilterKind,
}

/// One entry of a selector's option list.
///
/// `canonical == None` marks a sentinel: the "show all" entry or the
/// transient loading placeholder. Sentinels never become query clauses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub display: String,
    pub canonical: Option<String>,
}

impl SelectOption {
    pub fn new(display: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            canonical: Some(canonical.into()),
        }
    }

    pub fn show_all() -> Self {
        Self {
            display: SHOW_ALL.to_string(),
            canonical: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            display: LOADING_PLACEHOLDER.to_string(),
            canonical: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.canonical.is_none()
    }
}

/// Immutable, ordered view of the active filters at the moment a search runs
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSnapshot {
    fields: IndexMap<String, FilterField>,
}

impl FilterSnapshot {
    pub fn new(fields: impl IntoIterator<Item = FilterField>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|field| (field.name.clone(), field))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|f| f.canonical_value.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = &FilterField> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// What the filter state builder produced for one search attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltFilters {
    /// Raw-query mode: the user's text, untouched
    Raw(String),
    /// The free-text box holds a ticket key; overrides every other filter
    ExactKey(String),
    Filters(FilterSnapshot),
    NoFilters,
}

/// A query string in the remote system's query language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompiledQuery(String);

impl CompiledQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Why a request was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOrigin {
    /// Built from the filter controls (timer, button, Enter key)
    Fresh,
    /// Re-issue of the stored query for a different page
    Paging,
}

/// One attempt to run a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: CompiledQuery,
    pub page: u32,
    pub page_size: u32,
    pub origin: RequestOrigin,
}

impl SearchRequest {
    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.page_size
    }
}

/// Issue summary as returned by the remote search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub updated: Option<String>,
}

/// Raw response of one remote search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub issues: Vec<Issue>,
    pub total: u32,
}

/// The issues for one offset/limit window plus navigation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultPage {
    pub issues: Vec<Issue>,
    pub total: u32,
    pub page: u32,
    pub page_size: u32,
}

impl ResultPage {
    pub fn page_count(&self) -> u32 {
        page_count(self.total, self.page_size)
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) * u64::from(self.page_size) < u64::from(self.total)
    }
}

/// Number of pages needed to show `total` results; at least one
pub fn page_count(total: u32, page_size: u32) -> u32 {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}

/// Cloneable description of a failed search, suitable for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub kind: String,
    pub message: String,
}

impl From<&DeckError> for SearchFailure {
    fn from(error: &DeckError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
