pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod query;
pub mod remote;
pub mod search;
pub mod types;

pub use config::Config;
pub use error::{DeckError, Result};
pub use filter::{
    Control, ControlEvent, DependencyLink, DependencyResolver, FilterControl, FilterPanel,
    FilterStateBuilder, FnLoader, OptionLoader, ValueResolver,
};
pub use query::QueryCompiler;
pub use remote::{IssueTracker, JiraClient, TrackerChildLoader};
pub use search::{
    ChannelObserver, PanelView, ResultPager, SchedulerEvent, SchedulerHandle, SchedulerSettings,
    SearchObserver, SearchOutcome, SearchScheduler,
};
pub use types::{
    BuiltFilters, CompiledQuery, FilterField, FilterKind, FilterSnapshot, Issue, ResultPage,
    SearchMode, SearchRequest, SearchResponse, SelectOption,
};
