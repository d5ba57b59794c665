//! Deciding when to search, running the search, and paging its results.

pub mod pager;
pub mod scheduler;
pub mod trigger;

#[cfg(test)]
mod tests;

pub use pager::{ResultPager, execute};
pub use scheduler::{
    ChannelObserver, ControlView, PanelView, SchedulerEvent, SchedulerHandle, SchedulerSettings,
    SearchObserver, SearchOutcome, SearchScheduler, populate_selectors,
};
pub use trigger::TriggerPolicy;
