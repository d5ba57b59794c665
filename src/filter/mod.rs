//! Filter controls and everything that reads them.
//!
//! - [`control`]: the per-widget-kind control models
//! - [`resolver`]: displayed text to canonical value
//! - [`dependency`]: parent/child selector reloads
//! - [`builder`]: the panel registry and the filter state builder

pub mod builder;
pub mod control;
pub mod dependency;
pub mod resolver;

pub use builder::{
    COMPLETED_FROM, COMPLETED_TO, CREATED_FROM, CREATED_TO, FilterPanel, FilterStateBuilder,
    TEXT_CONTROL, as_ticket_key,
};
pub use control::{
    Control, ControlEvent, DateBound, DateControl, FilterControl, SelectorControl, TextControl,
};
pub use dependency::{
    DependencyLink, DependencyResolver, FnLoader, LoadOutcome, LoadedOptions, OptionLoader,
    PendingLoad,
};
pub use resolver::ValueResolver;
