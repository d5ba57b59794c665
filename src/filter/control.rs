//! Filter controls as seen by the search engine.
//!
//! The engine never touches real widgets. Each widget kind is modelled by a
//! small value type holding what the engine needs to read (displayed text,
//! option list, enabled flag) and the surrounding UI mirrors its widgets
//! into these through [`ControlEvent`]s.

use enum_dispatch::enum_dispatch;
use jiff::civil::Date;

use crate::filter::resolver::ValueResolver;
use crate::types::{DateAxis, FilterKind, SelectOption};

/// Read/write surface shared by every control kind
#[enum_dispatch]
pub trait Control {
    fn name(&self) -> &str;

    fn kind(&self) -> FilterKind;

    /// Text currently shown by the widget
    fn displayed_text(&self) -> String;

    /// Option list; empty for controls that are not selectors
    fn options(&self) -> &[SelectOption];

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Canonical value the query language expects, or `None` when the
    /// control does not filter anything. Independent of `is_enabled`.
    fn current_canonical_value(&self, resolver: &ValueResolver) -> Option<String>;
}

#[enum_dispatch(Control)]
#[derive(Debug, Clone)]
pub enum FilterControl {
    Selector(SelectorControl),
    Text(TextControl),
    Date(DateControl),
}

/// A drop-down of categorical values with a leading "show all" entry
#[derive(Debug, Clone)]
pub struct SelectorControl {
    name: String,
    options: Vec<SelectOption>,
    displayed: String,
    enabled: bool,
}

impl SelectorControl {
    pub fn new(name: impl Into<String>) -> Self {
        let show_all = SelectOption::show_all();
        Self {
            name: name.into(),
            displayed: show_all.display.clone(),
            options: vec![show_all],
            enabled: true,
        }
    }

    /// Replace the option list, prefixed with "show all", and select it
    pub fn set_options(&mut self, options: Vec<SelectOption>) {
        let mut all = Vec::with_capacity(options.len() + 1);
        all.push(SelectOption::show_all());
        all.extend(options.into_iter().filter(|o| !o.is_sentinel()));
        self.options = all;
        self.reset();
    }

    /// Show the transient loading placeholder as the only option
    pub fn show_loading(&mut self) {
        let loading = SelectOption::loading();
        self.displayed = loading.display.clone();
        self.options = vec![loading];
        self.enabled = false;
    }

    pub fn is_loading(&self) -> bool {
        self.options.len() == 1 && self.options[0] == SelectOption::loading()
    }

    /// Select the leading sentinel entry
    pub fn reset(&mut self) {
        if let Some(first) = self.options.first() {
            self.displayed = first.display.clone();
        }
    }

    /// Set the displayed text. Editable selectors accept text that is not in
    /// the option list. Returns whether the displayed text changed.
    pub fn select(&mut self, display: &str) -> bool {
        if self.displayed == display {
            return false;
        }
        self.displayed = display.to_string();
        true
    }
}

impl Control for SelectorControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FilterKind {
        FilterKind::Categorical
    }

    fn displayed_text(&self) -> String {
        self.displayed.clone()
    }

    fn options(&self) -> &[SelectOption] {
        &self.options
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn current_canonical_value(&self, resolver: &ValueResolver) -> Option<String> {
        resolver.resolve(self)
    }
}

/// The free-text search box
#[derive(Debug, Clone)]
pub struct TextControl {
    name: String,
    text: String,
    enabled: bool,
}

impl TextControl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            enabled: true,
        }
    }

    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text = text.to_string();
        true
    }
}

impl Control for TextControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FilterKind {
        FilterKind::FreeText
    }

    fn displayed_text(&self) -> String {
        self.text.clone()
    }

    fn options(&self) -> &[SelectOption] {
        &[]
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn current_canonical_value(&self, resolver: &ValueResolver) -> Option<String> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() || resolver.is_placeholder(trimmed) {
            return None;
        }
        Some(trimmed.to_string())
    }
}

/// Which end of a date range a date control sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    From,
    To,
}

/// A date picker paired with its own "use this date" checkbox
#[derive(Debug, Clone)]
pub struct DateControl {
    name: String,
    axis: DateAxis,
    bound: DateBound,
    date: Option<Date>,
    checked: bool,
    enabled: bool,
}

impl DateControl {
    pub fn new(name: impl Into<String>, axis: DateAxis, bound: DateBound) -> Self {
        Self {
            name: name.into(),
            axis,
            bound,
            date: None,
            checked: false,
            enabled: true,
        }
    }

    pub fn set_date(&mut self, date: Option<Date>) -> bool {
        if self.date == date {
            return false;
        }
        self.date = date;
        true
    }

    pub fn set_checked(&mut self, checked: bool) -> bool {
        if self.checked == checked {
            return false;
        }
        self.checked = checked;
        true
    }
}

impl Control for DateControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> FilterKind {
        match self.bound {
            DateBound::From => FilterKind::DateFrom(self.axis),
            DateBound::To => FilterKind::DateTo(self.axis),
        }
    }

    fn displayed_text(&self) -> String {
        self.date.map(|d| d.to_string()).unwrap_or_default()
    }

    fn options(&self) -> &[SelectOption] {
        &[]
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn current_canonical_value(&self, _resolver: &ValueResolver) -> Option<String> {
        if !self.checked {
            return None;
        }
        // civil::Date displays as an ISO calendar date (YYYY-MM-DD)
        self.date.map(|d| d.to_string())
    }
}

/// A UI-side change to one control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    Select { control: String, display: String },
    SetText { control: String, text: String },
    SetDate { control: String, date: Option<Date> },
    SetDateChecked { control: String, checked: bool },
    SetOptions { control: String, options: Vec<SelectOption> },
}

impl ControlEvent {
    pub fn control(&self) -> &str {
        match self {
            ControlEvent::Select { control, .. }
            | ControlEvent::SetText { control, .. }
            | ControlEvent::SetDate { control, .. }
            | ControlEvent::SetDateChecked { control, .. }
            | ControlEvent::SetOptions { control, .. } => control,
        }
    }

    /// Whether this event is a user edit of a filter value, as opposed to
    /// the owner populating a selector's option list
    pub fn is_filter_change(&self) -> bool {
        !matches!(self, ControlEvent::SetOptions { .. })
    }
}
