//! Filter panel registry and the filter state builder.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DeckError, Result};
use crate::filter::control::{
    Control, ControlEvent, DateBound, DateControl, FilterControl, SelectorControl, TextControl,
};
use crate::filter::resolver::ValueResolver;
use crate::types::{BuiltFilters, DateAxis, FilterField, FilterKind, FilterSnapshot, SearchMode};

/// Ticket keys: project letters, a hyphen, the issue number
static TICKET_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+-[0-9]+$").expect("ticket key regex should be valid"));

pub const TEXT_CONTROL: &str = "Text";
pub const CREATED_FROM: &str = "CreatedFrom";
pub const CREATED_TO: &str = "CreatedTo";
pub const COMPLETED_FROM: &str = "CompletedFrom";
pub const COMPLETED_TO: &str = "CompletedTo";

/// Returns the normalized key when `text` is a ticket key
pub fn as_ticket_key(text: &str) -> Option<String> {
    let trimmed = text.trim();
    TICKET_KEY
        .is_match(trimmed)
        .then(|| trimmed.to_ascii_uppercase())
}

/// Every filter control of one search window, in registration order
#[derive(Debug, Clone, Default)]
pub struct FilterPanel {
    mode: SearchMode,
    controls: IndexMap<String, FilterControl>,
    raw_query: String,
}

impl FilterPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The usual layout: one selector per categorical field, the search box,
    /// and the created/completed date pickers
    pub fn standard<I, S>(categorical: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut panel = Self::new();
        for name in categorical {
            panel.insert(SelectorControl::new(name).into());
        }
        panel.insert(TextControl::new(TEXT_CONTROL).into());
        panel.insert(DateControl::new(CREATED_FROM, DateAxis::Created, DateBound::From).into());
        panel.insert(DateControl::new(CREATED_TO, DateAxis::Created, DateBound::To).into());
        panel.insert(DateControl::new(COMPLETED_FROM, DateAxis::Completed, DateBound::From).into());
        panel.insert(DateControl::new(COMPLETED_TO, DateAxis::Completed, DateBound::To).into());
        panel
    }

    fn insert(&mut self, control: FilterControl) {
        self.controls.insert(control.name().to_string(), control);
    }

    /// Register a control; names must be unique
    pub fn register(&mut self, control: FilterControl) -> Result<()> {
        if self.controls.contains_key(control.name()) {
            return Err(DeckError::Config(format!(
                "control '{}' is registered twice",
                control.name()
            )));
        }
        self.insert(control);
        Ok(())
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SearchMode) {
        self.mode = mode;
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn set_raw_query(&mut self, raw: &str) {
        self.raw_query = raw.to_string();
    }

    pub fn get(&self, name: &str) -> Option<&FilterControl> {
        self.controls.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controls.contains_key(name)
    }

    pub fn controls(&self) -> impl Iterator<Item = &FilterControl> {
        self.controls.values()
    }

    fn control_mut(&mut self, name: &str) -> Result<&mut FilterControl> {
        self.controls
            .get_mut(name)
            .ok_or_else(|| DeckError::UnknownControl(name.to_string()))
    }

    pub fn selector_mut(&mut self, name: &str) -> Result<&mut SelectorControl> {
        match self.control_mut(name)? {
            FilterControl::Selector(selector) => Ok(selector),
            _ => Err(DeckError::WrongControlKind(name.to_string(), "selector")),
        }
    }

    pub fn is_selector(&self, name: &str) -> bool {
        matches!(self.controls.get(name), Some(FilterControl::Selector(_)))
    }

    /// Grey out or re-enable every control at once. Selectors still showing
    /// the loading placeholder stay disabled.
    pub fn set_all_enabled(&mut self, enabled: bool) {
        for control in self.controls.values_mut() {
            let loading = matches!(control, FilterControl::Selector(s) if s.is_loading());
            control.set_enabled(enabled && !loading);
        }
    }

    /// Names of every selector, in registration order
    pub fn selector_names(&self) -> Vec<String> {
        self.controls
            .values()
            .filter(|c| matches!(c, FilterControl::Selector(_)))
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Apply a UI-side change. Returns whether the control's state changed.
    pub fn apply(&mut self, event: &ControlEvent) -> Result<bool> {
        let name = event.control();
        match (event, self.control_mut(name)?) {
            (ControlEvent::Select { display, .. }, FilterControl::Selector(selector)) => {
                Ok(selector.select(display))
            }
            (ControlEvent::SetOptions { options, .. }, FilterControl::Selector(selector)) => {
                selector.set_options(options.clone());
                Ok(true)
            }
            (ControlEvent::SetText { text, .. }, FilterControl::Text(control)) => {
                Ok(control.set_text(text))
            }
            (ControlEvent::SetDate { date, .. }, FilterControl::Date(control)) => {
                Ok(control.set_date(*date))
            }
            (ControlEvent::SetDateChecked { checked, .. }, FilterControl::Date(control)) => {
                Ok(control.set_checked(*checked))
            }
            (ControlEvent::Select { .. } | ControlEvent::SetOptions { .. }, _) => {
                Err(DeckError::WrongControlKind(name.to_string(), "selector"))
            }
            (ControlEvent::SetText { .. }, _) => {
                Err(DeckError::WrongControlKind(name.to_string(), "text"))
            }
            (ControlEvent::SetDate { .. } | ControlEvent::SetDateChecked { .. }, _) => {
                Err(DeckError::WrongControlKind(name.to_string(), "date"))
            }
        }
    }
}

/// Reads every control and produces the filters for one search attempt
#[derive(Debug, Clone)]
pub struct FilterStateBuilder {
    resolver: ValueResolver,
}

impl FilterStateBuilder {
    pub fn new(resolver: ValueResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &ValueResolver {
        &self.resolver
    }

    pub fn build(&self, mode: SearchMode, panel: &FilterPanel) -> BuiltFilters {
        if mode == SearchMode::Raw {
            return BuiltFilters::Raw(panel.raw_query().to_string());
        }

        let mut exact_key = None;
        let mut fields = Vec::new();

        for control in panel.controls() {
            let Some(value) = control.current_canonical_value(&self.resolver) else {
                continue;
            };

            let kind = control.kind();
            if kind == FilterKind::FreeText
                && let Some(key) = as_ticket_key(&value)
            {
                exact_key = Some(key);
                continue;
            }

            fields.push(FilterField {
                name: control.name().to_string(),
                canonical_value: value,
                kind,
            });
        }

        if let Some(key) = exact_key {
            return BuiltFilters::ExactKey(key);
        }
        if fields.is_empty() {
            return BuiltFilters::NoFilters;
        }
        BuiltFilters::Filters(FilterSnapshot::new(fields))
    }
}
