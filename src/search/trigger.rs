use crate::filter::builder::FilterPanel;
use crate::filter::control::Control;
use crate::filter::resolver::ValueResolver;

/// Decides whether a filter change may start a debounce cycle.
///
/// A change to the primary field always qualifies. Any other change
/// qualifies when it is the first filter touched in the session, or when
/// some control (the changed one included) holds a value once the change
/// is applied.
#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    primary: String,
    touched: bool,
}

impl TriggerPolicy {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            touched: false,
        }
    }

    /// Evaluate a change to `changed`, already applied to `panel`
    pub fn qualifies(
        &mut self,
        changed: &str,
        panel: &FilterPanel,
        resolver: &ValueResolver,
    ) -> bool {
        let first_touch = !self.touched;
        self.touched = true;

        if changed == self.primary || first_touch {
            return true;
        }

        panel
            .controls()
            .any(|control| control.current_canonical_value(resolver).is_some())
    }
}
