//! Maps what a selector displays to the value the query language expects.

use indexmap::IndexMap;
use unicase::UniCase;

use crate::config::UiConfig;
use crate::filter::control::Control;

/// Resolves displayed selector text to canonical values
#[derive(Debug, Clone)]
pub struct ValueResolver {
    sentinels: Vec<String>,
    placeholders: Vec<String>,
    translations: IndexMap<String, String>,
}

impl ValueResolver {
    pub fn new(
        sentinels: Vec<String>,
        placeholders: Vec<String>,
        translations: IndexMap<String, String>,
    ) -> Self {
        Self {
            sentinels,
            placeholders,
            translations,
        }
    }

    pub fn from_config(ui: &UiConfig) -> Self {
        Self::new(
            ui.sentinels.clone(),
            ui.placeholders.clone(),
            ui.translations.clone(),
        )
    }

    /// Whether `text` starts with one of the "show all" prefixes
    pub fn is_sentinel(&self, text: &str) -> bool {
        let text = text.trim();
        self.sentinels.iter().any(|prefix| {
            text.get(..prefix.len())
                .is_some_and(|head| UniCase::new(head) == UniCase::new(prefix.as_str()))
        })
    }

    pub fn is_placeholder(&self, text: &str) -> bool {
        let text = text.trim();
        self.placeholders
            .iter()
            .any(|p| UniCase::new(p.as_str()) == UniCase::new(text))
    }

    /// Resolve the control's displayed text.
    ///
    /// Returns `None` for sentinels. Text with no entry in either the
    /// control's option list or the translation table is passed through.
    pub fn resolve(&self, control: &impl Control) -> Option<String> {
        let displayed = control.displayed_text();
        let text = displayed.trim();
        if text.is_empty() || self.is_sentinel(text) {
            return None;
        }

        if let Some(option) = control.options().iter().find(|o| o.display == text) {
            return option.canonical.clone();
        }

        if let Some(canonical) = self.translations.get(text) {
            return Some(canonical.clone());
        }

        tracing::debug!(
            control = control.name(),
            text,
            "no canonical value for displayed text, using it verbatim"
        );
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::control::SelectorControl;
    use crate::types::SelectOption;

    fn resolver() -> ValueResolver {
        ValueResolver::from_config(&UiConfig::default())
    }

    #[test]
    fn test_sentinel_prefixes() {
        let r = resolver();
        assert!(r.is_sentinel("All"));
        assert!(r.is_sentinel("All clients"));
        assert!(r.is_sentinel("all"));
        assert!(r.is_sentinel("-- none --"));
        assert!(r.is_sentinel("Tutti i clienti"));
        assert!(!r.is_sentinel("Acme"));
        assert!(!r.is_sentinel("Al"));
    }

    #[test]
    fn test_sentinel_prefix_on_multibyte_text() {
        // Slicing at a non-char boundary must not panic
        assert!(!resolver().is_sentinel("aÀ"));
    }

    #[test]
    fn test_resolve_uses_option_canonical() {
        let mut selector = SelectorControl::new("Cliente");
        selector.set_options(vec![SelectOption::new("Acme Corp", "10042")]);
        selector.select("Acme Corp");
        assert_eq!(resolver().resolve(&selector).as_deref(), Some("10042"));
    }

    #[test]
    fn test_resolve_translates_localized_text() {
        let mut selector = SelectorControl::new("Stato");
        selector.select("Aperto");
        assert_eq!(resolver().resolve(&selector).as_deref(), Some("Open"));
    }

    #[test]
    fn test_resolve_falls_back_to_raw_text() {
        let mut selector = SelectorControl::new("Cliente");
        selector.select("  Globex ");
        assert_eq!(resolver().resolve(&selector).as_deref(), Some("Globex"));
    }

    #[test]
    fn test_resolve_show_all_is_none() {
        let selector = SelectorControl::new("Cliente");
        assert_eq!(resolver().resolve(&selector), None);
    }
}
