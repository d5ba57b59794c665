//! Parent/child relationships between selectors.
//!
//! When a parent selector changes, each dependent child is cleared, shows a
//! loading placeholder, and is reloaded through its link's loader. Every
//! reload carries the generation of the link at dispatch time; a result
//! whose generation no longer matches is stale and is dropped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{DeckError, Result};
use crate::filter::builder::FilterPanel;
use crate::filter::control::Control;
use crate::filter::resolver::ValueResolver;
use crate::types::SelectOption;

/// Loads a child's options for a given parent value
#[async_trait]
pub trait OptionLoader: Send + Sync {
    /// `parent_value` is `None` when the parent shows "all"
    async fn load(&self, parent_value: Option<String>) -> Result<Vec<SelectOption>>;
}

/// Adapts an async closure into an [`OptionLoader`]
pub struct FnLoader<F>(pub F);

#[async_trait]
impl<F, Fut> OptionLoader for FnLoader<F>
where
    F: Fn(Option<String>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<SelectOption>>> + Send,
{
    async fn load(&self, parent_value: Option<String>) -> Result<Vec<SelectOption>> {
        (self.0)(parent_value).await
    }
}

/// One parent selector constraining one child selector
#[derive(Clone)]
pub struct DependencyLink {
    pub parent: String,
    pub child: String,
    pub loader: Arc<dyn OptionLoader>,
}

impl DependencyLink {
    pub fn new(
        parent: impl Into<String>,
        child: impl Into<String>,
        loader: Arc<dyn OptionLoader>,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            loader,
        }
    }
}

impl fmt::Debug for DependencyLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyLink")
            .field("parent", &self.parent)
            .field("child", &self.child)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct LinkState {
    link: DependencyLink,
    generation: u64,
}

/// A child reload waiting to be run off the owner's task
pub struct PendingLoad {
    pub child: String,
    pub generation: u64,
    pub parent_value: Option<String>,
    loader: Arc<dyn OptionLoader>,
}

impl PendingLoad {
    pub async fn run(self) -> LoadedOptions {
        let result = self.loader.load(self.parent_value).await;
        LoadedOptions {
            child: self.child,
            generation: self.generation,
            result,
        }
    }
}

impl fmt::Debug for PendingLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLoad")
            .field("child", &self.child)
            .field("generation", &self.generation)
            .field("parent_value", &self.parent_value)
            .finish_non_exhaustive()
    }
}

/// Result of a child reload, delivered back to the owner
#[derive(Debug)]
pub struct LoadedOptions {
    pub child: String,
    pub generation: u64,
    pub result: Result<Vec<SelectOption>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// Loader failed; the child is left with only "show all"
    Degraded,
    /// A newer reload superseded this one
    Stale,
}

/// All dependency links of one panel, keyed by child
#[derive(Debug, Default)]
pub struct DependencyResolver {
    links: IndexMap<String, LinkState>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a link. A child may have only one parent.
    pub fn attach(&mut self, link: DependencyLink) -> Result<()> {
        if link.parent == link.child {
            return Err(DeckError::Config(format!(
                "control '{}' cannot depend on itself",
                link.child
            )));
        }
        if let Some(existing) = self.links.get(&link.child) {
            return Err(DeckError::DuplicateDependency {
                child: link.child.clone(),
                existing: existing.link.parent.clone(),
                parent: link.parent.clone(),
            });
        }
        self.links.insert(
            link.child.clone(),
            LinkState {
                link,
                generation: 0,
            },
        );
        Ok(())
    }

    /// Check that every linked control exists and is a selector
    pub fn validate(&self, panel: &FilterPanel) -> Result<()> {
        for state in self.links.values() {
            for name in [&state.link.parent, &state.link.child] {
                if !panel.contains(name) {
                    return Err(DeckError::UnknownControl(name.clone()));
                }
                if !panel.is_selector(name) {
                    return Err(DeckError::WrongControlKind(name.clone(), "selector"));
                }
            }
        }
        Ok(())
    }

    pub fn has_children(&self, parent: &str) -> bool {
        self.links.values().any(|s| s.link.parent == parent)
    }

    /// React to a change of `parent`: reset each dependent child to the
    /// loading placeholder and return the reloads to run. Children that are
    /// themselves parents cascade with their new (empty) value.
    pub fn on_parent_changed(
        &mut self,
        parent: &str,
        panel: &mut FilterPanel,
        resolver: &ValueResolver,
    ) -> Vec<PendingLoad> {
        let mut pending = Vec::new();
        let mut changed = vec![parent.to_string()];

        while let Some(current) = changed.pop() {
            let parent_value = panel
                .get(&current)
                .and_then(|c| c.current_canonical_value(resolver));

            for state in self.links.values_mut() {
                if state.link.parent != current {
                    continue;
                }
                let child = state.link.child.clone();
                let Ok(selector) = panel.selector_mut(&child) else {
                    tracing::warn!(child = %child, "dependent control is not a selector");
                    continue;
                };

                let had_value = selector.current_canonical_value(resolver).is_some();
                selector.show_loading();
                state.generation += 1;

                tracing::debug!(
                    parent = %current,
                    child = %child,
                    generation = state.generation,
                    "reloading dependent options"
                );

                pending.push(PendingLoad {
                    child: child.clone(),
                    generation: state.generation,
                    parent_value: parent_value.clone(),
                    loader: Arc::clone(&state.link.loader),
                });

                if had_value {
                    changed.push(child);
                }
            }
        }

        pending
    }

    /// Apply a finished reload if it is still the latest for its child
    pub fn complete(&mut self, loaded: LoadedOptions, panel: &mut FilterPanel) -> LoadOutcome {
        let Some(state) = self.links.get(&loaded.child) else {
            return LoadOutcome::Stale;
        };
        if state.generation != loaded.generation {
            tracing::debug!(
                child = %loaded.child,
                generation = loaded.generation,
                current = state.generation,
                "discarding stale option load"
            );
            return LoadOutcome::Stale;
        }

        let Ok(selector) = panel.selector_mut(&loaded.child) else {
            return LoadOutcome::Stale;
        };

        let outcome = match loaded.result {
            Ok(options) => {
                selector.set_options(options);
                LoadOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(child = %loaded.child, error = %e, "failed to load dependent options");
                selector.set_options(Vec::new());
                LoadOutcome::Degraded
            }
        };
        selector.set_enabled(true);
        outcome
    }
}
