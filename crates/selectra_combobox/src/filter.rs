//! Filter engine
//!
//! Narrows the option list to the options matching the field's text.
//!
//! Matching is pluggable at two levels through [`FilterStrategy`]:
//! - [`FilterStrategy::option_matches_filter`] decides whether a single option
//!   matches (the default is a case-insensitive `startsWith` or `includes`
//!   on the label, depending on [`FilterMethod`])
//! - [`FilterStrategy::filtered_options`] produces the whole matching list
//!   (the default keeps the options accepted by the predicate)
//!
//! Whatever the strategy returns, options with an empty value never match a
//! non-empty filter, so a placeholder option cannot hide the no-matches state.
//!
//! ```rust
//! use selectra_combobox::filter::{FilterEngine, FilterMethod};
//! use selectra_combobox::option::OptionInit;
//! use selectra_combobox::registry::{OptionRegistry, RegistryChanges};
//!
//! let mut registry = OptionRegistry::new("cb");
//! let mut changes = RegistryChanges::default();
//! {
//!     let mut m = registry.mutate(&mut changes);
//!     m.append(OptionInit::new("Apple"));
//!     m.append(OptionInit::new("Pineapple"));
//! }
//!
//! let engine = FilterEngine::new(FilterMethod::StartsWith);
//! assert_eq!(engine.matching(&registry, "app").len(), 1);
//!
//! let engine = FilterEngine::new(FilterMethod::Includes);
//! assert_eq!(engine.matching(&registry, "app").len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::option::{ComboboxOption, OptionKey};
use crate::registry::OptionRegistry;

/// Built-in label matching mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMethod {
    /// Label starts with the filter text
    #[default]
    #[serde(rename = "startsWith")]
    StartsWith,
    /// Label contains the filter text
    #[serde(rename = "includes")]
    Includes,
}

impl FilterMethod {
    /// Parse an attribute value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "startsWith" => Some(FilterMethod::StartsWith),
            "includes" => Some(FilterMethod::Includes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMethod::StartsWith => "startsWith",
            FilterMethod::Includes => "includes",
        }
    }
}

/// The filter being applied
#[derive(Clone, Copy, Debug)]
pub struct FilterQuery<'a> {
    pub text: &'a str,
    pub method: FilterMethod,
}

/// Case-insensitive label match used by [`DefaultFilter`]
pub fn label_matches(option: &ComboboxOption, query: &FilterQuery<'_>) -> bool {
    if query.text.is_empty() {
        return true;
    }
    let label = option.label().to_lowercase();
    let text = query.text.to_lowercase();
    match query.method {
        FilterMethod::StartsWith => label.starts_with(&text),
        FilterMethod::Includes => label.contains(&text),
    }
}

/// Per-instance override point for filtering
pub trait FilterStrategy {
    /// Whether one option matches the query
    fn option_matches_filter(&self, option: &ComboboxOption, query: &FilterQuery<'_>) -> bool {
        label_matches(option, query)
    }

    /// All options matching the query, in display order
    fn filtered_options(
        &self,
        registry: &OptionRegistry,
        query: &FilterQuery<'_>,
    ) -> Vec<OptionKey> {
        registry
            .iter()
            .filter(|(_, option)| self.option_matches_filter(option, query))
            .map(|(key, _)| key)
            .collect()
    }
}

/// The stock strategy
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFilter;

impl FilterStrategy for DefaultFilter {}

/// Filtering state derived from the text and the registry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Text the matching set was computed from (`""` when unfiltered)
    pub(crate) text: String,
    /// Whether filter mode is on
    pub(crate) filtering: bool,
    /// Matching options in display order
    pub(crate) matching: Vec<OptionKey>,
    /// Option whose label equals the filter text
    pub(crate) autoselectable: Option<OptionKey>,
}

impl FilterState {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    pub fn matching_options(&self) -> &[OptionKey] {
        &self.matching
    }

    pub fn autoselectable_option(&self) -> Option<OptionKey> {
        self.autoselectable
    }

    /// Whether `key` is part of the matching set
    pub fn is_match(&self, key: OptionKey) -> bool {
        self.matching.contains(&key)
    }

    /// Whether a non-empty filter matched nothing
    pub fn has_no_matches(&self) -> bool {
        self.filtering && !self.text.is_empty() && self.matching.is_empty()
    }
}

/// Computes matching sets with the configured method and strategy
pub struct FilterEngine {
    method: FilterMethod,
    strategy: Box<dyn FilterStrategy>,
}

impl FilterEngine {
    pub fn new(method: FilterMethod) -> Self {
        Self {
            method,
            strategy: Box::new(DefaultFilter),
        }
    }

    pub fn method(&self) -> FilterMethod {
        self.method
    }

    pub fn set_method(&mut self, method: FilterMethod) {
        self.method = method;
    }

    /// Replace the strategy for this instance
    pub fn set_strategy(&mut self, strategy: Box<dyn FilterStrategy>) {
        self.strategy = strategy;
    }

    /// Every option, in document order
    pub fn unfiltered(&self, registry: &OptionRegistry) -> Vec<OptionKey> {
        registry.keys().to_vec()
    }

    /// Options matching `text`
    pub fn matching(&self, registry: &OptionRegistry, text: &str) -> Vec<OptionKey> {
        if text.is_empty() {
            return self.unfiltered(registry);
        }

        let query = FilterQuery {
            text,
            method: self.method,
        };
        let candidates = self.strategy.filtered_options(registry, &query);

        let mut seen: SmallVec<[OptionKey; 16]> = SmallVec::new();
        candidates
            .into_iter()
            .filter(|key| {
                let keep = registry
                    .get(*key)
                    .is_some_and(|option| !option.value().is_empty())
                    && !seen.contains(key);
                if keep {
                    seen.push(*key);
                }
                keep
            })
            .collect()
    }

    /// First enabled matching option whose label equals `text`, ignoring case
    pub fn autoselectable(
        &self,
        registry: &OptionRegistry,
        matching: &[OptionKey],
        text: &str,
    ) -> Option<OptionKey> {
        if text.is_empty() {
            return None;
        }
        matching.iter().copied().find(|key| {
            registry
                .get(*key)
                .is_some_and(|option| !option.disabled() && option.label_matches(text))
        })
    }

    /// Compute a complete filter state
    pub fn compute(&self, registry: &OptionRegistry, filtering: bool, text: &str) -> FilterState {
        let text = if filtering { text } else { "" };
        let matching = self.matching(registry, text);
        let autoselectable = self.autoselectable(registry, &matching, text);
        FilterState {
            text: text.to_string(),
            filtering,
            matching,
            autoselectable,
        }
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new(FilterMethod::default())
    }
}

impl std::fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionInit;
    use crate::registry::RegistryChanges;

    fn registry(inits: Vec<OptionInit>) -> OptionRegistry {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let mut m = registry.mutate(&mut changes);
        for init in inits {
            m.append(init);
        }
        drop(m);
        registry
    }

    fn labels(registry: &OptionRegistry, keys: &[OptionKey]) -> Vec<String> {
        keys.iter()
            .map(|k| registry.get(*k).unwrap().label().to_string())
            .collect()
    }

    #[test]
    fn test_filter_method_parse() {
        assert_eq!(FilterMethod::parse("includes"), Some(FilterMethod::Includes));
        assert_eq!(FilterMethod::parse("startsWith"), Some(FilterMethod::StartsWith));
        assert_eq!(FilterMethod::parse("fuzzy"), None);
        assert_eq!(FilterMethod::Includes.as_str(), "includes");
    }

    #[test]
    fn test_starts_with_is_case_insensitive() {
        let reg = registry(vec![
            OptionInit::new("Seventh"),
            OptionInit::new("second"),
            OptionInit::new("First"),
        ]);
        let engine = FilterEngine::default();
        assert_eq!(
            labels(&reg, &engine.matching(&reg, "SE")),
            vec!["Seventh", "second"]
        );
    }

    #[test]
    fn test_empty_value_option_only_in_unfiltered_list() {
        let reg = registry(vec![
            OptionInit::new("Select one").value(""),
            OptionInit::new("Selma"),
        ]);
        let engine = FilterEngine::default();
        assert_eq!(engine.matching(&reg, "").len(), 2);
        assert_eq!(labels(&reg, &engine.matching(&reg, "Sel")), vec!["Selma"]);

        let state = engine.compute(&reg, true, "Select");
        assert!(state.has_no_matches());
    }

    #[test]
    fn test_autoselectable_requires_exact_enabled_label() {
        let reg = registry(vec![
            OptionInit::new("Seventh"),
            OptionInit::new("Sevent").disabled(),
        ]);
        let engine = FilterEngine::default();

        let state = engine.compute(&reg, true, "sevent");
        assert_eq!(state.matching_options().len(), 2);
        assert_eq!(state.autoselectable_option(), None);

        let state = engine.compute(&reg, true, "SEVENTH");
        assert_eq!(
            state.autoselectable_option(),
            reg.by_value("Seventh")
        );
    }

    #[test]
    fn test_non_filtering_state_matches_everything() {
        let reg = registry(vec![OptionInit::new("A"), OptionInit::new("B")]);
        let state = FilterEngine::default().compute(&reg, false, "zzz");
        assert_eq!(state.text(), "");
        assert_eq!(state.matching_options().len(), 2);
        assert!(!state.has_no_matches());
    }

    struct ValueMatcher;

    impl FilterStrategy for ValueMatcher {
        fn option_matches_filter(&self, option: &ComboboxOption, query: &FilterQuery<'_>) -> bool {
            option.value().contains(query.text)
        }
    }

    struct ReversedEverything;

    impl FilterStrategy for ReversedEverything {
        fn filtered_options(
            &self,
            registry: &OptionRegistry,
            _query: &FilterQuery<'_>,
        ) -> Vec<OptionKey> {
            let mut keys = registry.keys().to_vec();
            keys.reverse();
            keys.extend_from_slice(registry.keys());
            keys
        }
    }

    #[test]
    fn test_predicate_override() {
        let reg = registry(vec![
            OptionInit::new("United States").value("us"),
            OptionInit::new("Germany").value("de"),
        ]);
        let mut engine = FilterEngine::default();
        engine.set_strategy(Box::new(ValueMatcher));
        assert_eq!(labels(&reg, &engine.matching(&reg, "de")), vec!["Germany"]);
    }

    #[test]
    fn test_list_override_is_sanitized() {
        let reg = registry(vec![
            OptionInit::new("None").value(""),
            OptionInit::new("A"),
            OptionInit::new("B"),
        ]);
        let mut engine = FilterEngine::default();
        engine.set_strategy(Box::new(ReversedEverything));
        // Order comes from the strategy; duplicates and empty values are dropped
        assert_eq!(labels(&reg, &engine.matching(&reg, "x")), vec!["B", "A"]);
    }
}
