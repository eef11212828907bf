//! Option data
//!
//! An option mirrors the data fields of an `<option>` element that the
//! field cares about. Rendering lives elsewhere.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Stable handle to an option in an [`OptionRegistry`](crate::registry::OptionRegistry)
    pub struct OptionKey;
}

/// Initial data for an option child
///
/// # Example
///
/// ```rust
/// use selectra_combobox::option::OptionInit;
///
/// let opt = OptionInit::new("United States").value("us").selected();
/// assert_eq!(opt.value.as_deref(), Some("us"));
/// assert!(opt.selected);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionInit {
    /// Text shown for the option, also used for filtering
    pub label: String,
    /// Submitted value. Falls back to the label when absent.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    /// Initial (default) selectedness
    #[serde(default)]
    pub selected: bool,
}

impl OptionInit {
    /// Create an option whose value mirrors its label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Set an explicit value
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Mark this option as disabled
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Mark this option as selected by default
    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// A child of the listbox as seen by the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListboxNode {
    /// A valid option
    Option(OptionInit),
    /// Any other element or text; ignored
    Other { tag: String },
}

impl ListboxNode {
    /// A foreign child with the given tag name
    pub fn other(tag: impl Into<String>) -> Self {
        ListboxNode::Other { tag: tag.into() }
    }
}

impl From<OptionInit> for ListboxNode {
    fn from(init: OptionInit) -> Self {
        ListboxNode::Option(init)
    }
}

/// A registered option
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComboboxOption {
    pub(crate) value: String,
    pub(crate) label: String,
    /// Whether `value` was given explicitly rather than mirrored from `label`
    pub(crate) explicit_value: bool,
    pub(crate) disabled: bool,
    pub(crate) default_selected: bool,
    pub(crate) selected: bool,
    pub(crate) index: usize,
    pub(crate) id: String,
}

impl ComboboxOption {
    pub(crate) fn from_init(init: OptionInit) -> Self {
        let explicit_value = init.value.is_some();
        let value = init.value.unwrap_or_else(|| init.label.clone());
        Self {
            value,
            label: init.label,
            explicit_value,
            disabled: init.disabled,
            default_selected: init.selected,
            selected: init.selected,
            index: 0,
            id: String::new(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn default_selected(&self) -> bool {
        self.default_selected
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    /// 0-based position among valid options
    pub fn index(&self) -> usize {
        self.index
    }

    /// Generated element id (`{combobox}-option-{value}`)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Case-insensitive label equality
    pub fn label_matches(&self, text: &str) -> bool {
        self.label.to_lowercase() == text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_defaults_to_label() {
        let opt = ComboboxOption::from_init(OptionInit::new("Apple"));
        assert_eq!(opt.value(), "Apple");
        assert!(!opt.explicit_value);

        let opt = ComboboxOption::from_init(OptionInit::new("Apple").value("a"));
        assert_eq!(opt.value(), "a");
        assert_eq!(opt.label(), "Apple");
        assert!(opt.explicit_value);
    }

    #[test]
    fn test_selected_init_sets_default() {
        let opt = ComboboxOption::from_init(OptionInit::new("Apple").selected().disabled());
        assert!(opt.selected());
        assert!(opt.default_selected());
        assert!(opt.disabled());
    }

    #[test]
    fn test_label_matches_ignores_case() {
        let opt = ComboboxOption::from_init(OptionInit::new("Seventh"));
        assert!(opt.label_matches("seventh"));
        assert!(opt.label_matches("SEVENTH"));
        assert!(!opt.label_matches("Sevent"));
    }
}
