//! ARIA snapshot
//!
//! Read-only view of every ARIA attribute the field maintains, built in one
//! pass from the field state so the combobox, listbox and option attributes
//! can never disagree with each other.

use serde::Serialize;

/// `aria-*` state of the combobox element
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComboboxAria {
    pub role: &'static str,
    pub id: String,
    pub expanded: bool,
    /// Id of the listbox
    pub controls: String,
    /// Id of the active option
    pub activedescendant: Option<String>,
    /// `list` in filter mode, `none` otherwise
    pub autocomplete: &'static str,
    pub haspopup: &'static str,
    pub disabled: bool,
    pub required: bool,
    pub invalid: bool,
}

/// State of one option element
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionAria {
    pub id: String,
    pub label: String,
    pub value: String,
    pub index: usize,
    pub selected: bool,
    pub disabled: bool,
    /// Rendered as the active descendant
    pub active: bool,
    /// Hidden by the current filter
    pub filtered_out: bool,
}

/// Placeholder shown when a filter matches nothing
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NoMatchesAria {
    pub message: String,
    pub visible: bool,
}

/// State of the listbox element and its options
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ListboxAria {
    pub role: &'static str,
    pub id: String,
    pub options: Vec<OptionAria>,
    pub no_matches: NoMatchesAria,
}

impl ListboxAria {
    /// Options not hidden by the filter
    pub fn visible_options(&self) -> impl Iterator<Item = &OptionAria> + '_ {
        self.options.iter().filter(|o| !o.filtered_out)
    }

    pub fn active_option(&self) -> Option<&OptionAria> {
        self.options.iter().find(|o| o.active)
    }
}

/// Complete ARIA state of a field
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AriaSnapshot {
    pub combobox: ComboboxAria,
    pub listbox: ListboxAria,
}

impl AriaSnapshot {
    /// Whether `aria-activedescendant` points at an option that exists and
    /// is visible
    pub fn is_consistent(&self) -> bool {
        match &self.combobox.activedescendant {
            None => self.listbox.active_option().is_none(),
            Some(id) => self
                .listbox
                .visible_options()
                .any(|o| o.active && &o.id == id),
        }
    }
}
