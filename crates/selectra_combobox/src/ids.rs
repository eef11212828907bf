//! Element id derivation
//!
//! Every id the field publishes (listbox, options, `aria-controls`,
//! `aria-activedescendant`) is derived from one identity, the combobox id.
//! Changing that identity replaces the whole cache; nothing is patched
//! field by field.

/// Ids derived from a combobox id
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdCache {
    combobox_id: String,
    listbox_id: String,
    option_prefix: String,
    /// Bumped every time the cache is rebuilt
    generation: u64,
}

impl IdCache {
    pub fn new(combobox_id: impl Into<String>) -> Self {
        Self::build(combobox_id.into(), 0)
    }

    fn build(combobox_id: String, generation: u64) -> Self {
        Self {
            listbox_id: format!("{combobox_id}-listbox"),
            option_prefix: format!("{combobox_id}-option-"),
            combobox_id,
            generation,
        }
    }

    pub fn combobox_id(&self) -> &str {
        &self.combobox_id
    }

    pub fn listbox_id(&self) -> &str {
        &self.listbox_id
    }

    /// Id of the option carrying `value`
    pub fn option_id(&self, value: &str) -> String {
        format!("{}{}", self.option_prefix, value)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rebuild the cache for a new combobox id. Returns `false` if the id
    /// did not change.
    pub fn rekey(&mut self, combobox_id: &str) -> bool {
        if self.combobox_id == combobox_id {
            return false;
        }
        *self = Self::build(combobox_id.to_string(), self.generation + 1);
        true
    }
}
