//! Option registry
//!
//! Owns the options of one combobox in document order. The registry enforces
//! single selection, mirrors values from labels when no explicit value was
//! given, keeps option ids in sync with the combobox id, and exposes each
//! option's position among valid children.
//!
//! Mutations go through [`OptionsMut`], which records a [`RegistryChanges`]
//! summary. The field folds all changes made in one turn into a single
//! recomputation pass.
//!
//! ```rust
//! use selectra_combobox::option::{ListboxNode, OptionInit};
//! use selectra_combobox::registry::{OptionRegistry, RegistryChanges};
//!
//! let mut registry = OptionRegistry::new("fruit");
//! let mut changes = RegistryChanges::default();
//! {
//!     let mut m = registry.mutate(&mut changes);
//!     m.append(OptionInit::new("Apple"));
//!     m.append(ListboxNode::other("hr")); // ignored
//!     m.append(OptionInit::new("Banana").selected());
//! }
//! assert_eq!(registry.len(), 2);
//! assert_eq!(changes.added.len(), 2);
//! let banana = registry.by_value("Banana").unwrap();
//! assert_eq!(registry.get(banana).unwrap().index(), 1);
//! assert_eq!(registry.get(banana).unwrap().id(), "fruit-option-Banana");
//! assert_eq!(registry.selected(), Some(banana));
//! ```

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::ids::IdCache;
use crate::option::{ComboboxOption, ListboxNode, OptionKey};

/// Summary of the mutations applied since the last flush
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryChanges {
    /// Options that were inserted (and may since have been removed)
    pub added: SmallVec<[OptionKey; 4]>,
    /// Options that were removed
    pub removed: SmallVec<[OptionKey; 4]>,
    /// Last option explicitly marked selected, if any
    pub selected: Option<OptionKey>,
    /// The selected option was explicitly deselected
    pub deselected: bool,
    /// The selected option was removed
    pub selected_removed: bool,
    /// Options whose label or value changed
    pub relabeled: SmallVec<[OptionKey; 4]>,
    /// An option's disabled state changed
    pub disabled_changed: bool,
    /// Foreign children that were skipped
    pub ignored: usize,
}

impl RegistryChanges {
    /// Fold another change set into this one
    pub fn merge(&mut self, other: RegistryChanges) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        if other.selected.is_some() {
            self.selected = other.selected;
            self.deselected = false;
        }
        if other.deselected {
            self.selected = None;
            self.deselected = true;
        }
        self.selected_removed |= other.selected_removed;
        self.relabeled.extend(other.relabeled);
        self.disabled_changed |= other.disabled_changed;
        self.ignored += other.ignored;
    }

    /// Whether the set of options changed
    pub fn is_structural(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Whether anything observable changed
    pub fn is_empty(&self) -> bool {
        !self.is_structural()
            && self.selected.is_none()
            && !self.deselected
            && !self.selected_removed
            && self.relabeled.is_empty()
            && !self.disabled_changed
    }
}

/// Ordered set of options owned by one combobox
#[derive(Clone, Debug)]
pub struct OptionRegistry {
    options: SlotMap<OptionKey, ComboboxOption>,
    /// Document order
    order: Vec<OptionKey>,
    /// Value -> options carrying it
    by_value: FxHashMap<String, SmallVec<[OptionKey; 1]>>,
    ids: IdCache,
}

impl OptionRegistry {
    pub fn new(combobox_id: impl Into<String>) -> Self {
        Self {
            options: SlotMap::with_key(),
            order: Vec::new(),
            by_value: FxHashMap::default(),
            ids: IdCache::new(combobox_id),
        }
    }

    /// Start a mutation session recording into `changes`
    pub fn mutate<'a>(&'a mut self, changes: &'a mut RegistryChanges) -> OptionsMut<'a> {
        OptionsMut {
            registry: self,
            changes,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: OptionKey) -> bool {
        self.options.contains_key(key)
    }

    pub fn get(&self, key: OptionKey) -> Option<&ComboboxOption> {
        self.options.get(key)
    }

    /// Option keys in document order
    pub fn keys(&self) -> &[OptionKey] {
        &self.order
    }

    /// Options in document order
    pub fn iter(&self) -> impl Iterator<Item = (OptionKey, &ComboboxOption)> + '_ {
        self.order.iter().map(move |k| (*k, &self.options[*k]))
    }

    /// Option at a 0-based position
    pub fn at(&self, index: usize) -> Option<OptionKey> {
        self.order.get(index).copied()
    }

    /// First option (in document order) carrying `value`
    pub fn by_value(&self, value: &str) -> Option<OptionKey> {
        self.by_value
            .get(value)
            .and_then(|keys| keys.iter().copied().min_by_key(|k| self.options[*k].index))
    }

    /// First option whose label equals `text`, ignoring case
    pub fn by_label(&self, text: &str) -> Option<OptionKey> {
        let needle = text.to_lowercase();
        self.order
            .iter()
            .copied()
            .find(|k| self.options[*k].label.to_lowercase() == needle)
    }

    /// The selected option
    pub fn selected(&self) -> Option<OptionKey> {
        self.order
            .iter()
            .copied()
            .find(|k| self.options[*k].selected)
    }

    /// Last option flagged as selected by default
    pub fn default_selected(&self) -> Option<OptionKey> {
        self.order
            .iter()
            .rev()
            .copied()
            .find(|k| self.options[*k].default_selected)
    }

    /// First enabled option, or the first option if all are disabled
    pub fn first_selectable(&self) -> Option<OptionKey> {
        self.order
            .iter()
            .copied()
            .find(|k| !self.options[*k].disabled)
            .or_else(|| self.order.first().copied())
    }

    /// Label of an option, or `""` when absent
    pub fn label_of(&self, key: Option<OptionKey>) -> &str {
        key.and_then(|k| self.options.get(k))
            .map(|o| o.label.as_str())
            .unwrap_or("")
    }

    pub fn ids(&self) -> &IdCache {
        &self.ids
    }

    // =========================================================================
    // SELECTION (owned by the field)
    // =========================================================================

    /// Select `key` and deselect every other option
    pub(crate) fn select(&mut self, key: OptionKey) -> bool {
        if !self.options.contains_key(key) {
            return false;
        }
        for (k, opt) in self.options.iter_mut() {
            opt.selected = k == key;
        }
        true
    }

    /// Deselect every option
    pub(crate) fn deselect_all(&mut self) {
        for opt in self.options.values_mut() {
            opt.selected = false;
        }
    }

    /// Restore selectedness from default flags (last default wins)
    pub(crate) fn restore_defaults(&mut self) -> Option<OptionKey> {
        let winner = self.default_selected();
        for (k, opt) in self.options.iter_mut() {
            opt.selected = Some(k) == winner;
        }
        winner
    }

    /// Point option ids at a new combobox id
    pub(crate) fn rekey(&mut self, combobox_id: &str) -> bool {
        if !self.ids.rekey(combobox_id) {
            return false;
        }
        for opt in self.options.values_mut() {
            opt.id = self.ids.option_id(&opt.value);
        }
        true
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn reindex(&mut self) {
        for (i, k) in self.order.iter().enumerate() {
            if let Some(opt) = self.options.get_mut(*k) {
                opt.index = i;
            }
        }
    }

    fn index_value(&mut self, key: OptionKey) {
        let value = self.options[key].value.clone();
        self.by_value.entry(value).or_default().push(key);
    }

    fn unindex_value(&mut self, key: OptionKey) {
        let value = &self.options[key].value;
        if let Some(keys) = self.by_value.get_mut(value) {
            keys.retain(|k| *k != key);
            if keys.is_empty() {
                self.by_value.remove(value);
            }
        }
    }
}

/// Mutation session over an [`OptionRegistry`]
pub struct OptionsMut<'a> {
    registry: &'a mut OptionRegistry,
    changes: &'a mut RegistryChanges,
}

impl OptionsMut<'_> {
    /// Read access while mutating
    pub fn registry(&self) -> &OptionRegistry {
        self.registry
    }

    /// Append a child. Non-option children are ignored and yield `None`.
    pub fn append(&mut self, node: impl Into<ListboxNode>) -> Option<OptionKey> {
        let at = self.registry.len();
        self.insert(at, node)
    }

    /// Insert a child before the option at `index` (clamped to the end)
    pub fn insert(&mut self, index: usize, node: impl Into<ListboxNode>) -> Option<OptionKey> {
        let init = match node.into() {
            ListboxNode::Option(init) => init,
            ListboxNode::Other { tag } => {
                tracing::trace!("ignoring foreign listbox child <{}>", tag);
                self.changes.ignored += 1;
                return None;
            }
        };

        let mut option = ComboboxOption::from_init(init);
        option.id = self.registry.ids.option_id(&option.value);
        let selected = option.selected;

        let key = self.registry.options.insert(option);
        let at = index.min(self.registry.order.len());
        self.registry.order.insert(at, key);
        self.registry.index_value(key);
        self.registry.reindex();

        if selected {
            self.registry.select(key);
            self.note_selected(key);
        }
        self.changes.added.push(key);
        Some(key)
    }

    /// Remove an option. Returns `false` if it was not registered.
    pub fn remove(&mut self, key: OptionKey) -> bool {
        if !self.registry.options.contains_key(key) {
            return false;
        }
        self.registry.unindex_value(key);
        let Some(option) = self.registry.options.remove(key) else {
            return false;
        };
        self.registry.order.retain(|k| *k != key);
        self.registry.reindex();

        if option.selected {
            self.changes.selected_removed = true;
        }
        if self.changes.selected == Some(key) {
            self.changes.selected = None;
        }
        self.changes.removed.push(key);
        true
    }

    /// Remove every option
    pub fn clear(&mut self) {
        let keys: Vec<OptionKey> = self.registry.order.clone();
        for key in keys {
            self.remove(key);
        }
    }

    /// Set an option's selectedness. Selecting deselects every other option.
    pub fn set_selected(&mut self, key: OptionKey, selected: bool) -> bool {
        let Some(was_selected) = self.registry.options.get(key).map(|o| o.selected) else {
            return false;
        };
        if selected {
            self.registry.select(key);
            self.note_selected(key);
        } else if was_selected {
            self.registry.deselect_all();
            self.changes.selected = None;
            self.changes.deselected = true;
        }
        true
    }

    /// Set an option's default selectedness (used by form reset)
    pub fn set_default_selected(&mut self, key: OptionKey, default_selected: bool) -> bool {
        match self.registry.options.get_mut(key) {
            Some(option) => {
                option.default_selected = default_selected;
                true
            }
            None => false,
        }
    }

    /// Change an option's label. A mirrored value follows the label.
    pub fn set_label(&mut self, key: OptionKey, label: impl Into<String>) -> bool {
        let label = label.into();
        let Some(option) = self.registry.options.get(key) else {
            return false;
        };
        let mirrored = !option.explicit_value;
        if mirrored {
            self.replace_value(key, label.clone());
        }
        if let Some(option) = self.registry.options.get_mut(key) {
            option.label = label;
        }
        self.changes.relabeled.push(key);
        true
    }

    /// Set or clear an option's explicit value
    pub fn set_value(&mut self, key: OptionKey, value: Option<String>) -> bool {
        let Some(option) = self.registry.options.get(key) else {
            return false;
        };
        let explicit = value.is_some();
        let value = value.unwrap_or_else(|| option.label.clone());
        self.replace_value(key, value);
        if let Some(option) = self.registry.options.get_mut(key) {
            option.explicit_value = explicit;
        }
        self.changes.relabeled.push(key);
        true
    }

    pub fn set_disabled(&mut self, key: OptionKey, disabled: bool) -> bool {
        match self.registry.options.get_mut(key) {
            Some(option) => {
                if option.disabled != disabled {
                    option.disabled = disabled;
                    self.changes.disabled_changed = true;
                }
                true
            }
            None => false,
        }
    }

    fn replace_value(&mut self, key: OptionKey, value: String) {
        self.registry.unindex_value(key);
        let id = self.registry.ids.option_id(&value);
        if let Some(option) = self.registry.options.get_mut(key) {
            option.value = value;
            option.id = id;
        }
        self.registry.index_value(key);
    }

    fn note_selected(&mut self, key: OptionKey) {
        self.changes.selected = Some(key);
        self.changes.deselected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionInit;

    fn registry_with(labels: &[&str]) -> (OptionRegistry, Vec<OptionKey>) {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let keys = {
            let mut m = registry.mutate(&mut changes);
            labels
                .iter()
                .filter_map(|l| m.append(OptionInit::new(*l)))
                .collect()
        };
        (registry, keys)
    }

    fn selected_count(registry: &OptionRegistry) -> usize {
        registry.iter().filter(|(_, o)| o.selected()).count()
    }

    #[test]
    fn test_last_selected_in_batch_wins() {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let (a, b) = {
            let mut m = registry.mutate(&mut changes);
            let a = m.append(OptionInit::new("A").selected()).unwrap();
            let b = m.append(OptionInit::new("B").selected()).unwrap();
            (a, b)
        };
        assert_eq!(registry.selected(), Some(b));
        assert!(!registry.get(a).unwrap().selected());
        assert_eq!(changes.selected, Some(b));
        assert_eq!(selected_count(&registry), 1);
    }

    #[test]
    fn test_foreign_children_are_ignored() {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        {
            let mut m = registry.mutate(&mut changes);
            m.append(ListboxNode::other("div"));
            m.append(OptionInit::new("A"));
            m.append(ListboxNode::other("#text"));
            m.append(OptionInit::new("B"));
        }
        assert_eq!(registry.len(), 2);
        assert_eq!(changes.ignored, 2);
        let b = registry.by_value("B").unwrap();
        assert_eq!(registry.get(b).unwrap().index(), 1);
    }

    #[test]
    fn test_insert_and_remove_reindex() {
        let (mut registry, keys) = registry_with(&["A", "C"]);
        let mut changes = RegistryChanges::default();
        let b = registry
            .mutate(&mut changes)
            .insert(1, OptionInit::new("B"))
            .unwrap();
        assert_eq!(registry.get(b).unwrap().index(), 1);
        assert_eq!(registry.get(keys[1]).unwrap().index(), 2);

        registry.mutate(&mut changes).remove(keys[0]);
        assert_eq!(registry.get(b).unwrap().index(), 0);
        assert_eq!(registry.get(keys[1]).unwrap().index(), 1);
        assert!(changes.is_structural());
    }

    #[test]
    fn test_removing_selected_is_reported() {
        let (mut registry, keys) = registry_with(&["A", "B"]);
        let mut changes = RegistryChanges::default();
        {
            let mut m = registry.mutate(&mut changes);
            m.set_selected(keys[1], true);
            m.remove(keys[1]);
        }
        assert!(changes.selected_removed);
        assert_eq!(changes.selected, None);
        assert_eq!(registry.selected(), None);
    }

    #[test]
    fn test_mirrored_value_follows_label() {
        let (mut registry, keys) = registry_with(&["Apple"]);
        let mut changes = RegistryChanges::default();
        registry.mutate(&mut changes).set_label(keys[0], "Apricot");

        let opt = registry.get(keys[0]).unwrap();
        assert_eq!(opt.value(), "Apricot");
        assert_eq!(opt.id(), "cb-option-Apricot");
        assert_eq!(registry.by_value("Apricot"), Some(keys[0]));
        assert_eq!(registry.by_value("Apple"), None);

        registry
            .mutate(&mut changes)
            .set_value(keys[0], Some("a".into()));
        registry.mutate(&mut changes).set_label(keys[0], "Avocado");
        let opt = registry.get(keys[0]).unwrap();
        assert_eq!(opt.value(), "a");
        assert_eq!(opt.label(), "Avocado");
    }

    #[test]
    fn test_by_value_prefers_document_order() {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let (first, second) = {
            let mut m = registry.mutate(&mut changes);
            let second = m.append(OptionInit::new("Two").value("x")).unwrap();
            let first = m.insert(0, OptionInit::new("One").value("x")).unwrap();
            (first, second)
        };
        assert_eq!(registry.by_value("x"), Some(first));
        registry.mutate(&mut changes).remove(first);
        assert_eq!(registry.by_value("x"), Some(second));
    }

    #[test]
    fn test_rekey_updates_option_ids() {
        let (mut registry, keys) = registry_with(&["A"]);
        assert!(registry.rekey("other"));
        assert_eq!(registry.get(keys[0]).unwrap().id(), "other-option-A");
        assert_eq!(registry.ids().listbox_id(), "other-listbox");
    }

    #[test]
    fn test_first_selectable_skips_disabled() {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let b = {
            let mut m = registry.mutate(&mut changes);
            m.append(OptionInit::new("A").disabled());
            m.append(OptionInit::new("B")).unwrap()
        };
        assert_eq!(registry.first_selectable(), Some(b));
    }

    #[test]
    fn test_restore_defaults() {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let (a, b) = {
            let mut m = registry.mutate(&mut changes);
            let a = m.append(OptionInit::new("A").selected()).unwrap();
            let b = m.append(OptionInit::new("B")).unwrap();
            m.set_selected(b, true);
            (a, b)
        };
        assert_eq!(registry.selected(), Some(b));
        assert_eq!(registry.restore_defaults(), Some(a));
        assert_eq!(registry.selected(), Some(a));
    }

    #[test]
    fn test_changes_merge() {
        let (_, keys) = registry_with(&["A", "B"]);
        let mut total = RegistryChanges::default();
        total.merge(RegistryChanges {
            selected: Some(keys[0]),
            ..Default::default()
        });
        total.merge(RegistryChanges {
            deselected: true,
            ..Default::default()
        });
        assert_eq!(total.selected, None);
        assert!(total.deselected);
        assert!(!total.is_empty());
    }
}
