//! Combobox field state machine
//!
//! [`ComboboxField`] owns the option registry, the text node and all derived
//! state (filter results, active option, committed value, validity). Hosts
//! drive it with interactions ([`click`](ComboboxField::click),
//! [`edit_text`](ComboboxField::edit_text),
//! [`handle_key`](ComboboxField::handle_key), focus changes) and structural
//! mutations ([`options_mut`](ComboboxField::options_mut)), then read back
//! state, an [`AriaSnapshot`] and dispatched events.
//!
//! Every public entry point leaves the field consistent. Listeners cannot
//! reach the field directly; they queue [`FieldCommand`]s which run, in
//! order, once the entry point that fired the event has finished.
//!
//! # Example
//!
//! ```rust
//! use selectra_combobox::prelude::*;
//!
//! let mut field = ComboboxField::builder("size")
//!     .filter(true)
//!     .value_is(ValuePolicy::Clearable)
//!     .options(["Small", "Medium", "Large"].map(OptionInit::new))
//!     .build()
//!     .unwrap();
//!
//! field.focus_in();
//! field.edit_text(TextEdit::insert("med"));
//! assert!(field.is_expanded());
//! assert_eq!(field.filter_state().matching_options().len(), 1);
//!
//! field.handle_key(KeyEvent::new(KeyCode::ArrowDown));
//! field.handle_key(KeyEvent::new(KeyCode::Enter));
//! assert_eq!(field.value(), Some("Medium"));
//! assert_eq!(field.text().data(), "Medium");
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use selectra_core::batch::{BatchDepth, Dirty};
use selectra_core::clock::SharedClock;
use selectra_core::events::{EventDispatcher, ListenerId};
use selectra_core::key::{KeyCode, KeyEvent};
use smallvec::SmallVec;

use crate::aria::{AriaSnapshot, ComboboxAria, ListboxAria, NoMatchesAria, OptionAria};
use crate::builder::{validate_id, ComboboxBuilder};
use crate::config::ComboboxAttributes;
use crate::error::{ComboboxError, Result};
use crate::event::{ComboboxEvent, EventKind, FieldCommand, FieldDispatch};
use crate::filter::{FilterEngine, FilterMethod, FilterState, FilterStrategy};
use crate::mode::{CaretSnapshot, ModeTransition};
use crate::navigation::{self, NavStep, Typeahead};
use crate::option::{ComboboxOption, ListboxNode, OptionInit, OptionKey};
use crate::registry::{OptionRegistry, OptionsMut, RegistryChanges};
use crate::text::{FieldText, InputRecord, TextEdit};
use crate::validity::{ValidityState, Validator};
use crate::value::{self, ComboboxValue, FieldMode, ValuePolicy};

/// How a key press was handled
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    /// The field acted on the key
    pub handled: bool,
    /// The host should suppress the key's default action
    pub prevent_default: bool,
}

impl KeyOutcome {
    pub const UNHANDLED: Self = Self {
        handled: false,
        prevent_default: false,
    };

    pub const CONSUMED: Self = Self {
        handled: true,
        prevent_default: true,
    };

    /// Handled, but the default action (e.g. focus moving on Tab) proceeds
    pub const PASS_THROUGH: Self = Self {
        handled: true,
        prevent_default: false,
    };
}

type ResetHook = Box<dyn FnMut(u64)>;

/// A headless combobox form control
pub struct ComboboxField {
    attrs: ComboboxAttributes,
    /// Mode currently applied (attribute writes inside a batch are deferred)
    mode: FieldMode,

    registry: OptionRegistry,
    engine: FilterEngine,
    filter: FilterState,
    text: FieldText,
    value: ComboboxValue,

    /// Text was edited since the last commit or discard
    edited: bool,
    /// Text before the current edit session began
    edit_origin: String,
    expanded: bool,
    focused: bool,
    active: Option<OptionKey>,
    typeahead: Typeahead,
    clock: SharedClock,

    validator: Validator,
    form_disabled: bool,
    /// Value as of the last `change` event or programmatic write
    last_change_value: ComboboxValue,
    reset_count: u64,
    reset_hooks: SmallVec<[ResetHook; 2]>,

    listeners: EventDispatcher<ComboboxEvent, FieldCommand>,
    commands: VecDeque<FieldCommand>,
    draining: bool,

    depth: BatchDepth,
    pending: Dirty<RegistryChanges>,
    connected: bool,
}

impl ComboboxField {
    /// Start building a field with the given id
    pub fn builder(id: impl Into<String>) -> ComboboxBuilder {
        ComboboxBuilder::new(id)
    }

    pub(crate) fn mount(
        id: String,
        attrs: ComboboxAttributes,
        children: Vec<ListboxNode>,
        strategy: Option<Box<dyn FilterStrategy>>,
        clock: SharedClock,
        typeahead_timeout: Duration,
    ) -> Self {
        let mut engine = FilterEngine::new(attrs.filter_method());
        if let Some(strategy) = strategy {
            engine.set_strategy(strategy);
        }

        let mut validator = Validator::new(attrs.value_missing_error());
        validator.set_required(attrs.required);

        let mut registry = OptionRegistry::new(id);
        let mut changes = RegistryChanges::default();
        {
            let mut options = registry.mutate(&mut changes);
            for child in children {
                options.append(child);
            }
        }
        if changes.ignored > 0 {
            tracing::trace!("skipped {} foreign listbox children", changes.ignored);
        }

        let mut field = Self {
            mode: attrs.mode(),
            attrs,
            registry,
            engine,
            filter: FilterState::default(),
            text: FieldText::new(),
            value: None,
            edited: false,
            edit_origin: String::new(),
            expanded: false,
            focused: false,
            active: None,
            typeahead: Typeahead::new(typeahead_timeout),
            clock,
            validator,
            form_disabled: false,
            last_change_value: None,
            reset_count: 0,
            reset_hooks: SmallVec::new(),
            listeners: EventDispatcher::new(),
            commands: VecDeque::new(),
            draining: false,
            depth: BatchDepth::new(),
            pending: Dirty::new(),
            connected: true,
        };
        field.apply_defaults();

        tracing::debug!(
            "mounted combobox #{} with {} options ({} filter, {})",
            field.id(),
            field.registry.len(),
            if field.mode.filtering { "with" } else { "no" },
            field.mode.policy.as_str()
        );
        field
    }

    // =========================================================================
    // STATE
    // =========================================================================

    pub fn id(&self) -> &str {
        self.registry.ids().combobox_id()
    }

    /// Committed value; `None` while uninitialized
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The field's text node
    pub fn text(&self) -> &FieldText {
        &self.text
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn policy(&self) -> ValuePolicy {
        self.mode.policy
    }

    pub fn is_filtering(&self) -> bool {
        self.mode.filtering
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Disabled by attribute or by an ancestor form control
    pub fn is_disabled(&self) -> bool {
        self.attrs.disabled || self.form_disabled
    }

    pub fn is_required(&self) -> bool {
        self.attrs.required
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn option(&self, key: OptionKey) -> Option<&ComboboxOption> {
        self.registry.get(key)
    }

    pub fn selected_option(&self) -> Option<OptionKey> {
        self.registry.selected()
    }

    pub fn active_option(&self) -> Option<OptionKey> {
        self.active
    }

    /// Enabled option whose label equals the current text, if the text was
    /// edited
    pub fn autoselectable_option(&self) -> Option<OptionKey> {
        let text = self.text.data();
        self.filter.autoselectable.filter(|key| {
            self.registry
                .get(*key)
                .is_some_and(|option| !option.disabled() && option.label_matches(text))
        })
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    pub fn attributes(&self) -> &ComboboxAttributes {
        &self.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        if name == "id" {
            return Some(self.id().to_string());
        }
        self.attrs.get(name)
    }

    /// Number of resets, from form resets or from mode transitions that
    /// could not keep the selection
    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    /// Number of registry recomputation passes so far
    pub fn registry_flushes(&self) -> u64 {
        self.pending.flushes()
    }

    /// `(name, value)` submitted with the owning form
    pub fn form_entry(&self) -> Option<(&str, &str)> {
        if self.is_disabled() {
            return None;
        }
        Some((self.attrs.name.as_deref()?, self.value.as_deref()?))
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Listen for `input`, `change`, `filterchange` or `invalid`
    pub fn add_event_listener<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&mut FieldDispatch<'_>) + 'static,
    {
        self.listeners.add_listener(kind, listener)
    }

    pub fn add_event_listener_once<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&mut FieldDispatch<'_>) + 'static,
    {
        self.listeners.add_listener_once(kind, listener)
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove_listener(id)
    }

    /// Called with the reset counter after every reset
    pub fn on_form_reset(&mut self, hook: impl FnMut(u64) + 'static) {
        self.reset_hooks.push(Box::new(hook));
    }

    // =========================================================================
    // OPTIONS
    // =========================================================================

    /// Mutate the option list. Returns `None` once the field was torn down.
    ///
    /// Outside a batch the field recomputes right after `f` returns; inside
    /// one, all mutations are folded into a single pass when the outermost
    /// batch ends.
    pub fn options_mut<R>(&mut self, f: impl FnOnce(&mut OptionsMut<'_>) -> R) -> Option<R> {
        if !self.connected {
            tracing::trace!("ignoring option mutation on a disconnected combobox");
            return None;
        }

        let mut changes = RegistryChanges::default();
        let result = {
            let mut options = self.registry.mutate(&mut changes);
            f(&mut options)
        };
        self.pending.mark_with(changes, RegistryChanges::merge);

        if !self.depth.is_batching() {
            self.flush();
            self.settle();
        }
        Some(result)
    }

    pub fn append_option(&mut self, option: OptionInit) -> Option<OptionKey> {
        self.options_mut(|options| options.append(option)).flatten()
    }

    pub fn remove_option(&mut self, key: OptionKey) -> bool {
        self.options_mut(|options| options.remove(key)).unwrap_or(false)
    }

    pub fn set_filter_strategy(&mut self, strategy: impl FilterStrategy + 'static) {
        self.engine.set_strategy(Box::new(strategy));
        self.refilter();
    }

    // =========================================================================
    // ATTRIBUTES
    // =========================================================================

    /// Write (`Some`) or remove (`None`) a reflected attribute
    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        if name == "id" {
            return self.set_id(value.unwrap_or_default());
        }
        self.write_attribute(name, value);
        self.settle();
        Ok(())
    }

    /// Change the combobox id; every derived id follows
    pub fn set_id(&mut self, id: &str) -> Result<()> {
        validate_id(id)?;
        if self.registry.rekey(id) {
            tracing::debug!("combobox re-keyed to #{}", id);
        }
        Ok(())
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.write_attribute("name", name);
    }

    pub fn set_filter(&mut self, filter: bool) {
        self.write_attribute("filter", filter.then_some(""));
        self.settle();
    }

    /// Set or remove the `valueis` attribute
    pub fn set_value_policy(&mut self, policy: Option<ValuePolicy>) {
        self.write_attribute("valueis", policy.map(|p| p.as_str()));
        self.settle();
    }

    pub fn set_filter_method(&mut self, method: FilterMethod) {
        self.write_attribute("filtermethod", Some(method.as_str()));
        self.settle();
    }

    pub fn set_required(&mut self, required: bool) {
        self.write_attribute("required", required.then_some(""));
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.write_attribute("disabled", disabled.then_some(""));
        self.settle();
    }

    /// Disabled state inherited from an enclosing fieldset or form
    pub fn set_form_disabled(&mut self, disabled: bool) {
        self.form_disabled = disabled;
        if self.is_disabled() {
            self.collapse(false);
        }
    }

    pub fn set_no_matches_message(&mut self, message: Option<&str>) {
        self.write_attribute("nomatchesmessage", message);
    }

    pub fn set_value_missing_error(&mut self, message: Option<&str>) {
        self.write_attribute("valuemissingerror", message);
    }

    fn write_attribute(&mut self, name: &str, value: Option<&str>) -> bool {
        if !self.attrs.set(name, value) {
            return false;
        }
        match name {
            "filter" | "valueis" => {
                if !self.depth.is_batching() {
                    self.flush();
                }
            }
            "filtermethod" => {
                self.engine.set_method(self.attrs.filter_method());
                self.refilter();
            }
            "required" => self.validator.set_required(self.attrs.required),
            "disabled" => {
                if self.attrs.disabled {
                    self.collapse(false);
                }
            }
            "valuemissingerror" => self
                .validator
                .set_value_missing_message(self.attrs.value_missing_error()),
            _ => {}
        }
        true
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Run `f` with recomputation deferred.
    ///
    /// When the outermost batch ends the field applies pending option
    /// mutations first, then a single mode transition from the mode it had
    /// before the batch to the mode the attributes now describe.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.depth.start();
        let result = f(self);
        if self.depth.end() {
            self.flush();
        }
        self.settle();
        result
    }

    fn flush(&mut self) {
        if let Some(changes) = self.pending.take() {
            self.reconcile(changes);
        }
        let target = self.attrs.mode();
        if target != self.mode {
            self.transition(ModeTransition::new(self.mode, target));
        }
    }

    /// Run queued listener commands in arrival order
    fn settle(&mut self) {
        if self.draining || self.depth.is_batching() {
            return;
        }
        self.draining = true;
        while !self.commands.is_empty() {
            self.depth.start();
            while let Some(command) = self.commands.pop_front() {
                self.apply_command(command);
            }
            if self.depth.end() {
                self.flush();
            }
        }
        self.draining = false;
    }

    fn apply_command(&mut self, command: FieldCommand) {
        tracing::trace!("running queued {:?}", command);
        match command {
            FieldCommand::SetValue(value) => {
                self.write_value(&value);
            }
            FieldCommand::ForceEmptyValue => {
                if let Err(err) = self.force_empty() {
                    tracing::debug!("queued force_empty_value failed: {}", err);
                }
            }
            FieldCommand::SetCustomValidity(message) => {
                self.validator.set_custom_validity(message);
            }
            FieldCommand::SetFilter(filter) => {
                self.write_attribute("filter", filter.then_some(""));
            }
            FieldCommand::SetValuePolicy(policy) => {
                self.write_attribute("valueis", policy.map(|p| p.as_str()));
            }
            FieldCommand::SetFilterMethod(method) => {
                self.write_attribute("filtermethod", Some(method.as_str()));
            }
            FieldCommand::SetRequired(required) => {
                self.write_attribute("required", required.then_some(""));
            }
            FieldCommand::SetDisabled(disabled) => {
                self.write_attribute("disabled", disabled.then_some(""));
            }
        }
    }

    // =========================================================================
    // VALUE
    // =========================================================================

    /// Whether [`set_value`](Self::set_value) would accept `value`
    pub fn accepts_value(&self, value: &str) -> bool {
        value::accepts_value(self.mode, &self.registry, value)
    }

    /// Programmatic value write. Rejected values leave the field untouched
    /// and return `false`.
    pub fn set_value(&mut self, value: &str) -> bool {
        let accepted = self.write_value(value);
        self.settle();
        accepted
    }

    /// Restore a value saved by the form (history navigation, autofill)
    pub fn form_state_restore(&mut self, state: &str) -> bool {
        self.set_value(state)
    }

    /// Clear the text and force the value to `""`
    pub fn force_empty_value(&mut self) -> Result<()> {
        let result = self.force_empty();
        self.settle();
        result
    }

    /// Restore default selectedness, as a form reset does
    pub fn form_reset(&mut self) {
        self.reset();
        self.settle();
    }

    fn write_value(&mut self, value: &str) -> bool {
        if !self.connected {
            tracing::trace!("ignoring value write on a disconnected combobox");
            return false;
        }
        if !self.accepts_value(value) {
            tracing::debug!("rejected value {:?} under {}", value, self.mode.policy.as_str());
            return false;
        }

        match self.registry.by_value(value) {
            Some(key) => {
                let label = self.registry.label_of(Some(key)).to_string();
                self.registry.select(key);
                self.text.replace(&label);
            }
            None => {
                self.registry.deselect_all();
                let text = if self.mode.is_anyvalue() { value } else { "" };
                self.text.replace(text);
            }
        }
        self.value = Some(value.to_string());
        self.edited = false;
        self.filter.autoselectable = None;
        self.refilter();
        self.last_change_value = self.value.clone();
        true
    }

    fn force_empty(&mut self) -> Result<()> {
        if !self.mode.allows_empty() {
            return Err(ComboboxError::ForceEmptyUnsupported);
        }
        if self.mode.policy == ValuePolicy::Clearable && self.registry.is_empty() {
            return Err(ComboboxError::ForceEmptyUninitialized);
        }
        self.registry.deselect_all();
        self.text.replace("");
        self.value = Some(String::new());
        self.edited = false;
        self.refilter();
        self.last_change_value = self.value.clone();
        Ok(())
    }

    /// Selection and value a freshly mounted or reset field starts with
    fn apply_defaults(&mut self) {
        let allows_empty = self.mode.allows_empty();
        let selected = self
            .registry
            .restore_defaults()
            .or_else(|| (!allows_empty).then(|| self.registry.first_selectable()).flatten());

        match selected {
            Some(key) => {
                self.adopt(key);
            }
            None => {
                self.registry.deselect_all();
                let starts_empty =
                    self.mode.is_anyvalue() || (allows_empty && !self.registry.is_empty());
                self.value = if starts_empty {
                    Some(String::new())
                } else {
                    None
                };
                self.text.replace("");
            }
        }
        self.edited = false;
        self.active = None;
        self.refilter();
        self.last_change_value = self.value.clone();
    }

    fn reset(&mut self) {
        self.reset_count += 1;
        tracing::debug!("combobox #{} reset ({})", self.id(), self.reset_count);
        self.apply_defaults();
        let count = self.reset_count;
        for hook in self.reset_hooks.iter_mut() {
            hook(count);
        }
    }

    /// Select `key` and mirror it in the value and text
    fn adopt(&mut self, key: OptionKey) -> bool {
        let Some(option) = self.registry.get(key) else {
            return false;
        };
        let value = option.value().to_string();
        let label = option.label().to_string();
        self.registry.select(key);
        self.value = Some(value);
        self.text.replace(&label)
    }

    // =========================================================================
    // RECOMPUTATION
    // =========================================================================

    fn refilter(&mut self) {
        let text = if self.edited { self.text.data() } else { "" };
        let next = self.engine.compute(&self.registry, self.mode.filtering, text);
        if next.matching != self.filter.matching {
            self.active = None;
        } else if self.active.is_some_and(|key| !self.registry.contains(key)) {
            self.active = None;
        }
        self.filter = next;
    }

    /// Fold a batch of option mutations into the derived state
    fn reconcile(&mut self, changes: RegistryChanges) {
        if changes.is_empty() {
            return;
        }
        tracing::trace!(
            "registry pass: +{} -{} relabeled={}",
            changes.added.len(),
            changes.removed.len(),
            changes.relabeled.len()
        );

        let explicit = changes.selected.filter(|key| self.registry.contains(*key));
        let selected = self.registry.selected();

        if self.mode.is_anyvalue() {
            if let Some(key) = explicit {
                self.adopt(key);
            }
        } else if let Some(key) = selected {
            if explicit.is_some() || !self.edited {
                self.adopt(key);
            } else if let Some(option) = self.registry.get(key) {
                self.value = Some(option.value().to_string());
            }
        } else if self.registry.is_empty() {
            self.value = None;
            if !self.edited {
                self.text.replace("");
            }
        } else if self.mode.allows_empty() {
            self.value = Some(String::new());
            if !self.edited {
                self.text.replace("");
            }
        } else {
            let fallback = self
                .registry
                .default_selected()
                .or_else(|| self.registry.first_selectable());
            if let Some(key) = fallback {
                let edited = self.edited;
                let text = self.text.data().to_string();
                self.adopt(key);
                if edited {
                    self.text.replace(&text);
                }
            }
        }

        self.refilter();
        self.last_change_value = self.value.clone();
    }

    fn transition(&mut self, transition: ModeTransition) {
        let snapshot = CaretSnapshot::take(&self.text);
        let candidate = self.registry.selected().or_else(|| {
            (!self.text.is_empty())
                .then(|| self.registry.by_label(self.text.data()))
                .flatten()
        });

        self.mode = transition.to;
        tracing::debug!(
            "combobox #{} mode: filter={} {} -> filter={} {}",
            self.id(),
            transition.from.filtering,
            transition.from.policy.as_str(),
            transition.to.filtering,
            transition.to.policy.as_str()
        );

        let has_options = !self.registry.is_empty();
        if transition.requires_reset(candidate, self.text.data(), has_options) {
            self.reset();
        } else if let Some(key) = candidate {
            self.adopt(key);
        } else if self.mode.is_anyvalue() {
            self.registry.deselect_all();
            self.value = Some(self.text.data().to_string());
        } else if has_options {
            self.registry.deselect_all();
            self.value = Some(String::new());
            self.text.replace("");
        } else {
            self.value = None;
            self.text.replace("");
        }

        self.edited = false;
        self.active = None;
        self.refilter();
        snapshot.restore(&mut self.text);
        self.last_change_value = self.value.clone();
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Dispatch an event. Returns `false` if a listener canceled it.
    fn emit(&mut self, event: ComboboxEvent) -> bool {
        let outcome = self.listeners.dispatch(&event);
        let proceed = outcome.proceed();
        self.commands.extend(outcome.commands);
        proceed
    }

    fn fire_change(&mut self) {
        if self.value == self.last_change_value {
            return;
        }
        self.last_change_value = self.value.clone();
        self.emit(ComboboxEvent::Change);
    }

    // =========================================================================
    // INTERACTION
    // =========================================================================

    pub fn focus_in(&mut self) {
        self.focused = true;
    }

    /// Blur: collapse with commit and fire `change` if the value moved
    pub fn focus_out(&mut self) {
        self.focused = false;
        if !self.connected {
            return;
        }
        self.collapse(true);
        self.fire_change();
        self.settle();
    }

    /// Click on the combobox itself
    pub fn click(&mut self) {
        if self.is_disabled() || !self.connected {
            return;
        }
        if self.mode.filtering {
            self.expand();
        } else if self.expanded {
            self.collapse(false);
        } else {
            self.expand_to_selected();
        }
        self.settle();
    }

    /// Click on an option. Disabled options are ignored.
    pub fn click_option(&mut self, key: OptionKey) -> bool {
        if !self.connected || self.is_disabled() {
            return false;
        }
        if self.registry.get(key).map_or(true, |o| o.disabled()) {
            return false;
        }
        self.commit_option(key);
        self.collapse(true);
        self.fire_change();
        self.settle();
        true
    }

    /// Apply a user edit to the text. Only filtering fields are editable.
    pub fn edit_text(&mut self, edit: TextEdit) -> bool {
        let changed = self.apply_edit(&edit);
        self.settle();
        changed
    }

    /// Move the caret or selection of the text
    pub fn set_text_selection(&mut self, start: usize, end: usize) {
        self.text.set_selection(start, end);
    }

    pub fn handle_key(&mut self, event: KeyEvent) -> KeyOutcome {
        let outcome = self.key(event);
        self.settle();
        outcome
    }

    fn apply_edit(&mut self, edit: &TextEdit) -> bool {
        if self.is_disabled() || !self.mode.filtering || !self.connected {
            return false;
        }
        let origin = (!self.edited).then(|| self.text.data().to_string());
        let Some(record) = self.text.apply(edit) else {
            return false;
        };
        self.expand();
        if let Some(origin) = origin {
            self.edit_origin = origin;
        }
        self.edited = true;

        if self.emit(ComboboxEvent::FilterChange) {
            self.refilter();
        } else {
            tracing::trace!("filterchange canceled, keeping previous matches");
        }

        match self.mode.policy {
            ValuePolicy::AnyValue => {
                self.value = Some(self.text.data().to_string());
                match self.autoselectable_option() {
                    Some(key) => {
                        self.registry.select(key);
                    }
                    None => self.registry.deselect_all(),
                }
            }
            ValuePolicy::Clearable if self.text.is_empty() => {
                self.registry.deselect_all();
                self.value = Some(String::new());
            }
            _ => {}
        }

        self.emit(ComboboxEvent::input(&record));
        true
    }

    fn key(&mut self, event: KeyEvent) -> KeyOutcome {
        if self.is_disabled() || !self.connected {
            return KeyOutcome::UNHANDLED;
        }
        let alt = event.modifiers.alt;

        match event.key {
            KeyCode::ArrowDown if alt => {
                self.expand_to_selected();
                KeyOutcome::CONSUMED
            }
            KeyCode::ArrowUp if alt => {
                self.collapse(false);
                KeyOutcome::CONSUMED
            }
            KeyCode::ArrowDown | KeyCode::ArrowUp => {
                if !self.expanded {
                    self.expand_to_selected();
                } else {
                    let step = if event.key == KeyCode::ArrowDown {
                        NavStep::Next
                    } else {
                        NavStep::Previous
                    };
                    self.active = navigation::step(&self.filter.matching, self.active, step);
                }
                KeyOutcome::CONSUMED
            }
            KeyCode::Home | KeyCode::End => {
                // Caret movement in a collapsed filtering field
                if self.mode.filtering && !self.expanded {
                    return KeyOutcome::UNHANDLED;
                }
                self.expand();
                let step = if event.key == KeyCode::Home {
                    NavStep::First
                } else {
                    NavStep::Last
                };
                self.active = navigation::step(&self.filter.matching, self.active, step);
                KeyOutcome::CONSUMED
            }
            // No paging, but an open listbox keeps the page from scrolling
            KeyCode::PageUp | KeyCode::PageDown if self.expanded => KeyOutcome::CONSUMED,
            KeyCode::Enter => self.enter(),
            KeyCode::Escape => {
                if !self.expanded && !self.edited {
                    return KeyOutcome::UNHANDLED;
                }
                self.collapse(false);
                KeyOutcome::CONSUMED
            }
            KeyCode::Tab => {
                if !self.expanded {
                    return KeyOutcome::UNHANDLED;
                }
                if let Some(key) = self.active.filter(|k| self.is_enabled(*k)) {
                    self.commit_option(key);
                }
                self.collapse(true);
                self.fire_change();
                KeyOutcome::PASS_THROUGH
            }
            KeyCode::Space if !self.mode.filtering => {
                if self.typeahead.is_searching(self.clock.now()) {
                    self.typeahead(' ')
                } else {
                    self.enter()
                }
            }
            _ => match event.printable() {
                Some(ch) if !self.mode.filtering => self.typeahead(ch),
                _ => KeyOutcome::UNHANDLED,
            },
        }
    }

    fn enter(&mut self) -> KeyOutcome {
        if !self.expanded {
            if self.mode.filtering {
                return KeyOutcome::UNHANDLED;
            }
            self.expand_to_selected();
            return KeyOutcome::CONSUMED;
        }
        if let Some(key) = self.active {
            if !self.is_enabled(key) {
                return KeyOutcome::CONSUMED;
            }
            self.commit_option(key);
        }
        self.collapse(true);
        self.fire_change();
        KeyOutcome::CONSUMED
    }

    fn typeahead(&mut self, ch: char) -> KeyOutcome {
        let now = self.clock.now();
        let from = self.active.or_else(|| self.registry.selected());
        let hit = self
            .typeahead
            .search(&self.registry, &self.filter.matching, from, ch, now);
        if let Some(key) = hit {
            self.expand();
            self.active = Some(key);
        }
        KeyOutcome::CONSUMED
    }

    fn is_enabled(&self, key: OptionKey) -> bool {
        self.registry.get(key).is_some_and(|o| !o.disabled())
    }

    fn expand(&mut self) -> bool {
        if self.expanded || self.is_disabled() {
            return false;
        }
        self.expanded = true;
        self.filter.autoselectable = None;
        tracing::debug!("combobox #{} expanded", self.id());
        true
    }

    fn expand_to_selected(&mut self) {
        self.expand();
        self.active = self
            .registry
            .selected()
            .filter(|key| self.filter.is_match(*key));
    }

    /// Collapse the listbox, committing or discarding pending text
    fn collapse(&mut self, commit: bool) {
        if commit {
            self.commit_filter();
        } else {
            self.discard_edit();
        }
        if !self.expanded {
            return;
        }
        self.expanded = false;
        self.active = None;
        self.typeahead.reset();
        tracing::debug!(
            "combobox #{} collapsed ({})",
            self.id(),
            if commit { "commit" } else { "discard" }
        );
    }

    /// Explicit option selection by the user
    fn commit_option(&mut self, key: OptionKey) {
        if !self.registry.contains(key) {
            return;
        }
        let text_changed = self.adopt(key);
        self.edited = false;
        self.refilter();
        tracing::debug!("committed option {:?}", self.text.data());

        // The text is the value under anyvalue
        if text_changed && self.mode.is_anyvalue() {
            let record = InputRecord::replacement(self.text.data());
            self.emit(ComboboxEvent::input(&record));
        }
    }

    /// Resolve edited text into a value according to the policy
    fn commit_filter(&mut self) {
        if !self.edited {
            return;
        }
        let auto = self.autoselectable_option();

        if self.mode.is_anyvalue() {
            match auto {
                Some(key) => {
                    self.registry.select(key);
                }
                None => self.registry.deselect_all(),
            }
        } else if self.mode.policy == ValuePolicy::Clearable && self.text.is_empty() {
            self.registry.deselect_all();
            self.value = Some(String::new());
        } else {
            match auto {
                Some(key) => {
                    self.adopt(key);
                }
                None => self.revert_text(),
            }
        }

        self.edited = false;
        self.refilter();
    }

    fn discard_edit(&mut self) {
        if !self.edited {
            return;
        }
        match self.mode.policy {
            ValuePolicy::AnyValue => {}
            // An emptied clearable field already committed `""`; only the
            // display goes back
            ValuePolicy::Clearable => {
                let origin = std::mem::take(&mut self.edit_origin);
                self.text.replace(&origin);
            }
            ValuePolicy::Unclearable => self.revert_text(),
        }
        self.edited = false;
        self.refilter();
    }

    fn revert_text(&mut self) {
        let label = self.registry.label_of(self.registry.selected()).to_string();
        self.text.replace(&label);
    }

    // =========================================================================
    // VALIDITY
    // =========================================================================

    pub fn validity(&self) -> ValidityState {
        self.validator.validity(self.value.as_deref())
    }

    pub fn validation_message(&self) -> &str {
        if !self.will_validate() {
            return "";
        }
        self.validator.message(self.value.as_deref())
    }

    /// Whether the field takes part in constraint validation
    pub fn will_validate(&self) -> bool {
        !self.is_disabled()
    }

    /// Set (or clear with `""`) a custom validation error
    pub fn set_custom_validity(&mut self, message: &str) {
        self.validator.set_custom_validity(message);
    }

    /// Fire `invalid` and return `false` if the field is invalid
    pub fn check_validity(&mut self) -> bool {
        let valid = self.validate().0;
        self.settle();
        valid
    }

    /// Like [`check_validity`](Self::check_validity), reporting the
    /// message unless `invalid` was canceled
    pub fn report_validity(&mut self) -> bool {
        let (valid, report) = self.validate();
        if report {
            tracing::debug!(
                "combobox #{} invalid: {}",
                self.id(),
                self.validation_message()
            );
        }
        self.settle();
        valid
    }

    fn validate(&mut self) -> (bool, bool) {
        if !self.will_validate() || self.validity().valid() {
            return (true, false);
        }
        let report = self.emit(ComboboxEvent::Invalid);
        (false, report)
    }

    // =========================================================================
    // ARIA
    // =========================================================================

    pub fn aria(&self) -> AriaSnapshot {
        let ids = self.registry.ids();
        let activedescendant = self
            .active
            .and_then(|key| self.registry.get(key))
            .map(|option| option.id().to_string());

        let options = self
            .registry
            .iter()
            .map(|(key, option)| OptionAria {
                id: option.id().to_string(),
                label: option.label().to_string(),
                value: option.value().to_string(),
                index: option.index(),
                selected: option.selected(),
                disabled: option.disabled(),
                active: self.active == Some(key),
                filtered_out: !self.filter.is_match(key),
            })
            .collect();

        AriaSnapshot {
            combobox: ComboboxAria {
                role: "combobox",
                id: ids.combobox_id().to_string(),
                expanded: self.expanded,
                controls: ids.listbox_id().to_string(),
                activedescendant,
                autocomplete: if self.mode.filtering { "list" } else { "none" },
                haspopup: "listbox",
                disabled: self.is_disabled(),
                required: self.attrs.required,
                invalid: self.will_validate() && !self.validity().valid(),
            },
            listbox: ListboxAria {
                role: "listbox",
                id: ids.listbox_id().to_string(),
                options,
                no_matches: NoMatchesAria {
                    message: self.attrs.no_matches_message().to_string(),
                    visible: self.filter.has_no_matches(),
                },
            },
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Drop listeners and hooks, cancel the typeahead timer and stop
    /// observing option mutations
    pub fn teardown(&mut self) {
        if !self.connected {
            return;
        }
        self.listeners.clear();
        self.reset_hooks.clear();
        self.commands.clear();
        self.typeahead.reset();
        self.pending.take();
        self.connected = false;
        tracing::debug!("combobox #{} disconnected", self.id());
    }
}
