//! Field builder
//!
//! Collects the id, attributes and listbox children of a field, validates
//! the structure and mounts a [`ComboboxField`].
//!
//! ```rust
//! use selectra_combobox::prelude::*;
//!
//! let field = ComboboxField::builder("fruit")
//!     .filter(true)
//!     .value_is(ValuePolicy::AnyValue)
//!     .option(OptionInit::new("Apple"))
//!     .option(OptionInit::new("Banana").selected())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(field.value(), Some("Banana"));
//! assert_eq!(field.text().data(), "Banana");
//! ```

use std::time::Duration;

use selectra_core::clock::{SharedClock, SystemClock};

use crate::config::ComboboxAttributes;
use crate::error::{ComboboxError, Result};
use crate::field::ComboboxField;
use crate::filter::{FilterMethod, FilterStrategy};
use crate::navigation::TYPEAHEAD_TIMEOUT;
use crate::option::{ListboxNode, OptionInit};
use crate::value::ValuePolicy;

/// Custom element names a field may contain
pub const REGISTERED_PARTS: [&str; 3] = ["combobox-field", "combobox-listbox", "combobox-option"];

/// Builder for [`ComboboxField`]
pub struct ComboboxBuilder {
    id: String,
    attributes: ComboboxAttributes,
    listboxes: Vec<Vec<ListboxNode>>,
    parts: Vec<String>,
    strategy: Option<Box<dyn FilterStrategy>>,
    clock: Option<SharedClock>,
    typeahead_timeout: Duration,
}

impl ComboboxBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: ComboboxAttributes::default(),
            listboxes: Vec::new(),
            parts: Vec::new(),
            strategy: None,
            clock: None,
            typeahead_timeout: TYPEAHEAD_TIMEOUT,
        }
    }

    /// Replace all attributes at once
    pub fn attributes(mut self, attributes: ComboboxAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set a raw attribute
    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.set(name, Some(value));
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.attributes.name = Some(name.into());
        self
    }

    pub fn filter(mut self, filter: bool) -> Self {
        self.attributes.filter = filter;
        self
    }

    pub fn value_is(mut self, policy: ValuePolicy) -> Self {
        self.attributes.valueis = Some(policy.as_str().to_string());
        self
    }

    pub fn filter_method(mut self, method: FilterMethod) -> Self {
        self.attributes.filtermethod = Some(method.as_str().to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.attributes.required = required;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.attributes.disabled = disabled;
        self
    }

    pub fn no_matches_message(mut self, message: impl Into<String>) -> Self {
        self.attributes.nomatchesmessage = Some(message.into());
        self
    }

    pub fn value_missing_error(mut self, message: impl Into<String>) -> Self {
        self.attributes.valuemissingerror = Some(message.into());
        self
    }

    /// Add an option to the listbox (created on first use)
    pub fn option(mut self, option: OptionInit) -> Self {
        self.primary_listbox().push(option.into());
        self
    }

    /// Add several options
    pub fn options(mut self, options: impl IntoIterator<Item = OptionInit>) -> Self {
        let listbox = self.primary_listbox();
        listbox.extend(options.into_iter().map(ListboxNode::from));
        self
    }

    /// Add any listbox child, including foreign ones
    pub fn child(mut self, node: ListboxNode) -> Self {
        self.primary_listbox().push(node);
        self
    }

    /// Mount another listbox. A field accepts exactly one.
    pub fn listbox(mut self, children: Vec<ListboxNode>) -> Self {
        self.listboxes.push(children);
        self
    }

    /// Mount a custom part by tag name
    pub fn part(mut self, tag: impl Into<String>) -> Self {
        self.parts.push(tag.into());
        self
    }

    pub fn filter_strategy(mut self, strategy: impl FilterStrategy + 'static) -> Self {
        self.strategy = Some(Box::new(strategy));
        self
    }

    /// Time source for typeahead (defaults to [`SystemClock`])
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn typeahead_timeout(mut self, timeout: Duration) -> Self {
        self.typeahead_timeout = timeout;
        self
    }

    fn primary_listbox(&mut self) -> &mut Vec<ListboxNode> {
        if self.listboxes.is_empty() {
            self.listboxes.push(Vec::new());
        }
        &mut self.listboxes[0]
    }

    /// Validate the structure and mount the field
    pub fn build(self) -> Result<ComboboxField> {
        validate_id(&self.id)?;

        if self.listboxes.len() > 1 {
            return Err(ComboboxError::MultipleListboxes(self.listboxes.len()));
        }
        if let Some(tag) = self
            .parts
            .iter()
            .find(|tag| !REGISTERED_PARTS.contains(&tag.as_str()))
        {
            return Err(ComboboxError::UnregisteredPart(tag.clone()));
        }

        let children = self.listboxes.into_iter().next().unwrap_or_default();
        Ok(ComboboxField::mount(
            self.id,
            self.attributes,
            children,
            self.strategy,
            self.clock.unwrap_or_else(SystemClock::shared),
            self.typeahead_timeout,
        ))
    }
}

/// Ids must be non-empty and free of whitespace
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return Err(ComboboxError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_rejects_bad_ids() {
        for id in ["", "two words", "tab\there"] {
            let err = ComboboxBuilder::new(id).build().err().unwrap();
            assert_eq!(err, ComboboxError::InvalidId(id.to_string()));
        }
    }

    #[test]
    fn test_rejects_second_listbox() {
        let err = ComboboxBuilder::new("cb")
            .option(OptionInit::new("A"))
            .listbox(vec![OptionInit::new("B").into()])
            .build()
            .err()
            .unwrap();
        assert_eq!(err, ComboboxError::MultipleListboxes(2));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_rejects_unregistered_part() {
        let err = ComboboxBuilder::new("cb")
            .part("combobox-listbox")
            .part("combobox-thing")
            .build()
            .err()
            .unwrap();
        assert_eq!(err, ComboboxError::UnregisteredPart("combobox-thing".into()));
    }

    #[test]
    fn test_foreign_children_do_not_fail_the_mount() {
        let field = ComboboxBuilder::new("cb")
            .child(ListboxNode::other("hr"))
            .option(OptionInit::new("A"))
            .build()
            .unwrap();
        assert_eq!(field.registry().len(), 1);
        assert_eq!(field.value(), Some("A"));
    }
}
