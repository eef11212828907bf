//! Reflected attributes
//!
//! [`ComboboxAttributes`] holds the raw attribute values of a field. Boolean
//! attributes are present or absent; enumerated attributes keep whatever
//! string was written, and invalid values fall back to their defaults when
//! read through the typed accessors.
//!
//! The struct deserializes from TOML or JSON with every key optional:
//!
//! ```rust
//! use selectra_combobox::config::ComboboxAttributes;
//! use selectra_combobox::value::ValuePolicy;
//!
//! let attrs: ComboboxAttributes = toml::from_str(r#"
//!     filter = true
//!     valueis = "anyvalue"
//! "#).unwrap();
//! assert_eq!(attrs.mode().policy, ValuePolicy::AnyValue);
//! assert_eq!(attrs.no_matches_message(), "No options found");
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::filter::FilterMethod;
use crate::value::FieldMode;

/// Shown in the listbox when a filter matches nothing
pub const DEFAULT_NO_MATCHES_MESSAGE: &str = "No options found";

/// Validation message for a required field with no value
pub const DEFAULT_VALUE_MISSING_ERROR: &str = "Please select an item in the list.";

/// Attribute names reflected by the field, in canonical order
pub const ATTRIBUTE_NAMES: [&str; 8] = [
    "name",
    "disabled",
    "required",
    "filter",
    "valueis",
    "filtermethod",
    "nomatchesmessage",
    "valuemissingerror",
];

/// Raw attribute values of a combobox field
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboboxAttributes {
    /// Form submission name
    pub name: Option<String>,
    pub disabled: bool,
    pub required: bool,
    pub filter: bool,
    /// `unclearable`, `clearable` or `anyvalue`
    pub valueis: Option<String>,
    /// `startsWith` or `includes`
    pub filtermethod: Option<String>,
    pub nomatchesmessage: Option<String>,
    pub valuemissingerror: Option<String>,
}

impl ComboboxAttributes {
    /// Effective filter flag and policy
    pub fn mode(&self) -> FieldMode {
        FieldMode::from_attributes(self.filter, self.valueis.as_deref())
    }

    pub fn filter_method(&self) -> FilterMethod {
        self.filtermethod
            .as_deref()
            .and_then(FilterMethod::parse)
            .unwrap_or_default()
    }

    pub fn no_matches_message(&self) -> &str {
        self.nomatchesmessage
            .as_deref()
            .unwrap_or(DEFAULT_NO_MATCHES_MESSAGE)
    }

    pub fn value_missing_error(&self) -> &str {
        self.valuemissingerror
            .as_deref()
            .unwrap_or(DEFAULT_VALUE_MISSING_ERROR)
    }

    /// Whether `name` is a reflected attribute
    pub fn is_known(name: &str) -> bool {
        ATTRIBUTE_NAMES.contains(&name)
    }

    /// Read an attribute the way `getAttribute` would. Boolean attributes
    /// read as `""` when present.
    pub fn get(&self, name: &str) -> Option<String> {
        let flag = |on: bool| on.then(String::new);
        match name {
            "name" => self.name.clone(),
            "disabled" => flag(self.disabled),
            "required" => flag(self.required),
            "filter" => flag(self.filter),
            "valueis" => self.valueis.clone(),
            "filtermethod" => self.filtermethod.clone(),
            "nomatchesmessage" => self.nomatchesmessage.clone(),
            "valuemissingerror" => self.valuemissingerror.clone(),
            _ => None,
        }
    }

    /// Write (`Some`) or remove (`None`) an attribute. Returns `false` for
    /// unknown names and for writes that change nothing.
    pub fn set(&mut self, name: &str, value: Option<&str>) -> bool {
        let owned = value.map(str::to_string);
        let present = value.is_some();
        match name {
            "name" => replace(&mut self.name, owned),
            "disabled" => replace(&mut self.disabled, present),
            "required" => replace(&mut self.required, present),
            "filter" => replace(&mut self.filter, present),
            "valueis" => replace(&mut self.valueis, owned),
            "filtermethod" => replace(&mut self.filtermethod, owned),
            "nomatchesmessage" => replace(&mut self.nomatchesmessage, owned),
            "valuemissingerror" => replace(&mut self.valuemissingerror, owned),
            _ => false,
        }
    }

    /// Present attributes in canonical order
    pub fn to_map(&self) -> IndexMap<&'static str, String> {
        ATTRIBUTE_NAMES
            .iter()
            .filter_map(|name| self.get(name).map(|value| (*name, value)))
            .collect()
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValuePolicy;

    #[test]
    fn test_defaults() {
        let attrs = ComboboxAttributes::default();
        assert_eq!(attrs.mode(), FieldMode::default());
        assert_eq!(attrs.filter_method(), FilterMethod::StartsWith);
        assert_eq!(attrs.value_missing_error(), DEFAULT_VALUE_MISSING_ERROR);
        assert!(attrs.to_map().is_empty());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let mut attrs = ComboboxAttributes::default();
        attrs.set("filter", Some(""));
        attrs.set("valueis", Some("sometimes"));
        attrs.set("filtermethod", Some("regex"));
        assert_eq!(attrs.mode().policy, ValuePolicy::Clearable);
        assert_eq!(attrs.filter_method(), FilterMethod::StartsWith);
        // The raw value is still reflected
        assert_eq!(attrs.get("valueis").as_deref(), Some("sometimes"));
    }

    #[test]
    fn test_set_reports_changes() {
        let mut attrs = ComboboxAttributes::default();
        assert!(attrs.set("required", Some("required")));
        assert!(!attrs.set("required", Some("")));
        assert!(attrs.set("required", None));
        assert!(!attrs.set("bogus", Some("x")));
        assert_eq!(attrs.get("required"), None);
    }

    #[test]
    fn test_map_keeps_canonical_order() {
        let mut attrs = ComboboxAttributes::default();
        attrs.set("valueis", Some("anyvalue"));
        attrs.set("filter", Some(""));
        attrs.set("name", Some("fruit"));
        let keys: Vec<_> = attrs.to_map().keys().copied().collect();
        assert_eq!(keys, vec!["name", "filter", "valueis"]);
    }
}
