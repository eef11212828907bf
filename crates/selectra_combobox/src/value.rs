//! Value policies
//!
//! The committed value of a field depends on its policy and on whether
//! filtering is on:
//!
//! | mode | value |
//! |---|---|
//! | no filter | selected option's value (`None` with no options) |
//! | `unclearable` | selected option's value; text is cosmetic |
//! | `clearable` | `""` for empty or unmatched text, else the matched option's value |
//! | `anyvalue` | the literal text |

use serde::{Deserialize, Serialize};

use crate::registry::OptionRegistry;

/// Committed value as seen by the owning form. `None` is the uninitialized
/// (`null`) value.
pub type ComboboxValue = Option<String>;

/// How the field coerces text into a value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuePolicy {
    /// Value always names an option
    #[default]
    Unclearable,
    /// Value names an option or is `""`
    Clearable,
    /// Value is whatever the user typed
    AnyValue,
}

impl ValuePolicy {
    /// Parse a `valueis` attribute value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unclearable" => Some(ValuePolicy::Unclearable),
            "clearable" => Some(ValuePolicy::Clearable),
            "anyvalue" => Some(ValuePolicy::AnyValue),
            _ => None,
        }
    }

    /// Effective policy for a `valueis` attribute and a filter flag.
    /// Without filtering the policy is always `unclearable`; with filtering a
    /// missing or unknown attribute means `clearable`.
    pub fn resolve(attribute: Option<&str>, filtering: bool) -> Self {
        if !filtering {
            return ValuePolicy::Unclearable;
        }
        attribute
            .and_then(ValuePolicy::parse)
            .unwrap_or(ValuePolicy::Clearable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValuePolicy::Unclearable => "unclearable",
            ValuePolicy::Clearable => "clearable",
            ValuePolicy::AnyValue => "anyvalue",
        }
    }
}

/// Filter flag and policy in effect together
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMode {
    pub filtering: bool,
    pub policy: ValuePolicy,
}

impl FieldMode {
    pub const fn new(filtering: bool, policy: ValuePolicy) -> Self {
        Self { filtering, policy }
    }

    /// Build from raw attributes
    pub fn from_attributes(filtering: bool, valueis: Option<&str>) -> Self {
        Self::new(filtering, ValuePolicy::resolve(valueis, filtering))
    }

    /// Whether the field may hold a value that names no option
    pub fn allows_empty(&self) -> bool {
        self.filtering && self.policy != ValuePolicy::Unclearable
    }

    pub fn is_anyvalue(&self) -> bool {
        self.filtering && self.policy == ValuePolicy::AnyValue
    }
}

/// Whether `value` may be written to a field in `mode` holding `registry`
pub fn accepts_value(mode: FieldMode, registry: &OptionRegistry, value: &str) -> bool {
    if mode.is_anyvalue() {
        return true;
    }
    if value.is_empty() && !registry.is_empty() {
        return true;
    }
    registry.by_value(value).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionInit;
    use crate::registry::RegistryChanges;

    #[test]
    fn test_resolve_policy() {
        assert_eq!(
            ValuePolicy::resolve(Some("anyvalue"), false),
            ValuePolicy::Unclearable
        );
        assert_eq!(ValuePolicy::resolve(None, true), ValuePolicy::Clearable);
        assert_eq!(ValuePolicy::resolve(Some("bogus"), true), ValuePolicy::Clearable);
        assert_eq!(
            ValuePolicy::resolve(Some("unclearable"), true),
            ValuePolicy::Unclearable
        );
        assert_eq!(ValuePolicy::AnyValue.as_str(), "anyvalue");
    }

    #[test]
    fn test_accepts_value() {
        let mut registry = OptionRegistry::new("cb");
        let clearable = FieldMode::new(true, ValuePolicy::Clearable);
        let anyvalue = FieldMode::new(true, ValuePolicy::AnyValue);

        // "" is only accepted once options exist
        assert!(!accepts_value(clearable, &registry, ""));
        assert!(accepts_value(anyvalue, &registry, ""));

        let mut changes = RegistryChanges::default();
        registry.mutate(&mut changes).append(OptionInit::new("One"));

        assert!(accepts_value(clearable, &registry, ""));
        assert!(accepts_value(clearable, &registry, "One"));
        assert!(!accepts_value(clearable, &registry, "one"));
        assert!(!accepts_value(FieldMode::default(), &registry, "Two"));
        assert!(accepts_value(anyvalue, &registry, "Two"));
    }

    #[test]
    fn test_policy_serde_names() {
        #[derive(Deserialize)]
        struct Holder {
            valueis: ValuePolicy,
        }
        let holder: Holder = toml::from_str("valueis = \"anyvalue\"").unwrap();
        assert_eq!(holder.valueis, ValuePolicy::AnyValue);
    }
}
