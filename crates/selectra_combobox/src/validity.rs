//! Constraint validation state

use serde::{Deserialize, Serialize};

/// Validity flags of a field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityState {
    /// Required and the value is `""` or `null`
    pub value_missing: bool,
    /// A non-empty custom message is set
    pub custom_error: bool,
}

impl ValidityState {
    /// No flag is set
    pub fn valid(&self) -> bool {
        !self.value_missing && !self.custom_error
    }
}

/// Tracks validation messages and derives [`ValidityState`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    required: bool,
    custom_message: String,
    /// Message used for `valueMissing`; kept while a custom message shadows it
    value_missing_message: String,
}

impl Validator {
    pub fn new(value_missing_message: impl Into<String>) -> Self {
        Self {
            required: false,
            custom_message: String::new(),
            value_missing_message: value_missing_message.into(),
        }
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    pub fn custom_message(&self) -> &str {
        &self.custom_message
    }

    /// Set or clear (with `""`) the custom message
    pub fn set_custom_validity(&mut self, message: impl Into<String>) {
        self.custom_message = message.into();
    }

    pub fn value_missing_message(&self) -> &str {
        &self.value_missing_message
    }

    pub fn set_value_missing_message(&mut self, message: impl Into<String>) {
        self.value_missing_message = message.into();
    }

    /// Flags for the given committed value
    pub fn validity(&self, value: Option<&str>) -> ValidityState {
        ValidityState {
            value_missing: self.required && value.map_or(true, str::is_empty),
            custom_error: !self.custom_message.is_empty(),
        }
    }

    /// Message shown for the current flags. A custom error shadows
    /// `valueMissing`.
    pub fn message(&self, value: Option<&str>) -> &str {
        let validity = self.validity(value);
        if validity.custom_error {
            &self.custom_message
        } else if validity.value_missing {
            &self.value_missing_message
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_missing_for_null_and_empty() {
        let mut v = Validator::new("Pick one");
        assert!(v.validity(None).valid());

        v.set_required(true);
        assert!(v.validity(None).value_missing);
        assert!(v.validity(Some("")).value_missing);
        assert!(v.validity(Some("a")).valid());
        assert_eq!(v.message(Some("")), "Pick one");
    }

    #[test]
    fn test_custom_error_precedence() {
        let mut v = Validator::new("Pick one");
        v.set_required(true);
        v.set_custom_validity("Nope");
        assert_eq!(v.message(Some("")), "Nope");

        // Updated while shadowed, resurfaces once the custom error clears
        v.set_value_missing_message("Choose something");
        assert_eq!(v.message(Some("")), "Nope");
        v.set_custom_validity("");
        assert_eq!(v.message(Some("")), "Choose something");
        assert!(!v.validity(Some("")).custom_error);
    }
}
