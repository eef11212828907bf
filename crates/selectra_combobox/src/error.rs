//! Error types for selectra_combobox
//!
//! Only structural setup violations and misuse of public methods are errors.
//! Foreign listbox children are ignored, and validation failures live in
//! [`ValidityState`](crate::validity::ValidityState).

use thiserror::Error;

/// Errors raised by the combobox field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComboboxError {
    /// The combobox id is empty or contains whitespace
    #[error("Combobox id must be a non-empty string without whitespace, got {0:?}")]
    InvalidId(String),

    /// More than one listbox was mounted under the field
    #[error("A combobox field may own only one listbox, found {0}")]
    MultipleListboxes(usize),

    /// A child part used a tag name that was never registered
    #[error("Unregistered combobox part: <{0}>")]
    UnregisteredPart(String),

    /// `force_empty_value` called outside filter mode or under `unclearable`
    #[error(
        "Method requires `filter` mode to be on and `valueis` to be `anyvalue` or `clearable`"
    )]
    ForceEmptyUnsupported,

    /// `force_empty_value` called on a `clearable` field that owns no options
    #[error("Cannot coerce value to `\"\"` for a `clearable` combobox that owns no options")]
    ForceEmptyUninitialized,
}

/// Broad classification of [`ComboboxError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal to the mount that raised it
    Configuration,
    /// Recoverable misuse of a public method (a `TypeError` in DOM terms)
    Usage,
}

impl ComboboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComboboxError::InvalidId(_)
            | ComboboxError::MultipleListboxes(_)
            | ComboboxError::UnregisteredPart(_) => ErrorKind::Configuration,
            ComboboxError::ForceEmptyUnsupported | ComboboxError::ForceEmptyUninitialized => {
                ErrorKind::Usage
            }
        }
    }
}

/// Result type for combobox operations
pub type Result<T> = std::result::Result<T, ComboboxError>;
