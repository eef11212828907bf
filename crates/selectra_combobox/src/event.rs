//! Events dispatched by the field and commands listeners may queue

use serde::{Deserialize, Serialize};
use selectra_core::events::{DispatchEvent, EventInit};

use crate::filter::FilterMethod;
use crate::text::{InputRecord, InputType};
use crate::value::ValuePolicy;

/// Routing key for [`ComboboxEvent`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Input,
    Change,
    FilterChange,
    Invalid,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Input => "input",
            EventKind::Change => "change",
            EventKind::FilterChange => "filterchange",
            EventKind::Invalid => "invalid",
        }
    }
}

/// An event fired by a combobox field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComboboxEvent {
    /// The text changed
    Input {
        data: Option<String>,
        data_transfer: Option<String>,
        input_type: InputType,
    },
    /// The committed value changed through user interaction
    Change,
    /// The filter text is about to be applied
    FilterChange,
    /// A validity check failed
    Invalid,
}

impl ComboboxEvent {
    pub fn input(record: &InputRecord) -> Self {
        ComboboxEvent::Input {
            data: record.data.clone(),
            data_transfer: record.data_transfer.clone(),
            input_type: record.input_type,
        }
    }
}

impl DispatchEvent for ComboboxEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            ComboboxEvent::Input { .. } => EventKind::Input,
            ComboboxEvent::Change => EventKind::Change,
            ComboboxEvent::FilterChange => EventKind::FilterChange,
            ComboboxEvent::Invalid => EventKind::Invalid,
        }
    }

    fn init(&self) -> EventInit {
        match self {
            ComboboxEvent::Input { .. } => EventInit::new(true, true, false),
            ComboboxEvent::Change => EventInit::new(true, false, false),
            ComboboxEvent::FilterChange => EventInit::new(true, false, true),
            ComboboxEvent::Invalid => EventInit::CANCELABLE,
        }
    }
}

/// A deferred write issued from inside a listener.
///
/// Commands run after the operation that dispatched the event finishes, in
/// the order they were queued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldCommand {
    SetValue(String),
    ForceEmptyValue,
    SetCustomValidity(String),
    SetFilter(bool),
    SetValuePolicy(Option<ValuePolicy>),
    SetFilterMethod(FilterMethod),
    SetRequired(bool),
    SetDisabled(bool),
}

/// Context type seen by field listeners
pub type FieldDispatch<'a> = selectra_core::events::Dispatch<'a, ComboboxEvent, FieldCommand>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_flags() {
        let input = ComboboxEvent::input(&InputRecord::new(InputType::InsertText));
        let init = input.init();
        assert!(init.bubbles && init.composed && !init.cancelable);

        let change = ComboboxEvent::Change.init();
        assert!(change.bubbles && !change.composed && !change.cancelable);

        assert!(ComboboxEvent::FilterChange.init().cancelable);

        let invalid = ComboboxEvent::Invalid.init();
        assert!(invalid.cancelable && !invalid.bubbles);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(ComboboxEvent::FilterChange.kind().as_str(), "filterchange");
        assert_eq!(
            ComboboxEvent::input(&InputRecord::replacement("x")).kind(),
            EventKind::Input
        );
    }
}
