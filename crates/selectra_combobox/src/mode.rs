//! Mode transitions
//!
//! A mode is the pair (filtering, policy). Attribute writes only record the
//! new mode; the field applies one transition from the mode it had before
//! the current batch to the mode it has after it.

use crate::option::OptionKey;
use crate::text::FieldText;
use crate::value::FieldMode;

/// A pending change of mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModeTransition {
    pub from: FieldMode,
    pub to: FieldMode,
}

impl ModeTransition {
    pub fn new(from: FieldMode, to: FieldMode) -> Self {
        Self { from, to }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// Whether the field must fall back to its reset state.
    ///
    /// `candidate` is the option the field would keep (the selected option,
    /// or one whose label equals the text). `anyvalue` never resets, and an
    /// empty text under `clearable` stands for the empty value.
    pub fn requires_reset(
        &self,
        candidate: Option<OptionKey>,
        text: &str,
        has_options: bool,
    ) -> bool {
        if !has_options || candidate.is_some() || self.to.is_anyvalue() {
            return false;
        }
        !(self.to.allows_empty() && text.is_empty())
    }
}

/// Text and selection captured before a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaretSnapshot {
    text: String,
    selection: (usize, usize),
}

impl CaretSnapshot {
    pub fn take(text: &FieldText) -> Self {
        Self {
            text: text.data().to_string(),
            selection: text.selection(),
        }
    }

    /// Put the selection back if the text survived the transition
    /// unchanged; otherwise collapse the caret to the end.
    pub fn restore(&self, text: &mut FieldText) {
        if text.data() == self.text {
            text.set_selection(self.selection.0, self.selection.1);
        } else {
            text.move_to_end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValuePolicy;

    const ANY: FieldMode = FieldMode::new(true, ValuePolicy::AnyValue);
    const CLEAR: FieldMode = FieldMode::new(true, ValuePolicy::Clearable);
    const STRICT: FieldMode = FieldMode::new(true, ValuePolicy::Unclearable);
    const PLAIN: FieldMode = FieldMode::new(false, ValuePolicy::Unclearable);

    #[test]
    fn test_reset_rules() {
        assert!(ModeTransition::new(ANY, CLEAR).requires_reset(None, "Sevent", true));
        assert!(!ModeTransition::new(ANY, CLEAR).requires_reset(None, "", true));
        assert!(ModeTransition::new(CLEAR, STRICT).requires_reset(None, "", true));
        assert!(ModeTransition::new(STRICT, PLAIN).requires_reset(None, "", true));
        assert!(!ModeTransition::new(CLEAR, ANY).requires_reset(None, "x", true));
        assert!(!ModeTransition::new(ANY, PLAIN).requires_reset(None, "x", false));
    }

    #[test]
    fn test_noop() {
        assert!(ModeTransition::new(CLEAR, CLEAR).is_noop());
        assert!(!ModeTransition::new(CLEAR, ANY).is_noop());
    }

    #[test]
    fn test_caret_restored_only_for_same_text() {
        let mut text = FieldText::with_text("Two");
        text.set_selection(1, 2);
        let snapshot = CaretSnapshot::take(&text);

        snapshot.restore(&mut text);
        assert_eq!(text.selection(), (1, 2));

        text.replace("Three");
        text.set_selection(0, 0);
        snapshot.restore(&mut text);
        assert_eq!(text.selection(), (5, 5));
    }
}
