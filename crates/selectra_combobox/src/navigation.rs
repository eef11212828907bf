//! Active-option navigation and typeahead
//!
//! The active option is a cursor into the matching set used for
//! `aria-activedescendant`. Arrow keys move it without wrapping; typeahead
//! (non-filtering fields only) searches labels by prefix and does wrap.

use std::time::Duration;

use selectra_core::clock::IdleTimer;

use crate::option::OptionKey;
use crate::registry::OptionRegistry;

/// Idle time after which the typeahead buffer starts over
pub const TYPEAHEAD_TIMEOUT: Duration = Duration::from_millis(500);

/// A cursor movement within the matching set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavStep {
    Next,
    Previous,
    First,
    Last,
}

/// Move `active` by `step` within `matching`.
///
/// Stops at the boundaries. With no active option, `Next` lands on the first
/// option and `Previous` on the last.
pub fn step(matching: &[OptionKey], active: Option<OptionKey>, step: NavStep) -> Option<OptionKey> {
    let last = matching.len().checked_sub(1)?;
    let position = active.and_then(|key| matching.iter().position(|k| *k == key));

    let index = match (step, position) {
        (NavStep::First, _) => 0,
        (NavStep::Last, _) => last,
        (NavStep::Next, Some(i)) => (i + 1).min(last),
        (NavStep::Next, None) => 0,
        (NavStep::Previous, Some(i)) => i.saturating_sub(1),
        (NavStep::Previous, None) => last,
    };
    matching.get(index).copied()
}

/// Prefix search over option labels with an idle-reset buffer
#[derive(Clone, Debug)]
pub struct Typeahead {
    buffer: String,
    timer: IdleTimer,
}

impl Typeahead {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buffer: String::new(),
            timer: IdleTimer::new(timeout),
        }
    }

    /// Current search buffer (may be stale; see [`Typeahead::is_searching`])
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Whether a search is in progress at `now`
    pub fn is_searching(&self, now: Duration) -> bool {
        !self.buffer.is_empty() && self.timer.is_armed() && !self.timer.has_elapsed(now)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.timer.cancel();
    }

    /// Feed one character and return the option it lands on.
    ///
    /// The scan starts at the option after `from` and wraps. If the
    /// accumulated buffer matches nothing, the buffer restarts with `ch`
    /// alone.
    pub fn search(
        &mut self,
        registry: &OptionRegistry,
        candidates: &[OptionKey],
        from: Option<OptionKey>,
        ch: char,
        now: Duration,
    ) -> Option<OptionKey> {
        if self.timer.has_elapsed(now) {
            self.buffer.clear();
        }
        self.timer.restart(now);
        self.buffer.extend(ch.to_lowercase());

        if let Some(hit) = scan(registry, candidates, from, &self.buffer) {
            return Some(hit);
        }

        self.buffer.clear();
        self.buffer.extend(ch.to_lowercase());
        scan(registry, candidates, from, &self.buffer)
    }
}

impl Default for Typeahead {
    fn default() -> Self {
        Self::new(TYPEAHEAD_TIMEOUT)
    }
}

fn scan(
    registry: &OptionRegistry,
    candidates: &[OptionKey],
    from: Option<OptionKey>,
    prefix: &str,
) -> Option<OptionKey> {
    let len = candidates.len();
    let start = from
        .and_then(|key| candidates.iter().position(|k| *k == key))
        .map_or(0, |i| i + 1);

    (0..len)
        .map(|offset| candidates[(start + offset) % len])
        .find(|key| {
            registry
                .get(*key)
                .is_some_and(|option| option.label().to_lowercase().starts_with(prefix))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionInit;
    use crate::registry::RegistryChanges;

    const ORDINALS: [&str; 10] = [
        "First", "Second", "Third", "Fourth", "Fifth", "Sixth", "Seventh", "Eighth", "Ninth",
        "Tenth",
    ];

    fn ordinals() -> OptionRegistry {
        let mut registry = OptionRegistry::new("cb");
        let mut changes = RegistryChanges::default();
        let mut m = registry.mutate(&mut changes);
        for label in ORDINALS {
            m.append(OptionInit::new(label));
        }
        drop(m);
        registry
    }

    fn label(registry: &OptionRegistry, key: Option<OptionKey>) -> &str {
        registry.label_of(key)
    }

    #[test]
    fn test_step_has_no_wraparound() {
        let registry = ordinals();
        let keys = registry.keys();
        assert_eq!(step(keys, None, NavStep::Next), Some(keys[0]));
        assert_eq!(step(keys, None, NavStep::Previous), Some(keys[9]));
        assert_eq!(step(keys, Some(keys[9]), NavStep::Next), Some(keys[9]));
        assert_eq!(step(keys, Some(keys[0]), NavStep::Previous), Some(keys[0]));
        assert_eq!(step(keys, Some(keys[4]), NavStep::Last), Some(keys[9]));
        assert_eq!(step(&[], None, NavStep::First), None);
    }

    #[test]
    fn test_repeated_letter_scans_forward() {
        let registry = ordinals();
        let keys = registry.keys().to_vec();
        let mut typeahead = Typeahead::default();
        let t0 = Duration::ZERO;

        let first = typeahead.search(&registry, &keys, None, 'S', t0);
        assert_eq!(label(&registry, first), "Second");

        let later = t0 + Duration::from_millis(100);
        let second = typeahead.search(&registry, &keys, first, 'S', later);
        assert_eq!(label(&registry, second), "Sixth");
        assert_eq!(typeahead.buffer(), "s");
    }

    #[test]
    fn test_accumulated_prefix() {
        let registry = ordinals();
        let keys = registry.keys().to_vec();
        let mut typeahead = Typeahead::default();
        let mut now = Duration::ZERO;
        let mut active = None;
        for ch in ['S', 'e', 'v'] {
            active = typeahead.search(&registry, &keys, active, ch, now);
            now += Duration::from_millis(50);
        }
        assert_eq!(label(&registry, active), "Seventh");
        assert!(typeahead.is_searching(now));
    }

    #[test]
    fn test_idle_timeout_resets_buffer() {
        let registry = ordinals();
        let keys = registry.keys().to_vec();
        let mut typeahead = Typeahead::default();

        let active = typeahead.search(&registry, &keys, None, 's', Duration::ZERO);
        assert_eq!(label(&registry, active), "Second");

        let later = TYPEAHEAD_TIMEOUT;
        assert!(!typeahead.is_searching(later));
        let active = typeahead.search(&registry, &keys, active, 'n', later);
        assert_eq!(label(&registry, active), "Ninth");
        assert_eq!(typeahead.buffer(), "n");
    }

    #[test]
    fn test_no_match_keeps_nothing() {
        let registry = ordinals();
        let keys = registry.keys().to_vec();
        let mut typeahead = Typeahead::default();
        assert_eq!(
            typeahead.search(&registry, &keys, None, 'z', Duration::ZERO),
            None
        );
    }
}
