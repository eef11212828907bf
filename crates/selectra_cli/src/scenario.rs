//! Scenario files
//!
//! A scenario describes one combobox (id, attributes, options), the steps to
//! replay against it, and optionally the state expected afterwards:
//!
//! ```toml
//! id = "size"
//!
//! [attributes]
//! filter = true
//! valueis = "clearable"
//!
//! [[options]]
//! label = "Small"
//!
//! [[options]]
//! label = "Medium"
//!
//! [[steps]]
//! action = "type"
//! text = "med"
//!
//! [[steps]]
//! action = "key"
//! key = "ArrowDown"
//!
//! [expect]
//! value = "Medium"
//! ```
//!
//! Time is simulated: `wait` steps advance a manual clock, so typeahead
//! timeouts replay deterministically.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use selectra_combobox::aria::AriaSnapshot;
use selectra_combobox::config::ComboboxAttributes;
use selectra_combobox::prelude::*;

// =============================================================================
// Scenario
// =============================================================================

/// A scenario file
#[derive(Debug, Deserialize, Serialize)]
pub struct Scenario {
    /// Combobox id
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub attributes: ComboboxAttributes,
    #[serde(default)]
    pub options: Vec<OptionInit>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

/// One replayed interaction
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Type text at the caret, one character at a time
    Type { text: String },
    Paste { text: String },
    Backspace {
        #[serde(default = "default_count")]
        count: usize,
    },
    /// Select a character range of the text
    Select { start: usize, end: usize },
    /// Press a key by its DOM name (`ArrowDown`, `Enter`, `s`, ...)
    Key {
        key: String,
        #[serde(default)]
        alt: bool,
    },
    Click,
    ClickOption { value: String },
    Focus,
    Blur,
    SetValue { value: String },
    ForceEmpty,
    /// Advance the scenario clock
    Wait { ms: u64 },
    SetAttribute {
        name: String,
        #[serde(default)]
        value: Option<String>,
    },
    AppendOption(OptionInit),
    RemoveOption { value: String },
    Reset,
    CheckValidity,
    /// Nested steps replayed inside one batch, recomputed once at the end
    Batch { steps: Vec<Step> },
}

fn default_count() -> usize {
    1
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Type { .. } => "type",
            Step::Paste { .. } => "paste",
            Step::Backspace { .. } => "backspace",
            Step::Select { .. } => "select",
            Step::Key { .. } => "key",
            Step::Click => "click",
            Step::ClickOption { .. } => "click_option",
            Step::Focus => "focus",
            Step::Blur => "blur",
            Step::SetValue { .. } => "set_value",
            Step::ForceEmpty => "force_empty",
            Step::Wait { .. } => "wait",
            Step::SetAttribute { .. } => "set_attribute",
            Step::AppendOption(_) => "append_option",
            Step::RemoveOption { .. } => "remove_option",
            Step::Reset => "reset",
            Step::CheckValidity => "check_validity",
            Step::Batch { .. } => "batch",
        }
    }

    /// Short human-readable form for text transcripts
    pub fn describe(&self) -> String {
        match self {
            Step::Type { text } | Step::Paste { text } => format!("{} {:?}", self.name(), text),
            Step::Backspace { count } => format!("backspace x{}", count),
            Step::Select { start, end } => format!("select {}..{}", start, end),
            Step::Key { key, alt: true } => format!("key Alt+{}", key),
            Step::Key { key, .. } => format!("key {}", key),
            Step::ClickOption { value }
            | Step::SetValue { value }
            | Step::RemoveOption { value } => format!("{} {:?}", self.name(), value),
            Step::Wait { ms } => format!("wait {}ms", ms),
            Step::SetAttribute { name, value } => match value {
                Some(value) => format!("set_attribute {}={:?}", name, value),
                None => format!("remove_attribute {}", name),
            },
            Step::AppendOption(option) => format!("append_option {:?}", option.label),
            Step::Batch { steps } => {
                let inner: Vec<_> = steps.iter().map(Step::describe).collect();
                format!("batch [{}]", inner.join("; "))
            }
            _ => self.name().to_string(),
        }
    }
}

/// State checked by `selectra check`
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Expectation {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub expanded: Option<bool>,
    #[serde(default)]
    pub valid: Option<bool>,
    /// Every event fired during the replay, in order
    #[serde(default)]
    pub events: Option<Vec<EventKind>>,
}

// =============================================================================
// Transcript
// =============================================================================

/// Observable field state after a step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    pub value: Option<String>,
    pub text: String,
    pub expanded: bool,
    /// Label of the active option
    pub active: Option<String>,
    /// Label of the selected option
    pub selected: Option<String>,
    pub matching: usize,
    pub valid: bool,
}

impl FieldSnapshot {
    pub fn of(field: &ComboboxField) -> Self {
        let label = |key: Option<OptionKey>| {
            key.map(|_| field.registry().label_of(key).to_string())
        };
        Self {
            value: field.value().map(String::from),
            text: field.text().data().to_string(),
            expanded: field.is_expanded(),
            active: label(field.active_option()),
            selected: label(field.selected_option()),
            matching: field.filter_state().matching_options().len(),
            valid: field.validity().valid(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub step: Step,
    /// Outcome worth reporting (rejected writes, key handling, errors)
    pub note: Option<String>,
    pub events: Vec<EventKind>,
    pub state: FieldSnapshot,
}

/// Result of replaying a scenario
#[derive(Debug, Serialize)]
pub struct Transcript {
    pub id: String,
    pub initial: FieldSnapshot,
    pub steps: Vec<StepRecord>,
    pub aria: AriaSnapshot,
}

impl Transcript {
    pub fn final_state(&self) -> &FieldSnapshot {
        self.steps.last().map_or(&self.initial, |record| &record.state)
    }

    pub fn events(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.steps.iter().flat_map(|record| record.events.iter().copied())
    }
}

// =============================================================================
// Replay
// =============================================================================

impl Scenario {
    /// Load a scenario from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Mount the field described by the scenario
    pub fn mount(&self, clock: &ManualClock) -> Result<ComboboxField> {
        ComboboxField::builder(&self.id)
            .attributes(self.attributes.clone())
            .options(self.options.iter().cloned())
            .clock(clock.shared())
            .build()
            .with_context(|| format!("Failed to mount combobox #{}", self.id))
    }

    /// Replay every step and record the state after each one
    pub fn run(&self) -> Result<Transcript> {
        let clock = ManualClock::new();
        let mut field = self.mount(&clock)?;

        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            EventKind::Input,
            EventKind::Change,
            EventKind::FilterChange,
            EventKind::Invalid,
        ] {
            let log = log.clone();
            field.add_event_listener(kind, move |ctx| log.borrow_mut().push(ctx.event().kind()));
        }

        let initial = FieldSnapshot::of(&field);
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            let note = apply(&mut field, &clock, step)
                .with_context(|| format!("Step {} ({}) failed", index + 1, step.name()))?;
            let events: Vec<EventKind> = log.borrow_mut().drain(..).collect();
            tracing::debug!(
                "step {}: {} -> {} event(s)",
                index + 1,
                step.describe(),
                events.len()
            );
            steps.push(StepRecord {
                index: index + 1,
                step: step.clone(),
                note,
                events,
                state: FieldSnapshot::of(&field),
            });
        }

        Ok(Transcript {
            id: self.id.clone(),
            initial,
            steps,
            aria: field.aria(),
        })
    }
}

fn apply(field: &mut ComboboxField, clock: &ManualClock, step: &Step) -> Result<Option<String>> {
    let ignored = |changed: bool| (!changed).then(|| "ignored".to_string());

    let note = match step {
        Step::Type { text } => {
            let mut changed = false;
            for ch in text.chars() {
                changed |= field.edit_text(TextEdit::insert(ch.to_string()));
            }
            ignored(changed)
        }
        Step::Paste { text } => ignored(field.edit_text(TextEdit::Paste(text.clone()))),
        Step::Backspace { count } => {
            let mut changed = false;
            for _ in 0..*count {
                changed |= field.edit_text(TextEdit::DeleteBackward);
            }
            ignored(changed)
        }
        Step::Select { start, end } => {
            field.set_text_selection(*start, *end);
            None
        }
        Step::Key { key, alt } => {
            let code = KeyCode::from_key_name(key);
            if matches!(code, KeyCode::Other(_)) {
                bail!("Unknown key '{}'", key);
            }
            let event = if *alt {
                KeyEvent::alt(code)
            } else {
                KeyEvent::new(code)
            };
            let outcome = field.handle_key(event);
            Some(
                match (outcome.handled, outcome.prevent_default) {
                    (false, _) => "unhandled",
                    (true, true) => "consumed",
                    (true, false) => "handled",
                }
                .to_string(),
            )
        }
        Step::Click => {
            field.click();
            None
        }
        Step::ClickOption { value } => {
            let key = option_by_value(field, value)?;
            ignored(field.click_option(key))
        }
        Step::Focus => {
            field.focus_in();
            None
        }
        Step::Blur => {
            field.focus_out();
            None
        }
        Step::SetValue { value } => (!field.set_value(value)).then(|| "rejected".to_string()),
        Step::ForceEmpty => field.force_empty_value().err().map(|err| err.to_string()),
        Step::Wait { ms } => {
            clock.advance_ms(*ms);
            None
        }
        Step::SetAttribute { name, value } => {
            field
                .set_attribute(name, value.as_deref())
                .with_context(|| format!("Invalid value for attribute '{}'", name))?;
            None
        }
        Step::AppendOption(option) => ignored(field.append_option(option.clone()).is_some()),
        Step::RemoveOption { value } => {
            let key = option_by_value(field, value)?;
            ignored(field.remove_option(key))
        }
        Step::Reset => {
            field.form_reset();
            None
        }
        Step::CheckValidity => Some(if field.check_validity() {
            "valid".to_string()
        } else {
            format!("invalid: {}", field.validation_message())
        }),
        Step::Batch { steps } => {
            let notes = field.batch(|field| {
                steps
                    .iter()
                    .map(|step| apply(field, clock, step))
                    .collect::<Result<Vec<_>>>()
            })?;
            let notes: Vec<String> = notes.into_iter().flatten().collect();
            (!notes.is_empty()).then(|| notes.join("; "))
        }
    };
    Ok(note)
}

fn option_by_value(field: &ComboboxField, value: &str) -> Result<OptionKey> {
    field
        .registry()
        .by_value(value)
        .with_context(|| format!("No option with value '{}'", value))
}

// =============================================================================
// Expectations
// =============================================================================

impl Expectation {
    /// Compare against a transcript. Returns one message per mismatch.
    pub fn verify(&self, transcript: &Transcript) -> Vec<String> {
        let state = transcript.final_state();
        let mut mismatches = Vec::new();

        if let Some(value) = &self.value {
            if state.value.as_ref() != Some(value) {
                mismatches.push(format!("value: expected {:?}, got {:?}", value, state.value));
            }
        }
        if let Some(text) = &self.text {
            if &state.text != text {
                mismatches.push(format!("text: expected {:?}, got {:?}", text, state.text));
            }
        }
        if let Some(expanded) = self.expanded {
            if state.expanded != expanded {
                mismatches.push(format!("expanded: expected {}, got {}", expanded, state.expanded));
            }
        }
        if let Some(valid) = self.valid {
            if state.valid != valid {
                mismatches.push(format!("valid: expected {}, got {}", valid, state.valid));
            }
        }
        if let Some(events) = &self.events {
            let fired: Vec<EventKind> = transcript.events().collect();
            if &fired != events {
                let names = |kinds: &[EventKind]| {
                    kinds.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", ")
                };
                mismatches.push(format!(
                    "events: expected [{}], got [{}]",
                    names(events.as_slice()),
                    names(&fired)
                ));
            }
        }
        mismatches
    }
}
