//! Selectra Combobox
//!
//! A headless combobox form control. The field owns its options, its text
//! and every piece of state derived from them:
//!
//! - **Option Registry**: ordered options with single selection and derived ids
//! - **Filtering**: `startsWith`/`includes` matching with a pluggable [`FilterStrategy`]
//! - **Value Policies**: `unclearable`, `clearable` and `anyvalue` commit rules
//! - **Keyboard**: arrow/Home/End navigation and typeahead search
//! - **Forms**: validity, custom errors, reset and state restore
//! - **ARIA**: consistent combobox/listbox/option attribute snapshots
//!
//! Rendering is left to the host. Feed interactions in, read state and
//! events out.
//!
//! # Quick Start
//!
//! ```rust
//! use selectra_combobox::prelude::*;
//!
//! let mut field = ComboboxField::builder("fruit")
//!     .options(["Apple", "Banana", "Cherry"].map(OptionInit::new))
//!     .build()
//!     .unwrap();
//!
//! // Non-filtering fields open on ArrowDown with the selection active
//! field.handle_key(KeyEvent::new(KeyCode::ArrowDown));
//! field.handle_key(KeyEvent::new(KeyCode::End));
//! field.handle_key(KeyEvent::new(KeyCode::Enter));
//! assert_eq!(field.value(), Some("Cherry"));
//! ```

pub mod aria;
pub mod builder;
pub mod config;
pub mod error;
pub mod event;
pub mod field;
pub mod filter;
pub mod ids;
pub mod mode;
pub mod navigation;
pub mod option;
pub mod registry;
pub mod text;
pub mod validity;
pub mod value;

pub use aria::AriaSnapshot;
pub use builder::ComboboxBuilder;
pub use config::ComboboxAttributes;
pub use error::{ComboboxError, ErrorKind, Result};
pub use event::{ComboboxEvent, EventKind, FieldCommand};
pub use field::{ComboboxField, KeyOutcome};
pub use filter::{DefaultFilter, FilterMethod, FilterQuery, FilterState, FilterStrategy};
pub use option::{ComboboxOption, ListboxNode, OptionInit, OptionKey};
pub use registry::{OptionRegistry, OptionsMut};
pub use text::{FieldText, InputType, TextEdit};
pub use validity::ValidityState;
pub use value::{ComboboxValue, FieldMode, ValuePolicy};

/// Common imports for driving a field
pub mod prelude {
    pub use crate::builder::ComboboxBuilder;
    pub use crate::error::ComboboxError;
    pub use crate::event::{ComboboxEvent, EventKind, FieldCommand};
    pub use crate::field::{ComboboxField, KeyOutcome};
    pub use crate::filter::{FilterMethod, FilterQuery, FilterStrategy};
    pub use crate::option::{ListboxNode, OptionInit, OptionKey};
    pub use crate::text::TextEdit;
    pub use crate::value::{FieldMode, ValuePolicy};

    pub use selectra_core::{DispatchEvent, KeyCode, KeyEvent, ManualClock, Modifiers};
}
