//! Selectra Core Runtime
//!
//! UI-agnostic building blocks shared by Selectra's headless form controls:
//!
//! - **Event Dispatch**: kind-routed listeners with cancelation and deferred commands
//! - **Keyboard Model**: logical key codes and modifiers
//! - **Batching**: nesting counters and dirty accumulators for single-pass recomputation
//! - **Clocks**: injectable time sources and idle timers
//!
//! This crate does not depend on any rendering, layout or platform API.

pub mod batch;
pub mod clock;
pub mod events;
pub mod key;

pub use batch::{BatchDepth, Dirty};
pub use clock::{Clock, IdleTimer, ManualClock, SharedClock, SystemClock};
pub use events::{
    Dispatch, DispatchEvent, DispatchOutcome, EventDispatcher, EventInit, ListenerFn, ListenerId,
};
pub use key::{KeyCode, KeyEvent, Modifiers};
