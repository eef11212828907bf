//! Event dispatch with cancelation and deferred commands
//!
//! Listeners are plain closures keyed by event kind. A listener never gets
//! mutable access to the component that dispatched the event; instead it
//! receives a [`Dispatch`] context through which it can cancel the event or
//! queue commands. The component drains queued commands after the current
//! operation finishes, which keeps every write in arrival order and makes
//! recursive re-entry impossible.
//!
//! # Example
//!
//! ```rust
//! use selectra_core::events::{DispatchEvent, EventDispatcher, EventInit};
//!
//! #[derive(Debug)]
//! struct Ping;
//!
//! impl DispatchEvent for Ping {
//!     type Kind = ();
//!     fn kind(&self) {}
//!     fn init(&self) -> EventInit {
//!         EventInit::CANCELABLE
//!     }
//! }
//!
//! let mut dispatcher: EventDispatcher<Ping, &'static str> = EventDispatcher::new();
//! dispatcher.add_listener((), |ctx| {
//!     ctx.prevent_default();
//!     ctx.queue("pong");
//! });
//!
//! let outcome = dispatcher.dispatch(&Ping);
//! assert!(outcome.default_prevented);
//! assert_eq!(outcome.commands, vec!["pong"]);
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::fmt::Debug;

new_key_type! {
    /// Handle returned by [`EventDispatcher::add_listener`]
    pub struct ListenerId;
}

/// Static dispatch flags of an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventInit {
    /// Whether the event propagates to ancestors
    pub bubbles: bool,
    /// Whether the event crosses shadow boundaries
    pub composed: bool,
    /// Whether listeners may prevent the default action
    pub cancelable: bool,
}

impl EventInit {
    /// Plain event: no bubbling, not composed, not cancelable
    pub const PLAIN: Self = Self {
        bubbles: false,
        composed: false,
        cancelable: false,
    };

    /// Cancelable event that does not bubble
    pub const CANCELABLE: Self = Self {
        bubbles: false,
        composed: false,
        cancelable: true,
    };

    pub const fn new(bubbles: bool, composed: bool, cancelable: bool) -> Self {
        Self {
            bubbles,
            composed,
            cancelable,
        }
    }
}

/// An event that can be routed through an [`EventDispatcher`]
pub trait DispatchEvent {
    /// Routing key listeners subscribe to
    type Kind: Copy + Eq + Debug;

    /// The routing key of this event
    fn kind(&self) -> Self::Kind;

    /// Dispatch flags of this event
    fn init(&self) -> EventInit;
}

/// Context handed to a listener while an event is being dispatched
pub struct Dispatch<'a, E, C> {
    event: &'a E,
    init: EventInit,
    default_prevented: bool,
    stopped: bool,
    commands: &'a mut Vec<C>,
}

impl<'a, E, C> Dispatch<'a, E, C> {
    /// The event being dispatched
    pub fn event(&self) -> &E {
        self.event
    }

    /// Dispatch flags of the event
    pub fn init(&self) -> EventInit {
        self.init
    }

    /// Cancel the default action. Ignored for non-cancelable events.
    pub fn prevent_default(&mut self) {
        if self.init.cancelable {
            self.default_prevented = true;
        }
    }

    /// Whether any listener so far canceled the event
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Skip the remaining listeners for this dispatch
    pub fn stop_immediate_propagation(&mut self) {
        self.stopped = true;
    }

    /// Queue a command for the dispatching component.
    ///
    /// Commands run after the current operation completes, in the order
    /// they were queued.
    pub fn queue(&mut self, command: C) {
        self.commands.push(command);
    }
}

/// Boxed listener callback
pub type ListenerFn<E, C> = Box<dyn FnMut(&mut Dispatch<'_, E, C>)>;

struct ListenerNode<E: DispatchEvent, C> {
    kind: E::Kind,
    once: bool,
    callback: ListenerFn<E, C>,
}

/// Result of dispatching a single event
#[derive(Debug)]
pub struct DispatchOutcome<C> {
    /// Whether a listener canceled the event
    pub default_prevented: bool,
    /// Commands queued by listeners, in arrival order
    pub commands: Vec<C>,
    /// Number of listeners that ran
    pub listeners_run: usize,
}

impl<C> DispatchOutcome<C> {
    /// `false` when the event was canceled, mirroring `dispatchEvent`
    pub fn proceed(&self) -> bool {
        !self.default_prevented
    }
}

/// Routes events of type `E` to listeners that may queue commands of type `C`
pub struct EventDispatcher<E: DispatchEvent, C> {
    listeners: SlotMap<ListenerId, ListenerNode<E, C>>,
    /// Registration order, used as dispatch order
    order: Vec<ListenerId>,
}

impl<E: DispatchEvent, C> EventDispatcher<E, C> {
    /// Create a dispatcher with no listeners
    pub fn new() -> Self {
        Self {
            listeners: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Register a listener for events of `kind`
    pub fn add_listener<F>(&mut self, kind: E::Kind, callback: F) -> ListenerId
    where
        F: FnMut(&mut Dispatch<'_, E, C>) + 'static,
    {
        self.insert(kind, false, Box::new(callback))
    }

    /// Register a listener that is removed after its first invocation
    pub fn add_listener_once<F>(&mut self, kind: E::Kind, callback: F) -> ListenerId
    where
        F: FnMut(&mut Dispatch<'_, E, C>) + 'static,
    {
        self.insert(kind, true, Box::new(callback))
    }

    fn insert(&mut self, kind: E::Kind, once: bool, callback: ListenerFn<E, C>) -> ListenerId {
        let id = self.listeners.insert(ListenerNode {
            kind,
            once,
            callback,
        });
        self.order.push(id);
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        if self.listeners.remove(id).is_some() {
            self.order.retain(|l| *l != id);
            true
        } else {
            false
        }
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.order.clear();
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Number of listeners registered for `kind`
    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners.values().filter(|l| l.kind == kind).count()
    }

    /// Run every listener registered for the event's kind
    pub fn dispatch(&mut self, event: &E) -> DispatchOutcome<C> {
        let kind = event.kind();
        let init = event.init();

        let targets: SmallVec<[ListenerId; 8]> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.listeners.get(*id).is_some_and(|l| l.kind == kind))
            .collect();

        let mut commands = Vec::new();
        let mut expired: SmallVec<[ListenerId; 4]> = SmallVec::new();
        let mut listeners_run = 0;

        let mut ctx = Dispatch {
            event,
            init,
            default_prevented: false,
            stopped: false,
            commands: &mut commands,
        };

        for id in targets {
            let Some(node) = self.listeners.get_mut(id) else {
                continue;
            };
            (node.callback)(&mut ctx);
            listeners_run += 1;
            if node.once {
                expired.push(id);
            }
            if ctx.stopped {
                break;
            }
        }

        let default_prevented = ctx.default_prevented;

        for id in expired {
            self.remove_listener(id);
        }

        tracing::trace!(
            "dispatched {:?}: listeners={}, prevented={}",
            kind,
            listeners_run,
            default_prevented
        );

        DispatchOutcome {
            default_prevented,
            commands,
            listeners_run,
        }
    }
}

impl<E: DispatchEvent, C> Default for EventDispatcher<E, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Kind {
        Tap,
        Drop,
    }

    #[derive(Debug)]
    struct TestEvent {
        kind: Kind,
        cancelable: bool,
    }

    impl DispatchEvent for TestEvent {
        type Kind = Kind;

        fn kind(&self) -> Kind {
            self.kind
        }

        fn init(&self) -> EventInit {
            EventInit::new(true, false, self.cancelable)
        }
    }

    fn tap(cancelable: bool) -> TestEvent {
        TestEvent {
            kind: Kind::Tap,
            cancelable,
        }
    }

    #[test]
    fn test_dispatch_routes_by_kind_in_registration_order() {
        let mut dispatcher: EventDispatcher<TestEvent, ()> = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        dispatcher.add_listener(Kind::Tap, move |_| l1.borrow_mut().push("first"));
        let l2 = log.clone();
        dispatcher.add_listener(Kind::Drop, move |_| l2.borrow_mut().push("drop"));
        let l3 = log.clone();
        dispatcher.add_listener(Kind::Tap, move |_| l3.borrow_mut().push("second"));

        let outcome = dispatcher.dispatch(&tap(false));
        assert_eq!(outcome.listeners_run, 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_prevent_default_requires_cancelable() {
        let mut dispatcher: EventDispatcher<TestEvent, ()> = EventDispatcher::new();
        dispatcher.add_listener(Kind::Tap, |ctx| ctx.prevent_default());

        assert!(!dispatcher.dispatch(&tap(false)).default_prevented);
        assert!(dispatcher.dispatch(&tap(true)).default_prevented);
    }

    #[test]
    fn test_queued_commands_keep_arrival_order() {
        let mut dispatcher: EventDispatcher<TestEvent, u32> = EventDispatcher::new();
        dispatcher.add_listener(Kind::Tap, |ctx| {
            ctx.queue(1);
            ctx.queue(2);
        });
        dispatcher.add_listener(Kind::Tap, |ctx| ctx.queue(3));

        let outcome = dispatcher.dispatch(&tap(false));
        assert_eq!(outcome.commands, vec![1, 2, 3]);
    }

    #[test]
    fn test_once_listener_and_removal() {
        let mut dispatcher: EventDispatcher<TestEvent, ()> = EventDispatcher::new();
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        dispatcher.add_listener_once(Kind::Tap, move |_| *c.borrow_mut() += 1);
        let c = count.clone();
        let keep = dispatcher.add_listener(Kind::Tap, move |_| *c.borrow_mut() += 10);

        dispatcher.dispatch(&tap(false));
        dispatcher.dispatch(&tap(false));
        assert_eq!(*count.borrow(), 21);

        assert!(dispatcher.remove_listener(keep));
        assert!(!dispatcher.remove_listener(keep));
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_stop_immediate_propagation() {
        let mut dispatcher: EventDispatcher<TestEvent, ()> = EventDispatcher::new();
        dispatcher.add_listener(Kind::Tap, |ctx| ctx.stop_immediate_propagation());
        dispatcher.add_listener(Kind::Tap, |_| panic!("must not run"));

        let outcome = dispatcher.dispatch(&tap(false));
        assert_eq!(outcome.listeners_run, 1);
        assert_eq!(dispatcher.listener_count(Kind::Tap), 2);
    }
}
