//! Synchronous publish/subscribe used by models and collections.
//!
//! Listeners run inline, in registration order, before `emit` returns.
//! The listener table is never borrowed while a callback runs, so a
//! listener may register, remove, or emit on the same emitter.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Listeners registered under this name receive every event.
pub const ALL: &str = "all";

/// An event that knows the channel it is published on.
pub trait Event {
    fn event_type(&self) -> Cow<'_, str>;
}

/// Handle returned by [`EventEmitter::on`], used to remove exactly that listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener<E> {
    id: ListenerId,
    once: bool,
    callback: Rc<dyn Fn(&E)>,
}

pub struct EventEmitter<E> {
    listeners: RefCell<HashMap<String, Vec<Listener<E>>>>,
    next_id: Cell<u64>,
}

impl<E: Event> EventEmitter<E> {
    pub fn new() -> Self {
        EventEmitter {
            listeners: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register a listener for `event` (or [`ALL`]).
    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&E) + 'static,
    {
        self.register(event.into(), false, Rc::new(listener))
    }

    /// Register a listener that is removed after its first call.
    pub fn once<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&E) + 'static,
    {
        self.register(event.into(), true, Rc::new(listener))
    }

    fn register(&self, event: String, once: bool, callback: Rc<dyn Fn(&E)>) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push(Listener { id, once, callback });
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let mut removed = false;
        for event_listeners in listeners.values_mut() {
            let before = event_listeners.len();
            event_listeners.retain(|listener| listener.id != id);
            removed |= event_listeners.len() != before;
        }
        listeners.retain(|_, event_listeners| !event_listeners.is_empty());
        removed
    }

    /// Remove every listener registered for `event`.
    pub fn off_event(&self, event: &str) {
        self.listeners.borrow_mut().remove(event);
    }

    pub fn emit(&self, event: &E) {
        let name = event.event_type();
        let callbacks: Vec<Rc<dyn Fn(&E)>> = {
            let mut listeners = self.listeners.borrow_mut();
            let mut callbacks = Vec::new();
            let mut channels = vec![name.as_ref()];
            if name != ALL {
                channels.push(ALL);
            }
            for channel in channels {
                if let Some(event_listeners) = listeners.get_mut(channel) {
                    callbacks.extend(event_listeners.iter().map(|l| Rc::clone(&l.callback)));
                    event_listeners.retain(|listener| !listener.once);
                }
            }
            listeners.retain(|_, event_listeners| !event_listeners.is_empty());
            callbacks
        };

        for callback in callbacks {
            callback(event);
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.borrow().is_empty()
    }
}

impl<E: Event> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut channels: Vec<(&String, usize)> =
            listeners.iter().map(|(name, l)| (name, l.len())).collect();
        channels.sort();
        f.debug_struct("EventEmitter")
            .field("listeners", &channels)
            .finish()
    }
}
