//! Evented containers and the synchronous event emitter they share.
//!
//! Every one-to-many relationship in the project model is backed by an
//! [`EventedList`], and sparse per-sample metadata by an [`EventedDict`].
//! Both are cheaply clonable handles over shared storage, so closures wired
//! at load time can keep reading a collection after later mutations.
//!
//! Dispatch is synchronous and single-threaded: `emit` invokes every
//! subscriber in registration order on the calling thread, and a subscriber
//! may itself mutate other entities (which emits further events) before the
//! original `emit` returns.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

type Callback<T> = Rc<dyn Fn(&T)>;

/// A single-value observable with synchronous, in-order dispatch.
///
/// There is no unsubscribe primitive; subscriptions live as long as the
/// emitter. `block`/`unblock` suppress emission around bulk mutations.
pub struct EventEmitter<T> {
    inner: Rc<EmitterInner<T>>,
}

struct EmitterInner<T> {
    callbacks: RefCell<Vec<Callback<T>>>,
    blocked: Cell<bool>,
    dispatching: Cell<bool>,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                callbacks: RefCell::new(Vec::new()),
                blocked: Cell::new(false),
                dispatching: Cell::new(false),
            }),
        }
    }

    /// Register a subscriber. Subscribers fire in registration order.
    pub fn connect(&self, callback: impl Fn(&T) + 'static) {
        self.inner.callbacks.borrow_mut().push(Rc::new(callback));
    }

    /// Invoke every subscriber with `value`.
    ///
    /// A re-entrant emission on the same emitter (a subscriber looping back
    /// into the emitter it is being dispatched from) is dropped with a
    /// warning; cascades between distinct emitters are unaffected.
    pub fn emit(&self, value: &T) {
        if self.inner.blocked.get() {
            return;
        }
        if self.inner.dispatching.get() {
            log::warn!("re-entrant emission dropped");
            return;
        }

        self.inner.dispatching.set(true);
        // snapshot so a subscriber may connect() without poisoning the borrow
        let callbacks: Vec<Callback<T>> = self.inner.callbacks.borrow().clone();
        for callback in callbacks {
            callback(value);
        }
        self.inner.dispatching.set(false);
    }

    /// Suppress emission until `unblock` is called.
    pub fn block(&self) {
        self.inner.blocked.set(true);
    }

    /// Re-enable emission after a `block`.
    pub fn unblock(&self) {
        self.inner.blocked.set(false);
    }
}

impl<T> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EventEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("subscribers", &self.inner.callbacks.borrow().len())
            .finish()
    }
}

/// Payload of a list `added` event.
#[derive(Debug, Clone)]
pub struct ListAddition<T> {
    pub index: usize,
    pub item: T,
}

/// Payload of a list `deleted` event.
///
/// Every deletion path (`remove`, whatever the caller) reports the same
/// `{index, item}` shape.
#[derive(Debug, Clone)]
pub struct ListDeletion<T> {
    pub index: usize,
    pub item: T,
}

/// Payload of a list `swapped` event.
#[derive(Debug, Clone, Copy)]
pub struct ListSwap {
    pub a: usize,
    pub b: usize,
}

/// The event set exposed by an [`EventedList`].
///
/// Each structured event (`added`, `deleted`, `swapped`) chains into the
/// payloadless `changed`, so a subscriber that only cares that *something*
/// happened can bind once.
#[derive(Debug)]
pub struct ListEvents<T> {
    pub changed: EventEmitter<()>,
    pub added: EventEmitter<ListAddition<T>>,
    pub deleted: EventEmitter<ListDeletion<T>>,
    pub swapped: EventEmitter<ListSwap>,
}

impl<T: 'static> ListEvents<T> {
    fn new() -> Self {
        let changed = EventEmitter::new();
        let added = EventEmitter::new();
        let deleted = EventEmitter::new();
        let swapped = EventEmitter::new();

        let chain = changed.clone();
        added.connect(move |_| chain.emit(&()));
        let chain = changed.clone();
        deleted.connect(move |_| chain.emit(&()));
        let chain = changed.clone();
        swapped.connect(move |_| chain.emit(&()));

        Self {
            changed,
            added,
            deleted,
            swapped,
        }
    }
}

/// An evented, shared ordered collection.
///
/// Mutations emit structured events; reads never emit. Handles returned by
/// `clone` share the same storage and event set.
pub struct EventedList<T> {
    inner: Rc<ListInner<T>>,
}

struct ListInner<T> {
    data: RefCell<Vec<T>>,
    events: ListEvents<T>,
}

impl<T: Clone + 'static> EventedList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Wrap an existing vector without emitting anything (initial load).
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                data: RefCell::new(items),
                events: ListEvents::new(),
            }),
        }
    }

    pub fn events(&self) -> &ListEvents<T> {
        &self.inner.events
    }

    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.data.borrow().get(index).cloned()
    }

    /// Snapshot of the current contents.
    pub fn items(&self) -> Vec<T> {
        self.inner.data.borrow().clone()
    }

    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.inner.data.borrow().iter().position(predicate)
    }

    /// Append `item`, emitting `added` then `changed`.
    pub fn push(&self, item: T) {
        let index = {
            let mut data = self.inner.data.borrow_mut();
            data.push(item.clone());
            data.len() - 1
        };
        self.inner.events.added.emit(&ListAddition { index, item });
    }

    /// Remove and return the item at `index`, emitting `deleted` then
    /// `changed`.
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove(&self, index: usize) -> T {
        let item = self.inner.data.borrow_mut().remove(index);
        self.inner.events.deleted.emit(&ListDeletion {
            index,
            item: item.clone(),
        });
        item
    }

    /// Exchange the items at `a` and `b`, emitting `swapped` then `changed`.
    pub fn swap(&self, a: usize, b: usize) {
        self.inner.data.borrow_mut().swap(a, b);
        self.inner.events.swapped.emit(&ListSwap { a, b });
    }

    /// Replace the item at `index`, emitting `changed`.
    pub fn set(&self, index: usize, item: T) {
        self.inner.data.borrow_mut()[index] = item;
        self.inner.events.changed.emit(&());
    }

    /// Remove every item, emitting a single `changed`.
    pub fn clear(&self) {
        self.inner.data.borrow_mut().clear();
        self.inner.events.changed.emit(&());
    }

    /// Sort in place, emitting a single `changed`.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> std::cmp::Ordering) {
        self.inner.data.borrow_mut().sort_by(compare);
        self.inner.events.changed.emit(&());
    }
}

impl<T> Clone for EventedList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Default for EventedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for EventedList<T> {
    /// Content equality; event wiring and handle identity are ignored.
    fn eq(&self, other: &Self) -> bool {
        *self.inner.data.borrow() == *other.inner.data.borrow()
    }
}

impl<T: fmt::Debug> fmt::Debug for EventedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.inner.data.borrow().iter())
            .finish()
    }
}

/// The event set exposed by an [`EventedDict`].
#[derive(Debug)]
pub struct DictEvents {
    pub changed: EventEmitter<()>,
}

/// An evented, shared string-to-string mapping.
///
/// Per-key insertion emits `changed` only when the stored value actually
/// differs; bulk operations emit exactly one `changed`.
pub struct EventedDict {
    inner: Rc<DictInner>,
}

struct DictInner {
    data: RefCell<BTreeMap<String, String>>,
    events: DictEvents,
}

impl EventedDict {
    pub fn new() -> Self {
        Self::from_map(BTreeMap::new())
    }

    /// Wrap an existing map without emitting anything (initial load).
    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self {
            inner: Rc::new(DictInner {
                data: RefCell::new(map),
                events: DictEvents {
                    changed: EventEmitter::new(),
                },
            }),
        }
    }

    pub fn events(&self) -> &DictEvents {
        &self.inner.events
    }

    pub fn len(&self) -> usize {
        self.inner.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.data.borrow().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.data.borrow().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.data.borrow().keys().cloned().collect()
    }

    /// Snapshot of the current contents.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.inner.data.borrow().clone()
    }

    /// Set `key` to `value`, emitting `changed` only if the value differs.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        {
            let mut data = self.inner.data.borrow_mut();
            if data.get(&key) == Some(&value) {
                return;
            }
            data.insert(key, value);
        }
        self.inner.events.changed.emit(&());
    }

    /// Remove `key`, emitting `changed` if it was present.
    pub fn remove(&self, key: &str) -> Option<String> {
        let removed = self.inner.data.borrow_mut().remove(key);
        if removed.is_some() {
            self.inner.events.changed.emit(&());
        }
        removed
    }

    /// Merge `map` in, emitting a single `changed` at the end.
    pub fn update(&self, map: BTreeMap<String, String>) {
        self.inner.events.changed.block();
        for (key, value) in map {
            self.insert(key, value);
        }
        self.inner.events.changed.unblock();
        self.inner.events.changed.emit(&());
    }

    /// Remove every entry, emitting a single `changed` at the end.
    pub fn clear(&self) {
        self.inner.events.changed.block();
        self.inner.data.borrow_mut().clear();
        self.inner.events.changed.unblock();
        self.inner.events.changed.emit(&());
    }
}

impl Clone for EventedDict {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl Default for EventedDict {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for EventedDict {
    fn eq(&self, other: &Self) -> bool {
        *self.inner.data.borrow() == *other.inner.data.borrow()
    }
}

impl fmt::Debug for EventedDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.data.borrow().iter())
            .finish()
    }
}
