//! Per-category disk error channels.
//!
//! A [`DiskErrorSignal`] is a single-context broadcast point: subscribers are
//! plain `Fn()` hooks invoked in registration order when a fatal disk error is
//! classified in that category. Signals are `!Send`; every execution context
//! owns its own set (see [`crate::DiskErrorChannels`]).

use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Failure category a disk operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskErrorCategory {
    Commit,
    SstableRead,
    SstableWrite,
    General,
}

impl DiskErrorCategory {
    pub const ALL: [DiskErrorCategory; 4] = [
        DiskErrorCategory::Commit,
        DiskErrorCategory::SstableRead,
        DiskErrorCategory::SstableWrite,
        DiskErrorCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiskErrorCategory::Commit => "commit",
            DiskErrorCategory::SstableRead => "sstable_read",
            DiskErrorCategory::SstableWrite => "sstable_write",
            DiskErrorCategory::General => "general",
        }
    }
}

impl fmt::Display for DiskErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle returned by [`DiskErrorSignal::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

type Subscriber = Rc<dyn Fn()>;

pub struct DiskErrorSignal {
    category: DiskErrorCategory,
    subscribers: RefCell<Vec<(SubscriptionId, Subscriber)>>,
    next_id: Cell<u64>,
    fired: Cell<u64>,
}

impl DiskErrorSignal {
    pub fn new(category: DiskErrorCategory) -> Self {
        Self {
            category,
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            fired: Cell::new(0),
        }
    }

    pub fn category(&self) -> DiskErrorCategory {
        self.category
    }

    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0.saturating_add(1));
        self.subscribers
            .borrow_mut()
            .push((id, Rc::new(subscriber)));
        id
    }

    /// Like [`subscribe`](Self::subscribe), but the subscription ends when the
    /// returned guard is dropped.
    pub fn subscribe_scoped<F>(&self, subscriber: F) -> ScopedSubscription<'_>
    where
        F: Fn() + 'static,
    {
        let id = self.subscribe(subscriber);
        ScopedSubscription { signal: self, id }
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Invokes every subscriber in registration order.
    ///
    /// Subscribers may subscribe or unsubscribe from inside the callback. A
    /// subscriber removed earlier in the same firing is skipped; one added
    /// during the firing runs from the next firing on. Panics propagate.
    pub fn fire(&self) {
        self.fired.set(self.fired.get().saturating_add(1));
        let snapshot: Vec<(SubscriptionId, Subscriber)> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(id, subscriber)| (*id, Rc::clone(subscriber)))
            .collect();
        for (id, subscriber) in snapshot {
            if self.is_subscribed(id) {
                subscriber();
            }
        }
    }

    pub fn fire_count(&self) -> u64 {
        self.fired.get()
    }
}

impl fmt::Debug for DiskErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskErrorSignal")
            .field("category", &self.category)
            .field("subscribers", &self.subscriber_count())
            .field("fired", &self.fired.get())
            .finish()
    }
}

/// Subscription that is removed from its signal on drop.
#[derive(Debug)]
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct ScopedSubscription<'a> {
    signal: &'a DiskErrorSignal,
    id: SubscriptionId,
}

impl ScopedSubscription<'_> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keeps the subscription alive past the guard.
    pub fn release(self) -> SubscriptionId {
        let id = self.id;
        std::mem::forget(self);
        id
    }
}

impl Drop for ScopedSubscription<'_> {
    fn drop(&mut self) {
        self.signal.unsubscribe(self.id);
    }
}
