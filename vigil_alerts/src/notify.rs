// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity identity and change notifications.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of a live entity (a source or a target).
///
/// Keys are handed out by a [`Notifier`]. Every registry (and every detached
/// notifier) allocates from its own key space, so keys from different spaces
/// never compare equal.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    space: u32,
    index: u64,
}

impl EntityKey {
    /// Index within the key space, for logging.
    #[must_use]
    pub fn get(self) -> u64 {
        self.index
    }
}

impl fmt::Debug for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({}:{})", self.space, self.index)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}:{}", self.space, self.index)
    }
}

/// A change posted by an entity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Something that may affect evaluation changed.
    Changed(EntityKey),
    /// The entity is gone. Posted exactly once, when it is dropped.
    Removed(EntityKey),
}

impl Notification {
    /// The entity the notification is about.
    #[must_use]
    pub fn key(self) -> EntityKey {
        match self {
            Self::Changed(k) | Self::Removed(k) => k,
        }
    }
}

/// Receiver side of a [`Notifier`].
pub(crate) trait NotificationSink {
    fn post(&self, notification: Notification);
}

static NEXT_SPACE: AtomicU32 = AtomicU32::new(1);

/// Shared counter for [`EntityKey`] allocation within one key space.
#[derive(Clone, Debug)]
pub(crate) struct KeyAllocator {
    space: u32,
    next: Rc<Cell<u64>>,
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self {
            space: NEXT_SPACE.fetch_add(1, Ordering::Relaxed),
            next: Rc::new(Cell::new(0)),
        }
    }
}

impl KeyAllocator {
    pub(crate) fn next(&self) -> EntityKey {
        let index = self.next.get() + 1;
        self.next.set(index);
        EntityKey {
            space: self.space,
            index,
        }
    }

    /// Returns `true` if `key` was allocated from this space.
    pub(crate) fn owns(&self, key: EntityKey) -> bool {
        key.space == self.space
    }
}

/// Posts entity notifications to a registry.
///
/// A notifier holds only a weak link to its registry; posting after the
/// registry is gone is a no-op. A [detached](Notifier::detached) notifier
/// allocates keys but delivers nothing.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<Weak<dyn NotificationSink>>,
    keys: KeyAllocator,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub(crate) fn new(sink: Weak<dyn NotificationSink>, keys: KeyAllocator) -> Self {
        Self {
            sink: Some(sink),
            keys,
        }
    }

    /// A notifier that is not connected to any registry.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            sink: None,
            keys: KeyAllocator::default(),
        }
    }

    /// Returns `true` while the registry this notifier posts to is alive.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| s.strong_count() > 0)
    }

    /// Allocates a fresh entity key.
    #[must_use]
    pub fn new_key(&self) -> EntityKey {
        self.keys.next()
    }

    /// Delivers a notification.
    pub fn post(&self, notification: Notification) {
        if let Some(sink) = self.sink.as_ref().and_then(Weak::upgrade) {
            sink.post(notification);
        }
    }

    /// Shorthand for posting [`Notification::Changed`].
    pub fn changed(&self, key: EntityKey) {
        self.post(Notification::Changed(key));
    }

    /// Shorthand for posting [`Notification::Removed`].
    pub fn removed(&self, key: EntityKey) {
        self.post(Notification::Removed(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_allocates_distinct_keys() {
        let n = Notifier::detached();
        let a = n.new_key();
        let b = n.clone().new_key();
        assert_ne!(a, b);
        assert!(!n.is_attached());
        n.changed(a);
    }

    #[test]
    fn key_spaces_do_not_collide() {
        let first = KeyAllocator::default();
        let second = KeyAllocator::default();
        let a = first.next();
        let b = second.next();
        assert_eq!(a.get(), b.get());
        assert_ne!(a, b);
        assert!(first.owns(a));
        assert!(!first.owns(b));
    }
}
