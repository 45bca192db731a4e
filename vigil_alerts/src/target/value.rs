// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::notify::{EntityKey, Notifier};
use crate::target::ValueTarget;
use crate::value::AttributeValue;

/// A value target holding a single, replaceable value.
pub struct FixedValueTarget {
    key: EntityKey,
    notifier: Notifier,
    value: RefCell<AttributeValue>,
}

impl fmt::Debug for FixedValueTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedValueTarget")
            .field("key", &self.key)
            .field("value", &self.value.borrow())
            .finish_non_exhaustive()
    }
}

impl FixedValueTarget {
    /// Creates a target holding `value`.
    #[must_use]
    pub fn new(notifier: &Notifier, value: impl Into<AttributeValue>) -> Rc<Self> {
        Rc::new(Self {
            key: notifier.new_key(),
            notifier: notifier.clone(),
            value: RefCell::new(value.into()),
        })
    }

    /// Identity of this target.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// The held value.
    #[must_use]
    pub fn value(&self) -> AttributeValue {
        self.value.borrow().clone()
    }

    /// Replaces the value, notifying dependents if it changed.
    pub fn set_value(&self, value: impl Into<AttributeValue>) {
        let value = value.into();
        if *self.value.borrow() == value {
            return;
        }
        self.value.replace(value);
        self.notifier.changed(self.key);
    }
}

impl ValueTarget for FixedValueTarget {
    fn key(&self) -> EntityKey {
        self.key
    }

    fn fixed_value(&self) -> AttributeValue {
        self.value()
    }
}

impl Drop for FixedValueTarget {
    fn drop(&mut self) {
        self.notifier.removed(self.key);
    }
}
