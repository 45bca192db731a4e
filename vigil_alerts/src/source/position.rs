// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::geometry::Geometry;
use crate::notify::{EntityKey, Notifier};
use crate::source::AlertSource;
use crate::value::AttributeValue;

/// A live position feed, such as the device's own location.
///
/// The position may be unknown (no fix yet, or fix lost); conditions never
/// match a source without a location.
pub struct PositionSource {
    key: EntityKey,
    notifier: Notifier,
    position: RefCell<Option<Geometry>>,
    highlighted: Cell<bool>,
}

impl fmt::Debug for PositionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionSource")
            .field("key", &self.key)
            .field("position", &self.position.borrow())
            .field("highlighted", &self.highlighted.get())
            .finish_non_exhaustive()
    }
}

impl PositionSource {
    /// A source without a position yet.
    #[must_use]
    pub fn new(notifier: &Notifier) -> Rc<Self> {
        Rc::new(Self {
            key: notifier.new_key(),
            notifier: notifier.clone(),
            position: RefCell::new(None),
            highlighted: Cell::new(false),
        })
    }

    /// A source starting at `position`.
    #[must_use]
    pub fn at(notifier: &Notifier, position: Geometry) -> Rc<Self> {
        let source = Self::new(notifier);
        *source.position.borrow_mut() = Some(position);
        source
    }

    /// The current position.
    #[must_use]
    pub fn position(&self) -> Option<Geometry> {
        self.position.borrow().clone()
    }

    /// Moves the source and notifies dependents.
    pub fn set_position(&self, position: Geometry) {
        self.position.replace(Some(position));
        self.notifier.changed(self.key);
    }

    /// Moves the source to a WGS84 longitude/latitude.
    pub fn set_wgs84(&self, lon: f64, lat: f64) {
        self.set_position(Geometry::wgs84_point(lon, lat));
    }

    /// Marks the position as unknown.
    pub fn clear_position(&self) {
        if self.position.replace(None).is_some() {
            self.notifier.changed(self.key);
        }
    }

    /// Whether the source is highlighted by the alert presentation.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted.get()
    }
}

impl AlertSource for PositionSource {
    fn key(&self) -> EntityKey {
        self.key
    }

    fn location(&self) -> Option<Geometry> {
        self.position()
    }

    fn attribute_value(&self, _name: &str) -> AttributeValue {
        AttributeValue::Null
    }

    fn set_highlighted(&self, highlighted: bool) {
        self.highlighted.set(highlighted);
    }
}

impl Drop for PositionSource {
    fn drop(&mut self) {
        self.notifier.removed(self.key);
    }
}
