// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Alert sources: the entities whose position or attributes are tested.

mod element;
mod position;

pub use element::GeoElement;
pub use position::PositionSource;

use crate::geometry::Geometry;
use crate::notify::EntityKey;
use crate::value::AttributeValue;

/// An entity that alert conditions test.
///
/// Implementations post [`Notification::Changed`](crate::Notification::Changed)
/// through their [`Notifier`](crate::Notifier) whenever location or attributes
/// change, and [`Notification::Removed`](crate::Notification::Removed) exactly
/// once when they are dropped.
pub trait AlertSource {
    /// Identity used to route notifications.
    fn key(&self) -> EntityKey;

    /// Current location, or `None` if unknown.
    fn location(&self) -> Option<Geometry>;

    /// Value of the named attribute; [`AttributeValue::Null`] if absent.
    fn attribute_value(&self, name: &str) -> AttributeValue;

    /// Highlight state mirrored from the alert presentation.
    ///
    /// Called by the registry while it is updating; implementations may post
    /// notifications but they are only handled after the current update.
    fn set_highlighted(&self, highlighted: bool);

    /// Returns `false` once the underlying entity can no longer be tested.
    fn is_valid(&self) -> bool {
        true
    }
}
