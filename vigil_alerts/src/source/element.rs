// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use kurbo::Rect;
use smallvec::SmallVec;

use crate::geometry::{Geometry, SpatialReference};
use crate::notify::{EntityKey, Notifier};
use crate::source::AlertSource;
use crate::target::GeoElementTarget;
use crate::value::AttributeValue;

/// A geo-referenced entity with attributes: a feature, a graphic or a tracked
/// dynamic entity.
///
/// An element is a source in its own right and can also be a member of any
/// number of [`GeoElementTarget`]s. Geometry changes are forwarded to those
/// targets so their indexes stay current.
pub struct GeoElement {
    key: EntityKey,
    notifier: Notifier,
    geometry: RefCell<Geometry>,
    attributes: RefCell<HashMap<String, AttributeValue>>,
    highlighted: Cell<bool>,
    memberships: RefCell<SmallVec<[Weak<GeoElementTarget>; 2]>>,
}

impl fmt::Debug for GeoElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoElement")
            .field("key", &self.key)
            .field("geometry", &self.geometry.borrow())
            .field("attributes", &self.attributes.borrow().len())
            .field("memberships", &self.memberships.borrow().len())
            .finish_non_exhaustive()
    }
}

impl GeoElement {
    /// Creates an element without attributes.
    #[must_use]
    pub fn new(notifier: &Notifier, geometry: Geometry) -> Rc<Self> {
        Self::with_attributes(notifier, geometry, std::iter::empty::<(String, AttributeValue)>())
    }

    /// Creates an element with initial attributes.
    #[must_use]
    pub fn with_attributes<K, V>(
        notifier: &Notifier,
        geometry: Geometry,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Rc<Self>
    where
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        Rc::new(Self {
            key: notifier.new_key(),
            notifier: notifier.clone(),
            geometry: RefCell::new(geometry),
            attributes: RefCell::new(
                attributes
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            highlighted: Cell::new(false),
            memberships: RefCell::new(SmallVec::new()),
        })
    }

    /// Identity of this element.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Current geometry.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.geometry.borrow().clone()
    }

    /// Replaces the geometry.
    ///
    /// Member targets update their index first, then dependents of this
    /// element are notified.
    pub fn set_geometry(&self, geometry: Geometry) {
        self.geometry.replace(geometry);
        for target in self.live_memberships() {
            target.member_moved(self.key);
        }
        self.notifier.changed(self.key);
    }

    /// Value of the named attribute; [`AttributeValue::Null`] if absent.
    #[must_use]
    pub fn attribute(&self, name: &str) -> AttributeValue {
        self.attributes
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Sets an attribute and notifies dependents if the value changed.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        let value = value.into();
        let previous = self.attributes.borrow_mut().insert(name.into(), value.clone());
        if previous.as_ref() != Some(&value) {
            self.notifier.changed(self.key);
        }
    }

    /// Removes an attribute and notifies dependents if it was present.
    pub fn remove_attribute(&self, name: &str) {
        let previous = self.attributes.borrow_mut().remove(name);
        if previous.is_some() {
            self.notifier.changed(self.key);
        }
    }

    /// Whether the element is highlighted by the alert presentation.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted.get()
    }

    /// Extent of the geometry, if it is expressed in `spatial_reference`.
    pub(crate) fn extent_in(&self, spatial_reference: SpatialReference) -> Option<Rect> {
        let geometry = self.geometry.borrow();
        if geometry.spatial_reference() == spatial_reference {
            geometry.extent()
        } else {
            None
        }
    }

    pub(crate) fn join(&self, target: Weak<GeoElementTarget>) {
        let mut memberships = self.memberships.borrow_mut();
        memberships.retain(|t| t.strong_count() > 0);
        memberships.push(target);
    }

    pub(crate) fn leave(&self, target: EntityKey) {
        self.memberships
            .borrow_mut()
            .retain(|t| t.upgrade().is_some_and(|t| t.key() != target));
    }

    fn live_memberships(&self) -> SmallVec<[Rc<GeoElementTarget>; 2]> {
        self.memberships
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl AlertSource for GeoElement {
    fn key(&self) -> EntityKey {
        self.key
    }

    fn location(&self) -> Option<Geometry> {
        Some(self.geometry())
    }

    fn attribute_value(&self, name: &str) -> AttributeValue {
        self.attribute(name)
    }

    fn set_highlighted(&self, highlighted: bool) {
        self.highlighted.set(highlighted);
    }
}

impl Drop for GeoElement {
    fn drop(&mut self) {
        for target in self.live_memberships() {
            target.member_dropped(self.key);
        }
        self.notifier.removed(self.key);
    }
}
