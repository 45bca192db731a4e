// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Alert targets: what a source is tested against.
//!
//! Targets come in two capabilities. A [`SpatialTarget`] answers candidate
//! geometry queries (usually from an internal quadtree); a [`ValueTarget`]
//! provides a fixed value for attribute comparisons. [`AlertTarget`] is the
//! closed set of the two, used when binding a condition to a target.

mod element;
mod query;
mod value;

pub use element::GeoElementTarget;
pub use query::FeatureQueryTarget;
pub use value::FixedValueTarget;

use std::fmt;
use std::rc::{Rc, Weak};

use kurbo::Rect;

use crate::geometry::{Geometry, SpatialReference};
use crate::notify::EntityKey;
use crate::value::AttributeValue;

/// A target that can be searched spatially.
pub trait SpatialTarget {
    /// Identity used to route notifications.
    fn key(&self) -> EntityKey;

    /// Spatial reference of the geometries this target holds.
    fn spatial_reference(&self) -> SpatialReference;

    /// Geometries whose extent may intersect `extent` (in
    /// [`spatial_reference`](Self::spatial_reference)).
    ///
    /// This is a candidate list; callers apply their own precise test.
    fn candidate_geometries(&self, extent: Rect) -> Vec<Geometry>;

    /// Returns `false` once the target can no longer be searched.
    fn is_valid(&self) -> bool {
        true
    }
}

/// A target that provides a fixed value.
pub trait ValueTarget {
    /// Identity used to route notifications.
    fn key(&self) -> EntityKey;

    /// The value sources are compared against.
    fn fixed_value(&self) -> AttributeValue;

    /// Returns `false` once the value can no longer be used.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Capability a condition kind requires of its target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetCapability {
    /// A [`SpatialTarget`].
    Spatial,
    /// A [`ValueTarget`].
    Value,
}

impl fmt::Display for TargetCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spatial => "spatial",
            Self::Value => "value",
        })
    }
}

/// A strong handle to a target of either capability.
#[derive(Clone)]
pub enum AlertTarget {
    /// A spatially searchable target.
    Spatial(Rc<dyn SpatialTarget>),
    /// A fixed-value target.
    Value(Rc<dyn ValueTarget>),
}

impl fmt::Debug for AlertTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertTarget")
            .field("key", &self.key())
            .field("capability", &self.capability())
            .finish()
    }
}

impl AlertTarget {
    /// Wraps a spatial target.
    #[must_use]
    pub fn spatial<T: SpatialTarget + 'static>(target: &Rc<T>) -> Self {
        Self::Spatial(target.clone())
    }

    /// Wraps a value target.
    #[must_use]
    pub fn value<T: ValueTarget + 'static>(target: &Rc<T>) -> Self {
        Self::Value(target.clone())
    }

    /// Identity of the wrapped target.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        match self {
            Self::Spatial(t) => t.key(),
            Self::Value(t) => t.key(),
        }
    }

    /// Capability of the wrapped target.
    #[must_use]
    pub fn capability(&self) -> TargetCapability {
        match self {
            Self::Spatial(_) => TargetCapability::Spatial,
            Self::Value(_) => TargetCapability::Value,
        }
    }

    /// Returns `false` once the wrapped target can no longer be used.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Spatial(t) => t.is_valid(),
            Self::Value(t) => t.is_valid(),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakTarget {
        match self {
            Self::Spatial(t) => WeakTarget::Spatial(Rc::downgrade(t)),
            Self::Value(t) => WeakTarget::Value(Rc::downgrade(t)),
        }
    }
}

/// Non-owning counterpart of [`AlertTarget`].
#[derive(Clone)]
pub(crate) enum WeakTarget {
    Spatial(Weak<dyn SpatialTarget>),
    Value(Weak<dyn ValueTarget>),
}

impl WeakTarget {
    pub(crate) fn upgrade(&self) -> Option<AlertTarget> {
        match self {
            Self::Spatial(t) => t.upgrade().map(AlertTarget::Spatial),
            Self::Value(t) => t.upgrade().map(AlertTarget::Value),
        }
    }
}
