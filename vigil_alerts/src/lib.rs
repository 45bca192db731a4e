// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Vigil Alerts: reactive spatial alert conditions.
//!
//! This crate decides, for a changing set of geo-referenced entities, whether
//! named conditions currently hold, and exposes the active alerts through a
//! filtered, cached view.
//!
//! - Sources ([`AlertSource`]) are what gets tested: a live position
//!   ([`PositionSource`]) or an entity with geometry and attributes
//!   ([`GeoElement`]).
//! - Targets are what a source is tested against. Spatial targets
//!   ([`GeoElementTarget`], [`FeatureQueryTarget`]) index their geometries in a
//!   [`vigil_quadtree::Quadtree`] and answer candidate queries; value targets
//!   ([`FixedValueTarget`]) hold a single [`AttributeValue`].
//! - An [`AlertCondition`] is a template (name, [`AlertLevel`],
//!   [`ConditionKind`]). Binding it to a source and target yields an
//!   [`AlertConditionData`], which caches its last result behind a dirty flag.
//! - The [`AlertRegistry`] owns every binding. Entities post
//!   [`Notification`]s through a [`Notifier`]; the registry re-evaluates the
//!   dependents right away and publishes [`ListChange`]s.
//! - A [`FilteredAlertView`] projects the registry through a chain of
//!   [`AlertFilter`]s ([`LevelFilter`], [`IdsFilter`]).
//!
//! Exact geometry is delegated to a [`GeometryEngine`]; [`SphericalEngine`] is
//! the built-in reference implementation.
//!
//! Everything here is single-threaded (`Rc`, `RefCell`). Failures never panic
//! or propagate out of the engine: a binding whose source or target is gone is
//! dropped from the registry, and a test that cannot be carried out evaluates
//! to `false`.
//!
//! ## Example
//!
//! ```rust
//! use vigil_alerts::{
//!     AlertCondition, AlertLevel, AlertRegistry, AlertTarget, FilteredAlertView,
//!     GeoElement, GeoElementTarget, Geometry, PositionSource, SpatialReference,
//! };
//!
//! let registry = AlertRegistry::default();
//! let notifier = registry.notifier();
//!
//! let zones = GeoElementTarget::new(&notifier, SpatialReference::Wgs84);
//! let harbour = GeoElement::new(
//!     &notifier,
//!     Geometry::wgs84_polygon([(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]),
//! );
//! zones.add_element(&harbour);
//!
//! let me = PositionSource::at(&notifier, Geometry::wgs84_point(0.0, 0.0));
//! let condition = AlertCondition::within_area("In harbour", AlertLevel::High).unwrap();
//! let data = condition.instantiate(me.clone(), &AlertTarget::spatial(&zones)).unwrap();
//! let id = registry.add_condition(data).unwrap();
//!
//! let mut view = FilteredAlertView::new(&registry);
//! assert_eq!(view.ids(), [id]);
//!
//! me.set_wgs84(10.0, 10.0);
//! assert_eq!(view.row_count(), 0);
//! ```

mod change;
mod condition;
mod data;
mod filter;
mod geometry;
mod level;
mod notify;
mod registry;
mod source;
mod target;
mod value;
mod view;

pub use change::{ChangeFeed, DataRoles, ListChange};
pub use condition::{AlertCondition, ConditionError, ConditionKind};
pub use data::{AlertConditionData, AlertState, ConditionId};
pub use filter::{AlertFilter, IdsFilter, LevelFilter};
pub use geometry::{
    Geometry, GeometryEngine, LinearUnit, MEAN_EARTH_RADIUS_M, Shape, SpatialReference,
    SphericalEngine,
};
pub use level::AlertLevel;
pub use notify::{EntityKey, Notification, Notifier};
pub use registry::AlertRegistry;
pub use source::{AlertSource, GeoElement, PositionSource};
pub use target::{
    AlertTarget, FeatureQueryTarget, FixedValueTarget, GeoElementTarget, SpatialTarget,
    TargetCapability, ValueTarget,
};
pub use value::AttributeValue;
pub use view::{FilteredAlertView, SortOrder};
