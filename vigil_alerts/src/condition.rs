// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Condition templates and their evaluation.

use std::f64::consts::SQRT_2;
use std::fmt;
use std::rc::Rc;

use kurbo::Rect;

use crate::data::AlertConditionData;
use crate::geometry::{Geometry, GeometryEngine, LinearUnit, SpatialReference};
use crate::level::AlertLevel;
use crate::source::AlertSource;
use crate::target::{AlertTarget, SpatialTarget, TargetCapability};

/// What a condition tests.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionKind {
    /// The source is within `distance` of any target geometry.
    WithinDistance {
        /// Buffer radius around the source.
        distance: f64,
        /// Unit of `distance`.
        unit: LinearUnit,
    },
    /// The source lies in (or touches) any target polygon.
    WithinArea,
    /// The named source attribute equals the target's fixed value.
    AttributeEquals {
        /// Attribute looked up on the source.
        attribute: String,
    },
}

impl ConditionKind {
    /// Capability the target must have.
    #[must_use]
    pub fn required_capability(&self) -> TargetCapability {
        match self {
            Self::WithinDistance { .. } | Self::WithinArea => TargetCapability::Spatial,
            Self::AttributeEquals { .. } => TargetCapability::Value,
        }
    }

    /// Short label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::WithinDistance { .. } => "within-distance",
            Self::WithinArea => "within-area",
            Self::AttributeEquals { .. } => "attribute-equals",
        }
    }

    fn validate(&self) -> Result<(), ConditionError> {
        match self {
            Self::WithinDistance { distance, .. } if !distance.is_finite() || *distance < 0.0 => {
                Err(ConditionError::InvalidDistance(*distance))
            }
            Self::AttributeEquals { attribute } if attribute.is_empty() => {
                Err(ConditionError::EmptyAttributeName)
            }
            _ => Ok(()),
        }
    }
}

/// Error building a condition or binding it to a target.
#[derive(Clone, Debug, PartialEq)]
pub enum ConditionError {
    /// The kind needs a target of a different capability.
    TargetMismatch {
        /// Label of the condition kind.
        kind: &'static str,
        /// Capability the kind requires.
        expected: TargetCapability,
        /// Capability of the target that was supplied.
        found: TargetCapability,
    },
    /// A distance was negative or not finite.
    InvalidDistance(f64),
    /// An attribute comparison named no attribute.
    EmptyAttributeName,
}

impl fmt::Display for ConditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetMismatch {
                kind,
                expected,
                found,
            } => write!(f, "{kind} condition needs a {expected} target, got a {found} target"),
            Self::InvalidDistance(d) => write!(f, "invalid alert distance {d}"),
            Self::EmptyAttributeName => f.write_str("attribute comparison without attribute name"),
        }
    }
}

impl core::error::Error for ConditionError {}

/// A named, parameterized rule that can be bound to many source/target pairs.
///
/// # Example
///
/// ```rust
/// use vigil_alerts::{AlertCondition, AlertLevel, AlertTarget, FixedValueTarget, GeoElement, Geometry, Notifier};
///
/// let notifier = Notifier::detached();
/// let hostile = FixedValueTarget::new(&notifier, "hostile");
/// let track = GeoElement::with_attributes(&notifier, Geometry::wgs84_point(0.0, 0.0), [("status", "friendly")]);
///
/// let condition = AlertCondition::attribute_equals("Hostile track", AlertLevel::High, "status").unwrap();
/// let data = condition.instantiate(track, &AlertTarget::value(&hostile)).unwrap();
/// assert_eq!(data.name(), "Hostile track");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AlertCondition {
    name: String,
    level: AlertLevel,
    kind: ConditionKind,
}

impl AlertCondition {
    /// Creates a condition, checking its parameters.
    pub fn new(
        name: impl Into<String>,
        level: AlertLevel,
        kind: ConditionKind,
    ) -> Result<Self, ConditionError> {
        kind.validate()?;
        Ok(Self {
            name: name.into(),
            level,
            kind,
        })
    }

    /// Shorthand for a [`ConditionKind::WithinDistance`] condition.
    pub fn within_distance(
        name: impl Into<String>,
        level: AlertLevel,
        distance: f64,
        unit: LinearUnit,
    ) -> Result<Self, ConditionError> {
        Self::new(name, level, ConditionKind::WithinDistance { distance, unit })
    }

    /// Shorthand for a [`ConditionKind::WithinArea`] condition.
    pub fn within_area(name: impl Into<String>, level: AlertLevel) -> Result<Self, ConditionError> {
        Self::new(name, level, ConditionKind::WithinArea)
    }

    /// Shorthand for a [`ConditionKind::AttributeEquals`] condition.
    pub fn attribute_equals(
        name: impl Into<String>,
        level: AlertLevel,
        attribute: impl Into<String>,
    ) -> Result<Self, ConditionError> {
        Self::new(
            name,
            level,
            ConditionKind::AttributeEquals {
                attribute: attribute.into(),
            },
        )
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Severity.
    #[must_use]
    pub fn level(&self) -> AlertLevel {
        self.level
    }

    /// What is tested.
    #[must_use]
    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    /// Binds the condition to one source and one target.
    ///
    /// The returned data holds both weakly; it starts enabled, dirty and
    /// inactive, and has no identity until it is added to a registry.
    pub fn instantiate(
        &self,
        source: Rc<dyn AlertSource>,
        target: &AlertTarget,
    ) -> Result<AlertConditionData, ConditionError> {
        let expected = self.kind.required_capability();
        if target.capability() != expected {
            return Err(ConditionError::TargetMismatch {
                kind: self.kind.label(),
                expected,
                found: target.capability(),
            });
        }
        Ok(AlertConditionData::new(self, &source, target))
    }

    /// Binds the condition to every source against the same target.
    pub fn instantiate_all(
        &self,
        sources: impl IntoIterator<Item = Rc<dyn AlertSource>>,
        target: &AlertTarget,
    ) -> Result<Vec<AlertConditionData>, ConditionError> {
        sources
            .into_iter()
            .map(|source| self.instantiate(source, target))
            .collect()
    }
}

/// Runs the kind-specific test. Anything missing evaluates to `false`.
pub(crate) fn evaluate(
    kind: &ConditionKind,
    source: &dyn AlertSource,
    target: &AlertTarget,
    engine: &dyn GeometryEngine,
) -> bool {
    match (kind, target) {
        (ConditionKind::WithinDistance { distance, unit }, AlertTarget::Spatial(target)) => {
            within_distance(source, &**target, *distance, *unit, engine)
        }
        (ConditionKind::WithinArea, AlertTarget::Spatial(target)) => {
            within_area(source, &**target, engine)
        }
        (ConditionKind::AttributeEquals { attribute }, AlertTarget::Value(target)) => source
            .attribute_value(attribute)
            .matches(&target.fixed_value()),
        _ => false,
    }
}

fn within_distance(
    source: &dyn AlertSource,
    target: &dyn SpatialTarget,
    distance: f64,
    unit: LinearUnit,
    engine: &dyn GeometryEngine,
) -> bool {
    let Some(center) = source
        .location()
        .and_then(|g| engine.project(&g, SpatialReference::Wgs84))
        .and_then(|g| g.representative_point())
    else {
        return false;
    };

    // Corners of the square around the buffer, reached along the diagonals.
    let reach = unit.to_meters(distance) * SQRT_2;
    let ne = engine.move_geodetic(&[center], reach, LinearUnit::Meters, 45.0);
    let sw = engine.move_geodetic(&[center], reach, LinearUnit::Meters, 225.0);
    let (Some(&ne), Some(&sw)) = (ne.first(), sw.first()) else {
        return false;
    };
    // Corners come back normalized; an envelope crossing the antimeridian
    // has its east edge west of its west edge.
    let east = if ne.x < sw.x { ne.x + 360.0 } else { ne.x };
    let mut spans = vec![(sw.x, east.min(180.0))];
    if east > 180.0 {
        spans.push((-180.0, east - 360.0));
    }

    let mut candidates = Vec::new();
    for (west, east) in spans {
        let envelope = Geometry::envelope(
            Rect::new(west, sw.y, east, ne.y),
            SpatialReference::Wgs84,
        );
        if let Some(query) = engine
            .project(&envelope, target.spatial_reference())
            .and_then(|g| g.extent())
        {
            candidates.extend(target.candidate_geometries(query));
        }
    }
    if candidates.is_empty() {
        return false;
    }
    let Some(buffer) = engine.buffer_geodetic(center, distance, unit) else {
        return false;
    };
    candidates.iter().any(|c| engine.intersects(&buffer, c))
}

fn within_area(
    source: &dyn AlertSource,
    target: &dyn SpatialTarget,
    engine: &dyn GeometryEngine,
) -> bool {
    let Some(location) = source
        .location()
        .and_then(|g| engine.project(&g, target.spatial_reference()))
    else {
        return false;
    };
    let Some(query) = location.extent() else {
        return false;
    };
    target
        .candidate_geometries(query)
        .iter()
        .filter(|c| c.is_polygon())
        .any(|c| engine.intersects(&location, c))
}
