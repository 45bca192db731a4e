// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One live binding of a condition to a source and a target.

use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;
use uuid::Uuid;

use crate::condition::{self, AlertCondition, ConditionKind};
use crate::geometry::GeometryEngine;
use crate::level::AlertLevel;
use crate::notify::EntityKey;
use crate::source::AlertSource;
use crate::target::{AlertTarget, WeakTarget};

/// Identity of a registered [`AlertConditionData`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionId(Uuid);

impl ConditionId {
    pub(crate) fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConditionId({})", self.0)
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Observable state of a condition binding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlertState {
    /// Switched off; never active.
    Disabled,
    /// Enabled, and the condition does not hold.
    Inactive,
    /// Enabled, and the condition holds.
    Active {
        /// Whether the alert has been acknowledged since it became active.
        viewed: bool,
    },
}

/// Change of the `active` flag caused by an update.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    None,
    Activated,
    Deactivated,
}

impl Transition {
    pub(crate) fn happened(self) -> bool {
        self != Self::None
    }
}

/// A condition bound to one source and one target.
///
/// The binding caches the result of its last evaluation together with a dirty
/// flag. [`matches_query`](Self::matches_query) re-runs the test only when
/// dirty. The `active` flag follows the cached result and only changes after a
/// fresh evaluation; becoming active resets `viewed`, and becoming inactive
/// clears any highlight placed on the source.
///
/// Source and target are held weakly. Once either is gone the binding is
/// [invalid](Self::is_valid) and evaluates to `false`; a registry drops
/// invalid bindings.
pub struct AlertConditionData {
    id: Option<ConditionId>,
    name: String,
    level: AlertLevel,
    kind: ConditionKind,
    source_key: EntityKey,
    source: Weak<dyn AlertSource>,
    target_key: EntityKey,
    target: WeakTarget,
    enabled: bool,
    viewed: bool,
    active: bool,
    result: bool,
    dirty: bool,
    highlighted: bool,
    evaluations: u64,
}

impl fmt::Debug for AlertConditionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertConditionData")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("level", &self.level)
            .field("kind", &self.kind)
            .field("source", &self.source_key)
            .field("target", &self.target_key)
            .field("state", &self.state())
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl AlertConditionData {
    pub(crate) fn new(
        condition: &AlertCondition,
        source: &Rc<dyn AlertSource>,
        target: &AlertTarget,
    ) -> Self {
        Self {
            id: None,
            name: condition.name().to_owned(),
            level: condition.level(),
            kind: condition.kind().clone(),
            source_key: source.key(),
            source: Rc::downgrade(source),
            target_key: target.key(),
            target: target.downgrade(),
            enabled: true,
            viewed: false,
            active: false,
            result: false,
            dirty: true,
            highlighted: false,
            evaluations: 0,
        }
    }

    /// Identity, once registered.
    #[must_use]
    pub fn id(&self) -> Option<ConditionId> {
        self.id
    }

    pub(crate) fn assign_id(&mut self) -> ConditionId {
        *self.id.get_or_insert_with(ConditionId::new_v4)
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

    /// Key of the source.
    #[must_use]
    pub fn source_key(&self) -> EntityKey {
        self.source_key
    }

    /// Key of the target.
    #[must_use]
    pub fn target_key(&self) -> EntityKey {
        self.target_key
    }

    /// The source, if it is still alive.
    #[must_use]
    pub fn source(&self) -> Option<Rc<dyn AlertSource>> {
        self.source.upgrade()
    }

    /// The target, if it is still alive.
    #[must_use]
    pub fn target(&self) -> Option<AlertTarget> {
        self.target.upgrade()
    }

    /// Current state, from the cached flags.
    #[must_use]
    pub fn state(&self) -> AlertState {
        match (self.enabled, self.active) {
            (false, _) => AlertState::Disabled,
            (true, false) => AlertState::Inactive,
            (true, true) => AlertState::Active {
                viewed: self.viewed,
            },
        }
    }

    /// Whether the binding is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the alert has been acknowledged since it last became active.
    #[must_use]
    pub fn is_viewed(&self) -> bool {
        self.viewed
    }

    /// Whether the source is highlighted on behalf of this binding.
    #[must_use]
    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    /// Whether a change was seen since the last evaluation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The last evaluated result, without re-evaluating.
    #[must_use]
    pub fn cached_result(&self) -> bool {
        self.result
    }

    /// The `active` flag as of the last update, without re-evaluating.
    #[must_use]
    pub fn last_active(&self) -> bool {
        self.active
    }

    /// How many times the underlying test has run.
    #[must_use]
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations
    }

    /// Returns `true` while source and target are both alive and valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.source.upgrade().is_some_and(|s| s.is_valid())
            && self.target.upgrade().is_some_and(|t| t.is_valid())
    }

    /// Records that the source or target changed.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether the condition holds.
    ///
    /// Returns the cached result when nothing changed since the last call;
    /// otherwise runs the test, caches it and clears the dirty flag. An invalid
    /// binding evaluates to `false`.
    pub fn matches_query(&mut self, engine: &dyn GeometryEngine) -> bool {
        if !self.dirty {
            return self.result;
        }
        self.dirty = false;
        let result = match (self.source.upgrade(), self.target.upgrade()) {
            (Some(source), Some(target)) if source.is_valid() && target.is_valid() => {
                condition::evaluate(&self.kind, &*source, &target, engine)
            }
            _ => false,
        };
        self.evaluations += 1;
        trace!(
            id = ?self.id,
            kind = self.kind.label(),
            result,
            evaluations = self.evaluations,
            "condition evaluated"
        );
        self.result = result;
        result
    }

    /// Whether the alert is active, re-evaluating first if anything changed.
    pub fn is_active(&mut self, engine: &dyn GeometryEngine) -> bool {
        self.refresh(engine);
        self.active
    }

    /// Brings `active` in line with a fresh result.
    pub(crate) fn refresh(&mut self, engine: &dyn GeometryEngine) -> Transition {
        let holds = self.enabled && self.matches_query(engine);
        self.settle(holds)
    }

    fn settle(&mut self, holds: bool) -> Transition {
        match (self.active, holds) {
            (false, true) => {
                self.active = true;
                self.viewed = false;
                Transition::Activated
            }
            (true, false) => {
                self.active = false;
                self.clear_highlight();
                Transition::Deactivated
            }
            _ => Transition::None,
        }
    }

    /// Switches the binding on or off.
    ///
    /// Disabling deactivates and clears the highlight. Enabling re-evaluates.
    pub fn set_enabled(&mut self, enabled: bool, engine: &dyn GeometryEngine) -> bool {
        self.update_enabled(enabled, engine).0
    }

    pub(crate) fn update_enabled(
        &mut self,
        enabled: bool,
        engine: &dyn GeometryEngine,
    ) -> (bool, Transition) {
        if self.enabled == enabled {
            return (false, Transition::None);
        }
        self.enabled = enabled;
        let transition = if enabled {
            self.dirty = true;
            self.refresh(engine)
        } else {
            let transition = self.settle(false);
            self.clear_highlight();
            transition
        };
        (true, transition)
    }

    /// Marks the alert as acknowledged or not. Returns `true` if the flag changed.
    ///
    /// Acknowledging an alert that is not active is ignored.
    pub fn set_viewed(&mut self, viewed: bool) -> bool {
        if (viewed && !self.active) || self.viewed == viewed {
            return false;
        }
        self.viewed = viewed;
        true
    }

    /// Highlights the source (or clears it). Returns `true` if the flag changed.
    ///
    /// Fails when the source is gone, or when highlighting an alert that is
    /// not active.
    pub fn highlight(&mut self, on: bool) -> bool {
        if self.highlighted == on || (on && !self.active) {
            return false;
        }
        let Some(source) = self.source.upgrade() else {
            self.highlighted = false;
            return false;
        };
        source.set_highlighted(on);
        self.highlighted = on;
        true
    }

    pub(crate) fn clear_highlight(&mut self) {
        if !self.highlighted {
            return;
        }
        self.highlighted = false;
        if let Some(source) = self.source.upgrade() {
            source.set_highlighted(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::geometry::{Geometry, SphericalEngine};
    use crate::notify::Notifier;
    use crate::source::GeoElement;
    use crate::target::FixedValueTarget;
    use crate::value::AttributeValue;

    fn bind(
        notifier: &Notifier,
        status: &str,
    ) -> (Rc<GeoElement>, Rc<FixedValueTarget>, AlertConditionData) {
        let track = GeoElement::with_attributes(
            notifier,
            Geometry::wgs84_point(0.0, 0.0),
            [("status", status)],
        );
        let hostile = FixedValueTarget::new(notifier, "hostile");
        let data = AlertCondition::attribute_equals("hostile", AlertLevel::High, "status")
            .unwrap()
            .instantiate(track.clone(), &AlertTarget::value(&hostile))
            .unwrap();
        (track, hostile, data)
    }

    #[test]
    fn starts_dirty_and_inactive() {
        let notifier = Notifier::detached();
        let (_track, _target, data) = bind(&notifier, "hostile");
        assert!(data.is_dirty());
        assert_eq!(data.state(), AlertState::Inactive);
        assert_eq!(data.id(), None);
    }

    #[test]
    fn activation_resets_viewed_and_deactivation_clears_highlight() {
        let notifier = Notifier::detached();
        let engine = SphericalEngine::default();
        let (track, _target, mut data) = bind(&notifier, "hostile");

        assert!(data.is_active(&engine));
        assert!(data.set_viewed(true));
        assert_eq!(data.state(), AlertState::Active { viewed: true });
        assert!(data.highlight(true));
        assert!(track.is_highlighted());

        track.set_attribute("status", "friendly");
        data.mark_dirty();
        assert!(!data.is_active(&engine));
        assert!(!track.is_highlighted());
        assert!(!data.is_highlighted());

        track.set_attribute("status", "hostile");
        data.mark_dirty();
        assert!(data.is_active(&engine));
        assert_eq!(data.state(), AlertState::Active { viewed: false });
    }

    #[test]
    fn viewed_is_ignored_while_inactive() {
        let notifier = Notifier::detached();
        let engine = SphericalEngine::default();
        let (_track, _target, mut data) = bind(&notifier, "friendly");
        assert!(!data.is_active(&engine));
        assert!(!data.set_viewed(true));
        assert!(!data.highlight(true));
    }

    #[test]
    fn disabling_deactivates_and_enabling_re_evaluates() {
        let notifier = Notifier::detached();
        let engine = SphericalEngine::default();
        let (track, _target, mut data) = bind(&notifier, "hostile");
        assert!(data.is_active(&engine));
        data.highlight(true);

        assert!(data.set_enabled(false, &engine));
        assert_eq!(data.state(), AlertState::Disabled);
        assert!(!track.is_highlighted());
        assert!(!data.set_enabled(false, &engine));

        let before = data.evaluation_count();
        assert!(data.set_enabled(true, &engine));
        assert_eq!(data.evaluation_count(), before + 1);
        assert_eq!(data.state(), AlertState::Active { viewed: false });
    }

    #[test]
    fn dropped_source_invalidates() {
        let notifier = Notifier::detached();
        let engine = SphericalEngine::default();
        let (track, _target, mut data) = bind(&notifier, "hostile");
        assert!(data.is_valid());
        drop(track);
        assert!(!data.is_valid());
        assert!(!data.matches_query(&engine));
    }

    struct Counting {
        key: EntityKey,
        calls: Cell<u32>,
    }

    impl AlertSource for Counting {
        fn key(&self) -> EntityKey {
            self.key
        }
        fn location(&self) -> Option<Geometry> {
            None
        }
        fn attribute_value(&self, _name: &str) -> AttributeValue {
            self.calls.set(self.calls.get() + 1);
            AttributeValue::Bool(true)
        }
        fn set_highlighted(&self, _highlighted: bool) {}
    }

    #[test]
    fn clean_reads_do_not_re_run_the_test() {
        let notifier = Notifier::detached();
        let engine = SphericalEngine::default();
        let source = Rc::new(Counting {
            key: notifier.new_key(),
            calls: Cell::new(0),
        });
        let target = FixedValueTarget::new(&notifier, true);
        let mut data = AlertCondition::attribute_equals("flag", AlertLevel::Low, "flag")
            .unwrap()
            .instantiate(source.clone(), &AlertTarget::value(&target))
            .unwrap();
        assert!(data.matches_query(&engine));
        assert!(data.matches_query(&engine));
        assert_eq!(source.calls.get(), 1);
        data.mark_dirty();
        assert!(data.matches_query(&engine));
        assert_eq!(source.calls.get(), 2);
    }
}
