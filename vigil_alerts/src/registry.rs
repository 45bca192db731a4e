// Copyright 2025 the Vigil Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The registry: owner of every condition binding, in a stable row order.

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::change::{ChangeFeed, DataRoles, ListChange, Subscribers};
use crate::data::{AlertConditionData, ConditionId, Transition};
use crate::geometry::{GeometryEngine, SphericalEngine};
use crate::notify::{EntityKey, KeyAllocator, Notification, NotificationSink, Notifier};

/// Shared handle to the set of registered condition bindings.
///
/// The registry owns every [`AlertConditionData`] added to it and keeps them in
/// insertion order; row indices are positions in that order. Entities report
/// changes through a [`Notifier`] obtained from [`notifier`](Self::notifier),
/// and every dependent binding is re-evaluated before the notification
/// returns. Bindings whose source or target is gone are removed.
///
/// Cloning the handle is cheap; all clones refer to the same registry. The
/// registry is single-threaded.
///
/// Every mutation goes through one queue. Anything posted while the registry is
/// already updating (for example from an [`AlertSource::set_highlighted`]
/// callback) is handled after the current update, never recursively. Row
/// accessors return [`Ref`] guards; while one is held, mutations are deferred
/// and handled by the next mutation or [`flush`](Self::flush).
///
/// [`AlertSource::set_highlighted`]: crate::AlertSource::set_highlighted
#[derive(Clone)]
pub struct AlertRegistry {
    shared: Rc<Shared>,
}

struct Shared {
    state: RefCell<RegistryState>,
    pending: RefCell<VecDeque<Command>>,
    pumping: Cell<bool>,
    keys: KeyAllocator,
    subscribers: Subscribers,
}

#[derive(Copy, Clone, Debug)]
enum Command {
    Notify(Notification),
    Remove(ConditionId),
    SetEnabled(ConditionId, bool),
    SetViewed(ConditionId, bool),
    SetAllViewed,
    Highlight(ConditionId, bool),
}

struct RegistryState {
    engine: Box<dyn GeometryEngine>,
    slots: Vec<Option<AlertConditionData>>,
    free: Vec<usize>,
    rows: Vec<usize>,
    by_id: HashMap<ConditionId, usize>,
    dependents: HashMap<EntityKey, SmallVec<[ConditionId; 4]>>,
}

impl fmt::Debug for AlertRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AlertRegistry");
        match self.shared.state.try_borrow() {
            Ok(state) => s.field("rows", &state.rows.len()),
            Err(_) => s.field("rows", &"<updating>"),
        };
        s.field("pending", &self.shared.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::new(SphericalEngine::default())
    }
}

impl AlertRegistry {
    /// Creates an empty registry evaluating geometry with `engine`.
    #[must_use]
    pub fn new(engine: impl GeometryEngine + 'static) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(RegistryState {
                    engine: Box::new(engine),
                    slots: Vec::new(),
                    free: Vec::new(),
                    rows: Vec::new(),
                    by_id: HashMap::new(),
                    dependents: HashMap::new(),
                }),
                pending: RefCell::new(VecDeque::new()),
                pumping: Cell::new(false),
                keys: KeyAllocator::default(),
                subscribers: Subscribers::default(),
            }),
        }
    }

    /// A notifier that delivers to this registry. Entities created with it get
    /// keys unique within this registry.
    #[must_use]
    pub fn notifier(&self) -> Notifier {
        let weak = Rc::downgrade(&self.shared);
        let sink: Weak<dyn NotificationSink> = weak;
        Notifier::new(sink, self.shared.keys.clone())
    }

    /// Subscribes to row changes.
    #[must_use]
    pub fn subscribe(&self) -> ChangeFeed {
        self.shared.subscribers.subscribe()
    }

    /// Registers a binding, assigning its identity, and evaluates it.
    ///
    /// Returns `None` (dropping the binding) if its source or target is
    /// already gone, if either was not created with this registry's
    /// [`notifier`](Self::notifier), if a binding with the same identity is
    /// registered, or if the registry is updating.
    pub fn add_condition(&self, mut data: AlertConditionData) -> Option<ConditionId> {
        if !data.is_valid() {
            debug!(name = data.name(), "condition rejected: source or target is gone");
            return None;
        }
        let keys = &self.shared.keys;
        if !keys.owns(data.source_key()) || !keys.owns(data.target_key()) {
            warn!(
                name = data.name(),
                source = %data.source_key(),
                target_key = %data.target_key(),
                "condition rejected: entity keyed by another notifier"
            );
            return None;
        }
        let mut changes = Vec::new();
        let id = {
            let Ok(mut guard) = self.shared.state.try_borrow_mut() else {
                warn!(name = data.name(), "condition rejected: registry is updating");
                return None;
            };
            let state = &mut *guard;
            if data.id().is_some_and(|id| state.by_id.contains_key(&id)) {
                return None;
            }
            let id = data.assign_id();
            data.mark_dirty();
            let transition = data.refresh(&*state.engine);
            let (source, target) = (data.source_key(), data.target_key());
            let slot = match state.free.pop() {
                Some(slot) => {
                    state.slots[slot] = Some(data);
                    slot
                }
                None => {
                    state.slots.push(Some(data));
                    state.slots.len() - 1
                }
            };
            let row = state.rows.len();
            state.rows.push(slot);
            state.by_id.insert(id, slot);
            state.dependents.entry(source).or_default().push(id);
            if target != source {
                state.dependents.entry(target).or_default().push(id);
            }
            changes.push(ListChange::Inserted {
                first: row,
                last: row,
            });
            debug!(%id, row, active = transition == Transition::Activated, "condition added");
            id
        };
        self.shared.subscribers.publish(&changes);
        self.shared.pump();
        Some(id)
    }

    /// Removes a binding. Unknown ids are ignored.
    pub fn remove_condition(&self, id: ConditionId) {
        self.shared.submit(Command::Remove(id));
    }

    /// Enables or disables a binding.
    pub fn set_condition_enabled(&self, id: ConditionId, enabled: bool) {
        self.shared.submit(Command::SetEnabled(id, enabled));
    }

    /// Marks an alert as acknowledged (ignored while it is not active) or not.
    pub fn set_viewed(&self, id: ConditionId, viewed: bool) {
        self.shared.submit(Command::SetViewed(id, viewed));
    }

    /// Acknowledges every active alert.
    pub fn set_all_viewed(&self) {
        self.shared.submit(Command::SetAllViewed);
    }

    /// Highlights the source of an active alert, or clears it.
    pub fn highlight(&self, id: ConditionId, on: bool) {
        self.shared.submit(Command::Highlight(id, on));
    }

    /// Delivers an entity notification; dependents are re-evaluated eagerly.
    pub fn notify(&self, notification: Notification) {
        self.shared.submit(Command::Notify(notification));
    }

    /// Handles anything that was deferred while the registry was borrowed.
    pub fn flush(&self) {
        self.shared.pump();
    }

    /// Number of deferred commands.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.shared.state.try_borrow().map_or(0, |s| s.rows.len())
    }

    /// Returns `true` if no bindings are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// The binding at `row`.
    #[must_use]
    pub fn row_at(&self, row: usize) -> Option<Ref<'_, AlertConditionData>> {
        let state = self.shared.state.try_borrow().ok()?;
        Ref::filter_map(state, |s| {
            s.rows.get(row).and_then(|slot| s.slots[*slot].as_ref())
        })
        .ok()
    }

    /// The binding with identity `id`.
    #[must_use]
    pub fn condition(&self, id: ConditionId) -> Option<Ref<'_, AlertConditionData>> {
        let state = self.shared.state.try_borrow().ok()?;
        Ref::filter_map(state, |s| {
            s.by_id.get(&id).and_then(|slot| s.slots[*slot].as_ref())
        })
        .ok()
    }

    /// Row of the binding with identity `id`.
    #[must_use]
    pub fn row_of(&self, id: ConditionId) -> Option<usize> {
        let state = self.shared.state.try_borrow().ok()?;
        state.row_of(id)
    }

    /// Identities in row order.
    #[must_use]
    pub fn ids(&self) -> Vec<ConditionId> {
        let Ok(state) = self.shared.state.try_borrow() else {
            return Vec::new();
        };
        state
            .rows
            .iter()
            .filter_map(|slot| state.slots[*slot].as_ref()?.id())
            .collect()
    }

    /// Ids of the bindings that depend on `key`.
    #[must_use]
    pub fn dependents_of(&self, key: EntityKey) -> Vec<ConditionId> {
        self.shared
            .state
            .try_borrow()
            .ok()
            .and_then(|s| s.dependents.get(&key).map(|d| d.to_vec()))
            .unwrap_or_default()
    }

    /// Whether the binding at `row` holds, re-evaluating it if it is dirty.
    ///
    /// Returns `None` for an unknown row or while the registry is updating.
    pub fn matches_query(&self, row: usize) -> Option<bool> {
        self.with_row(row, |data, engine| {
            let result = data.matches_query(engine);
            (result, data.refresh(engine))
        })
    }

    /// Whether the binding with identity `id` is active, re-evaluating it if
    /// it is dirty.
    pub fn is_active(&self, id: ConditionId) -> Option<bool> {
        let row = self.row_of(id)?;
        self.with_row(row, |data, engine| {
            let transition = data.refresh(engine);
            (data.last_active(), transition)
        })
    }

    fn with_row<R>(
        &self,
        row: usize,
        f: impl FnOnce(&mut AlertConditionData, &dyn GeometryEngine) -> (R, Transition),
    ) -> Option<R> {
        let (value, changes) = {
            let mut guard = self.shared.state.try_borrow_mut().ok()?;
            let state = &mut *guard;
            let slot = *state.rows.get(row)?;
            let data = state.slots[slot].as_mut()?;
            let (value, transition) = f(&mut *data, &*state.engine);
            let mut changes = Vec::new();
            if transition.happened() {
                log_transition(data, transition);
                changes.push(updated(row, DataRoles::ACTIVE));
            }
            (value, changes)
        };
        self.shared.subscribers.publish(&changes);
        self.shared.pump();
        Some(value)
    }
}

fn updated(row: usize, roles: DataRoles) -> ListChange {
    ListChange::Updated {
        first: row,
        last: row,
        roles,
    }
}

fn log_transition(data: &AlertConditionData, transition: Transition) {
    match transition {
        Transition::Activated => {
            debug!(id = ?data.id(), name = data.name(), level = %data.level(), "alert activated");
        }
        Transition::Deactivated => {
            debug!(id = ?data.id(), name = data.name(), "alert deactivated");
        }
        Transition::None => {}
    }
}

impl NotificationSink for Shared {
    fn post(&self, notification: Notification) {
        self.submit(Command::Notify(notification));
    }
}

impl Shared {
    fn submit(&self, command: Command) {
        self.pending.borrow_mut().push_back(command);
        self.pump();
    }

    /// Drains the queue unless an outer call is already doing so.
    fn pump(&self) {
        if self.pumping.replace(true) {
            return;
        }
        let mut changes = Vec::new();
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(command) = next else {
                break;
            };
            let Ok(mut state) = self.state.try_borrow_mut() else {
                self.pending.borrow_mut().push_front(command);
                warn!(
                    pending = self.pending.borrow().len(),
                    "registry is borrowed; deferring until the next flush"
                );
                break;
            };
            state.apply(command, &mut changes);
            drop(state);
            // Publish per command so subscribers see changes in order even if
            // a later command is deferred.
            self.subscribers.publish(&changes);
            changes.clear();
        }
        self.pumping.set(false);
    }
}

impl RegistryState {
    fn row_of(&self, id: ConditionId) -> Option<usize> {
        let slot = *self.by_id.get(&id)?;
        self.rows.iter().position(|s| *s == slot)
    }

    fn apply(&mut self, command: Command, out: &mut Vec<ListChange>) {
        match command {
            Command::Notify(Notification::Changed(key)) => self.reevaluate(key, out),
            Command::Notify(Notification::Removed(key)) => {
                let ids = self.dependents.remove(&key).unwrap_or_default();
                for id in ids {
                    self.remove(id, out);
                }
            }
            Command::Remove(id) => self.remove(id, out),
            Command::SetEnabled(id, enabled) => {
                let engine = &*self.engine;
                let Some(data) = self.by_id.get(&id).and_then(|s| self.slots[*s].as_mut()) else {
                    return;
                };
                let (changed, transition) = data.update_enabled(enabled, engine);
                if changed {
                    log_transition(data, transition);
                    let mut roles = DataRoles::ENABLED;
                    roles.set(DataRoles::ACTIVE, transition.happened());
                    debug!(%id, enabled, "condition enabled changed");
                    if let Some(row) = self.row_of(id) {
                        out.push(updated(row, roles));
                    }
                }
            }
            Command::SetViewed(id, viewed) => {
                let Some(data) = self.data_mut(id) else {
                    return;
                };
                if data.set_viewed(viewed) {
                    if let Some(row) = self.row_of(id) {
                        out.push(updated(row, DataRoles::VIEWED));
                    }
                }
            }
            Command::SetAllViewed => {
                for row in 0..self.rows.len() {
                    let slot = self.rows[row];
                    let Some(data) = self.slots[slot].as_mut() else {
                        continue;
                    };
                    if data.last_active() && data.set_viewed(true) {
                        out.push(updated(row, DataRoles::VIEWED));
                    }
                }
            }
            Command::Highlight(id, on) => {
                let Some(data) = self.data_mut(id) else {
                    return;
                };
                if data.highlight(on) {
                    if let Some(row) = self.row_of(id) {
                        out.push(updated(row, DataRoles::HIGHLIGHT));
                    }
                }
            }
        }
    }

    fn data_mut(&mut self, id: ConditionId) -> Option<&mut AlertConditionData> {
        let slot = *self.by_id.get(&id)?;
        self.slots[slot].as_mut()
    }

    fn reevaluate(&mut self, key: EntityKey, out: &mut Vec<ListChange>) {
        let Some(ids) = self.dependents.get(&key).cloned() else {
            return;
        };
        for id in ids {
            let engine = &*self.engine;
            let Some(data) = self.by_id.get(&id).and_then(|s| self.slots[*s].as_mut()) else {
                continue;
            };
            if !data.is_valid() {
                self.remove(id, out);
                continue;
            }
            data.mark_dirty();
            let transition = data.refresh(engine);
            trace!(%id, %key, ?transition, "dependent re-evaluated");
            if transition.happened() {
                log_transition(data, transition);
                if let Some(row) = self.row_of(id) {
                    out.push(updated(row, DataRoles::ACTIVE));
                }
            }
        }
    }

    fn remove(&mut self, id: ConditionId, out: &mut Vec<ListChange>) {
        let Some(slot) = self.by_id.remove(&id) else {
            return;
        };
        let Some(row) = self.rows.iter().position(|s| *s == slot) else {
            return;
        };
        self.rows.remove(row);
        self.free.push(slot);
        if let Some(mut data) = self.slots[slot].take() {
            for key in [data.source_key(), data.target_key()] {
                if let Some(list) = self.dependents.get_mut(&key) {
                    list.retain(|d| *d != id);
                    if list.is_empty() {
                        self.dependents.remove(&key);
                    }
                }
            }
            data.clear_highlight();
            debug!(%id, row, name = data.name(), "condition removed");
        }
        out.push(ListChange::Removed {
            first: row,
            last: row,
        });
    }
}
