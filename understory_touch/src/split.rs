// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Split dispatch: routing one multi-touch stream to several children.
//!
//! ## Bookkeeping
//!
//! [`SplitTargets`] maps each live pointer id to the child that owns it. Several ids may map
//! to the same child. Alongside the map it keeps one [`TargetInfo`] per distinct owner,
//! carrying the time that owner's first contact went down. The owner with the earliest
//! time is the *primary* target.
//!
//! Both tables are small and scanned linearly.
//!
//! ## Derived events
//!
//! Each owner receives its own event built by [`SplitTargets::filter_for_child`], holding only
//! the contacts it owns plus a contact that is joining it. When the owner had no contacts, a
//! `PointerDown` is delivered as `Down`; when its last contact leaves, a `PointerUp` is
//! delivered as `Up`.

use smallvec::SmallVec;
use understory_motion_event::{
    Action, ActionKind, EventPool, MotionEvent, PointerId, PointerSample, PooledEvent,
};

use crate::dispatch::TouchHandler;
use crate::remap::{Delivery, test_and_deliver};
use crate::tree::ViewTree;
use crate::types::{NodeId, PrivateFlags};

/// A distinct owner in split mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TargetInfo {
    /// Owning child.
    pub node: NodeId,
    /// Time the owner's first contact went down.
    pub down_time: u64,
}

/// Per-pointer ownership of a splitting container.
#[derive(Clone, Debug, Default)]
pub struct SplitTargets {
    // Sorted by pointer id.
    ids: SmallVec<[(PointerId, NodeId); 8]>,
    unique: SmallVec<[TargetInfo; 4]>,
}

impl SplitTargets {
    /// Empty bookkeeping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no pointer is owned.
    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// Number of owned pointer ids.
    pub fn id_count(&self) -> usize {
        self.ids.len()
    }

    /// `(pointer, owner)` pairs in pointer id order.
    pub fn iter(&self) -> impl Iterator<Item = (PointerId, NodeId)> + '_ {
        self.ids.iter().copied()
    }

    /// Owner of pointer `id`.
    pub fn get(&self, id: PointerId) -> Option<NodeId> {
        self.ids
            .binary_search_by_key(&id, |(i, _)| *i)
            .ok()
            .map(|pos| self.ids[pos].1)
    }

    /// Returns `true` if `node` owns at least one pointer.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.unique.iter().any(|t| t.node == node)
    }

    /// Number of pointers owned by `node`.
    pub fn pointer_count_for(&self, node: NodeId) -> usize {
        self.ids.iter().filter(|(_, n)| *n == node).count()
    }

    /// Distinct owners.
    pub fn unique_targets(&self) -> &[TargetInfo] {
        &self.unique
    }

    /// Owner record of `node`.
    pub fn info_of(&self, node: NodeId) -> Option<TargetInfo> {
        self.unique.iter().find(|t| t.node == node).copied()
    }

    /// Distinct owner whose first contact went down earliest.
    ///
    /// Ties go to the owner recorded first.
    pub fn primary_target(&self) -> Option<TargetInfo> {
        let mut best: Option<TargetInfo> = None;
        for info in &self.unique {
            if best.is_none_or(|b| info.down_time < b.down_time) {
                best = Some(*info);
            }
        }
        best
    }

    /// Assign pointer `id` to `node`.
    ///
    /// `down_time` is recorded only if `node` is not already an owner. An id owned by a
    /// different node is moved.
    pub fn add(&mut self, id: PointerId, node: NodeId, down_time: u64) {
        if self.get(id) == Some(node) {
            return;
        }
        self.remove_by_id(id);
        let pos = self.ids.partition_point(|(i, _)| *i < id);
        self.ids.insert(pos, (id, node));
        if !self.contains_node(node) {
            self.unique.push(TargetInfo { node, down_time });
        }
    }

    /// Release pointer `id`; returns its former owner.
    pub fn remove_by_id(&mut self, id: PointerId) -> Option<NodeId> {
        let pos = self.ids.binary_search_by_key(&id, |(i, _)| *i).ok()?;
        let (_, node) = self.ids.remove(pos);
        if !self.ids.iter().any(|(_, n)| *n == node) {
            self.remove_unique(node);
        }
        Some(node)
    }

    /// Release every pointer owned by `node`; returns whether it was an owner.
    pub fn remove_node(&mut self, node: NodeId) -> bool {
        self.ids.retain(|(_, n)| *n != node);
        self.remove_unique(node)
    }

    /// Release everything.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.unique.clear();
    }

    fn remove_unique(&mut self, node: NodeId) -> bool {
        match self.unique.iter().position(|t| t.node == node) {
            Some(pos) => {
                self.unique.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Derive the share of `event` that `child` should receive.
    ///
    /// The derived event keeps the contacts `child` owns plus the contact a
    /// `Down`/`PointerDown` introduces, in their original order, with `down_time` and the
    /// source event's time and metadata. The action is degraded or re-indexed for the
    /// smaller contact set. Returns `None` when `child` has nothing to receive, including
    /// a `PointerUp` for a contact it does not own.
    pub fn filter_for_child(
        &self,
        event: &MotionEvent,
        child: NodeId,
        down_time: u64,
        pool: &EventPool,
    ) -> Option<PooledEvent> {
        let kind = event.action_masked();
        let mut action = event.action();

        let action_id = match kind {
            ActionKind::PointerUp => {
                let id = event.action_pointer_id()?;
                if self.get(id) != Some(child) {
                    return None;
                }
                Some(id)
            }
            ActionKind::Down => event.pointer_id(0),
            ActionKind::PointerDown => event.action_pointer_id(),
            _ => None,
        };

        let owned = self.pointer_count_for(child);
        let mut needs_new_index = false;
        let pointer_count = match kind {
            ActionKind::Down => owned + 1,
            ActionKind::PointerDown => {
                if owned == 0 {
                    action = Action::DOWN;
                } else {
                    needs_new_index = true;
                }
                owned + 1
            }
            ActionKind::PointerUp => {
                if owned == 1 {
                    action = Action::UP;
                } else {
                    needs_new_index = true;
                }
                owned
            }
            _ => owned,
        };
        if pointer_count == 0 {
            return None;
        }

        let keep = |p: &PointerSample| Some(p.id) == action_id || self.get(p.id) == Some(child);
        let mut kept = event.pointers().iter().filter(|p| keep(*p)).peekable();
        kept.peek()?;

        if needs_new_index {
            let index = event
                .pointers()
                .iter()
                .filter(|p| keep(*p))
                .position(|p| Some(p.id) == action_id)?;
            action = Action::new(kind, index);
        }

        Some(pool.obtain(
            action,
            down_time,
            event.event_time(),
            *event.meta(),
            kept.copied(),
        ))
    }

    /// A pooled `Cancel` carrying the contacts `info.node` owns in `event`, or every contact
    /// if it owns none of them.
    pub(crate) fn cancel_event_for(
        &self,
        event: &MotionEvent,
        info: TargetInfo,
        pool: &EventPool,
    ) -> PooledEvent {
        let owns = |p: &&PointerSample| self.get(p.id) == Some(info.node);
        let any = event.pointers().iter().any(|p| owns(&p));
        let samples = event
            .pointers()
            .iter()
            .filter(|p| !any || owns(p))
            .copied();
        pool.obtain(
            Action::CANCEL,
            info.down_time,
            event.event_time(),
            *event.meta(),
            samples,
        )
    }
}

impl ViewTree {
    pub(crate) fn dispatch_split(
        &mut self,
        container: NodeId,
        event: &mut MotionEvent,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        let action = event.action();
        let kind = action.kind();
        let origin = event.location();
        let disallow = self.disallows_intercept(container);

        if kind.is_down() {
            match event.action_pointer_id() {
                Some(id) => {
                    // A reused id must not keep routing to its previous owner.
                    if let Some(targets) = self.split_mut(container) {
                        targets.remove_by_id(id);
                    }
                    if disallow || !handler.on_intercept_touch_event(self, container, event) {
                        event.set_action(action);
                        if self.claim_new_pointer(container, event, id, handler) {
                            return true;
                        }
                    }
                }
                None => {
                    tracing::debug!(
                        ?container,
                        index = event.action_index(),
                        "pointer index out of range; skipping target search"
                    );
                }
            }
        }

        let up_or_cancel = kind.is_up_or_cancel();
        if up_or_cancel {
            self.set_disallow_flag(container, false);
        }

        self.prune_stale_targets(container);
        if self.split(container).is_none_or(SplitTargets::is_empty) {
            event.set_location(origin);
            return self.dispatch_to_self(container, event, handler);
        }

        if !disallow && handler.on_intercept_touch_event(self, container, event) {
            self.take_private(container, PrivateFlags::CANCEL_NEXT_UP_EVENT);
            let taken = self.take_split(container);
            for info in taken.unique_targets() {
                let Some(frame) = self.child_frame(container, info.node) else {
                    continue;
                };
                let mut cancel = taken.cancel_event_for(event, *info, &self.pool);
                let local = frame.to_local(cancel.location());
                cancel.set_location(local);
                self.deliver_cancel(info.node, &mut cancel, handler);
            }
            return true;
        }

        let snapshot: SmallVec<[TargetInfo; 4]> = self
            .split(container)
            .map(|t| t.unique_targets().iter().copied().collect())
            .unwrap_or_default();
        let mut handled = false;
        for entry in snapshot {
            let Some(targets) = self.split(container) else {
                break;
            };
            // An earlier delivery in this pass may have released the owner.
            let Some(info) = targets.info_of(entry.node) else {
                continue;
            };
            // A cancel reaches every owner, even one holding none of the event's contacts.
            let derived = if kind == ActionKind::Cancel {
                Some(targets.cancel_event_for(event, info, &self.pool))
            } else {
                targets.filter_for_child(event, info.node, info.down_time, &self.pool)
            };
            let Some(mut child_event) = derived else {
                continue;
            };
            let Some(frame) = self.child_frame(container, info.node) else {
                tracing::trace!(?container, node = ?info.node, "dropping stale owner");
                if let Some(targets) = self.split_mut(container) {
                    targets.remove_node(info.node);
                }
                continue;
            };
            let local = frame.to_local(child_event.location());
            child_event.set_location(local);

            if self.take_private(info.node, PrivateFlags::CANCEL_NEXT_UP_EVENT) {
                child_event.set_action(Action::CANCEL);
                if let Some(targets) = self.split_mut(container) {
                    targets.remove_node(info.node);
                }
            }

            tracing::trace!(
                ?container,
                node = ?info.node,
                pointers = child_event.pointer_count(),
                "split delivery"
            );
            handled |= self.dispatch_touch_event(info.node, &mut child_event, handler);
        }

        if let Some(targets) = self.split_mut(container) {
            if kind == ActionKind::PointerUp {
                if let Some(id) = event.action_pointer_id() {
                    targets.remove_by_id(id);
                }
            }
            if up_or_cancel {
                targets.clear();
            }
        }
        handled
    }

    /// Find an owner for the contact `id` that just went down.
    fn claim_new_pointer(
        &mut self,
        container: NodeId,
        event: &MotionEvent,
        id: PointerId,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        let event_time = event.event_time();
        let count = self.child_count(container);
        for i in (0..count).rev() {
            let Some(child) = self.child_at(container, i) else {
                continue;
            };
            if !self.is_hit_testable(child) {
                continue;
            }
            let Some(targets) = self.split(container) else {
                return false;
            };
            let down_time = targets
                .info_of(child)
                .map_or(event_time, |info| info.down_time);
            let Some(mut child_event) =
                targets.filter_for_child(event, child, down_time, &self.pool)
            else {
                continue;
            };
            let Some(index) = child_event.find_pointer_index(id) else {
                continue;
            };
            let mut delivery = Delivery {
                tree: self,
                container,
                handler: &mut *handler,
            };
            if test_and_deliver(&mut delivery, child, &mut child_event, index) {
                self.record_split_owner(container, id, child, down_time);
                return true;
            }
        }

        // Nothing under the contact; offer it to the primary target.
        let Some(targets) = self.split(container) else {
            return false;
        };
        let Some(primary) = targets.primary_target() else {
            return false;
        };
        let Some(mut child_event) =
            targets.filter_for_child(event, primary.node, primary.down_time, &self.pool)
        else {
            return false;
        };
        let Some(frame) = self.child_frame(container, primary.node) else {
            return false;
        };
        child_event.set_location(frame.to_local(event.location()));
        if self.dispatch_touch_event(primary.node, &mut child_event, handler) {
            tracing::trace!(?container, node = ?primary.node, ?id, "contact joined primary target");
            self.record_split_owner(container, id, primary.node, primary.down_time);
            return true;
        }
        false
    }

    fn record_split_owner(
        &mut self,
        container: NodeId,
        id: PointerId,
        child: NodeId,
        down_time: u64,
    ) {
        if self.parent(child) != Some(container) {
            tracing::trace!(?container, ?child, "owner left the container during delivery");
            return;
        }
        if let Some(targets) = self.split_mut(container) {
            targets.add(id, child, down_time);
        }
    }
}
