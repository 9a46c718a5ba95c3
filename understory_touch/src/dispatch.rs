// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch entry point, interception, and cancellation.
//!
//! ## Handlers
//!
//! A [`TouchHandler`] supplies node behavior: whether a node consumes an event, whether a
//! container intercepts its children's gesture, and lifecycle notifications. Handlers get
//! `&mut ViewTree` and may mutate the tree while an event is in flight. Dispatch never
//! holds a borrow across a handler call and re-reads state afterwards.
//!
//! ## Interception
//!
//! Before delivering to children, a container asks
//! [`TouchHandler::on_intercept_touch_event`]. If it returns `true` while children own the
//! gesture, each distinct owner receives one `Cancel` and the container consumes the event.
//! A descendant may suspend this for the rest of the gesture with
//! [`ViewTree::request_disallow_intercept_touch_event`]; the request is cleared when the
//! gesture ends with `Up` or `Cancel`.
//!
//! ## Synthesized cancels
//!
//! Cancels caused by removal, teardown, or a mode switch carry a single contact at the
//! receiver's origin, stamped with the time of the last dispatched event.

use kurbo::Point;
use smallvec::SmallVec;
use understory_motion_event::{Action, EventMeta, MotionEvent, PointerId, PointerSample};

use crate::split::{SplitTargets, TargetInfo};
use crate::tree::{TouchTargets, ViewTree};
use crate::types::{GroupFlags, NodeId, PrivateFlags};

/// Node behavior consulted during dispatch.
pub trait TouchHandler {
    /// Handle `event` at `node`, in `node`'s coordinate space. Return `true` to consume it.
    ///
    /// Called for leaves, and for containers when no child takes the event.
    fn on_touch_event(&mut self, tree: &mut ViewTree, node: NodeId, event: &MotionEvent) -> bool;

    /// Return `true` to take the gesture away from `container`'s children.
    fn on_intercept_touch_event(
        &mut self,
        tree: &mut ViewTree,
        container: NodeId,
        event: &MotionEvent,
    ) -> bool {
        let _ = (tree, container, event);
        false
    }

    /// `node` was attached by [`ViewTree::attach`].
    fn on_attached(&mut self, tree: &ViewTree, node: NodeId) {
        let _ = (tree, node);
    }

    /// `node` was detached by teardown.
    fn on_detached(&mut self, tree: &ViewTree, node: NodeId) {
        let _ = (tree, node);
    }
}

impl<F> TouchHandler for F
where
    F: FnMut(&mut ViewTree, NodeId, &MotionEvent) -> bool,
{
    fn on_touch_event(&mut self, tree: &mut ViewTree, node: NodeId, event: &MotionEvent) -> bool {
        self(tree, node, event)
    }
}

impl ViewTree {
    /// Dispatch `event` to `node`, in `node`'s coordinate space.
    ///
    /// Containers route the event to their children, single-target or split according to
    /// their mode; leaves hand it to [`TouchHandler::on_touch_event`]. Returns whether the
    /// event was consumed. Stale nodes consume nothing.
    ///
    /// The event's positions may be left shifted or its action rewritten on return.
    pub fn dispatch_touch_event(
        &mut self,
        node: NodeId,
        event: &mut MotionEvent,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        let Some(split) = self.node(node).map(|n| n.group.as_ref().map(|g| g.targets.is_split()))
        else {
            tracing::trace!(?node, "dispatch to stale node ignored");
            return false;
        };
        self.last_event_time = event.event_time();
        match split {
            Some(true) => self.dispatch_split(node, event, handler),
            Some(false) => self.dispatch_single(node, event, handler),
            None => handler.on_touch_event(self, node, event),
        }
    }

    /// Enable or disable splitting of multi-touch streams across `container`'s children.
    ///
    /// Switching while children own a gesture cancels every owner first.
    pub fn set_motion_event_splitting_enabled(
        &mut self,
        container: NodeId,
        split: bool,
        handler: &mut dyn TouchHandler,
    ) {
        let Some(group) = self.group_mut(container) else {
            return;
        };
        if group.flags.contains(GroupFlags::SPLIT_MOTION_EVENTS) == split {
            return;
        }
        group.flags.set(GroupFlags::SPLIT_MOTION_EVENTS, split);
        let old = core::mem::replace(&mut group.targets, TouchTargets::for_mode(split));
        let owners = old.owners();
        if !owners.is_empty() {
            tracing::debug!(
                ?container,
                owners = owners.len(),
                "splitting changed mid-gesture; cancelling targets"
            );
        }
        for owner in owners {
            if self.parent(owner) == Some(container) {
                self.send_cancel(owner, handler);
            }
        }
    }

    /// Returns `true` if `container` splits multi-touch streams.
    pub fn is_motion_event_splitting_enabled(&self, container: NodeId) -> bool {
        self.group(container)
            .is_some_and(|g| g.flags.contains(GroupFlags::SPLIT_MOTION_EVENTS))
    }

    /// Ask the ancestors of `node` not to intercept the current gesture.
    ///
    /// Starting at the container of `node`, each container takes the new value and passes
    /// it to its own container. The requester's own flag is left alone, so a container can
    /// keep intercepting its children while asking its ancestors to stand back. Propagation
    /// stops at the first container already holding the value, or at the root.
    pub fn request_disallow_intercept_touch_event(&mut self, node: NodeId, disallow: bool) {
        let mut current = self.parent(node);
        while let Some(container) = current {
            let Some(group) = self.group_mut(container) else {
                return;
            };
            if group.flags.contains(GroupFlags::DISALLOW_INTERCEPT) == disallow {
                // Ancestors are assumed to agree already.
                return;
            }
            group.flags.set(GroupFlags::DISALLOW_INTERCEPT, disallow);
            current = self.parent(container);
        }
    }

    /// Returns `true` if interception is suspended on `container`.
    pub fn is_disallow_intercept(&self, container: NodeId) -> bool {
        self.disallows_intercept(container)
    }

    /// Returns `true` if any child of `container` owns part of a gesture.
    pub fn has_touch_targets(&self, container: NodeId) -> bool {
        self.group(container).is_some_and(|g| !g.targets.is_empty())
    }

    /// Current owner of `container`'s gesture in single-target mode.
    pub fn touch_target(&self, container: NodeId) -> Option<NodeId> {
        self.single_target(container)
    }

    /// Split-mode bookkeeping of `container`.
    pub fn split_targets(&self, container: NodeId) -> Option<&SplitTargets> {
        self.split(container)
    }

    /// Owner of pointer `id` in `container`'s split-mode bookkeeping.
    pub fn split_target_for(&self, container: NodeId, id: PointerId) -> Option<NodeId> {
        self.split(container).and_then(|t| t.get(id))
    }

    /// Distinct split-mode owners of `container`.
    pub fn split_owners(&self, container: NodeId) -> &[TargetInfo] {
        self.split(container)
            .map(SplitTargets::unique_targets)
            .unwrap_or(&[])
    }

    // --- crate internals --------------------------------------------------

    pub(crate) fn disallows_intercept(&self, container: NodeId) -> bool {
        self.group(container)
            .is_some_and(|g| g.flags.contains(GroupFlags::DISALLOW_INTERCEPT))
    }

    pub(crate) fn set_disallow_flag(&mut self, container: NodeId, on: bool) {
        if let Some(g) = self.group_mut(container) {
            g.flags.set(GroupFlags::DISALLOW_INTERCEPT, on);
        }
    }

    pub(crate) fn single_target(&self, container: NodeId) -> Option<NodeId> {
        match self.group(container).map(|g| &g.targets) {
            Some(TouchTargets::Single(target)) => *target,
            _ => None,
        }
    }

    /// Replace the single-mode target; returns the previous one.
    pub(crate) fn set_single_target(
        &mut self,
        container: NodeId,
        target: Option<NodeId>,
    ) -> Option<NodeId> {
        match self.group_mut(container).map(|g| &mut g.targets) {
            Some(TouchTargets::Single(slot)) => core::mem::replace(slot, target),
            _ => None,
        }
    }

    pub(crate) fn split(&self, container: NodeId) -> Option<&SplitTargets> {
        match self.group(container).map(|g| &g.targets) {
            Some(TouchTargets::Split(targets)) => Some(targets),
            _ => None,
        }
    }

    pub(crate) fn split_mut(&mut self, container: NodeId) -> Option<&mut SplitTargets> {
        match self.group_mut(container).map(|g| &mut g.targets) {
            Some(TouchTargets::Split(targets)) => Some(targets),
            _ => None,
        }
    }

    /// Take the split bookkeeping, leaving it empty.
    pub(crate) fn take_split(&mut self, container: NodeId) -> SplitTargets {
        self.split_mut(container)
            .map(core::mem::take)
            .unwrap_or_default()
    }

    /// Drop owners that are no longer children of `container`.
    pub(crate) fn prune_stale_targets(&mut self, container: NodeId) {
        let Some(group) = self.group(container) else {
            return;
        };
        let stale: SmallVec<[NodeId; 4]> = group
            .targets
            .owners()
            .into_iter()
            .filter(|owner| self.parent(*owner) != Some(container))
            .collect();
        for owner in stale {
            tracing::trace!(?container, ?owner, "dropping stale owner");
            if let Some(group) = self.group_mut(container) {
                group.targets.forget(owner);
            }
        }
    }

    /// Let `container` handle `event` itself.
    pub(crate) fn dispatch_to_self(
        &mut self,
        container: NodeId,
        event: &mut MotionEvent,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        if self.take_private(container, PrivateFlags::CANCEL_NEXT_UP_EVENT) {
            event.set_action(Action::CANCEL);
        }
        handler.on_touch_event(self, container, event)
    }

    pub(crate) fn deliver_cancel(
        &mut self,
        node: NodeId,
        event: &mut MotionEvent,
        handler: &mut dyn TouchHandler,
    ) {
        if !self.dispatch_touch_event(node, event, handler) {
            tracing::debug!(?node, "cancel was not consumed");
        }
    }

    /// Deliver a synthesized `Cancel` to `node` at its origin.
    pub(crate) fn send_cancel(&mut self, node: NodeId, handler: &mut dyn TouchHandler) {
        let now = self.last_event_time;
        let mut cancel = self.pool.obtain(
            Action::CANCEL,
            now,
            now,
            EventMeta::default(),
            [PointerSample {
                id: PointerId(0),
                position: Point::ORIGIN,
            }],
        );
        self.deliver_cancel(node, &mut cancel, handler);
    }

    /// Cancel and release `child` if it owns part of `container`'s gesture.
    pub(crate) fn cancel_touch_target(
        &mut self,
        container: NodeId,
        child: NodeId,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        if !self.group(container).is_some_and(|g| g.targets.contains(child)) {
            return false;
        }
        self.send_cancel(child, handler);
        if let Some(group) = self.group_mut(container) {
            group.targets.forget(child);
        }
        true
    }

    /// Teardown: cancel every owner in the subtree, then notify detached nodes.
    pub(crate) fn dispatch_detached(&mut self, node: NodeId, handler: &mut dyn TouchHandler) {
        if !self.is_alive(node) {
            return;
        }
        let owners = match self.group_mut(node) {
            Some(group) => {
                group.flags.remove(GroupFlags::DISALLOW_INTERCEPT);
                group.targets.take().owners()
            }
            None => SmallVec::new(),
        };
        for owner in owners {
            if self.is_alive(owner) {
                self.send_cancel(owner, handler);
            }
        }
        let children: SmallVec<[NodeId; 8]> = self.children(node).iter().copied().collect();
        for child in children {
            self.dispatch_detached(child, handler);
        }
        if self.take_private(node, PrivateFlags::ATTACHED) {
            handler.on_detached(self, node);
        }
    }
}
