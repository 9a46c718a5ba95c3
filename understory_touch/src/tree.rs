// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View tree: node storage, the child collection, and lifecycle.
//!
//! ## Child collection
//!
//! Every container keeps its children in one ordered sequence. Insertion order is paint
//! order, so the last child is the topmost and is hit-tested first. Index-based operations
//! panic on out-of-range indices; the `try_*` variants return [`ChildError`] instead.
//!
//! ## Removal and teardown
//!
//! Removing a child that owns part of a live gesture first delivers one synthesized
//! `Cancel` to it and then drops it from the container's bookkeeping. The removed subtree
//! is then torn down: every container inside it cancels its own owners, and attached nodes
//! receive [`TouchHandler::on_detached`].
//!
//! [`detach_view_from_parent`](ViewTree::detach_view_from_parent) is the exception: it
//! unlinks without cancelling, for callers that re-attach the child shortly after.

use alloc::vec::Vec;
use core::mem;

use kurbo::{Affine, Vec2};
use smallvec::SmallVec;
use understory_motion_event::EventPool;

use crate::dispatch::TouchHandler;
use crate::error::ChildError;
use crate::remap::ChildFrame;
use crate::split::SplitTargets;
use crate::types::{
    Bounds, GroupFlags, LocalView, NodeId, PrivateFlags, ViewFlags, ViewTreeConfig,
};

/// Ownership bookkeeping of a container; exactly one mode is active.
#[derive(Clone, Debug)]
pub(crate) enum TouchTargets {
    Single(Option<NodeId>),
    Split(SplitTargets),
}

impl TouchTargets {
    pub(crate) fn for_mode(split: bool) -> Self {
        if split {
            Self::Split(SplitTargets::new())
        } else {
            Self::Single(None)
        }
    }

    pub(crate) fn is_split(&self) -> bool {
        matches!(self, Self::Split(_))
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Self::Single(target) => target.is_none(),
            Self::Split(targets) => targets.is_empty(),
        }
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        match self {
            Self::Single(target) => *target == Some(node),
            Self::Split(targets) => targets.contains_node(node),
        }
    }

    /// Distinct owners.
    pub(crate) fn owners(&self) -> SmallVec<[NodeId; 4]> {
        match self {
            Self::Single(target) => target.iter().copied().collect(),
            Self::Split(targets) => targets.unique_targets().iter().map(|t| t.node).collect(),
        }
    }

    /// Drop `node` from the bookkeeping; returns whether it was an owner.
    pub(crate) fn forget(&mut self, node: NodeId) -> bool {
        match self {
            Self::Single(target) if *target == Some(node) => {
                *target = None;
                true
            }
            Self::Single(_) => false,
            Self::Split(targets) => targets.remove_node(node),
        }
    }

    /// Take the current bookkeeping, leaving an empty one in the same mode.
    pub(crate) fn take(&mut self) -> Self {
        let empty = Self::for_mode(self.is_split());
        mem::replace(self, empty)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct GroupState {
    pub(crate) flags: GroupFlags,
    pub(crate) scroll: Vec2,
    pub(crate) targets: TouchTargets,
}

impl GroupState {
    fn new(split: bool) -> Self {
        let mut flags = GroupFlags::empty();
        flags.set(GroupFlags::SPLIT_MOTION_EVENTS, split);
        Self {
            flags,
            scroll: Vec2::ZERO,
            targets: TouchTargets::for_mode(split),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    generation: u32,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) local: LocalView,
    pub(crate) private: PrivateFlags,
    pub(crate) group: Option<GroupState>,
}

impl Node {
    fn new(generation: u32, local: LocalView, group: Option<GroupState>) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
            private: PrivateFlags::empty(),
            group,
        }
    }
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A tree of views and containers that routes touch events.
///
/// Nodes are either leaf views or containers (groups). Only containers hold children and
/// routing state. Handles are generational [`NodeId`]s; operations on stale handles are
/// ignored or return `None`.
pub struct ViewTree {
    nodes: Vec<Option<Node>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    pub(crate) pool: EventPool,
    config: ViewTreeConfig,
    pub(crate) last_event_time: u64,
}

impl core::fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("ViewTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("pool", &self.pool.stats())
            .field("last_event_time", &self.last_event_time)
            .finish_non_exhaustive()
    }
}

impl ViewTree {
    /// Create an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ViewTreeConfig::default())
    }

    /// Create an empty tree with the given configuration.
    pub fn with_config(config: ViewTreeConfig) -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            pool: EventPool::with_capacity(config.event_pool_capacity),
            config,
            last_event_time: 0,
        }
    }

    /// Construction-time configuration.
    pub fn config(&self) -> &ViewTreeConfig {
        &self.config
    }

    /// Pool used for derived events. Exposed for statistics.
    pub fn event_pool(&self) -> &EventPool {
        &self.pool
    }

    /// Insert a leaf view, appended to `parent` (or as a root if `None`).
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale or not a container.
    pub fn insert_view(&mut self, parent: Option<NodeId>, local: LocalView) -> NodeId {
        self.insert_node(parent, local, None)
    }

    /// Insert a container, appended to `parent` (or as a root if `None`).
    ///
    /// The container splits motion events if
    /// [`ViewTreeConfig::split_motion_events_by_default`] is set.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale or not a container.
    pub fn insert_group(&mut self, parent: Option<NodeId>, local: LocalView) -> NodeId {
        let group = GroupState::new(self.config.split_motion_events_by_default);
        self.insert_node(parent, local, Some(group))
    }

    fn insert_node(
        &mut self,
        parent: Option<NodeId>,
        local: LocalView,
        group: Option<GroupState>,
    ) -> NodeId {
        // Reject the parent before a slot is taken.
        if let Some(p) = parent {
            if !self.is_group(p) {
                let e = if self.is_alive(p) {
                    ChildError::NotAGroup(p)
                } else {
                    ChildError::StaleNode(p)
                };
                panic!("insert: {e}");
            }
        }
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(Node::new(generation, local, group));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(Node::new(generation, local, group)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        if let Some(p) = parent {
            self.add_child(p, id, None);
        }
        id
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Returns `true` if `id` is a live container.
    pub fn is_group(&self, id: NodeId) -> bool {
        self.group(id).is_some()
    }

    /// Returns `true` if `id` is attached to a window.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.has_private(id, PrivateFlags::ATTACHED)
    }

    /// Container holding `id`, if any.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of `id` in paint order (back to front). Empty for leaves and stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Number of children of `id`.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Child of `id` at `index`, if in range.
    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    /// Position of `child` among the children of `parent`.
    pub fn index_of_child(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    /// Bounds of `id` in its parent's coordinate space.
    pub fn bounds(&self, id: NodeId) -> Option<Bounds> {
        self.node(id).map(|n| n.local.bounds)
    }

    /// Update the bounds of `id`.
    pub fn set_bounds(&mut self, id: NodeId, bounds: Bounds) {
        if let Some(n) = self.node_mut(id) {
            n.local.bounds = bounds;
        }
    }

    /// Local transform of `id`.
    pub fn transform(&self, id: NodeId) -> Option<Affine> {
        self.node(id).map(|n| n.local.transform)
    }

    /// Update the local transform of `id`.
    pub fn set_transform(&mut self, id: NodeId, transform: Affine) {
        if let Some(n) = self.node_mut(id) {
            n.local.transform = transform;
        }
    }

    /// Hit-test flags of `id`.
    pub fn flags(&self, id: NodeId) -> Option<ViewFlags> {
        self.node(id).map(|n| n.local.flags)
    }

    /// Replace the hit-test flags of `id`.
    pub fn set_flags(&mut self, id: NodeId, flags: ViewFlags) {
        if let Some(n) = self.node_mut(id) {
            n.local.flags = flags;
        }
    }

    /// Toggle [`ViewFlags::VISIBLE`].
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if let Some(n) = self.node_mut(id) {
            n.local.flags.set(ViewFlags::VISIBLE, visible);
        }
    }

    /// Toggle [`ViewFlags::ANIMATING`].
    pub fn set_animating(&mut self, id: NodeId, animating: bool) {
        if let Some(n) = self.node_mut(id) {
            n.local.flags.set(ViewFlags::ANIMATING, animating);
        }
    }

    /// Scroll offset of a container's content.
    pub fn scroll(&self, id: NodeId) -> Option<Vec2> {
        self.group(id).map(|g| g.scroll)
    }

    /// Update the scroll offset of a container. Ignored for leaves.
    pub fn set_scroll(&mut self, id: NodeId, scroll: Vec2) {
        if let Some(g) = self.group_mut(id) {
            g.scroll = scroll;
        }
    }

    /// Coordinate mapping from `container` into `child`.
    ///
    /// Returns `None` unless `child` is currently a child of `container`.
    pub fn child_frame(&self, container: NodeId, child: NodeId) -> Option<ChildFrame> {
        let scroll = self.group(container)?.scroll;
        let node = self.node(child)?;
        if node.parent != Some(container) {
            return None;
        }
        Some(ChildFrame::new(scroll, node.local.bounds, node.local.transform))
    }

    pub(crate) fn is_hit_testable(&self, id: NodeId) -> bool {
        self.node(id)
            .is_some_and(|n| n.local.flags.intersects(ViewFlags::VISIBLE | ViewFlags::ANIMATING))
    }

    // --- child collection -------------------------------------------------

    /// Add `child` to `parent` at `index` (`None` appends).
    ///
    /// # Panics
    ///
    /// Panics with the [`ChildError`] message on any error reported by
    /// [`try_add_child`](Self::try_add_child).
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Err(e) = self.try_add_child(parent, child, index) {
            panic!("add_child: {e}");
        }
    }

    /// Add `child` to `parent` at `index` (`None` appends).
    ///
    /// If `parent` is attached, the child's subtree is marked attached.
    pub fn try_add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<(), ChildError> {
        self.link(parent, child, index)?;
        if self.is_attached(parent) {
            self.set_private_subtree(child, PrivateFlags::ATTACHED, true);
        }
        Ok(())
    }

    /// Remove `child` from `parent`, cancelling any gesture it owns there.
    ///
    /// Returns `false` if `child` was not a child of `parent`.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.remove_child_internal(parent, child, handler);
        true
    }

    /// Remove and return the child of `parent` at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or `parent` is stale.
    pub fn remove_child_at(
        &mut self,
        parent: NodeId,
        index: usize,
        handler: &mut dyn TouchHandler,
    ) -> NodeId {
        match self.try_remove_child_at(parent, index, handler) {
            Ok(child) => child,
            Err(e) => panic!("remove_child_at: {e}"),
        }
    }

    /// Remove and return the child of `parent` at `index`.
    pub fn try_remove_child_at(
        &mut self,
        parent: NodeId,
        index: usize,
        handler: &mut dyn TouchHandler,
    ) -> Result<NodeId, ChildError> {
        let count = self.live_children(parent)?.len();
        let child = self
            .child_at(parent, index)
            .ok_or(ChildError::IndexOutOfBounds { index, count })?;
        self.remove_child_internal(parent, child, handler);
        Ok(child)
    }

    /// Remove `count` children of `parent` starting at `start`.
    ///
    /// # Panics
    ///
    /// Panics if the range exceeds the live child count or `parent` is stale.
    pub fn remove_children(
        &mut self,
        parent: NodeId,
        start: usize,
        count: usize,
        handler: &mut dyn TouchHandler,
    ) {
        if let Err(e) = self.try_remove_children(parent, start, count, handler) {
            panic!("remove_children: {e}");
        }
    }

    /// Remove `count` children of `parent` starting at `start`.
    pub fn try_remove_children(
        &mut self,
        parent: NodeId,
        start: usize,
        count: usize,
        handler: &mut dyn TouchHandler,
    ) -> Result<(), ChildError> {
        let children = self.live_children(parent)?;
        let end = start.saturating_add(count);
        let doomed: SmallVec<[NodeId; 8]> = children
            .get(start..end)
            .ok_or(ChildError::IndexOutOfBounds {
                index: end,
                count: children.len(),
            })?
            .iter()
            .copied()
            .collect();
        for child in doomed {
            // A handler may already have moved it during an earlier cancel.
            if self.parent(child) == Some(parent) {
                self.remove_child_internal(parent, child, handler);
            }
        }
        Ok(())
    }

    /// Remove every child of `parent`, topmost first.
    pub fn remove_all_children(&mut self, parent: NodeId, handler: &mut dyn TouchHandler) {
        let doomed: Vec<NodeId> = self.children(parent).iter().rev().copied().collect();
        for child in doomed {
            if self.parent(child) == Some(parent) {
                self.remove_child_internal(parent, child, handler);
            }
        }
    }

    /// Move the child of `parent` at `from` so that it ends up at `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds or `parent` is stale.
    pub fn move_child(&mut self, parent: NodeId, from: usize, to: usize) {
        if let Err(e) = self.try_move_child(parent, from, to) {
            panic!("move_child: {e}");
        }
    }

    /// Move the child of `parent` at `from` so that it ends up at `to`.
    pub fn try_move_child(
        &mut self,
        parent: NodeId,
        from: usize,
        to: usize,
    ) -> Result<(), ChildError> {
        let count = self.live_children(parent)?.len();
        let bad = if from >= count {
            Some(from)
        } else if to >= count {
            Some(to)
        } else {
            None
        };
        if let Some(index) = bad {
            return Err(ChildError::IndexOutOfBounds { index, count });
        }
        if let Some(n) = self.node_mut(parent) {
            let child = n.children.remove(from);
            n.children.insert(to, child);
        }
        Ok(())
    }

    /// Move `child` to the top of `parent`'s paint order.
    pub fn bring_child_to_front(&mut self, parent: NodeId, child: NodeId) {
        if let Some(index) = self.index_of_child(parent, child) {
            let last = self.child_count(parent) - 1;
            if index != last {
                self.move_child(parent, index, last);
            }
        }
    }

    /// Unlink `child` from `parent` without cancelling or tearing it down.
    ///
    /// Any ownership `parent` holds for `child` goes stale and is dropped silently on the
    /// next event unless the child is re-attached first.
    pub fn detach_view_from_parent(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.unlink(parent, child);
        true
    }

    /// Re-link a child previously unlinked with
    /// [`detach_view_from_parent`](Self::detach_view_from_parent).
    ///
    /// Unlike [`add_child`](Self::add_child), attachment state is left untouched.
    ///
    /// # Panics
    ///
    /// Panics on the same errors as [`add_child`](Self::add_child).
    pub fn attach_view_to_parent(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Err(e) = self.link(parent, child, index) {
            panic!("attach_view_to_parent: {e}");
        }
    }

    // --- lifecycle --------------------------------------------------------

    /// Mark the subtree of `id` so the next event each node receives becomes a `Cancel`.
    pub fn start_temporary_detach(&mut self, id: NodeId) {
        self.set_private_subtree(id, PrivateFlags::CANCEL_NEXT_UP_EVENT, true);
    }

    /// Clear the marks set by [`start_temporary_detach`](Self::start_temporary_detach).
    pub fn finish_temporary_detach(&mut self, id: NodeId) {
        self.set_private_subtree(id, PrivateFlags::CANCEL_NEXT_UP_EVENT, false);
    }

    /// Attach the subtree of `root` to a window, notifying newly attached nodes.
    pub fn attach(&mut self, root: NodeId, handler: &mut dyn TouchHandler) {
        let Some(node) = self.node_mut(root) else {
            return;
        };
        if !node.private.contains(PrivateFlags::ATTACHED) {
            node.private.insert(PrivateFlags::ATTACHED);
            handler.on_attached(self, root);
        }
        let children: SmallVec<[NodeId; 8]> = self.children(root).iter().copied().collect();
        for child in children {
            self.attach(child, handler);
        }
    }

    /// Tear down the subtree of `root`: cancel every live gesture inside it and notify
    /// attached nodes that they were detached.
    pub fn detach(&mut self, root: NodeId, handler: &mut dyn TouchHandler) {
        self.dispatch_detached(root, handler);
    }

    /// Remove `id` and its subtree from the tree, freeing their slots.
    ///
    /// The subtree is unlinked and torn down first, as for [`remove_child`](Self::remove_child).
    pub fn remove(&mut self, id: NodeId, handler: &mut dyn TouchHandler) {
        if !self.is_alive(id) {
            return;
        }
        match self.parent(id) {
            Some(parent) => self.remove_child_internal(parent, id, handler),
            None => self.dispatch_detached(id, handler),
        }
        // Unlink again in case a handler re-parented it during teardown.
        if let Some(parent) = self.parent(id) {
            self.unlink(parent, id);
        }
        self.free_subtree(id);
    }

    // --- internals --------------------------------------------------------

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .filter(|n| n.generation == id.1)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(id.idx())
            .and_then(|n| n.as_mut())
            .filter(|n| n.generation == id.1)
    }

    pub(crate) fn group(&self, id: NodeId) -> Option<&GroupState> {
        self.node(id).and_then(|n| n.group.as_ref())
    }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> Option<&mut GroupState> {
        self.node_mut(id).and_then(|n| n.group.as_mut())
    }

    pub(crate) fn has_private(&self, id: NodeId, flag: PrivateFlags) -> bool {
        self.node(id).is_some_and(|n| n.private.contains(flag))
    }

    /// Clear `flag` on `id`; returns whether it was set.
    pub(crate) fn take_private(&mut self, id: NodeId, flag: PrivateFlags) -> bool {
        match self.node_mut(id) {
            Some(n) if n.private.contains(flag) => {
                n.private.remove(flag);
                true
            }
            _ => false,
        }
    }

    fn live_children(&self, parent: NodeId) -> Result<&[NodeId], ChildError> {
        self.node(parent)
            .map(|n| n.children.as_slice())
            .ok_or(ChildError::StaleNode(parent))
    }

    fn link(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> Result<(), ChildError> {
        if !self.is_alive(child) {
            return Err(ChildError::StaleNode(child));
        }
        let count = match self.group(parent) {
            Some(_) => self.child_count(parent),
            None if self.is_alive(parent) => return Err(ChildError::NotAGroup(parent)),
            None => return Err(ChildError::StaleNode(parent)),
        };
        if let Some(existing) = self.parent(child) {
            return Err(ChildError::AlreadyHasParent {
                child,
                parent: existing,
            });
        }
        let mut ancestor = Some(parent);
        while let Some(a) = ancestor {
            if a == child {
                return Err(ChildError::WouldCycle { parent, child });
            }
            ancestor = self.parent(a);
        }
        let index = index.unwrap_or(count);
        if index > count {
            return Err(ChildError::IndexOutOfBounds { index, count });
        }
        if let Some(p) = self.node_mut(parent) {
            p.children.insert(index, child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    fn remove_child_internal(
        &mut self,
        parent: NodeId,
        child: NodeId,
        handler: &mut dyn TouchHandler,
    ) {
        self.cancel_touch_target(parent, child, handler);
        if self.parent(child) == Some(parent) {
            self.unlink(parent, child);
        }
        tracing::trace!(?parent, ?child, "child removed");
        self.dispatch_detached(child, handler);
    }

    fn set_private_subtree(&mut self, id: NodeId, flag: PrivateFlags, on: bool) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.private.set(flag, on);
        let children: SmallVec<[NodeId; 8]> = node.children.iter().copied().collect();
        for child in children {
            self.set_private_subtree(child, flag, on);
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.idx()).and_then(Option::take) else {
            return;
        };
        if node.generation != id.1 {
            // Not ours; put it back.
            self.nodes[id.idx()] = Some(node);
            return;
        }
        self.free_list.push(id.idx());
        for child in node.children {
            self.free_subtree(child);
        }
    }
}
