// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for unit tests.

use alloc::vec::Vec;

use kurbo::Point;
use understory_motion_event::{Action, ActionKind, MotionEvent};

use crate::dispatch::TouchHandler;
use crate::tree::ViewTree;
use crate::types::{LocalView, NodeId};

/// One call to `on_touch_event`, as seen by the handler.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Delivered {
    pub(crate) node: NodeId,
    pub(crate) action: Action,
    pub(crate) down_time: u64,
    pub(crate) pointers: Vec<(u32, Point)>,
}

impl Delivered {
    pub(crate) fn ids(&self) -> Vec<u32> {
        self.pointers.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

/// Records every callback; consumes events for the nodes in `consumers` and intercepts
/// for the `(container, kind)` pairs in `intercept`.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pub(crate) log: Vec<Delivered>,
    pub(crate) consumers: Vec<NodeId>,
    pub(crate) intercept: Vec<(NodeId, ActionKind)>,
    pub(crate) intercept_calls: Vec<(NodeId, ActionKind)>,
    pub(crate) attached: Vec<NodeId>,
    pub(crate) detached: Vec<NodeId>,
}

impl Recorder {
    pub(crate) fn consuming(nodes: &[NodeId]) -> Self {
        Self {
            consumers: nodes.to_vec(),
            ..Self::default()
        }
    }

    pub(crate) fn for_node(&self, node: NodeId) -> Vec<&Delivered> {
        self.log.iter().filter(|d| d.node == node).collect()
    }

    pub(crate) fn kinds_for(&self, node: NodeId) -> Vec<ActionKind> {
        self.for_node(node).into_iter().map(Delivered::kind).collect()
    }
}

impl TouchHandler for Recorder {
    fn on_touch_event(&mut self, _tree: &mut ViewTree, node: NodeId, event: &MotionEvent) -> bool {
        self.log.push(Delivered {
            node,
            action: event.action(),
            down_time: event.down_time(),
            pointers: event
                .pointers()
                .iter()
                .map(|p| (p.id.0, p.position))
                .collect(),
        });
        self.consumers.contains(&node)
    }

    fn on_intercept_touch_event(
        &mut self,
        _tree: &mut ViewTree,
        container: NodeId,
        event: &MotionEvent,
    ) -> bool {
        let key = (container, event.action_masked());
        self.intercept_calls.push(key);
        self.intercept.contains(&key)
    }

    fn on_attached(&mut self, _tree: &ViewTree, node: NodeId) {
        self.attached.push(node);
    }

    fn on_detached(&mut self, _tree: &ViewTree, node: NodeId) {
        self.detached.push(node);
    }
}

/// A 100x100 root container with child `A` on the left half and `B` on the right half.
pub(crate) fn two_children() -> (ViewTree, NodeId, NodeId, NodeId) {
    let mut tree = ViewTree::new();
    let root = tree.insert_group(None, LocalView::with_bounds(0, 0, 100, 100));
    let a = tree.insert_view(Some(root), LocalView::with_bounds(0, 0, 50, 100));
    let b = tree.insert_view(Some(root), LocalView::with_bounds(50, 0, 100, 100));
    (tree, root, a, b)
}
