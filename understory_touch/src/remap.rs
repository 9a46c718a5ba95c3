// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinate remapping between a container and one child.
//!
//! Both dispatchers go through this module: [`ChildFrame`] holds the math, and
//! [`test_and_deliver`] performs the hit-test-then-deliver step against any
//! [`DeliverToChild`] implementation.

use kurbo::{Affine, Point, Size, Vec2};
use understory_motion_event::MotionEvent;

use crate::dispatch::TouchHandler;
use crate::tree::ViewTree;
use crate::types::{Bounds, NodeId, PrivateFlags};

/// Mapping from a container's coordinate space into one child's local space.
///
/// A point in container space is shifted by the container's scroll offset, moved so the
/// child's top-left is the origin, and then mapped through the inverse of the child's
/// transform when that transform is not the identity.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChildFrame {
    scroll: Vec2,
    origin: Vec2,
    size: Size,
    transform: Affine,
}

impl ChildFrame {
    /// Frame for a child with `bounds` and `transform` inside a container scrolled by `scroll`.
    pub fn new(scroll: Vec2, bounds: Bounds, transform: Affine) -> Self {
        Self {
            scroll,
            origin: bounds.origin().to_vec2(),
            size: bounds.size(),
            transform,
        }
    }

    fn has_identity_transform(&self) -> bool {
        self.transform == Affine::IDENTITY
    }

    /// Returns `false` if the transform cannot be inverted.
    pub fn is_invertible(&self) -> bool {
        let det = self.transform.determinant();
        det != 0.0 && det.is_finite()
    }

    /// Map a container-space point into child-local space.
    ///
    /// A singular transform maps by translation only.
    pub fn to_local(&self, point: Point) -> Point {
        let shifted = point + self.scroll - self.origin;
        if self.has_identity_transform() || !self.is_invertible() {
            shifted
        } else {
            self.transform.inverse() * shifted
        }
    }

    /// Map a child-local point back into container space.
    pub fn to_parent(&self, local: Point) -> Point {
        let shifted = if self.has_identity_transform() || !self.is_invertible() {
            local
        } else {
            self.transform * local
        };
        shifted + self.origin - self.scroll
    }

    /// Returns `true` if a child-local point lies in `[0, width) x [0, height)`.
    pub fn contains_local(&self, local: Point) -> bool {
        local.x >= 0.0 && local.y >= 0.0 && local.x < self.size.width && local.y < self.size.height
    }

    /// Child-local position of `point` if it hits the child.
    ///
    /// A child with a singular transform is never hit.
    pub fn hit_test(&self, point: Point) -> Option<Point> {
        if !self.is_invertible() {
            return None;
        }
        let local = self.to_local(point);
        self.contains_local(local).then_some(local)
    }
}

/// Capability to deliver an event to one child of a container.
pub(crate) trait DeliverToChild {
    /// Current frame of `child`, or `None` if it is no longer a child.
    fn frame_of(&self, child: NodeId) -> Option<ChildFrame>;

    /// Called once a hit test succeeds, before delivery.
    fn prepare(&mut self, child: NodeId);

    /// Deliver `event`, already in child-local space; returns whether it was consumed.
    fn deliver(&mut self, child: NodeId, event: &mut MotionEvent) -> bool;
}

/// Delivers to the children of one container by recursive dispatch.
pub(crate) struct Delivery<'a> {
    pub(crate) tree: &'a mut ViewTree,
    pub(crate) container: NodeId,
    pub(crate) handler: &'a mut dyn TouchHandler,
}

impl DeliverToChild for Delivery<'_> {
    fn frame_of(&self, child: NodeId) -> Option<ChildFrame> {
        self.tree.child_frame(self.container, child)
    }

    fn prepare(&mut self, child: NodeId) {
        self.tree.take_private(child, PrivateFlags::CANCEL_NEXT_UP_EVENT);
    }

    fn deliver(&mut self, child: NodeId, event: &mut MotionEvent) -> bool {
        self.tree.dispatch_touch_event(child, event, self.handler)
    }
}

/// Hit-test the pointer at `pointer_index` against `child` and deliver on success.
///
/// The event is shifted in place into child space for the delivery and shifted back if
/// the child does not consume it. Returns `false` without delivering when the pointer
/// index is out of range or the hit test fails.
pub(crate) fn test_and_deliver<D: DeliverToChild + ?Sized>(
    d: &mut D,
    child: NodeId,
    event: &mut MotionEvent,
    pointer_index: usize,
) -> bool {
    let Some(frame) = d.frame_of(child) else {
        return false;
    };
    let Some(point) = event.position(pointer_index) else {
        return false;
    };
    let Some(local) = frame.hit_test(point) else {
        return false;
    };
    d.prepare(child);
    let delta = local - point;
    event.offset_location(delta);
    if d.deliver(child, event) {
        tracing::trace!(?child, "delivered after hit test");
        true
    } else {
        event.offset_location(-delta);
        false
    }
}
