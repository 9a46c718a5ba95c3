// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the view tree: node identifiers, flags, geometry, and configuration.

use kurbo::{Affine, Point, Size};
use understory_motion_event::DEFAULT_POOL_CAPACITY;

/// Identifier for a node in the tree.
///
/// This is a small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On [`remove`](crate::ViewTree::remove), the slot is freed; any existing `NodeId` that
///   pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `NodeId`.
///
/// Use [`ViewTree::is_alive`](crate::ViewTree::is_alive) to check whether a `NodeId` still
/// refers to a live node.
/// Stale `NodeId`s never alias a different live node because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Node flags consulted by hit testing.
    ///
    /// A child is a hit-test candidate when it is visible or has an animation running.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ViewFlags: u8 {
        /// Node is visible.
        const VISIBLE   = 0b0000_0001;
        /// Node has an animation in progress; it stays hit-testable while invisible.
        const ANIMATING = 0b0000_0010;
    }
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self::VISIBLE
    }
}

bitflags::bitflags! {
    /// Routing state flags of a container.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GroupFlags: u8 {
        /// Contacts may be routed to different children concurrently.
        const SPLIT_MOTION_EVENTS = 0b0000_0001;
        /// A descendant asked that interception be suspended for the current gesture.
        const DISALLOW_INTERCEPT  = 0b0000_0010;
    }
}

bitflags::bitflags! {
    /// Per-node bookkeeping owned by the tree.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub(crate) struct PrivateFlags: u8 {
        /// The next event delivered to this node is turned into a cancel.
        const CANCEL_NEXT_UP_EVENT = 0b0000_0001;
        /// The node is attached to a live window.
        const ATTACHED             = 0b0000_0010;
    }
}

/// Integer bounds of a node in its parent's coordinate space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Bounds {
    /// Empty bounds at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Bounds from left/top/right/bottom edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Horizontal extent.
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Vertical extent.
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(f64::from(self.left), f64::from(self.top))
    }

    /// Extent as a Kurbo size.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }
}

/// Local geometry and flags of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalView {
    /// Bounds in the parent's coordinate space.
    pub bounds: Bounds,
    /// Child-local to parent-local transform, applied relative to the bounds' top-left.
    /// [`Affine::IDENTITY`] means no transform.
    pub transform: Affine,
    /// Visibility and animation flags.
    pub flags: ViewFlags,
}

impl Default for LocalView {
    fn default() -> Self {
        Self {
            bounds: Bounds::ZERO,
            transform: Affine::IDENTITY,
            flags: ViewFlags::default(),
        }
    }
}

impl LocalView {
    /// Visible, untransformed view with the given bounds.
    pub fn with_bounds(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            bounds: Bounds::new(left, top, right, bottom),
            ..Self::default()
        }
    }
}

/// Construction-time settings of a [`ViewTree`](crate::ViewTree).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ViewTreeConfig {
    /// Maximum number of derived events kept for reuse.
    pub event_pool_capacity: usize,
    /// Whether newly created containers split multi-touch streams.
    pub split_motion_events_by_default: bool,
}

impl Default for ViewTreeConfig {
    fn default() -> Self {
        Self {
            event_pool_capacity: DEFAULT_POOL_CAPACITY,
            split_motion_events_by_default: false,
        }
    }
}
