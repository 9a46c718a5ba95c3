// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_touch --heading-base-level=0

//! Understory Touch: deterministic touch routing for retained view trees.
//!
//! ## Overview
//!
//! A [`ViewTree`] holds leaf views and containers, each with integer bounds in its
//! container's space, an optional local transform, and visibility flags. Feeding a
//! [`MotionEvent`] to [`ViewTree::dispatch_touch_event`] routes it down the tree:
//!
//! - A `Down` hit-tests children from the top of the paint order down. The first child
//!   that consumes the event owns the gesture, and later events go to it without another
//!   hit test.
//! - Each delivery is remapped into the receiver's local space: container scroll, child
//!   offset, and the inverse of the child's transform.
//! - A container may intercept a gesture its children own. Each owner then gets one
//!   `Cancel`. Descendants may suspend interception for the rest of a gesture with
//!   [`ViewTree::request_disallow_intercept_touch_event`].
//! - Removing or tearing down an owner mid-gesture delivers one `Cancel` to it first.
//!
//! Containers with splitting enabled
//! ([`ViewTree::set_motion_event_splitting_enabled`]) assign each contact its own owner, so
//! two fingers can drive two children at once. Each owner sees only its own contacts, with
//! actions rewritten to match.
//!
//! Node behavior lives in a [`TouchHandler`]. Plain closures work for simple cases.
//!
//! ## Non-goals
//!
//! Layout, drawing, focus, and accessibility are outside this crate. Bounds and transforms
//! are set by whatever computes layout.
//!
//! ## Example
//!
//! ```
//! use kurbo::Point;
//! use understory_touch::{ActionKind, LocalView, MotionEvent, NodeId, ViewTree};
//!
//! let mut tree = ViewTree::new();
//! let root = tree.insert_group(None, LocalView::with_bounds(0, 0, 200, 200));
//! let button = tree.insert_view(Some(root), LocalView::with_bounds(100, 0, 200, 100));
//!
//! let mut seen = Vec::new();
//! let mut handler = |_: &mut ViewTree, node: NodeId, ev: &MotionEvent| {
//!     seen.push((node, ev.action_masked(), ev.location()));
//!     node == button
//! };
//!
//! let mut down = MotionEvent::single(ActionKind::Down, 0, 0, Point::new(120.0, 30.0));
//! assert!(tree.dispatch_touch_event(root, &mut down, &mut handler));
//! assert_eq!(tree.touch_target(root), Some(button));
//!
//! // The owner keeps the gesture even outside its bounds.
//! let mut mv = MotionEvent::single(ActionKind::Move, 0, 16, Point::new(40.0, 30.0));
//! assert!(tree.dispatch_touch_event(root, &mut mv, &mut handler));
//!
//! assert_eq!(
//!     seen,
//!     [
//!         (button, ActionKind::Down, Point::new(20.0, 30.0)),
//!         (button, ActionKind::Move, Point::new(-60.0, 30.0)),
//!     ]
//! );
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod dispatch;
pub mod error;
pub mod remap;
mod single;
pub mod split;
pub mod tree;
pub mod types;

#[cfg(test)]
mod test_support;

pub use dispatch::TouchHandler;
pub use error::ChildError;
pub use remap::ChildFrame;
pub use split::{SplitTargets, TargetInfo};
pub use tree::ViewTree;
pub use types::{Bounds, GroupFlags, LocalView, NodeId, ViewFlags, ViewTreeConfig};

pub use understory_motion_event::{
    Action, ActionKind, EventMeta, EventPool, MotionEvent, PointerId, PointerSample, PooledEvent,
};
