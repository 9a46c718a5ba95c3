// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Motion Event: multi-pointer event records for touch routing.
//!
//! ## Overview
//!
//! A [`MotionEvent`] carries every contact currently down, the [`Action`] that produced it,
//! the gesture and event timestamps, and producer [`EventMeta`].
//! Routing layers never mutate the metadata; they shift positions into a receiver's space,
//! rewrite the action, or derive a filtered copy for a single receiver.
//!
//! Derived copies come from an [`EventPool`], which hands out [`PooledEvent`] guards.
//! A guard returns its event to the pool when dropped, on every exit path.
//!
//! ## Example
//!
//! ```
//! use kurbo::Point;
//! use understory_motion_event::{Action, ActionKind, EventPool, MotionEvent, PointerSample};
//!
//! let ev = MotionEvent::new(
//!     Action::pointer_down(1),
//!     100,
//!     120,
//!     [PointerSample::new(0, 10.0, 10.0), PointerSample::new(1, 90.0, 10.0)],
//! );
//! assert_eq!(ev.action_masked(), ActionKind::PointerDown);
//! assert_eq!(ev.action().to_bits(), 0x0105);
//!
//! let pool = EventPool::new();
//! {
//!     let mut copy = pool.obtain_copy(&ev);
//!     copy.set_location(Point::new(0.0, 0.0));
//!     assert_eq!(copy.position(1), Some(Point::new(80.0, 0.0)));
//! }
//! assert_eq!(pool.stats().outstanding(), 0);
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod event;
mod pool;

pub use event::{
    ACTION_MASK, ACTION_POINTER_INDEX_MASK, ACTION_POINTER_INDEX_SHIFT, Action, ActionKind,
    EdgeFlags, EventMeta, INLINE_POINTERS, MotionEvent, MotionFlags, PointerId, PointerSample,
};
pub use pool::{DEFAULT_POOL_CAPACITY, EventPool, PoolStats, PooledEvent};
