// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded recycling of derived events.
//!
//! Routing code derives short-lived events (filtered per child, synthesized
//! cancels) for every delivery. [`EventPool`] keeps a small free list of such
//! events so steady-state dispatch does not allocate.
//!
//! Events are handed out as [`PooledEvent`] guards. Dropping the guard returns
//! the event to the pool, so early returns and unwinding out of a handler
//! release it just like the normal path. [`PoolStats`] counts both sides.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::ops::{Deref, DerefMut};

use crate::event::{Action, EventMeta, MotionEvent, PointerSample};

/// Default number of events retained by a pool.
pub const DEFAULT_POOL_CAPACITY: usize = 10;

/// Acquisition counters of an [`EventPool`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Guards handed out.
    pub obtained: u64,
    /// Guards dropped.
    pub released: u64,
    /// Events created because the free list was empty.
    pub allocated: u64,
}

impl PoolStats {
    /// Guards currently alive.
    pub fn outstanding(&self) -> u64 {
        self.obtained - self.released
    }
}

#[derive(Debug)]
struct PoolInner {
    free: Vec<MotionEvent>,
    capacity: usize,
    stats: PoolStats,
}

impl PoolInner {
    fn take(&mut self) -> MotionEvent {
        self.stats.obtained += 1;
        match self.free.pop() {
            Some(ev) => ev,
            None => {
                self.stats.allocated += 1;
                MotionEvent::empty()
            }
        }
    }

    fn give_back(&mut self, event: MotionEvent) {
        self.stats.released += 1;
        if self.free.len() < self.capacity {
            self.free.push(event);
        }
    }
}

/// Shared handle to a bounded free list of [`MotionEvent`]s.
///
/// Cloning the handle shares the same free list. The pool is single-threaded.
#[derive(Clone, Debug)]
pub struct EventPool {
    inner: Rc<RefCell<PoolInner>>,
}

impl Default for EventPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPool {
    /// Pool retaining up to [`DEFAULT_POOL_CAPACITY`] events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Pool retaining up to `capacity` events. Zero disables recycling.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(PoolInner {
                free: Vec::with_capacity(capacity),
                capacity,
                stats: PoolStats::default(),
            })),
        }
    }

    /// Maximum number of retained events.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// Number of events currently sitting in the free list.
    pub fn retained(&self) -> usize {
        self.inner.borrow().free.len()
    }

    /// Snapshot of the acquisition counters.
    pub fn stats(&self) -> PoolStats {
        self.inner.borrow().stats
    }

    /// Obtain an event filled with the given parts.
    pub fn obtain(
        &self,
        action: Action,
        down_time: u64,
        event_time: u64,
        meta: EventMeta,
        pointers: impl IntoIterator<Item = PointerSample>,
    ) -> PooledEvent {
        let mut event = self.inner.borrow_mut().take();
        event.reset(action, down_time, event_time, meta, pointers);
        PooledEvent {
            event,
            pool: Rc::clone(&self.inner),
        }
    }

    /// Obtain a copy of `source`.
    pub fn obtain_copy(&self, source: &MotionEvent) -> PooledEvent {
        self.obtain(
            source.action(),
            source.down_time(),
            source.event_time(),
            *source.meta(),
            source.pointers().iter().copied(),
        )
    }
}

/// An event on loan from an [`EventPool`]; returned when dropped.
pub struct PooledEvent {
    event: MotionEvent,
    pool: Rc<RefCell<PoolInner>>,
}

impl core::fmt::Debug for PooledEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PooledEvent").field(&self.event).finish()
    }
}

impl Deref for PooledEvent {
    type Target = MotionEvent;

    fn deref(&self) -> &MotionEvent {
        &self.event
    }
}

impl DerefMut for PooledEvent {
    fn deref_mut(&mut self) -> &mut MotionEvent {
        &mut self.event
    }
}

impl Drop for PooledEvent {
    fn drop(&mut self) {
        let event = core::mem::replace(&mut self.event, MotionEvent::empty());
        // The pool is never borrowed across user code, so this only fails if a
        // guard is dropped from inside a pool method.
        if let Ok(mut inner) = self.pool.try_borrow_mut() {
            inner.give_back(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ActionKind, PointerId};
    use kurbo::Point;

    #[test]
    fn guard_returns_event_on_drop() {
        let pool = EventPool::with_capacity(2);
        {
            let ev = pool.obtain(
                Action::DOWN,
                1,
                2,
                EventMeta::default(),
                [PointerSample::new(3, 1.0, 1.0)],
            );
            assert_eq!(ev.pointer_id(0), Some(PointerId(3)));
            assert_eq!(pool.stats().outstanding(), 1);
        }
        let stats = pool.stats();
        assert_eq!(stats.obtained, 1);
        assert_eq!(stats.released, 1);
        assert_eq!(pool.retained(), 1);
    }

    #[test]
    fn free_list_is_bounded() {
        let pool = EventPool::with_capacity(1);
        let a = pool.obtain_copy(&MotionEvent::single(ActionKind::Move, 0, 0, Point::ORIGIN));
        let b = pool.obtain_copy(&a);
        let c = pool.obtain_copy(&b);
        drop((a, b, c));
        assert_eq!(pool.retained(), 1);
        assert_eq!(pool.stats().allocated, 3);
        assert_eq!(pool.stats().outstanding(), 0);
    }

    #[test]
    fn recycled_event_is_refilled() {
        let pool = EventPool::new();
        drop(pool.obtain(
            Action::pointer_down(1),
            0,
            0,
            EventMeta::default(),
            [PointerSample::new(0, 0.0, 0.0), PointerSample::new(1, 5.0, 5.0)],
        ));
        let ev = pool.obtain(
            Action::UP,
            7,
            8,
            EventMeta::default(),
            [PointerSample::new(2, 9.0, 9.0)],
        );
        assert_eq!(pool.stats().allocated, 1, "second obtain must reuse");
        assert_eq!(ev.pointer_count(), 1);
        assert_eq!(ev.action(), Action::UP);
        assert_eq!(ev.down_time(), 7);
    }

    #[test]
    fn copy_preserves_meta_verbatim() {
        let pool = EventPool::new();
        let meta = EventMeta {
            meta_state: 0x41,
            x_precision: 0.5,
            y_precision: 0.25,
            device_id: 3,
            source: 0x1002,
            ..EventMeta::default()
        };
        let src =
            MotionEvent::single(ActionKind::Down, 10, 11, Point::new(1.0, 2.0)).with_meta(meta);
        let copy = pool.obtain_copy(&src);
        assert_eq!(*copy, src);
    }

    #[test]
    fn zero_capacity_never_retains() {
        let pool = EventPool::with_capacity(0);
        drop(pool.obtain_copy(&MotionEvent::single(ActionKind::Up, 0, 0, Point::ORIGIN)));
        assert_eq!(pool.retained(), 0);
        assert_eq!(pool.stats().released, 1);
    }

    #[test]
    fn clones_share_the_free_list() {
        let pool = EventPool::new();
        let other = pool.clone();
        drop(other.obtain_copy(&MotionEvent::single(ActionKind::Up, 0, 0, Point::ORIGIN)));
        assert_eq!(pool.retained(), 1);
        assert_eq!(pool.stats().obtained, 1);
    }
}
