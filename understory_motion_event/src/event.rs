// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Motion event record: actions, pointer samples, and metadata.
//!
//! ## Actions
//!
//! An [`Action`] is a masked [`ActionKind`] plus the index of the pointer that
//! triggered it. The index is only meaningful for
//! [`PointerDown`](ActionKind::PointerDown) and [`PointerUp`](ActionKind::PointerUp).
//! [`Action::to_bits`] packs both into the classic bit-field: the kind code in
//! the low byte and the pointer index in the next byte.
//!
//! ## Coordinates
//!
//! Pointer positions are expressed in the coordinate space of whoever is
//! currently receiving the event. Containers shift them in place with
//! [`MotionEvent::offset_location`] before handing the event to a child.

use kurbo::{Point, Vec2};
use smallvec::SmallVec;

/// Bit shift of the pointer index inside a packed action.
pub const ACTION_POINTER_INDEX_SHIFT: u32 = 8;

/// Mask selecting the action kind code of a packed action.
pub const ACTION_MASK: u32 = 0xff;

/// Mask selecting the pointer index of a packed action.
pub const ACTION_POINTER_INDEX_MASK: u32 = 0xff00;

/// Number of pointer samples stored inline before spilling to the heap.
pub const INLINE_POINTERS: usize = 4;

/// Masked action of a motion event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ActionKind {
    /// The first contact of a gesture went down.
    Down,
    /// The last contact of a gesture went up.
    Up,
    /// One or more contacts moved.
    Move,
    /// The gesture was aborted; receivers should drop any gesture state.
    Cancel,
    /// The contact happened outside the receiver's bounds.
    Outside,
    /// An additional contact joined a gesture in progress.
    PointerDown,
    /// A contact left a gesture while others remain down.
    PointerUp,
}

impl ActionKind {
    /// Numeric code stored in the low byte of a packed action.
    pub const fn code(self) -> u32 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Move => 2,
            Self::Cancel => 3,
            Self::Outside => 4,
            Self::PointerDown => 5,
            Self::PointerUp => 6,
        }
    }

    /// Inverse of [`ActionKind::code`].
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::Down,
            1 => Self::Up,
            2 => Self::Move,
            3 => Self::Cancel,
            4 => Self::Outside,
            5 => Self::PointerDown,
            6 => Self::PointerUp,
            _ => return None,
        })
    }

    /// Returns true for the kinds that terminate a gesture.
    pub const fn is_up_or_cancel(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }

    /// Returns true for the kinds that introduce a new contact.
    pub const fn is_down(self) -> bool {
        matches!(self, Self::Down | Self::PointerDown)
    }
}

/// An action kind together with the index of the pointer it refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Action {
    kind: ActionKind,
    index: u8,
}

impl Action {
    /// Plain `Down`.
    pub const DOWN: Self = Self::of(ActionKind::Down);
    /// Plain `Up`.
    pub const UP: Self = Self::of(ActionKind::Up);
    /// Plain `Move`.
    pub const MOVE: Self = Self::of(ActionKind::Move);
    /// Plain `Cancel`.
    pub const CANCEL: Self = Self::of(ActionKind::Cancel);

    /// An action with pointer index zero.
    pub const fn of(kind: ActionKind) -> Self {
        Self { kind, index: 0 }
    }

    /// An action referring to the pointer at `index`.
    ///
    /// Indices that do not fit the packed field saturate to `255`.
    pub fn new(kind: ActionKind, index: usize) -> Self {
        Self {
            kind,
            index: u8::try_from(index).unwrap_or(u8::MAX),
        }
    }

    /// A `PointerDown` for the pointer at `index`.
    pub fn pointer_down(index: usize) -> Self {
        Self::new(ActionKind::PointerDown, index)
    }

    /// A `PointerUp` for the pointer at `index`.
    pub fn pointer_up(index: usize) -> Self {
        Self::new(ActionKind::PointerUp, index)
    }

    /// The masked action kind.
    pub const fn kind(self) -> ActionKind {
        self.kind
    }

    /// The pointer index carried by this action.
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Same pointer index, different kind.
    pub const fn with_kind(self, kind: ActionKind) -> Self {
        Self {
            kind,
            index: self.index,
        }
    }

    /// Pack into the classic `kind | index << 8` bit-field.
    pub const fn to_bits(self) -> u32 {
        self.kind.code() | ((self.index as u32) << ACTION_POINTER_INDEX_SHIFT)
    }

    /// Unpack a bit-field produced by [`Action::to_bits`].
    ///
    /// Returns `None` for unknown kind codes.
    pub fn from_bits(bits: u32) -> Option<Self> {
        let kind = ActionKind::from_code(bits & ACTION_MASK)?;
        let index = (bits & ACTION_POINTER_INDEX_MASK) >> ACTION_POINTER_INDEX_SHIFT;
        Some(Self::new(kind, index as usize))
    }
}

/// Stable identifier of one contact for the duration of a gesture.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PointerId(pub u32);

/// Position of one contact within an event.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerSample {
    /// Contact identifier.
    pub id: PointerId,
    /// Position in the receiver's coordinate space.
    pub position: Point,
}

impl PointerSample {
    /// Sample for pointer `id` at `(x, y)`.
    pub const fn new(id: u32, x: f64, y: f64) -> Self {
        Self {
            id: PointerId(id),
            position: Point::new(x, y),
        }
    }
}

bitflags::bitflags! {
    /// Screen edges touched by the contact.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EdgeFlags: u8 {
        /// Top edge.
        const TOP    = 0b0001;
        /// Bottom edge.
        const BOTTOM = 0b0010;
        /// Left edge.
        const LEFT   = 0b0100;
        /// Right edge.
        const RIGHT  = 0b1000;
    }
}

bitflags::bitflags! {
    /// Per-event flags set by the producer of the event.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MotionFlags: u32 {
        /// The window receiving the event was partially or wholly obscured.
        const WINDOW_IS_OBSCURED = 0x1;
    }
}

/// Metadata copied verbatim into every event derived from this one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EventMeta {
    /// Modifier key state.
    pub meta_state: u32,
    /// Horizontal precision of the reported coordinates.
    pub x_precision: f32,
    /// Vertical precision of the reported coordinates.
    pub y_precision: f32,
    /// Producing device.
    pub device_id: i32,
    /// Screen edges touched.
    pub edge_flags: EdgeFlags,
    /// Producing input source class.
    pub source: u32,
    /// Producer flags.
    pub flags: MotionFlags,
}

impl Default for EventMeta {
    fn default() -> Self {
        Self {
            meta_state: 0,
            x_precision: 1.0,
            y_precision: 1.0,
            device_id: 0,
            edge_flags: EdgeFlags::empty(),
            source: 0,
            flags: MotionFlags::empty(),
        }
    }
}

/// One pointer event carrying every contact currently down.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionEvent {
    action: Action,
    down_time: u64,
    event_time: u64,
    pointers: SmallVec<[PointerSample; INLINE_POINTERS]>,
    meta: EventMeta,
}

impl MotionEvent {
    /// Create an event from explicit parts and default metadata.
    ///
    /// Times are in milliseconds on a monotonic clock of the caller's choosing.
    pub fn new(
        action: Action,
        down_time: u64,
        event_time: u64,
        pointers: impl IntoIterator<Item = PointerSample>,
    ) -> Self {
        Self {
            action,
            down_time,
            event_time,
            pointers: pointers.into_iter().collect(),
            meta: EventMeta::default(),
        }
    }

    /// Single-contact event for pointer `0` at `position`.
    pub fn single(kind: ActionKind, down_time: u64, event_time: u64, position: Point) -> Self {
        Self::new(
            Action::of(kind),
            down_time,
            event_time,
            [PointerSample {
                id: PointerId(0),
                position,
            }],
        )
    }

    /// Replace the metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: EventMeta) -> Self {
        self.meta = meta;
        self
    }

    pub(crate) fn empty() -> Self {
        Self::new(Action::CANCEL, 0, 0, [])
    }

    /// Overwrite every field, reusing the pointer storage.
    pub(crate) fn reset(
        &mut self,
        action: Action,
        down_time: u64,
        event_time: u64,
        meta: EventMeta,
        pointers: impl IntoIterator<Item = PointerSample>,
    ) {
        self.action = action;
        self.down_time = down_time;
        self.event_time = event_time;
        self.meta = meta;
        self.pointers.clear();
        self.pointers.extend(pointers);
    }

    /// Full action including the pointer index.
    pub fn action(&self) -> Action {
        self.action
    }

    /// Masked action kind.
    pub fn action_masked(&self) -> ActionKind {
        self.action.kind()
    }

    /// Index of the pointer the action refers to.
    pub fn action_index(&self) -> usize {
        self.action.index()
    }

    /// Id of the pointer the action refers to, if the index is in range.
    pub fn action_pointer_id(&self) -> Option<PointerId> {
        self.pointer_id(self.action.index())
    }

    /// Replace the action.
    pub fn set_action(&mut self, action: Action) {
        self.action = action;
    }

    /// Time the gesture (or, for derived events, the receiver's share of it) began.
    pub fn down_time(&self) -> u64 {
        self.down_time
    }

    /// Time this event was produced.
    pub fn event_time(&self) -> u64 {
        self.event_time
    }

    /// Producer metadata.
    pub fn meta(&self) -> &EventMeta {
        &self.meta
    }

    /// Number of contacts in this event.
    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// All contacts, in event order.
    pub fn pointers(&self) -> &[PointerSample] {
        &self.pointers
    }

    /// The contact at `index`.
    pub fn pointer(&self, index: usize) -> Option<&PointerSample> {
        self.pointers.get(index)
    }

    /// Id of the contact at `index`.
    pub fn pointer_id(&self, index: usize) -> Option<PointerId> {
        self.pointers.get(index).map(|p| p.id)
    }

    /// Position of the contact at `index`.
    pub fn position(&self, index: usize) -> Option<Point> {
        self.pointers.get(index).map(|p| p.position)
    }

    /// Index of the contact with the given id.
    pub fn find_pointer_index(&self, id: PointerId) -> Option<usize> {
        self.pointers.iter().position(|p| p.id == id)
    }

    /// Position of the first contact, or the origin for an empty event.
    pub fn location(&self) -> Point {
        self.position(0).unwrap_or(Point::ORIGIN)
    }

    /// Shift every contact by `delta`.
    pub fn offset_location(&mut self, delta: Vec2) {
        for p in &mut self.pointers {
            p.position += delta;
        }
    }

    /// Shift every contact so that the first one lands on `location`.
    pub fn set_location(&mut self, location: Point) {
        let delta = location - self.location();
        self.offset_location(delta);
    }
}
