// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Splitting one multi-touch stream across two children.
//!
//! Two sliders sit side by side in a splitting container. One finger lands on each, and
//! every slider receives only its own contact, with actions rewritten accordingly.
//! Removing a slider mid-gesture cancels it.
//!
//! Run:
//! - `cargo run -p understory_touch_demos --example touch_split`

use understory_touch::{
    Action, LocalView, MotionEvent, NodeId, PointerSample, TouchHandler, ViewTree,
};

struct Sliders {
    left: NodeId,
    right: NodeId,
}

impl TouchHandler for Sliders {
    fn on_touch_event(&mut self, _tree: &mut ViewTree, node: NodeId, event: &MotionEvent) -> bool {
        let name = if node == self.left {
            "left"
        } else if node == self.right {
            "right"
        } else {
            "panel"
        };
        let ids: Vec<u32> = event.pointers().iter().map(|p| p.id.0).collect();
        println!(
            "  {name:<6} {:?}(index {}) pointers={ids:?} at ({:.1}, {:.1})",
            event.action_masked(),
            event.action_index(),
            event.location().x,
            event.location().y,
        );
        true
    }
}

fn main() {
    let mut tree = ViewTree::new();
    let panel = tree.insert_group(None, LocalView::with_bounds(0, 0, 400, 200));
    let left = tree.insert_view(Some(panel), LocalView::with_bounds(0, 0, 200, 200));
    let right = tree.insert_view(Some(panel), LocalView::with_bounds(200, 0, 400, 200));

    let mut sliders = Sliders { left, right };
    tree.set_motion_event_splitting_enabled(panel, true, &mut sliders);

    let a = |y: f64| PointerSample::new(0, 50.0, y);
    let b = |y: f64| PointerSample::new(1, 300.0, y);
    let stream = [
        ("first finger on the left", MotionEvent::new(Action::DOWN, 0, 0, [a(100.0)])),
        (
            "second finger on the right",
            MotionEvent::new(Action::pointer_down(1), 0, 10, [a(100.0), b(120.0)]),
        ),
        ("both drag", MotionEvent::new(Action::MOVE, 0, 20, [a(80.0), b(150.0)])),
    ];
    for (label, mut ev) in stream {
        println!("== {label} ==");
        tree.dispatch_touch_event(panel, &mut ev, &mut sliders);
    }
    println!("owners: {:?}", tree.split_owners(panel));

    println!("== right slider removed ==");
    tree.remove_child(panel, right, &mut sliders);

    println!("== left finger lifts ==");
    let mut up = MotionEvent::new(Action::UP, 0, 30, [a(80.0)]);
    tree.dispatch_touch_event(panel, &mut up, &mut sliders);
    println!("pool: {:?}", tree.event_pool().stats());
}
