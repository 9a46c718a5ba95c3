// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-target routing with interception.
//!
//! A scroll container holds two rows. A press on the lower row is delivered to it, a
//! short drag stays with the row, and a longer vertical drag is intercepted by the
//! container, which cancels the row and takes over the gesture.
//!
//! Run:
//! - `cargo run -p understory_touch_demos --example touch_single`

use std::collections::HashMap;

use kurbo::{Point, Vec2};
use understory_touch::{ActionKind, LocalView, MotionEvent, NodeId, TouchHandler, ViewTree};

const SLOP: f64 = 8.0;

struct ScrollDemo {
    scroller: NodeId,
    names: HashMap<NodeId, &'static str>,
    down_y: f64,
}

impl ScrollDemo {
    fn name(&self, node: NodeId) -> &'static str {
        self.names.get(&node).copied().unwrap_or("?")
    }
}

impl TouchHandler for ScrollDemo {
    fn on_touch_event(&mut self, tree: &mut ViewTree, node: NodeId, event: &MotionEvent) -> bool {
        let p = event.location();
        println!(
            "  {:<8} {:?} at ({:.1}, {:.1})",
            self.name(node),
            event.action_masked(),
            p.x,
            p.y
        );
        if node == self.scroller && event.action_masked() == ActionKind::Move {
            let scroll = tree.scroll(node).unwrap_or_default();
            tree.set_scroll(node, Vec2::new(scroll.x, (self.down_y - p.y).max(0.0)));
        }
        true
    }

    fn on_intercept_touch_event(
        &mut self,
        _tree: &mut ViewTree,
        container: NodeId,
        event: &MotionEvent,
    ) -> bool {
        match event.action_masked() {
            ActionKind::Down => {
                self.down_y = event.location().y;
                false
            }
            ActionKind::Move => {
                let dy = (event.location().y - self.down_y).abs();
                let steal = dy > SLOP;
                if steal {
                    println!("  {:<8} intercepts after {dy:.1} units", self.name(container));
                }
                steal
            }
            _ => false,
        }
    }
}

fn main() {
    let mut tree = ViewTree::new();
    let scroller = tree.insert_group(None, LocalView::with_bounds(0, 0, 200, 400));
    let row1 = tree.insert_view(Some(scroller), LocalView::with_bounds(0, 0, 200, 100));
    let row2 = tree.insert_view(Some(scroller), LocalView::with_bounds(0, 100, 200, 200));

    let mut demo = ScrollDemo {
        scroller,
        names: HashMap::from([(scroller, "scroller"), (row1, "row1"), (row2, "row2")]),
        down_y: 0.0,
    };
    tree.attach(scroller, &mut demo);

    let script = [
        (ActionKind::Down, Point::new(50.0, 150.0)),
        (ActionKind::Move, Point::new(52.0, 147.0)),
        (ActionKind::Move, Point::new(53.0, 120.0)),
        (ActionKind::Move, Point::new(53.0, 90.0)),
        (ActionKind::Up, Point::new(53.0, 90.0)),
    ];

    println!("== Drag from row2 upwards ==");
    for (t, (kind, at)) in (0_u64..).zip(script) {
        let mut ev = MotionEvent::single(kind, 0, t * 16, at);
        let consumed = tree.dispatch_touch_event(scroller, &mut ev, &mut demo);
        let owner = tree
            .touch_target(scroller)
            .map_or("-", |n| demo.name(n));
        println!("{kind:?} consumed={consumed} owner={owner}");
    }
    println!("scroll offset: {:?}", tree.scroll(scroller));
}
