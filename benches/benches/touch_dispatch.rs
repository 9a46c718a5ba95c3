// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Affine, Point};
use understory_touch::{
    Action, ActionKind, LocalView, MotionEvent, NodeId, PointerSample, ViewTree,
};

/// A root holding `n` x `n` leaf cells of `cell` units, optionally rotated slightly.
fn grid_tree(n: i32, cell: i32, rotated: bool) -> (ViewTree, NodeId) {
    let mut tree = ViewTree::new();
    let root = tree.insert_group(None, LocalView::with_bounds(0, 0, n * cell, n * cell));
    for y in 0..n {
        for x in 0..n {
            let mut local =
                LocalView::with_bounds(x * cell, y * cell, (x + 1) * cell, (y + 1) * cell);
            if rotated {
                local.transform = Affine::rotate(0.05);
            }
            let _ = tree.insert_view(Some(root), local);
        }
    }
    (tree, root)
}

/// Nested containers, each inset by one unit, ending in a single leaf.
fn deep_tree(depth: i32) -> (ViewTree, NodeId) {
    let mut tree = ViewTree::new();
    let size = depth * 2 + 10;
    let root = tree.insert_group(None, LocalView::with_bounds(0, 0, size, size));
    let mut parent = root;
    for d in 1..depth {
        parent = tree.insert_group(
            Some(parent),
            LocalView::with_bounds(1, 1, size - 2 * d, size - 2 * d),
        );
    }
    let _ = tree.insert_view(Some(parent), LocalView::with_bounds(0, 0, 8, 8));
    (tree, root)
}

fn consume_all(_: &mut ViewTree, _: NodeId, _: &MotionEvent) -> bool {
    true
}

fn gesture(tree: &mut ViewTree, root: NodeId, at: Point, moves: u64) {
    let mut handler = consume_all;
    let mut down = MotionEvent::single(ActionKind::Down, 0, 0, at);
    black_box(tree.dispatch_touch_event(root, &mut down, &mut handler));
    for t in 1..=moves {
        let p = Point::new(at.x + t as f64, at.y);
        let mut mv = MotionEvent::single(ActionKind::Move, 0, t, p);
        black_box(tree.dispatch_touch_event(root, &mut mv, &mut handler));
    }
    let mut up = MotionEvent::single(ActionKind::Up, 0, moves + 1, at);
    black_box(tree.dispatch_touch_event(root, &mut up, &mut handler));
}

fn bench_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("single");
    for &n in &[8i32, 32, 64] {
        let (mut tree, root) = grid_tree(n, 10, false);
        group.throughput(Throughput::Elements(22));
        group.bench_function(format!("gesture_grid_n{n}"), |b| {
            b.iter(|| gesture(&mut tree, root, Point::new(5.0, 5.0), 20));
        });
    }
    let (mut tree, root) = grid_tree(32, 10, true);
    group.bench_function("gesture_grid_rotated_n32", |b| {
        b.iter(|| gesture(&mut tree, root, Point::new(5.0, 5.0), 20));
    });
    for &depth in &[4i32, 16, 64] {
        let (mut tree, root) = deep_tree(depth);
        group.bench_function(format!("gesture_depth{depth}"), |b| {
            b.iter(|| gesture(&mut tree, root, Point::new(5.0, 5.0), 20));
        });
    }
    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");
    for &fingers in &[2usize, 5, 10] {
        group.throughput(Throughput::Elements(fingers as u64));
        group.bench_function(format!("fan_out_{fingers}_contacts"), |b| {
            b.iter_batched(
                || {
                    let (mut tree, root) = grid_tree(16, 10, false);
                    tree.set_motion_event_splitting_enabled(root, true, &mut consume_all);
                    (tree, root)
                },
                |(mut tree, root)| {
                    let mut handler = consume_all;
                    let samples: Vec<PointerSample> = (0..fingers)
                        .map(|i| PointerSample::new(i as u32, 5.0 + 10.0 * i as f64, 5.0))
                        .collect();
                    for i in 0..fingers {
                        let action = if i == 0 {
                            Action::DOWN
                        } else {
                            Action::pointer_down(i)
                        };
                        let mut ev =
                            MotionEvent::new(action, 0, i as u64, samples[..=i].iter().copied());
                        black_box(tree.dispatch_touch_event(root, &mut ev, &mut handler));
                    }
                    let mut mv = MotionEvent::new(Action::MOVE, 0, 100, samples.iter().copied());
                    black_box(tree.dispatch_touch_event(root, &mut mv, &mut handler));
                    black_box(tree.event_pool().stats());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single, bench_split);
criterion_main!(benches);
