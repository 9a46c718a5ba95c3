// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-target dispatch: one owner per gesture.
//!
//! The `Down` that starts a gesture picks the owner: children are hit-tested from the top
//! of the paint order down, using the first contact, and the first child that consumes the
//! event owns the rest of the gesture. Later events go to that owner without another hit
//! test, until `Up`, `Cancel`, interception, or the owner's removal ends the gesture.

use understory_motion_event::{Action, ActionKind, MotionEvent};

use crate::dispatch::TouchHandler;
use crate::remap::{Delivery, test_and_deliver};
use crate::tree::ViewTree;
use crate::types::{NodeId, PrivateFlags};

impl ViewTree {
    pub(crate) fn dispatch_single(
        &mut self,
        container: NodeId,
        event: &mut MotionEvent,
        handler: &mut dyn TouchHandler,
    ) -> bool {
        let action = event.action();
        let kind = action.kind();
        let origin = event.location();
        let disallow = self.disallows_intercept(container);

        if kind == ActionKind::Down {
            if let Some(stale) = self.set_single_target(container, None) {
                tracing::debug!(?container, ?stale, "down while a target is recorded; dropping it");
            }
            if disallow || !handler.on_intercept_touch_event(self, container, event) {
                event.set_action(action);
                let count = self.child_count(container);
                for i in (0..count).rev() {
                    let Some(child) = self.child_at(container, i) else {
                        continue;
                    };
                    if !self.is_hit_testable(child) {
                        continue;
                    }
                    let mut delivery = Delivery {
                        tree: self,
                        container,
                        handler: &mut *handler,
                    };
                    if test_and_deliver(&mut delivery, child, event, 0) {
                        if self.parent(child) == Some(container) {
                            self.set_single_target(container, Some(child));
                        }
                        return true;
                    }
                }
            }
        }

        let up_or_cancel = kind.is_up_or_cancel();
        if up_or_cancel {
            self.set_disallow_flag(container, false);
        }

        self.prune_stale_targets(container);
        let Some(target) = self.single_target(container) else {
            event.set_location(origin);
            return self.dispatch_to_self(container, event, handler);
        };

        if !disallow && handler.on_intercept_touch_event(self, container, event) {
            self.take_private(container, PrivateFlags::CANCEL_NEXT_UP_EVENT);
            // The hook may already have released the target.
            if self.single_target(container) == Some(target) {
                self.set_single_target(container, None);
                if let Some(frame) = self.child_frame(container, target) {
                    let mut cancel = self.pool.obtain_copy(event);
                    cancel.set_action(Action::CANCEL);
                    cancel.set_location(frame.to_local(origin));
                    self.deliver_cancel(target, &mut cancel, handler);
                }
            }
            return true;
        }

        if up_or_cancel {
            self.set_single_target(container, None);
        }

        let Some(frame) = self.child_frame(container, target) else {
            event.set_location(origin);
            return self.dispatch_to_self(container, event, handler);
        };
        event.set_location(frame.to_local(origin));

        if self.take_private(target, PrivateFlags::CANCEL_NEXT_UP_EVENT) {
            event.set_action(Action::CANCEL);
            self.set_single_target(container, None);
        }

        tracing::trace!(?container, ?target, ?kind, "single delivery");
        if self.dispatch_touch_event(target, event, handler) {
            return true;
        }
        event.set_location(origin);
        self.dispatch_to_self(container, event, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Recorder, two_children};
    use crate::types::LocalView;
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::{Affine, Point, Vec2};
    use understory_motion_event::PointerSample;

    fn ev(kind: ActionKind, t: u64, x: f64, y: f64) -> MotionEvent {
        MotionEvent::single(kind, 0, t, Point::new(x, y))
    }

    #[test]
    fn owner_keeps_gesture_outside_its_bounds() {
        let (mut tree, root, a, b) = two_children();
        let mut rec = Recorder::consuming(&[a, b]);
        let mut down = ev(ActionKind::Down, 0, 10.0, 10.0);
        assert!(tree.dispatch_touch_event(root, &mut down, &mut rec));
        assert_eq!(tree.touch_target(root), Some(a));
        let mut mv = ev(ActionKind::Move, 1, 90.0, 10.0);
        assert!(tree.dispatch_touch_event(root, &mut mv, &mut rec));
        assert!(tree.dispatch_touch_event(root, &mut ev(ActionKind::Up, 2, 90.0, 10.0), &mut rec));

        assert!(rec.for_node(b).is_empty());
        let to_a = rec.for_node(a);
        assert_eq!(
            to_a.iter().map(|d| d.action.kind()).collect::<Vec<_>>(),
            vec![ActionKind::Down, ActionKind::Move, ActionKind::Up]
        );
        assert_eq!(to_a[1].pointers, vec![(0, Point::new(90.0, 10.0))]);
        assert_eq!(tree.touch_target(root), None);
    }

    #[test]
    fn topmost_child_wins_overlap() {
        let mut tree = ViewTree::new();
        let root = tree.insert_group(None, LocalView::with_bounds(0, 0, 100, 100));
        let below = tree.insert_view(Some(root), LocalView::with_bounds(0, 0, 100, 100));
        let above = tree.insert_view(Some(root), LocalView::with_bounds(0, 0, 100, 100));
        let mut rec = Recorder::consuming(&[below, above]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 5.0, 5.0), &mut rec);
        assert_eq!(tree.touch_target(root), Some(above));
        assert!(rec.for_node(below).is_empty(), "down reaches one child only");
    }

    #[test]
    fn non_consuming_child_is_skipped_and_restored() {
        let mut tree = ViewTree::new();
        let root = tree.insert_group(None, LocalView::with_bounds(0, 0, 100, 100));
        let below = tree.insert_view(Some(root), LocalView::with_bounds(0, 0, 100, 100));
        let above = tree.insert_view(Some(root), LocalView::with_bounds(20, 20, 100, 100));
        let mut rec = Recorder::consuming(&[below]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 30.0, 30.0), &mut rec);
        assert_eq!(rec.for_node(above)[0].pointers, vec![(0, Point::new(10.0, 10.0))]);
        assert_eq!(rec.for_node(below)[0].pointers, vec![(0, Point::new(30.0, 30.0))]);
        assert_eq!(tree.touch_target(root), Some(below));
    }

    #[test]
    fn hidden_children_are_skipped_unless_animating() {
        let (mut tree, root, a, _) = two_children();
        let mut rec = Recorder::consuming(&[a, root]);
        tree.set_visible(a, false);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 10.0, 10.0), &mut rec);
        assert!(rec.for_node(a).is_empty());
        assert_eq!(rec.kinds_for(root), vec![ActionKind::Down]);

        tree.set_animating(a, true);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 5, 10.0, 10.0), &mut rec);
        assert_eq!(tree.touch_target(root), Some(a));
    }

    #[test]
    fn unclaimed_down_goes_to_container() {
        let (mut tree, root, _, _) = two_children();
        let mut rec = Recorder::consuming(&[root]);
        let mut down = ev(ActionKind::Down, 0, 10.0, 10.0);
        assert!(tree.dispatch_touch_event(root, &mut down, &mut rec));
        let own = rec.for_node(root);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].pointers, vec![(0, Point::new(10.0, 10.0))]);
        assert_eq!(down.location(), Point::new(10.0, 10.0));
    }

    #[test]
    fn rejected_move_falls_back_to_container() {
        let (mut tree, root, a, _) = two_children();
        let mut rec = Recorder::consuming(&[a, root]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 10.0, 10.0), &mut rec);
        rec.consumers.retain(|n| *n != a);
        let mut mv = ev(ActionKind::Move, 1, 30.0, 40.0);
        assert!(tree.dispatch_touch_event(root, &mut mv, &mut rec));
        assert_eq!(rec.kinds_for(root), vec![ActionKind::Move]);
        assert_eq!(rec.for_node(root)[0].pointers, vec![(0, Point::new(30.0, 40.0))]);
        assert_eq!(tree.touch_target(root), Some(a), "ownership survives a rejected event");
    }

    #[test]
    fn interception_sends_one_cancel() {
        let (mut tree, root, a, _) = two_children();
        let mut rec = Recorder::consuming(&[a, root]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 10.0, 10.0), &mut rec);
        rec.intercept.push((root, ActionKind::Move));
        let mut mv = ev(ActionKind::Move, 1, 20.0, 10.0);
        assert!(tree.dispatch_touch_event(root, &mut mv, &mut rec));
        assert!(rec.for_node(root).is_empty(), "intercepting event is consumed silently");
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Move, 2, 25.0, 10.0), &mut rec);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Up, 3, 25.0, 10.0), &mut rec);

        assert_eq!(rec.kinds_for(a), vec![ActionKind::Down, ActionKind::Cancel]);
        assert_eq!(rec.kinds_for(root), vec![ActionKind::Move, ActionKind::Up]);
        assert_eq!(tree.event_pool().stats().outstanding(), 0);
    }

    #[test]
    fn intercepted_down_skips_children() {
        let (mut tree, root, a, _) = two_children();
        let mut rec = Recorder::consuming(&[a, root]);
        rec.intercept.push((root, ActionKind::Down));
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 10.0, 10.0), &mut rec);
        assert!(rec.for_node(a).is_empty());
        assert_eq!(rec.kinds_for(root), vec![ActionKind::Down]);
    }

    #[test]
    fn scroll_and_transform_map_into_child() {
        let mut tree = ViewTree::new();
        let root = tree.insert_group(None, LocalView::with_bounds(0, 0, 200, 200));
        let child = tree.insert_view(Some(root), LocalView::with_bounds(50, 50, 150, 150));
        tree.set_scroll(root, Vec2::new(10.0, 0.0));
        tree.set_transform(child, Affine::scale(2.0));
        let mut rec = Recorder::consuming(&[child]);
        // (60, 70) + scroll (10, 0) - origin (50, 50) = (20, 20); inverse scale gives (10, 10).
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 60.0, 70.0), &mut rec);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Move, 1, 80.0, 90.0), &mut rec);
        let seen = rec.for_node(child);
        assert_eq!(seen[0].pointers, vec![(0, Point::new(10.0, 10.0))]);
        assert_eq!(seen[1].pointers, vec![(0, Point::new(20.0, 20.0))]);
    }

    #[test]
    fn nested_containers_route_through() {
        let mut tree = ViewTree::new();
        let root = tree.insert_group(None, LocalView::with_bounds(0, 0, 100, 100));
        let inner = tree.insert_group(Some(root), LocalView::with_bounds(20, 20, 80, 80));
        let leaf = tree.insert_view(Some(inner), LocalView::with_bounds(10, 10, 20, 20));
        let mut rec = Recorder::consuming(&[leaf]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 35.0, 35.0), &mut rec);
        assert_eq!(tree.touch_target(root), Some(inner));
        assert_eq!(tree.touch_target(inner), Some(leaf));
        assert_eq!(rec.for_node(leaf)[0].pointers, vec![(0, Point::new(5.0, 5.0))]);
    }

    #[test]
    fn cancel_next_up_on_target_turns_event_into_cancel() {
        let (mut tree, root, a, _) = two_children();
        let mut rec = Recorder::consuming(&[a]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 10.0, 10.0), &mut rec);
        tree.start_temporary_detach(a);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Move, 1, 10.0, 10.0), &mut rec);
        assert_eq!(rec.kinds_for(a), vec![ActionKind::Down, ActionKind::Cancel]);
        assert_eq!(tree.touch_target(root), None);
    }

    #[test]
    fn cancel_next_up_on_container_converts_own_event() {
        let (mut tree, root, _, _) = two_children();
        let mut rec = Recorder::consuming(&[root]);
        tree.start_temporary_detach(root);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 99.0, 99.0), &mut rec);
        // The down search clears the marks on children it hits, not on the container.
        assert_eq!(rec.kinds_for(root), vec![ActionKind::Cancel]);
    }

    #[test]
    fn stale_target_is_dropped_silently() {
        let (mut tree, root, a, _) = two_children();
        let mut rec = Recorder::consuming(&[a, root]);
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Down, 0, 10.0, 10.0), &mut rec);
        assert!(tree.detach_view_from_parent(root, a));
        tree.dispatch_touch_event(root, &mut ev(ActionKind::Move, 1, 10.0, 10.0), &mut rec);
        assert_eq!(rec.kinds_for(a), vec![ActionKind::Down]);
        assert_eq!(rec.kinds_for(root), vec![ActionKind::Move]);
        assert_eq!(tree.touch_target(root), None);
    }

    #[test]
    fn extra_pointers_are_translated_with_the_first() {
        let (mut tree, root, _, b) = two_children();
        let mut rec = Recorder::consuming(&[b]);
        let mut down = MotionEvent::new(Action::DOWN, 0, 0, [PointerSample::new(0, 60.0, 10.0)]);
        tree.dispatch_touch_event(root, &mut down, &mut rec);
        let mut two = MotionEvent::new(
            Action::pointer_down(1),
            0,
            1,
            [PointerSample::new(0, 60.0, 10.0), PointerSample::new(1, 10.0, 10.0)],
        );
        tree.dispatch_touch_event(root, &mut two, &mut rec);
        let last = rec.log.last().unwrap();
        assert_eq!(last.node, b);
        assert_eq!(last.pointers, vec![(0, Point::new(10.0, 10.0)), (1, Point::new(-40.0, 10.0))]);
    }
}
