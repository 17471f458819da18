//! # Input Routing Integration Test
//!
//! Hit priority, gesture ownership and predicate chains, driven through a
//! real scene.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use kestrel_shared::{Vec2, Vec3};
use kestrel_ui::{
    Dispatch, GesturePhase, Handlers, InputRouter, NodeId, NodeSettings, PointerId, RectArea,
    RouterConfig, SceneGraph,
};

fn button(scene: &mut SceneGraph, x: f32, order: i32) -> NodeId {
    scene
        .create_child(
            None,
            &NodeSettings::clickable()
                .with_position(Vec3::new(x, 0.0, 0.0))
                .with_size(Vec2::new(20.0, 20.0))
                .with_sorting_order(order),
        )
        .expect("button")
}

/// Records every phase delivered to a node.
fn recorder(log: &Rc<RefCell<Vec<(NodeId, GesturePhase)>>>) -> Handlers {
    let down = Rc::clone(log);
    let drag = Rc::clone(log);
    let up = Rc::clone(log);
    Handlers::new()
        .on_down(move |_, e| {
            down.borrow_mut().push((e.node, e.phase));
            Ok(())
        })
        .on_drag(move |_, e| {
            drag.borrow_mut().push((e.node, e.phase));
            Ok(())
        })
        .on_up(move |_, e| {
            up.borrow_mut().push((e.node, e.phase));
            Ok(())
        })
}

/// Test: of two overlapping nodes ordered 3 and 7, only the 7 gets the down.
#[test]
fn test_hit_priority_by_sorting_order() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let log = Rc::new(RefCell::new(Vec::new()));

    let high = button(&mut scene, 5.0, 7);
    let low = button(&mut scene, 0.0, 3);
    router
        .register(&mut scene, high, RectArea::new(), recorder(&log))
        .expect("register high");
    router
        .register(&mut scene, low, RectArea::new(), recorder(&log))
        .expect("register low");

    let p = Vec2::new(2.0, 0.0);
    assert_eq!(router.hit_test(&scene, p), Some(high));
    let outcome = router
        .pointer_down(&mut scene, PointerId::PRIMARY, p)
        .expect("down");
    assert_eq!(outcome, Dispatch::Delivered(high));
    assert_eq!(*log.borrow(), vec![(high, GesturePhase::Down)]);

    // Hiding the winner exposes the other one.
    router.cancel(PointerId::PRIMARY);
    scene.set_active(high, false).expect("hide");
    assert_eq!(router.hit_test(&scene, p), Some(low));
}

/// Test: equal orders fall back to the most recent registration.
#[test]
fn test_hit_tie_prefers_latest_registration() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let first = button(&mut scene, 0.0, 0);
    let second = button(&mut scene, 0.0, 0);
    router
        .register(&mut scene, second, RectArea::new(), Handlers::new())
        .expect("register");
    router
        .register(&mut scene, first, RectArea::new(), Handlers::new())
        .expect("register");
    assert_eq!(router.hit_test(&scene, Vec2::ZERO), Some(first));
}

/// Test: a drag that leaves A and crosses a higher-priority B stays with A.
#[test]
fn test_gesture_ownership_survives_leaving_bounds() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let log = Rc::new(RefCell::new(Vec::new()));

    let a = button(&mut scene, 0.0, 3);
    let b = button(&mut scene, 100.0, 7);
    router
        .register(&mut scene, a, RectArea::new(), recorder(&log))
        .expect("register a");
    router
        .register(&mut scene, b, RectArea::new(), recorder(&log))
        .expect("register b");

    let pointer = PointerId::PRIMARY;
    router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    assert_eq!(router.owner(pointer), Some(a));

    for x in [30.0, 60.0, 100.0] {
        let outcome = router
            .pointer_move(&mut scene, pointer, Vec2::new(x, 0.0))
            .expect("move");
        assert_eq!(outcome, Dispatch::Delivered(a));
    }
    assert!(router.is_dragging(pointer));

    let outcome = router
        .pointer_up(&mut scene, pointer, Vec2::new(100.0, 0.0))
        .expect("up");
    assert_eq!(outcome, Dispatch::Delivered(a));
    assert_eq!(router.owner(pointer), None);
    assert!(log.borrow().iter().all(|(node, _)| *node == a));
    assert_eq!(log.borrow().len(), 5);
}

/// Test: jitter under the threshold is held, not dispatched.
#[test]
fn test_small_moves_are_held() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::new(RouterConfig {
        drag_threshold: 4.0,
    });
    let log = Rc::new(RefCell::new(Vec::new()));
    let node = button(&mut scene, 0.0, 0);
    router
        .register(&mut scene, node, RectArea::new(), recorder(&log))
        .expect("register");

    let pointer = PointerId(3);
    router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    let outcome = router
        .pointer_move(&mut scene, pointer, Vec2::new(1.0, 1.0))
        .expect("move");
    assert_eq!(outcome, Dispatch::Held(node));
    assert!(!router.is_dragging(pointer));
    assert_eq!(log.borrow().len(), 1);
}

/// Test: a toggle flips on a click and ignores a drag-release.
#[test]
fn test_toggle_click_versus_drag() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let toggle = scene
        .create_child(
            None,
            &NodeSettings::toggle(false).with_size(Vec2::new(20.0, 20.0)),
        )
        .expect("toggle");
    router
        .register(&mut scene, toggle, RectArea::new(), Handlers::toggle())
        .expect("register");
    let pointer = PointerId::PRIMARY;

    router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    router
        .pointer_up(&mut scene, pointer, Vec2::new(1.0, 0.0))
        .expect("up");
    assert!(scene.node(toggle).expect("toggle").is_toggled());

    router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    router
        .pointer_move(&mut scene, pointer, Vec2::new(0.0, 30.0))
        .expect("drag");
    router
        .pointer_up(&mut scene, pointer, Vec2::new(0.0, 30.0))
        .expect("up");
    assert!(scene.node(toggle).expect("toggle").is_toggled());
}

/// Test: a veto short-circuits the chain and takes no ownership.
#[test]
fn test_predicate_veto_short_circuits() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let node = button(&mut scene, 0.0, 0);
    let later_calls = Rc::new(Cell::new(0u32));
    let downs = Rc::new(Cell::new(0u32));

    let calls = Rc::clone(&later_calls);
    let delivered = Rc::clone(&downs);
    let handlers = Handlers::new()
        .may_down(|_, _| false)
        .may_down(move |_, _| {
            calls.set(calls.get() + 1);
            true
        })
        .on_down(move |_, _| {
            delivered.set(delivered.get() + 1);
            Ok(())
        });
    router
        .register(&mut scene, node, RectArea::new(), handlers)
        .expect("register");

    let pointer = PointerId::PRIMARY;
    let outcome = router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    assert_eq!(outcome, Dispatch::Vetoed(node));
    assert_eq!(later_calls.get(), 0);
    assert_eq!(downs.get(), 0);
    assert_eq!(router.owner(pointer), None);
    assert_eq!(
        router
            .pointer_move(&mut scene, pointer, Vec2::new(50.0, 0.0))
            .expect("move"),
        Dispatch::NoTarget
    );
}

/// Test: pointers are tracked independently.
#[test]
fn test_multi_pointer_owners() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let left = button(&mut scene, 0.0, 0);
    let right = button(&mut scene, 50.0, 0);
    for node in [left, right] {
        router
            .register(&mut scene, node, RectArea::new(), Handlers::new())
            .expect("register");
    }

    router
        .pointer_down(&mut scene, PointerId(1), Vec2::ZERO)
        .expect("down");
    router
        .pointer_down(&mut scene, PointerId(2), Vec2::new(50.0, 0.0))
        .expect("down");
    assert_eq!(router.owner(PointerId(1)), Some(left));
    assert_eq!(router.owner(PointerId(2)), Some(right));

    router
        .pointer_up(&mut scene, PointerId(1), Vec2::ZERO)
        .expect("up");
    assert_eq!(router.owner(PointerId(1)), None);
    assert_eq!(router.owner(PointerId(2)), Some(right));
}

/// Test: destroying an owner mid-gesture ends the gesture quietly, and a
/// destroyed node stops being hit.
#[test]
fn test_destroyed_owner_drops_gesture() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let under = button(&mut scene, 0.0, 0);
    let over = button(&mut scene, 0.0, 5);
    for node in [under, over] {
        router
            .register(&mut scene, node, RectArea::new(), Handlers::new())
            .expect("register");
    }

    let pointer = PointerId::PRIMARY;
    router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    scene.destroy(over).expect("destroy");

    assert_eq!(
        router
            .pointer_move(&mut scene, pointer, Vec2::new(40.0, 0.0))
            .expect("move"),
        Dispatch::NoTarget
    );
    assert_eq!(router.owner(pointer), None);
    assert_eq!(
        router
            .pointer_down(&mut scene, pointer, Vec2::ZERO)
            .expect("down"),
        Dispatch::Delivered(under)
    );
    assert_eq!(router.len(), 1);
}

/// Test: a down callback may mutate the scene it is routed through.
#[test]
fn test_callback_mutates_scene() {
    let mut scene = SceneGraph::new();
    let mut router = InputRouter::default();
    let node = button(&mut scene, 0.0, 0);
    router
        .register(
            &mut scene,
            node,
            RectArea::new(),
            Handlers::new().on_drag(|scene, e| {
                let position = scene.node(e.node).map(|n| n.position()).unwrap_or_default();
                scene.set_position(
                    e.node,
                    position + Vec3::new(e.delta.x, e.delta.y, 0.0),
                )
            }),
        )
        .expect("register");

    let pointer = PointerId::PRIMARY;
    router
        .pointer_down(&mut scene, pointer, Vec2::ZERO)
        .expect("down");
    router
        .pointer_move(&mut scene, pointer, Vec2::new(12.0, 0.0))
        .expect("drag");
    router
        .pointer_move(&mut scene, pointer, Vec2::new(12.0, 6.0))
        .expect("drag");
    assert_eq!(
        scene.node(node).expect("node").position(),
        Vec3::new(12.0, 6.0, 0.0)
    );
}
