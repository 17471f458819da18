//! # Scene Property Tests
//!
//! Whole-tree properties checked through the public API after long
//! sequences of mutations.

use std::cell::Cell;
use std::rc::Rc;

use kestrel_shared::{Vec2, Vec3};
use kestrel_ui::{
    AnimationSpec, Easing, EventKind, FlowDirection, NodeEvent, NodeId, NodeSettings,
    ReplayPolicy, SceneError, SceneGraph,
};

/// Three levels, four children per node, orders cycling through -2..=2.
fn build_tree(scene: &mut SceneGraph) -> Vec<NodeId> {
    let mut all = Vec::new();
    let mut order = 0i32;
    let mut next_order = || {
        order = (order + 3) % 5;
        order - 2
    };

    for _ in 0..2 {
        let root = scene
            .create_child(None, &NodeSettings::empty().with_sorting_order(next_order()))
            .expect("root");
        all.push(root);
        for _ in 0..4 {
            let mid = scene
                .create_child(
                    Some(root),
                    &NodeSettings::empty().with_sorting_order(next_order()),
                )
                .expect("mid");
            all.push(mid);
            for _ in 0..4 {
                let leaf = scene
                    .create_child(
                        Some(mid),
                        &NodeSettings::sprite("leaf").with_sorting_order(next_order()),
                    )
                    .expect("leaf");
                all.push(leaf);
            }
        }
    }
    all
}

fn assert_showing_consistent(scene: &SceneGraph) {
    for id in scene.iter_dfs() {
        let node = scene.node(id).expect("live node");
        let parent_showing = node
            .parent()
            .map_or(true, |p| scene.is_showing(p).expect("parent"));
        assert_eq!(
            node.is_showing(),
            node.is_active() && parent_showing,
            "showing flag out of sync on {id}"
        );
    }
}

/// Test: showing == active && parent showing, across a long toggle sequence.
#[test]
fn test_tree_showing_consistency() {
    let mut scene = SceneGraph::new();
    let nodes = build_tree(&mut scene);
    assert_showing_consistent(&scene);

    // Deterministic walk over the nodes, flipping flags.
    let mut cursor = 7usize;
    for round in 0..200 {
        cursor = (cursor * 31 + 17) % nodes.len();
        let id = nodes[cursor];
        let active = scene.node(id).expect("node").is_active();
        scene.set_active(id, !active).expect("toggle");
        if round % 10 == 0 {
            assert_showing_consistent(&scene);
        }
    }
    assert_showing_consistent(&scene);
}

/// Test: reparenting under a hidden parent hides the whole moved subtree.
#[test]
fn test_attach_under_hidden_parent() {
    let mut scene = SceneGraph::new();
    let hidden = scene
        .create_child(None, &NodeSettings::empty().with_active(false))
        .expect("hidden");
    let moved = scene
        .create_child(
            None,
            &NodeSettings::empty().with_child(NodeSettings::sprite("a")),
        )
        .expect("moved");
    let grandchild = scene.children(moved).expect("children")[0];
    assert!(scene.is_showing(grandchild).expect("showing"));

    scene.attach(hidden, moved).expect("attach");
    assert!(!scene.is_showing(moved).expect("showing"));
    assert!(!scene.is_showing(grandchild).expect("showing"));
    assert_showing_consistent(&scene);

    scene.set_active(hidden, true).expect("show");
    assert!(scene.is_showing(grandchild).expect("showing"));
}

/// Test: draw order is a total order over showing nodes that respects
/// both sibling order and ancestor bands.
#[test]
fn test_sorting_totality() {
    let mut scene = SceneGraph::new();
    let nodes = build_tree(&mut scene);
    scene.set_sorting_order(nodes[1], 40).expect("reorder");

    let order = scene.draw_order();
    assert_eq!(order.len(), nodes.len());

    let position = |id: NodeId| order.iter().position(|n| *n == id).expect("drawn");
    for window in order.windows(2) {
        let a = scene.effective_sorting_order(window[0]).expect("a");
        let b = scene.effective_sorting_order(window[1]).expect("b");
        assert!(a <= b, "draw order not sorted");
    }

    for id in scene.iter_dfs() {
        let node = scene.node(id).expect("node");
        // Effective order is the sum down the ancestor chain.
        let expected = node.parent().map_or(0, |p| {
            scene.effective_sorting_order(p).expect("parent")
        }) + i64::from(node.sorting_order());
        assert_eq!(node.effective_sorting_order(), expected);

        let siblings = node.children();
        for pair in siblings.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            let lo = scene.node(first).expect("first").sorting_order();
            let hi = scene.node(second).expect("second").sorting_order();
            if lo < hi {
                assert!(position(first) < position(second));
            }
        }
    }
}

/// Test: destroying a node tears down its whole subtree, announcing the
/// parent before its children.
#[test]
fn test_destroy_removes_whole_subtree() {
    let mut scene = SceneGraph::new();
    let nodes = build_tree(&mut scene);
    let root = nodes[0];
    let subtree = scene.descendants(root).expect("descendants");

    let order = Rc::new(std::cell::RefCell::new(Vec::new()));
    for id in std::iter::once(root).chain(subtree.iter().copied()) {
        let order = Rc::clone(&order);
        scene
            .subscribe(id, EventKind::BeforeDestroy, move |node, _, _| {
                order.borrow_mut().push(node);
            })
            .expect("subscribe");
    }

    scene.destroy(root).expect("destroy");
    let order = order.borrow();
    assert_eq!(order.len(), subtree.len() + 1);
    assert_eq!(order.first(), Some(&root));
    for id in subtree {
        assert!(!scene.contains(id));
        assert_eq!(scene.node(id).map(|n| n.id()), None);
    }
    assert!(matches!(
        scene.set_position(root, Vec3::ZERO),
        Err(SceneError::NodeDestroyed(_))
    ));
}

/// Test: a play-once animation stepped far past its end lands exactly on
/// the target and completes exactly once.
#[test]
fn test_once_animation_boundary() {
    let mut scene = SceneGraph::new();
    let node = scene
        .create_child(None, &NodeSettings::sprite("dot"))
        .expect("node");
    let completions = Rc::new(Cell::new(0u32));
    let seen = Rc::clone(&completions);
    scene
        .subscribe(node, EventKind::AnimationCompleted, move |_, _, _| {
            seen.set(seen.get() + 1);
        })
        .expect("subscribe");

    let target = Vec3::new(8.0, 4.0, 0.0);
    scene
        .add_animation(
            node,
            AnimationSpec::move_to(target, 0.5).with_easing(Easing::BackOut),
        )
        .expect("animate");

    scene.tick(10.0).expect("tick");
    assert_eq!(scene.node(node).expect("node").position(), target);
    assert_eq!(completions.get(), 1);
    assert!(!scene.is_animating(node).expect("animating"));

    scene.tick(10.0).expect("tick");
    assert_eq!(completions.get(), 1);
}

/// Test: a ping-pong-once animation is time symmetric about its turn.
#[test]
fn test_ping_pong_symmetry() {
    let mut scene = SceneGraph::new();
    let node = scene
        .create_child(None, &NodeSettings::sprite("dot"))
        .expect("node");
    scene
        .add_animation(
            node,
            AnimationSpec::move_to(Vec3::new(100.0, -40.0, 0.0), 1.0)
                .with_easing(Easing::QuadIn)
                .with_replay(ReplayPolicy::PingPongOnce),
        )
        .expect("animate");

    let steps = 16;
    let dt = 0.125;
    let mut samples = vec![Vec3::ZERO];
    for _ in 0..steps {
        scene.tick(dt).expect("tick");
        samples.push(scene.node(node).expect("node").position());
    }

    for k in 0..=steps {
        let a = samples[k];
        let b = samples[steps - k];
        assert!(
            (a - b).length() < 1e-4,
            "asymmetric at step {k}: {a:?} vs {b:?}"
        );
    }
    assert_eq!(samples[steps / 2], Vec3::new(100.0, -40.0, 0.0));
    assert!(!scene.is_animating(node).expect("animating"));
}

/// Test: a ping-pong-forever animation mirrors itself in every cycle, also
/// when a step carries across a turn.
#[test]
fn test_ping_pong_forever_symmetry() {
    let spec = AnimationSpec::move_to(Vec3::new(100.0, 0.0, 0.0), 1.0)
        .with_easing(Easing::QuadIn)
        .with_replay(ReplayPolicy::PingPongForever);

    // Samples in eighths of a second: `coarse` steps 3/8 (crossing turns
    // mid-step), `fine` steps 1/8.
    let sample = |step_eighths: usize, steps: usize| -> Vec<f32> {
        let mut scene = SceneGraph::new();
        let node = scene
            .create_child(None, &NodeSettings::sprite("dot"))
            .expect("node");
        scene.add_animation(node, spec).expect("animate");
        let mut xs = vec![0.0];
        for _ in 0..steps {
            scene.tick(step_eighths as f32 * 0.125).expect("tick");
            xs.push(scene.node(node).expect("node").position().x);
        }
        assert!(scene.is_animating(node).expect("animating"));
        xs
    };
    let coarse = sample(3, 16);
    let fine = sample(1, 48);

    // A full cycle (there and back) is 16 eighths.
    for (k, x) in coarse.iter().enumerate().take(16) {
        let t = 3 * k;
        let mirrored = 16 * (t / 16 + 1) - t;
        let y = fine[mirrored];
        assert!(
            (x - y).abs() < 1e-3,
            "t={t}/8 gave {x}, mirror {mirrored}/8 gave {y}"
        );
    }
    for cycle in 1..=3 {
        assert!(fine[16 * cycle].abs() < 1e-3);
        assert!((fine[16 * cycle - 8] - 100.0).abs() < 1e-3);
    }
}

/// Test: two animations on the same property; the later one wins.
#[test]
fn test_last_animation_wins() {
    let mut scene = SceneGraph::new();
    let node = scene
        .create_child(None, &NodeSettings::sprite("dot"))
        .expect("node");
    scene
        .add_animation(node, AnimationSpec::rotate_to(90.0, 1.0))
        .expect("first");
    scene
        .add_animation(node, AnimationSpec::rotate_to(-90.0, 1.0))
        .expect("second");

    scene.tick(0.5).expect("tick");
    assert_eq!(scene.node(node).expect("node").rotation(), -45.0);
    assert_eq!(scene.animations(node).expect("list").len(), 2);
}

/// Test: main-axis size after N attachments is the sum of extents plus
/// (N-1) gaps, and nothing already placed moves.
#[test]
fn test_flow_layout_extent() {
    let mut scene = SceneGraph::new();
    let row = scene
        .create_child(
            None,
            &NodeSettings::container(FlowDirection::LeftToRight, 5.0),
        )
        .expect("row");

    let widths = [10.0, 20.0, 30.0, 4.0];
    let mut placed: Vec<(NodeId, Vec3)> = Vec::new();
    for (i, width) in widths.iter().enumerate() {
        let child = scene
            .create_child(
                Some(row),
                &NodeSettings::sprite("cell").with_size(Vec2::new(*width, 8.0 + i as f32)),
            )
            .expect("child");
        for (id, position) in &placed {
            assert_eq!(scene.node(*id).expect("placed").position(), *position);
        }
        placed.push((child, scene.node(child).expect("child").position()));
    }

    let size = scene.node(row).expect("row").size();
    let expected = widths.iter().sum::<f32>() + 5.0 * (widths.len() - 1) as f32;
    assert_eq!(size.x, expected);
    assert_eq!(size.y, 11.0);

    // Leading edges, relative to the container origin.
    let mut edge = 0.0;
    for ((id, _), width) in placed.iter().zip(widths) {
        let node = scene.node(*id).expect("child");
        assert_eq!(node.position().x - width * 0.5, edge);
        assert_eq!(node.position().y, 0.0);
        edge += width + 5.0;
    }
}

/// Test: a column container reports its growth through `SizeChanged`.
#[test]
fn test_column_size_events() {
    let mut scene = SceneGraph::new();
    let column = scene
        .create_child(
            None,
            &NodeSettings::container(FlowDirection::TopToBottom, 2.0),
        )
        .expect("column");
    let sizes = Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = Rc::clone(&sizes);
    scene
        .subscribe(column, EventKind::SizeChanged, move |_, event, _| {
            if let NodeEvent::SizeChanged { size } = event {
                sink.borrow_mut().push(size.y);
            }
        })
        .expect("subscribe");

    for _ in 0..3 {
        scene
            .create_child(
                Some(column),
                &NodeSettings::sprite("row").with_size(Vec2::new(40.0, 10.0)),
            )
            .expect("row");
    }
    assert_eq!(*sizes.borrow(), vec![10.0, 22.0, 34.0]);
}
