//! End-to-end editing: tracker events through a session into a command
//! queue, then applied back onto the scene.

use approx::assert_relative_eq;
use zone_editor::core::DEFAULT_EMBEDDING_DEPTH;
use zone_editor::foundation::logging;
use zone_editor::foundation::time::{Clock, SystemClock};
use zone_editor::prelude::*;

const ZONE: EntityId = EntityId(1);

fn floor_scene() -> Scene {
    logging::try_init();
    let mut scene = Scene::new();
    scene
        .add_entity(Entity::new(ZONE, EntityKind::Zone(ZoneKind::Floor)).with_size([10.0, 10.0, 0.0]))
        .unwrap();
    scene
}

fn session() -> EditorSession {
    let mut camera = Camera::perspective(Point3::new(0.0, 0.0, 10.0), 90.0, 1.0, 0.1, 100.0);
    camera.up = Vec3::y();
    let mut session = EditorSession::new(EditorConfig::default()).with_camera(camera);
    session.set_zone(Some(ZONE));
    session
}

fn event(state: TrackerState, x: Real, y: Real) -> TrackerEvent {
    TrackerEvent::new(state, Vec2::new(x, y), Vec2::zeros())
}

#[test]
fn test_drag_then_release_commits_move() {
    let mut scene = floor_scene();
    let cube = scene
        .add_entity(Entity::new(EntityId(2), EntityKind::Model).with_parent(ZONE).with_position([0.0, 0.0, 0.5]))
        .unwrap();
    let mut session = session();
    let mut queue = CommandQueue::new();
    let tracker = TrackerId(0);

    let steps = [
        (event(TrackerState::Press, 0.0, 0.0), 0),
        (event(TrackerState::Drag, 0.1, 0.0), 1),
        (event(TrackerState::Release, 0.1, 0.0), 1),
    ];
    for (event, expected) in steps {
        let submitted = session.respond(&mut scene, GestureKind::TransientMove, tracker, &event, &[cube], None, &mut queue);
        assert_eq!(submitted, expected);
    }
    assert!(session.action().is_none());
    assert!(queue.commands()[0].transient);
    assert!(!queue.commands()[1].transient);

    assert_eq!(queue.apply_to(&mut scene), 2);
    let entity = scene.entity(cube).unwrap();
    assert_relative_eq!(entity.position[0], 0.9, epsilon = 1e-9);
    assert_relative_eq!(entity.position[2], 0.5, epsilon = 1e-9);
    assert_relative_eq!(entity.starting_position[0], 0.9, epsilon = 1e-9);
}

#[test]
fn test_second_tracker_cannot_hijack_gesture() {
    let mut scene = floor_scene();
    let cube = scene
        .add_entity(Entity::new(EntityId(2), EntityKind::Model).with_parent(ZONE).with_position([0.0, 0.0, 0.5]))
        .unwrap();
    let mut session = session();
    let mut queue = CommandQueue::new();

    let press = event(TrackerState::Press, 0.0, 0.0);
    session.respond(&mut scene, GestureKind::Move, TrackerId(0), &press, &[cube], None, &mut queue);
    let drag = event(TrackerState::Drag, 0.2, 0.0);
    assert_eq!(session.respond(&mut scene, GestureKind::Move, TrackerId(1), &drag, &[cube], None, &mut queue), 0);
    assert_eq!(session.respond(&mut scene, GestureKind::Move, TrackerId(0), &drag, &[cube], None, &mut queue), 1);
    assert!(session.action().is_some());
}

#[test]
fn test_clicks_stack_added_boxes() {
    let mut scene = floor_scene();
    let mut session = session();
    let mut queue = CommandQueue::new();
    let tool = Tool::model([1.0, 1.0, 1.0]);
    let click = event(TrackerState::Click, 0.0, 0.0);

    for _ in 0..2 {
        let submitted = session.respond(&mut scene, GestureKind::Add, TrackerId(0), &click, &[], Some(&tool), &mut queue);
        assert_eq!(submitted, 1);
        queue.apply_to(&mut scene);
    }

    let base = scene.entity(EntityId(2)).unwrap();
    assert_relative_eq!(base.position[2], 0.5, epsilon = 1e-9);
    let top = scene.entity(EntityId(3)).unwrap();
    assert_eq!(top.parent(), Some(ZONE));
    assert_relative_eq!(top.position[2], 1.5 - DEFAULT_EMBEDDING_DEPTH, epsilon = 1e-9);
    assert_eq!(scene.selection(), &[EntityId(3)]);
}

#[test]
fn test_navigation_refuses_to_enter_box() {
    let mut scene = floor_scene();
    scene
        .add_entity(Entity::new(EntityId(2), EntityKind::Model).with_parent(ZONE).with_position([0.0, 0.0, 0.5]))
        .unwrap();
    let session = session();
    let mut controller = NavigationController::new(session.config().navigation.clone());
    controller.set_mode(NavigationMode::Zoom);

    let mut camera = session.camera().clone();
    let before = camera.clone();
    assert!(!controller.navigate(&scene, session.collision(), &mut camera, &Vec2::new(0.0, 0.99)));
    assert_eq!(camera, before);
    assert!(controller.navigate(&scene, session.collision(), &mut camera, &Vec2::new(0.0, 0.5)));
    assert_relative_eq!(camera.distance(), 5.0, epsilon = 1e-9);
}

#[test]
fn test_repeated_clicks_cycle_selection() {
    let mut scene = floor_scene();
    for (id, z) in [(2, 0.5), (3, 1.5)] {
        scene
            .add_entity(Entity::new(EntityId(id), EntityKind::Model).with_parent(ZONE).with_position([0.0, 0.0, z]))
            .unwrap();
    }
    let mut session = session();
    let pointer = PointerState::new(640, 640).at(320.0, 320.0);
    let now = SystemClock.now();

    let picked: Vec<_> = (0..3)
        .map(|_| session.pick_and_cycle(&scene, &pointer, now).and_then(|hit| hit.entity()))
        .collect();
    assert_eq!(picked, vec![Some(EntityId(3)), Some(EntityId(2)), Some(EntityId(3))]);
}
