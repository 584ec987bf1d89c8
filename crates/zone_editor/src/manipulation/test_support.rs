//! Fixtures for handler tests: a 10 x 10 floor zone seen from straight
//! above, so one NDC unit at depth `d` spans `d` world units.

use super::{EditorSession, GestureKind, HandlerContext, Tool};
use crate::commands::Command;
use crate::core::config::EditorConfig;
use crate::foundation::math::{Point3, Real, Vec2, Vec3};
use crate::input::{TrackerEvent, TrackerId, TrackerState};
use crate::render::Camera;
use crate::scene::{segment_placement, Entity, EntityFlags, EntityId, EntityKind, Scene, ZoneKind};

pub const ZONE: EntityId = EntityId(1);

pub fn top_down_session() -> EditorSession {
    let mut camera = Camera::perspective(Point3::new(0.0, 0.0, 10.0), 90.0, 1.0, 0.1, 100.0);
    camera.up = Vec3::y();
    let mut session = EditorSession::new(EditorConfig::default()).with_camera(camera);
    session.set_zone(Some(ZONE));
    session
}

pub fn floor_scene() -> Scene {
    let mut scene = Scene::new();
    scene
        .add_entity(Entity::new(ZONE, EntityKind::Zone(ZoneKind::Floor)).with_size([10.0, 10.0, 0.0]))
        .unwrap();
    scene
}

pub fn add_box(scene: &mut Scene, id: u32, position: [f64; 3]) -> EntityId {
    scene
        .add_entity(Entity::new(EntityId(id), EntityKind::Model).with_parent(ZONE).with_position(position))
        .unwrap()
}

/// Segmentable 10 holding vertices 11, 12, 13 along +X and segments
/// 14 (11-12) and 15 (12-13)
pub fn add_wall_run(scene: &mut Scene) {
    scene
        .add_entity(
            Entity::new(EntityId(10), EntityKind::Segmentable)
                .with_parent(ZONE)
                .with_size([0.0; 3])
                .with_flags(EntityFlags::empty()),
        )
        .unwrap();
    for (id, x) in [(11, 0.0), (12, 2.0), (13, 4.0)] {
        scene
            .add_entity(
                Entity::new(EntityId(id), EntityKind::Vertex)
                    .with_parent(EntityId(10))
                    .with_position([x, 0.0, 0.0])
                    .with_size([0.1; 3])
                    .with_flags(EntityFlags::PICKABLE),
            )
            .unwrap();
    }
    for (id, start, end) in [(14, 11, 12), (15, 12, 13)] {
        let a = scene.entity(EntityId(start)).unwrap().position_vec();
        let b = scene.entity(EntityId(end)).unwrap().position_vec();
        let placement = segment_placement(&a, &b, 0.2, 2.0).unwrap();
        scene
            .add_entity(
                Entity::new(
                    EntityId(id),
                    EntityKind::Segment {
                        start: EntityId(start),
                        end: EntityId(end),
                        thickness: 0.2,
                    },
                )
                .with_parent(EntityId(10))
                .with_position(placement.position)
                .with_rotation(placement.rotation)
                .with_size(placement.size),
            )
            .unwrap();
    }
}

pub fn event(state: TrackerState, x: Real, y: Real) -> TrackerEvent {
    TrackerEvent::new(state, Vec2::new(x, y), Vec2::zeros())
}

pub fn begin(session: &mut EditorSession, scene: &mut Scene, entities: &[EntityId], x: Real, y: Real) {
    session
        .begin_gesture(scene, TrackerId(0), &event(TrackerState::Press, x, y), entities)
        .unwrap();
}

pub fn respond(
    session: &EditorSession,
    scene: &Scene,
    gesture: GestureKind,
    event: &TrackerEvent,
    entities: &[EntityId],
    tool: Option<&Tool>,
) -> Vec<Command> {
    let ctx = HandlerContext {
        session,
        scene,
        action: session.action().unwrap(),
    };
    gesture.respond(&ctx, event, entities, tool)
}
