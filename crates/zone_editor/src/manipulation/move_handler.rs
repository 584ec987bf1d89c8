//! Move and transient move
//!
//! The pointer's NDC travel since the press is scaled by the half-frustum at
//! the grabbed depth and laid onto the zone's right/up axes. Vertices and
//! segmentables slide in the plane; segments carry both endpoints; anything
//! else has its elevation re-resolved against the colliders under it.

use super::placement::{resolve_elevation, support_pick, Footprint};
use super::{emits_edit, EntitySnapshot, HandlerContext};
use crate::commands::{Command, CommandKind};
use crate::error::{EditError, EditResult};
use crate::foundation::math::Vec3;
use crate::input::TrackerEvent;
use crate::picking::PickResult;
use crate::scene::{segment_placement, Entity, EntityId, EntityKind};

pub(super) fn respond(ctx: &HandlerContext<'_>, event: &TrackerEvent, entities: &[EntityId], transient: bool) -> Vec<Command> {
    if !emits_edit(ctx, event) {
        return Vec::new();
    }
    let delta = ctx.action.zone_delta(event);
    let support = support_pick(ctx, event);

    let mut commands = Vec::with_capacity(entities.len());
    for &id in entities {
        match move_entity(ctx, id, &delta, support.as_ref(), transient) {
            Ok(Some(command)) => commands.push(command),
            Ok(None) => {}
            Err(error) => log::debug!("Move of {} skipped: {}", id, error),
        }
    }
    commands
}

fn move_entity(
    ctx: &HandlerContext<'_>,
    id: EntityId,
    delta: &Vec3,
    support: Option<&PickResult>,
    transient: bool,
) -> EditResult<Option<Command>> {
    let snapshot = ctx.action.snapshot(id).ok_or(EditError::MissingWrapper(id))?;
    if ctx.action.topology_changed(ctx.scene, id) {
        return Err(EditError::TopologyChanged(id));
    }
    match snapshot.kind {
        EntityKind::Vertex | EntityKind::Segmentable => move_in_plane(ctx, snapshot, delta, transient),
        EntityKind::Segment { start, end, .. } => move_segment(ctx, start, end, delta, transient),
        EntityKind::Model => move_body(ctx, snapshot, delta, support, transient).map(Some),
        EntityKind::Zone(_) => Ok(None),
    }
}

/// Slide without changing elevation; segments on a moved vertex follow
fn move_in_plane(
    ctx: &HandlerContext<'_>,
    snapshot: &EntitySnapshot,
    delta: &Vec3,
    transient: bool,
) -> EditResult<Option<Command>> {
    let orientation = ctx.action.orientation();
    let start = snapshot.zone_position();
    let aligned = ctx.session.grid().align_position_to_grid(&(start + delta));
    let target = orientation.with_normal_component(&aligned, orientation.normal_component(&start));
    let position = snapshot.to_parent_point(&target)?;

    let mut parts = vec![ctx.command(move_kind(snapshot.id, &position), transient)];
    parts.extend(realign_segments(ctx, &[(snapshot.id, position)], None, transient));
    Ok(ctx.batch(parts))
}

fn move_segment(
    ctx: &HandlerContext<'_>,
    start: EntityId,
    end: EntityId,
    delta: &Vec3,
    transient: bool,
) -> EditResult<Option<Command>> {
    let first = ctx.action.snapshot(start).ok_or(EditError::MissingWrapper(start))?;
    let second = ctx.action.snapshot(end).ok_or(EditError::MissingWrapper(end))?;
    let orientation = ctx.action.orientation();
    let shift = orientation.project(
        &ctx.session
            .grid()
            .align_vector_to_grid_spacing(&orientation.project(delta), &first.zone_position()),
    );

    let moved = [
        (start, first.start_position + first.to_parent_vector(&shift)),
        (end, second.start_position + second.to_parent_vector(&shift)),
    ];
    let mut parts: Vec<Command> = moved
        .iter()
        .map(|(vertex, position)| ctx.command(move_kind(*vertex, position), transient))
        .collect();
    parts.extend(realign_segments(ctx, &moved, None, transient));
    Ok(ctx.batch(parts))
}

fn move_body(
    ctx: &HandlerContext<'_>,
    snapshot: &EntitySnapshot,
    delta: &Vec3,
    support: Option<&PickResult>,
    transient: bool,
) -> EditResult<Command> {
    let candidate = ctx
        .session
        .grid()
        .align_position_to_grid(&(snapshot.zone_position() + delta));
    let elevation = resolve_elevation(
        ctx,
        Footprint::Entity(snapshot.id),
        &candidate,
        &snapshot.zone_rotation(),
        support,
    )?;
    let target = ctx.action.orientation().with_normal_component(&candidate, elevation);
    let position = snapshot.to_parent_point(&target)?;
    Ok(ctx.command(move_kind(snapshot.id, &position), transient))
}

pub(super) fn move_kind(entity: EntityId, position: &Vec3) -> CommandKind {
    CommandKind::Move {
        entity,
        position: [position.x, position.y, position.z],
    }
}

/// Vertex position at gesture start (parent frame)
pub(super) fn vertex_start(ctx: &HandlerContext<'_>, vertex: EntityId) -> Option<Vec3> {
    ctx.action
        .snapshot(vertex)
        .map(|snapshot| snapshot.start_position)
        .or_else(|| ctx.scene.entity(vertex).map(Entity::starting_position_vec))
}

/// `AlignSegment` for every segment using a vertex in `moved`.
///
/// Endpoints not in `moved` stay at their starting positions; `thickness`
/// overrides the thickness of one segment.
pub(super) fn realign_segments(
    ctx: &HandlerContext<'_>,
    moved: &[(EntityId, Vec3)],
    thickness: Option<(EntityId, f32)>,
    transient: bool,
) -> Vec<Command> {
    let store = ctx.scene.entities();
    let mut segments: Vec<EntityId> = Vec::new();
    for (vertex, _) in moved {
        for segment in store.segments_using(*vertex) {
            if !segments.contains(&segment) {
                segments.push(segment);
            }
        }
    }

    let endpoint = |vertex: EntityId| {
        moved
            .iter()
            .find(|(id, _)| *id == vertex)
            .map(|(_, position)| *position)
            .or_else(|| vertex_start(ctx, vertex))
    };

    segments
        .into_iter()
        .filter_map(|segment| {
            let entity = ctx.scene.entity(segment)?;
            let EntityKind::Segment {
                start,
                end,
                thickness: current,
            } = entity.kind
            else {
                return None;
            };
            let width = thickness.filter(|(id, _)| *id == segment).map_or(current, |(_, t)| t);
            let Some(placement) = segment_placement(&endpoint(start)?, &endpoint(end)?, width, entity.size[2]) else {
                log::debug!("Endpoints of segment {} coincide; not re-aligned", segment);
                return None;
            };
            Some(ctx.command(
                CommandKind::AlignSegment {
                    segment,
                    position: placement.position,
                    rotation: placement.rotation,
                    size: placement.size,
                },
                transient,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandKind;
    use crate::core::config::DEFAULT_EMBEDDING_DEPTH;
    use crate::input::TrackerState;
    use crate::manipulation::test_support::*;
    use crate::manipulation::GestureKind;
    use crate::scene::{Entity, EntityId, EntityKind};
    use approx::assert_relative_eq;

    fn moved_to(kind: &CommandKind) -> (EntityId, [f64; 3]) {
        match kind {
            CommandKind::Move { entity, position } => (*entity, *position),
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn test_move_slides_box_on_empty_floor() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        // Grabbed on its top face at depth 9.
        begin(&mut session, &mut scene, &[cube], 0.0, 0.0);

        let drag = event(TrackerState::Drag, 0.1, 0.0);
        let commands = respond(&session, &scene, GestureKind::TransientMove, &drag, &[cube], None);
        assert_eq!(commands.len(), 1);
        assert!(commands[0].transient);
        let (entity, position) = moved_to(&commands[0].kind);
        assert_eq!(entity, cube);
        assert_relative_eq!(position[0], 0.9, epsilon = 1e-9);
        assert_relative_eq!(position[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(position[2], 0.5, epsilon = 1e-9);

        let release = event(TrackerState::Release, 0.1, 0.0);
        let commands = respond(&session, &scene, GestureKind::TransientMove, &release, &[cube], None);
        assert!(!commands[0].transient);
    }

    #[test]
    fn test_move_stacks_onto_collider() {
        let mut scene = floor_scene();
        let base = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let cube = add_box(&mut scene, 3, [3.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 1.0 / 3.0, 0.0);
        assert_eq!(session.action().unwrap().picks()[0].entity(), Some(cube));

        let drag = event(TrackerState::Drag, 0.0, 0.0);
        let commands = respond(&session, &scene, GestureKind::Move, &drag, &[cube], None);
        let (_, position) = moved_to(&commands[0].kind);
        assert_relative_eq!(position[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(position[2], 1.5 - DEFAULT_EMBEDDING_DEPTH, epsilon = 1e-9);
        assert!(!commands[0].transient);
        assert_ne!(base, cube);
    }

    #[test]
    fn test_zero_delta_drag_emits_nothing() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 0.0, 0.0);
        let still = event(TrackerState::Drag, 0.0, 0.0);
        assert!(respond(&session, &scene, GestureKind::TransientMove, &still, &[cube], None).is_empty());
    }

    #[test]
    fn test_vertex_move_realigns_both_segments() {
        let mut scene = floor_scene();
        add_wall_run(&mut scene);
        let mut session = top_down_session();
        // Pressed over empty floor: depth 10.
        begin(&mut session, &mut scene, &[EntityId(12)], 0.0, 0.5);

        let drag = event(TrackerState::Drag, 0.02, 0.55);
        let commands = respond(&session, &scene, GestureKind::TransientMove, &drag, &[EntityId(12)], None);
        assert_eq!(commands.len(), 1);
        let CommandKind::Multi(parts) = &commands[0].kind else {
            panic!("expected a batch");
        };
        assert_eq!(parts.len(), 3);
        let (vertex, position) = moved_to(&parts[0].kind);
        assert_eq!(vertex, EntityId(12));
        assert_relative_eq!(position[0], 2.2, epsilon = 1e-9);
        assert_relative_eq!(position[1], 0.5, epsilon = 1e-9);
        assert_relative_eq!(position[2], 0.0, epsilon = 1e-12);

        let CommandKind::AlignSegment { segment, size, .. } = &parts[1].kind else {
            panic!("expected a segment re-alignment");
        };
        assert_eq!(*segment, EntityId(14));
        assert_relative_eq!(size[0], (2.2f32 * 2.2 + 0.25).sqrt(), epsilon = 1e-5);
        assert!(matches!(parts[2].kind, CommandKind::AlignSegment { segment, .. } if segment == EntityId(15)));
    }

    #[test]
    fn test_segment_move_carries_endpoints() {
        let mut scene = floor_scene();
        add_wall_run(&mut scene);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[EntityId(14)], 0.0, 0.5);

        let drag = event(TrackerState::Drag, 0.0, 0.6);
        let commands = respond(&session, &scene, GestureKind::Move, &drag, &[EntityId(14)], None);
        let CommandKind::Multi(parts) = &commands[0].kind else {
            panic!("expected a batch");
        };
        let (first, a) = moved_to(&parts[0].kind);
        let (second, b) = moved_to(&parts[1].kind);
        assert_eq!((first, second), (EntityId(11), EntityId(12)));
        assert_relative_eq!(a[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(b[1], 1.0, epsilon = 1e-9);
        assert_relative_eq!(b[0], 2.0, epsilon = 1e-9);
        // The dragged segment and its neighbour on the shared vertex.
        assert_eq!(parts.len(), 4);
    }

    #[test]
    fn test_removed_child_skips_entity() {
        let mut scene = floor_scene();
        let table = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        scene
            .add_entity(
                Entity::new(EntityId(3), EntityKind::Model)
                    .with_parent(table)
                    .with_position([0.0, 0.0, 1.0]),
            )
            .unwrap();
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[table], 0.0, 0.0);
        scene.remove_entity(EntityId(3));

        let drag = event(TrackerState::Drag, 0.1, 0.0);
        assert!(respond(&session, &scene, GestureKind::Move, &drag, &[table], None).is_empty());
    }
}
