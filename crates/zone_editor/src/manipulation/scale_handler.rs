//! Scaling by dragging a box face
//!
//! The half of the box under the grab point follows the pointer while the
//! opposite faces stay where they were, so each extent changes by twice the
//! pointer travel along that axis.

use super::{emits_edit, EntitySnapshot, HandlerContext};
use crate::commands::{Command, CommandKind};
use crate::error::{EditError, EditResult};
use crate::foundation::math::{vec3_to_f32, Real, Vec3, DEGENERATE_LENGTH};
use crate::input::TrackerEvent;
use crate::scene::{EntityId, EntityKind};

pub(super) fn respond(ctx: &HandlerContext<'_>, event: &TrackerEvent, entities: &[EntityId], transient: bool) -> Vec<Command> {
    if !emits_edit(ctx, event) {
        return Vec::new();
    }
    let delta = ctx.action.zone_delta(event);
    entities
        .iter()
        .filter_map(|&id| match scale_entity(ctx, id, &delta, transient) {
            Ok(command) => command,
            Err(error) => {
                log::debug!("Scaling of {} skipped: {}", id, error);
                None
            }
        })
        .collect()
}

fn scale_entity(ctx: &HandlerContext<'_>, id: EntityId, delta: &Vec3, transient: bool) -> EditResult<Option<Command>> {
    let snapshot = ctx.action.snapshot(id).ok_or(EditError::MissingWrapper(id))?;
    if ctx.action.topology_changed(ctx.scene, id) {
        return Err(EditError::TopologyChanged(id));
    }
    if snapshot.kind != EntityKind::Model {
        log::trace!("Entity {} has no free scale", id);
        return Ok(None);
    }

    let min_scale = Real::from(ctx.session.config().manipulation.min_scale);
    let scale = scaled(snapshot, delta, &grab_side(ctx, snapshot), min_scale);
    Ok(Some(ctx.command(
        CommandKind::Scale {
            entity: id,
            scale: vec3_to_f32(&scale),
        },
        transient,
    )))
}

/// +1 or -1 per local axis: the side of the centre the gesture grabbed
fn grab_side(ctx: &HandlerContext<'_>, snapshot: &EntitySnapshot) -> Vec3 {
    let offset = ctx
        .action
        .zone_world_position()
        .map_or_else(Vec3::zeros, |grab| grab - snapshot.zone_position());
    snapshot
        .zone_rotation()
        .inverse_transform_vector(&offset)
        .map(|v| if v < 0.0 { -1.0 } else { 1.0 })
}

fn scaled(snapshot: &EntitySnapshot, delta: &Vec3, side: &Vec3, min_scale: Real) -> Vec3 {
    let local_delta = snapshot.zone_rotation().inverse_transform_vector(delta);
    let extent = snapshot.start_extent() + (local_delta.component_mul(side) * 2.0);
    Vec3::from_fn(|axis, _| {
        let size = snapshot.size[axis];
        if size.abs() <= DEGENERATE_LENGTH {
            snapshot.start_scale[axis]
        } else {
            (extent[axis] / size).max(min_scale)
        }
    })
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandKind;
    use crate::input::TrackerState;
    use crate::manipulation::test_support::*;
    use crate::manipulation::GestureKind;
    use crate::scene::EntityId;
    use approx::assert_relative_eq;

    fn scale_of(commands: &[crate::commands::Command]) -> [f32; 3] {
        match commands {
            [command] => match command.kind {
                CommandKind::Scale { scale, .. } => scale,
                ref other => panic!("unexpected {other:?}"),
            },
            _ => panic!("expected one command, got {}", commands.len()),
        }
    }

    #[test]
    fn test_right_face_drag_grows_width() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        // Grab the top face right of centre; at depth 9, 0.1 NDC is 0.9 units.
        begin(&mut session, &mut scene, &[cube], 0.04, 0.0);
        let drag = event(TrackerState::Drag, 0.14, 0.0);
        let scale = scale_of(&respond(&session, &scene, GestureKind::Scale, &drag, &[cube], None));
        assert_relative_eq!(scale[0], 2.8, epsilon = 1e-4);
        assert_relative_eq!(scale[1], 1.0, epsilon = 1e-6);
        assert_relative_eq!(scale[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_left_face_drag_mirrors() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], -0.04, 0.0);
        let drag = event(TrackerState::Drag, -0.14, 0.0);
        let scale = scale_of(&respond(&session, &scene, GestureKind::Scale, &drag, &[cube], None));
        assert_relative_eq!(scale[0], 2.8, epsilon = 1e-4);
    }

    #[test]
    fn test_scale_clamps_at_minimum() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 0.04, 0.0);
        let release = event(TrackerState::Release, -0.5, 0.0);
        let commands = respond(&session, &scene, GestureKind::Scale, &release, &[cube], None);
        assert!(!commands[0].transient);
        assert_relative_eq!(scale_of(&commands)[0], session.config().manipulation.min_scale);
    }

    #[test]
    fn test_vertices_are_not_scaled() {
        let mut scene = floor_scene();
        add_wall_run(&mut scene);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[EntityId(12)], 0.2, 0.0);
        let drag = event(TrackerState::Drag, 0.3, 0.0);
        assert!(respond(&session, &scene, GestureKind::Scale, &drag, &[EntityId(12)], None).is_empty());
    }
}
