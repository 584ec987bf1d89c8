//! Rotation about the zone normal
//!
//! The angle swept by the pointer around the entity's projected centre is
//! applied on top of the starting rotation.

use super::{emits_edit, EntitySnapshot, HandlerContext};
use crate::commands::{Command, CommandKind};
use crate::error::{EditError, EditResult};
use crate::foundation::math::{axis_angle_from_quat, Point3, Quat, Vec2, DEGENERATE_LENGTH};
use crate::input::TrackerEvent;
use crate::scene::{EntityId, EntityKind};
use nalgebra::Unit;

pub(super) fn respond(ctx: &HandlerContext<'_>, event: &TrackerEvent, entities: &[EntityId], transient: bool) -> Vec<Command> {
    if !emits_edit(ctx, event) {
        return Vec::new();
    }
    entities
        .iter()
        .filter_map(|&id| match rotate_entity(ctx, id, event, transient) {
            Ok(command) => command,
            Err(error) => {
                log::debug!("Rotation of {} skipped: {}", id, error);
                None
            }
        })
        .collect()
}

fn rotate_entity(ctx: &HandlerContext<'_>, id: EntityId, event: &TrackerEvent, transient: bool) -> EditResult<Option<Command>> {
    let snapshot = ctx.action.snapshot(id).ok_or(EditError::MissingWrapper(id))?;
    if ctx.action.topology_changed(ctx.scene, id) {
        return Err(EditError::TopologyChanged(id));
    }
    if !matches!(snapshot.kind, EntityKind::Model | EntityKind::Segmentable) {
        log::trace!("Entity {} follows its vertices; not rotated directly", id);
        return Ok(None);
    }

    let angle = swept_angle(ctx, snapshot, event)?;
    let normal = snapshot.to_parent_vector(&ctx.action.orientation().normal);
    let axis = Unit::try_new(normal, DEGENERATE_LENGTH).ok_or(EditError::DegenerateDirection("zone normal"))?;
    let rotation = Quat::from_axis_angle(&axis, angle) * snapshot.start_rotation;

    Ok(Some(ctx.command(
        CommandKind::Rotate {
            entity: id,
            rotation: axis_angle_from_quat(&rotation),
        },
        transient,
    )))
}

/// Signed angle from the press direction to the current pointer direction,
/// counter-clockwise about a normal facing the camera
fn swept_angle(ctx: &HandlerContext<'_>, snapshot: &EntitySnapshot, event: &TrackerEvent) -> EditResult<f64> {
    let camera = ctx.session.camera();
    let centre = ctx.action.zone_world().transform_point(&Point3::from(snapshot.zone_position()));
    let projected = camera
        .world_to_ndc(&centre)
        .ok_or(EditError::DegenerateDirection("projected centre"))?;

    // NDC is anisotropic; undo the aspect stretch before measuring angles.
    let aspect = Vec2::new(camera.aspect, 1.0);
    let from = (ctx.action.device_position() - projected).component_mul(&aspect);
    let to = (event.device_position - projected).component_mul(&aspect);
    if from.norm() <= DEGENERATE_LENGTH || to.norm() <= DEGENERATE_LENGTH {
        return Err(EditError::DegenerateDirection("pointer direction"));
    }
    let angle = from.perp(&to).atan2(from.dot(&to));

    let normal = ctx.action.zone_world().transform_vector(&ctx.action.orientation().normal);
    let facing = camera.forward().map_or(true, |forward| forward.dot(&normal) <= 0.0);
    Ok(if facing { angle } else { -angle })
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandKind;
    use crate::foundation::math::{quat_from_axis_angle, Vec3};
    use crate::input::TrackerState;
    use crate::manipulation::test_support::*;
    use crate::manipulation::GestureKind;
    use crate::scene::EntityId;
    use approx::assert_relative_eq;

    #[test]
    fn test_quarter_turn_about_floor_normal() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 0.3, 0.0);

        // Pointer swings from +X to +Y around the centre.
        let drag = event(TrackerState::Drag, 0.0, 0.3);
        let commands = respond(&session, &scene, GestureKind::Rotate, &drag, &[cube], None);
        assert_eq!(commands.len(), 1);
        let CommandKind::Rotate { rotation, .. } = commands[0].kind else {
            panic!("expected a rotation");
        };
        let turned = quat_from_axis_angle(rotation) * Vec3::x();
        assert_relative_eq!(turned, Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_composes_with_start() {
        let mut scene = floor_scene();
        let cube = scene
            .add_entity(
                crate::scene::Entity::new(EntityId(2), crate::scene::EntityKind::Model)
                    .with_parent(ZONE)
                    .with_position([0.0, 0.0, 0.5])
                    .with_rotation([0.0, 0.0, 1.0, std::f32::consts::FRAC_PI_2]),
            )
            .unwrap();
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 0.3, 0.0);

        let drag = event(TrackerState::Release, -0.3, 0.0);
        let commands = respond(&session, &scene, GestureKind::Rotate, &drag, &[cube], None);
        assert!(!commands[0].transient);
        let CommandKind::Rotate { rotation, .. } = commands[0].kind else {
            panic!("expected a rotation");
        };
        // Quarter turn plus half turn.
        let turned = quat_from_axis_angle(rotation) * Vec3::x();
        assert_relative_eq!(turned, -Vec3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_pointer_on_centre_is_skipped() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 0.0, 0.0);
        let drag = event(TrackerState::Drag, 0.2, 0.0);
        assert!(respond(&session, &scene, GestureKind::Rotate, &drag, &[cube], None).is_empty());
    }
}
