//! Segment thickness
//!
//! Dragging across a segment moves the grabbed face while the far face stays
//! put. The endpoints shift by half the change so the segment's centre line
//! follows, and every segment on those endpoints is re-fitted.

use super::move_handler::{move_kind, realign_segments};
use super::{emits_edit, EntitySnapshot, HandlerContext};
use crate::commands::{Command, CommandKind};
use crate::error::{EditError, EditResult};
use crate::foundation::math::{try_normalize, Real, Vec3};
use crate::input::TrackerEvent;
use crate::scene::{EntityId, EntityKind};

pub(super) fn respond(ctx: &HandlerContext<'_>, event: &TrackerEvent, entities: &[EntityId], transient: bool) -> Vec<Command> {
    if !emits_edit(ctx, event) {
        return Vec::new();
    }
    let delta = ctx.action.zone_delta(event);
    entities
        .iter()
        .filter_map(|&id| match thicken(ctx, id, &delta, transient) {
            Ok(command) => command,
            Err(error) => {
                log::debug!("Thickness change of {} skipped: {}", id, error);
                None
            }
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn thicken(ctx: &HandlerContext<'_>, id: EntityId, delta: &Vec3, transient: bool) -> EditResult<Option<Command>> {
    let snapshot = ctx.action.snapshot(id).ok_or(EditError::MissingWrapper(id))?;
    if ctx.action.topology_changed(ctx.scene, id) {
        return Err(EditError::TopologyChanged(id));
    }
    let EntityKind::Segment { start, end, thickness } = snapshot.kind else {
        log::trace!("Entity {} is not a segment", id);
        return Ok(None);
    };
    let first = ctx.action.snapshot(start).ok_or(EditError::MissingWrapper(start))?;
    let second = ctx.action.snapshot(end).ok_or(EditError::MissingWrapper(end))?;

    let across = across_direction(ctx, snapshot)?;
    let side = grab_side(ctx, snapshot, &across);
    let min_thickness = Real::from(ctx.session.config().manipulation.min_scale);
    let current = Real::from(thickness);
    let updated = (current + side * across.dot(delta)).max(min_thickness);
    let shift = across * (side * (updated - current) * 0.5);
    let updated = updated as f32;

    let moved = [
        (start, first.start_position + first.to_parent_vector(&shift)),
        (end, second.start_position + second.to_parent_vector(&shift)),
    ];
    let mut parts = vec![ctx.command(
        CommandKind::ChangeThickness {
            segment: id,
            thickness: updated,
        },
        transient,
    )];
    parts.extend(moved.iter().map(|(vertex, position)| ctx.command(move_kind(*vertex, position), transient)));
    parts.extend(realign_segments(ctx, &moved, Some((id, updated)), transient));
    Ok(ctx.batch(parts))
}

/// Segment's local thickness axis laid onto the zone plane
fn across_direction(ctx: &HandlerContext<'_>, snapshot: &EntitySnapshot) -> EditResult<Vec3> {
    let axis = snapshot.zone_rotation() * Vec3::y();
    try_normalize(&ctx.action.orientation().project(&axis))
        .ok_or(EditError::DegenerateDirection("segment thickness axis"))
}

fn grab_side(ctx: &HandlerContext<'_>, snapshot: &EntitySnapshot, across: &Vec3) -> Real {
    let offset = ctx
        .action
        .zone_world_position()
        .map_or(0.0, |grab| (grab - snapshot.zone_position()).dot(across));
    if offset < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandKind;
    use crate::input::TrackerState;
    use crate::manipulation::test_support::*;
    use crate::manipulation::GestureKind;
    use crate::scene::EntityId;
    use approx::assert_relative_eq;

    fn parts_of(commands: &[crate::commands::Command]) -> &[crate::commands::Command] {
        match commands {
            [command] => match &command.kind {
                CommandKind::Multi(parts) => parts,
                other => panic!("expected a batch, got {other:?}"),
            },
            _ => panic!("expected one command, got {}", commands.len()),
        }
    }

    #[test]
    fn test_drag_away_thickens_and_shifts_centre_line() {
        let mut scene = floor_scene();
        add_wall_run(&mut scene);
        let mut session = top_down_session();
        // Pressed over the floor beside segment 14, on its +Y side.
        begin(&mut session, &mut scene, &[EntityId(14)], 0.1, 0.05);

        let drag = event(TrackerState::Drag, 0.1, 0.07);
        let commands = respond(&session, &scene, GestureKind::SegmentThickness, &drag, &[EntityId(14)], None);
        assert!(commands[0].transient);
        let parts = parts_of(&commands);
        assert_eq!(parts.len(), 5);

        let CommandKind::ChangeThickness { segment, thickness } = parts[0].kind else {
            panic!("expected a thickness change");
        };
        assert_eq!(segment, EntityId(14));
        assert_relative_eq!(thickness, 0.4, epsilon = 1e-5);

        for (part, (vertex, x)) in parts[1..3].iter().zip([(EntityId(11), 0.0), (EntityId(12), 2.0)]) {
            let CommandKind::Move { entity, position } = part.kind else {
                panic!("expected an endpoint move");
            };
            assert_eq!(entity, vertex);
            assert_relative_eq!(position[0], x, epsilon = 1e-9);
            assert_relative_eq!(position[1], 0.1, epsilon = 1e-6);
        }

        let CommandKind::AlignSegment { segment, size, .. } = parts[3].kind else {
            panic!("expected a segment re-alignment");
        };
        assert_eq!(segment, EntityId(14));
        assert_relative_eq!(size[1], 0.4, epsilon = 1e-5);
        assert!(matches!(parts[4].kind, CommandKind::AlignSegment { segment, size, .. }
            if segment == EntityId(15) && (size[1] - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_thickness_never_drops_below_minimum() {
        let mut scene = floor_scene();
        add_wall_run(&mut scene);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[EntityId(14)], 0.1, 0.05);

        let release = event(TrackerState::Release, 0.1, -0.5);
        let commands = respond(&session, &scene, GestureKind::SegmentThickness, &release, &[EntityId(14)], None);
        assert!(!commands[0].transient);
        let CommandKind::ChangeThickness { thickness, .. } = parts_of(&commands)[0].kind else {
            panic!("expected a thickness change");
        };
        assert_relative_eq!(thickness, session.config().manipulation.min_scale);
    }

    #[test]
    fn test_models_are_ignored() {
        let mut scene = floor_scene();
        let cube = add_box(&mut scene, 2, [0.0, 0.0, 0.5]);
        let mut session = top_down_session();
        begin(&mut session, &mut scene, &[cube], 0.0, 0.0);
        let drag = event(TrackerState::Drag, 0.1, 0.0);
        assert!(respond(&session, &scene, GestureKind::SegmentThickness, &drag, &[cube], None).is_empty());
    }
}
