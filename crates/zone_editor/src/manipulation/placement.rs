//! Elevation resolution shared by move and add handlers
//!
//! The normal-axis coordinate of a placed entity comes from, in order:
//! the highest collider found by iterative stacking, the entity picked
//! under the pointer, or the bare zone plane.

use super::{HandlerContext, Tool};
use crate::error::{EditError, EditResult};
use crate::foundation::math::{Quat, Real, Vec3};
use crate::input::TrackerEvent;
use crate::picking::PickResult;
use crate::scene::{EntityId, ZoneKind};

/// What is being placed
#[derive(Debug, Clone, Copy)]
pub(super) enum Footprint<'t> {
    /// An entity already in the scene; its subtree is never a support
    Entity(EntityId),
    /// A tool template not yet backed by an entity
    Template(&'t Tool),
}

impl Footprint<'_> {
    fn scaled_height(&self, ctx: &HandlerContext<'_>) -> Option<Real> {
        match self {
            Self::Entity(id) => ctx.scene.entity(*id).map(|e| e.scaled_height()),
            Self::Template(tool) => Some(tool.scaled_height()),
        }
    }

    fn stack(&self, ctx: &HandlerContext<'_>, candidate: &Vec3, rotation: &Quat) -> Option<(EntityId, Real)> {
        let collision = ctx.session.collision();
        match self {
            Self::Entity(id) => collision.resolve_stack(ctx.scene, *id, candidate, rotation),
            Self::Template(tool) => collision.resolve_stack_bounds(
                ctx.scene,
                &tool.local_bounds(),
                None,
                tool.size[2],
                tool.scale[2],
                candidate,
                rotation,
            ),
        }
    }
}

/// Normal-axis coordinate on the bare zone plane
pub(super) fn resting_elevation(ctx: &HandlerContext<'_>, scaled_height: Real) -> Real {
    match ctx.action.zone_kind() {
        ZoneKind::Floor => scaled_height * 0.5,
        ZoneKind::Wall => -ctx.session.config().collision.embedding_depth,
    }
}

/// Normal-axis coordinate for `footprint` centred at `candidate` (zone frame)
pub(super) fn resolve_elevation(
    ctx: &HandlerContext<'_>,
    footprint: Footprint<'_>,
    candidate: &Vec3,
    rotation: &Quat,
    support: Option<&PickResult>,
) -> EditResult<Real> {
    let height = footprint
        .scaled_height(ctx)
        .ok_or(EditError::DegenerateDirection("footprint height"))?;
    if ctx.action.zone_kind() == ZoneKind::Wall {
        return Ok(resting_elevation(ctx, height));
    }

    if let Some((collider, elevation)) = footprint.stack(ctx, candidate, rotation) {
        log::trace!("Resting on collider {} at {}", collider, elevation);
        return Ok(elevation);
    }

    let embedding = ctx.session.config().collision.embedding_depth;
    let orientation = ctx.action.orientation();
    if let Some(point) = support.and_then(|hit| ctx.action.world_to_zone(&hit.point)) {
        let surface = orientation.normal_component(&point);
        log::trace!("Resting on picked support at {}", surface);
        return Ok(surface - embedding + height * 0.5);
    }

    Ok(resting_elevation(ctx, height))
}

/// Nearest picked entity outside the gesture's own entities
pub(super) fn support_pick(ctx: &HandlerContext<'_>, event: &TrackerEvent) -> Option<PickResult> {
    ctx.session
        .pick(ctx.scene, &event.device_position)
        .into_iter()
        .find(|hit| hit.entity().is_some_and(|id| !ctx.action.covers(ctx.scene, id)))
}

/// Nearest pick under the pointer mapped into the zone frame
pub(super) fn zone_pick_point(ctx: &HandlerContext<'_>, event: &TrackerEvent) -> EditResult<(Vec3, PickResult)> {
    let hit = ctx
        .session
        .pick(ctx.scene, &event.device_position)
        .into_iter()
        .next()
        .ok_or(EditError::EmptyPick)?;
    let point = ctx
        .action
        .world_to_zone(&hit.point)
        .ok_or(EditError::DegenerateDirection("zone frame"))?;
    Ok((point, hit))
}
