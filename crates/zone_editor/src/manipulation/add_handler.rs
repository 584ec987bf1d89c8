//! Additive gestures: place a tool template where the pointer lands
//!
//! All three act once, on the event that completes the gesture, and select
//! what they created.

use super::move_handler::vertex_start;
use super::placement::{resolve_elevation, resting_elevation, zone_pick_point, Footprint};
use super::{HandlerContext, Tool};
use crate::commands::{Command, CommandKind};
use crate::error::{EditError, EditResult};
use crate::foundation::math::{Mat3, Mat4, Point3, Quat, Real, Vec3, DEGENERATE_LENGTH};
use crate::input::TrackerEvent;
use crate::physics::bounds::OrientedBoundingBox;
use crate::scene::{segment_placement, Entity, EntityFlags, EntityId, EntityKind, TransformResolver};

/// Half length of the probe cast along the zone's right axis
const SPAN_REACH: Real = 1.0e4;

fn ready<'t>(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: Option<&'t Tool>) -> Option<&'t Tool> {
    if !event.state.is_final() {
        return None;
    }
    if tool.is_none() {
        log::debug!("Add gesture on zone {} without a tool", ctx.action.zone());
    }
    tool
}

fn report(gesture: &str, result: EditResult<Option<Command>>) -> Vec<Command> {
    match result {
        Ok(command) => command.into_iter().collect(),
        Err(error) => {
            log::debug!("{} skipped: {}", gesture, error);
            Vec::new()
        }
    }
}

fn add_and_select(ctx: &HandlerContext<'_>, added: Vec<Entity>, selected: EntityId) -> Option<Command> {
    let mut parts: Vec<Command> = added
        .into_iter()
        .map(|entity| {
            ctx.command(
                CommandKind::Add {
                    entity: Box::new(entity),
                },
                false,
            )
        })
        .collect();
    parts.push(ctx.command(
        CommandKind::Select {
            entities: vec![selected],
        },
        false,
    ));
    ctx.batch(parts)
}

/// Place one instance of the tool on whatever is under the pointer
pub(super) fn respond_add(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: Option<&Tool>) -> Vec<Command> {
    let Some(tool) = ready(ctx, event, tool) else {
        return Vec::new();
    };
    report("Add", place(ctx, event, tool))
}

fn place(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: &Tool) -> EditResult<Option<Command>> {
    let (point, hit) = zone_pick_point(ctx, event)?;
    let candidate = ctx.session.grid().align_position_to_grid(&point);
    let support = hit.entity().is_some().then_some(&hit);
    let elevation = resolve_elevation(
        ctx,
        Footprint::Template(tool),
        &candidate,
        &tool.rotation_quat(),
        support,
    )?;
    let position = ctx.action.orientation().with_normal_component(&candidate, elevation);

    let id = ctx.session.reserve_id(ctx.scene);
    log::debug!("Adding entity {} at {:?}", id, position);
    let entity = tool.instantiate(id, ctx.action.zone(), &position);
    Ok(add_and_select(ctx, vec![entity], id))
}

/// Place one instance stretched along the zone's right axis to fill the
/// gap between the nearest colliders on either side of the pointer
pub(super) fn respond_auto_span(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: Option<&Tool>) -> Vec<Command> {
    let Some(tool) = ready(ctx, event, tool) else {
        return Vec::new();
    };
    report("Auto-span add", span(ctx, event, tool))
}

fn span(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: &Tool) -> EditResult<Option<Command>> {
    let (point, _) = zone_pick_point(ctx, event)?;
    let orientation = ctx.action.orientation();
    let aligned = ctx.session.grid().align_position_to_grid(&point);
    let centre = orientation.with_normal_component(&aligned, resting_elevation(ctx, tool.scaled_height()));

    let collision = ctx.session.collision();
    let frame = Quat::from_matrix(&Mat3::from_columns(&[orientation.right, orientation.up, orientation.normal]));
    let extent = tool.extent();
    let probe = OrientedBoundingBox::from_size(Vec3::new(2.0 * SPAN_REACH, extent.y, extent.z), Vec3::repeat(1.0))
        .transformed(&collision.candidate_matrix(ctx.scene, &centre, &frame)?);
    let mut colliders = Vec::new();
    if !collision.check_bounds(ctx.scene, &probe, None, &mut colliders) {
        log::debug!("Nothing to span between");
        return Ok(None);
    }

    let zone_world = ctx.action.zone_world();
    let origin = zone_world.transform_point(&Point3::from(centre));
    let along = zone_world
        .transform_vector(&orientation.right)
        .try_normalize(DEGENERATE_LENGTH)
        .ok_or(EditError::DegenerateDirection("zone right axis"))?;
    let Some((left, right)) = nearest_faces(ctx, &colliders, &origin, &along) else {
        log::debug!("Span needs colliders on both sides");
        return Ok(None);
    };
    let gap = right - left;
    if gap <= 0.0 || tool.size[0] <= 0.0 {
        return Ok(None);
    }

    #[allow(clippy::cast_possible_truncation)]
    let stretch = (gap / Real::from(tool.size[0])) as f32;
    let template = tool.clone().with_scale([stretch, tool.scale[1], tool.scale[2]]);
    let position = centre + orientation.right * ((left + right) * 0.5);
    let id = ctx.session.reserve_id(ctx.scene);
    log::debug!("Spanning {} units with entity {}", gap, id);
    Ok(add_and_select(ctx, vec![template.instantiate(id, ctx.action.zone(), &position)], id))
}

/// Closest collider faces left (max of upper bounds below zero) and right
/// (min of lower bounds above zero) of `origin` along `along`.
/// Colliders straddling `origin` are ignored.
fn nearest_faces(ctx: &HandlerContext<'_>, colliders: &[EntityId], origin: &Point3, along: &Vec3) -> Option<(Real, Real)> {
    let mut left: Option<Real> = None;
    let mut right: Option<Real> = None;
    for &id in colliders {
        let Ok(bounds) = ctx.scene.world_bounds(id) else {
            continue;
        };
        let centre = (bounds.center() - origin).dot(along);
        let reach: Real = bounds
            .axes()
            .iter()
            .zip(bounds.half_extents().iter())
            .map(|(axis, half)| half * axis.dot(along).abs())
            .sum();
        if centre + reach < 0.0 {
            left = Some(left.map_or(centre + reach, |l| l.max(centre + reach)));
        } else if centre - reach > 0.0 {
            right = Some(right.map_or(centre - reach, |r| r.min(centre - reach)));
        } else {
            log::trace!("Collider {} straddles the span origin", id);
        }
    }
    Some((left?, right?))
}

/// Add a vertex, joined to the previous one by a segment when there is one
pub(super) fn respond_segmentable(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: Option<&Tool>) -> Vec<Command> {
    let Some(tool) = ready(ctx, event, tool) else {
        return Vec::new();
    };
    report("Segmentable add", extend_run(ctx, event, tool))
}

fn extend_run(ctx: &HandlerContext<'_>, event: &TrackerEvent, tool: &Tool) -> EditResult<Option<Command>> {
    let (point, _) = zone_pick_point(ctx, event)?;
    let orientation = ctx.action.orientation();
    let on_plane = orientation.with_normal_component(&ctx.session.grid().align_position_to_grid(&point), 0.0);

    let allocate = || ctx.session.reserve_id(ctx.scene);
    let mut added = Vec::with_capacity(3);

    let existing = tool
        .previous_vertex
        .and_then(|vertex| ctx.scene.entity(vertex))
        .and_then(Entity::parent)
        .or(tool.segmentable)
        .filter(|id| ctx.scene.entity(*id).is_some());
    let parent = match existing {
        Some(parent) => parent,
        None => {
            let id = allocate();
            log::debug!("Starting segmentable {}", id);
            added.push(
                Entity::new(id, EntityKind::Segmentable)
                    .with_parent(ctx.action.zone())
                    .with_size([0.0; 3])
                    .with_flags(EntityFlags::empty()),
            );
            id
        }
    };
    let position = match existing {
        Some(parent) => zone_to_parent(ctx, parent)?.transform_point(&Point3::from(on_plane)).coords,
        None => on_plane,
    };

    let vertex = allocate();
    added.push(tool.instantiate(vertex, parent, &position));

    if let Some(previous) = tool.previous_vertex.filter(|_| existing.is_some()) {
        let start = vertex_start(ctx, previous).ok_or(EditError::MissingEntity(previous))?;
        let Some(placement) = segment_placement(&start, &position, tool.segment_thickness, tool.segment_height) else {
            log::debug!("New vertex coincides with {}; nothing added", previous);
            return Ok(None);
        };
        added.push(
            Entity::new(
                allocate(),
                EntityKind::Segment {
                    start: previous,
                    end: vertex,
                    thickness: tool.segment_thickness,
                },
            )
            .with_parent(parent)
            .with_position(placement.position)
            .with_rotation(placement.rotation)
            .with_size(placement.size),
        );
    }

    Ok(add_and_select(ctx, added, vertex))
}

/// Rigid map from the zone frame into `parent`'s frame
fn zone_to_parent(ctx: &HandlerContext<'_>, parent: EntityId) -> EditResult<Mat4> {
    let wrappers = ctx.scene.wrappers();
    let parent_node = wrappers.require(parent)?.transform_node();
    let zone_node = wrappers.require(ctx.action.zone())?.transform_node();
    TransformResolver::new(ctx.scene.graph())
        .transform_checked(parent_node, zone_node)?
        .try_inverse()
        .ok_or(EditError::DegenerateDirection("segmentable frame"))
}
