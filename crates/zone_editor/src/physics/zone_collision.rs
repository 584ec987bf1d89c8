//! Zone-relative collision queries
//!
//! A zone is the container whose descendants are collision candidates. The
//! engine walks that hierarchy in pre-order and tests each candidate's world
//! bounds against a source entity placed at a proposed transform.
//!
//! The scene is passed into every query. Wrappers are looked up fresh each
//! time so entities removed between gestures are never tested.
//!
//! ## Elevation resolution
//!
//! ```text
//! probe at zone-plane resting height
//!      ↓ check → colliders
//! find_highest → stack_elevation
//!      ↓ re-check at the new height (bounded iterations)
//! ```

use super::bounds::OrientedBoundingBox;
use super::triangle_intersector::TriangleIntersector;
use crate::core::config::CollisionConfig;
use crate::error::{EditError, EditResult};
use crate::foundation::math::{Mat4, Quat, Real, Vec3};
use crate::scene::{EntityFlags, EntityId, EntityWrapper, Scene, TransformResolver};

/// Elevation gains smaller than this end stack resolution
const STACK_SETTLE: Real = 1.0e-9;

/// Collision queries relative to one active zone
#[derive(Debug, Clone, Default)]
pub struct ZoneCollisionEngine {
    zone: Option<EntityId>,
    config: CollisionConfig,
}

impl ZoneCollisionEngine {
    /// Create an engine with no zone set
    pub fn new(config: CollisionConfig) -> Self {
        Self { zone: None, config }
    }

    /// Set the active zone
    pub fn set_zone(&mut self, zone: Option<EntityId>) {
        self.zone = zone;
    }

    /// Builder pattern: set the active zone
    pub fn with_zone(mut self, zone: EntityId) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Active zone
    pub fn zone(&self) -> Option<EntityId> {
        self.zone
    }

    /// Collision settings
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    fn active_zone(&self, scene: &Scene) -> EditResult<EntityId> {
        let zone = self.zone.ok_or(EditError::NoZone)?;
        scene.wrappers().require(zone)?;
        Ok(zone)
    }

    /// World transform of the active zone's transform node
    pub fn zone_world_transform(&self, scene: &Scene) -> EditResult<Mat4> {
        let zone = self.active_zone(scene)?;
        let node = scene.wrappers().require(zone)?.transform_node();
        Ok(TransformResolver::new(scene.graph()).world_transform(node))
    }

    /// World matrix placing an entity centre at `zone_position` (zone frame)
    pub fn candidate_matrix(&self, scene: &Scene, zone_position: &Vec3, rotation: &Quat) -> EditResult<Mat4> {
        Ok(self.zone_world_transform(scene)? * Mat4::new_translation(zone_position) * rotation.to_homogeneous())
    }

    /// Collect every zone descendant whose bounds intersect `source` placed
    /// at `candidate`. The source subtree is skipped. Returns whether any
    /// collider was found.
    pub fn check(&self, scene: &Scene, source: EntityId, candidate: &Mat4, results: &mut Vec<EntityId>) -> bool {
        self.check_with_children(scene, source, candidate, false, results)
    }

    /// Like [`check`](Self::check); with `include_source_children` the
    /// source's own descendants are candidates too.
    pub fn check_with_children(
        &self,
        scene: &Scene,
        source: EntityId,
        candidate: &Mat4,
        include_source_children: bool,
        results: &mut Vec<EntityId>,
    ) -> bool {
        let before = results.len();
        let outcome = self.source_bounds(scene, source, candidate).and_then(|bounds| {
            self.walk(scene, Some(source), include_source_children, results, |_, world| {
                world.intersects(&bounds, false)
            })
        });
        if let Err(error) = outcome {
            log::debug!("Collision check for {} skipped: {}", source, error);
        }
        results.len() > before
    }

    /// Collect zone descendants whose bounds intersect raw world `bounds`
    pub fn check_bounds(
        &self,
        scene: &Scene,
        bounds: &OrientedBoundingBox,
        exclude: Option<EntityId>,
        results: &mut Vec<EntityId>,
    ) -> bool {
        let before = results.len();
        if let Err(error) = self.walk(scene, exclude, false, results, |_, world| world.intersects(bounds, false)) {
            log::debug!("Bounds check skipped: {}", error);
        }
        results.len() > before
    }

    /// Bounds check refined against each collider's model triangles.
    ///
    /// Colliders without loaded geometry keep their bounds result.
    pub fn check_precise(&self, scene: &Scene, source: EntityId, candidate: &Mat4, results: &mut Vec<EntityId>) -> bool {
        let mut coarse = Vec::new();
        if !self.check(scene, source, candidate, &mut coarse) {
            return false;
        }
        let Ok(bounds) = self.source_bounds(scene, source, candidate) else {
            return false;
        };
        let intersector = TriangleIntersector::new(scene.graph());
        let before = results.len();
        results.extend(coarse.into_iter().filter(|id| {
            let model = scene.wrapper(*id).and_then(EntityWrapper::model_node);
            match model {
                Some(node) if !scene.graph().children(node).is_empty() => intersector.intersects(&bounds, node, true),
                _ => true,
            }
        }));
        results.len() > before
    }

    fn source_bounds(&self, scene: &Scene, source: EntityId, candidate: &Mat4) -> EditResult<OrientedBoundingBox> {
        let wrapper = scene.wrappers().require(source)?;
        Ok(wrapper
            .local_bounds()
            .clone()
            .with_epsilon(self.config.epsilon)
            .transformed(candidate))
    }

    /// Pre-order walk of the zone's descendants, pushing ids that pass `test`
    fn walk<F>(
        &self,
        scene: &Scene,
        skip: Option<EntityId>,
        include_skipped_children: bool,
        results: &mut Vec<EntityId>,
        mut test: F,
    ) -> EditResult<()>
    where
        F: FnMut(EntityId, &OrientedBoundingBox) -> bool,
    {
        let zone = self.active_zone(scene)?;
        let resolver = TransformResolver::new(scene.graph());
        let mut stack: Vec<EntityId> = scene.entities().children(zone).iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            let children = scene.entities().children(id);
            if Some(id) == skip {
                if include_skipped_children {
                    stack.extend(children.iter().rev());
                }
                continue;
            }
            stack.extend(children.iter().rev());

            let Some(entity) = scene.entity(id) else {
                continue;
            };
            if !entity.flags.contains(EntityFlags::COLLIDABLE) {
                continue;
            }
            let Some(wrapper) = scene.wrapper(id) else {
                log::debug!("Entity {} has no wrapper; skipping", id);
                continue;
            };
            let world = wrapper
                .local_bounds()
                .clone()
                .with_epsilon(self.config.epsilon)
                .transformed(&resolver.world_transform(wrapper.transform_node()));
            if test(id, &world) {
                results.push(id);
            }
        }
        Ok(())
    }

    /// Starting position of `entity` plus `offset`, expressed in the zone frame.
    ///
    /// `None` when the entity or its parent has no wrapper.
    pub fn to_zone_relative(&self, scene: &Scene, entity: EntityId, offset: &Vec3) -> Option<Vec3> {
        let zone = self.zone?;
        let zone_node = scene.wrapper(zone)?.transform_node();
        let data = scene.entity(entity)?;
        let parent_node = scene.wrapper(data.parent()?)?.transform_node();
        let matrix = TransformResolver::new(scene.graph()).transform(parent_node, zone_node);
        let local = data.starting_position_vec() + offset;
        Some(matrix.transform_point(&local.into()).coords)
    }

    /// Candidate nearest to `position` (zone frame); ties go to the first
    pub fn find_closest(&self, scene: &Scene, position: &Vec3, candidates: &[EntityId]) -> Option<EntityId> {
        let mut best: Option<(EntityId, Real)> = None;
        for &candidate in candidates {
            let Some(relative) = self.to_zone_relative(scene, candidate, &Vec3::zeros()) else {
                log::debug!("No zone-relative position for {}; skipping", candidate);
                continue;
            };
            let distance = (relative - position).norm_squared();
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((candidate, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Top-surface elevation of a candidate in the zone frame.
    ///
    /// Entity positions are box centres, so the top sits half the scaled
    /// height above `zone_z`.
    pub fn top_elevation(&self, scene: &Scene, entity: EntityId) -> Option<Real> {
        let relative = self.to_zone_relative(scene, entity, &Vec3::zeros())?;
        Some(relative.z + scene.entity(entity)?.scaled_height() * 0.5)
    }

    /// Candidate with the highest top surface; ties go to the first
    pub fn find_highest(&self, scene: &Scene, candidates: &[EntityId]) -> Option<EntityId> {
        let mut best: Option<(EntityId, Real)> = None;
        for &candidate in candidates {
            let Some(top) = self.top_elevation(scene, candidate) else {
                log::debug!("No elevation for {}; skipping", candidate);
                continue;
            };
            if best.map_or(true, |(_, z)| top > z) {
                best = Some((candidate, top));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Zone-frame elevation for a source of the given height resting on
    /// `highest`, sunk by the embedding depth
    pub fn stack_elevation(&self, scene: &Scene, highest: EntityId, source_size_z: f32, source_scale_z: f32) -> Option<Real> {
        let top = self.top_elevation(scene, highest)?;
        Some(top - self.config.embedding_depth + Real::from(source_scale_z) * Real::from(source_size_z) * 0.5)
    }

    /// Stack `source` onto whatever it collides with around `zone_position`.
    ///
    /// Probes first at the zone-plane resting height, then re-checks at each
    /// resolved elevation until nothing higher is hit or the iteration limit
    /// is reached. `None` when nothing supports the source.
    pub fn resolve_stack(&self, scene: &Scene, source: EntityId, zone_position: &Vec3, rotation: &Quat) -> Option<(EntityId, Real)> {
        let entity = scene.entity(source)?;
        let bounds = scene.wrapper(source)?.local_bounds().clone();
        self.resolve_stack_bounds(scene, &bounds, Some(source), entity.size[2], entity.scale[2], zone_position, rotation)
    }

    /// Stack resolution for local `bounds` not yet backed by an entity.
    ///
    /// `exclude` and its subtree are never supports.
    pub fn resolve_stack_bounds(
        &self,
        scene: &Scene,
        bounds: &OrientedBoundingBox,
        exclude: Option<EntityId>,
        size_z: f32,
        scale_z: f32,
        zone_position: &Vec3,
        rotation: &Quat,
    ) -> Option<(EntityId, Real)> {
        let local = bounds.clone().with_epsilon(self.config.epsilon);
        let mut probe = *zone_position;
        probe.z = Real::from(scale_z) * Real::from(size_z) * 0.5;

        let mut best: Option<(EntityId, Real)> = None;
        for _ in 0..self.config.max_stack_iterations.max(1) {
            let Ok(matrix) = self.candidate_matrix(scene, &probe, rotation) else {
                break;
            };
            let mut hits = Vec::new();
            self.check_bounds(scene, &local.transformed(&matrix), exclude, &mut hits);
            let Some(highest) = self.find_highest(scene, &hits) else {
                break;
            };
            let Some(elevation) = self.stack_elevation(scene, highest, size_z, scale_z) else {
                break;
            };
            if best.is_some_and(|(_, z)| elevation <= z + STACK_SETTLE) {
                break;
            }
            log::trace!("Stacking onto {} at z = {}", highest, elevation);
            best = Some((highest, elevation));
            probe.z = elevation;
        }
        best
    }
}
