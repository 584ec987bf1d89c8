//! Pointer picking
//!
//! Orchestrates the picking pipeline: pointer → camera ray → zone
//! descendants' bounds (refined by model triangles) → sorted hit list.
//!
//! The zone's own plane is reported as a collision surrogate hit so callers
//! always have a placement point on empty floor or wall.

pub mod selection_cycle;

pub use selection_cycle::{CycleState, SelectionCycler};

use crate::core::config::PickConfig;
use crate::foundation::math::{Mat4, Point3, Real, Vec2};
use crate::input::PointerState;
use crate::physics::collision::Ray;
use crate::physics::triangle_intersector::TriangleIntersector;
use crate::render::Camera;
use crate::scene::{EntityFlags, EntityId, Scene, TransformResolver};
use std::time::Instant;

/// What a pick hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    /// A pickable entity in the zone
    Entity(EntityId),
    /// The plane of the zone itself
    ZonePlane(EntityId),
}

/// One pick hit
#[derive(Debug, Clone, PartialEq)]
pub struct PickResult {
    /// Object hit
    pub target: PickTarget,
    /// Hit point in world space
    pub point: Point3,
    /// World transform of the hit object
    pub transform: Mat4,
    /// Distance from the ray origin
    pub distance: Real,
}

impl PickResult {
    /// Hit entity, `None` for the zone plane
    pub fn entity(&self) -> Option<EntityId> {
        match self.target {
            PickTarget::Entity(id) => Some(id),
            PickTarget::ZonePlane(_) => None,
        }
    }

    /// Whether this is the zone-plane surrogate
    pub fn is_zone_plane(&self) -> bool {
        matches!(self.target, PickTarget::ZonePlane(_))
    }
}

/// Ray picking against the active zone
#[derive(Debug, Clone)]
pub struct PickResolver {
    zone: Option<EntityId>,
    config: PickConfig,
    cycler: SelectionCycler,
}

impl PickResolver {
    /// Create a resolver with no zone set
    pub fn new(config: PickConfig) -> Self {
        let cycler = SelectionCycler::new(config.cycle_tolerance_px, config.cycle_timeout());
        Self {
            zone: None,
            config,
            cycler,
        }
    }

    /// Set the active zone; any selection cycle is dropped
    pub fn set_zone(&mut self, zone: Option<EntityId>) {
        if self.zone != zone {
            self.cycler.reset();
        }
        self.zone = zone;
    }

    /// Active zone
    pub fn zone(&self) -> Option<EntityId> {
        self.zone
    }

    /// Selection cycling state
    pub fn cycler(&self) -> &SelectionCycler {
        &self.cycler
    }

    /// Pick through normalized device coordinates
    pub fn pick(&self, scene: &Scene, camera: &Camera, device_position: &Vec2) -> Vec<PickResult> {
        match camera.screen_to_world_ray(device_position.x, device_position.y) {
            Some(ray) => self.pick_ray(scene, &ray),
            None => {
                log::warn!("Camera produced no pick ray");
                Vec::new()
            }
        }
    }

    /// All hits along `ray`, nearest first
    pub fn pick_ray(&self, scene: &Scene, ray: &Ray) -> Vec<PickResult> {
        collect_hits(self.zone, &self.config, scene, ray)
    }

    /// Pick with selection cycling over entity hits.
    ///
    /// Returns the hit to select, or `None` when nothing pickable is under
    /// the pointer. A fresh pick only runs when the cycle restarts.
    pub fn pick_and_cycle(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        pointer: &PointerState,
        now: Instant,
    ) -> Option<PickResult> {
        let device_position = pointer.screen_to_ndc();
        let (zone, config) = (self.zone, &self.config);
        self.cycler.advance(pointer.pixel_position(), now, || {
            let Some(ray) = camera.screen_to_world_ray(device_position.x, device_position.y) else {
                return Vec::new();
            };
            let mut hits = collect_hits(zone, config, scene, &ray);
            hits.retain(|hit| !hit.is_zone_plane());
            hits
        })
    }
}

fn collect_hits(zone: Option<EntityId>, config: &PickConfig, scene: &Scene, ray: &Ray) -> Vec<PickResult> {
    let Some(zone) = zone else {
        log::debug!("Pick without an active zone");
        return Vec::new();
    };
    let Some(zone_wrapper) = scene.wrapper(zone) else {
        log::debug!("Zone {} has no wrapper; pick skipped", zone);
        return Vec::new();
    };

    let resolver = TransformResolver::new(scene.graph());
    let intersector = TriangleIntersector::new(scene.graph());
    let mut results = Vec::new();

    for id in scene.entities().descendants_inclusive(zone).into_iter().skip(1) {
        let Some(entity) = scene.entity(id) else {
            continue;
        };
        if !entity.flags.contains(EntityFlags::PICKABLE) {
            continue;
        }
        let Some(wrapper) = scene.wrapper(id) else {
            log::debug!("Entity {} has no wrapper; not pickable", id);
            continue;
        };
        let world = resolver.world_transform(wrapper.transform_node());
        let Some(box_distance) = wrapper.local_bounds().transformed(&world).intersect_ray(ray) else {
            continue;
        };

        let distance = match wrapper.model_node() {
            Some(model) if config.precise && !scene.graph().children(model).is_empty() => {
                match intersector.intersect_ray(ray, model) {
                    Some(t) => t,
                    None => continue,
                }
            }
            _ => box_distance,
        };
        results.push(PickResult {
            target: PickTarget::Entity(id),
            point: ray.point_at(distance),
            transform: world,
            distance,
        });
    }

    if let Some(kind) = scene.entity(zone).and_then(|e| e.zone_kind()) {
        let zone_world = resolver.world_transform(zone_wrapper.transform_node());
        let normal = zone_world.transform_vector(&kind.normal());
        let origin = zone_world.transform_point(&Point3::origin());
        if let Some(distance) = ray.intersect_plane(&origin, &normal) {
            results.push(PickResult {
                target: PickTarget::ZonePlane(zone),
                point: ray.point_at(distance),
                transform: zone_world,
                distance,
            });
        }
    }

    results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::foundation::time::{Clock, ManualClock};
    use crate::scene::{Entity, EntityKind, Mesh, ZoneKind};
    use approx::assert_relative_eq;
    use std::time::Duration;

    const ZONE: EntityId = EntityId(1);

    fn top_down_camera() -> Camera {
        let mut camera = Camera::perspective(Point3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        camera.up = Vec3::y();
        camera
    }

    fn stacked_scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .add_entity(Entity::new(ZONE, EntityKind::Zone(ZoneKind::Floor)).with_size([10.0, 10.0, 0.0]))
            .unwrap();
        for (i, z) in [0.5, 1.5, 2.5].into_iter().enumerate() {
            let id = EntityId(2 + i as u32);
            scene
                .add_entity(Entity::new(id, EntityKind::Model).with_parent(ZONE).with_position([0.0, 0.0, z]))
                .unwrap();
        }
        scene
    }

    fn resolver() -> PickResolver {
        let mut resolver = PickResolver::new(PickConfig::default());
        resolver.set_zone(Some(ZONE));
        resolver
    }

    #[test]
    fn test_pick_sorted_with_zone_plane_last() {
        let scene = stacked_scene();
        let hits = resolver().pick(&scene, &top_down_camera(), &Vec2::zeros());

        let targets: Vec<_> = hits.iter().map(|h| h.target).collect();
        assert_eq!(
            targets,
            vec![
                PickTarget::Entity(EntityId(4)),
                PickTarget::Entity(EntityId(3)),
                PickTarget::Entity(EntityId(2)),
                PickTarget::ZonePlane(ZONE),
            ]
        );
        assert_relative_eq!(hits[0].distance, 7.0, epsilon = 1e-9);
        assert_relative_eq!(hits[3].point, Point3::origin(), epsilon = 1e-9);
    }

    #[test]
    fn test_pick_without_zone_is_empty() {
        let scene = stacked_scene();
        let resolver = PickResolver::new(PickConfig::default());
        assert!(resolver.pick(&scene, &top_down_camera(), &Vec2::zeros()).is_empty());
    }

    #[test]
    fn test_precise_pick_uses_triangles() {
        let mut scene = stacked_scene();
        // A flat triangle covering only the -x half of the top box.
        scene
            .set_geometry(
                EntityId(4),
                Mesh::triangles(vec![
                    Point3::new(-0.5, -0.5, 0.0),
                    Point3::new(0.0, -0.5, 0.0),
                    Point3::new(-0.5, 0.5, 0.0),
                ]),
            )
            .unwrap();
        let ray = Ray::new(Point3::new(0.25, 0.0, 10.0), -Vec3::z()).unwrap();
        let hits = resolver().pick_ray(&scene, &ray);
        assert_eq!(hits[0].target, PickTarget::Entity(EntityId(3)));

        let ray = Ray::new(Point3::new(-0.4, -0.4, 10.0), -Vec3::z()).unwrap();
        let hits = resolver().pick_ray(&scene, &ray);
        assert_eq!(hits[0].target, PickTarget::Entity(EntityId(4)));
        assert_relative_eq!(hits[0].distance, 7.5, epsilon = 1e-9);
    }

    #[test]
    fn test_pick_and_cycle_through_stack() {
        let scene = stacked_scene();
        let camera = top_down_camera();
        let clock = ManualClock::new();
        let mut resolver = resolver();
        let pointer = PointerState::new(800, 800).at(400.0, 400.0);

        let mut picked = Vec::new();
        for _ in 0..4 {
            clock.advance(Duration::from_millis(500));
            picked.push(resolver.pick_and_cycle(&scene, &camera, &pointer, clock.now()).and_then(|h| h.entity()));
        }
        assert_eq!(
            picked,
            vec![Some(EntityId(4)), Some(EntityId(3)), Some(EntityId(2)), Some(EntityId(4))]
        );

        clock.advance(Duration::from_secs(6));
        let after_timeout = resolver.pick_and_cycle(&scene, &camera, &pointer, clock.now());
        assert_eq!(after_timeout.and_then(|h| h.entity()), Some(EntityId(4)));

        let moved = PointerState::new(800, 800).at(410.0, 400.0);
        resolver.pick_and_cycle(&scene, &camera, &pointer, clock.now());
        let after_move = resolver.pick_and_cycle(&scene, &camera, &moved, clock.now());
        assert_eq!(after_move.and_then(|h| h.entity()), Some(EntityId(4)));
    }
}
