//! Per-gesture snapshot
//!
//! Captured once when a gesture starts and never mutated afterwards. Every
//! handler invocation recomputes its result from this snapshot plus the
//! current event, so a drag never accumulates per-frame error.

use crate::error::{EditError, EditResult};
use crate::foundation::math::{vec3_from_f32, Mat4, Point3, Quat, Real, Vec2, Vec3};
use crate::input::{TrackerEvent, TrackerId};
use crate::picking::PickResult;
use crate::render::ViewFrustum;
use crate::scene::{EntityId, EntityKind, Scene, TransformResolver, ZoneKind};

/// Orthonormal frame of a zone plane, in the zone's own coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneOrientation {
    /// Plane normal; entities stack or embed along it
    pub normal: Vec3,
    /// Direction device-space up maps to
    pub up: Vec3,
    /// Direction device-space right maps to
    pub right: Vec3,
}

impl ZoneOrientation {
    /// Frame for a zone kind
    pub fn for_kind(kind: ZoneKind) -> Self {
        Self {
            normal: kind.normal(),
            up: kind.up(),
            right: kind.right(),
        }
    }

    /// Point or vector `right_amount` along right and `up_amount` along up
    pub fn in_plane(&self, right_amount: Real, up_amount: Real) -> Vec3 {
        self.right * right_amount + self.up * up_amount
    }

    /// Signed component of `v` along the normal
    pub fn normal_component(&self, v: &Vec3) -> Real {
        v.dot(&self.normal)
    }

    /// `v` with its normal component replaced by `value`
    pub fn with_normal_component(&self, v: &Vec3, value: Real) -> Vec3 {
        v - self.normal * self.normal_component(v) + self.normal * value
    }

    /// `v` projected onto the plane
    pub fn project(&self, v: &Vec3) -> Vec3 {
        self.with_normal_component(v, 0.0)
    }
}

impl From<ZoneKind> for ZoneOrientation {
    fn from(kind: ZoneKind) -> Self {
        Self::for_kind(kind)
    }
}

/// Starting placement of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    /// Entity id
    pub id: EntityId,
    /// Parent at gesture start
    pub parent: EntityId,
    /// Type at gesture start
    pub kind: EntityKind,
    /// Position in the parent's frame
    pub start_position: Vec3,
    /// Rotation in the parent's frame
    pub start_rotation: Quat,
    /// Per-axis scale
    pub start_scale: Vec3,
    /// Unscaled size
    pub size: Vec3,
    /// Children at gesture start
    pub children: Vec<EntityId>,
    /// Rigid map from the parent's frame into the zone frame
    pub parent_to_zone: Mat4,
}

impl EntitySnapshot {
    fn capture(scene: &Scene, zone: EntityId, id: EntityId) -> EditResult<Self> {
        let entity = scene.entities().require(id)?;
        if entity.is_zone() {
            return Err(EditError::MissingWrapper(id));
        }
        let parent = entity.parent().ok_or(EditError::MissingWrapper(id))?;
        let parent_node = scene.wrappers().require(parent)?.transform_node();
        let zone_node = scene.wrappers().require(zone)?.transform_node();
        let parent_to_zone = TransformResolver::new(scene.graph()).transform_checked(parent_node, zone_node)?;

        Ok(Self {
            id,
            parent,
            kind: entity.kind,
            start_position: entity.starting_position_vec(),
            start_rotation: entity.starting_rotation_quat(),
            start_scale: vec3_from_f32(entity.starting_scale),
            size: entity.size_vec(),
            children: entity.children().to_vec(),
            parent_to_zone,
        })
    }

    /// Starting centre in the zone frame
    pub fn zone_position(&self) -> Vec3 {
        self.parent_to_zone.transform_point(&self.start_position.into()).coords
    }

    /// Rotation of the parent frame relative to the zone
    pub fn parent_rotation(&self) -> Quat {
        Quat::from_matrix(&self.parent_to_zone.fixed_view::<3, 3>(0, 0).into_owned())
    }

    /// Starting rotation expressed in the zone frame
    pub fn zone_rotation(&self) -> Quat {
        self.parent_rotation() * self.start_rotation
    }

    /// Scaled extent per local axis at gesture start
    pub fn start_extent(&self) -> Vec3 {
        self.size.component_mul(&self.start_scale)
    }

    /// Map a zone-frame point into the parent's frame
    pub fn to_parent_point(&self, zone_point: &Vec3) -> EditResult<Vec3> {
        let inverse = self
            .parent_to_zone
            .try_inverse()
            .ok_or(EditError::DegenerateDirection("parent frame"))?;
        Ok(inverse.transform_point(&Point3::from(*zone_point)).coords)
    }

    /// Map a zone-frame direction into the parent's frame
    pub fn to_parent_vector(&self, zone_vector: &Vec3) -> Vec3 {
        self.parent_rotation().inverse_transform_vector(zone_vector)
    }
}

/// Immutable state of one tracker gesture
#[derive(Debug, Clone)]
pub struct ActionData {
    tracker: TrackerId,
    device_position: Vec2,
    world_position: Option<Point3>,
    zone: EntityId,
    zone_kind: ZoneKind,
    zone_world: Mat4,
    orientation: ZoneOrientation,
    frustum: ViewFrustum,
    snapshots: Vec<EntitySnapshot>,
    picks: Vec<PickResult>,
}

impl ActionData {
    /// Snapshot `entities` at the start of a gesture.
    ///
    /// Entities that cannot be snapshotted are logged and left out; handlers
    /// skip them.
    pub fn capture(
        scene: &Scene,
        zone: EntityId,
        zone_world: Mat4,
        tracker: TrackerId,
        event: &TrackerEvent,
        frustum: ViewFrustum,
        picks: Vec<PickResult>,
        entities: &[EntityId],
    ) -> EditResult<Self> {
        let kind = scene
            .entities()
            .require(zone)?
            .zone_kind()
            .ok_or(EditError::NoZone)?;

        let mut snapshots: Vec<EntitySnapshot> = Vec::with_capacity(entities.len());
        for &id in entities {
            if snapshots.iter().any(|s| s.id == id) {
                continue;
            }
            match EntitySnapshot::capture(scene, zone, id) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(error) => log::debug!("Entity {} not snapshotted: {}", id, error),
            }
        }

        Ok(Self {
            tracker,
            device_position: event.device_position,
            world_position: picks.first().map(|hit| hit.point),
            zone,
            zone_kind: kind,
            zone_world,
            orientation: kind.into(),
            frustum,
            snapshots,
            picks,
        })
    }

    /// Tracker driving the gesture
    pub fn tracker(&self) -> TrackerId {
        self.tracker
    }

    /// Pointer position (NDC) at gesture start
    pub fn device_position(&self) -> Vec2 {
        self.device_position
    }

    /// Nearest pick point at gesture start
    pub fn world_position(&self) -> Option<Point3> {
        self.world_position
    }

    /// Nearest pick point at gesture start, in the zone frame
    pub fn zone_world_position(&self) -> Option<Vec3> {
        self.world_to_zone(&self.world_position?)
    }

    /// Zone the gesture runs in
    pub fn zone(&self) -> EntityId {
        self.zone
    }

    /// Orientation class of the zone
    pub fn zone_kind(&self) -> ZoneKind {
        self.zone_kind
    }

    /// Zone world transform at gesture start
    pub fn zone_world(&self) -> &Mat4 {
        &self.zone_world
    }

    /// Zone plane frame
    pub fn orientation(&self) -> &ZoneOrientation {
        &self.orientation
    }

    /// Half-frustum used to scale device deltas
    pub fn frustum(&self) -> &ViewFrustum {
        &self.frustum
    }

    /// Picks at gesture start, nearest first
    pub fn picks(&self) -> &[PickResult] {
        &self.picks
    }

    /// All snapshots in capture order
    pub fn snapshots(&self) -> &[EntitySnapshot] {
        &self.snapshots
    }

    /// Snapshot of one entity
    pub fn snapshot(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots.iter().find(|s| s.id == id)
    }

    /// Whether `id` vanished or its children changed since the snapshot
    pub fn topology_changed(&self, scene: &Scene, id: EntityId) -> bool {
        match (self.snapshot(id), scene.entity(id)) {
            (Some(snapshot), Some(entity)) => {
                entity.parent() != Some(snapshot.parent) || entity.children() != snapshot.children.as_slice()
            }
            _ => true,
        }
    }

    /// Whether `id` is a snapshotted entity or lies beneath one
    pub fn covers(&self, scene: &Scene, id: EntityId) -> bool {
        let mut current = Some(id);
        while let Some(candidate) = current {
            if self.snapshot(candidate).is_some() {
                return true;
            }
            current = scene.entity(candidate).and_then(|e| e.parent());
        }
        false
    }

    /// Pointer travel since gesture start in NDC
    pub fn device_delta(&self, event: &TrackerEvent) -> Vec2 {
        event.device_position - self.device_position
    }

    /// Pointer travel mapped onto the zone plane (zone frame)
    pub fn zone_delta(&self, event: &TrackerEvent) -> Vec3 {
        let delta = self.device_delta(event);
        let (right, up) = self.frustum.scale_device_delta(delta.x, delta.y);
        self.orientation.in_plane(right, up)
    }

    /// Map a world point into the zone frame
    pub fn world_to_zone(&self, point: &Point3) -> Option<Vec3> {
        Some(self.zone_world.try_inverse()?.transform_point(point).coords)
    }
}
