//! Logical entity model
//!
//! Entities are the editor's document: ids, hierarchy, placement and type
//! classification. Spatial data derived from them (bounds, world transforms)
//! lives in [`EntityWrapper`](super::EntityWrapper).

use crate::error::{EditError, EditResult};
use crate::foundation::math::{quat_from_axis_angle, vec3_from_f32, Quat, Vec3};
use bitflags::bitflags;
use std::collections::HashMap;
use std::fmt;

/// Unique entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Orientation class of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Horizontal zone; entities rest on it and stack along +Z
    Floor,
    /// Vertical zone; entities embed into it along its normal
    Wall,
}

impl ZoneKind {
    /// Plane normal in the zone's own frame
    pub fn normal(self) -> Vec3 {
        match self {
            Self::Floor => Vec3::z(),
            Self::Wall => -Vec3::y(),
        }
    }

    /// Direction device-space "up" maps to in the zone's frame
    pub fn up(self) -> Vec3 {
        match self {
            Self::Floor => Vec3::y(),
            Self::Wall => Vec3::z(),
        }
    }

    /// Direction device-space "right" maps to in the zone's frame
    pub fn right(self) -> Vec3 {
        Vec3::x()
    }
}

/// Type classification of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityKind {
    /// Scene partition acting as a collision container
    Zone(ZoneKind),
    /// Ordinary positionable entity
    Model,
    /// Container for vertices and segments (a wall run)
    Segmentable,
    /// 2D-constrained point used by segments; its elevation never changes
    Vertex,
    /// Edge between two vertex entities
    Segment {
        /// First endpoint
        start: EntityId,
        /// Second endpoint
        end: EntityId,
        /// Extent perpendicular to the segment in the zone plane
        thickness: f32,
    },
}

bitflags! {
    /// Capabilities an entity takes part in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityFlags: u32 {
        /// Can be hit by pointer picks
        const PICKABLE = 0b0001;
        /// Takes part in zone collision checks
        const COLLIDABLE = 0b0010;
    }
}

impl Default for EntityFlags {
    fn default() -> Self {
        Self::PICKABLE | Self::COLLIDABLE
    }
}

/// A node in the world's logical hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    parent: Option<EntityId>,
    children: Vec<EntityId>,

    /// Type classification
    pub kind: EntityKind,

    /// Capability flags
    pub flags: EntityFlags,

    /// Box centre in the parent's frame
    pub position: [f64; 3],

    /// Axis-angle rotation `[x, y, z, radians]`
    pub rotation: [f32; 4],

    /// Per-axis scale
    pub scale: [f32; 3],

    /// Local unscaled bounding dimensions
    pub size: [f32; 3],

    /// Position captured at gesture start
    pub starting_position: [f64; 3],

    /// Rotation captured at gesture start
    pub starting_rotation: [f32; 4],

    /// Scale captured at gesture start
    pub starting_scale: [f32; 3],
}

impl Entity {
    /// Create an entity at the origin with unit size and scale
    pub fn new(id: EntityId, kind: EntityKind) -> Self {
        Self {
            id,
            parent: None,
            children: Vec::new(),
            kind,
            flags: EntityFlags::default(),
            position: [0.0; 3],
            rotation: [0.0, 0.0, 1.0, 0.0],
            scale: [1.0; 3],
            size: [1.0; 3],
            starting_position: [0.0; 3],
            starting_rotation: [0.0, 0.0, 1.0, 0.0],
            starting_scale: [1.0; 3],
        }
    }

    /// Builder pattern: set the parent
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Builder pattern: set position (also becomes the starting position)
    pub fn with_position(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self.starting_position = position;
        self
    }

    /// Builder pattern: set rotation (also becomes the starting rotation)
    pub fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self.starting_rotation = rotation;
        self
    }

    /// Builder pattern: set scale (also becomes the starting scale)
    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self.starting_scale = scale;
        self
    }

    /// Builder pattern: set size
    pub fn with_size(mut self, size: [f32; 3]) -> Self {
        self.size = size;
        self
    }

    /// Builder pattern: set flags
    pub fn with_flags(mut self, flags: EntityFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Entity id
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Parent id, `None` for roots
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Ordered children
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Whether this entity is a zone
    pub fn is_zone(&self) -> bool {
        matches!(self.kind, EntityKind::Zone(_))
    }

    /// Whether this entity is a vertex
    pub fn is_vertex(&self) -> bool {
        matches!(self.kind, EntityKind::Vertex)
    }

    /// Whether this entity is a segment
    pub fn is_segment(&self) -> bool {
        matches!(self.kind, EntityKind::Segment { .. })
    }

    /// Zone orientation class, `None` for non-zones
    pub fn zone_kind(&self) -> Option<ZoneKind> {
        match self.kind {
            EntityKind::Zone(kind) => Some(kind),
            _ => None,
        }
    }

    /// Position as a vector
    pub fn position_vec(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Starting position as a vector
    pub fn starting_position_vec(&self) -> Vec3 {
        Vec3::from(self.starting_position)
    }

    /// Rotation as a quaternion
    pub fn rotation_quat(&self) -> Quat {
        quat_from_axis_angle(self.rotation)
    }

    /// Starting rotation as a quaternion
    pub fn starting_rotation_quat(&self) -> Quat {
        quat_from_axis_angle(self.starting_rotation)
    }

    /// Scale as a vector
    pub fn scale_vec(&self) -> Vec3 {
        vec3_from_f32(self.scale)
    }

    /// Size as a vector
    pub fn size_vec(&self) -> Vec3 {
        vec3_from_f32(self.size)
    }

    /// Scaled height along local Z
    pub fn scaled_height(&self) -> f64 {
        f64::from(self.scale[2]) * f64::from(self.size[2])
    }

    /// Snapshot current placement as the gesture's starting values
    pub fn begin_gesture(&mut self) {
        self.starting_position = self.position;
        self.starting_rotation = self.rotation;
        self.starting_scale = self.scale;
    }
}

/// Store of all entities, keyed by id
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
    roots: Vec<EntityId>,
    next_id: u32,
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id greater than any id seen so far
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Id the next [`allocate_id`](Self::allocate_id) would return
    pub fn next_id(&self) -> EntityId {
        EntityId(self.next_id)
    }

    /// Insert an entity, attaching it to its parent's children.
    ///
    /// Fails with [`EditError::DuplicateEntity`] if the id is taken.
    pub fn insert(&mut self, entity: Entity) -> EditResult<()> {
        let id = entity.id;
        if self.entities.contains_key(&id) {
            return Err(EditError::DuplicateEntity(id));
        }
        match entity.parent {
            Some(parent) => {
                let parent_entity = self
                    .entities
                    .get_mut(&parent)
                    .ok_or(EditError::MissingEntity(parent))?;
                parent_entity.children.push(id);
            }
            None => self.roots.push(id),
        }
        self.next_id = self.next_id.max(id.0 + 1);
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Remove an entity and its subtree, returning the removed entities
    /// in pre-order.
    pub fn remove(&mut self, id: EntityId) -> Vec<Entity> {
        let order = self.descendants_inclusive(id);
        if let Some(parent) = self.entities.get(&id).and_then(Entity::parent) {
            if let Some(parent_entity) = self.entities.get_mut(&parent) {
                parent_entity.children.retain(|child| *child != id);
            }
        } else {
            self.roots.retain(|root| *root != id);
        }
        order
            .into_iter()
            .filter_map(|entity| self.entities.remove(&entity))
            .collect()
    }

    /// Look up an entity
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up an entity mutably
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Look up an entity, failing with [`EditError::MissingEntity`]
    pub fn require(&self, id: EntityId) -> EditResult<&Entity> {
        self.get(id).ok_or(EditError::MissingEntity(id))
    }

    /// Whether the store holds `id`
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Ordered children of `id` (empty if unknown)
    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.entities.get(&id).map_or(&[][..], Entity::children)
    }

    /// Root entities in insertion order
    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// `id` followed by all of its descendants in pre-order
    pub fn descendants_inclusive(&self, id: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(entity) = self.entities.get(&current) {
                order.push(current);
                stack.extend(entity.children.iter().rev());
            }
        }
        order
    }

    /// Segments among the vertex's siblings that use it as an endpoint
    pub fn segments_using(&self, vertex: EntityId) -> Vec<EntityId> {
        let Some(parent) = self.get(vertex).and_then(Entity::parent) else {
            return Vec::new();
        };
        self.children(parent)
            .iter()
            .copied()
            .filter(|candidate| {
                matches!(
                    self.get(*candidate).map(|e| e.kind),
                    Some(EntityKind::Segment { start, end, .. }) if start == vertex || end == vertex
                )
            })
            .collect()
    }

    /// Nearest ancestor (inclusive) that is a zone
    pub fn enclosing_zone(&self, id: EntityId) -> Option<EntityId> {
        let mut current = Some(id);
        while let Some(candidate) = current {
            let entity = self.get(candidate)?;
            if entity.is_zone() {
                return Some(candidate);
            }
            current = entity.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_run() -> (EntityStore, EntityId, EntityId, EntityId, EntityId) {
        let mut store = EntityStore::new();
        let zone = EntityId(1);
        let run = EntityId(2);
        let v1 = EntityId(3);
        let v2 = EntityId(4);
        store.insert(Entity::new(zone, EntityKind::Zone(ZoneKind::Floor))).unwrap();
        store.insert(Entity::new(run, EntityKind::Segmentable).with_parent(zone)).unwrap();
        store.insert(Entity::new(v1, EntityKind::Vertex).with_parent(run)).unwrap();
        store.insert(Entity::new(v2, EntityKind::Vertex).with_parent(run)).unwrap();
        (store, zone, run, v1, v2)
    }

    #[test]
    fn test_insert_requires_parent() {
        let mut store = EntityStore::new();
        let orphan = Entity::new(EntityId(5), EntityKind::Model).with_parent(EntityId(9));
        assert_eq!(store.insert(orphan), Err(EditError::MissingEntity(EntityId(9))));
    }

    #[test]
    fn test_descendants_are_pre_order() {
        let (store, zone, run, v1, v2) = store_with_run();
        assert_eq!(store.descendants_inclusive(zone), vec![zone, run, v1, v2]);
    }

    #[test]
    fn test_remove_detaches_subtree() {
        let (mut store, zone, run, _, _) = store_with_run();
        let removed = store.remove(run);
        assert_eq!(removed.len(), 3);
        assert!(store.children(zone).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_segments_using_vertex() {
        let (mut store, _, run, v1, v2) = store_with_run();
        let segment = EntityId(10);
        store
            .insert(
                Entity::new(segment, EntityKind::Segment { start: v1, end: v2, thickness: 0.2 })
                    .with_parent(run),
            )
            .unwrap();
        assert_eq!(store.segments_using(v1), vec![segment]);
        assert_eq!(store.segments_using(run), Vec::<EntityId>::new());
    }

    #[test]
    fn test_enclosing_zone_and_allocation() {
        let (mut store, zone, _, v1, _) = store_with_run();
        assert_eq!(store.enclosing_zone(v1), Some(zone));
        assert_eq!(store.next_id(), EntityId(5));
        assert_eq!(store.allocate_id(), EntityId(5));
        assert_eq!(store.next_id(), EntityId(6));
    }

    #[test]
    fn test_insert_rejects_taken_id() {
        let (mut store, zone, run, v1, _) = store_with_run();
        let clash = Entity::new(v1, EntityKind::Model).with_parent(zone);
        assert_eq!(store.insert(clash), Err(EditError::DuplicateEntity(v1)));
        // The original vertex and the zone's children are untouched.
        assert_eq!(store.get(v1).unwrap().parent(), Some(run));
        assert_eq!(store.get(zone).unwrap().children().iter().filter(|c| **c == v1).count(), 0);
    }

    #[test]
    fn test_begin_gesture_snapshots_placement() {
        let mut entity = Entity::new(EntityId(1), EntityKind::Model).with_position([1.0, 2.0, 3.0]);
        entity.position = [4.0, 5.0, 6.0];
        assert_eq!(entity.starting_position, [1.0, 2.0, 3.0]);
        entity.begin_gesture();
        assert_eq!(entity.starting_position, [4.0, 5.0, 6.0]);
    }
}
