//! Scene management
//!
//! The [`Scene`] owns the three views of the editor's world and keeps them in
//! step:
//!
//! ```text
//! EntityStore (logical hierarchy)
//!      ↓ add/remove/apply
//! WrapperMap  (bounds + node handles per entity)
//!      ↓
//! RenderGraph (transform nodes, model nodes, geometry)
//! ```
//!
//! Collision and picking never cache wrappers. They receive the scene on
//! every call and look wrappers up by id, so removals between gestures are
//! always observed.

pub mod entity;
pub mod scene_graph;
pub mod transform_resolver;
pub mod wrapper;

pub use entity::{Entity, EntityFlags, EntityId, EntityKind, EntityStore, ZoneKind};
pub use scene_graph::{Mesh, NodeKey, NodeKind, PrimitiveEncoding, RenderGraph, RenderNode};
pub use transform_resolver::TransformResolver;
pub use wrapper::{EntityWrapper, WrapperMap};

use crate::commands::{Command, CommandKind};
use crate::error::{EditError, EditResult};
use crate::foundation::math::{axis_angle_from_quat, Mat4, Quat, Real, Vec3, DEGENERATE_LENGTH};
use crate::physics::bounds::OrientedBoundingBox;
use std::collections::HashSet;

/// Placement of a segment box fitted between two endpoints
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPlacement {
    /// Box centre in the segmentable's frame
    pub position: [f64; 3],
    /// Rotation about +Z aligning local X with the segment
    pub rotation: [f32; 4],
    /// Length, thickness, height
    pub size: [f32; 3],
}

/// Fit a segment box between `start` and `end` (vertex positions in the
/// segmentable's frame). `None` when the endpoints coincide.
#[allow(clippy::cast_possible_truncation)]
pub fn segment_placement(start: &Vec3, end: &Vec3, thickness: f32, height: f32) -> Option<SegmentPlacement> {
    let span = end - start;
    let length = span.xy().norm();
    if length <= DEGENERATE_LENGTH {
        return None;
    }
    let mid = (start + end) * 0.5;
    let angle = span.y.atan2(span.x);
    Some(SegmentPlacement {
        position: [mid.x, mid.y, mid.z + Real::from(height) * 0.5],
        rotation: [0.0, 0.0, 1.0, angle as f32],
        size: [length as f32, thickness, height],
    })
}

/// Entities, their wrappers and the render graph behind them
#[derive(Debug, Clone)]
pub struct Scene {
    entities: EntityStore,
    graph: RenderGraph,
    wrappers: WrapperMap,
    root: NodeKey,
    selection: Vec<EntityId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene with a bare root node
    pub fn new() -> Self {
        let mut graph = RenderGraph::new();
        let root = graph.add_group(None);
        Self {
            entities: EntityStore::new(),
            graph,
            wrappers: WrapperMap::new(),
            root,
            selection: Vec::new(),
        }
    }

    /// Logical entity store
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Render graph
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    /// Wrapper lookup
    pub fn wrappers(&self) -> &WrapperMap {
        &self.wrappers
    }

    /// Root node of the render graph
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Currently selected entities
    pub fn selection(&self) -> &[EntityId] {
        &self.selection
    }

    /// Look up an entity
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Look up a wrapper
    pub fn wrapper(&self, id: EntityId) -> Option<&EntityWrapper> {
        self.wrappers.get(id)
    }

    /// Reserve an id for an entity that will be added later
    pub fn allocate_id(&mut self) -> EntityId {
        self.entities.allocate_id()
    }

    /// Transform node an entity's children hang under (the root for roots)
    fn parent_node(&self, parent: Option<EntityId>) -> EditResult<NodeKey> {
        match parent {
            Some(parent) => Ok(self.wrappers.require(parent)?.transform_node()),
            None => Ok(self.root),
        }
    }

    /// Add an entity and build its wrapper.
    ///
    /// The parent must already be in the scene.
    pub fn add_entity(&mut self, entity: Entity) -> EditResult<EntityId> {
        let id = entity.id();
        if self.entities.contains(id) {
            return Err(EditError::DuplicateEntity(id));
        }
        let parent_node = self.parent_node(entity.parent())?;

        let transform_node = self.graph.add_group(Some(placement_matrix(&entity)));
        let model_node = self
            .graph
            .add_group(Some(Mat4::new_nonuniform_scaling(&entity.scale_vec())));
        self.graph.attach(transform_node, model_node)?;
        self.graph.attach(parent_node, transform_node)?;

        let bounds = OrientedBoundingBox::from_size(entity.size_vec(), entity.scale_vec());
        if let Err(error) = self.entities.insert(entity) {
            self.graph.remove(transform_node);
            return Err(error);
        }

        let mut wrapper = EntityWrapper::new(id, transform_node, Some(model_node), bounds);
        wrapper.refresh_world_transform(&self.graph);
        self.wrappers.insert(wrapper);
        log::debug!("Added entity {}", id);
        Ok(id)
    }

    /// Remove an entity, its subtree and their wrappers
    pub fn remove_entity(&mut self, id: EntityId) -> Vec<Entity> {
        let removed = self.entities.remove(id);
        for entity in &removed {
            if let Some(wrapper) = self.wrappers.remove(entity.id()) {
                self.graph.remove(wrapper.transform_node());
            }
        }
        self.selection.retain(|selected| removed.iter().all(|e| e.id() != *selected));
        log::debug!("Removed entity {} ({} total)", id, removed.len());
        removed
    }

    /// Attach geometry under an entity's model node
    pub fn set_geometry(&mut self, id: EntityId, mesh: Mesh) -> EditResult<NodeKey> {
        let shape = self.graph.add_shape(mesh);
        if let Err(error) = self.attach_to_model(id, shape) {
            self.graph.remove(shape);
            return Err(error);
        }
        Ok(shape)
    }

    /// Attach an existing (shared) subgraph under an entity's model node
    pub fn add_instance(&mut self, id: EntityId, node: NodeKey) -> EditResult<()> {
        self.attach_to_model(id, node)
    }

    /// Add a free-standing node (for subgraphs shared between entities)
    pub fn add_detached_group(&mut self, transform: Option<Mat4>) -> NodeKey {
        self.graph.add_group(transform)
    }

    /// Add a free-standing shape under `parent`
    pub fn add_shape_under(&mut self, parent: NodeKey, mesh: Mesh) -> EditResult<NodeKey> {
        let shape = self.graph.add_shape(mesh);
        self.graph.attach(parent, shape)?;
        Ok(shape)
    }

    fn attach_to_model(&mut self, id: EntityId, node: NodeKey) -> EditResult<()> {
        let wrapper = self.wrappers.get_mut(id).ok_or(EditError::MissingWrapper(id))?;
        let model_node = match wrapper.model_node() {
            Some(model) => model,
            None => {
                let scale = self.entities.require(id)?.scale_vec();
                let model = self.graph.add_group(Some(Mat4::new_nonuniform_scaling(&scale)));
                self.graph.attach(wrapper.transform_node(), model)?;
                wrapper.set_model_node(Some(model));
                model
            }
        };
        self.graph.attach(model_node, node)
    }

    /// Push an entity's placement into its wrapper and render nodes, then
    /// refresh cached world transforms of its subtree.
    pub fn update_entity_transform(&mut self, id: EntityId) -> EditResult<()> {
        let entity = self.entities.require(id)?;
        let placement = placement_matrix(entity);
        let scale = entity.scale_vec();
        let bounds = OrientedBoundingBox::from_size(entity.size_vec(), scale);

        let wrapper = self.wrappers.get_mut(id).ok_or(EditError::MissingWrapper(id))?;
        self.graph.set_transform(wrapper.transform_node(), Some(placement))?;
        if let Some(model) = wrapper.model_node() {
            self.graph
                .set_transform(model, Some(Mat4::new_nonuniform_scaling(&scale)))?;
        }
        wrapper.set_bounds(bounds);
        self.refresh_subtree(id);
        Ok(())
    }

    /// Recompute cached world transforms for `id` and its descendants
    pub fn refresh_subtree(&mut self, id: EntityId) {
        for member in self.entities.descendants_inclusive(id) {
            if let Some(wrapper) = self.wrappers.get_mut(member) {
                wrapper.refresh_world_transform(&self.graph);
            }
        }
    }

    /// Current world bounds of an entity
    pub fn world_bounds(&self, id: EntityId) -> EditResult<OrientedBoundingBox> {
        Ok(self.wrappers.require(id)?.world_bounds())
    }

    /// Snapshot every entity's placement as its gesture starting values
    pub fn begin_gesture(&mut self, ids: &[EntityId]) {
        for id in ids {
            if let Some(entity) = self.entities.get_mut(*id) {
                entity.begin_gesture();
            }
        }
    }

    /// Apply a command to entity data and refresh affected wrappers.
    ///
    /// Durable commands also commit the new placement as the starting
    /// values for the next gesture. A `Multi` is checked as a whole first:
    /// if any part would fail, nothing is changed.
    pub fn apply(&mut self, command: &Command) -> EditResult<()> {
        self.check_applicable(command, &mut HashSet::new())?;
        self.commit(command)
    }

    /// Fail if `command` targets an entity that neither exists nor is added
    /// earlier in the same batch, or adds an id that is already taken.
    fn check_applicable(&self, command: &Command, pending: &mut HashSet<EntityId>) -> EditResult<()> {
        let known = |id: EntityId, pending: &HashSet<EntityId>| self.entities.contains(id) || pending.contains(&id);
        match &command.kind {
            CommandKind::Move { entity, .. } | CommandKind::Rotate { entity, .. } | CommandKind::Scale { entity, .. } => {
                known(*entity, pending).then_some(()).ok_or(EditError::MissingEntity(*entity))
            }
            CommandKind::ChangeThickness { segment, .. } | CommandKind::AlignSegment { segment, .. } => {
                known(*segment, pending).then_some(()).ok_or(EditError::MissingEntity(*segment))
            }
            CommandKind::Add { entity } => {
                let id = entity.id();
                if known(id, pending) {
                    return Err(EditError::DuplicateEntity(id));
                }
                if let Some(parent) = entity.parent() {
                    if !known(parent, pending) {
                        return Err(EditError::MissingWrapper(parent));
                    }
                }
                pending.insert(id);
                Ok(())
            }
            CommandKind::Select { .. } => Ok(()),
            CommandKind::Multi(parts) => parts.iter().try_for_each(|part| self.check_applicable(part, pending)),
        }
    }

    fn commit(&mut self, command: &Command) -> EditResult<()> {
        self.apply_kind(command)?;
        if !command.transient {
            self.begin_gesture(&command.affected_entities());
        }
        Ok(())
    }

    fn apply_kind(&mut self, command: &Command) -> EditResult<()> {
        match &command.kind {
            CommandKind::Move { entity, position } => {
                self.entity_mut(*entity)?.position = *position;
                self.update_entity_transform(*entity)
            }
            CommandKind::Rotate { entity, rotation } => {
                self.entity_mut(*entity)?.rotation = *rotation;
                self.update_entity_transform(*entity)
            }
            CommandKind::Scale { entity, scale } => {
                self.entity_mut(*entity)?.scale = *scale;
                self.update_entity_transform(*entity)
            }
            CommandKind::Add { entity } => self.add_entity(entity.as_ref().clone()).map(|_| ()),
            CommandKind::Select { entities } => {
                self.selection = entities
                    .iter()
                    .copied()
                    .filter(|id| self.entities.contains(*id))
                    .collect();
                Ok(())
            }
            CommandKind::ChangeThickness { segment, thickness } => {
                let entity = self.entity_mut(*segment)?;
                if let EntityKind::Segment { thickness: current, .. } = &mut entity.kind {
                    *current = *thickness;
                }
                entity.size[1] = *thickness;
                self.update_entity_transform(*segment)
            }
            CommandKind::AlignSegment {
                segment,
                position,
                rotation,
                size,
            } => {
                let entity = self.entity_mut(*segment)?;
                entity.position = *position;
                entity.rotation = *rotation;
                entity.size = *size;
                self.update_entity_transform(*segment)
            }
            CommandKind::Multi(parts) => parts.iter().try_for_each(|part| self.commit(part)),
        }
    }

    fn entity_mut(&mut self, id: EntityId) -> EditResult<&mut Entity> {
        self.entities.get_mut(id).ok_or(EditError::MissingEntity(id))
    }
}

/// `T(position) * R(rotation)` for an entity's transform node
fn placement_matrix(entity: &Entity) -> Mat4 {
    Mat4::new_translation(&entity.position_vec()) * entity.rotation_quat().to_homogeneous()
}

/// Axis-angle rotation about +Z, in entity layout
pub fn rotation_about_z(angle: Real) -> [f32; 4] {
    axis_angle_from_quat(&Quat::from_axis_angle(&Vec3::z_axis(), angle))
}
