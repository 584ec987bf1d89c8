//! Spatial projection of entities
//!
//! Every entity in the scene has one [`EntityWrapper`]: its local bounds
//! plus the two render-graph nodes that place it. The transform node carries
//! `T(position) * R(rotation)` and parents child wrappers; the model node
//! carries `S(scale)` and parents the visual geometry.

use super::entity::EntityId;
use super::scene_graph::{NodeKey, RenderGraph};
use super::transform_resolver::TransformResolver;
use crate::error::{EditError, EditResult};
use crate::foundation::math::Mat4;
use crate::physics::bounds::OrientedBoundingBox;
use std::collections::HashMap;

/// Bounds and render-graph placement of one entity
#[derive(Debug, Clone)]
pub struct EntityWrapper {
    entity: EntityId,
    transform_node: NodeKey,
    model_node: Option<NodeKey>,
    bounds: OrientedBoundingBox,
    world_transform: Mat4,
}

impl EntityWrapper {
    /// Create a wrapper; the world transform starts as identity until refreshed
    pub fn new(
        entity: EntityId,
        transform_node: NodeKey,
        model_node: Option<NodeKey>,
        bounds: OrientedBoundingBox,
    ) -> Self {
        Self {
            entity,
            transform_node,
            model_node,
            bounds,
            world_transform: Mat4::identity(),
        }
    }

    /// Wrapped entity
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Node holding translation and rotation
    pub fn transform_node(&self) -> NodeKey {
        self.transform_node
    }

    /// Node holding scale and geometry; absent while a model is pending
    pub fn model_node(&self) -> Option<NodeKey> {
        self.model_node
    }

    /// Attach or clear the geometry node
    pub fn set_model_node(&mut self, node: Option<NodeKey>) {
        self.model_node = node;
    }

    /// Scaled bounds in the entity's own frame
    pub fn local_bounds(&self) -> &OrientedBoundingBox {
        &self.bounds
    }

    /// Replace the local bounds after a size or scale change
    pub fn set_bounds(&mut self, bounds: OrientedBoundingBox) {
        self.bounds = bounds;
    }

    /// Cached world transform of the transform node
    pub fn world_transform(&self) -> &Mat4 {
        &self.world_transform
    }

    /// Recompute the cached world transform
    pub fn refresh_world_transform(&mut self, graph: &RenderGraph) {
        self.world_transform = TransformResolver::new(graph).world_transform(self.transform_node);
    }

    /// Local bounds placed by the cached world transform
    pub fn world_bounds(&self) -> OrientedBoundingBox {
        self.bounds.transformed(&self.world_transform)
    }
}

/// Entity id to wrapper lookup
#[derive(Debug, Default, Clone)]
pub struct WrapperMap {
    wrappers: HashMap<EntityId, EntityWrapper>,
}

impl WrapperMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a wrapper, replacing any previous one for the same entity
    pub fn insert(&mut self, wrapper: EntityWrapper) -> Option<EntityWrapper> {
        self.wrappers.insert(wrapper.entity, wrapper)
    }

    /// Drop the wrapper for `id`
    pub fn remove(&mut self, id: EntityId) -> Option<EntityWrapper> {
        self.wrappers.remove(&id)
    }

    /// Look up a wrapper
    pub fn get(&self, id: EntityId) -> Option<&EntityWrapper> {
        self.wrappers.get(&id)
    }

    /// Look up a wrapper mutably
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityWrapper> {
        self.wrappers.get_mut(&id)
    }

    /// Look up a wrapper, failing with [`EditError::MissingWrapper`]
    pub fn require(&self, id: EntityId) -> EditResult<&EntityWrapper> {
        self.get(id).ok_or(EditError::MissingWrapper(id))
    }

    /// Whether a wrapper is registered for `id`
    pub fn contains(&self, id: EntityId) -> bool {
        self.wrappers.contains_key(&id)
    }

    /// Number of wrappers
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// Iterate over all wrappers
    pub fn values(&self) -> impl Iterator<Item = &EntityWrapper> {
        self.wrappers.values()
    }

    /// Iterate mutably over all wrappers
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut EntityWrapper> {
        self.wrappers.values_mut()
    }
}
