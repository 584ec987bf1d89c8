//! Mesh-level intersection against render subgraphs
//!
//! Walks a render subgraph accumulating group transforms, decodes each shape's
//! triangles and tests them one by one. This is the precise follow-up to a
//! bounds hit; drag feedback stays on bounds-only tests.

use super::bounds::OrientedBoundingBox;
use super::collision::Ray;
use crate::foundation::math::{Mat4, Real};
use crate::scene::scene_graph::{Mesh, NodeKey, NodeKind, RenderGraph};
use crate::scene::transform_resolver::TransformResolver;

/// Deepest group nesting followed before giving up on a subgraph
const MAX_DEPTH: usize = 64;

/// Triangle-level queries over a render graph
#[derive(Debug, Clone, Copy)]
pub struct TriangleIntersector<'g> {
    graph: &'g RenderGraph,
}

impl<'g> TriangleIntersector<'g> {
    /// Create an intersector over `graph`
    pub fn new(graph: &'g RenderGraph) -> Self {
        Self { graph }
    }

    fn parent_world(&self, node: NodeKey) -> Mat4 {
        self.graph.first_parent(node).map_or_else(Mat4::identity, |parent| {
            TransformResolver::new(self.graph).world_transform(parent)
        })
    }

    /// Whether any triangle under `node` intersects the world-space `bounds`
    pub fn intersects(&self, bounds: &OrientedBoundingBox, node: NodeKey, use_epsilon: bool) -> bool {
        let base = self.parent_world(node);
        self.intersects_from(bounds, node, &base, use_epsilon)
    }

    /// Like [`intersects`](Self::intersects) with an explicit frame for the
    /// node's parent
    pub fn intersects_from(
        &self,
        bounds: &OrientedBoundingBox,
        node: NodeKey,
        parent_matrix: &Mat4,
        use_epsilon: bool,
    ) -> bool {
        self.descend(node, parent_matrix, 0, &mut |matrix, mesh| {
            let result = mesh.visit_triangles(|triangle| {
                let world = triangle.transformed(matrix);
                bounds.intersects_triangle(&world.v0, &world.v1, &world.v2, use_epsilon)
            });
            result.unwrap_or_else(|error| {
                log::debug!("Skipping shape in intersection test: {}", error);
                false
            })
        })
    }

    /// Distance to the nearest triangle under `node` hit by `ray`
    pub fn intersect_ray(&self, ray: &Ray, node: NodeKey) -> Option<Real> {
        let base = self.parent_world(node);
        let mut nearest: Option<Real> = None;
        self.descend(node, &base, 0, &mut |matrix, mesh| {
            let result = mesh.visit_triangles(|triangle| {
                if let Some(t) = triangle.transformed(matrix).intersect_ray(ray) {
                    nearest = Some(nearest.map_or(t, |best| best.min(t)));
                }
                false
            });
            if let Err(error) = result {
                log::debug!("Skipping shape in ray test: {}", error);
            }
            false
        });
        nearest
    }

    /// Depth-first walk calling `visit` per shape with its world matrix;
    /// stops as soon as `visit` returns `true`.
    fn descend<F>(&self, node: NodeKey, parent_matrix: &Mat4, depth: usize, visit: &mut F) -> bool
    where
        F: FnMut(&Mat4, &Mesh) -> bool,
    {
        if depth > MAX_DEPTH {
            log::warn!("Render subgraph deeper than {} levels; truncating", MAX_DEPTH);
            return false;
        }
        let Some(render_node) = self.graph.get(node) else {
            return false;
        };
        match &render_node.kind {
            NodeKind::Group { transform } => {
                let matrix = transform.map_or(*parent_matrix, |local| parent_matrix * local);
                render_node
                    .children()
                    .iter()
                    .any(|child| self.descend(*child, &matrix, depth + 1, visit))
            }
            NodeKind::Shape(mesh) => visit(parent_matrix, mesh),
        }
    }
}
