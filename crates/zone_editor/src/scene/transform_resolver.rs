//! Transform resolution across the render graph
//!
//! Transforms are recomputed on every query since the scene mutates every
//! frame. When a node has been attached under several parents, the walk
//! always follows the first registered one.

use crate::error::{EditError, EditResult};
use crate::foundation::math::Mat4;
use crate::scene::scene_graph::{NodeKey, RenderGraph};

/// Resolves accumulated transforms by walking parent links
#[derive(Debug, Clone, Copy)]
pub struct TransformResolver<'g> {
    graph: &'g RenderGraph,
}

impl<'g> TransformResolver<'g> {
    /// Create a resolver over `graph`
    pub fn new(graph: &'g RenderGraph) -> Self {
        Self { graph }
    }

    /// Product of all local transforms from the root down to and including `node`
    pub fn world_transform(&self, node: NodeKey) -> Mat4 {
        self.accumulate(node, None).0
    }

    /// Product of the local transforms of `from` and its ancestors strictly
    /// below `to`.
    ///
    /// Identity when `from == to`. If `to` is not an ancestor of `from`, the
    /// walk runs to the root and the full world transform is returned.
    pub fn transform(&self, from: NodeKey, to: NodeKey) -> Mat4 {
        let (matrix, reached) = self.accumulate(from, Some(to));
        if !reached {
            log::debug!("Transform target is not an ancestor; using world transform");
        }
        matrix
    }

    /// Like [`transform`](Self::transform), failing when either node is gone
    pub fn transform_checked(&self, from: NodeKey, to: NodeKey) -> EditResult<Mat4> {
        if !self.graph.contains(from) || !self.graph.contains(to) {
            return Err(EditError::MissingNode);
        }
        Ok(self.transform(from, to))
    }

    fn accumulate(&self, from: NodeKey, stop: Option<NodeKey>) -> (Mat4, bool) {
        let mut matrix = Mat4::identity();
        let mut current = Some(from);
        // A well-formed graph never revisits a node on one parent walk.
        let mut remaining = self.graph.len() + 1;

        while let Some(key) = current {
            if Some(key) == stop {
                return (matrix, true);
            }
            if remaining == 0 {
                log::warn!("Parent cycle detected while resolving a transform");
                break;
            }
            remaining -= 1;

            let Some(node) = self.graph.get(key) else {
                break;
            };
            if let Some(local) = node.local_transform() {
                matrix = local * matrix;
            }
            current = node.parents().first().copied();
        }
        (matrix, stop.is_none())
    }
}
