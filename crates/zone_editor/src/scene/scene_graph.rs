//! Render scene graph
//!
//! The spatial projection of the scene that picking and triangle tests walk.
//! Nodes live in a slotmap arena; a node may be attached under several
//! parents, which is how instanced (shared) subgraphs are expressed.

use crate::error::{EditError, EditResult};
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::physics::collision::Triangle;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a node in the [`RenderGraph`]
    pub struct NodeKey;
}

/// How a mesh's vertex data is assembled into primitives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveEncoding {
    /// Index triplets into the shared vertex pool
    IndexedTriangles {
        /// Vertex indices, three per triangle
        indices: Vec<u32>,
        /// Number of valid entries in `indices`
        index_count: usize,
    },
    /// Consecutive vertex triplets
    Triangles,
    /// Strips of consecutive vertices, one length per strip
    TriangleStrips {
        /// Vertex count of each strip
        strip_counts: Vec<usize>,
    },
    /// Triangle fans (not decoded by the intersector)
    TriangleFans {
        /// Vertex count of each fan
        fan_counts: Vec<usize>,
    },
    /// Line segments (no area)
    Lines,
    /// Points (no area)
    Points,
}

impl PrimitiveEncoding {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::IndexedTriangles { .. } => "indexed triangles",
            Self::Triangles => "triangles",
            Self::TriangleStrips { .. } => "triangle strips",
            Self::TriangleFans { .. } => "triangle fans",
            Self::Lines => "lines",
            Self::Points => "points",
        }
    }
}

/// Mesh primitive data
///
/// `vertex_count` is the number of valid vertices, which may be smaller than
/// the allocated `vertices` so buffers can be reused between queries.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<Point3>,
    vertex_count: usize,
    encoding: PrimitiveEncoding,
}

impl Mesh {
    /// Create a mesh with an explicit encoding; every vertex is valid
    pub fn new(vertices: Vec<Point3>, encoding: PrimitiveEncoding) -> Self {
        let vertex_count = vertices.len();
        Self {
            vertices,
            vertex_count,
            encoding,
        }
    }

    /// Flat triangle list
    pub fn triangles(vertices: Vec<Point3>) -> Self {
        Self::new(vertices, PrimitiveEncoding::Triangles)
    }

    /// Indexed triangle list
    pub fn indexed(vertices: Vec<Point3>, indices: Vec<u32>) -> Self {
        let index_count = indices.len();
        Self::new(
            vertices,
            PrimitiveEncoding::IndexedTriangles {
                indices,
                index_count,
            },
        )
    }

    /// Triangle strips
    pub fn strips(vertices: Vec<Point3>, strip_counts: Vec<usize>) -> Self {
        Self::new(vertices, PrimitiveEncoding::TriangleStrips { strip_counts })
    }

    /// Axis-aligned box centred on the origin, as indexed triangles
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let vertices = vec![
            Point3::new(-h.x, -h.y, -h.z),
            Point3::new(h.x, -h.y, -h.z),
            Point3::new(h.x, h.y, -h.z),
            Point3::new(-h.x, h.y, -h.z),
            Point3::new(-h.x, -h.y, h.z),
            Point3::new(h.x, -h.y, h.z),
            Point3::new(h.x, h.y, h.z),
            Point3::new(-h.x, h.y, h.z),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // bottom
            4, 5, 6, 4, 6, 7, // top
            0, 1, 5, 0, 5, 4, // front
            2, 3, 7, 2, 7, 6, // back
            1, 2, 6, 1, 6, 5, // right
            3, 0, 4, 3, 4, 7, // left
        ];
        Self::indexed(vertices, indices)
    }

    /// Primitive encoding
    pub fn encoding(&self) -> &PrimitiveEncoding {
        &self.encoding
    }

    /// Valid vertices
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices[..self.vertex_count.min(self.vertices.len())]
    }

    /// Shrink the valid vertex (and index) range without reallocating
    pub fn set_valid_counts(&mut self, vertex_count: usize, index_count: Option<usize>) {
        self.vertex_count = vertex_count.min(self.vertices.len());
        if let (PrimitiveEncoding::IndexedTriangles { indices, index_count: count }, Some(n)) =
            (&mut self.encoding, index_count)
        {
            *count = n.min(indices.len());
        }
    }

    /// Visit every triangle until `visit` returns `true`.
    ///
    /// Returns `Ok(true)` if the visit short-circuited. Strip triangles
    /// alternate winding so every triangle keeps the strip's facing.
    pub fn visit_triangles<F>(&self, mut visit: F) -> EditResult<bool>
    where
        F: FnMut(&Triangle) -> bool,
    {
        let vertices = self.vertices();
        match &self.encoding {
            PrimitiveEncoding::IndexedTriangles {
                indices,
                index_count,
            } => {
                let valid = &indices[..(*index_count).min(indices.len())];
                for triplet in valid.chunks_exact(3) {
                    let corner = |i: u32| vertices.get(i as usize).copied();
                    let (Some(a), Some(b), Some(c)) =
                        (corner(triplet[0]), corner(triplet[1]), corner(triplet[2]))
                    else {
                        log::debug!("Skipping triangle with out-of-range index {:?}", triplet);
                        continue;
                    };
                    if visit(&Triangle::new(a, b, c)) {
                        return Ok(true);
                    }
                }
            }
            PrimitiveEncoding::Triangles => {
                for triplet in vertices.chunks_exact(3) {
                    if visit(&Triangle::new(triplet[0], triplet[1], triplet[2])) {
                        return Ok(true);
                    }
                }
            }
            PrimitiveEncoding::TriangleStrips { strip_counts } => {
                let mut offset: usize = 0;
                for &count in strip_counts {
                    let Some(end) = offset.checked_add(count).filter(|end| *end <= vertices.len()) else {
                        log::warn!(
                            "Triangle strip of {} vertices at offset {} exceeds {} valid vertices",
                            count,
                            offset,
                            vertices.len()
                        );
                        break;
                    };
                    let strip = &vertices[offset..end];
                    for i in 0..count.saturating_sub(2) {
                        let triangle = if i % 2 == 0 {
                            Triangle::new(strip[i], strip[i + 1], strip[i + 2])
                        } else {
                            Triangle::new(strip[i + 1], strip[i], strip[i + 2])
                        };
                        if visit(&triangle) {
                            return Ok(true);
                        }
                    }
                    offset = end;
                }
            }
            other => return Err(EditError::UnsupportedPrimitive(other.name())),
        }
        Ok(false)
    }
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Grouping node with an optional local transform
    Group {
        /// Local transform applied to all children
        transform: Option<Mat4>,
    },
    /// Leaf geometry
    Shape(Mesh),
}

/// A node in the render graph
#[derive(Debug, Clone)]
pub struct RenderNode {
    /// Payload
    pub kind: NodeKind,
    parents: Vec<NodeKey>,
    children: Vec<NodeKey>,
}

impl RenderNode {
    /// Parents in registration order
    pub fn parents(&self) -> &[NodeKey] {
        &self.parents
    }

    /// Children in attachment order
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    /// Local transform carried by this node, if any
    pub fn local_transform(&self) -> Option<&Mat4> {
        match &self.kind {
            NodeKind::Group { transform } => transform.as_ref(),
            NodeKind::Shape(_) => None,
        }
    }
}

/// Arena of render nodes
#[derive(Debug, Default, Clone)]
pub struct RenderGraph {
    nodes: SlotMap<NodeKey, RenderNode>,
}

impl RenderGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: NodeKind) -> NodeKey {
        self.nodes.insert(RenderNode {
            kind,
            parents: Vec::new(),
            children: Vec::new(),
        })
    }

    /// Add a detached group node
    pub fn add_group(&mut self, transform: Option<Mat4>) -> NodeKey {
        self.insert(NodeKind::Group { transform })
    }

    /// Add a detached shape node
    pub fn add_shape(&mut self, mesh: Mesh) -> NodeKey {
        self.insert(NodeKind::Shape(mesh))
    }

    /// Attach `child` under `parent`.
    ///
    /// Attaching an already-parented node registers an additional parent;
    /// the first registration stays the primary one.
    pub fn attach(&mut self, parent: NodeKey, child: NodeKey) -> EditResult<()> {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return Err(EditError::MissingNode);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            if !node.children.contains(&child) {
                node.children.push(child);
            }
        }
        if let Some(node) = self.nodes.get_mut(child) {
            if !node.parents.contains(&parent) {
                node.parents.push(parent);
            }
        }
        Ok(())
    }

    /// Detach `child` from `parent` only
    pub fn detach(&mut self, parent: NodeKey, child: NodeKey) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parents.retain(|p| *p != parent);
        }
    }

    /// Remove a node; children left without any parent are removed too.
    pub fn remove(&mut self, key: NodeKey) {
        let Some(node) = self.nodes.remove(key) else {
            return;
        };
        for parent in node.parents {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|c| *c != key);
            }
        }
        for child in node.children {
            let orphaned = self.nodes.get_mut(child).is_some_and(|child_node| {
                child_node.parents.retain(|p| *p != key);
                child_node.parents.is_empty()
            });
            if orphaned {
                self.remove(child);
            }
        }
    }

    /// Replace a group's local transform
    pub fn set_transform(&mut self, key: NodeKey, matrix: Option<Mat4>) -> EditResult<()> {
        match self.nodes.get_mut(key).map(|node| &mut node.kind) {
            Some(NodeKind::Group { transform }) => {
                *transform = matrix;
                Ok(())
            }
            Some(NodeKind::Shape(_)) => {
                log::warn!("Ignoring transform set on a shape node");
                Ok(())
            }
            None => Err(EditError::MissingNode),
        }
    }

    /// Look up a node
    pub fn get(&self, key: NodeKey) -> Option<&RenderNode> {
        self.nodes.get(key)
    }

    /// Whether the node exists
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// First registered parent
    pub fn first_parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|node| node.parents.first().copied())
    }

    /// Children of a node (empty if unknown)
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[][..], RenderNode::children)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
