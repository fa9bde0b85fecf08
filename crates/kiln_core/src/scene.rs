//! Scene graph types.
//!
//! A [`SceneGraph`] is an arena of [`SceneNode`]s linked by [`NodeId`]
//! handles. Node 0 is always the root, named after the source document.
//! Meshes, materials and clips are shared through `Arc` so a graph can be
//! cloned per instance without copying geometry.

use std::sync::Arc;

use kiln_math::{Aabb, Mat4, Mat4Ext, Transform};

use crate::animation::AnimationClip;
use crate::collider::Collider;
use crate::material::Material;
use crate::mesh::MergedMesh;

/// Handle to a node inside one [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Skinning data for a mesh attachment.
#[derive(Clone, Debug)]
pub struct SkinBinding {
    /// glTF skin index
    pub skin: usize,

    /// Joint nodes, in joint order
    pub bones: Vec<NodeId>,

    /// Inverse bind matrix per joint (target convention)
    pub bind_poses: Arc<Vec<Mat4>>,

    /// Skeleton root, when the document names one
    pub root_bone: Option<NodeId>,
}

/// Geometry rendered at a node.
#[derive(Clone, Debug)]
pub struct MeshAttachment {
    pub mesh: Arc<MergedMesh>,

    /// One material per submesh
    pub materials: Vec<Arc<Material>>,

    /// Filled in once the whole hierarchy exists
    pub skin: Option<SkinBinding>,
}

/// A transform node.
#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,

    /// Local transform relative to the parent
    pub transform: Transform,

    pub parent: Option<NodeId>,

    pub children: Vec<NodeId>,

    /// Index of the glTF node this was built from (`None` for the root)
    pub source_index: Option<usize>,

    pub mesh: Option<MeshAttachment>,

    pub collider: Option<Collider>,
}

impl SceneNode {
    fn new(name: String, transform: Transform, parent: Option<NodeId>, source_index: Option<usize>) -> Self {
        Self {
            name,
            transform,
            parent,
            children: Vec::new(),
            source_index,
            mesh: None,
            collider: None,
        }
    }
}

/// A parented transform hierarchy plus the clips that animate it.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,

    /// Animation clips; the first one is the default clip
    pub animations: Vec<Arc<AnimationClip>>,
}

impl SceneGraph {
    /// Create a graph holding only a root node.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SceneNode::new(root_name.into(), Transform::IDENTITY, None, None)],
            animations: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a node under `parent` and return its handle.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: Transform,
        source_index: Option<usize>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(SceneNode::new(name.into(), transform, Some(parent), source_index));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.nodes[0].name
    }

    /// Nodes in depth-first order, parents before children, siblings in
    /// declaration order.
    pub fn iter(&self) -> DepthFirst<'_> {
        DepthFirst {
            graph: self,
            stack: vec![self.root()],
        }
    }

    /// `/`-joined names from `ancestor` (exclusive) down to `node`.
    ///
    /// If `ancestor` is not above `node`, the path runs to the root.
    pub fn relative_path(&self, node: NodeId, ancestor: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                break;
            }
            let n = self.node(id);
            names.push(n.name.as_str());
            current = n.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Path of `node` below the root.
    pub fn path(&self, node: NodeId) -> String {
        self.relative_path(node, self.root())
    }

    /// Resolve a path produced by [`path`](Self::path). The empty path is
    /// the root. Siblings with equal names resolve to the first.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root();
        if path.is_empty() {
            return Some(current);
        }
        for name in path.split('/') {
            current = *self
                .node(current)
                .children
                .iter()
                .find(|child| self.node(**child).name == name)?;
        }
        Some(current)
    }

    /// Node built from glTF node `index`.
    pub fn find_by_source_index(&self, index: usize) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.source_index == Some(index))
            .map(NodeId)
    }

    /// Local-to-world matrix.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        let local = node.transform.to_matrix();
        match node.parent {
            Some(parent) => self.world_matrix(parent) * local,
            None => local,
        }
    }

    /// Nodes that carry a mesh.
    pub fn mesh_nodes(&self) -> impl Iterator<Item = (NodeId, &MeshAttachment)> + '_ {
        self.iter()
            .filter_map(move |id| self.node(id).mesh.as_ref().map(|mesh| (id, mesh)))
    }

    /// Get total triangle count across all mesh nodes.
    pub fn total_triangle_count(&self) -> usize {
        self.mesh_nodes()
            .map(|(_, attachment)| attachment.mesh.triangle_count())
            .sum()
    }

    /// Compute the world-space bounding box of all meshes.
    pub fn world_bounds(&self) -> Aabb {
        self.mesh_nodes().fold(Aabb::empty(), |bounds, (id, attachment)| {
            if attachment.mesh.bounds.is_empty() {
                return bounds;
            }
            let world = self.world_matrix(id).transform_aabb(&attachment.mesh.bounds);
            bounds.union(&world)
        })
    }

    /// Clip played when nothing else is requested.
    pub fn default_clip(&self) -> Option<&Arc<AnimationClip>> {
        self.animations.first()
    }

    pub fn clip(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.animations.iter().find(|clip| clip.name == name)
    }
}

/// Depth-first node iterator, see [`SceneGraph::iter`].
pub struct DepthFirst<'a> {
    graph: &'a SceneGraph,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.graph.node(id).children.iter().rev().copied());
        Some(id)
    }
}
