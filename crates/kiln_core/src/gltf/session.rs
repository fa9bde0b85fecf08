//! Per-load decode state.
//!
//! A [`DecodeSession`] lives for exactly one document load. It owns the
//! buffer store and the memo tables that make meshes, materials, images,
//! bind poses and clips decode at most once per index. The assemblers in
//! the sibling modules are `impl` blocks on this type.

use std::collections::HashMap;
use std::sync::Arc;

use kiln_math::Mat4;

use crate::animation::AnimationClip;
use crate::buffer::BufferStore;
use crate::config::LoaderConfig;
use crate::gltf::parser::Document;
use crate::gltf::types::ColliderDef;
use crate::material::Material;
use crate::mesh::MergedMesh;
use crate::resolver::PathResolver;
use crate::scene::NodeId;
use crate::texture::{Texture, TextureData};

pub struct DecodeSession<'a> {
    pub(crate) document: &'a Document,

    /// Source path, used to resolve relative URIs and in messages
    pub(crate) path: &'a str,

    pub(crate) config: &'a LoaderConfig,

    pub(crate) resolver: &'a dyn PathResolver,

    pub(crate) buffers: BufferStore<'a>,

    /// glTF node index -> built node, also the visited set
    pub(crate) node_ids: Vec<Option<NodeId>>,

    /// Nodes whose mesh references a skin, bound after the hierarchy exists
    pub(crate) pending_skins: Vec<(NodeId, usize)>,

    pub(crate) meshes: Vec<Option<Arc<MergedMesh>>>,
    pub(crate) materials: Vec<Option<Arc<Material>>>,
    pub(crate) images: Vec<Option<Arc<Texture>>>,
    pub(crate) bind_poses: Vec<Option<Arc<Vec<Mat4>>>>,
    pub(crate) clips: Vec<Option<Arc<AnimationClip>>>,

    /// Images decoded ahead of material assembly, waiting for a sampler
    pub(crate) predecoded: HashMap<usize, TextureData>,

    /// Root `Unity_colliders` table, parsed on first use
    pub(crate) collider_table: Option<Vec<ColliderDef>>,
}

impl<'a> DecodeSession<'a> {
    pub fn new(
        document: &'a Document,
        path: &'a str,
        config: &'a LoaderConfig,
        resolver: &'a dyn PathResolver,
    ) -> Self {
        let root = &document.root;
        Self {
            document,
            path,
            config,
            resolver,
            buffers: BufferStore::new(document, path, resolver),
            node_ids: vec![None; root.nodes.len()],
            pending_skins: Vec::new(),
            meshes: vec![None; root.meshes.len()],
            materials: vec![None; root.materials.len()],
            images: vec![None; root.images.len()],
            bind_poses: vec![None; root.skins.len()],
            clips: vec![None; root.animations.len()],
            predecoded: HashMap::new(),
            collider_table: None,
        }
    }

    /// Node built from glTF node `index`, if it was instantiated.
    pub fn node_id(&self, index: usize) -> Option<NodeId> {
        self.node_ids.get(index).copied().flatten()
    }

    /// Everything decoded so far, in index order.
    pub fn into_assets(self) -> DecodedAssets {
        DecodedAssets {
            meshes: self.meshes.into_iter().flatten().collect(),
            materials: self.materials.into_iter().flatten().collect(),
            textures: self.images.into_iter().flatten().collect(),
            animations: self.clips.into_iter().flatten().collect(),
        }
    }
}

/// Shared assets produced by one load.
#[derive(Clone, Debug, Default)]
pub struct DecodedAssets {
    pub meshes: Vec<Arc<MergedMesh>>,
    pub materials: Vec<Arc<Material>>,
    pub textures: Vec<Arc<Texture>>,
    pub animations: Vec<Arc<AnimationClip>>,
}
