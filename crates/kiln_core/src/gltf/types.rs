//! glTF 2.0 document schema.
//!
//! These types mirror the JSON layout of a document before any of it is
//! decoded. Cross references are plain indices into the root arrays.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw `extensions` object attached to most schema objects.
pub type Extensions = Option<Map<String, Value>>;

pub const GL_NEAREST: u32 = 9728;
pub const GL_LINEAR: u32 = 9729;
pub const GL_NEAREST_MIPMAP_NEAREST: u32 = 9984;
pub const GL_LINEAR_MIPMAP_NEAREST: u32 = 9985;
pub const GL_NEAREST_MIPMAP_LINEAR: u32 = 9986;
pub const GL_LINEAR_MIPMAP_LINEAR: u32 = 9987;
pub const GL_CLAMP_TO_EDGE: u32 = 33071;
pub const GL_MIRRORED_REPEAT: u32 = 33648;
pub const GL_REPEAT: u32 = 10497;

/// Primitive topology for triangle lists.
pub const MODE_TRIANGLES: u32 = 4;

/// The root object of a glTF document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfRoot {
    #[serde(default)]
    pub accessors: Vec<GltfAccessor>,
    #[serde(default)]
    pub buffer_views: Vec<GltfBufferView>,
    #[serde(default)]
    pub buffers: Vec<GltfBuffer>,
    #[serde(default)]
    pub meshes: Vec<GltfMesh>,
    #[serde(default)]
    pub materials: Vec<GltfMaterial>,
    #[serde(default)]
    pub textures: Vec<GltfTexture>,
    #[serde(default)]
    pub samplers: Vec<GltfSampler>,
    #[serde(default)]
    pub images: Vec<GltfImage>,
    #[serde(default)]
    pub nodes: Vec<GltfNode>,
    #[serde(default)]
    pub scenes: Vec<GltfScene>,
    #[serde(default)]
    pub skins: Vec<GltfSkin>,
    #[serde(default)]
    pub animations: Vec<GltfAnimation>,
    /// Default scene index (if present).
    pub scene: Option<usize>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions: Extensions,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfBuffer {
    #[serde(default)]
    pub byte_length: usize,
    /// External file, `data:` URI, or absent for the GLB binary chunk.
    pub uri: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfBufferView {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    /// Distance between element starts; tightly packed when absent.
    pub byte_stride: Option<usize>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfAccessor {
    /// Zero-filled data when absent.
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub element_type: String,
    /// Read but not applied: integer components are decoded as raw magnitudes.
    #[serde(default)]
    pub normalized: bool,
    pub sparse: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfMesh {
    pub name: Option<String>,
    #[serde(default)]
    pub primitives: Vec<GltfPrimitive>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfPrimitive {
    /// Semantic name -> accessor index, iterated in name order.
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Option<u32>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfMaterial {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<GltfPbrMetallicRoughness>,
    pub normal_texture: Option<GltfNormalTextureInfo>,
    pub occlusion_texture: Option<GltfOcclusionTextureInfo>,
    pub emissive_texture: Option<GltfTextureInfo>,
    #[serde(default)]
    pub emissive_factor: [f32; 3],
    #[serde(default = "default_alpha_mode")]
    pub alpha_mode: String,
    #[serde(default = "default_alpha_cutoff")]
    pub alpha_cutoff: f32,
    #[serde(default)]
    pub double_sided: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfPbrMetallicRoughness {
    #[serde(default = "default_color")]
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<GltfTextureInfo>,
    #[serde(default = "default_one")]
    pub metallic_factor: f32,
    #[serde(default = "default_one")]
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<GltfTextureInfo>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfTextureInfo {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: usize,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfNormalTextureInfo {
    pub index: usize,
    #[serde(default = "default_one")]
    pub scale: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfOcclusionTextureInfo {
    pub index: usize,
    #[serde(default = "default_one")]
    pub strength: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfTexture {
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    #[serde(default)]
    pub extensions: Extensions,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfSampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    #[serde(default = "default_wrap")]
    pub wrap_s: u32,
    #[serde(default = "default_wrap")]
    pub wrap_t: u32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfImage {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
}

/// A glTF node in the scene graph.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfNode {
    pub name: Option<String>,
    /// Child node indices.
    #[serde(default)]
    pub children: Vec<usize>,
    /// Index into meshes array.
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    /// 4x4 transformation matrix (column-major).
    pub matrix: Option<[f32; 16]>,
    /// Translation (T in TRS).
    pub translation: Option<[f32; 3]>,
    /// Rotation quaternion [x, y, z, w] (R in TRS).
    pub rotation: Option<[f32; 4]>,
    /// Scale (S in TRS).
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub extensions: Extensions,
}

/// A glTF scene containing root node indices.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfScene {
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<usize>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfSkin {
    pub name: Option<String>,
    /// Identity bind matrices when absent.
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
    #[serde(default)]
    pub joints: Vec<usize>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfAnimation {
    pub name: Option<String>,
    #[serde(default)]
    pub channels: Vec<GltfChannel>,
    #[serde(default)]
    pub samplers: Vec<GltfAnimationSampler>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfChannel {
    pub sampler: usize,
    pub target: GltfChannelTarget,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfChannelTarget {
    pub node: Option<usize>,
    pub path: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GltfAnimationSampler {
    pub input: usize,
    pub output: usize,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
}

// ============================================================================
// Extensions
// ============================================================================

pub const EXT_COLLIDERS: &str = "Unity_colliders";
pub const EXT_TEXTURE_DDS: &str = "MSFT_texture_dds";

/// `Unity_colliders` on the document root: the collider table.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollidersExtension {
    #[serde(default)]
    pub colliders: Vec<ColliderDef>,
}

/// `Unity_colliders` on a node: which collider to attach.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeColliderExtension {
    pub collider: usize,
}

/// One collider entry; exactly one shape is expected to be set.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColliderDef {
    pub box_collider: Option<BoxColliderDef>,
    pub sphere_collider: Option<SphereColliderDef>,
    pub capsule_collider: Option<CapsuleColliderDef>,
    pub mesh_collider: Option<MeshColliderDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BoxColliderDef {
    #[serde(default)]
    pub center: [f32; 3],
    #[serde(default = "default_unit_size")]
    pub size: [f32; 3],
}

#[derive(Clone, Debug, Deserialize)]
pub struct SphereColliderDef {
    #[serde(default)]
    pub center: [f32; 3],
    #[serde(default = "default_half")]
    pub radius: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CapsuleColliderDef {
    #[serde(default)]
    pub center: [f32; 3],
    #[serde(default = "default_half")]
    pub radius: f32,
    #[serde(default = "default_two")]
    pub height: f32,
    /// `"x"`, `"y"` or `"z"`.
    #[serde(default = "default_direction")]
    pub direction: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeshColliderDef {
    #[serde(default)]
    pub convex: bool,
    pub mesh: Option<usize>,
}

/// `MSFT_texture_dds` on a texture: alternate compressed image source.
#[derive(Clone, Debug, Deserialize)]
pub struct TextureDdsExtension {
    pub source: Option<usize>,
}

fn default_alpha_mode() -> String {
    "OPAQUE".to_string()
}

fn default_alpha_cutoff() -> f32 {
    0.5
}

fn default_color() -> [f32; 4] {
    [1.0; 4]
}

fn default_one() -> f32 {
    1.0
}

fn default_half() -> f32 {
    0.5
}

fn default_two() -> f32 {
    2.0
}

fn default_unit_size() -> [f32; 3] {
    [1.0; 3]
}

fn default_wrap() -> u32 {
    GL_REPEAT
}

fn default_direction() -> String {
    "y".to_string()
}

fn default_interpolation() -> String {
    "LINEAR".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_defaults() {
        let node: GltfNode = serde_json::from_str(r#"{ "name": "Root" }"#).unwrap();
        assert_eq!(node.name.as_deref(), Some("Root"));
        assert!(node.children.is_empty());
        assert!(node.matrix.is_none());
    }

    #[test]
    fn test_material_defaults() {
        let material: GltfMaterial = serde_json::from_str("{}").unwrap();
        assert_eq!(material.alpha_mode, "OPAQUE");
        assert!((material.alpha_cutoff - 0.5).abs() < 1e-6);

        let pbr: GltfPbrMetallicRoughness = serde_json::from_str("{}").unwrap();
        assert_eq!(pbr.base_color_factor, [1.0; 4]);
        assert!((pbr.roughness_factor - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_sampler_wraps_default_to_repeat() {
        let sampler: GltfSampler = serde_json::from_str(r#"{ "minFilter": 9729 }"#).unwrap();
        assert_eq!(sampler.min_filter, Some(GL_LINEAR));
        assert_eq!(sampler.wrap_s, GL_REPEAT);
        assert_eq!(sampler.wrap_t, GL_REPEAT);
    }

    #[test]
    fn test_accessor_type_field() {
        let accessor: GltfAccessor = serde_json::from_str(
            r#"{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" }"#,
        )
        .unwrap();
        assert_eq!(accessor.element_type, "VEC3");
        assert_eq!(accessor.byte_offset, 0);
    }
}
