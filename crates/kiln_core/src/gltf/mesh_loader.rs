//! Mesh assembly: primitives -> one [`MergedMesh`].

use std::sync::Arc;

use kiln_math::handedness::{flip_all, flip_tangent, flip_tex_coords, flip_winding};
use kiln_math::{Vec2, Vec3, Vec4};

use crate::error::{LoadError, LoadResult};
use crate::gltf::session::DecodeSession;
use crate::gltf::types::{GltfPrimitive, MODE_TRIANGLES};
use crate::material::Material;
use crate::mesh::{normalize_weights, BoneWeight, MergedMesh, SubMesh};

/// Attribute semantics read into the merged mesh. Others are skipped
/// without decoding their accessors.
const VERTEX_ATTRIBUTES: &[&str] = &[
    "POSITION",
    "NORMAL",
    "TANGENT",
    "TEXCOORD_0",
    "COLOR_0",
    "JOINTS_0",
    "WEIGHTS_0",
];

/// Decoded, converted streams of one primitive.
#[derive(Default)]
struct PrimitiveStreams {
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    tangents: Option<Vec<Vec4>>,
    uvs: Option<Vec<Vec2>>,
    colors: Option<Vec<Vec4>>,
    joints: Option<Vec<Vec4>>,
    weights: Option<Vec<Vec4>>,
    indices: Vec<u32>,
}

impl DecodeSession<'_> {
    /// Merged mesh for glTF mesh `index`, decoded once per session.
    pub fn assemble_mesh(&mut self, index: usize) -> LoadResult<Arc<MergedMesh>> {
        if let Some(Some(mesh)) = self.meshes.get(index) {
            return Ok(Arc::clone(mesh));
        }

        let document = self.document;
        let gltf_mesh = document.mesh(index)?;
        let mut primitives = Vec::with_capacity(gltf_mesh.primitives.len());
        for (prim_index, primitive) in gltf_mesh.primitives.iter().enumerate() {
            primitives.push(self.load_primitive(index, prim_index, primitive)?);
        }

        let name = gltf_mesh
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Mesh{}", index));
        let mesh = Arc::new(self.merge_primitives(name, primitives));

        log::debug!(
            "Assembled mesh {} '{}': {} vertices, {} triangles, {} submeshes",
            index,
            mesh.name,
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.submesh_count()
        );

        self.meshes[index] = Some(Arc::clone(&mesh));
        Ok(mesh)
    }

    /// One material per primitive of mesh `index`.
    ///
    /// Primitives without a material get their own fresh default material.
    pub fn mesh_materials(&mut self, index: usize) -> LoadResult<Vec<Arc<Material>>> {
        let material_indices: Vec<Option<usize>> = self
            .document
            .mesh(index)?
            .primitives
            .iter()
            .map(|primitive| primitive.material)
            .collect();

        material_indices
            .into_iter()
            .map(|material| match material {
                Some(material) => self.load_material(material),
                None => Ok(Arc::new(Material::default_material())),
            })
            .collect()
    }

    fn load_primitive(
        &self,
        mesh_index: usize,
        prim_index: usize,
        primitive: &GltfPrimitive,
    ) -> LoadResult<Option<PrimitiveStreams>> {
        if let Some(mode) = primitive.mode.filter(|mode| *mode != MODE_TRIANGLES) {
            log::warn!(
                "Mesh {} primitive {}: mode {} is not a triangle list, skipping",
                mesh_index,
                prim_index,
                mode
            );
            return Ok(None);
        }

        let mut streams = PrimitiveStreams::default();
        let mut positions = None;
        let mut counts = Vec::with_capacity(primitive.attributes.len());

        for (semantic, &accessor) in &primitive.attributes {
            let semantic = semantic.as_str();
            if !VERTEX_ATTRIBUTES.contains(&semantic) {
                log::warn!(
                    "Mesh {} primitive {}: unsupported attribute {}, skipping",
                    mesh_index,
                    prim_index,
                    semantic
                );
                continue;
            }

            let data = self.buffers.accessor(accessor)?;
            counts.push((accessor, data.len()));

            match semantic {
                "POSITION" => {
                    let mut values = data.into_vec3(accessor)?;
                    flip_all(&mut values);
                    positions = Some(values);
                }
                "NORMAL" => {
                    let mut values = data.into_vec3(accessor)?;
                    flip_all(&mut values);
                    streams.normals = Some(values);
                }
                "TANGENT" => {
                    let values = data.into_vec4(accessor)?;
                    streams.tangents = Some(values.into_iter().map(flip_tangent).collect());
                }
                "TEXCOORD_0" => {
                    let mut values = data.into_vec2(accessor)?;
                    flip_tex_coords(&mut values);
                    streams.uvs = Some(values);
                }
                "COLOR_0" => streams.colors = Some(data.into_vec4_or(accessor, 1.0)?),
                "JOINTS_0" => streams.joints = Some(data.into_vec4(accessor)?),
                // WEIGHTS_0
                _ => streams.weights = Some(data.into_vec4(accessor)?),
            }
        }

        let Some(positions) = positions else {
            log::warn!(
                "Mesh {} primitive {} has no POSITION attribute, skipping",
                mesh_index,
                prim_index
            );
            return Ok(None);
        };

        let vertex_count = positions.len();
        if let Some((accessor, count)) = counts.into_iter().find(|(_, count)| *count != vertex_count) {
            return Err(LoadError::malformed_accessor(
                accessor,
                format!("has {} elements but POSITION has {}", count, vertex_count),
            ));
        }

        let mut indices = match primitive.indices {
            Some(accessor) => {
                let indices = self.buffers.indices(accessor)?;
                if let Some(bad) = indices.iter().find(|i| **i as usize >= vertex_count) {
                    return Err(LoadError::malformed_accessor(
                        accessor,
                        format!("index {} out of range for {} vertices", bad, vertex_count),
                    ));
                }
                indices
            }
            None => (0..vertex_count as u32).collect(),
        };
        if indices.len() % 3 != 0 {
            log::warn!(
                "Mesh {} primitive {}: {} indices is not a whole number of triangles",
                mesh_index,
                prim_index,
                indices.len()
            );
        }
        flip_winding(&mut indices);

        streams.positions = positions;
        streams.indices = indices;
        Ok(Some(streams))
    }

    /// Concatenate primitive streams and offset their indices.
    fn merge_primitives(&self, name: String, primitives: Vec<Option<PrimitiveStreams>>) -> MergedMesh {
        let present: Vec<&PrimitiveStreams> = primitives.iter().flatten().collect();
        let all_have = |has: fn(&PrimitiveStreams) -> bool| !present.is_empty() && present.iter().all(|p| has(p));
        let any_have = |has: fn(&PrimitiveStreams) -> bool| present.iter().any(|p| has(p));

        let keep_normals = all_have(|p| p.normals.is_some());
        let keep_tangents = all_have(|p| p.tangents.is_some());
        let has_uvs = any_have(|p| p.uvs.is_some());
        let has_colors = any_have(|p| p.colors.is_some());
        let has_skin = any_have(|p| p.joints.is_some() || p.weights.is_some());

        let mut mesh = MergedMesh {
            name,
            normals: keep_normals.then(Vec::new),
            tangents: keep_tangents.then(Vec::new),
            uvs: has_uvs.then(Vec::new),
            colors: has_colors.then(Vec::new),
            ..Default::default()
        };
        let mut joints = Vec::new();
        let mut weights = Vec::new();

        for primitive in &primitives {
            let base_vertex = mesh.positions.len() as u32;
            let index_start = mesh.indices.len();

            let Some(p) = primitive else {
                // Keep the slot so submesh N still lines up with material N
                mesh.submeshes.push(SubMesh {
                    index_start,
                    index_count: 0,
                    base_vertex,
                    vertex_count: 0,
                });
                continue;
            };

            let count = p.positions.len();
            mesh.positions.extend_from_slice(&p.positions);
            mesh.indices.extend(p.indices.iter().map(|i| i + base_vertex));

            extend_stream(&mut mesh.normals, &p.normals, count, Vec3::Y);
            extend_stream(&mut mesh.tangents, &p.tangents, count, Vec4::new(1.0, 0.0, 0.0, 1.0));
            extend_stream(&mut mesh.uvs, &p.uvs, count, Vec2::ZERO);
            extend_stream(&mut mesh.colors, &p.colors, count, Vec4::ONE);
            if has_skin {
                joints.extend(values_or(&p.joints, count, Vec4::ZERO));
                weights.extend(values_or(&p.weights, count, Vec4::ZERO));
            }

            mesh.submeshes.push(SubMesh {
                index_start,
                index_count: p.indices.len(),
                base_vertex,
                vertex_count: count,
            });
        }

        if has_skin {
            normalize_weights(&mut weights);
            mesh.bone_weights = Some(
                joints
                    .into_iter()
                    .zip(weights)
                    .map(|(j, w)| BoneWeight::new(j, w))
                    .collect(),
            );
        }

        if mesh.normals.is_none() && self.config.recalculate_normals {
            mesh.compute_normals();
        }
        if mesh.tangents.is_none() && self.config.recalculate_tangents {
            mesh.compute_tangents();
        }
        mesh.update_bounds();
        mesh
    }
}

fn extend_stream<T: Copy>(target: &mut Option<Vec<T>>, source: &Option<Vec<T>>, count: usize, default: T) {
    if let Some(target) = target {
        target.extend(values_or(source, count, default));
    }
}

fn values_or<T: Copy>(source: &Option<Vec<T>>, count: usize, default: T) -> Vec<T> {
    match source {
        Some(values) => values.clone(),
        None => vec![default; count],
    }
}
