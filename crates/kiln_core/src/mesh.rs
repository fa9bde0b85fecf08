//! Merged mesh geometry.
//!
//! A [`MergedMesh`] holds the vertex streams of every primitive of a glTF
//! mesh concatenated in primitive order, with one [`SubMesh`] index range
//! per primitive so each keeps its own material. All data is already in
//! the target (left-handed, flipped-V) convention.

use bytemuck::{Pod, Zeroable};
use kiln_math::{Aabb, Vec2, Vec3, Vec4};

/// Tolerance for bone weight sums.
pub const WEIGHT_EPSILON: f32 = 1e-5;

/// Index range of one primitive inside the merged index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    /// First index in [`MergedMesh::indices`].
    pub index_start: usize,
    pub index_count: usize,
    /// First vertex owned by this primitive.
    pub base_vertex: u32,
    pub vertex_count: usize,
}

impl SubMesh {
    pub fn index_range(&self) -> std::ops::Range<usize> {
        self.index_start..self.index_start + self.index_count
    }

    pub fn vertex_range(&self) -> std::ops::Range<u32> {
        self.base_vertex..self.base_vertex + self.vertex_count as u32
    }
}

/// Four joint influences for one vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BoneWeight {
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl BoneWeight {
    pub fn new(joints: Vec4, weights: Vec4) -> Self {
        Self {
            joints: [
                joints.x.max(0.0) as u32,
                joints.y.max(0.0) as u32,
                joints.z.max(0.0) as u32,
                joints.w.max(0.0) as u32,
            ],
            weights: weights.to_array(),
        }
    }

    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().sum()
    }
}

/// Interleaved vertex layout for hosts that upload one vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
    pub color: [f32; 4],
}

/// A mesh made of one or more primitives sharing a vertex buffer.
#[derive(Clone, Debug, Default)]
pub struct MergedMesh {
    pub name: String,

    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals, provided or recalculated
    pub normals: Option<Vec<Vec3>>,

    /// Tangents with handedness sign in `w`
    pub tangents: Option<Vec<Vec4>>,

    pub uvs: Option<Vec<Vec2>>,

    /// Linear RGBA
    pub colors: Option<Vec<Vec4>>,

    /// Joint influences for skinned meshes
    pub bone_weights: Option<Vec<BoneWeight>>,

    /// Triangle indices, already offset into the merged vertex range
    pub indices: Vec<u32>,

    pub submeshes: Vec<SubMesh>,

    pub bounds: Aabb,
}

impl MergedMesh {
    /// Number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles across all submeshes.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn submesh_count(&self) -> usize {
        self.submeshes.len()
    }

    /// Indices belonging to submesh `index`.
    pub fn submesh_indices(&self, index: usize) -> Option<&[u32]> {
        self.submeshes
            .get(index)
            .and_then(|sub| self.indices.get(sub.index_range()))
    }

    pub fn is_skinned(&self) -> bool {
        self.bone_weights.is_some()
    }

    /// Recompute bounds from positions.
    pub fn update_bounds(&mut self) {
        self.bounds = Aabb::from_positions(&self.positions);
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Face normals are not normalized before accumulation, so larger
    /// faces contribute more. Triangles are wound for the target
    /// convention (see [`kiln_math::handedness::flip_winding`]).
    pub fn compute_normals(&mut self) {
        self.normals = Some(compute_normals(&self.positions, &self.indices));
    }

    /// Compute tangents from positions, normals and UVs.
    ///
    /// Does nothing without UVs. Computes normals first if needed.
    pub fn compute_tangents(&mut self) {
        let Some(uvs) = &self.uvs else {
            log::debug!("Mesh '{}' has no UVs, skipping tangent generation", self.name);
            return;
        };
        let normals = match &self.normals {
            Some(normals) => normals.clone(),
            None => compute_normals(&self.positions, &self.indices),
        };
        self.tangents = Some(compute_tangents(&self.positions, &normals, uvs, &self.indices));
    }

    /// Interleave the vertex streams. Missing streams use defaults
    /// (normal +Y, uv 0, tangent +X, colour white).
    pub fn interleave(&self) -> Vec<Vertex> {
        (0..self.positions.len())
            .map(|i| Vertex {
                position: self.positions[i].to_array(),
                normal: stream_value(&self.normals, i, Vec3::Y).to_array(),
                uv: stream_value(&self.uvs, i, Vec2::ZERO).to_array(),
                tangent: stream_value(&self.tangents, i, Vec4::new(1.0, 0.0, 0.0, 1.0)).to_array(),
                color: stream_value(&self.colors, i, Vec4::ONE).to_array(),
            })
            .collect()
    }

    /// Interleaved vertices as raw bytes.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.interleave()).to_vec()
    }

    /// Index buffer as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

fn stream_value<T: Copy>(stream: &Option<Vec<T>>, index: usize, default: T) -> T {
    stream
        .as_ref()
        .and_then(|values| values.get(index).copied())
        .unwrap_or(default)
}

/// Smooth normals for a triangle list.
pub fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let vertex_count = positions.len();
    let mut normals = vec![Vec3::ZERO; vertex_count];

    for face in indices.chunks_exact(3) {
        let i0 = face[0] as usize;
        let i1 = face[1] as usize;
        let i2 = face[2] as usize;

        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }

        let edge1 = positions[i1] - positions[i0];
        let edge2 = positions[i2] - positions[i0];
        let face_normal = edge1.cross(edge2);

        normals[i0] += face_normal;
        normals[i1] += face_normal;
        normals[i2] += face_normal;
    }

    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }

    normals
}

/// Per-vertex tangents from UV derivatives.
pub fn compute_tangents(positions: &[Vec3], normals: &[Vec3], uvs: &[Vec2], indices: &[u32]) -> Vec<Vec4> {
    let vertex_count = positions.len();
    let mut tangents = vec![Vec3::ZERO; vertex_count];
    let mut bitangents = vec![Vec3::ZERO; vertex_count];

    for face in indices.chunks_exact(3) {
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
        if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
            continue;
        }
        if i0 >= uvs.len() || i1 >= uvs.len() || i2 >= uvs.len() {
            continue;
        }

        let edge1 = positions[i1] - positions[i0];
        let edge2 = positions[i2] - positions[i0];
        let duv1 = uvs[i1] - uvs[i0];
        let duv2 = uvs[i2] - uvs[i0];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for i in [i0, i1, i2] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    (0..vertex_count)
        .map(|i| {
            let n = normals.get(i).copied().unwrap_or(Vec3::Y);
            // Gram-Schmidt against the normal
            let t = (tangents[i] - n * n.dot(tangents[i]))
                .try_normalize()
                .unwrap_or_else(|| n.any_orthonormal_vector());
            let w = if n.cross(t).dot(bitangents[i]) < 0.0 { -1.0 } else { 1.0 };
            t.extend(w)
        })
        .collect()
}

/// Rescale each vertex's four weights so they sum to one.
///
/// Vertices whose weights sum to (nearly) zero get all-zero weights
/// instead of a division by zero.
pub fn normalize_weights(weights: &mut [Vec4]) {
    for weight in weights.iter_mut() {
        let sum = weight.x + weight.y + weight.z + weight.w;
        if sum.abs() < WEIGHT_EPSILON {
            *weight = Vec4::ZERO;
        } else if (sum - 1.0).abs() > WEIGHT_EPSILON {
            *weight /= sum;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MergedMesh {
        // Two triangles in the XY plane, wound so the normal faces +Z
        let mut mesh = MergedMesh {
            name: "quad".into(),
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            uvs: Some(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ]),
            indices: vec![0, 1, 2, 0, 2, 3],
            submeshes: vec![SubMesh {
                index_start: 0,
                index_count: 6,
                base_vertex: 0,
                vertex_count: 4,
            }],
            ..Default::default()
        };
        mesh.update_bounds();
        mesh
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = quad();
        mesh.compute_normals();
        for normal in mesh.normals.as_ref().unwrap() {
            assert!((*normal - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_degenerate_triangle_gets_default_normal() {
        let positions = vec![Vec3::ZERO; 3];
        let normals = compute_normals(&positions, &[0, 1, 2]);
        assert_eq!(normals, vec![Vec3::Y; 3]);
    }

    #[test]
    fn test_out_of_range_indices_are_skipped() {
        let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let normals = compute_normals(&positions, &[0, 1, 7]);
        assert_eq!(normals.len(), 3);
    }

    #[test]
    fn test_compute_tangents_follow_u() {
        let mut mesh = quad();
        mesh.compute_tangents();
        for tangent in mesh.tangents.as_ref().unwrap() {
            assert!((tangent.truncate() - Vec3::X).length() < 1e-5);
            assert_eq!(tangent.w.abs(), 1.0);
        }
    }

    #[test]
    fn test_tangents_need_uvs() {
        let mut mesh = quad();
        mesh.uvs = None;
        mesh.compute_tangents();
        assert!(mesh.tangents.is_none());
    }

    #[test]
    fn test_normalize_weights() {
        let mut weights = vec![
            Vec4::new(0.5, 0.5, 0.5, 0.5),
            Vec4::new(1.0, 0.0, 0.0, 0.0),
            Vec4::new(0.2, 0.2, 0.0, 0.0),
        ];
        normalize_weights(&mut weights);

        for weight in &weights {
            let sum = weight.x + weight.y + weight.z + weight.w;
            assert!((sum - 1.0).abs() < 1e-5);
        }
        assert_eq!(weights[1], Vec4::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_zero_weights_stay_finite() {
        let mut weights = vec![Vec4::ZERO, Vec4::new(1e-9, 0.0, 0.0, 0.0)];
        normalize_weights(&mut weights);
        for weight in &weights {
            assert!(weight.is_finite());
            assert_eq!(*weight, Vec4::ZERO);
        }
    }

    #[test]
    fn test_interleave_defaults() {
        let mesh = quad();
        let vertices = mesh.interleave();
        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(vertices[2].uv, [1.0, 1.0]);
        assert_eq!(vertices[2].normal, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[2].color, [1.0; 4]);
        assert_eq!(mesh.vertex_bytes().len(), 4 * std::mem::size_of::<Vertex>());
        assert_eq!(std::mem::size_of::<Vertex>(), 64);
    }

    #[test]
    fn test_submesh_slices() {
        let mesh = quad();
        assert_eq!(mesh.submesh_indices(0), Some(&[0, 1, 2, 0, 2, 3][..]));
        assert_eq!(mesh.submesh_indices(1), None);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.index_bytes().len(), 24);
        assert_eq!(mesh.bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_bone_weight_from_vectors() {
        let bw = BoneWeight::new(Vec4::new(0.0, 1.0, 2.0, 3.0), Vec4::new(0.4, 0.3, 0.2, 0.1));
        assert_eq!(bw.joints, [0, 1, 2, 3]);
        assert!((bw.weight_sum() - 1.0).abs() < 1e-5);
    }
}
