//! Right-handed to left-handed coordinate conversion.
//!
//! Source documents are authored right-handed with +Z forward; the target
//! convention is left-handed. Handedness is flipped by mirroring across the
//! X axis:
//!
//! - points and direction vectors negate X
//! - rotations negate the X and W quaternion components
//! - matrices are decomposed, converted per component and recomposed
//!
//! Mirroring reverses triangle orientation, so index triples must be
//! reversed too, and texture V is flipped to move the origin from top-left
//! to bottom-left. Every conversion here is its own inverse.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// A value that can be mirrored from one handedness into the other.
pub trait Handedness: Sized {
    /// Mirror the value across the X axis.
    fn flip_handedness(self) -> Self;
}

impl Handedness for Vec3 {
    fn flip_handedness(self) -> Self {
        Vec3::new(-self.x, self.y, self.z)
    }
}

impl Handedness for Quat {
    fn flip_handedness(self) -> Self {
        Quat::from_xyzw(-self.x, self.y, self.z, -self.w)
    }
}

impl Handedness for Mat4 {
    /// Negating entries of a general matrix would corrupt its rotation, so
    /// the matrix is decomposed first. Scale is handedness-invariant.
    fn flip_handedness(self) -> Self {
        let (scale, rotation, translation) = self.to_scale_rotation_translation();
        Mat4::from_scale_rotation_translation(
            scale,
            rotation.flip_handedness(),
            translation.flip_handedness(),
        )
    }
}

/// Convert every element of a slice in place.
pub fn flip_all<T: Handedness + Copy>(values: &mut [T]) {
    for value in values.iter_mut() {
        *value = value.flip_handedness();
    }
}

/// Rotation stored as a raw `[x, y, z, w]` vector (animation outputs).
pub fn flip_rotation(rotation: Vec4) -> Vec4 {
    Vec4::new(-rotation.x, rotation.y, rotation.z, -rotation.w)
}

/// Tangent with bitangent sign in W. Mirroring reverses `cross(N, T)`, so
/// the sign flips along with X.
pub fn flip_tangent(tangent: Vec4) -> Vec4 {
    Vec4::new(-tangent.x, tangent.y, tangent.z, -tangent.w)
}

/// Reverse the winding of every complete index triple.
///
/// Swaps the first and last index of each triangle. A trailing partial
/// triple is left untouched.
pub fn flip_winding(indices: &mut [u32]) {
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(0, 2);
    }
}

/// Move the texture origin between top-left and bottom-left (`v' = 1 - v`).
pub fn flip_tex_coord(uv: Vec2) -> Vec2 {
    Vec2::new(uv.x, 1.0 - uv.y)
}

/// [`flip_tex_coord`] over a slice.
pub fn flip_tex_coords(uvs: &mut [Vec2]) {
    for uv in uvs.iter_mut() {
        *uv = flip_tex_coord(*uv);
    }
}
