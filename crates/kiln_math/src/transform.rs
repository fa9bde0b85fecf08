// Transform utilities for Mat4
//
// Local node transforms are stored decomposed (TRS) and recomposed on
// demand; glam already provides transform_point3() and transform_vector3().

use glam::{Mat4, Quat, Vec3};
use crate::Aabb;

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Rotation (as quaternion)
    pub rotation: Quat,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Create a new transform from a 4x4 matrix.
    ///
    /// Decomposes the matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;

    /// Decompose into translation, rotation and scale.
    fn to_transform(&self) -> Transform;
}

impl Mat4Ext for Mat4 {
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::empty();
        }

        let mut result = Aabb::empty();
        for corner in aabb.corners() {
            result.grow(self.transform_point3(corner));
        }
        result
    }

    fn to_transform(&self) -> Transform {
        Transform::from_matrix(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let recovered = transform.to_matrix().to_transform();

        assert!((recovered.translation - transform.translation).length() < 0.001);
        assert!((recovered.scale - transform.scale).length() < 0.001);
        assert!(recovered.rotation.dot(transform.rotation).abs() > 0.999);
    }

    #[test]
    fn test_transform_aabb_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.min - Vec3::new(5.0, 5.0, 5.0)).length() < 0.001);
        assert!((transformed.max - Vec3::new(6.0, 6.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_aabb_rotation() {
        // 90 degrees around Z maps the X extent onto Y
        let mat = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let transformed = mat.transform_aabb(&aabb);

        assert!((transformed.extent() - Vec3::new(1.0, 2.0, 1.0)).length() < 0.001);
    }

    #[test]
    fn test_transform_empty_aabb_stays_empty() {
        let mat = Mat4::from_translation(Vec3::ONE);
        assert!(mat.transform_aabb(&Aabb::empty()).is_empty());
    }
}
