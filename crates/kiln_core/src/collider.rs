//! Physics collider shapes attached to scene nodes.

use std::sync::Arc;

use kiln_math::{Vec3, Vec4};

use crate::error::{LoadError, LoadResult};
use crate::mesh::MergedMesh;

/// Long axis of a capsule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapsuleDirection {
    X,
    Y,
    Z,
}

impl CapsuleDirection {
    pub fn parse(direction: &str) -> LoadResult<Self> {
        match direction {
            "x" => Ok(CapsuleDirection::X),
            "y" => Ok(CapsuleDirection::Y),
            "z" => Ok(CapsuleDirection::Z),
            other => Err(LoadError::invalid_enum("capsuleCollider.direction", other)),
        }
    }

    pub fn axis(self) -> Vec3 {
        match self {
            CapsuleDirection::X => Vec3::X,
            CapsuleDirection::Y => Vec3::Y,
            CapsuleDirection::Z => Vec3::Z,
        }
    }
}

/// Collider attached to a node. Centers are in the target convention.
#[derive(Clone, Debug)]
pub enum Collider {
    Box {
        center: Vec3,
        size: Vec3,
    },
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Capsule {
        center: Vec3,
        radius: f32,
        height: f32,
        direction: CapsuleDirection,
    },
    Mesh {
        convex: bool,
        mesh: Option<Arc<MergedMesh>>,
    },
}

impl Collider {
    /// Center in node space; mesh colliders are centered on the node.
    pub fn center(&self) -> Vec3 {
        match self {
            Collider::Box { center, .. }
            | Collider::Sphere { center, .. }
            | Collider::Capsule { center, .. } => *center,
            Collider::Mesh { .. } => Vec3::ZERO,
        }
    }

    /// Short shape name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Collider::Box { .. } => "box",
            Collider::Sphere { .. } => "sphere",
            Collider::Capsule { .. } => "capsule",
            Collider::Mesh { .. } => "mesh",
        }
    }

    /// Bounding sphere as center + radius in `w`.
    pub fn bounding_sphere(&self) -> Option<Vec4> {
        match self {
            Collider::Box { center, size } => Some(center.extend(size.length() * 0.5)),
            Collider::Sphere { center, radius } => Some(center.extend(*radius)),
            Collider::Capsule { center, radius, height, .. } => {
                Some(center.extend((height * 0.5).max(*radius)))
            }
            Collider::Mesh { mesh, .. } => mesh.as_ref().and_then(|mesh| {
                if mesh.bounds.is_empty() {
                    None
                } else {
                    Some(mesh.bounds.centroid().extend(mesh.bounds.extent().length() * 0.5))
                }
            }),
        }
    }
}
