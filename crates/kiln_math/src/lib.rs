//! Kiln math - glam re-exports plus the transform, bounds and handedness
//! helpers shared by the scene loader.

// Re-export glam for convenience
pub use glam::*;

mod bounds;
pub mod handedness;
mod transform;

pub use bounds::Aabb;
pub use handedness::Handedness;
pub use transform::{Mat4Ext, Transform};
