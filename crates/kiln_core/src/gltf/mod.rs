//! glTF 2.0 support: document schema, parsing and the per-load assemblers.

mod animation_loader;
mod collider_loader;
mod loader;
mod material_loader;
mod mesh_loader;
pub mod parser;
pub mod session;
pub mod types;

pub use loader::{node_transform, GltfLoader, LoadedScene};
pub use parser::{Document, Extension};
pub use session::{DecodeSession, DecodedAssets};
