//! Kiln Core - glTF 2.0 loading into an engine-side scene graph.
//!
//! This crate provides:
//!
//! - **Decoding**: `.gltf` / `.glb` parsing, accessor and buffer decoding,
//!   conversion from glTF's right-handed space to the engine's left-handed one
//! - **Assembly**: merged meshes with submeshes, materials, textures,
//!   colliders, skins and per-component animation curves
//! - **Caching**: a reference-counted [`AssetManager`] that shares decoded
//!   bundles between consumers and disposes them when the last one releases
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kiln_core::{AssetManager, FileResolver, LoaderConfig};
//!
//! let assets = Arc::new(AssetManager::new(LoaderConfig::default(), Arc::new(FileResolver::new())));
//! let instance = assets.instantiate("models/robot.glb")?;
//! println!("{} nodes, {} triangles",
//!     instance.scene.len(),
//!     instance.scene.total_triangle_count());
//! // Dropping the instance releases the cached bundle
//! ```

pub mod accessor;
pub mod animation;
pub mod buffer;
pub mod cache;
pub mod collider;
pub mod config;
pub mod error;
pub mod gltf;
pub mod material;
pub mod mesh;
pub mod resolver;
pub mod scene;
pub mod texture;

// Re-export commonly used types
pub use animation::{AnimationClip, AnimationCurve, Interpolation, Keyframe};
pub use cache::{AssetManager, AssetReference, DecodedAssetBundle, ReferenceCounter, SceneInstance};
pub use collider::Collider;
pub use config::LoaderConfig;
pub use error::{LoadError, LoadResult};
pub use gltf::{DecodedAssets, GltfLoader, LoadedScene};
pub use material::{AlphaMode, Material};
pub use mesh::{MergedMesh, SubMesh};
pub use resolver::{FileResolver, MemoryResolver, PathResolver};
pub use scene::{NodeId, SceneGraph, SceneNode};
pub use texture::{Texture, TextureData};
