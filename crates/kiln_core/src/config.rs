//! Loader configuration.

use serde::{Deserialize, Serialize};

use crate::error::LoadResult;
use crate::texture::FilterMode;

/// Settings applied to every document loaded through an [`AssetManager`].
///
/// [`AssetManager`]: crate::cache::AssetManager
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Anisotropic filtering level emitted with every sampler.
    pub aniso_level: u8,

    /// Recalculate normals for meshes that do not provide them.
    pub recalculate_normals: bool,

    /// Recalculate tangents for meshes that do not provide them.
    pub recalculate_tangents: bool,

    /// Decode images on the rayon thread pool before materials are built.
    pub parallel_image_decode: bool,

    /// Filter used when a texture has no sampler or no min filter.
    pub default_filter: FilterMode,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            aniso_level: 1,
            recalculate_normals: true,
            recalculate_tangents: true,
            parallel_image_decode: true,
            default_filter: FilterMode::Trilinear,
        }
    }
}

impl LoaderConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> LoadResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
