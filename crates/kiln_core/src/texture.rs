//! Decoded textures and sampler state.
//!
//! Standard image formats are decoded with the `image` crate into RGBA8.
//! DDS payloads are kept compressed; decoding them is left to the host.

use serde::{Deserialize, Serialize};

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};
use crate::gltf::types::*;

const DDS_MAGIC: &[u8; 4] = b"DDS ";

/// Texture filtering, derived from the sampler min filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    Point,
    Bilinear,
    Trilinear,
}

/// Texture addressing outside [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WrapMode {
    Repeat,
    Clamp,
    Mirror,
}

/// Sampler state emitted with every texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerSettings {
    pub filter: FilterMode,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub aniso_level: u8,
}

impl SamplerSettings {
    /// Settings for a texture with no sampler.
    pub fn fallback(config: &LoaderConfig) -> Self {
        Self {
            filter: config.default_filter,
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            aniso_level: config.aniso_level,
        }
    }

    /// Map a glTF sampler. A missing min filter keeps the configured default.
    pub fn from_gltf(sampler: &GltfSampler, config: &LoaderConfig) -> LoadResult<Self> {
        let filter = match sampler.min_filter {
            Some(code) => filter_mode(code)?,
            None => config.default_filter,
        };

        Ok(Self {
            filter,
            wrap_u: wrap_mode("wrapS", sampler.wrap_s)?,
            wrap_v: wrap_mode("wrapT", sampler.wrap_t)?,
            aniso_level: config.aniso_level,
        })
    }
}

/// Map a GL min filter code.
pub fn filter_mode(min_filter: u32) -> LoadResult<FilterMode> {
    match min_filter {
        GL_NEAREST | GL_NEAREST_MIPMAP_NEAREST | GL_NEAREST_MIPMAP_LINEAR => Ok(FilterMode::Point),
        GL_LINEAR | GL_LINEAR_MIPMAP_NEAREST => Ok(FilterMode::Bilinear),
        GL_LINEAR_MIPMAP_LINEAR => Ok(FilterMode::Trilinear),
        other => Err(LoadError::invalid_enum("minFilter", other)),
    }
}

/// Map a GL wrap code. `field` names the sampler property for errors.
pub fn wrap_mode(field: &'static str, code: u32) -> LoadResult<WrapMode> {
    match code {
        GL_CLAMP_TO_EDGE => Ok(WrapMode::Clamp),
        GL_MIRRORED_REPEAT => Ok(WrapMode::Mirror),
        GL_REPEAT => Ok(WrapMode::Repeat),
        other => Err(LoadError::invalid_enum(field, other)),
    }
}

/// Pixel payload of a texture.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureData {
    /// 8-bit RGBA, row-major, top row first.
    Rgba8 {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Compressed DDS file contents, passed through untouched.
    Dds {
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    },
}

impl TextureData {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            TextureData::Rgba8 { width, height, .. } | TextureData::Dds { width, height, .. } => {
                (*width, *height)
            }
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, TextureData::Dds { .. })
    }

    /// Get total size in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            TextureData::Rgba8 { pixels, .. } => pixels.len(),
            TextureData::Dds { bytes, .. } => bytes.len(),
        }
    }
}

/// A loaded texture with its sampler state.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Image name, or `Image<index>`
    pub name: String,

    pub data: TextureData,

    pub sampler: SamplerSettings,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.data.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.data.dimensions().1
    }
}

/// Decode image `index` from its encoded bytes.
///
/// DDS files are recognised by their magic and kept compressed; anything
/// else goes through `image` and is converted to RGBA8.
pub fn decode_image(index: usize, bytes: Vec<u8>) -> LoadResult<TextureData> {
    if bytes.len() >= 20 && bytes.starts_with(DDS_MAGIC) {
        let height = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        let width = u32::from_le_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        return Ok(TextureData::Dds { width, height, bytes });
    }

    let img = image::load_from_memory(&bytes).map_err(|source| LoadError::Image { index, source })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(TextureData::Rgba8 {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}
