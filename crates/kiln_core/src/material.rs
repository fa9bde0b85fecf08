//! Material parameter sets.
//!
//! Materials carry metallic-roughness PBR factors and texture slots. Binding
//! them to a particular shader is up to the host.

use std::sync::Arc;

use kiln_math::{Vec3, Vec4};

use crate::texture::Texture;

/// How alpha is interpreted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlphaMode {
    Opaque,
    /// Alpha-tested against `cutoff`.
    Mask { cutoff: f32 },
    Blend,
}

impl AlphaMode {
    /// Map a glTF `alphaMode` string. Unknown values render opaque.
    pub fn from_gltf(mode: &str, cutoff: f32) -> Self {
        match mode {
            "MASK" => AlphaMode::Mask { cutoff },
            "BLEND" => AlphaMode::Blend,
            "OPAQUE" => AlphaMode::Opaque,
            other => {
                log::warn!("Unknown alpha mode '{}', treating as OPAQUE", other);
                AlphaMode::Opaque
            }
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, AlphaMode::Blend)
    }
}

/// A texture bound to a material slot.
#[derive(Clone, Debug)]
pub struct TextureSlot {
    pub texture: Arc<Texture>,
    /// Which TEXCOORD set the slot samples.
    pub tex_coord: usize,
}

#[derive(Clone, Debug, Default)]
pub struct NormalMap {
    pub scale: f32,
    pub texture: Option<TextureSlot>,
}

#[derive(Clone, Debug, Default)]
pub struct Emission {
    /// Linear RGB
    pub factor: Vec3,
    pub texture: Option<TextureSlot>,
}

#[derive(Clone, Debug, Default)]
pub struct Occlusion {
    pub strength: f32,
    pub texture: Option<TextureSlot>,
}

/// A metallic-roughness material.
#[derive(Clone, Debug)]
pub struct Material {
    /// Material name (for debugging)
    pub name: String,

    pub alpha_mode: AlphaMode,

    pub double_sided: bool,

    /// Base color (linear RGBA)
    pub base_color_factor: Vec4,

    pub base_color_texture: Option<TextureSlot>,

    /// Metallic factor (0.0 = dielectric, 1.0 = metal)
    pub metallic: f32,

    /// Roughness factor (0.0 = smooth, 1.0 = rough)
    pub roughness: f32,

    /// Metallic in B, roughness in G
    pub metallic_roughness_texture: Option<TextureSlot>,

    pub normal: NormalMap,

    pub emissive: Emission,

    pub occlusion: Occlusion,
}

impl Material {
    /// A fresh material with glTF default factors.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            base_color_factor: Vec4::ONE,
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            metallic_roughness_texture: None,
            normal: NormalMap {
                scale: 1.0,
                texture: None,
            },
            emissive: Emission::default(),
            occlusion: Occlusion {
                strength: 1.0,
                texture: None,
            },
        }
    }

    /// Material used by primitives that reference none.
    pub fn default_material() -> Self {
        Self::named("Default")
    }

    /// Smoothness for hosts that expect it instead of roughness.
    pub fn glossiness(&self) -> f32 {
        1.0 - self.roughness
    }

    /// Every texture this material references.
    pub fn textures(&self) -> impl Iterator<Item = &Arc<Texture>> {
        [
            &self.base_color_texture,
            &self.metallic_roughness_texture,
            &self.normal.texture,
            &self.emissive.texture,
            &self.occlusion.texture,
        ]
        .into_iter()
        .flatten()
        .map(|slot| &slot.texture)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::default_material()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_material() {
        let mat = Material::default();
        assert_eq!(mat.name, "Default");
        assert_eq!(mat.alpha_mode, AlphaMode::Opaque);
        assert_eq!(mat.base_color_factor, Vec4::ONE);
        assert_eq!(mat.glossiness(), 0.0);
        assert_eq!(mat.textures().count(), 0);
    }

    #[test]
    fn test_alpha_mode_mapping() {
        assert_eq!(AlphaMode::from_gltf("MASK", 0.3), AlphaMode::Mask { cutoff: 0.3 });
        assert_eq!(AlphaMode::from_gltf("BLEND", 0.5), AlphaMode::Blend);
        assert_eq!(AlphaMode::from_gltf("bogus", 0.5), AlphaMode::Opaque);
        assert!(AlphaMode::Blend.is_transparent());
    }
}
