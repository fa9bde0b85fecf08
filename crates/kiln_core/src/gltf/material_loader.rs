//! Material and texture assembly.

use std::collections::BTreeSet;
use std::sync::Arc;

use kiln_math::{Vec3, Vec4};
use rayon::prelude::*;

use crate::buffer::load_uri;
use crate::error::{LoadError, LoadResult};
use crate::gltf::parser::Extension;
use crate::gltf::session::DecodeSession;
use crate::gltf::types::{TextureDdsExtension, EXT_TEXTURE_DDS};
use crate::material::{AlphaMode, Emission, Material, NormalMap, Occlusion, TextureSlot};
use crate::texture::{decode_image, SamplerSettings, Texture, TextureData};

impl DecodeSession<'_> {
    /// Material `index`, built once per session.
    pub fn load_material(&mut self, index: usize) -> LoadResult<Arc<Material>> {
        if let Some(Some(material)) = self.materials.get(index) {
            return Ok(Arc::clone(material));
        }

        let document = self.document;
        let gltf_material = document.material(index)?;
        let name = gltf_material
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Material{}", index));

        let mut material = Material::named(name);
        material.alpha_mode = AlphaMode::from_gltf(&gltf_material.alpha_mode, gltf_material.alpha_cutoff);
        material.double_sided = gltf_material.double_sided;

        if let Some(pbr) = &gltf_material.pbr_metallic_roughness {
            material.base_color_factor = Vec4::from_array(pbr.base_color_factor);
            material.metallic = pbr.metallic_factor;
            material.roughness = pbr.roughness_factor;
            if let Some(info) = &pbr.base_color_texture {
                material.base_color_texture = self.texture_slot(info.index, info.tex_coord)?;
            }
            if let Some(info) = &pbr.metallic_roughness_texture {
                material.metallic_roughness_texture = self.texture_slot(info.index, info.tex_coord)?;
            }
        }

        if let Some(info) = &gltf_material.normal_texture {
            material.normal = NormalMap {
                scale: info.scale,
                texture: self.texture_slot(info.index, 0)?,
            };
        }

        material.emissive = Emission {
            factor: Vec3::from_array(gltf_material.emissive_factor),
            texture: match &gltf_material.emissive_texture {
                Some(info) => self.texture_slot(info.index, info.tex_coord)?,
                None => None,
            },
        };

        if let Some(info) = &gltf_material.occlusion_texture {
            material.occlusion = Occlusion {
                strength: info.strength,
                texture: self.texture_slot(info.index, 0)?,
            };
        }

        log::debug!(
            "Loaded material {} '{}' ({} textures)",
            index,
            material.name,
            material.textures().count()
        );

        let material = Arc::new(material);
        self.materials[index] = Some(Arc::clone(&material));
        Ok(material)
    }

    fn texture_slot(&mut self, texture: usize, tex_coord: usize) -> LoadResult<Option<TextureSlot>> {
        Ok(self
            .load_texture(texture)?
            .map(|texture| TextureSlot { texture, tex_coord }))
    }

    /// Texture `index`. The DDS extension source wins over the core source.
    /// `None` when the texture names no image at all.
    pub fn load_texture(&mut self, index: usize) -> LoadResult<Option<Arc<Texture>>> {
        let sampler = self.document.texture(index)?.sampler;
        let Some(image) = self.texture_source(index)? else {
            log::warn!("Texture {} has no image source", index);
            return Ok(None);
        };
        self.load_image(image, sampler).map(Some)
    }

    fn texture_source(&self, index: usize) -> LoadResult<Option<usize>> {
        let texture = self.document.texture(index)?;
        let dds = Extension::<TextureDdsExtension>::read(&texture.extensions, EXT_TEXTURE_DDS)
            .into_result(EXT_TEXTURE_DDS)?;
        Ok(dds.and_then(|dds| dds.source).or(texture.source))
    }

    /// Image `index` with the sampler of the first texture that used it.
    fn load_image(&mut self, index: usize, sampler: Option<usize>) -> LoadResult<Arc<Texture>> {
        if let Some(Some(texture)) = self.images.get(index) {
            return Ok(Arc::clone(texture));
        }

        let document = self.document;
        let image = document.image(index)?;
        let data = match self.predecoded.remove(&index) {
            Some(data) => data,
            None => decode_image(index, self.image_bytes(index)?)?,
        };
        let sampler = match sampler {
            Some(sampler) => SamplerSettings::from_gltf(document.sampler(sampler)?, self.config)?,
            None => SamplerSettings::fallback(self.config),
        };

        let texture = Texture {
            name: image
                .name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Image{}", index)),
            data,
            sampler,
        };
        log::debug!(
            "Loaded image {} '{}' ({}x{}, {:.1} KB)",
            index,
            texture.name,
            texture.width(),
            texture.height(),
            texture.data.size_bytes() as f32 / 1024.0
        );

        let texture = Arc::new(texture);
        self.images[index] = Some(Arc::clone(&texture));
        Ok(texture)
    }

    /// Encoded bytes of image `index`, from its URI or buffer view.
    fn image_bytes(&self, index: usize) -> LoadResult<Vec<u8>> {
        let image = self.document.image(index)?;
        match (&image.uri, image.buffer_view) {
            (Some(uri), _) => load_uri(self.resolver, self.path, uri).map_err(|source| LoadError::Io {
                path: format!("image {} ({})", index, uri.split(',').next().unwrap_or(uri)),
                source,
            }),
            (None, Some(view)) => self.buffers.view_bytes(view),
            (None, None) => Err(LoadError::InvalidDocument(format!(
                "image {} has neither uri nor bufferView",
                index
            ))),
        }
    }

    /// Decode every image referenced by a material on the rayon pool.
    ///
    /// Results are kept only if all of them decoded.
    pub fn predecode_images(&mut self) -> LoadResult<()> {
        let document = self.document;
        let mut wanted = BTreeSet::new();
        for material in &document.root.materials {
            let pbr = material.pbr_metallic_roughness.as_ref();
            let textures = [
                pbr.and_then(|pbr| pbr.base_color_texture.as_ref()).map(|info| info.index),
                pbr.and_then(|pbr| pbr.metallic_roughness_texture.as_ref()).map(|info| info.index),
                material.normal_texture.as_ref().map(|info| info.index),
                material.emissive_texture.as_ref().map(|info| info.index),
                material.occlusion_texture.as_ref().map(|info| info.index),
            ];
            for texture in textures.into_iter().flatten() {
                if let Some(image) = self.texture_source(texture)? {
                    wanted.insert(image);
                }
            }
        }
        wanted.retain(|image| !self.predecoded.contains_key(image));
        if wanted.is_empty() {
            return Ok(());
        }

        let session = &*self;
        let decoded: Vec<(usize, TextureData)> = wanted
            .into_par_iter()
            .map(|index| {
                let bytes = session.image_bytes(index)?;
                Ok((index, decode_image(index, bytes)?))
            })
            .collect::<LoadResult<_>>()?;

        log::debug!("Pre-decoded {} images", decoded.len());
        self.predecoded.extend(decoded);
        Ok(())
    }
}
