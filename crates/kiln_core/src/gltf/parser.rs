//! Document parsing: the `.glb` binary envelope, JSON deserialization and
//! typed extension payloads.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{LoadError, LoadResult};
use crate::gltf::types::*;

const GLB_MAGIC: u32 = 0x46546C67; // "glTF" in little-endian
const GLB_VERSION: u32 = 2;
const GLB_CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
const GLB_CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

/// An immutable parsed glTF document.
#[derive(Clone, Debug)]
pub struct Document {
    pub root: GltfRoot,

    /// Binary chunk of a `.glb` file; backs buffers with no URI.
    pub blob: Option<Arc<[u8]>>,
}

impl Document {
    /// Parse `.gltf` JSON or a `.glb` container, detected by magic bytes.
    pub fn from_slice(data: &[u8]) -> LoadResult<Self> {
        if data.len() >= 4 && read_u32_le(data, 0) == GLB_MAGIC {
            Self::from_glb(data)
        } else {
            Ok(Self {
                root: serde_json::from_slice(data)?,
                blob: None,
            })
        }
    }

    /// Parse from GLB binary data.
    pub fn from_glb(data: &[u8]) -> LoadResult<Self> {
        if data.len() < 12 {
            return Err(LoadError::InvalidGlb("File too small for GLB header".into()));
        }

        let magic = read_u32_le(data, 0);
        let version = read_u32_le(data, 4);
        let length = read_u32_le(data, 8) as usize;

        if magic != GLB_MAGIC {
            return Err(LoadError::InvalidGlb("Invalid GLB magic".into()));
        }
        if version != GLB_VERSION {
            return Err(LoadError::InvalidGlb(format!(
                "Unsupported GLB version: {}",
                version
            )));
        }
        if length > data.len() {
            return Err(LoadError::InvalidGlb("File truncated".into()));
        }

        let mut offset = 12;
        let mut json_chunk: Option<&[u8]> = None;
        let mut bin_chunk: Option<&[u8]> = None;

        while offset + 8 <= length {
            let chunk_length = read_u32_le(data, offset) as usize;
            let chunk_type = read_u32_le(data, offset + 4);
            offset += 8;

            if offset + chunk_length > length {
                return Err(LoadError::InvalidGlb("Chunk extends past file end".into()));
            }

            let chunk_data = &data[offset..offset + chunk_length];
            offset += chunk_length;

            match chunk_type {
                GLB_CHUNK_JSON => json_chunk = Some(chunk_data),
                GLB_CHUNK_BIN => bin_chunk = Some(chunk_data),
                _ => log::debug!("Skipping unknown GLB chunk 0x{:08X}", chunk_type),
            }
        }

        let json_data = json_chunk.ok_or_else(|| LoadError::InvalidGlb("No JSON chunk".into()))?;

        Ok(Self {
            root: serde_json::from_slice(json_data)?,
            blob: bin_chunk.map(Arc::from),
        })
    }

    pub fn accessor(&self, index: usize) -> LoadResult<&GltfAccessor> {
        lookup(&self.root.accessors, index, "accessor")
    }

    pub fn buffer_view(&self, index: usize) -> LoadResult<&GltfBufferView> {
        lookup(&self.root.buffer_views, index, "buffer view")
    }

    pub fn buffer(&self, index: usize) -> LoadResult<&GltfBuffer> {
        lookup(&self.root.buffers, index, "buffer")
    }

    pub fn mesh(&self, index: usize) -> LoadResult<&GltfMesh> {
        lookup(&self.root.meshes, index, "mesh")
    }

    pub fn material(&self, index: usize) -> LoadResult<&GltfMaterial> {
        lookup(&self.root.materials, index, "material")
    }

    pub fn texture(&self, index: usize) -> LoadResult<&GltfTexture> {
        lookup(&self.root.textures, index, "texture")
    }

    pub fn sampler(&self, index: usize) -> LoadResult<&GltfSampler> {
        lookup(&self.root.samplers, index, "sampler")
    }

    pub fn image(&self, index: usize) -> LoadResult<&GltfImage> {
        lookup(&self.root.images, index, "image")
    }

    pub fn node(&self, index: usize) -> LoadResult<&GltfNode> {
        lookup(&self.root.nodes, index, "node")
    }

    pub fn scene(&self, index: usize) -> LoadResult<&GltfScene> {
        lookup(&self.root.scenes, index, "scene")
    }

    pub fn skin(&self, index: usize) -> LoadResult<&GltfSkin> {
        lookup(&self.root.skins, index, "skin")
    }

    pub fn animation(&self, index: usize) -> LoadResult<&GltfAnimation> {
        lookup(&self.root.animations, index, "animation")
    }
}

fn lookup<'a, T>(items: &'a [T], index: usize, kind: &str) -> LoadResult<&'a T> {
    items.get(index).ok_or_else(|| {
        LoadError::InvalidDocument(format!(
            "{} index {} out of range ({} defined)",
            kind,
            index,
            items.len()
        ))
    })
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// A named extension payload after schema validation.
#[derive(Debug)]
pub enum Extension<T> {
    /// The object carries no such extension.
    Absent,
    /// The payload deserialized into the expected shape.
    Present(T),
    /// The extension is there but its payload has the wrong shape.
    Malformed(serde_json::Error),
}

impl<T: DeserializeOwned> Extension<T> {
    /// Look up `name` in an `extensions` object and validate its payload.
    pub fn read(extensions: &Extensions, name: &str) -> Self {
        match extensions.as_ref().and_then(|map| map.get(name)) {
            None => Extension::Absent,
            Some(value) => match T::deserialize(value) {
                Ok(payload) => Extension::Present(payload),
                Err(err) => Extension::Malformed(err),
            },
        }
    }

    /// Malformed payloads become [`LoadError::UnsupportedExtensionData`].
    pub fn into_result(self, name: &'static str) -> LoadResult<Option<T>> {
        match self {
            Extension::Absent => Ok(None),
            Extension::Present(payload) => Ok(Some(payload)),
            Extension::Malformed(source) => Err(LoadError::UnsupportedExtensionData {
                extension: name,
                source,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Wrap a JSON document and optional binary chunk in a GLB container.
    pub(crate) fn make_glb(json: &str, bin: Option<&[u8]>) -> Vec<u8> {
        let mut json_bytes = json.as_bytes().to_vec();
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }
        let mut bin_bytes = bin.map(|b| b.to_vec());
        if let Some(bytes) = bin_bytes.as_mut() {
            while bytes.len() % 4 != 0 {
                bytes.push(0);
            }
        }

        let total = 12 + 8 + json_bytes.len() + bin_bytes.as_ref().map_or(0, |b| 8 + b.len());
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
        out.extend_from_slice(&GLB_VERSION.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&GLB_CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json_bytes);
        if let Some(bytes) = bin_bytes {
            out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            out.extend_from_slice(&GLB_CHUNK_BIN.to_le_bytes());
            out.extend_from_slice(&bytes);
        }
        out
    }

    #[test]
    fn test_parse_json_document() {
        let doc = Document::from_slice(br#"{ "scene": 0, "scenes": [ { "nodes": [] } ] }"#).unwrap();
        assert_eq!(doc.root.scene, Some(0));
        assert!(doc.blob.is_none());
    }

    #[test]
    fn test_parse_glb_with_binary_chunk() {
        let glb = make_glb(r#"{ "buffers": [ { "byteLength": 4 } ] }"#, Some(&[1, 2, 3, 4]));
        let doc = Document::from_slice(&glb).unwrap();
        assert_eq!(doc.root.buffers.len(), 1);
        assert_eq!(doc.blob.as_deref(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn test_truncated_glb_is_rejected() {
        let mut glb = make_glb("{}", None);
        glb.truncate(glb.len() - 1);
        assert!(matches!(Document::from_slice(&glb), Err(LoadError::InvalidGlb(_))));
    }

    #[test]
    fn test_index_out_of_range() {
        let doc = Document::from_slice(b"{}").unwrap();
        let err = doc.node(3).unwrap_err();
        assert!(err.to_string().contains("node index 3"));
    }

    #[test]
    fn test_extension_states() {
        let node: GltfNode = serde_json::from_str(
            r#"{ "extensions": { "Unity_colliders": { "collider": 2 } } }"#,
        )
        .unwrap();
        let present = Extension::<NodeColliderExtension>::read(&node.extensions, EXT_COLLIDERS)
            .into_result(EXT_COLLIDERS)
            .unwrap();
        assert_eq!(present.map(|e| e.collider), Some(2));

        let absent = Extension::<TextureDdsExtension>::read(&node.extensions, EXT_TEXTURE_DDS);
        assert!(matches!(absent, Extension::Absent));

        let bad: GltfNode = serde_json::from_str(
            r#"{ "extensions": { "Unity_colliders": { "collider": "three" } } }"#,
        )
        .unwrap();
        let err = Extension::<NodeColliderExtension>::read(&bad.extensions, EXT_COLLIDERS)
            .into_result(EXT_COLLIDERS)
            .unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedExtensionData { .. }));
    }
}
