//! glTF document loading.
//!
//! [`GltfLoader`] turns a document path into a [`LoadedScene`]: a template
//! [`SceneGraph`] in the left-handed target convention plus the shared
//! assets it references. Loading is synchronous; image decoding may fan out
//! over rayon.

use std::path::Path;
use std::sync::Arc;

use kiln_math::handedness::{flip_all, Handedness};
use kiln_math::{Mat4, Quat, Transform, Vec3};

use crate::config::LoaderConfig;
use crate::error::{LoadError, LoadResult};
use crate::gltf::parser::Document;
use crate::gltf::session::{DecodeSession, DecodedAssets};
use crate::gltf::types::GltfNode;
use crate::resolver::PathResolver;
use crate::scene::{MeshAttachment, NodeId, SceneGraph, SkinBinding};

/// Output of one document load.
#[derive(Clone, Debug)]
pub struct LoadedScene {
    pub scene: SceneGraph,
    pub assets: DecodedAssets,
}

/// Loads glTF documents through a [`PathResolver`].
pub struct GltfLoader<'a> {
    resolver: &'a dyn PathResolver,
    config: &'a LoaderConfig,
}

impl<'a> GltfLoader<'a> {
    pub fn new(resolver: &'a dyn PathResolver, config: &'a LoaderConfig) -> Self {
        Self { resolver, config }
    }

    /// Resolve, parse and decode the document at `path`.
    pub fn load(&self, path: &str) -> LoadResult<LoadedScene> {
        let bytes = self.resolver.resolve(path).map_err(|source| LoadError::Io {
            path: path.to_string(),
            source,
        })?;
        let document = Document::from_slice(&bytes)?;
        self.load_document(path, &document)
    }

    /// Decode an already-parsed document. `path` names it for relative
    /// URIs, the root node name and error messages.
    pub fn load_document(&self, path: &str, document: &Document) -> LoadResult<LoadedScene> {
        let scene_index = document.root.scene.ok_or_else(|| LoadError::NoDefaultScene {
            path: path.to_string(),
        })?;

        let mut session = DecodeSession::new(document, path, self.config, self.resolver);
        if self.config.parallel_image_decode {
            session.predecode_images()?;
        }

        let mut scene = session.build_scene(scene_index, root_name(path))?;
        session.bind_skins(&mut scene)?;

        let root = scene.root();
        let animations = (0..document.root.animations.len())
            .map(|index| session.assemble_clip(index, &scene, root))
            .collect::<LoadResult<Vec<_>>>()?;
        scene.animations = animations;

        log::info!(
            "Loaded {}: {} nodes, {} meshes, {} materials, {} textures, {} clips, {} triangles",
            path,
            scene.len(),
            session.meshes.iter().flatten().count(),
            session.materials.iter().flatten().count(),
            session.images.iter().flatten().count(),
            scene.animations.len(),
            scene.total_triangle_count()
        );

        Ok(LoadedScene {
            scene,
            assets: session.into_assets(),
        })
    }
}

/// Root node name: the document file name without extension.
fn root_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Local transform in the target convention. An explicit matrix wins over
/// the TRS properties.
pub fn node_transform(node: &GltfNode) -> Transform {
    if let Some(matrix) = node.matrix {
        return Transform::from_matrix(Mat4::from_cols_array(&matrix).flip_handedness());
    }

    Transform {
        translation: node
            .translation
            .map(Vec3::from_array)
            .unwrap_or(Vec3::ZERO)
            .flip_handedness(),
        rotation: node
            .rotation
            .map(Quat::from_array)
            .unwrap_or(Quat::IDENTITY)
            .flip_handedness(),
        scale: node.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
    }
}

impl DecodeSession<'_> {
    /// Build scene `scene_index` under a fresh root named `root_name`.
    pub fn build_scene(&mut self, scene_index: usize, root_name: String) -> LoadResult<SceneGraph> {
        let document = self.document;
        let scene = document.scene(scene_index)?;

        let mut graph = SceneGraph::new(root_name);
        let root = graph.root();
        for &node in &scene.nodes {
            self.build_node(node, root, &mut graph)?;
        }

        Ok(graph)
    }

    fn build_node(&mut self, index: usize, parent: NodeId, graph: &mut SceneGraph) -> LoadResult<()> {
        let document = self.document;
        let node = document.node(index)?;
        if self.node_ids[index].is_some() {
            return Err(LoadError::InvalidDocument(format!(
                "node {} is reached more than once (cycle or shared child)",
                index
            )));
        }

        let name = node
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("Node{}", index));
        let id = graph.add_node(parent, name, node_transform(node), Some(index));
        self.node_ids[index] = Some(id);

        if let Some(mesh) = node.mesh {
            let attachment = MeshAttachment {
                mesh: self.assemble_mesh(mesh)?,
                materials: self.mesh_materials(mesh)?,
                skin: None,
            };
            graph.node_mut(id).mesh = Some(attachment);
            if let Some(skin) = node.skin {
                self.pending_skins.push((id, skin));
            }
        } else if node.skin.is_some() {
            log::warn!("Node {} has a skin but no mesh", index);
        }

        if let Some(collider) = self.node_collider(index)? {
            graph.node_mut(id).collider = Some(collider);
        }

        for &child in &node.children {
            self.build_node(child, id, graph)?;
        }

        Ok(())
    }

    /// Bind skins recorded during [`build_scene`](Self::build_scene). Every
    /// joint must already exist in `graph`.
    pub fn bind_skins(&mut self, graph: &mut SceneGraph) -> LoadResult<()> {
        for (node, skin_index) in std::mem::take(&mut self.pending_skins) {
            let document = self.document;
            let skin = document.skin(skin_index)?;
            let bind_poses = self.bind_poses(skin_index)?;

            let bones = skin
                .joints
                .iter()
                .map(|&joint| {
                    self.node_id(joint).ok_or_else(|| {
                        LoadError::InvalidDocument(format!(
                            "skin {} joint node {} is not part of the scene",
                            skin_index, joint
                        ))
                    })
                })
                .collect::<LoadResult<Vec<_>>>()?;

            let root_bone = skin.skeleton.and_then(|skeleton| {
                let bone = self.node_id(skeleton);
                if bone.is_none() {
                    log::warn!("Skin {} skeleton node {} is not part of the scene", skin_index, skeleton);
                }
                bone
            });

            if let Some(attachment) = graph.node_mut(node).mesh.as_mut() {
                if !attachment.mesh.is_skinned() {
                    log::warn!("Skin {} bound to mesh '{}' without joint weights", skin_index, attachment.mesh.name);
                }
                attachment.skin = Some(SkinBinding {
                    skin: skin_index,
                    bones,
                    bind_poses,
                    root_bone,
                });
            }
        }

        Ok(())
    }

    /// Inverse bind matrices of skin `index`, converted once per session.
    fn bind_poses(&mut self, index: usize) -> LoadResult<Arc<Vec<Mat4>>> {
        if let Some(Some(poses)) = self.bind_poses.get(index) {
            return Ok(Arc::clone(poses));
        }

        let document = self.document;
        let skin = document.skin(index)?;
        let poses = match skin.inverse_bind_matrices {
            Some(accessor) => {
                let mut matrices = self.buffers.accessor(accessor)?.into_mat4(accessor)?;
                if matrices.len() < skin.joints.len() {
                    return Err(LoadError::malformed_accessor(
                        accessor,
                        format!(
                            "{} inverse bind matrices for {} joints",
                            matrices.len(),
                            skin.joints.len()
                        ),
                    ));
                }
                matrices.truncate(skin.joints.len());
                flip_all(&mut matrices);
                matrices
            }
            None => vec![Mat4::IDENTITY; skin.joints.len()],
        };

        let poses = Arc::new(poses);
        self.bind_poses[index] = Some(Arc::clone(&poses));
        Ok(poses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_name_is_file_stem() {
        assert_eq!(root_name("models/robot.gltf"), "robot");
        assert_eq!(root_name("a.glb"), "a");
    }

    #[test]
    fn test_trs_is_converted() {
        let node = GltfNode {
            translation: Some([1.0, 2.0, 3.0]),
            rotation: Some([0.1, 0.2, 0.3, 0.9]),
            scale: Some([2.0, 2.0, 2.0]),
            ..Default::default()
        };
        let t = node_transform(&node);
        assert_eq!(t.translation, Vec3::new(-1.0, 2.0, 3.0));
        assert_eq!(t.rotation, Quat::from_xyzw(-0.1, 0.2, 0.3, -0.9));
        assert_eq!(t.scale, Vec3::splat(2.0));
    }

    #[test]
    fn test_matrix_wins_over_trs() {
        let matrix = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        let node = GltfNode {
            matrix: Some(matrix.to_cols_array()),
            translation: Some([100.0, 0.0, 0.0]),
            ..Default::default()
        };
        let t = node_transform(&node);
        assert!((t.translation - Vec3::new(-4.0, 5.0, 6.0)).length() < 1e-5);
    }

    #[test]
    fn test_defaults_are_identity() {
        let t = node_transform(&GltfNode::default());
        assert_eq!(t.translation, Vec3::ZERO);
        assert_eq!(t.scale, Vec3::ONE);
        // Mirroring identity gives -identity, the same rotation
        assert!((t.rotation.dot(Quat::IDENTITY).abs() - 1.0).abs() < 1e-6);
    }
}
