//! `Unity_colliders` extension.

use kiln_math::handedness::Handedness;
use kiln_math::Vec3;

use crate::collider::{CapsuleDirection, Collider};
use crate::error::{LoadError, LoadResult};
use crate::gltf::parser::Extension;
use crate::gltf::session::DecodeSession;
use crate::gltf::types::{ColliderDef, CollidersExtension, NodeColliderExtension, EXT_COLLIDERS};

impl DecodeSession<'_> {
    /// Collider attached to glTF node `node`, if its extension names one.
    pub fn node_collider(&mut self, node: usize) -> LoadResult<Option<Collider>> {
        let extension = Extension::<NodeColliderExtension>::read(&self.document.node(node)?.extensions, EXT_COLLIDERS)
            .into_result(EXT_COLLIDERS)?;
        match extension {
            Some(extension) => self.load_collider(extension.collider).map(Some),
            None => Ok(None),
        }
    }

    /// Entry `index` of the document's collider table.
    pub fn load_collider(&mut self, index: usize) -> LoadResult<Collider> {
        let def = self.collider_def(index)?;

        let collider = if let Some(shape) = def.box_collider {
            Collider::Box {
                center: Vec3::from_array(shape.center).flip_handedness(),
                size: Vec3::from_array(shape.size),
            }
        } else if let Some(shape) = def.sphere_collider {
            Collider::Sphere {
                center: Vec3::from_array(shape.center).flip_handedness(),
                radius: shape.radius,
            }
        } else if let Some(shape) = def.capsule_collider {
            Collider::Capsule {
                center: Vec3::from_array(shape.center).flip_handedness(),
                radius: shape.radius,
                height: shape.height,
                direction: CapsuleDirection::parse(&shape.direction)?,
            }
        } else if let Some(shape) = def.mesh_collider {
            Collider::Mesh {
                convex: shape.convex,
                mesh: shape.mesh.map(|mesh| self.assemble_mesh(mesh)).transpose()?,
            }
        } else {
            return Err(LoadError::InvalidDocument(format!(
                "collider {} defines no shape",
                index
            )));
        };

        log::debug!("Loaded {} collider {}", collider.kind(), index);
        Ok(collider)
    }

    fn collider_def(&mut self, index: usize) -> LoadResult<ColliderDef> {
        if self.collider_table.is_none() {
            let table = Extension::<CollidersExtension>::read(&self.document.root.extensions, EXT_COLLIDERS)
                .into_result(EXT_COLLIDERS)?
                .ok_or_else(|| {
                    LoadError::InvalidDocument(format!(
                        "collider {} referenced but the document has no {} table",
                        index, EXT_COLLIDERS
                    ))
                })?;
            self.collider_table = Some(table.colliders);
        }

        self.collider_table
            .as_ref()
            .and_then(|table| table.get(index))
            .cloned()
            .ok_or_else(|| {
                LoadError::InvalidDocument(format!("collider index {} out of range", index))
            })
    }
}
