use super::{Resource, ResourceError, ResourceKind};
use crate::io::AssetIo;
use glam::{Vec2, Vec3};
use std::io::Cursor;

/// One mesh of a model, de-indexed to a single index stream.
#[derive(Debug, Clone, Default)]
pub struct ModelObject {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tex_coords: Vec<Vec2>,
    pub indices: Vec<u32>,
    pub material_id: Option<usize>,
    /// Mean of all positions.
    pub center_of_mass: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct ModelMaterial {
    pub name: String,
    pub diffuse: Option<[f32; 3]>,
    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
}

#[derive(Debug)]
struct ModelSource {
    obj: Vec<u8>,
    mtl: Option<Vec<u8>>,
}

/// Wavefront OBJ model with optional MTL materials.
///
/// The manifest path names the model without extension: `models/sponza`
/// reads `models/sponza.obj` and, when present, `models/sponza.mtl`.
#[derive(Debug, Default)]
pub struct Model {
    source: Option<ModelSource>,
    objects: Vec<ModelObject>,
    materials: Vec<ModelMaterial>,
}

impl Model {
    pub fn objects(&self) -> &[ModelObject] {
        &self.objects
    }

    pub fn materials(&self) -> &[ModelMaterial] {
        &self.materials
    }

    pub(super) fn load_from_storage(&mut self, io: &AssetIo, path: &str) -> Result<(), ResourceError> {
        let stem = path.strip_suffix(".obj").unwrap_or(path);
        let obj = io.read(&format!("{stem}.obj"))?;

        let mtl_path = format!("{stem}.mtl");
        let mtl = if io.exists(&mtl_path) {
            Some(io.read(&mtl_path)?)
        } else {
            None
        };

        self.source = Some(ModelSource { obj, mtl });
        Ok(())
    }

    pub(super) fn load(&mut self, path: &str) -> Result<(), ResourceError> {
        let source = self.source.take().ok_or_else(|| ResourceError::NotInMemory {
            path: path.to_string(),
        })?;

        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj_buf(
            &mut Cursor::new(source.obj.as_slice()),
            &options,
            |_| match &source.mtl {
                Some(mtl) => tobj::load_mtl_buf(&mut Cursor::new(mtl.as_slice())),
                None => Err(tobj::LoadError::OpenFileFailed),
            },
        )
        .map_err(|source| ResourceError::Model {
            path: path.to_string(),
            source,
        })?;

        let materials = materials.unwrap_or_else(|err| {
            tracing::warn!(path, error = %err, "model materials unavailable");
            Vec::new()
        });

        self.objects = models.into_iter().map(object_from_mesh).collect();
        self.materials = materials
            .into_iter()
            .map(|material| ModelMaterial {
                name: material.name,
                diffuse: material.diffuse,
                diffuse_texture: material.diffuse_texture,
                normal_texture: material.normal_texture,
            })
            .collect();

        tracing::trace!(
            path,
            objects = self.objects.len(),
            materials = self.materials.len(),
            "model parsed"
        );
        Ok(())
    }

    pub(super) fn unload(&mut self) {
        *self = Self::default();
    }
}

fn object_from_mesh(model: tobj::Model) -> ModelObject {
    let mesh = model.mesh;

    let positions: Vec<Vec3> = mesh
        .positions
        .chunks_exact(3)
        .map(|v| Vec3::new(v[0], v[1], v[2]))
        .collect();
    let normals = mesh
        .normals
        .chunks_exact(3)
        .map(|n| Vec3::new(n[0], n[1], n[2]))
        .collect();
    let tex_coords = mesh
        .texcoords
        .chunks_exact(2)
        .map(|t| Vec2::new(t[0], t[1]))
        .collect();

    let center_of_mass = if positions.is_empty() {
        Vec3::ZERO
    } else {
        positions.iter().copied().sum::<Vec3>() / positions.len() as f32
    };

    ModelObject {
        name: model.name,
        positions,
        normals,
        tex_coords,
        indices: mesh.indices,
        material_id: mesh.material_id,
        center_of_mass,
    }
}

impl ResourceKind for Model {
    const NAME: &'static str = "model";

    fn create() -> Resource {
        Resource::Model(Model::default())
    }

    fn project(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Model(model) => Some(model),
            _ => None,
        }
    }
}
