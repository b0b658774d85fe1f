//! One named group of a Wavefront OBJ file as a validated shape.

use crate::{
    data_structures::shape::{Shape, ShapeData, MAX_VERTICES},
    error::ShapeError,
};

/// The parts of an MTL material the renderers use.
#[derive(Debug, Clone, PartialEq)]
pub struct WfMaterial {
    pub name: String,
    pub diffuse_texture: Option<String>,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    pub dissolve: f32,
}

impl WfMaterial {
    pub fn is_transparent(&self) -> bool {
        self.dissolve < 1.0
    }
}

impl From<&tobj::Material> for WfMaterial {
    fn from(m: &tobj::Material) -> Self {
        Self {
            name: m.name.clone(),
            diffuse_texture: m.diffuse_texture.clone(),
            diffuse: m.diffuse.unwrap_or([1.0; 3]),
            specular: m.specular.unwrap_or([0.0; 3]),
            shininess: m.shininess.unwrap_or(0.0),
            dissolve: m.dissolve.unwrap_or(1.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WfObject {
    name: String,
    data: ShapeData,
    material: Option<WfMaterial>,
}

impl WfObject {
    /// Converts a triangulated, single-indexed `tobj` model.
    ///
    /// Texture coordinates are flipped vertically: OBJ puts the origin in the
    /// bottom-left corner while wgpu samples from the top-left.
    pub fn from_tobj(model: &tobj::Model, materials: &[tobj::Material]) -> Result<Self, ShapeError> {
        let mesh = &model.mesh;
        let vertex_count = mesh.positions.len() / 3;
        if vertex_count > MAX_VERTICES {
            return Err(ShapeError::TooManyVertices(vertex_count));
        }
        let texture_coords = mesh
            .texcoords
            .chunks(2)
            .flat_map(|uv| [uv[0], 1.0 - uv.get(1).copied().unwrap_or(0.0)])
            .collect();
        let mut indices = Vec::with_capacity(mesh.indices.len());
        for (position, &index) in mesh.indices.iter().enumerate() {
            let index = u16::try_from(index).map_err(|_| ShapeError::IndexOutOfRange {
                index: u16::MAX,
                position,
                vertex_count,
            })?;
            indices.push(index);
        }
        let data = ShapeData::new(
            mesh.positions.clone(),
            texture_coords,
            mesh.normals.clone(),
            indices,
        )?;
        let material = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .map(WfMaterial::from);
        Ok(Self {
            name: model.name.clone(),
            data,
            material,
        })
    }

    pub fn new(name: impl Into<String>, data: ShapeData, material: Option<WfMaterial>) -> Self {
        Self {
            name: name.into(),
            data,
            material,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> Option<&WfMaterial> {
        self.material.as_ref()
    }
}

impl Shape for WfObject {
    fn vertices(&self) -> &[f32] {
        self.data.vertices()
    }

    fn texture_coords(&self) -> &[f32] {
        self.data.texture_coords()
    }

    fn normals(&self) -> &[f32] {
        self.data.normals()
    }

    fn indices(&self) -> &[u16] {
        self.data.indices()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufReader, Cursor};

    use super::*;

    const QUAD: &str = "\
mtllib quad.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl stone
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const MTL: &str = "newmtl stone\nKd 0.5 0.5 0.5\nKs 0.3 0.3 0.3\nNs 10\nd 0.5\nmap_Kd stone.png\n";

    fn parse(src: &str) -> (Vec<tobj::Model>, Vec<tobj::Material>) {
        let mut reader = BufReader::new(Cursor::new(src));
        let (models, materials) = tobj::load_obj_buf(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(MTL))),
        )
        .unwrap();
        (models, materials.unwrap())
    }

    #[test]
    fn converts_triangulated_quad() {
        let (models, materials) = parse(QUAD);
        let obj = WfObject::from_tobj(&models[0], &materials).unwrap();
        assert_eq!(obj.name(), "quad");
        assert_eq!(obj.vertex_count(), 4);
        assert_eq!(obj.index_count(), 6);
        assert_eq!(obj.normals().len(), 12);
        assert!(obj.validate().is_ok());
    }

    #[test]
    fn flips_v_coordinate() {
        let (models, materials) = parse(QUAD);
        let obj = WfObject::from_tobj(&models[0], &materials).unwrap();
        // first vertex had vt 0 0
        assert_eq!(&obj.texture_coords()[0..2], &[0.0, 1.0]);
    }

    #[test]
    fn keeps_material_properties() {
        let (models, materials) = parse(QUAD);
        let obj = WfObject::from_tobj(&models[0], &materials).unwrap();
        let material = obj.material().unwrap();
        assert_eq!(material.diffuse_texture.as_deref(), Some("stone.png"));
        assert_eq!(material.shininess, 10.0);
        assert_eq!(material.specular, [0.3; 3]);
        assert!(material.is_transparent());
    }
}
