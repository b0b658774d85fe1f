//! The skybox cube: 36 position-only vertices, no indices.

use crate::{
    data_structures::shape::{Shape, ShapeData},
    error::ShapeError,
};

/// Half the edge length of the cube.
pub const SIZE: f32 = 500.0;
pub const VERTEX_COUNT: usize = 36;

#[rustfmt::skip]
const FACES: [[f32; 3]; VERTEX_COUNT] = [
    // -z
    [-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],
    // -x
    [-1.0, -1.0,  1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0],
    [-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [-1.0, -1.0,  1.0],
    // +x
    [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0],
    // +z
    [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0],
    // +y
    [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0],
    [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0],
    // -y
    [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0],
    [ 1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0],
];

#[derive(Debug, Clone)]
pub struct SkyBoxShape {
    data: ShapeData,
}

impl SkyBoxShape {
    pub fn new() -> Result<Self, ShapeError> {
        Self::with_size(SIZE)
    }

    pub fn with_size(size: f32) -> Result<Self, ShapeError> {
        let vertices = FACES
            .iter()
            .flat_map(|corner| corner.map(|c| c * size))
            .collect();
        Ok(Self {
            data: ShapeData::positions(vertices)?,
        })
    }
}

impl Shape for SkyBoxShape {
    fn vertices(&self) -> &[f32] {
        self.data.vertices()
    }

    fn texture_coords(&self) -> &[f32] {
        &[]
    }

    fn normals(&self) -> &[f32] {
        &[]
    }

    fn indices(&self) -> &[u16] {
        &[]
    }
}
