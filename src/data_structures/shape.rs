//! Geometry shared by every drawable: four parallel streams.
//!
//! - vertices: 3 floats per vertex
//! - texture coordinates: 2 floats per vertex (may be empty)
//! - normals: 3 floats per vertex (may be empty)
//! - indices: `u16` triangle list (may be empty for array draws)
//!
//! Shapes are validated once at construction and immutable afterwards.

use crate::error::ShapeError;

/// Largest vertex count addressable by 16-bit indices.
pub const MAX_VERTICES: usize = u16::MAX as usize + 1;

pub trait Shape {
    fn vertices(&self) -> &[f32];
    fn texture_coords(&self) -> &[f32];
    fn normals(&self) -> &[f32];
    fn indices(&self) -> &[u16];

    fn vertex_count(&self) -> usize {
        self.vertices().len() / 3
    }

    fn index_count(&self) -> usize {
        self.indices().len()
    }

    fn validate(&self) -> Result<(), ShapeError> {
        validate_streams(
            self.vertices(),
            self.texture_coords(),
            self.normals(),
            self.indices(),
        )
    }
}

/// Checks the cross-stream invariants of a shape.
pub fn validate_streams(
    vertices: &[f32],
    texture_coords: &[f32],
    normals: &[f32],
    indices: &[u16],
) -> Result<(), ShapeError> {
    if vertices.is_empty() {
        return Err(ShapeError::Empty);
    }
    if vertices.len() % 3 != 0 {
        return Err(ShapeError::RaggedVertices(vertices.len()));
    }
    let vertex_count = vertices.len() / 3;
    if vertex_count > MAX_VERTICES {
        return Err(ShapeError::TooManyVertices(vertex_count));
    }
    if !normals.is_empty() && normals.len() != vertex_count * 3 {
        return Err(ShapeError::StreamMismatch {
            stream: "normal",
            expected: vertex_count,
            found: normals.len() / 3,
        });
    }
    if !texture_coords.is_empty() && texture_coords.len() != vertex_count * 2 {
        return Err(ShapeError::StreamMismatch {
            stream: "texture coordinate",
            expected: vertex_count,
            found: texture_coords.len() / 2,
        });
    }
    if indices.len() % 3 != 0 {
        return Err(ShapeError::RaggedIndices(indices.len()));
    }
    if let Some((position, &index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &i)| i as usize >= vertex_count)
    {
        return Err(ShapeError::IndexOutOfRange {
            index,
            position,
            vertex_count,
        });
    }
    Ok(())
}

/// A validated set of geometry streams.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeData {
    vertices: Vec<f32>,
    texture_coords: Vec<f32>,
    normals: Vec<f32>,
    indices: Vec<u16>,
}

impl ShapeData {
    pub fn new(
        vertices: Vec<f32>,
        texture_coords: Vec<f32>,
        normals: Vec<f32>,
        indices: Vec<u16>,
    ) -> Result<Self, ShapeError> {
        validate_streams(&vertices, &texture_coords, &normals, &indices)?;
        Ok(Self {
            vertices,
            texture_coords,
            normals,
            indices,
        })
    }

    /// Position-only geometry drawn without an index buffer.
    pub fn positions(vertices: Vec<f32>) -> Result<Self, ShapeError> {
        Self::new(vertices, Vec::new(), Vec::new(), Vec::new())
    }
}

impl Shape for ShapeData {
    fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    fn texture_coords(&self) -> &[f32] {
        &self.texture_coords
    }

    fn normals(&self) -> &[f32] {
        &self.normals
    }

    fn indices(&self) -> &[u16] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        (
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        )
    }

    #[test]
    fn accepts_consistent_streams() {
        let (v, t, n) = triangle();
        let shape = ShapeData::new(v, t, n, vec![0, 1, 2]).unwrap();
        assert_eq!(shape.vertex_count(), 3);
        assert_eq!(shape.index_count(), 3);
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn rejects_index_past_vertex_count() {
        let (v, t, n) = triangle();
        let err = ShapeData::new(v, t, n, vec![0, 1, 3]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::IndexOutOfRange {
                index: 3,
                position: 2,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn rejects_mismatched_normals() {
        let (v, t, _) = triangle();
        let err = ShapeData::new(v, t, vec![0.0, 1.0, 0.0], vec![0, 1, 2]).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::StreamMismatch {
                stream: "normal",
                expected: 3,
                found: 1
            }
        ));
    }

    #[test]
    fn rejects_mismatched_texture_coords() {
        let (v, _, n) = triangle();
        let err = ShapeData::new(v, vec![0.0; 4], n, vec![0, 1, 2]).unwrap_err();
        assert!(matches!(err, ShapeError::StreamMismatch { expected: 3, found: 2, .. }));
    }

    #[test]
    fn rejects_ragged_and_empty_vertices() {
        assert_eq!(
            ShapeData::positions(vec![0.0; 4]).unwrap_err(),
            ShapeError::RaggedVertices(4)
        );
        assert_eq!(ShapeData::positions(Vec::new()).unwrap_err(), ShapeError::Empty);
    }

    #[test]
    fn rejects_partial_triangles() {
        let (v, t, n) = triangle();
        assert_eq!(
            ShapeData::new(v, t, n, vec![0, 1]).unwrap_err(),
            ShapeError::RaggedIndices(2)
        );
    }

    #[test]
    fn rejects_more_vertices_than_u16_can_address() {
        let vertices = vec![0.0; (MAX_VERTICES + 1) * 3];
        assert_eq!(
            ShapeData::positions(vertices).unwrap_err(),
            ShapeError::TooManyVertices(MAX_VERTICES + 1)
        );
    }

    #[test]
    fn position_only_shapes_are_valid() {
        let shape = ShapeData::positions(vec![1.0; 9]).unwrap();
        assert!(shape.normals().is_empty());
        assert!(shape.indices().is_empty());
        assert_eq!(shape.vertex_count(), 3);
    }
}
