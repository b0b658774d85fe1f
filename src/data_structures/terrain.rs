//! A terrain tile placed in the world.

use crate::{
    data_structures::{
        model::{RawModel, TextureId},
        terrain_shape::{self, HeightGrid, TerrainShape},
    },
    math::{self, Vector2f, Vector3f},
};

/// The five textures blended over a terrain.
///
/// The weight map's red, green and blue channels select how much of `mud`,
/// `grass` and `path` shows; whatever is left is `background`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainTexturesPack {
    pub weight_map: TextureId,
    pub background: TextureId,
    pub mud: TextureId,
    pub grass: TextureId,
    pub path: TextureId,
}

#[derive(Debug, Clone)]
pub struct Terrain {
    position: Vector3f,
    model: RawModel,
    textures: TerrainTexturesPack,
    heights: HeightGrid,
}

impl Terrain {
    /// Places the tile at grid cell `(grid_x, grid_z)`; one cell is one tile.
    pub fn new(
        grid_x: i32,
        grid_z: i32,
        model: RawModel,
        textures: TerrainTexturesPack,
        shape: &TerrainShape,
    ) -> Self {
        Self {
            position: Vector3f::new(
                grid_x as f32 * terrain_shape::SIZE,
                0.0,
                grid_z as f32 * terrain_shape::SIZE,
            ),
            model,
            textures,
            heights: shape.heights().clone(),
        }
    }

    pub fn position(&self) -> Vector3f {
        self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn z(&self) -> f32 {
        self.position.z
    }

    pub fn model(&self) -> &RawModel {
        &self.model
    }

    pub fn textures(&self) -> &TerrainTexturesPack {
        &self.textures
    }

    /// Ground height under the world position `(world_x, world_z)`.
    ///
    /// Interpolates inside the grid triangle that contains the point;
    /// positions off this tile report 0.
    pub fn height_of_terrain(&self, world_x: f32, world_z: f32) -> f32 {
        let count = self.heights.count();
        if count < 2 {
            return 0.0;
        }
        let terrain_x = world_x - self.position.x;
        let terrain_z = world_z - self.position.z;
        let grid_square = terrain_shape::SIZE / (count - 1) as f32;
        let grid_x = (terrain_x / grid_square).floor();
        let grid_z = (terrain_z / grid_square).floor();
        if grid_x < 0.0 || grid_z < 0.0 || grid_x >= (count - 1) as f32 || grid_z >= (count - 1) as f32 {
            return 0.0;
        }
        let (gx, gz) = (grid_x as usize, grid_z as usize);
        let x_coord = (terrain_x - grid_x * grid_square) / grid_square;
        let z_coord = (terrain_z - grid_z * grid_square) / grid_square;
        let h = |x: usize, z: usize| self.heights.get(x, z).unwrap_or(0.0);
        let at = Vector2f::new(x_coord, z_coord);
        if x_coord <= 1.0 - z_coord {
            math::barycentric(
                Vector3f::new(0.0, h(gx, gz), 0.0),
                Vector3f::new(1.0, h(gx + 1, gz), 0.0),
                Vector3f::new(0.0, h(gx, gz + 1), 1.0),
                at,
            )
        } else {
            math::barycentric(
                Vector3f::new(1.0, h(gx + 1, gz), 0.0),
                Vector3f::new(1.0, h(gx + 1, gz + 1), 1.0),
                Vector3f::new(0.0, h(gx, gz + 1), 1.0),
                at,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{
        model::VaoId,
        terrain_shape::{HeightMap, MAX_HEIGHT, MIN_HEIGHT, SIZE},
    };

    fn pack() -> TerrainTexturesPack {
        TerrainTexturesPack {
            weight_map: TextureId(0),
            background: TextureId(1),
            mud: TextureId(2),
            grass: TextureId(3),
            path: TextureId(4),
        }
    }

    fn terrain(grid_x: i32, grid_z: i32, shape: &TerrainShape) -> Terrain {
        Terrain::new(grid_x, grid_z, RawModel::indexed(VaoId(1), 4, 6), pack(), shape)
    }

    #[test]
    fn grid_coordinates_scale_by_tile_size() {
        let shape = TerrainShape::generate(2, None).unwrap();
        let t = terrain(-1, 2, &shape);
        assert_eq!(t.position(), Vector3f::new(-SIZE, 0.0, 2.0 * SIZE));
    }

    #[test]
    fn flat_tile_has_zero_height() {
        let shape = TerrainShape::generate(5, None).unwrap();
        let t = terrain(0, 0, &shape);
        assert_eq!(t.height_of_terrain(100.0, 250.0), 0.0);
    }

    #[test]
    fn heights_interpolate_across_the_ramp() {
        // heights rise linearly along x from MIN to MAX
        let map = HeightMap::from_fn(2, 2, |x, _| x as f32);
        let shape = TerrainShape::generate(2, Some(&map)).unwrap();
        let t = terrain(1, 0, &shape);
        let middle = t.height_of_terrain(SIZE + SIZE / 2.0, SIZE / 4.0);
        assert!((middle - (MIN_HEIGHT + MAX_HEIGHT) / 2.0).abs() < 1e-3);
        let near_end = t.height_of_terrain(SIZE + SIZE * 0.9, SIZE * 0.8);
        assert!((near_end - (MIN_HEIGHT + 0.9 * (MAX_HEIGHT - MIN_HEIGHT))).abs() < 1e-3);
    }

    #[test]
    fn positions_off_the_tile_are_zero() {
        let map = HeightMap::from_fn(2, 2, |_, _| 1.0);
        let shape = TerrainShape::generate(2, Some(&map)).unwrap();
        let t = terrain(0, 0, &shape);
        assert_eq!(t.height_of_terrain(-1.0, 10.0), 0.0);
        assert_eq!(t.height_of_terrain(10.0, SIZE + 1.0), 0.0);
        assert!((t.height_of_terrain(10.0, 10.0) - MAX_HEIGHT).abs() < 1e-3);
    }
}
