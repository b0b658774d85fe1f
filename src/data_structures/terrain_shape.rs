//! Grid geometry for a square terrain tile.
//!
//! The tile has `vertex_count` vertices per side spread over [`SIZE`] world
//! units. Heights come from an optional [`HeightMap`]; normals are derived from
//! the neighbouring heights so lighting follows the relief.

use cgmath::InnerSpace;

use crate::{
    data_structures::shape::{Shape, ShapeData, MAX_VERTICES},
    error::ShapeError,
    math::Vector3f,
};

/// World-space edge length of one terrain tile.
pub const SIZE: f32 = 500.0;
/// Vertices along each side of a tile.
pub const VERTEX_COUNT: usize = 128;
pub const MIN_HEIGHT: f32 = -40.0;
pub const MAX_HEIGHT: f32 = 40.0;

/// Largest packed 24-bit colour value.
const MAX_PIXEL_COLOUR: f32 = 0x00FF_FFFF as f32;

/// Relief sampled from an image, one normalised value in `[0, 1]` per pixel.
///
/// A pixel's value is its colour packed as `b << 16 | g << 8 | r`.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightMap {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl HeightMap {
    pub fn from_image(img: &image::DynamicImage) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        let values = rgb
            .pixels()
            .map(|p| {
                let packed = (p[2] as u32) << 16 | (p[1] as u32) << 8 | p[0] as u32;
                packed as f32 / MAX_PIXEL_COLOUR
            })
            .collect();
        Self {
            width: width as usize,
            height: height as usize,
            values,
        }
    }

    /// Builds a map from normalised values; `f(x, y)` is clamped to `[0, 1]`.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                values.push(f(x, y).clamp(0.0, 1.0));
            }
        }
        Self {
            width,
            height,
            values,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// World height for grid vertex `(gx, gz)` of a `count`-sided grid.
    ///
    /// The grid is stretched over the whole image, nearest pixel wins.
    fn height_at(&self, gx: usize, gz: usize, count: usize) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let scale = |g: usize, extent: usize| {
            if count <= 1 {
                0
            } else {
                ((g as f32 / (count - 1) as f32) * (extent - 1) as f32).round() as usize
            }
        };
        let px = scale(gx, self.width);
        let py = scale(gz, self.height);
        let normal = self.values[py * self.width + px];
        normal * (MAX_HEIGHT - MIN_HEIGHT) + MIN_HEIGHT
    }
}

/// Heights of the grid vertices, addressed as `(x, z)` in grid units.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    count: usize,
    values: Vec<f32>,
}

impl HeightGrid {
    /// Vertices along one side.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn get(&self, x: usize, z: usize) -> Option<f32> {
        (x < self.count && z < self.count).then(|| self.values[z * self.count + x])
    }

    fn clamped(&self, x: isize, z: isize) -> f32 {
        let last = self.count as isize - 1;
        let x = x.clamp(0, last) as usize;
        let z = z.clamp(0, last) as usize;
        self.values[z * self.count + x]
    }
}

#[derive(Debug, Clone)]
pub struct TerrainShape {
    data: ShapeData,
    heights: HeightGrid,
}

impl TerrainShape {
    /// A completely flat tile with the default resolution.
    pub fn flat() -> Result<Self, ShapeError> {
        Self::generate(VERTEX_COUNT, None)
    }

    pub fn from_height_map(height_map: &HeightMap) -> Result<Self, ShapeError> {
        Self::generate(VERTEX_COUNT, Some(height_map))
    }

    /// Builds a `vertex_count` x `vertex_count` grid.
    ///
    /// Stream lengths are `3n²` vertices and normals, `2n²` texture
    /// coordinates and `6(n-1)²` indices.
    pub fn generate(
        vertex_count: usize,
        height_map: Option<&HeightMap>,
    ) -> Result<Self, ShapeError> {
        let n = vertex_count;
        let count = n * n;
        if count > MAX_VERTICES {
            return Err(ShapeError::TooManyVertices(count));
        }
        let last = n.saturating_sub(1).max(1) as f32;

        let mut heights = Vec::with_capacity(count);
        for gz in 0..n {
            for gx in 0..n {
                heights.push(height_map.map_or(0.0, |map| map.height_at(gx, gz, n)));
            }
        }
        let heights = HeightGrid { count: n, values: heights };

        let mut vertices = Vec::with_capacity(count * 3);
        let mut normals = Vec::with_capacity(count * 3);
        let mut texture_coords = Vec::with_capacity(count * 2);
        for i in 0..n {
            for j in 0..n {
                let height = heights.clamped(j as isize, i as isize);
                vertices.extend_from_slice(&[
                    j as f32 / last * SIZE,
                    height,
                    i as f32 / last * SIZE,
                ]);
                let normal = Self::normal(&heights, j as isize, i as isize);
                normals.extend_from_slice(&[normal.x, normal.y, normal.z]);
                texture_coords.extend_from_slice(&[j as f32 / last, i as f32 / last]);
            }
        }

        let mut indices = Vec::with_capacity(6 * n.saturating_sub(1).pow(2));
        for gz in 0..n.saturating_sub(1) {
            for gx in 0..n - 1 {
                let top_left = (gz * n + gx) as u16;
                let top_right = top_left + 1;
                let bottom_left = ((gz + 1) * n + gx) as u16;
                let bottom_right = bottom_left + 1;
                indices.extend_from_slice(&[
                    top_left,
                    bottom_left,
                    top_right,
                    top_right,
                    bottom_left,
                    bottom_right,
                ]);
            }
        }

        let data = ShapeData::new(vertices, texture_coords, normals, indices)?;
        Ok(Self { data, heights })
    }

    pub fn heights(&self) -> &HeightGrid {
        &self.heights
    }

    fn normal(heights: &HeightGrid, x: isize, z: isize) -> Vector3f {
        let left = heights.clamped(x - 1, z);
        let right = heights.clamped(x + 1, z);
        let down = heights.clamped(x, z - 1);
        let up = heights.clamped(x, z + 1);
        Vector3f::new(left - right, 2.0, down - up).normalize()
    }
}

impl Shape for TerrainShape {
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
    use super::*;

    #[test]
    fn default_grid_has_expected_stream_lengths() {
        let shape = TerrainShape::flat().unwrap();
        assert_eq!(shape.vertex_count(), 16384);
        assert_eq!(shape.vertices().len(), 49152);
        assert_eq!(shape.normals().len(), 49152);
        assert_eq!(shape.texture_coords().len(), 32768);
        assert_eq!(shape.indices().len(), 96774);
        assert!(shape.validate().is_ok());
    }

    #[test]
    fn grid_spans_the_tile() {
        let shape = TerrainShape::generate(4, None).unwrap();
        let v = shape.vertices();
        assert_eq!(&v[0..3], &[0.0, 0.0, 0.0]);
        let last = v.len() - 3;
        assert_eq!(&v[last..], &[SIZE, 0.0, SIZE]);
        let t = shape.texture_coords();
        assert_eq!(&t[t.len() - 2..], &[1.0, 1.0]);
    }

    #[test]
    fn first_quad_winds_like_the_rest() {
        let shape = TerrainShape::generate(3, None).unwrap();
        assert_eq!(&shape.indices()[0..6], &[0, 3, 1, 1, 3, 4]);
    }

    #[test]
    fn flat_terrain_points_up() {
        let shape = TerrainShape::generate(8, None).unwrap();
        for n in shape.normals().chunks(3) {
            assert_eq!(n, &[0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn height_map_drives_vertex_heights() {
        // black is the lowest point, white the highest
        let map = HeightMap::from_fn(2, 2, |x, _| x as f32);
        let shape = TerrainShape::generate(2, Some(&map)).unwrap();
        let ys: Vec<f32> = shape.vertices().chunks(3).map(|v| v[1]).collect();
        assert_eq!(ys, vec![MIN_HEIGHT, MAX_HEIGHT, MIN_HEIGHT, MAX_HEIGHT]);
        assert_eq!(shape.heights().get(1, 0), Some(MAX_HEIGHT));
        assert_eq!(shape.heights().get(2, 0), None);
    }

    #[test]
    fn slopes_tilt_the_normals() {
        let map = HeightMap::from_fn(4, 4, |x, _| x as f32 / 3.0);
        let shape = TerrainShape::generate(4, Some(&map)).unwrap();
        let n = &shape.normals()[3 * 5..3 * 5 + 3];
        // rising towards +x, so the normal leans towards -x
        assert!(n[0] < 0.0);
        assert!(n[1] > 0.0);
        assert!(n[2].abs() < 1e-6);
    }

    #[test]
    fn image_pixels_pack_into_heights() {
        let mut img = image::RgbImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgb([255, 255, 255]));
        let map = HeightMap::from_image(&image::DynamicImage::ImageRgb8(img));
        assert_eq!(map.dimensions(), (1, 1));
        let shape = TerrainShape::generate(2, Some(&map)).unwrap();
        assert!(shape.vertices().chunks(3).all(|v| (v[1] - MAX_HEIGHT).abs() < 1e-4));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        assert_eq!(
            TerrainShape::generate(257, None).unwrap_err(),
            ShapeError::TooManyVertices(257 * 257)
        );
    }
}
