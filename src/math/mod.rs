//! Vector aliases and small geometric helpers.
//!
//! - [`Vector2f`] / [`Vector3f`] are plain `cgmath` vectors; a 3-vector is its own
//!   type, never "a 2-vector with an extra field".
//! - [`transformation::Transformation`] is the mutable 4x4 matrix used to build
//!   model, view and projection matrices.

pub mod transformation;

pub use transformation::Transformation;

pub type Vector2f = cgmath::Vector2<f32>;
pub type Vector3f = cgmath::Vector3<f32>;

/// Height at `pos` (x, z) on the triangle `p1 p2 p3` by barycentric interpolation.
///
/// The triangle is given in the xz-plane with the height stored in `y`.
pub fn barycentric(p1: Vector3f, p2: Vector3f, p3: Vector3f, pos: Vector2f) -> f32 {
    let det = (p2.z - p3.z) * (p1.x - p3.x) + (p3.x - p2.x) * (p1.z - p3.z);
    let l1 = ((p2.z - p3.z) * (pos.x - p3.x) + (p3.x - p2.x) * (pos.y - p3.z)) / det;
    let l2 = ((p3.z - p1.z) * (pos.x - p3.x) + (p1.x - p3.x) * (pos.y - p3.z)) / det;
    let l3 = 1.0 - l1 - l2;
    l1 * p1.y + l2 * p2.y + l3 * p3.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barycentric_hits_corners() {
        let a = Vector3f::new(0.0, 1.0, 0.0);
        let b = Vector3f::new(1.0, 2.0, 0.0);
        let c = Vector3f::new(0.0, 3.0, 1.0);
        assert!((barycentric(a, b, c, Vector2f::new(0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert!((barycentric(a, b, c, Vector2f::new(1.0, 0.0)) - 2.0).abs() < 1e-6);
        assert!((barycentric(a, b, c, Vector2f::new(0.0, 1.0)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn barycentric_interpolates_inside() {
        let a = Vector3f::new(0.0, 0.0, 0.0);
        let b = Vector3f::new(2.0, 4.0, 0.0);
        let c = Vector3f::new(0.0, 0.0, 2.0);
        // halfway along the a-b edge
        assert!((barycentric(a, b, c, Vector2f::new(1.0, 0.0)) - 2.0).abs() < 1e-6);
    }
}
