//! Mutable 4x4 transformation matrix with fixed-function GL semantics.
//!
//! Every operation builds its own matrix and post-multiplies it onto the
//! current one (`current = current * op`), so calls read in the same order as
//! the old `glTranslate`/`glRotate` stacks: the last call is applied to the
//! vertex first. Storage is column-major (`m[column][row]`).

use std::ops::Mul;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transformation {
    matrix: Matrix4<f32>,
}

impl Transformation {
    /// The identity transformation.
    pub fn new() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix
    }

    /// Entry at `column`, `row`.
    pub fn get(&self, column: usize, row: usize) -> f32 {
        self.matrix[column][row]
    }

    pub fn load_identity(&mut self) -> &mut Self {
        self.matrix = Matrix4::identity();
        self
    }

    pub fn translate(&mut self, tx: f32, ty: f32, tz: f32) -> &mut Self {
        self.apply(Matrix4::from_translation(Vector3::new(tx, ty, tz)))
    }

    /// Rotates by `angle` degrees about the axis `(x, y, z)`.
    ///
    /// The axis does not need to be normalised. A zero axis has no direction;
    /// it trips a debug assertion and leaves the matrix untouched otherwise.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) -> &mut Self {
        let axis = Vector3::new(x, y, z);
        let length = axis.magnitude();
        debug_assert!(length > 0.0, "rotation axis must not be the zero vector");
        if length <= f32::EPSILON {
            return self;
        }
        let axis = axis / length;
        let (s, c) = angle.to_radians().sin_cos();
        let t = 1.0 - c;
        // Rodrigues, columns of R = cI + s[axis]x + t(axis axis^T)
        #[rustfmt::skip]
        let rotation = Matrix4::new(
            t * axis.x * axis.x + c,          t * axis.x * axis.y + s * axis.z, t * axis.x * axis.z - s * axis.y, 0.0,
            t * axis.x * axis.y - s * axis.z, t * axis.y * axis.y + c,          t * axis.y * axis.z + s * axis.x, 0.0,
            t * axis.x * axis.z + s * axis.y, t * axis.y * axis.z - s * axis.x, t * axis.z * axis.z + c,          0.0,
            0.0,                              0.0,                              0.0,                              1.0,
        );
        self.apply(rotation)
    }

    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) -> &mut Self {
        self.apply(Matrix4::from_nonuniform_scale(sx, sy, sz))
    }

    /// Multiplies a `gluPerspective` frustum onto the matrix.
    ///
    /// `fov_y` is the full vertical field of view in degrees. Clip space is
    /// GL's `[-1, 1]` depth range; the vertex stages remap it for wgpu.
    pub fn perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) -> &mut Self {
        let f = 1.0 / (fov_y.to_radians() / 2.0).tan();
        let depth = near - far;
        #[rustfmt::skip]
        let projection = Matrix4::new(
            f / aspect, 0.0, 0.0,                       0.0,
            0.0,        f,   0.0,                       0.0,
            0.0,        0.0, (far + near) / depth,      -1.0,
            0.0,        0.0, 2.0 * far * near / depth,  0.0,
        );
        self.apply(projection)
    }

    /// `a * b` as a new transformation.
    pub fn multiply(a: &Transformation, b: &Transformation) -> Transformation {
        Transformation {
            matrix: a.matrix * b.matrix,
        }
    }

    /// Overwrites the translation column, keeping the rest of the matrix.
    pub fn set_translation(&mut self, x: f32, y: f32, z: f32) -> &mut Self {
        self.matrix.w.x = x;
        self.matrix.w.y = y;
        self.matrix.w.z = z;
        self
    }

    pub fn as_array(&self) -> [[f32; 4]; 4] {
        self.matrix.into()
    }

    fn apply(&mut self, op: Matrix4<f32>) -> &mut Self {
        self.matrix = self.matrix * op;
        self
    }
}

impl Default for Transformation {
    fn default() -> Self {
        Self::new()
    }
}

impl Mul for Transformation {
    type Output = Transformation;

    fn mul(self, rhs: Transformation) -> Self::Output {
        Transformation::multiply(&self, &rhs)
    }
}

impl From<Transformation> for Matrix4<f32> {
    fn from(t: Transformation) -> Self {
        t.matrix
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector4;

    use super::*;

    fn close(a: f32, b: f32, epsilon: f32) {
        assert!((a - b).abs() <= epsilon, "{a} != {b}");
    }

    fn close_vec(a: Vector4<f32>, b: Vector4<f32>) {
        for i in 0..4 {
            close(a[i], b[i], 1e-5);
        }
    }

    fn assert_matrix_eq(a: &Transformation, b: &Transformation) {
        for c in 0..4 {
            for r in 0..4 {
                assert!(
                    (a.get(c, r) - b.get(c, r)).abs() < 1e-5,
                    "mismatch at [{c}][{r}]: {} vs {}",
                    a.get(c, r),
                    b.get(c, r)
                );
            }
        }
    }

    #[test]
    fn rotation_is_undone_by_opposite_angle() {
        let axes = [
            (1.0, 0.0, 0.0),
            (0.0, 1.0, 0.0),
            (0.0, 0.0, 1.0),
            (1.0, 2.0, -3.0),
            (-0.3, 0.7, 0.1),
        ];
        for (x, y, z) in axes {
            for angle in [0.0_f32, 15.0, 90.0, 137.5, -270.0, 720.0] {
                let mut t = Transformation::new();
                t.translate(3.0, -2.0, 1.0).scale(2.0, 2.0, 2.0);
                let before = t;
                t.rotate(angle, x, y, z).rotate(-angle, x, y, z);
                assert_matrix_eq(&t, &before);
            }
        }
    }

    #[test]
    fn identity_parameters_keep_identity() {
        let mut t = Transformation::new();
        t.translate(1.0, 2.0, 3.0);
        t.load_identity()
            .translate(0.0, 0.0, 0.0)
            .scale(1.0, 1.0, 1.0)
            .translate(0.0, 0.0, 0.0);
        assert_eq!(t, Transformation::new());
    }

    #[test]
    fn perspective_matches_gl_formula() {
        let (near, far) = (0.1_f32, 100.0_f32);
        let mut t = Transformation::new();
        t.perspective(45.0, 1.0, near, far);

        let f = 1.0 / (22.5_f32.to_radians()).tan();
        close(t.get(0, 0), f, 1e-5);
        close(t.get(1, 1), f, 1e-5);
        close(t.get(2, 2), (far + near) / (near - far), 1e-6);
        close(t.get(3, 2), 2.0 * far * near / (near - far), 1e-6);
        assert_eq!(t.get(2, 3), -1.0);
        assert_eq!(t.get(3, 3), 0.0);
        // the concrete values for these inputs
        close(t.get(2, 2), -1.002002, 1e-5);
        close(t.get(3, 2), -0.2002002, 1e-6);
    }

    #[test]
    fn operations_are_post_multiplied() {
        // translate then scale: the scale acts on the vertex first
        let mut t = Transformation::new();
        t.translate(10.0, 0.0, 0.0).scale(2.0, 2.0, 2.0);
        let p = t.matrix() * Vector4::new(1.0, 1.0, 1.0, 1.0);
        close_vec(p, Vector4::new(12.0, 2.0, 2.0, 1.0));
    }

    #[test]
    fn rotate_about_y_turns_x_into_minus_z() {
        let mut t = Transformation::new();
        t.rotate(90.0, 0.0, 1.0, 0.0);
        let p = t.matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        close_vec(p, Vector4::new(0.0, 0.0, -1.0, 1.0));
    }

    #[test]
    fn rotate_normalises_the_axis() {
        let mut a = Transformation::new();
        a.rotate(33.0, 0.0, 5.0, 0.0);
        let mut b = Transformation::new();
        b.rotate(33.0, 0.0, 1.0, 0.0);
        assert_matrix_eq(&a, &b);
    }

    #[test]
    fn multiply_composes_in_order() {
        let mut a = Transformation::new();
        a.translate(1.0, 0.0, 0.0);
        let mut b = Transformation::new();
        b.scale(3.0, 3.0, 3.0);
        let ab = Transformation::multiply(&a, &b);
        let mut expected = Transformation::new();
        expected.translate(1.0, 0.0, 0.0).scale(3.0, 3.0, 3.0);
        assert_matrix_eq(&ab, &expected);
        assert_eq!(a * b, ab);
    }

    #[test]
    fn set_translation_only_touches_last_column() {
        let mut t = Transformation::new();
        t.rotate(45.0, 1.0, 0.0, 0.0).translate(4.0, 5.0, 6.0);
        let rotated = t;
        t.set_translation(0.0, 0.0, 0.0);
        for c in 0..3 {
            for r in 0..4 {
                assert_eq!(t.get(c, r), rotated.get(c, r));
            }
        }
        assert_eq!((t.get(3, 0), t.get(3, 1), t.get(3, 2)), (0.0, 0.0, 0.0));
    }
}
