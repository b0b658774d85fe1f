use crate::math::Vector3f;

/// The single scene light: a position and a per-channel intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub position: Vector3f,
    pub colour: Vector3f,
}

impl Light {
    pub fn new(position: Vector3f, colour: Vector3f) -> Self {
        Self { position, colour }
    }
}
