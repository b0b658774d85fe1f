//! A placed copy of a shared [`TexturedModel`].

use std::rc::Rc;

use crate::{
    data_structures::{instance::InstanceRaw, model::TexturedModel},
    math::{Transformation, Vector3f},
};

#[derive(Debug, Clone)]
pub struct Entity {
    model: Rc<TexturedModel>,
    pub position: Vector3f,
    /// Rotation about x, in degrees.
    pub rot_x: f32,
    pub rot_y: f32,
    pub rot_z: f32,
    pub scale: f32,
    /// Cell of the texture atlas, counted row by row from the top-left.
    pub texture_index: u32,
}

impl Entity {
    pub fn new(
        model: Rc<TexturedModel>,
        position: Vector3f,
        rot_x: f32,
        rot_y: f32,
        rot_z: f32,
        scale: f32,
    ) -> Self {
        Self {
            model,
            position,
            rot_x,
            rot_y,
            rot_z,
            scale,
            texture_index: 0,
        }
    }

    pub fn with_texture_index(mut self, texture_index: u32) -> Self {
        self.texture_index = texture_index;
        self
    }

    pub fn model(&self) -> &Rc<TexturedModel> {
        &self.model
    }

    pub fn increase_position(&mut self, dx: f32, dy: f32, dz: f32) {
        self.position += Vector3f::new(dx, dy, dz);
    }

    pub fn increase_rotation(&mut self, dx: f32, dy: f32, dz: f32) {
        self.rot_x += dx;
        self.rot_y += dy;
        self.rot_z += dz;
    }

    /// Model matrix: translate, rotate about x, y, z, then scale.
    pub fn transformation(&self) -> Transformation {
        let mut t = Transformation::new();
        t.translate(self.position.x, self.position.y, self.position.z)
            .rotate(self.rot_x, 1.0, 0.0, 0.0)
            .rotate(self.rot_y, 0.0, 1.0, 0.0)
            .rotate(self.rot_z, 0.0, 0.0, 1.0)
            .scale(self.scale, self.scale, self.scale);
        t
    }

    /// Top-left corner of this entity's atlas cell in texture space.
    pub fn texture_offset(&self) -> [f32; 2] {
        let rows = self.model.texture().number_of_rows.max(1);
        let column = self.texture_index % rows;
        let row = self.texture_index / rows;
        [column as f32 / rows as f32, row as f32 / rows as f32]
    }

    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.transformation().as_array(),
            texture_offset: self.texture_offset(),
        }
    }
}
