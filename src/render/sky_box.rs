//! Draws the sky box behind everything else.

use crate::{
    data_structures::{camera::Camera, sky_box::SkyBox},
    error::ShaderError,
    math::Transformation,
    render::commands::CommandBuffer,
    shaders::{CompiledProgram, SkyBoxShaderManager},
};

#[derive(Debug)]
pub struct SkyBoxRender {
    shader: SkyBoxShaderManager,
}

impl SkyBoxRender {
    pub fn new(projection: &Transformation, setup: &mut CommandBuffer) -> Result<Self, ShaderError> {
        let shader = SkyBoxShaderManager::new()?;
        let render = Self { shader };
        render.load_projection(projection, setup);
        Ok(render)
    }

    pub fn load_projection(&self, projection: &Transformation, commands: &mut CommandBuffer) {
        let mut program = self.shader.start_sky_box(commands);
        program.load_projection_matrix(projection);
        program.connect_texture_units();
    }

    pub fn program(&self) -> &CompiledProgram {
        self.shader.program()
    }

    pub fn render(&self, sky_box: &SkyBox, camera: &Camera, commands: &mut CommandBuffer) {
        let mut program = self.shader.start_sky_box(commands);
        program.load_view_matrix(camera);
        program.bind_mesh(sky_box.model());
        program.bind_texture(0, sky_box.texture());
        program.set_culling(false);
        program.draw(sky_box.model());
        program.unbind_mesh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{
            model::{DrawMode, RawModel, TextureId, VaoId},
            sky_box_shape,
        },
        render::commands::Command,
    };

    #[test]
    fn sky_box_is_drawn_as_arrays_without_culling() {
        let render = SkyBoxRender::new(&Transformation::new(), &mut CommandBuffer::new()).unwrap();
        let sky_box = SkyBox::new(RawModel::arrays(VaoId(9), sky_box_shape::VERTEX_COUNT as u32), TextureId(2));
        let mut commands = CommandBuffer::new();
        render.render(&sky_box, &Camera::default(), &mut commands);

        let calls = commands.draw_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, DrawMode::Arrays { vertex_count: 36 });
        assert!(!calls[0].culling);
        assert!(commands.iter().any(|c| *c == Command::BindTexture { unit: 0, texture: TextureId(2) }));
    }
}
