//! Program for the cube-mapped sky.

use crate::{
    data_structures::camera::Camera,
    error::ShaderError,
    math::Transformation,
    render::commands::CommandBuffer,
};

use super::{size, CompiledProgram, ProgramKind, ProgramSource, ProgramUniforms, ShaderManager, UniformLocation};

pub type SkyBoxShaderManager = ShaderManager<SkyBoxUniforms>;
pub type SkyBoxProgram<'a> = super::Program<'a, SkyBoxUniforms>;

#[derive(Debug, Clone, Copy)]
pub struct SkyBoxUniforms {
    projection_matrix: UniformLocation,
    view_matrix: UniformLocation,
    cube_texture: u32,
}

impl ProgramUniforms for SkyBoxUniforms {
    const SOURCE: ProgramSource = ProgramSource {
        label: "sky box",
        kind: ProgramKind::SkyBox,
        vertex: include_str!("sky_box_vertex.wgsl"),
        fragment: include_str!("sky_box_fragment.wgsl"),
        attributes: &[("position", super::POSITION_LOCATION)],
        textures: &["cube_texture"],
    };

    fn resolve(program: &CompiledProgram) -> Result<Self, ShaderError> {
        Ok(Self {
            projection_matrix: program.uniform_location("projection_matrix", size::MAT4)?,
            view_matrix: program.uniform_location("view_matrix", size::MAT4)?,
            cube_texture: program.texture_binding("cube_texture")?,
        })
    }
}

impl SkyBoxShaderManager {
    pub fn start_sky_box<'a>(&'a self, commands: &'a mut CommandBuffer) -> SkyBoxProgram<'a> {
        super::Program(self.start(commands))
    }
}

impl SkyBoxProgram<'_> {
    pub fn load_projection_matrix(&mut self, projection: &Transformation) {
        let location = self.uniforms().projection_matrix;
        self.load_matrix(location, projection);
    }

    /// The sky moves with the camera: only the rotation part of the view is kept.
    pub fn load_view_matrix(&mut self, camera: &Camera) {
        let mut view = camera.view_matrix();
        view.set_translation(0.0, 0.0, 0.0);
        let location = self.uniforms().view_matrix;
        self.load_matrix(location, &view);
    }

    pub fn connect_texture_units(&mut self) {
        let binding = self.uniforms().cube_texture;
        self.connect_texture_unit(binding, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::Vector3f,
        render::commands::{Command, UniformValue},
    };

    #[test]
    fn view_translation_is_dropped() {
        let manager = SkyBoxShaderManager::new().unwrap();
        let mut commands = CommandBuffer::new();
        let camera = Camera::new(Vector3f::new(10.0, 20.0, 30.0), 15.0, 40.0, 0.0);
        manager.start_sky_box(&mut commands).load_view_matrix(&camera);
        let Some(Command::LoadUniform {
            value: UniformValue::Mat4(view),
            ..
        }) = commands.commands().get(1)
        else {
            panic!("expected a matrix load, got {:?}", commands.commands());
        };
        assert_eq!(view[3], [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(view[0][..3], camera.view_matrix().as_array()[0][..3]);
    }
}
