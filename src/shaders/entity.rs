//! Program for textured, lit entities drawn with instancing.

use crate::{
    data_structures::{camera::Camera, light::Light},
    error::ShaderError,
    math::{Transformation, Vector3f},
    render::commands::CommandBuffer,
};

use super::{size, CompiledProgram, ProgramKind, ProgramSource, ProgramUniforms, ShaderManager, UniformLocation};

pub type EntityShaderManager = ShaderManager<EntityUniforms>;
pub type EntityProgram<'a> = super::Program<'a, EntityUniforms>;

#[derive(Debug, Clone, Copy)]
pub struct EntityUniforms {
    projection_matrix: UniformLocation,
    view_matrix: UniformLocation,
    light_position: UniformLocation,
    light_colour: UniformLocation,
    shine_damper: UniformLocation,
    reflectivity: UniformLocation,
    sky_colour: UniformLocation,
    normals_pointing_up: UniformLocation,
    diffuse_colour: UniformLocation,
    texture_weight: UniformLocation,
    number_of_rows: UniformLocation,
}

impl ProgramUniforms for EntityUniforms {
    const SOURCE: ProgramSource = ProgramSource {
        label: "entity",
        kind: ProgramKind::Entity,
        vertex: include_str!("entity_vertex.wgsl"),
        fragment: include_str!("entity_fragment.wgsl"),
        attributes: &[
            ("position", super::POSITION_LOCATION),
            ("texture_coords", super::TEXTURE_COORDS_LOCATION),
            ("normal", super::NORMAL_LOCATION),
            ("model_matrix_0", 5),
            ("model_matrix_1", 6),
            ("model_matrix_2", 7),
            ("model_matrix_3", 8),
            ("texture_offset", 9),
        ],
        textures: &["model_texture"],
    };

    fn resolve(program: &CompiledProgram) -> Result<Self, ShaderError> {
        Ok(Self {
            projection_matrix: program.uniform_location("projection_matrix", size::MAT4)?,
            view_matrix: program.uniform_location("view_matrix", size::MAT4)?,
            light_position: program.uniform_location("light_position", size::VEC3)?,
            light_colour: program.uniform_location("light_colour", size::VEC3)?,
            shine_damper: program.uniform_location("shine_damper", size::FLOAT)?,
            reflectivity: program.uniform_location("reflectivity", size::FLOAT)?,
            sky_colour: program.uniform_location("sky_colour", size::VEC3)?,
            normals_pointing_up: program.uniform_location("normals_pointing_up", size::FLOAT)?,
            diffuse_colour: program.uniform_location("diffuse_colour", size::VEC3)?,
            texture_weight: program.uniform_location("texture_weight", size::FLOAT)?,
            number_of_rows: program.uniform_location("number_of_rows", size::INT)?,
        })
    }
}

impl EntityShaderManager {
    pub fn start_entity<'a>(&'a self, commands: &'a mut CommandBuffer) -> EntityProgram<'a> {
        super::Program(self.start(commands))
    }
}

impl EntityProgram<'_> {
    pub fn load_projection_matrix(&mut self, projection: &Transformation) {
        let location = self.uniforms().projection_matrix;
        self.load_matrix(location, projection);
    }

    pub fn load_view_matrix(&mut self, camera: &Camera) {
        let location = self.uniforms().view_matrix;
        self.load_matrix(location, &camera.view_matrix());
    }

    pub fn load_light(&mut self, light: &Light) {
        let u = *self.uniforms();
        self.load_vector(u.light_position, light.position);
        self.load_vector(u.light_colour, light.colour);
    }

    pub fn load_shine_variables(&mut self, shine_damper: f32, reflectivity: f32) {
        let u = *self.uniforms();
        self.load_float(u.shine_damper, shine_damper);
        self.load_float(u.reflectivity, reflectivity);
    }

    pub fn load_sky_colour(&mut self, colour: Vector3f) {
        let location = self.uniforms().sky_colour;
        self.load_vector(location, colour);
    }

    pub fn load_normals_pointing_up(&mut self, up: bool) {
        let location = self.uniforms().normals_pointing_up;
        self.load_boolean(location, up);
    }

    /// Flat colour blended with the sampled texture by `texture_weight`.
    pub fn load_material(&mut self, diffuse_colour: [f32; 3], texture_weight: f32) {
        let u = *self.uniforms();
        self.load_vector(u.diffuse_colour, Vector3f::from(diffuse_colour));
        self.load_float(u.texture_weight, texture_weight.clamp(0.0, 1.0));
    }

    /// Rows (and columns) of the texture atlas.
    pub fn load_number_of_rows(&mut self, rows: u32) {
        let location = self.uniforms().number_of_rows;
        self.load_int(location, rows.min(i32::MAX as u32) as i32);
    }
}
