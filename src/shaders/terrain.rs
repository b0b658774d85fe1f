//! Program for terrain tiles blending five textures by a weight map.

use crate::{
    data_structures::{camera::Camera, light::Light},
    error::ShaderError,
    math::{Transformation, Vector3f},
    render::commands::CommandBuffer,
};

use super::{size, CompiledProgram, ProgramKind, ProgramSource, ProgramUniforms, ShaderManager, UniformLocation};

pub type TerrainShaderManager = ShaderManager<TerrainUniforms>;
pub type TerrainProgram<'a> = super::Program<'a, TerrainUniforms>;

/// Texture unit each terrain texture reads from.
pub const BACKGROUND_UNIT: u32 = 0;
pub const MUD_UNIT: u32 = 1;
pub const GRASS_UNIT: u32 = 2;
pub const PATH_UNIT: u32 = 3;
pub const WEIGHT_MAP_UNIT: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct TerrainUniforms {
    projection_matrix: UniformLocation,
    view_matrix: UniformLocation,
    transformation_matrix: UniformLocation,
    light_position: UniformLocation,
    light_colour: UniformLocation,
    shine_damper: UniformLocation,
    reflectivity: UniformLocation,
    sky_colour: UniformLocation,
    background_texture: u32,
    mud_texture: u32,
    grass_texture: u32,
    path_texture: u32,
    weight_map_texture: u32,
}

impl ProgramUniforms for TerrainUniforms {
    const SOURCE: ProgramSource = ProgramSource {
        label: "terrain",
        kind: ProgramKind::Terrain,
        vertex: include_str!("terrain_vertex.wgsl"),
        fragment: include_str!("terrain_fragment.wgsl"),
        attributes: &[
            ("position", super::POSITION_LOCATION),
            ("texture_coords", super::TEXTURE_COORDS_LOCATION),
            ("normal", super::NORMAL_LOCATION),
        ],
        textures: &[
            "background_texture",
            "mud_texture",
            "grass_texture",
            "path_texture",
            "weight_map_texture",
        ],
    };

    fn resolve(program: &CompiledProgram) -> Result<Self, ShaderError> {
        Ok(Self {
            projection_matrix: program.uniform_location("projection_matrix", size::MAT4)?,
            view_matrix: program.uniform_location("view_matrix", size::MAT4)?,
            transformation_matrix: program.uniform_location("transformation_matrix", size::MAT4)?,
            light_position: program.uniform_location("light_position", size::VEC3)?,
            light_colour: program.uniform_location("light_colour", size::VEC3)?,
            shine_damper: program.uniform_location("shine_damper", size::FLOAT)?,
            reflectivity: program.uniform_location("reflectivity", size::FLOAT)?,
            sky_colour: program.uniform_location("sky_colour", size::VEC3)?,
            background_texture: program.texture_binding("background_texture")?,
            mud_texture: program.texture_binding("mud_texture")?,
            grass_texture: program.texture_binding("grass_texture")?,
            path_texture: program.texture_binding("path_texture")?,
            weight_map_texture: program.texture_binding("weight_map_texture")?,
        })
    }
}

impl TerrainShaderManager {
    pub fn start_terrain<'a>(&'a self, commands: &'a mut CommandBuffer) -> TerrainProgram<'a> {
        super::Program(self.start(commands))
    }
}

impl TerrainProgram<'_> {
    pub fn load_projection_matrix(&mut self, projection: &Transformation) {
        let location = self.uniforms().projection_matrix;
        self.load_matrix(location, projection);
    }

    pub fn load_view_matrix(&mut self, camera: &Camera) {
        let location = self.uniforms().view_matrix;
        self.load_matrix(location, &camera.view_matrix());
    }

    pub fn load_transformation_matrix(&mut self, transformation: &Transformation) {
        let location = self.uniforms().transformation_matrix;
        self.load_matrix(location, transformation);
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

    /// Points the five texture variables at units 0 to 4.
    pub fn connect_texture_units(&mut self) {
        let u = *self.uniforms();
        self.connect_texture_unit(u.background_texture, BACKGROUND_UNIT);
        self.connect_texture_unit(u.mud_texture, MUD_UNIT);
        self.connect_texture_unit(u.grass_texture, GRASS_UNIT);
        self.connect_texture_unit(u.path_texture, PATH_UNIT);
        self.connect_texture_unit(u.weight_map_texture, WEIGHT_MAP_UNIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::commands::Command;

    #[test]
    fn terrain_program_builds() {
        let manager = TerrainShaderManager::new().unwrap();
        assert!(!manager.program().is_instanced());
        assert_eq!(manager.program().textures().len(), 5);
    }

    #[test]
    fn texture_units_follow_pack_order() {
        let manager = TerrainShaderManager::new().unwrap();
        let mut commands = CommandBuffer::new();
        manager.start_terrain(&mut commands).connect_texture_units();
        let units: Vec<_> = commands
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::ConnectTextureUnit { binding, unit } => Some((*binding, *unit)),
                _ => None,
            })
            .collect();
        assert_eq!(units, vec![(0, 0), (2, 1), (4, 2), (6, 3), (8, 4)]);
    }
}
