//! Draws terrain tiles.

use crate::{
    data_structures::{camera::Camera, light::Light, terrain::Terrain},
    error::ShaderError,
    math::{Transformation, Vector3f},
    render::commands::CommandBuffer,
    shaders::{
        terrain::{TerrainProgram, BACKGROUND_UNIT, GRASS_UNIT, MUD_UNIT, PATH_UNIT, WEIGHT_MAP_UNIT},
        CompiledProgram, TerrainShaderManager,
    },
};

#[derive(Debug)]
pub struct TerrainRender {
    shader: TerrainShaderManager,
}

impl TerrainRender {
    pub fn new(projection: &Transformation, setup: &mut CommandBuffer) -> Result<Self, ShaderError> {
        let shader = TerrainShaderManager::new()?;
        let render = Self { shader };
        render.load_projection(projection, setup);
        Ok(render)
    }

    pub fn load_projection(&self, projection: &Transformation, commands: &mut CommandBuffer) {
        let mut program = self.shader.start_terrain(commands);
        program.load_projection_matrix(projection);
        program.connect_texture_units();
    }

    pub fn program(&self) -> &CompiledProgram {
        self.shader.program()
    }

    pub fn render(
        &self,
        terrains: &[Terrain],
        light: &Light,
        camera: &Camera,
        sky_colour: Vector3f,
        commands: &mut CommandBuffer,
    ) {
        let mut program = self.shader.start_terrain(commands);
        program.load_sky_colour(sky_colour);
        program.load_light(light);
        program.load_view_matrix(camera);

        for terrain in terrains {
            prepare_terrain(&mut program, terrain);
            let mut transformation = Transformation::new();
            transformation.translate(terrain.x(), 0.0, terrain.z());
            program.load_transformation_matrix(&transformation);
            program.draw(terrain.model());
            program.unbind_mesh();
        }
    }
}

fn prepare_terrain(program: &mut TerrainProgram<'_>, terrain: &Terrain) {
    program.bind_mesh(terrain.model());
    let textures = terrain.textures();
    program.bind_texture(BACKGROUND_UNIT, textures.background);
    program.bind_texture(MUD_UNIT, textures.mud);
    program.bind_texture(GRASS_UNIT, textures.grass);
    program.bind_texture(PATH_UNIT, textures.path);
    program.bind_texture(WEIGHT_MAP_UNIT, textures.weight_map);
    program.set_culling(true);
    program.load_shine_variables(1.0, 0.0);
}
