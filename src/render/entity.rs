//! Draws entities, one instanced draw per model bucket.

use std::rc::Rc;

use crate::{
    data_structures::{camera::Camera, instance::InstanceRaw, light::Light, model::TexturedModel},
    error::ShaderError,
    math::{Transformation, Vector3f},
    render::commands::CommandBuffer,
    shaders::{entity::EntityProgram, CompiledProgram, EntityShaderManager},
};

/// All entities of one model collected for this frame.
#[derive(Debug, Clone)]
pub struct EntityBatch {
    pub model: Rc<TexturedModel>,
    pub instances: Vec<InstanceRaw>,
}

#[derive(Debug)]
pub struct EntityRender {
    shader: EntityShaderManager,
}

impl EntityRender {
    /// Builds the program and queues the projection upload into `setup`.
    pub fn new(projection: &Transformation, setup: &mut CommandBuffer) -> Result<Self, ShaderError> {
        let shader = EntityShaderManager::new()?;
        let render = Self { shader };
        render.load_projection(projection, setup);
        Ok(render)
    }

    pub fn load_projection(&self, projection: &Transformation, commands: &mut CommandBuffer) {
        let mut program = self.shader.start_entity(commands);
        program.connect_texture_unit(0, 0);
        program.load_projection_matrix(projection);
    }

    pub fn program(&self) -> &CompiledProgram {
        self.shader.program()
    }

    pub fn render(
        &self,
        batches: &[EntityBatch],
        light: &Light,
        camera: &Camera,
        sky_colour: Vector3f,
        commands: &mut CommandBuffer,
    ) {
        let mut program = self.shader.start_entity(commands);
        program.load_sky_colour(sky_colour);
        program.load_light(light);
        program.load_view_matrix(camera);

        for batch in batches {
            if batch.instances.is_empty() {
                log::warn!("skipping empty batch for model {:?}", batch.model.id());
                continue;
            }
            prepare_textured_model(&mut program, &batch.model);
            // instances are copied; MasterRender clears the bucket after the frame
            program.draw_instanced(batch.model.raw_model(), batch.instances.clone());
            program.unbind_mesh();
        }
    }
}

fn prepare_textured_model(program: &mut EntityProgram<'_>, model: &TexturedModel) {
    let raw = model.raw_model();
    program.bind_mesh(raw);
    let texture = model.texture();
    program.set_culling(!model.has_transparency);
    program.load_number_of_rows(texture.number_of_rows);
    program.load_normals_pointing_up(model.normals_pointing_up);
    program.load_shine_variables(texture.shine_damper, texture.reflectivity);
    program.load_material(texture.diffuse_colour, texture.texture_weight);
    program.bind_texture(0, texture.texture);
}
