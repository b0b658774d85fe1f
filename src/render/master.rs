//! Per-frame orchestration of the three renderers.
//!
//! [`MasterRender`] owns the renderers, the camera and the frame's scene
//! content. Every frame the host feeds it entities (bucketed by model),
//! terrains and an optional sky box, then calls [`MasterRender::render`] which
//! records the whole frame into one [`CommandBuffer`]:
//!
//! 1. setup commands queued since the last frame (projection uploads)
//! 2. clear
//! 3. terrains
//! 4. entity buckets, in the order their models were first seen
//! 5. sky box
//!
//! Entity buckets only live for one frame.

use std::{collections::HashMap, rc::Rc};

use crate::{
    data_structures::{
        camera::Camera,
        entity::Entity,
        light::Light,
        model::{ModelId, TexturedModel},
        sky_box::SkyBox,
        terrain::Terrain,
    },
    error::ShaderError,
    math::{Transformation, Vector3f},
    render::{
        commands::{Command, CommandBuffer},
        entity::{EntityBatch, EntityRender},
        sky_box::SkyBoxRender,
        terrain::TerrainRender,
    },
    shaders::CompiledProgram,
};

/// Projection and sky parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    /// Fog colour, also the clear colour unless `clear_colour` is set.
    pub sky_colour: Vector3f,
    pub clear_colour: Option<[f32; 4]>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fov: 65.0,
            near_plane: 0.1,
            far_plane: 1000.0,
            sky_colour: Vector3f::new(0.5, 0.5, 0.5),
            clear_colour: None,
        }
    }
}

impl RenderConfig {
    pub fn clear_colour(&self) -> [f32; 4] {
        self.clear_colour
            .unwrap_or([self.sky_colour.x, self.sky_colour.y, self.sky_colour.z, 1.0])
    }

    pub fn projection(&self, width: u32, height: u32) -> Transformation {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let mut projection = Transformation::new();
        projection.perspective(self.fov, aspect, self.near_plane, self.far_plane);
        projection
    }
}

pub struct MasterRender {
    config: RenderConfig,
    projection: Transformation,
    camera: Camera,
    entity_render: EntityRender,
    terrain_render: TerrainRender,
    sky_box_render: SkyBoxRender,
    batches: Vec<EntityBatch>,
    batch_index: HashMap<ModelId, usize>,
    terrains: Vec<Terrain>,
    sky_box: Option<SkyBox>,
    pending: CommandBuffer,
}

impl MasterRender {
    /// Builds every program. A shader that fails to build aborts construction.
    pub fn new(config: RenderConfig, width: u32, height: u32) -> Result<Self, ShaderError> {
        let projection = config.projection(width, height);
        let mut pending = CommandBuffer::new();
        let entity_render = EntityRender::new(&projection, &mut pending)?;
        let terrain_render = TerrainRender::new(&projection, &mut pending)?;
        let sky_box_render = SkyBoxRender::new(&projection, &mut pending)?;
        Ok(Self {
            config,
            projection,
            camera: Camera::default(),
            entity_render,
            terrain_render,
            sky_box_render,
            batches: Vec::new(),
            batch_index: HashMap::new(),
            terrains: Vec::new(),
            sky_box: None,
            pending,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn projection(&self) -> &Transformation {
        &self.projection
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The programs the GPU executor has to build pipelines for.
    pub fn programs(&self) -> [&CompiledProgram; 3] {
        [
            self.entity_render.program(),
            self.terrain_render.program(),
            self.sky_box_render.program(),
        ]
    }

    /// Rebuilds the projection and queues it for every program.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.projection = self.config.projection(width, height);
        self.entity_render.load_projection(&self.projection, &mut self.pending);
        self.terrain_render.load_projection(&self.projection, &mut self.pending);
        self.sky_box_render.load_projection(&self.projection, &mut self.pending);
    }

    pub fn process_entity(&mut self, entity: &Entity) {
        let model = entity.model();
        let index = match self.batch_index.get(&model.id()) {
            Some(&index) => index,
            None => {
                self.batches.push(EntityBatch {
                    model: Rc::clone(model),
                    instances: Vec::new(),
                });
                let index = self.batches.len() - 1;
                self.batch_index.insert(model.id(), index);
                index
            }
        };
        self.batches[index].instances.push(entity.to_raw());
    }

    pub fn process_entities<'a>(&mut self, entities: impl IntoIterator<Item = &'a Entity>) {
        for entity in entities {
            self.process_entity(entity);
        }
    }

    /// Replaces the terrains drawn from now on.
    pub fn process_terrains(&mut self, terrains: Vec<Terrain>) {
        self.terrains = terrains;
    }

    pub fn process_sky_box(&mut self, sky_box: SkyBox) {
        self.sky_box = Some(sky_box);
    }

    pub fn terrains(&self) -> &[Terrain] {
        &self.terrains
    }

    /// Buckets collected so far this frame, in first-seen order.
    pub fn batches(&self) -> impl Iterator<Item = (&Rc<TexturedModel>, usize)> {
        self.batches.iter().map(|b| (&b.model, b.instances.len()))
    }

    /// Records the frame and empties the entity buckets.
    pub fn render(&mut self, sun: &Light) -> CommandBuffer {
        let mut commands = std::mem::take(&mut self.pending);
        commands.push(Command::Clear {
            colour: self.config.clear_colour(),
        });

        let sky_colour = self.config.sky_colour;
        self.terrain_render
            .render(&self.terrains, sun, &self.camera, sky_colour, &mut commands);
        self.entity_render
            .render(&self.batches, sun, &self.camera, sky_colour, &mut commands);
        match &self.sky_box {
            Some(sky_box) => self.sky_box_render.render(sky_box, &self.camera, &mut commands),
            None => log::trace!("no sky box to draw"),
        }

        self.batches.clear();
        self.batch_index.clear();
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{
            model::{ModelTexture, RawModel, TextureId, VaoId},
            terrain::TerrainTexturesPack,
            terrain_shape::TerrainShape,
        },
        shaders::ProgramKind,
    };

    fn model(vao: u32) -> Rc<TexturedModel> {
        Rc::new(
            TexturedModel::new(RawModel::indexed(VaoId(vao), 3, 3), ModelTexture::new(TextureId(vao)))
                .unwrap(),
        )
    }

    fn entity(model: &Rc<TexturedModel>, x: f32) -> Entity {
        Entity::new(model.clone(), Vector3f::new(x, 0.0, 0.0), 0.0, 0.0, 0.0, 1.0)
    }

    fn master() -> MasterRender {
        MasterRender::new(RenderConfig::default(), 800, 600).unwrap()
    }

    fn sun() -> Light {
        Light::new(Vector3f::new(0.0, 1000.0, 0.0), Vector3f::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn entities_are_bucketed_by_model_in_first_seen_order() {
        let (a, b) = (model(1), model(2));
        let mut master = master();
        let entities = [
            entity(&b, 0.0),
            entity(&a, 1.0),
            entity(&b, 2.0),
            entity(&a, 3.0),
            entity(&b, 4.0),
        ];
        master.process_entities(&entities);
        let buckets: Vec<_> = master.batches().map(|(m, n)| (m.id(), n)).collect();
        assert_eq!(buckets, vec![(b.id(), 3), (a.id(), 2)]);
    }

    #[test]
    fn buckets_are_cleared_after_each_frame() {
        let a = model(1);
        let mut master = master();
        master.process_entity(&entity(&a, 0.0));
        let frame = master.render(&sun());
        assert_eq!(frame.draw_calls().len(), 1);
        assert_eq!(master.batches().count(), 0);
        assert!(master.render(&sun()).draw_calls().is_empty());
    }

    #[test]
    fn frame_draws_terrain_then_entities_then_sky() {
        let a = model(1);
        let mut master = master();
        let shape = TerrainShape::generate(2, None).unwrap();
        let pack = TerrainTexturesPack {
            weight_map: TextureId(20),
            background: TextureId(21),
            mud: TextureId(22),
            grass: TextureId(23),
            path: TextureId(24),
        };
        master.process_terrains(vec![Terrain::new(0, 0, RawModel::indexed(VaoId(5), 4, 6), pack, &shape)]);
        master.process_entities(&[entity(&a, 0.0), entity(&a, 5.0)]);
        master.process_sky_box(SkyBox::new(RawModel::arrays(VaoId(6), 36), TextureId(30)));

        let frame = master.render(&sun());
        let calls = frame.draw_calls();
        let order: Vec<_> = calls.iter().map(|c| (c.program, c.mesh, c.instances)).collect();
        assert_eq!(
            order,
            vec![
                (ProgramKind::Terrain, VaoId(5), 1),
                (ProgramKind::Entity, VaoId(1), 2),
                (ProgramKind::SkyBox, VaoId(6), 1),
            ]
        );
    }

    #[test]
    fn setup_is_flushed_into_the_first_frame_only() {
        let mut master = master();
        let first = master.render(&sun());
        let clear_at = first
            .iter()
            .position(|c| matches!(c, Command::Clear { .. }))
            .unwrap();
        // three programs loaded their projection before the clear
        let setup_programs = first.commands()[..clear_at]
            .iter()
            .filter(|c| matches!(c, Command::UseProgram(_)))
            .count();
        assert_eq!(setup_programs, 3);

        let second = master.render(&sun());
        assert!(matches!(second.commands().first(), Some(Command::Clear { .. })));
    }

    #[test]
    fn resize_requeues_projection() {
        let mut master = master();
        master.render(&sun());
        let before = *master.projection();
        master.resize(1000, 500);
        assert_ne!(before, *master.projection());
        let frame = master.render(&sun());
        assert!(matches!(frame.commands().first(), Some(Command::UseProgram(_))));

        // minimised windows keep the old projection
        let current = *master.projection();
        master.resize(0, 500);
        assert_eq!(current, *master.projection());
    }

    #[test]
    fn clear_colour_defaults_to_sky() {
        let mut master = master();
        assert_eq!(master.render(&sun()).clear_colour(), Some([0.5, 0.5, 0.5, 1.0]));

        let config = RenderConfig {
            clear_colour: Some([0.0, 0.0, 0.0, 1.0]),
            ..RenderConfig::default()
        };
        let mut master = MasterRender::new(config, 1, 1).unwrap();
        assert_eq!(master.render(&sun()).clear_colour(), Some([0.0, 0.0, 0.0, 1.0]));
    }
}
