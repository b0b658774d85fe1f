//! GPU-side model handles.
//!
//! - [`RawModel`] names uploaded geometry by an opaque [`VaoId`]
//! - [`ModelTexture`] pairs a [`TextureId`] with its Phong parameters
//! - [`TexturedModel`] combines both and carries the [`ModelId`] entities are
//!   batched by
//!
//! The buffers and textures behind the ids are owned by
//! [`crate::resources::loader::Loader`]; these types are cheap `Copy` handles.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::ShapeError;

/// Handle of the vertex buffers uploaded for one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaoId(pub u32);

/// Handle of an uploaded 2D or cube texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// How a model's geometry is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    /// `u16` triangle list through the index buffer.
    Indexed { index_count: u32 },
    /// Plain vertex order, no index buffer.
    Arrays { vertex_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawModel {
    vao: VaoId,
    vertex_count: u32,
    mode: DrawMode,
}

impl RawModel {
    pub fn indexed(vao: VaoId, vertex_count: u32, index_count: u32) -> Self {
        Self {
            vao,
            vertex_count,
            mode: DrawMode::Indexed { index_count },
        }
    }

    pub fn arrays(vao: VaoId, vertex_count: u32) -> Self {
        Self {
            vao,
            vertex_count,
            mode: DrawMode::Arrays { vertex_count },
        }
    }

    pub fn vao(&self) -> VaoId {
        self.vao
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices for indexed models, vertices otherwise.
    pub fn element_count(&self) -> u32 {
        match self.mode {
            DrawMode::Indexed { index_count } => index_count,
            DrawMode::Arrays { vertex_count } => vertex_count,
        }
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }
}

/// Diffuse texture plus specular lighting parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTexture {
    pub texture: TextureId,
    pub shine_damper: f32,
    pub reflectivity: f32,
    /// Flat colour used where `texture_weight` is below 1.
    pub diffuse_colour: [f32; 3],
    /// 1 samples only the texture, 0 only `diffuse_colour`.
    pub texture_weight: f32,
    /// Rows (and columns) of the texture atlas; 1 means a plain texture.
    pub number_of_rows: u32,
}

impl ModelTexture {
    pub fn new(texture: TextureId) -> Self {
        Self {
            texture,
            shine_damper: 1.0,
            reflectivity: 0.0,
            diffuse_colour: [1.0; 3],
            texture_weight: 1.0,
            number_of_rows: 1,
        }
    }

    pub fn with_diffuse(mut self, colour: [f32; 3], texture_weight: f32) -> Self {
        self.diffuse_colour = colour;
        self.texture_weight = texture_weight.clamp(0.0, 1.0);
        self
    }

    pub fn with_shine(mut self, shine_damper: f32, reflectivity: f32) -> Self {
        self.shine_damper = shine_damper;
        self.reflectivity = reflectivity;
        self
    }

    pub fn with_atlas_rows(mut self, rows: u32) -> Self {
        self.number_of_rows = rows.max(1);
        self
    }
}

/// Stable batching key, unique per [`TexturedModel`] built in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u32);

static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(1);

impl ModelId {
    fn next() -> Self {
        Self(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TexturedModel {
    id: ModelId,
    raw: RawModel,
    texture: ModelTexture,
    pub has_transparency: bool,
    pub normals_pointing_up: bool,
}

impl TexturedModel {
    /// Fails for models without geometry; such a model cannot be drawn.
    pub fn new(raw: RawModel, texture: ModelTexture) -> Result<Self, ShapeError> {
        if raw.vertex_count() == 0 || raw.element_count() == 0 {
            return Err(ShapeError::Empty);
        }
        Ok(Self {
            id: ModelId::next(),
            raw,
            texture,
            has_transparency: false,
            normals_pointing_up: false,
        })
    }

    pub fn with_transparency(mut self, has_transparency: bool) -> Self {
        self.has_transparency = has_transparency;
        self
    }

    /// Lights the model as if every normal were `(0, 1, 0)` (grass, flowers).
    pub fn with_normals_pointing_up(mut self, normals_pointing_up: bool) -> Self {
        self.normals_pointing_up = normals_pointing_up;
        self
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn raw_model(&self) -> &RawModel {
        &self.raw
    }

    pub fn texture(&self) -> &ModelTexture {
        &self.texture
    }
}
