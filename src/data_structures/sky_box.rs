use crate::data_structures::model::{RawModel, TextureId};

/// The background cube and the cube map painted on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyBox {
    model: RawModel,
    texture: TextureId,
}

impl SkyBox {
    pub fn new(model: RawModel, texture: TextureId) -> Self {
        Self { model, texture }
    }

    pub fn model(&self) -> &RawModel {
        &self.model
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }
}
