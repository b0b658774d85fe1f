#![allow(dead_code)]

use std::rc::Rc;

use forward_ngin::{
    Vector3f,
    data_structures::{
        entity::Entity,
        light::Light,
        model::{ModelTexture, RawModel, TextureId, TexturedModel, VaoId},
        terrain::TerrainTexturesPack,
    },
};

pub fn model(vao: u32, texture: u32) -> Rc<TexturedModel> {
    Rc::new(
        TexturedModel::new(RawModel::indexed(VaoId(vao), 3, 3), ModelTexture::new(TextureId(texture)))
            .unwrap(),
    )
}

pub fn entity_at(model: &Rc<TexturedModel>, x: f32, z: f32) -> Entity {
    Entity::new(model.clone(), Vector3f::new(x, 0.0, z), 0.0, 0.0, 0.0, 1.0)
}

pub fn sun() -> Light {
    Light::new(Vector3f::new(20000.0, 40000.0, 20000.0), Vector3f::new(1.0, 1.0, 1.0))
}

pub fn texture_pack(first: u32) -> TerrainTexturesPack {
    TerrainTexturesPack {
        weight_map: TextureId(first),
        background: TextureId(first + 1),
        mud: TextureId(first + 2),
        grass: TextureId(first + 3),
        path: TextureId(first + 4),
    }
}

pub fn solid(colour: [u8; 4], size: u32) -> image::DynamicImage {
    image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(size, size, image::Rgba(colour)))
}
