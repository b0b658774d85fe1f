//! GPU upload service.
//!
//! The [`Loader`] owns every vertex buffer and texture the engine uploads and
//! hands out [`VaoId`] / [`TextureId`] handles in exchange. Renderers only see
//! the handles; the GPU executor resolves them back through [`Loader::mesh`]
//! and [`Loader::texture`].

use std::collections::HashMap;

use anyhow::{Context as _, bail, ensure};
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{ModelTexture, RawModel, TextureId, TexturedModel, VaoId},
        shape::Shape,
        texture::Texture,
        wavefront::WfMaterial,
    },
    resources::AssetSource,
};

/// The buffers behind one [`VaoId`], one per attribute stream.
#[derive(Debug)]
pub struct Mesh {
    pub positions: wgpu::Buffer,
    pub texture_coords: wgpu::Buffer,
    pub normals: wgpu::Buffer,
    pub indices: Option<wgpu::Buffer>,
    pub vertex_count: u32,
}

impl Mesh {
    fn destroy(self) {
        self.positions.destroy();
        self.texture_coords.destroy();
        self.normals.destroy();
        if let Some(indices) = self.indices {
            indices.destroy();
        }
    }
}

/// Cache key of the texture bound by untextured material groups.
const WHITE_TEXTURE: &str = "<white>";

pub struct Loader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    assets: AssetSource,
    meshes: HashMap<VaoId, Mesh>,
    textures: HashMap<TextureId, Texture>,
    /// Resolved file path to the texture uploaded from it.
    texture_cache: HashMap<String, TextureId>,
    next_vao: u32,
    next_texture: u32,
}

impl Loader {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, assets: AssetSource) -> Self {
        Self {
            device,
            queue,
            assets,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            texture_cache: HashMap::new(),
            next_vao: 1,
            next_texture: 1,
        }
    }

    pub fn assets(&self) -> &AssetSource {
        &self.assets
    }

    pub fn mesh(&self, vao: VaoId) -> Option<&Mesh> {
        self.meshes.get(&vao)
    }

    pub fn texture(&self, texture: TextureId) -> Option<&Texture> {
        self.textures.get(&texture)
    }

    pub fn model_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Validates the shape and uploads its streams.
    ///
    /// Streams the shape leaves empty are uploaded as zeros so every mesh
    /// fits every program. Shapes without indices become array draws.
    pub fn load_to_vao(&mut self, shape: &dyn Shape) -> anyhow::Result<RawModel> {
        shape.validate()?;
        let vertex_count = shape.vertex_count() as u32;
        let vao = self.allocate_vao();
        let label = format!("vao {}", vao.0);

        let positions = self.vertex_buffer(&label, "positions", shape.vertices());
        let texture_coords =
            self.stream_or_zeros(&label, "texture coords", shape.texture_coords(), 2 * vertex_count);
        let normals = self.stream_or_zeros(&label, "normals", shape.normals(), 3 * vertex_count);
        let indices = (!shape.indices().is_empty()).then(|| {
            let mut data = shape.indices().to_vec();
            // buffer writes must be 4 byte aligned
            if data.len() % 2 != 0 {
                data.push(0);
            }
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indices")),
                contents: bytemuck::cast_slice(&data),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        let model = match indices {
            Some(_) => RawModel::indexed(vao, vertex_count, shape.index_count() as u32),
            None => RawModel::arrays(vao, vertex_count),
        };
        self.meshes.insert(
            vao,
            Mesh {
                positions,
                texture_coords,
                normals,
                indices,
                vertex_count,
            },
        );
        log::debug!("uploaded {label}: {vertex_count} vertices");
        Ok(model)
    }

    /// Uploads bare positions as an array-drawn model.
    ///
    /// `dimensions` is 2 or 3; 2D positions get `z = 0`.
    pub fn load_positions(&mut self, positions: &[f32], dimensions: usize) -> anyhow::Result<RawModel> {
        ensure!(
            dimensions == 2 || dimensions == 3,
            "positions must have 2 or 3 components, got {dimensions}"
        );
        ensure!(
            !positions.is_empty() && positions.len() % dimensions == 0,
            "{} floats do not form {dimensions}D positions",
            positions.len()
        );
        let vertices: Vec<f32> = if dimensions == 3 {
            positions.to_vec()
        } else {
            positions.chunks(2).flat_map(|p| [p[0], p[1], 0.0]).collect()
        };
        let shape = crate::data_structures::shape::ShapeData::positions(vertices)?;
        self.load_to_vao(&shape)
    }

    /// Uploads an image file once; later calls for the same path share it.
    pub async fn load_texture(&mut self, file_name: &str) -> anyhow::Result<TextureId> {
        let key = self.assets.path(file_name).to_string_lossy().into_owned();
        if let Some(&texture) = self.texture_cache.get(&key) {
            log::debug!("texture {file_name} already loaded as {}", texture.0);
            return Ok(texture);
        }
        let img = self.assets.load_image(file_name).await?;
        let texture = self.load_texture_from_image(&img, file_name)?;
        self.texture_cache.insert(key, texture);
        log::info!("loaded texture {file_name}");
        Ok(texture)
    }

    /// A 1x1 white texture, created on first use.
    pub fn white_texture(&mut self) -> anyhow::Result<TextureId> {
        if let Some(&texture) = self.texture_cache.get(WHITE_TEXTURE) {
            return Ok(texture);
        }
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            1,
            1,
            image::Rgba([255, 255, 255, 255]),
        ));
        let texture = self.load_texture_from_image(&img, WHITE_TEXTURE)?;
        self.texture_cache.insert(WHITE_TEXTURE.to_owned(), texture);
        Ok(texture)
    }

    pub fn load_texture_from_image(
        &mut self,
        img: &image::DynamicImage,
        label: &str,
    ) -> anyhow::Result<TextureId> {
        let texture = Texture::from_image(&self.device, &self.queue, img, Some(label))?;
        Ok(self.insert_texture(texture))
    }

    /// Six faces in the order right, left, top, bottom, back, front.
    pub async fn load_cube_map(&mut self, file_names: [&str; 6]) -> anyhow::Result<TextureId> {
        let mut faces = Vec::with_capacity(6);
        for file_name in file_names {
            faces.push(self.assets.load_image(file_name).await?);
        }
        let faces: [image::DynamicImage; 6] = match faces.try_into() {
            Ok(faces) => faces,
            Err(_) => bail!("a cube map needs exactly six faces"),
        };
        self.load_cube_map_from_images(&faces, file_names[0])
    }

    pub fn load_cube_map_from_images(
        &mut self,
        faces: &[image::DynamicImage; 6],
        label: &str,
    ) -> anyhow::Result<TextureId> {
        let texture = Texture::create_cube_map(&self.device, &self.queue, faces, Some(label))
            .with_context(|| format!("cube map {label}"))?;
        Ok(self.insert_texture(texture))
    }

    /// Loads every group of an OBJ file as a model.
    ///
    /// Groups whose material names a diffuse texture sample it; the others
    /// are drawn in the material's flat diffuse colour over [`Self::white_texture`].
    pub async fn load_obj_models(&mut self, file_name: &str) -> anyhow::Result<Vec<TexturedModel>> {
        let objects = self.assets.load_obj(file_name).await?;
        let mut models = Vec::with_capacity(objects.len());
        for object in &objects {
            let material = object.material();
            if material.is_none() {
                log::warn!("group `{}` of {file_name} has no material, drawing it white", object.name());
            }
            let diffuse_map = match material.and_then(|m| m.diffuse_texture.as_deref()) {
                Some(diffuse) => Some(self.load_texture(diffuse).await?),
                None => None,
            };
            let texture = match diffuse_map {
                Some(texture) => texture,
                None => self.white_texture()?,
            };
            let raw = self.load_to_vao(object)?;
            let model = TexturedModel::new(raw, model_texture(material, texture, diffuse_map.is_some()))?
                .with_transparency(material.is_some_and(WfMaterial::is_transparent));
            models.push(model);
        }
        Ok(models)
    }

    pub fn unload_model(&mut self, vao: VaoId) -> bool {
        match self.meshes.remove(&vao) {
            Some(mesh) => {
                mesh.destroy();
                true
            }
            None => false,
        }
    }

    pub fn unload_texture(&mut self, texture: TextureId) -> bool {
        match self.textures.remove(&texture) {
            Some(t) => {
                self.texture_cache.retain(|_, cached| *cached != texture);
                t.texture.destroy();
                true
            }
            None => false,
        }
    }

    /// Releases everything still loaded.
    pub fn clean_up(&mut self) {
        let (meshes, textures) = (self.meshes.len(), self.textures.len());
        for (_, mesh) in self.meshes.drain() {
            mesh.destroy();
        }
        for (_, texture) in self.textures.drain() {
            texture.texture.destroy();
        }
        self.texture_cache.clear();
        if meshes + textures > 0 {
            log::info!("released {meshes} meshes and {textures} textures");
        }
    }

    fn allocate_vao(&mut self) -> VaoId {
        let vao = VaoId(self.next_vao);
        self.next_vao += 1;
        vao
    }

    fn insert_texture(&mut self, texture: Texture) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id, texture);
        id
    }

    fn vertex_buffer(&self, label: &str, stream: &str, data: &[f32]) -> wgpu::Buffer {
        self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} {stream}")),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX,
        })
    }

    fn stream_or_zeros(&self, label: &str, stream: &str, data: &[f32], len: u32) -> wgpu::Buffer {
        if data.is_empty() {
            self.vertex_buffer(label, stream, &vec![0.0; len as usize])
        } else {
            self.vertex_buffer(label, stream, data)
        }
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        self.clean_up();
    }
}

/// Lighting parameters of one OBJ group.
///
/// Shine comes from the MTL `Ns` exponent, reflectivity from the mean of `Ks`.
/// Untextured groups get texture weight 0 so the flat `Kd` colour shows.
fn model_texture(material: Option<&WfMaterial>, texture: TextureId, textured: bool) -> ModelTexture {
    let weight = if textured { 1.0 } else { 0.0 };
    let Some(material) = material else {
        return ModelTexture::new(texture).with_diffuse([1.0; 3], weight);
    };
    let shine_damper = if material.shininess > 0.0 { material.shininess } else { 1.0 };
    let reflectivity = material.specular.iter().sum::<f32>() / 3.0;
    ModelTexture::new(texture)
        .with_shine(shine_damper, reflectivity)
        .with_diffuse(material.diffuse, weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(diffuse_texture: Option<&str>) -> WfMaterial {
        WfMaterial {
            name: "bark".into(),
            diffuse_texture: diffuse_texture.map(str::to_owned),
            diffuse: [0.4, 0.2, 0.1],
            specular: [0.3, 0.6, 0.9],
            shininess: 12.0,
            dissolve: 1.0,
        }
    }

    #[test]
    fn untextured_group_uses_flat_colour() {
        let texture = model_texture(Some(&material(None)), TextureId(9), false);
        assert_eq!(texture.texture, TextureId(9));
        assert_eq!(texture.texture_weight, 0.0);
        assert_eq!(texture.diffuse_colour, [0.4, 0.2, 0.1]);
        assert_eq!(texture.shine_damper, 12.0);
        assert!((texture.reflectivity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn textured_group_samples_its_map() {
        let texture = model_texture(Some(&material(Some("bark.png"))), TextureId(2), true);
        assert_eq!(texture.texture_weight, 1.0);
        assert_eq!(texture.shine_damper, 12.0);
    }

    #[test]
    fn zero_shininess_keeps_default_damper() {
        let mut m = material(None);
        m.shininess = 0.0;
        assert_eq!(model_texture(Some(&m), TextureId(1), false).shine_damper, 1.0);
        let bare = model_texture(None, TextureId(1), false);
        assert_eq!(bare.diffuse_colour, [1.0; 3]);
        assert_eq!(bare.reflectivity, 0.0);
    }
}
