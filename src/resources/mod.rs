//! Loading meshes, images and height maps from the assets directory.
//!
//! Everything here is CPU-side: files are read and decoded into shapes and
//! images. Uploading them is the job of [`loader::Loader`].

pub mod loader;

use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::data_structures::{terrain_shape::HeightMap, wavefront::WfObject};

/// Environment variable overriding the assets directory.
pub const ASSETS_ENV: &str = "FORWARD_NGIN_ASSETS";

/// Where asset files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSource {
    root: PathBuf,
}

impl Default for AssetSource {
    fn default() -> Self {
        Self::new(Path::new("./").join("assets"))
    }
}

impl AssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$FORWARD_NGIN_ASSETS` if set, `./assets` otherwise.
    pub fn from_env() -> Self {
        match std::env::var_os(ASSETS_ENV) {
            Some(root) => Self::new(root),
            None => Self::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub async fn load_string(&self, file_name: &str) -> anyhow::Result<String> {
        let path = self.path(file_name);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    pub async fn load_binary(&self, file_name: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.path(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    pub async fn load_image(&self, file_name: &str) -> anyhow::Result<image::DynamicImage> {
        let data = self.load_binary(file_name).await?;
        image::load_from_memory(&data).with_context(|| format!("decoding {file_name}"))
    }

    /// Parses an OBJ file into one [`WfObject`] per named group.
    ///
    /// Faces are triangulated and re-indexed so every vertex has a single
    /// index. Materials come from the `.mtl` files the OBJ references; a
    /// missing `.mtl` only drops the materials.
    pub async fn load_obj(&self, file_name: &str) -> anyhow::Result<Vec<WfObject>> {
        let obj_text = self.load_string(file_name).await?;
        let mut obj_reader = BufReader::new(Cursor::new(obj_text));

        let (models, materials) = tobj::load_obj_buf_async(
            &mut obj_reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |p| async move {
                match self.load_string(&p).await {
                    Ok(mtl_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mtl_text))),
                    Err(e) => {
                        log::warn!("material library {p} not loaded: {e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            },
        )
        .await
        .with_context(|| format!("parsing {file_name}"))?;
        let materials = materials.unwrap_or_else(|e| {
            log::warn!("{file_name} has no usable materials: {e}");
            Vec::new()
        });

        let objects = models
            .iter()
            .map(|model| {
                WfObject::from_tobj(model, &materials)
                    .with_context(|| format!("group `{}` of {file_name}", model.name))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!("loaded {} object(s) from {file_name}", objects.len());
        Ok(objects)
    }

    pub async fn load_height_map(&self, file_name: &str) -> anyhow::Result<HeightMap> {
        let img = self.load_image(file_name).await?;
        Ok(HeightMap::from_image(&img))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("forward-ngin-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_root_is_assets() {
        assert_eq!(AssetSource::default().path("a.png"), Path::new("./assets/a.png"));
    }

    #[tokio::test]
    async fn missing_file_reports_path() {
        let assets = AssetSource::new("/definitely/not/here");
        let err = assets.load_string("nothing.obj").await.unwrap_err();
        assert!(format!("{err:#}").contains("nothing.obj"));
    }

    #[tokio::test]
    async fn obj_with_missing_material_still_loads() {
        let dir = scratch_dir("obj");
        std::fs::write(
            dir.join("tri.obj"),
            "mtllib gone.mtl\no tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1\n",
        )
        .unwrap();
        let objects = AssetSource::new(&dir).load_obj("tri.obj").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name(), "tri");
        assert!(objects[0].material().is_none());
    }

    #[tokio::test]
    async fn height_map_is_decoded_from_png() {
        let dir = scratch_dir("height");
        let img = image::RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 { image::Rgb([0, 0, 0]) } else { image::Rgb([255, 255, 255]) }
        });
        img.save(dir.join("height.png")).unwrap();
        let map = AssetSource::new(&dir).load_height_map("height.png").await.unwrap();
        assert_eq!(map.dimensions(), (4, 2));
    }
}
