#![cfg(feature = "integration-tests")]

use forward_ngin::{
    context::Context,
    data_structures::{
        model::DrawMode,
        shape::ShapeData,
        sky_box_shape::SkyBoxShape,
        terrain_shape::TerrainShape,
    },
    resources::{AssetSource, loader::Loader},
};

use crate::common::solid;

mod common;

fn loader() -> Loader {
    let ctx = futures::executor::block_on(Context::headless(4, 4)).unwrap();
    Loader::new(ctx.device.clone(), ctx.queue.clone(), AssetSource::default())
}

const TREE_OBJ: &str = "\
mtllib tree.mtl
v 0 0 0
v 1 0 0
v 0 1 0
vt 0 0
vt 1 0
vt 0 1
vn 0 0 1
o trunk
usemtl bark
f 1/1/1 2/2/1 3/3/1
o branch
usemtl bark
f 1/1/1 2/2/1 3/3/1
o leaves
usemtl leaf
f 1/1/1 2/2/1 3/3/1
";

const TREE_MTL: &str = "\
newmtl bark
Kd 1 1 1
Ns 8
map_Kd bark.png
newmtl leaf
Kd 0.1 0.6 0.2
Ks 0.5 0.5 0.5
Ns 32
";

fn tree_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("forward-ngin-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("tree.obj"), TREE_OBJ).unwrap();
    std::fs::write(dir.join("tree.mtl"), TREE_MTL).unwrap();
    solid([120, 80, 40, 255], 2).save(dir.join("bark.png")).unwrap();
    dir
}

#[test]
fn uploads_hand_out_distinct_handles() {
    let mut loader = loader();
    let terrain = loader.load_to_vao(&TerrainShape::generate(8, None).unwrap()).unwrap();
    let sky = loader.load_to_vao(&SkyBoxShape::new().unwrap()).unwrap();
    assert_ne!(terrain.vao(), sky.vao());
    assert_eq!(terrain.mode(), DrawMode::Indexed { index_count: 294 });
    assert_eq!(sky.mode(), DrawMode::Arrays { vertex_count: 36 });

    let mesh = loader.mesh(sky.vao()).unwrap();
    assert!(mesh.indices.is_none());
    // missing streams are zero-filled to the vertex count
    assert_eq!(mesh.normals.size(), 36 * 12);
    assert_eq!(loader.model_count(), 2);
}

#[test]
fn invalid_shapes_are_rejected_before_upload() {
    let mut loader = loader();
    let shape = ShapeData::new(vec![0.0; 9], vec![], vec![], vec![0, 1, 3]);
    assert!(shape.is_err());
    assert!(loader.load_positions(&[0.0, 1.0, 2.0, 3.0, 4.0], 2).is_err());
    assert_eq!(loader.model_count(), 0);
}

#[test]
fn two_dimensional_positions_are_lifted() {
    let mut loader = loader();
    let quad = loader
        .load_positions(&[-1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0, -1.0], 2)
        .unwrap();
    assert_eq!(quad.vertex_count(), 4);
    assert_eq!(loader.mesh(quad.vao()).unwrap().positions.size(), 4 * 12);
}

#[test]
fn unloading_releases_once() {
    let mut loader = loader();
    let texture = loader.load_texture_from_image(&solid([0, 255, 0, 255], 4), "green").unwrap();
    let model = loader.load_to_vao(&SkyBoxShape::new().unwrap()).unwrap();
    assert!(loader.texture(texture).is_some());

    assert!(loader.unload_texture(texture));
    assert!(!loader.unload_texture(texture));
    assert!(loader.unload_model(model.vao()));
    assert!(loader.mesh(model.vao()).is_none());

    loader.load_to_vao(&SkyBoxShape::new().unwrap()).unwrap();
    loader.clean_up();
    assert_eq!(loader.model_count(), 0);
    assert_eq!(loader.texture_count(), 0);
}

#[test]
fn uploaded_texture_keeps_its_size() {
    let mut loader = loader();
    let id = loader.load_texture_from_image(&solid([0, 0, 255, 255], 4), "blue").unwrap();
    let texture = loader.texture(id).unwrap();
    assert_eq!((texture.texture.width(), texture.texture.height()), (4, 4));
}

#[tokio::test]
async fn untextured_groups_keep_their_material_colour() {
    let ctx = Context::headless(4, 4).await.unwrap();
    let mut loader = Loader::new(ctx.device.clone(), ctx.queue.clone(), AssetSource::new(tree_dir("flat")));
    let models = loader.load_obj_models("tree.obj").await.unwrap();
    assert_eq!(models.len(), 3);

    let leaves = models[2].texture();
    assert_eq!(leaves.texture_weight, 0.0);
    assert_eq!(leaves.diffuse_colour, [0.1, 0.6, 0.2]);
    assert_eq!(leaves.shine_damper, 32.0);
    assert_eq!(leaves.reflectivity, 0.5);
    assert_eq!(leaves.texture, loader.white_texture().unwrap());

    let trunk = models[0].texture();
    assert_eq!(trunk.texture_weight, 1.0);
    assert_eq!(trunk.shine_damper, 8.0);
}

#[tokio::test]
async fn groups_sharing_a_material_share_one_texture() {
    let ctx = Context::headless(4, 4).await.unwrap();
    let mut loader = Loader::new(ctx.device.clone(), ctx.queue.clone(), AssetSource::new(tree_dir("shared")));
    let models = loader.load_obj_models("tree.obj").await.unwrap();
    assert_eq!(models[0].texture().texture, models[1].texture().texture);
    // bark.png and the white texture
    assert_eq!(loader.texture_count(), 2);

    let again = loader.load_texture("bark.png").await.unwrap();
    assert_eq!(again, models[0].texture().texture);
    assert_eq!(loader.texture_count(), 2);

    // an unloaded texture is read from disk again
    assert!(loader.unload_texture(again));
    let reloaded = loader.load_texture("bark.png").await.unwrap();
    assert_ne!(reloaded, again);
}
