//! Engine data models: geometry, GPU handles and scene objects.
//!
//! - shapes: [`shape::Shape`] and its variants [`wavefront::WfObject`],
//!   [`terrain_shape::TerrainShape`], [`sky_box_shape::SkyBoxShape`]
//! - handles: [`model::RawModel`], [`model::TexturedModel`], [`texture::Texture`]
//! - scene: [`entity::Entity`], [`terrain::Terrain`], [`sky_box::SkyBox`],
//!   [`light::Light`], [`camera::Camera`], [`player::Player`] with its
//!   [`player::ThirdPersonCamera`]

pub mod camera;
pub mod entity;
pub mod instance;
pub mod light;
pub mod model;
pub mod player;
pub mod shape;
pub mod sky_box;
pub mod sky_box_shape;
pub mod terrain;
pub mod terrain_shape;
pub mod texture;
pub mod wavefront;
