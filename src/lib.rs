//! forward-ngin
//!
//! A small forward renderer: textured OBJ entities batched by model,
//! height-mapped multi-textured terrains and a cube-mapped sky box, lit by a
//! single light with fog that fades into the sky colour.
//!
//! Renderers never touch the GPU directly. They record a
//! [`render::CommandBuffer`] which [`gpu::FrameExecutor`] replays with wgpu;
//! this keeps every renderer testable without a device.
//!
//! High-level modules
//! - `app`: window, event loop and the [`app::GameScene`] hook
//! - `context`: GPU device, queue and render target
//! - `data_structures`: shapes, models, entities, terrains, sky box, light, camera
//! - `error`: typed shape and shader errors
//! - `gpu`: pipelines and command replay
//! - `math`: the [`math::Transformation`] matrix builder
//! - `render`: the command stream, the per-type renderers and [`render::MasterRender`]
//! - `resources`: asset files and the [`resources::loader::Loader`] upload service
//! - `shaders`: WGSL programs, reflection and the shader managers

pub mod app;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod gpu;
pub mod math;
pub mod render;
pub mod resources;
pub mod shaders;

// Re-exports commonly used types for convenience in downstream code.
pub use app::{GameScene, run};
pub use error::{ShaderError, ShapeError};
pub use math::{Transformation, Vector2f, Vector3f};
pub use render::{MasterRender, RenderConfig};
pub use winit::event::WindowEvent;
