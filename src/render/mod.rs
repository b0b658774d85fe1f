//! Renderers and the per-frame orchestration.
//!
//! - [`commands`]: the command stream every renderer records into
//! - [`entity`], [`terrain`], [`sky_box`]: one renderer per kind of object
//! - [`master`]: [`MasterRender`], which batches the scene and runs the
//!   renderers in a fixed order

pub mod commands;
pub mod entity;
pub mod master;
pub mod sky_box;
pub mod terrain;

pub use commands::{Command, CommandBuffer, DrawCall, UniformValue};
pub use master::{MasterRender, RenderConfig};
