//! Typed failures raised while building geometry and shader programs.
//!
//! Both kinds are construction-time errors: a shape or a program that fails
//! validation never reaches the renderers. Resource I/O keeps using
//! `anyhow::Result` with context attached by the loader.

use crate::shaders::Stage;

/// Geometry that breaks the four-stream contract of [`crate::data_structures::shape::Shape`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShapeError {
    #[error("vertex buffer holds {0} floats, which is not a multiple of 3")]
    RaggedVertices(usize),
    #[error("{stream} stream describes {found} vertices but the shape has {expected}")]
    StreamMismatch {
        stream: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        index: u16,
        position: usize,
        vertex_count: usize,
    },
    #[error("index buffer length {0} is not a multiple of 3")]
    RaggedIndices(usize),
    #[error("{0} vertices do not fit into 16-bit indices")]
    TooManyVertices(usize),
    #[error("shape has no vertices")]
    Empty,
}

/// A shader program that could not be compiled, linked or reflected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShaderError {
    #[error("{label}: {stage} stage failed to compile\n{message}")]
    Compile {
        label: &'static str,
        stage: Stage,
        message: String,
    },
    #[error("{label}: program failed to link: {message}")]
    Link {
        label: &'static str,
        message: String,
    },
    #[error("{label}: {stage} stage has no entry point")]
    MissingEntryPoint { label: &'static str, stage: Stage },
    #[error("{label}: uniform `{name}` is not part of the uniform block")]
    MissingUniform {
        label: &'static str,
        name: &'static str,
    },
    #[error("{label}: uniform `{name}` is {found} bytes wide, expected {expected}")]
    UniformSize {
        label: &'static str,
        name: &'static str,
        expected: u32,
        found: u32,
    },
    #[error("{label}: vertex attribute `{name}` is not consumed by the vertex stage")]
    MissingAttribute {
        label: &'static str,
        name: &'static str,
    },
    #[error("{label}: vertex attribute `{name}` is bound at location {found}, expected {expected}")]
    AttributeLocation {
        label: &'static str,
        name: &'static str,
        expected: u32,
        found: u32,
    },
    #[error("{label}: texture `{name}` is not declared in the texture group")]
    MissingTexture {
        label: &'static str,
        name: &'static str,
    },
    #[error("{label}: pipeline creation failed: {message}")]
    Pipeline {
        label: &'static str,
        message: String,
    },
}
