//! Per-instance data for batched entity draws.
//!
//! Every entity in a model bucket contributes one [`InstanceRaw`]: its
//! transformation matrix and its texture atlas offset. The whole bucket is then
//! submitted with a single instanced draw.

/// Describes how a `#[repr(C)]` struct maps onto shader input locations.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/**
 * The raw instance is the actual data stored on the GPU
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub texture_offset: [f32; 2],
}

impl InstanceRaw {
    /// First shader location used by the instance stream.
    pub const FIRST_LOCATION: u32 = 5;
}

/**
 * Stride layout: the transformation as four column vectors followed by the
 * atlas offset. A mat4 takes up four vertex slots, one per vec4.
 */
impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // advance once per instance, not per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_covers_the_whole_struct() {
        let desc = InstanceRaw::desc();
        assert_eq!(desc.array_stride, 72);
        assert_eq!(desc.attributes.len(), 5);
        assert_eq!(desc.attributes[0].shader_location, InstanceRaw::FIRST_LOCATION);
        let last = desc.attributes[4];
        assert_eq!(last.offset + last.format.size(), desc.array_stride);
    }
}
