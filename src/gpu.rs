//! Replays recorded command streams with wgpu.
//!
//! [`FrameExecutor`] builds two pipelines per program (back-face culling on
//! and off) and keeps a CPU copy of every program's uniform block. Uniforms
//! persist across frames the way GL program state does: a value loaded once
//! (the projection) stays until it is overwritten.
//!
//! A frame is executed in three steps:
//! 1. walk the commands, snapshotting the uniform block and the texture units
//!    at every draw
//! 2. upload the snapshots (dynamic-offset uniform buffer) and the instance
//!    data, and build the texture bind groups
//! 3. encode a single render pass that clears and then issues every draw

use std::{collections::HashMap, num::NonZeroU64, ops::Range};

use anyhow::{Context as _, bail};

use crate::{
    context::Context,
    data_structures::{
        instance::{InstanceRaw, Vertex},
        model::{DrawMode, TextureId, VaoId},
        texture::Texture,
    },
    error::ShaderError,
    render::commands::{Command, CommandBuffer},
    resources::loader::{Loader, Mesh},
    shaders::{
        CompiledProgram, NORMAL_LOCATION, POSITION_LOCATION, ProgramKind, TEXTURE_COORDS_LOCATION,
        TextureSlot,
    },
};

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const TEXTURE_COORDS_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x2];
const NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x3];

/// A per-vertex stream of a [`Mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Positions,
    TextureCoords,
    Normals,
}

impl Stream {
    fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        let (array_stride, attributes): (u64, &'static [wgpu::VertexAttribute]) = match self {
            Stream::Positions => (12, &POSITION_ATTRIBUTES),
            Stream::TextureCoords => (8, &TEXTURE_COORDS_ATTRIBUTES),
            Stream::Normals => (12, &NORMAL_ATTRIBUTES),
        };
        wgpu::VertexBufferLayout {
            array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    fn buffer(self, mesh: &Mesh) -> &wgpu::Buffer {
        match self {
            Stream::Positions => &mesh.positions,
            Stream::TextureCoords => &mesh.texture_coords,
            Stream::Normals => &mesh.normals,
        }
    }
}

/// GPU objects and persistent state of one program.
struct ProgramState {
    label: &'static str,
    culled: wgpu::RenderPipeline,
    unculled: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    textures: Vec<TextureSlot>,
    streams: Vec<Stream>,
    instanced: bool,
    block: Vec<u8>,
    /// Texture binding -> texture unit.
    connections: HashMap<u32, u32>,
}

impl ProgramState {
    fn new(
        device: &wgpu::Device,
        program: &CompiledProgram,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let label = program.label();
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(program.vertex_source().into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(program.fragment_source().into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(program.uniform_block_size() as u64),
                },
                count: None,
            }],
        });

        let texture_entries: Vec<_> = program
            .textures()
            .iter()
            .flat_map(|slot| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: slot.binding,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: slot.kind.view_dimension(),
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: slot.binding + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let texture_layout = (!texture_entries.is_empty()).then(|| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &texture_entries,
            })
        });

        let mut bind_group_layouts = vec![&uniform_layout];
        bind_group_layouts.extend(texture_layout.as_ref());
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let streams: Vec<Stream> = [
            (POSITION_LOCATION, Stream::Positions),
            (TEXTURE_COORDS_LOCATION, Stream::TextureCoords),
            (NORMAL_LOCATION, Stream::Normals),
        ]
        .into_iter()
        .filter(|(location, _)| program.consumes_location(*location))
        .map(|(_, stream)| stream)
        .collect();
        let instanced = program.is_instanced();
        let mut vertex_layouts: Vec<_> = streams.iter().map(|s| s.layout()).collect();
        if instanced {
            vertex_layouts.push(InstanceRaw::desc());
        }

        // the sky sits exactly on the far plane
        let depth_compare = match program.kind() {
            ProgramKind::SkyBox => wgpu::CompareFunction::LessEqual,
            _ => wgpu::CompareFunction::Less,
        };
        let stages = PipelineStages {
            vertex: &vertex,
            fragment: &fragment,
            vertex_layouts: &vertex_layouts,
        };
        let culled = mk_render_pipeline(
            device,
            &layout,
            color_format,
            &stages,
            Some(wgpu::Face::Back),
            depth_compare,
        );
        let unculled = mk_render_pipeline(device, &layout, color_format, &stages, None, depth_compare);

        if let Some(error) = futures::executor::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Pipeline {
                label,
                message: error.to_string(),
            });
        }
        log::info!("created pipelines for {label}");

        Ok(Self {
            label,
            culled,
            unculled,
            uniform_layout,
            texture_layout,
            textures: program.textures().to_vec(),
            streams,
            instanced,
            block: vec![0; program.uniform_block_size() as usize],
            connections: HashMap::new(),
        })
    }

    /// Texture bound to each slot, in slot order.
    fn resolve_textures(&self, units: &HashMap<u32, TextureId>) -> anyhow::Result<Vec<TextureId>> {
        self.textures
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                // unconnected samplers read the unit matching their position
                let unit = self.connections.get(&slot.binding).copied().unwrap_or(i as u32);
                units.get(&unit).copied().with_context(|| {
                    format!(
                        "{}: `{}` reads texture unit {unit}, which has nothing bound",
                        self.label, slot.name
                    )
                })
            })
            .collect()
    }
}

struct PipelineStages<'a> {
    vertex: &'a wgpu::ShaderModule,
    fragment: &'a wgpu::ShaderModule,
    vertex_layouts: &'a [wgpu::VertexBufferLayout<'a>],
}

fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    stages: &PipelineStages<'_>,
    cull_mode: Option<wgpu::Face>,
    depth_compare: wgpu::CompareFunction,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: stages.vertex,
            entry_point: Some("vs_main"),
            buffers: stages.vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: stages.fragment,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

/// One draw with everything it needs resolved.
struct DrawOp {
    program: ProgramKind,
    culling: bool,
    uniform_offset: u32,
    textures: Vec<TextureId>,
    vao: VaoId,
    mode: DrawMode,
    instances: Range<u32>,
}

/// Replays [`CommandBuffer`]s. Owns the pipelines and per-frame buffers.
pub struct FrameExecutor {
    programs: HashMap<ProgramKind, ProgramState>,
    uniform_buffer: Option<wgpu::Buffer>,
    instance_buffer: Option<wgpu::Buffer>,
    alignment: u32,
}

impl FrameExecutor {
    pub fn new(ctx: &Context, programs: &[&CompiledProgram]) -> Result<Self, ShaderError> {
        let mut states = HashMap::new();
        for program in programs {
            states.insert(program.kind(), ProgramState::new(&ctx.device, program, ctx.format())?);
        }
        Ok(Self {
            programs: states,
            uniform_buffer: None,
            instance_buffer: None,
            alignment: ctx.device.limits().min_uniform_buffer_offset_alignment,
        })
    }

    /// Executes one frame into `target`, which must match the context's size.
    pub fn execute(
        &mut self,
        ctx: &Context,
        loader: &Loader,
        commands: &CommandBuffer,
        target: &wgpu::TextureView,
    ) -> anyhow::Result<()> {
        let mut uniforms: Vec<u8> = Vec::new();
        let mut instances: Vec<InstanceRaw> = Vec::new();
        let ops = self.record(commands, &mut uniforms, &mut instances)?;

        let uniform_buffer = upload(
            &ctx.device,
            &ctx.queue,
            &mut self.uniform_buffer,
            &uniforms,
            wgpu::BufferUsages::UNIFORM,
            "uniform snapshots",
        );
        let instance_buffer = upload(
            &ctx.device,
            &ctx.queue,
            &mut self.instance_buffer,
            bytemuck::cast_slice(&instances),
            wgpu::BufferUsages::VERTEX,
            "instances",
        );

        // bind groups
        let mut uniform_groups = HashMap::new();
        let mut texture_groups: HashMap<(ProgramKind, Vec<TextureId>), wgpu::BindGroup> = HashMap::new();
        for op in &ops {
            let state = &self.programs[&op.program];
            if let Some(buffer) = &uniform_buffer {
                uniform_groups.entry(op.program).or_insert_with(|| {
                    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(state.label),
                        layout: &state.uniform_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                                buffer,
                                offset: 0,
                                size: NonZeroU64::new(state.block.len() as u64),
                            }),
                        }],
                    })
                });
            }
            let key = (op.program, op.textures.clone());
            if let (Some(layout), false) = (&state.texture_layout, texture_groups.contains_key(&key)) {
                let group = texture_bind_group(&ctx.device, loader, state, layout, &op.textures)?;
                texture_groups.insert(key, group);
            }
        }

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        {
            let colour = commands.clear_colour().unwrap_or([0.0, 0.0, 0.0, 1.0]);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: colour[0] as f64,
                            g: colour[1] as f64,
                            b: colour[2] as f64,
                            a: colour[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: ctx.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for op in &ops {
                let state = &self.programs[&op.program];
                let mesh = loader
                    .mesh(op.vao)
                    .with_context(|| format!("mesh {:?} is not loaded", op.vao))?;
                render_pass.set_pipeline(if op.culling { &state.culled } else { &state.unculled });
                render_pass.set_bind_group(0, uniform_groups.get(&op.program), &[op.uniform_offset]);
                if state.texture_layout.is_some() {
                    render_pass.set_bind_group(1, texture_groups.get(&(op.program, op.textures.clone())), &[]);
                }
                for (slot, stream) in state.streams.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, stream.buffer(mesh).slice(..));
                }
                let instance_count = op.instances.end - op.instances.start;
                if state.instanced {
                    let Some(buffer) = &instance_buffer else {
                        bail!("{}: instanced draw without instance data", state.label);
                    };
                    let stride = std::mem::size_of::<InstanceRaw>() as u64;
                    render_pass.set_vertex_buffer(
                        state.streams.len() as u32,
                        buffer.slice(op.instances.start as u64 * stride..op.instances.end as u64 * stride),
                    );
                }
                match op.mode {
                    DrawMode::Indexed { index_count } => {
                        let indices = mesh
                            .indices
                            .as_ref()
                            .with_context(|| format!("mesh {:?} has no index buffer", op.vao))?;
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                        render_pass.draw_indexed(0..index_count, 0, 0..instance_count);
                    }
                    DrawMode::Arrays { vertex_count } => {
                        render_pass.draw(0..vertex_count, 0..instance_count);
                    }
                }
            }
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    /// Walks the stream, updating program state and collecting draws.
    fn record(
        &mut self,
        commands: &CommandBuffer,
        uniforms: &mut Vec<u8>,
        instances: &mut Vec<InstanceRaw>,
    ) -> anyhow::Result<Vec<DrawOp>> {
        let alignment = self.alignment;
        let mut ops = Vec::new();
        let mut program: Option<ProgramKind> = None;
        let mut mesh: Option<VaoId> = None;
        let mut units: HashMap<u32, TextureId> = HashMap::new();
        let mut culling = true;

        for command in commands {
            match command {
                Command::Clear { .. } => {}
                Command::UseProgram(kind) => {
                    if !self.programs.contains_key(kind) {
                        bail!("program {kind:?} has no pipeline");
                    }
                    program = Some(*kind);
                }
                Command::StopProgram => program = None,
                Command::LoadUniform { location, value } => {
                    let state = self.active(program)?;
                    let range = location.offset as usize..(location.offset + location.size) as usize;
                    let Some(dst) = state.block.get_mut(range) else {
                        bail!("{}: uniform at {location:?} lies outside the block", state.label);
                    };
                    value.write_to(dst);
                }
                Command::ConnectTextureUnit { binding, unit } => {
                    self.active(program)?.connections.insert(*binding, *unit);
                }
                Command::BindMesh(vao) => mesh = Some(*vao),
                Command::UnbindMesh => mesh = None,
                Command::BindTexture { unit, texture } => {
                    units.insert(*unit, *texture);
                }
                Command::SetCulling(enabled) => culling = *enabled,
                Command::Draw { mode } => {
                    let kind = program.context("draw outside of a program")?;
                    let vao = mesh.context("draw without a bound mesh")?;
                    let state = self.active(program)?;
                    let start = instances.len() as u32;
                    if state.instanced {
                        instances.push(identity_instance());
                    }
                    ops.push(DrawOp {
                        program: kind,
                        culling,
                        uniform_offset: snapshot(uniforms, &state.block, alignment),
                        textures: state.resolve_textures(&units)?,
                        vao,
                        mode: *mode,
                        instances: start..start + 1,
                    });
                }
                Command::DrawInstanced { mode, instances: batch } => {
                    let kind = program.context("draw outside of a program")?;
                    let vao = mesh.context("draw without a bound mesh")?;
                    if batch.is_empty() {
                        continue;
                    }
                    let state = self.active(program)?;
                    let start = instances.len() as u32;
                    instances.extend_from_slice(batch);
                    ops.push(DrawOp {
                        program: kind,
                        culling,
                        uniform_offset: snapshot(uniforms, &state.block, alignment),
                        textures: state.resolve_textures(&units)?,
                        vao,
                        mode: *mode,
                        instances: start..instances.len() as u32,
                    });
                }
            }
        }
        Ok(ops)
    }

    fn active(&mut self, program: Option<ProgramKind>) -> anyhow::Result<&mut ProgramState> {
        let kind = program.context("uniform state changed outside of a program")?;
        self.programs
            .get_mut(&kind)
            .with_context(|| format!("program {kind:?} has no pipeline"))
    }
}

fn identity_instance() -> InstanceRaw {
    InstanceRaw {
        model: crate::math::Transformation::new().as_array(),
        texture_offset: [0.0, 0.0],
    }
}

/// Appends the block at the next aligned offset and returns that offset.
fn snapshot(uniforms: &mut Vec<u8>, block: &[u8], alignment: u32) -> u32 {
    let alignment = alignment.max(1) as usize;
    let offset = uniforms.len().div_ceil(alignment) * alignment;
    uniforms.resize(offset, 0);
    uniforms.extend_from_slice(block);
    offset as u32
}

/// Writes `data` into `slot`, growing the buffer when it is too small.
fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    slot: &mut Option<wgpu::Buffer>,
    data: &[u8],
    usage: wgpu::BufferUsages,
    label: &str,
) -> Option<wgpu::Buffer> {
    if data.is_empty() {
        return None;
    }
    let size = (data.len() as u64).next_power_of_two().max(256);
    let buffer = match slot.take() {
        Some(buffer) if buffer.size() >= data.len() as u64 => buffer,
        old => {
            if let Some(old) = old {
                old.destroy();
            }
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        }
    };
    queue.write_buffer(&buffer, 0, data);
    *slot = Some(buffer.clone());
    Some(buffer)
}

fn texture_bind_group(
    device: &wgpu::Device,
    loader: &Loader,
    state: &ProgramState,
    layout: &wgpu::BindGroupLayout,
    textures: &[TextureId],
) -> anyhow::Result<wgpu::BindGroup> {
    let mut resolved = Vec::with_capacity(textures.len());
    for (slot, id) in state.textures.iter().zip(textures) {
        let texture = loader
            .texture(*id)
            .with_context(|| format!("texture {id:?} is not loaded"))?;
        if texture.kind != slot.kind {
            bail!(
                "{}: `{}` expects a {:?} texture, {id:?} is {:?}",
                state.label,
                slot.name,
                slot.kind,
                texture.kind
            );
        }
        let sampler = texture
            .sampler
            .as_ref()
            .with_context(|| format!("texture {id:?} has no sampler"))?;
        resolved.push((slot.binding, texture, sampler));
    }
    let entries: Vec<_> = resolved
        .iter()
        .flat_map(|(binding, texture, sampler)| {
            [
                wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: binding + 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ]
        })
        .collect();
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(state.label),
        layout,
        entries: &entries,
    }))
}

#[cfg(feature = "integration-tests")]
pub mod readback {
    //! Copying rendered frames back to the CPU for golden-image style tests.

    use std::iter;

    use anyhow::Context as _;

    use crate::context::Context;

    /// A texture a frame can be rendered into and read back from.
    pub fn create_target(ctx: &Context) -> wgpu::Texture {
        let (width, height) = ctx.size();
        ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Output Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ctx.format(),
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    pub fn read_pixels(ctx: &Context, texture: &wgpu::Texture) -> anyhow::Result<image::RgbaImage> {
        let (width, height) = (texture.width(), texture.height());
        let unpadded = 4 * width;
        let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: (padded * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            texture.size(),
        );
        ctx.queue.submit(iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        ctx.device
            .poll(wgpu::PollType::Wait)
            .context("waiting for the readback")?;
        futures::executor::block_on(rx.receive())
            .context("readback channel closed")?
            .context("mapping the readback buffer")?;

        let data = buffer_slice.get_mapped_range();
        let pixels: Vec<u8> = data
            .chunks(padded as usize)
            .flat_map(|row| row[..unpadded as usize].iter().copied())
            .collect();
        drop(data);
        output_buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels).context("readback has the wrong size")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_are_aligned() {
        let mut uniforms = Vec::new();
        assert_eq!(snapshot(&mut uniforms, &[1; 80], 256), 0);
        assert_eq!(snapshot(&mut uniforms, &[2; 80], 256), 256);
        assert_eq!(uniforms.len(), 336);
        assert_eq!(uniforms[256], 2);
        assert_eq!(uniforms[100], 0);
    }

    #[test]
    fn stream_layouts_match_loader_slots() {
        assert_eq!(Stream::Positions.layout().attributes[0].shader_location, POSITION_LOCATION);
        assert_eq!(
            Stream::TextureCoords.layout().attributes[0].shader_location,
            TEXTURE_COORDS_LOCATION
        );
        assert_eq!(Stream::Normals.layout().attributes[0].shader_location, NORMAL_LOCATION);
    }
}
