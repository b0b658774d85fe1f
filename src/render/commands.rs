//! The draw command stream.
//!
//! Renderers never touch the GPU. They record what a GL-style pipeline would
//! do (bind a program, load uniforms, bind a mesh and its textures, draw) into
//! a [`CommandBuffer`], which [`crate::gpu::FrameExecutor`] replays with wgpu.
//! Keeping the stream inspectable is what lets the renderers be tested without
//! a device.

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{DrawMode, TextureId, VaoId},
    },
    shaders::{ProgramKind, UniformLocation},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    /// Width in bytes inside a uniform block.
    pub fn size(&self) -> u32 {
        match self {
            UniformValue::Int(_) | UniformValue::Float(_) => 4,
            UniformValue::Vec3(_) => 12,
            UniformValue::Mat4(_) => 64,
        }
    }

    /// Writes the value at the start of `dst`.
    pub fn write_to(&self, dst: &mut [u8]) {
        let bytes: &[u8] = match self {
            UniformValue::Int(v) => bytemuck::bytes_of(v),
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec3(v) => bytemuck::cast_slice(v),
            UniformValue::Mat4(v) => bytemuck::cast_slice(v),
        };
        dst[..bytes.len()].copy_from_slice(bytes);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Colour the frame starts from. Depth is always cleared to the far plane.
    Clear { colour: [f32; 4] },
    UseProgram(ProgramKind),
    LoadUniform {
        location: UniformLocation,
        value: UniformValue,
    },
    /// The texture variable at `binding` samples texture unit `unit`.
    ConnectTextureUnit { binding: u32, unit: u32 },
    BindMesh(VaoId),
    BindTexture { unit: u32, texture: TextureId },
    SetCulling(bool),
    Draw { mode: DrawMode },
    DrawInstanced {
        mode: DrawMode,
        instances: Vec<InstanceRaw>,
    },
    UnbindMesh,
    StopProgram,
}

/// One draw as seen by the GPU, for inspecting a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub program: ProgramKind,
    pub mesh: VaoId,
    pub mode: DrawMode,
    pub instances: u32,
    pub culling: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn append(&mut self, other: &mut CommandBuffer) {
        self.commands.append(&mut other.commands);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Replays the state changes and lists every draw with the state it sees.
    ///
    /// Draws outside a program or without a bound mesh are skipped, the GPU
    /// executor would reject them too.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        let mut calls = Vec::new();
        let mut program = None;
        let mut mesh = None;
        let mut culling = true;
        for command in &self.commands {
            match command {
                Command::UseProgram(kind) => program = Some(*kind),
                Command::StopProgram => program = None,
                Command::BindMesh(vao) => mesh = Some(*vao),
                Command::UnbindMesh => mesh = None,
                Command::SetCulling(enabled) => culling = *enabled,
                Command::Draw { mode } => {
                    if let (Some(program), Some(mesh)) = (program, mesh) {
                        calls.push(DrawCall {
                            program,
                            mesh,
                            mode: *mode,
                            instances: 1,
                            culling,
                        });
                    }
                }
                Command::DrawInstanced { mode, instances } => {
                    if let (Some(program), Some(mesh)) = (program, mesh) {
                        calls.push(DrawCall {
                            program,
                            mesh,
                            mode: *mode,
                            instances: instances.len() as u32,
                            culling,
                        });
                    }
                }
                _ => {}
            }
        }
        calls
    }

    /// Colour of the last clear, if the stream clears at all.
    pub fn clear_colour(&self) -> Option<[f32; 4]> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::Clear { colour } => Some(*colour),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a CommandBuffer {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_write_little_endian_floats() {
        let mut block = [0u8; 16];
        UniformValue::Vec3([1.0, 2.0, 3.0]).write_to(&mut block[4..]);
        let floats: &[f32] = bytemuck::cast_slice(&block);
        assert_eq!(floats, &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn draw_calls_track_bound_state() {
        let mut buffer = CommandBuffer::new();
        buffer.push(Command::Draw {
            mode: DrawMode::Arrays { vertex_count: 3 },
        });
        buffer.push(Command::UseProgram(ProgramKind::Terrain));
        buffer.push(Command::BindMesh(VaoId(4)));
        buffer.push(Command::SetCulling(false));
        buffer.push(Command::DrawInstanced {
            mode: DrawMode::Indexed { index_count: 6 },
            instances: vec![bytemuck::Zeroable::zeroed(); 3],
        });
        buffer.push(Command::UnbindMesh);
        buffer.push(Command::StopProgram);

        assert_eq!(
            buffer.draw_calls(),
            vec![DrawCall {
                program: ProgramKind::Terrain,
                mesh: VaoId(4),
                mode: DrawMode::Indexed { index_count: 6 },
                instances: 3,
                culling: false,
            }]
        );
    }

    #[test]
    fn last_clear_wins() {
        let mut buffer = CommandBuffer::new();
        assert_eq!(buffer.clear_colour(), None);
        buffer.push(Command::Clear { colour: [0.0; 4] });
        buffer.push(Command::Clear { colour: [1.0; 4] });
        assert_eq!(buffer.clear_colour(), Some([1.0; 4]));
    }
}
