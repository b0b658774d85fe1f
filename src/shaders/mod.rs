//! Shader programs and the managers that feed them.
//!
//! A program is a pair of WGSL modules, one per stage. Building it:
//! 1. compiles each stage with `naga` (parse + validate)
//! 2. links the stages: every fragment input must be produced by the vertex
//!    stage with the same type, and both stages must agree on the uniform block
//! 3. binds the vertex attributes to the slots the loader fills
//! 4. resolves every uniform, once, into a [`UniformLocation`]
//!
//! Any failure is a [`ShaderError`]; a program that fails to build is never
//! handed to a renderer.
//!
//! Uniforms live in one block at `@group(0) @binding(0)`. A location is the
//! byte range of one member of that block. Textures live in group 1, each
//! texture immediately followed by its sampler.
//!
//! [`ShaderManager::start`] returns an [`ActiveProgram`] guard; uniform setters
//! only exist on the guard, and dropping it stops the program.

pub mod entity;
pub mod sky_box;
pub mod terrain;

use std::{
    fmt,
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use naga::{AddressSpace, Binding, ImageDimension, Module, ResourceBinding, ShaderStage, TypeInner};

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{RawModel, TextureId},
        texture::TextureKind,
    },
    error::ShaderError,
    math::{Transformation, Vector3f},
    render::commands::{Command, CommandBuffer, UniformValue},
};

pub use entity::EntityShaderManager;
pub use sky_box::SkyBoxShaderManager;
pub use terrain::TerrainShaderManager;

/// Bind group of the uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group of the textures and samplers.
pub const TEXTURE_GROUP: u32 = 1;

/// Vertex slots filled by the loader.
pub const POSITION_LOCATION: u32 = 0;
pub const TEXTURE_COORDS_LOCATION: u32 = 1;
pub const NORMAL_LOCATION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Which of the engine's programs a command stream refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProgramKind {
    Entity,
    Terrain,
    SkyBox,
}

/// Byte range of one uniform inside its program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub offset: u32,
    pub size: u32,
}

/// Everything needed to build one program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource {
    pub label: &'static str,
    pub kind: ProgramKind,
    pub vertex: &'static str,
    pub fragment: &'static str,
    /// Vertex inputs and the slot each one must be bound to.
    pub attributes: &'static [(&'static str, u32)],
    /// Textures the program samples, by variable name.
    pub textures: &'static [&'static str],
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformMember {
    pub name: String,
    pub location: UniformLocation,
}

/// A texture variable of group 1; its sampler sits at `binding + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSlot {
    pub name: String,
    pub binding: u32,
    pub kind: TextureKind,
}

/// A vertex input consumed by the vertex stage.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
}

/// A compiled and linked program with its reflected interface.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    label: &'static str,
    kind: ProgramKind,
    vertex_source: &'static str,
    fragment_source: &'static str,
    uniform_block_size: u32,
    uniforms: Vec<UniformMember>,
    textures: Vec<TextureSlot>,
    vertex_inputs: Vec<VertexInput>,
}

struct Interface {
    name: String,
    location: u32,
    ty: TypeInner,
}

impl CompiledProgram {
    pub fn build(source: &ProgramSource) -> Result<Self, ShaderError> {
        let label = source.label;
        let vertex = compile(label, Stage::Vertex, source.vertex)?;
        let fragment = compile(label, Stage::Fragment, source.fragment)?;

        let vertex_entry = entry_point(&vertex, ShaderStage::Vertex)
            .ok_or(ShaderError::MissingEntryPoint { label, stage: Stage::Vertex })?;
        let fragment_entry = entry_point(&fragment, ShaderStage::Fragment).ok_or(
            ShaderError::MissingEntryPoint {
                label,
                stage: Stage::Fragment,
            },
        )?;

        // link varyings
        let mut outputs = Vec::new();
        if let Some(result) = &vertex_entry.function.result {
            collect_interface(&vertex, String::new(), result.ty, result.binding.as_ref(), &mut outputs);
        }
        let mut inputs = Vec::new();
        for argument in &fragment_entry.function.arguments {
            let name = argument.name.clone().unwrap_or_default();
            collect_interface(&fragment, name, argument.ty, argument.binding.as_ref(), &mut inputs);
        }
        for input in &inputs {
            match outputs.iter().find(|o| o.location == input.location) {
                None => {
                    return Err(ShaderError::Link {
                        label,
                        message: format!(
                            "fragment input `{}` at location {} is not written by the vertex stage",
                            input.name, input.location
                        ),
                    });
                }
                Some(output) if output.ty != input.ty => {
                    return Err(ShaderError::Link {
                        label,
                        message: format!(
                            "location {} is `{}` {:?} in the vertex stage but `{}` {:?} in the fragment stage",
                            input.location, output.name, output.ty, input.name, input.ty
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        // link uniform blocks
        let vertex_block = uniform_block(&vertex);
        let fragment_block = uniform_block(&fragment);
        let (uniform_block_size, uniforms) = match (vertex_block, fragment_block) {
            (Some(v), Some(f)) if v != f => {
                return Err(ShaderError::Link {
                    label,
                    message: "stages declare different uniform blocks".to_string(),
                });
            }
            (Some(block), _) | (None, Some(block)) => block,
            (None, None) => {
                return Err(ShaderError::Link {
                    label,
                    message: format!(
                        "no uniform block at @group({UNIFORM_GROUP}) @binding(0)"
                    ),
                });
            }
        };

        // bind attributes
        let mut vertex_inputs = Vec::new();
        for argument in &vertex_entry.function.arguments {
            let name = argument.name.clone().unwrap_or_default();
            collect_interface(&vertex, name, argument.ty, argument.binding.as_ref(), &mut vertex_inputs);
        }
        let vertex_inputs: Vec<VertexInput> = vertex_inputs
            .into_iter()
            .map(|i| VertexInput {
                name: i.name,
                location: i.location,
            })
            .collect();
        for &(name, expected) in source.attributes {
            let input = vertex_inputs
                .iter()
                .find(|i| i.name == name)
                .ok_or(ShaderError::MissingAttribute { label, name })?;
            if input.location != expected {
                return Err(ShaderError::AttributeLocation {
                    label,
                    name,
                    expected,
                    found: input.location,
                });
            }
        }

        let textures = texture_slots(label, &fragment)?;
        for &name in source.textures {
            if !textures.iter().any(|t| t.name == name) {
                return Err(ShaderError::MissingTexture { label, name });
            }
        }

        log::info!(
            "built program {label}: {} uniforms, {} textures, {} vertex inputs",
            uniforms.len(),
            textures.len(),
            vertex_inputs.len()
        );

        Ok(Self {
            label,
            kind: source.kind,
            vertex_source: source.vertex,
            fragment_source: source.fragment,
            uniform_block_size,
            uniforms,
            textures,
            vertex_inputs,
        })
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn vertex_source(&self) -> &'static str {
        self.vertex_source
    }

    pub fn fragment_source(&self) -> &'static str {
        self.fragment_source
    }

    /// Size in bytes of the uniform block, padding included.
    pub fn uniform_block_size(&self) -> u32 {
        self.uniform_block_size
    }

    pub fn uniforms(&self) -> &[UniformMember] {
        &self.uniforms
    }

    pub fn textures(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn vertex_inputs(&self) -> &[VertexInput] {
        &self.vertex_inputs
    }

    /// Whether the vertex stage reads the per-instance stream.
    pub fn is_instanced(&self) -> bool {
        self.vertex_inputs
            .iter()
            .any(|i| i.location >= InstanceRaw::FIRST_LOCATION)
    }

    pub fn consumes_location(&self, location: u32) -> bool {
        self.vertex_inputs.iter().any(|i| i.location == location)
    }

    /// Resolves `name`, checking it is `size` bytes wide.
    pub fn uniform_location(&self, name: &'static str, size: u32) -> Result<UniformLocation, ShaderError> {
        let member = self
            .uniforms
            .iter()
            .find(|u| u.name == name)
            .ok_or(ShaderError::MissingUniform {
                label: self.label,
                name,
            })?;
        if member.location.size != size {
            return Err(ShaderError::UniformSize {
                label: self.label,
                name,
                expected: size,
                found: member.location.size,
            });
        }
        Ok(member.location)
    }

    pub fn texture_binding(&self, name: &'static str) -> Result<u32, ShaderError> {
        self.textures
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.binding)
            .ok_or(ShaderError::MissingTexture {
                label: self.label,
                name,
            })
    }
}

fn compile(label: &'static str, stage: Stage, source: &str) -> Result<Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Compile {
        label,
        stage,
        message: e.emit_to_string(source),
    })?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| ShaderError::Compile {
        label,
        stage,
        message: e.emit_to_string(source),
    })?;
    Ok(module)
}

fn entry_point(module: &Module, stage: ShaderStage) -> Option<&naga::EntryPoint> {
    module.entry_points.iter().find(|ep| ep.stage == stage)
}

/// Flattens an entry point argument or result into its located members.
fn collect_interface(
    module: &Module,
    name: String,
    ty: naga::Handle<naga::Type>,
    binding: Option<&Binding>,
    out: &mut Vec<Interface>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Interface {
            name,
            location: *location,
            ty: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_interface(
                        module,
                        member.name.clone().unwrap_or_default(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

fn uniform_block(module: &Module) -> Option<(u32, Vec<UniformMember>)> {
    let block_binding = ResourceBinding {
        group: UNIFORM_GROUP,
        binding: 0,
    };
    module.global_variables.iter().find_map(|(_, var)| {
        if var.space != AddressSpace::Uniform || var.binding.as_ref() != Some(&block_binding) {
            return None;
        }
        let TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            return None;
        };
        let members = members
            .iter()
            .map(|m| UniformMember {
                name: m.name.clone().unwrap_or_default(),
                location: UniformLocation {
                    offset: m.offset,
                    size: module.types[m.ty].inner.size(module.to_ctx()),
                },
            })
            .collect();
        Some((*span, members))
    })
}

fn texture_slots(label: &'static str, module: &Module) -> Result<Vec<TextureSlot>, ShaderError> {
    let mut textures = Vec::new();
    let mut samplers = Vec::new();
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = var.binding.as_ref().filter(|b| b.group == TEXTURE_GROUP) else {
            continue;
        };
        match &module.types[var.ty].inner {
            TypeInner::Image { dim, .. } => {
                let kind = match dim {
                    ImageDimension::Cube => TextureKind::Cube,
                    _ => TextureKind::Flat,
                };
                textures.push(TextureSlot {
                    name: var.name.clone().unwrap_or_default(),
                    binding: binding.binding,
                    kind,
                });
            }
            TypeInner::Sampler { .. } => samplers.push(binding.binding),
            _ => {}
        }
    }
    for texture in &textures {
        if !samplers.contains(&(texture.binding + 1)) {
            return Err(ShaderError::Link {
                label,
                message: format!(
                    "texture `{}` has no sampler at binding {}",
                    texture.name,
                    texture.binding + 1
                ),
            });
        }
    }
    textures.sort_by_key(|t| t.binding);
    Ok(textures)
}

/// Resolves a program's uniforms once, at construction.
pub trait ProgramUniforms: Sized {
    const SOURCE: ProgramSource;

    fn resolve(program: &CompiledProgram) -> Result<Self, ShaderError>;
}

/// A built program plus its resolved uniform locations.
#[derive(Debug)]
pub struct ShaderManager<U> {
    program: CompiledProgram,
    uniforms: U,
}

impl<U: ProgramUniforms> ShaderManager<U> {
    pub fn new() -> Result<Self, ShaderError> {
        Self::from_source(&U::SOURCE)
    }

    /// Builds from replacement sources with the same interface.
    pub fn from_source(source: &ProgramSource) -> Result<Self, ShaderError> {
        let program = CompiledProgram::build(source)?;
        let uniforms = U::resolve(&program)?;
        Ok(Self { program, uniforms })
    }
}

impl<U> ShaderManager<U> {
    pub fn program(&self) -> &CompiledProgram {
        &self.program
    }

    pub fn uniforms(&self) -> &U {
        &self.uniforms
    }

    /// Binds the program; it stays bound until the guard is dropped.
    pub fn start<'a>(&'a self, commands: &'a mut CommandBuffer) -> ActiveProgram<'a, U> {
        commands.push(Command::UseProgram(self.program.kind));
        ActiveProgram {
            uniforms: &self.uniforms,
            commands,
            _program: PhantomData,
        }
    }
}

/// A bound program. Uniform loads and draws go through here.
pub struct ActiveProgram<'a, U> {
    uniforms: &'a U,
    commands: &'a mut CommandBuffer,
    _program: PhantomData<&'a CompiledProgram>,
}

impl<'a, U> ActiveProgram<'a, U> {
    pub fn uniforms(&self) -> &'a U {
        self.uniforms
    }

    pub fn load_int(&mut self, location: UniformLocation, value: i32) {
        self.load(location, UniformValue::Int(value));
    }

    pub fn load_float(&mut self, location: UniformLocation, value: f32) {
        self.load(location, UniformValue::Float(value));
    }

    pub fn load_vector(&mut self, location: UniformLocation, value: Vector3f) {
        self.load(location, UniformValue::Vec3(value.into()));
    }

    /// Booleans travel as `1.0` / `0.0`.
    pub fn load_boolean(&mut self, location: UniformLocation, value: bool) {
        self.load_float(location, if value { 1.0 } else { 0.0 });
    }

    pub fn load_matrix(&mut self, location: UniformLocation, value: &Transformation) {
        self.load(location, UniformValue::Mat4(value.as_array()));
    }

    /// Makes the texture variable at `binding` sample texture unit `unit`.
    pub fn connect_texture_unit(&mut self, binding: u32, unit: u32) {
        self.commands.push(Command::ConnectTextureUnit { binding, unit });
    }

    pub fn bind_mesh(&mut self, model: &RawModel) {
        self.commands.push(Command::BindMesh(model.vao()));
    }

    pub fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.commands.push(Command::BindTexture { unit, texture });
    }

    pub fn set_culling(&mut self, enabled: bool) {
        self.commands.push(Command::SetCulling(enabled));
    }

    pub fn draw(&mut self, model: &RawModel) {
        self.commands.push(Command::Draw { mode: model.mode() });
    }

    pub fn draw_instanced(&mut self, model: &RawModel, instances: Vec<InstanceRaw>) {
        self.commands.push(Command::DrawInstanced {
            mode: model.mode(),
            instances,
        });
    }

    pub fn unbind_mesh(&mut self) {
        self.commands.push(Command::UnbindMesh);
    }

    /// Explicit end of the batch; same as dropping the guard.
    pub fn stop(self) {}

    fn load(&mut self, location: UniformLocation, value: UniformValue) {
        debug_assert_eq!(location.size, value.size(), "uniform width mismatch");
        self.commands.push(Command::LoadUniform { location, value });
    }
}

impl<U> Drop for ActiveProgram<'_, U> {
    fn drop(&mut self) {
        self.commands.push(Command::StopProgram);
    }
}

/// Typed guard of a per-purpose manager, derefs to the generic one.
pub struct Program<'a, U>(ActiveProgram<'a, U>);

impl<'a, U> Deref for Program<'a, U> {
    type Target = ActiveProgram<'a, U>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<U> DerefMut for Program<'_, U> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Width in bytes of the common uniform types.
pub(crate) mod size {
    pub const INT: u32 = 4;
    pub const FLOAT: u32 = 4;
    pub const VEC3: u32 = 12;
    pub const MAT4: u32 = 64;
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    tint: vec3<f32>,
    strength: f32,
}
@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) uv: vec2<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.projection * vec4<f32>(position, 1.0);
    out.uv = uv;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    tint: vec3<f32>,
    strength: f32,
}
@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var colour_texture: texture_2d<f32>;
@group(1) @binding(1) var colour_sampler: sampler;

@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(colour_texture, colour_sampler, uv) * vec4<f32>(uniforms.tint * uniforms.strength, 1.0);
}
"#;

    fn source(vertex: &'static str, fragment: &'static str) -> ProgramSource {
        ProgramSource {
            label: "test",
            kind: ProgramKind::Entity,
            vertex,
            fragment,
            attributes: &[("position", 0), ("uv", 1)],
            textures: &["colour_texture"],
        }
    }

    #[test]
    fn reflects_uniform_block() {
        let program = CompiledProgram::build(&source(VERTEX, FRAGMENT)).unwrap();
        assert_eq!(program.uniform_block_size(), 80);
        assert_eq!(
            program.uniform_location("projection", 64).unwrap(),
            UniformLocation { offset: 0, size: 64 }
        );
        assert_eq!(
            program.uniform_location("tint", 12).unwrap(),
            UniformLocation { offset: 64, size: 12 }
        );
        assert_eq!(
            program.uniform_location("strength", 4).unwrap(),
            UniformLocation { offset: 76, size: 4 }
        );
        assert_eq!(program.texture_binding("colour_texture").unwrap(), 0);
        assert!(!program.is_instanced());
    }

    #[test]
    fn unknown_uniform_is_an_error() {
        let program = CompiledProgram::build(&source(VERTEX, FRAGMENT)).unwrap();
        assert_eq!(
            program.uniform_location("fog", 4).unwrap_err(),
            ShaderError::MissingUniform { label: "test", name: "fog" }
        );
        assert!(matches!(
            program.uniform_location("tint", 4).unwrap_err(),
            ShaderError::UniformSize { expected: 4, found: 12, .. }
        ));
    }

    #[test]
    fn syntax_error_fails_compilation() {
        let err = CompiledProgram::build(&source("fn broken( {", FRAGMENT)).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: Stage::Vertex, .. }));
    }

    #[test]
    fn invalid_module_fails_validation() {
        // parses, but returns the wrong type
        const BAD: &str = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        let err = CompiledProgram::build(&source(VERTEX, BAD)).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: Stage::Fragment, .. }));
    }

    #[test]
    fn unmatched_varying_fails_linking() {
        const FRAGMENT_NORMAL: &str = r#"
@fragment
fn fs_main(@location(3) normal: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(normal, 1.0);
}
"#;
        let mut src = source(VERTEX, FRAGMENT_NORMAL);
        src.textures = &[];
        let err = CompiledProgram::build(&src).unwrap_err();
        assert!(matches!(err, ShaderError::Link { .. }), "{err}");
    }

    #[test]
    fn varying_type_mismatch_fails_linking() {
        const FRAGMENT_VEC3: &str = r#"
@fragment
fn fs_main(@location(0) uv: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 1.0);
}
"#;
        let mut src = source(VERTEX, FRAGMENT_VEC3);
        src.textures = &[];
        assert!(matches!(
            CompiledProgram::build(&src).unwrap_err(),
            ShaderError::Link { .. }
        ));
    }

    #[test]
    fn attribute_on_wrong_slot_is_rejected() {
        let mut src = source(VERTEX, FRAGMENT);
        src.attributes = &[("position", 0), ("uv", 2)];
        assert_eq!(
            CompiledProgram::build(&src).unwrap_err(),
            ShaderError::AttributeLocation {
                label: "test",
                name: "uv",
                expected: 2,
                found: 1
            }
        );
        src.attributes = &[("normal", 2)];
        assert_eq!(
            CompiledProgram::build(&src).unwrap_err(),
            ShaderError::MissingAttribute { label: "test", name: "normal" }
        );
    }

    #[test]
    fn missing_texture_is_rejected() {
        let mut src = source(VERTEX, FRAGMENT);
        src.textures = &["normal_map"];
        assert_eq!(
            CompiledProgram::build(&src).unwrap_err(),
            ShaderError::MissingTexture { label: "test", name: "normal_map" }
        );
    }

    struct Tint {
        tint: UniformLocation,
        strength: UniformLocation,
    }

    impl ProgramUniforms for Tint {
        const SOURCE: ProgramSource = ProgramSource {
            label: "tint",
            kind: ProgramKind::Entity,
            vertex: VERTEX,
            fragment: FRAGMENT,
            attributes: &[("position", 0)],
            textures: &[],
        };

        fn resolve(program: &CompiledProgram) -> Result<Self, ShaderError> {
            Ok(Self {
                tint: program.uniform_location("tint", size::VEC3)?,
                strength: program.uniform_location("strength", size::FLOAT)?,
            })
        }
    }

    #[test]
    fn guard_brackets_the_batch() {
        let manager = ShaderManager::<Tint>::new().unwrap();
        let mut commands = CommandBuffer::new();
        {
            let mut program = manager.start(&mut commands);
            let tint = program.uniforms().tint;
            let strength = program.uniforms().strength;
            program.load_vector(tint, Vector3f::new(1.0, 0.5, 0.0));
            program.load_boolean(strength, true);
        }
        assert_eq!(
            commands.commands(),
            &[
                Command::UseProgram(ProgramKind::Entity),
                Command::LoadUniform {
                    location: UniformLocation { offset: 64, size: 12 },
                    value: UniformValue::Vec3([1.0, 0.5, 0.0]),
                },
                Command::LoadUniform {
                    location: UniformLocation { offset: 76, size: 4 },
                    value: UniformValue::Float(1.0),
                },
                Command::StopProgram,
            ]
        );
    }
}
