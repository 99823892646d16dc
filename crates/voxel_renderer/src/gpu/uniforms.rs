use std::collections::{HashMap, HashSet};

use glam::{Mat4, Vec2, Vec3};
use wgpu::naga;

use crate::error::{RenderError, Result};
use crate::types::ProgramId;

/// Bind group holding the main program's uniform block.
pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const UNIFORM_BINDING: u32 = 0;

/// std140 blocks are sized in 16-byte rows.
const BLOCK_ALIGNMENT: u64 = 16;

/// Value types the setters know how to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    Uint,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
    /// Anything else (arrays, nested structs, other matrix shapes).
    Unsupported,
}

/// Resolved location of one block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

/// Name tables produced when a program is linked.
///
/// Block members are addressed by their member name; textures by the name of
/// the `texture*` global and its `(group, binding)` pair.
#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    slots: HashMap<String, UniformSlot>,
    textures: HashMap<String, (u32, u32)>,
    block_size: u64,
}

impl UniformLayout {
    /// Reflects a single compiled stage.
    pub fn reflect(module: &naga::Module) -> Self {
        let mut layout = Self::default();
        for (_, var) in module.global_variables.iter() {
            let Some(binding) = var.binding.as_ref() else {
                continue;
            };
            match var.space {
                naga::AddressSpace::Uniform
                    if binding.group == UNIFORM_GROUP && binding.binding == UNIFORM_BINDING =>
                {
                    if let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner {
                        layout.block_size = layout.block_size.max(u64::from(*span));
                        for member in members {
                            let Some(name) = member.name.as_ref() else {
                                continue;
                            };
                            let kind = kind_of(&module.types[member.ty].inner);
                            layout.slots.insert(
                                name.clone(),
                                UniformSlot {
                                    offset: member.offset,
                                    kind,
                                },
                            );
                        }
                    }
                }
                naga::AddressSpace::Uniform => {
                    tracing::warn!(
                        name = var.name.as_deref().unwrap_or("<anonymous>"),
                        group = binding.group,
                        binding = binding.binding,
                        "uniform block outside set 0 binding 0 is not fed by the pipeline"
                    );
                }
                naga::AddressSpace::Handle => {
                    if let (naga::TypeInner::Image { .. }, Some(name)) =
                        (&module.types[var.ty].inner, var.name.as_ref())
                    {
                        layout
                            .textures
                            .insert(name.clone(), (binding.group, binding.binding));
                    }
                }
                _ => {}
            }
        }
        layout
    }

    /// Merges the vertex and fragment tables of one program.
    ///
    /// Both stages may declare the same block; a member present in both must
    /// agree on offset and type, and a texture name on its binding, otherwise
    /// linking fails.
    pub fn link(program: ProgramId, vertex: &naga::Module, fragment: &naga::Module) -> Result<Self> {
        let mut linked = Self::reflect(vertex);
        let fragment = Self::reflect(fragment);

        for (name, slot) in fragment.slots {
            match linked.slots.get(&name) {
                Some(existing) if *existing != slot => {
                    return Err(RenderError::ShaderLink {
                        program,
                        diagnostic: format!(
                            "uniform '{name}' is declared differently in the vertex ({existing:?}) and fragment ({slot:?}) stages"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    linked.slots.insert(name, slot);
                }
            }
        }

        for (name, binding) in fragment.textures {
            match linked.textures.get(&name) {
                Some(existing) if *existing != binding => {
                    return Err(RenderError::ShaderLink {
                        program,
                        diagnostic: format!(
                            "texture '{name}' is bound at {existing:?} in the vertex stage but {binding:?} in the fragment stage"
                        ),
                    });
                }
                Some(_) => {}
                None => {
                    linked.textures.insert(name, binding);
                }
            }
        }

        linked.block_size = linked.block_size.max(fragment.block_size);
        Ok(linked)
    }

    pub fn slot(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    pub fn texture_binding(&self, name: &str) -> Option<(u32, u32)> {
        self.textures.get(name).copied()
    }

    /// Size of the uniform buffer backing this layout, never zero.
    pub fn buffer_size(&self) -> u64 {
        self.block_size.max(BLOCK_ALIGNMENT).div_ceil(BLOCK_ALIGNMENT) * BLOCK_ALIGNMENT
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn kind_of(inner: &naga::TypeInner) -> UniformKind {
    use naga::{ScalarKind, TypeInner, VectorSize};

    match inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Float => UniformKind::Float,
            ScalarKind::Sint => UniformKind::Int,
            ScalarKind::Uint => UniformKind::Uint,
            _ => UniformKind::Unsupported,
        },
        TypeInner::Vector { size, scalar }
            if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
        {
            match size {
                VectorSize::Bi => UniformKind::Vec2,
                VectorSize::Tri => UniformKind::Vec3,
                VectorSize::Quad => UniformKind::Vec4,
            }
        }
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => UniformKind::Mat4,
        _ => UniformKind::Unsupported,
    }
}

/// CPU copy of the main program's uniform block.
///
/// Setters write straight into the staged bytes; the pipeline copies them
/// into the uniform buffer through the frame's encoder right before the
/// main draw. Unknown names and type
/// mismatches are ignored and reported once per name.
#[derive(Debug)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    reported: HashSet<String>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0u8; layout.buffer_size() as usize];
        Self {
            layout,
            bytes,
            reported: HashSet::new(),
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Writes a 4x4 matrix in column-major order, transposing first if asked.
    pub fn set_matrix4(&mut self, name: &str, matrix: Mat4, transpose: bool) -> bool {
        let matrix = if transpose { matrix.transpose() } else { matrix };
        self.write(name, &[UniformKind::Mat4], bytemuck::bytes_of(&matrix.to_cols_array()))
    }

    pub fn set_vector3(&mut self, name: &str, value: Vec3) -> bool {
        self.write(name, &[UniformKind::Vec3], bytemuck::bytes_of(&value.to_array()))
    }

    pub fn set_vector2(&mut self, name: &str, value: Vec2) -> bool {
        self.write(name, &[UniformKind::Vec2], bytemuck::bytes_of(&value.to_array()))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.write(name, &[UniformKind::Float], bytemuck::bytes_of(&value))
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.write(
            name,
            &[UniformKind::Int, UniformKind::Uint],
            bytemuck::bytes_of(&value),
        )
    }

    /// Booleans travel as an `int` of 0 or 1.
    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.set_int(name, i32::from(value))
    }

    fn write(&mut self, name: &str, accepted: &[UniformKind], data: &[u8]) -> bool {
        let Some(slot) = self.layout.slot(name) else {
            self.report(name, "uniform not found in main program; ignoring");
            return false;
        };
        if !accepted.contains(&slot.kind) {
            self.report(name, "uniform type does not match setter; ignoring");
            return false;
        }
        let start = slot.offset as usize;
        let Some(target) = self.bytes.get_mut(start..start + data.len()) else {
            self.report(name, "uniform lies outside the reflected block; ignoring");
            return false;
        };
        target.copy_from_slice(data);
        true
    }

    pub(crate) fn report(&mut self, name: &str, message: &str) {
        if self.reported.insert(name.to_owned()) {
            tracing::warn!(uniform = name, "{message}");
        } else {
            tracing::debug!(uniform = name, "{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::fixtures::{PASS_FRAGMENT, PASS_VERTEX, SCENE_FRAGMENT};
    use crate::compile::compile_stage;
    use crate::types::StageId;

    fn scene_layout() -> UniformLayout {
        let vertex = compile_stage(StageId::MainVertex, PASS_VERTEX).unwrap();
        let fragment = compile_stage(StageId::MainFragment, SCENE_FRAGMENT).unwrap();
        UniformLayout::link(ProgramId::Main, vertex.module(), fragment.module()).unwrap()
    }

    fn read_f32(bytes: &[u8], offset: u32) -> f32 {
        let start = offset as usize;
        f32::from_le_bytes(bytes[start..start + 4].try_into().unwrap())
    }

    #[test]
    fn reflects_block_members_and_textures() {
        let layout = scene_layout();
        let view = layout.slot("viewMatrix").unwrap();
        assert_eq!(view, UniformSlot { offset: 0, kind: UniformKind::Mat4 });
        let camera = layout.slot("cameraPosition").unwrap();
        assert_eq!(camera, UniformSlot { offset: 64, kind: UniformKind::Vec3 });
        let time = layout.slot("time").unwrap();
        assert_eq!(time.kind, UniformKind::Float);
        assert!(time.offset >= 76);
        assert_eq!(layout.slot("volumeSize").unwrap().kind, UniformKind::Int);
        assert_eq!(layout.texture_binding("voxels"), Some((1, 0)));
        assert_eq!(layout.buffer_size() % 16, 0);
        assert!(layout.buffer_size() > u64::from(camera.offset));
    }

    #[test]
    fn stage_without_block_has_minimum_buffer() {
        let fragment = compile_stage(StageId::MainFragment, PASS_FRAGMENT).unwrap();
        let layout = UniformLayout::reflect(fragment.module());
        assert!(layout.is_empty());
        assert_eq!(layout.buffer_size(), 16);
    }

    #[test]
    fn missing_uniform_is_inert() {
        let mut block = UniformBlock::new(scene_layout());
        assert!(block.set_float("time", 2.5));
        let before = block.bytes().to_vec();

        assert!(!block.set_float("doesNotExist", 9.0));
        assert!(!block.set_matrix4("alsoMissing", Mat4::IDENTITY, false));
        assert!(!block.set_bool("nope", true));

        assert_eq!(block.bytes(), before.as_slice());
        let time = block.layout().slot("time").unwrap();
        assert_eq!(read_f32(block.bytes(), time.offset), 2.5);
    }

    #[test]
    fn mismatched_setter_type_is_ignored() {
        let mut block = UniformBlock::new(scene_layout());
        let before = block.bytes().to_vec();
        assert!(!block.set_float("cameraPosition", 1.0));
        assert!(!block.set_vector2("viewMatrix", Vec2::ONE));
        assert_eq!(block.bytes(), before.as_slice());
    }

    #[test]
    fn matrix_transpose_flag_controls_layout() {
        let mut block = UniformBlock::new(scene_layout());
        let matrix = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);

        block.set_matrix4("viewMatrix", matrix, false);
        assert_eq!(read_f32(block.bytes(), 4), 2.0);

        block.set_matrix4("viewMatrix", matrix, true);
        assert_eq!(read_f32(block.bytes(), 4), 5.0);
    }

    #[test]
    fn bool_is_encoded_as_int() {
        let mut block = UniformBlock::new(scene_layout());
        assert!(block.set_bool("showOcclusion", true));
        let offset = block.layout().slot("showOcclusion").unwrap().offset as usize;
        assert_eq!(&block.bytes()[offset..offset + 4], &1i32.to_le_bytes());
        block.set_bool("showOcclusion", false);
        assert_eq!(&block.bytes()[offset..offset + 4], &0i32.to_le_bytes());
    }

    #[test]
    fn conflicting_stage_blocks_fail_to_link() {
        let vertex_source = r"#version 450
layout(location = 0) in vec3 position;
layout(std140, set = 0, binding = 0) uniform SceneParams {
    vec3 cameraPosition;
    mat4 viewMatrix;
} scene;
void main() {
    gl_Position = scene.viewMatrix * vec4(position + scene.cameraPosition, 1.0);
}
";
        let vertex = compile_stage(StageId::MainVertex, vertex_source).unwrap();
        let fragment = compile_stage(StageId::MainFragment, SCENE_FRAGMENT).unwrap();
        let err = UniformLayout::link(ProgramId::Main, vertex.module(), fragment.module())
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::ShaderLink {
                program: ProgramId::Main,
                ..
            }
        ));
    }
}
