use std::borrow::Cow;

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{RenderError, Result};
use crate::types::{ShaderSources, StageId};

/// A GLSL stage that parsed and validated cleanly.
///
/// The naga module is kept so the linker can reflect uniform names; the
/// source text is what gets handed to wgpu when the program is linked.
#[derive(Debug)]
pub struct CompiledStage {
    stage: StageId,
    source: String,
    module: naga::Module,
}

impl CompiledStage {
    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    pub(crate) fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        let label = format!("{} shader", self.stage);
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(&self.source),
                stage: self.stage.naga_stage(),
                defines: &[],
            },
        })
    }
}

/// All four stages of a pipeline, compiled.
#[derive(Debug)]
pub struct CompiledSources {
    pub main_vertex: CompiledStage,
    pub main_fragment: CompiledStage,
    pub post_vertex: CompiledStage,
    pub post_fragment: CompiledStage,
}

/// Parses and validates one GLSL stage.
///
/// Runs entirely on the CPU, so shaders can be checked without a GPU. The
/// diagnostic of a failure is rendered against the stage's own source text.
pub fn compile_stage(stage: StageId, source: &str) -> Result<CompiledStage> {
    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(stage.naga_stage());
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| RenderError::ShaderCompile {
            stage,
            diagnostic: errors.emit_to_string(source),
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| RenderError::ShaderCompile {
            stage,
            diagnostic: error.emit_to_string(source),
        })?;

    tracing::debug!(
        %stage,
        program = %stage.program(),
        globals = module.global_variables.len(),
        functions = module.functions.len(),
        "compiled shader stage"
    );

    Ok(CompiledStage {
        stage,
        source: source.to_owned(),
        module,
    })
}

/// Compiles the four stages in pipeline order, stopping at the first failure.
pub fn compile_sources(sources: &ShaderSources) -> Result<CompiledSources> {
    let compile = |stage: StageId| compile_stage(stage, sources.stage(stage));
    Ok(CompiledSources {
        main_vertex: compile(StageId::MainVertex)?,
        main_fragment: compile(StageId::MainFragment)?,
        post_vertex: compile(StageId::PostVertex)?,
        post_fragment: compile(StageId::PostFragment)?,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::ShaderSources;

    pub const PASS_VERTEX: &str = r"#version 450
layout(location = 0) in vec3 position;
void main() {
    gl_Position = vec4(position, 1.0);
}
";

    pub const PASS_FRAGMENT: &str = r"#version 450
layout(location = 0) out vec4 outColor;
void main() {
    outColor = vec4(1.0, 0.0, 1.0, 1.0);
}
";

    pub const SCENE_FRAGMENT: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform SceneParams {
    mat4 viewMatrix;
    vec3 cameraPosition;
    float time;
    vec2 resolution;
    int volumeSize;
    int showOcclusion;
} scene;

layout(set = 1, binding = 0) uniform texture3D voxels;
layout(set = 1, binding = 1) uniform sampler voxelsSampler;

void main() {
    float density = texture(sampler3D(voxels, voxelsSampler), scene.cameraPosition).r;
    vec4 eye = scene.viewMatrix * vec4(scene.cameraPosition, 1.0);
    float flag = float(scene.showOcclusion + scene.volumeSize);
    outColor = vec4(density, scene.time, eye.x + scene.resolution.x, flag);
}
";

    pub fn minimal_sources() -> ShaderSources {
        ShaderSources {
            main_vertex: PASS_VERTEX.to_string(),
            main_fragment: PASS_FRAGMENT.to_string(),
            post_vertex: PASS_VERTEX.to_string(),
            post_fragment: PASS_FRAGMENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn compiles_pass_through_stages() {
        let compiled = compile_sources(&minimal_sources()).unwrap();
        assert_eq!(compiled.main_vertex.stage(), StageId::MainVertex);
        assert_eq!(compiled.post_fragment.stage(), StageId::PostFragment);
        assert_eq!(compiled.main_fragment.module().entry_points.len(), 1);
    }

    #[test]
    fn invalid_fragment_names_its_stage() {
        let mut sources = minimal_sources();
        sources.main_fragment = "#version 450\nvoid main() { this is not glsl }\n".to_string();

        let err = compile_sources(&sources).unwrap_err();
        match &err {
            RenderError::ShaderCompile { stage, diagnostic } => {
                assert_eq!(*stage, StageId::MainFragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().starts_with("main fragment shader failed to compile"));
    }

    #[test]
    fn first_failing_stage_wins() {
        let mut sources = minimal_sources();
        sources.post_vertex = "garbage".to_string();
        sources.post_fragment = "more garbage".to_string();

        let err = compile_sources(&sources).unwrap_err();
        assert_eq!(err.stage(), Some(StageId::PostVertex));
    }

    #[test]
    fn compiles_scene_uniform_block() {
        let stage = compile_stage(StageId::MainFragment, SCENE_FRAGMENT).unwrap();
        assert!(stage
            .module()
            .global_variables
            .iter()
            .any(|(_, var)| var.space == naga::AddressSpace::Uniform));
    }
}
