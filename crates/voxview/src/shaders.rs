//! Loads the four GLSL stage texts, from disk or from the built-in set.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use voxel_renderer::{GeometryKind, ShaderSources, StageId};

use crate::config::ShaderSection;

const MAIN_QUAD_VERTEX: &str = include_str!("../shaders/main_quad.vert");
const MAIN_FRAGMENT: &str = include_str!("../shaders/main.frag");
const LINES_VERTEX: &str = include_str!("../shaders/lines.vert");
const LINES_FRAGMENT: &str = include_str!("../shaders/lines.frag");
const POST_VERTEX: &str = include_str!("../shaders/post.vert");
const POST_FRAGMENT: &str = include_str!("../shaders/post.frag");

/// Built-in text for a stage; the main pair depends on the geometry drawn.
pub fn builtin(stage: StageId, geometry: GeometryKind) -> &'static str {
    match (stage, geometry) {
        (StageId::MainVertex, GeometryKind::FullscreenQuad) => MAIN_QUAD_VERTEX,
        (StageId::MainFragment, GeometryKind::FullscreenQuad) => MAIN_FRAGMENT,
        (StageId::MainVertex, GeometryKind::LinePrimitive) => LINES_VERTEX,
        (StageId::MainFragment, GeometryKind::LinePrimitive) => LINES_FRAGMENT,
        (StageId::PostVertex, _) => POST_VERTEX,
        (StageId::PostFragment, _) => POST_FRAGMENT,
    }
}

fn configured_path(section: &ShaderSection, stage: StageId) -> Option<&Path> {
    match stage {
        StageId::MainVertex => section.main_vertex.as_deref(),
        StageId::MainFragment => section.main_fragment.as_deref(),
        StageId::PostVertex => section.post_vertex.as_deref(),
        StageId::PostFragment => section.post_fragment.as_deref(),
    }
}

/// Resolves every stage, reading configured paths relative to `base_dir`.
pub fn load_sources(
    section: &ShaderSection,
    geometry: GeometryKind,
    base_dir: Option<&Path>,
) -> Result<ShaderSources> {
    let load = |stage: StageId| -> Result<String> {
        match configured_path(section, stage) {
            Some(path) => {
                let resolved = resolve(path, base_dir);
                tracing::debug!(%stage, path = %resolved.display(), "loading shader stage");
                fs::read_to_string(&resolved).with_context(|| {
                    format!("failed to read {stage} shader at {}", resolved.display())
                })
            }
            None => Ok(builtin(stage, geometry).to_string()),
        }
    };

    Ok(ShaderSources {
        main_vertex: load(StageId::MainVertex)?,
        main_fragment: load(StageId::MainFragment)?,
        post_vertex: load(StageId::PostVertex)?,
        post_fragment: load(StageId::PostFragment)?,
    })
}

fn resolve(path: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxel_renderer::{compile_sources, compile_stage, ProgramId, UniformKind, UniformLayout};

    #[test]
    fn builtin_sets_compile_for_both_geometries() {
        for geometry in [GeometryKind::FullscreenQuad, GeometryKind::LinePrimitive] {
            let sources = load_sources(&ShaderSection::default(), geometry, None).unwrap();
            compile_sources(&sources).unwrap_or_else(|err| panic!("{geometry}: {err}"));
        }
    }

    #[test]
    fn builtin_main_program_exposes_frame_uniforms() {
        let vertex = compile_stage(StageId::MainVertex, MAIN_QUAD_VERTEX).unwrap();
        let fragment = compile_stage(StageId::MainFragment, MAIN_FRAGMENT).unwrap();
        let layout =
            UniformLayout::link(ProgramId::Main, vertex.module(), fragment.module()).unwrap();

        assert_eq!(layout.slot("viewMatrix").unwrap().kind, UniformKind::Mat4);
        assert_eq!(layout.slot("projectionMatrix").unwrap().kind, UniformKind::Mat4);
        assert_eq!(layout.slot("cameraPosition").unwrap().kind, UniformKind::Vec3);
        assert_eq!(layout.slot("showOcclusion").unwrap().kind, UniformKind::Int);
        assert_eq!(layout.texture_binding("voxels"), Some((1, 0)));
        assert_eq!(layout.texture_binding("occlusion"), Some((1, 2)));
    }

    #[test]
    fn post_fragment_declares_target_texture() {
        let fragment = compile_stage(StageId::PostFragment, POST_FRAGMENT).unwrap();
        let layout = UniformLayout::reflect(fragment.module());
        assert_eq!(layout.texture_binding("fbtex"), Some((0, 0)));
    }

    #[test]
    fn configured_paths_override_builtins() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("custom.frag"), "// custom\n").unwrap();
        let section = ShaderSection {
            main_fragment: Some(PathBuf::from("custom.frag")),
            ..ShaderSection::default()
        };

        let sources =
            load_sources(&section, GeometryKind::FullscreenQuad, Some(dir.path())).unwrap();
        assert_eq!(sources.main_fragment, "// custom\n");
        assert_eq!(sources.main_vertex, MAIN_QUAD_VERTEX);
    }

    #[test]
    fn missing_file_names_the_stage() {
        let section = ShaderSection {
            post_vertex: Some(PathBuf::from("/definitely/not/here.vert")),
            ..ShaderSection::default()
        };
        let err = load_sources(&section, GeometryKind::FullscreenQuad, None).unwrap_err();
        assert!(err.to_string().contains("post vertex"));
    }
}
