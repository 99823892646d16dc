//! Resolves configuration from the file and CLI flags, then either opens the
//! viewer or checks the shaders offline.
//!
//! Functions:
//!
//! - `run` opens the viewer window.
//! - `check` compiles the four stages without touching the GPU.
//! - `resolve_config` layers CLI overrides over the config file.
//! - `initialise_tracing` configures logging.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use voxel_renderer::{compile_sources, GeometryKind, ShaderSources};

use crate::cli::{parse_surface_size, RunArgs};
use crate::config::ViewerConfig;
use crate::paths::AppPaths;
use crate::shaders;
use crate::window::{run_viewer, ViewerSetup};

/// Configuration plus the directory relative shader paths are read from.
pub struct ResolvedConfig {
    pub config: ViewerConfig,
    pub source: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
}

pub fn run(args: RunArgs) -> Result<()> {
    let resolved = resolve_config(&args)?;
    let sources = load_sources(&resolved)?;
    tracing::info!(
        config = resolved
            .source
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<defaults>".to_string()),
        geometry = ?resolved.config.render.geometry,
        scale = resolved.config.render.scale,
        "starting voxview"
    );
    run_viewer(ViewerSetup {
        config: resolved.config,
        sources,
    })
}

pub fn check(args: RunArgs) -> Result<()> {
    let resolved = resolve_config(&args)?;
    let sources = load_sources(&resolved)?;
    compile_sources(&sources)?;
    println!("all shader stages compiled");
    Ok(())
}

pub fn show_config(args: RunArgs) -> Result<()> {
    let resolved = resolve_config(&args)?;
    print!("{}", resolved.config.to_toml_string()?);
    Ok(())
}

fn load_sources(resolved: &ResolvedConfig) -> Result<ShaderSources> {
    shaders::load_sources(
        &resolved.config.shaders,
        GeometryKind::from(resolved.config.render.geometry),
        resolved.base_dir.as_deref(),
    )
}

pub fn resolve_config(args: &RunArgs) -> Result<ResolvedConfig> {
    let (mut config, source) = match &args.config {
        Some(path) => (
            ViewerConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            Some(path.clone()),
        ),
        None => {
            let default_path = AppPaths::discover()?.config_file();
            if default_path.is_file() {
                let config = ViewerConfig::load(&default_path)
                    .with_context(|| format!("failed to load {}", default_path.display()))?;
                (config, Some(default_path))
            } else {
                tracing::debug!(path = %default_path.display(), "no config file; using defaults");
                (ViewerConfig::default(), None)
            }
        }
    };

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    apply_overrides(&mut config, args, &cwd)?;
    config.validate()?;

    let base_dir = source
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf);
    Ok(ResolvedConfig {
        config,
        source,
        base_dir,
    })
}

/// Copies CLI flags over the file values. Shader paths from the command line
/// are anchored at `cwd` so they are not re-rooted at the config directory.
fn apply_overrides(config: &mut ViewerConfig, args: &RunArgs, cwd: &Path) -> Result<()> {
    if let Some(size) = args.size.as_deref() {
        let (width, height) = parse_surface_size(size)?;
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(scale) = args.render_scale {
        config.render.scale = scale;
    }
    if let Some(geometry) = args.geometry {
        config.render.geometry = geometry;
    }
    if let Some(offset) = args.offset {
        config.camera.offset = offset;
    }
    if let Some(size) = args.volume_size {
        config.volume.size = size;
    }

    let anchor = |path: &PathBuf| {
        if path.is_relative() {
            cwd.join(path)
        } else {
            path.clone()
        }
    };
    let shaders = &args.shaders;
    let section = &mut config.shaders;
    if let Some(path) = &shaders.main_vertex {
        section.main_vertex = Some(anchor(path));
    }
    if let Some(path) = &shaders.main_fragment {
        section.main_fragment = Some(anchor(path));
    }
    if let Some(path) = &shaders.post_vertex {
        section.post_vertex = Some(anchor(path));
    }
    if let Some(path) = &shaders.post_fragment {
        section.post_fragment = Some(anchor(path));
    }
    Ok(())
}

pub fn initialise_tracing() {
    let default_filter = "warn,voxview=info,voxel_renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ShaderArgs;
    use crate::config::GeometrySetting;

    #[test]
    fn cli_flags_override_file_values() {
        let mut config = ViewerConfig::from_toml_str("[render]\nscale = 0.5\n").unwrap();
        let args = RunArgs {
            size: Some("640x480".into()),
            geometry: Some(GeometrySetting::Lines),
            offset: Some(-8.0),
            shaders: ShaderArgs {
                main_fragment: Some(PathBuf::from("scene.frag")),
                post_fragment: Some(PathBuf::from("/abs/post.frag")),
                ..ShaderArgs::default()
            },
            ..RunArgs::default()
        };

        apply_overrides(&mut config, &args, Path::new("/work")).unwrap();

        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert_eq!(config.render.scale, 0.5);
        assert_eq!(config.render.geometry, GeometrySetting::Lines);
        assert_eq!(config.camera.offset, -8.0);
        assert_eq!(
            config.shaders.main_fragment,
            Some(PathBuf::from("/work/scene.frag"))
        );
        assert_eq!(
            config.shaders.post_fragment,
            Some(PathBuf::from("/abs/post.frag"))
        );
        assert!(config.shaders.main_vertex.is_none());
    }

    #[test]
    fn invalid_size_flag_is_rejected() {
        let mut config = ViewerConfig::default();
        let args = RunArgs {
            size: Some("big".into()),
            ..RunArgs::default()
        };
        assert!(apply_overrides(&mut config, &args, Path::new("/")).is_err());
    }
}
