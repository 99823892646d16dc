//! TOML configuration for the viewer.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! Command-line flags are applied on top by `run.rs` before validation.

use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voxel_renderer::GeometryKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeometrySetting {
    /// Full-screen quad; the fragment shader raymarches the volume.
    #[default]
    Quad,
    /// Wireframe outline of the volume bounds.
    Lines,
}

impl From<GeometrySetting> for GeometryKind {
    fn from(value: GeometrySetting) -> Self {
        match value {
            GeometrySetting::Quad => GeometryKind::FullscreenQuad,
            GeometrySetting::Lines => GeometryKind::LinePrimitive,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ViewerConfig {
    #[serde(default)]
    pub window: WindowSection,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub camera: CameraSection,
    #[serde(default)]
    pub shaders: ShaderSection,
    #[serde(default)]
    pub volume: VolumeSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "voxview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RenderSection {
    pub scale: f32,
    pub geometry: GeometrySetting,
    pub post_texture_uniform: String,
    pub show_occlusion: bool,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            scale: 1.0,
            geometry: GeometrySetting::default(),
            post_texture_uniform: "fbtex".to_string(),
            show_occlusion: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CameraSection {
    pub focus: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub offset: f32,
    /// Radians per pixel of mouse drag.
    pub orbit_sensitivity: f32,
    /// Zoom factor exponent per scroll line.
    pub zoom_sensitivity: f32,
}

impl Default for CameraSection {
    fn default() -> Self {
        Self {
            focus: [0.0, 0.0, 0.0],
            yaw: 0.6,
            pitch: 0.35,
            offset: -3.0,
            orbit_sensitivity: 0.005,
            zoom_sensitivity: 0.1,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ShaderSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_vertex: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_fragment: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_vertex: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_fragment: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct VolumeSection {
    pub size: u32,
    /// Half-width of the neighbourhood averaged into the occlusion volume.
    pub occlusion_radius: u32,
}

impl Default for VolumeSection {
    fn default() -> Self {
        Self {
            size: 64,
            occlusion_radius: 2,
        }
    }
}

pub const MIN_VOLUME_SIZE: u32 = 4;
pub const MAX_VOLUME_SIZE: u32 = 256;

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_toml_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses without validating, for callers that layer overrides first.
    pub fn parse_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads and parses `path`. Values are not validated here; CLI flags may
    /// still replace them, so call [`ViewerConfig::validate`] afterwards.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero (got {}x{})",
                self.window.width, self.window.height
            )));
        }
        if !(0.25..=2.0).contains(&self.render.scale) {
            return Err(ConfigError::Invalid(format!(
                "render.scale must be between 0.25 and 2.0 (got {})",
                self.render.scale
            )));
        }
        if self.render.post_texture_uniform.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "render.post_texture_uniform must not be empty".into(),
            ));
        }
        if self.camera.focus.iter().any(|value| !value.is_finite())
            || !self.camera.yaw.is_finite()
            || !self.camera.offset.is_finite()
        {
            return Err(ConfigError::Invalid(
                "camera focus, yaw and offset must be finite".into(),
            ));
        }
        if !self.camera.pitch.is_finite() || self.camera.pitch.abs() >= FRAC_PI_2 {
            return Err(ConfigError::Invalid(format!(
                "camera.pitch must lie strictly between -pi/2 and pi/2 (got {})",
                self.camera.pitch
            )));
        }
        for (name, value) in [
            ("camera.orbit_sensitivity", self.camera.orbit_sensitivity),
            ("camera.zoom_sensitivity", self.camera.zoom_sensitivity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be greater than zero (got {value})"
                )));
            }
        }
        if !(MIN_VOLUME_SIZE..=MAX_VOLUME_SIZE).contains(&self.volume.size) {
            return Err(ConfigError::Invalid(format!(
                "volume.size must be between {MIN_VOLUME_SIZE} and {MAX_VOLUME_SIZE} (got {})",
                self.volume.size
            )));
        }
        if self.volume.occlusion_radius == 0 || self.volume.occlusion_radius >= self.volume.size {
            return Err(ConfigError::Invalid(format!(
                "volume.occlusion_radius must be between 1 and volume.size - 1 (got {})",
                self.volume.occlusion_radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = ViewerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.camera.offset, -3.0);
        assert_eq!(config.render.post_texture_uniform, "fbtex");
    }

    #[test]
    fn parses_sections() {
        let config = ViewerConfig::from_toml_str(
            r#"
[window]
width = 800
height = 600

[render]
scale = 0.5
geometry = "lines"

[camera]
focus = [0.0, 0.5, 0.0]
offset = 4.0

[shaders]
main_fragment = "scene.frag"

[volume]
size = 32
"#,
        )
        .unwrap();

        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert_eq!(config.window.title, "voxview");
        assert_eq!(config.render.geometry, GeometrySetting::Lines);
        assert_eq!(GeometryKind::from(config.render.geometry), GeometryKind::LinePrimitive);
        assert_eq!(config.camera.focus, [0.0, 0.5, 0.0]);
        assert_eq!(config.shaders.main_fragment, Some(PathBuf::from("scene.frag")));
        assert!(config.shaders.main_vertex.is_none());
        assert_eq!(config.volume.size, 32);
        assert_eq!(config.volume.occlusion_radius, 2);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for document in [
            "[window]\nwidth = 0",
            "[render]\nscale = 0.1",
            "[render]\npost_texture_uniform = \" \"",
            "[camera]\npitch = 1.6",
            "[camera]\nzoom_sensitivity = 0.0",
            "[volume]\nsize = 1024",
            "[volume]\nsize = 8\nocclusion_radius = 8",
        ] {
            let err = ViewerConfig::from_toml_str(document).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{document}: {err}");
        }
    }

    #[test]
    fn load_leaves_validation_to_the_caller() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("voxview.toml");
        fs::write(&path, "[render]\nscale = 3.0\n").unwrap();

        let mut config = ViewerConfig::load(&path).unwrap();
        assert_eq!(config.render.scale, 3.0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.render.scale = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = ViewerConfig::from_toml_str("[render\nscale = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let err = ViewerConfig::from_toml_str("[render]\ngeometry = \"cube\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rendered_toml_parses_back() {
        let mut config = ViewerConfig::default();
        config.shaders.post_fragment = Some(PathBuf::from("/tmp/post.frag"));
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[camera]"));
        assert_eq!(ViewerConfig::from_toml_str(&text).unwrap(), config);
    }
}
