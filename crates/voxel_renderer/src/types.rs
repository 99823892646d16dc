use std::fmt;

use wgpu::naga::ShaderStage;

/// Selects which static geometry the main pass rasterises.
///
/// The choice is made once when the pipeline is built and never changes
/// afterwards; it also decides the primitive topology of the main program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryKind {
    /// Two triangles covering the viewport; the fragment stage raymarches the volume.
    #[default]
    FullscreenQuad,
    /// Connected wireframe outline of the volume bounds.
    LinePrimitive,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::FullscreenQuad => f.write_str("quad"),
            GeometryKind::LinePrimitive => f.write_str("lines"),
        }
    }
}

/// Width and height in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Applies a render scale to each axis independently.
    ///
    /// Both axes are rounded to the nearest pixel and clamped to at least one
    /// pixel so the result is always a valid texture extent.
    pub fn scaled(self, scale: f32) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
        let axis = |value: u32| ((value as f32 * scale).round() as u32).max(1);
        Self {
            width: axis(self.width),
            height: axis(self.height),
        }
    }

    pub fn aspect(self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Identifies one of the four shader stage texts a pipeline is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    MainVertex,
    MainFragment,
    PostVertex,
    PostFragment,
}

impl StageId {
    pub fn program(self) -> ProgramId {
        match self {
            StageId::MainVertex | StageId::MainFragment => ProgramId::Main,
            StageId::PostVertex | StageId::PostFragment => ProgramId::Post,
        }
    }

    pub(crate) fn naga_stage(self) -> ShaderStage {
        match self {
            StageId::MainVertex | StageId::PostVertex => ShaderStage::Vertex,
            StageId::MainFragment | StageId::PostFragment => ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageId::MainVertex => f.write_str("main vertex"),
            StageId::MainFragment => f.write_str("main fragment"),
            StageId::PostVertex => f.write_str("post vertex"),
            StageId::PostFragment => f.write_str("post fragment"),
        }
    }
}

/// Identifies one of the two linked programs owned by a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramId {
    Main,
    Post,
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramId::Main => f.write_str("main"),
            ProgramId::Post => f.write_str("post"),
        }
    }
}

/// Fixed sampler units of the main program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUnit {
    /// Unit 0: the primary voxel volume.
    Volume,
    /// Unit 1: the ambient-occlusion volume.
    Occlusion,
}

impl TextureUnit {
    pub const COUNT: usize = 2;

    pub fn index(self) -> usize {
        match self {
            TextureUnit::Volume => 0,
            TextureUnit::Occlusion => 1,
        }
    }

    /// Binding of the unit's texture inside the main program's texture set.
    /// The matching sampler sits at the next binding.
    pub fn texture_binding(self) -> u32 {
        self.index() as u32 * 2
    }
}

/// The four GLSL stage texts, already loaded by the caller.
#[derive(Debug, Clone, Default)]
pub struct ShaderSources {
    pub main_vertex: String,
    pub main_fragment: String,
    pub post_vertex: String,
    pub post_fragment: String,
}

impl ShaderSources {
    pub fn stage(&self, stage: StageId) -> &str {
        match stage {
            StageId::MainVertex => &self.main_vertex,
            StageId::MainFragment => &self.main_fragment,
            StageId::PostVertex => &self.post_vertex,
            StageId::PostFragment => &self.post_fragment,
        }
    }
}

/// Construction-time options for a [`crate::ShaderPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Geometry drawn by the main pass.
    pub geometry: GeometryKind,
    /// Color format of the destination the post pass writes into.
    pub output_format: wgpu::TextureFormat,
    /// Name of the post program's texture uniform that receives the render target.
    pub post_texture_uniform: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            geometry: GeometryKind::default(),
            output_format: wgpu::TextureFormat::Bgra8UnormSrgb,
            post_texture_uniform: "fbtex".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_resolution_uses_each_axis() {
        let scaled = Resolution::new(1920, 1080).scaled(0.5);
        assert_eq!(scaled, Resolution::new(960, 540));

        let tall = Resolution::new(400, 1200).scaled(0.25);
        assert_eq!(tall, Resolution::new(100, 300));
    }

    #[test]
    fn scaled_resolution_never_collapses_to_zero() {
        assert_eq!(Resolution::new(3, 1).scaled(0.1), Resolution::new(1, 1));
        assert_eq!(Resolution::new(64, 32).scaled(f32::NAN), Resolution::new(64, 32));
    }

    #[test]
    fn stages_map_to_programs() {
        assert_eq!(StageId::MainFragment.program(), ProgramId::Main);
        assert_eq!(StageId::PostVertex.program(), ProgramId::Post);
        assert_eq!(TextureUnit::Occlusion.texture_binding(), 2);
    }
}
