//! Two-pass voxel renderer with an orbit camera.
//!
//! A [`ShaderPipeline`] owns two GLSL programs. The main program draws either
//! a full-screen quad or a wireframe box into an offscreen [`RenderTarget`];
//! the post program composites that target onto the screen:
//!
//! ```text
//!   OrbitCamera ──▶ CameraPose ──▶ set_camera / set_* uniforms
//!                                          │
//!   Frame ──▶ render_main(target) ──▶ display_to_screen(destination) ──▶ submit
//! ```
//!
//! Every GPU call takes the [`GpuContext`] (directly or through a [`Frame`]);
//! passes are closed before a call returns, so no binding leaks between them.
//! Shader stages are parsed and validated with naga on the CPU, which is also
//! where uniform names are resolved to block offsets.

pub mod camera;
pub mod compile;
mod error;
pub mod geometry;
mod gpu;
mod types;

pub use camera::{CameraBasis, CameraPose, OrbitCamera};
pub use compile::{compile_sources, compile_stage, CompiledSources, CompiledStage};
pub use error::{RenderError, Result};
pub use geometry::DrawCall;
pub use gpu::{
    Destination, Frame, GpuContext, RenderTarget, ShaderPipeline, SurfaceState, UniformBlock,
    UniformKind, UniformLayout, UniformSlot, VolumeTexture, INITIAL_TARGET_SIZE,
    RENDER_TARGET_FORMAT,
};
pub use types::{
    GeometryKind, PipelineConfig, ProgramId, Resolution, ShaderSources, StageId, TextureUnit,
};
