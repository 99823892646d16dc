//! GPU side of the renderer.
//!
//! - `context` owns the wgpu instance, device and queue, plus the optional
//!   window surface, and turns driver errors into scoped results.
//! - `frame` wraps the command encoder a frame's passes are recorded into.
//! - `target` is the resizable offscreen color texture.
//! - `uniforms` reflects uniform names out of the compiled stages and stages
//!   their values on the CPU.
//! - `volumes` uploads 3D textures and provides the placeholder for empty units.
//! - `pipeline` links the main and post programs and records both passes.

mod context;
mod frame;
mod pipeline;
mod target;
mod uniforms;
mod volumes;

pub use context::{GpuContext, SurfaceState};
pub use frame::Frame;
pub use pipeline::{Destination, ShaderPipeline};
pub use target::{RenderTarget, INITIAL_TARGET_SIZE, RENDER_TARGET_FORMAT};
pub use uniforms::{UniformBlock, UniformKind, UniformLayout, UniformSlot};
pub use volumes::VolumeTexture;
