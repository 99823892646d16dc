use crate::error::{RenderError, Result};
use crate::types::Resolution;

use super::context::GpuContext;
use super::frame::Frame;
use super::volumes::nearest_sampler;

/// Color format of every offscreen target.
pub const RENDER_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Size a freshly created target starts at.
pub const INITIAL_TARGET_SIZE: Resolution = Resolution::new(1280, 720);

/// Offscreen color texture the main pass renders into.
///
/// There is no depth attachment and no mip chain. Contents are undefined
/// after a resize until something draws into them.
pub struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: Resolution,
}

impl RenderTarget {
    pub fn create(gpu: &GpuContext) -> Result<Self> {
        let (texture, view) = allocate(gpu, INITIAL_TARGET_SIZE)?;
        let sampler = nearest_sampler(&gpu.device, "render target sampler");
        Ok(Self {
            _texture: texture,
            view,
            sampler,
            size: INITIAL_TARGET_SIZE,
        })
    }

    /// Reallocates the color storage at `width` x `height`.
    ///
    /// An unchanged size keeps the current storage. On failure the previous
    /// storage and size are left in place.
    pub fn resize(&mut self, gpu: &GpuContext, width: u32, height: u32) -> Result<()> {
        let size = Resolution::new(width, height);
        if size == self.size {
            return Ok(());
        }
        let (texture, view) = allocate(gpu, size)?;
        tracing::debug!(from = %self.size, to = %size, "resized render target");
        self._texture = texture;
        self.view = view;
        self.size = size;
        Ok(())
    }

    /// Clears the color attachment to transparent black.
    pub fn clear(&self, frame: &mut Frame<'_>) {
        let _pass = frame
            .encoder()
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render target clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
    }

    pub fn size(&self) -> Resolution {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }
}

fn allocate(gpu: &GpuContext, size: Resolution) -> Result<(wgpu::Texture, wgpu::TextureView)> {
    let max = gpu.limits().max_texture_dimension_2d;
    if size.is_empty() || size.width > max || size.height > max {
        return Err(RenderError::allocation(
            "render target",
            format!("{size} is outside the supported range 1..={max}"),
        ));
    }

    let (texture, error) = gpu.capture_errors(|| {
        gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("render target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RENDER_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    });
    if let Some(message) = error {
        return Err(RenderError::allocation("render target", message));
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Ok((texture, view))
}
