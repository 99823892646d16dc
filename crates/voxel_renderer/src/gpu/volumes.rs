use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::{RenderError, Result};

use super::context::GpuContext;

/// A 3D texture sampled by the main program.
pub struct VolumeTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: [u32; 3],
}

impl VolumeTexture {
    /// Uploads a single-channel volume laid out x-fastest, then y, then z.
    pub fn upload_r8(gpu: &GpuContext, label: &str, size: [u32; 3], data: &[u8]) -> Result<Self> {
        let [width, height, depth] = size;
        let expected = width as usize * height as usize * depth as usize;
        if expected == 0 || data.len() != expected {
            return Err(RenderError::allocation(
                "volume texture",
                format!(
                    "{label}: expected {expected} bytes for {width}x{height}x{depth}, got {}",
                    data.len()
                ),
            ));
        }
        let max = gpu.limits().max_texture_dimension_3d;
        if width > max || height > max || depth > max {
            return Err(RenderError::allocation(
                "volume texture",
                format!("{label}: {width}x{height}x{depth} exceeds the 3D texture limit of {max}"),
            ));
        }

        let (texture, error) = gpu.capture_errors(|| {
            gpu.device.create_texture_with_data(
                &gpu.queue,
                &wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: depth,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D3,
                    format: wgpu::TextureFormat::R8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                TextureDataOrder::LayerMajor,
                data,
            )
        });
        if let Some(message) = error {
            return Err(RenderError::allocation("volume texture", message));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        tracing::debug!(label, width, height, depth, "uploaded volume texture");
        Ok(Self {
            _texture: texture,
            view,
            size,
        })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> [u32; 3] {
        self.size
    }
}

/// Stand-in bound to texture units nobody has assigned yet.
pub(crate) struct PlaceholderVolume {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl PlaceholderVolume {
    pub(crate) fn new(gpu: &GpuContext) -> Self {
        let data = [0u8, 0, 0, 255];
        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some("placeholder volume texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D3,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Nearest-neighbour clamp sampler shared by the volume units and the render target.
pub(crate) fn nearest_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
