use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;

use crate::camera::CameraPose;
use crate::compile::{compile_sources, CompiledStage};
use crate::error::{RenderError, Result};
use crate::geometry::{self, DrawCall, GeometryBinding};
use crate::types::{GeometryKind, PipelineConfig, ProgramId, Resolution, ShaderSources, TextureUnit};

use super::context::GpuContext;
use super::frame::Frame;
use super::target::{RenderTarget, RENDER_TARGET_FORMAT};
use super::uniforms::{UniformBlock, UniformLayout, UNIFORM_BINDING, UNIFORM_GROUP};
use super::volumes::{nearest_sampler, PlaceholderVolume};

/// Bind group of the main program's volume textures.
const VOLUME_GROUP: u32 = 1;
/// Bind group of the post program's render target texture.
const POST_GROUP: u32 = 0;

/// Where the post pass writes.
pub struct Destination<'a> {
    pub view: &'a wgpu::TextureView,
    pub size: Resolution,
}

struct MainProgram {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    volume_layout: wgpu::BindGroupLayout,
    block: UniformBlock,
}

struct PostProgram {
    pipeline: wgpu::RenderPipeline,
    target_layout: wgpu::BindGroupLayout,
}

/// Two-pass voxel renderer.
///
/// The main program draws the configured geometry into a caller-owned
/// [`RenderTarget`]; the post program then samples that target onto the
/// destination with a full-screen quad.
///
/// Binding conventions:
/// - main, set 0 binding 0: the uniform block fed by the setters.
/// - main, set 1 bindings 0/1: volume `texture3D` and its sampler (unit 0).
/// - main, set 1 bindings 2/3: occlusion `texture3D` and its sampler (unit 1).
/// - post, set 0 bindings 0/1: the render target `texture2D` and its sampler.
pub struct ShaderPipeline {
    geometry: GeometryKind,
    quad: GeometryBinding,
    lines: GeometryBinding,
    main: MainProgram,
    post: PostProgram,
    placeholder: PlaceholderVolume,
    volume_sampler: wgpu::Sampler,
    units: [Option<wgpu::TextureView>; TextureUnit::COUNT],
}

impl ShaderPipeline {
    /// Compiles and links both programs.
    ///
    /// Stages compile in the order main vertex, main fragment, post vertex,
    /// post fragment; the first failure aborts construction.
    pub fn new(gpu: &GpuContext, sources: &ShaderSources, config: &PipelineConfig) -> Result<Self> {
        let compiled = compile_sources(sources)?;

        let main = link_main(gpu, &compiled.main_vertex, &compiled.main_fragment, config.geometry)?;
        let post = link_post(
            gpu,
            &compiled.post_vertex,
            &compiled.post_fragment,
            config.output_format,
            &config.post_texture_uniform,
        )?;

        tracing::debug!(
            geometry = %config.geometry,
            output = ?config.output_format,
            uniforms = main.block.layout().len(),
            "built shader pipeline"
        );

        Ok(Self {
            geometry: config.geometry,
            quad: GeometryBinding::new(gpu, GeometryKind::FullscreenQuad),
            lines: GeometryBinding::new(gpu, GeometryKind::LinePrimitive),
            main,
            post,
            placeholder: PlaceholderVolume::new(gpu),
            volume_sampler: nearest_sampler(&gpu.device, "volume sampler"),
            units: [None, None],
        })
    }

    pub fn geometry(&self) -> GeometryKind {
        self.geometry
    }

    pub fn uniforms(&self) -> &UniformLayout {
        self.main.block.layout()
    }

    pub fn set_matrix4(&mut self, name: &str, value: Mat4, transpose: bool) -> bool {
        self.main.block.set_matrix4(name, value, transpose)
    }

    pub fn set_vector3(&mut self, name: &str, value: Vec3) -> bool {
        self.main.block.set_vector3(name, value)
    }

    pub fn set_vector2(&mut self, name: &str, value: Vec2) -> bool {
        self.main.block.set_vector2(name, value)
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> bool {
        self.main.block.set_float(name, value)
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        self.main.block.set_int(name, value)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.main.block.set_bool(name, value)
    }

    /// Writes the view matrix and world position of `pose`.
    pub fn set_camera(&mut self, view_name: &str, position_name: &str, pose: &CameraPose) {
        self.set_matrix4(view_name, pose.view, false);
        self.set_vector3(position_name, pose.position);
    }

    pub fn set_volume_texture(&mut self, name: &str, view: &wgpu::TextureView) {
        self.bind_unit(TextureUnit::Volume, name, view);
    }

    pub fn set_occlusion_texture(&mut self, name: &str, view: &wgpu::TextureView) {
        self.bind_unit(TextureUnit::Occlusion, name, view);
    }

    fn bind_unit(&mut self, unit: TextureUnit, name: &str, view: &wgpu::TextureView) {
        let expected = (VOLUME_GROUP, unit.texture_binding());
        match self.main.block.layout().texture_binding(name) {
            Some(binding) if binding == expected => {}
            Some(_) => self
                .main
                .block
                .report(name, "texture is not declared at its unit's binding; ignoring name"),
            None => self
                .main
                .block
                .report(name, "texture not found in main program; ignoring name"),
        }
        self.units[unit.index()] = Some(view.clone());
    }

    /// Draws the configured geometry into `target`.
    ///
    /// The target is first resized to `resolution` scaled by `render_scale`.
    /// If that fails nothing is recorded and the error is returned. The
    /// target keeps its previous contents; call [`RenderTarget::clear`]
    /// beforehand for a fresh image.
    ///
    /// Staged uniforms are copied in the frame's command order, so several
    /// calls within one [`Frame`] each draw with the values set before them.
    pub fn render_main(
        &mut self,
        frame: &mut Frame<'_>,
        resolution: Resolution,
        render_scale: f32,
        target: &mut RenderTarget,
    ) -> Result<DrawCall> {
        let gpu = frame.gpu();
        let draw_size = resolution.scaled(render_scale);
        target.resize(gpu, draw_size.width, draw_size.height)?;

        // Copied through the encoder so each draw sees the values staged for it.
        let bytes = self.main.block.bytes();
        let staging = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("main uniform staging"),
                contents: bytes,
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        frame.encoder().copy_buffer_to_buffer(
            &staging,
            0,
            &self.main.uniform_buffer,
            0,
            bytes.len() as u64,
        );

        let volume_view = self.unit_view(TextureUnit::Volume);
        let occlusion_view = self.unit_view(TextureUnit::Occlusion);
        let volume_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("volume bind group"),
            layout: &self.main.volume_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: TextureUnit::Volume.texture_binding(),
                    resource: wgpu::BindingResource::TextureView(volume_view),
                },
                wgpu::BindGroupEntry {
                    binding: TextureUnit::Volume.texture_binding() + 1,
                    resource: wgpu::BindingResource::Sampler(&self.volume_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: TextureUnit::Occlusion.texture_binding(),
                    resource: wgpu::BindingResource::TextureView(occlusion_view),
                },
                wgpu::BindGroupEntry {
                    binding: TextureUnit::Occlusion.texture_binding() + 1,
                    resource: wgpu::BindingResource::Sampler(&self.volume_sampler),
                },
            ],
        });

        let geometry = match self.geometry {
            GeometryKind::FullscreenQuad => &self.quad,
            GeometryKind::LinePrimitive => &self.lines,
        };
        let call = geometry.draw_call();

        let mut pass = frame
            .encoder()
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        pass.set_viewport(
            0.0,
            0.0,
            draw_size.width as f32,
            draw_size.height as f32,
            0.0,
            1.0,
        );
        pass.set_pipeline(&self.main.pipeline);
        pass.set_bind_group(UNIFORM_GROUP, &self.main.uniform_bind_group, &[]);
        pass.set_bind_group(VOLUME_GROUP, &volume_bind_group, &[]);
        pass.set_vertex_buffer(0, geometry.buffer().slice(..));
        pass.draw(0..call.vertex_count, 0..1);

        Ok(call)
    }

    /// Samples `target` onto `destination` with a full-screen quad.
    ///
    /// The whole destination is cleared to black first, including pixels
    /// outside the viewport. The viewport covers `resolution`, clamped to the
    /// destination's size.
    pub fn display_to_screen(
        &self,
        frame: &mut Frame<'_>,
        resolution: Resolution,
        target: &RenderTarget,
        destination: Destination<'_>,
    ) -> DrawCall {
        let gpu = frame.gpu();
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("post bind group"),
            layout: &self.post.target_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(target.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(target.sampler()),
                },
            ],
        });

        let width = resolution.width.min(destination.size.width).max(1);
        let height = resolution.height.min(destination.size.height).max(1);
        let call = self.quad.draw_call();

        let mut pass = frame
            .encoder()
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("post pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: destination.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        pass.set_pipeline(&self.post.pipeline);
        pass.set_bind_group(POST_GROUP, &bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.buffer().slice(..));
        pass.draw(0..call.vertex_count, 0..1);

        call
    }

    fn unit_view(&self, unit: TextureUnit) -> &wgpu::TextureView {
        self.units[unit.index()]
            .as_ref()
            .unwrap_or(&self.placeholder.view)
    }
}

impl Drop for ShaderPipeline {
    fn drop(&mut self) {
        tracing::debug!(geometry = %self.geometry, "releasing shader pipeline");
    }
}

fn link_main(
    gpu: &GpuContext,
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    geometry: GeometryKind,
) -> Result<MainProgram> {
    let layout = UniformLayout::link(ProgramId::Main, vertex.module(), fragment.module())?;
    let device = &gpu.device;

    let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("main uniform layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BINDING,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    });

    let mut volume_entries = Vec::with_capacity(TextureUnit::COUNT * 2);
    for unit in [TextureUnit::Volume, TextureUnit::Occlusion] {
        volume_entries.push(texture_entry(
            unit.texture_binding(),
            wgpu::TextureViewDimension::D3,
        ));
        volume_entries.push(sampler_entry(unit.texture_binding() + 1));
    }
    let volume_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("main volume layout"),
        entries: &volume_entries,
    });

    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("main uniform buffer"),
        size: layout.buffer_size(),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("main uniform bind group"),
        layout: &uniform_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let pipeline = create_render_pipeline(
        gpu,
        ProgramId::Main,
        vertex,
        fragment,
        &[&uniform_layout, &volume_layout],
        geometry.topology(),
        RENDER_TARGET_FORMAT,
    )?;

    Ok(MainProgram {
        pipeline,
        uniform_buffer,
        uniform_bind_group,
        volume_layout,
        block: UniformBlock::new(layout),
    })
}

fn link_post(
    gpu: &GpuContext,
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    output_format: wgpu::TextureFormat,
    texture_uniform: &str,
) -> Result<PostProgram> {
    let layout = UniformLayout::link(ProgramId::Post, vertex.module(), fragment.module())?;
    match layout.texture_binding(texture_uniform) {
        Some((POST_GROUP, 0)) => {}
        Some((group, binding)) => tracing::warn!(
            uniform = texture_uniform,
            group,
            binding,
            "post texture uniform is not at set 0 binding 0; the render target will not reach it"
        ),
        None => tracing::warn!(
            uniform = texture_uniform,
            "post texture uniform not found in post program"
        ),
    }

    let target_layout = gpu
        .device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post target layout"),
            entries: &[
                texture_entry(0, wgpu::TextureViewDimension::D2),
                sampler_entry(1),
            ],
        });

    let pipeline = create_render_pipeline(
        gpu,
        ProgramId::Post,
        vertex,
        fragment,
        &[&target_layout],
        wgpu::PrimitiveTopology::TriangleList,
        output_format,
    )?;

    Ok(PostProgram {
        pipeline,
        target_layout,
    })
}

/// Creates both shader modules and the render pipeline inside an error scope.
///
/// The modules go out of scope once the pipeline exists.
fn create_render_pipeline(
    gpu: &GpuContext,
    program: ProgramId,
    vertex: &CompiledStage,
    fragment: &CompiledStage,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    topology: wgpu::PrimitiveTopology,
    format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline> {
    let device = &gpu.device;
    let label = format!("{program} pipeline");

    let (pipeline, error) = gpu.capture_errors(|| {
        let vertex_module = vertex.create_module(device);
        let fragment_module = fragment.create_module(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[geometry::vertex_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // The target carries no depth attachment.
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        })
    });

    match error {
        Some(diagnostic) => Err(RenderError::ShaderLink {
            program,
            diagnostic,
        }),
        None => Ok(pipeline),
    }
}

fn texture_entry(binding: u32, dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}
