//! winit window, input handling, and the per-frame render driver.
//!
//! Types:
//!
//! - `ViewerState` owns the GPU context, surface, pipeline, render target and scene.
//! - `DragState` turns left-button drags into orbit deltas.
//!
//! Functions:
//!
//! - `run_viewer` opens the window and drives the event loop until exit.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use voxel_renderer::{
    Destination, GeometryKind, GpuContext, OrbitCamera, PipelineConfig, RenderTarget,
    Resolution, ShaderPipeline, ShaderSources, SurfaceState,
};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::config::ViewerConfig;
use crate::scene::Scene;

/// Pixels of trackpad scroll treated as one wheel line.
const PIXELS_PER_LINE: f64 = 40.0;

pub struct ViewerSetup {
    pub config: ViewerConfig,
    pub sources: ShaderSources,
}

struct ViewerState {
    gpu: GpuContext,
    surface: SurfaceState,
    pipeline: ShaderPipeline,
    target: RenderTarget,
    scene: Scene,
    camera: OrbitCamera,
    drag: DragState,
    render_scale: f32,
    show_occlusion: bool,
    orbit_sensitivity: f32,
    zoom_sensitivity: f32,
    started: Instant,
    // Dropped last: the surface was created from this window's raw handles.
    window: Arc<Window>,
}

impl ViewerState {
    fn new(window: Arc<Window>, setup: &ViewerSetup) -> Result<Self> {
        let config = &setup.config;
        let inner = window.inner_size();
        let (gpu, surface) =
            GpuContext::for_surface(window.as_ref(), Resolution::new(inner.width, inner.height))?;
        let info = gpu.adapter_info();
        tracing::info!(adapter = %info.name, backend = ?info.backend, "initialised GPU");

        let geometry = GeometryKind::from(config.render.geometry);
        let pipeline = ShaderPipeline::new(
            &gpu,
            &setup.sources,
            &PipelineConfig {
                geometry,
                output_format: surface.format(),
                post_texture_uniform: config.render.post_texture_uniform.clone(),
            },
        )
        .context("failed to build shader pipeline")?;
        let target = RenderTarget::create(&gpu).context("failed to create render target")?;
        let scene = Scene::upload(&gpu, config.volume.size, config.volume.occlusion_radius)?;

        let mut state = Self {
            camera: OrbitCamera::new(
                Vec3::from_array(config.camera.focus),
                config.camera.yaw,
                config.camera.pitch,
                config.camera.offset,
            ),
            drag: DragState::default(),
            render_scale: config.render.scale,
            show_occlusion: config.render.show_occlusion,
            orbit_sensitivity: config.camera.orbit_sensitivity,
            zoom_sensitivity: config.camera.zoom_sensitivity,
            started: Instant::now(),
            gpu,
            surface,
            pipeline,
            target,
            scene,
            window,
        };
        state.bind_volumes();
        Ok(state)
    }

    fn bind_volumes(&mut self) {
        let layout = self.pipeline.uniforms();
        let wants_volume = layout.texture_binding("voxels").is_some();
        let wants_occlusion = layout.texture_binding("occlusion").is_some();
        if wants_volume {
            self.pipeline
                .set_volume_texture("voxels", self.scene.volume.view());
        }
        if wants_occlusion {
            self.pipeline
                .set_occlusion_texture("occlusion", self.scene.occlusion.view());
        }
        tracing::debug!(wants_volume, wants_occlusion, "bound scene volumes");
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.surface
            .resize(&self.gpu, Resolution::new(size.width, size.height));
    }

    fn update_uniforms(&mut self, resolution: Resolution) {
        let pose = self.camera.orient(resolution.aspect());
        let draw = resolution.scaled(self.render_scale);
        self.pipeline
            .set_camera("viewMatrix", "cameraPosition", &pose);
        self.pipeline
            .set_matrix4("projectionMatrix", pose.projection, false);
        self.pipeline.set_vector2(
            "resolution",
            Vec2::new(draw.width as f32, draw.height as f32),
        );
        self.pipeline
            .set_float("time", self.started.elapsed().as_secs_f32());
        self.pipeline
            .set_int("volumeSize", self.scene.edge() as i32);
        self.pipeline
            .set_bool("showOcclusion", self.show_occlusion);
    }

    fn render_frame(&mut self) -> Result<()> {
        let resolution = self.surface.size();
        self.update_uniforms(resolution);

        let mut frame = self.gpu.begin_frame();
        self.target.clear(&mut frame);
        self.pipeline
            .render_main(&mut frame, resolution, self.render_scale, &mut self.target)?;

        let output = self.surface.acquire(&self.gpu)?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.pipeline.display_to_screen(
            &mut frame,
            resolution,
            &self.target,
            Destination {
                view: &view,
                size: resolution,
            },
        );
        frame.submit();
        output.present();
        Ok(())
    }

    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        if let Some(delta) = self.drag.moved(position) {
            self.camera.rotate_by(
                delta.x * self.orbit_sensitivity,
                delta.y * self.orbit_sensitivity,
            );
        }
    }

    fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
        };
        self.camera.zoom_by(lines * self.zoom_sensitivity);
    }
}

#[derive(Default)]
struct DragState {
    last: Option<PhysicalPosition<f64>>,
    pressed: bool,
}

impl DragState {
    fn handle_button(&mut self, state: ElementState) {
        self.pressed = state == ElementState::Pressed;
    }

    /// Records the new cursor position and returns the drag delta, if dragging.
    fn moved(&mut self, position: PhysicalPosition<f64>) -> Option<Vec2> {
        let previous = self.last.replace(position);
        if !self.pressed {
            return None;
        }
        previous.map(|prev| Vec2::new((position.x - prev.x) as f32, (position.y - prev.y) as f32))
    }
}

pub fn run_viewer(setup: ViewerSetup) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window = WindowBuilder::new()
        .with_title(setup.config.window.title.as_str())
        .with_inner_size(PhysicalSize::new(
            setup.config.window.width,
            setup.config.window.height,
        ))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create viewer window: {err}"))?;
    let window = Arc::new(window);

    let mut state = ViewerState::new(window, &setup)?;
    state.window().request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => elwt.exit(),
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => elwt.exit(),
                        Key::Character(ref value) if value.as_str().eq_ignore_ascii_case("o") => {
                            state.show_occlusion = !state.show_occlusion;
                            tracing::info!(enabled = state.show_occlusion, "toggled occlusion");
                        }
                        _ => {}
                    }
                }
                WindowEvent::MouseInput {
                    state: button_state,
                    button: MouseButton::Left,
                    ..
                } => state.drag.handle_button(button_state),
                WindowEvent::CursorMoved { position, .. } => state.handle_cursor_moved(position),
                WindowEvent::MouseWheel { delta, .. } => state.handle_scroll(delta),
                WindowEvent::Resized(new_size) => state.resize(new_size),
                WindowEvent::RedrawRequested => {
                    if let Err(err) = state.render_frame() {
                        tracing::warn!(error = %err, "skipping frame");
                    }
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            state.window().request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_reports_deltas_only_while_pressed() {
        let mut drag = DragState::default();
        assert_eq!(drag.moved(PhysicalPosition::new(10.0, 10.0)), None);

        drag.handle_button(ElementState::Pressed);
        assert_eq!(
            drag.moved(PhysicalPosition::new(14.0, 7.0)),
            Some(Vec2::new(4.0, -3.0))
        );

        drag.handle_button(ElementState::Released);
        assert_eq!(drag.moved(PhysicalPosition::new(20.0, 20.0)), None);
    }
}
