//! Static vertex data drawn by the two passes.

use wgpu::util::DeviceExt;

use crate::gpu::GpuContext;
use crate::types::GeometryKind;

/// Two triangles spanning clip space at z = 0.
pub const FULLSCREEN_QUAD: [[f32; 3]; 6] = [
    [-1.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, -1.0, 0.0],
    [-1.0, -1.0, 0.0],
];

const B0: [f32; 3] = [-1.0, -1.0, -1.0];
const B1: [f32; 3] = [1.0, -1.0, -1.0];
const B2: [f32; 3] = [1.0, -1.0, 1.0];
const B3: [f32; 3] = [-1.0, -1.0, 1.0];
const T0: [f32; 3] = [-1.0, 1.0, -1.0];
const T1: [f32; 3] = [1.0, 1.0, -1.0];
const T2: [f32; 3] = [1.0, 1.0, 1.0];
const T3: [f32; 3] = [-1.0, 1.0, 1.0];

/// Outline of the [-1, 1]^3 volume bounds as one connected line strip.
///
/// Every one of the twelve box edges is covered; four are walked twice.
pub const WIRE_BOX: [[f32; 3]; 16] = [
    B0, B1, B2, B3, B0, T0, T1, B1, T1, T2, B2, T2, T3, B3, T3, T0,
];

const VERTEX_STRIDE: wgpu::BufferAddress = std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x3,
    offset: 0,
    shader_location: 0,
}];

/// Position-only layout shared by every geometry binding.
pub(crate) fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: VERTEX_STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// What a single draw recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub topology: wgpu::PrimitiveTopology,
    pub vertex_count: u32,
}

impl GeometryKind {
    pub fn vertices(self) -> &'static [[f32; 3]] {
        match self {
            GeometryKind::FullscreenQuad => &FULLSCREEN_QUAD,
            GeometryKind::LinePrimitive => &WIRE_BOX,
        }
    }

    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            GeometryKind::FullscreenQuad => wgpu::PrimitiveTopology::TriangleList,
            GeometryKind::LinePrimitive => wgpu::PrimitiveTopology::LineStrip,
        }
    }

    pub fn draw_call(self) -> DrawCall {
        DrawCall {
            topology: self.topology(),
            vertex_count: self.vertices().len() as u32,
        }
    }
}

/// Immutable vertex buffer for one [`GeometryKind`].
pub(crate) struct GeometryBinding {
    kind: GeometryKind,
    buffer: wgpu::Buffer,
}

impl GeometryBinding {
    pub(crate) fn new(gpu: &GpuContext, kind: GeometryKind) -> Self {
        let label = format!("{kind} vertex buffer");
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents: bytemuck::cast_slice(kind.vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });
        Self { kind, buffer }
    }

    pub(crate) fn draw_call(&self) -> DrawCall {
        self.kind.draw_call()
    }

    pub(crate) fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn quad_is_a_six_vertex_triangle_list() {
        let call = GeometryKind::FullscreenQuad.draw_call();
        assert_eq!(call.vertex_count, 6);
        assert_eq!(call.topology, wgpu::PrimitiveTopology::TriangleList);
        assert!(FULLSCREEN_QUAD.iter().all(|v| v[2] == 0.0));
    }

    #[test]
    fn lines_are_a_sixteen_vertex_strip() {
        let call = GeometryKind::LinePrimitive.draw_call();
        assert_eq!(call.vertex_count, 16);
        assert_eq!(call.topology, wgpu::PrimitiveTopology::LineStrip);
    }

    #[test]
    fn wire_box_covers_every_edge() {
        let key = |p: [f32; 3]| p.map(|c| c as i8);
        let mut edges = HashSet::new();
        for pair in WIRE_BOX.windows(2) {
            let (a, b) = (key(pair[0]), key(pair[1]));
            let differing = (0..3).filter(|&axis| a[axis] != b[axis]).count();
            assert_eq!(differing, 1, "{a:?} -> {b:?} is not a box edge");
            edges.insert(if a < b { (a, b) } else { (b, a) });
        }
        assert_eq!(edges.len(), 12);
    }

    #[test]
    fn stride_matches_position_layout() {
        let layout = vertex_layout();
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes[0].shader_location, 0);
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(GeometryKind::LinePrimitive.vertices()).len(),
            16 * 12
        );
    }
}
