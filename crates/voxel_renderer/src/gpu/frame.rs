use super::context::GpuContext;

/// One frame's worth of recorded GPU work.
///
/// Every pass the renderer records lives inside a call on the frame, so no
/// binding survives past the call that made it. Submitting consumes the frame.
pub struct Frame<'a> {
    gpu: &'a GpuContext,
    encoder: wgpu::CommandEncoder,
}

impl GpuContext {
    pub fn begin_frame(&self) -> Frame<'_> {
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("voxel frame encoder"),
            });
        Frame { gpu: self, encoder }
    }
}

impl<'a> Frame<'a> {
    pub fn gpu(&self) -> &'a GpuContext {
        self.gpu
    }

    pub(crate) fn encoder(&mut self) -> &mut wgpu::CommandEncoder {
        &mut self.encoder
    }

    pub fn submit(self) -> wgpu::SubmissionIndex {
        self.gpu.queue.submit(std::iter::once(self.encoder.finish()))
    }
}
