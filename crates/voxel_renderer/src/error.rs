use crate::types::{ProgramId, StageId};

/// Failures raised by the renderer core.
///
/// Construction errors (`ShaderCompile`, `ShaderLink`) are fatal for the
/// pipeline being built. `ResourceAllocation` can also surface per frame when
/// the render target is resized; callers are expected to log it and skip the
/// frame rather than tear the render loop down.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    ShaderCompile { stage: StageId, diagnostic: String },
    #[error("{program} program failed to link: {diagnostic}")]
    ShaderLink {
        program: ProgramId,
        diagnostic: String,
    },
    #[error("failed to allocate {resource}: {message}")]
    ResourceAllocation {
        resource: &'static str,
        message: String,
    },
}

impl RenderError {
    pub(crate) fn allocation(resource: &'static str, message: impl Into<String>) -> Self {
        RenderError::ResourceAllocation {
            resource,
            message: message.into(),
        }
    }

    /// Stage that failed to compile, if this is a compile error.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            RenderError::ShaderCompile { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
