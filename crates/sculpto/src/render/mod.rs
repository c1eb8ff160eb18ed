//! # Rendering System
//!
//! Core of the engine: scene-to-GPU submission and multi-pass frame
//! orchestration.
//!
//! ## Architecture
//!
//! - **Backend**: trait boundary over the graphics API; only opaque ids
//!   cross it. A recording headless implementation backs the tests and the
//!   sandbox.
//! - **Camera**: projection/view matrices plus the per-camera frame buffers
//!   (main, G-buffer, HDR, blur ping-pong pair).
//! - **Light registry**: fixed-capacity per-frame light accumulation
//!   uploaded as one constant-buffer blob.
//! - **Pipeline**: ordered pass sequence (shadow, geometry/lighting,
//!   tone-mapping, bloom) driven by per-frame predicates.
//!
//! Every GPU resource is owned by exactly one of camera, pipeline, light
//! component or resource store, and freed with an explicit `release` call
//! against the backend.

pub mod backend;
pub mod camera;
pub mod frame_buffer;
pub mod lights;
pub mod pipeline;
pub mod resources;
pub mod shaders;
pub mod submission;

pub use backend::{
    ClearFlags, ConstantBufferId, FrameBufferId, RenderBackend, ShaderId, ShaderStage,
    ShaderStageKind, TextureId, UniformValue, VertexArrayId,
};
pub use camera::{Camera, CameraEffects, ProjectionType};
pub use frame_buffer::{FrameBuffer, FrameBufferProps};
pub use lights::{
    DirectionalLightData, LightRegistry, PointLightData, SpotLightData, MAX_POINT_LIGHTS,
    MAX_SPOT_LIGHTS,
};
pub use pipeline::{PassStats, RenderPipeline, ShadowCaster};
pub use resources::{Material, MaterialHandle, Mesh, MeshHandle, ResourceStore, Vertex};
pub use submission::{Submission, SubmissionQueue};

use thiserror::Error;

/// Errors raised by the rendering system.
///
/// GPU resource creation is fallible by design: a failed creation surfaces
/// here instead of aborting the process, so the caller can report it and
/// continue with a placeholder.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A GPU resource (frame buffer, constant buffer, vertex array) could
    /// not be created.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Shader program compilation or linking failed.
    #[error("shader '{name}' failed to compile: {reason}")]
    ShaderCompilation {
        /// Debug name of the shader program.
        name: String,
        /// Backend-supplied failure reason.
        reason: String,
    },

    /// An operation referenced a handle the backend does not know.
    #[error("invalid {kind} handle")]
    InvalidHandle {
        /// Resource kind the stale handle pointed at.
        kind: &'static str,
    },

    /// Backend-specific error in a generic wrapper.
    #[error("backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
