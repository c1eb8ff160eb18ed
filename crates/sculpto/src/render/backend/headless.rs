//! Recording headless backend.
//!
//! Implements [`RenderBackend`] against in-memory tables. Every call that
//! would reach the GPU is appended to an ordered trace, and resource
//! creations/resizes are counted, which is what the pipeline and camera
//! tests assert against. The sandbox runs on it too, so a frame can be
//! driven end to end without a window or a driver.

use super::{
    ClearFlags, ConstantBufferId, FrameBufferId, RenderBackend, ShaderId, ShaderStage, TextureId,
    UniformValue, VertexArrayId,
};
use crate::foundation::math::Vec4;
use crate::render::frame_buffer::FrameBufferProps;
use crate::render::resources::Vertex;
use crate::render::{RenderError, RenderResult};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// A frame buffer was bound as render target.
    BindFrameBuffer(FrameBufferId),
    /// The current render target was unbound.
    UnbindFrameBuffer(FrameBufferId),
    /// A frame buffer was cleared.
    ClearFrameBuffer(FrameBufferId, ClearFlags),
    /// A constant buffer received new contents.
    UpdateConstantBuffer(ConstantBufferId, usize),
    /// A constant buffer was bound to a binding point.
    BindConstantBuffer {
        /// Buffer bound.
        buffer: ConstantBufferId,
        /// Target binding point.
        binding_point: u32,
    },
    /// A texture was bound to a slot.
    BindTexture {
        /// Texture bound.
        texture: TextureId,
        /// Target slot.
        slot: u32,
    },
    /// A named uniform was set.
    SetUniform {
        /// Shader the uniform belongs to.
        shader: ShaderId,
        /// Uniform name.
        name: String,
        /// Value set.
        value: UniformValue,
    },
    /// An indexed draw was issued.
    DrawIndexed {
        /// Shader the draw ran with.
        shader: ShaderId,
    },
    /// A full-screen quad draw was issued.
    DrawFullscreenQuad {
        /// Shader the draw ran with.
        shader: ShaderId,
    },
}

/// Resource creation and lifecycle counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackendCounters {
    /// Frame buffers created so far.
    pub frame_buffers_created: u32,
    /// Frame buffer resize operations performed.
    pub frame_buffer_resizes: u32,
    /// Frame buffers freed.
    pub frame_buffers_freed: u32,
    /// Constant buffers created.
    pub constant_buffers_created: u32,
    /// Vertex arrays created.
    pub vertex_arrays_created: u32,
    /// Shader programs compiled.
    pub shaders_created: u32,
}

struct FrameBufferSlot {
    props: FrameBufferProps,
    color_textures: Vec<TextureId>,
    depth_texture: Option<TextureId>,
    alive: bool,
}

/// In-memory backend that records the call stream.
#[derive(Default)]
pub struct HeadlessBackend {
    frame_buffers: Vec<FrameBufferSlot>,
    constant_buffers: Vec<usize>,
    vertex_arrays: Vec<u32>,
    shaders: Vec<String>,
    next_texture: u32,
    trace: Vec<BackendCall>,
    counters: BackendCounters,
    fail_next_creation: bool,
    clear_color: Vec4,
    wireframe: bool,
    vsync: bool,
}

impl HeadlessBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered trace of calls recorded so far.
    #[must_use]
    pub fn trace(&self) -> &[BackendCall] {
        &self.trace
    }

    /// Drop the recorded trace, keeping resources and counters.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Lifecycle counters.
    #[must_use]
    pub fn counters(&self) -> BackendCounters {
        self.counters
    }

    /// Make the next resource creation fail, for error-path tests.
    pub fn inject_creation_failure(&mut self) {
        self.fail_next_creation = true;
    }

    /// Current clear color.
    #[must_use]
    pub fn clear_color(&self) -> Vec4 {
        self.clear_color
    }

    /// Current wireframe state.
    #[must_use]
    pub fn wireframe(&self) -> bool {
        self.wireframe
    }

    /// Current vsync state.
    #[must_use]
    pub fn vsync(&self) -> bool {
        self.vsync
    }

    fn take_injected_failure(&mut self, what: &str) -> RenderResult<()> {
        if self.fail_next_creation {
            self.fail_next_creation = false;
            return Err(RenderError::ResourceCreationFailed(format!(
                "injected failure creating {what}"
            )));
        }
        Ok(())
    }

    fn alloc_texture(&mut self) -> TextureId {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        id
    }

    fn frame_buffer(&self, id: FrameBufferId) -> Option<&FrameBufferSlot> {
        self.frame_buffers
            .get(id.0 as usize)
            .filter(|slot| slot.alive)
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_frame_buffer(&mut self, props: FrameBufferProps) -> RenderResult<FrameBufferId> {
        self.take_injected_failure("frame buffer")?;
        let color_textures = (0..props.color_attachments)
            .map(|_| self.alloc_texture())
            .collect();
        let depth_texture = (props.depth_attachments > 0).then(|| self.alloc_texture());
        self.frame_buffers.push(FrameBufferSlot {
            props,
            color_textures,
            depth_texture,
            alive: true,
        });
        self.counters.frame_buffers_created += 1;
        Ok(FrameBufferId(self.frame_buffers.len() as u32 - 1))
    }

    fn resize_frame_buffer(
        &mut self,
        id: FrameBufferId,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        let slot = self
            .frame_buffers
            .get_mut(id.0 as usize)
            .filter(|slot| slot.alive)
            .ok_or(RenderError::InvalidHandle {
                kind: "frame buffer",
            })?;
        slot.props.width = width;
        slot.props.height = height;
        self.counters.frame_buffer_resizes += 1;
        Ok(())
    }

    fn free_frame_buffer(&mut self, id: FrameBufferId) {
        if let Some(slot) = self.frame_buffers.get_mut(id.0 as usize) {
            slot.alive = false;
            self.counters.frame_buffers_freed += 1;
        }
    }

    fn clear_frame_buffer(&mut self, id: FrameBufferId, flags: ClearFlags) {
        if self.frame_buffer(id).is_some() {
            self.trace.push(BackendCall::ClearFrameBuffer(id, flags));
        }
    }

    fn bind_frame_buffer(&mut self, id: FrameBufferId) {
        if self.frame_buffer(id).is_some() {
            self.trace.push(BackendCall::BindFrameBuffer(id));
        } else {
            log::warn!("bind of unknown frame buffer {id:?} ignored");
        }
    }

    fn unbind_frame_buffer(&mut self, id: FrameBufferId) {
        if self.frame_buffer(id).is_some() {
            self.trace.push(BackendCall::UnbindFrameBuffer(id));
        }
    }

    fn color_attachment(&self, id: FrameBufferId, index: u32) -> Option<TextureId> {
        self.frame_buffer(id)?
            .color_textures
            .get(index as usize)
            .copied()
    }

    fn depth_attachment(&self, id: FrameBufferId) -> Option<TextureId> {
        self.frame_buffer(id)?.depth_texture
    }

    fn create_constant_buffer(&mut self, size: usize) -> RenderResult<ConstantBufferId> {
        self.take_injected_failure("constant buffer")?;
        self.constant_buffers.push(size);
        self.counters.constant_buffers_created += 1;
        Ok(ConstantBufferId(self.constant_buffers.len() as u32 - 1))
    }

    fn update_constant_buffer(&mut self, id: ConstantBufferId, data: &[u8]) -> RenderResult<()> {
        let size = *self
            .constant_buffers
            .get(id.0 as usize)
            .ok_or(RenderError::InvalidHandle {
                kind: "constant buffer",
            })?;
        if data.len() > size {
            return Err(RenderError::BackendError(format!(
                "update of {} bytes exceeds buffer size {size}",
                data.len()
            )));
        }
        self.trace
            .push(BackendCall::UpdateConstantBuffer(id, data.len()));
        Ok(())
    }

    fn bind_constant_buffer(&mut self, id: ConstantBufferId, binding_point: u32) {
        if (id.0 as usize) < self.constant_buffers.len() {
            self.trace.push(BackendCall::BindConstantBuffer {
                buffer: id,
                binding_point,
            });
        }
    }

    fn free_constant_buffer(&mut self, _id: ConstantBufferId) {}

    fn create_vertex_array(
        &mut self,
        _vertices: &[Vertex],
        indices: &[u32],
    ) -> RenderResult<VertexArrayId> {
        self.take_injected_failure("vertex array")?;
        self.vertex_arrays.push(indices.len() as u32);
        self.counters.vertex_arrays_created += 1;
        Ok(VertexArrayId(self.vertex_arrays.len() as u32 - 1))
    }

    fn free_vertex_array(&mut self, _id: VertexArrayId) {}

    fn create_shader(&mut self, stages: &[ShaderStage<'_>], name: &str) -> RenderResult<ShaderId> {
        if stages.is_empty() {
            return Err(RenderError::ShaderCompilation {
                name: name.to_owned(),
                reason: "no stages supplied".to_owned(),
            });
        }
        self.take_injected_failure("shader")?;
        self.shaders.push(name.to_owned());
        self.counters.shaders_created += 1;
        Ok(ShaderId(self.shaders.len() as u32 - 1))
    }

    fn free_shader(&mut self, _id: ShaderId) {}

    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue) {
        if (shader.0 as usize) < self.shaders.len() {
            self.trace.push(BackendCall::SetUniform {
                shader,
                name: name.to_owned(),
                value,
            });
        }
    }

    fn bind_texture(&mut self, texture: TextureId, slot: u32) {
        self.trace.push(BackendCall::BindTexture { texture, slot });
    }

    fn draw_indexed(&mut self, shader: ShaderId, vertex_array: VertexArrayId) -> RenderResult<()> {
        if (vertex_array.0 as usize) >= self.vertex_arrays.len() {
            return Err(RenderError::InvalidHandle {
                kind: "vertex array",
            });
        }
        self.trace.push(BackendCall::DrawIndexed { shader });
        Ok(())
    }

    fn draw_fullscreen_quad(&mut self, shader: ShaderId) -> RenderResult<()> {
        self.trace.push(BackendCall::DrawFullscreenQuad { shader });
        Ok(())
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.clear_color = color;
    }

    fn set_wireframe(&mut self, enabled: bool) {
        self.wireframe = enabled;
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.vsync = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_buffer_lifecycle() {
        let mut backend = HeadlessBackend::new();
        let fb = backend
            .create_frame_buffer(FrameBufferProps::color_depth(16, 16))
            .unwrap();
        assert!(backend.color_attachment(fb, 0).is_some());
        assert!(backend.color_attachment(fb, 1).is_none());
        assert!(backend.depth_attachment(fb).is_some());

        backend.free_frame_buffer(fb);
        assert!(backend.color_attachment(fb, 0).is_none());
        assert_eq!(backend.counters().frame_buffers_freed, 1);
    }

    #[test]
    fn injected_failure_surfaces_as_error() {
        let mut backend = HeadlessBackend::new();
        backend.inject_creation_failure();
        let result = backend.create_frame_buffer(FrameBufferProps::color_depth(16, 16));
        assert!(matches!(
            result,
            Err(RenderError::ResourceCreationFailed(_))
        ));
        // Only the next creation fails.
        assert!(backend
            .create_frame_buffer(FrameBufferProps::color_depth(16, 16))
            .is_ok());
    }

    #[test]
    fn oversized_constant_buffer_update_rejected() {
        let mut backend = HeadlessBackend::new();
        let cb = backend.create_constant_buffer(8).unwrap();
        assert!(backend.update_constant_buffer(cb, &[0u8; 16]).is_err());
        assert!(backend.update_constant_buffer(cb, &[0u8; 8]).is_ok());
    }
}
