//! Frame buffer wrapper with explicit ownership.
//!
//! A [`FrameBuffer`] exclusively owns one backend frame buffer object.
//! There is no drop glue: freeing requires a backend, so owners call
//! [`FrameBuffer::release`] when resizing out of existence or disabling the
//! feature that needed the buffer.

use crate::render::backend::{ClearFlags, FrameBufferId, RenderBackend, TextureId};
use crate::render::RenderResult;

/// Creation-time properties of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameBufferProps {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of color attachments.
    pub color_attachments: u32,
    /// Number of depth attachments (0 or 1).
    pub depth_attachments: u32,
    /// Whether this buffer presents to the swap chain.
    pub swap_chain_target: bool,
}

impl FrameBufferProps {
    /// Props for a plain color + depth target.
    #[must_use]
    pub fn color_depth(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color_attachments: 1,
            depth_attachments: 1,
            swap_chain_target: false,
        }
    }

    /// Props for a depth-only target (shadow maps).
    #[must_use]
    pub fn depth_only(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color_attachments: 0,
            depth_attachments: 1,
            swap_chain_target: false,
        }
    }
}

/// An exclusively-owned GPU frame buffer.
#[derive(Debug)]
pub struct FrameBuffer {
    id: FrameBufferId,
    props: FrameBufferProps,
}

impl FrameBuffer {
    /// Create a frame buffer on the backend.
    pub fn new(backend: &mut dyn RenderBackend, props: FrameBufferProps) -> RenderResult<Self> {
        let id = backend.create_frame_buffer(props)?;
        Ok(Self { id, props })
    }

    /// Backend handle.
    #[must_use]
    pub fn id(&self) -> FrameBufferId {
        self.id
    }

    /// Current properties.
    #[must_use]
    pub fn props(&self) -> FrameBufferProps {
        self.props
    }

    /// Resize the buffer. No-op when the dimensions are unchanged, so
    /// repeated viewport events never reallocate attachments.
    pub fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        if self.props.width == width && self.props.height == height {
            return Ok(());
        }
        backend.resize_frame_buffer(self.id, width, height)?;
        self.props.width = width;
        self.props.height = height;
        Ok(())
    }

    /// Clear color and depth attachments.
    pub fn clear(&self, backend: &mut dyn RenderBackend) {
        backend.clear_frame_buffer(self.id, ClearFlags::COLOR | ClearFlags::DEPTH);
    }

    /// Bind as the current render target.
    pub fn bind(&self, backend: &mut dyn RenderBackend) {
        backend.bind_frame_buffer(self.id);
    }

    /// Unbind as the current render target.
    pub fn unbind(&self, backend: &mut dyn RenderBackend) {
        backend.unbind_frame_buffer(self.id);
    }

    /// Texture handle of color attachment `index`.
    #[must_use]
    pub fn color_attachment(&self, backend: &dyn RenderBackend, index: u32) -> Option<TextureId> {
        backend.color_attachment(self.id, index)
    }

    /// Texture handle of the depth attachment.
    #[must_use]
    pub fn depth_attachment(&self, backend: &dyn RenderBackend) -> Option<TextureId> {
        backend.depth_attachment(self.id)
    }

    /// Free the backend object. Consumes the wrapper; the handle must not
    /// be used again.
    pub fn release(self, backend: &mut dyn RenderBackend) {
        backend.free_frame_buffer(self.id);
    }
}
