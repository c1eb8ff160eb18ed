//! Backend abstraction for the rendering system.
//!
//! The graphics API lives entirely behind [`RenderBackend`]; the engine
//! core only ever sees opaque ids. One implementation ships with the crate:
//! the recording [`headless::HeadlessBackend`] used by tests and the
//! sandbox. A real OpenGL backend plugs in at the same seam.

pub mod headless;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::frame_buffer::FrameBufferProps;
use crate::render::resources::Vertex;
use crate::render::RenderResult;

use bitflags::bitflags;

/// Handle to a backend frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameBufferId(pub u32);

/// Handle to a backend constant (uniform) buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantBufferId(pub u32);

/// Handle to a backend vertex array (vertex + index buffer pair)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Handle to a compiled shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

/// Handle to a backend texture (including frame-buffer attachments)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

bitflags! {
    /// Frame buffer clear target selection
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Clear all color attachments
        const COLOR = 1 << 0;
        /// Clear the depth attachment
        const DEPTH = 1 << 1;
    }
}

/// Constant-buffer binding point for per-frame pipeline data
pub const BINDING_POINT_FRAME_DATA: u32 = 0;

/// Constant-buffer binding point for the lights-storage blob
pub const BINDING_POINT_LIGHTS_STORAGE: u32 = 1;

/// Texture slot the shadow map depth attachment is bound to during the
/// lighting pass
pub const TEXTURE_SLOT_SHADOW_MAP: u32 = 5;

/// Texture slot for the primary source texture of full-screen passes
pub const TEXTURE_SLOT_APPLY_SOURCE: u32 = 0;

/// Texture slot for the secondary source texture of full-screen passes
/// (blur result during the bloom combine)
pub const TEXTURE_SLOT_APPLY_BLEND: u32 = 1;

/// Shader stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    /// Vertex stage
    Vertex,
    /// Fragment (pixel) stage
    Fragment,
}

/// One stage of a shader program, borrowed source text.
#[derive(Debug, Clone, Copy)]
pub struct ShaderStage<'a> {
    /// Which pipeline stage the source compiles to.
    pub kind: ShaderStageKind,
    /// Stage source text.
    pub source: &'a str,
}

/// A named uniform value set on a shader before a draw.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i32),
    /// Single float
    Float(f32),
    /// 3-component vector
    Vec3(Vec3),
    /// 4x4 matrix
    Mat4(Mat4),
}

/// Graphics backend interface.
///
/// All mutating resource operations are fallible and return
/// [`RenderResult`]; binds against handles the backend no longer knows must
/// no-op rather than panic, so a missing asset degrades to a skipped draw.
pub trait RenderBackend {
    /// Create a frame buffer with the given properties.
    fn create_frame_buffer(&mut self, props: FrameBufferProps) -> RenderResult<FrameBufferId>;
    /// Reallocate a frame buffer's attachments for new dimensions.
    fn resize_frame_buffer(&mut self, id: FrameBufferId, width: u32, height: u32)
        -> RenderResult<()>;
    /// Free a frame buffer and its attachments.
    fn free_frame_buffer(&mut self, id: FrameBufferId);
    /// Clear the selected attachments of a frame buffer.
    fn clear_frame_buffer(&mut self, id: FrameBufferId, flags: ClearFlags);
    /// Bind a frame buffer as the current render target.
    fn bind_frame_buffer(&mut self, id: FrameBufferId);
    /// Unbind the current render target.
    fn unbind_frame_buffer(&mut self, id: FrameBufferId);
    /// Texture handle of a color attachment, if the index exists.
    fn color_attachment(&self, id: FrameBufferId, index: u32) -> Option<TextureId>;
    /// Texture handle of the depth attachment, if one exists.
    fn depth_attachment(&self, id: FrameBufferId) -> Option<TextureId>;

    /// Create a constant buffer of `size` bytes.
    fn create_constant_buffer(&mut self, size: usize) -> RenderResult<ConstantBufferId>;
    /// Upload bytes into a constant buffer.
    fn update_constant_buffer(&mut self, id: ConstantBufferId, data: &[u8]) -> RenderResult<()>;
    /// Bind a constant buffer to a shader binding point.
    fn bind_constant_buffer(&mut self, id: ConstantBufferId, binding_point: u32);
    /// Free a constant buffer.
    fn free_constant_buffer(&mut self, id: ConstantBufferId);

    /// Create a vertex array from vertex and index data.
    fn create_vertex_array(&mut self, vertices: &[Vertex], indices: &[u32])
        -> RenderResult<VertexArrayId>;
    /// Free a vertex array.
    fn free_vertex_array(&mut self, id: VertexArrayId);

    /// Compile and link a shader program from its stages.
    fn create_shader(&mut self, stages: &[ShaderStage<'_>], name: &str) -> RenderResult<ShaderId>;
    /// Free a shader program.
    fn free_shader(&mut self, id: ShaderId);
    /// Set a named uniform on a shader.
    fn set_uniform(&mut self, shader: ShaderId, name: &str, value: UniformValue);

    /// Bind a texture to a texture slot.
    fn bind_texture(&mut self, texture: TextureId, slot: u32);

    /// Issue an indexed draw of a vertex array with the given shader.
    fn draw_indexed(&mut self, shader: ShaderId, vertex_array: VertexArrayId) -> RenderResult<()>;
    /// Draw a full-screen quad, invoking the shader per pixel of the
    /// current render target.
    fn draw_fullscreen_quad(&mut self, shader: ShaderId) -> RenderResult<()>;

    /// Set the clear color used by subsequent clears.
    fn set_clear_color(&mut self, color: Vec4);
    /// Toggle wireframe rasterization.
    fn set_wireframe(&mut self, enabled: bool);
    /// Toggle vertical synchronization.
    fn set_vsync(&mut self, enabled: bool);
}
