//! Virtual render camera.
//!
//! Owns the projection/view matrices and the per-camera render targets:
//! main output, G-buffer, HDR buffer and the blur ping-pong pair. Matrix
//! invalidation is eager: every setter recomputes the affected matrices
//! immediately, so a render pass can read them at any time. Buffer resizes
//! are guarded against no-op dimensions so repeated viewport events never
//! reallocate GPU memory.

use crate::foundation::math::{
    self, deg_to_rad, frustum, look_at, orthographic, rotation_axis_angle, Mat4, Vec3,
};
use crate::render::backend::RenderBackend;
use crate::render::frame_buffer::{FrameBuffer, FrameBufferProps};
use crate::render::RenderResult;

/// Camera projection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    /// Parallel projection.
    Orthographic,
    /// Perspective projection.
    Perspective,
}

/// Post-processing toggles carried by a camera.
///
/// Bloom depends on HDR: the reverse combination is a configuration error
/// and is downgraded (with a warning) rather than honored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraEffects {
    /// Render to the HDR buffer and tone-map to the main buffer.
    pub hdr: bool,
    /// Exposure scalar for tone mapping; applied only when HDR is on.
    pub exposure: f32,
    /// Apply bloom; requires HDR.
    pub bloom: bool,
    /// Gaussian blur iterations for bloom.
    pub bloom_amount: u32,
}

impl Default for CameraEffects {
    fn default() -> Self {
        Self {
            hdr: false,
            exposure: 1.0,
            bloom: false,
            bloom_amount: 4,
        }
    }
}

/// Number of G-buffer color attachments: position, normal, color, diffuse,
/// specular, shininess.
const G_BUFFER_ATTACHMENTS: u32 = 6;

/// HDR buffer color attachments: HDR color plus the bright-pass extract
/// bloom reads from.
const HDR_ATTACHMENTS: u32 = 2;

/// Fresh cameras start at a token 16x16 extent until the first real resize.
const INITIAL_EXTENT: u32 = 16;

/// Renderer virtual camera.
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    view_projection: Mat4,

    projection_type: ProjectionType,
    field_of_view: f32,
    projection_distance: f32,
    far_clip: f32,
    viewport_width: u32,
    viewport_height: u32,

    up_direction: Vec3,
    look_direction: Vec3,
    right_direction: Vec3,
    position: Vec3,
    focus: Vec3,

    main_frame_buffer: FrameBuffer,
    g_buffer: FrameBuffer,
    hdr_frame_buffer: FrameBuffer,
    blur_frame_buffers: Option<[FrameBuffer; 2]>,

    effects: CameraEffects,
}

impl Camera {
    /// Create a camera and its frame buffers.
    ///
    /// The blur ping-pong pair is only allocated when the requested effects
    /// already enable bloom; otherwise allocation waits for
    /// [`Camera::set_bloom`].
    pub fn new(
        backend: &mut dyn RenderBackend,
        projection_type: ProjectionType,
        effects: CameraEffects,
    ) -> RenderResult<Self> {
        let e = INITIAL_EXTENT;
        let main_frame_buffer = FrameBuffer::new(backend, FrameBufferProps::color_depth(e, e))?;
        let g_buffer = FrameBuffer::new(
            backend,
            FrameBufferProps {
                width: e,
                height: e,
                color_attachments: G_BUFFER_ATTACHMENTS,
                depth_attachments: 1,
                swap_chain_target: false,
            },
        )?;
        let hdr_frame_buffer = FrameBuffer::new(
            backend,
            FrameBufferProps {
                width: e,
                height: e,
                color_attachments: HDR_ATTACHMENTS,
                depth_attachments: 1,
                swap_chain_target: false,
            },
        )?;

        let mut camera = Self {
            projection: Mat4::identity(),
            view: Mat4::identity(),
            view_projection: Mat4::identity(),
            projection_type,
            field_of_view: 0.1,
            projection_distance: 0.1,
            far_clip: 1000.0,
            viewport_width: e,
            viewport_height: e,
            up_direction: Vec3::new(0.0, 1.0, 0.0),
            look_direction: Vec3::new(0.0, 0.0, -1.0),
            right_direction: Vec3::new(1.0, 0.0, 0.0),
            position: Vec3::zeros(),
            focus: Vec3::zeros(),
            main_frame_buffer,
            g_buffer,
            hdr_frame_buffer,
            blur_frame_buffers: None,
            effects: CameraEffects {
                bloom: false,
                ..effects
            },
        };

        camera.invalidate_projection();
        camera.set_view(Vec3::new(0.0, 3.0, 10.0), Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));
        if effects.bloom {
            camera.set_bloom(backend, true)?;
        }
        Ok(camera)
    }

    /// Projection matrix.
    #[must_use]
    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// View matrix.
    #[must_use]
    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    /// Combined view-projection matrix.
    #[must_use]
    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    /// Current effects.
    #[must_use]
    pub fn effects(&self) -> CameraEffects {
        self.effects
    }

    /// Projection type.
    #[must_use]
    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    /// Field of view (radians for perspective, world units for ortho).
    #[must_use]
    pub fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    /// Viewport width in pixels.
    #[must_use]
    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    /// Viewport height in pixels.
    #[must_use]
    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    /// World position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Focus point.
    #[must_use]
    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    /// Normalized look direction.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.look_direction
    }

    /// Normalized up direction.
    #[must_use]
    pub fn up_direction(&self) -> Vec3 {
        self.up_direction
    }

    /// Normalized right direction.
    #[must_use]
    pub fn right_direction(&self) -> Vec3 {
        self.right_direction
    }

    /// Main (display) frame buffer.
    #[must_use]
    pub fn main_frame_buffer(&self) -> &FrameBuffer {
        &self.main_frame_buffer
    }

    /// Geometry-pass G-buffer.
    #[must_use]
    pub fn g_buffer(&self) -> &FrameBuffer {
        &self.g_buffer
    }

    /// HDR frame buffer.
    #[must_use]
    pub fn hdr_frame_buffer(&self) -> &FrameBuffer {
        &self.hdr_frame_buffer
    }

    /// Blur ping-pong buffers, present only while bloom is enabled.
    #[must_use]
    pub fn blur_frame_buffers(&self) -> Option<&[FrameBuffer; 2]> {
        self.blur_frame_buffers.as_ref()
    }

    /// Set projection type and recompute projection.
    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.invalidate_projection();
    }

    /// Set field of view (radians for perspective, world units for ortho)
    /// and recompute projection.
    pub fn set_field_of_view(&mut self, field_of_view: f32) {
        self.field_of_view = field_of_view;
        self.invalidate_projection();
    }

    /// Set near-plane distance and recompute projection.
    pub fn set_projection_distance(&mut self, projection_distance: f32) {
        self.projection_distance = projection_distance;
        self.invalidate_projection();
    }

    /// Set far-plane distance and recompute projection.
    pub fn set_far_clip(&mut self, far_clip: f32) {
        self.far_clip = far_clip;
        self.invalidate_projection();
    }

    /// Set up direction and recompute the view matrix.
    pub fn set_up_direction(&mut self, up_direction: Vec3) {
        self.up_direction = up_direction;
        self.right_direction = self.look_direction.cross(&self.up_direction).normalize();
        self.invalidate_view();
    }

    /// Set world position, keeping the focus point.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.derive_directions();
        self.invalidate_view();
    }

    /// Set focus point, keeping the position.
    pub fn set_focus(&mut self, focus: Vec3) {
        self.focus = focus;
        self.derive_directions();
        self.invalidate_view();
    }

    /// Point the camera along `direction` from its current position. The
    /// focus lands one unit away along the new direction.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.focus = self.position + direction.normalize();
        self.derive_directions();
        self.invalidate_view();
    }

    /// Set the full view at once. Must run before any pass reads the
    /// camera's matrices.
    pub fn set_view(&mut self, position: Vec3, focus: Vec3, up_direction: Vec3) {
        self.position = position;
        self.focus = focus;
        self.up_direction = up_direction;
        self.derive_directions();
        self.invalidate_view();
    }

    /// Rotate the view around an axis through the *current* position.
    ///
    /// Order matters: rotating after a move orbits around the new position.
    /// First/third person controllers are built on exactly this.
    pub fn rotate(&mut self, axis: Vec3, angle_degrees: f32) -> &mut Self {
        let transform = Mat4::new_translation(&self.position)
            * rotation_axis_angle(axis, deg_to_rad(angle_degrees))
            * Mat4::new_translation(&(-self.position));

        self.focus = math::transform_point(&transform, self.focus);
        self.position = math::transform_point(&transform, self.position);
        self.up_direction = math::transform_vector(&transform, self.up_direction);
        self.derive_directions();
        self.invalidate_view();
        self
    }

    /// Translate position and focus together.
    pub fn move_by(&mut self, move_vector: Vec3) -> &mut Self {
        self.position += move_vector;
        self.focus += move_vector;
        self.invalidate_view();
        self
    }

    /// Resize the viewport: recompute the projection and resize every owned
    /// frame buffer. Unchanged dimensions reallocate nothing.
    pub fn resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        self.viewport_width = width;
        self.viewport_height = height;
        self.invalidate_projection();

        self.main_frame_buffer.resize(backend, width, height)?;
        self.g_buffer.resize(backend, width, height)?;
        self.hdr_frame_buffer.resize(backend, width, height)?;
        // Blur buffers exist only while bloom is on; resizing must not
        // assume they do.
        if let Some(blur) = self.blur_frame_buffers.as_mut() {
            for fb in blur {
                fb.resize(backend, width, height)?;
            }
        }
        Ok(())
    }

    /// Toggle HDR. Disabling HDR while bloom is on also disables bloom and
    /// releases the blur buffers.
    pub fn set_hdr(&mut self, backend: &mut dyn RenderBackend, enabled: bool) -> RenderResult<()> {
        self.effects.hdr = enabled;
        if !enabled && self.effects.bloom {
            log::warn!("disabling HDR also disables bloom");
            self.set_bloom(backend, false)?;
        }
        Ok(())
    }

    /// Toggle bloom. Enabling without HDR is a configuration error: it is
    /// reported and downgraded to bloom-off. The blur ping-pong pair is
    /// allocated on first enable and released on disable.
    pub fn set_bloom(
        &mut self,
        backend: &mut dyn RenderBackend,
        enabled: bool,
    ) -> RenderResult<()> {
        if enabled && !self.effects.hdr {
            log::warn!("bloom requested while HDR is disabled; keeping bloom off");
            self.effects.bloom = false;
            return Ok(());
        }
        if enabled && self.blur_frame_buffers.is_none() {
            let props = FrameBufferProps {
                width: self.viewport_width,
                height: self.viewport_height,
                color_attachments: 1,
                depth_attachments: 0,
                swap_chain_target: false,
            };
            let first = FrameBuffer::new(backend, props)?;
            let second = FrameBuffer::new(backend, props)?;
            self.blur_frame_buffers = Some([first, second]);
        }
        if !enabled {
            if let Some([first, second]) = self.blur_frame_buffers.take() {
                first.release(backend);
                second.release(backend);
            }
        }
        self.effects.bloom = enabled;
        Ok(())
    }

    /// Set the tone-mapping exposure scalar.
    pub fn set_exposure(&mut self, exposure: f32) {
        self.effects.exposure = exposure;
    }

    /// Set the bloom blur iteration count.
    pub fn set_bloom_amount(&mut self, bloom_amount: u32) {
        self.effects.bloom_amount = bloom_amount;
    }

    /// Mark the main buffer as a swap-chain target (or not).
    pub fn set_render_to_swap_chain(
        &mut self,
        backend: &mut dyn RenderBackend,
        swap_chain_target: bool,
    ) -> RenderResult<()> {
        let props = self.main_frame_buffer.props();
        if props.swap_chain_target == swap_chain_target {
            return Ok(());
        }
        // Swap-chain targeting changes the attachment storage, so the
        // buffer is recreated rather than mutated in place.
        let new_props = FrameBufferProps {
            swap_chain_target,
            ..props
        };
        let replacement = FrameBuffer::new(backend, new_props)?;
        let old = std::mem::replace(&mut self.main_frame_buffer, replacement);
        old.release(backend);
        Ok(())
    }

    /// Release every owned frame buffer.
    pub fn release(self, backend: &mut dyn RenderBackend) {
        self.main_frame_buffer.release(backend);
        self.g_buffer.release(backend);
        self.hdr_frame_buffer.release(backend);
        if let Some([first, second]) = self.blur_frame_buffers {
            first.release(backend);
            second.release(backend);
        }
    }

    fn derive_directions(&mut self) {
        self.look_direction = (self.focus - self.position).normalize();
        self.right_direction = self.look_direction.cross(&self.up_direction).normalize();
    }

    fn invalidate_view(&mut self) {
        self.view = look_at(self.position, self.focus, self.up_direction);
        self.invalidate_view_projection();
    }

    fn invalidate_projection(&mut self) {
        // The larger viewport axis drives the ratio scaling on the other.
        let mut ratio_x = self.field_of_view / 2.0;
        let mut ratio_y = self.field_of_view / 2.0;
        if self.viewport_width >= self.viewport_height {
            ratio_x *= self.viewport_width as f32 / self.viewport_height.max(1) as f32;
        } else {
            ratio_y *= self.viewport_height as f32 / self.viewport_width.max(1) as f32;
        }

        self.projection = match self.projection_type {
            ProjectionType::Orthographic => orthographic(
                -ratio_x,
                ratio_x,
                -ratio_y,
                ratio_y,
                self.projection_distance,
                self.far_clip,
            ),
            ProjectionType::Perspective => frustum(
                -ratio_x,
                ratio_x,
                -ratio_y,
                ratio_y,
                self.projection_distance,
                self.far_clip,
            ),
        };
        self.invalidate_view_projection();
    }

    fn invalidate_view_projection(&mut self) {
        self.view_projection = self.projection * self.view;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::headless::HeadlessBackend;
    use approx::assert_relative_eq;

    fn camera(backend: &mut HeadlessBackend) -> Camera {
        Camera::new(backend, ProjectionType::Perspective, CameraEffects::default()).unwrap()
    }

    #[test]
    fn resize_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);

        cam.resize(&mut backend, 800, 600).unwrap();
        let after_first = backend.counters();

        cam.resize(&mut backend, 800, 600).unwrap();
        let after_second = backend.counters();

        assert_eq!(after_first, after_second);
    }

    #[test]
    fn resize_reaches_every_owned_buffer() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);
        cam.resize(&mut backend, 320, 240).unwrap();

        assert_eq!(cam.main_frame_buffer().props().width, 320);
        assert_eq!(cam.g_buffer().props().height, 240);
        assert_eq!(cam.hdr_frame_buffer().props().width, 320);
    }

    #[test]
    fn bloom_without_hdr_downgrades() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);

        cam.set_bloom(&mut backend, true).unwrap();
        let effects = cam.effects();
        assert!(!effects.hdr);
        assert!(!effects.bloom);
        assert!(cam.blur_frame_buffers().is_none());
    }

    #[test]
    fn blur_buffers_allocated_lazily_and_released() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);
        let before = backend.counters().frame_buffers_created;

        cam.set_hdr(&mut backend, true).unwrap();
        assert_eq!(backend.counters().frame_buffers_created, before);

        cam.set_bloom(&mut backend, true).unwrap();
        assert_eq!(backend.counters().frame_buffers_created, before + 2);
        assert!(cam.blur_frame_buffers().is_some());

        cam.set_bloom(&mut backend, false).unwrap();
        assert!(cam.blur_frame_buffers().is_none());
        assert_eq!(backend.counters().frame_buffers_freed, 2);
    }

    #[test]
    fn disabling_hdr_disables_bloom() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);
        cam.set_hdr(&mut backend, true).unwrap();
        cam.set_bloom(&mut backend, true).unwrap();

        cam.set_hdr(&mut backend, false).unwrap();
        assert!(!cam.effects().bloom);
        assert!(cam.blur_frame_buffers().is_none());
    }

    #[test]
    fn resize_while_bloom_active_resizes_blur_buffers() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);
        cam.set_hdr(&mut backend, true).unwrap();
        cam.set_bloom(&mut backend, true).unwrap();

        cam.resize(&mut backend, 640, 480).unwrap();
        let blur = cam.blur_frame_buffers().unwrap();
        assert_eq!(blur[0].props().width, 640);
        assert_eq!(blur[1].props().height, 480);
    }

    #[test]
    fn set_view_derives_directions() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);
        cam.set_view(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );

        assert_relative_eq!(cam.direction().z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(cam.right_direction().x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn rotation_pivots_on_the_current_position() {
        let mut backend = HeadlessBackend::new();

        let mut a = camera(&mut backend);
        a.set_view(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        a.set_position(Vec3::new(2.0, 0.0, 5.0));
        a.rotate(Vec3::new(0.0, 1.0, 0.0), 90.0);

        let mut b = camera(&mut backend);
        b.set_view(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        b.rotate(Vec3::new(0.0, 1.0, 0.0), 90.0);
        b.set_position(Vec3::new(2.0, 0.0, 5.0));

        // set_position keeps the focus, so moving the pivot before the
        // rotation lands the focus somewhere else.
        assert!((a.focus() - b.focus()).norm() > 1e-3);
    }

    #[test]
    fn rotation_keeps_position_fixed() {
        let mut backend = HeadlessBackend::new();
        let mut cam = camera(&mut backend);
        cam.set_view(
            Vec3::new(0.0, 2.0, 5.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let before = cam.position();
        cam.rotate(Vec3::new(0.0, 1.0, 0.0), 45.0);
        assert_relative_eq!((cam.position() - before).norm(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn creation_failure_propagates() {
        let mut backend = HeadlessBackend::new();
        backend.inject_creation_failure();
        let result = Camera::new(
            &mut backend,
            ProjectionType::Perspective,
            CameraEffects::default(),
        );
        assert!(result.is_err());
    }
}
