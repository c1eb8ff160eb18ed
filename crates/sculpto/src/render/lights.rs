//! Fixed-capacity per-frame light registry.
//!
//! Lights are re-submitted every frame into a `#[repr(C)]` blob whose layout
//! mirrors the lighting shader's storage block, then uploaded to the lights
//! constant buffer in one `finalize` call. Capacity overruns are counted and
//! logged, never written past the arrays.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{ConstantBufferId, RenderBackend, BINDING_POINT_LIGHTS_STORAGE};
use crate::render::RenderResult;

/// Maximum point lights per frame.
pub const MAX_POINT_LIGHTS: usize = 50;
/// Maximum spot lights per frame.
pub const MAX_SPOT_LIGHTS: usize = 50;

/// GPU layout of one point light. 48 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    /// World position.
    pub position: [f32; 3],
    /// Constant attenuation coefficient.
    pub constant: f32,
    /// Light color.
    pub color: [f32; 3],
    /// Linear attenuation coefficient.
    pub linear: f32,
    /// Quadratic attenuation coefficient.
    pub quadratic: f32,
    _pad: [f32; 3],
}

impl PointLightData {
    /// Build from world data.
    #[must_use]
    pub fn new(position: Vec3, color: Vec3, constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            position: position.into(),
            constant,
            color: color.into(),
            linear,
            quadratic,
            _pad: [0.0; 3],
        }
    }
}

/// GPU layout of the single directional light slot. 96 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightData {
    /// Normalized light direction.
    pub direction: [f32; 3],
    /// Non-zero when a shadow map accompanies this light.
    pub is_shadows: u32,
    /// Light color.
    pub color: [f32; 3],
    _pad: f32,
    /// Shadow-caster view-projection, column major.
    pub view_projection: [[f32; 4]; 4],
}

impl DirectionalLightData {
    /// Build from world data; `shadow_view_projection` marks the light as a
    /// shadow caster.
    #[must_use]
    pub fn new(direction: Vec3, color: Vec3, shadow_view_projection: Option<&Mat4>) -> Self {
        Self {
            direction: direction.into(),
            is_shadows: u32::from(shadow_view_projection.is_some()),
            color: color.into(),
            _pad: 0.0,
            view_projection: shadow_view_projection
                .map_or_else(|| Mat4::identity().into(), |vp| (*vp).into()),
        }
    }
}

/// GPU layout of one spot light. 48 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightData {
    /// World position.
    pub position: [f32; 3],
    /// Cosine of the inner cone angle.
    pub inner_cutoff_cos: f32,
    /// Normalized cone direction.
    pub direction: [f32; 3],
    /// Cosine of the outer cone angle.
    pub outer_cutoff_cos: f32,
    /// Light color.
    pub color: [f32; 3],
    /// `inner_cutoff_cos - outer_cutoff_cos`, precomputed for the shader's
    /// edge falloff.
    pub epsilon: f32,
}

impl SpotLightData {
    /// Build from world data; cutoff angles are in radians.
    #[must_use]
    pub fn new(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        inner_cutoff: f32,
        outer_cutoff: f32,
    ) -> Self {
        let inner_cutoff_cos = inner_cutoff.cos();
        let outer_cutoff_cos = outer_cutoff.cos();
        Self {
            position: position.into(),
            inner_cutoff_cos,
            direction: direction.into(),
            outer_cutoff_cos,
            color: color.into(),
            epsilon: inner_cutoff_cos - outer_cutoff_cos,
        }
    }
}

/// Whole-frame lights blob, uploaded verbatim to the lights constant buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightsStorage {
    point_lights: [PointLightData; MAX_POINT_LIGHTS],
    directional_light: DirectionalLightData,
    spot_lights: [SpotLightData; MAX_SPOT_LIGHTS],
    point_lights_count: u32,
    is_directional_light: u32,
    spot_lights_count: u32,
    _pad: u32,
}

/// Per-frame light accumulator.
///
/// `begin_frame` resets everything; submissions append until the fixed
/// capacity is hit, after which they are dropped and counted.
pub struct LightRegistry {
    storage: LightsStorage,
    dropped_point_lights: u32,
    dropped_spot_lights: u32,
    dropped_directional_lights: u32,
}

impl Default for LightRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LightRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Zeroable::zeroed(),
            dropped_point_lights: 0,
            dropped_spot_lights: 0,
            dropped_directional_lights: 0,
        }
    }

    /// Reset to the empty state for a new frame.
    pub fn begin_frame(&mut self) {
        self.storage = Zeroable::zeroed();
        self.dropped_point_lights = 0;
        self.dropped_spot_lights = 0;
        self.dropped_directional_lights = 0;
    }

    /// Append a point light; drops and counts it when all slots are taken.
    pub fn submit_point_light(&mut self, light: PointLightData) {
        let count = self.storage.point_lights_count as usize;
        if count >= MAX_POINT_LIGHTS {
            self.dropped_point_lights += 1;
            log::warn!(
                "point light capacity ({MAX_POINT_LIGHTS}) exceeded, dropping submission"
            );
            return;
        }
        self.storage.point_lights[count] = light;
        self.storage.point_lights_count += 1;
    }

    /// Append a spot light; drops and counts it when all slots are taken.
    pub fn submit_spot_light(&mut self, light: SpotLightData) {
        let count = self.storage.spot_lights_count as usize;
        if count >= MAX_SPOT_LIGHTS {
            self.dropped_spot_lights += 1;
            log::warn!("spot light capacity ({MAX_SPOT_LIGHTS}) exceeded, dropping submission");
            return;
        }
        self.storage.spot_lights[count] = light;
        self.storage.spot_lights_count += 1;
    }

    /// Set the directional light. The first submission of a frame wins;
    /// later ones are dropped with a warning.
    pub fn submit_directional_light(&mut self, light: DirectionalLightData) {
        if self.storage.is_directional_light != 0 {
            self.dropped_directional_lights += 1;
            log::warn!("second directional light in one frame, keeping the first");
            return;
        }
        self.storage.directional_light = light;
        self.storage.is_directional_light = 1;
    }

    /// Point lights accepted this frame.
    #[must_use]
    pub fn point_light_count(&self) -> u32 {
        self.storage.point_lights_count
    }

    /// Spot lights accepted this frame.
    #[must_use]
    pub fn spot_light_count(&self) -> u32 {
        self.storage.spot_lights_count
    }

    /// Whether a directional light was submitted this frame.
    #[must_use]
    pub fn has_directional_light(&self) -> bool {
        self.storage.is_directional_light != 0
    }

    /// The active directional light slot.
    #[must_use]
    pub fn directional_light(&self) -> &DirectionalLightData {
        &self.storage.directional_light
    }

    /// Submissions dropped for capacity this frame (point, spot,
    /// directional).
    #[must_use]
    pub fn dropped_counts(&self) -> (u32, u32, u32) {
        (
            self.dropped_point_lights,
            self.dropped_spot_lights,
            self.dropped_directional_lights,
        )
    }

    /// Upload the blob to `buffer` and bind it at the lights binding point.
    /// Called exactly once per frame, before the lighting pass draws.
    pub fn finalize(
        &self,
        backend: &mut dyn RenderBackend,
        buffer: ConstantBufferId,
    ) -> RenderResult<()> {
        backend.update_constant_buffer(buffer, bytemuck::bytes_of(&self.storage))?;
        backend.bind_constant_buffer(buffer, BINDING_POINT_LIGHTS_STORAGE);
        Ok(())
    }
}

/// Byte size of the uploaded lights blob.
pub const LIGHTS_STORAGE_SIZE: usize = std::mem::size_of::<LightsStorage>();
