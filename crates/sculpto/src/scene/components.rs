//! Scene object components.
//!
//! Plain data structs registered in the [`crate::ecs::World`]; the scene
//! driver walks them each frame to feed the render pipeline.

use crate::ecs::{Component, Entity};
use crate::foundation::math::{
    deg_to_rad, look_at, orthographic, rotation_axis_angle, Mat4, Vec3,
};
use crate::render::backend::RenderBackend;
use crate::render::frame_buffer::{FrameBuffer, FrameBufferProps};
use crate::render::resources::MeshHandle;
use crate::render::RenderResult;

/// Human-readable object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Component for Name {}

/// Object world transform: scale, then euler rotation, then translation.
#[derive(Debug, Clone)]
pub struct Transform {
    /// Per-axis scale factors.
    pub scale: Vec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub angles: Vec3,
    /// World position.
    pub position: Vec3,
    matrix: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), Vec3::zeros())
    }
}

impl Transform {
    /// Build a transform and its matrix.
    #[must_use]
    pub fn new(scale: Vec3, angles: Vec3, position: Vec3) -> Self {
        let mut transform = Self {
            scale,
            angles,
            position,
            matrix: Mat4::identity(),
        };
        transform.invalidate();
        transform
    }

    /// Transform placed at `position` with unit scale and no rotation.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), position)
    }

    /// Composed world matrix.
    #[must_use]
    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// Replace the scale and recompute the matrix.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate();
    }

    /// Replace the euler angles (degrees) and recompute the matrix.
    pub fn set_angles(&mut self, angles: Vec3) {
        self.angles = angles;
        self.invalidate();
    }

    /// Replace the position and recompute the matrix.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        let rotation = rotation_axis_angle(Vec3::new(0.0, 0.0, 1.0), deg_to_rad(self.angles.z))
            * rotation_axis_angle(Vec3::new(0.0, 1.0, 0.0), deg_to_rad(self.angles.y))
            * rotation_axis_angle(Vec3::new(1.0, 0.0, 0.0), deg_to_rad(self.angles.x));
        self.matrix = Mat4::new_translation(&self.position)
            * rotation
            * Mat4::new_nonuniform_scaling(&self.scale);
    }
}

impl Component for Transform {}

/// Reference to a mesh in the resource store.
#[derive(Debug, Clone, Copy)]
pub struct MeshComponent {
    /// Mesh to draw each frame.
    pub mesh: MeshHandle,
}

impl Component for MeshComponent {}

/// Point light source; position comes from the object's transform.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    /// Light color.
    pub color: Vec3,
    /// Constant attenuation coefficient.
    pub constant: f32,
    /// Linear attenuation coefficient.
    pub linear: f32,
    /// Quadratic attenuation coefficient.
    pub quadratic: f32,
}

impl PointLight {
    /// Light with the common default attenuation curve.
    #[must_use]
    pub fn new(color: Vec3) -> Self {
        Self {
            color,
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

impl Component for PointLight {}

/// Spot light source; position comes from the object's transform.
#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    /// Light color.
    pub color: Vec3,
    /// Cone direction.
    pub direction: Vec3,
    /// Inner cone angle in degrees.
    pub inner_cutoff: f32,
    /// Outer cone angle in degrees.
    pub outer_cutoff: f32,
}

impl Component for SpotLight {}

/// Directional light source that can cast shadows.
///
/// The component owns its shadow-map frame buffer; enabling shadows
/// allocates it and disabling releases it, so a scene full of plain
/// directional lights costs no GPU memory.
#[derive(Debug)]
pub struct DirectionalLight {
    /// Light color.
    pub color: Vec3,
    /// Light direction.
    pub direction: Vec3,
    shadow_map: Option<FrameBuffer>,
    projection: Mat4,
    box_size: f32,
    box_depth: f32,
}

impl DirectionalLight {
    /// Shadow-less directional light.
    #[must_use]
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self {
            color,
            direction,
            shadow_map: None,
            projection: Mat4::identity(),
            box_size: 10.0,
            box_depth: 100.0,
        }
    }

    /// Whether this light casts shadows.
    #[must_use]
    pub fn casts_shadows(&self) -> bool {
        self.shadow_map.is_some()
    }

    /// The owned shadow-map frame buffer, while shadows are enabled.
    #[must_use]
    pub fn shadow_map(&self) -> Option<&FrameBuffer> {
        self.shadow_map.as_ref()
    }

    /// Ortho caster box half-width.
    #[must_use]
    pub fn box_size(&self) -> f32 {
        self.box_size
    }

    /// Ortho caster box depth.
    #[must_use]
    pub fn box_depth(&self) -> f32 {
        self.box_depth
    }

    /// Allocate the shadow map and set up the ortho caster box.
    pub fn enable_shadows(
        &mut self,
        backend: &mut dyn RenderBackend,
        box_size: f32,
        box_depth: f32,
        shadow_map_width: u32,
        shadow_map_height: u32,
    ) -> RenderResult<()> {
        self.box_size = box_size;
        self.box_depth = box_depth;
        self.projection = orthographic(-box_size, box_size, -box_size, box_size, 1.0, box_depth);
        if self.shadow_map.is_none() {
            self.shadow_map = Some(FrameBuffer::new(
                backend,
                FrameBufferProps::depth_only(shadow_map_width, shadow_map_height),
            )?);
        }
        Ok(())
    }

    /// Release the shadow map.
    pub fn disable_shadows(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(shadow_map) = self.shadow_map.take() {
            shadow_map.release(backend);
        }
    }

    /// Resize the shadow map, if one is allocated.
    pub fn resize_shadow_map(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        if let Some(shadow_map) = self.shadow_map.as_mut() {
            shadow_map.resize(backend, width, height)?;
        }
        Ok(())
    }

    /// Light-space view-projection for the shadow pass.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        let direction = self.direction.normalize();
        // Eye sits back along the light direction so the ortho box covers
        // the scene around the origin.
        let eye = -direction * (self.box_depth / 2.0);
        let up = if direction.x.abs() < 1e-4 && direction.z.abs() < 1e-4 {
            Vec3::new(0.0, 0.0, 1.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        self.projection * look_at(eye, eye + direction, up)
    }
}

impl Component for DirectionalLight {}

/// Scene object camera, wrapping a render camera and its buffers.
pub struct CameraComponent {
    /// The render camera this object controls.
    pub camera: crate::render::camera::Camera,
}

impl Component for CameraComponent {}

/// Per-object update logic, called at the scene's fixed script rate.
///
/// The script component is taken out of the world while its behaviour
/// runs, so the behaviour receives full mutable world access without
/// aliasing its own storage.
pub trait Behaviour: Send + Sync {
    /// Called once, the first frame the script runs.
    fn on_create(&mut self, _entity: Entity, _world: &mut crate::ecs::World) {}
    /// Called at the fixed update rate.
    fn on_update(&mut self, entity: Entity, world: &mut crate::ecs::World, dt: f32);
}

/// Script component holding a boxed behaviour, instantiated lazily.
pub struct ScriptComponent {
    behaviour: Option<Box<dyn Behaviour>>,
    factory: fn() -> Box<dyn Behaviour>,
    created: bool,
}

impl ScriptComponent {
    /// Script whose behaviour is built by `factory` on first update.
    #[must_use]
    pub fn new(factory: fn() -> Box<dyn Behaviour>) -> Self {
        Self {
            behaviour: None,
            factory,
            created: false,
        }
    }

    /// Instantiate on first call, then run one update tick.
    pub fn update(&mut self, entity: Entity, world: &mut crate::ecs::World, dt: f32) {
        let mut behaviour = match self.behaviour.take() {
            Some(behaviour) => behaviour,
            None => (self.factory)(),
        };
        if !self.created {
            behaviour.on_create(entity, world);
            self.created = true;
        }
        behaviour.on_update(entity, world, dt);
        self.behaviour = Some(behaviour);
    }
}

impl Component for ScriptComponent {}
