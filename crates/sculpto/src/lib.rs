//! # Sculpto
//!
//! A small real-time 3D rendering engine: an entity-component scene over a
//! multi-pass deferred render pipeline.
//!
//! ## Features
//!
//! - **Multi-Pass Pipeline**: shadow mapping, deferred Phong lighting, HDR
//!   tone mapping and bloom, orchestrated through an explicit pass plan
//! - **Scene System**: entity-component world with transforms, lights,
//!   cameras and scripted behaviours driven at a fixed update rate
//! - **Backend Seam**: the graphics API lives behind a trait; a recording
//!   headless backend ships for tests and tooling
//! - **Scene Serialization**: JSON save/load of objects, lights and camera
//!   effects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sculpto::prelude::*;
//! use sculpto::render::backend::headless::HeadlessBackend;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut backend = HeadlessBackend::new();
//!     let mut scene = Scene::new();
//!
//!     let camera_object = scene.create_object("camera");
//!     let camera = Camera::new(
//!         &mut backend,
//!         ProjectionType::Perspective,
//!         CameraEffects::default(),
//!     )?;
//!     scene
//!         .world_mut()
//!         .add_component(camera_object, CameraComponent { camera });
//!     scene.set_main_camera(camera_object);
//!
//!     scene.update(&mut backend, 0.016)?;
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod config;
pub mod ecs;
pub mod foundation;
pub mod render;
pub mod scene;

pub use config::{ConfigError, EngineConfig};
pub use render::{RenderError, RenderResult};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::EngineConfig,
        ecs::{Component, Entity, World},
        foundation::{
            math::{Mat4, Vec3, Vec4},
            time::Timer,
        },
        render::{
            Camera, CameraEffects, Material, MeshHandle, PassStats, ProjectionType,
            RenderBackend, RenderResult, ResourceStore,
        },
        scene::{
            components::{
                Behaviour, CameraComponent, DirectionalLight, MeshComponent, Name, PointLight,
                ScriptComponent, SpotLight, Transform,
            },
            Scene,
        },
    };
}
