//! Scene system: objects, components and the per-frame driver.
//!
//! A [`Scene`] owns the component [`World`], the render pipeline and the
//! resource store. `update` advances scripts at a fixed rate and renders
//! every call; `render` walks the world, gathers lights and mesh
//! submissions, and drives the pipeline through one frame.

pub mod components;
pub mod serializer;

use crate::ecs::{Entity, World};
use crate::foundation::math::Vec3;
use crate::foundation::time::UpdateAccumulator;
use crate::render::backend::RenderBackend;
use crate::render::pipeline::{PassStats, RenderPipeline, ShadowCaster};
use crate::render::resources::ResourceStore;
use crate::render::{DirectionalLightData, PointLightData, RenderResult, SpotLightData};

use components::{
    CameraComponent, DirectionalLight, MeshComponent, Name, PointLight, SpotLight,
    ScriptComponent, Transform,
};

/// Scripts tick at most once per this many seconds (~60 Hz).
const SCRIPT_UPDATE_THRESHOLD: f32 = 0.015;

/// A world of objects plus everything needed to draw them.
pub struct Scene {
    world: World,
    pipeline: RenderPipeline,
    resources: ResourceStore,
    main_camera: Option<Entity>,
    script_accumulator: UpdateAccumulator,
    elapsed_time: f32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: World::new(),
            pipeline: RenderPipeline::new(),
            resources: ResourceStore::new(),
            main_camera: None,
            script_accumulator: UpdateAccumulator::new(SCRIPT_UPDATE_THRESHOLD),
            elapsed_time: 0.0,
        }
    }

    /// Component world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Component world, mutable.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Mesh and material store.
    #[must_use]
    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    /// Mesh and material store, mutable.
    pub fn resources_mut(&mut self) -> &mut ResourceStore {
        &mut self.resources
    }

    /// Ambient light color.
    #[must_use]
    pub fn ambient(&self) -> Vec3 {
        self.pipeline.ambient()
    }

    /// Set the ambient light color, consumed from the next frame on.
    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.pipeline.set_ambient(ambient);
    }

    /// Seconds of scene time accumulated across `update` calls. Uploaded
    /// each frame as the shader time scalar.
    #[must_use]
    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    /// Pass counters from the most recent rendered frame.
    #[must_use]
    pub fn pass_stats(&self) -> PassStats {
        self.pipeline.stats()
    }

    /// Entity the scene renders through, if one was chosen.
    #[must_use]
    pub fn main_camera(&self) -> Option<Entity> {
        self.main_camera
    }

    /// Create a named object with a default transform.
    pub fn create_object(&mut self, name: &str) -> Entity {
        let entity = self.world.create_entity();
        let name = if name.is_empty() { "unnamed" } else { name };
        self.world.add_component(entity, Name(name.to_owned()));
        self.world.add_component(entity, Transform::default());
        entity
    }

    /// First object whose [`Name`] matches, in creation order.
    #[must_use]
    pub fn find_object(&self, name: &str) -> Option<Entity> {
        self.world.entities().find(|&entity| {
            self.world
                .get_component::<Name>(entity)
                .is_some_and(|n| n.0 == name)
        })
    }

    /// Choose the camera entity the scene renders through. The entity must
    /// carry a [`CameraComponent`]; otherwise the previous choice stays.
    pub fn set_main_camera(&mut self, entity: Entity) {
        if self.world.has_component::<CameraComponent>(entity) {
            self.main_camera = Some(entity);
        } else {
            log::warn!("entity {} has no camera component", entity.id());
        }
    }

    /// Look the camera object up by name and make it the main camera.
    pub fn set_main_camera_by_name(&mut self, name: &str) {
        match self.find_object(name) {
            Some(entity) => self.set_main_camera(entity),
            None => log::warn!("no object named '{name}'"),
        }
    }

    /// Advance the scene by `dt` seconds: run scripts at the fixed script
    /// rate, then render one frame.
    pub fn update(&mut self, backend: &mut dyn RenderBackend, dt: f32) -> RenderResult<()> {
        self.elapsed_time += dt;
        self.pipeline.set_time(self.elapsed_time);
        if self.script_accumulator.tick(dt) {
            self.run_scripts(dt);
        }
        self.render(backend)
    }

    /// Resize the main camera's viewport and every buffer hanging off it.
    pub fn on_viewport_resize(
        &mut self,
        backend: &mut dyn RenderBackend,
        width: u32,
        height: u32,
    ) -> RenderResult<()> {
        if width == 0 || height == 0 {
            log::debug!("ignoring zero-sized viewport resize");
            return Ok(());
        }
        let Some(main) = self.main_camera else {
            return Ok(());
        };
        if let Some(camera) = self.world.get_component_mut::<CameraComponent>(main) {
            camera.camera.resize(backend, width, height)?;
        }
        Ok(())
    }

    /// Render one frame through the main camera.
    pub fn render(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        let Some(main) = self.main_camera else {
            log::warn!("scene has no main camera, skipping frame");
            return Ok(());
        };
        let Some(camera) = self.world.get_component::<CameraComponent>(main) else {
            log::warn!("main camera entity lost its camera component, skipping frame");
            return Ok(());
        };
        let camera = &camera.camera;

        camera.main_frame_buffer().clear(backend);
        self.pipeline.begin_frame();

        for entity in self.world.entities() {
            let transform = self.world.get_component::<Transform>(entity);

            if let (Some(light), Some(transform)) =
                (self.world.get_component::<PointLight>(entity), transform)
            {
                self.pipeline.submit_point_light(PointLightData::new(
                    transform.position,
                    light.color,
                    light.constant,
                    light.linear,
                    light.quadratic,
                ));
            }
            if let (Some(light), Some(transform)) =
                (self.world.get_component::<SpotLight>(entity), transform)
            {
                self.pipeline.submit_spot_light(SpotLightData::new(
                    transform.position,
                    light.direction,
                    light.color,
                    light.inner_cutoff.to_radians(),
                    light.outer_cutoff.to_radians(),
                ));
            }
            if let Some(light) = self.world.get_component::<DirectionalLight>(entity) {
                let caster = light.shadow_map().map(|shadow_map| ShadowCaster {
                    frame_buffer: shadow_map.id(),
                    view_projection: light.view_projection(),
                });
                let view_projection = light.view_projection();
                self.pipeline.submit_directional_light(
                    DirectionalLightData::new(
                        light.direction,
                        light.color,
                        caster.as_ref().map(|_| &view_projection),
                    ),
                    caster,
                );
            }
            if let (Some(mesh), Some(transform)) = (
                self.world.get_component::<MeshComponent>(entity),
                transform,
            ) {
                self.pipeline.submit(mesh.mesh, *transform.matrix());
            }
        }

        self.pipeline.end_frame(backend, camera, &self.resources)
    }

    fn run_scripts(&mut self, dt: f32) {
        let entities: Vec<Entity> = self.world.entities().collect();
        for entity in entities {
            // Take-and-put-back so the behaviour can mutate the world
            // without aliasing its own component.
            if let Some(mut script) = self.world.remove_component::<ScriptComponent>(entity) {
                script.update(entity, &mut self.world, dt);
                self.world.add_component(entity, script);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::backend::headless::HeadlessBackend;
    use crate::render::camera::{Camera, CameraEffects, ProjectionType};
    use crate::render::resources::{topology, Material};
    use components::Behaviour;

    fn scene_with_camera(backend: &mut HeadlessBackend) -> (Scene, Entity) {
        let mut scene = Scene::new();
        let camera_object = scene.create_object("camera");
        let camera = Camera::new(backend, ProjectionType::Perspective, CameraEffects::default())
            .unwrap();
        scene
            .world_mut()
            .add_component(camera_object, CameraComponent { camera });
        scene.set_main_camera(camera_object);
        (scene, camera_object)
    }

    fn add_cube(scene: &mut Scene, backend: &mut HeadlessBackend, position: Vec3) -> Entity {
        let shader = backend
            .create_shader(
                &crate::render::shaders::PHONG_LIGHTING.stages(),
                "cube_material",
            )
            .unwrap();
        let material = scene
            .resources_mut()
            .create_material(Material::phong(Some(shader), Vec3::new(0.7, 0.7, 0.7)));
        let mesh = scene
            .resources_mut()
            .create_mesh(
                backend,
                &topology::cube(1.0),
                &topology::cube_indices(),
                material,
            )
            .unwrap();
        let entity = scene.create_object("cube");
        scene
            .world_mut()
            .get_component_mut::<Transform>(entity)
            .unwrap()
            .set_position(position);
        scene
            .world_mut()
            .add_component(entity, MeshComponent { mesh });
        entity
    }

    #[test]
    fn scene_clock_accumulates_across_updates() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);

        scene.update(&mut backend, 0.01).unwrap();
        scene.update(&mut backend, 0.02).unwrap();
        assert!((scene.elapsed_time() - 0.03).abs() < 1e-6);
    }

    #[test]
    fn update_renders_every_call() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);
        add_cube(&mut scene, &mut backend, Vec3::zeros());

        for _ in 0..3 {
            scene.update(&mut backend, 0.005).unwrap();
            assert_eq!(scene.pass_stats().geometry_lighting, 1);
        }
    }

    #[test]
    fn scripts_tick_at_the_fixed_rate() {
        use std::sync::atomic::{AtomicU32, Ordering};
        static TICKS: AtomicU32 = AtomicU32::new(0);

        struct Ticker;
        impl Behaviour for Ticker {
            fn on_update(&mut self, _entity: Entity, _world: &mut World, _dt: f32) {
                TICKS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);
        let object = scene.create_object("scripted");
        scene
            .world_mut()
            .add_component(object, ScriptComponent::new(|| Box::new(Ticker)));

        TICKS.store(0, Ordering::SeqCst);
        // Four 10 ms frames cross the 15 ms threshold twice, not four times.
        for _ in 0..4 {
            scene.update(&mut backend, 0.01).unwrap();
        }
        assert_eq!(TICKS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn scripts_can_mutate_other_components() {
        struct Spinner;
        impl Behaviour for Spinner {
            fn on_update(&mut self, entity: Entity, world: &mut World, _dt: f32) {
                if let Some(transform) = world.get_component_mut::<Transform>(entity) {
                    let angles = transform.angles + Vec3::new(0.0, 1.0, 0.0);
                    transform.set_angles(angles);
                }
            }
        }

        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);
        let object = add_cube(&mut scene, &mut backend, Vec3::zeros());
        scene
            .world_mut()
            .add_component(object, ScriptComponent::new(|| Box::new(Spinner)));

        scene.update(&mut backend, 0.02).unwrap();
        let transform = scene.world().get_component::<Transform>(object).unwrap();
        assert!((transform.angles.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn lights_are_gathered_from_components() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);
        add_cube(&mut scene, &mut backend, Vec3::zeros());

        let lamp = scene.create_object("lamp");
        scene
            .world_mut()
            .add_component(lamp, PointLight::new(Vec3::new(1.0, 0.9, 0.8)));

        let sun = scene.create_object("sun");
        scene.world_mut().add_component(
            sun,
            DirectionalLight::new(Vec3::new(0.1, -1.0, 0.5), Vec3::new(0.3, 0.3, 0.3)),
        );

        scene.render(&mut backend).unwrap();
        // No shadow map on the sun, so no shadow pass.
        assert_eq!(scene.pass_stats().shadow, 0);
        assert_eq!(scene.pass_stats().geometry_lighting, 1);
    }

    #[test]
    fn shadow_casting_sun_triggers_the_shadow_pass() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);
        add_cube(&mut scene, &mut backend, Vec3::zeros());

        let sun = scene.create_object("sun");
        let mut light =
            DirectionalLight::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        light
            .enable_shadows(&mut backend, 10.0, 100.0, 1024, 1024)
            .unwrap();
        scene.world_mut().add_component(sun, light);

        scene.render(&mut backend).unwrap();
        assert_eq!(scene.pass_stats().shadow, 1);
    }

    #[test]
    fn scene_without_camera_skips_the_frame() {
        let mut backend = HeadlessBackend::new();
        let mut scene = Scene::new();
        scene.render(&mut backend).unwrap();
        assert_eq!(scene.pass_stats(), PassStats::default());
    }

    #[test]
    fn set_main_camera_rejects_cameraless_entities() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, camera_object) = scene_with_camera(&mut backend);
        let plain = scene.create_object("plain");

        scene.set_main_camera(plain);
        assert_eq!(scene.main_camera(), Some(camera_object));
    }

    #[test]
    fn viewport_resize_reaches_the_main_camera() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, camera_object) = scene_with_camera(&mut backend);

        scene.on_viewport_resize(&mut backend, 1280, 720).unwrap();
        let camera = scene
            .world()
            .get_component::<CameraComponent>(camera_object)
            .unwrap();
        assert_eq!(camera.camera.viewport_width(), 1280);
        assert_eq!(camera.camera.viewport_height(), 720);
    }

    #[test]
    fn main_camera_can_be_chosen_by_name() {
        let mut backend = HeadlessBackend::new();
        let mut scene = Scene::new();
        let camera_object = scene.create_object("editor camera");
        let camera = Camera::new(&mut backend, ProjectionType::Perspective, CameraEffects::default())
            .unwrap();
        scene
            .world_mut()
            .add_component(camera_object, CameraComponent { camera });

        scene.set_main_camera_by_name("nobody");
        assert_eq!(scene.main_camera(), None);

        scene.set_main_camera_by_name("editor camera");
        assert_eq!(scene.main_camera(), Some(camera_object));
    }

    #[test]
    fn create_object_names_the_unnamed() {
        let mut scene = Scene::new();
        let anonymous = scene.create_object("");
        let name = scene.world().get_component::<Name>(anonymous).unwrap();
        assert_eq!(name.0, "unnamed");
    }

    #[test]
    fn mesh_without_transform_is_not_submitted() {
        let mut backend = HeadlessBackend::new();
        let (mut scene, _) = scene_with_camera(&mut backend);
        let cube = add_cube(&mut scene, &mut backend, Vec3::zeros());
        scene.world_mut().remove_component::<Transform>(cube);

        scene.render(&mut backend).unwrap();
        // The walk never submits it, so nothing is skipped either.
        assert_eq!(scene.pass_stats().skipped_submissions, 0);
    }
}
