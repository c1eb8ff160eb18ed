//! Demo scene: a cornell-box-style room rendered headlessly.
//!
//! Builds a small scene (room planes, two cubes, a point light, a
//! shadow-casting sun), runs it for a fixed number of frames with HDR and
//! bloom enabled, and logs the per-frame pass counters. Useful as a smoke
//! test of the whole pipeline and as a usage example.

use sculpto::prelude::*;
use sculpto::render::backend::headless::HeadlessBackend;
use sculpto::render::resources::topology;
use sculpto::render::shaders;

const FRAMES: u32 = 120;
const FRAME_DT: f32 = 1.0 / 60.0;

struct Spinner;

impl Behaviour for Spinner {
    fn on_update(&mut self, entity: Entity, world: &mut World, dt: f32) {
        if let Some(transform) = world.get_component_mut::<Transform>(entity) {
            let angles = transform.angles + Vec3::new(0.0, 45.0 * dt, 0.0);
            transform.set_angles(angles);
        }
    }
}

fn add_mesh_object(
    scene: &mut Scene,
    backend: &mut HeadlessBackend,
    name: &str,
    vertices: &[sculpto::render::Vertex],
    indices: &[u32],
    diffuse: Vec3,
    position: Vec3,
) -> Result<Entity, sculpto::RenderError> {
    let shader = backend.create_shader(&shaders::PHONG_LIGHTING.stages(), "geometry_material")?;
    let material = scene
        .resources_mut()
        .create_material(Material::phong(Some(shader), diffuse));
    let mesh = scene
        .resources_mut()
        .create_mesh(backend, vertices, indices, material)?;
    let entity = scene.create_object(name);
    scene
        .world_mut()
        .get_component_mut::<Transform>(entity)
        .expect("create_object adds a transform")
        .set_position(position);
    scene
        .world_mut()
        .add_component(entity, MeshComponent { mesh });
    Ok(entity)
}

fn build_scene(
    backend: &mut HeadlessBackend,
    config: &EngineConfig,
) -> Result<Scene, Box<dyn std::error::Error>> {
    let mut scene = Scene::new();
    scene.set_ambient(Vec3::new(0.12, 0.12, 0.15));

    let camera_object = scene.create_object("main camera");
    let mut camera = Camera::new(
        backend,
        ProjectionType::Perspective,
        config.camera_effects(),
    )?;
    camera.set_view(
        Vec3::new(0.0, 3.0, 9.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    );
    camera.resize(backend, config.window.width, config.window.height)?;
    // The demo always shows the full pipeline, whatever the config says.
    camera.set_hdr(backend, true)?;
    camera.set_bloom(backend, true)?;
    scene
        .world_mut()
        .add_component(camera_object, CameraComponent { camera });
    scene.set_main_camera(camera_object);

    add_mesh_object(
        &mut scene,
        backend,
        "floor",
        &topology::plane(6.0),
        &topology::plane_indices(),
        Vec3::new(0.8, 0.8, 0.8),
        Vec3::zeros(),
    )?;
    let spinning_cube = add_mesh_object(
        &mut scene,
        backend,
        "spinning cube",
        &topology::cube(1.0),
        &topology::cube_indices(),
        Vec3::new(0.9, 0.3, 0.25),
        Vec3::new(-1.5, 0.5, 0.0),
    )?;
    scene
        .world_mut()
        .add_component(spinning_cube, ScriptComponent::new(|| Box::new(Spinner)));
    add_mesh_object(
        &mut scene,
        backend,
        "tall cube",
        &topology::cube(1.0),
        &topology::cube_indices(),
        Vec3::new(0.25, 0.4, 0.9),
        Vec3::new(1.5, 1.0, -1.0),
    )?;

    let lamp = scene.create_object("lamp");
    scene
        .world_mut()
        .get_component_mut::<Transform>(lamp)
        .expect("create_object adds a transform")
        .set_position(Vec3::new(0.0, 4.0, 2.0));
    scene
        .world_mut()
        .add_component(lamp, PointLight::new(Vec3::new(1.0, 0.9, 0.7)));

    let sun = scene.create_object("sun");
    let mut sun_light = DirectionalLight::new(Vec3::new(0.2, -1.0, 0.4), Vec3::new(0.4, 0.4, 0.4));
    sun_light.enable_shadows(backend, 12.0, 100.0, 2048, 2048)?;
    scene.world_mut().add_component(sun, sun_light);

    Ok(scene)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sandbox.toml".to_owned());
    let config = EngineConfig::load(&config_path)?;

    let mut backend = HeadlessBackend::new();
    backend.set_clear_color(config.clear_color());
    backend.set_vsync(config.render.vsync);
    backend.set_wireframe(config.render.wireframe);

    let mut scene = build_scene(&mut backend, &config)?;

    log::info!(
        "rendering {FRAMES} frames at {}x{}",
        config.window.width,
        config.window.height
    );
    let mut timer = Timer::new();
    for frame in 0..FRAMES {
        scene.update(&mut backend, FRAME_DT)?;
        timer.update();
        if frame == 0 {
            log::info!("first frame pass stats: {:?}", scene.pass_stats());
        }
    }
    log::info!("final frame pass stats: {:?}", scene.pass_stats());
    log::info!(
        "simulated {:.2}s of scene time in {:.1}ms of wall time ({} frames)",
        scene.elapsed_time(),
        timer.total_time() * 1000.0,
        timer.frame_count()
    );
    Ok(())
}
