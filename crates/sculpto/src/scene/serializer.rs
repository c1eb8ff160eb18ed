//! Scene serialization to and from JSON.
//!
//! Each object becomes one record of optional component blocks. Mesh and
//! script components are runtime-only (their handles and function pointers
//! do not survive a round trip) and are skipped; everything else is
//! restored faithfully, including the scene's ambient color, camera
//! effects and shadow-map settings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foundation::math::Vec3;
use crate::render::backend::RenderBackend;
use crate::render::camera::{Camera, CameraEffects, ProjectionType};
use crate::render::RenderError;
use crate::scene::components::{
    CameraComponent, DirectionalLight, Name, PointLight, SpotLight, Transform,
};
use crate::scene::Scene;

/// Serialization and deserialization failures.
#[derive(Debug, Error)]
pub enum SceneSerializeError {
    /// Malformed or unwritable JSON.
    #[error("scene json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Scene file could not be read or written.
    #[error("scene file error: {0}")]
    Io(#[from] std::io::Error),
    /// A deserialized component needed a GPU resource that failed to
    /// materialize.
    #[error("scene resource error: {0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Serialize, Deserialize)]
struct TransformRecord {
    scale: Vec3,
    angles: Vec3,
    position: Vec3,
}

#[derive(Debug, Serialize, Deserialize)]
struct CameraRecord {
    is_orthographic: bool,
    field_of_view: f32,
    position: Vec3,
    focus: Vec3,
    up_direction: Vec3,
    viewport_width: u32,
    viewport_height: u32,
    is_hdr: bool,
    exposure: f32,
    is_bloom: bool,
    bloom_amount: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct PointLightRecord {
    color: Vec3,
    constant: f32,
    linear: f32,
    quadratic: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct SpotLightRecord {
    color: Vec3,
    direction: Vec3,
    inner_cutoff: f32,
    outer_cutoff: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct DirectionalLightRecord {
    color: Vec3,
    direction: Vec3,
    is_casting_shadows: bool,
    projection_box_size: f32,
    projection_box_depth: f32,
    shadow_map_width: u32,
    shadow_map_height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectRecord {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    transform: Option<TransformRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    camera: Option<CameraRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    point_light: Option<PointLightRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    spot_light: Option<SpotLightRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    directional_light: Option<DirectionalLightRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SceneRecord {
    ambient: Vec3,
    objects: Vec<ObjectRecord>,
}

/// Serialize the scene's global state and every object's persistent
/// components to pretty JSON.
pub fn save_scene(scene: &Scene) -> Result<String, SceneSerializeError> {
    let world = scene.world();
    let mut record = SceneRecord {
        ambient: scene.ambient(),
        objects: Vec::with_capacity(world.entity_count()),
    };
    for entity in world.entities() {
        let name = world
            .get_component::<Name>(entity)
            .map_or_else(|| "unnamed".to_owned(), |n| n.0.clone());

        let transform = world.get_component::<Transform>(entity).map(|t| TransformRecord {
            scale: t.scale,
            angles: t.angles,
            position: t.position,
        });
        let camera = world.get_component::<CameraComponent>(entity).map(|c| {
            let camera = &c.camera;
            let effects = camera.effects();
            CameraRecord {
                is_orthographic: camera.projection_type() == ProjectionType::Orthographic,
                field_of_view: camera.field_of_view(),
                position: camera.position(),
                focus: camera.focus(),
                up_direction: camera.up_direction(),
                viewport_width: camera.viewport_width(),
                viewport_height: camera.viewport_height(),
                is_hdr: effects.hdr,
                exposure: effects.exposure,
                is_bloom: effects.bloom,
                bloom_amount: effects.bloom_amount,
            }
        });
        let point_light = world.get_component::<PointLight>(entity).map(|l| PointLightRecord {
            color: l.color,
            constant: l.constant,
            linear: l.linear,
            quadratic: l.quadratic,
        });
        let spot_light = world.get_component::<SpotLight>(entity).map(|l| SpotLightRecord {
            color: l.color,
            direction: l.direction,
            inner_cutoff: l.inner_cutoff,
            outer_cutoff: l.outer_cutoff,
        });
        let directional_light =
            world
                .get_component::<DirectionalLight>(entity)
                .map(|l| DirectionalLightRecord {
                    color: l.color,
                    direction: l.direction,
                    is_casting_shadows: l.casts_shadows(),
                    projection_box_size: l.box_size(),
                    projection_box_depth: l.box_depth(),
                    shadow_map_width: l.shadow_map().map_or(1024, |m| m.props().width),
                    shadow_map_height: l.shadow_map().map_or(1024, |m| m.props().height),
                });

        record.objects.push(ObjectRecord {
            name,
            transform,
            camera,
            point_light,
            spot_light,
            directional_light,
        });
    }
    Ok(serde_json::to_string_pretty(&record)?)
}

/// Serialize the scene to a JSON file at `path`.
pub fn save_scene_to_file(
    scene: &Scene,
    path: impl AsRef<std::path::Path>,
) -> Result<(), SceneSerializeError> {
    let json = save_scene(scene)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a scene from the JSON file at `path` and instantiate it.
pub fn load_scene_from_file(
    path: impl AsRef<std::path::Path>,
    scene: &mut Scene,
    backend: &mut dyn RenderBackend,
) -> Result<(), SceneSerializeError> {
    let json = std::fs::read_to_string(path)?;
    load_scene(&json, scene, backend)
}

/// Instantiate the objects of a saved scene into `scene`.
///
/// Loaded objects are appended; existing ones stay. The first loaded camera
/// becomes the main camera when the scene has none yet.
pub fn load_scene(
    json: &str,
    scene: &mut Scene,
    backend: &mut dyn RenderBackend,
) -> Result<(), SceneSerializeError> {
    let record: SceneRecord = serde_json::from_str(json)?;
    log::info!("loading scene with {} objects", record.objects.len());
    scene.set_ambient(record.ambient);

    for object in record.objects {
        let entity = scene.create_object(&object.name);

        if let Some(t) = object.transform {
            if let Some(transform) = scene.world_mut().get_component_mut::<Transform>(entity) {
                transform.set_scale(t.scale);
                transform.set_angles(t.angles);
                transform.set_position(t.position);
            }
        }
        if let Some(c) = object.camera {
            let projection_type = if c.is_orthographic {
                ProjectionType::Orthographic
            } else {
                ProjectionType::Perspective
            };
            let effects = CameraEffects {
                hdr: c.is_hdr,
                exposure: c.exposure,
                bloom: c.is_bloom,
                bloom_amount: c.bloom_amount,
            };
            let mut camera = Camera::new(backend, projection_type, effects)?;
            camera.set_field_of_view(c.field_of_view);
            camera.set_view(c.position, c.focus, c.up_direction);
            camera.resize(backend, c.viewport_width, c.viewport_height)?;
            scene
                .world_mut()
                .add_component(entity, CameraComponent { camera });
            if scene.main_camera().is_none() {
                scene.set_main_camera(entity);
            }
        }
        if let Some(l) = object.point_light {
            scene.world_mut().add_component(
                entity,
                PointLight {
                    color: l.color,
                    constant: l.constant,
                    linear: l.linear,
                    quadratic: l.quadratic,
                },
            );
        }
        if let Some(l) = object.spot_light {
            scene.world_mut().add_component(
                entity,
                SpotLight {
                    color: l.color,
                    direction: l.direction,
                    inner_cutoff: l.inner_cutoff,
                    outer_cutoff: l.outer_cutoff,
                },
            );
        }
        if let Some(l) = object.directional_light {
            let mut light = DirectionalLight::new(l.direction, l.color);
            if l.is_casting_shadows {
                light.enable_shadows(
                    backend,
                    l.projection_box_size,
                    l.projection_box_depth,
                    l.shadow_map_width,
                    l.shadow_map_height,
                )?;
            }
            scene.world_mut().add_component(entity, light);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::headless::HeadlessBackend;

    fn populated_scene(backend: &mut HeadlessBackend) -> Scene {
        let mut scene = Scene::new();
        scene.set_ambient(Vec3::new(0.2, 0.2, 0.25));

        let camera_object = scene.create_object("main camera");
        let mut camera = Camera::new(
            backend,
            ProjectionType::Perspective,
            CameraEffects {
                hdr: true,
                exposure: 1.5,
                bloom: true,
                bloom_amount: 6,
            },
        )
        .unwrap();
        camera.set_view(
            Vec3::new(0.0, 3.0, 8.0),
            Vec3::zeros(),
            Vec3::new(0.0, 1.0, 0.0),
        );
        scene
            .world_mut()
            .add_component(camera_object, CameraComponent { camera });
        scene.set_main_camera(camera_object);

        let lamp = scene.create_object("lamp");
        scene
            .world_mut()
            .get_component_mut::<Transform>(lamp)
            .unwrap()
            .set_position(Vec3::new(0.0, 4.0, 0.0));
        scene
            .world_mut()
            .add_component(lamp, PointLight::new(Vec3::new(1.0, 0.8, 0.6)));

        let sun = scene.create_object("sun");
        let mut light = DirectionalLight::new(Vec3::new(0.1, -1.0, 0.5), Vec3::new(0.3, 0.3, 0.3));
        light.enable_shadows(backend, 12.0, 80.0, 2048, 2048).unwrap();
        scene.world_mut().add_component(sun, light);

        scene
    }

    #[test]
    fn save_then_load_restores_objects_and_lights() {
        let mut backend = HeadlessBackend::new();
        let source = populated_scene(&mut backend);
        let json = save_scene(&source).unwrap();

        let mut restored = Scene::new();
        load_scene(&json, &mut restored, &mut backend).unwrap();

        assert_eq!(restored.world().entity_count(), 3);
        assert!(restored.main_camera().is_some());
        assert!((restored.ambient() - Vec3::new(0.2, 0.2, 0.25)).norm() < 1e-6);

        let sun = restored
            .world()
            .entities()
            .find(|&e| {
                restored
                    .world()
                    .get_component::<Name>(e)
                    .is_some_and(|n| n.0 == "sun")
            })
            .unwrap();
        let light = restored
            .world()
            .get_component::<DirectionalLight>(sun)
            .unwrap();
        assert!(light.casts_shadows());
        assert_eq!(light.shadow_map().unwrap().props().width, 2048);
    }

    #[test]
    fn camera_effects_survive_the_round_trip() {
        let mut backend = HeadlessBackend::new();
        let source = populated_scene(&mut backend);
        let json = save_scene(&source).unwrap();

        let mut restored = Scene::new();
        load_scene(&json, &mut restored, &mut backend).unwrap();

        let camera_entity = restored.main_camera().unwrap();
        let camera = &restored
            .world()
            .get_component::<CameraComponent>(camera_entity)
            .unwrap()
            .camera;
        let effects = camera.effects();
        assert!(effects.hdr);
        assert!(effects.bloom);
        assert_eq!(effects.bloom_amount, 6);
        assert!((effects.exposure - 1.5).abs() < 1e-6);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let mut backend = HeadlessBackend::new();
        let mut scene = Scene::new();
        let result = load_scene("{ not json", &mut scene, &mut backend);
        assert!(matches!(result, Err(SceneSerializeError::Json(_))));
    }

    #[test]
    fn file_round_trip() {
        let mut backend = HeadlessBackend::new();
        let source = populated_scene(&mut backend);
        let path = std::env::temp_dir().join("sculpto_serializer_round_trip.json");

        save_scene_to_file(&source, &path).unwrap();
        let mut restored = Scene::new();
        load_scene_from_file(&path, &mut restored, &mut backend).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(restored.world().entity_count(), 3);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut backend = HeadlessBackend::new();
        let mut scene = Scene::new();
        let result = load_scene_from_file(
            std::env::temp_dir().join("sculpto_no_such_scene.json"),
            &mut scene,
            &mut backend,
        );
        assert!(matches!(result, Err(SceneSerializeError::Io(_))));
    }

    #[test]
    fn loading_appends_to_an_existing_scene() {
        let mut backend = HeadlessBackend::new();
        let source = populated_scene(&mut backend);
        let json = save_scene(&source).unwrap();

        let mut target = Scene::new();
        target.create_object("survivor");
        load_scene(&json, &mut target, &mut backend).unwrap();
        assert_eq!(target.world().entity_count(), 4);
    }
}
