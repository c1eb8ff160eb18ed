//! Render pipeline orchestration.
//!
//! The pipeline owns the per-frame state (submission queue, light registry,
//! shadow caster reference, frame data) and the long-lived GPU resources the
//! passes share: the five built-in shaders and the two constant buffers.
//! A frame runs as `begin_frame` → submissions → `end_frame`, where
//! `end_frame` replays the queue through an explicit, ordered pass plan.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{
    ConstantBufferId, FrameBufferId, RenderBackend, ShaderId, TextureId, UniformValue,
    BINDING_POINT_FRAME_DATA, TEXTURE_SLOT_APPLY_BLEND, TEXTURE_SLOT_APPLY_SOURCE,
    TEXTURE_SLOT_SHADOW_MAP,
};
use crate::render::camera::{Camera, CameraEffects};
use crate::render::frame_buffer::FrameBuffer;
use crate::render::lights::{
    DirectionalLightData, LightRegistry, PointLightData, SpotLightData, LIGHTS_STORAGE_SIZE,
};
use crate::render::resources::{MeshHandle, ResourceStore};
use crate::render::shaders;
use crate::render::submission::SubmissionQueue;
use crate::render::RenderResult;

/// Index of the HDR buffer's bright-pass color attachment.
const HDR_BRIGHT_ATTACHMENT: u32 = 1;

/// Per-frame data uploaded to the frame constant buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FrameData {
    view_projection: [[f32; 4]; 4],
    camera_position: [f32; 3],
    exposure: f32,
    viewport_width: u32,
    viewport_height: u32,
    is_hdr: u32,
    time: f32,
}

/// Reference to this frame's shadow caster: the depth-only frame buffer a
/// directional light owns, plus the light-space view-projection.
#[derive(Debug, Clone, Copy)]
pub struct ShadowCaster {
    /// Depth-only frame buffer the shadow pass renders into.
    pub frame_buffer: FrameBufferId,
    /// Light-space view-projection matrix.
    pub view_projection: Mat4,
}

/// Per-frame pass invocation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    /// Shadow passes run.
    pub shadow: u32,
    /// Geometry + lighting passes run.
    pub geometry_lighting: u32,
    /// Stand-alone tone-mapping passes run.
    pub tone_mapping: u32,
    /// Bloom passes run (blur loop plus combine).
    pub bloom: u32,
    /// Individual gaussian blur iterations issued.
    pub blur_iterations: u32,
    /// Submissions skipped for a missing mesh, material or shader.
    pub skipped_submissions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Shadow,
    GeometryLighting,
    ToneMapping,
    Bloom,
}

#[derive(Debug, Clone, Copy)]
struct PassInputs {
    hdr: bool,
    bloom: bool,
    has_shadow_caster: bool,
}

/// The ordered pass plan. Every conditional lives here, not scattered
/// through the pass bodies.
const PASS_PLAN: [(Pass, fn(PassInputs) -> bool); 4] = [
    (Pass::Shadow, |i| i.has_shadow_caster),
    (Pass::GeometryLighting, |_| true),
    (Pass::ToneMapping, |i| i.hdr && !i.bloom),
    (Pass::Bloom, |i| i.hdr && i.bloom),
];

fn plan_passes(inputs: PassInputs) -> Vec<Pass> {
    PASS_PLAN
        .iter()
        .filter(|(_, enabled)| enabled(inputs))
        .map(|(pass, _)| *pass)
        .collect()
}

struct PipelineResources {
    shadow_shader: ShaderId,
    phong_shader: ShaderId,
    blur_shader: ShaderId,
    texture_add_shader: ShaderId,
    tone_mapping_shader: ShaderId,
    frame_data_buffer: ConstantBufferId,
    lights_buffer: ConstantBufferId,
}

/// Multi-pass frame renderer.
pub struct RenderPipeline {
    resources: Option<PipelineResources>,
    queue: SubmissionQueue,
    lights: LightRegistry,
    shadow_caster: Option<ShadowCaster>,
    ambient: Vec3,
    time: f32,
    stats: PassStats,
    frame_active: bool,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    /// Pipeline with no GPU resources yet; they are created on the first
    /// `end_frame`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resources: None,
            queue: SubmissionQueue::new(),
            lights: LightRegistry::new(),
            shadow_caster: None,
            ambient: Vec3::new(0.1, 0.1, 0.1),
            time: 0.0,
            stats: PassStats::default(),
            frame_active: false,
        }
    }

    /// Start a frame: drop all of the previous frame's submissions, lights
    /// and shadow caster reference.
    pub fn begin_frame(&mut self) {
        if self.frame_active {
            log::warn!("begin_frame called twice without end_frame");
        }
        self.queue.begin_frame();
        self.lights.begin_frame();
        self.shadow_caster = None;
        self.stats = PassStats::default();
        self.frame_active = true;
    }

    /// Record a mesh draw for this frame.
    pub fn submit(&mut self, mesh: MeshHandle, transform: Mat4) {
        self.queue.push(mesh, transform);
    }

    /// Record a point light for this frame.
    pub fn submit_point_light(&mut self, light: PointLightData) {
        self.lights.submit_point_light(light);
    }

    /// Record a spot light for this frame.
    pub fn submit_spot_light(&mut self, light: SpotLightData) {
        self.lights.submit_spot_light(light);
    }

    /// Record the directional light for this frame, optionally with its
    /// shadow caster.
    pub fn submit_directional_light(
        &mut self,
        light: DirectionalLightData,
        shadow_caster: Option<ShadowCaster>,
    ) {
        if self.lights.has_directional_light() {
            // The registry drops the duplicate; the caster reference must
            // stay with the first light too.
            self.lights.submit_directional_light(light);
            return;
        }
        self.lights.submit_directional_light(light);
        self.shadow_caster = shadow_caster;
    }

    /// Ambient light color applied before any light contributions.
    #[must_use]
    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    /// Set the ambient light color. Takes effect from the next frame the
    /// lighting pass runs.
    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.ambient = ambient;
    }

    /// Scene time in seconds, uploaded with the frame data for animated
    /// shaders.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Set the scene time uploaded with the next frame.
    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    /// Pass counters for the frame rendered by the last `end_frame`.
    #[must_use]
    pub fn stats(&self) -> PassStats {
        self.stats
    }

    /// Number of submissions recorded so far this frame.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.queue.len()
    }

    /// Render the frame through the pass plan into the camera's buffers.
    pub fn end_frame(
        &mut self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        store: &ResourceStore,
    ) -> RenderResult<()> {
        if !self.frame_active {
            log::warn!("end_frame called without begin_frame, skipping");
            return Ok(());
        }
        self.frame_active = false;
        self.ensure_resources(backend)?;

        let mut effects = camera.effects();
        if effects.bloom && camera.blur_frame_buffers().is_none() {
            log::warn!("bloom enabled but blur buffers are missing, skipping bloom");
            effects.bloom = false;
        }

        self.upload_frame_data(backend, camera, effects)?;
        let resources = self
            .resources
            .as_ref()
            .ok_or_else(|| crate::render::RenderError::BackendError("pipeline uninitialized".into()))?;
        self.lights.finalize(backend, resources.lights_buffer)?;

        let plan = plan_passes(PassInputs {
            hdr: effects.hdr,
            bloom: effects.bloom,
            has_shadow_caster: self.shadow_caster.is_some(),
        });
        log::trace!("frame pass plan: {plan:?}");

        for pass in plan {
            match pass {
                Pass::Shadow => self.shadow_pass(backend, store)?,
                Pass::GeometryLighting => {
                    self.geometry_lighting_pass(backend, camera, store, effects)?;
                }
                Pass::ToneMapping => self.tone_mapping_pass(backend, camera, effects)?,
                Pass::Bloom => self.bloom_pass(backend, camera, effects)?,
            }
        }
        Ok(())
    }

    /// Additively blend `source` (and optionally `blend`) into `target`
    /// with the texture-add shader.
    pub fn apply_texture(
        &mut self,
        backend: &mut dyn RenderBackend,
        source: TextureId,
        blend: Option<TextureId>,
        target: &FrameBuffer,
    ) -> RenderResult<()> {
        self.ensure_resources(backend)?;
        let shader = self.resources.as_ref().map(|r| r.texture_add_shader);
        let Some(shader) = shader else {
            return Ok(());
        };

        target.bind(backend);
        backend.bind_texture(source, TEXTURE_SLOT_APPLY_SOURCE);
        backend.set_uniform(
            shader,
            "u_Source",
            UniformValue::Int(TEXTURE_SLOT_APPLY_SOURCE as i32),
        );
        if let Some(blend) = blend {
            backend.bind_texture(blend, TEXTURE_SLOT_APPLY_BLEND);
            backend.set_uniform(
                shader,
                "u_Blend",
                UniformValue::Int(TEXTURE_SLOT_APPLY_BLEND as i32),
            );
        }
        backend.draw_fullscreen_quad(shader)?;
        target.unbind(backend);
        Ok(())
    }

    /// Free the pipeline's GPU resources.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(resources) = self.resources.take() {
            backend.free_shader(resources.shadow_shader);
            backend.free_shader(resources.phong_shader);
            backend.free_shader(resources.blur_shader);
            backend.free_shader(resources.texture_add_shader);
            backend.free_shader(resources.tone_mapping_shader);
            backend.free_constant_buffer(resources.frame_data_buffer);
            backend.free_constant_buffer(resources.lights_buffer);
        }
    }

    fn ensure_resources(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        if self.resources.is_some() {
            return Ok(());
        }
        log::debug!("compiling built-in pipeline shaders");
        let shadow_shader =
            backend.create_shader(&shaders::SHADOW_PASS.stages(), shaders::SHADOW_PASS.name)?;
        let phong_shader = backend.create_shader(
            &shaders::PHONG_LIGHTING.stages(),
            shaders::PHONG_LIGHTING.name,
        )?;
        let blur_shader =
            backend.create_shader(&shaders::GAUSSIAN_BLUR.stages(), shaders::GAUSSIAN_BLUR.name)?;
        let texture_add_shader =
            backend.create_shader(&shaders::TEXTURE_ADD.stages(), shaders::TEXTURE_ADD.name)?;
        let tone_mapping_shader =
            backend.create_shader(&shaders::TONE_MAPPING.stages(), shaders::TONE_MAPPING.name)?;
        let frame_data_buffer = backend.create_constant_buffer(std::mem::size_of::<FrameData>())?;
        let lights_buffer = backend.create_constant_buffer(LIGHTS_STORAGE_SIZE)?;

        self.resources = Some(PipelineResources {
            shadow_shader,
            phong_shader,
            blur_shader,
            texture_add_shader,
            tone_mapping_shader,
            frame_data_buffer,
            lights_buffer,
        });
        Ok(())
    }

    fn upload_frame_data(
        &self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        effects: CameraEffects,
    ) -> RenderResult<()> {
        let Some(resources) = self.resources.as_ref() else {
            return Ok(());
        };
        let data = FrameData {
            view_projection: (*camera.view_projection()).into(),
            camera_position: camera.position().into(),
            exposure: effects.exposure,
            viewport_width: camera.viewport_width(),
            viewport_height: camera.viewport_height(),
            is_hdr: u32::from(effects.hdr),
            time: self.time,
        };
        backend.update_constant_buffer(resources.frame_data_buffer, bytemuck::bytes_of(&data))?;
        backend.bind_constant_buffer(resources.frame_data_buffer, BINDING_POINT_FRAME_DATA);
        Ok(())
    }

    fn shadow_pass(
        &mut self,
        backend: &mut dyn RenderBackend,
        store: &ResourceStore,
    ) -> RenderResult<()> {
        let Some(caster) = self.shadow_caster else {
            return Ok(());
        };
        let Some(resources) = self.resources.as_ref() else {
            return Ok(());
        };
        let shader = resources.shadow_shader;

        backend.bind_frame_buffer(caster.frame_buffer);
        backend.clear_frame_buffer(caster.frame_buffer, crate::render::backend::ClearFlags::DEPTH);
        for submission in self.queue.submissions() {
            let Some(mesh) = store.mesh(submission.mesh) else {
                self.stats.skipped_submissions += 1;
                continue;
            };
            backend.set_uniform(
                shader,
                "u_MatrWVP",
                UniformValue::Mat4(caster.view_projection * submission.transform),
            );
            if let Err(err) = backend.draw_indexed(shader, mesh.vertex_array) {
                log::warn!("shadow draw failed: {err}");
                self.stats.skipped_submissions += 1;
            }
        }
        backend.unbind_frame_buffer(caster.frame_buffer);
        self.stats.shadow += 1;
        Ok(())
    }

    fn geometry_lighting_pass(
        &mut self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        store: &ResourceStore,
        effects: CameraEffects,
    ) -> RenderResult<()> {
        let Some(resources) = self.resources.as_ref() else {
            return Ok(());
        };
        let phong_shader = resources.phong_shader;

        // Geometry: fill the G-buffer with every surviving submission.
        let g_buffer = camera.g_buffer();
        g_buffer.bind(backend);
        g_buffer.clear(backend);
        for submission in self.queue.submissions() {
            let Some(mesh) = store.mesh(submission.mesh) else {
                self.stats.skipped_submissions += 1;
                continue;
            };
            let Some(material) = store.material(mesh.material) else {
                self.stats.skipped_submissions += 1;
                continue;
            };
            let Some(shader) = material.bind(backend) else {
                self.stats.skipped_submissions += 1;
                continue;
            };
            backend.set_uniform(
                shader,
                "u_MatrWVP",
                UniformValue::Mat4(camera.view_projection() * submission.transform),
            );
            backend.set_uniform(shader, "u_MatrW", UniformValue::Mat4(submission.transform));
            if let Err(err) = backend.draw_indexed(shader, mesh.vertex_array) {
                log::warn!("geometry draw failed: {err}");
                self.stats.skipped_submissions += 1;
            }
        }
        g_buffer.unbind(backend);

        // Lighting: full-screen phong over the G-buffer into the HDR or
        // main target.
        let target = if effects.hdr {
            camera.hdr_frame_buffer()
        } else {
            camera.main_frame_buffer()
        };
        target.bind(backend);
        target.clear(backend);

        const G_SAMPLERS: [&str; 6] = [
            "u_GPosition",
            "u_GNormal",
            "u_GColor",
            "u_GDiffuse",
            "u_GSpecular",
            "u_GShininess",
        ];
        for (slot, name) in G_SAMPLERS.iter().enumerate() {
            let slot = slot as u32;
            if let Some(texture) = g_buffer.color_attachment(backend, slot) {
                backend.bind_texture(texture, slot);
                backend.set_uniform(phong_shader, name, UniformValue::Int(slot as i32));
            }
        }
        if let Some(caster) = self.shadow_caster {
            if let Some(shadow_map) = backend.depth_attachment(caster.frame_buffer) {
                backend.bind_texture(shadow_map, TEXTURE_SLOT_SHADOW_MAP);
                backend.set_uniform(
                    phong_shader,
                    "u_ShadowMap",
                    UniformValue::Int(TEXTURE_SLOT_SHADOW_MAP as i32),
                );
            }
        }
        backend.set_uniform(
            phong_shader,
            "u_CameraPosition",
            UniformValue::Vec3(camera.position()),
        );
        backend.set_uniform(phong_shader, "u_Ambient", UniformValue::Vec3(self.ambient));
        backend.set_uniform(phong_shader, "u_IsHDR", UniformValue::Bool(effects.hdr));
        backend.draw_fullscreen_quad(phong_shader)?;
        target.unbind(backend);

        self.stats.geometry_lighting += 1;
        Ok(())
    }

    fn tone_mapping_pass(
        &mut self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        effects: CameraEffects,
    ) -> RenderResult<()> {
        let Some(resources) = self.resources.as_ref() else {
            return Ok(());
        };
        let shader = resources.tone_mapping_shader;

        let main = camera.main_frame_buffer();
        main.bind(backend);
        main.clear(backend);
        if let Some(hdr_color) = camera.hdr_frame_buffer().color_attachment(backend, 0) {
            backend.bind_texture(hdr_color, TEXTURE_SLOT_APPLY_SOURCE);
            backend.set_uniform(
                shader,
                "u_Source",
                UniformValue::Int(TEXTURE_SLOT_APPLY_SOURCE as i32),
            );
        }
        backend.set_uniform(shader, "u_IsBloom", UniformValue::Bool(false));
        backend.set_uniform(shader, "u_Exposure", UniformValue::Float(effects.exposure));
        backend.draw_fullscreen_quad(shader)?;
        main.unbind(backend);

        self.stats.tone_mapping += 1;
        Ok(())
    }

    /// Bloom: ping-pong gaussian blur of the HDR bright-pass extract, then
    /// a tone-mapped combine into the main buffer. The first iteration
    /// reads the bright-pass attachment; later ones read the other blur
    /// buffer. The horizontal flag starts true and alternates.
    fn bloom_pass(
        &mut self,
        backend: &mut dyn RenderBackend,
        camera: &Camera,
        effects: CameraEffects,
    ) -> RenderResult<()> {
        let (Some(resources), Some(blur_buffers)) =
            (self.resources.as_ref(), camera.blur_frame_buffers())
        else {
            return Ok(());
        };
        let blur_shader = resources.blur_shader;
        let tone_shader = resources.tone_mapping_shader;

        let bright = camera
            .hdr_frame_buffer()
            .color_attachment(backend, HDR_BRIGHT_ATTACHMENT);
        let mut horizontal = true;
        let mut last_written: Option<&FrameBuffer> = None;
        for iteration in 0..effects.bloom_amount {
            let target = &blur_buffers[(iteration % 2) as usize];
            let source = match last_written {
                None => bright,
                Some(previous) => previous.color_attachment(backend, 0),
            };
            let Some(source) = source else {
                break;
            };

            target.bind(backend);
            target.clear(backend);
            backend.bind_texture(source, TEXTURE_SLOT_APPLY_SOURCE);
            backend.set_uniform(
                blur_shader,
                "u_Source",
                UniformValue::Int(TEXTURE_SLOT_APPLY_SOURCE as i32),
            );
            backend.set_uniform(blur_shader, "u_IsHorizontal", UniformValue::Bool(horizontal));
            backend.draw_fullscreen_quad(blur_shader)?;
            target.unbind(backend);

            horizontal = !horizontal;
            last_written = Some(target);
            self.stats.blur_iterations += 1;
        }

        // Combine: tone-map the HDR color blended with the blur result (or
        // the raw bright pass when zero iterations were requested).
        let blend = match last_written {
            Some(buffer) => buffer.color_attachment(backend, 0),
            None => bright,
        };
        let main = camera.main_frame_buffer();
        main.bind(backend);
        main.clear(backend);
        if let Some(hdr_color) = camera.hdr_frame_buffer().color_attachment(backend, 0) {
            backend.bind_texture(hdr_color, TEXTURE_SLOT_APPLY_SOURCE);
            backend.set_uniform(
                tone_shader,
                "u_Source",
                UniformValue::Int(TEXTURE_SLOT_APPLY_SOURCE as i32),
            );
        }
        if let Some(blend) = blend {
            backend.bind_texture(blend, TEXTURE_SLOT_APPLY_BLEND);
            backend.set_uniform(
                tone_shader,
                "u_Blend",
                UniformValue::Int(TEXTURE_SLOT_APPLY_BLEND as i32),
            );
        }
        backend.set_uniform(tone_shader, "u_IsBloom", UniformValue::Bool(true));
        backend.set_uniform(tone_shader, "u_Exposure", UniformValue::Float(effects.exposure));
        backend.draw_fullscreen_quad(tone_shader)?;
        main.unbind(backend);

        self.stats.bloom += 1;
        Ok(())
    }
}
