//! Mesh and material resources.
//!
//! Resources referenced from more than one place (submissions, scene
//! components) go through slot-map handles instead of shared pointers; the
//! store is the single owner of the backend objects and frees them
//! explicitly.

pub mod topology;

use crate::foundation::math::Vec3;
use crate::render::backend::{RenderBackend, ShaderId, TextureId, VertexArrayId};
use crate::render::RenderResult;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle to a mesh in a [`ResourceStore`].
    pub struct MeshHandle;

    /// Handle to a material in a [`ResourceStore`].
    pub struct MaterialHandle;
}

/// A single mesh vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Surface normal.
    pub normal: [f32; 3],
    /// Texture coordinates.
    pub tex_coords: [f32; 2],
}

impl Vertex {
    /// Construct a vertex from components.
    #[must_use]
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

/// Phong material parameters plus its shader and optional texture.
///
/// A material with no shader is a valid degraded state (for example after a
/// failed shader load): submissions using it are skipped instead of drawn.
#[derive(Debug, Clone)]
pub struct Material {
    /// Shader the material draws with; `None` skips the draw.
    pub shader: Option<ShaderId>,
    /// Optional diffuse texture.
    pub diffuse_texture: Option<TextureId>,
    /// Diffuse color.
    pub diffuse: Vec3,
    /// Specular color.
    pub specular: Vec3,
    /// Shininess exponent.
    pub shininess: f32,
}

impl Material {
    /// Single-color phong material.
    #[must_use]
    pub fn phong(shader: Option<ShaderId>, diffuse: Vec3) -> Self {
        Self {
            shader,
            diffuse_texture: None,
            diffuse,
            specular: Vec3::new(0.3, 0.3, 0.3),
            shininess: 32.0,
        }
    }

    /// Bind material state for drawing. Returns the shader to draw with,
    /// or `None` when the material cannot draw.
    pub fn bind(&self, backend: &mut dyn RenderBackend) -> Option<ShaderId> {
        let shader = self.shader?;
        if let Some(texture) = self.diffuse_texture {
            backend.bind_texture(texture, 0);
        }
        backend.set_uniform(
            shader,
            "u_Diffuse",
            crate::render::backend::UniformValue::Vec3(self.diffuse),
        );
        backend.set_uniform(
            shader,
            "u_Specular",
            crate::render::backend::UniformValue::Vec3(self.specular),
        );
        backend.set_uniform(
            shader,
            "u_Shininess",
            crate::render::backend::UniformValue::Float(self.shininess),
        );
        Some(shader)
    }
}

/// A mesh: vertex array plus the material it draws with.
#[derive(Debug, Clone, Copy)]
pub struct Mesh {
    /// Backend vertex array.
    pub vertex_array: VertexArrayId,
    /// Number of indices in the array.
    pub index_count: u32,
    /// Material handle.
    pub material: MaterialHandle,
}

/// Owner of all meshes and materials.
#[derive(Default)]
pub struct ResourceStore {
    meshes: SlotMap<MeshHandle, Mesh>,
    materials: SlotMap<MaterialHandle, Material>,
}

impl ResourceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material.
    pub fn create_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    /// Upload vertex data and register a mesh.
    pub fn create_mesh(
        &mut self,
        backend: &mut dyn RenderBackend,
        vertices: &[Vertex],
        indices: &[u32],
        material: MaterialHandle,
    ) -> RenderResult<MeshHandle> {
        let vertex_array = backend.create_vertex_array(vertices, indices)?;
        Ok(self.meshes.insert(Mesh {
            vertex_array,
            index_count: indices.len() as u32,
            material,
        }))
    }

    /// Look up a mesh.
    #[must_use]
    pub fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    /// Look up a material.
    #[must_use]
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    /// Look up a material mutably.
    pub fn material_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    /// Free a mesh and its backend vertex array.
    pub fn free_mesh(&mut self, backend: &mut dyn RenderBackend, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(handle) {
            backend.free_vertex_array(mesh.vertex_array);
        }
    }

    /// Number of live meshes.
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }
}
