//! Built-in mesh topologies.
//!
//! Unit primitives used by the sandbox and tests; real scenes load meshes
//! through the asset layer.

use super::Vertex;

/// Vertices of an axis-aligned cube centered at the origin with the given
/// edge length. Faces carry flat normals, so vertices are not shared
/// between faces.
#[must_use]
pub fn cube(size: f32) -> Vec<Vertex> {
    let h = size / 2.0;
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // (normal, right axis, up axis) per face
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    for (normal, right, up) in faces {
        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = [
                h * (normal[0] + right[0] * u + up[0] * v),
                h * (normal[1] + right[1] * u + up[1] * v),
                h * (normal[2] + right[2] * u + up[2] * v),
            ];
            vertices.push(Vertex::new(
                position,
                normal,
                [(u + 1.0) / 2.0, (v + 1.0) / 2.0],
            ));
        }
    }
    vertices
}

/// Index list matching [`cube`], two triangles per face.
#[must_use]
pub fn cube_indices() -> Vec<u32> {
    let mut indices = Vec::with_capacity(36);
    for face in 0..6u32 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    indices
}

/// Vertices of a plane in the XZ plane with the given half extent, normal
/// pointing up.
#[must_use]
pub fn plane(half_extent: f32) -> Vec<Vertex> {
    let e = half_extent;
    vec![
        Vertex::new([-e, 0.0, -e], [0.0, 1.0, 0.0], [0.0, 0.0]),
        Vertex::new([e, 0.0, -e], [0.0, 1.0, 0.0], [1.0, 0.0]),
        Vertex::new([e, 0.0, e], [0.0, 1.0, 0.0], [1.0, 1.0]),
        Vertex::new([-e, 0.0, e], [0.0, 1.0, 0.0], [0.0, 1.0]),
    ]
}

/// Index list matching [`plane`].
#[must_use]
pub fn plane_indices() -> Vec<u32> {
    vec![0, 2, 1, 0, 3, 2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_36_indices() {
        assert_eq!(cube(1.0).len(), 24);
        let indices = cube_indices();
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| i < 24));
    }

    #[test]
    fn cube_positions_on_surface() {
        for v in cube(2.0) {
            let max = v
                .position
                .iter()
                .fold(0.0f32, |acc, &c| acc.max(c.abs()));
            assert!((max - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn plane_indices_in_range() {
        assert!(plane_indices().iter().all(|&i| (i as usize) < plane(1.0).len()));
    }
}
