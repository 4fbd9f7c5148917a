//! Procedural test geometry.

use tracing::warn;

use super::geometry::{IndexBuffer, MeshGeometry};
use crate::vertex::VertexRecord;

/// Largest subdivision count whose vertices are addressable with `u16`.
pub const MAX_PLANE_SUBDIVISIONS: usize = 255;

/// Generates a flat plane in XZ, centered on the origin, facing +Y.
///
/// # Arguments
/// * `subdivisions` - Quads per side, clamped to `1..=MAX_PLANE_SUBDIVISIONS`
/// * `size` - Edge length
///
/// # Returns
/// `(subdivisions + 1)^2` vertices and `subdivisions^2 * 6` 16-bit indices.
/// `uv0` spans the plane in `[0, 1]`, `uv1` is the mirrored layout.
#[must_use]
pub fn plane(subdivisions: usize, size: f32) -> MeshGeometry {
    let n = if subdivisions == 0 {
        warn!("plane: subdivisions must be > 0, clamping to 1");
        1
    } else if subdivisions > MAX_PLANE_SUBDIVISIONS {
        warn!(
            "plane: subdivisions {} exceed u16 indexing, clamping to {}",
            subdivisions, MAX_PLANE_SUBDIVISIONS
        );
        MAX_PLANE_SUBDIVISIONS
    } else {
        subdivisions
    };

    let row = n + 1;
    let step = size / n as f32;
    let half = size * 0.5;

    let mut vertices = Vec::with_capacity(row * row);
    for z in 0..row {
        for x in 0..row {
            let u = x as f32 / n as f32;
            let v = z as f32 / n as f32;
            vertices.push(
                VertexRecord::new([x as f32 * step - half, 0.0, z as f32 * step - half])
                    .with_uvs([u, v], [1.0 - u, 1.0 - v]),
            );
        }
    }

    let mut indices = Vec::with_capacity(n * n * 6);
    for z in 0..n {
        for x in 0..n {
            // row <= 256, so every corner index fits in u16
            let i0 = (z * row + x) as u16;
            let i1 = i0 + 1;
            let i2 = i0 + row as u16;
            let i3 = i2 + 1;
            // Counter-clockwise seen from +Y
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    MeshGeometry::new(vertices, IndexBuffer::U16(indices))
}
