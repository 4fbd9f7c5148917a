//! Smooth normal reconstruction.
//!
//! Displacement moves positions only, so the normals go stale. This pass
//! rebuilds them from the triangles: each face adds its unnormalized cross
//! product (weighted by twice its area) to its three corners, and every
//! corner is normalized at the end.

use glam::Vec3;

use super::geometry::{IndexBuffer, SubMeshDescriptor, Topology};
use crate::vertex::VertexRecord;

const MIN_LENGTH_SQUARED: f32 = 1e-20;

/// Rebuilds area-weighted smooth normals for every triangle submesh.
///
/// Vertices not referenced by any non-degenerate triangle keep their normal.
/// Triangles with an index past the vertex buffer are skipped.
pub fn recalculate_normals(
    vertices: &mut [VertexRecord],
    indices: &IndexBuffer,
    submeshes: &[SubMeshDescriptor],
) {
    let mut accumulated = vec![Vec3::ZERO; vertices.len()];
    let mut skipped = 0usize;

    for submesh in submeshes.iter().filter(|s| s.topology == Topology::Triangles) {
        let range: Vec<usize> = indices
            .iter()
            .skip(submesh.index_start)
            .take(submesh.index_count)
            .map(|i| i as usize)
            .collect();

        for tri in range.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
                skipped += 1;
                continue;
            }
            let pa = vertices[a].position_vec();
            let face = (vertices[b].position_vec() - pa).cross(vertices[c].position_vec() - pa);
            accumulated[a] += face;
            accumulated[b] += face;
            accumulated[c] += face;
        }
    }

    if skipped > 0 {
        tracing::warn!(
            "recalculate_normals: skipped {} triangles with out-of-range indices",
            skipped
        );
    }

    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        if normal.length_squared() > MIN_LENGTH_SQUARED {
            vertex.normal = normal.normalize().to_array();
        }
    }
}
