//! # Mesh Geometry
//!
//! The immutable payload a [`Mesh`](super::Mesh) publishes: vertex records,
//! an index buffer, submesh ranges and cached bounds.

use glam::Vec3;

use crate::error::{MeshError, MeshResult};
use crate::vertex::{VertexRecord, VERTEX_STRIDE};

/// Width of the entries in an index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    U16,
    /// 32-bit unsigned indices.
    U32,
}

/// Primitive assembly for a submesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Every three indices form a triangle.
    #[default]
    Triangles,
    /// Every two indices form a line.
    Lines,
    /// Every index is a point.
    Points,
}

/// Index data in its stored width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexBuffer {
    /// 16-bit indices.
    U16(Vec<u16>),
    /// 32-bit indices.
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Stored width.
    #[inline]
    #[must_use]
    pub const fn format(&self) -> IndexFormat {
        match self {
            Self::U16(_) => IndexFormat::U16,
            Self::U32(_) => IndexFormat::U32,
        }
    }

    /// Number of indices.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::U16(indices) => indices.len(),
            Self::U32(indices) => indices.len(),
        }
    }

    /// Returns true if there are no indices.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The indices as `u16`, if that is how they are stored.
    #[inline]
    #[must_use]
    pub fn as_u16(&self) -> Option<&[u16]> {
        match self {
            Self::U16(indices) => Some(indices),
            Self::U32(_) => None,
        }
    }

    /// Iterates every index widened to `u32`.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let (narrow, wide) = match self {
            Self::U16(indices) => (Some(indices.iter().map(|&i| u32::from(i))), None),
            Self::U32(indices) => (None, Some(indices.iter().copied())),
        };
        narrow.into_iter().flatten().chain(wide.into_iter().flatten())
    }

    /// Raw bytes in native endianness.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::U16(indices) => bytemuck::cast_slice(indices),
            Self::U32(indices) => bytemuck::cast_slice(indices),
        }
    }
}

/// A contiguous range of the index buffer drawn with one topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SubMeshDescriptor {
    /// First index of the range.
    pub index_start: usize,
    /// Number of indices in the range.
    pub index_count: usize,
    /// Primitive assembly.
    pub topology: Topology,
    /// Lowest vertex referenced by the range.
    pub first_vertex: usize,
    /// Number of vertices referenced by the range.
    pub vertex_count: usize,
}

impl SubMeshDescriptor {
    /// A triangle list covering the whole index and vertex buffers.
    #[inline]
    #[must_use]
    pub const fn triangles(index_count: usize, vertex_count: usize) -> Self {
        Self {
            index_start: 0,
            index_count,
            topology: Topology::Triangles,
            first_vertex: 0,
            vertex_count,
        }
    }

    /// One past the last index of the range.
    #[inline]
    #[must_use]
    pub const fn index_end(&self) -> usize {
        self.index_start + self.index_count
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Bounds {
    /// Smallest box containing every vertex position. Zero-sized for no vertices.
    #[must_use]
    pub fn from_vertices(vertices: &[VertexRecord]) -> Self {
        let Some(first) = vertices.first() else {
            return Self::default();
        };
        let seed = first.position_vec();
        let (min, max) = vertices.iter().fold((seed, seed), |(min, max), v| {
            let p = v.position_vec();
            (min.min(p), max.max(p))
        });
        Self { min, max }
    }

    /// Center of the box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half-size of the box along each axis.
    #[inline]
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns true if `point` lies inside or on the box.
    #[inline]
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Vertex and index data of a mesh, plus its submeshes and bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshGeometry {
    vertices: Vec<VertexRecord>,
    indices: IndexBuffer,
    submeshes: Vec<SubMeshDescriptor>,
    bounds: Bounds,
}

impl MeshGeometry {
    /// Creates geometry with one triangle-list submesh spanning all data.
    #[must_use]
    pub fn new(vertices: Vec<VertexRecord>, indices: IndexBuffer) -> Self {
        let submesh = SubMeshDescriptor::triangles(indices.len(), vertices.len());
        Self::with_submeshes(vertices, indices, vec![submesh])
    }

    /// Creates geometry with explicit submeshes. Bounds are computed.
    #[must_use]
    pub fn with_submeshes(
        vertices: Vec<VertexRecord>,
        indices: IndexBuffer,
        submeshes: Vec<SubMeshDescriptor>,
    ) -> Self {
        let bounds = Bounds::from_vertices(&vertices);
        Self {
            vertices,
            indices,
            submeshes,
            bounds,
        }
    }

    /// Creates geometry with caller-supplied bounds, skipping the scan.
    #[must_use]
    pub(crate) fn with_bounds(
        vertices: Vec<VertexRecord>,
        indices: IndexBuffer,
        submeshes: Vec<SubMeshDescriptor>,
        bounds: Bounds,
    ) -> Self {
        Self {
            vertices,
            indices,
            submeshes,
            bounds,
        }
    }

    /// Builds geometry from a packed vertex byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::MisalignedVertexBytes`] if `bytes` is not a whole
    /// number of [`VertexRecord`]s.
    pub fn from_vertex_bytes(bytes: &[u8], indices: IndexBuffer) -> MeshResult<Self> {
        if bytes.len() % VERTEX_STRIDE != 0 {
            return Err(MeshError::MisalignedVertexBytes {
                len: bytes.len(),
                stride: VERTEX_STRIDE,
            });
        }
        // Copies through an aligned buffer, the source may be byte-aligned.
        let vertices: Vec<VertexRecord> = bytemuck::pod_collect_to_vec(bytes);
        Ok(Self::new(vertices, indices))
    }

    /// Vertex records.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[VertexRecord] {
        &self.vertices
    }

    /// Mutable vertex records. Bounds are not refreshed.
    #[inline]
    pub(crate) fn vertices_mut(&mut self) -> &mut [VertexRecord] {
        &mut self.vertices
    }

    /// Index buffer.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &IndexBuffer {
        &self.indices
    }

    /// Submesh ranges.
    #[inline]
    #[must_use]
    pub fn submeshes(&self) -> &[SubMeshDescriptor] {
        &self.submeshes
    }

    /// Cached bounds.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Rescans vertex positions into the cached bounds.
    pub fn recalculate_bounds(&mut self) {
        self.bounds = Bounds::from_vertices(&self.vertices);
    }

    /// Number of vertices.
    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices.
    #[inline]
    #[must_use]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Checks every index and every submesh range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range index or submesh found.
    pub fn validate(&self) -> MeshResult<()> {
        let vertex_count = self.vertices.len();
        if let Some((position, index)) = self
            .indices
            .iter()
            .enumerate()
            .find(|&(_, index)| index as usize >= vertex_count)
        {
            return Err(MeshError::IndexOutOfRange {
                position,
                index,
                vertex_count,
            });
        }

        let index_count = self.indices.len();
        for (submesh, desc) in self.submeshes.iter().enumerate() {
            if desc.index_end() > index_count {
                return Err(MeshError::SubMeshOutOfRange {
                    submesh,
                    index_start: desc.index_start,
                    index_end: desc.index_end(),
                    index_count,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshGeometry {
        MeshGeometry::new(
            vec![
                VertexRecord::new([0.0, 0.0, 0.0]),
                VertexRecord::new([1.0, 0.0, 0.0]),
                VertexRecord::new([0.0, 2.0, -1.0]),
            ],
            IndexBuffer::U16(vec![0, 1, 2]),
        )
    }

    #[test]
    fn test_new_builds_single_submesh() {
        let geometry = triangle();
        assert_eq!(geometry.submeshes(), &[SubMeshDescriptor::triangles(3, 3)]);
        assert_eq!(geometry.vertex_count(), 3);
        assert_eq!(geometry.index_count(), 3);
    }

    #[test]
    fn test_bounds() {
        let bounds = triangle().bounds();
        assert_eq!(bounds.min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(bounds.center(), Vec3::new(0.5, 1.0, -0.5));
        assert_eq!(bounds.extents() * 2.0, bounds.max - bounds.min);
        assert!(bounds.contains(Vec3::new(0.5, 0.5, -0.5)));
        assert!(!bounds.contains(Vec3::new(0.5, 3.0, -0.5)));
        assert_eq!(Bounds::from_vertices(&[]), Bounds::default());
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let geometry = MeshGeometry::new(
            vec![VertexRecord::new([0.0; 3]); 3],
            IndexBuffer::U32(vec![0, 1, 7]),
        );
        assert_eq!(
            geometry.validate(),
            Err(MeshError::IndexOutOfRange {
                position: 2,
                index: 7,
                vertex_count: 3,
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_submesh() {
        let geometry = MeshGeometry::with_submeshes(
            vec![VertexRecord::new([0.0; 3]); 3],
            IndexBuffer::U16(vec![0, 1, 2]),
            vec![SubMeshDescriptor {
                index_start: 3,
                index_count: 3,
                ..SubMeshDescriptor::default()
            }],
        );
        assert!(matches!(
            geometry.validate(),
            Err(MeshError::SubMeshOutOfRange { submesh: 0, index_end: 6, .. })
        ));
    }

    #[test]
    fn test_from_vertex_bytes() {
        let source = triangle();
        let bytes = VertexRecord::slice_as_bytes(source.vertices()).to_vec();

        let rebuilt = MeshGeometry::from_vertex_bytes(&bytes, source.indices().clone())
            .expect("aligned buffer");
        assert_eq!(rebuilt, source);

        let err = MeshGeometry::from_vertex_bytes(&bytes[1..], IndexBuffer::U16(vec![]));
        assert_eq!(
            err,
            Err(MeshError::MisalignedVertexBytes {
                len: bytes.len() - 1,
                stride: VERTEX_STRIDE,
            })
        );
    }

    #[test]
    fn test_index_buffer_views() {
        let narrow = IndexBuffer::U16(vec![0, 1, 65535]);
        assert_eq!(narrow.format(), IndexFormat::U16);
        assert_eq!(narrow.iter().collect::<Vec<_>>(), vec![0, 1, 65535]);
        assert_eq!(narrow.as_bytes().len(), 6);

        let wide = IndexBuffer::U32(vec![70_000]);
        assert_eq!(wide.format(), IndexFormat::U32);
        assert!(wide.as_u16().is_none());
        assert_eq!(wide.iter().collect::<Vec<_>>(), vec![70_000]);
    }
}
