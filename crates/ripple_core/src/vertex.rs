//! # Vertex Layout
//!
//! One vertex is 14 consecutive `f32`s (56 bytes), no padding:
//!
//! ```text
//! offset  0  position  [f32; 3]
//! offset 12  normal    [f32; 3]
//! offset 24  tangent   [f32; 4]
//! offset 40  uv0       [f32; 2]
//! offset 48  uv1       [f32; 2]
//! ```
//!
//! Because every field is an `f32` array the record is `Pod`, so a buffer of
//! N records can be viewed as `N * 56` bytes (or `N * 14` floats) for bulk
//! copies and upload, and indexed per vertex by the displacement job.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Size of one [`VertexRecord`] in bytes.
pub const VERTEX_STRIDE: usize = 56;

const _: () = assert!(std::mem::size_of::<VertexRecord>() == VERTEX_STRIDE);
const _: () = assert!(std::mem::align_of::<VertexRecord>() == 4);

/// A single mesh vertex with every attribute the displacement preserves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct VertexRecord {
    /// Object-space position.
    pub position: [f32; 3],
    /// Vertex normal.
    pub normal: [f32; 3],
    /// Tangent, `w` holds the bitangent sign.
    pub tangent: [f32; 4],
    /// Primary texture coordinates.
    pub uv0: [f32; 2],
    /// Secondary texture coordinates (lightmap).
    pub uv1: [f32; 2],
}

impl VertexRecord {
    /// Creates a vertex at `position` with an up normal and +X tangent.
    #[inline]
    #[must_use]
    pub const fn new(position: [f32; 3]) -> Self {
        Self {
            position,
            normal: [0.0, 1.0, 0.0],
            tangent: [1.0, 0.0, 0.0, 1.0],
            uv0: [0.0, 0.0],
            uv1: [0.0, 0.0],
        }
    }

    /// Returns this vertex with both UV channels set.
    #[inline]
    #[must_use]
    pub const fn with_uvs(mut self, uv0: [f32; 2], uv1: [f32; 2]) -> Self {
        self.uv0 = uv0;
        self.uv1 = uv1;
        self
    }

    /// Returns this vertex with a different normal.
    #[inline]
    #[must_use]
    pub const fn with_normal(mut self, normal: [f32; 3]) -> Self {
        self.normal = normal;
        self
    }

    /// Position as a vector.
    #[inline]
    #[must_use]
    pub fn position_vec(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Reinterprets a slice of records as raw bytes.
    #[inline]
    #[must_use]
    pub fn slice_as_bytes(vertices: &[Self]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }

    /// Reinterprets a slice of records as a flat float array.
    #[inline]
    #[must_use]
    pub fn slice_as_floats(vertices: &[Self]) -> &[f32] {
        bytemuck::cast_slice(vertices)
    }
}

/// The attributes of a [`VertexRecord`], in layout order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// 3 x f32 at offset 0.
    Position,
    /// 3 x f32 at offset 12.
    Normal,
    /// 4 x f32 at offset 24.
    Tangent,
    /// 2 x f32 at offset 40.
    TexCoord0,
    /// 2 x f32 at offset 48.
    TexCoord1,
}

impl VertexAttribute {
    /// All attributes in layout order.
    pub const ALL: [Self; 5] = [
        Self::Position,
        Self::Normal,
        Self::Tangent,
        Self::TexCoord0,
        Self::TexCoord1,
    ];

    /// Number of `f32` components.
    #[inline]
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            Self::Position | Self::Normal => 3,
            Self::Tangent => 4,
            Self::TexCoord0 | Self::TexCoord1 => 2,
        }
    }

    /// Byte offset inside a [`VertexRecord`].
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Self::Position => 0,
            Self::Normal => 12,
            Self::Tangent => 24,
            Self::TexCoord0 => 40,
            Self::TexCoord1 => 48,
        }
    }

    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        self.components() * std::mem::size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_layout_matches_attribute_table() {
        assert_eq!(offset_of!(VertexRecord, position), VertexAttribute::Position.offset());
        assert_eq!(offset_of!(VertexRecord, normal), VertexAttribute::Normal.offset());
        assert_eq!(offset_of!(VertexRecord, tangent), VertexAttribute::Tangent.offset());
        assert_eq!(offset_of!(VertexRecord, uv0), VertexAttribute::TexCoord0.offset());
        assert_eq!(offset_of!(VertexRecord, uv1), VertexAttribute::TexCoord1.offset());
    }

    #[test]
    fn test_attributes_are_contiguous() {
        let mut expected = 0;
        for attribute in VertexAttribute::ALL {
            assert_eq!(attribute.offset(), expected, "{attribute:?} is not packed");
            expected += attribute.size();
        }
        assert_eq!(expected, VERTEX_STRIDE);
    }

    #[test]
    fn test_flat_views() {
        let vertices = [
            VertexRecord::new([1.0, 2.0, 3.0]).with_uvs([0.25, 0.5], [0.75, 1.0]),
            VertexRecord::new([4.0, 5.0, 6.0]),
        ];

        assert_eq!(VertexRecord::slice_as_bytes(&vertices).len(), 2 * VERTEX_STRIDE);

        let floats = VertexRecord::slice_as_floats(&vertices);
        assert_eq!(floats.len(), 28);
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(&floats[10..14], &[0.25, 0.5, 0.75, 1.0]);
        assert_eq!(&floats[14..17], &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zeroed_record() {
        let zero: VertexRecord = Zeroable::zeroed();
        assert_eq!(zero, VertexRecord::default());
    }
}
