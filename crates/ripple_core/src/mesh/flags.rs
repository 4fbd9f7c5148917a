//! Publish flags.

use bitflags::bitflags;

bitflags! {
    /// Work a publish may skip.
    ///
    /// An empty set means the mesh validates indices, rescans bounds and
    /// notifies subscribers on every publish.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct UpdateFlags: u32 {
        /// Do not check indices and submesh ranges against the buffers.
        const DONT_VALIDATE_INDICES = 1 << 0;
        /// Keep the previous bounds instead of rescanning positions.
        const DONT_RECALCULATE_BOUNDS = 1 << 1;
        /// Do not send [`MeshEvent`](super::MeshEvent)s to subscribers.
        const DONT_NOTIFY_MESH_USERS = 1 << 2;
        /// Everything above. The caller decides when to pay for recomputation.
        const FAST_PATH = Self::DONT_VALIDATE_INDICES.bits()
            | Self::DONT_RECALCULATE_BOUNDS.bits()
            | Self::DONT_NOTIFY_MESH_USERS.bits();
    }
}
