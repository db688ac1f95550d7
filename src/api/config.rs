//! Arena configuration.

use crate::gpu::traits::BufferUsage;
use crate::util::size::{kb, mb};

/// Configuration for a [`TransientResourceArena`](crate::TransientResourceArena).
#[derive(Debug, Clone)]
pub struct FrameArenaConfig {
    /// Upload ring capacity per frame slot (default: 1 MB)
    pub upload_bytes_per_frame: u64,

    /// Depth of frame pipelining (default: 3)
    pub frame_count: u32,

    /// Usage flags for the upload ring's buffer
    pub upload_usage: BufferUsage,
}

impl Default for FrameArenaConfig {
    fn default() -> Self {
        Self {
            upload_bytes_per_frame: mb(1),
            frame_count: 3,
            upload_usage: BufferUsage::UNIFORM_BUFFER
                | BufferUsage::STORAGE_BUFFER
                | BufferUsage::VERTEX_BUFFER
                | BufferUsage::INDEX_BUFFER
                | BufferUsage::TRANSFER_SRC,
        }
    }
}

impl FrameArenaConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            upload_bytes_per_frame: kb(64),
            frame_count: 2,
            ..Self::default()
        }
    }

    /// Create a config for scenes that stream a lot of per-frame data.
    pub fn high_throughput() -> Self {
        Self {
            upload_bytes_per_frame: mb(16),
            frame_count: 3,
            ..Self::default()
        }
    }

    /// Builder pattern: set upload bytes per frame.
    pub fn with_upload_bytes_per_frame(mut self, bytes: u64) -> Self {
        self.upload_bytes_per_frame = bytes;
        self
    }

    /// Builder pattern: set frame count.
    pub fn with_frame_count(mut self, count: u32) -> Self {
        self.frame_count = count;
        self
    }

    /// Builder pattern: set upload buffer usage.
    pub fn with_upload_usage(mut self, usage: BufferUsage) -> Self {
        self.upload_usage = usage;
        self
    }

    /// Total bytes the upload ring will allocate.
    pub fn upload_ring_size(&self) -> u64 {
        self.upload_bytes_per_frame.saturating_mul(self.frame_count as u64)
    }
}
