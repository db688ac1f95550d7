//! Arena statistics.

use super::tag::FrameArenaUploadKind;
use crate::util::size::format_bytes;

/// Statistics for one frame slot, reset when the slot begins again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameArenaStats {
    /// Bytes handed out from the upload ring.
    pub upload_bytes: u64,

    /// Number of upload allocations.
    pub upload_allocations: u32,

    /// Upload bytes per [`FrameArenaUploadKind`], indexed by `kind.index()`.
    pub upload_bytes_by_kind: [u64; FrameArenaUploadKind::COUNT],

    /// Upload allocations per [`FrameArenaUploadKind`].
    pub upload_allocations_by_kind: [u32; FrameArenaUploadKind::COUNT],

    /// Bytes of transient buffers created this frame.
    pub transient_buffer_bytes: u64,

    /// Number of transient buffers created this frame.
    pub transient_buffer_count: u32,

    /// Texel volume of images created this frame.
    pub transient_image_bytes: u64,

    /// Number of images created this frame.
    pub transient_image_count: u32,

    /// Images this frame that reused an existing alias block.
    pub image_alias_reuses: u32,
}

impl FrameArenaStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload bytes recorded for one kind.
    pub fn upload_bytes_for(&self, kind: FrameArenaUploadKind) -> u64 {
        self.upload_bytes_by_kind[kind.index()]
    }

    /// Upload allocations recorded for one kind.
    pub fn upload_allocations_for(&self, kind: FrameArenaUploadKind) -> u32 {
        self.upload_allocations_by_kind[kind.index()]
    }

    pub(crate) fn record_upload(&mut self, kind: FrameArenaUploadKind, bytes: u64) {
        self.upload_bytes += bytes;
        self.upload_allocations += 1;
        self.upload_bytes_by_kind[kind.index()] += bytes;
        self.upload_allocations_by_kind[kind.index()] += 1;
    }
}

impl std::fmt::Display for FrameArenaStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Frame Arena Statistics:")?;
        writeln!(
            f,
            "  Uploads:           {} ({} allocations)",
            format_bytes(self.upload_bytes),
            self.upload_allocations
        )?;
        for kind in FrameArenaUploadKind::ALL {
            let count = self.upload_allocations_for(kind);
            if count > 0 {
                writeln!(
                    f,
                    "    {:<15} {} ({})",
                    kind.name(),
                    format_bytes(self.upload_bytes_for(kind)),
                    count
                )?;
            }
        }
        writeln!(
            f,
            "  Transient buffers: {} ({})",
            format_bytes(self.transient_buffer_bytes),
            self.transient_buffer_count
        )?;
        writeln!(
            f,
            "  Transient images:  {} ({})",
            format_bytes(self.transient_image_bytes),
            self.transient_image_count
        )?;
        writeln!(f, "  Alias reuses:      {}", self.image_alias_reuses)?;
        Ok(())
    }
}

/// Cumulative statistics for everything the arena currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameArenaResidentStats {
    /// Bytes of live transient buffers.
    pub buffer_bytes: u64,

    /// Number of live transient buffers.
    pub buffer_count: u32,

    /// Texel volume (width x height x depth) of live images.
    pub image_bytes: u64,

    /// Number of live images.
    pub image_count: u32,

    /// Number of live alias blocks.
    pub alias_block_count: u32,

    /// Bytes held by live alias blocks.
    pub alias_block_bytes: u64,

    /// Images that were bound into an existing alias block, since init.
    pub image_alias_reuses: u64,

    /// High water mark of `image_bytes`.
    pub peak_image_bytes: u64,
}

impl FrameArenaResidentStats {
    /// Create empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_image(&mut self, bytes: u64) {
        self.image_bytes += bytes;
        self.image_count += 1;
        self.peak_image_bytes = self.peak_image_bytes.max(self.image_bytes);
    }

    pub(crate) fn remove_image(&mut self, bytes: u64) {
        self.image_bytes = self.image_bytes.saturating_sub(bytes);
        self.image_count = self.image_count.saturating_sub(1);
    }

    pub(crate) fn add_buffer(&mut self, bytes: u64) {
        self.buffer_bytes += bytes;
        self.buffer_count += 1;
    }

    pub(crate) fn remove_buffer(&mut self, bytes: u64) {
        self.buffer_bytes = self.buffer_bytes.saturating_sub(bytes);
        self.buffer_count = self.buffer_count.saturating_sub(1);
    }
}

impl std::fmt::Display for FrameArenaResidentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Frame Arena Resident Statistics:")?;
        writeln!(f, "  Buffers:      {} ({})", format_bytes(self.buffer_bytes), self.buffer_count)?;
        writeln!(f, "  Images:       {} ({})", format_bytes(self.image_bytes), self.image_count)?;
        writeln!(f, "  Peak images:  {}", format_bytes(self.peak_image_bytes))?;
        writeln!(
            f,
            "  Alias blocks: {} ({})",
            format_bytes(self.alias_block_bytes),
            self.alias_block_count
        )?;
        writeln!(f, "  Alias reuses: {}", self.image_alias_reuses)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_upload_by_kind() {
        let mut stats = FrameArenaStats::new();
        stats.record_upload(FrameArenaUploadKind::CameraUniform, 256);
        stats.record_upload(FrameArenaUploadKind::InstanceData, 1024);
        stats.record_upload(FrameArenaUploadKind::InstanceData, 1024);

        assert_eq!(stats.upload_bytes, 2304);
        assert_eq!(stats.upload_allocations, 3);
        assert_eq!(stats.upload_bytes_for(FrameArenaUploadKind::InstanceData), 2048);
        assert_eq!(stats.upload_allocations_for(FrameArenaUploadKind::PreviewData), 0);

        let text = stats.to_string();
        assert!(text.contains("camera_uniform"));
        assert!(!text.contains("preview_data"));
    }

    #[test]
    fn test_resident_peak() {
        let mut stats = FrameArenaResidentStats::new();
        stats.add_image(100);
        stats.add_image(50);
        stats.remove_image(100);

        assert_eq!(stats.image_bytes, 50);
        assert_eq!(stats.image_count, 1);
        assert_eq!(stats.peak_image_bytes, 150);
    }
}
