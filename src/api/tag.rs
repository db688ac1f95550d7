//! Upload kind and image lifetime tags.

/// What an upload is for. Only used to bucket statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameArenaUploadKind {
    #[default]
    Unknown,
    CameraUniform,
    InstanceData,
    PreviewData,
}

impl FrameArenaUploadKind {
    /// Number of kinds, for per-kind counters.
    pub const COUNT: usize = 4;

    /// All kinds, in counter order.
    pub const ALL: [FrameArenaUploadKind; Self::COUNT] = [
        FrameArenaUploadKind::Unknown,
        FrameArenaUploadKind::CameraUniform,
        FrameArenaUploadKind::InstanceData,
        FrameArenaUploadKind::PreviewData,
    ];

    /// Counter index for this kind.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrameArenaUploadKind::Unknown => "unknown",
            FrameArenaUploadKind::CameraUniform => "camera_uniform",
            FrameArenaUploadKind::InstanceData => "instance_data",
            FrameArenaUploadKind::PreviewData => "preview_data",
        }
    }
}

/// How long a transient image lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameArenaImageLifetime {
    /// Lives until explicitly destroyed.
    #[default]
    Persistent,

    /// Destroyed the next time its creating frame slot begins again.
    FrameTransient,
}
