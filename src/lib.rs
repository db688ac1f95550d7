//! # framearena
//!
//! Transient GPU resource management for frame-paced renderers.
//!
//! ## Features
//!
//! - Handle-indexed buffer allocator (index 0 is always invalid)
//! - Per-frame upload ring with aligned bump allocation
//! - Transient buffers reclaimed when their frame slot comes around again
//! - Transient images that share memory across disjoint pass ranges
//! - Leak sweep for zombie slots, orphaned alias blocks and untracked images
//! - Pluggable device and memory strategy (dummy device, dedicated memory, Vulkan)
//! - Diagnostics with stable codes, optional `log` and Tracy integration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use framearena::{
//!     BufferAllocator, DedicatedMemory, DummyDevice, FrameArenaConfig, FrameArenaImageLifetime,
//!     FrameArenaPass, FrameArenaUploadKind, Format, ImageUsage, PassRange, TransientImageDesc,
//!     TransientResourceArena,
//! };
//!
//! let device = Arc::new(DummyDevice::new());
//! let mut allocator = BufferAllocator::new();
//! allocator.init(device.clone(), Arc::new(DedicatedMemory::new()));
//!
//! let mut arena = TransientResourceArena::new();
//! arena.init(&mut allocator, device, FrameArenaConfig::default()).unwrap();
//!
//! // Frame loop
//! for frame in 0..3u64 {
//!     arena.begin_frame(&mut allocator, frame);
//!
//!     if let Some(slice) = arena.allocate_upload(256, 256, FrameArenaUploadKind::CameraUniform) {
//!         slice.write(&[0u8; 64]);
//!     }
//!
//!     let desc = TransientImageDesc::new_2d(Format::R8G8B8A8_UNORM, 1920, 1080, ImageUsage::COLOR_ATTACHMENT)
//!         .aliased(PassRange::single(FrameArenaPass::Post));
//!     let _image = arena.create_transient_image(&desc, FrameArenaImageLifetime::FrameTransient);
//! }
//!
//! arena.shutdown(&mut allocator);
//! ```

pub mod api;
pub mod debug;
pub mod diagnostics;
pub mod gpu;
pub mod util;

mod allocators;
mod sync;

// Re-export public API at crate root for convenience
pub use api::arena::{LeakReport, TransientImage, TransientImageDesc, TransientImageInfo, TransientResourceArena};
pub use api::config::FrameArenaConfig;
pub use api::error::ArenaError;
pub use api::pass::{FrameArenaPass, PassRange};
pub use api::stats::{FrameArenaResidentStats, FrameArenaStats};
pub use api::tag::{FrameArenaImageLifetime, FrameArenaUploadKind};

// Allocators
pub use allocators::buffer::{BufferAllocator, BufferDesc};
pub use allocators::handles::{BufferHandle, TransientImageHandle};
pub use allocators::ring::{FrameRingBuffer, RingBufferSlice};

// Device abstraction
pub use gpu::{
    BufferUsage, DedicatedMemory, DeviceAllocation, DeviceContext, DeviceError, DummyDevice, Extent3D, Format,
    ImageUsage, MemoryBackend, MemoryPropertyFlags, MemoryRequirements, RawBuffer, RawImage, RawImageView, RawMemory,
    ResourceKind,
};

// Diagnostics - Core types and predefined codes
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticKind, DiagnosticSink, GlobalSink};
pub use diagnostics::{FR001, FR002, FR003, FR004, FR005, FR101, FR102, FR201, FR202, FR203, FR204, FR901, FR902, FR903};

// Size helpers
pub use util::size::{format_bytes, kb, mb};
