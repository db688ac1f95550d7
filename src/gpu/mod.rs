//! Device abstraction
//!
//! The allocators only ever talk to [`DeviceContext`] and [`MemoryBackend`].
//!
//! ## Backends
//! - `dummy`: RAM-backed device for tests and headless tools (always available)
//! - `vulkan`: Via the `ash` and `gpu-allocator` crates (enable `gpu-vulkan` feature)

// Always present for API stability: traits define the interface
pub mod traits;
pub use traits::{
    find_memory_type_index, BufferCreateInfo, BufferUsage, DeviceAllocation, DeviceContext, DeviceError, Extent3D,
    Format, ImageCreateInfo, ImageUsage, ImageViewCreateInfo, MemoryBackend, MemoryPropertyFlags, MemoryRequirements,
    RawBuffer, RawImage, RawImageView, RawMemory, ResourceKind, MEMORY_TYPE_NOT_FOUND,
};

// One device allocation per resource (always available)
pub mod dedicated;
pub use dedicated::DedicatedMemory;

// Dummy device for testing (always available)
pub mod dummy;
pub use dummy::{DeviceOp, DummyDevice, LiveObjects};

// Backend implementations are conditionally compiled
#[cfg(feature = "gpu-vulkan")]
pub mod vulkan;
