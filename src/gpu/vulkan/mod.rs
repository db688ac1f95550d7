//! Vulkan backend
//!
//! `VulkanDevice` implements the device context over `ash`; `GpuAllocatorMemory`
//! is a memory strategy built on `gpu-allocator`.

pub mod allocator;
pub mod device;

pub use allocator::GpuAllocatorMemory;
pub use device::VulkanDevice;
