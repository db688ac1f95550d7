//! Memory strategy backed by the `gpu-allocator` crate

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk;
use ash::vk::Handle;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator};
use gpu_allocator::MemoryLocation;

use super::super::traits::*;
use crate::fr_diagnostic;
use crate::sync::mutex::Mutex;

/// Sub-allocates device memory through `gpu_allocator::vulkan::Allocator`.
///
/// Host-visible allocations come back persistently mapped, so the buffer allocator
/// never maps them itself.
pub struct GpuAllocatorMemory {
    allocator: Mutex<Allocator>,
    allocations: Mutex<HashMap<u64, Allocation>>,
    next_id: AtomicU64,
}

impl GpuAllocatorMemory {
    /// Take ownership of an allocator created for the same device as the context.
    pub fn new(allocator: Allocator) -> Self {
        Self {
            allocator: Mutex::new(allocator),
            allocations: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of allocations currently held.
    pub fn live_allocations(&self) -> usize {
        self.allocations.lock().len()
    }
}

fn location_for(required: MemoryPropertyFlags) -> MemoryLocation {
    if !required.contains(MemoryPropertyFlags::HOST_VISIBLE) {
        MemoryLocation::GpuOnly
    } else if required.contains(MemoryPropertyFlags::HOST_CACHED) {
        MemoryLocation::GpuToCpu
    } else {
        MemoryLocation::CpuToGpu
    }
}

impl MemoryBackend for GpuAllocatorMemory {
    fn name(&self) -> &'static str {
        "gpu-allocator"
    }

    fn allocate(
        &self,
        _device: &dyn DeviceContext,
        requirements: &MemoryRequirements,
        required: MemoryPropertyFlags,
        kind: ResourceKind,
    ) -> Result<DeviceAllocation, DeviceError> {
        let location = location_for(required);
        let desc = AllocationCreateDesc {
            name: "framearena",
            requirements: vk::MemoryRequirements {
                size: requirements.size,
                alignment: requirements.alignment,
                memory_type_bits: requirements.memory_type_bits,
            },
            location,
            linear: kind.is_linear(),
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        };

        let allocation = self
            .allocator
            .lock()
            .allocate(&desc)
            .map_err(|err| match err {
                gpu_allocator::AllocationError::OutOfMemory => DeviceError::OutOfMemory,
                gpu_allocator::AllocationError::NoCompatibleMemoryTypeFound => DeviceError::NoCompatibleMemoryType,
                other => DeviceError::Backend(other.to_string()),
            })?;

        // SAFETY: the memory handle is only used for binding while the allocation lives.
        let memory = RawMemory(unsafe { allocation.memory() }.as_raw());
        let result = DeviceAllocation {
            memory,
            offset: allocation.offset(),
            size: allocation.size(),
            mapped: allocation.mapped_ptr().map(|p| p.cast::<u8>()),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };
        self.allocations.lock().insert(result.id, allocation);
        Ok(result)
    }

    fn free(&self, _device: &dyn DeviceContext, allocation: DeviceAllocation) {
        let Some(inner) = self.allocations.lock().remove(&allocation.id) else {
            return;
        };
        if self.allocator.lock().free(inner).is_err() {
            fr_diagnostic!(
                Warning,
                code = "FR006",
                message = "gpu-allocator rejected a free",
                note = "the allocation may still count against its memory block"
            );
        }
    }
}
