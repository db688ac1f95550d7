//! Dedicated memory strategy: one device allocation per resource.

use super::traits::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Allocates a dedicated block of device memory for every request.
///
/// Memory types are chosen first-fit with [`find_memory_type_index`].
#[derive(Debug, Default)]
pub struct DedicatedMemory {
    /// Map host-visible allocations once and keep the pointer
    persistent_host_mapping: bool,
    /// Source of backend-private allocation ids
    next_id: AtomicU64,
}

impl DedicatedMemory {
    /// Create a strategy that never maps on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a strategy that persistently maps every host-visible allocation.
    pub fn with_persistent_host_mapping() -> Self {
        Self {
            persistent_host_mapping: true,
            next_id: AtomicU64::new(0),
        }
    }
}

impl MemoryBackend for DedicatedMemory {
    fn name(&self) -> &'static str {
        "dedicated"
    }

    fn allocate(
        &self,
        device: &dyn DeviceContext,
        requirements: &MemoryRequirements,
        required: MemoryPropertyFlags,
        _kind: ResourceKind,
    ) -> Result<DeviceAllocation, DeviceError> {
        let type_index = find_memory_type_index(device.memory_types(), requirements.memory_type_bits, required);
        if type_index == MEMORY_TYPE_NOT_FOUND {
            return Err(DeviceError::NoCompatibleMemoryType);
        }

        let memory = device.allocate_memory(requirements.size, type_index)?;

        let mut mapped = None;
        if self.persistent_host_mapping && required.contains(MemoryPropertyFlags::HOST_VISIBLE) {
            match device.map_memory(memory, 0, requirements.size) {
                Ok(ptr) => mapped = Some(ptr),
                Err(err) => {
                    device.free_memory(memory);
                    return Err(err);
                }
            }
        }

        Ok(DeviceAllocation {
            memory,
            offset: 0,
            size: requirements.size,
            mapped,
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        })
    }

    fn free(&self, device: &dyn DeviceContext, allocation: DeviceAllocation) {
        if allocation.mapped.is_some() {
            device.unmap_memory(allocation.memory);
        }
        device.free_memory(allocation.memory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::dummy::{DeviceOp, DummyDevice};

    fn host_requirements() -> MemoryRequirements {
        MemoryRequirements {
            size: 1024,
            alignment: 256,
            memory_type_bits: 0b111,
        }
    }

    #[test]
    fn test_picks_host_visible_type() {
        let device = DummyDevice::new();
        let backend = DedicatedMemory::new();

        let alloc = backend
            .allocate(&device, &host_requirements(), MemoryPropertyFlags::HOST_VISIBLE, ResourceKind::Buffer)
            .unwrap();
        assert_eq!(device.memory_type_of(alloc.memory), Some(1));
        assert!(alloc.mapped.is_none());

        backend.free(&device, alloc);
        assert_eq!(device.live_objects().memories, 0);
    }

    #[test]
    fn test_persistent_mapping() {
        let device = DummyDevice::new();
        let backend = DedicatedMemory::with_persistent_host_mapping();

        let alloc = backend
            .allocate(&device, &host_requirements(), MemoryPropertyFlags::HOST_VISIBLE, ResourceKind::Buffer)
            .unwrap();
        assert!(alloc.mapped.is_some());

        backend.free(&device, alloc);
        assert_eq!(device.live_objects().memories, 0);
    }

    #[test]
    fn test_map_failure_frees_memory() {
        let device = DummyDevice::new();
        let backend = DedicatedMemory::with_persistent_host_mapping();

        device.fail_next(DeviceOp::MapMemory);
        let result = backend.allocate(
            &device,
            &host_requirements(),
            MemoryPropertyFlags::HOST_VISIBLE,
            ResourceKind::Buffer,
        );
        assert_eq!(result, Err(DeviceError::MapFailed));
        assert_eq!(device.live_objects().memories, 0);
    }

    #[test]
    fn test_no_compatible_type() {
        let device = DummyDevice::new();
        let backend = DedicatedMemory::new();

        let req = MemoryRequirements {
            memory_type_bits: 0b001,
            ..host_requirements()
        };
        let result = backend.allocate(&device, &req, MemoryPropertyFlags::HOST_VISIBLE, ResourceKind::Buffer);
        assert_eq!(result, Err(DeviceError::NoCompatibleMemoryType));
    }
}
