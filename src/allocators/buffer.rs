//! Device buffer allocator - native buffers and their memory behind integer handles.
//!
//! Every error path in [`BufferAllocator::create_buffer`] destroys whatever the call
//! already created, so a failed call leaves no native objects behind.

use std::ptr::NonNull;
use std::sync::Arc;

use super::handles::{BufferHandle, Slot, SlotTable};
use crate::api::error::ArenaError;
use crate::diagnostics::{DiagnosticSink, GlobalSink};
use crate::fr_emit;
use crate::gpu::traits::{
    find_memory_type_index, BufferCreateInfo, BufferUsage, DeviceAllocation, DeviceContext, DeviceError,
    MemoryBackend, MemoryPropertyFlags, RawBuffer, ResourceKind, MEMORY_TYPE_NOT_FOUND,
};

/// Parameters for [`BufferAllocator::create_buffer`].
#[derive(Debug, Clone)]
pub struct BufferDesc<'a> {
    /// Size in bytes (must be non-zero)
    pub size: u64,

    /// Buffer usage flags
    pub usage: BufferUsage,

    /// Properties the backing memory must have (default: device-local)
    pub memory_properties: MemoryPropertyFlags,

    /// Queue families sharing the buffer; empty means exclusive
    pub queue_families: Vec<u32>,

    /// Bytes copied into the buffer after creation
    pub initial_data: Option<&'a [u8]>,
}

impl<'a> BufferDesc<'a> {
    /// Describe a device-local buffer.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            size,
            usage,
            memory_properties: MemoryPropertyFlags::DEVICE_LOCAL,
            queue_families: Vec::new(),
            initial_data: None,
        }
    }

    /// Builder pattern: set required memory properties.
    pub fn memory_properties(mut self, flags: MemoryPropertyFlags) -> Self {
        self.memory_properties = flags;
        self
    }

    /// Builder pattern: share the buffer between queue families.
    pub fn sharing_queue_families(mut self, families: &[u32]) -> Self {
        self.queue_families = families.to_vec();
        self
    }

    /// Builder pattern: upload initial contents.
    ///
    /// The memory must be host-visible or creation fails.
    pub fn initial_data(mut self, data: &'a [u8]) -> Self {
        self.initial_data = Some(data);
        self
    }
}

#[derive(Default)]
struct BufferSlot {
    buffer: RawBuffer,
    allocation: Option<DeviceAllocation>,
    size: u64,
    /// Base of the whole-buffer mapping made by `map_buffer`
    user_mapping: Option<NonNull<u8>>,
    in_use: bool,
}

impl BufferSlot {
    fn persistent_mapping(&self) -> Option<NonNull<u8>> {
        self.allocation.and_then(|a| a.mapped)
    }
}

impl Slot for BufferSlot {
    fn in_use(&self) -> bool {
        self.in_use
    }
}

/// Owns native buffers and their memory, addressed by [`BufferHandle`].
///
/// Not internally synchronized; use from one thread.
pub struct BufferAllocator {
    device: Option<Arc<dyn DeviceContext>>,
    memory: Option<Arc<dyn MemoryBackend>>,
    slots: SlotTable<BufferSlot>,
    sink: Arc<dyn DiagnosticSink>,
}

impl BufferAllocator {
    /// Create an uninitialized allocator.
    pub fn new() -> Self {
        Self {
            device: None,
            memory: None,
            slots: SlotTable::new(),
            sink: Arc::new(GlobalSink),
        }
    }

    /// Bind the allocator to a device and memory strategy.
    ///
    /// Re-initializing destroys every buffer created under the previous device.
    pub fn init(&mut self, device: Arc<dyn DeviceContext>, memory: Arc<dyn MemoryBackend>) {
        if self.is_initialized() {
            self.shutdown();
        }
        self.slots.reset();
        self.device = Some(device);
        self.memory = Some(memory);
    }

    /// Whether [`BufferAllocator::init`] has been called.
    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Route diagnostics to a custom sink.
    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    /// The device this allocator creates buffers on.
    pub fn device(&self) -> Option<&Arc<dyn DeviceContext>> {
        self.device.as_ref()
    }

    /// The memory strategy shared with anything built on this allocator.
    pub fn memory_backend(&self) -> Option<&Arc<dyn MemoryBackend>> {
        self.memory.as_ref()
    }

    /// Create a buffer, bind memory, and optionally upload initial data.
    pub fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> Result<BufferHandle, ArenaError> {
        if desc.size == 0 {
            fr_emit!(self.sink, FR001);
            return Err(ArenaError::Validation("buffer size is zero"));
        }
        if desc.initial_data.map_or(false, |d| d.len() as u64 > desc.size) {
            return Err(ArenaError::Validation("initial data larger than buffer"));
        }

        let (device, memory) = match (&self.device, &self.memory) {
            (Some(device), Some(memory)) if device.is_initialized() => (device.clone(), memory.clone()),
            _ => {
                fr_emit!(self.sink, FR002);
                return Err(ArenaError::NotInitialized);
            }
        };

        let info = BufferCreateInfo {
            size: desc.size,
            usage: desc.usage,
            queue_families: desc.queue_families.clone(),
        };
        let buffer = device.create_buffer(&info).map_err(|err| {
            fr_emit!(self.sink, FR003, "create_buffer: {}", err);
            err
        })?;

        let requirements = device.buffer_memory_requirements(buffer);
        let allocation = match memory.allocate(&*device, &requirements, desc.memory_properties, ResourceKind::Buffer)
        {
            Ok(allocation) => allocation,
            Err(err) => {
                device.destroy_buffer(buffer);
                fr_emit!(self.sink, FR003, "allocate {} bytes: {}", requirements.size, err);
                return Err(err.into());
            }
        };

        if let Err(err) = device.bind_buffer_memory(buffer, allocation.memory, allocation.offset) {
            device.destroy_buffer(buffer);
            memory.free(&*device, allocation);
            fr_emit!(self.sink, FR003, "bind_buffer_memory: {}", err);
            return Err(err.into());
        }

        if let Some(data) = desc.initial_data {
            if let Err(err) = upload(&*device, &allocation, data) {
                device.destroy_buffer(buffer);
                memory.free(&*device, allocation);
                fr_emit!(self.sink, FR004, "{}", err);
                return Err(err.into());
            }
        }

        let index = self.slots.insert(BufferSlot {
            buffer,
            allocation: Some(allocation),
            size: desc.size,
            user_mapping: None,
            in_use: true,
        });
        Ok(BufferHandle::from_raw(index))
    }

    /// Destroy a buffer and free its memory. Invalid or stale handles are ignored.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) {
        let Some(slot) = self.slots.release(handle.index()) else {
            return;
        };
        if let (Some(device), Some(memory)) = (&self.device, &self.memory) {
            destroy_native(&**device, &**memory, slot);
        }
    }

    /// Native buffer behind a live handle.
    pub fn get_buffer(&self, handle: BufferHandle) -> Option<RawBuffer> {
        self.slots.get(handle.index()).map(|s| s.buffer)
    }

    /// Requested size of a live buffer.
    pub fn get_size(&self, handle: BufferHandle) -> Option<u64> {
        self.slots.get(handle.index()).map(|s| s.size)
    }

    /// Memory allocation backing a live buffer.
    pub fn get_allocation(&self, handle: BufferHandle) -> Option<DeviceAllocation> {
        self.slots.get(handle.index()).and_then(|s| s.allocation)
    }

    /// Whether the handle refers to a live buffer.
    pub fn is_valid(&self, handle: BufferHandle) -> bool {
        self.slots.get(handle.index()).is_some()
    }

    /// Number of live buffers.
    pub fn live_count(&self) -> usize {
        self.slots.live_count()
    }

    /// Map `size` bytes of a buffer starting at `offset`.
    ///
    /// The first call maps the whole buffer; later calls return the offset into that
    /// mapping until [`BufferAllocator::unmap_buffer`]. Persistently mapped memory is
    /// never mapped again.
    pub fn map_buffer(&mut self, handle: BufferHandle, offset: u64, size: u64) -> Result<NonNull<u8>, ArenaError> {
        let device = self.device.clone().ok_or(ArenaError::NotInitialized)?;
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(ArenaError::Validation("buffer handle is not live"))?;

        if offset.checked_add(size).map_or(true, |end| end > slot.size) {
            return Err(ArenaError::Validation("map range exceeds buffer size"));
        }

        let base = match slot.persistent_mapping().or(slot.user_mapping) {
            Some(base) => base,
            None => {
                // Map the whole buffer once so later calls at other offsets share it.
                let allocation = slot.allocation.ok_or(ArenaError::Validation("buffer has no memory"))?;
                let base = device.map_memory(allocation.memory, allocation.offset, slot.size)?;
                slot.user_mapping = Some(base);
                base
            }
        };
        // SAFETY: offset + size lies inside the buffer's mapping (checked above).
        Ok(unsafe { NonNull::new_unchecked(base.as_ptr().add(offset as usize)) })
    }

    /// Undo [`BufferAllocator::map_buffer`]. No-op for persistently mapped memory.
    pub fn unmap_buffer(&mut self, handle: BufferHandle) {
        let Some(device) = &self.device else {
            return;
        };
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return;
        };
        if slot.persistent_mapping().is_some() {
            return;
        }
        if slot.user_mapping.take().is_some() {
            if let Some(allocation) = slot.allocation {
                device.unmap_memory(allocation.memory);
            }
        }
    }

    /// First memory type in `type_bits` that has every `required` property.
    ///
    /// Returns [`MEMORY_TYPE_NOT_FOUND`] if none does, or if uninitialized.
    pub fn find_memory_type_index(&self, type_bits: u32, required: MemoryPropertyFlags) -> u32 {
        match &self.device {
            Some(device) => find_memory_type_index(device.memory_types(), type_bits, required),
            None => MEMORY_TYPE_NOT_FOUND,
        }
    }

    /// Destroy every live buffer and detach from the device.
    pub fn shutdown(&mut self) {
        let live = self.slots.live_indices();
        if !live.is_empty() {
            fr_emit!(self.sink, FR005, "{} buffers", live.len());
        }
        for index in live {
            if let Some(slot) = self.slots.release(index) {
                if let (Some(device), Some(memory)) = (&self.device, &self.memory) {
                    destroy_native(&**device, &**memory, slot);
                }
            }
        }
        self.slots.reset();
        self.device = None;
        self.memory = None;
    }
}

impl Default for BufferAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BufferAllocator {
    fn drop(&mut self) {
        if self.is_initialized() {
            self.shutdown();
        }
    }
}

/// Copy `data` into an allocation, reusing a persistent mapping when there is one.
fn upload(device: &dyn DeviceContext, allocation: &DeviceAllocation, data: &[u8]) -> Result<(), DeviceError> {
    if let Some(ptr) = allocation.mapped {
        // SAFETY: the mapping covers the whole allocation and data fits (checked by caller).
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len()) };
        return Ok(());
    }

    let ptr = device.map_memory(allocation.memory, allocation.offset, data.len() as u64)?;
    // SAFETY: the device mapped exactly data.len() bytes.
    unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.as_ptr(), data.len()) };
    device.unmap_memory(allocation.memory);
    Ok(())
}

fn destroy_native(device: &dyn DeviceContext, memory: &dyn MemoryBackend, slot: BufferSlot) {
    if let Some(allocation) = slot.allocation {
        if slot.user_mapping.is_some() {
            device.unmap_memory(allocation.memory);
        }
        device.destroy_buffer(slot.buffer);
        memory.free(device, allocation);
    } else {
        device.destroy_buffer(slot.buffer);
    }
}
