//! Dummy device implementation for testing
//!
//! This device keeps every "native" object in RAM and doesn't require actual GPU hardware.
//! Host-visible memory is backed by real bytes so mapped pointers can be written and read back.

use super::traits::*;
use crate::sync::mutex::Mutex;
use crate::util::layout::align_up_u64;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

/// Alignment the dummy device reports for every resource.
pub const DUMMY_ALIGNMENT: u64 = 256;

/// Device operations that can be made to fail once with [`DummyDevice::fail_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    CreateBuffer,
    BindBufferMemory,
    AllocateMemory,
    MapMemory,
    CreateImage,
    BindImageMemory,
    CreateImageView,
}

/// Counts of live native objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub buffers: usize,
    pub memories: usize,
    pub images: usize,
    pub views: usize,
}

impl LiveObjects {
    /// Total number of live objects of any kind.
    pub fn total(&self) -> usize {
        self.buffers + self.memories + self.images + self.views
    }
}

struct DummyMemory {
    size: u64,
    type_index: u32,
    /// Backing bytes, only for host-visible types
    data: Option<Vec<u8>>,
    mapped: bool,
}

struct DummyImage {
    requirements: MemoryRequirements,
    bound: Option<RawMemory>,
    allow_aliasing: bool,
}

#[derive(Default)]
struct DummyState {
    next_raw: u64,
    buffers: HashMap<RawBuffer, (MemoryRequirements, Option<RawMemory>)>,
    memories: HashMap<RawMemory, DummyMemory>,
    images: HashMap<RawImage, DummyImage>,
    views: HashMap<RawImageView, RawImage>,
    failures: Vec<DeviceOp>,
}

impl DummyState {
    fn next(&mut self) -> u64 {
        self.next_raw += 1;
        self.next_raw
    }

    fn take_failure(&mut self, op: DeviceOp) -> bool {
        match self.failures.iter().position(|f| *f == op) {
            Some(pos) => {
                self.failures.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// A RAM-backed device
pub struct DummyDevice {
    memory_types: Vec<MemoryPropertyFlags>,
    initialized: AtomicBool,
    state: Mutex<DummyState>,
}

impl DummyDevice {
    /// Create a device with one device-local and two host-visible memory types.
    pub fn new() -> Self {
        Self::with_memory_types(vec![
            MemoryPropertyFlags::DEVICE_LOCAL,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
            MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT | MemoryPropertyFlags::HOST_CACHED,
        ])
    }

    /// Create a device exposing a custom memory type list.
    pub fn with_memory_types(memory_types: Vec<MemoryPropertyFlags>) -> Self {
        Self {
            memory_types,
            initialized: AtomicBool::new(true),
            state: Mutex::new(DummyState::default()),
        }
    }

    /// Create a device that reports itself as not initialized.
    pub fn uninitialized() -> Self {
        let device = Self::new();
        device.set_initialized(false);
        device
    }

    /// Toggle the initialized state.
    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Relaxed);
    }

    /// Make the next call of `op` fail. Calls queue up.
    pub fn fail_next(&self, op: DeviceOp) {
        self.state.lock().failures.push(op);
    }

    /// Counts of currently live native objects.
    pub fn live_objects(&self) -> LiveObjects {
        let state = self.state.lock();
        LiveObjects {
            buffers: state.buffers.len(),
            memories: state.memories.len(),
            images: state.images.len(),
            views: state.views.len(),
        }
    }

    /// Memory type a live memory block was allocated from.
    pub fn memory_type_of(&self, memory: RawMemory) -> Option<u32> {
        self.state.lock().memories.get(&memory).map(|m| m.type_index)
    }

    /// Whether a live memory block is currently mapped.
    pub fn is_mapped(&self, memory: RawMemory) -> bool {
        self.state.lock().memories.get(&memory).map_or(false, |m| m.mapped)
    }

    /// Memory bound to a live image.
    pub fn image_memory(&self, image: RawImage) -> Option<RawMemory> {
        self.state.lock().images.get(&image).and_then(|i| i.bound)
    }

    /// Whether a live image was created with the aliasing flag.
    pub fn image_allows_aliasing(&self, image: RawImage) -> bool {
        self.state.lock().images.get(&image).map_or(false, |i| i.allow_aliasing)
    }

    /// Memory bound to a live buffer.
    pub fn buffer_memory(&self, buffer: RawBuffer) -> Option<RawMemory> {
        self.state.lock().buffers.get(&buffer).and_then(|(_, bound)| *bound)
    }

    /// Copy of the bytes of a host-visible memory block.
    pub fn read_memory(&self, memory: RawMemory) -> Option<Vec<u8>> {
        self.state.lock().memories.get(&memory).and_then(|m| m.data.clone())
    }

    fn check_ready(&self) -> Result<(), DeviceError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(DeviceError::NotInitialized)
        }
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceContext for DummyDevice {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    fn memory_types(&self) -> &[MemoryPropertyFlags] {
        &self.memory_types
    }

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<RawBuffer, DeviceError> {
        self.check_ready()?;
        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::CreateBuffer) {
            return Err(DeviceError::OutOfMemory);
        }

        let type_count = self.memory_types.len();
        let all_types = if type_count >= 32 { u32::MAX } else { (1u32 << type_count) - 1 };
        let requirements = MemoryRequirements {
            size: align_up_u64(info.size, DUMMY_ALIGNMENT).ok_or(DeviceError::OutOfMemory)?,
            alignment: DUMMY_ALIGNMENT,
            memory_type_bits: all_types,
        };
        let raw = RawBuffer(state.next());
        state.buffers.insert(raw, (requirements, None));
        Ok(raw)
    }

    fn buffer_memory_requirements(&self, buffer: RawBuffer) -> MemoryRequirements {
        let state = self.state.lock();
        state.buffers.get(&buffer).map(|(req, _)| *req).unwrap_or(MemoryRequirements {
            size: 0,
            alignment: DUMMY_ALIGNMENT,
            memory_type_bits: 0,
        })
    }

    fn bind_buffer_memory(&self, buffer: RawBuffer, memory: RawMemory, offset: u64) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::BindBufferMemory) {
            return Err(DeviceError::Backend("bind buffer memory failed".to_string()));
        }
        let memory_size = state.memories.get(&memory).map(|m| m.size).ok_or(DeviceError::InvalidHandle)?;
        let entry = state.buffers.get_mut(&buffer).ok_or(DeviceError::InvalidHandle)?;
        if offset + entry.0.size > memory_size {
            return Err(DeviceError::OutOfMemory);
        }
        entry.1 = Some(memory);
        Ok(())
    }

    fn destroy_buffer(&self, buffer: RawBuffer) {
        self.state.lock().buffers.remove(&buffer);
    }

    fn allocate_memory(&self, size: u64, memory_type_index: u32) -> Result<RawMemory, DeviceError> {
        self.check_ready()?;
        let flags = *self
            .memory_types
            .get(memory_type_index as usize)
            .ok_or(DeviceError::NoCompatibleMemoryType)?;

        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::AllocateMemory) {
            return Err(DeviceError::OutOfMemory);
        }

        let data = if flags.contains(MemoryPropertyFlags::HOST_VISIBLE) {
            let len = usize::try_from(size).map_err(|_| DeviceError::OutOfMemory)?;
            let mut bytes = Vec::new();
            bytes.try_reserve_exact(len).map_err(|_| DeviceError::OutOfMemory)?;
            bytes.resize(len, 0u8);
            Some(bytes)
        } else {
            None
        };
        let raw = RawMemory(state.next());
        state.memories.insert(
            raw,
            DummyMemory {
                size,
                type_index: memory_type_index,
                data,
                mapped: false,
            },
        );
        Ok(raw)
    }

    fn free_memory(&self, memory: RawMemory) {
        self.state.lock().memories.remove(&memory);
    }

    fn map_memory(&self, memory: RawMemory, offset: u64, size: u64) -> Result<NonNull<u8>, DeviceError> {
        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::MapMemory) {
            return Err(DeviceError::MapFailed);
        }
        let block = state.memories.get_mut(&memory).ok_or(DeviceError::InvalidHandle)?;
        if offset.checked_add(size).map_or(true, |end| end > block.size) {
            return Err(DeviceError::MapFailed);
        }
        let data = block.data.as_mut().ok_or(DeviceError::MapFailed)?;
        block.mapped = true;
        // SAFETY: offset is within the backing vector checked above.
        let ptr = unsafe { data.as_mut_ptr().add(offset as usize) };
        NonNull::new(ptr).ok_or(DeviceError::MapFailed)
    }

    fn unmap_memory(&self, memory: RawMemory) {
        if let Some(block) = self.state.lock().memories.get_mut(&memory) {
            block.mapped = false;
        }
    }

    fn create_image(&self, info: &ImageCreateInfo) -> Result<RawImage, DeviceError> {
        self.check_ready()?;
        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::CreateImage) {
            return Err(DeviceError::OutOfMemory);
        }

        let size = image_byte_size(info)
            .and_then(|size| align_up_u64(size, DUMMY_ALIGNMENT))
            .ok_or(DeviceError::OutOfMemory)?;
        let requirements = MemoryRequirements {
            size,
            alignment: DUMMY_ALIGNMENT,
            memory_type_bits: 0b001,
        };
        let raw = RawImage(state.next());
        state.images.insert(
            raw,
            DummyImage {
                requirements,
                bound: None,
                allow_aliasing: info.allow_aliasing,
            },
        );
        Ok(raw)
    }

    fn image_memory_requirements(&self, image: RawImage) -> MemoryRequirements {
        let state = self.state.lock();
        state.images.get(&image).map(|i| i.requirements).unwrap_or(MemoryRequirements {
            size: 0,
            alignment: DUMMY_ALIGNMENT,
            memory_type_bits: 0,
        })
    }

    fn bind_image_memory(&self, image: RawImage, memory: RawMemory, offset: u64) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::BindImageMemory) {
            return Err(DeviceError::Backend("bind image memory failed".to_string()));
        }
        let memory_size = state.memories.get(&memory).map(|m| m.size).ok_or(DeviceError::InvalidHandle)?;
        let entry = state.images.get_mut(&image).ok_or(DeviceError::InvalidHandle)?;
        if offset + entry.requirements.size > memory_size {
            return Err(DeviceError::OutOfMemory);
        }
        entry.bound = Some(memory);
        Ok(())
    }

    fn destroy_image(&self, image: RawImage) {
        self.state.lock().images.remove(&image);
    }

    fn create_image_view(&self, image: RawImage, _info: &ImageViewCreateInfo) -> Result<RawImageView, DeviceError> {
        self.check_ready()?;
        let mut state = self.state.lock();
        if state.take_failure(DeviceOp::CreateImageView) {
            return Err(DeviceError::OutOfMemory);
        }
        if !state.images.contains_key(&image) {
            return Err(DeviceError::InvalidHandle);
        }
        let raw = RawImageView(state.next());
        state.views.insert(raw, image);
        Ok(raw)
    }

    fn destroy_image_view(&self, view: RawImageView) {
        self.state.lock().views.remove(&view);
    }
}

/// Bytes covered by every mip level and array layer, or `None` on overflow.
fn image_byte_size(info: &ImageCreateInfo) -> Option<u64> {
    let texel_bytes = info.format.bytes_per_texel();
    let mut size = 0u64;
    let mut extent = info.extent;
    for _ in 0..info.mip_levels.max(1) {
        size = size.checked_add(extent.texel_count().checked_mul(texel_bytes)?)?;
        extent = Extent3D {
            width: (extent.width / 2).max(1),
            height: (extent.height / 2).max(1),
            depth: (extent.depth / 2).max(1),
        };
    }
    size.checked_mul(info.array_layers.max(1) as u64)
}
