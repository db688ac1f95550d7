//! Frame ring buffer - bump allocator over one persistently-mapped buffer.
//!
//! The buffer is split into `frame_count` equal regions. Only the active region is
//! written; allocations never spill into a neighbouring region.
//!
//! Regions start on [`RING_REGION_ALIGNMENT`] boundaries, so a region always has its
//! full `bytes_per_frame` budget available at any alignment up to that value.

use std::ptr::NonNull;
use std::sync::Arc;

use super::buffer::{BufferAllocator, BufferDesc};
use super::handles::BufferHandle;
use crate::api::error::ArenaError;
use crate::diagnostics::{DiagnosticSink, GlobalSink};
use crate::fr_emit;
use crate::gpu::traits::{BufferUsage, MemoryPropertyFlags};
use crate::util::layout::align_up_u64;

/// Alignment of every region start. Covers the largest offset alignment Vulkan
/// allows for uniform and storage buffer bindings.
pub const RING_REGION_ALIGNMENT: u64 = 256;

/// A sub-range of the ring buffer handed out for one frame.
///
/// Valid until the owning frame region is reclaimed by a later `begin_frame`.
#[derive(Debug, Clone, Copy)]
pub struct RingBufferSlice {
    /// The ring's buffer
    pub buffer: BufferHandle,

    /// Absolute byte offset into the buffer
    pub offset: u64,

    /// Size in bytes
    pub size: u64,

    ptr: NonNull<u8>,
}

impl RingBufferSlice {
    /// CPU pointer to the first byte of the slice.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Copy `data` into the slice, truncating to its size. Returns bytes written.
    pub fn write(&self, data: &[u8]) -> usize {
        let len = data.len().min(self.size as usize);
        // SAFETY: the slice lies inside the ring's live mapping.
        unsafe { std::ptr::copy_nonoverlapping(data.as_ptr(), self.ptr.as_ptr(), len) };
        len
    }

    /// View the slice as bytes.
    ///
    /// # Safety
    ///
    /// The owning frame region must not have been reclaimed and the ring must not
    /// have been shut down.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.size as usize)
    }
}

/// Per-frame upload ring.
///
/// `begin_frame` does not wait for the GPU. The caller must know the region it
/// selects is no longer being read.
pub struct FrameRingBuffer {
    /// Backing buffer (invalid when uninitialized)
    buffer: BufferHandle,

    /// Mapped base pointer, held for the ring's lifetime
    base: Option<NonNull<u8>>,

    /// Allocation budget of one region
    bytes_per_frame: u64,

    /// Distance between region starts (`bytes_per_frame` rounded up)
    region_stride: u64,

    frame_count: u32,
    active_frame: u32,

    /// Write cursor inside the active region
    cursor: u64,

    sink: Arc<dyn DiagnosticSink>,
}

impl FrameRingBuffer {
    /// Create an uninitialized ring.
    pub fn new() -> Self {
        Self {
            buffer: BufferHandle::INVALID,
            base: None,
            bytes_per_frame: 0,
            region_stride: 0,
            frame_count: 0,
            active_frame: 0,
            cursor: 0,
            sink: Arc::new(GlobalSink),
        }
    }

    /// Route diagnostics to a custom sink.
    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    /// Create and map a host-visible buffer holding `frame_count` regions of at least
    /// `bytes_per_frame` bytes each.
    ///
    /// On failure nothing is left allocated.
    pub fn init(
        &mut self,
        allocator: &mut BufferAllocator,
        bytes_per_frame: u64,
        frame_count: u32,
        usage: BufferUsage,
    ) -> Result<(), ArenaError> {
        if self.is_initialized() {
            self.shutdown(allocator);
        }

        if bytes_per_frame == 0 || frame_count == 0 {
            fr_emit!(self.sink, FR101, "bytes_per_frame={} frame_count={}", bytes_per_frame, frame_count);
            return Err(ArenaError::Validation("ring buffer needs non-zero frame size and count"));
        }
        let layout = align_up_u64(bytes_per_frame, RING_REGION_ALIGNMENT)
            .and_then(|stride| stride.checked_mul(frame_count as u64).map(|total| (stride, total)));
        let Some((stride, total)) = layout else {
            fr_emit!(self.sink, FR101, "size overflow");
            return Err(ArenaError::Validation("ring buffer size overflows"));
        };

        let desc = BufferDesc::new(total, usage)
            .memory_properties(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT);
        let buffer = allocator.create_buffer(&desc).map_err(|err| {
            fr_emit!(self.sink, FR101, "{}", err);
            err
        })?;

        let base = match allocator.map_buffer(buffer, 0, total) {
            Ok(ptr) => ptr,
            Err(err) => {
                allocator.destroy_buffer(buffer);
                fr_emit!(self.sink, FR101, "map: {}", err);
                return Err(err);
            }
        };

        self.buffer = buffer;
        self.base = Some(base);
        self.bytes_per_frame = bytes_per_frame;
        self.region_stride = stride;
        self.frame_count = frame_count;
        self.active_frame = 0;
        self.cursor = 0;
        Ok(())
    }

    /// Select region `frame_index % frame_count` and rewind its cursor.
    pub fn begin_frame(&mut self, frame_index: u64) {
        if self.frame_count == 0 {
            return;
        }
        self.active_frame = (frame_index % self.frame_count as u64) as u32;
        self.cursor = 0;
    }

    /// Bump-allocate `size` bytes from the active region.
    ///
    /// The cursor is aligned within the region. An alignment of 0 is treated as 1;
    /// other alignments must be a power of two. Returns `None` when the region has no
    /// room left.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Option<RingBufferSlice> {
        let base = self.base?;
        let align = alignment.max(1);
        if size == 0 || !align.is_power_of_two() {
            return None;
        }

        let region_start = self.region_offset(self.active_frame);
        let start = align_up_u64(self.cursor, align)?;
        let end = start.checked_add(size)?;
        if end > self.bytes_per_frame {
            fr_emit!(
                self.sink,
                FR102,
                "frame {} requested {} bytes at alignment {}, {} available",
                self.active_frame,
                size,
                align,
                self.remaining_aligned(align)
            );
            return None;
        }

        self.cursor = end;
        let offset = region_start + start;
        // SAFETY: offset + size lies inside the mapped buffer.
        let ptr = unsafe { NonNull::new_unchecked(base.as_ptr().add(offset as usize)) };
        Some(RingBufferSlice {
            buffer: self.buffer,
            offset,
            size,
            ptr,
        })
    }

    /// Unmap and destroy the buffer, returning to the uninitialized state.
    pub fn shutdown(&mut self, allocator: &mut BufferAllocator) {
        if self.buffer.is_valid() {
            allocator.unmap_buffer(self.buffer);
            allocator.destroy_buffer(self.buffer);
        }
        self.buffer = BufferHandle::INVALID;
        self.base = None;
        self.bytes_per_frame = 0;
        self.region_stride = 0;
        self.frame_count = 0;
        self.active_frame = 0;
        self.cursor = 0;
    }

    /// Whether the ring holds a mapped buffer.
    pub fn is_initialized(&self) -> bool {
        self.base.is_some()
    }

    /// Bytes used in the active region.
    pub fn used(&self) -> u64 {
        self.cursor
    }

    /// Bytes left in the active region, before any alignment padding.
    pub fn remaining(&self) -> u64 {
        self.bytes_per_frame.saturating_sub(self.cursor)
    }

    /// Bytes an allocation at `alignment` could still take from the active region.
    pub fn remaining_aligned(&self, alignment: u64) -> u64 {
        let align = alignment.max(1);
        if !align.is_power_of_two() {
            return 0;
        }
        align_up_u64(self.cursor, align).map_or(0, |start| self.bytes_per_frame.saturating_sub(start))
    }

    pub fn bytes_per_frame(&self) -> u64 {
        self.bytes_per_frame
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn active_frame(&self) -> u32 {
        self.active_frame
    }

    /// The ring's backing buffer (invalid when uninitialized).
    pub fn buffer_handle(&self) -> BufferHandle {
        self.buffer
    }

    /// Start offset of a frame's region.
    pub fn region_offset(&self, frame: u32) -> u64 {
        if self.frame_count == 0 {
            return 0;
        }
        (frame % self.frame_count) as u64 * self.region_stride
    }
}

impl Default for FrameRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}
