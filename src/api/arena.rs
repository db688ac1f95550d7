//! Transient resource arena.
//!
//! Three layers share one frame index:
//! - an upload ring for small per-frame writes,
//! - per-frame lists of transient buffers, destroyed when their frame slot comes around again,
//! - a table of transient images whose memory may be shared through alias blocks.
//!
//! `begin_frame` trusts the caller's frame pacing. It never waits for the GPU before
//! destroying what the selected slot created last time.

use std::sync::Arc;

use super::config::FrameArenaConfig;
use super::error::ArenaError;
use super::pass::PassRange;
use super::stats::{FrameArenaResidentStats, FrameArenaStats};
use super::tag::{FrameArenaImageLifetime, FrameArenaUploadKind};
use crate::allocators::alias::AliasBlockPool;
use crate::allocators::buffer::{BufferAllocator, BufferDesc};
use crate::allocators::handles::{BufferHandle, Slot, SlotTable, TransientImageHandle};
use crate::allocators::ring::{FrameRingBuffer, RingBufferSlice};
use crate::debug::ImageTracker;
use crate::diagnostics::{tracy, DiagnosticSink, GlobalSink};
use crate::fr_emit;
use crate::gpu::traits::{
    DeviceAllocation, DeviceContext, DeviceError, Extent3D, Format, ImageCreateInfo, ImageUsage,
    ImageViewCreateInfo, MemoryBackend, MemoryPropertyFlags, MemoryRequirements, RawImage, RawImageView,
    RawMemory, ResourceKind,
};

/// Parameters for [`TransientResourceArena::create_transient_image`].
#[derive(Debug, Clone, Copy)]
pub struct TransientImageDesc {
    pub format: Format,
    pub extent: Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub usage: ImageUsage,

    /// Allow the image to share memory with images in disjoint pass ranges
    pub alias_eligible: bool,

    /// Passes during which the image is read or written
    pub pass_range: Option<PassRange>,
}

impl TransientImageDesc {
    /// Describe a single-mip 2D image.
    pub fn new_2d(format: Format, width: u32, height: u32, usage: ImageUsage) -> Self {
        Self {
            format,
            extent: Extent3D::d2(width, height),
            mip_levels: 1,
            array_layers: 1,
            usage,
            alias_eligible: false,
            pass_range: None,
        }
    }

    /// Builder pattern: mark the image alias-eligible over `range`.
    pub fn aliased(mut self, range: PassRange) -> Self {
        self.alias_eligible = true;
        self.pass_range = Some(range);
        self
    }

    /// Builder pattern: set the depth of a 3D image.
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.extent.depth = depth;
        self
    }

    /// Builder pattern: set mip level count.
    pub fn with_mip_levels(mut self, levels: u32) -> Self {
        self.mip_levels = levels;
        self
    }

    /// Builder pattern: set array layer count.
    pub fn with_array_layers(mut self, layers: u32) -> Self {
        self.array_layers = layers;
        self
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.format.is_undefined() {
            return Err("image format is undefined");
        }
        if self.extent.width == 0 || self.extent.height == 0 {
            return Err("image extent is zero");
        }
        if self.usage.is_empty() {
            return Err("image usage is empty");
        }
        Ok(())
    }

    fn create_info(&self, allow_aliasing: bool) -> ImageCreateInfo {
        ImageCreateInfo {
            format: self.format,
            extent: Extent3D {
                depth: self.extent.depth.max(1),
                ..self.extent
            },
            mip_levels: self.mip_levels.max(1),
            array_layers: self.array_layers.max(1),
            usage: self.usage,
            allow_aliasing,
        }
    }
}

/// Native objects behind a live transient image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientImage {
    pub image: RawImage,
    pub view: RawImageView,
    pub format: Format,
    pub extent: Extent3D,
}

/// Bookkeeping for a live transient image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientImageInfo {
    pub format: Format,
    pub extent: Extent3D,
    pub usage: ImageUsage,
    pub lifetime: FrameArenaImageLifetime,
    pub pass_range: Option<PassRange>,
    /// Alias block index, if the image lives in one
    pub alias_block: Option<u32>,
    /// Memory the image is bound to
    pub memory: RawMemory,
    /// Statistic volume (width x height x depth)
    pub byte_volume: u64,
}

/// What the leak sweep in [`TransientResourceArena::destroy_all_images`] had to clean up.
///
/// All zero in a healthy run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakReport {
    /// Slots marked unused that still held native handles
    pub zombie_slots: usize,
    /// Alias blocks still holding memory after every image was destroyed
    pub orphaned_blocks: usize,
    /// Images in the creation side-table that no teardown matched
    pub untracked_images: usize,
}

impl LeakReport {
    pub fn is_clean(&self) -> bool {
        self.zombie_slots == 0 && self.orphaned_blocks == 0 && self.untracked_images == 0
    }
}

impl std::fmt::Display for LeakReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} zombie slots, {} orphaned alias blocks, {} untracked images",
            self.zombie_slots, self.orphaned_blocks, self.untracked_images
        )
    }
}

#[derive(Default)]
struct ImageSlot {
    image: RawImage,
    view: RawImageView,
    /// Memory owned by this image alone
    dedicated: Option<DeviceAllocation>,
    /// Memory the image is bound to (dedicated or alias block)
    memory: RawMemory,
    format: Format,
    extent: Option<Extent3D>,
    usage: ImageUsage,
    lifetime: FrameArenaImageLifetime,
    pass_range: Option<PassRange>,
    /// Alias block index (0 = none)
    alias_block: u32,
    uses_alias_memory: bool,
    /// Frame slot whose list holds this handle (FrameTransient only)
    frame_slot: Option<usize>,
    byte_volume: u64,
    in_use: bool,
}

impl Slot for ImageSlot {
    fn in_use(&self) -> bool {
        self.in_use
    }
}

impl ImageSlot {
    fn holds_native(&self) -> bool {
        !self.image.is_null() || !self.view.is_null() || self.dedicated.is_some()
    }
}

enum ImageMemory {
    Alias { block: u32, reused: bool },
    Dedicated(DeviceAllocation),
}

/// Per-frame transient buffers, images, and uploads.
///
/// Not internally synchronized; use from the frame-recording thread.
pub struct TransientResourceArena {
    device: Option<Arc<dyn DeviceContext>>,
    memory: Option<Arc<dyn MemoryBackend>>,
    config: FrameArenaConfig,

    /// Layer A: uploads
    ring: FrameRingBuffer,

    /// Layer B: buffers owned by each frame slot
    frame_buffers: Vec<Vec<BufferHandle>>,

    /// Layer C: images and their alias blocks
    frame_images: Vec<Vec<TransientImageHandle>>,
    images: SlotTable<ImageSlot>,
    alias_blocks: AliasBlockPool,
    tracker: ImageTracker,

    active_frame: usize,
    frame_stats: Vec<FrameArenaStats>,
    resident: FrameArenaResidentStats,

    sink: Arc<dyn DiagnosticSink>,
}

impl TransientResourceArena {
    /// Create an uninitialized arena.
    pub fn new() -> Self {
        Self {
            device: None,
            memory: None,
            config: FrameArenaConfig::default(),
            ring: FrameRingBuffer::new(),
            frame_buffers: Vec::new(),
            frame_images: Vec::new(),
            images: SlotTable::new(),
            alias_blocks: AliasBlockPool::new(),
            tracker: ImageTracker::new(),
            active_frame: 0,
            frame_stats: Vec::new(),
            resident: FrameArenaResidentStats::new(),
            sink: Arc::new(GlobalSink),
        }
    }

    /// Route diagnostics to a custom sink (also used by the upload ring).
    pub fn set_sink(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.ring.set_sink(sink.clone());
        self.sink = sink;
    }

    /// Set up the upload ring and per-frame tables.
    ///
    /// Uses the allocator's memory strategy for images. Re-initializing shuts the
    /// arena down first. On failure the arena is left uninitialized with nothing allocated.
    pub fn init(
        &mut self,
        allocator: &mut BufferAllocator,
        device: Arc<dyn DeviceContext>,
        config: FrameArenaConfig,
    ) -> Result<(), ArenaError> {
        if self.is_initialized() {
            self.shutdown(allocator);
        }

        let Some(memory) = allocator.memory_backend().cloned() else {
            fr_emit!(self.sink, FR201, "buffer allocator is not initialized");
            return Err(ArenaError::NotInitialized);
        };

        self.ring.init(
            allocator,
            config.upload_bytes_per_frame,
            config.frame_count,
            config.upload_usage,
        )?;

        let frames = config.frame_count as usize;
        self.frame_buffers = vec![Vec::new(); frames];
        self.frame_images = vec![Vec::new(); frames];
        self.frame_stats = vec![FrameArenaStats::new(); frames];
        self.images.reset();
        self.alias_blocks = AliasBlockPool::new();
        self.tracker.clear();
        self.active_frame = 0;
        self.resident = FrameArenaResidentStats::new();
        self.device = Some(device);
        self.memory = Some(memory);
        self.config = config;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// Advance to `frame_index % frame_count`, reclaiming what that slot created last time.
    ///
    /// Every buffer and every `FrameTransient` image registered against the slot is
    /// destroyed before any new allocation is accepted.
    pub fn begin_frame(&mut self, allocator: &mut BufferAllocator, frame_index: u64) {
        if !self.is_initialized() || self.frame_buffers.is_empty() {
            fr_emit!(self.sink, FR201, "begin_frame({})", frame_index);
            return;
        }

        let slot = (frame_index % self.frame_buffers.len() as u64) as usize;
        self.active_frame = slot;

        for handle in std::mem::take(&mut self.frame_buffers[slot]) {
            if let Some(size) = allocator.get_size(handle) {
                self.resident.remove_buffer(size);
                allocator.destroy_buffer(handle);
            }
        }
        for handle in std::mem::take(&mut self.frame_images[slot]) {
            self.destroy_transient_image(handle);
        }

        self.frame_stats[slot] = FrameArenaStats::new();
        self.ring.begin_frame(frame_index);
        self.tracker.next_frame();
        tracy::plot_resident(&self.resident);
    }

    /// Allocate upload space from the active frame's ring region.
    ///
    /// `kind` only affects statistics. Returns `None` when the region is exhausted.
    pub fn allocate_upload(&mut self, size: u64, alignment: u64, kind: FrameArenaUploadKind) -> Option<RingBufferSlice> {
        if !self.is_initialized() {
            return None;
        }
        let slice = self.ring.allocate(size, alignment)?;
        self.frame_stats[self.active_frame].record_upload(kind, size);
        Some(slice)
    }

    /// Create a buffer owned by the active frame slot.
    pub fn create_transient_buffer(
        &mut self,
        allocator: &mut BufferAllocator,
        desc: &BufferDesc<'_>,
    ) -> Result<BufferHandle, ArenaError> {
        if !self.is_initialized() {
            fr_emit!(self.sink, FR201, "create_transient_buffer");
            return Err(ArenaError::NotInitialized);
        }

        let handle = allocator.create_buffer(desc).map_err(|err| {
            fr_emit!(self.sink, FR204, "{}", err);
            err
        })?;

        self.frame_buffers[self.active_frame].push(handle);
        let stats = &mut self.frame_stats[self.active_frame];
        stats.transient_buffer_bytes += desc.size;
        stats.transient_buffer_count += 1;
        self.resident.add_buffer(desc.size);
        Ok(handle)
    }

    /// Destroy a transient buffer before its frame slot reclaims it.
    ///
    /// Handles the arena does not own are ignored.
    pub fn destroy_transient_buffer(&mut self, allocator: &mut BufferAllocator, handle: BufferHandle) {
        let owned = self.frame_buffers.iter_mut().any(|list| {
            match list.iter().position(|h| *h == handle) {
                Some(pos) => {
                    list.swap_remove(pos);
                    true
                }
                None => false,
            }
        });
        if !owned {
            return;
        }
        if let Some(size) = allocator.get_size(handle) {
            self.resident.remove_buffer(size);
            allocator.destroy_buffer(handle);
        }
    }

    /// Create an image and view, sharing an alias block when the pass range allows it.
    ///
    /// An image is alias-eligible when the memory strategy does not alias on its own,
    /// the descriptor opts in, and it carries a pass range. Eligible images go into the
    /// first live block with equal memory type bits, enough size, and no overlapping
    /// registered range; otherwise a new block sized to the image is created.
    pub fn create_transient_image(
        &mut self,
        desc: &TransientImageDesc,
        lifetime: FrameArenaImageLifetime,
    ) -> Result<TransientImageHandle, ArenaError> {
        let (device, memory) = match (&self.device, &self.memory) {
            (Some(device), Some(memory)) => (device.clone(), memory.clone()),
            _ => {
                fr_emit!(self.sink, FR201, "create_transient_image");
                return Err(ArenaError::NotInitialized);
            }
        };

        if let Err(reason) = desc.validate() {
            fr_emit!(
                self.sink,
                FR202,
                "{}: format={:?} extent={}x{} usage={:#x}",
                reason,
                desc.format,
                desc.extent.width,
                desc.extent.height,
                desc.usage.bits
            );
            return Err(ArenaError::Validation(reason));
        }

        let alias_range = match desc.pass_range {
            Some(range) if desc.alias_eligible && !memory.aliases_internally() => Some(range),
            _ => None,
        };

        let info = desc.create_info(alias_range.is_some());
        let image = device
            .create_image(&info)
            .map_err(|err| self.creation_failed("create_image", err))?;
        let requirements = device.image_memory_requirements(image);

        let bound = match alias_range {
            Some(range) => self.bind_aliased(&*device, &*memory, image, &requirements, range),
            None => bind_dedicated(&*device, &*memory, image, &requirements),
        };
        let (image_memory, bound_to) = match bound {
            Ok(bound) => bound,
            Err((step, err)) => {
                device.destroy_image(image);
                return Err(self.creation_failed(step, err));
            }
        };

        let view = match device.create_image_view(image, &ImageViewCreateInfo::for_image(&info)) {
            Ok(view) => view,
            Err(err) => {
                device.destroy_image(image);
                match image_memory {
                    ImageMemory::Alias { block, .. } => {
                        if let Some(range) = alias_range {
                            if let Some(allocation) = self.alias_blocks.release(block, &range) {
                                memory.free(&*device, allocation);
                            }
                        }
                    }
                    ImageMemory::Dedicated(allocation) => memory.free(&*device, allocation),
                }
                self.refresh_alias_stats();
                return Err(self.creation_failed("create_image_view", err));
            }
        };

        let (alias_block, dedicated, reused) = match image_memory {
            ImageMemory::Alias { block, reused } => (block, None, reused),
            ImageMemory::Dedicated(allocation) => (0, Some(allocation), false),
        };
        let frame_slot = (lifetime == FrameArenaImageLifetime::FrameTransient).then_some(self.active_frame);
        let byte_volume = desc.extent.texel_count();

        let index = self.images.insert(ImageSlot {
            image,
            view,
            dedicated,
            memory: bound_to,
            format: desc.format,
            extent: Some(desc.extent),
            usage: desc.usage,
            lifetime,
            pass_range: desc.pass_range,
            alias_block,
            uses_alias_memory: alias_block != 0,
            frame_slot,
            byte_volume,
            in_use: true,
        });
        let handle = TransientImageHandle::from_raw(index);

        if let Some(slot) = frame_slot {
            self.frame_images[slot].push(handle);
        }
        self.tracker.record_create(image, view, dedicated);

        self.resident.add_image(byte_volume);
        let stats = &mut self.frame_stats[self.active_frame];
        stats.transient_image_bytes += byte_volume;
        stats.transient_image_count += 1;
        if reused {
            stats.image_alias_reuses += 1;
            self.resident.image_alias_reuses += 1;
        }
        self.refresh_alias_stats();

        Ok(handle)
    }

    fn bind_aliased(
        &mut self,
        device: &dyn DeviceContext,
        memory: &dyn MemoryBackend,
        image: RawImage,
        requirements: &MemoryRequirements,
        range: PassRange,
    ) -> Result<(ImageMemory, RawMemory), (&'static str, DeviceError)> {
        if let Some(block) = self.alias_blocks.find_compatible(requirements, &range) {
            let allocation = self
                .alias_blocks
                .allocation(block)
                .ok_or(("alias block lookup", DeviceError::InvalidHandle))?;
            device
                .bind_image_memory(image, allocation.memory, allocation.offset)
                .map_err(|err| ("bind_image_memory", err))?;
            self.alias_blocks.acquire(block, range);
            return Ok((ImageMemory::Alias { block, reused: true }, allocation.memory));
        }

        let allocation = memory
            .allocate(device, requirements, MemoryPropertyFlags::DEVICE_LOCAL, ResourceKind::Image)
            .map_err(|err| ("allocate alias block", err))?;
        if let Err(err) = device.bind_image_memory(image, allocation.memory, allocation.offset) {
            memory.free(device, allocation);
            return Err(("bind_image_memory", err));
        }
        let block = self.alias_blocks.insert(allocation, requirements, range);
        Ok((ImageMemory::Alias { block, reused: false }, allocation.memory))
    }

    /// Destroy an image. Its alias block is freed only when no other image uses it.
    ///
    /// Invalid or stale handles are ignored.
    pub fn destroy_transient_image(&mut self, handle: TransientImageHandle) {
        let Some(slot) = self.images.release(handle.index()) else {
            return;
        };
        if let Some(frame) = slot.frame_slot {
            if let Some(list) = self.frame_images.get_mut(frame) {
                list.retain(|h| *h != handle);
            }
        }

        if let (Some(device), Some(memory)) = (&self.device, &self.memory) {
            if !slot.view.is_null() {
                device.destroy_image_view(slot.view);
            }
            device.destroy_image(slot.image);
            if slot.uses_alias_memory {
                if let Some(range) = slot.pass_range {
                    if let Some(allocation) = self.alias_blocks.release(slot.alias_block, &range) {
                        memory.free(&**device, allocation);
                    }
                }
            } else if let Some(allocation) = slot.dedicated {
                memory.free(&**device, allocation);
            }
        }
        self.tracker.record_destroy(slot.image);

        self.resident.remove_image(slot.byte_volume);
        self.refresh_alias_stats();
    }

    /// Destroy every image, then force-clean anything the bookkeeping missed.
    ///
    /// After the normal teardown three sweeps run: slots marked unused that still hold
    /// native handles, alias blocks that still hold memory, and images left in the
    /// creation side-table. Each hit is reported as a leak-defense diagnostic.
    pub fn destroy_all_images(&mut self) -> LeakReport {
        let mut report = LeakReport::default();
        let (device, memory) = match (&self.device, &self.memory) {
            (Some(device), Some(memory)) => (device.clone(), memory.clone()),
            _ => return report,
        };

        for index in self.images.live_indices() {
            self.destroy_transient_image(TransientImageHandle::from_raw(index as u32));
        }
        for list in &mut self.frame_images {
            list.clear();
        }

        for (index, slot) in self.images.all_slots_mut() {
            if slot.in_use || !slot.holds_native() {
                continue;
            }
            let zombie = std::mem::take(slot);
            fr_emit!(
                self.sink,
                FR901,
                "slot {} image {:?} view {:?}",
                index,
                zombie.image,
                zombie.view
            );
            if !zombie.view.is_null() {
                device.destroy_image_view(zombie.view);
            }
            if !zombie.image.is_null() {
                device.destroy_image(zombie.image);
            }
            if let Some(allocation) = zombie.dedicated {
                memory.free(&*device, allocation);
            }
            self.tracker.record_destroy(zombie.image);
            report.zombie_slots += 1;
        }

        for (block, ref_count, allocation) in self.alias_blocks.drain() {
            fr_emit!(
                self.sink,
                FR902,
                "block {} memory {:?} ref_count {}",
                block,
                allocation.memory,
                ref_count
            );
            memory.free(&*device, allocation);
            report.orphaned_blocks += 1;
        }

        for trace in self.tracker.drain() {
            fr_emit!(
                self.sink,
                FR903,
                "image {:?} created at frame {}",
                trace.image,
                trace.frame
            );
            if !trace.view.is_null() {
                device.destroy_image_view(trace.view);
            }
            device.destroy_image(trace.image);
            if let Some(allocation) = trace.dedicated {
                memory.free(&*device, allocation);
            }
            report.untracked_images += 1;
        }

        self.images.reset();
        self.resident.image_bytes = 0;
        self.resident.image_count = 0;
        self.refresh_alias_stats();
        report
    }

    /// Native objects behind a live image.
    pub fn get_transient_image(&self, handle: TransientImageHandle) -> Option<TransientImage> {
        let slot = self.images.get(handle.index())?;
        Some(TransientImage {
            image: slot.image,
            view: slot.view,
            format: slot.format,
            extent: slot.extent?,
        })
    }

    /// Bookkeeping for a live image.
    pub fn image_info(&self, handle: TransientImageHandle) -> Option<TransientImageInfo> {
        let slot = self.images.get(handle.index())?;
        Some(TransientImageInfo {
            format: slot.format,
            extent: slot.extent?,
            usage: slot.usage,
            lifetime: slot.lifetime,
            pass_range: slot.pass_range,
            alias_block: slot.uses_alias_memory.then_some(slot.alias_block),
            memory: slot.memory,
            byte_volume: slot.byte_volume,
        })
    }

    /// Pass ranges registered on the alias block a live image is bound to.
    pub fn alias_block_ranges(&self, handle: TransientImageHandle) -> Option<Vec<PassRange>> {
        let slot = self.images.get(handle.index())?;
        if !slot.uses_alias_memory {
            return None;
        }
        self.alias_blocks.ranges(slot.alias_block).map(|r| r.to_vec())
    }

    /// Number of live alias blocks.
    pub fn alias_block_count(&self) -> usize {
        self.alias_blocks.count()
    }

    /// The upload ring's buffer (invalid when uninitialized).
    pub fn upload_buffer_handle(&self) -> BufferHandle {
        self.ring.buffer_handle()
    }

    /// Statistics of the active frame slot.
    pub fn active_stats(&self) -> FrameArenaStats {
        self.frame_stats.get(self.active_frame).cloned().unwrap_or_default()
    }

    /// Cumulative statistics of everything currently held.
    pub fn resident_stats(&self) -> &FrameArenaResidentStats {
        &self.resident
    }

    /// Active frame slot index.
    pub fn active_frame(&self) -> usize {
        self.active_frame
    }

    pub fn config(&self) -> &FrameArenaConfig {
        &self.config
    }

    /// Number of live images.
    pub fn live_image_count(&self) -> usize {
        self.images.live_count()
    }

    /// Destroy everything and return to the uninitialized state.
    pub fn shutdown(&mut self, allocator: &mut BufferAllocator) {
        if !self.is_initialized() {
            return;
        }

        for list in &mut self.frame_buffers {
            for handle in list.drain(..) {
                allocator.destroy_buffer(handle);
            }
        }
        self.destroy_all_images();
        self.ring.shutdown(allocator);

        self.frame_buffers.clear();
        self.frame_images.clear();
        self.frame_stats.clear();
        self.images.reset();
        self.alias_blocks = AliasBlockPool::new();
        self.tracker.clear();
        self.active_frame = 0;
        self.resident = FrameArenaResidentStats::new();
        self.device = None;
        self.memory = None;
    }

    fn creation_failed(&self, step: &str, err: DeviceError) -> ArenaError {
        fr_emit!(self.sink, FR203, "{}: {}", step, err);
        err.into()
    }

    fn refresh_alias_stats(&mut self) {
        self.resident.alias_block_count = self.alias_blocks.count() as u32;
        self.resident.alias_block_bytes = self.alias_blocks.total_bytes();
    }
}

impl Default for TransientResourceArena {
    fn default() -> Self {
        Self::new()
    }
}

fn bind_dedicated(
    device: &dyn DeviceContext,
    memory: &dyn MemoryBackend,
    image: RawImage,
    requirements: &MemoryRequirements,
) -> Result<(ImageMemory, RawMemory), (&'static str, DeviceError)> {
    let allocation = memory
        .allocate(device, requirements, MemoryPropertyFlags::DEVICE_LOCAL, ResourceKind::Image)
        .map_err(|err| ("allocate image memory", err))?;
    if let Err(err) = device.bind_image_memory(image, allocation.memory, allocation.offset) {
        memory.free(device, allocation);
        return Err(("bind_image_memory", err));
    }
    Ok((ImageMemory::Dedicated(allocation), allocation.memory))
}
