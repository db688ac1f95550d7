//! Alias memory blocks shared by images with disjoint pass ranges.
//!
//! Search is first-fit over block indices. There is no compaction or eviction;
//! a block returns to the pool only when its last image is destroyed.

use super::handles::{Slot, SlotTable};
use crate::api::pass::PassRange;
use crate::gpu::traits::{DeviceAllocation, MemoryRequirements};

#[derive(Default)]
pub(crate) struct AliasBlock {
    pub allocation: Option<DeviceAllocation>,
    pub size: u64,
    /// Memory type bitmask of the image that created the block
    pub memory_type_bits: u32,
    /// Number of live images bound to the block
    pub ref_count: u32,
    /// One entry per bound image
    pub ranges: Vec<PassRange>,
    pub in_use: bool,
}

impl Slot for AliasBlock {
    fn in_use(&self) -> bool {
        self.in_use
    }
}

impl AliasBlock {
    fn accepts(&self, requirements: &MemoryRequirements, range: &PassRange) -> bool {
        self.memory_type_bits == requirements.memory_type_bits
            && self.size >= requirements.size
            && self.ranges.iter().all(|r| !r.overlaps(range))
    }
}

/// Table of alias blocks. Index 0 is reserved and means "no block".
pub(crate) struct AliasBlockPool {
    blocks: SlotTable<AliasBlock>,
}

impl AliasBlockPool {
    pub fn new() -> Self {
        Self {
            blocks: SlotTable::new(),
        }
    }

    /// First live block with matching type bits, enough room, and no overlapping range.
    pub fn find_compatible(&self, requirements: &MemoryRequirements, range: &PassRange) -> Option<u32> {
        self.blocks
            .live_indices()
            .into_iter()
            .find(|&i| self.blocks.get(i).map_or(false, |b| b.accepts(requirements, range)))
            .map(|i| i as u32)
    }

    /// Install a new block holding one image.
    pub fn insert(&mut self, allocation: DeviceAllocation, requirements: &MemoryRequirements, range: PassRange) -> u32 {
        self.blocks.insert(AliasBlock {
            allocation: Some(allocation),
            size: allocation.size.max(requirements.size),
            memory_type_bits: requirements.memory_type_bits,
            ref_count: 1,
            ranges: vec![range],
            in_use: true,
        })
    }

    /// Bind one more image to a live block.
    pub fn acquire(&mut self, index: u32, range: PassRange) -> bool {
        match self.blocks.get_mut(index as usize) {
            Some(block) => {
                block.ref_count += 1;
                block.ranges.push(range);
                true
            }
            None => false,
        }
    }

    /// Drop one image's reference. Returns the memory to free if this was the last one.
    pub fn release(&mut self, index: u32, range: &PassRange) -> Option<DeviceAllocation> {
        let block = self.blocks.get_mut(index as usize)?;
        if let Some(pos) = block.ranges.iter().position(|r| r == range) {
            block.ranges.swap_remove(pos);
        }
        block.ref_count = block.ref_count.saturating_sub(1);
        if block.ref_count > 0 {
            return None;
        }
        self.blocks.release(index as usize).and_then(|b| b.allocation)
    }

    /// Memory backing a live block.
    pub fn allocation(&self, index: u32) -> Option<DeviceAllocation> {
        self.blocks.get(index as usize).and_then(|b| b.allocation)
    }

    pub fn ranges(&self, index: u32) -> Option<&[PassRange]> {
        self.blocks.get(index as usize).map(|b| b.ranges.as_slice())
    }

    #[cfg(test)]
    pub fn ref_count(&self, index: u32) -> u32 {
        self.blocks.get(index as usize).map_or(0, |b| b.ref_count)
    }

    /// Number of live blocks.
    pub fn count(&self) -> usize {
        self.blocks.live_count()
    }

    /// Bytes held by live blocks.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .live_indices()
            .into_iter()
            .filter_map(|i| self.blocks.get(i))
            .map(|b| b.size)
            .sum()
    }

    /// Index the next new block will take.
    #[cfg(test)]
    pub fn next_index(&self) -> u32 {
        self.blocks.next_index()
    }

    /// Remove every block that still holds memory, live or not.
    ///
    /// Returns `(index, ref_count, allocation)` for each one.
    pub fn drain(&mut self) -> Vec<(u32, u32, DeviceAllocation)> {
        let mut drained = Vec::new();
        for (index, block) in self.blocks.all_slots_mut() {
            if let Some(allocation) = block.allocation.take() {
                drained.push((index as u32, block.ref_count, allocation));
            }
        }
        self.blocks.reset();
        drained
    }

    #[cfg(test)]
    pub fn block_mut(&mut self, index: u32) -> Option<&mut AliasBlock> {
        self.blocks.get_mut(index as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::pass::FrameArenaPass::*;
    use crate::gpu::traits::RawMemory;

    fn requirements(size: u64, bits: u32) -> MemoryRequirements {
        MemoryRequirements {
            size,
            alignment: 256,
            memory_type_bits: bits,
        }
    }

    fn allocation(id: u64, size: u64) -> DeviceAllocation {
        DeviceAllocation {
            memory: RawMemory(id),
            offset: 0,
            size,
            mapped: None,
            id,
        }
    }

    #[test]
    fn test_disjoint_ranges_share() {
        let mut pool = AliasBlockPool::new();
        let req = requirements(1024, 1);
        let a = pool.insert(allocation(1, 1024), &req, PassRange::single(Prepass));
        assert_eq!(a, 1);

        let found = pool.find_compatible(&req, &PassRange::single(Post));
        assert_eq!(found, Some(a));
        assert!(pool.find_compatible(&req, &PassRange::single(Prepass)).is_none());
    }

    #[test]
    fn test_incompatible_blocks_skipped() {
        let mut pool = AliasBlockPool::new();
        pool.insert(allocation(1, 512), &requirements(512, 1), PassRange::single(Prepass));
        pool.insert(allocation(2, 4096), &requirements(4096, 3), PassRange::single(Prepass));
        let third = pool.insert(allocation(3, 4096), &requirements(4096, 1), PassRange::single(Prepass));

        // Too small, then wrong type bits, then a fit.
        let found = pool.find_compatible(&requirements(2048, 1), &PassRange::single(Main));
        assert_eq!(found, Some(third));
    }

    #[test]
    fn test_release_frees_at_zero() {
        let mut pool = AliasBlockPool::new();
        let req = requirements(1024, 1);
        let block = pool.insert(allocation(1, 1024), &req, PassRange::single(Shadow));
        assert!(pool.acquire(block, PassRange::single(Post)));
        assert_eq!(pool.ref_count(block), 2);

        assert!(pool.release(block, &PassRange::single(Shadow)).is_none());
        assert_eq!(pool.ranges(block), Some(&[PassRange::single(Post)][..]));

        let freed = pool.release(block, &PassRange::single(Post));
        assert_eq!(freed.map(|a| a.memory), Some(RawMemory(1)));
        assert_eq!(pool.count(), 0);
        assert_eq!(pool.next_index(), block);
    }

    #[test]
    fn test_drain_takes_everything() {
        let mut pool = AliasBlockPool::new();
        let req = requirements(256, 1);
        pool.insert(allocation(1, 256), &req, PassRange::single(Main));
        pool.insert(allocation(2, 256), &req, PassRange::single(Main));

        let drained = pool.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(pool.count(), 0);
        assert_eq!(pool.total_bytes(), 0);
    }
}
