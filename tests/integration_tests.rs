//! Integration tests for framearena.

use std::collections::HashSet;
use std::sync::Arc;

use framearena::gpu::{DeviceOp, LiveObjects};
use framearena::{
    ArenaError, BufferAllocator, BufferDesc, BufferHandle, BufferUsage, CollectingSink, DedicatedMemory, DummyDevice,
    FrameArenaConfig, FrameArenaImageLifetime, FrameArenaPass, FrameArenaUploadKind, FrameRingBuffer, Format,
    ImageUsage, MemoryPropertyFlags, PassRange, TransientImageDesc, TransientResourceArena,
};

struct Renderer {
    device: Arc<DummyDevice>,
    allocator: BufferAllocator,
    arena: TransientResourceArena,
    sink: Arc<CollectingSink>,
}

impl Renderer {
    fn new(config: FrameArenaConfig) -> Self {
        let device = Arc::new(DummyDevice::new());
        let sink = Arc::new(CollectingSink::new());
        let mut allocator = BufferAllocator::new();
        allocator.init(device.clone(), Arc::new(DedicatedMemory::new()));
        allocator.set_sink(sink.clone());

        let mut arena = TransientResourceArena::new();
        arena.set_sink(sink.clone());
        arena.init(&mut allocator, device.clone(), config).unwrap();

        Self {
            device,
            allocator,
            arena,
            sink,
        }
    }

    fn small() -> Self {
        Self::new(
            FrameArenaConfig::default()
                .with_upload_bytes_per_frame(4096)
                .with_frame_count(3),
        )
    }
}

fn color(width: u32, height: u32) -> TransientImageDesc {
    TransientImageDesc::new_2d(Format::R8G8B8A8_UNORM, width, height, ImageUsage::COLOR_ATTACHMENT)
}

fn single(pass: FrameArenaPass) -> PassRange {
    PassRange::single(pass)
}

#[test]
fn test_handles_are_nonzero_and_distinct() {
    let mut r = Renderer::small();

    let mut seen = HashSet::new();
    for i in 0..16u64 {
        let h = r
            .allocator
            .create_buffer(&BufferDesc::new(256 + i, BufferUsage::STORAGE_BUFFER))
            .unwrap();
        assert!(h.is_valid());
        assert!(seen.insert(h));
    }

    let mut images = HashSet::new();
    for _ in 0..8 {
        let h = r
            .arena
            .create_transient_image(&color(32, 32), FrameArenaImageLifetime::Persistent)
            .unwrap();
        assert!(h.is_valid());
        assert!(images.insert(h));
    }
}

#[test]
fn test_destroyed_buffer_resolves_to_none_until_reissued() {
    let mut r = Renderer::small();

    let a = r
        .allocator
        .create_buffer(&BufferDesc::new(1024, BufferUsage::VERTEX_BUFFER))
        .unwrap();
    let b = r
        .allocator
        .create_buffer(&BufferDesc::new(1024, BufferUsage::VERTEX_BUFFER))
        .unwrap();

    r.allocator.destroy_buffer(a);
    assert!(r.allocator.get_buffer(a).is_none());
    assert!(r.allocator.get_buffer(b).is_some());

    // The freed index is handed out again.
    let c = r
        .allocator
        .create_buffer(&BufferDesc::new(512, BufferUsage::INDEX_BUFFER))
        .unwrap();
    assert_eq!(c, a);
    assert_eq!(r.allocator.get_size(a), Some(512));
}

#[test]
fn test_invalid_handle_is_inert() {
    let mut r = Renderer::small();

    assert!(r.allocator.get_buffer(BufferHandle::INVALID).is_none());
    r.allocator.destroy_buffer(BufferHandle::INVALID);
    r.allocator.destroy_buffer(BufferHandle::from_raw(9999));
    assert!(r.arena.get_transient_image(Default::default()).is_none());
}

#[test]
fn test_initial_data_reaches_host_memory() {
    let mut r = Renderer::small();

    let data: Vec<u8> = (0..64).collect();
    let h = r
        .allocator
        .create_buffer(
            &BufferDesc::new(64, BufferUsage::UNIFORM_BUFFER)
                .memory_properties(MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT)
                .initial_data(&data),
        )
        .unwrap();

    let memory = r.allocator.get_allocation(h).unwrap().memory;
    let bytes = r.device.read_memory(memory).unwrap();
    assert_eq!(&bytes[..64], &data[..]);
}

#[test]
fn test_ring_slices_stay_inside_active_region() {
    let device = Arc::new(DummyDevice::new());
    let mut allocator = BufferAllocator::new();
    allocator.init(device, Arc::new(DedicatedMemory::new()));

    let mut ring = FrameRingBuffer::new();
    ring.init(&mut allocator, 1000, 3, BufferUsage::UNIFORM_BUFFER).unwrap();

    for frame in 0..6u64 {
        ring.begin_frame(frame);
        let start = ring.region_offset(ring.active_frame());
        let end = start + ring.bytes_per_frame();

        let mut sizes = [100u64, 37, 250, 64, 333, 17].into_iter().cycle();
        while let Some(slice) = ring.allocate(sizes.next().unwrap(), 64) {
            assert!(slice.offset >= start);
            assert!(slice.offset + slice.size <= end);
            assert_eq!(slice.offset % 64, 0);
        }
    }

    ring.shutdown(&mut allocator);
}

#[test]
fn test_unaligned_budget_fits_whole_region_every_frame() {
    let device = Arc::new(DummyDevice::new());
    let mut allocator = BufferAllocator::new();
    allocator.init(device, Arc::new(DedicatedMemory::new()));

    let mut ring = FrameRingBuffer::new();
    ring.init(&mut allocator, 1000, 3, BufferUsage::UNIFORM_BUFFER).unwrap();

    for frame in 0..6u64 {
        ring.begin_frame(frame);
        let slice = ring.allocate(1000, 64).unwrap();
        assert_eq!(slice.offset, ring.region_offset(ring.active_frame()));
        assert_eq!(slice.offset % 64, 0);
        assert_eq!(ring.remaining(), 0);
    }

    ring.shutdown(&mut allocator);
}

#[test]
fn test_upload_budget_scenario() {
    let mut r = Renderer::small();

    r.arena.begin_frame(&mut r.allocator, 0);
    assert!(r
        .arena
        .allocate_upload(2048, 16, FrameArenaUploadKind::CameraUniform)
        .is_some());
    assert!(r
        .arena
        .allocate_upload(2048, 16, FrameArenaUploadKind::InstanceData)
        .is_some());
    assert!(r
        .arena
        .allocate_upload(2048, 16, FrameArenaUploadKind::InstanceData)
        .is_none());
    assert!(r.sink.codes().contains(&"FR102"));

    r.arena.begin_frame(&mut r.allocator, 1);
    assert!(r
        .arena
        .allocate_upload(2048, 16, FrameArenaUploadKind::PreviewData)
        .is_some());
}

#[test]
fn test_exhausted_region_recovers_after_begin_frame() {
    let mut r = Renderer::small();

    for frame in 0..9u64 {
        r.arena.begin_frame(&mut r.allocator, frame);
        assert!(r.arena.allocate_upload(4096, 256, FrameArenaUploadKind::Unknown).is_some());
        assert!(r.arena.allocate_upload(1, 1, FrameArenaUploadKind::Unknown).is_none());
    }
}

#[test]
fn test_upload_writes_are_visible_in_ring_memory() {
    let mut r = Renderer::small();

    r.arena.begin_frame(&mut r.allocator, 1);
    let slice = r
        .arena
        .allocate_upload(16, 16, FrameArenaUploadKind::CameraUniform)
        .unwrap();
    assert_eq!(slice.write(&[0xAB; 16]), 16);

    let memory = r
        .allocator
        .get_allocation(r.arena.upload_buffer_handle())
        .unwrap()
        .memory;
    let bytes = r.device.read_memory(memory).unwrap();
    let at = slice.offset as usize;
    assert!(bytes[at..at + 16].iter().all(|b| *b == 0xAB));
}

#[test]
fn test_alias_reuse_scenario() {
    let mut r = Renderer::small();

    let a = r
        .arena
        .create_transient_image(
            &color(256, 256).aliased(single(FrameArenaPass::Prepass)),
            FrameArenaImageLifetime::Persistent,
        )
        .unwrap();
    let b = r
        .arena
        .create_transient_image(
            &color(256, 256).aliased(single(FrameArenaPass::Post)),
            FrameArenaImageLifetime::Persistent,
        )
        .unwrap();

    let info_a = r.arena.image_info(a).unwrap();
    let info_b = r.arena.image_info(b).unwrap();
    assert!(info_a.alias_block.is_some());
    assert_eq!(info_a.alias_block, info_b.alias_block);
    assert_eq!(r.arena.resident_stats().image_alias_reuses, 1);
    assert_eq!(r.arena.active_stats().image_alias_reuses, 1);
}

#[test]
fn test_overlapping_ranges_never_share_a_block() {
    let mut r = Renderer::small();
    let ranges = [
        PassRange::new(FrameArenaPass::Prepass, FrameArenaPass::Main).unwrap(),
        PassRange::new(FrameArenaPass::Shadow, FrameArenaPass::Ssao).unwrap(),
        PassRange::new(FrameArenaPass::Main, FrameArenaPass::Ui).unwrap(),
        single(FrameArenaPass::Post),
        single(FrameArenaPass::Ui),
    ];

    let handles: Vec<_> = ranges
        .iter()
        .map(|range| {
            r.arena
                .create_transient_image(&color(128, 128).aliased(*range), FrameArenaImageLifetime::Persistent)
                .unwrap()
        })
        .collect();

    for handle in &handles {
        let registered = r.arena.alias_block_ranges(*handle).unwrap();
        for (i, x) in registered.iter().enumerate() {
            for y in &registered[i + 1..] {
                assert!(!x.overlaps(y), "{} overlaps {}", x, y);
            }
        }
    }
}

#[test]
fn test_destroy_decrements_and_frees_block_for_reuse() {
    let mut r = Renderer::small();

    let a = r
        .arena
        .create_transient_image(
            &color(64, 64).aliased(single(FrameArenaPass::Shadow)),
            FrameArenaImageLifetime::Persistent,
        )
        .unwrap();
    let b = r
        .arena
        .create_transient_image(
            &color(64, 64).aliased(single(FrameArenaPass::Main)),
            FrameArenaImageLifetime::Persistent,
        )
        .unwrap();
    let block = r.arena.image_info(a).unwrap().alias_block;

    r.arena.destroy_transient_image(a);
    assert_eq!(r.arena.alias_block_ranges(b).unwrap(), vec![single(FrameArenaPass::Main)]);
    assert_eq!(r.arena.alias_block_count(), 1);

    r.arena.destroy_transient_image(b);
    assert_eq!(r.arena.alias_block_count(), 0);

    let c = r
        .arena
        .create_transient_image(
            &color(64, 64).aliased(single(FrameArenaPass::Ui)),
            FrameArenaImageLifetime::Persistent,
        )
        .unwrap();
    assert_eq!(r.arena.image_info(c).unwrap().alias_block, block);
}

#[test]
fn test_buffer_stats_return_to_zero() {
    let mut r = Renderer::small();
    r.arena.begin_frame(&mut r.allocator, 0);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            r.arena
                .create_transient_buffer(&mut r.allocator, &BufferDesc::new(4096, BufferUsage::STORAGE_BUFFER))
                .unwrap()
        })
        .collect();
    assert_eq!(r.arena.resident_stats().buffer_bytes, 40960);
    assert_eq!(r.arena.resident_stats().buffer_count, 10);
    assert_eq!(r.arena.active_stats().transient_buffer_count, 10);

    for h in handles {
        r.arena.destroy_transient_buffer(&mut r.allocator, h);
    }
    assert_eq!(r.arena.resident_stats().buffer_bytes, 0);
    assert_eq!(r.arena.resident_stats().buffer_count, 0);
}

#[test]
fn test_frame_transient_resources_reclaimed_on_slot_reuse() {
    let mut r = Renderer::small();

    r.arena.begin_frame(&mut r.allocator, 4); // slot 1
    let image = r
        .arena
        .create_transient_image(&color(64, 64), FrameArenaImageLifetime::FrameTransient)
        .unwrap();
    let persistent = r
        .arena
        .create_transient_image(&color(64, 64), FrameArenaImageLifetime::Persistent)
        .unwrap();
    let buffer = r
        .arena
        .create_transient_buffer(&mut r.allocator, &BufferDesc::new(256, BufferUsage::VERTEX_BUFFER))
        .unwrap();

    r.arena.begin_frame(&mut r.allocator, 5);
    r.arena.begin_frame(&mut r.allocator, 6);
    assert!(r.arena.get_transient_image(image).is_some());
    assert!(r.allocator.is_valid(buffer));

    r.arena.begin_frame(&mut r.allocator, 7); // slot 1 again
    assert!(r.arena.get_transient_image(image).is_none());
    assert!(!r.allocator.is_valid(buffer));
    assert!(r.arena.get_transient_image(persistent).is_some());
    assert_eq!(r.arena.resident_stats().image_count, 1);
    assert_eq!(r.arena.resident_stats().buffer_count, 0);
}

#[test]
fn test_validation_failures_have_no_side_effects() {
    let mut r = Renderer::small();
    let before = r.device.live_objects();

    let zero = color(0, 64);
    assert!(matches!(
        r.arena.create_transient_image(&zero, FrameArenaImageLifetime::Persistent),
        Err(ArenaError::Validation(_))
    ));

    let undefined = TransientImageDesc::new_2d(Format::UNDEFINED, 64, 64, ImageUsage::SAMPLED);
    assert!(matches!(
        r.arena.create_transient_image(&undefined, FrameArenaImageLifetime::Persistent),
        Err(ArenaError::Validation(_))
    ));

    assert!(matches!(
        r.allocator.create_buffer(&BufferDesc::new(0, BufferUsage::UNIFORM_BUFFER)),
        Err(ArenaError::Validation(_))
    ));

    assert_eq!(r.device.live_objects(), before);
    assert!(r.sink.codes().contains(&"FR202"));
    assert!(r.sink.codes().contains(&"FR001"));
}

#[test]
fn test_creation_failures_roll_back() {
    let mut r = Renderer::small();
    let before = r.device.live_objects();

    for op in [
        DeviceOp::CreateImage,
        DeviceOp::AllocateMemory,
        DeviceOp::BindImageMemory,
        DeviceOp::CreateImageView,
    ] {
        r.device.fail_next(op);
        let result = r.arena.create_transient_image(
            &color(64, 64).aliased(single(FrameArenaPass::Main)),
            FrameArenaImageLifetime::Persistent,
        );
        assert!(matches!(result, Err(ArenaError::ResourceCreation(_))), "{:?}", op);
        assert_eq!(r.device.live_objects(), before, "{:?}", op);
    }

    for op in [DeviceOp::CreateBuffer, DeviceOp::AllocateMemory, DeviceOp::BindBufferMemory] {
        r.device.fail_next(op);
        assert!(r
            .allocator
            .create_buffer(&BufferDesc::new(128, BufferUsage::STORAGE_BUFFER))
            .is_err());
        assert_eq!(r.device.live_objects(), before, "{:?}", op);
    }

    // Still usable afterwards.
    assert!(r
        .arena
        .create_transient_image(&color(64, 64), FrameArenaImageLifetime::Persistent)
        .is_ok());
}

#[test]
fn test_shutdown_releases_every_native_object() {
    let mut r = Renderer::small();

    for frame in 0..5u64 {
        r.arena.begin_frame(&mut r.allocator, frame);
        r.arena.allocate_upload(512, 256, FrameArenaUploadKind::InstanceData);
        r.arena
            .create_transient_buffer(&mut r.allocator, &BufferDesc::new(1024, BufferUsage::STORAGE_BUFFER))
            .unwrap();
        r.arena
            .create_transient_image(
                &color(128, 128).aliased(single(FrameArenaPass::Ssao)),
                FrameArenaImageLifetime::FrameTransient,
            )
            .unwrap();
        r.arena
            .create_transient_image(&color(32, 32), FrameArenaImageLifetime::Persistent)
            .unwrap();
    }

    let report = r.arena.destroy_all_images();
    assert!(report.is_clean(), "{}", report);

    r.arena.shutdown(&mut r.allocator);
    r.allocator.shutdown();
    assert_eq!(r.device.live_objects(), LiveObjects::default());
    assert!(!r.sink.codes().iter().any(|c| c.starts_with("FR9")));
}

#[test]
fn test_arena_reinit_after_shutdown() {
    let mut r = Renderer::small();
    r.arena.shutdown(&mut r.allocator);
    assert!(!r.arena.is_initialized());
    assert!(r.arena.allocate_upload(16, 16, FrameArenaUploadKind::Unknown).is_none());

    let device = r.device.clone();
    r.arena
        .init(&mut r.allocator, device, FrameArenaConfig::minimal())
        .unwrap();
    r.arena.begin_frame(&mut r.allocator, 0);
    assert!(r.arena.allocate_upload(16, 16, FrameArenaUploadKind::Unknown).is_some());
}
