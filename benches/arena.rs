use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framearena::{
    BufferAllocator, BufferDesc, BufferUsage, DedicatedMemory, DummyDevice, FrameArenaConfig,
    FrameArenaImageLifetime, FrameArenaPass, FrameArenaUploadKind, Format, ImageUsage, PassRange, TransientImageDesc,
    TransientResourceArena,
};
use std::sync::Arc;

fn setup(config: FrameArenaConfig) -> (BufferAllocator, TransientResourceArena) {
    let device = Arc::new(DummyDevice::new());
    let mut allocator = BufferAllocator::new();
    allocator.init(device.clone(), Arc::new(DedicatedMemory::new()));
    let mut arena = TransientResourceArena::new();
    arena.init(&mut allocator, device, config).unwrap();
    (allocator, arena)
}

// =============================================================================
// UPLOAD RING
// =============================================================================

fn bench_upload_alloc(c: &mut Criterion) {
    let mut group = c.benchmark_group("upload_alloc");

    for size in [64u64, 256, 4096] {
        group.throughput(Throughput::Bytes(size));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let (mut allocator, mut arena) = setup(FrameArenaConfig::high_throughput());
            let mut frame = 0u64;
            arena.begin_frame(&mut allocator, frame);
            b.iter(|| {
                let slice = match arena.allocate_upload(size, 256, FrameArenaUploadKind::InstanceData) {
                    Some(slice) => slice,
                    None => {
                        frame += 1;
                        arena.begin_frame(&mut allocator, frame);
                        arena
                            .allocate_upload(size, 256, FrameArenaUploadKind::InstanceData)
                            .unwrap()
                    }
                };
                black_box(slice);
            });
            arena.shutdown(&mut allocator);
        });
    }

    group.finish();
}

// =============================================================================
// TRANSIENT BUFFERS
// =============================================================================

fn bench_transient_buffer_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient_buffer_frame");

    for count in [16usize, 128] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let (mut allocator, mut arena) = setup(FrameArenaConfig::minimal());
            let desc = BufferDesc::new(1024, BufferUsage::STORAGE_BUFFER);
            let mut frame = 0u64;
            b.iter(|| {
                arena.begin_frame(&mut allocator, frame);
                for _ in 0..count {
                    black_box(arena.create_transient_buffer(&mut allocator, &desc).unwrap());
                }
                frame += 1;
            });
            arena.shutdown(&mut allocator);
        });
    }

    group.finish();
}

// =============================================================================
// TRANSIENT IMAGES
// =============================================================================

fn bench_aliased_images(c: &mut Criterion) {
    let mut group = c.benchmark_group("transient_images");

    group.bench_function("aliased_frame", |b| {
        let (mut allocator, mut arena) = setup(FrameArenaConfig::minimal());
        let descs: Vec<_> = FrameArenaPass::ALL
            .iter()
            .map(|pass| {
                TransientImageDesc::new_2d(Format::R16G16B16A16_SFLOAT, 512, 512, ImageUsage::COLOR_ATTACHMENT)
                    .aliased(PassRange::single(*pass))
            })
            .collect();
        let mut frame = 0u64;
        b.iter(|| {
            arena.begin_frame(&mut allocator, frame);
            for desc in &descs {
                black_box(
                    arena
                        .create_transient_image(desc, FrameArenaImageLifetime::FrameTransient)
                        .unwrap(),
                );
            }
            frame += 1;
        });
        arena.shutdown(&mut allocator);
    });

    group.bench_function("dedicated_frame", |b| {
        let (mut allocator, mut arena) = setup(FrameArenaConfig::minimal());
        let desc = TransientImageDesc::new_2d(Format::R16G16B16A16_SFLOAT, 512, 512, ImageUsage::COLOR_ATTACHMENT);
        let mut frame = 0u64;
        b.iter(|| {
            arena.begin_frame(&mut allocator, frame);
            for _ in 0..FrameArenaPass::ALL.len() {
                black_box(
                    arena
                        .create_transient_image(&desc, FrameArenaImageLifetime::FrameTransient)
                        .unwrap(),
                );
            }
            frame += 1;
        });
        arena.shutdown(&mut allocator);
    });

    group.finish();
}

criterion_group!(benches, bench_upload_alloc, bench_transient_buffer_frame, bench_aliased_images);
criterion_main!(benches);
