//! Performance benchmarks for roipool-kernels
//!
//! Run with: cargo bench -p roipool-kernels
//!
//! Benchmarks cover:
//! - Forward pooling (serial & parallel, with and without argmax)
//! - Backward pooling (serial & parallel)
//! - Pool-by-class forward

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use roipool_core::{FeatureMap, FeatureMapDims, PoolMode, Region, RegionList, RoiPoolConfig};
use roipool_kernels::*;
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn random_map(dims: FeatureMapDims, rng: &mut StdRng) -> Vec<f32> {
    (0..dims.len()).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Proposal-like regions in input-image coordinates (feature stride 16)
fn random_regions(
    dims: FeatureMapDims,
    count: usize,
    mode: PoolMode,
    rng: &mut StdRng,
) -> RegionList {
    let image_h = (dims.height * 16) as f32;
    let image_w = (dims.width * 16) as f32;
    let regions: Vec<Region> = (0..count)
        .map(|_| {
            let x1 = rng.random_range(0.0..image_w - 32.0);
            let y1 = rng.random_range(0.0..image_h - 32.0);
            let x2 = rng.random_range(x1 + 16.0..image_w);
            let y2 = rng.random_range(y1 + 16.0..image_h);
            Region::new(
                rng.random_range(0..dims.batch),
                rng.random_range(0..dims.channels) as i64,
                x1,
                y1,
                x2,
                y2,
            )
        })
        .collect();
    RegionList::from_regions(regions, &dims, mode).expect("valid benchmark regions")
}

fn bench_forward(c: &mut Criterion) {
    let mut group = c.benchmark_group("roi_pool_forward");
    let mut rng = StdRng::seed_from_u64(42);

    for &count in [16, 64, 256].iter() {
        let dims = FeatureMapDims::new(2, 38, 50, 64);
        let data = random_map(dims, &mut rng);
        let map = FeatureMap::new(&data, dims).expect("valid benchmark map");
        let regions = random_regions(dims, count, PoolMode::AllChannels, &mut rng);
        let config = RoiPoolConfig::new(7, 7).with_spatial_scale(1.0 / 16.0);

        let cells = count * config.pooled_cells() * dims.channels;
        group.throughput(Throughput::Elements(cells as u64));

        group.bench_with_input(BenchmarkId::new("serial", count), &count, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    roi_pool_forward(&map, &regions, &config, &ParallelConfig::serial())
                        .expect("forward"),
                );
            });
        });

        group.bench_with_input(
            BenchmarkId::new("values_only", count),
            &count,
            |bencher, _| {
                bencher.iter(|| {
                    black_box(
                        roi_pool_forward_values(&map, &regions, &config, &ParallelConfig::serial())
                            .expect("forward"),
                    );
                });
            },
        );

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    roi_pool_forward(&map, &regions, &config, &ParallelConfig::default())
                        .expect("forward"),
                );
            });
        });
    }
    group.finish();
}

fn bench_backward(c: &mut Criterion) {
    let mut group = c.benchmark_group("roi_pool_backward");
    let mut rng = StdRng::seed_from_u64(7);

    for &count in [16, 64, 256].iter() {
        let dims = FeatureMapDims::new(2, 38, 50, 64);
        let data = random_map(dims, &mut rng);
        let map = FeatureMap::new(&data, dims).expect("valid benchmark map");
        let regions = random_regions(dims, count, PoolMode::AllChannels, &mut rng);
        let config = RoiPoolConfig::new(7, 7).with_spatial_scale(1.0 / 16.0);

        let output = roi_pool_forward(&map, &regions, &config, &ParallelConfig::default())
            .expect("forward");
        let output_grad = vec![1.0f32; output.values.len()];

        group.throughput(Throughput::Elements(dims.len() as u64));

        group.bench_with_input(BenchmarkId::new("serial", count), &count, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    roi_pool_backward(
                        &output_grad,
                        &output.argmax,
                        dims,
                        &regions,
                        &config,
                        &ParallelConfig::serial(),
                    )
                    .expect("backward"),
                );
            });
        });

        #[cfg(feature = "parallel")]
        group.bench_with_input(BenchmarkId::new("parallel", count), &count, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    roi_pool_backward(
                        &output_grad,
                        &output.argmax,
                        dims,
                        &regions,
                        &config,
                        &ParallelConfig::default(),
                    )
                    .expect("backward"),
                );
            });
        });
    }
    group.finish();
}

fn bench_by_class(c: &mut Criterion) {
    let mut group = c.benchmark_group("roi_pool_by_class");
    let mut rng = StdRng::seed_from_u64(1234);

    let dims = FeatureMapDims::new(1, 38, 50, 21);
    let data = random_map(dims, &mut rng);
    let map = FeatureMap::new(&data, dims).expect("valid benchmark map");
    let config = RoiPoolConfig::new(7, 7)
        .with_spatial_scale(1.0 / 16.0)
        .with_mode(PoolMode::ByClass);

    for &count in [64, 300].iter() {
        let regions = random_regions(dims, count, PoolMode::ByClass, &mut rng);
        group.throughput(Throughput::Elements((count * config.pooled_cells()) as u64));

        group.bench_with_input(BenchmarkId::new("forward", count), &count, |bencher, _| {
            bencher.iter(|| {
                black_box(
                    roi_pool_forward(&map, &regions, &config, &ParallelConfig::default())
                        .expect("forward"),
                );
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_forward, bench_backward, bench_by_class);
criterion_main!(benches);
