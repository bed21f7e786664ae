//! Detection-head ROI pooling walkthrough
//!
//! Pools random proposals from a synthetic backbone feature map, then runs
//! the backward pass the way a training step would.
//!
//! Run with: cargo run --example detection_head --features parallel

use anyhow::Result;
use roipool_core::{FeatureMap, FeatureMapDims, PoolMode, Region, RegionList, RoiPoolConfig};
use roipool_kernels::{roi_pool_backward, roi_pool_forward, ParallelConfig};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn main() -> Result<()> {
    env_logger::init();
    println!("=== Detection Head ROI Pooling ===\n");

    let mut rng = StdRng::seed_from_u64(2024);

    // Backbone output for a 600x800 image at stride 16
    let dims = FeatureMapDims::new(2, 38, 50, 256);
    let data: Vec<f32> = (0..dims.len())
        .map(|_| rng.random_range(0.0..1.0))
        .collect();
    let map = FeatureMap::new(&data, dims)?;

    println!("Feature map:");
    println!(
        "  batch {} × {}×{} × {} channels ({} values)",
        dims.batch,
        dims.height,
        dims.width,
        dims.channels,
        dims.len()
    );

    let proposals: Vec<Region> = (0..128)
        .map(|n| {
            let x1 = rng.random_range(0.0..700.0f32);
            let y1 = rng.random_range(0.0..500.0f32);
            let w = rng.random_range(16.0..200.0f32);
            let h = rng.random_range(16.0..200.0f32);
            Region::new(n % dims.batch, -1, x1, y1, (x1 + w).min(799.0), (y1 + h).min(599.0))
        })
        .collect();
    let regions = RegionList::from_regions(proposals, &dims, PoolMode::AllChannels)?;

    let config = RoiPoolConfig::new(7, 7).with_spatial_scale(1.0 / 16.0);
    let parallel = ParallelConfig::default();
    println!("  {} proposals, pooled to {}×{}\n", regions.len(), config.pooled_height, config.pooled_width);

    // Forward
    let start = std::time::Instant::now();
    let pooled = roi_pool_forward(&map, &regions, &config, &parallel)?;
    let forward_time = start.elapsed();

    let empty = pooled.argmax.iter().filter(|a| a.is_none()).count();
    println!("Forward:");
    println!("  Output shape: {:?}", pooled.dims.shape());
    println!("  Empty cells: {}", empty);
    println!("  Time: {:?}\n", forward_time);

    // Backward with a unit upstream gradient
    let output_grad = vec![1.0f32; pooled.values.len()];
    let start = std::time::Instant::now();
    let grad = roi_pool_backward(&output_grad, &pooled.argmax, dims, &regions, &config, &parallel)?;
    let backward_time = start.elapsed();

    let routed: f32 = grad.iter().sum();
    let touched = grad.iter().filter(|g| **g != 0.0).count();
    println!("Backward:");
    println!("  Gradient mass: {:.0} of {}", routed, output_grad.len() - empty);
    println!("  Elements receiving gradient: {}", touched);
    println!("  Time: {:?}", backward_time);

    Ok(())
}
