//! Data-parallel dispatch over output slots
//!
//! Both pooling directions are "one work unit per output slot": forward owns
//! one pooled value and one argmax record per unit, backward owns one
//! gradient element. The helpers here hand each unit its flat slot index and
//! write its result into that slot only, so any grouping of units into
//! chunks or threads keeps exactly one writer per slot.
//!
//! # Performance
//!
//! Parallel dispatch pays off once the output has a few thousand slots.
//! Below [`ParallelConfig::min_parallel_size`] the serial loop runs instead.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use roipool_core::{RoiPoolError, RoiPoolResult};

/// Configuration for parallel kernel dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParallelConfig {
    /// Minimum number of output slots to dispatch in parallel (default: 4,096)
    pub min_parallel_size: usize,

    /// Number of worker threads (None = the global rayon pool)
    pub num_threads: Option<usize>,

    /// Output slots per work chunk (None = auto)
    pub chunk_size: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_parallel_size: 4_096,
            num_threads: None,
            chunk_size: None,
        }
    }
}

impl ParallelConfig {
    /// Configuration that always runs the serial loop
    pub fn serial() -> Self {
        Self {
            min_parallel_size: usize::MAX,
            ..Self::default()
        }
    }

    /// Set the serial/parallel threshold
    pub fn with_min_parallel_size(mut self, slots: usize) -> Self {
        self.min_parallel_size = slots;
        self
    }

    /// Run on a dedicated pool of `threads` workers
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Group `slots` output slots per work chunk
    pub fn with_chunk_size(mut self, slots: usize) -> Self {
        self.chunk_size = Some(slots);
        self
    }

    pub fn validate(&self) -> RoiPoolResult<()> {
        if self.num_threads == Some(0) {
            return Err(RoiPoolError::invalid_config(
                "num_threads",
                "must be positive",
            ));
        }
        if self.chunk_size == Some(0) {
            return Err(RoiPoolError::invalid_config(
                "chunk_size",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Whether an output of `slots` slots is dispatched in parallel
    pub fn runs_parallel(&self, slots: usize) -> bool {
        cfg!(feature = "parallel") && slots >= self.min_parallel_size && slots > 1
    }
}

/// Allocate `len` output slots holding `value`
///
/// Allocation failure is reported as [`RoiPoolError::Execution`] instead of
/// aborting the process.
pub(crate) fn alloc_slots<T: Clone>(buffer: &str, len: usize, value: T) -> RoiPoolResult<Vec<T>> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(len).map_err(|e| {
        RoiPoolError::execution(format!("{}: cannot allocate {} slots: {}", buffer, len, e))
    })?;
    slots.resize(len, value);
    Ok(slots)
}

/// Fill `out[i] = unit(i)` for every slot
pub(crate) fn fill<T, F>(
    out: &mut [T],
    config: &ParallelConfig,
    op: &str,
    unit: F,
) -> RoiPoolResult<()>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    config.validate()?;

    #[cfg(feature = "parallel")]
    {
        if config.runs_parallel(out.len()) {
            return pool::fill(out, config, op, &unit);
        }
    }

    log::debug!("{}: {} slots, serial", op, out.len());
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = unit(i);
    }
    Ok(())
}

/// Fill `(a[i], b[i]) = unit(i)` for every slot of two parallel buffers
pub(crate) fn fill_pair<A, B, F>(
    a: &mut [A],
    b: &mut [B],
    config: &ParallelConfig,
    op: &str,
    unit: F,
) -> RoiPoolResult<()>
where
    A: Send,
    B: Send,
    F: Fn(usize) -> (A, B) + Sync,
{
    config.validate()?;
    RoiPoolError::check_len(op, a.len(), b.len())?;

    #[cfg(feature = "parallel")]
    {
        if config.runs_parallel(a.len()) {
            return pool::fill_pair(a, b, config, op, &unit);
        }
    }

    log::debug!("{}: {} slots, serial", op, a.len());
    for (i, (slot_a, slot_b)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
        let (va, vb) = unit(i);
        *slot_a = va;
        *slot_b = vb;
    }
    Ok(())
}

#[cfg(feature = "parallel")]
mod pool {
    use super::ParallelConfig;
    use rayon::prelude::*;
    use roipool_core::{RoiPoolError, RoiPoolResult};

    fn chunk_len(config: &ParallelConfig, slots: usize, threads: usize) -> usize {
        config
            .chunk_size
            .unwrap_or_else(|| slots.div_ceil(threads * 8).max(64))
    }

    /// Run `job` on a dedicated pool when a thread count is configured
    fn run<R, J>(config: &ParallelConfig, job: J) -> RoiPoolResult<R>
    where
        R: Send,
        J: FnOnce() -> R + Send,
    {
        match config.num_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| RoiPoolError::execution(e.to_string()))?;
                Ok(pool.install(job))
            }
            None => Ok(job()),
        }
    }

    pub(super) fn fill<T, F>(
        out: &mut [T],
        config: &ParallelConfig,
        op: &str,
        unit: &F,
    ) -> RoiPoolResult<()>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        run(config, || {
            let chunk = chunk_len(config, out.len(), rayon::current_num_threads());
            log::debug!(
                "{}: {} slots on {} threads, chunks of {}",
                op,
                out.len(),
                rayon::current_num_threads(),
                chunk
            );
            out.par_chunks_mut(chunk)
                .enumerate()
                .for_each(|(chunk_idx, slots)| {
                    let base = chunk_idx * chunk;
                    for (j, slot) in slots.iter_mut().enumerate() {
                        *slot = unit(base + j);
                    }
                });
        })
    }

    pub(super) fn fill_pair<A, B, F>(
        a: &mut [A],
        b: &mut [B],
        config: &ParallelConfig,
        op: &str,
        unit: &F,
    ) -> RoiPoolResult<()>
    where
        A: Send,
        B: Send,
        F: Fn(usize) -> (A, B) + Sync,
    {
        run(config, || {
            let chunk = chunk_len(config, a.len(), rayon::current_num_threads());
            log::debug!(
                "{}: {} slots on {} threads, chunks of {}",
                op,
                a.len(),
                rayon::current_num_threads(),
                chunk
            );
            a.par_chunks_mut(chunk)
                .zip(b.par_chunks_mut(chunk))
                .enumerate()
                .for_each(|(chunk_idx, (slots_a, slots_b))| {
                    let base = chunk_idx * chunk;
                    for (j, (slot_a, slot_b)) in
                        slots_a.iter_mut().zip(slots_b.iter_mut()).enumerate()
                    {
                        let (va, vb) = unit(base + j);
                        *slot_a = va;
                        *slot_b = vb;
                    }
                });
        })
    }
}
