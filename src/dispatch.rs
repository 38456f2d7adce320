//! Data-parallel dispatch capability.
//!
//! A [`Kernel`] is run over an [`NdRange`]: a 1-D grid of `global_size` work
//! items split into groups of `local_size`. Each work group receives its own
//! contiguous chunk of the output buffer, so no two groups can ever write the
//! same element. A [`Dispatcher`] returns only once every group has finished,
//! which makes the end of a dispatch a full barrier.

use crate::error::BackendError;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NdRange {
    global_size: usize,
    local_size: usize,
}

impl NdRange {
    pub fn new(global_size: usize, local_size: usize) -> Result<Self, BackendError> {
        if local_size == 0 || global_size % local_size != 0 {
            return Err(BackendError::InvalidRange {
                global_size,
                local_size,
            });
        }
        Ok(NdRange {
            global_size,
            local_size,
        })
    }

    /// Smallest grid with at least `work_items` items, rounded up to whole groups.
    pub fn covering(work_items: usize, local_size: usize) -> Result<Self, BackendError> {
        if local_size == 0 {
            return Err(BackendError::InvalidRange {
                global_size: work_items,
                local_size,
            });
        }
        Self::new(work_items.div_ceil(local_size) * local_size, local_size)
    }

    pub fn global_size(&self) -> usize {
        self.global_size
    }

    pub fn local_size(&self) -> usize {
        self.local_size
    }

    pub fn num_groups(&self) -> usize {
        self.global_size / self.local_size
    }

    pub fn group(&self, id: usize) -> WorkGroup {
        WorkGroup {
            id,
            local_size: self.local_size,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkGroup {
    id: usize,
    local_size: usize,
}

impl WorkGroup {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn local_size(&self) -> usize {
        self.local_size
    }

    /// Work items of this group in local-id order.
    pub fn items(&self) -> impl Iterator<Item = WorkItem> {
        let group_id = self.id;
        let base = group_id * self.local_size;
        (0..self.local_size).map(move |local_id| WorkItem {
            global_id: base + local_id,
            group_id,
            local_id,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkItem {
    pub global_id: usize,
    pub group_id: usize,
    pub local_id: usize,
}

/// A stage function executed once per work group.
pub trait Kernel: Sync {
    type Output: Send;

    fn name(&self) -> &'static str;

    /// Output elements owned by one work group.
    fn group_width(&self) -> usize;

    /// Runs every work item of `group`. `out` is the group's exclusive output
    /// chunk; the last group's chunk may be shorter than `group_width()`.
    fn run_group(&self, group: WorkGroup, out: &mut [Self::Output]);
}

/// Executes kernels over a grid with barrier semantics.
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs `kernel` over `range`, writing into `out`. Groups past the end of
    /// `out` have nothing to write and are skipped.
    fn dispatch<K: Kernel>(
        &self,
        range: NdRange,
        kernel: &K,
        out: &mut [K::Output],
    ) -> Result<(), BackendError>;
}

/// Checks that `range` has enough groups to cover `out_len` output elements.
fn check_coverage<K: Kernel>(
    range: NdRange,
    kernel: &K,
    out_len: usize,
) -> Result<usize, BackendError> {
    let width = kernel.group_width();
    if width == 0 {
        return Err(BackendError::EmptyGroupOutput {
            kernel: kernel.name(),
        });
    }
    let required = out_len.div_ceil(width);
    if required > range.num_groups() {
        return Err(BackendError::GridTooSmall {
            kernel: kernel.name(),
            required,
            available: range.num_groups(),
        });
    }
    Ok(width)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_groups_parallel<K: Kernel>(
    range: NdRange,
    kernel: &K,
    out: &mut [K::Output],
    width: usize,
) {
    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(group_id, chunk)| kernel.run_group(range.group(group_id), chunk));
}

/// Runs work groups in parallel on a rayon thread pool.
pub struct RayonDispatcher {
    pool: Option<ThreadPool>,
}

impl RayonDispatcher {
    /// Uses the global rayon pool.
    pub fn global() -> Self {
        RayonDispatcher { pool: None }
    }

    /// Uses a dedicated pool of `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, BackendError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("kmeans-worker-{}", i))
            .build()
            .map_err(|e| BackendError::ThreadPool(e.to_string()))?;
        Ok(RayonDispatcher { pool: Some(pool) })
    }

    pub fn current_num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Default for RayonDispatcher {
    fn default() -> Self {
        Self::global()
    }
}

impl Dispatcher for RayonDispatcher {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn dispatch<K: Kernel>(
        &self,
        range: NdRange,
        kernel: &K,
        out: &mut [K::Output],
    ) -> Result<(), BackendError> {
        let width = check_coverage(range, kernel, out.len())?;
        panic::catch_unwind(AssertUnwindSafe(|| match &self.pool {
            Some(pool) => pool.install(|| run_groups_parallel(range, kernel, out, width)),
            None => run_groups_parallel(range, kernel, out, width),
        }))
        .map_err(|payload| BackendError::KernelPanicked {
            kernel: kernel.name(),
            message: panic_message(payload),
        })
    }
}

/// Runs work groups one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialDispatcher;

impl Dispatcher for SerialDispatcher {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn dispatch<K: Kernel>(
        &self,
        range: NdRange,
        kernel: &K,
        out: &mut [K::Output],
    ) -> Result<(), BackendError> {
        let width = check_coverage(range, kernel, out.len())?;
        panic::catch_unwind(AssertUnwindSafe(|| {
            for (group_id, chunk) in out.chunks_mut(width).enumerate() {
                kernel.run_group(range.group(group_id), chunk);
            }
        }))
        .map_err(|payload| BackendError::KernelPanicked {
            kernel: kernel.name(),
            message: panic_message(payload),
        })
    }
}
