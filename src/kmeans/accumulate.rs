//! Partial accumulation into the sharded bank.
//!
//! Every lane walks its own range of points and keeps one running
//! [`PartialSum`] per cluster in a private array. When the range is done the
//! lane copies all `class_n` sums into the bank slots of its shard. Shards are
//! disjoint sub-slices of the bank, so lanes never touch each other's memory
//! and no atomics are needed. Lanes with an empty range still write zeroes,
//! which lets the reduce stage sum a fixed number of shards per cluster.

use crate::config::{EngineConfig, LaneLayout, MAX_CLUSTERS};
use crate::dispatch::{Dispatcher, Kernel, NdRange, WorkGroup};
use crate::error::BackendError;
use crate::point_store::{Label, Point};
use crate::shards::{PartialBank, PartialSum};
use std::iter::StepBy;
use std::ops::Range;

pub struct AccumulateKernel<'a> {
    points: &'a [Point],
    labels: &'a [Label],
    class_n: usize,
    lane_count: usize,
    local_size: usize,
    layout: LaneLayout,
}

impl<'a> AccumulateKernel<'a> {
    pub fn new(
        points: &'a [Point],
        labels: &'a [Label],
        class_n: usize,
        config: &EngineConfig,
    ) -> Self {
        AccumulateKernel {
            points,
            labels,
            class_n,
            lane_count: config.shard_count(),
            local_size: config.accumulate_local_size(),
            layout: config.lane_layout,
        }
    }

    pub fn range(&self) -> Result<NdRange, BackendError> {
        NdRange::new(self.lane_count, self.local_size)
    }

    /// Indices of the points handled by `lane`.
    pub fn lane_points(&self, lane: usize) -> StepBy<Range<usize>> {
        let n = self.points.len();
        match self.layout {
            LaneLayout::Contiguous => {
                let span = n.div_ceil(self.lane_count);
                let start = (lane * span).min(n);
                let end = (start + span).min(n);
                (start..end).step_by(1)
            }
            LaneLayout::Interleaved => (lane.min(n)..n).step_by(self.lane_count),
        }
    }

    fn accumulate_lane(&self, lane: usize, slots: &mut [PartialSum]) {
        let mut acc = [PartialSum::ZERO; MAX_CLUSTERS];
        for idx in self.lane_points(lane) {
            acc[self.labels[idx] as usize].add_point(self.points[idx]);
        }
        slots.copy_from_slice(&acc[..self.class_n]);
    }
}

impl Kernel for AccumulateKernel<'_> {
    type Output = PartialSum;

    fn name(&self) -> &'static str {
        "kmeans_update"
    }

    fn group_width(&self) -> usize {
        self.local_size * self.class_n
    }

    fn run_group(&self, group: WorkGroup, out: &mut [PartialSum]) {
        for (item, slots) in group.items().zip(out.chunks_mut(self.class_n)) {
            self.accumulate_lane(item.global_id, slots);
        }
    }
}

/// Fills every slot of `bank` from the current labels.
pub fn accumulate_partials<D: Dispatcher>(
    dispatcher: &D,
    config: &EngineConfig,
    points: &[Point],
    labels: &[Label],
    bank: &mut PartialBank,
) -> Result<(), BackendError> {
    let kernel = AccumulateKernel::new(points, labels, bank.class_n(), config);
    dispatcher.dispatch(kernel.range()?, &kernel, bank.slots_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SerialDispatcher;

    fn small_config(layout: LaneLayout) -> EngineConfig {
        EngineConfig::new()
            .with_compute_units(2)
            .with_workers_per_unit(2)
            .with_tasks_per_worker(2)
            .with_lane_layout(layout)
    }

    #[test]
    fn test_lanes_partition_every_point_once() {
        let points = vec![Point::default(); 21];
        let labels: Vec<Label> = vec![0; 21];
        for layout in [LaneLayout::Contiguous, LaneLayout::Interleaved] {
            let cfg = small_config(layout);
            let kernel = AccumulateKernel::new(&points, &labels, 1, &cfg);
            let mut seen = vec![0u32; points.len()];
            for lane in 0..cfg.shard_count() {
                for idx in kernel.lane_points(lane) {
                    seen[idx] += 1;
                }
            }
            assert!(seen.iter().all(|&c| c == 1), "{:?}: {:?}", layout, seen);
        }
    }

    #[test]
    fn test_contiguous_lanes_leave_short_tail() {
        let points = vec![Point::default(); 20];
        let labels: Vec<Label> = vec![0; 20];
        let cfg = small_config(LaneLayout::Contiguous);
        let kernel = AccumulateKernel::new(&points, &labels, 1, &cfg);

        // 20 points over 8 lanes: spans of 3, lane 6 gets the remainder, lane 7 nothing.
        assert_eq!(kernel.lane_points(0).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(kernel.lane_points(6).collect::<Vec<_>>(), vec![18, 19]);
        assert_eq!(kernel.lane_points(7).count(), 0);
    }

    #[test]
    fn test_idle_lanes_overwrite_stale_slots_with_zero() {
        let points = vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0), Point::new(5.0, 6.0)];
        let labels: Vec<Label> = vec![1, 0, 1];
        let cfg = small_config(LaneLayout::Contiguous);
        let mut bank = PartialBank::new(2, cfg.shard_count());
        let stale = PartialSum {
            sum_x: 99.0,
            sum_y: 99.0,
            count: 99,
        };
        bank.slots_mut().fill(stale);

        accumulate_partials(&SerialDispatcher, &cfg, &points, &labels, &mut bank).unwrap();

        assert_eq!(bank.total_count(), 3);
        for shard in 3..cfg.shard_count() {
            assert!(bank.shard(shard).iter().all(|s| *s == PartialSum::ZERO));
        }
        let totals = bank.cluster_totals();
        assert_eq!(totals[0].count, 1);
        assert_eq!(totals[1].count, 2);
        assert_eq!(totals[1].sum_x, 6.0);
        assert_eq!(totals[1].sum_y, 8.0);
    }
}
