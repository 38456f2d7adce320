use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, Kernel, NdRange, WorkGroup};
use crate::error::BackendError;
use crate::point_store::Point;
use crate::shards::{tree_reduce, PartialBank, PartialSum};

/// One work group per cluster. Each work item folds a strided subset of the
/// cluster's shards, then the group combines the item partials as a tree.
pub struct ReduceKernel<'a> {
    bank: &'a PartialBank,
    local_size: usize,
}

impl<'a> ReduceKernel<'a> {
    pub fn new(bank: &'a PartialBank, local_size: usize) -> Self {
        ReduceKernel { bank, local_size }
    }

    pub fn range(&self) -> Result<NdRange, BackendError> {
        NdRange::new(self.bank.class_n() * self.local_size, self.local_size)
    }

    /// Total of all shards for `cluster`.
    pub fn cluster_total(&self, group: WorkGroup) -> PartialSum {
        let cluster = group.id();
        let shard_count = self.bank.shard_count();
        let mut scratch: Vec<PartialSum> = group
            .items()
            .map(|item| {
                let mut acc = PartialSum::ZERO;
                for shard in (item.local_id..shard_count).step_by(self.local_size) {
                    acc.merge(&self.bank.get(cluster, shard));
                }
                acc
            })
            .collect();
        tree_reduce(&mut scratch)
    }
}

impl Kernel for ReduceKernel<'_> {
    type Output = Point;

    fn name(&self) -> &'static str {
        "kmeans_reduct"
    }

    fn group_width(&self) -> usize {
        1
    }

    fn run_group(&self, group: WorkGroup, out: &mut [Point]) {
        // Empty clusters keep their previous centroid.
        if let Some(mean) = self.cluster_total(group).mean() {
            out[0] = mean;
        }
    }
}

/// Replaces each centroid with the mean of its cluster's accumulated points.
pub fn reduce_partials<D: Dispatcher>(
    dispatcher: &D,
    config: &EngineConfig,
    bank: &PartialBank,
    centroids: &mut [Point],
) -> Result<(), BackendError> {
    let kernel = ReduceKernel::new(bank, config.reduce_local_size);
    dispatcher.dispatch(kernel.range()?, &kernel, centroids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{RayonDispatcher, SerialDispatcher};

    fn bank_with(class_n: usize, shard_count: usize, entries: &[(usize, usize, f32, f32, u32)]) -> PartialBank {
        let mut bank = PartialBank::new(class_n, shard_count);
        for &(cluster, shard, sum_x, sum_y, count) in entries {
            bank.slots_mut()[shard * class_n + cluster] = PartialSum {
                sum_x,
                sum_y,
                count,
            };
        }
        bank
    }

    #[test]
    fn test_means_are_summed_across_shards() {
        let bank = bank_with(
            2,
            10,
            &[(0, 0, 1.0, 2.0, 1), (0, 9, 3.0, 4.0, 1), (1, 4, 30.0, 60.0, 3)],
        );
        let mut centroids = vec![Point::default(); 2];
        let cfg = EngineConfig::new().with_reduce_local_size(4);

        reduce_partials(&SerialDispatcher, &cfg, &bank, &mut centroids).unwrap();
        assert_eq!(centroids, vec![Point::new(2.0, 3.0), Point::new(10.0, 20.0)]);
    }

    #[test]
    fn test_empty_cluster_keeps_previous_centroid() {
        let bank = bank_with(3, 8, &[(1, 2, 4.0, 4.0, 2)]);
        let before = vec![Point::new(-7.5, 0.25), Point::new(0.0, 0.0), Point::new(f32::MAX, 1.0)];
        let mut centroids = before.clone();
        let cfg = EngineConfig::new().with_reduce_local_size(3);

        reduce_partials(&RayonDispatcher::global(), &cfg, &bank, &mut centroids).unwrap();
        assert_eq!(centroids[0], before[0]);
        assert_eq!(centroids[1], Point::new(2.0, 2.0));
        assert_eq!(centroids[2], before[2]);
        assert!(centroids.iter().all(|c| !c.x.is_nan() && !c.y.is_nan()));
    }

    #[test]
    fn test_group_larger_than_shard_count() {
        let bank = bank_with(1, 3, &[(0, 0, 1.0, 1.0, 1), (0, 2, 3.0, 3.0, 1)]);
        let kernel = ReduceKernel::new(&bank, 64);
        let total = kernel.cluster_total(kernel.range().unwrap().group(0));
        assert_eq!(total.count, 2);
        assert_eq!(total.sum_x, 4.0);
    }
}
