use crate::point_store::Point;
use serde::{Deserialize, Serialize};

/// Running `(sum_x, sum_y, count)` of the points one lane saw for one cluster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialSum {
    pub sum_x: f32,
    pub sum_y: f32,
    pub count: u32,
}

impl PartialSum {
    pub const ZERO: PartialSum = PartialSum {
        sum_x: 0.0,
        sum_y: 0.0,
        count: 0,
    };

    #[inline]
    pub fn add_point(&mut self, p: Point) {
        self.sum_x += p.x;
        self.sum_y += p.y;
        self.count += 1;
    }

    #[inline]
    pub fn merge(&mut self, other: &PartialSum) {
        self.sum_x += other.sum_x;
        self.sum_y += other.sum_y;
        self.count += other.count;
    }

    /// Mean position, or `None` when no point was accumulated.
    pub fn mean(&self) -> Option<Point> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f32;
        Some(Point::new(self.sum_x / n, self.sum_y / n))
    }
}

/// Scratch arena holding one [`PartialSum`] per (cluster, shard).
///
/// Slots are stored shard-major: the `class_n` slots of one shard are
/// contiguous, so a lane's whole output is one disjoint sub-slice.
#[derive(Clone, Debug)]
pub struct PartialBank {
    class_n: usize,
    shard_count: usize,
    slots: Vec<PartialSum>,
}

impl PartialBank {
    pub fn new(class_n: usize, shard_count: usize) -> Self {
        PartialBank {
            class_n,
            shard_count,
            slots: vec![PartialSum::ZERO; class_n * shard_count],
        }
    }

    pub fn class_n(&self) -> usize {
        self.class_n
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    #[inline]
    fn index(&self, cluster: usize, shard: usize) -> usize {
        debug_assert!(cluster < self.class_n && shard < self.shard_count);
        shard * self.class_n + cluster
    }

    #[inline]
    pub fn get(&self, cluster: usize, shard: usize) -> PartialSum {
        self.slots[self.index(cluster, shard)]
    }

    /// The `class_n` slots owned by `shard`.
    pub fn shard(&self, shard: usize) -> &[PartialSum] {
        let start = shard * self.class_n;
        &self.slots[start..start + self.class_n]
    }

    pub fn slots(&self) -> &[PartialSum] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [PartialSum] {
        &mut self.slots
    }

    /// Per-cluster sums over all shards.
    pub fn cluster_totals(&self) -> Vec<PartialSum> {
        let mut totals = vec![PartialSum::ZERO; self.class_n];
        for lane in self.slots.chunks(self.class_n.max(1)) {
            for (total, slot) in totals.iter_mut().zip(lane) {
                total.merge(slot);
            }
        }
        totals
    }

    /// Number of points accounted for across the whole bank.
    pub fn total_count(&self) -> u64 {
        self.slots.iter().map(|s| s.count as u64).sum()
    }
}

/// Combines `partials` pairwise, halving the active width each round, and
/// returns the total. The slice is used as scratch space.
pub fn tree_reduce(partials: &mut [PartialSum]) -> PartialSum {
    let mut width = partials.len();
    while width > 1 {
        let half = width.div_ceil(2);
        let (low, high) = partials.split_at_mut(half);
        for (dst, src) in low.iter_mut().zip(&high[..width - half]) {
            dst.merge(src);
        }
        width = half;
    }
    partials.first().copied().unwrap_or_default()
}
