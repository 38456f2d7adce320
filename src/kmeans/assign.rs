use crate::config::EngineConfig;
use crate::dispatch::{Dispatcher, Kernel, NdRange, WorkGroup};
use crate::error::BackendError;
use crate::point_store::{Label, Point};
use wide::f32x8;

const LANES: usize = 8;

/// Centroid coordinates packed eight at a time for SIMD distance evaluation.
/// Unused lanes hold NaN, which never compares below a real distance.
pub struct CentroidLanes {
    xs: Vec<f32x8>,
    ys: Vec<f32x8>,
}

impl CentroidLanes {
    pub fn new(centroids: &[Point]) -> Self {
        let blocks = centroids.len().div_ceil(LANES);
        let mut xs = Vec::with_capacity(blocks);
        let mut ys = Vec::with_capacity(blocks);
        for chunk in centroids.chunks(LANES) {
            let mut x = [f32::NAN; LANES];
            let mut y = [f32::NAN; LANES];
            for (i, c) in chunk.iter().enumerate() {
                x[i] = c.x;
                y[i] = c.y;
            }
            xs.push(f32x8::from(x));
            ys.push(f32x8::from(y));
        }
        CentroidLanes { xs, ys }
    }

    /// Index of the centroid nearest to `p`; ties go to the lower index.
    #[inline]
    pub fn nearest(&self, p: Point) -> Label {
        let px = f32x8::splat(p.x);
        let py = f32x8::splat(p.y);
        let mut best_dist = f32::INFINITY;
        let mut best_c = 0usize;

        for (block, (cx, cy)) in self.xs.iter().zip(&self.ys).enumerate() {
            let dx = px - *cx;
            let dy = py - *cy;
            let dist = (dx * dx + dy * dy).to_array();
            for (lane, &d) in dist.iter().enumerate() {
                if d < best_dist {
                    best_dist = d;
                    best_c = block * LANES + lane;
                }
            }
        }

        best_c as Label
    }
}

/// Labels `points_per_item` consecutive points per work item.
pub struct AssignKernel<'a> {
    centroids: CentroidLanes,
    points: &'a [Point],
    points_per_item: usize,
    local_size: usize,
}

impl<'a> AssignKernel<'a> {
    pub fn new(
        centroids: &[Point],
        points: &'a [Point],
        points_per_item: usize,
        local_size: usize,
    ) -> Self {
        AssignKernel {
            centroids: CentroidLanes::new(centroids),
            points,
            points_per_item,
            local_size,
        }
    }

    /// Grid with enough items to cover every point.
    pub fn range(&self) -> Result<NdRange, BackendError> {
        NdRange::covering(
            self.points.len().div_ceil(self.points_per_item),
            self.local_size,
        )
    }
}

impl Kernel for AssignKernel<'_> {
    type Output = Label;

    fn name(&self) -> &'static str {
        "kmeans_assign"
    }

    fn group_width(&self) -> usize {
        self.local_size * self.points_per_item
    }

    fn run_group(&self, group: WorkGroup, out: &mut [Label]) {
        for (item, labels) in group.items().zip(out.chunks_mut(self.points_per_item)) {
            let first = item.global_id * self.points_per_item;
            let points = &self.points[first..first + labels.len()];
            for (label, &p) in labels.iter_mut().zip(points) {
                *label = self.centroids.nearest(p);
            }
        }
    }
}

/// Overwrites every label with the index of its nearest centroid.
pub fn assign_points<D: Dispatcher>(
    dispatcher: &D,
    config: &EngineConfig,
    centroids: &[Point],
    points: &[Point],
    labels: &mut [Label],
) -> Result<(), BackendError> {
    let kernel = AssignKernel::new(
        centroids,
        points,
        config.assign_points_per_item,
        config.assign_local_size,
    );
    dispatcher.dispatch(kernel.range()?, &kernel, labels)
}
