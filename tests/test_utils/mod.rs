use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sharded_kmeans::dispatch::{Dispatcher, Kernel, NdRange};
use sharded_kmeans::kmeans::reference::nearest_centroid;
use sharded_kmeans::{BackendError, EngineConfig, Label, Point, SerialDispatcher};
use std::sync::Mutex;

/// Create synthetic data with well-separated square clusters
/// Returns (points, true_labels)
#[allow(dead_code)]
pub fn create_gaussian_clusters(
    num_clusters: usize,
    points_per_cluster: usize,
    separation: f32,
    seed: u64,
) -> (Vec<Point>, Vec<Label>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let total_points = num_clusters * points_per_cluster;
    let mut points = Vec::with_capacity(total_points);
    let mut true_labels = Vec::with_capacity(total_points);

    for cluster_id in 0..num_clusters {
        let center = Point::new(cluster_id as f32 * separation, (cluster_id % 3) as f32 * separation);
        for _ in 0..points_per_cluster {
            points.push(Point::new(
                center.x + rng.gen_range(-0.5..0.5),
                center.y + rng.gen_range(-0.5..0.5),
            ));
            true_labels.push(cluster_id as Label);
        }
    }

    (points, true_labels)
}

/// Points on an integer grid; their sums stay exact in f32 in any order
#[allow(dead_code)]
pub fn create_integer_points(n: usize, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Point::new(
                rng.gen_range(-64i32..64) as f32,
                rng.gen_range(-64i32..64) as f32,
            )
        })
        .collect()
}

/// Every point must carry the label of its nearest centroid (lowest index on ties)
#[allow(dead_code)]
pub fn verify_optimal_assignment(points: &[Point], centroids: &[Point], labels: &[Label]) -> bool {
    points
        .iter()
        .zip(labels)
        .all(|(p, &label)| nearest_centroid(p, centroids) == label)
}

/// Small grid so tests exercise many lanes per work group without 8192 shards
#[allow(dead_code)]
pub fn small_engine_config() -> EngineConfig {
    EngineConfig::new()
        .with_compute_units(2)
        .with_workers_per_unit(8)
        .with_tasks_per_worker(2)
        .with_assign_local_size(16)
        .with_reduce_local_size(8)
        .with_verify_partials(true)
}

/// Serial dispatcher that records every kernel it is asked to run and fails
/// from dispatch number `fail_at` (0-based) onwards.
#[allow(dead_code)]
pub struct FailingDispatcher {
    pub fail_at: usize,
    pub log: Mutex<Vec<&'static str>>,
}

#[allow(dead_code)]
impl FailingDispatcher {
    pub fn new(fail_at: usize) -> Self {
        FailingDispatcher {
            fail_at,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn dispatched(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }
}

impl Dispatcher for FailingDispatcher {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn dispatch<K: Kernel>(
        &self,
        range: NdRange,
        kernel: &K,
        out: &mut [K::Output],
    ) -> Result<(), BackendError> {
        let index = {
            let mut log = self.log.lock().unwrap();
            log.push(kernel.name());
            log.len() - 1
        };
        if index >= self.fail_at {
            return Err(BackendError::ThreadPool("device lost".to_string()));
        }
        SerialDispatcher.dispatch(range, kernel, out)
    }
}

/// Serial dispatcher that never runs group 0 of the named kernel.
#[allow(dead_code)]
pub struct SkipFirstGroupDispatcher {
    pub kernel: &'static str,
}

impl Dispatcher for SkipFirstGroupDispatcher {
    fn name(&self) -> &'static str {
        "skip-first-group"
    }

    fn dispatch<K: Kernel>(
        &self,
        range: NdRange,
        kernel: &K,
        out: &mut [K::Output],
    ) -> Result<(), BackendError> {
        if kernel.name() != self.kernel {
            return SerialDispatcher.dispatch(range, kernel, out);
        }
        for (group_id, chunk) in out.chunks_mut(kernel.group_width()).enumerate().skip(1) {
            kernel.run_group(range.group(group_id), chunk);
        }
        Ok(())
    }
}
