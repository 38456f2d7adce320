use crate::point_store::{Label, Point};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const GENERATION_BATCH: usize = 4096;

/// Generates `count` points scattered around `clusters` random centers in
/// `[-100, 100)^2`. Output depends only on the arguments, not on thread count.
pub fn generate_clustered_points(count: usize, clusters: usize, seed: u64) -> Vec<Point> {
    let clusters = clusters.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let centers: Vec<Point> = (0..clusters)
        .map(|_| Point::new(rng.gen_range(-100.0..100.0), rng.gen_range(-100.0..100.0)))
        .collect();

    let mut points = vec![Point::default(); count];
    points
        .par_chunks_mut(GENERATION_BATCH)
        .enumerate()
        .for_each(|(batch, chunk)| {
            let mut rng = StdRng::seed_from_u64(seed ^ ((batch as u64 + 1) << 20));
            for p in chunk.iter_mut() {
                let center = centers[rng.gen_range(0..clusters)];
                *p = Point::new(
                    center.x + rng.gen_range(-5.0..5.0),
                    center.y + rng.gen_range(-5.0..5.0),
                );
            }
        });
    points
}

/// Picks `k` distinct points as initial centroids. `k` must not exceed `points.len()`.
pub fn sample_initial_centroids(points: &[Point], k: usize, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, points.len(), k).into_vec();
    picked.sort_unstable();
    picked.into_iter().map(|i| points[i]).collect()
}

/// Within-cluster sum of squared distances.
pub fn inertia(points: &[Point], centroids: &[Point], labels: &[Label]) -> f64 {
    points
        .par_iter()
        .zip(labels.par_iter())
        .map(|(p, &l)| p.distance_squared(&centroids[l as usize]) as f64)
        .sum()
}

/// Number of positions where two label sets disagree.
pub fn count_label_mismatches(a: &[Label], b: &[Label]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

/// Largest per-coordinate difference between two centroid sets.
pub fn max_centroid_difference(a: &[Point], b: &[Point]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p.x - q.x).abs().max((p.y - q.y).abs()))
        .fold(0.0, f32::max)
}
