//! Plain sequential K-Means used to cross-check the sharded engine.

use crate::point_store::{Label, Point};

/// Runs `iterations` rounds of assign + mean update on the calling thread.
///
/// Tie-break and empty-cluster handling match the sharded engine: ties go to
/// the lower index and an empty cluster keeps its centroid. Sums are taken in
/// point order, so centroids can differ from the engine in the last bits.
pub fn run_kmeans_sequential(
    iterations: usize,
    centroids: &mut [Point],
    points: &[Point],
    labels: &mut [Label],
) {
    let k = centroids.len();
    let mut sums = vec![(0.0f32, 0.0f32, 0u32); k];

    for _ in 0..iterations {
        for (label, p) in labels.iter_mut().zip(points) {
            *label = nearest_centroid(p, centroids);
        }

        sums.iter_mut().for_each(|s| *s = (0.0, 0.0, 0));
        for (&label, p) in labels.iter().zip(points) {
            let s = &mut sums[label as usize];
            s.0 += p.x;
            s.1 += p.y;
            s.2 += 1;
        }

        for (c, &(sx, sy, n)) in centroids.iter_mut().zip(&sums) {
            if n > 0 {
                *c = Point::new(sx / n as f32, sy / n as f32);
            }
        }
    }
}

/// Index of the nearest centroid under squared Euclidean distance, lowest index on ties.
pub fn nearest_centroid(p: &Point, centroids: &[Point]) -> Label {
    let mut best_c = 0;
    let mut best_dist = f32::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let dist = p.distance_squared(c);
        if dist < best_dist {
            best_dist = dist;
            best_c = i;
        }
    }
    best_c as Label
}
