mod test_utils;

use sharded_kmeans::kmeans::accumulate::accumulate_partials;
use sharded_kmeans::kmeans::assign::assign_points;
use sharded_kmeans::kmeans::reduce::reduce_partials;
use sharded_kmeans::shards::PartialBank;
use sharded_kmeans::{
    Dispatcher, EngineConfig, Label, LaneLayout, Point, RayonDispatcher, SerialDispatcher,
};
use test_utils::*;

fn accumulate_with<D: Dispatcher>(
    dispatcher: &D,
    config: &EngineConfig,
    points: &[Point],
    labels: &[Label],
    class_n: usize,
) -> PartialBank {
    let mut bank = PartialBank::new(class_n, config.shard_count());
    accumulate_partials(dispatcher, config, points, labels, &mut bank)
        .expect("Accumulate failed");
    bank
}

// ============================================================================
// Partial Bank Invariants
// ============================================================================

#[test]
fn test_counts_sum_to_point_count_for_uneven_sizes() {
    // Sizes around and below the lane count of 32
    let sizes = [1, 5, 31, 32, 33, 100, 1023, 4097];
    for layout in [LaneLayout::Contiguous, LaneLayout::Interleaved] {
        let config = small_engine_config().with_lane_layout(layout);
        for &n in &sizes {
            let points = create_integer_points(n, n as u64);
            let labels: Vec<Label> = (0..n).map(|i| (i % 7) as Label).collect();

            for bank in [
                accumulate_with(&SerialDispatcher, &config, &points, &labels, 7),
                accumulate_with(&RayonDispatcher::global(), &config, &points, &labels, 7),
            ] {
                assert_eq!(bank.total_count(), n as u64, "layout {:?}, n {}", layout, n);
                let totals = bank.cluster_totals();
                for (c, total) in totals.iter().enumerate() {
                    let expected = (0..n).filter(|i| i % 7 == c).count() as u32;
                    assert_eq!(total.count, expected);
                }
            }
        }
    }
}

#[test]
fn test_serial_and_rayon_banks_are_identical() {
    let config = small_engine_config();
    let (points, labels) = create_gaussian_clusters(6, 250, 5.0, 8);

    let serial = accumulate_with(&SerialDispatcher, &config, &points, &labels, 6);
    let parallel = accumulate_with(&RayonDispatcher::with_threads(3).unwrap(), &config, &points, &labels, 6);

    assert_eq!(serial.slots(), parallel.slots());
}

#[test]
fn test_cluster_totals_match_direct_sums() {
    let config = EngineConfig::default();
    let points = create_integer_points(10_000, 3);
    let labels: Vec<Label> = points
        .iter()
        .map(|p| if p.x < 0.0 { 0 } else { 1 })
        .collect();

    let bank = accumulate_with(&RayonDispatcher::global(), &config, &points, &labels, 2);
    assert_eq!(bank.shard_count(), 8192);

    let totals = bank.cluster_totals();
    for c in 0..2 {
        let members: Vec<&Point> = points
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l as usize == c)
            .map(|(p, _)| p)
            .collect();
        let sum_x: f32 = members.iter().map(|p| p.x).sum();
        let sum_y: f32 = members.iter().map(|p| p.y).sum();
        assert_eq!(totals[c].count as usize, members.len());
        assert_eq!(totals[c].sum_x, sum_x);
        assert_eq!(totals[c].sum_y, sum_y);
    }
}

#[test]
fn test_bank_is_overwritten_each_iteration() {
    let config = small_engine_config();
    let points = create_integer_points(500, 4);
    let first: Vec<Label> = vec![0; points.len()];
    let second: Vec<Label> = vec![1; points.len()];

    let mut bank = PartialBank::new(2, config.shard_count());
    accumulate_partials(&SerialDispatcher, &config, &points, &first, &mut bank).unwrap();
    accumulate_partials(&SerialDispatcher, &config, &points, &second, &mut bank).unwrap();

    let totals = bank.cluster_totals();
    assert_eq!(totals[0].count, 0);
    assert_eq!(totals[1].count, 500);
}

// ============================================================================
// Stage Pipeline
// ============================================================================

#[test]
fn test_stages_compose_into_one_iteration() {
    let config = small_engine_config();
    let points = [
        Point::new(0.0, 0.0),
        Point::new(0.0, 1.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 1.0),
    ];
    let mut centroids = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
    let mut labels: [Label; 4] = [0; 4];
    let mut bank = PartialBank::new(2, config.shard_count());

    assign_points(&SerialDispatcher, &config, &centroids, &points, &mut labels).unwrap();
    accumulate_partials(&SerialDispatcher, &config, &points, &labels, &mut bank).unwrap();
    reduce_partials(&SerialDispatcher, &config, &bank, &mut centroids).unwrap();

    assert_eq!(labels, [0, 0, 1, 1]);
    assert_eq!(centroids, [Point::new(0.0, 0.5), Point::new(10.0, 0.5)]);
}
