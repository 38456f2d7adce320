mod test_utils;

use ndarray::Array2;
use sharded_kmeans::kmeans::reference::nearest_centroid;
use sharded_kmeans::point_file::{load_clustering, read_points, save_clustering, write_points};
use sharded_kmeans::utils::{generate_clustered_points, inertia, sample_initial_centroids};
use sharded_kmeans::{EngineConfig, KMeansEngine, KMeansError, Label, PointStore, RunConfig};
use tempfile::tempdir;
use test_utils::*;

#[test]
fn test_file_to_clustering_round_trip() {
    let dir = tempdir().unwrap();
    let points_path = dir.path().join("points.bin");
    let result_path = dir.path().join("clustering.bin");

    let points = generate_clustered_points(20_000, 6, 17);
    write_points(&points_path, &points).unwrap();

    let store = read_points(&points_path).unwrap();
    assert_eq!(store.as_slice(), points.as_slice());

    let initial = sample_initial_centroids(store.as_slice(), 6, 17);
    let engine = KMeansEngine::new(EngineConfig::default().with_verify_partials(true)).unwrap();
    let clustering = engine.fit(25, &initial, &store).unwrap();

    let sizes: u32 = clustering.summary.cluster_sizes.iter().sum();
    assert_eq!(sizes as usize, store.len());
    let initial_labels: Vec<Label> = store
        .as_slice()
        .iter()
        .map(|p| nearest_centroid(p, &initial))
        .collect();
    let before = inertia(store.as_slice(), &initial, &initial_labels);
    let after = inertia(store.as_slice(), &clustering.centroids, &clustering.labels);
    assert!(after <= before, "inertia grew from {} to {}", before, after);

    save_clustering(&result_path, &clustering).unwrap();
    let loaded = load_clustering(&result_path).unwrap();
    assert_eq!(loaded, clustering);
}

#[test]
fn test_run_config_from_yaml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    std::fs::write(
        &path,
        "point_count: 1000\ncluster_count: 4\niterations: 3\nengine:\n  compute_units: 4\n  lane_layout: interleaved\n",
    )
    .unwrap();

    let config = RunConfig::from_file(&path).unwrap();

    assert_eq!(config.point_count, 1000);
    assert_eq!(config.cluster_count, 4);
    assert_eq!(config.iterations, 3);
    assert_eq!(config.engine.shard_count(), 4 * 64 * 4);
    assert_eq!(config.seed, RunConfig::default().seed);
}

#[test]
fn test_bad_engine_yaml_is_reported() {
    let err = EngineConfig::from_yaml_str("compute_units: 0\n").unwrap_err();
    assert!(matches!(err, KMeansError::InvalidConfig(_)));

    let err = EngineConfig::from_yaml_str("compute_units: [1, 2]\n").unwrap_err();
    assert!(matches!(err, KMeansError::Format(_)));
}

#[test]
fn test_ndarray_input() {
    let (points, true_labels) = create_gaussian_clusters(3, 40, 25.0, 5);
    let mut data = Array2::<f32>::zeros((points.len(), 2));
    for (i, p) in points.iter().enumerate() {
        data[(i, 0)] = p.x;
        data[(i, 1)] = p.y;
    }

    let store = PointStore::from_array(data.view()).unwrap();
    assert_eq!(store.to_array(), data);

    let initial = vec![points[0], points[40], points[80]];
    let clustering = KMeansEngine::new(small_engine_config())
        .unwrap()
        .fit(5, &initial, &store)
        .unwrap();
    assert_eq!(clustering.labels, true_labels);

    let wrong = Array2::<f32>::zeros((4, 3));
    assert!(PointStore::from_array(wrong.view()).is_err());
}
