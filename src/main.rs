use sharded_kmeans::kmeans::reference::run_kmeans_sequential;
use sharded_kmeans::point_file::{read_points, save_clustering};
use sharded_kmeans::utils::*;
use sharded_kmeans::{KMeansEngine, Label, PointStore, RunConfig};
use std::error::Error;
use std::time::Instant;
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn Error>> {
    sharded_kmeans::init_logging();

    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => {
            info!("Loading run config from {}", path);
            RunConfig::from_file(path)?
        }
        None => RunConfig::default(),
    };

    let points = match &config.points_file {
        Some(path) => read_points(path)?,
        None => {
            info!(
                "Generating {} points around {} centers (seed {})",
                config.point_count, config.cluster_count, config.seed
            );
            PointStore::new(generate_clustered_points(
                config.point_count,
                config.cluster_count,
                config.seed,
            ))
        }
    };

    if config.cluster_count > points.len() {
        return Err(format!(
            "cluster_count ({}) is larger than the number of points ({})",
            config.cluster_count,
            points.len()
        )
        .into());
    }
    let initial = sample_initial_centroids(points.as_slice(), config.cluster_count, config.seed);

    let engine = KMeansEngine::new(config.engine.clone())?;
    let start = Instant::now();
    let clustering = engine.fit(config.iterations, &initial, &points)?;
    println!("Exe time sharded: {:?}", start.elapsed());

    for (i, c) in clustering.centroids.iter().enumerate() {
        let size = clustering.summary.cluster_sizes.get(i).copied().unwrap_or(0);
        println!("{:2} ==> [{:11.3} {:11.3}] ({} points)", i, c.x, c.y, size);
    }
    println!(
        "Inertia: {:.3}",
        inertia(points.as_slice(), &clustering.centroids, &clustering.labels)
    );

    if config.compare_reference {
        let mut centroids = initial.clone();
        let mut labels: Vec<Label> = vec![0; points.len()];
        let start = Instant::now();
        run_kmeans_sequential(config.iterations, &mut centroids, points.as_slice(), &mut labels);
        println!("Exe time sequential: {:?}", start.elapsed());

        let mismatches = count_label_mismatches(&clustering.labels, &labels);
        let drift = max_centroid_difference(&clustering.centroids, &centroids);
        if mismatches == 0 {
            println!("Labels match the sequential reference (max centroid drift {:.6})", drift);
        } else {
            warn!(
                "{} labels differ from the sequential reference (max centroid drift {:.6})",
                mismatches, drift
            );
        }
    }

    if let Some(path) = &config.output_file {
        save_clustering(path, &clustering)?;
    }

    Ok(())
}
