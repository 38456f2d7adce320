use crate::config::{EngineConfig, MAX_CLUSTERS, MAX_POINTS};
use crate::dispatch::{Dispatcher, RayonDispatcher};
use crate::error::{KMeansError, Result};
use crate::kmeans::{Clustering, Orchestrator, RunSummary};
use crate::point_store::{Label, Point, PointStore};
use tracing::info;

/// Checks the hard preconditions of a run. Nothing is dispatched when this fails.
pub fn validate_inputs(
    cluster_count: usize,
    point_count: usize,
    centroids: &[Point],
    points: &[Point],
    labels: &[Label],
) -> Result<()> {
    if cluster_count == 0 {
        return Err(KMeansError::NoClusters);
    }
    if cluster_count > MAX_CLUSTERS {
        return Err(KMeansError::TooManyClusters {
            actual: cluster_count,
            max: MAX_CLUSTERS,
        });
    }
    if point_count == 0 {
        return Err(KMeansError::NoPoints);
    }
    if point_count > MAX_POINTS {
        return Err(KMeansError::TooManyPoints {
            actual: point_count,
            max: MAX_POINTS,
        });
    }

    let buffers = [
        ("centroids", cluster_count, centroids.len()),
        ("points", point_count, points.len()),
        ("labels", point_count, labels.len()),
    ];
    for (buffer, expected, actual) in buffers {
        if expected != actual {
            return Err(KMeansError::LengthMismatch {
                buffer,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// A validated engine configuration bound to a dispatch backend.
pub struct KMeansEngine<D: Dispatcher = RayonDispatcher> {
    config: EngineConfig,
    dispatcher: D,
}

impl KMeansEngine<RayonDispatcher> {
    /// Engine on the rayon backend; uses a dedicated pool when `config.threads` is set.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let dispatcher = match config.threads {
            Some(threads) => RayonDispatcher::with_threads(threads)?,
            None => RayonDispatcher::global(),
        };
        Ok(Self { config, dispatcher })
    }
}

impl<D: Dispatcher> KMeansEngine<D> {
    pub fn with_dispatcher(config: EngineConfig, dispatcher: D) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Runs `iteration_count` iterations in place on caller-owned buffers.
    ///
    /// `centroids` holds the initial centers on entry and the final ones on
    /// return. `labels` is only written when at least one iteration runs.
    pub fn run(
        &self,
        iteration_count: usize,
        centroids: &mut [Point],
        points: &[Point],
        labels: &mut [Label],
    ) -> Result<RunSummary> {
        validate_inputs(
            centroids.len(),
            points.len(),
            centroids,
            points,
            labels,
        )?;
        info!(
            "Clustering {} points into {} clusters for {} iterations ({} dispatcher, {} shards)",
            points.len(),
            centroids.len(),
            iteration_count,
            self.dispatcher.name(),
            self.config.shard_count()
        );

        let mut orchestrator = Orchestrator::new(&self.dispatcher, &self.config, centroids.len());
        orchestrator.run(iteration_count, centroids, points, labels)
    }

    /// Clusters `points` starting from `initial_centroids` and returns owned results.
    pub fn fit(
        &self,
        iteration_count: usize,
        initial_centroids: &[Point],
        points: &PointStore,
    ) -> Result<Clustering> {
        let mut centroids = initial_centroids.to_vec();
        let mut labels = vec![0 as Label; points.len()];
        let summary = self.run(iteration_count, &mut centroids, points.as_slice(), &mut labels)?;
        Ok(Clustering {
            centroids,
            labels,
            summary,
        })
    }
}

/// Runs K-Means on the global rayon pool with the reference grid configuration.
///
/// `cluster_count` must be in `1..=32` and `point_count` in `1..=1_048_576`;
/// the slices must match those counts. With `iteration_count == 0` the
/// centroids are returned unchanged and `labels` is left as supplied.
pub fn run_kmeans(
    iteration_count: usize,
    cluster_count: usize,
    point_count: usize,
    centroids: &mut [Point],
    points: &[Point],
    labels: &mut [Label],
) -> Result<()> {
    validate_inputs(cluster_count, point_count, centroids, points, labels)?;
    let engine = KMeansEngine::new(EngineConfig::default())?;
    engine.run(iteration_count, centroids, points, labels)?;
    Ok(())
}
