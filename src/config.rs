use crate::error::{KMeansError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest supported number of clusters.
pub const MAX_CLUSTERS: usize = 32;

/// Largest supported number of points.
pub const MAX_POINTS: usize = 1_048_576;

/// Largest work-group size accepted for any stage.
pub const MAX_LOCAL_SIZE: usize = 1024;

/// Largest number of points one assign work item may label.
pub const MAX_POINTS_PER_ITEM: usize = 64;

/// Largest number of accumulation lanes (bank shards).
pub const MAX_SHARDS: usize = 65_536;

/// How accumulation lanes split the point range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneLayout {
    /// Lane `l` owns one contiguous block of `ceil(n / lanes)` points.
    #[default]
    Contiguous,
    /// Lane `l` owns points `l, l + lanes, l + 2 * lanes, ...`.
    Interleaved,
}

/// Accelerator-capacity parameters of the engine.
///
/// None of these change the clustering result beyond floating-point summation
/// order; they only shape the grids the stages are dispatched on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of concurrent work groups in the accumulate grid.
    pub compute_units: usize,

    pub workers_per_unit: usize,

    pub tasks_per_worker: usize,

    /// Work-group size of the assign grid.
    pub assign_local_size: usize,

    /// Points labelled by each assign work item.
    pub assign_points_per_item: usize,

    /// Work items cooperating on one cluster in the reduce grid.
    pub reduce_local_size: usize,

    pub lane_layout: LaneLayout,

    /// Check after every accumulate stage that the bank accounts for every point.
    pub verify_partials: bool,

    /// Size of a dedicated worker pool. `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compute_units: 32,
            workers_per_unit: 64,
            tasks_per_worker: 4,
            assign_local_size: 256,
            assign_points_per_item: 2,
            reduce_local_size: 64,
            lane_layout: LaneLayout::Contiguous,
            verify_partials: false,
            threads: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compute_units(mut self, compute_units: usize) -> Self {
        self.compute_units = compute_units;
        self
    }

    pub fn with_workers_per_unit(mut self, workers_per_unit: usize) -> Self {
        self.workers_per_unit = workers_per_unit;
        self
    }

    pub fn with_tasks_per_worker(mut self, tasks_per_worker: usize) -> Self {
        self.tasks_per_worker = tasks_per_worker;
        self
    }

    pub fn with_assign_local_size(mut self, local_size: usize) -> Self {
        self.assign_local_size = local_size;
        self
    }

    pub fn with_assign_points_per_item(mut self, points_per_item: usize) -> Self {
        self.assign_points_per_item = points_per_item;
        self
    }

    pub fn with_reduce_local_size(mut self, local_size: usize) -> Self {
        self.reduce_local_size = local_size;
        self
    }

    pub fn with_lane_layout(mut self, lane_layout: LaneLayout) -> Self {
        self.lane_layout = lane_layout;
        self
    }

    pub fn with_verify_partials(mut self, verify_partials: bool) -> Self {
        self.verify_partials = verify_partials;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Total number of accumulation lanes, one bank shard each.
    pub fn shard_count(&self) -> usize {
        self.compute_units * self.workers_per_unit * self.tasks_per_worker
    }

    /// Work-group size of the accumulate grid (lanes per compute unit).
    pub fn accumulate_local_size(&self) -> usize {
        self.workers_per_unit * self.tasks_per_worker
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("compute_units", self.compute_units),
            ("workers_per_unit", self.workers_per_unit),
            ("tasks_per_worker", self.tasks_per_worker),
            ("assign_local_size", self.assign_local_size),
            ("assign_points_per_item", self.assign_points_per_item),
            ("reduce_local_size", self.reduce_local_size),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(KMeansError::invalid_config(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(KMeansError::invalid_config(
                "threads must be greater than 0 when set",
            ));
        }
        let bounded = [
            ("assign_local_size", self.assign_local_size, MAX_LOCAL_SIZE),
            ("reduce_local_size", self.reduce_local_size, MAX_LOCAL_SIZE),
            ("assign_points_per_item", self.assign_points_per_item, MAX_POINTS_PER_ITEM),
        ];
        for (name, value, max) in bounded {
            if value > max {
                return Err(KMeansError::invalid_config(format!(
                    "{} is {}, at most {} is supported",
                    name, value, max
                )));
            }
        }

        let lanes_per_unit = self
            .workers_per_unit
            .checked_mul(self.tasks_per_worker)
            .filter(|&n| n <= MAX_LOCAL_SIZE)
            .ok_or_else(|| {
                KMeansError::invalid_config(format!(
                    "workers_per_unit * tasks_per_worker must be at most {}",
                    MAX_LOCAL_SIZE
                ))
            })?;
        let shards = self
            .compute_units
            .checked_mul(lanes_per_unit)
            .filter(|&n| n <= MAX_SHARDS)
            .ok_or_else(|| {
                KMeansError::invalid_config(format!(
                    "shard count must be at most {}",
                    MAX_SHARDS
                ))
            })?;

        // Grid widths the stages derive from these settings.
        let products = [
            shards.checked_mul(MAX_CLUSTERS),
            self.reduce_local_size.checked_mul(MAX_CLUSTERS),
            self.assign_local_size.checked_mul(self.assign_points_per_item),
        ];
        if products.iter().any(Option::is_none) {
            return Err(KMeansError::invalid_config("grid size overflows"));
        }
        Ok(())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(content).map_err(|e| KMeansError::format(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

/// Settings of one command-line clustering run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Point file to cluster. When absent, points are generated.
    pub points_file: Option<PathBuf>,

    /// Number of points to generate when `points_file` is absent.
    pub point_count: usize,

    pub cluster_count: usize,

    pub iterations: usize,

    pub seed: u64,

    /// Where to save centroids and labels.
    pub output_file: Option<PathBuf>,

    /// Also run the sequential reference and report how far the results drift.
    pub compare_reference: bool,

    pub engine: EngineConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            points_file: None,
            point_count: 65_536,
            cluster_count: 16,
            iterations: 1024,
            seed: 42,
            output_file: None,
            compare_reference: true,
            engine: EngineConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig =
            serde_yaml::from_str(&content).map_err(|e| KMeansError::format(e.to_string()))?;
        config.engine.validate()?;
        Ok(config)
    }
}
