use serde::{Deserialize, Serialize};
use sharded_kmeans::EngineConfig;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub dispatchers: Vec<DispatcherKind>,
    pub iterations: usize,
    pub repeats: usize,
    pub seed: u64,
    pub output_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub point_counts: Vec<usize>,
    pub cluster_counts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherKind {
    Serial,
    Rayon,
}

/// A single benchmark run configuration (one parameter combination)
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub point_count: usize,
    pub cluster_count: usize,
    pub dispatcher: DispatcherKind,
    pub iterations: usize,
    pub repeats: usize,
    pub seed: u64,
    pub engine: EngineConfig,
}

impl BenchmarkConfig {
    /// Load config from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: BenchmarkConfig = serde_yaml::from_str(&content)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Expand all parameter combinations into individual BenchmarkRun structs
    pub fn expand_combinations(&self) -> Vec<BenchmarkRun> {
        let mut runs = Vec::new();

        for &point_count in &self.dataset.point_counts {
            for &cluster_count in &self.dataset.cluster_counts {
                for &dispatcher in &self.dispatchers {
                    runs.push(BenchmarkRun {
                        point_count,
                        cluster_count,
                        dispatcher,
                        iterations: self.iterations,
                        repeats: self.repeats,
                        seed: self.seed,
                        engine: self.engine.clone(),
                    });
                }
            }
        }

        runs
    }
}
