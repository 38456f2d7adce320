//! Lock-free sharded K-Means for 2-D points.
//!
//! Each iteration runs three data-parallel stages on a [`Dispatcher`]:
//! nearest-centroid assignment, per-lane partial accumulation into a sharded
//! bank, and a per-cluster reduction of the bank into new centroids.

pub mod api;
pub use api::{run_kmeans, validate_inputs, KMeansEngine};

pub mod config;
pub use config::{
    EngineConfig, LaneLayout, RunConfig, MAX_CLUSTERS, MAX_LOCAL_SIZE, MAX_POINTS,
    MAX_POINTS_PER_ITEM, MAX_SHARDS,
};

pub mod dispatch;
pub use dispatch::{Dispatcher, Kernel, NdRange, RayonDispatcher, SerialDispatcher};

pub mod error;
pub use error::{BackendError, KMeansError};

pub mod kmeans;
pub use kmeans::{Clustering, Phase, RunSummary};

pub mod point_file;
pub mod point_store;
pub use point_store::{Label, Point, PointStore};

pub mod shards;
pub mod utils;

use tracing::info;

/// Installs a fmt subscriber filtered by `RUST_LOG` (default level `info`).
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    info!("sharded-kmeans {} initialized", env!("CARGO_PKG_VERSION"));
}
