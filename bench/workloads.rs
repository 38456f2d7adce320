use crate::config::{BenchmarkRun, DispatcherKind};
use crate::metrics::{measure_rss, LatencyHistogram};
use sharded_kmeans::kmeans::reference::run_kmeans_sequential;
use sharded_kmeans::utils::{
    count_label_mismatches, generate_clustered_points, sample_initial_centroids,
};
use sharded_kmeans::{
    Dispatcher, KMeansEngine, Label, Point, RayonDispatcher, RunSummary, SerialDispatcher,
};
use std::error::Error;
use std::time::Instant;

/// Timings of one benchmark run
#[derive(Debug, Clone)]
pub struct WorkloadResult {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub per_iteration_ms: f64,
    pub assign_share: f64,
    pub accumulate_share: f64,
    pub reduce_share: f64,
    pub reference_ms: f64,
    pub label_mismatches: usize,
    pub memory_bytes: u64,
}

fn time_repeats<D: Dispatcher>(
    engine: &KMeansEngine<D>,
    run: &BenchmarkRun,
    initial: &[Point],
    points: &[Point],
    labels: &mut [Label],
) -> Result<(LatencyHistogram, RunSummary), Box<dyn Error>> {
    let mut histogram = LatencyHistogram::new();
    let mut last = RunSummary::default();
    for _ in 0..run.repeats.max(1) {
        let mut centroids = initial.to_vec();
        let start = Instant::now();
        last = engine.run(run.iterations, &mut centroids, points, labels)?;
        histogram.record(start.elapsed());
    }
    Ok((histogram, last))
}

/// Cluster a generated dataset `run.repeats` times and record latencies.
pub fn run_workload(run: &BenchmarkRun) -> Result<WorkloadResult, Box<dyn Error>> {
    let points = generate_clustered_points(run.point_count, run.cluster_count, run.seed);
    let initial = sample_initial_centroids(&points, run.cluster_count, run.seed);
    let mut labels: Vec<Label> = vec![0; points.len()];

    let memory_before = measure_rss().unwrap_or(0);
    let (histogram, summary) = match run.dispatcher {
        DispatcherKind::Serial => {
            let engine = KMeansEngine::with_dispatcher(run.engine.clone(), SerialDispatcher)?;
            time_repeats(&engine, run, &initial, &points, &mut labels)?
        }
        DispatcherKind::Rayon => {
            let engine = match run.engine.threads {
                Some(threads) => KMeansEngine::with_dispatcher(
                    run.engine.clone(),
                    RayonDispatcher::with_threads(threads)?,
                )?,
                None => KMeansEngine::with_dispatcher(run.engine.clone(), RayonDispatcher::global())?,
            };
            time_repeats(&engine, run, &initial, &points, &mut labels)?
        }
    };
    let memory_after = measure_rss().unwrap_or(0);

    let mut reference_centroids = initial.clone();
    let mut reference_labels: Vec<Label> = vec![0; points.len()];
    let start = Instant::now();
    run_kmeans_sequential(
        run.iterations,
        &mut reference_centroids,
        &points,
        &mut reference_labels,
    );
    let reference_ms = start.elapsed().as_secs_f64() * 1000.0;

    let total = summary.timings.total().as_secs_f64().max(f64::EPSILON);
    let latency = histogram.summary();

    Ok(WorkloadResult {
        p50_ms: latency.p50_ms,
        p95_ms: latency.p95_ms,
        min_ms: latency.min_ms,
        mean_ms: latency.mean_ms,
        per_iteration_ms: latency.mean_ms / run.iterations.max(1) as f64,
        assign_share: summary.timings.assign.as_secs_f64() / total,
        accumulate_share: summary.timings.accumulate.as_secs_f64() / total,
        reduce_share: summary.timings.reduce.as_secs_f64() / total,
        reference_ms,
        label_mismatches: count_label_mismatches(&labels, &reference_labels),
        memory_bytes: memory_after.saturating_sub(memory_before),
    })
}
