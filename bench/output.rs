use crate::config::{BenchmarkRun, DispatcherKind};
use crate::workloads::WorkloadResult;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete benchmark result for a single run
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub point_count: usize,
    pub cluster_count: usize,
    pub dispatcher: DispatcherKind,
    pub iterations: usize,
    pub repeats: usize,
    pub seed: u64,
    pub shard_count: usize,
    // Latency metrics
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub per_iteration_ms: f64,
    // Stage breakdown of the last repeat, as fractions of its total
    pub assign_share: f64,
    pub accumulate_share: f64,
    pub reduce_share: f64,
    // Sequential reference
    pub reference_ms: f64,
    pub speedup: f64,
    pub label_mismatches: usize,
    pub memory_bytes: u64,
}

impl BenchmarkResult {
    pub fn from_run_and_result(run: &BenchmarkRun, result: &WorkloadResult) -> Self {
        let speedup = if result.mean_ms > 0.0 {
            result.reference_ms / result.mean_ms
        } else {
            0.0
        };
        BenchmarkResult {
            point_count: run.point_count,
            cluster_count: run.cluster_count,
            dispatcher: run.dispatcher,
            iterations: run.iterations,
            repeats: run.repeats,
            seed: run.seed,
            shard_count: run.engine.shard_count(),
            p50_ms: result.p50_ms,
            p95_ms: result.p95_ms,
            min_ms: result.min_ms,
            mean_ms: result.mean_ms,
            per_iteration_ms: result.per_iteration_ms,
            assign_share: result.assign_share,
            accumulate_share: result.accumulate_share,
            reduce_share: result.reduce_share,
            reference_ms: result.reference_ms,
            speedup,
            label_mismatches: result.label_mismatches,
            memory_bytes: result.memory_bytes,
        }
    }
}

fn dispatcher_name(kind: DispatcherKind) -> &'static str {
    match kind {
        DispatcherKind::Serial => "serial",
        DispatcherKind::Rayon => "rayon",
    }
}

/// Write results to JSON file
pub fn write_json(results: &[BenchmarkResult], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)?;
    eprintln!("Wrote {} results to JSON", results.len());
    Ok(())
}

/// Write results to CSV file
pub fn write_csv(results: &[BenchmarkResult], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(path)?;

    writeln!(
        file,
        "point_count,cluster_count,dispatcher,iterations,repeats,seed,shard_count,\
         p50_ms,p95_ms,min_ms,mean_ms,per_iteration_ms,\
         assign_share,accumulate_share,reduce_share,\
         reference_ms,speedup,label_mismatches,memory_bytes"
    )?;

    for r in results {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{:.3},{:.3},{:.3},{:.3},{:.4},{:.3},{:.3},{:.3},{:.3},{:.2},{},{}",
            r.point_count,
            r.cluster_count,
            dispatcher_name(r.dispatcher),
            r.iterations,
            r.repeats,
            r.seed,
            r.shard_count,
            r.p50_ms,
            r.p95_ms,
            r.min_ms,
            r.mean_ms,
            r.per_iteration_ms,
            r.assign_share,
            r.accumulate_share,
            r.reduce_share,
            r.reference_ms,
            r.speedup,
            r.label_mismatches,
            r.memory_bytes,
        )?;
    }

    eprintln!("Wrote {} results to CSV", results.len());
    Ok(())
}

/// Write results to Markdown file, one section per dataset size
pub fn write_markdown(
    results: &[BenchmarkResult],
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(path)?;

    writeln!(file, "# Sharded K-Means Benchmark Results\n")?;

    let mut grouped: BTreeMap<usize, Vec<&BenchmarkResult>> = BTreeMap::new();
    for result in results {
        grouped.entry(result.point_count).or_default().push(result);
    }

    for (point_count, mut group_results) in grouped {
        group_results.sort_by_key(|r| (r.cluster_count, dispatcher_name(r.dispatcher)));

        writeln!(file, "## Dataset: {}k points\n", point_count / 1000)?;

        writeln!(file, "### Latency Metrics\n")?;
        writeln!(
            file,
            "| k | Dispatcher | p50 (ms) | p95 (ms) | Mean (ms) | Per iteration (ms) | Speedup |"
        )?;
        writeln!(
            file,
            "|---|------------|----------|----------|-----------|--------------------|---------|"
        )?;
        for r in &group_results {
            writeln!(
                file,
                "| {} | {} | {:.2} | {:.2} | {:.2} | {:.4} | {:.2}x |",
                r.cluster_count,
                dispatcher_name(r.dispatcher),
                r.p50_ms,
                r.p95_ms,
                r.mean_ms,
                r.per_iteration_ms,
                r.speedup,
            )?;
        }
        writeln!(file)?;

        writeln!(file, "### Stage Breakdown\n")?;
        writeln!(file, "| k | Dispatcher | Assign | Accumulate | Reduce | Label mismatches |")?;
        writeln!(file, "|---|------------|--------|------------|--------|------------------|")?;
        for r in &group_results {
            writeln!(
                file,
                "| {} | {} | {:.1}% | {:.1}% | {:.1}% | {} |",
                r.cluster_count,
                dispatcher_name(r.dispatcher),
                r.assign_share * 100.0,
                r.accumulate_share * 100.0,
                r.reduce_share * 100.0,
                r.label_mismatches,
            )?;
        }
        writeln!(file)?;
    }

    eprintln!("Wrote {} results to Markdown", results.len());
    Ok(())
}
