mod config;
mod metrics;
mod output;
mod workloads;

use config::BenchmarkConfig;
use output::{write_csv, write_json, write_markdown, BenchmarkResult};
use std::env;
use std::path::PathBuf;
use workloads::run_workload;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    sharded_kmeans::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <config.yaml>", args[0]);
        std::process::exit(1);
    }

    let config_path = &args[1];
    eprintln!("Loading config from: {}", config_path);
    let config = BenchmarkConfig::from_file(config_path)?;

    let runs = config.expand_combinations();
    eprintln!("Expanded to {} benchmark runs", runs.len());

    let mut results = Vec::new();

    for (idx, run) in runs.iter().enumerate() {
        eprintln!(
            "\n=== Run {}/{}: {}k points, k={}, {:?}, {} iterations x {} ===",
            idx + 1,
            runs.len(),
            run.point_count / 1000,
            run.cluster_count,
            run.dispatcher,
            run.iterations,
            run.repeats
        );

        if run.cluster_count > run.point_count {
            eprintln!("  Skipped (more clusters than points)");
            continue;
        }

        let result = match run_workload(run) {
            Ok(result) => result,
            Err(e) => {
                eprintln!("ERROR: Workload failed: {}", e);
                continue;
            }
        };

        eprintln!(
            "  p50: {:.2}ms, p95: {:.2}ms, sequential: {:.2}ms, mismatches: {}",
            result.p50_ms, result.p95_ms, result.reference_ms, result.label_mismatches
        );

        results.push(BenchmarkResult::from_run_and_result(run, &result));
    }

    eprintln!("\n=== Writing Results ===");

    let output_prefix = &config.output_prefix;
    let json_path = PathBuf::from(format!("{}.json", output_prefix));
    let csv_path = PathBuf::from(format!("{}.csv", output_prefix));
    let md_path = PathBuf::from(format!("{}.md", output_prefix));

    write_json(&results, &json_path)?;
    write_csv(&results, &csv_path)?;
    write_markdown(&results, &md_path)?;

    eprintln!("\n=== Benchmark Complete ===");
    eprintln!("Results written to:");
    eprintln!("  - {}", json_path.display());
    eprintln!("  - {}", csv_path.display());
    eprintln!("  - {}", md_path.display());

    Ok(())
}
