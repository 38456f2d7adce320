use std::time::Duration;

/// Wall-clock samples of repeated clustering runs, in milliseconds.
#[derive(Default)]
pub struct LatencyHistogram {
    samples_ms: Vec<f64>,
}

/// Summary statistics of a histogram; all zero when no sample was taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencySummary {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub min_ms: f64,
    pub mean_ms: f64,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples_ms.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// Nearest-rank percentile, `q` in `[0, 1]`.
    fn quantile(sorted: &[f64], q: f64) -> f64 {
        let rank = ((sorted.len() as f64 * q).ceil() as usize).clamp(1, sorted.len());
        sorted[rank - 1]
    }

    pub fn summary(&self) -> LatencySummary {
        if self.samples_ms.is_empty() {
            return LatencySummary::default();
        }
        let mut sorted = self.samples_ms.clone();
        sorted.sort_by(f64::total_cmp);

        LatencySummary {
            p50_ms: Self::quantile(&sorted, 0.5),
            p95_ms: Self::quantile(&sorted, 0.95),
            min_ms: sorted[0],
            mean_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
        }
    }
}

/// Resident set size of this process in bytes, from `/proc/self/status`.
pub fn measure_rss() -> Result<u64, Box<dyn std::error::Error>> {
    let status = std::fs::read_to_string("/proc/self/status")?;
    let kb = status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or("VmRSS not found in /proc/self/status")?
        .parse::<u64>()?;
    Ok(kb * 1024)
}
