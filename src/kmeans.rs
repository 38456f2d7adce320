pub mod accumulate;
pub mod assign;
pub mod reduce;
pub mod reference;

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::{KMeansError, Result};
use crate::point_store::{Label, Point};
use crate::shards::PartialBank;
use accumulate::accumulate_partials;
use assign::assign_points;
use reduce::reduce_partials;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Where the orchestrator is within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Assigning,
    Accumulating,
    Reducing,
    Done,
}

impl Phase {
    /// Legal transitions: `Idle -> (Assigning -> Accumulating -> Reducing)* -> Done`.
    pub fn can_advance_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Idle, Phase::Assigning)
                | (Phase::Idle, Phase::Done)
                | (Phase::Assigning, Phase::Accumulating)
                | (Phase::Accumulating, Phase::Reducing)
                | (Phase::Reducing, Phase::Assigning)
                | (Phase::Reducing, Phase::Done)
        )
    }
}

/// Wall time spent in each stage, summed over all iterations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub assign: Duration,
    pub accumulate: Duration,
    pub reduce: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.assign + self.accumulate + self.reduce
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub iterations: usize,
    pub timings: StageTimings,
    /// RMS centroid movement of the last iteration.
    pub final_shift: Option<f32>,
    /// Points per cluster under the returned labels. Empty when no iteration ran.
    pub cluster_sizes: Vec<u32>,
}

/// Final centroids and labels of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    pub centroids: Vec<Point>,
    pub labels: Vec<Label>,
    pub summary: RunSummary,
}

/// Sequences Assign -> Accumulate -> Reduce for a fixed number of iterations.
///
/// Each stage is a single dispatch, and a dispatch only returns once all of
/// its work groups are done, so a stage always observes the committed output
/// of the one before it. The partial bank is allocated once and overwritten in
/// full by every accumulate stage.
pub struct Orchestrator<'a, D: Dispatcher> {
    dispatcher: &'a D,
    config: &'a EngineConfig,
    bank: PartialBank,
    phase: Phase,
}

impl<'a, D: Dispatcher> Orchestrator<'a, D> {
    pub fn new(dispatcher: &'a D, config: &'a EngineConfig, class_n: usize) -> Self {
        Orchestrator {
            dispatcher,
            config,
            bank: PartialBank::new(class_n, config.shard_count()),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bank(&self) -> &PartialBank {
        &self.bank
    }

    /// Moves to `next`. `run` is the only caller and always follows the legal
    /// order, so the transition is only checked in debug builds.
    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        trace!("Phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Runs `iterations` rounds. Inputs must already be validated:
    /// `centroids.len()` equals the bank's cluster count and `labels` is as
    /// long as `points`.
    ///
    /// Stages work on private copies; the caller's buffers are written only
    /// once the run reaches `Done`. On error, or with zero iterations, they
    /// are left exactly as supplied.
    pub fn run(
        &mut self,
        iterations: usize,
        centroids: &mut [Point],
        points: &[Point],
        labels: &mut [Label],
    ) -> Result<RunSummary> {
        debug_assert_eq!(centroids.len(), self.bank.class_n());
        debug_assert_eq!(points.len(), labels.len());

        self.phase = Phase::Idle;
        let mut timings = StageTimings::default();
        let mut final_shift = None;
        let mut work_centroids = centroids.to_vec();
        let mut work_labels = labels.to_vec();
        let mut previous = centroids.to_vec();

        for iter in 0..iterations {
            self.advance(Phase::Assigning);
            let start = Instant::now();
            assign_points(
                self.dispatcher,
                self.config,
                &work_centroids,
                points,
                &mut work_labels,
            )?;
            timings.assign += start.elapsed();

            self.advance(Phase::Accumulating);
            let start = Instant::now();
            accumulate_partials(
                self.dispatcher,
                self.config,
                points,
                &work_labels,
                &mut self.bank,
            )?;
            timings.accumulate += start.elapsed();

            if self.config.verify_partials {
                let actual = self.bank.total_count();
                if actual != points.len() as u64 {
                    return Err(KMeansError::PartialCountMismatch {
                        expected: points.len() as u64,
                        actual,
                    });
                }
            }

            self.advance(Phase::Reducing);
            previous.copy_from_slice(&work_centroids);
            let start = Instant::now();
            reduce_partials(self.dispatcher, self.config, &self.bank, &mut work_centroids)?;
            timings.reduce += start.elapsed();

            let shift = centroid_shift(&previous, &work_centroids);
            debug!("Iteration {}: centroid shift {:.6}", iter, shift);
            final_shift = Some(shift);
        }
        self.advance(Phase::Done);

        let cluster_sizes = if iterations > 0 {
            centroids.copy_from_slice(&work_centroids);
            labels.copy_from_slice(&work_labels);
            self.bank.cluster_totals().iter().map(|t| t.count).collect()
        } else {
            Vec::new()
        };

        info!(
            "Finished {} iterations on {} points, {} clusters in {:?} (assign {:?}, accumulate {:?}, reduce {:?})",
            iterations,
            points.len(),
            centroids.len(),
            timings.total(),
            timings.assign,
            timings.accumulate,
            timings.reduce
        );

        Ok(RunSummary {
            iterations,
            timings,
            final_shift,
            cluster_sizes,
        })
    }
}

/// RMS movement between two centroid sets of equal length.
pub fn centroid_shift(prev: &[Point], curr: &[Point]) -> f32 {
    if curr.is_empty() {
        return 0.0;
    }
    let sum: f32 = prev
        .iter()
        .zip(curr)
        .map(|(a, b)| a.distance_squared(b))
        .sum();
    (sum / (curr.len() * 2) as f32).sqrt()
}
