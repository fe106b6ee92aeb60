//! Batch level generation.
//!
//! Runs many independent pipelines in parallel using rayon. Each run owns a
//! disjoint block of `max_attempts` seeds and walks through it until it gets
//! a playable level or runs out of attempts.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use levelgen_core::assembly::LevelAssembler;
use levelgen_core::config::GenerationConfig;
use levelgen_core::pipeline::{GenerationReport, LevelPipeline};
use levelgen_core::random::Seed;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config_file::{save_json, ConfigFileError};

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of levels to produce.
    pub count: u32,
    /// First seed of the first run.
    pub seed_start: Seed,
    /// Seeds tried per run before accepting an unplayable level.
    pub max_attempts: u32,
    /// Assembly timestamp for every level; `None` uses the clock.
    pub timestamp: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 10,
            seed_start: 0,
            max_attempts: 5,
            timestamp: None,
        }
    }
}

impl BatchConfig {
    /// Config for `count` runs.
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    /// Set seed start.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the per-run attempt cap (min 1).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Pin the assembly timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, unix_ms: u64) -> Self {
        self.timestamp = Some(unix_ms);
        self
    }

    /// Seed for `attempt` of run `index`.
    #[must_use]
    pub fn seed_for(&self, index: u32, attempt: u32) -> Seed {
        let offset = i64::from(index) * i64::from(self.max_attempts) + i64::from(attempt);
        self.seed_start.wrapping_add(offset as i32)
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRun {
    /// Run index.
    pub index: u32,
    /// Seed of the level kept.
    pub seed: Seed,
    /// Seeds tried.
    pub attempts: u32,
    /// Whether the kept level is playable.
    pub playable: bool,
    /// Quality of the kept level.
    pub quality_score: f64,
    /// Validation issues of the kept level.
    pub issues: Vec<String>,
    /// Entity instances the placer skipped.
    pub placement_warnings: usize,
}

/// Error during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index.
    pub index: u32,
    /// Seed that failed.
    pub seed: Seed,
    /// Error message.
    pub message: String,
}

/// Aggregate statistics over successful runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs that produced a level.
    pub completed: u32,
    /// Runs whose kept level is playable.
    pub playable: u32,
    /// `playable / completed`.
    pub playable_ratio: f64,
    /// Mean quality score.
    pub mean_quality: f64,
    /// Mean attempts per run.
    pub mean_attempts: f64,
}

impl BatchSummary {
    /// Summarise `runs`.
    #[must_use]
    pub fn from_runs(runs: &[BatchRun]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let completed = runs.len() as f64;
        let playable = runs.iter().filter(|r| r.playable).count();
        Self {
            completed: runs.len() as u32,
            playable: playable as u32,
            playable_ratio: playable as f64 / completed,
            mean_quality: runs.iter().map(|r| r.quality_score).sum::<f64>() / completed,
            mean_attempts: runs.iter().map(|r| f64::from(r.attempts)).sum::<f64>() / completed,
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Generation config used.
    pub config: GenerationConfig,
    /// Batch settings used.
    pub batch: BatchConfig,
    /// Successful runs, by index.
    pub runs: Vec<BatchRun>,
    /// Failed runs, by index.
    pub errors: Vec<BatchError>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Total runtime.
    pub duration_seconds: f64,
}

impl BatchReport {
    /// Save the report as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigFileError> {
        save_json(self, path)
    }

    /// Load a report from JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Run one batch entry, retrying with the next seed while unplayable.
fn run_single(
    pipeline: &LevelPipeline,
    config: &GenerationConfig,
    batch: &BatchConfig,
    index: u32,
) -> Result<BatchRun, BatchError> {
    let mut kept: Option<(Seed, u32, GenerationReport)> = None;
    for attempt in 0..batch.max_attempts.max(1) {
        let seed = batch.seed_for(index, attempt);
        let report = pipeline
            .run(&config.clone().with_seed(seed))
            .map_err(|e| BatchError {
                index,
                seed,
                message: e.to_string(),
            })?;
        let playable = report.validation.playable;
        kept = Some((seed, attempt + 1, report));
        if playable {
            break;
        }
        debug!(index, seed, "Level unplayable, retrying with next seed");
    }

    let Some((seed, attempts, report)) = kept else {
        return Err(BatchError {
            index,
            seed: batch.seed_for(index, 0),
            message: "no attempts were made".to_string(),
        });
    };
    if !report.validation.playable {
        warn!(index, attempts, "No playable level within attempt cap");
    }

    Ok(BatchRun {
        index,
        seed,
        attempts,
        playable: report.validation.playable,
        quality_score: report.validation.quality_score,
        issues: report.validation.issues,
        placement_warnings: report.warnings.len(),
    })
}

/// Run a batch of independent generations.
#[must_use]
pub fn run_batch(config: &GenerationConfig, batch: &BatchConfig) -> BatchReport {
    let start = Instant::now();
    let assembler = batch
        .timestamp
        .map_or_else(LevelAssembler::new, |ts| LevelAssembler::new().with_timestamp(ts));
    let pipeline = LevelPipeline::new().with_assembler(assembler);
    let completed = AtomicU32::new(0);

    info!(
        count = batch.count,
        seed_start = batch.seed_start,
        algorithm = %config.algorithm,
        "Starting batch run"
    );

    let outcomes: Vec<Result<BatchRun, BatchError>> = (0..batch.count)
        .into_par_iter()
        .map(|index| {
            let outcome = run_single(&pipeline, config, batch, index);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(done, total = batch.count, "Batch progress");
            outcome
        })
        .collect();

    let mut runs = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(run) => runs.push(run),
            Err(err) => {
                warn!(index = err.index, seed = err.seed, "Run failed: {}", err.message);
                errors.push(err);
            }
        }
    }

    let summary = BatchSummary::from_runs(&runs);
    info!(
        completed = summary.completed,
        playable = summary.playable,
        mean_quality = summary.mean_quality,
        "Batch finished"
    );

    BatchReport {
        config: config.clone(),
        batch: batch.clone(),
        runs,
        errors,
        summary,
        duration_seconds: start.elapsed().as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelgen_core::config::{EntityType, PlacementSpec};

    #[test]
    fn seed_blocks_do_not_overlap() {
        let batch = BatchConfig::new(3).with_seed(100).with_max_attempts(4);
        assert_eq!(batch.seed_for(0, 0), 100);
        assert_eq!(batch.seed_for(0, 3), 103);
        assert_eq!(batch.seed_for(1, 0), 104);
        assert_eq!(BatchConfig::new(1).with_seed(i32::MAX).seed_for(0, 1), i32::MIN);
    }

    #[test]
    fn batch_is_ordered_and_reproducible() {
        let batch = BatchConfig::new(6).with_seed(11).with_timestamp(0);
        let config = GenerationConfig::maze();
        let a = run_batch(&config, &batch);
        let b = run_batch(&config, &batch);
        assert_eq!(a.runs, b.runs);
        let indices: Vec<u32> = a.runs.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
        assert_eq!(a.summary.completed, 6);
    }

    #[test]
    fn unplayable_configs_exhaust_their_attempts() {
        // No Player can ever be placed on solid rock.
        let config = GenerationConfig::new(20, 20, "cellular_automata")
            .with_parameter("wallProbability", 1.0)
            .with_placement(PlacementSpec::new(EntityType::Player, 1));
        let report = run_batch(&config, &BatchConfig::new(2).with_max_attempts(3));
        assert!(report.runs.iter().all(|r| !r.playable && r.attempts == 3));
        assert_eq!(report.summary.playable_ratio, 0.0);
    }

    #[test]
    fn pipeline_errors_are_collected() {
        let config = GenerationConfig::new(20, 20, "bsp");
        let report = run_batch(&config, &BatchConfig::new(3));
        assert!(report.runs.is_empty());
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].message.contains("bsp"));
    }

    #[test]
    fn report_survives_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = run_batch(&GenerationConfig::cave(), &BatchConfig::new(2).with_timestamp(0));
        report.save(&path).unwrap();
        let loaded = BatchReport::load(&path).unwrap();
        let seeds = |r: &BatchReport| {
            r.runs
                .iter()
                .map(|run| (run.seed, run.attempts))
                .collect::<Vec<_>>()
        };
        assert_eq!(seeds(&loaded), seeds(&report));
        assert_eq!(loaded.config, report.config);
        assert_eq!(loaded.summary.completed, 2);
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        assert_eq!(BatchSummary::from_runs(&[]), BatchSummary::default());
    }
}
