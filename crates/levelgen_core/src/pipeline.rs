//! End-to-end generation: terrain, placement, assembly, validation.
//!
//! One run is a single synchronous pass with no shared state, so separate
//! runs can execute on separate threads. Cancellation is cooperative and
//! only observed between stages; a cancelled run drops whatever it had
//! built and returns [`GenerationError::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembly::{Level, LevelAssembler};
use crate::config::GenerationConfig;
use crate::error::{GenerationError, Result};
use crate::placement::{EntityPlacer, PlacementWarning};
use crate::terrain::TerrainAlgorithm;
use crate::validation::{LevelValidator, ValidationResult};

/// Shared flag asking in-flight runs to stop.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Everything a completed run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// The assembled level.
    pub level: Level,
    /// Entity instances that could not be placed.
    pub warnings: Vec<PlacementWarning>,
    /// Playability and quality of `level`.
    pub validation: ValidationResult,
}

/// Runs the generation stages in order.
#[derive(Debug, Clone, Default)]
pub struct LevelPipeline {
    placer: EntityPlacer,
    assembler: LevelAssembler,
    validator: LevelValidator,
}

impl LevelPipeline {
    /// Pipeline with default placer, assembler and validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entity placer.
    #[must_use]
    pub fn with_placer(mut self, placer: EntityPlacer) -> Self {
        self.placer = placer;
        self
    }

    /// Replace the assembler.
    #[must_use]
    pub fn with_assembler(mut self, assembler: LevelAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Replace the validator.
    #[must_use]
    pub fn with_validator(mut self, validator: LevelValidator) -> Self {
        self.validator = validator;
        self
    }

    /// The validator used for the final stage.
    #[must_use]
    pub const fn validator(&self) -> &LevelValidator {
        &self.validator
    }

    /// Generate a level from `config` using `config.seed`.
    ///
    /// # Panics
    ///
    /// Panics if a placement spec breaks the distance contract.
    pub fn run(&self, config: &GenerationConfig) -> Result<GenerationReport> {
        self.run_cancellable(config, &CancellationToken::new())
    }

    /// [`Self::run`], checking `token` after terrain and after placement.
    ///
    /// # Panics
    ///
    /// Panics if a placement spec breaks the distance contract.
    pub fn run_cancellable(
        &self,
        config: &GenerationConfig,
        token: &CancellationToken,
    ) -> Result<GenerationReport> {
        self.run_staged(config, token, |_| {})
    }

    /// Runs the stages, calling `on_stage` as each one completes and before
    /// the token is checked.
    fn run_staged(
        &self,
        config: &GenerationConfig,
        token: &CancellationToken,
        mut on_stage: impl FnMut(&'static str),
    ) -> Result<GenerationReport> {
        let terrain = TerrainAlgorithm::from_config(config)?;
        let grid = terrain.generate(config.width, config.height, config.seed)?;
        on_stage("terrain");
        checkpoint(token, "terrain")?;

        let placement = self.placer.place(&grid, config, config.seed);
        on_stage("placement");
        checkpoint(token, "placement")?;

        let level = self.assembler.assemble_with_warnings(
            &grid,
            &placement.entities,
            &placement.warnings,
            config,
        )?;
        let validation = self.validator.validate(&level);

        debug!(
            algorithm = terrain.tag(),
            seed = config.seed,
            playable = validation.playable,
            quality = validation.quality_score,
            "Pipeline finished"
        );

        Ok(GenerationReport {
            level,
            warnings: placement.warnings,
            validation,
        })
    }
}

fn checkpoint(token: &CancellationToken, stage: &'static str) -> Result<()> {
    if token.is_cancelled() {
        info!(stage, "Generation cancelled");
        return Err(GenerationError::Cancelled { stage });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityType;

    fn pipeline() -> LevelPipeline {
        LevelPipeline::new().with_assembler(LevelAssembler::new().with_timestamp(0))
    }

    #[test]
    fn presets_run_end_to_end() {
        for config in [
            GenerationConfig::cave(),
            GenerationConfig::maze(),
            GenerationConfig::overworld(),
        ] {
            let report = pipeline().run(&config).unwrap();
            let terrain = report.level.terrain();
            assert_eq!((terrain.width(), terrain.height()), (config.width, config.height));
            assert_eq!(report.level.count_of(EntityType::Player), 1);
            assert!((0.0..=1.0).contains(&report.validation.quality_score));
        }
    }

    #[test]
    fn runs_are_reproducible() {
        let config = GenerationConfig::maze().with_seed(2024);
        let a = pipeline().run(&config).unwrap();
        let b = pipeline().run(&config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cancelled_token_stops_after_terrain() {
        let token = CancellationToken::new();
        token.clone().cancel();
        assert!(token.is_cancelled());
        let err = pipeline()
            .run_cancellable(&GenerationConfig::cave(), &token)
            .unwrap_err();
        assert_eq!(err, GenerationError::Cancelled { stage: "terrain" });
    }

    #[test]
    fn cancelling_during_placement_stops_before_assembly() {
        let token = CancellationToken::new();
        let mut seen = Vec::new();
        let result = pipeline().run_staged(&GenerationConfig::cave(), &token, |stage| {
            seen.push(stage);
            if stage == "placement" {
                token.cancel();
            }
        });
        assert_eq!(result, Err(GenerationError::Cancelled { stage: "placement" }));
        assert_eq!(seen, vec!["terrain", "placement"]);
    }

    #[test]
    fn untouched_token_lets_every_stage_finish() {
        let mut seen = Vec::new();
        let report = pipeline()
            .run_staged(&GenerationConfig::maze(), &CancellationToken::new(), |stage| {
                seen.push(stage);
            })
            .unwrap();
        assert_eq!(seen, vec!["terrain", "placement"]);
        assert_eq!(report.level.count_of(EntityType::Player), 1);
    }

    #[test]
    fn contract_errors_abort_before_placement() {
        let config = GenerationConfig::cave().with_algorithm("wfc");
        assert!(matches!(
            pipeline().run(&config),
            Err(GenerationError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn warnings_reach_the_report_and_metadata() {
        let config = GenerationConfig::new(12, 12, "maze").with_placement(
            crate::config::PlacementSpec::new(EntityType::Enemy, 4).with_min_distance(40.0),
        );
        let report = pipeline().run(&config).unwrap();
        assert_eq!(report.warnings.len(), 3);
        assert_eq!(report.level.metadata().placement_warnings.len(), 3);
    }
}
