//! End-to-end generation scenarios.

use levelgen_core::prelude::*;
use levelgen_core::{placement, terrain};
use levelgen_test_utils::determinism::fixed_clock_pipeline;
use levelgen_test_utils::fixtures::{level_from_map, small_config};

// =============================================================================
// Terrain
// =============================================================================

mod terrain_scenarios {
    use super::*;

    #[test]
    fn smallest_maze_has_wall_and_floor() {
        let config = GenerationConfig::new(3, 3, "maze").with_seed(1);
        let grid = terrain::generate(&config, 1).unwrap();
        assert!(grid.count(TileType::Wall) >= 1);
        assert!(grid.count(TileType::Ground) >= 1);
    }

    #[test]
    fn undersized_maze_is_rejected() {
        let config = GenerationConfig::new(2, 9, "maze");
        assert!(matches!(
            terrain::generate(&config, 1),
            Err(GenerationError::InvalidDimensions { width: 2, height: 9, .. })
        ));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let config = GenerationConfig::new(20, 20, "wave_function_collapse");
        assert_eq!(
            terrain::generate(&config, 1),
            Err(GenerationError::UnsupportedAlgorithm(
                "wave_function_collapse".to_string()
            ))
        );
    }

    #[test]
    fn out_of_range_parameter_is_rejected() {
        let config = GenerationConfig::new(20, 20, "cellular_automata")
            .with_parameter("wallProbability", 1.5);
        assert!(matches!(
            terrain::generate(&config, 1),
            Err(GenerationError::InvalidParameter { .. })
        ));
    }
}

// =============================================================================
// Cave connectivity
// =============================================================================

mod cave_scenarios {
    use super::*;

    #[test]
    fn player_at_first_open_cell_reaches_an_enemy() {
        let config = GenerationConfig::new(50, 50, "cellular_automata")
            .with_seed(42)
            .with_parameter("iterations", 5.0)
            .with_parameter("birthLimit", 4.0)
            .with_parameter("deathLimit", 3.0)
            .with_placement(PlacementSpec::new(EntityType::Enemy, 3));

        let grid = terrain::generate(&config, 42).unwrap();
        let outcome = placement::place(&grid, &config, 42);
        assert_eq!(outcome.entities.len(), 3, "warnings: {:?}", outcome.warnings);

        let first_open = grid
            .positions()
            .find(|&p| grid.is_walkable(p))
            .expect("cave has open cells");
        let mut entities = vec![PlacedEntity::new(EntityType::Player, first_open)];
        entities.extend(outcome.entities);

        let level = LevelAssembler::new().assemble(&grid, &entities, &config).unwrap();
        let reach = LevelValidator::reachability(&level).expect("player exists");
        let reached_others = level
            .entities()
            .iter()
            .filter(|e| e.entity_type != EntityType::Player && reach.contains(e.position))
            .count();
        assert!(reached_others >= 1);
        assert!(LevelValidator::new().is_playable(&level));
    }
}

// =============================================================================
// Validation
// =============================================================================

mod validation_scenarios {
    use super::*;

    #[test]
    fn collect_all_items_without_items_is_unplayable() {
        let config = GenerationConfig::cave()
            .with_seed(9)
            .with_victory_condition("collect_all_items");
        let config = GenerationConfig {
            placement_specs: config
                .placement_specs
                .into_iter()
                .filter(|s| s.entity_type != EntityType::Item)
                .collect(),
            ..config
        };

        let report = fixed_clock_pipeline().run(&config).unwrap();
        assert_eq!(report.level.count_of(EntityType::Item), 0);
        assert!(!report.validation.playable);
        assert!(report.validation.issues.iter().any(|i| i.contains("Item")));
    }

    #[test]
    fn walled_off_exit_is_reported() {
        let level = level_from_map(
            "
            #########
            #P..#..X#
            #...#...#
            #########
            ",
            &["reach_exit"],
        );
        let result = LevelValidator::new().validate(&level);
        assert!(!result.playable);
        assert_eq!(result.issues, vec!["Entity Exit at (7,1) is unreachable"]);
    }

    #[test]
    fn obstacle_in_a_doorway_does_not_block() {
        let level = level_from_map(
            "
            #########
            #P..O..X#
            #########
            ",
            &["reach_exit"],
        );
        assert!(LevelValidator::new().is_playable(&level));
    }

    #[test]
    fn quality_is_within_unit_interval_for_presets() {
        for config in [
            GenerationConfig::cave(),
            GenerationConfig::maze(),
            GenerationConfig::overworld(),
        ] {
            let report = fixed_clock_pipeline().run(&config).unwrap();
            assert!((0.0..=1.0).contains(&report.validation.quality_score));
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

mod pipeline_scenarios {
    use super::*;

    #[test]
    fn cancelled_run_returns_no_level() {
        let token = CancellationToken::new();
        token.cancel();
        let result = fixed_clock_pipeline().run_cancellable(&small_config("noise", 3), &token);
        assert!(matches!(result, Err(GenerationError::Cancelled { .. })));
    }

    #[test]
    fn concurrent_runs_do_not_interfere() {
        let config = small_config("maze", 4);
        let expected = fixed_clock_pipeline().run(&config).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| fixed_clock_pipeline().run(&config).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn downstream_annotation_keeps_terrain_and_entities() {
        let mut report = fixed_clock_pipeline().run(&small_config("cellular_automata", 2)).unwrap();
        let entities = report.level.entities().to_vec();
        report.level.annotate("export.format", "json");
        assert_eq!(report.level.entities(), entities.as_slice());
        assert_eq!(
            report.level.metadata().extra.get("export.format").map(String::as_str),
            Some("json")
        );
    }
}
