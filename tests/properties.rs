use std::ops::Range;

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vecdiff_solver::analysis::iterate;
use vecdiff_solver::force_matrix::build_force_matrix;
use vecdiff_solver::matching::{match_loads, match_supports};
use vecdiff_solver::prelude::*;

/// Sagging chain between two end supports with random loads and initial forces
fn random_chain(rng: &mut StdRng, forces: Range<f64>) -> ProblemInput {
    let segments = rng.gen_range(2..=5);
    let span = rng.gen_range(2.0..6.0);
    let nodes: Vec<Point> = (0..=segments)
        .map(|i| {
            let z = if i == 0 || i == segments {
                0.0
            } else {
                rng.gen_range(-0.3..0.3)
            };
            Point::new(span * i as f64 / segments as f64, 0.0, z)
        })
        .collect();

    let mut input = ProblemInput::new(nodes.clone())
        .with_free_support(nodes[0])
        .with_free_support(nodes[segments]);
    for i in 0..segments {
        input = input.with_edge(Line::new(nodes[i], nodes[i + 1]), rng.gen_range(forces.clone()));
    }
    for node in &nodes[1..segments] {
        let load = Vec3::new(0.0, 0.0, -rng.gen_range(0.5..2.0));
        input = input.with_load(Line::from_vector(*node, load));
    }
    input
}

/// Chain held by deformable supports whose reactions are not free
fn pinned_chain() -> ProblemInput {
    let nodes = vec![
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, -0.2),
        Point::new(2.0, 0.0, -0.1),
        Point::new(3.0, 0.0, 0.0),
    ];
    let mut input = ProblemInput::new(nodes.clone())
        .with_deformable_support(nodes[0])
        .with_free_support(nodes[3]);
    for i in 0..3 {
        input = input.with_edge(Line::new(nodes[i], nodes[i + 1]), 0.5);
    }
    input
        .with_load(Line::from_vector(nodes[1], Vec3::new(0.0, 0.0, -1.0)))
        .with_load(Line::from_vector(nodes[2], Vec3::new(0.3, 0.0, -1.0)))
}

#[test]
fn test_optimizable_supports_subset_of_all() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
        let nodes: Vec<Point> = (0..8)
            .map(|_| Point::new(rng.gen_range(0..4) as f64, rng.gen_range(0..4) as f64, 0.0))
            .collect();
        let pick = |rng: &mut StdRng| -> Vec<Point> {
            (0..rng.gen_range(0..6))
                .map(|_| Point::new(rng.gen_range(0..5) as f64, rng.gen_range(0..5) as f64, 0.0))
                .collect()
        };
        let free = pick(&mut rng);
        let deformable = pick(&mut rng);
        let (supports, _) = match_supports(&nodes, &free, &deformable, 1e-4);
        for node in supports.optimizable() {
            assert!(supports.all().contains(node));
        }
    }
}

#[test]
fn test_force_matrix_antisymmetric_every_iteration() {
    let input = pinned_chain();
    let tol = 1e-4;
    let (supports, _) = match_supports(
        &input.nodes,
        &input.free_support_points,
        &input.deformable_support_points,
        tol,
    );
    let (loads, _) = match_loads(&input.nodes, &input.external_force_lines, tol);

    for weighted in [false, true] {
        for budget in 1..=20 {
            let (forces, _) =
                build_force_matrix(&input.nodes, &input.edge_lines, &input.edge_magnitudes, tol)
                    .unwrap();
            let config = SolverConfig::new()
                .with_max_iter(budget)
                .with_threshold(0.0)
                .with_weighted(weighted);
            let out = iterate(&input.nodes, forces, &loads, &supports, &config);
            assert_eq!(out.iterations, budget);
            assert!(out.forces.is_antisymmetric(1e-12));
            for i in 0..out.forces.size() {
                assert_eq!(out.forces.get(i, i), 0.0);
            }
        }
    }
}

#[test]
fn test_supports_never_move() {
    let input = pinned_chain();
    for weighted in [false, true] {
        let config = SolverConfig::new()
            .with_max_iter(40)
            .with_threshold(0.0)
            .with_subdivision(3.0)
            .with_weighted(weighted);
        let solution = solve(&input, &config).unwrap();
        for &node in solution.supports.all() {
            assert_eq!(
                solution.nodes[node].coords.as_slice(),
                input.nodes[node].coords.as_slice()
            );
        }
        assert!(solution.nodes[1] != input.nodes[1]);
    }
}

#[test]
fn test_deformable_support_gets_fake_load_when_exhausted() {
    // The deformable support has no free reaction, so its residual stays and
    // imposed equilibrium has to cancel it
    let input = pinned_chain();
    let config = SolverConfig::new().with_max_iter(10).with_threshold(0.0);
    let solution = solve(&input, &config).unwrap();
    assert_eq!(solution.status, SolverStatus::Exhausted);
    assert!(solution.fake_loads.iter().any(|f| f.node == 0));
    assert!(solution
        .warnings
        .iter()
        .any(|w| matches!(w, SolverWarning::FakeLoad { node: 0, .. })));
    assert_eq!(
        solution.external_of(ExternalKind::FakeLoad).count(),
        solution.fake_loads.len()
    );

    let plain = solve(&input, &config.clone().with_imposed_equilibrium(false)).unwrap();
    assert!(plain.fake_loads.is_empty());
    assert_eq!(plain.external_of(ExternalKind::FakeLoad).count(), 0);
}

#[test]
fn test_closed_run_gate_replays_previous_output() {
    let mut state = SolverState::new();
    let config = SolverConfig::new().with_max_iter(25);
    let first = state.evaluate(&pinned_chain(), &config, true).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let other = random_chain(&mut rng, 0.1..0.5);
    for _ in 0..3 {
        let replay = state.evaluate(&other, &config, false).unwrap();
        assert_eq!(replay, first);
    }

    let fresh = state.evaluate(&other, &config, true).unwrap();
    assert_ne!(fresh, first);
    assert_eq!(state.evaluate(&pinned_chain(), &config, false).unwrap(), fresh);
}

#[test]
fn test_zero_ratio_single_iteration_keeps_positions() {
    let input = pinned_chain();
    let config = SolverConfig::new().with_ratio(0.0).with_max_iter(1);
    let solution = solve(&input, &config).unwrap();
    assert_eq!(solution.iterations, 1);
    assert_eq!(solution.nodes, input.nodes);
    assert!(solution.report.contains("Iteration: 1"));
    assert!(solution.report.contains("Deform ratio: 0.000"));
    assert!(solution.convergence.is_finite());
}

#[test]
fn test_zero_threshold_exhausts_budget() {
    let mut rng = StdRng::seed_from_u64(5);
    let input = random_chain(&mut rng, 0.1..0.5);
    let config = SolverConfig::new().with_threshold(0.0).with_max_iter(60);
    let solution = solve(&input, &config).unwrap();
    assert_eq!(solution.status, SolverStatus::Exhausted);
    assert_eq!(solution.iterations, 60);
    assert_eq!(solution.history.len(), 60);
}

#[test]
fn test_convergence_measure_equal_to_threshold_keeps_running() {
    // Hanging element: the first iteration measures exactly the load magnitude
    let input = ProblemInput::new(vec![Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, -1.0)])
        .with_edge(Line::from_coords([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]), 0.0)
        .with_load(Line::from_coords([0.0, 0.0, -1.0], [0.0, 0.0, -11.0]))
        .with_free_support(Point::new(0.0, 0.0, 0.0));
    let config = SolverConfig::new().with_threshold(10.0).with_max_iter(50);
    let solution = solve(&input, &config).unwrap();
    assert_relative_eq!(solution.history[0], 10.0);
    assert!(solution.iterations > 1);
    assert!(solution.convergence < 10.0);
}

#[test]
fn test_invalid_config_rejected_before_running() {
    let input = pinned_chain();
    let bad = [
        SolverConfig::new().with_ratio(-0.5),
        SolverConfig::new().with_ratio(1.01),
        SolverConfig::new().with_max_iter(0),
        SolverConfig::new().with_subdivision(0.0),
    ];
    for config in bad {
        let mut state = SolverState::new();
        let err = state.evaluate(&input, &config, true).unwrap_err();
        assert!(matches!(err, FormError::InvalidConfig(_)));
        assert!(state.last().is_none());
    }
}

#[test]
fn test_unmatched_geometry_reported_as_warnings() {
    let input = pinned_chain()
        .with_edge(Line::from_coords([0.0, 0.0, 0.0], [9.0, 9.0, 9.0]), 1.0)
        .with_load(Line::from_coords([7.0, 7.0, 7.0], [7.0, 7.0, 6.0]))
        .with_free_support(Point::new(5.0, 5.0, 5.0));
    let solution = solve(&input, &SolverConfig::new().with_max_iter(5)).unwrap();
    assert_eq!(solution.internal_lines.len(), 3);
    assert!(solution
        .warnings
        .contains(&SolverWarning::UnmatchedEdge { line: 3 }));
    assert!(solution
        .warnings
        .contains(&SolverWarning::UnmatchedLoad { line: 2 }));
    assert!(solution.warnings.iter().any(|w| matches!(
        w,
        SolverWarning::UnmatchedSupport { point: 1, .. }
    )));
}

#[test]
fn test_edge_collapsing_mid_run_keeps_force() {
    // Two free nodes pulled together meet halfway in the first iteration
    let (a, b) = (Point::new(0.0, 0.0, 0.0), Point::new(1.0, 0.0, 0.0));
    let input = ProblemInput::new(vec![a, b]).with_edge(Line::new(a, b), 1.0);
    let config = SolverConfig::new().with_ratio(0.5).with_max_iter(10);

    for weighted in [false, true] {
        let solution = solve(&input, &config.clone().with_weighted(weighted)).unwrap();
        assert_eq!(solution.status, SolverStatus::Converged);
        assert_eq!(solution.iterations, 2);
        assert_eq!(solution.internal_magnitudes, vec![1.0]);

        for p in &solution.nodes {
            assert!(p.coords.iter().all(|v| v.is_finite()));
            assert_relative_eq!(p.x, 0.5, epsilon = 1e-12);
        }
        assert!(solution.internal_lines[0].length() <= config.tol);
        assert!(solution.history.iter().all(|h| h.is_finite()));
        assert_eq!(solution.convergence, 0.0);

        let collapsed = solution
            .warnings
            .iter()
            .filter(|w| matches!(w, SolverWarning::DegenerateEdge { start: 0, end: 1 }))
            .count();
        assert_eq!(collapsed, 1);
    }
}

#[test]
fn test_light_chains_reduce_imbalance() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let input = random_chain(&mut rng, 0.1..0.5);
        let ratio = if rng.gen_bool(0.5) { 0.25 } else { 0.5 };
        let weighted = rng.gen_bool(0.5);
        let config = SolverConfig::new()
            .with_ratio(ratio)
            .with_weighted(weighted)
            .with_max_iter(400);
        let solution = solve(&input, &config).unwrap();

        let first = solution.history[0];
        let last = solution.convergence;
        assert!(last < first, "ratio {ratio} weighted {weighted}: {first} -> {last}");
    }
}

#[test]
fn test_damped_stiff_chains_converge() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut converged = 0;
    for _ in 0..100 {
        let input = random_chain(&mut rng, 0.5..3.0);
        let ratio = if rng.gen_bool(0.5) { 0.25 } else { 0.5 };
        let weighted = rng.gen_bool(0.5);
        let config = SolverConfig::new()
            .with_ratio(ratio)
            .with_weighted(weighted)
            .with_damping(true)
            .with_max_iter(400);
        let solution = solve(&input, &config).unwrap();

        let first = solution.history[0];
        let last = solution.convergence;
        assert!(last < first, "ratio {ratio} weighted {weighted}: {first} -> {last}");
        if solution.is_converged() {
            converged += 1;
        }
    }
    assert!(converged >= 95, "{converged} of 100 converged");
}
