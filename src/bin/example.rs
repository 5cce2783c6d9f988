//! Form finding example - hanging cable net

use vecdiff_solver::prelude::*;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== Vector Difference Example: Hanging Cable Net ===\n");

    // Square net in the XY plane, edge supports held, interior nodes loaded
    //
    //   S---S---S---S---S
    //   |   |   |   |   |
    //   S---o---o---o---S
    //   |   |   |   |   |
    //   S---o---o---o---S      o = 1 kN downward
    //   |   |   |   |   |
    //   S---o---o---o---S
    //   |   |   |   |   |
    //   S---S---S---S---S
    //
    let divisions = 4;
    let spacing = 1.0;
    let load = 1.0;

    let index = |i: usize, j: usize| i * (divisions + 1) + j;
    let mut nodes = Vec::new();
    for i in 0..=divisions {
        for j in 0..=divisions {
            nodes.push(Point::new(j as f64 * spacing, i as f64 * spacing, 0.0));
        }
    }

    let mut input = ProblemInput::new(nodes.clone());
    for i in 0..=divisions {
        for j in 0..=divisions {
            let p = nodes[index(i, j)];
            if j < divisions {
                input = input.with_edge(Line::new(p, nodes[index(i, j + 1)]), 1.0);
            }
            if i < divisions {
                input = input.with_edge(Line::new(p, nodes[index(i + 1, j)]), 1.0);
            }
            let boundary = i == 0 || j == 0 || i == divisions || j == divisions;
            if boundary {
                input = input.with_free_support(p);
            } else {
                input = input.with_load(Line::from_vector(p, Vec3::new(0.0, 0.0, -load)));
            }
        }
    }

    println!(
        "Nodes: {}, edges: {}, loads: {}\n",
        input.nodes.len(),
        input.edge_lines.len(),
        input.external_force_lines.len()
    );

    // Unit forces over unit spans overshoot with the plain step
    let config = SolverConfig::new()
        .with_max_iter(500)
        .with_ratio(0.5)
        .with_damping(true);
    let solution = solve(&input, &config)?;

    println!("{}", solution.summary());

    let center = index(divisions / 2, divisions / 2);
    println!("Center node sag: {:.4}", -solution.nodes[center].z);

    println!("\nEdge forces:");
    for (i, (line, n)) in solution
        .internal_lines
        .iter()
        .zip(&solution.internal_magnitudes)
        .enumerate()
    {
        println!(
            "  E{i}: ({:.3}, {:.3}, {:.3}) -> ({:.3}, {:.3}, {:.3})  N={n:.4}",
            line.start.x, line.start.y, line.start.z, line.end.x, line.end.y, line.end.z
        );
    }

    let reactions: Vec<&Line> = solution.external_of(ExternalKind::Reaction).collect();
    let vertical: f64 = reactions.iter().map(|l| l.vector().z).sum();
    println!(
        "\nSupport reactions: {} lines, vertical sum {:.4} (applied {:.4})",
        reactions.len(),
        vertical,
        load * input.external_force_lines.len() as f64
    );

    println!("\n=== Form Finding Complete ===");
    Ok(())
}
