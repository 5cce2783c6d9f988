//! Form finding from a JSON problem file
//!
//! Usage: `vecdiff-solve <problem.json> [--weighted]`
//!
//! The file holds `{ "input": ..., "config": ... }`; the config is optional.
//! The report goes to stderr and the solution as JSON to stdout.

use anyhow::{bail, Context};
use log::info;

use vecdiff_solver::prelude::*;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: vecdiff-solve <problem.json> [--weighted]");
    };
    let weighted = args.any(|a| a == "--weighted");

    let mut problem = ProblemFile::load(&path)
        .with_context(|| format!("failed to read problem file {path}"))?;
    if weighted {
        problem.config.mode = UpdateMode::Weighted;
    }
    info!(
        "Loaded {path}: {} nodes, {} edges",
        problem.input.nodes.len(),
        problem.input.edge_lines.len()
    );

    let solution = solve(&problem.input, &problem.config)?;
    eprint!("{}", solution.summary());

    let json = serde_json::to_string_pretty(&solution)?;
    println!("{json}");
    Ok(())
}
