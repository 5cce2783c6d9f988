//! Convergence report

use std::fmt::Write;

use crate::math::{total_magnitude, Vec3};

/// Render the convergence report of a finished run
///
/// Lists the iteration count, the deform ratio, the summed and the largest
/// nodal imbalance, then every node whose imbalance is not zero.
#[must_use]
pub fn report(imbalance: &[Vec3], ratio: f64, iteration: usize) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Iteration: {iteration}");
    let _ = writeln!(output, "Deform ratio: {ratio:.3}");
    let _ = writeln!(output, "Total imbalance: {:.6e}", total_magnitude(imbalance));

    let worst = imbalance
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.norm()))
        .fold(None, |best: Option<(usize, f64)>, (i, n)| match best {
            Some((_, b)) if b >= n => best,
            _ => Some((i, n)),
        });
    match worst {
        Some((node, n)) => {
            let _ = writeln!(output, "Max nodal imbalance: {n:.6e} at node {node}");
        }
        None => output.push_str("Max nodal imbalance: none (no nodes)\n"),
    }

    for (i, v) in imbalance.iter().enumerate() {
        if v.norm() > 0.0 {
            let _ = writeln!(
                output,
                "  node {i}: ({:+.4e}, {:+.4e}, {:+.4e})",
                v.x, v.y, v.z
            );
        }
    }

    output
}
