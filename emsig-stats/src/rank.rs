//! Ranking methods for gene scores.
//!
//! [`average_ranks`] gives tied values the mean of their would-be ranks, as
//! the rank-sum test needs. [`rank_descending`] produces the integer
//! "position in the rank file" convention used for gene rankings (highest
//! score first), and [`tie_correction`] feeds the variance correction of the
//! rank-sum test.

/// Sort `(value, index)` pairs ascending and return the boundaries of each
/// run of equal values as half-open ranges into the sorted order.
fn sorted_with_ties(data: &[f64]) -> (Vec<(f64, usize)>, Vec<(usize, usize)>) {
    let mut indexed: Vec<(f64, usize)> = data.iter().copied().enumerate().map(|(i, v)| (v, i)).collect();
    indexed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut groups = Vec::new();
    let mut start = 0;
    while start < indexed.len() {
        let mut end = start + 1;
        while end < indexed.len() && indexed[end].0.total_cmp(&indexed[start].0).is_eq() {
            end += 1;
        }
        groups.push((start, end));
        start = end;
    }
    (indexed, groups)
}

/// 1-based ascending ranks; tied values share the mean of their ranks.
///
/// Empty input produces empty output.
pub fn average_ranks(data: &[f64]) -> Vec<f64> {
    let (indexed, groups) = sorted_with_ties(data);
    let mut ranks = vec![0.0; data.len()];

    for (start, end) in groups {
        // mean of (start+1)..=end
        let shared = (start + 1 + end) as f64 / 2.0;
        for &(_, orig) in &indexed[start..end] {
            ranks[orig] = shared;
        }
    }

    ranks
}

/// Integer positions with the highest score at position 1.
///
/// Ties keep their input order, so a rank file that is already sorted by
/// descending score maps each line to its own position.
pub fn rank_descending(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // Stable sort keeps file order within ties.
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut positions = vec![0; scores.len()];
    for (pos, idx) in order.into_iter().enumerate() {
        positions[idx] = pos + 1;
    }
    positions
}

/// Tie correction term Σ (t³ − t) over every group of `t` tied values.
///
/// Zero when all values are distinct.
pub fn tie_correction(data: &[f64]) -> f64 {
    let (_, groups) = sorted_with_ties(data);
    groups
        .into_iter()
        .map(|(start, end)| {
            let t = (end - start) as f64;
            t * t * t - t
        })
        .sum()
}

// ── Tests ──────────────────────────────────────────────────────────────────
