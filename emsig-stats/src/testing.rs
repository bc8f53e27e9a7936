//! Hypothesis testing.
//!
//! Provides the rank-sum [`mann_whitney_u`] test with a selectable
//! [`Alternative`], used to compare the scores of an overlap sample against
//! a background ranking.

use emsig_core::{EmsigError, Result, Scored, Summarizable};

use crate::distribution::{Distribution, Normal};
use crate::rank::{average_ranks, tie_correction};

/// Result of a hypothesis test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// The test statistic (U for the first sample).
    pub statistic: f64,
    /// p-value for the requested alternative.
    pub p_value: f64,
    /// Standardized statistic under the normal approximation.
    pub z: f64,
    /// Name of the test method.
    pub method: String,
}

impl Scored for TestResult {
    fn score(&self) -> f64 {
        self.p_value
    }
}

impl Summarizable for TestResult {
    fn summary(&self) -> String {
        format!(
            "{}: statistic={:.4}, z={:.4}, p={:.6}",
            self.method, self.statistic, self.z, self.p_value,
        )
    }
}

/// Alternative hypothesis for a one- or two-sided test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alternative {
    /// The first sample differs from the second in either direction.
    TwoSided,
    /// The first sample is stochastically greater than the second.
    Greater,
    /// The first sample is stochastically less than the second.
    Less,
}

impl Alternative {
    fn label(self) -> &'static str {
        match self {
            Alternative::TwoSided => "two-sided",
            Alternative::Greater => "greater",
            Alternative::Less => "less",
        }
    }
}

// ── Mann-Whitney U test ────────────────────────────────────────────────────

/// Mann-Whitney U test (Wilcoxon rank-sum test).
///
/// Tests whether `x` comes from a distribution shifted relative to `y`
/// in the direction given by `alternative`. Uses the normal approximation
/// with tie-corrected variance; when the variance vanishes (every value
/// tied) the p-value is 1.0.
///
/// Each sample must be non-empty; an empty sample makes the statistic
/// undefined and is reported as [`EmsigError::Arithmetic`].
pub fn mann_whitney_u(x: &[f64], y: &[f64], alternative: Alternative) -> Result<TestResult> {
    if x.is_empty() || y.is_empty() {
        return Err(EmsigError::Arithmetic(format!(
            "mann_whitney_u: empty sample (|x|={}, |y|={})",
            x.len(),
            y.len(),
        )));
    }
    let nx = x.len() as f64;
    let ny = y.len() as f64;
    let n = nx + ny;

    let mut combined: Vec<f64> = Vec::with_capacity(x.len() + y.len());
    combined.extend_from_slice(x);
    combined.extend_from_slice(y);
    let ranks = average_ranks(&combined);

    let r1: f64 = ranks[..x.len()].iter().sum();
    let u1 = r1 - nx * (nx + 1.0) / 2.0;

    let mu_u = nx * ny / 2.0;
    let ties = tie_correction(&combined);
    let var_u = nx * ny / 12.0 * ((n + 1.0) - ties / (n * (n - 1.0)));

    let method = format!("Mann-Whitney U test ({})", alternative.label());
    if !(var_u > 0.0) {
        return Ok(TestResult {
            statistic: u1,
            p_value: 1.0,
            z: 0.0,
            method,
        });
    }

    let z = (u1 - mu_u) / var_u.sqrt();
    let normal = Normal::standard();
    let p = match alternative {
        Alternative::Greater => normal.sf(z),
        Alternative::Less => normal.cdf(z),
        Alternative::TwoSided => (2.0 * normal.sf(z.abs())).min(1.0),
    };

    Ok(TestResult {
        statistic: u1,
        p_value: p.clamp(0.0, 1.0),
        z,
        method,
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────
