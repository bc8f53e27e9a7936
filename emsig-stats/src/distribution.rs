//! Special functions and the distributions behind the similarity p-values.
//!
//! P-values of interest to signature post-analysis are tiny, so tails are
//! computed directly ([`erfc`], log-space binomials) rather than as
//! `1 - cdf`.

use core::f64::consts::{PI, SQRT_2};

use emsig_core::{EmsigError, Result};

// ── Special functions ──────────────────────────────────────────────────────

/// Complementary error function, Chebyshev fit (Numerical Recipes `erfcc`).
///
/// Fractional error below 1.2e-7 over the whole real line, including the
/// far tails where `1 - erf(x)` would round to zero. Exact at zero, so the
/// two tails of a symmetric distribution meet at 1/2.
pub fn erfc(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.26551223
        + t * (1.00002368
            + t * (0.37409196
                + t * (0.09678418
                    + t * (-0.18628806
                        + t * (0.27886807
                            + t * (-1.13520398 + t * (1.48851587 + t * (-0.82215223 + t * 0.17087277))))))));
    let ans = t * poly.exp();
    if x >= 0.0 {
        ans
    } else {
        2.0 - ans
    }
}

pub fn erf(x: f64) -> f64 {
    1.0 - erfc(x)
}

/// ln Γ(x), Lanczos approximation with g = 7.
pub fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const LANCZOS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        // Γ(x)Γ(1-x) = π / sin(πx)
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let series = LANCZOS[1..]
        .iter()
        .enumerate()
        .fold(LANCZOS[0], |acc, (i, &c)| acc + c / (x + i as f64 + 1.0));
    let t = x + G + 0.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// ln C(n, k); negative infinity when `k > n`.
pub fn ln_choose(n: usize, k: usize) -> f64 {
    match k {
        _ if k > n => f64::NEG_INFINITY,
        0 => 0.0,
        _ if k == n => 0.0,
        _ => ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0),
    }
}

// ── Distributions ──────────────────────────────────────────────────────────

/// Tail probabilities and moments of a univariate distribution.
pub trait Distribution {
    /// P(X <= x).
    fn cdf(&self, x: f64) -> f64;

    /// P(X > x). Implementations with an accurate upper tail override this.
    fn sf(&self, x: f64) -> f64 {
        1.0 - self.cdf(x)
    }

    fn mean(&self) -> f64;

    fn variance(&self) -> f64;
}

/// Normal distribution N(μ, σ²), used for large-sample rank-sum statistics.
#[derive(Debug, Clone, Copy)]
pub struct Normal {
    mu: f64,
    sigma: f64,
}

impl Normal {
    pub fn new(mu: f64, sigma: f64) -> Result<Self> {
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(EmsigError::InvalidInput(format!(
                "normal distribution needs a positive finite sigma, got {sigma}"
            )));
        }
        Ok(Self { mu, sigma })
    }

    /// N(0, 1).
    pub fn standard() -> Self {
        Self { mu: 0.0, sigma: 1.0 }
    }

    fn z(&self, x: f64) -> f64 {
        (x - self.mu) / (self.sigma * SQRT_2)
    }
}

impl Distribution for Normal {
    fn cdf(&self, x: f64) -> f64 {
        0.5 * erfc(-self.z(x))
    }

    fn sf(&self, x: f64) -> f64 {
        0.5 * erfc(self.z(x))
    }

    fn mean(&self) -> f64 {
        self.mu
    }

    fn variance(&self) -> f64 {
        self.sigma * self.sigma
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
