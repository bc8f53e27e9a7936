//! Hypergeometric distribution and the one-sided over-representation test.
//!
//! X ~ Hypergeometric(N, K, n) counts the successes in `n` draws without
//! replacement from a population of `N` items of which `K` are successes.
//! Gene-set overlap maps onto it as:
//!
//! - N = universe size
//! - K = size of the reference (enrichment) gene set
//! - n = size of the query (signature) gene set
//! - k = size of the intersection

use emsig_core::{EmsigError, Result};

use crate::distribution::{ln_choose, Distribution};

/// Hypergeometric distribution over the number of successes drawn.
#[derive(Debug, Clone, Copy)]
pub struct Hypergeometric {
    population: usize,
    successes: usize,
    draws: usize,
}

impl Hypergeometric {
    /// Create a distribution with population `N`, `K` successes and `n` draws.
    ///
    /// Fails with [`EmsigError::Arithmetic`] when `N == 0`, `K > N` or `n > N`,
    /// since the distribution is undefined for those parameters.
    pub fn new(population: usize, successes: usize, draws: usize) -> Result<Self> {
        if population == 0 {
            return Err(EmsigError::Arithmetic(
                "hypergeometric: population size must be > 0".into(),
            ));
        }
        if successes > population {
            return Err(EmsigError::Arithmetic(format!(
                "hypergeometric: {} successes exceed population {}",
                successes, population,
            )));
        }
        if draws > population {
            return Err(EmsigError::Arithmetic(format!(
                "hypergeometric: {} draws exceed population {}",
                draws, population,
            )));
        }
        Ok(Self {
            population,
            successes,
            draws,
        })
    }

    /// Smallest attainable value: max(0, n + K - N).
    pub fn min_value(&self) -> usize {
        (self.draws + self.successes).saturating_sub(self.population)
    }

    /// Largest attainable value: min(n, K).
    pub fn max_value(&self) -> usize {
        self.draws.min(self.successes)
    }

    /// Natural log of P(X = k); negative infinity outside the support.
    pub fn ln_pmf(&self, k: usize) -> f64 {
        if k < self.min_value() || k > self.max_value() {
            return f64::NEG_INFINITY;
        }
        ln_choose(self.successes, k) + ln_choose(self.population - self.successes, self.draws - k)
            - ln_choose(self.population, self.draws)
    }

    /// P(X = k).
    pub fn pmf(&self, k: usize) -> f64 {
        self.ln_pmf(k).exp()
    }

    /// Upper tail P(X >= k), summed term by term in log space.
    pub fn upper_tail(&self, k: usize) -> f64 {
        if k <= self.min_value() {
            return 1.0;
        }
        if k > self.max_value() {
            return 0.0;
        }
        let sum: f64 = (k..=self.max_value()).map(|i| self.ln_pmf(i).exp()).sum();
        sum.min(1.0)
    }
}

impl Hypergeometric {
    // First integer above `x`, clamped to the support so huge `x` cannot
    // overflow the cast.
    fn next_count(&self, x: f64) -> usize {
        let max = self.max_value();
        if x >= max as f64 {
            max + 1
        } else {
            x.floor() as usize + 1
        }
    }
}

impl Distribution for Hypergeometric {
    fn cdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        1.0 - self.upper_tail(self.next_count(x))
    }

    fn sf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 1.0;
        }
        self.upper_tail(self.next_count(x))
    }

    fn mean(&self) -> f64 {
        self.draws as f64 * self.successes as f64 / self.population as f64
    }

    fn variance(&self) -> f64 {
        let n = self.draws as f64;
        let big_k = self.successes as f64;
        let big_n = self.population as f64;
        if self.population < 2 {
            return 0.0;
        }
        n * (big_k / big_n) * ((big_n - big_k) / big_n) * ((big_n - n) / (big_n - 1.0))
    }
}

/// One-sided over-representation p-value P(X >= k).
///
/// - `k`: observed overlap
/// - `n`: query set size (draws)
/// - `big_k`: reference set size (successes)
/// - `big_n`: universe size (population)
///
/// An overlap of zero always yields 1.0. An overlap larger than either set
/// is inconsistent and reported as [`EmsigError::Arithmetic`].
pub fn hypergeometric_upper_tail(k: usize, n: usize, big_k: usize, big_n: usize) -> Result<f64> {
    let dist = Hypergeometric::new(big_n, big_k, n)?;
    if k > dist.max_value() {
        return Err(EmsigError::Arithmetic(format!(
            "hypergeometric: overlap {} exceeds min(n={}, K={})",
            k, n, big_k,
        )));
    }
    if k == 0 {
        return Ok(1.0);
    }
    Ok(dist.upper_tail(k))
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_form_small_universe() {
        // N=1000, K=5, n=4, k=3:
        // [C(5,3)C(995,1) + C(5,4)C(995,0)] / C(1000,4) = 9955 / 41417124750
        let p = hypergeometric_upper_tail(3, 4, 5, 1000).unwrap();
        let expected = 9955.0 / 41_417_124_750.0;
        assert!((p - expected).abs() < 1e-15, "p={p} expected={expected}");
    }

    #[test]
    fn zero_overlap_is_one() {
        assert_eq!(hypergeometric_upper_tail(0, 10, 20, 100).unwrap(), 1.0);
    }

    #[test]
    fn pmf_sums_to_one() {
        let d = Hypergeometric::new(50, 12, 9).unwrap();
        let total: f64 = (0..=9).map(|k| d.pmf(k)).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn forced_overlap_has_tail_one() {
        // n + K > N forces at least 3 successes
        let d = Hypergeometric::new(10, 7, 6).unwrap();
        assert_eq!(d.min_value(), 3);
        assert_eq!(d.upper_tail(3), 1.0);
        assert_eq!(d.pmf(2), 0.0);
    }

    #[test]
    fn tail_decreases_with_k() {
        let d = Hypergeometric::new(200, 30, 25).unwrap();
        let mut prev = 1.0;
        for k in 1..=25 {
            let p = d.upper_tail(k);
            assert!(p <= prev + 1e-15);
            prev = p;
        }
    }

    #[test]
    fn degenerate_parameters() {
        assert!(hypergeometric_upper_tail(1, 2, 3, 0).unwrap_err().is_arithmetic());
        assert!(hypergeometric_upper_tail(1, 2, 30, 10).unwrap_err().is_arithmetic());
        assert!(hypergeometric_upper_tail(1, 20, 3, 10).unwrap_err().is_arithmetic());
        assert!(hypergeometric_upper_tail(4, 3, 5, 10).unwrap_err().is_arithmetic());
    }

    #[test]
    fn tails_beyond_support() {
        let d = Hypergeometric::new(1000, 5, 4).unwrap();
        assert_eq!(d.sf(f64::MAX), 0.0);
        assert_eq!(d.cdf(f64::MAX), 1.0);
        assert_eq!(d.sf(4.0), 0.0);
        assert_eq!(d.sf(f64::INFINITY), 0.0);
        assert!(d.sf(3.5) > 0.0);
    }

    #[test]
    fn mean_and_sf_agree_with_definition() {
        let d = Hypergeometric::new(1000, 5, 4).unwrap();
        assert!((d.mean() - 0.02).abs() < 1e-12);
        assert!((d.sf(2.0) - d.upper_tail(3)).abs() < 1e-18);
        assert!((d.cdf(2.0) + d.sf(2.0) - 1.0).abs() < 1e-12);
    }
}
