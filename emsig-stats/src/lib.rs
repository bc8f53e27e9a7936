//! Statistical methods for the emsig gene-set similarity engine.
//!
//! - **Distributions** — [`distribution::Normal`], `erfc` and log-gamma helpers
//! - **Ranking** — tie-aware ranks for rank-sum tests
//! - **Hypergeometric** — one-sided over-representation p-values
//! - **Hypothesis testing** — sided Mann-Whitney U

pub mod distribution;
pub mod hypergeom;
pub mod rank;
pub mod testing;

pub use hypergeom::{hypergeometric_upper_tail, Hypergeometric};
pub use testing::{mann_whitney_u, Alternative, TestResult};
