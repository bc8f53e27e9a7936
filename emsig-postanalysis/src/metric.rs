//! Similarity metrics between an enrichment gene set and a signature set.
//!
//! Each [`Metric`] computes a value for a (reference, query) pair, decides
//! whether that value passes its cutoff, and knows which of two values is
//! the more similar. Values are only comparable between metrics of the same
//! [`MetricKind`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use emsig_core::{Annotated, EmsigError, Result};
use emsig_stats::hypergeom::hypergeometric_upper_tail;
use emsig_stats::testing::{mann_whitney_u, Alternative};
use serde::{Deserialize, Serialize};

use crate::model::{overlap_size, GeneId, Ranking};

// ── Metric kinds ────────────────────────────────────────────────────────────

/// The statistical test used to score signature/enrichment similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    NoFilter,
    Hypergeometric,
    MannWhitneyTwoSided,
    MannWhitneyGreater,
    MannWhitneyLess,
    /// Overlap of at least X genes.
    Number,
    /// Overlap of at least X percent of the signature set.
    Percent,
    /// Overlap of at least X percent of the enrichment set.
    Specific,
}

/// Which of two values of a kind is the more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Smaller,
    Larger,
    /// Values carry no ordering.
    Unordered,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::NoFilter,
        MetricKind::Hypergeometric,
        MetricKind::MannWhitneyTwoSided,
        MetricKind::MannWhitneyGreater,
        MetricKind::MannWhitneyLess,
        MetricKind::Number,
        MetricKind::Percent,
        MetricKind::Specific,
    ];

    /// Human-readable label for front ends.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::NoFilter => "-- no filter --",
            MetricKind::Hypergeometric => "Hypergeometric Test",
            MetricKind::MannWhitneyTwoSided => "Mann-Whitney (Two-sided)",
            MetricKind::MannWhitneyGreater => "Mann-Whitney (One-sided greater)",
            MetricKind::MannWhitneyLess => "Mann-Whitney (One-sided less)",
            MetricKind::Number => "Overlap X genes",
            MetricKind::Percent => "Overlap X percent of Signature gs",
            MetricKind::Specific => "Overlap X percent of EM gs",
        }
    }

    /// Cutoff used when the configuration does not provide one.
    pub fn default_cutoff(self) -> f64 {
        match self {
            MetricKind::NoFilter => 0.0,
            MetricKind::Hypergeometric => 0.25,
            MetricKind::MannWhitneyTwoSided
            | MetricKind::MannWhitneyGreater
            | MetricKind::MannWhitneyLess => 0.05,
            MetricKind::Number => 5.0,
            MetricKind::Percent | MetricKind::Specific => 25.0,
        }
    }

    pub fn is_mann_whitney(self) -> bool {
        self.alternative().is_some()
    }

    /// The rank-sum alternative for Mann-Whitney kinds.
    pub fn alternative(self) -> Option<Alternative> {
        match self {
            MetricKind::MannWhitneyTwoSided => Some(Alternative::TwoSided),
            MetricKind::MannWhitneyGreater => Some(Alternative::Greater),
            MetricKind::MannWhitneyLess => Some(Alternative::Less),
            _ => None,
        }
    }

    /// p-value kinds prefer smaller values; overlap kinds prefer larger.
    pub fn preference(self) -> Preference {
        match self {
            MetricKind::NoFilter => Preference::Unordered,
            MetricKind::Hypergeometric
            | MetricKind::MannWhitneyTwoSided
            | MetricKind::MannWhitneyGreater
            | MetricKind::MannWhitneyLess => Preference::Smaller,
            MetricKind::Number | MetricKind::Percent | MetricKind::Specific => Preference::Larger,
        }
    }

    pub fn is_valid_cutoff(self, cutoff: f64) -> bool {
        if cutoff.is_nan() {
            return false;
        }
        match self {
            MetricKind::NoFilter => true,
            MetricKind::Hypergeometric
            | MetricKind::MannWhitneyTwoSided
            | MetricKind::MannWhitneyGreater
            | MetricKind::MannWhitneyLess => (0.0..=1.0).contains(&cutoff),
            MetricKind::Number => cutoff >= 0.0 && cutoff.is_finite(),
            MetricKind::Percent | MetricKind::Specific => (0.0..=100.0).contains(&cutoff),
        }
    }

    /// Message shown when [`MetricKind::is_valid_cutoff`] fails.
    pub fn cutoff_error_message(self) -> &'static str {
        match self {
            MetricKind::NoFilter => "",
            MetricKind::Hypergeometric
            | MetricKind::MannWhitneyTwoSided
            | MetricKind::MannWhitneyGreater
            | MetricKind::MannWhitneyLess => "Value must be between 0.0 and 1.0",
            MetricKind::Number => "Value must be greater than or equal to 0",
            MetricKind::Percent | MetricKind::Specific => "Value must be between 0 and 100",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Metric instances ───────────────────────────────────────────────────────

/// Hypergeometric over-representation of the signature in the enrichment set.
#[derive(Debug, Clone)]
pub struct HypergeomMetric {
    pub cutoff: f64,
    pub universe_size: usize,
    /// When present, both sets are restricted to these genes first.
    pub universe_filter: Option<Arc<HashSet<GeneId>>>,
}

impl HypergeomMetric {
    fn compute(&self, reference: &HashSet<GeneId>, query: &HashSet<GeneId>) -> Result<f64> {
        let (ref_size, query_size, overlap) = match &self.universe_filter {
            Some(universe) => {
                let reference: HashSet<GeneId> = reference.intersection(universe).copied().collect();
                let query: HashSet<GeneId> = query.intersection(universe).copied().collect();
                (reference.len(), query.len(), overlap_size(&reference, &query))
            }
            None => (reference.len(), query.len(), overlap_size(reference, query)),
        };
        hypergeometric_upper_tail(overlap, query_size, ref_size, self.universe_size)
    }
}

/// Rank-sum test of the overlap genes' scores against the whole ranking.
#[derive(Debug, Clone)]
pub struct MannWhitneyMetric {
    pub cutoff: f64,
    pub alternative: Alternative,
    ranking: Arc<Ranking>,
    background: Arc<[f64]>,
}

impl MannWhitneyMetric {
    pub fn new(cutoff: f64, alternative: Alternative, ranking: Arc<Ranking>) -> Self {
        let background: Arc<[f64]> = ranking.scores().into();
        Self {
            cutoff,
            alternative,
            ranking,
            background,
        }
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    fn compute(&self, reference: &HashSet<GeneId>, query: &HashSet<GeneId>) -> Result<f64> {
        let sample: Vec<f64> = query
            .iter()
            .filter(|g| reference.contains(g))
            .filter_map(|&g| self.ranking.score(g))
            .collect();
        if sample.is_empty() {
            return Err(EmsigError::Arithmetic(format!(
                "no overlap genes are scored in ranking '{}'",
                self.ranking.name(),
            )));
        }
        Ok(mann_whitney_u(&sample, &self.background, self.alternative)?.p_value)
    }
}

/// One statistical test, configured for one dataset.
#[derive(Debug, Clone)]
pub enum Metric {
    NoFilter,
    Number { min_overlap: f64 },
    Percent { min_percent: f64 },
    Specific { min_percent: f64 },
    Hypergeometric(HypergeomMetric),
    MannWhitney(MannWhitneyMetric),
}

fn percent(part: usize, whole: usize, which: &str) -> Result<f64> {
    if whole == 0 {
        return Err(EmsigError::Arithmetic(format!(
            "percent overlap undefined for an empty {which} set"
        )));
    }
    Ok(part as f64 / whole as f64 * 100.0)
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::NoFilter => MetricKind::NoFilter,
            Metric::Number { .. } => MetricKind::Number,
            Metric::Percent { .. } => MetricKind::Percent,
            Metric::Specific { .. } => MetricKind::Specific,
            Metric::Hypergeometric(_) => MetricKind::Hypergeometric,
            Metric::MannWhitney(m) => match m.alternative {
                Alternative::TwoSided => MetricKind::MannWhitneyTwoSided,
                Alternative::Greater => MetricKind::MannWhitneyGreater,
                Alternative::Less => MetricKind::MannWhitneyLess,
            },
        }
    }

    /// The configured cutoff; NaN for [`Metric::NoFilter`].
    pub fn cutoff(&self) -> f64 {
        match self {
            Metric::NoFilter => f64::NAN,
            Metric::Number { min_overlap } => *min_overlap,
            Metric::Percent { min_percent } | Metric::Specific { min_percent } => *min_percent,
            Metric::Hypergeometric(m) => m.cutoff,
            Metric::MannWhitney(m) => m.cutoff,
        }
    }

    /// Score the query (signature) set against the reference (enrichment)
    /// set.
    ///
    /// Fails with [`EmsigError::Arithmetic`] when the statistic is undefined
    /// for these inputs; callers treat that as "no contribution".
    pub fn compute_value(&self, reference: &HashSet<GeneId>, query: &HashSet<GeneId>) -> Result<f64> {
        match self {
            Metric::NoFilter => Ok(f64::NAN),
            Metric::Number { .. } => Ok(overlap_size(reference, query) as f64),
            Metric::Percent { .. } => percent(overlap_size(reference, query), query.len(), "signature"),
            Metric::Specific { .. } => percent(overlap_size(reference, query), reference.len(), "enrichment"),
            Metric::Hypergeometric(m) => m.compute(reference, query),
            Metric::MannWhitney(m) => m.compute(reference, query),
        }
    }

    /// Whether `value` passes the cutoff. NaN never passes, except that
    /// [`Metric::NoFilter`] passes everything.
    pub fn passes(&self, value: f64) -> bool {
        match self.kind().preference() {
            Preference::Unordered => true,
            Preference::Smaller => value <= self.cutoff(),
            Preference::Larger => value >= self.cutoff(),
        }
    }

    /// The more similar of two values of this metric's kind. A defined value
    /// beats NaN.
    pub fn more_similar(&self, a: f64, b: f64) -> f64 {
        match self.kind().preference() {
            Preference::Unordered => a,
            // f64::min/max already return the non-NaN operand.
            Preference::Smaller => a.min(b),
            Preference::Larger => a.max(b),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
