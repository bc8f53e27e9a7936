//! Run configuration collected by a front end.
//!
//! [`PostAnalysisParams`] is plain serde data, loaded from JSON. Omitted
//! fields fall back to [`PostAnalysisParams::default`].
//!
//! ```
//! use emsig_postanalysis::params::{PostAnalysisParams, UniverseType};
//! use emsig_postanalysis::MetricKind;
//!
//! let params = PostAnalysisParams::from_json_str(r#"{
//!     "metric": "mann_whitney_greater",
//!     "cutoff": 0.01,
//!     "universe": { "user_defined": 20000 },
//!     "rankings": { "DS1": "ranks" },
//!     "selected_signatures": ["SIG1"]
//! }"#).unwrap();
//! assert_eq!(params.metric, MetricKind::MannWhitneyGreater);
//! assert_eq!(params.universe, UniverseType::UserDefined(20000));
//! assert_eq!(params.cutoff_for("DS1"), 0.01);
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use emsig_core::{Annotated, EmsigError, Result};
use serde::{Deserialize, Serialize};

use crate::metric::MetricKind;
use crate::model::{Dataset, GeneId, GeneSet};

/// Source of the hypergeometric universe size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseType {
    /// Every gene of the dataset's GMT file.
    #[default]
    Gmt,
    /// Every gene of the dataset's expression file.
    ExpressionSet,
    /// Genes present in both the GMT and the expression file.
    Intersection,
    /// A fixed size chosen by the user.
    UserDefined(usize),
}

impl UniverseType {
    /// Universe size for `dataset`.
    pub fn size(&self, dataset: &Dataset) -> usize {
        match self {
            UniverseType::Gmt => dataset.gmt_genes().len(),
            UniverseType::ExpressionSet => dataset.expression_genes().len(),
            UniverseType::Intersection => dataset.intersection_genes().len(),
            UniverseType::UserDefined(n) => *n,
        }
    }
}

/// Everything a similarity run needs besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostAnalysisParams {
    pub metric: MetricKind,
    /// Cutoff for every dataset; the kind's default when absent.
    pub cutoff: Option<f64>,
    /// Per-dataset cutoff overrides.
    pub dataset_cutoffs: BTreeMap<String, f64>,
    pub universe: UniverseType,
    /// Explicit universe genes; both sets are restricted to them before the
    /// hypergeometric test.
    pub universe_filter: Option<Vec<GeneId>>,
    /// Restrict both sets to the dataset's gene-set (GMT) genes when no
    /// explicit filter is given. The universe size still comes from `universe`.
    pub restrict_to_universe: bool,
    /// Dataset name to ranking name, for rank-sum tests.
    pub rankings: BTreeMap<String, String>,
    /// Compare against this dataset only.
    pub dataset: Option<String>,
    /// Names of the signature sets to analyse.
    pub selected_signatures: Vec<String>,
}

impl Default for PostAnalysisParams {
    fn default() -> Self {
        Self {
            metric: MetricKind::Hypergeometric,
            cutoff: None,
            dataset_cutoffs: BTreeMap::new(),
            universe: UniverseType::default(),
            universe_filter: None,
            restrict_to_universe: false,
            rankings: BTreeMap::new(),
            dataset: None,
            selected_signatures: Vec::new(),
        }
    }
}

impl PostAnalysisParams {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EmsigError::Parse(format!("post-analysis parameters: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EmsigError::Parse(e.to_string()))
    }

    /// Effective cutoff for `dataset`.
    pub fn cutoff_for(&self, dataset: &str) -> f64 {
        self.dataset_cutoffs
            .get(dataset)
            .copied()
            .or(self.cutoff)
            .unwrap_or_else(|| self.metric.default_cutoff())
    }

    /// Check the minimal requirements before any work is submitted.
    ///
    /// Reports every problem found, one per line.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.selected_signatures.is_empty() {
            errors.push("No signature gene sets selected".to_string());
        }
        let cutoffs = self
            .cutoff
            .iter()
            .map(|c| ("all datasets", *c))
            .chain(self.dataset_cutoffs.iter().map(|(d, c)| (d.as_str(), *c)));
        for (scope, cutoff) in cutoffs {
            if !self.metric.is_valid_cutoff(cutoff) {
                errors.push(format!(
                    "{} cutoff {} for {}: {}",
                    self.metric,
                    cutoff,
                    scope,
                    self.metric.cutoff_error_message(),
                ));
            }
        }
        if let UniverseType::UserDefined(0) = self.universe {
            if self.metric == MetricKind::Hypergeometric {
                errors.push("User-defined universe size must be > 0".to_string());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(EmsigError::Configuration(errors.join("\n")))
        }
    }

    /// The selected signature sets, in selection order.
    ///
    /// A selected name missing from `candidates` is a configuration error.
    pub fn select_signatures(&self, candidates: &[GeneSet]) -> Result<Vec<GeneSet>> {
        self.selected_signatures
            .iter()
            .map(|name| {
                candidates
                    .iter()
                    .find(|gs| gs.name() == name.as_str())
                    .cloned()
                    .ok_or_else(|| EmsigError::Configuration(format!("signature gene set '{name}' not loaded")))
            })
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_json() {
        let params = PostAnalysisParams::from_json_str("{}").unwrap();
        assert_eq!(params, PostAnalysisParams::default());
        assert_eq!(params.cutoff_for("any"), 0.25);
    }

    #[test]
    fn dataset_cutoff_overrides_global() {
        let params = PostAnalysisParams::from_json_str(
            r#"{"metric": "number", "cutoff": 3, "dataset_cutoffs": {"DS2": 7}}"#,
        )
        .unwrap();
        assert_eq!(params.cutoff_for("DS1"), 3.0);
        assert_eq!(params.cutoff_for("DS2"), 7.0);
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = PostAnalysisParams::from_json_str(r#"{"metric": "t_test"}"#).unwrap_err();
        assert!(matches!(err, EmsigError::Parse(_)));
    }

    #[test]
    fn json_round_trip() {
        let mut params = PostAnalysisParams {
            metric: MetricKind::Percent,
            cutoff: Some(80.0),
            universe: UniverseType::UserDefined(1000),
            selected_signatures: vec!["SIG1".into()],
            ..PostAnalysisParams::default()
        };
        params.rankings.insert("DS1".into(), "ranks".into());
        let json = params.to_json_string().unwrap();
        assert_eq!(PostAnalysisParams::from_json_str(&json).unwrap(), params);
    }

    #[test]
    fn validate_reports_every_problem() {
        let params = PostAnalysisParams {
            metric: MetricKind::Hypergeometric,
            cutoff: Some(3.0),
            universe: UniverseType::UserDefined(0),
            ..PostAnalysisParams::default()
        };
        let msg = params.validate().unwrap_err().to_string();
        assert!(msg.contains("No signature gene sets selected"));
        assert!(msg.contains("between 0.0 and 1.0"));
        assert!(msg.contains("universe size"));
    }

    #[test]
    fn validate_accepts_minimal_params() {
        let params = PostAnalysisParams {
            selected_signatures: vec!["SIG1".into()],
            ..PostAnalysisParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn select_signatures_by_name() {
        let candidates = vec![GeneSet::new("A", [1]), GeneSet::new("B", [2]), GeneSet::new("C", [3])];
        let params = PostAnalysisParams {
            selected_signatures: vec!["C".into(), "A".into()],
            ..PostAnalysisParams::default()
        };
        let picked = params.select_signatures(&candidates).unwrap();
        assert_eq!(picked.iter().map(|g| g.name()).collect::<Vec<_>>(), vec!["C", "A"]);

        let missing = PostAnalysisParams {
            selected_signatures: vec!["Z".into()],
            ..PostAnalysisParams::default()
        };
        assert!(missing.select_signatures(&candidates).is_err());
    }

    #[test]
    fn universe_sizes() {
        let ds = Dataset::new("DS")
            .with_gene_set(GeneSet::new("GS", [1, 2, 3]))
            .with_expression_genes([3, 4]);
        assert_eq!(UniverseType::Gmt.size(&ds), 3);
        assert_eq!(UniverseType::ExpressionSet.size(&ds), 2);
        assert_eq!(UniverseType::Intersection.size(&ds), 1);
        assert_eq!(UniverseType::UserDefined(42).size(&ds), 42);
    }
}
