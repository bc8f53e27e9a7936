//! Per-run mapping from dataset name to its configured [`Metric`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use emsig_core::{Annotated, EmsigError, Result};
use log::debug;

use crate::metric::{HypergeomMetric, MannWhitneyMetric, Metric, MetricKind};
use crate::model::{Dataset, EnrichmentMap, EnrichmentMapView, GeneId, Ranking};
use crate::params::PostAnalysisParams;

/// Inputs needed to instantiate one dataset's metric.
#[derive(Debug, Clone)]
pub struct DatasetMetricParams {
    pub dataset: String,
    pub cutoff: f64,
    pub universe_size: usize,
    pub universe_filter: Option<Arc<HashSet<GeneId>>>,
    pub ranking: Option<Arc<Ranking>>,
}

impl DatasetMetricParams {
    pub fn new(dataset: impl Into<String>, cutoff: f64) -> Self {
        Self {
            dataset: dataset.into(),
            cutoff,
            universe_size: 0,
            universe_filter: None,
            ranking: None,
        }
    }

    pub fn with_universe_size(mut self, universe_size: usize) -> Self {
        self.universe_size = universe_size;
        self
    }

    pub fn with_universe_filter(mut self, genes: Arc<HashSet<GeneId>>) -> Self {
        self.universe_filter = Some(genes);
        self
    }

    pub fn with_ranking(mut self, ranking: Arc<Ranking>) -> Self {
        self.ranking = Some(ranking);
        self
    }
}

impl Metric {
    /// Instantiate a metric of `kind` for one dataset.
    ///
    /// Fails with [`EmsigError::Configuration`] if the cutoff is invalid for
    /// the kind, or a rank-sum kind has no ranking.
    pub fn build(kind: MetricKind, params: &DatasetMetricParams) -> Result<Metric> {
        if !kind.is_valid_cutoff(params.cutoff) {
            return Err(EmsigError::Configuration(format!(
                "dataset '{}': invalid {} cutoff {}: {}",
                params.dataset,
                kind,
                params.cutoff,
                kind.cutoff_error_message(),
            )));
        }
        let metric = match kind {
            MetricKind::NoFilter => Metric::NoFilter,
            MetricKind::Number => Metric::Number {
                min_overlap: params.cutoff,
            },
            MetricKind::Percent => Metric::Percent {
                min_percent: params.cutoff,
            },
            MetricKind::Specific => Metric::Specific {
                min_percent: params.cutoff,
            },
            MetricKind::Hypergeometric => Metric::Hypergeometric(HypergeomMetric {
                cutoff: params.cutoff,
                universe_size: params.universe_size,
                universe_filter: params.universe_filter.clone(),
            }),
            MetricKind::MannWhitneyTwoSided
            | MetricKind::MannWhitneyGreater
            | MetricKind::MannWhitneyLess => {
                let ranking = params.ranking.clone().ok_or_else(|| {
                    EmsigError::Configuration(format!(
                        "dataset '{}': {} requires a ranking",
                        params.dataset, kind,
                    ))
                })?;
                let alternative = kind
                    .alternative()
                    .ok_or_else(|| EmsigError::Other(format!("{kind} has no rank-sum alternative")))?;
                Metric::MannWhitney(MannWhitneyMetric::new(params.cutoff, alternative, ranking))
            }
        };
        Ok(metric)
    }
}

/// One metric per dataset, all of the same [`MetricKind`].
#[derive(Debug, Clone)]
pub struct MetricSet {
    kind: MetricKind,
    metrics: BTreeMap<String, Metric>,
}

impl MetricSet {
    /// Build one metric of `kind` for every entry of `params`.
    ///
    /// Every metric shares `kind`, so values folded across datasets are
    /// always comparable.
    pub fn build(kind: MetricKind, params: impl IntoIterator<Item = DatasetMetricParams>) -> Result<Self> {
        let mut metrics = BTreeMap::new();
        for p in params {
            let metric = Metric::build(kind, &p)?;
            if metrics.insert(p.dataset.clone(), metric).is_some() {
                return Err(EmsigError::Configuration(format!(
                    "dataset '{}' configured more than once",
                    p.dataset,
                )));
            }
        }
        if metrics.is_empty() {
            return Err(EmsigError::Configuration(
                "no datasets selected for similarity computation".into(),
            ));
        }
        debug!("built {} metric set over {} datasets", kind, metrics.len());
        Ok(Self { kind, metrics })
    }

    /// Resolve `params` against `map` and build the metric set.
    ///
    /// The datasets in scope are the single configured dataset or all of
    /// them. Universe sizes come from the
    /// [`UniverseType`](crate::params::UniverseType); restriction, when asked
    /// for without an explicit filter, is to the dataset's GMT genes. Rank-sum kinds
    /// use the configured ranking, or the dataset's only ranking when none
    /// is named.
    pub fn from_params(params: &PostAnalysisParams, map: &EnrichmentMap) -> Result<Self> {
        params.validate()?;
        let kind = params.metric;

        let datasets: Vec<&Dataset> = match &params.dataset {
            Some(name) => vec![map.dataset(name).ok_or_else(|| {
                EmsigError::Configuration(format!("dataset '{name}' is not part of the enrichment map"))
            })?],
            None => map.datasets().collect(),
        };
        if kind.is_mann_whitney() && !map.has_rankings() {
            return Err(EmsigError::Configuration(format!("{kind} requires ranks")));
        }

        let explicit_filter: Option<Arc<HashSet<GeneId>>> = params
            .universe_filter
            .as_ref()
            .map(|genes| Arc::new(genes.iter().copied().collect()));

        let mut entries = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let name = dataset.name();
            let mut entry = DatasetMetricParams::new(name, params.cutoff_for(name))
                .with_universe_size(params.universe.size(dataset));

            if let Some(filter) = &explicit_filter {
                entry = entry.with_universe_filter(Arc::clone(filter));
            } else if params.restrict_to_universe {
                entry = entry.with_universe_filter(Arc::new(dataset.gmt_genes().clone()));
            }

            if kind.is_mann_whitney() {
                entry.ranking = Some(resolve_ranking(params, dataset)?);
            }
            entries.push(entry);
        }
        Self::build(kind, entries)
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn get(&self, dataset: &str) -> Option<&Metric> {
        self.metrics.get(dataset)
    }

    /// Dataset names in sorted order.
    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metric)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

fn resolve_ranking(params: &PostAnalysisParams, dataset: &Dataset) -> Result<Arc<Ranking>> {
    let name = dataset.name();
    if let Some(ranking_name) = params.rankings.get(name) {
        return dataset.ranking(ranking_name).cloned().ok_or_else(|| {
            EmsigError::Configuration(format!(
                "dataset '{name}' has no ranking named '{ranking_name}'"
            ))
        });
    }
    let mut available = dataset.ranking_names();
    match (available.next(), available.next()) {
        (Some(only), None) => dataset
            .ranking(only)
            .cloned()
            .ok_or_else(|| EmsigError::Configuration(format!("dataset '{name}' lost ranking '{only}'"))),
        (None, _) => Err(EmsigError::Configuration(format!(
            "dataset '{name}': {} requires a ranking but the dataset has none",
            params.metric,
        ))),
        (Some(_), Some(_)) => Err(EmsigError::Configuration(format!(
            "dataset '{name}' has several rankings; select one for {}",
            params.metric,
        ))),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
