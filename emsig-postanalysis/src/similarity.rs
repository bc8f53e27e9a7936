//! Most-similar enrichment gene set search for signature gene sets.
//!
//! For every signature set, [`MostSimilarTask`] compares the signature
//! against each gene set of interest in each dataset of its [`MetricSet`],
//! and folds the per-dataset values into a [`SigGeneSetDescriptor`].
//! Signature sets are independent units of work spread over a rayon scope.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use emsig_core::{Annotated, Scored, Summarizable};
use log::{info, trace, warn};
use serde::Serialize;

use crate::metric::{Metric, MetricKind};
use crate::metric_set::MetricSet;
use crate::model::{EnrichmentMapView, GeneSet};
use crate::parallel::{start_parallel, submit_units, CancellationToken, ParallelHandle, ProgressRange};
use crate::progress::ProgressSink;

/// Summary of one signature set's best match across the enrichment map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SigGeneSetDescriptor {
    pub name: String,
    pub signature_size: usize,
    /// Largest overlap with any gene set of interest, regardless of metric.
    pub largest_overlap: usize,
    /// Most similar metric value; NaN if no comparison produced a value.
    pub most_similar: f64,
    /// Whether any single comparison passed its dataset's cutoff.
    pub passes: bool,
}

impl SigGeneSetDescriptor {
    /// Whether at least one comparison produced a value.
    pub fn is_defined(&self) -> bool {
        !self.most_similar.is_nan()
    }
}

impl Scored for SigGeneSetDescriptor {
    fn score(&self) -> f64 {
        self.most_similar
    }
}

impl Annotated for SigGeneSetDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Summarizable for SigGeneSetDescriptor {
    fn summary(&self) -> String {
        format!(
            "{} ({} genes): overlap {}, value {}, {}",
            self.name,
            self.signature_size,
            self.largest_overlap,
            self.most_similar,
            if self.passes { "passes" } else { "fails" },
        )
    }
}

/// Outcome of a finished similarity run.
#[derive(Debug, Clone, Serialize)]
pub struct PostAnalysisResults {
    pub kind: MetricKind,
    /// One descriptor per completed unit, in completion order.
    pub descriptors: Vec<SigGeneSetDescriptor>,
    pub submitted: usize,
    cancelled: bool,
}

impl PostAnalysisResults {
    /// Names of the signature sets that pass.
    pub fn passing_names(&self) -> Vec<&str> {
        self.passing().map(|d| d.name.as_str()).collect()
    }

    pub fn passing(&self) -> impl Iterator<Item = &SigGeneSetDescriptor> {
        self.descriptors.iter().filter(|d| d.passes)
    }

    pub fn get(&self, name: &str) -> Option<&SigGeneSetDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Whether cancellation interrupted at least one unit, whose descriptor
    /// is then missing. A token cancelled after every unit finished does not
    /// count.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Display for PostAnalysisResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} of {} signature sets pass",
            self.kind,
            self.passing().count(),
            self.descriptors.len(),
        )?;
        for d in &self.descriptors {
            writeln!(f, "  {}", d.summary())?;
        }
        Ok(())
    }
}

/// Finds, for each signature set, the most similar gene set of interest.
pub struct MostSimilarTask<'a> {
    map: &'a dyn EnrichmentMapView,
    signatures: Vec<GeneSet>,
    metrics: MetricSet,
    cancel: CancellationToken,
    range: ProgressRange,
}

impl<'a> MostSimilarTask<'a> {
    pub fn new(map: &'a dyn EnrichmentMapView, signatures: Vec<GeneSet>, metrics: MetricSet) -> Self {
        Self {
            map,
            signatures,
            metrics,
            cancel: CancellationToken::new(),
            range: ProgressRange::default(),
        }
    }

    /// Use an externally owned token, e.g. one wired to a UI cancel button.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report progress into `range` of the outer scale.
    pub fn with_progress_range(mut self, range: ProgressRange) -> Self {
        self.range = range;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub fn signatures(&self) -> &[GeneSet] {
        &self.signatures
    }

    /// Submit one unit per signature set to `scope` and return at once.
    ///
    /// Results are complete only after `scope` has ended.
    pub fn compute<'scope>(
        &'scope self,
        scope: &rayon::Scope<'scope>,
        progress: Arc<dyn ProgressSink>,
    ) -> ParallelHandle<SigGeneSetDescriptor> {
        progress.set_title("Computing most similar gene sets");
        info!(
            "comparing {} signature sets against {} datasets ({})",
            self.signatures.len(),
            self.metrics.len(),
            self.metrics.kind(),
        );

        let names: Arc<BTreeSet<String>> = Arc::new(self.map.gene_set_of_interest_names());
        let mut handle = start_parallel(progress, self.signatures.len(), self.range);
        let sink = handle.sink().clone();
        let mapper = Arc::clone(handle.progress());

        let submitted = submit_units(scope, self.signatures.iter(), move |signature: &GeneSet| {
            if let Some(descriptor) = self.compare(signature, &names) {
                sink.push(descriptor);
            }
            mapper.inc();
        });
        handle.set_submitted(submitted);
        handle
    }

    /// Run every unit on `pool` and wait for them.
    pub fn run(&self, pool: &rayon::ThreadPool, progress: Arc<dyn ProgressSink>) -> PostAnalysisResults {
        let handle = pool.scope(|s| self.compute(s, progress));
        let submitted = handle.submitted();
        let descriptors = handle.into_results();
        let cancelled = descriptors.len() < submitted;
        if cancelled {
            warn!(
                "similarity computation cancelled after {} of {} signature sets",
                descriptors.len(),
                submitted,
            );
        } else {
            info!("similarity computation finished for {} signature sets", descriptors.len());
        }
        PostAnalysisResults {
            kind: self.metrics.kind(),
            descriptors,
            submitted,
            cancelled,
        }
    }

    /// Fold every comparison of `signature` into a descriptor; `None` once
    /// cancelled.
    fn compare(&self, signature: &GeneSet, names: &BTreeSet<String>) -> Option<SigGeneSetDescriptor> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let mut largest_overlap = 0;
        let mut most_similar: Option<f64> = None;
        let mut passes = false;

        for name in names {
            for (dataset, metric) in self.metrics.iter() {
                if self.cancel.is_cancelled() {
                    return None;
                }
                let Some(gene_set) = self.map.gene_set(dataset, name) else {
                    continue;
                };
                largest_overlap = largest_overlap.max(gene_set.overlap(signature));

                match metric.compute_value(gene_set.genes(), signature.genes()) {
                    Ok(value) => {
                        most_similar = Some(fold(metric, most_similar, value));
                        passes |= metric.passes(value);
                    }
                    Err(e) if e.is_arithmetic() => {
                        trace!("{} vs {}/{}: {}", signature.name(), dataset, name, e);
                    }
                    Err(e) => {
                        warn!("{} vs {}/{}: {}", signature.name(), dataset, name, e);
                    }
                }
            }
        }

        Some(SigGeneSetDescriptor {
            name: signature.name().to_string(),
            signature_size: signature.len(),
            largest_overlap,
            most_similar: most_similar.unwrap_or(f64::NAN),
            passes,
        })
    }
}

fn fold(metric: &Metric, best: Option<f64>, value: f64) -> f64 {
    match best {
        None => value,
        Some(best) => metric.more_similar(best, value),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
