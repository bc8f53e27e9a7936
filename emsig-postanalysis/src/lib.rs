//! Signature gene-set post-analysis for enrichment maps.
//!
//! Given a set of signature gene sets and an enrichment map, finds for each
//! signature the most similar enrichment gene set under a chosen metric and
//! reports whether any comparison passes the configured cutoff.
//!
//! - **Model** — [`GeneSet`], [`Dataset`], [`EnrichmentMap`] and the
//!   read-only [`EnrichmentMapView`]
//! - **Metrics** — [`Metric`] and per-dataset [`MetricSet`]
//! - **Configuration** — [`PostAnalysisParams`] loaded from JSON
//! - **Orchestration** — [`MostSimilarTask`] over a caller-owned rayon scope
//! - **Progress** — nestable [`ProgressMapper`]
//!
//! ```
//! use std::sync::Arc;
//! use emsig_postanalysis::{
//!     Dataset, EnrichmentMap, GeneSet, MetricSet, MostSimilarTask, NullProgress, PostAnalysisParams,
//! };
//!
//! let map = EnrichmentMap::new("EM")
//!     .with_dataset(Dataset::new("DS1").with_gene_set(GeneSet::new("GS1", [1, 2, 3, 4, 5])));
//! let params = PostAnalysisParams::from_json_str(
//!     r#"{ "metric": "number", "cutoff": 2, "selected_signatures": ["SIG"] }"#,
//! ).unwrap();
//! let signatures = params.select_signatures(&[GeneSet::new("SIG", [1, 2, 3, 99])]).unwrap();
//! let metrics = MetricSet::from_params(&params, &map).unwrap();
//!
//! let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
//! let results = MostSimilarTask::new(&map, signatures, metrics).run(&pool, Arc::new(NullProgress));
//! assert_eq!(results.passing_names(), vec!["SIG"]);
//! ```

pub mod metric;
pub mod metric_set;
pub mod model;
pub mod parallel;
pub mod params;
pub mod progress;
pub mod similarity;

pub use emsig_core::{Annotated, EmsigError, Result, Scored, Summarizable};
pub use metric::{Metric, MetricKind, Preference};
pub use metric_set::{DatasetMetricParams, MetricSet};
pub use model::{Dataset, EnrichmentMap, EnrichmentMapView, GeneId, GeneInterner, GeneSet, Rank, Ranking};
pub use parallel::{start_parallel, submit_units, CancellationToken, ParallelHandle, ProgressRange, ResultSink};
pub use params::{PostAnalysisParams, UniverseType};
pub use progress::{LogProgress, NullProgress, ProgressMapper, ProgressSink};
pub use similarity::{MostSimilarTask, PostAnalysisResults, SigGeneSetDescriptor};
