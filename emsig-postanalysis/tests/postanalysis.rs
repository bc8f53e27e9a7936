//! End-to-end runs: JSON parameters → metric set → parallel similarity search.

use std::sync::{Arc, Mutex};

use emsig_postanalysis::{
    CancellationToken, Dataset, EmsigError, EnrichmentMap, GeneSet, MetricKind, MetricSet, MostSimilarTask,
    NullProgress, PostAnalysisParams, ProgressRange, ProgressSink, Ranking,
};
use emsig_stats::testing::{mann_whitney_u, Alternative};
use statrs::distribution::{DiscreteCDF, Hypergeometric};

fn init_logging() {
    env_logger::builder().is_test(true).try_init().ok();
}

fn pool(threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap()
}

/// One dataset, GS1 = {1..5} plus a few unrelated sets, 1000 GMT genes.
fn enrichment_map() -> EnrichmentMap {
    let ranking = Ranking::from_scores("ranks", (1..=20u32).map(|g| (g, g as f64)));
    EnrichmentMap::new("EM").with_dataset(
        Dataset::new("DS1")
            .with_gene_set(GeneSet::new("GS1", [1, 2, 3, 4, 5]))
            .with_gene_set(GeneSet::new("GS2", [16, 17, 18, 19, 20]))
            .with_gene_set(GeneSet::new("GS3", [500, 501]))
            .with_gmt_genes(1..=1000)
            .with_ranking(ranking),
    )
}

fn signatures() -> Vec<GeneSet> {
    vec![
        GeneSet::new("SIG", [1, 2, 3, 99]),
        GeneSet::new("HIGH", [18, 19, 20, 700]),
        GeneSet::new("NONE", [900, 901]),
    ]
}

fn run_json(json: &str) -> emsig_postanalysis::PostAnalysisResults {
    let map = enrichment_map();
    let params = PostAnalysisParams::from_json_str(json).unwrap();
    let selected = params.select_signatures(&signatures()).unwrap();
    let metrics = MetricSet::from_params(&params, &map).unwrap();
    MostSimilarTask::new(&map, selected, metrics).run(&pool(4), Arc::new(NullProgress))
}

#[test]
fn number_cutoff_two() {
    init_logging();
    let results = run_json(r#"{"metric": "number", "cutoff": 2, "selected_signatures": ["SIG"]}"#);
    let d = results.get("SIG").unwrap();
    assert_eq!(d.largest_overlap, 3);
    assert!(d.passes);
}

#[test]
fn percent_cutoff_eighty() {
    init_logging();
    let results = run_json(r#"{"metric": "percent", "cutoff": 80, "selected_signatures": ["SIG"]}"#);
    let d = results.get("SIG").unwrap();
    assert_eq!(d.largest_overlap, 3);
    assert!((d.most_similar - 75.0).abs() < 1e-12);
    assert!(!d.passes);
}

/// DS1 and DS2 each hold GS1 = {1..5}.
fn two_dataset_map() -> EnrichmentMap {
    EnrichmentMap::new("EM")
        .with_dataset(Dataset::new("DS1").with_gene_set(GeneSet::new("GS1", [1, 2, 3, 4, 5])))
        .with_dataset(Dataset::new("DS2").with_gene_set(GeneSet::new("GS1", [1, 2, 3, 4, 5])))
}

fn run_two_datasets(json: &str) -> (MetricSet, emsig_postanalysis::PostAnalysisResults) {
    let map = two_dataset_map();
    let params = PostAnalysisParams::from_json_str(json).unwrap();
    let signature = GeneSet::new("SIG1", [3, 4, 5, 6]);
    let metrics = MetricSet::from_params(&params, &map).unwrap();
    let results = MostSimilarTask::new(&map, vec![signature], metrics.clone()).run(&pool(2), Arc::new(NullProgress));
    (metrics, results)
}

#[test]
fn number_cutoff_two_across_datasets() {
    init_logging();
    let (metrics, results) = run_two_datasets(r#"{"metric": "number", "cutoff": 2, "selected_signatures": ["SIG1"]}"#);
    assert_eq!(metrics.len(), 2);
    let gs1 = GeneSet::new("GS1", [1, 2, 3, 4, 5]);
    let sig1 = GeneSet::new("SIG1", [3, 4, 5, 6]);
    for ds in ["DS1", "DS2"] {
        let metric = metrics.get(ds).unwrap();
        let value = metric.compute_value(gs1.genes(), sig1.genes()).unwrap();
        assert_eq!(value, 3.0, "{ds}");
        assert!(metric.passes(value), "{ds}");
    }
    let d = results.get("SIG1").unwrap();
    assert_eq!(d.largest_overlap, 3);
    assert_eq!(d.most_similar, 3.0);
    assert!(d.passes);
}

#[test]
fn percent_cutoff_eighty_across_datasets() {
    init_logging();
    let (metrics, results) = run_two_datasets(r#"{"metric": "percent", "cutoff": 80, "selected_signatures": ["SIG1"]}"#);
    let gs1 = GeneSet::new("GS1", [1, 2, 3, 4, 5]);
    let sig1 = GeneSet::new("SIG1", [3, 4, 5, 6]);
    for ds in ["DS1", "DS2"] {
        let metric = metrics.get(ds).unwrap();
        let value = metric.compute_value(gs1.genes(), sig1.genes()).unwrap();
        assert!((value - 75.0).abs() < 1e-12, "{ds}");
        assert!(!metric.passes(value), "{ds}");
    }
    let d = results.get("SIG1").unwrap();
    assert_eq!(d.largest_overlap, 3);
    assert!((d.most_similar - 75.0).abs() < 1e-12);
    assert!(!d.passes);
    assert!(results.passing_names().is_empty());
}

#[test]
fn hypergeometric_agrees_with_statrs() {
    init_logging();
    let results = run_json(r#"{"metric": "hypergeometric", "selected_signatures": ["SIG", "NONE"]}"#);
    let d = results.get("SIG").unwrap();

    let reference = Hypergeometric::new(1000, 5, 4).unwrap();
    let expected = reference.sf(2);
    assert!((d.most_similar - expected).abs() < 1e-9, "ours={} statrs={expected}", d.most_similar);
    assert!((d.most_similar - 9955.0 / 41_417_124_750.0).abs() < 1e-9);
    assert!(d.passes);

    let none = results.get("NONE").unwrap();
    assert_eq!(none.largest_overlap, 0);
    assert_eq!(none.most_similar, 1.0);
    assert!(!none.passes);
    assert_eq!(results.passing_names(), vec!["SIG"]);
}

#[test]
fn mann_whitney_uses_dataset_ranking() {
    init_logging();
    let results = run_json(
        r#"{"metric": "mann_whitney_greater", "cutoff": 0.05, "rankings": {"DS1": "ranks"},
            "selected_signatures": ["HIGH", "NONE"]}"#,
    );
    let background: Vec<f64> = (1..=20u32).map(|g| g as f64).collect();
    let expected = mann_whitney_u(&[18.0, 19.0, 20.0], &background, Alternative::Greater)
        .unwrap()
        .p_value;
    let high = results.get("HIGH").unwrap();
    assert!((high.most_similar - expected).abs() < 1e-12);
    assert_eq!(high.largest_overlap, 3);

    // no scored overlap genes anywhere: every comparison is undefined
    let none = results.get("NONE").unwrap();
    assert!(none.most_similar.is_nan());
    assert!(!none.passes);
}

#[test]
fn missing_ranking_is_configuration_error() {
    let map = enrichment_map();
    let params = PostAnalysisParams::from_json_str(
        r#"{"metric": "mann_whitney_two_sided", "rankings": {"DS1": "other"}, "selected_signatures": ["SIG"]}"#,
    )
    .unwrap();
    match MetricSet::from_params(&params, &map) {
        Err(EmsigError::Configuration(msg)) => {
            assert!(msg.contains("DS1"));
            assert!(msg.contains("other"));
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn nothing_selected_is_rejected_before_work() {
    let map = enrichment_map();
    let params = PostAnalysisParams::from_json_str(r#"{"metric": "number"}"#).unwrap();
    let err = MetricSet::from_params(&params, &map).unwrap_err();
    assert!(err.to_string().contains("No signature gene sets selected"));
}

#[test]
fn gene_symbols_are_interned_case_insensitively() {
    let mut map = EnrichmentMap::new("EM");
    let gs = map.interner_mut().gene_set("GS1", ["TP53", "BRCA1", "EGFR"]);
    let sig = map.interner_mut().gene_set("SIG", ["tp53", "Brca1", "MYC"]);
    map.add_dataset(Dataset::new("DS1").with_gene_set(gs));

    let metrics = MetricSet::from_params(
        &PostAnalysisParams {
            metric: MetricKind::Number,
            cutoff: Some(2.0),
            selected_signatures: vec!["SIG".into()],
            ..PostAnalysisParams::default()
        },
        &map,
    )
    .unwrap();
    let results = MostSimilarTask::new(&map, vec![sig], metrics).run(&pool(1), Arc::new(NullProgress));
    assert_eq!(results.get("SIG").unwrap().largest_overlap, 2);
    assert!(results.get("SIG").unwrap().passes);
}

/// Records progress and cancels the run after the first completed unit.
struct CancelAfterFirst {
    token: CancellationToken,
    progress: Mutex<Vec<f64>>,
}

impl ProgressSink for CancelAfterFirst {
    fn set_progress(&self, progress: f64) {
        self.progress.lock().unwrap().push(progress);
        self.token.cancel();
    }

    fn set_status(&self, _message: &str) {}
}

#[test]
fn cancellation_keeps_only_uninterrupted_units() {
    init_logging();
    let map = enrichment_map();
    let token = CancellationToken::new();
    let sink = Arc::new(CancelAfterFirst {
        token: token.clone(),
        progress: Mutex::new(Vec::new()),
    });
    let metrics = MetricSet::from_params(
        &PostAnalysisParams {
            metric: MetricKind::Number,
            selected_signatures: vec!["SIG".into()],
            ..PostAnalysisParams::default()
        },
        &map,
    )
    .unwrap();

    // one worker thread: units run one after another
    let task = MostSimilarTask::new(&map, signatures(), metrics).with_cancellation(token);
    let results = task.run(&pool(1), sink.clone());

    assert!(results.was_cancelled());
    assert_eq!(results.submitted, 3);
    assert_eq!(results.len(), 1);
    // every unit still reports completion
    assert_eq!(sink.progress.lock().unwrap().len(), 3);
}

#[test]
fn progress_lands_in_configured_range() {
    let map = enrichment_map();
    let recorder = Arc::new(CancelAfterFirst {
        token: CancellationToken::new(),
        progress: Mutex::new(Vec::new()),
    });
    let metrics = MetricSet::from_params(
        &PostAnalysisParams {
            metric: MetricKind::Specific,
            selected_signatures: vec!["SIG".into()],
            ..PostAnalysisParams::default()
        },
        &map,
    )
    .unwrap();
    let results = MostSimilarTask::new(&map, signatures(), metrics)
        .with_progress_range(ProgressRange::new(0.5, 0.9))
        .run(&pool(2), recorder.clone());

    // the recorder's token is private to it, the task's is not cancelled
    assert!(!results.was_cancelled());
    assert_eq!(results.len(), 3);
    let progress = recorder.progress.lock().unwrap();
    assert!(progress.iter().all(|p| (0.5..=0.9 + 1e-12).contains(p)));
    assert!(progress.iter().any(|p| (p - 0.9).abs() < 1e-12));
}

#[test]
fn results_serialize_to_json() {
    let results = run_json(r#"{"metric": "number", "cutoff": 2, "selected_signatures": ["SIG", "NONE"]}"#);
    let json = serde_json::to_value(&results).unwrap();
    assert_eq!(json["kind"], "number");
    assert_eq!(json["descriptors"].as_array().unwrap().len(), 2);
}
