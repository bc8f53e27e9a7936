//! Read-only enrichment-map data consumed by the similarity engine.
//!
//! Gene symbols are interned to [`GeneId`] integers once, so every gene-set
//! comparison is a set operation on `u32` keys. The engine only needs the
//! [`EnrichmentMapView`] trait; [`EnrichmentMap`] is the in-memory
//! implementation used by front ends and tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use emsig_core::{Annotated, Summarizable};
use emsig_stats::rank::rank_descending;
use serde::{Deserialize, Serialize};

/// Interned gene identifier.
pub type GeneId = u32;

// ── Gene sets ───────────────────────────────────────────────────────────────

/// A named set of gene identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneSet {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    genes: HashSet<GeneId>,
}

impl GeneSet {
    /// Create a gene set; duplicate ids collapse.
    pub fn new(name: impl Into<String>, genes: impl IntoIterator<Item = GeneId>) -> Self {
        Self {
            name: name.into(),
            description: None,
            genes: genes.into_iter().collect(),
        }
    }

    /// Attach a description (e.g. the GMT description column).
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn genes(&self) -> &HashSet<GeneId> {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn contains(&self, gene: GeneId) -> bool {
        self.genes.contains(&gene)
    }

    /// Size of the intersection with `other`.
    pub fn overlap(&self, other: &GeneSet) -> usize {
        overlap_size(&self.genes, &other.genes)
    }
}

impl Annotated for GeneSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Summarizable for GeneSet {
    fn summary(&self) -> String {
        format!("GeneSet {}: {} genes", self.name, self.genes.len())
    }
}

/// Size of the intersection of two gene-id sets.
///
/// Iterates the smaller set and probes the larger one.
pub fn overlap_size(a: &HashSet<GeneId>, b: &HashSet<GeneId>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|g| large.contains(g)).count()
}

// ── Gene interning ─────────────────────────────────────────────────────────

/// Bidirectional mapping between gene symbols and [`GeneId`]s.
///
/// Symbols are case-insensitive and stored upper-cased.
#[derive(Debug, Clone, Default)]
pub struct GeneInterner {
    by_symbol: HashMap<String, GeneId>,
    symbols: Vec<String>,
}

impl GeneInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `symbol`, assigning the next free id on first use.
    pub fn intern(&mut self, symbol: &str) -> GeneId {
        let key = symbol.trim().to_uppercase();
        if let Some(&id) = self.by_symbol.get(&key) {
            return id;
        }
        let id = self.symbols.len() as GeneId;
        self.symbols.push(key.clone());
        self.by_symbol.insert(key, id);
        id
    }

    /// Intern every symbol and build a gene set from them.
    pub fn gene_set<'s>(
        &mut self,
        name: impl Into<String>,
        symbols: impl IntoIterator<Item = &'s str>,
    ) -> GeneSet {
        let genes: Vec<GeneId> = symbols.into_iter().map(|s| self.intern(s)).collect();
        GeneSet::new(name, genes)
    }

    pub fn get(&self, symbol: &str) -> Option<GeneId> {
        self.by_symbol.get(&symbol.trim().to_uppercase()).copied()
    }

    pub fn symbol(&self, id: GeneId) -> Option<&str> {
        self.symbols.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ── Rankings ───────────────────────────────────────────────────────────────

/// Score of one gene in a ranking, with its position when the ranking is
/// ordered (1 = highest score).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rank {
    pub score: f64,
    pub position: Option<usize>,
}

/// Gene scores from one rank file of a dataset.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    name: String,
    ranks: HashMap<GeneId, Rank>,
}

impl Ranking {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ranks: HashMap::new(),
        }
    }

    /// Build an ordered ranking; positions follow descending score, ties in
    /// input order.
    pub fn from_scores(name: impl Into<String>, scores: impl IntoIterator<Item = (GeneId, f64)>) -> Self {
        let (genes, values): (Vec<GeneId>, Vec<f64>) = scores.into_iter().unzip();
        let positions = rank_descending(&values);
        let ranks = genes
            .into_iter()
            .zip(values)
            .zip(positions)
            .map(|((gene, score), position)| {
                (
                    gene,
                    Rank {
                        score,
                        position: Some(position),
                    },
                )
            })
            .collect();
        Self {
            name: name.into(),
            ranks,
        }
    }

    /// Insert or replace the rank of `gene`.
    pub fn insert(&mut self, gene: GeneId, rank: Rank) {
        self.ranks.insert(gene, rank);
    }

    pub fn get(&self, gene: GeneId) -> Option<&Rank> {
        self.ranks.get(&gene)
    }

    pub fn score(&self, gene: GeneId) -> Option<f64> {
        self.ranks.get(&gene).map(|r| r.score)
    }

    /// Every score in the ranking, in no particular order.
    pub fn scores(&self) -> Vec<f64> {
        self.ranks.values().map(|r| r.score).collect()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl Annotated for Ranking {
    fn name(&self) -> &str {
        &self.name
    }
}

// ── Datasets ───────────────────────────────────────────────────────────────

/// One dataset of an enrichment map.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    name: String,
    gene_sets_of_interest: BTreeMap<String, GeneSet>,
    gmt_genes: HashSet<GeneId>,
    expression_genes: HashSet<GeneId>,
    rankings: BTreeMap<String, Arc<Ranking>>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a gene set that passed the enrichment thresholds. Its genes join
    /// the dataset's GMT universe.
    pub fn add_gene_set_of_interest(&mut self, gene_set: GeneSet) {
        self.gmt_genes.extend(gene_set.genes().iter().copied());
        self.gene_sets_of_interest.insert(gene_set.name().to_string(), gene_set);
    }

    /// Builder form of [`Dataset::add_gene_set_of_interest`].
    pub fn with_gene_set(mut self, gene_set: GeneSet) -> Self {
        self.add_gene_set_of_interest(gene_set);
        self
    }

    /// Genes from the full GMT file, including sets that were filtered out.
    pub fn with_gmt_genes(mut self, genes: impl IntoIterator<Item = GeneId>) -> Self {
        self.gmt_genes.extend(genes);
        self
    }

    /// Genes present in the dataset's expression file.
    pub fn with_expression_genes(mut self, genes: impl IntoIterator<Item = GeneId>) -> Self {
        self.expression_genes.extend(genes);
        self
    }

    pub fn with_ranking(mut self, ranking: Ranking) -> Self {
        self.rankings.insert(ranking.name().to_string(), Arc::new(ranking));
        self
    }

    pub fn gene_set_of_interest(&self, name: &str) -> Option<&GeneSet> {
        self.gene_sets_of_interest.get(name)
    }

    pub fn gene_set_names(&self) -> impl Iterator<Item = &str> {
        self.gene_sets_of_interest.keys().map(String::as_str)
    }

    pub fn gmt_genes(&self) -> &HashSet<GeneId> {
        &self.gmt_genes
    }

    pub fn expression_genes(&self) -> &HashSet<GeneId> {
        &self.expression_genes
    }

    /// Genes present both in the GMT universe and the expression file.
    pub fn intersection_genes(&self) -> HashSet<GeneId> {
        self.gmt_genes.intersection(&self.expression_genes).copied().collect()
    }

    pub fn ranking(&self, name: &str) -> Option<&Arc<Ranking>> {
        self.rankings.get(name)
    }

    pub fn ranking_names(&self) -> impl Iterator<Item = &str> {
        self.rankings.keys().map(String::as_str)
    }
}

impl Annotated for Dataset {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Summarizable for Dataset {
    fn summary(&self) -> String {
        format!(
            "Dataset {}: {} gene sets of interest, {} GMT genes, {} rankings",
            self.name,
            self.gene_sets_of_interest.len(),
            self.gmt_genes.len(),
            self.rankings.len(),
        )
    }
}

// ── Enrichment map ─────────────────────────────────────────────────────────

/// Read-only view of an enrichment map, as seen by the similarity engine.
///
/// Implementations are shared across worker threads and must not change
/// while a computation is running.
pub trait EnrichmentMapView: Sync {
    /// Names of every dataset in the map.
    fn dataset_names(&self) -> Vec<String>;

    fn dataset(&self, name: &str) -> Option<&Dataset>;

    /// Look up a gene set of interest; `None` if the dataset does not exist
    /// or does not contain that set.
    fn gene_set(&self, dataset: &str, name: &str) -> Option<&GeneSet> {
        self.dataset(dataset)?.gene_set_of_interest(name)
    }

    /// Union of gene-set-of-interest names over all datasets, deduplicated
    /// by name.
    fn gene_set_of_interest_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for ds in self.dataset_names() {
            if let Some(dataset) = self.dataset(&ds) {
                names.extend(dataset.gene_set_names().map(str::to_string));
            }
        }
        names
    }
}

/// In-memory enrichment map.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentMap {
    name: String,
    interner: GeneInterner,
    datasets: BTreeMap<String, Dataset>,
}

impl EnrichmentMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add or replace a dataset.
    pub fn add_dataset(&mut self, dataset: Dataset) {
        self.datasets.insert(dataset.name().to_string(), dataset);
    }

    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.add_dataset(dataset);
        self
    }

    pub fn interner(&self) -> &GeneInterner {
        &self.interner
    }

    pub fn interner_mut(&mut self) -> &mut GeneInterner {
        &mut self.interner
    }

    pub fn datasets(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.values()
    }

    /// Whether any dataset carries a ranking (required by rank-sum tests).
    pub fn has_rankings(&self) -> bool {
        self.datasets.values().any(|d| d.ranking_names().next().is_some())
    }
}

impl Annotated for EnrichmentMap {
    fn name(&self) -> &str {
        &self.name
    }
}

impl EnrichmentMapView for EnrichmentMap {
    fn dataset_names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(name)
    }

    fn gene_set_of_interest_names(&self) -> BTreeSet<String> {
        self.datasets
            .values()
            .flat_map(|d| d.gene_set_names().map(str::to_string))
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
