//! Bit score percentile features.
//!
//! Each label class of a reference database has a population of bit scores,
//! taken from an all-against-all search of the database. A query is described
//! by where its best hit to each class ranks inside that class's population.

use std::collections::HashMap;

use tracing::debug;

use crate::data_handling::fasta::DatabaseLabels;
use crate::models::HitSet;

/// Sorted bit scores per label class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScorePopulation {
    sorted: Vec<Vec<f64>>,
    /// Scores each source sequence put into the population, per class, sorted.
    contributions: HashMap<String, Vec<Vec<f64>>>,
}

impl ScorePopulation {
    /// Builds the population from source -> hits tables. Self-matches and
    /// hits to unlabelled entries are left out.
    pub fn from_hit_sets(hit_sets: &HashMap<String, HitSet>, labels: &DatabaseLabels) -> Self {
        let classes = labels.num_classes();
        let mut sorted = vec![Vec::new(); classes];
        let mut contributions: HashMap<String, Vec<Vec<f64>>> = HashMap::new();

        for (source, hits) in hit_sets {
            let source = labels.entry_id(source);
            for (target, &score) in hits {
                if labels.entry_id(target) == source {
                    continue;
                }
                let Some(label) = labels.label_of(target) else {
                    continue;
                };
                sorted[label].push(score);
                contributions
                    .entry(source.to_string())
                    .or_insert_with(|| vec![Vec::new(); classes])[label]
                    .push(score);
            }
        }

        for scores in sorted.iter_mut() {
            scores.sort_by(f64::total_cmp);
        }
        for per_class in contributions.values_mut() {
            for scores in per_class.iter_mut() {
                scores.sort_by(f64::total_cmp);
            }
        }
        ScorePopulation { sorted, contributions }
    }

    pub fn num_classes(&self) -> usize {
        self.sorted.len()
    }

    pub fn class_size(&self, class: usize) -> usize {
        self.sorted.get(class).map_or(0, Vec::len)
    }

    /// Fraction of the class population scoring strictly below `score`,
    /// ignoring whatever `query` itself contributed. Equal scores count as
    /// not lower.
    pub fn percentile_rank(&self, class: usize, score: f64, query: &str) -> f64 {
        let Some(population) = self.sorted.get(class) else {
            return 0.0;
        };
        let own: &[f64] = self
            .contributions
            .get(query)
            .map(|per_class| per_class[class].as_slice())
            .unwrap_or(&[]);

        let total = population.len() - own.len();
        if total == 0 {
            return 0.0;
        }
        let lower = population.partition_point(|&s| s < score) - own.partition_point(|&s| s < score);
        lower as f64 / total as f64
    }
}

/// Turns one query's hit set into a percentile feature block.
#[derive(Debug, Clone)]
pub struct PercentileFeatureGenerator {
    labels: DatabaseLabels,
    population: ScorePopulation,
}

impl PercentileFeatureGenerator {
    pub fn new(labels: DatabaseLabels, population: ScorePopulation) -> Self {
        PercentileFeatureGenerator { labels, population }
    }

    pub fn num_classes(&self) -> usize {
        self.labels.num_classes()
    }

    /// One value per label class: the percentile rank of the best hit to
    /// that class, 0 for classes without hits. `None` when the query has no
    /// usable hit at all, which is different from an all-zero block.
    pub fn features(&self, query: &str, hits: &HitSet) -> Option<Vec<f64>> {
        let query_id = self.labels.entry_id(query);
        let mut best: Vec<Option<f64>> = vec![None; self.labels.num_classes()];

        for (target, &score) in hits {
            if self.labels.entry_id(target) == query_id {
                continue;
            }
            let Some(label) = self.labels.label_of(target) else {
                debug!("Hit {} of {} has no label, skipped", target, query);
                continue;
            };
            best[label] = Some(best[label].map_or(score, |b: f64| b.max(score)));
        }

        if best.iter().all(Option::is_none) {
            return None;
        }
        Some(
            best.iter()
                .enumerate()
                .map(|(class, score)| {
                    score.map_or(0.0, |s| self.population.percentile_rank(class, s, query_id))
                })
                .collect(),
        )
    }
}
