pub mod domain_vector;
pub mod percentile;
pub mod vector;

use anyhow::ensure;

use crate::models::{HitSet, Task};
use domain_vector::ReferenceDomainList;
use percentile::PercentileFeatureGenerator;
use vector::FeatureVector;

/// Feature layout of one task: percentile block in columns `1..=classes`,
/// domain block in columns `offset + 1 ..= offset + domains`.
#[derive(Debug, Clone)]
pub struct TaskFeatures {
    pub task: Task,
    pub reference_domains: ReferenceDomainList,
    pub percentiles: PercentileFeatureGenerator,
    pub offset: usize,
}

impl TaskFeatures {
    pub fn new(
        task: Task,
        reference_domains: ReferenceDomainList,
        percentiles: PercentileFeatureGenerator,
        offset: usize,
    ) -> anyhow::Result<Self> {
        ensure!(
            offset >= percentiles.num_classes(),
            "feature offset {} would overlap the {} percentile columns of the {} task",
            offset,
            percentiles.num_classes(),
            task
        );
        Ok(TaskFeatures {
            task,
            reference_domains,
            percentiles,
            offset,
        })
    }

    pub fn dimension(&self) -> usize {
        self.offset + self.reference_domains.len()
    }

    /// Full feature vector, or `None` when the query has no usable hit.
    pub fn build(&self, query: &str, hits: Option<&HitSet>, domains: &[&str]) -> Option<FeatureVector> {
        let percentiles = self.percentiles.features(query, hits?)?;
        let mut vector = self.build_domain_only(domains);
        for (i, value) in percentiles.into_iter().enumerate() {
            vector.set(i + 1, value);
        }
        Some(vector)
    }

    /// Vector with an empty percentile block.
    pub fn build_domain_only(&self, domains: &[&str]) -> FeatureVector {
        let mut vector = FeatureVector::zeros(self.dimension());
        for (column, value) in self.reference_domains.vectorize(domains, self.offset) {
            vector.set(column, value);
        }
        vector
    }
}
