use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use crate::helper_functions::read_id_list;

/// Ordered, deduplicated domain IDs relevant for one task. Position `i`
/// defines feature column `i + 1 + offset`, so the order must never change
/// between training and prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDomainList {
    ids: Vec<String>,
}

impl ReferenceDomainList {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &String| seen.insert(id.clone()))
            .collect();
        ReferenceDomainList { ids }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let list = ReferenceDomainList::new(read_id_list(path)?);
        info!("{} relevant domains read from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Binary membership block: one `(column, 0|1)` pair per reference
    /// domain, columns `offset + 1 ..= offset + len`.
    pub fn vectorize(&self, annotated: &[&str], offset: usize) -> Vec<(usize, f64)> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let present = annotated.contains(&id.as_str());
                (i + 1 + offset, if present { 1.0 } else { 0.0 })
            })
            .collect()
    }

    /// Number of annotated domains that are relevant for this task.
    pub fn count_relevant(&self, annotated: &[&str]) -> usize {
        annotated
            .iter()
            .filter(|id| self.ids.iter().any(|r| r == *id))
            .count()
    }
}
