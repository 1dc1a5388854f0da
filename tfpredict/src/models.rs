use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::CascadeError;

/// Label indices of the TF/non-TF task.
pub const NON_TF: usize = 0;
pub const TF: usize = 1;

/// Tolerance used when checking that a probability distribution sums to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Structural superclass of a DNA-binding domain, indexed as the superclass
/// classifier and the curated class files number them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Superclass {
    Other,
    BasicDomain,
    ZincFinger,
    HelixTurnHelix,
    BetaScaffold,
}

impl Superclass {
    pub const ALL: [Superclass; 5] = [
        Superclass::Other,
        Superclass::BasicDomain,
        Superclass::ZincFinger,
        Superclass::HelixTurnHelix,
        Superclass::BetaScaffold,
    ];

    pub fn index(self) -> usize {
        match self {
            Superclass::Other => 0,
            Superclass::BasicDomain => 1,
            Superclass::ZincFinger => 2,
            Superclass::HelixTurnHelix => 3,
            Superclass::BetaScaffold => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Superclass::Other => "Other",
            Superclass::BasicDomain => "Basic domain",
            Superclass::ZincFinger => "Zinc finger",
            Superclass::HelixTurnHelix => "Helix-turn-helix",
            Superclass::BetaScaffold => "Beta scaffold",
        }
    }

    /// The superclass of a TRANSFAC class code such as `2.1.3.1` is its first digit.
    pub fn from_transfac_class(code: &str) -> Option<Self> {
        let digit = code.trim().chars().next()?.to_digit(10)?;
        Self::from_index(digit as usize)
    }
}

impl fmt::Display for Superclass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expands a TRANSFAC class code to the five-level dotted form, e.g. `2.1` -> `2.1.0.0.0.`
pub fn expand_transfac_class(code: &str) -> String {
    let mut expanded = format!("{}.", code.trim());
    while expanded.len() <= 9 {
        expanded.push_str("0.");
    }
    expanded
}

/// The two classification tasks, each with its own classifier and label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Task {
    TfClass,
    Superclass,
}

impl Task {
    pub fn label_count(self) -> usize {
        match self {
            Task::TfClass => 2,
            Task::Superclass => Superclass::ALL.len(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::TfClass => f.write_str("TF/non-TF"),
            Task::Superclass => f.write_str("superclass"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: String,
    pub species: Option<String>,
    pub accession: Option<String>,
}

/// One annotated domain of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainHit {
    pub domain_id: String,
    pub description: Option<String>,
    pub start: u32,
    pub end: u32,
    pub go_terms: Vec<String>,
}

/// Domain annotation of one sequence, in the order the annotator reported it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainAnnotation {
    pub hits: Vec<DomainHit>,
}

impl DomainAnnotation {
    /// Distinct domain IDs in first-seen order.
    pub fn domain_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::with_capacity(self.hits.len());
        for hit in &self.hits {
            if !ids.contains(&hit.domain_id.as_str()) {
                ids.push(&hit.domain_id);
            }
        }
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Matched database entry -> bit score.
pub type HitSet = HashMap<String, f64>;

/// A probability distribution over a fixed label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbDist(Vec<f64>);

impl ProbDist {
    /// Validates classifier output for `task`.
    pub fn checked(task: Task, probabilities: Vec<f64>) -> Result<Self, CascadeError> {
        let expected = task.label_count();
        if probabilities.len() != expected {
            return Err(CascadeError::InconsistentLabelCount {
                task,
                expected,
                found: probabilities.len(),
            });
        }
        if probabilities.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(CascadeError::ClassifierInvocationFailure {
                task,
                reason: format!("invalid probabilities {:?}", probabilities),
            });
        }
        let total: f64 = probabilities.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(CascadeError::ClassifierInvocationFailure {
                task,
                reason: format!("probabilities sum to {total}"),
            });
        }
        Ok(ProbDist(probabilities))
    }

    /// Degenerate distribution with all mass on `index`.
    pub fn unit(len: usize, index: usize) -> Self {
        let mut probabilities = vec![0.0; len];
        probabilities[index] = 1.0;
        ProbDist(probabilities)
    }

    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Index of the largest probability; the lowest index wins ties.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = i;
            }
        }
        best
    }

    #[cfg(test)]
    pub fn is_degenerate(&self) -> bool {
        self.0.iter().filter(|&&p| p == 1.0).count() == 1
            && self.0.iter().all(|&p| p == 0.0 || p == 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingDomainSpan {
    pub domain_id: String,
    pub start: u32,
    pub end: u32,
}

/// Curated binding-domain data for one sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingDomainRecord {
    pub annotated_class: Option<String>,
    pub spans: Vec<BindingDomainSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TfVerdict {
    NonTf,
    Tf,
}

/// Where the cascade stopped for a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeState {
    Unresolved,
    TrivialResolved,
    StatisticallyEvaluated(TfVerdict),
    SuperclassResolved,
    BindingDomainResolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sequence_id: String,
    pub prediction_possible: bool,
    pub prediction_trivial: bool,
    pub tf_probabilities: Option<ProbDist>,
    pub is_tf: bool,
    pub superclass_probabilities: Option<ProbDist>,
    pub predicted_superclass: Option<Superclass>,
    pub annotated_class: Option<String>,
    pub binding_domains: Vec<BindingDomainSpan>,
    pub state: CascadeState,
}

impl ClassificationResult {
    pub fn unresolved(sequence_id: &str) -> Self {
        ClassificationResult {
            sequence_id: sequence_id.to_string(),
            prediction_possible: false,
            prediction_trivial: false,
            tf_probabilities: None,
            is_tf: false,
            superclass_probabilities: None,
            predicted_superclass: None,
            annotated_class: None,
            binding_domains: Vec::new(),
            state: CascadeState::Unresolved,
        }
    }

    /// Name of the annotated superclass, when a TRANSFAC class is known.
    pub fn annotated_superclass(&self) -> Option<Superclass> {
        self.annotated_class
            .as_deref()
            .and_then(Superclass::from_transfac_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        let dist = ProbDist::checked(Task::Superclass, vec![0.1, 0.3, 0.3, 0.2, 0.1]).unwrap();
        assert_eq!(dist.argmax(), 1);
    }

    #[test]
    fn checked_rejects_wrong_length() {
        let err = ProbDist::checked(Task::TfClass, vec![0.2, 0.3, 0.5]).unwrap_err();
        assert_eq!(
            err,
            CascadeError::InconsistentLabelCount { task: Task::TfClass, expected: 2, found: 3 }
        );
    }

    #[test]
    fn checked_rejects_distribution_not_summing_to_one() {
        let err = ProbDist::checked(Task::TfClass, vec![0.2, 0.3]).unwrap_err();
        assert!(matches!(err, CascadeError::ClassifierInvocationFailure { .. }));
    }

    #[test]
    fn transfac_class_helpers() {
        assert_eq!(Superclass::from_transfac_class("2.1.3.1"), Some(Superclass::ZincFinger));
        assert_eq!(Superclass::from_transfac_class("9.1"), None);
        assert_eq!(expand_transfac_class("2.1"), "2.1.0.0.0.");
        assert_eq!(expand_transfac_class("3.1.2.4"), "3.1.2.4.0.");
    }

    #[test]
    fn domain_ids_are_distinct_and_ordered() {
        let hit = |id: &str| DomainHit {
            domain_id: id.to_string(),
            description: None,
            start: 1,
            end: 10,
            go_terms: vec![],
        };
        let annotation = DomainAnnotation { hits: vec![hit("IPR2"), hit("IPR1"), hit("IPR2")] };
        assert_eq!(annotation.domain_ids(), vec!["IPR2", "IPR1"]);
    }
}
