use rayon::prelude::*;
use tracing::{debug, error};

use crate::classification::classifier::ProbabilisticClassifier;
use crate::classification::trivial::CharacteristicDomains;
use crate::errors::{CascadeError, Diagnostic};
use crate::features::vector::FeatureVector;
use crate::models::{
    BindingDomainRecord, CascadeState, ClassificationResult, ProbDist, Task, TfVerdict, NON_TF, TF,
};

/// Everything the cascade needs to know about one sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SequenceEvidence {
    pub sequence_id: String,
    /// Annotated domain IDs in annotation order.
    pub domain_ids: Vec<String>,
    pub tf_features: Option<FeatureVector>,
    pub superclass_features: Option<FeatureVector>,
    /// Domain-only superclass vector, used when a TF verdict comes from a
    /// characteristic domain but there are no superclass hits.
    pub superclass_fallback: Option<FeatureVector>,
    pub binding: Option<BindingDomainRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<ClassificationResult>,
    pub diagnostics: Vec<Diagnostic>,
}

/// TF/non-TF decision, superclass decision and binding-domain lookup.
/// Holds only shared, read-only references so one instance serves all workers.
pub struct Cascade<'a> {
    tf_classifier: &'a dyn ProbabilisticClassifier,
    superclass_classifier: &'a dyn ProbabilisticClassifier,
    /// `None` disables both trivial resolution and the TF override.
    characteristic: Option<&'a CharacteristicDomains>,
}

impl<'a> Cascade<'a> {
    pub fn new(
        tf_classifier: &'a dyn ProbabilisticClassifier,
        superclass_classifier: &'a dyn ProbabilisticClassifier,
        characteristic: Option<&'a CharacteristicDomains>,
    ) -> Self {
        Cascade {
            tf_classifier,
            superclass_classifier,
            characteristic,
        }
    }

    /// Classifies every sequence independently. A failing sequence is
    /// reported as a diagnostic and committed as "prediction not possible";
    /// the others are unaffected. Results keep the input order.
    pub fn classify_batch(&self, batch: &[SequenceEvidence]) -> BatchOutcome {
        let outcomes: Vec<(ClassificationResult, Option<Diagnostic>)> = batch
            .par_iter()
            .map(|evidence| match self.classify(evidence) {
                Ok(result) => (result, None),
                Err(CascadeError::NoEvidence) => {
                    debug!("{}: no evidence, prediction not possible", evidence.sequence_id);
                    (ClassificationResult::unresolved(&evidence.sequence_id), None)
                }
                Err(e) => {
                    error!("{}: {}", evidence.sequence_id, e);
                    (
                        ClassificationResult::unresolved(&evidence.sequence_id),
                        Some(Diagnostic::new(&evidence.sequence_id, &e)),
                    )
                }
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        for (result, diagnostic) in outcomes {
            outcome.results.push(result);
            outcome.diagnostics.extend(diagnostic);
        }
        outcome
    }

    /// Runs the cascade for one sequence. The returned record is complete;
    /// nothing is committed on error.
    pub fn classify(&self, evidence: &SequenceEvidence) -> Result<ClassificationResult, CascadeError> {
        let id = evidence.sequence_id.as_str();
        let domain_ids: Vec<&str> = evidence.domain_ids.iter().map(String::as_str).collect();
        let mut result = ClassificationResult::unresolved(id);

        let trivial = self
            .characteristic
            .and_then(|domains| domains.resolve_trivially(&domain_ids));

        if let Some((domain_id, superclass)) = trivial {
            debug!("{}: {} is characteristic for {}", id, domain_id, superclass);
            result.prediction_possible = true;
            result.prediction_trivial = true;
            result.is_tf = true;
            result.tf_probabilities = Some(ProbDist::unit(Task::TfClass.label_count(), TF));
            result.superclass_probabilities =
                Some(ProbDist::unit(Task::Superclass.label_count(), superclass.index()));
            result.predicted_superclass = Some(superclass);
            result.state = CascadeState::TrivialResolved;
        } else {
            let tf_features = evidence.tf_features.as_ref().ok_or(CascadeError::NoEvidence)?;
            let tf_dist = self.invoke(Task::TfClass, self.tf_classifier, tf_features)?;

            result.prediction_possible = true;
            result.is_tf = tf_dist.get(TF) >= tf_dist.get(NON_TF) && evidence.superclass_features.is_some();
            result.tf_probabilities = Some(tf_dist);

            if !result.is_tf {
                let overriding = self
                    .characteristic
                    .and_then(|domains| domains.tf_override(&domain_ids));
                if let Some(domain_id) = overriding {
                    debug!("{}: non-TF verdict overridden by {}", id, domain_id);
                    result.is_tf = true;
                    result.tf_probabilities = Some(ProbDist::unit(Task::TfClass.label_count(), TF));
                }
            }
            result.state = CascadeState::StatisticallyEvaluated(if result.is_tf {
                TfVerdict::Tf
            } else {
                TfVerdict::NonTf
            });

            if result.is_tf {
                let features = evidence
                    .superclass_features
                    .as_ref()
                    .or(evidence.superclass_fallback.as_ref())
                    .ok_or_else(|| CascadeError::ClassifierInvocationFailure {
                        task: Task::Superclass,
                        reason: "no superclass feature vector".to_string(),
                    })?;
                let dist = self.invoke(Task::Superclass, self.superclass_classifier, features)?;
                result.predicted_superclass = crate::models::Superclass::from_index(dist.argmax());
                result.superclass_probabilities = Some(dist);
                result.state = CascadeState::SuperclassResolved;
            }
        }

        if result.is_tf {
            if let Some(binding) = &evidence.binding {
                result.annotated_class = binding.annotated_class.clone();
                result.binding_domains = binding.spans.clone();
            }
            result.state = CascadeState::BindingDomainResolved;
        }
        Ok(result)
    }

    fn invoke(
        &self,
        task: Task,
        classifier: &dyn ProbabilisticClassifier,
        features: &FeatureVector,
    ) -> Result<ProbDist, CascadeError> {
        let mut probabilities = classifier
            .distribution(features)
            .map_err(|e| CascadeError::ClassifierInvocationFailure {
                task,
                reason: format!("{e:#}"),
            })?;
        // single-output models report only the first label
        if task == Task::TfClass && probabilities.len() == 1 {
            let p = probabilities[0];
            probabilities = vec![p, 1.0 - p];
        }
        ProbDist::checked(task, probabilities)
    }
}
