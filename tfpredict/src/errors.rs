use serde::Serialize;
use thiserror::Error;

use crate::models::Task;

/// Per-sequence failures of the classification cascade. None of these abort a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CascadeError {
    #[error("no homology hits or characteristic domains, prediction not possible")]
    NoEvidence,

    #[error("{task} classifier failed: {reason}")]
    ClassifierInvocationFailure { task: Task, reason: String },

    #[error("{task} classifier returned {found} probabilities, expected {expected}")]
    InconsistentLabelCount {
        task: Task,
        expected: usize,
        found: usize,
    },
}

/// Invalid command-line input, reported before anything is loaded.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// A recovered per-sequence failure reported next to the batch results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub sequence_id: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(sequence_id: &str, error: &CascadeError) -> Self {
        Diagnostic {
            sequence_id: sequence_id.to_string(),
            message: error.to_string(),
        }
    }
}
