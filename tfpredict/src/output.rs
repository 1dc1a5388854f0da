use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use crate::classification::cascade::BatchOutcome;
use crate::errors::Diagnostic;
use crate::models::{expand_transfac_class, ClassificationResult, TF};

#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    #[serde(flatten)]
    result: &'a ClassificationResult,
    predicted_superclass_name: Option<&'static str>,
    annotated_superclass_name: Option<&'static str>,
    annotated_class_expanded: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    results: Vec<ReportEntry<'a>>,
    diagnostics: &'a [Diagnostic],
}

impl<'a> Report<'a> {
    fn new(outcome: &'a BatchOutcome) -> Self {
        let results = outcome
            .results
            .iter()
            .map(|result| ReportEntry {
                result,
                predicted_superclass_name: result.predicted_superclass.map(|s| s.name()),
                annotated_superclass_name: result.annotated_superclass().map(|s| s.name()),
                annotated_class_expanded: result.annotated_class.as_deref().map(expand_transfac_class),
            })
            .collect();
        Report {
            results,
            diagnostics: &outcome.diagnostics,
        }
    }
}

pub fn write_report<W: Write>(writer: W, outcome: &BatchOutcome) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, &Report::new(outcome))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// JSON report to `path`, or to stdout when no path is given.
pub fn write_report_to(path: Option<&Path>, outcome: &BatchOutcome) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create report {}", path.display()))?;
            write_report(file, outcome)?;
            info!("Results written to {}", path.display());
        }
        None => write_report(std::io::stdout().lock(), outcome)?,
    }
    Ok(())
}

/// One log line per sequence.
pub fn log_summary(outcome: &BatchOutcome) {
    for result in &outcome.results {
        let Some(tf) = &result.tf_probabilities else {
            info!("{}: prediction not possible", result.sequence_id);
            continue;
        };
        let mut line = format!("{}: P(TF) = {:.3}", result.sequence_id, tf.get(TF));
        if result.prediction_trivial {
            line.push_str(" (characteristic domain)");
        }
        if let Some(superclass) = result.predicted_superclass {
            line.push_str(&format!(", superclass {}", superclass));
        }
        if !result.binding_domains.is_empty() {
            let domains: Vec<String> = result
                .binding_domains
                .iter()
                .map(|d| format!("{} {}-{}", d.domain_id, d.start, d.end))
                .collect();
            line.push_str(&format!(", DNA-binding: {}", domains.join("; ")));
        }
        info!("{}", line);
    }
    for diagnostic in &outcome.diagnostics {
        warn!("{}: {}", diagnostic.sequence_id, diagnostic.message);
    }
    let tfs = outcome.results.iter().filter(|r| r.is_tf).count();
    info!("{} of {} sequence(s) predicted as TF", tfs, outcome.results.len());
}
