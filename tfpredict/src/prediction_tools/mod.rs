//! External evidence sources: domain annotation and homology search.
//!
//! Each source is either a wrapper around the external program or a reader
//! for output that was produced beforehand.

pub mod interproscan;
pub mod psiblast;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::bail;
use tracing::{debug, error, info, warn};

use crate::data_handling::blast_hits::read_tabular_hits;
use crate::data_handling::interpro::read_interpro_tsv;
use crate::models::{DomainAnnotation, HitSet, SequenceRecord};

/// Produces a domain annotation for every sequence of a batch. A sequence
/// without domains gets an empty annotation, it is never left out.
pub trait DomainAnnotator {
    fn annotate(&self, sequences: &[SequenceRecord]) -> anyhow::Result<HashMap<String, DomainAnnotation>>;
}

/// Homology hits of each query against one reference database. Queries
/// without hits are absent from the result.
pub trait HomologySearch {
    fn search(&self, sequences: &[SequenceRecord]) -> anyhow::Result<HashMap<String, HitSet>>;
}

/// Precomputed InterProScan TSV output.
#[derive(Debug, Clone)]
pub struct InterProScanTsv {
    pub path: PathBuf,
}

impl DomainAnnotator for InterProScanTsv {
    fn annotate(&self, sequences: &[SequenceRecord]) -> anyhow::Result<HashMap<String, DomainAnnotation>> {
        let annotations = read_interpro_tsv(&self.path)?;
        Ok(annotations_for_batch(annotations, sequences))
    }
}

/// Precomputed BLAST tabular output.
#[derive(Debug, Clone)]
pub struct TabularHits {
    pub path: PathBuf,
}

impl HomologySearch for TabularHits {
    fn search(&self, sequences: &[SequenceRecord]) -> anyhow::Result<HashMap<String, HitSet>> {
        let mut hits = read_tabular_hits(&self.path)?;
        hits.retain(|query, _| sequences.iter().any(|s| &s.id == query));
        Ok(hits)
    }
}

/// Keeps the annotations of the batch and adds empty ones where the tool
/// reported nothing.
pub fn annotations_for_batch(
    mut annotations: HashMap<String, DomainAnnotation>,
    sequences: &[SequenceRecord],
) -> HashMap<String, DomainAnnotation> {
    let batch: HashMap<String, DomainAnnotation> = sequences
        .iter()
        .map(|s| {
            let annotation = annotations.remove(&s.id).unwrap_or_else(|| {
                debug!("No domains reported for {}", s.id);
                DomainAnnotation::default()
            });
            (s.id.clone(), annotation)
        })
        .collect();
    let unannotated = batch.values().filter(|a| a.is_empty()).count();
    if unannotated > 0 {
        info!("{} of {} sequence(s) without domain annotation", unannotated, batch.len());
    }
    batch
}

/// Resolves an executable: inside `dir` (or its `bin/`) when given, else on `PATH`.
pub fn locate_executable(name: &str, dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    match dir {
        Some(dir) => {
            for candidate in [dir.join("bin").join(name), dir.join(name)] {
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
            bail!("{} not found in {}", name, dir.display())
        }
        None => which::which(name).map_err(|e| anyhow::anyhow!("{} not found on PATH: {}", name, e)),
    }
}

/// Runs a prepared command and fails with its stderr when it exits unsuccessfully.
pub fn run_tool(tool: &str, cmd: &mut Command) -> anyhow::Result<()> {
    debug!("About to spawn: {:?}", cmd);
    let output = cmd
        .output()
        .map_err(|e| anyhow::anyhow!("Failed to start {}: {}", tool, e))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("{} STDERR: {}", tool, stderr);
        bail!("{} exited with status {}", tool, output.status);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        warn!("{} reported: {}", tool, stderr.trim());
    }
    debug!("{} finished. Stdout:\n{}", tool, String::from_utf8_lossy(&output.stdout));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn record(id: &str) -> SequenceRecord {
        SequenceRecord {
            id: id.to_string(),
            sequence: "MKV".to_string(),
            species: None,
            accession: None,
        }
    }

    #[test]
    fn every_batch_sequence_gets_an_annotation() {
        let mut tsv = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            tsv,
            "q1\tmd5\t120\tPfam\tPF00096\tzf-C2H2\t10\t32\t1e-5\tT\t01-01-2024\tIPR013087\tZinc finger C2H2-type\tGO:0003676(InterPro)"
        )
        .unwrap();
        writeln!(
            tsv,
            "other\tmd5\t120\tPfam\tPF00096\tzf-C2H2\t10\t32\t1e-5\tT\t01-01-2024\tIPR013087\tZinc finger C2H2-type\t-"
        )
        .unwrap();

        let annotator = InterProScanTsv { path: tsv.path().to_path_buf() };
        let annotations = annotator.annotate(&[record("q1"), record("q2")]).unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations["q1"].domain_ids(), ["IPR013087"]);
        assert!(annotations["q2"].is_empty());
    }

    #[test]
    fn hits_are_restricted_to_the_batch() {
        let mut tsv = tempfile::NamedTempFile::new().unwrap();
        writeln!(tsv, "q1\tR1|TF\t80.0\t100\t20\t0\t1\t100\t1\t100\t1e-30\t150.5").unwrap();
        writeln!(tsv, "q9\tR1|TF\t80.0\t100\t20\t0\t1\t100\t1\t100\t1e-30\t99.0").unwrap();

        let hits = TabularHits { path: tsv.path().to_path_buf() }
            .search(&[record("q1"), record("q2")])
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits["q1"]["R1|TF"], 150.5);
    }

    #[test]
    fn executables_are_found_in_bin_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        std::fs::File::create(dir.path().join("bin").join("psiblast")).unwrap();

        assert_eq!(
            locate_executable("psiblast", Some(dir.path())).unwrap(),
            dir.path().join("bin").join("psiblast")
        );
        assert!(locate_executable("makeblastdb", Some(dir.path())).is_err());
    }

    #[test]
    fn failing_tool_is_an_error() {
        assert!(run_tool("false", &mut Command::new("false")).is_err());
        assert!(run_tool("true", &mut Command::new("true")).is_ok());
    }
}
