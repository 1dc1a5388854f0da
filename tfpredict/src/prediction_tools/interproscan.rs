use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::data_handling::fasta::write_fasta;
use crate::data_handling::interpro::read_interpro_tsv;
use crate::models::{DomainAnnotation, SequenceRecord};
use crate::prediction_tools::{annotations_for_batch, locate_executable, run_tool, DomainAnnotator};

const SCRIPT: &str = "interproscan.sh";

/// Runs a local InterProScan installation with GO and InterPro lookup.
#[derive(Debug, Clone)]
pub struct InterProScan {
    executable: PathBuf,
    work_dir: Option<PathBuf>,
}

impl InterProScan {
    /// `path` may name the script itself or its installation directory.
    pub fn new(path: Option<&Path>, work_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let executable = match path {
            Some(p) if p.is_file() => p.to_path_buf(),
            Some(dir) => locate_executable(SCRIPT, Some(dir))?,
            None => locate_executable(SCRIPT, None)?,
        };
        Ok(InterProScan { executable, work_dir })
    }
}

impl DomainAnnotator for InterProScan {
    fn annotate(&self, sequences: &[SequenceRecord]) -> anyhow::Result<HashMap<String, DomainAnnotation>> {
        let scratch = match &self.work_dir {
            Some(dir) => tempfile::Builder::new().prefix("iprscan").tempdir_in(dir)?,
            None => tempfile::Builder::new().prefix("iprscan").tempdir()?,
        };
        let input = scratch.path().join("query.fasta");
        let output = scratch.path().join("domains.tsv");
        write_fasta(&input, sequences)?;

        info!("Running InterProScan for {} sequence(s)", sequences.len());
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-i")
            .arg(&input)
            .arg("-f")
            .arg("tsv")
            .arg("-o")
            .arg(&output)
            .arg("-goterms")
            .arg("-iprlookup")
            .arg("-T")
            .arg(scratch.path());
        run_tool("InterProScan", &mut cmd)?;

        let annotations = read_interpro_tsv(&output)?;
        Ok(annotations_for_batch(annotations, sequences))
    }
}
