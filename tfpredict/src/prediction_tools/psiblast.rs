use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::data_handling::blast_hits::read_tabular_hits;
use crate::data_handling::fasta::write_fasta;
use crate::models::{HitSet, SequenceRecord};
use crate::prediction_tools::{locate_executable, run_tool, HomologySearch};

/// Options of a PSI-BLAST search against one protein database.
#[derive(Debug, Clone)]
pub struct PsiBlastOptions {
    /// BLAST+ installation; `PATH` is searched when absent.
    pub blast_dir: Option<PathBuf>,
    /// Reference FASTA; the BLAST database is built next to it on first use.
    pub database: PathBuf,
    pub iterations: u32,
    /// Parent of the per-run scratch directory.
    pub work_dir: Option<PathBuf>,
    pub threads: usize,
}

#[derive(Debug, Clone)]
pub struct PsiBlast {
    psiblast: PathBuf,
    makeblastdb: PathBuf,
    options: PsiBlastOptions,
}

impl PsiBlast {
    pub fn new(options: PsiBlastOptions) -> anyhow::Result<Self> {
        let dir = options.blast_dir.as_deref();
        Ok(PsiBlast {
            psiblast: locate_executable("psiblast", dir)?,
            makeblastdb: locate_executable("makeblastdb", dir)?,
            options,
        })
    }

    /// Formats the reference FASTA unless the protein index already exists.
    pub fn ensure_database(&self) -> anyhow::Result<()> {
        let db = &self.options.database;
        if database_index(db).exists() {
            return Ok(());
        }
        info!("Formatting BLAST database {}", db.display());
        let mut cmd = Command::new(&self.makeblastdb);
        cmd.arg("-in").arg(db).arg("-dbtype").arg("prot").arg("-out").arg(db);
        run_tool("makeblastdb", &mut cmd)
    }

    fn search_args(&self, query: &Path, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |flag: &str, value: OsString| {
            args.push(flag.into());
            args.push(value);
        };
        push("-query", query.into());
        push("-db", self.options.database.as_os_str().to_owned());
        push("-num_iterations", self.options.iterations.to_string().into());
        push("-outfmt", "6".into());
        push("-num_threads", self.options.threads.max(1).to_string().into());
        push("-out", out.into());
        args
    }
}

impl HomologySearch for PsiBlast {
    fn search(&self, sequences: &[SequenceRecord]) -> anyhow::Result<HashMap<String, HitSet>> {
        self.ensure_database()?;
        let scratch = match &self.options.work_dir {
            Some(dir) => tempfile::Builder::new().prefix("psiblast").tempdir_in(dir)?,
            None => tempfile::Builder::new().prefix("psiblast").tempdir()?,
        };
        let query = scratch.path().join("query.fasta");
        let out = scratch.path().join("hits.tsv");
        write_fasta(&query, sequences)?;

        info!(
            "Running PSI-BLAST for {} sequence(s) against {}",
            sequences.len(),
            self.options.database.display()
        );
        let mut cmd = Command::new(&self.psiblast);
        cmd.args(self.search_args(&query, &out));
        run_tool("psiblast", &mut cmd)?;

        read_tabular_hits(&out)
    }
}

fn database_index(db: &Path) -> PathBuf {
    let mut index = db.as_os_str().to_owned();
    index.push(".pin");
    PathBuf::from(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blast(dir: &Path) -> PsiBlast {
        PsiBlast {
            psiblast: dir.join("psiblast"),
            makeblastdb: dir.join("makeblastdb"),
            options: PsiBlastOptions {
                blast_dir: Some(dir.to_path_buf()),
                database: dir.join("TF.fasta"),
                iterations: 2,
                work_dir: None,
                threads: 0,
            },
        }
    }

    #[test]
    fn builds_tabular_search_command() {
        let dir = Path::new("/opt/blast");
        let args = blast(dir).search_args(Path::new("/tmp/q.fasta"), Path::new("/tmp/hits.tsv"));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "-query", "/tmp/q.fasta",
                "-db", "/opt/blast/TF.fasta",
                "-num_iterations", "2",
                "-outfmt", "6",
                "-num_threads", "1",
                "-out", "/tmp/hits.tsv",
            ]
        );
    }

    #[test]
    fn existing_index_skips_formatting() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("TF.fasta.pin")).unwrap();
        // makeblastdb does not exist, so reaching it would fail
        assert!(blast(dir.path()).ensure_database().is_ok());
        assert_eq!(database_index(Path::new("db/TF.fasta")), PathBuf::from("db/TF.fasta.pin"));
    }
}
