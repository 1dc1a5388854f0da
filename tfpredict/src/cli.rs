use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

use crate::config::PredictConfig;
use crate::errors::CliError;

#[derive(Debug, Parser)]
#[command(name = "tfpredict", about = "Transcription factor and superclass prediction for protein sequences")]
pub struct Args {
    #[arg(
        short = 'f',
        long = "fasta",
        required = true,
        value_name = "PATH",
        help = "Protein sequences to classify (FASTA)"
    )]
    pub fasta: PathBuf,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "JSON configuration file"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'r',
        long = "resources",
        value_name = "DIR",
        help = "Directory with domain lists, reference databases and models"
    )]
    pub resources: Option<PathBuf>,

    #[arg(
        short = 'i',
        long = "interpro-tsv",
        value_name = "PATH",
        conflicts_with = "iprscan_path",
        help = "Precomputed InterProScan TSV output for the query sequences"
    )]
    pub interpro_tsv: Option<PathBuf>,

    #[arg(
        long = "iprscan-path",
        value_name = "PATH",
        help = "InterProScan script or installation directory"
    )]
    pub iprscan_path: Option<PathBuf>,

    #[arg(
        long = "tf-hits",
        value_name = "PATH",
        requires = "superclass_hits",
        help = "Precomputed BLAST hits (-outfmt 6) against the TF/non-TF database"
    )]
    pub tf_hits: Option<PathBuf>,

    #[arg(
        long = "superclass-hits",
        value_name = "PATH",
        requires = "tf_hits",
        help = "Precomputed BLAST hits (-outfmt 6) against the TF superclass database"
    )]
    pub superclass_hits: Option<PathBuf>,

    #[arg(
        long = "blast-path",
        value_name = "DIR",
        help = "BLAST+ installation directory [default: $BLAST_DIR or PATH]"
    )]
    pub blast_path: Option<PathBuf>,

    #[arg(
        long = "work-dir",
        value_name = "DIR",
        help = "Directory for temporary tool input and output"
    )]
    pub work_dir: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "out",
        value_name = "PATH",
        help = "Write JSON results here instead of stdout"
    )]
    pub out: Option<PathBuf>,

    #[arg(
        long = "ignore-characteristic-domains",
        help = "Flag to classify only with the statistical models",
        value_name = "FLAG",
        default_missing_value("true"),
        default_value("false"),
        num_args(0..=1),
        require_equals(true),
        action = ArgAction::Set,
    )]
    pub ignore_characteristic_domains: bool,

    #[arg(
        long = "max-sequences",
        value_name = "N",
        help = "Refuse batches with more sequences than this"
    )]
    pub max_sequences: Option<usize>,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = std::thread::available_parallelism().map_or(1, |n| n.get())
    )]
    pub threads: usize,
}

impl Args {
    pub fn check(&self) -> Result<(), CliError> {
        validate(&self.fasta)?;
        for path in [&self.config, &self.interpro_tsv, &self.tf_hits, &self.superclass_hits]
            .into_iter()
            .flatten()
        {
            validate(path)?;
        }
        if let Some(dir) = &self.resources {
            if !dir.is_dir() {
                return Err(CliError::InvalidInput(format!("{:?} is not a directory", dir)));
            }
        }
        if self.threads == 0 {
            return Err(CliError::InvalidInput("threads must be at least 1".to_string()));
        }
        if self.max_sequences == Some(0) {
            return Err(CliError::InvalidInput("max-sequences must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Command-line values take precedence over the configuration file.
    pub fn apply(&self, config: &mut PredictConfig) {
        if let Some(dir) = &self.resources {
            config.resource_dir = dir.clone();
        }
        if self.ignore_characteristic_domains {
            config.use_characteristic_domains = false;
        }
        if self.max_sequences.is_some() {
            config.max_batch_sequences = self.max_sequences;
        }
        if self.blast_path.is_some() {
            config.blast_path = self.blast_path.clone();
        }
        if self.iprscan_path.is_some() {
            config.iprscan_path = self.iprscan_path.clone();
        }
        if self.work_dir.is_some() {
            config.work_dir = self.work_dir.clone();
        }
    }
}

fn validate(arg: &Path) -> Result<(), CliError> {
    if !arg.exists() {
        return Err(CliError::InvalidInput(format!("{:?} does not exist", arg)));
    }
    if !arg.is_file() {
        return Err(CliError::InvalidInput(format!("{:?} is not a file", arg)));
    }
    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => {
            Err(CliError::InvalidInput(format!("file {:?} is empty", arg)))
        }
        Ok(_) => Ok(()),
        Err(e) => Err(CliError::InvalidInput(format!("cannot read {:?}: {}", arg, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_config() {
        let args = Args::parse_from([
            "tfpredict",
            "--fasta",
            "q.fasta",
            "--resources",
            "/data/tfpredict",
            "--ignore-characteristic-domains",
            "--max-sequences",
            "10",
            "--blast-path",
            "/opt/blast",
        ]);
        let mut config = PredictConfig::default();
        args.apply(&mut config);

        assert_eq!(config.resource_dir, PathBuf::from("/data/tfpredict"));
        assert!(!config.use_characteristic_domains);
        assert_eq!(config.max_batch_sequences, Some(10));
        assert_eq!(config.blast_dir(), Some(PathBuf::from("/opt/blast")));
    }

    #[test]
    fn hit_files_come_in_pairs() {
        let result = Args::try_parse_from(["tfpredict", "--fasta", "q.fasta", "--tf-hits", "tf.tsv"]);
        assert!(result.is_err());
        let result = Args::try_parse_from([
            "tfpredict",
            "--fasta",
            "q.fasta",
            "--interpro-tsv",
            "q.tsv",
            "--iprscan-path",
            "/opt/ipr",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn check_rejects_missing_and_empty_files() {
        let args = Args::parse_from(["tfpredict", "--fasta", "/no/such/file.fasta"]);
        assert!(args.check().is_err());

        let empty = tempfile::NamedTempFile::new().unwrap();
        let args = Args::parse_from(["tfpredict", "--fasta", empty.path().to_str().unwrap()]);
        assert!(args.check().is_err());

        let mut fasta = tempfile::NamedTempFile::new().unwrap();
        writeln!(fasta, ">q1\nMKV").unwrap();
        let args = Args::parse_from(["tfpredict", "--fasta", fasta.path().to_str().unwrap()]);
        assert!(args.check().is_ok());
    }
}
