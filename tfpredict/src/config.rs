use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::helper_functions::project_root;

/// File names of the static resources, relative to `resource_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceFiles {
    pub relevant_domains_tf: PathBuf,
    pub relevant_domains_superclass: PathBuf,
    pub characteristic_tf_domains: PathBuf,
    pub characteristic_superclass_domains: [PathBuf; 5],
    pub relevant_go_terms: PathBuf,
    pub tf_name_to_class: PathBuf,
    pub tf_model: PathBuf,
    pub superclass_model: PathBuf,
    pub tf_database: PathBuf,
    pub superclass_database: PathBuf,
    /// All-vs-all hit tables of the reference databases (BLAST outfmt 6).
    pub tf_population: PathBuf,
    pub superclass_population: PathBuf,
}

impl Default for ResourceFiles {
    fn default() -> Self {
        ResourceFiles {
            relevant_domains_tf: "domainsTFpred.txt".into(),
            relevant_domains_superclass: "domainsSuperPred.txt".into(),
            characteristic_tf_domains: "domainsTF.txt".into(),
            characteristic_superclass_domains: [
                "domainsClass0.txt".into(),
                "domainsClass1.txt".into(),
                "domainsClass2.txt".into(),
                "domainsClass3.txt".into(),
                "domainsClass4.txt".into(),
            ],
            relevant_go_terms: "DNA.go".into(),
            tf_name_to_class: "transHMan.tsv".into(),
            tf_model: "models/tfPred.json".into(),
            superclass_model: "models/superPred.json".into(),
            tf_database: "blast_db/TFnonTF.fasta".into(),
            superclass_database: "blast_db/TF.fasta".into(),
            tf_population: "blast_db/TFnonTF.allvsall.tsv".into(),
            superclass_population: "blast_db/TF.allvsall.tsv".into(),
        }
    }
}

/// Run configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictConfig {
    pub resource_dir: PathBuf,
    pub files: ResourceFiles,
    pub use_characteristic_domains: bool,
    /// Column offset of the domain block behind the percentile block.
    pub feature_offset: usize,
    pub max_batch_sequences: Option<usize>,
    pub blast_path: Option<PathBuf>,
    pub iprscan_path: Option<PathBuf>,
    pub blast_iterations: u32,
    pub work_dir: Option<PathBuf>,
}

impl Default for PredictConfig {
    fn default() -> Self {
        PredictConfig {
            resource_dir: project_root().join("resources"),
            files: ResourceFiles::default(),
            use_characteristic_domains: true,
            feature_offset: 10,
            max_batch_sequences: None,
            blast_path: None,
            iprscan_path: None,
            blast_iterations: 2,
            work_dir: None,
        }
    }
}

impl PredictConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config {}", path.display()))?;
        let config: PredictConfig = serde_json::from_reader(file)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Absolute location of a resource file.
    pub fn resource(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.resource_dir.join(file)
        }
    }

    /// BLAST installation from the config, else from `BLAST_DIR`.
    pub fn blast_dir(&self) -> Option<PathBuf> {
        self.blast_path.clone().or_else(|| {
            std::env::var_os("BLAST_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"resource_dir": "/opt/tfpredict", "use_characteristic_domains": false,
                "files": {{"tf_model": "models/rf.json"}}}}"#
        )
        .unwrap();

        let config = PredictConfig::from_json_file(file.path()).unwrap();
        assert!(!config.use_characteristic_domains);
        assert_eq!(config.feature_offset, 10);
        assert_eq!(
            config.resource(&config.files.tf_model),
            PathBuf::from("/opt/tfpredict/models/rf.json")
        );
        assert_eq!(
            config.resource(&config.files.relevant_go_terms),
            PathBuf::from("/opt/tfpredict/DNA.go")
        );
    }
}
