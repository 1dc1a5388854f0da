use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{bail, Context};
use bio::io::fasta;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::models::{SequenceRecord, Superclass, NON_TF, TF};

/// Reads the query sequences. Duplicated headers are rejected because the
/// sequence ID keys every downstream table.
pub fn read_query_fasta(path: &Path) -> anyhow::Result<Vec<SequenceRecord>> {
    info!("Reading query sequences from {}", path.display());
    let reader = fasta::Reader::from_file(path)
        .with_context(|| format!("Failed to open FASTA file {}", path.display()))?;
    let species_re = Regex::new(r"OS=(.+?)(?:\s+[A-Z]{2}=|$)")?;

    let mut seen = HashSet::new();
    let mut sequences = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed FASTA in {}", path.display()))?;
        if !seen.insert(record.id().to_string()) {
            bail!("FASTA file {} contains duplicated header {}", path.display(), record.id());
        }
        sequences.push(sequence_record(record.id(), record.desc(), record.seq(), &species_re));
    }

    if sequences.is_empty() {
        bail!("FASTA file {} contains no sequences", path.display());
    }
    info!("Read {} query sequence(s)", sequences.len());
    Ok(sequences)
}

fn sequence_record(id: &str, desc: Option<&str>, seq: &[u8], species_re: &Regex) -> SequenceRecord {
    let sequence: String = String::from_utf8_lossy(seq)
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    // UniProt headers look like sp|P04637|P53_HUMAN
    let parts: Vec<&str> = id.split('|').collect();
    let accession = match parts.as_slice() {
        ["sp" | "tr", acc, _] => Some(acc.to_string()),
        _ => None,
    };

    let species = desc
        .and_then(|d| species_re.captures(d))
        .map(|caps| caps[1].trim().to_string());

    SequenceRecord {
        id: id.to_string(),
        sequence,
        species,
        accession,
    }
}

pub fn write_fasta(path: &Path, sequences: &[SequenceRecord]) -> anyhow::Result<()> {
    let mut writer = fasta::Writer::to_file(path)
        .with_context(|| format!("Failed to create FASTA file {}", path.display()))?;
    for record in sequences {
        writer.write(&record.id, None, record.sequence.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// How labels are encoded in the headers of a reference database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelScheme {
    /// `>P12345|TF` or `>Q67890|NonTF`
    TfNonTf,
    /// `>P12345|2.1.3.1`, TRANSFAC class code whose first digit is the superclass
    Superclass,
}

impl LabelScheme {
    pub fn num_classes(self) -> usize {
        match self {
            LabelScheme::TfNonTf => 2,
            LabelScheme::Superclass => Superclass::ALL.len(),
        }
    }

    pub fn parse(self, label: &str) -> Option<usize> {
        let label = label.trim();
        match self {
            LabelScheme::TfNonTf => match label.to_ascii_lowercase().as_str() {
                "tf" => Some(TF),
                "nontf" | "non-tf" | "non_tf" => Some(NON_TF),
                _ => None,
            },
            LabelScheme::Superclass => {
                if label.is_empty() || !label.chars().all(|c| c.is_ascii_digit() || c == '.') {
                    return None;
                }
                Superclass::from_transfac_class(label).map(Superclass::index)
            }
        }
    }

    /// Splits a trailing `|LABEL` field off a header. Headers whose last
    /// field is not a label, such as `sp|P04637|P53_HUMAN`, are kept whole.
    pub fn split_label(self, header: &str) -> (&str, Option<usize>) {
        match header.rsplit_once('|') {
            Some((id, field)) => match self.parse(field) {
                Some(label) => (id, Some(label)),
                None => (header, None),
            },
            None => (header, None),
        }
    }
}

/// Ground-truth label of every reference database member, keyed by entry
/// ID (the header without its label field).
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseLabels {
    labels: HashMap<String, usize>,
    scheme: LabelScheme,
}

impl DatabaseLabels {
    pub fn from_fasta(path: &Path, scheme: LabelScheme) -> anyhow::Result<Self> {
        let reader = fasta::Reader::from_file(path)
            .with_context(|| format!("Failed to open reference database {}", path.display()))?;
        let mut headers = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("Malformed FASTA in {}", path.display()))?;
            headers.push(record.id().to_string());
        }
        let labels = Self::from_headers(headers.iter().map(String::as_str), scheme);
        info!(
            "Labelled {} of {} reference sequences in {}",
            labels.len(),
            headers.len(),
            path.display()
        );
        Ok(labels)
    }

    pub fn from_headers<'a, I>(headers: I, scheme: LabelScheme) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut labels = HashMap::new();
        let mut unlabelled = 0usize;
        for header in headers {
            let (id, Some(label)) = scheme.split_label(header) else {
                debug!("No label in reference header {}", header);
                unlabelled += 1;
                continue;
            };
            if let Some(previous) = labels.insert(id.to_string(), label) {
                if previous != label {
                    warn!("{} is labelled both {} and {}, keeping {}", id, previous, label, label);
                }
            }
        }
        if unlabelled > 0 {
            warn!("{} reference header(s) carry no usable label", unlabelled);
        }
        DatabaseLabels { labels, scheme }
    }

    /// Entry ID of a header or hit target, with any label field removed.
    pub fn entry_id<'a>(&self, header: &'a str) -> &'a str {
        self.scheme.split_label(header).0
    }

    pub fn label_of(&self, target: &str) -> Option<usize> {
        self.labels.get(self.entry_id(target)).copied()
    }

    pub fn num_classes(&self) -> usize {
        self.scheme.num_classes()
    }

    /// Number of distinct labelled entries.
    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn query_fasta_parses_uniprot_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            ">sp|P04637|P53_HUMAN Cellular tumor antigen p53 OS=Homo sapiens OX=9606 GN=TP53\nMEEPQSDPSV\nEPPLSQETF\n>query2\nmkv lta"
        )
        .unwrap();

        let records = read_query_fasta(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "sp|P04637|P53_HUMAN");
        assert_eq!(records[0].accession.as_deref(), Some("P04637"));
        assert_eq!(records[0].species.as_deref(), Some("Homo sapiens"));
        assert_eq!(records[0].sequence, "MEEPQSDPSVEPPLSQETF");
        assert_eq!(records[1].sequence, "MKVLTA");
        assert_eq!(records[1].species, None);
    }

    #[test]
    fn duplicated_headers_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, ">seq1\nMKV\n>seq1\nMKL").unwrap();
        assert!(read_query_fasta(file.path()).is_err());
    }

    #[test]
    fn labels_from_headers() {
        let tf = DatabaseLabels::from_headers(["P1|TF", "P2|NonTF", "P3|Non-TF", "P4"], LabelScheme::TfNonTf);
        assert_eq!(tf.len(), 3);
        assert_eq!(tf.label_of("P1"), Some(TF));
        assert_eq!(tf.label_of("P1|TF"), Some(TF));
        assert_eq!(tf.label_of("P2"), Some(NON_TF));
        assert_eq!(tf.label_of("P3"), Some(NON_TF));
        assert_eq!(tf.label_of("P4"), None);

        let sc = DatabaseLabels::from_headers(["T1|2.1.3.1", "T2|0.1"], LabelScheme::Superclass);
        assert_eq!(sc.label_of("T1"), Some(2));
        assert_eq!(sc.label_of("T2"), Some(0));
        assert_eq!(sc.num_classes(), 5);
        assert_eq!(sc.len(), 2);
    }

    #[test]
    fn uniprot_style_headers_keep_their_pipes() {
        let tf = DatabaseLabels::from_headers(
            ["sp|P1|A_HUMAN|TF", "sp|P2|B_HUMAN|TF", "sp|P3|C_HUMAN|NonTF"],
            LabelScheme::TfNonTf,
        );
        assert_eq!(tf.len(), 3);
        assert_eq!(tf.entry_id("sp|P1|A_HUMAN|TF"), "sp|P1|A_HUMAN");
        assert_eq!(tf.entry_id("sp|Q9|QUERY_HUMAN"), "sp|Q9|QUERY_HUMAN");
        assert_eq!(tf.label_of("sp|P1|A_HUMAN|TF"), Some(TF));
        assert_eq!(tf.label_of("sp|P3|C_HUMAN"), Some(NON_TF));
        assert_eq!(tf.label_of("sp"), None);

        let sc = DatabaseLabels::from_headers(["sp|P1|1ABC_HUMAN|3.1.2"], LabelScheme::Superclass);
        assert_eq!(sc.entry_id("sp|P1|1ABC_HUMAN"), "sp|P1|1ABC_HUMAN");
        assert_eq!(sc.label_of("sp|P1|1ABC_HUMAN|3.1.2"), Some(3));
    }
}
