use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::helper_functions::read_id_list;
use crate::models::{BindingDomainRecord, BindingDomainSpan, DomainAnnotation, SequenceRecord};

/// Picks DNA-binding domains out of an annotation by their GO terms and
/// attaches the TRANSFAC class of known factors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingDomainCurator {
    relevant_go_terms: HashSet<String>,
    name_to_class: HashMap<String, String>,
}

impl BindingDomainCurator {
    pub fn new(relevant_go_terms: HashSet<String>, name_to_class: HashMap<String, String>) -> Self {
        BindingDomainCurator {
            relevant_go_terms,
            name_to_class,
        }
    }

    pub fn load(go_file: &Path, class_file: &Path) -> anyhow::Result<Self> {
        let relevant_go_terms: HashSet<String> = read_id_list(go_file)?.into_iter().collect();
        let file = std::fs::File::open(class_file)
            .with_context(|| format!("Failed to open TF class table {}", class_file.display()))?;
        let name_to_class = parse_name_to_class(file)
            .with_context(|| format!("Failed to parse TF class table {}", class_file.display()))?;
        info!(
            "{} DNA-binding GO terms, {} annotated TF classes",
            relevant_go_terms.len(),
            name_to_class.len()
        );
        Ok(Self::new(relevant_go_terms, name_to_class))
    }

    /// Curated record for one sequence; `None` when there is nothing to report.
    pub fn curate(&self, record: &SequenceRecord, annotation: Option<&DomainAnnotation>) -> Option<BindingDomainRecord> {
        let annotated_class = self
            .name_to_class
            .get(&record.id)
            .or_else(|| record.accession.as_ref().and_then(|acc| self.name_to_class.get(acc)))
            .cloned();

        let spans: Vec<BindingDomainSpan> = annotation
            .map(|a| {
                a.hits
                    .iter()
                    .filter(|hit| hit.go_terms.iter().any(|go| self.relevant_go_terms.contains(go)))
                    .map(|hit| BindingDomainSpan {
                        domain_id: hit.domain_id.clone(),
                        start: hit.start,
                        end: hit.end,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if annotated_class.is_none() && spans.is_empty() {
            return None;
        }
        Some(BindingDomainRecord {
            annotated_class,
            spans,
        })
    }
}

/// Two tab-separated columns: sequence name and TRANSFAC class code.
pub fn parse_name_to_class<R: Read>(input: R) -> anyhow::Result<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(input);

    let mut table = HashMap::new();
    for row in reader.records() {
        let row = row?;
        if let (Some(name), Some(class)) = (row.get(0), row.get(1)) {
            let (name, class) = (name.trim(), class.trim());
            if !name.is_empty() && !class.is_empty() {
                table.insert(name.to_string(), class.to_string());
            }
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DomainHit;

    fn record(id: &str, accession: Option<&str>) -> SequenceRecord {
        SequenceRecord {
            id: id.to_string(),
            sequence: "MKV".to_string(),
            species: None,
            accession: accession.map(str::to_string),
        }
    }

    fn curator() -> BindingDomainCurator {
        let table = parse_name_to_class("# name\tclass\nP53_HUMAN\t4.1.1.1\nP10275\t2.1.1.1.1\n".as_bytes()).unwrap();
        BindingDomainCurator::new(HashSet::from(["GO:0003677".to_string()]), table)
    }

    #[test]
    fn keeps_domains_with_dna_binding_go_terms() {
        let annotation = DomainAnnotation {
            hits: vec![
                DomainHit {
                    domain_id: "IPR011615".into(),
                    description: Some("p53 DNA-binding".into()),
                    start: 95,
                    end: 289,
                    go_terms: vec!["GO:0003677".into(), "GO:0003700".into()],
                },
                DomainHit {
                    domain_id: "IPR010991".into(),
                    description: None,
                    start: 319,
                    end: 357,
                    go_terms: vec!["GO:0051262".into()],
                },
            ],
        };
        let curated = curator().curate(&record("P53_HUMAN", None), Some(&annotation)).unwrap();
        assert_eq!(curated.annotated_class.as_deref(), Some("4.1.1.1"));
        assert_eq!(
            curated.spans,
            vec![BindingDomainSpan { domain_id: "IPR011615".into(), start: 95, end: 289 }]
        );
    }

    #[test]
    fn class_lookup_falls_back_to_accession() {
        let curated = curator().curate(&record("sp|P10275|ANDR_HUMAN", Some("P10275")), None).unwrap();
        assert_eq!(curated.annotated_class.as_deref(), Some("2.1.1.1.1"));
        assert!(curated.spans.is_empty());
        assert!(curator().curate(&record("unknown", None), None).is_none());
    }
}
