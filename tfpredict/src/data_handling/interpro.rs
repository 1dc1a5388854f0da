use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use tracing::{debug, info};

use crate::models::{DomainAnnotation, DomainHit};

// InterProScan TSV columns (0-based)
const COL_PROTEIN: usize = 0;
const COL_START: usize = 6;
const COL_STOP: usize = 7;
const COL_IPR: usize = 11;
const COL_IPR_DESC: usize = 12;
const COL_GO: usize = 13;

/// Parses InterProScan TSV output into per-sequence annotations.
///
/// Signature matches without an InterPro accession are skipped. The same
/// InterPro entry reported by several member databases is kept once per
/// distinct position.
pub fn parse_interpro_tsv<R: Read>(input: R) -> anyhow::Result<HashMap<String, DomainAnnotation>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(input);

    let mut annotations: HashMap<String, DomainAnnotation> = HashMap::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed InterProScan row {}", line + 1))?;
        let field = |i: usize| row.get(i).map(str::trim).filter(|v| !v.is_empty() && *v != "-");

        let Some(protein) = field(COL_PROTEIN) else {
            continue;
        };
        let annotation = annotations.entry(protein.to_string()).or_default();
        let Some(domain_id) = field(COL_IPR) else {
            debug!("Row {} for {} has no InterPro accession", line + 1, protein);
            continue;
        };

        let start: u32 = field(COL_START)
            .context("missing start")
            .and_then(|v| v.parse().context("invalid start"))
            .with_context(|| format!("InterProScan row {}", line + 1))?;
        let end: u32 = field(COL_STOP)
            .context("missing stop")
            .and_then(|v| v.parse().context("invalid stop"))
            .with_context(|| format!("InterProScan row {}", line + 1))?;

        let go_terms: Vec<String> = field(COL_GO)
            .map(|terms| {
                terms
                    .split('|')
                    .map(|t| t.split('(').next().unwrap_or(t).trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let duplicate = annotation
            .hits
            .iter()
            .any(|h| h.domain_id == domain_id && h.start == start && h.end == end);
        if !duplicate {
            annotation.hits.push(DomainHit {
                domain_id: domain_id.to_string(),
                description: field(COL_IPR_DESC).map(str::to_string),
                start,
                end,
                go_terms,
            });
        }
    }
    Ok(annotations)
}

pub fn read_interpro_tsv(path: &Path) -> anyhow::Result<HashMap<String, DomainAnnotation>> {
    info!("Reading InterProScan results from {}", path.display());
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open InterProScan output {}", path.display()))?;
    parse_interpro_tsv(file)
}
