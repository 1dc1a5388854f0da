use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use polars::prelude::*;
use tracing::info;

use crate::helper_functions::read_headerless_tsv;
use crate::models::HitSet;

// BLAST tabular output (-outfmt 6): qseqid sseqid pident length mismatch
// gapopen qstart qend sstart send evalue bitscore
const QUERY_COL: &str = "column_1";
const TARGET_COL: &str = "column_2";
const BITSCORE_COL: &str = "column_12";
const MIN_COLUMNS: usize = 12;

/// Parses BLAST tabular output into query -> (target -> best bit score).
///
/// Comment lines (`-outfmt 7`) and PSI-BLAST status lines are skipped. A
/// target hit in several iterations keeps its highest score.
pub fn parse_tabular_hits(raw: &[u8]) -> anyhow::Result<HashMap<String, HitSet>> {
    let text = String::from_utf8_lossy(raw);
    let mut table = String::with_capacity(text.len());
    for line in text.lines() {
        if line.starts_with('#') || !line.contains('\t') {
            continue;
        }
        table.push_str(line);
        table.push('\n');
    }

    let mut hits: HashMap<String, HitSet> = HashMap::new();
    if table.is_empty() {
        return Ok(hits);
    }

    let df = read_headerless_tsv(table.into_bytes()).context("Failed to read BLAST hit table")?;
    if df.width() < MIN_COLUMNS {
        bail!(
            "BLAST hit table has {} columns, expected at least {} (-outfmt 6)",
            df.width(),
            MIN_COLUMNS
        );
    }

    let queries = df.column(QUERY_COL)?.str()?;
    let targets = df.column(TARGET_COL)?.str()?;
    let scores = df.column(BITSCORE_COL)?.cast(&DataType::Float64)?;
    let scores = scores.f64()?;

    for ((query, target), score) in queries.into_iter().zip(targets).zip(scores) {
        let (Some(query), Some(target), Some(score)) = (query, target, score) else {
            continue;
        };
        let best = hits
            .entry(query.to_string())
            .or_default()
            .entry(target.to_string())
            .or_insert(score);
        if score > *best {
            *best = score;
        }
    }
    Ok(hits)
}

pub fn read_tabular_hits(path: &Path) -> anyhow::Result<HashMap<String, HitSet>> {
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read BLAST hits {}", path.display()))?;
    let hits = parse_tabular_hits(&raw)?;
    info!("Read BLAST hits for {} queries from {}", hits.len(), path.display());
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_best_score_per_target() {
        let raw = b"# PSIBLAST 2.12.0+\n\
q1\tP1|TF\t80.0\t100\t10\t0\t1\t100\t1\t100\t1e-30\t150.5\n\
q1\tP2|NonTF\t40.0\t90\t40\t2\t1\t90\t5\t95\t1e-5\t45\n\
Search has CONVERGED!\n\
q1\tP1|TF\t82.0\t100\t9\t0\t1\t100\t1\t100\t1e-32\t160\n\
q2\tP2|NonTF\t30.0\t90\t50\t2\t1\t90\t5\t95\t1e-2\t30.2\n";

        let hits = parse_tabular_hits(raw).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits["q1"]["P1|TF"], 160.0);
        assert_eq!(hits["q1"]["P2|NonTF"], 45.0);
        assert_eq!(hits["q2"]["P2|NonTF"], 30.2);
    }

    #[test]
    fn empty_output_means_no_hits() {
        let hits = parse_tabular_hits(b"# 0 hits found\n").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn rejects_truncated_tables() {
        assert!(parse_tabular_hits(b"q1\tP1\t150\n").is_err());
    }
}
