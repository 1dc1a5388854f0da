use std::env;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Context;
use polars::error::PolarsResult;
use polars::frame::DataFrame;
use polars::prelude::{CsvReadOptions, SerReader};

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

/// Reads headerless tab-separated text into a frame of string columns
/// (`column_1`, `column_2`, ...). Callers cast the numeric columns they need.
pub fn read_headerless_tsv(bytes: Vec<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(b'\t'))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

/// Reads a list file with one ID per line. Blank lines and `#` comments are
/// skipped; duplicates are dropped keeping the first occurrence. Only the
/// first tab-separated field of a line is the ID.
pub fn read_id_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read list file {}", path.display()))?;
    let mut table = String::with_capacity(content.len());
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        table.push_str(line.split('\t').next().unwrap_or(line));
        table.push('\n');
    }

    let mut ids: Vec<String> = Vec::new();
    if table.is_empty() {
        return Ok(ids);
    }
    let df = read_headerless_tsv(table.into_bytes())
        .with_context(|| format!("Failed to parse list file {}", path.display()))?;
    for id in df.column("column_1")?.str()?.into_iter().flatten() {
        let id = id.trim();
        if !id.is_empty() && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn id_list_is_deduplicated_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# relevant domains\nIPR3\n\nIPR1\nIPR3\n IPR2 ").unwrap();
        let ids = read_id_list(file.path()).unwrap();
        assert_eq!(ids, vec!["IPR3", "IPR1", "IPR2"]);
    }

    #[test]
    fn id_list_takes_the_first_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "IPR000001\tKringle\nIPR000002\tCdc20/Fizzy\tWD40\nIPR000001\tKringle").unwrap();
        assert_eq!(read_id_list(file.path()).unwrap(), vec!["IPR000001", "IPR000002"]);

        let mut comments_only = tempfile::NamedTempFile::new().unwrap();
        writeln!(comments_only, "# nothing here\n\n").unwrap();
        assert!(read_id_list(comments_only.path()).unwrap().is_empty());
    }

    #[test]
    fn headerless_tsv_keeps_strings() {
        let df = read_headerless_tsv(b"q1\t007\t12.5\nq2\tt2\t3\n".to_vec()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        let col = df.column("column_2").unwrap().str().unwrap();
        assert_eq!(col.get(0), Some("007"));
    }
}
