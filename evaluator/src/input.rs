//! Validation inputs: CSV files with a `text` column (and optionally `label`),
//! or plain text files with one comment per line.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// `None` for an empty CSV cell.
    pub text: Option<String>,
    /// Ground truth, 1 = gambling promotion.
    pub label: Option<u8>,
}

/// A single file, or every `.csv` / `.txt` below a directory in path order.
pub fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input {} does not exist", input.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && matches!(extension(p), Some("csv" | "txt")))
        .collect();
    files.sort();
    Ok(files)
}

pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    match extension(path) {
        Some("csv") => read_csv(path),
        Some("txt") => read_txt(path),
        other => bail!("{}: unsupported input type {other:?}, expected .csv or .txt", path.display()),
    }
}

fn read_csv(path: &Path) -> Result<Vec<Row>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let text_col = match column("text") {
        Some(i) => i,
        None => bail!("{} has no `text` column", path.display()),
    };
    let label_col = column("label");

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.with_context(|| format!("read {}", path.display()))?;
        let text = record.get(text_col).filter(|t| !t.is_empty()).map(str::to_string);
        let label = label_col.and_then(|i| record.get(i)).and_then(parse_label);
        rows.push(Row { text, label });
    }
    Ok(rows)
}

fn read_txt(path: &Path) -> Result<Vec<Row>> {
    let content = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(content.lines().map(|l| Row { text: Some(l.to_string()), label: None }).collect())
}

/// 0/1, also tolerating float-formatted values ("1.0") and the display labels.
pub fn parse_label(raw: &str) -> Option<u8> {
    match raw.trim() {
        "1" | "1.0" | "Judi Online" => Some(1),
        "0" | "0.0" | "Non-Judi Online" => Some(0),
        _ => None,
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_needs_text_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "komentar,label\nhalo,0\n").unwrap();
        let err = read_rows(&path).unwrap_err();
        assert!(err.to_string().contains("`text` column"));
    }

    #[test]
    fn csv_with_optional_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("val.csv");
        fs::write(&path, "id,text,label\n1,slot gacor,1\n2,,0\n3,\"nonton, bola\",x\n").unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], Row { text: Some("slot gacor".into()), label: Some(1) });
        assert_eq!(rows[1], Row { text: None, label: Some(0) });
        assert_eq!(rows[2], Row { text: Some("nonton, bola".into()), label: None });

        let unlabeled = dir.path().join("new.csv");
        fs::write(&unlabeled, "text\nhalo\n").unwrap();
        assert_eq!(read_rows(&unlabeled).unwrap()[0].label, None);
    }

    #[test]
    fn txt_is_one_row_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(&path, "satu\n\ndua\n").unwrap();
        let texts: Vec<_> = read_rows(&path).unwrap().into_iter().map(|r| r.text.unwrap()).collect();
        assert_eq!(texts, vec!["satu", "", "dua"]);
    }

    #[test]
    fn directories_are_walked_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.csv"), "text\n").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::write(dir.path().join("sub/c.txt"), "").unwrap();
        fs::write(dir.path().join("notes.md"), "").unwrap();
        let names: Vec<_> = collect_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.txt", "b.csv", "sub/c.txt"]);
        assert!(collect_files(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn labels_parse_loosely() {
        assert_eq!(parse_label(" 1 "), Some(1));
        assert_eq!(parse_label("0.0"), Some(0));
        assert_eq!(parse_label("Judi Online"), Some(1));
        assert_eq!(parse_label("maybe"), None);
    }
}
