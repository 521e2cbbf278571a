//! Reading vehicle numbers from files and command-line lists.
//!
//! Entries are only trimmed here; normalisation, validation and
//! de-duplication happen when the batch is submitted.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};

const CSV_COLUMN: &str = "vehicle_number";

pub fn load_identifiers(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading identifiers from {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => Ok(parse_csv(&text)),
        Some("txt") => Ok(parse_lines(&text)),
        _ => bail!("unsupported input file {}: use .txt or .csv", path.display()),
    }
}

/// One identifier per line.
pub fn parse_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma and/or newline separated identifiers.
pub fn parse_list(text: &str) -> Vec<String> {
    text.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Takes the `vehicle_number` column when the header has one, otherwise the
/// first column of every row after the header.
pub fn parse_csv(text: &str) -> Vec<String> {
    let mut rows = text.lines().filter(|line| !line.trim().is_empty());
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let column = split_csv_row(header)
        .iter()
        .position(|name| name.eq_ignore_ascii_case(CSV_COLUMN))
        .unwrap_or(0);
    rows.filter_map(|row| split_csv_row(row).into_iter().nth(column))
        .filter(|value| !value.is_empty())
        .collect()
}

/// Minimal field splitter: quoted fields may contain commas and `""`.
fn split_csv_row(row: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn list_accepts_commas_and_newlines() {
        assert_eq!(
            parse_list("ABC-1234, def-5678\n\n GHI-9012 ,"),
            vec!["ABC-1234", "def-5678", "GHI-9012"]
        );
    }

    #[test]
    fn lines_skip_blanks() {
        assert_eq!(parse_lines("ABC-1234\r\n\r\n  CAR-1  \n"), vec!["ABC-1234", "CAR-1"]);
    }

    #[test]
    fn csv_uses_named_column() {
        let csv = "owner,vehicle_number\n\"Doe, John\",ABC-1234\nJane,DEF-5678\n";
        assert_eq!(parse_csv(csv), vec!["ABC-1234", "DEF-5678"]);
    }

    #[test]
    fn csv_without_named_column_uses_first() {
        let csv = "plate,notes\nABC-1234,x\nDEF-5678,\n";
        assert_eq!(parse_csv(csv), vec!["ABC-1234", "DEF-5678"]);
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        assert_eq!(
            split_csv_row(r#"a,"b, ""c""",d"#),
            vec!["a", r#"b, "c""#, "d"]
        );
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("plates.xlsx");
        fs::write(&path, "ABC-1234").unwrap();
        assert!(load_identifiers(&path).is_err());
    }

    #[test]
    fn loads_text_and_csv_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let txt = temp.path().join("plates.TXT");
        fs::write(&txt, "ABC-1234\nDEF-5678\n").unwrap();
        let csv = temp.path().join("plates.csv");
        fs::write(&csv, "vehicle_number\nGHI-9012\n").unwrap();

        assert_eq!(load_identifiers(&txt).unwrap(), vec!["ABC-1234", "DEF-5678"]);
        assert_eq!(load_identifiers(&csv).unwrap(), vec!["GHI-9012"]);
    }
}
