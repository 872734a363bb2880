//! Line reader for the generated file.
//!
//! Each non-blank line holds exactly two comma-separated fields.

use std::path::{Path, PathBuf};

use kbatch_core::record::PersonRecord;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use super::LoadError;

#[derive(Debug)]
pub struct RecordReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl RecordReader {
    pub async fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).await.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    /// Next record, skipping blank lines. `None` at end of file.
    pub async fn next_record(&mut self) -> Result<Option<PersonRecord>, LoadError> {
        loop {
            let line = self.lines.next_line().await.map_err(|source| LoadError::Io {
                path: self.path.clone(),
                source,
            })?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;
            if let Some(record) = parse_line(&line, self.line_no)? {
                return Ok(Some(record));
            }
        }
    }
}

/// Parse one line. Blank lines yield `None`.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<PersonRecord>, LoadError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    match fields.as_slice() {
        [first, last] => Ok(Some(PersonRecord::new(*first, *last))),
        _ => Err(LoadError::Parse {
            line: line_no,
            message: format!("expected 2 fields, found {}", fields.len()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_two_trimmed_fields() {
        let record = parse_line(" Jill , Doe ", 1).unwrap();
        assert_eq!(record, Some(PersonRecord::new("Jill", "Doe")));
    }

    #[test]
    fn blank_line_is_skipped() {
        assert_eq!(parse_line("   ", 4).unwrap(), None);
    }

    #[test]
    fn wrong_field_count_names_line() {
        assert_matches!(parse_line("Jill", 3), Err(LoadError::Parse { line: 3, .. }));
        assert_matches!(
            parse_line("Jill,Doe,Extra", 7),
            Err(LoadError::Parse { line: 7, .. })
        );
    }

    #[tokio::test]
    async fn reads_file_and_counts_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Jane,Doe").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "John,Smith").unwrap();
        writeln!(file, "broken").unwrap();

        let mut reader = RecordReader::open(file.path()).await.unwrap();
        assert_eq!(
            reader.next_record().await.unwrap(),
            Some(PersonRecord::new("Jane", "Doe"))
        );
        assert_eq!(
            reader.next_record().await.unwrap(),
            Some(PersonRecord::new("John", "Smith"))
        );
        assert_matches!(
            reader.next_record().await,
            Err(LoadError::Parse { line: 4, .. })
        );
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RecordReader::open(&dir.path().join("absent.csv")).await;
        assert_matches!(result, Err(LoadError::Io { .. }));
    }
}
