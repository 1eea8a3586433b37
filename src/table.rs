//! Minimal tab-delimited table reading.
//!
//! Tables carry a mandatory header row; columns are addressed by exact
//! header name. Fields are split on single TAB characters with no quoting.

use std::io::{self, BufRead};

use thiserror::Error;

/// A single data row split into its tab-delimited fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    /// 1-based physical line number in the source file.
    pub line: u64,
    pub fields: Vec<String>,
}

impl Row {
    /// Returns the field at `index`, or `MalformedRow` if the row is too short.
    pub fn field(&self, index: usize) -> Result<&str, TableError> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or(TableError::MalformedRow {
                line: self.line,
                expected: index + 1,
                found: self.fields.len(),
            })
    }

    /// Ensures the row has at least `width` fields.
    pub fn require_width(&self, width: usize) -> Result<(), TableError> {
        if self.fields.len() < width {
            return Err(TableError::MalformedRow {
                line: self.line,
                expected: width,
                found: self.fields.len(),
            });
        }
        Ok(())
    }

    pub fn to_line(&self) -> String {
        self.fields.join("\t")
    }
}

/// Header row of a table, kept verbatim alongside its parsed column names.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
    raw: String,
    columns: Vec<String>,
}

impl Header {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let columns = raw.split('\t').map(str::to_string).collect();
        Self { raw, columns }
    }

    /// The header line exactly as read, without its line terminator.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Resolves a column name to its position by exact match.
    pub fn resolve(&self, field: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|column| column == field)
            .ok_or_else(|| TableError::MissingColumn {
                field: field.to_string(),
            })
    }
}

/// Errors raised while reading a tab-delimited table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error at line {line}")]
    Io {
        line: u64,
        #[source]
        source: io::Error,
    },
    #[error("table is empty: expected a header row")]
    MissingHeader,
    #[error("column '{field}' not found in header")]
    MissingColumn { field: String },
    #[error("line {line}: expected at least {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Iterator over the lines of a tab-delimited table.
///
/// The header must be taken with [`Reader::read_header`] before iterating rows.
pub struct Reader<R> {
    inner: R,
    line: u64,
    buf: String,
}

impl<R> Reader<R>
where
    R: BufRead,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 0,
            buf: String::new(),
        }
    }

    pub fn read_header(&mut self) -> Result<Header, TableError> {
        match self.next_line()? {
            Some(raw) => Ok(Header::new(raw)),
            None => Err(TableError::MissingHeader),
        }
    }

    /// Line number of the most recently read line.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_line(&mut self) -> Result<Option<String>, TableError> {
        loop {
            self.buf.clear();
            let read = self
                .inner
                .read_line(&mut self.buf)
                .map_err(|source| TableError::Io {
                    line: self.line + 1,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            let trimmed = self.buf.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }
}

impl<R> Iterator for Reader<R>
where
    R: BufRead,
{
    type Item = Result<Row, TableError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Ok(Some(raw)) => Some(Ok(Row {
                line: self.line,
                fields: raw.split('\t').map(str::to_string).collect(),
            })),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_columns_by_exact_name() {
        let header = Header::new("SNP\tA1\tA2\tBETA");
        assert_eq!(header.resolve("A2").unwrap(), 2);
        assert!(matches!(
            header.resolve("a2"),
            Err(TableError::MissingColumn { field }) if field == "a2"
        ));
    }

    #[test]
    fn reader_skips_blank_lines_and_tracks_line_numbers() {
        let data = b"\nSNP\tA1\r\n\nrs1\tA\r\nrs2\tG\n";
        let mut reader = Reader::new(&data[..]);
        let header = reader.read_header().unwrap();
        assert_eq!(header.raw(), "SNP\tA1");

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.line, 4);
        assert_eq!(first.fields, vec!["rs1", "A"]);

        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.line, 5);
        assert!(reader.next().is_none());
    }

    #[test]
    fn empty_input_has_no_header() {
        let mut reader = Reader::new(&b"\n\n"[..]);
        assert!(matches!(reader.read_header(), Err(TableError::MissingHeader)));
    }

    #[test]
    fn short_row_reports_malformed() {
        let row = Row {
            line: 7,
            fields: vec!["rs1".into(), "A".into()],
        };
        assert_eq!(row.field(1).unwrap(), "A");
        match row.require_width(4) {
            Err(TableError::MalformedRow {
                line,
                expected,
                found,
            }) => {
                assert_eq!((line, expected, found), (7, 4, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn header_keeps_raw_text() {
        let header = Header::new("SNP\tA1\t\tA2 ");
        assert_eq!(header.raw(), "SNP\tA1\t\tA2 ");
        assert_eq!(header.columns().len(), 4);
        assert_eq!(header.resolve("A2 ").unwrap(), 3);
    }
}
