use std::{
    collections::HashMap,
    fmt,
    io::{self, BufRead},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{
    smart_reader,
    table::{self, TableError},
};

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to open reference {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Table(#[from] TableError),
}

/// The two alleles recorded for a variant, in a specific orientation.
///
/// Alleles are stored upper-cased so orientation checks are exact matches.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AllelePair {
    effect: String,
    other: String,
}

impl AllelePair {
    pub fn new(effect: &str, other: &str) -> Self {
        Self {
            effect: effect.to_uppercase(),
            other: other.to_uppercase(),
        }
    }

    pub fn effect(&self) -> &str {
        &self.effect
    }

    pub fn other(&self) -> &str {
        &self.other
    }

    /// Orientation of `(effect, other)` relative to this pair.
    ///
    /// The candidate alleles are case-normalised before comparison.
    pub fn orientation(&self, effect: &str, other: &str) -> Orientation {
        let effect = effect.to_uppercase();
        let other = other.to_uppercase();
        if effect == self.effect && other == self.other {
            Orientation::Same
        } else if effect == self.other && other == self.effect {
            Orientation::Swapped
        } else {
            Orientation::Mismatch
        }
    }
}

impl fmt::Display for AllelePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.effect, self.other)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Orientation {
    Same,
    Swapped,
    /// Neither orientation matches: different alleles, a partial match, or
    /// a strand/multi-allelic difference that is not resolved here.
    Mismatch,
}

/// Header names of the reference table columns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceColumns {
    pub id: String,
    pub effect_allele: String,
    pub other_allele: String,
}

impl Default for ReferenceColumns {
    fn default() -> Self {
        Self {
            id: String::from("SNP"),
            effect_allele: String::from("A1"),
            other_allele: String::from("A2"),
        }
    }
}

/// Variant identifier to allele pair lookup built from a reference table.
///
/// A repeated identifier keeps only its last occurrence.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    alleles: HashMap<String, AllelePair>,
    rows_read: usize,
    overwritten: usize,
}

impl ReferenceIndex {
    /// Reads a (optionally gzipped) reference table into an index.
    pub fn build<P: AsRef<Path>>(
        path: P,
        columns: &ReferenceColumns,
    ) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let reader = smart_reader::open_input(path).map_err(|source| ReferenceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_reader(reader, columns)?;

        tracing::info!(
            reference = %path.display(),
            variants = index.len(),
            rows = index.rows_read,
            "indexed reference alleles"
        );
        if index.overwritten > 0 {
            tracing::warn!(
                duplicates = index.overwritten,
                "reference repeats variant identifiers; keeping the last occurrence of each"
            );
        }

        Ok(index)
    }

    pub fn from_reader<R: BufRead>(
        reader: R,
        columns: &ReferenceColumns,
    ) -> Result<Self, ReferenceError> {
        let mut reader = table::Reader::new(reader);
        let header = reader.read_header()?;
        let id_idx = header.resolve(&columns.id)?;
        let effect_idx = header.resolve(&columns.effect_allele)?;
        let other_idx = header.resolve(&columns.other_allele)?;
        let width = id_idx.max(effect_idx).max(other_idx) + 1;

        let mut index = Self::default();
        for row in reader {
            let row = row?;
            row.require_width(width)?;
            let pair = AllelePair::new(row.field(effect_idx)?, row.field(other_idx)?);
            index.insert(row.field(id_idx)?.to_string(), pair);
            index.rows_read += 1;
        }

        Ok(index)
    }

    /// Inserts a pair, replacing any earlier pair for the same identifier.
    pub fn insert(&mut self, id: String, pair: AllelePair) {
        if self.alleles.insert(id, pair).is_some() {
            self.overwritten += 1;
        }
    }

    pub fn get(&self, id: &str) -> Option<&AllelePair> {
        self.alleles.get(id)
    }

    pub fn len(&self) -> usize {
        self.alleles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alleles.is_empty()
    }

    /// Number of data rows read from the reference table.
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Number of rows that replaced an earlier entry for the same identifier.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }
}

impl FromIterator<(String, AllelePair)> for ReferenceIndex {
    fn from_iter<I: IntoIterator<Item = (String, AllelePair)>>(iter: I) -> Self {
        let mut index = Self::default();
        for (id, pair) in iter {
            index.insert(id, pair);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ReferenceColumns {
        ReferenceColumns {
            id: "rsid".into(),
            effect_allele: "effect_allele".into(),
            other_allele: "other_allele".into(),
        }
    }

    #[test]
    fn duplicate_ids_keep_last_occurrence() {
        let data = "rsid\teffect_allele\tother_allele\n\
                    rs123\tA\tC\n\
                    rs456\tt\tg\n\
                    rs123\tG\tT\n";
        let index = ReferenceIndex::from_reader(data.as_bytes(), &columns()).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.rows_read(), 3);
        assert_eq!(index.overwritten(), 1);
        assert_eq!(index.get("rs123"), Some(&AllelePair::new("G", "T")));
        let rs456 = index.get("rs456").unwrap();
        assert_eq!((rs456.effect(), rs456.other()), ("T", "G"));
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let data = "rsid\tA1\tother_allele\nrs1\tA\tG\n";
        let err = ReferenceIndex::from_reader(data.as_bytes(), &columns()).unwrap_err();
        assert!(matches!(
            err,
            ReferenceError::Table(TableError::MissingColumn { ref field }) if field == "effect_allele"
        ));
    }

    #[test]
    fn short_row_is_malformed() {
        let data = "rsid\teffect_allele\tother_allele\nrs1\tA\tG\nrs2\tA\n";
        let err = ReferenceIndex::from_reader(data.as_bytes(), &columns()).unwrap_err();
        assert!(matches!(
            err,
            ReferenceError::Table(TableError::MalformedRow {
                line: 3,
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn columns_resolve_in_any_order() {
        let data = "other_allele\tCHR\trsid\teffect_allele\nC\t1\trs9\ta\n";
        let index = ReferenceIndex::from_reader(data.as_bytes(), &columns()).unwrap();
        assert_eq!(index.get("rs9"), Some(&AllelePair::new("A", "C")));
    }

    #[test]
    fn orientation_is_case_insensitive() {
        let pair = AllelePair::new("a", "g");
        assert_eq!(pair.orientation("A", "G"), Orientation::Same);
        assert_eq!(pair.orientation("g", "a"), Orientation::Swapped);
        assert_eq!(pair.orientation("A", "T"), Orientation::Mismatch);
        assert_eq!(pair.orientation("G", "G"), Orientation::Mismatch);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReferenceIndex::build(dir.path().join("absent.tsv"), &columns()).unwrap_err();
        match err {
            ReferenceError::Open { path, source } => {
                assert_eq!(path, dir.path().join("absent.tsv"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
