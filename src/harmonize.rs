//! Allele harmonization of summary statistics against a reference table.
//!
//! Each target row whose variant appears in the reference with its alleles
//! in swapped orientation gets its alleles rewritten to the reference
//! orientation and its effect value inverted. Every other row passes
//! through unchanged apart from the effect value being reformatted.
//!
//! Output is all-or-nothing: rows are streamed into a temporary file next to
//! the destination, which is only renamed into place once every row has
//! been processed.

use std::{
    io::{self, BufRead, BufWriter, Write},
    num::ParseFloatError,
    path::{Path, PathBuf},
};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{
    effect::{EffectType, UnknownEffectType, format_effect},
    output,
    reference::{AllelePair, Orientation, ReferenceColumns, ReferenceError, ReferenceIndex},
    smart_reader,
    table::{self, TableError},
};

/// Header names of the summary-statistics columns used for harmonization.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SumstatsColumns {
    pub id: String,
    pub effect_allele: String,
    pub other_allele: String,
    pub effect: String,
}

impl Default for SumstatsColumns {
    fn default() -> Self {
        Self {
            id: String::from("SNP"),
            effect_allele: String::from("A1"),
            other_allele: String::from("A2"),
            effect: String::from("BETA"),
        }
    }
}

/// Configuration for harmonizing one summary-statistics file.
#[derive(Clone, Debug)]
pub struct HarmonizeConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub columns: SumstatsColumns,
    pub effect_type: EffectType,
}

/// Row counts of a completed harmonization run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct HarmonizeSummary {
    pub total_rows: usize,
    /// Rows matching the reference in swapped orientation; alleles and effect flipped.
    pub flipped_rows: usize,
    /// Rows already in reference orientation.
    pub aligned_rows: usize,
    /// Rows whose variant is in the reference but whose alleles match neither orientation.
    pub mismatched_rows: usize,
    /// Rows whose variant is absent from the reference.
    pub missing_rows: usize,
}

#[derive(Debug, Error)]
pub enum HarmonizeError {
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create temporary output for {}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move finished output into place at {}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while writing harmonized output")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("line {line}: cannot parse effect value '{raw}' as a number")]
    NumericParse {
        line: u64,
        raw: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("line {line}: cannot flip zero odds ratio of {variant_id}: reciprocal is undefined")]
    ZeroOddsRatio { line: u64, variant_id: String },
    #[error(transparent)]
    UnknownEffectType(#[from] UnknownEffectType),
}

/// Details of a row matched against the reference, handed to a [`FlipReporter`].
///
/// Alleles are as read from the input. For rows left untouched
/// `effect_after` equals `effect_before`.
#[derive(Debug, Clone, Copy)]
pub struct RowEvent<'a> {
    pub line: u64,
    pub variant_id: &'a str,
    pub effect_allele: &'a str,
    pub other_allele: &'a str,
    pub reference: &'a AllelePair,
    pub effect_before: f64,
    pub effect_after: f64,
}

/// Receives per-row harmonization decisions as they are made.
pub trait FlipReporter {
    fn flipped(&mut self, event: &RowEvent<'_>);

    fn mismatched(&mut self, _event: &RowEvent<'_>) {}
}

/// Reports decisions through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FlipReporter for TracingReporter {
    fn flipped(&mut self, event: &RowEvent<'_>) {
        tracing::info!(
            line = event.line,
            "Flipping SNP {}: Alleles, ({},{})->({},{}), Effect {:.3} -> {:.3}",
            event.variant_id,
            event.effect_allele,
            event.other_allele,
            event.reference.effect(),
            event.reference.other(),
            event.effect_before,
            event.effect_after,
        );
    }

    fn mismatched(&mut self, event: &RowEvent<'_>) {
        tracing::debug!(
            line = event.line,
            "Leaving SNP {} untouched: alleles ({},{}) match neither orientation of reference {}",
            event.variant_id,
            event.effect_allele,
            event.other_allele,
            event.reference,
        );
    }
}

struct ColumnIndices {
    id: usize,
    effect_allele: usize,
    other_allele: usize,
    effect: usize,
    width: usize,
}

impl ColumnIndices {
    fn resolve(header: &table::Header, columns: &SumstatsColumns) -> Result<Self, TableError> {
        let id = header.resolve(&columns.id)?;
        let effect_allele = header.resolve(&columns.effect_allele)?;
        let other_allele = header.resolve(&columns.other_allele)?;
        let effect = header.resolve(&columns.effect)?;
        let width = [id, effect_allele, other_allele, effect]
            .into_iter()
            .max()
            .unwrap_or_default()
            + 1;
        Ok(Self {
            id,
            effect_allele,
            other_allele,
            effect,
            width,
        })
    }
}

/// Harmonizes a summary-statistics stream against `index`, writing rows to `writer`.
///
/// The header is copied verbatim. Any error aborts the stream; callers that
/// need all-or-nothing output should use [`harmonize_file`].
pub fn harmonize<R, W>(
    reader: R,
    mut writer: W,
    columns: &SumstatsColumns,
    effect_type: EffectType,
    index: &ReferenceIndex,
    reporter: &mut dyn FlipReporter,
) -> Result<HarmonizeSummary, HarmonizeError>
where
    R: BufRead,
    W: Write,
{
    let mut reader = table::Reader::new(reader);
    let header = reader.read_header()?;
    let idx = ColumnIndices::resolve(&header, columns)?;

    writer.write_all(header.raw().as_bytes())?;
    writer.write_all(b"\n")?;

    let mut summary = HarmonizeSummary::default();
    for row in reader {
        let mut row = row?;
        row.require_width(idx.width)?;

        let raw_effect = &row.fields[idx.effect];
        let effect: f64 = raw_effect
            .trim()
            .parse()
            .map_err(|source| HarmonizeError::NumericParse {
                line: row.line,
                raw: raw_effect.clone(),
                source,
            })?;
        summary.total_rows += 1;

        let mut effect_out = effect;
        match index.get(&row.fields[idx.id]) {
            None => summary.missing_rows += 1,
            Some(reference) => {
                let effect_allele = &row.fields[idx.effect_allele];
                let other_allele = &row.fields[idx.other_allele];
                match reference.orientation(effect_allele, other_allele) {
                    Orientation::Same => summary.aligned_rows += 1,
                    Orientation::Mismatch => {
                        reporter.mismatched(&RowEvent {
                            line: row.line,
                            variant_id: &row.fields[idx.id],
                            effect_allele,
                            other_allele,
                            reference,
                            effect_before: effect,
                            effect_after: effect,
                        });
                        summary.mismatched_rows += 1;
                    }
                    Orientation::Swapped => {
                        effect_out = effect_type.invert(effect).map_err(|_| {
                            HarmonizeError::ZeroOddsRatio {
                                line: row.line,
                                variant_id: row.fields[idx.id].clone(),
                            }
                        })?;
                        reporter.flipped(&RowEvent {
                            line: row.line,
                            variant_id: &row.fields[idx.id],
                            effect_allele,
                            other_allele,
                            reference,
                            effect_before: effect,
                            effect_after: effect_out,
                        });
                        row.fields[idx.effect_allele] = reference.effect().to_string();
                        row.fields[idx.other_allele] = reference.other().to_string();
                        summary.flipped_rows += 1;
                    }
                }
            }
        }

        row.fields[idx.effect] = format_effect(effect_out);
        writer.write_all(row.to_line().as_bytes())?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(summary)
}

/// Harmonizes `config.input` into `config.output` atomically.
///
/// On failure the destination is left untouched: no partial table is ever
/// visible at `config.output`.
pub fn harmonize_file(
    config: &HarmonizeConfig,
    index: &ReferenceIndex,
    reporter: &mut dyn FlipReporter,
) -> Result<HarmonizeSummary, HarmonizeError> {
    tracing::info!(
        input = %config.input.display(),
        output = %config.output.display(),
        effect_type = %config.effect_type,
        "harmonizing summary statistics"
    );

    let input = smart_reader::open_input(&config.input).map_err(|source| HarmonizeError::Open {
        path: config.input.clone(),
        source,
    })?;

    let staging = NamedTempFile::new_in(output_dir(&config.output)).map_err(|source| {
        HarmonizeError::Create {
            path: config.output.clone(),
            source,
        }
    })?;
    let mut writer = BufWriter::new(staging);

    let summary = harmonize(
        input,
        &mut writer,
        &config.columns,
        config.effect_type,
        index,
        reporter,
    )?;

    let staging = writer
        .into_inner()
        .map_err(|err| HarmonizeError::Io(err.into_error()))?;
    staging
        .as_file()
        .sync_all()
        .map_err(HarmonizeError::Io)?;
    output::publish(staging, &config.output).map_err(|err| HarmonizeError::Persist {
        path: config.output.clone(),
        source: err.error,
    })?;

    tracing::info!(
        total = summary.total_rows,
        flipped = summary.flipped_rows,
        aligned = summary.aligned_rows,
        mismatched = summary.mismatched_rows,
        missing = summary.missing_rows,
        "harmonization finished"
    );

    Ok(summary)
}

/// Builds the reference index and harmonizes one file against it.
pub fn flip_alleles(
    reference: &Path,
    reference_columns: &ReferenceColumns,
    config: &HarmonizeConfig,
    reporter: &mut dyn FlipReporter,
) -> Result<HarmonizeSummary, HarmonizeError> {
    let index = ReferenceIndex::build(reference, reference_columns)?;
    harmonize_file(config, &index, reporter)
}

fn output_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
