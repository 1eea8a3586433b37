//! Structured run report for downstream tool consumption.
//!
//! Written as JSON alongside the harmonized output: which files went in,
//! which effect model was applied, and how many rows were flipped.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::{effect::EffectType, harmonize::HarmonizeSummary};

/// Complete report of a harmonization run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Tool version
    pub version: String,
    /// Timestamp of run (RFC 3339)
    pub timestamp: String,
    pub sumstats: String,
    pub reference: ReferenceInfo,
    pub output: String,
    pub effect_type: EffectType,
    pub statistics: HarmonizeSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceInfo {
    pub path: String,
    pub variants: usize,
    pub rows: usize,
    /// Rows that replaced an earlier row for the same identifier.
    pub duplicate_ids: usize,
}

impl RunReport {
    pub fn new(
        sumstats: &Path,
        reference: ReferenceInfo,
        output: &Path,
        effect_type: EffectType,
        statistics: HarmonizeSummary,
    ) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
            sumstats: sumstats.display().to_string(),
            reference,
            output: output.display().to_string(),
            effect_type,
            statistics,
        }
    }

    /// Location of the report for a given output: `out.tsv` -> `out_report.json`.
    pub fn path_for(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy();
        output_path.with_file_name(format!("{stem}_report.json"))
    }

    pub fn write(&self, output_path: &Path) -> std::io::Result<PathBuf> {
        let report_path = Self::path_for(output_path);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        std::fs::write(&report_path, json)?;
        tracing::info!("Wrote run report to {}", report_path.display());

        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_path_sits_next_to_output() {
        assert_eq!(
            RunReport::path_for(Path::new("/data/out.tsv")),
            PathBuf::from("/data/out_report.json")
        );
    }

    #[test]
    fn writes_effect_type_label_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("harmonized.tsv");
        let report = RunReport::new(
            Path::new("sumstats.tsv"),
            ReferenceInfo {
                path: "reference.tsv".into(),
                variants: 2,
                rows: 3,
                duplicate_ids: 1,
            },
            &output,
            EffectType::Multiplicative,
            HarmonizeSummary {
                total_rows: 5,
                flipped_rows: 2,
                aligned_rows: 1,
                mismatched_rows: 0,
                missing_rows: 2,
            },
        );

        let path = report.write(&output).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["effect_type"], "OR");
        assert_eq!(json["statistics"]["flipped_rows"], 2);
        assert_eq!(json["reference"]["duplicate_ids"], 1);
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
