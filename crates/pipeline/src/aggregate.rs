//! Aggregation: tally every annotation file into frequency tables.
//!
//! Files are read in name order. Fields with the wrong type degrade the way
//! [`AnnotationRecord`] describes. A file that is not valid JSON, or whose
//! top level is not an object, is malformed: by default it aborts the run
//! with an error naming the file; with
//! [`AggregateConfig::skip_malformed`] it is logged, skipped, and listed
//! in [`FrequencyReport::skipped`] instead.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tagtally_core::annotation::AnnotationRecord;
use tagtally_core::assets::scan_annotations;
use tagtally_core::error::CoreError;
use tagtally_core::frequency::{AnnotationTally, Dimension, FrequencyTable, COUNT_HEADER};

use crate::config::AggregateConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Input directory {} does not exist or is not a directory", .0.display())]
    MissingInputDir(PathBuf),

    #[error("Cannot list annotation directory: {0}")]
    Scan(#[source] CoreError),

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed annotation {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: CoreError,
    },

    #[error("Cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Frequency tables for one aggregation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrequencyReport {
    pub tally: AnnotationTally,
    /// Annotation files skipped as malformed (only with `skip_malformed`).
    pub skipped: Vec<String>,
}

impl FrequencyReport {
    pub fn table(&self, dimension: Dimension) -> &FrequencyTable {
        self.tally.table(dimension)
    }

    /// All seven tables, titled, in report order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, dimension) in Dimension::ALL.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&render_table(*dimension, self.table(*dimension)));
        }
        out
    }

    /// Export every table to `<dir>/<dimension csv file>`.
    ///
    /// Creates `dir` if needed and returns the written paths.
    pub fn write_csv(&self, dir: &Path) -> Result<Vec<PathBuf>, AggregateError> {
        std::fs::create_dir_all(dir).map_err(|source| AggregateError::OutputDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::with_capacity(Dimension::ALL.len());
        for dimension in Dimension::ALL {
            let path = dir.join(dimension.csv_file_name());
            write_table_csv(&path, dimension, self.table(dimension)).map_err(|source| {
                AggregateError::Csv {
                    path: path.clone(),
                    source,
                }
            })?;
            tracing::debug!(path = %path.display(), "Frequency table written");
            written.push(path);
        }
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Tally the annotations in `config.input_dir` and export CSV tables to
/// `config.output_dir`.
pub fn run_aggregation(config: &AggregateConfig) -> Result<FrequencyReport, AggregateError> {
    let report = aggregate_dir(&config.input_dir, config.skip_malformed)?;
    let written = report.write_csv(&config.output_dir)?;
    tracing::info!(
        records = report.tally.records(),
        skipped = report.skipped.len(),
        tables = written.len(),
        output_dir = %config.output_dir.display(),
        "Aggregation finished",
    );
    Ok(report)
}

/// Tally every `*.json` file directly inside `dir`.
pub fn aggregate_dir(dir: &Path, skip_malformed: bool) -> Result<FrequencyReport, AggregateError> {
    if !dir.is_dir() {
        return Err(AggregateError::MissingInputDir(dir.to_path_buf()));
    }
    let files = scan_annotations(dir).map_err(AggregateError::Scan)?;
    tracing::info!(files = files.len(), input_dir = %dir.display(), "Aggregating annotations");

    let mut report = FrequencyReport::default();
    for path in files {
        match read_record(&path) {
            Ok(record) => report.tally.add_record(&record),
            Err(AggregateError::Malformed { path, source }) if skip_malformed => {
                tracing::warn!(file = %path.display(), error = %source, "Skipping malformed annotation");
                report
                    .skipped
                    .push(path.file_name().map_or_else(
                        || path.display().to_string(),
                        |n| n.to_string_lossy().into_owned(),
                    ));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Read and leniently parse one annotation file.
pub fn read_record(path: &Path) -> Result<AnnotationRecord, AggregateError> {
    let text = std::fs::read_to_string(path).map_err(|source| AggregateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    AnnotationRecord::from_json_str(&text).map_err(|source| AggregateError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write `table` as a two-column CSV with a header row.
pub fn write_table_csv(
    path: &Path,
    dimension: Dimension,
    table: &FrequencyTable,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([dimension.label_header(), COUNT_HEADER])?;
    for (label, count) in table.ranked() {
        writer.write_record([label, count.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Titled, column-aligned text rendering of one table.
pub fn render_table(dimension: Dimension, table: &FrequencyTable) -> String {
    let ranked = table.ranked();
    let label_width = ranked
        .iter()
        .map(|(label, _)| label.chars().count())
        .chain(std::iter::once(dimension.label_header().chars().count()))
        .max()
        .unwrap_or(0);
    let count_width = ranked
        .iter()
        .map(|(_, count)| count.to_string().len())
        .chain(std::iter::once(COUNT_HEADER.len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{}:", dimension.title());
    if ranked.is_empty() {
        let _ = writeln!(out, "(no entries)");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<label_width$}  {:>count_width$}",
        dimension.label_header(),
        COUNT_HEADER
    );
    for (label, count) in ranked {
        let _ = writeln!(out, "{label:<label_width$}  {count:>count_width$}");
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
