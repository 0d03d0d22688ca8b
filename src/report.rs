//! Tabulating matches and quantifications and writing them out.
//!
//! A search produces three tables, each written to its own file in the output directory:
//!
//! | File | Rows | Columns |
//! |---|---|---|
//! | `precursor_matches.<ext>` | one per [`PrecursorMatch`] | [`PRECURSOR_MATCH_COLUMNS`] |
//! | `analyte_matches.<ext>` | one per [`FragmentMatch`] | [`FRAGMENT_MATCH_COLUMNS`] |
//! | `quantification.<ext>` | one per quantified analyte | [`QUANTIFICATION_COLUMNS`] |
//!
//! Every table is rendered in memory before any file is written, so a failed run does not
//! leave partial output behind.
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};

use crate::error::{ConfigurationError, DomainInvariantError, InspectError};
use crate::matches::{AnalyteMatch, FragmentMatch, MatchBuckets, PrecursorMatch};
use crate::quantification::AnalyteQuantification;

pub const PRECURSOR_MATCH_COLUMNS: [&str; 6] = [
    "analyte",
    "filename",
    "spectrum_id",
    "theoretical_precursor_mz",
    "experimental_precursor_mz",
    "experimental_precursor_intensity",
];

pub const FRAGMENT_MATCH_COLUMNS: [&str; 12] = [
    "analyte",
    "filename",
    "spectrum_id",
    "theoretical_precursor_mz",
    "experimental_precursor_mz",
    "experimental_precursor_charge",
    "theoretical_quantifier_mz",
    "experimental_quantifier_mz",
    "experimental_quantifier_intensity",
    "theoretical_qualifier_mz",
    "experimental_qualifier_mz",
    "experimental_qualifier_intensity",
];

pub const QUANTIFICATION_COLUMNS: [&str; 4] = [
    "analyte",
    "average_quantifier_mz",
    "average_quantifier_intensity",
    "count",
];

/// The file formats tables can be written in
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// Tab-separated text
    #[default]
    Tsv,
    /// An Office Open XML spreadsheet, requires the `xlsx` feature
    Xlsx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tsv => "tsv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Select the format from the extension of `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ext.parse(),
            None => Err(ConfigurationError::UnknownOutputFormat(
                path.display().to_string(),
            )),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_start_matches('.').to_ascii_lowercase();
        match name.as_str() {
            "tsv" | "txt" => Ok(Self::Tsv),
            "xlsx" => {
                if cfg!(feature = "xlsx") {
                    Ok(Self::Xlsx)
                } else {
                    Err(ConfigurationError::FeatureNotEnabled("xlsx"))
                }
            }
            _ => Err(ConfigurationError::UnknownOutputFormat(s.to_string())),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single value of a table row
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Float(f64),
    Integer(i64),
    Empty,
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Float(v) => ryu::Buffer::new().format(*v).to_string(),
            Self::Integer(v) => itoa::Buffer::new().format(*v).to_string(),
            Self::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Empty)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Self::Integer(value as i64)
    }
}

/// A named table with a fixed column order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: &'static str,
    columns: &'static [&'static str],
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            name,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Render the table as tab-separated text with a header row
    pub fn to_tsv(&self) -> Result<Vec<u8>, InspectError> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(vec![]);

        wtr.write_byte_record(&csv::ByteRecord::from(self.columns.to_vec()))?;
        for row in self.rows.iter() {
            let mut record = csv::ByteRecord::new();
            for cell in row {
                record.push_field(cell.render().as_bytes());
            }
            wtr.write_byte_record(&record)?;
        }

        wtr.flush()?;
        let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
        Ok(bytes)
    }

    /// Render the table as a workbook with a single worksheet named after the table
    #[cfg(feature = "xlsx")]
    pub fn to_xlsx(&self) -> Result<Vec<u8>, InspectError> {
        use rust_xlsxwriter::{DocProperties, ExcelDateTime, Workbook};

        // A fixed creation time keeps workbooks of the same table byte-identical
        let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
        let mut workbook = Workbook::new();
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));
        let sheet = workbook.add_worksheet();
        sheet.set_name(self.name)?;

        for (col, name) in self.columns.iter().enumerate() {
            sheet.write_string(0, col as u16, *name)?;
        }
        for (i, row) in self.rows.iter().enumerate() {
            let i = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(s) => {
                        sheet.write_string(i, col, s.as_str())?;
                    }
                    Cell::Float(v) => {
                        sheet.write_number(i, col, *v)?;
                    }
                    Cell::Integer(v) => {
                        sheet.write_number(i, col, *v as f64)?;
                    }
                    Cell::Empty => {}
                }
            }
        }
        Ok(workbook.save_to_buffer()?)
    }

    pub fn render(&self, format: OutputFormat) -> Result<Vec<u8>, InspectError> {
        match format {
            OutputFormat::Tsv => self.to_tsv(),
            #[cfg(feature = "xlsx")]
            OutputFormat::Xlsx => self.to_xlsx(),
            #[cfg(not(feature = "xlsx"))]
            OutputFormat::Xlsx => Err(ConfigurationError::FeatureNotEnabled("xlsx").into()),
        }
    }
}

fn precursor_row(record: &PrecursorMatch<'_>) -> Vec<Cell> {
    vec![
        record.analyte.name().into(),
        record.filename.as_ref().into(),
        record.spectrum_id.as_str().into(),
        record.analyte.precursor_mz().into(),
        record.peak.mz.into(),
        record.peak.intensity.into(),
    ]
}

fn fragment_row(record: &FragmentMatch<'_>) -> Vec<Cell> {
    let analyte = record.analyte;
    vec![
        analyte.name().into(),
        record.filename.as_ref().into(),
        record.spectrum_id.as_str().into(),
        analyte.precursor_mz().into(),
        record.precursor.mz.into(),
        record.precursor.charge.into(),
        analyte.quantifier_mz().into(),
        record.quantifier.mz.into(),
        record.quantifier.intensity.into(),
        analyte.qualifier_mz().into(),
        record.qualifier.map(|p| p.mz).into(),
        record.qualifier.map(|p| p.intensity).into(),
    ]
}

/// The row of the table `record` belongs to, which is the precursor match table for
/// [`AnalyteMatch::Precursor`] and the analyte match table for [`AnalyteMatch::Fragment`].
pub fn match_row(record: &AnalyteMatch<'_>) -> Vec<Cell> {
    match record {
        AnalyteMatch::Precursor(m) => precursor_row(m),
        AnalyteMatch::Fragment(m) => fragment_row(m),
    }
}

pub fn quantification_row(quant: &AnalyteQuantification<'_>) -> Vec<Cell> {
    vec![
        quant.name().into(),
        quant.average_quantifier_mz.into(),
        quant.average_quantifier_intensity.into(),
        quant.count.into(),
    ]
}

/// The three tables of a finished search
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub precursor_matches: Table,
    pub analyte_matches: Table,
    pub quantification: Table,
}

impl Report {
    pub fn tables(&self) -> [&Table; 3] {
        [
            &self.precursor_matches,
            &self.analyte_matches,
            &self.quantification,
        ]
    }

    /// Write every table to `directory` as `<table name>.<ext>`, returning the paths written.
    ///
    /// Nothing is written unless all tables render successfully.
    pub fn write_to_dir<P: AsRef<Path>>(
        &self,
        directory: P,
        format: OutputFormat,
    ) -> Result<Vec<PathBuf>, InspectError> {
        let directory = directory.as_ref();
        let rendered = self
            .tables()
            .into_iter()
            .map(|table| Ok((table, table.render(format)?)))
            .collect::<Result<Vec<_>, InspectError>>()?;

        // Stage every file under a temporary name first so a failed write leaves no table
        // behind, then move them into place.
        let mut staged: Vec<(PathBuf, PathBuf, usize)> = Vec::with_capacity(rendered.len());
        for (table, bytes) in rendered {
            let file_name = format!("{}.{}", table.name(), format.extension());
            let staging = directory.join(format!(".{file_name}.partial"));
            if let Err(e) = fs::write(&staging, bytes) {
                discard(staged.iter().map(|(s, _, _)| s).chain([&staging]));
                return Err(e.into());
            }
            staged.push((staging, directory.join(file_name), table.len()));
        }

        let mut paths: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for (i, (staging, path, n_rows)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(staging, path) {
                discard(paths.iter().chain(staged[i..].iter().map(|(s, _, _)| s)));
                return Err(e.into());
            }
            info!("Wrote {n_rows} rows to {}", path.display());
            paths.push(path.clone());
        }
        Ok(paths)
    }
}

fn discard<'p, I: IntoIterator<Item = &'p PathBuf>>(paths: I) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {e}", path.display());
            }
        }
    }
}

/// Builds a [`Report`] one record at a time
#[derive(Debug, Clone, PartialEq)]
pub struct ReportAssembler {
    report: Report,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self {
            report: Report {
                precursor_matches: Table::new("precursor_matches", &PRECURSOR_MATCH_COLUMNS),
                analyte_matches: Table::new("analyte_matches", &FRAGMENT_MATCH_COLUMNS),
                quantification: Table::new("quantification", &QUANTIFICATION_COLUMNS),
            },
        }
    }
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_match(&mut self, record: &AnalyteMatch<'_>) {
        let row = match_row(record);
        match record {
            AnalyteMatch::Precursor(_) => self.report.precursor_matches.push_row(row),
            AnalyteMatch::Fragment(_) => self.report.analyte_matches.push_row(row),
        }
    }

    /// Add a summary row. Summaries of analytes without any match are left out.
    pub fn add_quantification(&mut self, quant: &AnalyteQuantification<'_>) {
        if quant.count > 0 {
            self.report
                .quantification
                .push_row(quantification_row(quant));
        }
    }

    /// Tabulate every match in `buckets`, grouped by analyte, and the quantification of each
    /// analyte with fragment matches.
    pub fn add_buckets(&mut self, buckets: &MatchBuckets<'_>) -> Result<(), DomainInvariantError> {
        for m in buckets.precursor_matches() {
            self.report.precursor_matches.push_row(precursor_row(m));
        }
        for m in buckets.fragment_matches() {
            self.report.analyte_matches.push_row(fragment_row(m));
        }
        for quant in AnalyteQuantification::from_buckets(buckets)? {
            self.add_quantification(&quant);
        }
        Ok(())
    }

    pub fn finish(self) -> Report {
        self.report
    }

    pub fn from_buckets(buckets: &MatchBuckets<'_>) -> Result<Report, DomainInvariantError> {
        let mut this = Self::new();
        this.add_buckets(buckets)?;
        Ok(this.finish())
    }
}
