use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems with the run configuration or the target definition list. These are detected
/// before any spectrum is read whenever possible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Unknown output format `{0}`, expected one of `tsv` or `xlsx`")]
    UnknownOutputFormat(String),
    #[error("Unknown time unit `{0}`")]
    UnknownTimeUnit(String),
    #[error("Malformed numeric value for {field}: `{value}`")]
    MalformedNumber { field: String, value: String },
    #[error("{field} must not be negative, got {value}")]
    NegativeTolerance { field: &'static str, value: f64 },
    #[error("Retention time window start {start} is after its end {stop}")]
    InvalidRetentionTimeWindow { start: f64, stop: f64 },
    #[error("Malformed target definition on line {line}: {reason}")]
    MalformedTargetRow { line: u64, reason: String },
    #[error("Analyte `{name}` is defined more than once")]
    DuplicateAnalyte { name: String },
    #[error("Could not infer the spectrum file format of {0}")]
    UnknownSpectrumFormat(PathBuf),
    #[error("{0} support was not enabled at compile time")]
    FeatureNotEnabled(&'static str),
}

/// A spectrum whose content cannot be interpreted safely. Matching stops at the first one
/// rather than pairing m/z and intensity values that do not belong together.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralInputError {
    #[error("Spectrum {spectrum_id} has {mz_len} m/z values but {intensity_len} intensities")]
    ArrayLengthMismatch {
        spectrum_id: String,
        mz_len: usize,
        intensity_len: usize,
    },
    #[error("Spectrum {spectrum_id} describes a precursor without a selected ion m/z")]
    MissingPrecursorMz { spectrum_id: String },
    #[error("Failed to read the signal arrays of spectrum {spectrum_id}: {reason}")]
    ArrayRetrieval { spectrum_id: String, reason: String },
}

/// Misuse of the aggregation API
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainInvariantError {
    #[error("Cannot group matches of analyte `{found}` with matches of analyte `{expected}`")]
    InconsistentGrouping { expected: String, found: String },
    #[error("Cannot quantify an analyte without any matches")]
    EmptyBatch,
}

/// Any error that aborts a search run
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Configuration error: {0}")]
    Configuration(
        #[from]
        #[source]
        ConfigurationError,
    ),
    #[error("Invalid spectrum in {path}: {source}")]
    InputFile {
        path: PathBuf,
        #[source]
        source: StructuralInputError,
    },
    #[error("{0}")]
    DomainInvariant(
        #[from]
        #[source]
        DomainInvariantError,
    ),
    #[error("An I/O error occurred: {0}")]
    Io(
        #[from]
        #[source]
        io::Error,
    ),
    #[error("An error occurred while reading or writing delimited text: {0}")]
    Csv(
        #[from]
        #[source]
        csv::Error,
    ),
    #[cfg(feature = "xlsx")]
    #[error("An error occurred while writing a workbook: {0}")]
    Xlsx(
        #[from]
        #[source]
        rust_xlsxwriter::XlsxError,
    ),
}

impl InspectError {
    pub fn in_file<P: Into<PathBuf>>(path: P, source: StructuralInputError) -> Self {
        Self::InputFile {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = InspectError> = std::result::Result<T, E>;
