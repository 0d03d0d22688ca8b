//! `mzinspect` searches mass spectrometry runs for a list of targeted analytes.
//!
//! Each [`Analyte`] is described by the m/z of its precursor ion and of two fragment ions, a
//! quantifier and a qualifier, each surrounded by a ppm [`ToleranceWindow`]. Full scan (MS1)
//! spectra are searched for the precursor, fragment (MS2) spectra for the quantifier and
//! qualifier. The quantifier signal of every analyte is then averaged over all of its
//! fragment matches.
//!
//! ```no_run
//! use mzinspect::prelude::*;
//! use mzinspect::{
//!     AnalyteList, DuplicateAnalytePolicy, OutputFormat, ReportAssembler, SearchParameters,
//!     TargetedSearch,
//! };
//!
//! # fn main() -> Result<(), mzinspect::InspectError> {
//! let params = SearchParameters::new(0.0, 600.0, 10.0, 10.0, 20.0, 20.0)?;
//! let analytes = AnalyteList::open_path(
//!     "targets.tsv",
//!     params.precursor_tolerance,
//!     params.fragment_tolerance,
//!     DuplicateAnalytePolicy::Merge,
//! )?;
//! let buckets = TargetedSearch::new(&analytes, params).search_files(&["run.mzML"])?;
//! for (name, matches) in buckets.fragment_groups() {
//!     println!("{name}: {} fragment spectra", matches.len());
//! }
//! let report = ReportAssembler::from_buckets(&buckets)?;
//! report.write_to_dir("results", OutputFormat::Tsv)?;
//! # Ok(())
//! # }
//! ```
pub mod analyte;
pub mod classify;
pub mod error;
pub mod matches;
pub mod prelude;
pub mod quantification;
pub mod report;
pub mod search;
pub mod spectrum;
pub mod time;
pub mod tolerance;

pub use crate::analyte::{Analyte, AnalyteList, DuplicateAnalytePolicy};
pub use crate::classify::SpectrumClassifier;
pub use crate::error::{
    ConfigurationError, DomainInvariantError, InspectError, StructuralInputError,
};
pub use crate::matches::{
    AnalyteMatch, FragmentMatch, MatchBuckets, Peak, PrecursorIon, PrecursorMatch,
};
pub use crate::quantification::AnalyteQuantification;
pub use crate::report::{OutputFormat, Report, ReportAssembler};
pub use crate::search::{SearchParameters, TargetedSearch};
pub use crate::spectrum::{ArraySpectrum, PrecursorDescription};
pub use crate::time::{time_to_seconds, RetentionTimeWindow, TimeUnit};
pub use crate::tolerance::{PpmTolerance, ToleranceWindow};
