//! Finding analyte ions in a single spectrum.
use std::sync::Arc;

use log::{debug, trace};

use crate::analyte::{Analyte, AnalyteList};
use crate::error::StructuralInputError;
use crate::matches::{
    AnalyteMatch, FragmentMatch, MatchBuckets, Peak, PrecursorIon, PrecursorMatch,
};
use crate::spectrum::SpectrumView;

/// Tests the ions of one spectrum at a time against every analyte of a search.
///
/// Full scan (MS1) spectra are searched for ions in each analyte's precursor window, and
/// every ion inside it produces a [`PrecursorMatch`]. Fragment (MS2) spectra are searched for
/// the first ion in each analyte's quantifier window and, independently, the first ion in
/// its qualifier window. A [`FragmentMatch`] is only produced when the quantifier ion is
/// found. Spectra of any other MS level are ignored.
#[derive(Debug, Clone, Copy)]
pub struct SpectrumClassifier<'a> {
    analytes: &'a [Analyte],
    require_precursor_match: bool,
}

impl<'a> SpectrumClassifier<'a> {
    pub fn new(analytes: &'a AnalyteList) -> Self {
        Self::from_slice(analytes.as_slice())
    }

    pub fn from_slice(analytes: &'a [Analyte]) -> Self {
        Self {
            analytes,
            require_precursor_match: false,
        }
    }

    /// When set, fragment matches whose selected precursor m/z lies outside the analyte's
    /// precursor window are discarded.
    pub fn require_precursor_match(mut self, value: bool) -> Self {
        self.require_precursor_match = value;
        self
    }

    pub fn analytes(&self) -> &'a [Analyte] {
        self.analytes
    }

    /// Classify `spectrum`, returning its matches in analyte order.
    ///
    /// # Errors
    /// [`StructuralInputError::ArrayLengthMismatch`] if the m/z and intensity arrays differ in
    /// length, and [`StructuralInputError::MissingPrecursorMz`] for an MS2 spectrum whose
    /// precursor has no m/z. An MS2 spectrum with no precursor at all is skipped.
    pub fn classify<S: SpectrumView + ?Sized>(
        &self,
        filename: &Arc<str>,
        spectrum: &S,
    ) -> Result<Vec<AnalyteMatch<'a>>, StructuralInputError> {
        let mut matches = Vec::new();
        self.classify_with(filename, spectrum, |m| matches.push(m))?;
        Ok(matches)
    }

    /// Classify `spectrum`, appending its matches to `buckets`. Returns the number of
    /// matches added.
    pub fn classify_into<S: SpectrumView + ?Sized>(
        &self,
        filename: &Arc<str>,
        spectrum: &S,
        buckets: &mut MatchBuckets<'a>,
    ) -> Result<usize, StructuralInputError> {
        let mut count = 0;
        self.classify_with(filename, spectrum, |m| {
            count += 1;
            buckets.push(m)
        })?;
        Ok(count)
    }

    fn classify_with<S: SpectrumView + ?Sized, F: FnMut(AnalyteMatch<'a>)>(
        &self,
        filename: &Arc<str>,
        spectrum: &S,
        mut sink: F,
    ) -> Result<(), StructuralInputError> {
        let mzs = spectrum.mz_array()?;
        let intensities = spectrum.intensity_array()?;
        if mzs.len() != intensities.len() {
            return Err(StructuralInputError::ArrayLengthMismatch {
                spectrum_id: spectrum.id().to_string(),
                mz_len: mzs.len(),
                intensity_len: intensities.len(),
            });
        }

        match spectrum.ms_level() {
            1 => {
                for analyte in self.analytes {
                    let window = analyte.precursor_window();
                    for (mz, intensity) in mzs.iter().zip(intensities.iter()) {
                        if window.contains(*mz) {
                            sink(
                                PrecursorMatch::new(
                                    analyte,
                                    filename.clone(),
                                    spectrum.id().to_string(),
                                    Peak::new(*mz, *intensity as f64),
                                )
                                .into(),
                            );
                        }
                    }
                }
            }
            2 => {
                let precursor = match spectrum.precursor() {
                    Some(precursor) => precursor,
                    None => {
                        debug!(
                            "Skipping fragment spectrum {} without a precursor",
                            spectrum.id()
                        );
                        return Ok(());
                    }
                };
                let precursor = match precursor.mz {
                    Some(mz) => PrecursorIon::new(mz, precursor.charge),
                    None => {
                        return Err(StructuralInputError::MissingPrecursorMz {
                            spectrum_id: spectrum.id().to_string(),
                        })
                    }
                };

                for analyte in self.analytes {
                    let Some(quant_idx) = analyte.quantifier_window().first_match_in(&mzs) else {
                        continue;
                    };
                    if self.require_precursor_match && !analyte.precursor_contains(precursor.mz) {
                        trace!(
                            "{} quantifier found in {} but precursor {} is outside the window",
                            analyte.name(),
                            spectrum.id(),
                            precursor.mz
                        );
                        continue;
                    }
                    let qualifier = analyte
                        .qualifier_window()
                        .first_match_in(&mzs)
                        .map(|i| Peak::new(mzs[i], intensities[i] as f64));
                    sink(
                        FragmentMatch::new(
                            analyte,
                            filename.clone(),
                            spectrum.id().to_string(),
                            precursor,
                            Peak::new(mzs[quant_idx], intensities[quant_idx] as f64),
                            qualifier,
                        )
                        .into(),
                    );
                }
            }
            level => {
                trace!("Ignoring MS{level} spectrum {}", spectrum.id());
            }
        }
        Ok(())
    }
}
