//! Adapting spectra decoded by [`mzdata`] to [`SpectrumView`].
use std::borrow::Cow;
use std::fs;
use std::path::Path;

use log::debug;

use mzdata::io::{infer_format, infer_from_path, MassSpectrometryFormat, MZReader};
use mzdata::prelude::*;
use mzdata::spectrum::{MultiLayerSpectrum, RefPeakDataLevel};

use super::{PrecursorDescription, ScanTime, SpectrumView};
use crate::error::{ConfigurationError, InspectError, StructuralInputError};

/// The reader type spectrum files are opened with
pub type SpectrumFileReader = MZReader<fs::File>;

/// Open a spectrum file, inferring its format from its extension or, failing that, its
/// content.
pub fn open_spectrum_file<P: AsRef<Path>>(path: P) -> Result<SpectrumFileReader, InspectError> {
    let path = path.as_ref();
    let (mut format, mut is_gzipped) = infer_from_path(path);
    if format == MassSpectrometryFormat::Unknown {
        (format, is_gzipped) = infer_format(path)?;
    }
    if is_gzipped || !matches!(format, MassSpectrometryFormat::MzML | MassSpectrometryFormat::MGF) {
        return Err(ConfigurationError::UnknownSpectrumFormat(path.to_path_buf()).into());
    }
    debug!("Opening {} as {format}", path.display());
    Ok(SpectrumFileReader::open_path(path.to_path_buf())?)
}

fn array_error<E: ToString>(spectrum_id: &str, err: E) -> StructuralInputError {
    StructuralInputError::ArrayRetrieval {
        spectrum_id: spectrum_id.to_string(),
        reason: err.to_string(),
    }
}

/// `mzdata` normalizes scan start times to minutes. The signal is taken from whichever
/// representation the spectrum carries, preferring the most processed one.
impl SpectrumView for MultiLayerSpectrum {
    fn ms_level(&self) -> u8 {
        SpectrumLike::ms_level(self)
    }

    fn id(&self) -> &str {
        SpectrumLike::id(self)
    }

    fn scan_time(&self) -> ScanTime<'_> {
        ScanTime::new(self.start_time(), "minute")
    }

    fn precursor(&self) -> Option<PrecursorDescription> {
        SpectrumLike::precursor(self).map(|prec| match prec.ion() {
            Some(ion) => PrecursorDescription::new(ion.mz, ion.charge),
            None => PrecursorDescription::default(),
        })
    }

    fn mz_array(&self) -> Result<Cow<'_, [f64]>, StructuralInputError> {
        match self.peaks() {
            RefPeakDataLevel::Missing => Ok(Cow::Owned(Vec::new())),
            RefPeakDataLevel::RawData(arrays) => arrays
                .mzs()
                .map_err(|e| array_error(SpectrumLike::id(self), e)),
            RefPeakDataLevel::Centroid(peaks) => Ok(peaks.iter().map(|p| p.mz).collect()),
            RefPeakDataLevel::Deconvoluted(peaks) => Ok(peaks.iter().map(|p| p.mz()).collect()),
        }
    }

    fn intensity_array(&self) -> Result<Cow<'_, [f32]>, StructuralInputError> {
        match self.peaks() {
            RefPeakDataLevel::Missing => Ok(Cow::Owned(Vec::new())),
            RefPeakDataLevel::RawData(arrays) => arrays
                .intensities()
                .map_err(|e| array_error(SpectrumLike::id(self), e)),
            RefPeakDataLevel::Centroid(peaks) => Ok(peaks.iter().map(|p| p.intensity).collect()),
            RefPeakDataLevel::Deconvoluted(peaks) => {
                Ok(peaks.iter().map(|p| p.intensity).collect())
            }
        }
    }
}
