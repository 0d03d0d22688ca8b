//! The view of a decoded spectrum that the matching engine needs.
//!
//! Spectrum files are decoded by [`mzdata`], whose [`MultiLayerSpectrum`](mzdata::spectrum::MultiLayerSpectrum)
//! implements [`SpectrumView`] (see [`reader`]). [`ArraySpectrum`] is an owned in-memory
//! spectrum for callers that decode spectra some other way.
use std::borrow::Cow;

use crate::error::{ConfigurationError, StructuralInputError};
use crate::time::{time_to_seconds, TimeUnit};

pub mod reader;

pub use reader::{open_spectrum_file, SpectrumFileReader};

/// A scan start time in the unit its source reported it in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanTime<'a> {
    pub value: f64,
    /// The UO name of the time unit, e.g. `"minute"`
    pub unit: &'a str,
}

impl<'a> ScanTime<'a> {
    pub fn new(value: f64, unit: &'a str) -> Self {
        Self { value, unit }
    }

    pub fn time_unit(&self) -> Result<TimeUnit, ConfigurationError> {
        TimeUnit::from_name(self.unit)
    }

    pub fn to_seconds(&self) -> Result<f64, ConfigurationError> {
        time_to_seconds(self.value, self.unit)
    }
}

/// The precursor ion an MSn spectrum was produced from, as reported by the source.
///
/// A description without an m/z is structurally invalid for fragment matching.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PrecursorDescription {
    pub mz: Option<f64>,
    pub charge: Option<i32>,
}

impl PrecursorDescription {
    pub fn new(mz: f64, charge: Option<i32>) -> Self {
        Self {
            mz: Some(mz),
            charge,
        }
    }
}

/// Read-only access to one decoded spectrum.
///
/// The m/z and intensity arrays are parallel: index `i` of one describes the same ion as
/// index `i` of the other.
pub trait SpectrumView {
    /// The MS exponentiation level, 1 for full scans and 2 for fragment scans
    fn ms_level(&self) -> u8;

    /// The native ID of the spectrum
    fn id(&self) -> &str;

    fn scan_time(&self) -> ScanTime<'_>;

    /// The selected precursor, if the source describes one
    fn precursor(&self) -> Option<PrecursorDescription>;

    fn mz_array(&self) -> Result<Cow<'_, [f64]>, StructuralInputError>;

    fn intensity_array(&self) -> Result<Cow<'_, [f32]>, StructuralInputError>;
}

impl<T: SpectrumView> SpectrumView for &T {
    fn ms_level(&self) -> u8 {
        (*self).ms_level()
    }

    fn id(&self) -> &str {
        (*self).id()
    }

    fn scan_time(&self) -> ScanTime<'_> {
        (*self).scan_time()
    }

    fn precursor(&self) -> Option<PrecursorDescription> {
        (*self).precursor()
    }

    fn mz_array(&self) -> Result<Cow<'_, [f64]>, StructuralInputError> {
        (*self).mz_array()
    }

    fn intensity_array(&self) -> Result<Cow<'_, [f32]>, StructuralInputError> {
        (*self).intensity_array()
    }
}

/// An owned spectrum holding its signal as plain arrays
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySpectrum {
    pub id: String,
    pub ms_level: u8,
    pub scan_time: f64,
    pub time_unit: String,
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f32>,
    pub precursor: Option<PrecursorDescription>,
}

impl Default for ArraySpectrum {
    fn default() -> Self {
        Self {
            id: String::new(),
            ms_level: 1,
            scan_time: 0.0,
            time_unit: "second".to_string(),
            mz_array: Vec::new(),
            intensity_array: Vec::new(),
            precursor: None,
        }
    }
}

impl ArraySpectrum {
    pub fn new(
        id: impl Into<String>,
        ms_level: u8,
        mz_array: Vec<f64>,
        intensity_array: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            ms_level,
            mz_array,
            intensity_array,
            ..Default::default()
        }
    }

    pub fn with_scan_time(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.scan_time = value;
        self.time_unit = unit.into();
        self
    }

    pub fn with_precursor(mut self, precursor: PrecursorDescription) -> Self {
        self.precursor = Some(precursor);
        self
    }
}

impl SpectrumView for ArraySpectrum {
    fn ms_level(&self) -> u8 {
        self.ms_level
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn scan_time(&self) -> ScanTime<'_> {
        ScanTime::new(self.scan_time, &self.time_unit)
    }

    fn precursor(&self) -> Option<PrecursorDescription> {
        self.precursor
    }

    fn mz_array(&self) -> Result<Cow<'_, [f64]>, StructuralInputError> {
        Ok(Cow::Borrowed(&self.mz_array))
    }

    fn intensity_array(&self) -> Result<Cow<'_, [f32]>, StructuralInputError> {
        Ok(Cow::Borrowed(&self.intensity_array))
    }
}
