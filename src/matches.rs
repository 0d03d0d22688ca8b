//! Records of analytes found in spectra, and the per-analyte buckets they are collected in.
use std::ops::{Add, AddAssign};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::analyte::Analyte;

/// An observed ion
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

impl Peak {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

impl AddAssign for Peak {
    fn add_assign(&mut self, rhs: Self) {
        self.mz += rhs.mz;
        self.intensity += rhs.intensity;
    }
}

impl Add for Peak {
    type Output = Peak;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// The precursor ion selected for the fragment spectrum a match was found in
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrecursorIon {
    pub mz: f64,
    pub charge: Option<i32>,
}

impl PrecursorIon {
    pub fn new(mz: f64, charge: Option<i32>) -> Self {
        Self { mz, charge }
    }
}

/// An ion of a full scan (MS1) spectrum inside an analyte's precursor window
#[derive(Debug, Clone, PartialEq)]
pub struct PrecursorMatch<'a> {
    pub analyte: &'a Analyte,
    pub filename: Arc<str>,
    pub spectrum_id: String,
    pub peak: Peak,
}

impl<'a> PrecursorMatch<'a> {
    pub fn new(analyte: &'a Analyte, filename: Arc<str>, spectrum_id: String, peak: Peak) -> Self {
        Self {
            analyte,
            filename,
            spectrum_id,
            peak,
        }
    }
}

/// A fragment (MS2) spectrum in which an analyte's quantifier ion was found, along with its
/// qualifier ion if that was present too.
///
/// There is at most one of these per analyte per spectrum. When several ions fall in a
/// window, the first one in the spectrum's array order is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentMatch<'a> {
    pub analyte: &'a Analyte,
    pub filename: Arc<str>,
    pub spectrum_id: String,
    pub precursor: PrecursorIon,
    pub quantifier: Peak,
    pub qualifier: Option<Peak>,
}

impl<'a> FragmentMatch<'a> {
    pub fn new(
        analyte: &'a Analyte,
        filename: Arc<str>,
        spectrum_id: String,
        precursor: PrecursorIon,
        quantifier: Peak,
        qualifier: Option<Peak>,
    ) -> Self {
        Self {
            analyte,
            filename,
            spectrum_id,
            precursor,
            quantifier,
            qualifier,
        }
    }

    /// Whether the observed precursor m/z lies in the analyte's precursor window
    pub fn is_precursor_matching(&self) -> bool {
        self.analyte.precursor_contains(self.precursor.mz)
    }

    pub fn has_qualifier(&self) -> bool {
        self.qualifier.is_some()
    }
}

/// Any match the classifier may produce
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyteMatch<'a> {
    Precursor(PrecursorMatch<'a>),
    Fragment(FragmentMatch<'a>),
}

impl<'a> AnalyteMatch<'a> {
    pub fn analyte(&self) -> &'a Analyte {
        match self {
            Self::Precursor(m) => m.analyte,
            Self::Fragment(m) => m.analyte,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::Precursor(m) => &m.filename,
            Self::Fragment(m) => &m.filename,
        }
    }

    pub fn spectrum_id(&self) -> &str {
        match self {
            Self::Precursor(m) => &m.spectrum_id,
            Self::Fragment(m) => &m.spectrum_id,
        }
    }

    pub fn ms_level(&self) -> u8 {
        match self {
            Self::Precursor(_) => 1,
            Self::Fragment(_) => 2,
        }
    }

    pub fn as_precursor(&self) -> Option<&PrecursorMatch<'a>> {
        match self {
            Self::Precursor(m) => Some(m),
            Self::Fragment(_) => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&FragmentMatch<'a>> {
        match self {
            Self::Precursor(_) => None,
            Self::Fragment(m) => Some(m),
        }
    }
}

impl<'a> From<PrecursorMatch<'a>> for AnalyteMatch<'a> {
    fn from(value: PrecursorMatch<'a>) -> Self {
        Self::Precursor(value)
    }
}

impl<'a> From<FragmentMatch<'a>> for AnalyteMatch<'a> {
    fn from(value: FragmentMatch<'a>) -> Self {
        Self::Fragment(value)
    }
}

/// Append-only sequences of matches keyed by analyte name.
///
/// Analytes appear in the order their first match was added, and matches within an analyte
/// in the order they were added, so traversing the same spectra twice yields identical buckets.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MatchBuckets<'a> {
    precursor: IndexMap<&'a str, Vec<PrecursorMatch<'a>>>,
    fragment: IndexMap<&'a str, Vec<FragmentMatch<'a>>>,
}

impl<'a> MatchBuckets<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: AnalyteMatch<'a>) {
        match record {
            AnalyteMatch::Precursor(m) => self
                .precursor
                .entry(m.analyte.name())
                .or_default()
                .push(m),
            AnalyteMatch::Fragment(m) => self
                .fragment
                .entry(m.analyte.name())
                .or_default()
                .push(m),
        }
    }

    /// Append every bucket of `other` after the matching bucket of `self`
    pub fn merge(&mut self, other: MatchBuckets<'a>) {
        for (name, matches) in other.precursor {
            self.precursor.entry(name).or_default().extend(matches);
        }
        for (name, matches) in other.fragment {
            self.fragment.entry(name).or_default().extend(matches);
        }
    }

    pub fn precursor_matches_for(&self, name: &str) -> &[PrecursorMatch<'a>] {
        self.precursor.get(name).map(|v| v.as_slice()).unwrap_or_default()
    }

    pub fn fragment_matches_for(&self, name: &str) -> &[FragmentMatch<'a>] {
        self.fragment.get(name).map(|v| v.as_slice()).unwrap_or_default()
    }

    /// Iterate over the fragment match buckets, one non-empty slice per analyte name
    pub fn fragment_groups(&self) -> impl Iterator<Item = (&'a str, &[FragmentMatch<'a>])> + '_ {
        self.fragment.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn precursor_groups(&self) -> impl Iterator<Item = (&'a str, &[PrecursorMatch<'a>])> + '_ {
        self.precursor.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// All MS1 matches, bucket by bucket
    pub fn precursor_matches(&self) -> impl Iterator<Item = &PrecursorMatch<'a>> + '_ {
        self.precursor.values().flatten()
    }

    /// All MS2 matches, bucket by bucket
    pub fn fragment_matches(&self) -> impl Iterator<Item = &FragmentMatch<'a>> + '_ {
        self.fragment.values().flatten()
    }

    pub fn precursor_match_count(&self) -> usize {
        self.precursor.values().map(|v| v.len()).sum()
    }

    pub fn fragment_match_count(&self) -> usize {
        self.fragment.values().map(|v| v.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.precursor_match_count() + self.fragment_match_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> Extend<AnalyteMatch<'a>> for MatchBuckets<'a> {
    fn extend<T: IntoIterator<Item = AnalyteMatch<'a>>>(&mut self, iter: T) {
        for record in iter {
            self.push(record);
        }
    }
}

impl<'a> FromIterator<AnalyteMatch<'a>> for MatchBuckets<'a> {
    fn from_iter<T: IntoIterator<Item = AnalyteMatch<'a>>>(iter: T) -> Self {
        let mut buckets = Self::new();
        buckets.extend(iter);
        buckets
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tolerance::PpmTolerance;

    fn analytes() -> (Analyte, Analyte) {
        let tol = PpmTolerance::symmetric(5.0);
        (
            Analyte::new("test0", 50.0, 50.0, 50.0, tol, tol),
            Analyte::new("test1", 80.0, 40.0, 30.0, tol, tol),
        )
    }

    #[test_log::test]
    fn test_peak_add_assign() {
        let mut peak0 = Peak::new(100.0, 10.0);
        let peak1 = Peak::new(105.0, 15.0);
        peak0 += peak1;
        assert_eq!(peak0.mz, 205.0);
        assert_eq!(peak0.intensity, 25.0);
        assert_eq!(peak0 + peak1, Peak::new(310.0, 40.0));
    }

    #[test_log::test]
    fn test_precursor_flag() {
        let (a0, _) = analytes();
        let file: Arc<str> = Arc::from("foo.mzML");
        let inside = FragmentMatch::new(
            &a0,
            file.clone(),
            "scan=1".into(),
            PrecursorIon::new(50.0001, Some(2)),
            Peak::new(50.0, 10.0),
            None,
        );
        assert!(inside.is_precursor_matching());
        assert!(!inside.has_qualifier());

        let outside = FragmentMatch {
            precursor: PrecursorIon::new(51.0, None),
            ..inside.clone()
        };
        assert!(!outside.is_precursor_matching());
    }

    #[test_log::test]
    fn test_buckets_keep_first_seen_order() {
        let (a0, a1) = analytes();
        let file: Arc<str> = Arc::from("foo.mzML");
        fn record<'a>(analyte: &'a Analyte, file: &Arc<str>, scan: usize) -> AnalyteMatch<'a> {
            FragmentMatch::new(
                analyte,
                file.clone(),
                format!("scan={scan}"),
                PrecursorIon::default(),
                Peak::new(scan as f64, 1.0),
                None,
            )
            .into()
        }

        let mut buckets: MatchBuckets = vec![
            record(&a1, &file, 0),
            record(&a0, &file, 1),
            record(&a1, &file, 2),
        ]
            .into_iter()
            .collect();
        buckets.push(
            PrecursorMatch::new(&a0, file.clone(), "scan=3".into(), Peak::new(50.0, 3.0)).into(),
        );

        let names: Vec<_> = buckets.fragment_groups().map(|(name, _)| name).collect();
        assert_eq!(names, ["test1", "test0"]);
        let ids: Vec<_> = buckets
            .fragment_matches()
            .map(|m| m.spectrum_id.as_str())
            .collect();
        assert_eq!(ids, ["scan=0", "scan=2", "scan=1"]);
        assert_eq!(buckets.fragment_matches_for("test1").len(), 2);
        assert_eq!(buckets.precursor_matches_for("test0").len(), 1);
        assert!(buckets.precursor_matches_for("test1").is_empty());
        assert_eq!(buckets.len(), 4);

        let mut other = MatchBuckets::new();
        other.push(record(&a0, &file, 4));
        buckets.merge(other);
        let ids: Vec<_> = buckets
            .fragment_matches_for("test0")
            .iter()
            .map(|m| m.spectrum_id.as_str())
            .collect();
        assert_eq!(ids, ["scan=1", "scan=4"]);
    }

    #[test_log::test]
    fn test_match_accessors() {
        let (a0, _) = analytes();
        let record: AnalyteMatch =
            PrecursorMatch::new(&a0, Arc::from("bar.mzML"), "scan=9".into(), Peak::new(50.0, 2.0))
                .into();
        assert_eq!(record.analyte().name(), "test0");
        assert_eq!(record.filename(), "bar.mzML");
        assert_eq!(record.spectrum_id(), "scan=9");
        assert_eq!(record.ms_level(), 1);
        assert!(record.as_precursor().is_some());
        assert!(record.as_fragment().is_none());
    }
}
