//! Driving a targeted search over whole spectrum files.
use std::path::Path;
use std::sync::Arc;

use log::{info, trace};

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::analyte::AnalyteList;
use crate::classify::SpectrumClassifier;
use crate::error::{ConfigurationError, InspectError};
use crate::matches::MatchBuckets;
use crate::spectrum::{open_spectrum_file, SpectrumView};
use crate::time::RetentionTimeWindow;
use crate::tolerance::PpmTolerance;

fn check_tolerance(field: &'static str, value: f64) -> Result<f64, ConfigurationError> {
    if !value.is_finite() {
        Err(ConfigurationError::MalformedNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
    } else if value < 0.0 {
        Err(ConfigurationError::NegativeTolerance { field, value })
    } else {
        Ok(value)
    }
}

/// The validated settings of a search
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SearchParameters {
    /// Spectra whose scan time in seconds falls outside this window are not searched
    pub rt_window: RetentionTimeWindow,
    pub precursor_tolerance: PpmTolerance,
    pub fragment_tolerance: PpmTolerance,
    pub require_precursor_match: bool,
}

impl SearchParameters {
    /// Validate raw settings. Retention times are in seconds, tolerances in ppm.
    pub fn new(
        rt_start: f64,
        rt_stop: f64,
        precursor_tol_lower: f64,
        precursor_tol_upper: f64,
        fragment_tol_lower: f64,
        fragment_tol_upper: f64,
    ) -> Result<Self, ConfigurationError> {
        let precursor_tolerance = PpmTolerance::new(
            check_tolerance("precursor_tol_lower", precursor_tol_lower)?,
            check_tolerance("precursor_tol_upper", precursor_tol_upper)?,
        );
        let fragment_tolerance = PpmTolerance::new(
            check_tolerance("fragment_tol_lower", fragment_tol_lower)?,
            check_tolerance("fragment_tol_upper", fragment_tol_upper)?,
        );
        Ok(Self {
            rt_window: RetentionTimeWindow::new(rt_start, rt_stop)?,
            precursor_tolerance,
            fragment_tolerance,
            require_precursor_match: false,
        })
    }

    pub fn with_precursor_requirement(mut self, value: bool) -> Self {
        self.require_precursor_match = value;
        self
    }
}

/// Searches spectra for the analytes of an [`AnalyteList`].
///
/// Each file is read once, from start to end, and produces its own [`MatchBuckets`]. When
/// several files are searched, their buckets are merged in the order the files were given.
#[derive(Debug, Clone, Copy)]
pub struct TargetedSearch<'a> {
    analytes: &'a AnalyteList,
    parameters: SearchParameters,
}

impl<'a> TargetedSearch<'a> {
    /// The analyte windows are already fixed in `analytes`, only the retention time window
    /// and precursor requirement of `parameters` are used here.
    pub fn new(analytes: &'a AnalyteList, parameters: SearchParameters) -> Self {
        Self {
            analytes,
            parameters,
        }
    }

    pub fn parameters(&self) -> &SearchParameters {
        &self.parameters
    }

    pub fn classifier(&self) -> SpectrumClassifier<'a> {
        SpectrumClassifier::new(self.analytes)
            .require_precursor_match(self.parameters.require_precursor_match)
    }

    fn search_iter<S: SpectrumView, I: IntoIterator<Item = S>>(
        &self,
        source: &Path,
        filename: &Arc<str>,
        spectra: I,
    ) -> Result<MatchBuckets<'a>, InspectError> {
        let classifier = self.classifier();
        let rt_window = &self.parameters.rt_window;
        let mut buckets = MatchBuckets::new();
        let mut n_spectra = 0usize;

        for spectrum in spectra {
            let scan_time = spectrum.scan_time();
            let unit = scan_time.time_unit()?;
            if !rt_window.contains_in(scan_time.value, unit) {
                trace!(
                    "{} at {} {unit} is outside the retention time window",
                    spectrum.id(),
                    scan_time.value
                );
                continue;
            }
            n_spectra += 1;
            classifier
                .classify_into(filename, &spectrum, &mut buckets)
                .map_err(|e| InspectError::in_file(source, e))?;
        }

        info!(
            "Searched {n_spectra} spectra from {filename}, found {} precursor and {} fragment matches",
            buckets.precursor_match_count(),
            buckets.fragment_match_count()
        );
        Ok(buckets)
    }

    /// Search an already decoded sequence of spectra, labeling matches with `filename`.
    ///
    /// Stops at the first spectrum with an unknown time unit or broken structure.
    pub fn search_spectra<S: SpectrumView, I: IntoIterator<Item = S>>(
        &self,
        filename: &Arc<str>,
        spectra: I,
    ) -> Result<MatchBuckets<'a>, InspectError> {
        self.search_iter(Path::new(filename.as_ref()), filename, spectra)
    }

    /// Read and search every spectrum of the file at `path`. Matches are labeled with the
    /// file's name.
    pub fn search_file<P: AsRef<Path>>(&self, path: P) -> Result<MatchBuckets<'a>, InspectError> {
        let path = path.as_ref();
        let filename: Arc<str> = match path.file_name() {
            Some(name) => Arc::from(name.to_string_lossy().as_ref()),
            None => Arc::from(path.to_string_lossy().as_ref()),
        };
        info!("Searching {}", path.display());
        let reader = open_spectrum_file(path)?;
        self.search_iter(path, &filename, reader)
    }

    /// Search each file in turn, merging their matches in the order given
    #[cfg(not(feature = "parallelism"))]
    pub fn search_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<MatchBuckets<'a>, InspectError> {
        let mut buckets = MatchBuckets::new();
        for path in paths {
            buckets.merge(self.search_file(path)?);
        }
        Ok(buckets)
    }

    /// Search files concurrently, merging their matches in the order given
    #[cfg(feature = "parallelism")]
    pub fn search_files<P: AsRef<Path> + Sync>(
        &self,
        paths: &[P],
    ) -> Result<MatchBuckets<'a>, InspectError> {
        let per_file: Vec<MatchBuckets<'a>> = paths
            .par_iter()
            .map(|path| self.search_file(path))
            .collect::<Result<_, _>>()?;
        let mut buckets = MatchBuckets::new();
        for file_buckets in per_file {
            buckets.merge(file_buckets);
        }
        Ok(buckets)
    }
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io::Write;

    use super::*;
    use crate::analyte::Analyte;
    use crate::spectrum::{ArraySpectrum, PrecursorDescription};

    fn analytes() -> AnalyteList {
        let tol = PpmTolerance::symmetric(10.0);
        AnalyteList::new(vec![Analyte::new("alpha", 100.0, 50.0, 60.0, tol, tol)])
    }

    fn scenario() -> Vec<ArraySpectrum> {
        vec![
            ArraySpectrum::new("scan=1", 1, vec![100.0005], vec![1000.0])
                .with_scan_time(1.0, "minute"),
            ArraySpectrum::new("scan=2", 2, vec![50.0003, 60.0002], vec![500.0, 300.0])
                .with_scan_time(1.0, "minute")
                .with_precursor(PrecursorDescription::new(100.0, Some(1))),
        ]
    }

    fn write_mgf(
        dir: &Path,
        name: &str,
        rt_seconds: u32,
        scans: &[(f64, f32)],
    ) -> std::io::Result<std::path::PathBuf> {
        let path = dir.join(name);
        let mut handle = fs::File::create(&path)?;
        for (i, (quant_mz, intensity)) in scans.iter().enumerate() {
            writeln!(handle, "BEGIN IONS")?;
            writeln!(handle, "TITLE=index={i}")?;
            writeln!(handle, "RTINSECONDS={rt_seconds}")?;
            writeln!(handle, "PEPMASS=100.0")?;
            writeln!(handle, "CHARGE=1+")?;
            writeln!(handle, "{quant_mz} {intensity}")?;
            writeln!(handle, "60.0002 300")?;
            writeln!(handle, "END IONS")?;
        }
        Ok(path)
    }

    #[test_log::test]
    fn test_parameters_validation() {
        assert!(SearchParameters::new(0.0, 100.0, 10.0, 10.0, 20.0, 20.0).is_ok());
        assert_eq!(
            SearchParameters::new(0.0, 100.0, -1.0, 10.0, 20.0, 20.0),
            Err(ConfigurationError::NegativeTolerance {
                field: "precursor_tol_lower",
                value: -1.0
            })
        );
        assert!(matches!(
            SearchParameters::new(0.0, 100.0, 10.0, 10.0, f64::NAN, 20.0),
            Err(ConfigurationError::MalformedNumber { .. })
        ));
        assert!(matches!(
            SearchParameters::new(100.0, 0.0, 10.0, 10.0, 20.0, 20.0),
            Err(ConfigurationError::InvalidRetentionTimeWindow { .. })
        ));
    }

    #[test_log::test]
    fn test_end_to_end_scenario() -> Result<(), InspectError> {
        let analytes = analytes();
        let params = SearchParameters::new(59.0, 61.0, 10.0, 10.0, 10.0, 10.0)?;
        let search = TargetedSearch::new(&analytes, params);
        let buckets = search.search_spectra(&Arc::from("run.mzML"), scenario())?;

        let precursors = buckets.precursor_matches_for("alpha");
        assert_eq!(precursors.len(), 1);
        assert_eq!(precursors[0].peak.mz, 100.0005);

        let fragments = buckets.fragment_matches_for("alpha");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].quantifier.mz, 50.0003);
        assert_eq!(fragments[0].quantifier.intensity, 500.0);
        let qualifier = fragments[0].qualifier.unwrap();
        assert_eq!(qualifier.mz, 60.0002);
        assert_eq!(qualifier.intensity, 300.0);
        Ok(())
    }

    #[test_log::test]
    fn test_retention_time_window() -> Result<(), InspectError> {
        let analytes = analytes();
        let params = SearchParameters::new(61.0, 120.0, 10.0, 10.0, 10.0, 10.0)?;
        let search = TargetedSearch::new(&analytes, params);
        let buckets = search.search_spectra(&Arc::from("run.mzML"), scenario())?;
        assert!(buckets.is_empty());
        Ok(())
    }

    #[test_log::test]
    fn test_unknown_time_unit_halts() -> Result<(), InspectError> {
        let analytes = analytes();
        let search = TargetedSearch::new(&analytes, SearchParameters::default());
        let mut spectra = vec![ArraySpectrum::new("scan=0", 1, vec![100.0], vec![1.0])
            .with_scan_time(1.0, "parsec")];
        spectra.extend(scenario());
        let result = search.search_spectra(&Arc::from("run.mzML"), spectra);
        assert!(matches!(
            result,
            Err(InspectError::Configuration(ConfigurationError::UnknownTimeUnit(_)))
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_structural_error_names_file() {
        let analytes = analytes();
        let search = TargetedSearch::new(&analytes, SearchParameters::default());
        let spectra = vec![ArraySpectrum::new("scan=0", 1, vec![100.0, 101.0], vec![1.0])];
        match search.search_spectra(&Arc::from("broken.mzML"), spectra) {
            Err(InspectError::InputFile { path, .. }) => {
                assert_eq!(path, Path::new("broken.mzML"))
            }
            other => panic!("Expected an input file error, got {other:?}"),
        }
    }

    #[test_log::test]
    fn test_search_files() -> Result<(), InspectError> {
        let dir = tempfile::tempdir()?;
        let first = write_mgf(dir.path(), "first.mgf", 60, &[(50.0003, 500.0), (50.0001, 100.0)])?;
        let second = write_mgf(dir.path(), "second.mgf", 60, &[(49.0, 10.0), (50.0, 200.0)])?;

        let analytes = analytes();
        let params = SearchParameters::new(59.0, 61.0, 10.0, 10.0, 10.0, 10.0)?;
        let search = TargetedSearch::new(&analytes, params);
        let buckets = search.search_files(&[first, second])?;

        let fragments = buckets.fragment_matches_for("alpha");
        let found: Vec<_> = fragments
            .iter()
            .map(|m| (m.filename.as_ref(), m.spectrum_id.as_str(), m.quantifier.intensity))
            .collect();
        assert_eq!(
            found,
            [
                ("first.mgf", "index=0", 500.0),
                ("first.mgf", "index=1", 100.0),
                ("second.mgf", "index=1", 200.0),
            ]
        );
        assert!(fragments.iter().all(|m| m.qualifier.is_some()));
        Ok(())
    }

    #[test_log::test]
    fn test_file_scan_on_window_bounds() -> Result<(), InspectError> {
        let dir = tempfile::tempdir()?;
        let analytes = analytes();
        for seconds in [31u32, 62, 123, 125] {
            let name = format!("rt{seconds}.mgf");
            let path = write_mgf(dir.path(), &name, seconds, &[(50.0003, 500.0)])?;
            let bound = seconds as f64;
            let params = SearchParameters::new(bound, bound, 10.0, 10.0, 10.0, 10.0)?;
            let buckets = TargetedSearch::new(&analytes, params).search_file(&path)?;
            assert_eq!(buckets.fragment_matches_for("alpha").len(), 1, "{seconds}");
        }
        Ok(())
    }

    #[test_log::test]
    fn test_missing_file() {
        let analytes = analytes();
        let search = TargetedSearch::new(&analytes, SearchParameters::default());
        assert!(search.search_file("does/not/exist.mgf").is_err());
    }
}
