//! Targeted compounds and the delimited files they are defined in.
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::io::{self, BufReader};
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::slice;

use flate2::bufread::MultiGzDecoder;
use log::{debug, warn};

use crate::error::{ConfigurationError, InspectError};
use crate::tolerance::{PpmTolerance, ToleranceWindow};

/// A named compound to search for, described by its precursor m/z and two fragment ion m/z
/// values. The quantifier fragment carries the quantitative signal while the qualifier
/// fragment only corroborates the identification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Analyte {
    name: String,
    precursor: ToleranceWindow,
    quantifier: ToleranceWindow,
    qualifier: ToleranceWindow,
}

impl Analyte {
    pub fn new(
        name: impl Into<String>,
        precursor_mz: f64,
        quantifier_mz: f64,
        qualifier_mz: f64,
        precursor_tolerance: PpmTolerance,
        fragment_tolerance: PpmTolerance,
    ) -> Self {
        Self {
            name: name.into(),
            precursor: precursor_tolerance.window(precursor_mz),
            quantifier: fragment_tolerance.window(quantifier_mz),
            qualifier: fragment_tolerance.window(qualifier_mz),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precursor_mz(&self) -> f64 {
        self.precursor.center()
    }

    pub fn quantifier_mz(&self) -> f64 {
        self.quantifier.center()
    }

    pub fn qualifier_mz(&self) -> f64 {
        self.qualifier.center()
    }

    pub fn precursor_window(&self) -> &ToleranceWindow {
        &self.precursor
    }

    pub fn quantifier_window(&self) -> &ToleranceWindow {
        &self.quantifier
    }

    pub fn qualifier_window(&self) -> &ToleranceWindow {
        &self.qualifier
    }

    #[inline]
    pub fn precursor_contains(&self, mz: f64) -> bool {
        self.precursor.contains(mz)
    }

    #[inline]
    pub fn quantifier_contains(&self, mz: f64) -> bool {
        self.quantifier.contains(mz)
    }

    #[inline]
    pub fn qualifier_contains(&self, mz: f64) -> bool {
        self.qualifier.contains(mz)
    }
}

impl Display for Analyte {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// What to do when the same analyte name appears on more than one row of a target list.
///
/// Matches and quantifications are grouped by name, so merged duplicates contribute to a
/// single summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateAnalytePolicy {
    #[default]
    Merge,
    Reject,
}

/// The columns of a target definition file, in their expected order
pub const TARGET_COLUMNS: [&str; 4] = ["name", "precursor_mz", "quantifier_mz", "qualifier_mz"];

/// The analytes of a search, in the order they were defined.
///
/// Built once before any spectrum is read and never modified afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnalyteList {
    analytes: Vec<Analyte>,
}

impl AnalyteList {
    pub fn new(analytes: Vec<Analyte>) -> Self {
        Self { analytes }
    }

    /// Like [`AnalyteList::new`], but applying `policy` to repeated names
    pub fn with_policy(
        analytes: Vec<Analyte>,
        policy: DuplicateAnalytePolicy,
    ) -> Result<Self, ConfigurationError> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(analytes.len());
        for analyte in analytes.iter() {
            let count = seen.entry(analyte.name()).or_default();
            *count += 1;
            if *count == 2 {
                match policy {
                    DuplicateAnalytePolicy::Merge => {
                        warn!(
                            "Analyte {} is defined more than once, its matches will be merged",
                            analyte.name()
                        )
                    }
                    DuplicateAnalytePolicy::Reject => {
                        return Err(ConfigurationError::DuplicateAnalyte {
                            name: analyte.name().to_string(),
                        })
                    }
                }
            }
        }
        Ok(Self::new(analytes))
    }

    /// Read analytes from delimited text with a header row.
    ///
    /// Columns are located by their header names (see [`TARGET_COLUMNS`]). If the header
    /// does not name all of them, the first four columns are used in that order.
    pub fn from_reader<R: io::Read>(
        reader: R,
        delimiter: u8,
        precursor_tolerance: PpmTolerance,
        fragment_tolerance: PpmTolerance,
        policy: DuplicateAnalytePolicy,
    ) -> Result<Self, InspectError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = resolve_columns(reader.headers()?);
        let mut analytes = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let field = |i: usize| -> Result<&str, ConfigurationError> {
                record
                    .get(columns[i])
                    .ok_or_else(|| ConfigurationError::MalformedTargetRow {
                        line,
                        reason: format!("missing `{}` column", TARGET_COLUMNS[i]),
                    })
            };
            let mz = |i: usize| -> Result<f64, ConfigurationError> {
                let value = field(i)?;
                value
                    .parse::<f64>()
                    .map_err(|e| ConfigurationError::MalformedTargetRow {
                        line,
                        reason: format!("invalid `{}` value `{value}`: {e}", TARGET_COLUMNS[i]),
                    })
            };

            let name = field(0)?;
            if name.is_empty() {
                return Err(ConfigurationError::MalformedTargetRow {
                    line,
                    reason: "empty analyte name".into(),
                }
                .into());
            }
            analytes.push(Analyte::new(
                name,
                mz(1)?,
                mz(2)?,
                mz(3)?,
                precursor_tolerance,
                fragment_tolerance,
            ));
        }
        debug!("Read {} analyte definitions", analytes.len());
        Ok(Self::with_policy(analytes, policy)?)
    }

    /// Read analytes from a file. `.csv` files are comma separated, everything else is read
    /// as tab separated. A trailing `.gz` extension is decompressed transparently.
    pub fn open_path<P: AsRef<Path>>(
        path: P,
        precursor_tolerance: PpmTolerance,
        fragment_tolerance: PpmTolerance,
        policy: DuplicateAnalytePolicy,
    ) -> Result<Self, InspectError> {
        let path = path.as_ref();
        let (is_gzipped, inner_path) = is_gzipped_extension(path.to_path_buf());
        let delimiter = match inner_path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
            _ => b'\t',
        };
        let handle = BufReader::new(fs::File::open(path)?);
        if is_gzipped {
            Self::from_reader(
                MultiGzDecoder::new(handle),
                delimiter,
                precursor_tolerance,
                fragment_tolerance,
                policy,
            )
        } else {
            Self::from_reader(
                handle,
                delimiter,
                precursor_tolerance,
                fragment_tolerance,
                policy,
            )
        }
    }

    pub fn len(&self) -> usize {
        self.analytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analytes.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Analyte> {
        self.analytes.iter()
    }

    pub fn as_slice(&self) -> &[Analyte] {
        &self.analytes
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Analyte> {
        self.analytes.iter().find(|a| a.name() == name)
    }
}

impl Index<usize> for AnalyteList {
    type Output = Analyte;

    fn index(&self, index: usize) -> &Self::Output {
        &self.analytes[index]
    }
}

impl<'a> IntoIterator for &'a AnalyteList {
    type Item = &'a Analyte;
    type IntoIter = slice::Iter<'a, Analyte>;

    fn into_iter(self) -> Self::IntoIter {
        self.analytes.iter()
    }
}

fn resolve_columns(header: &csv::StringRecord) -> [usize; 4] {
    let mut columns = [0usize; 4];
    for (slot, expected) in columns.iter_mut().zip(TARGET_COLUMNS) {
        match header
            .iter()
            .position(|h| h.eq_ignore_ascii_case(expected))
        {
            Some(i) => *slot = i,
            None => {
                warn!(
                    "Target list header {:?} does not name all of {:?}, reading columns by position",
                    header, TARGET_COLUMNS
                );
                return [0, 1, 2, 3];
            }
        }
    }
    columns
}

fn is_gzipped_extension(path: PathBuf) -> (bool, PathBuf) {
    if let Some(ext) = path.extension() {
        if ext.to_ascii_lowercase() == "gz" {
            (true, path.with_extension(""))
        } else {
            (false, path)
        }
    } else {
        (false, path)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use flate2::{write::GzEncoder, Compression};

    use super::*;

    fn tolerance() -> PpmTolerance {
        PpmTolerance::symmetric(5.0)
    }

    #[test_log::test]
    fn test_contains() {
        let mz = 50.0;
        let ppm = 5.0;
        let lower = mz - (0.00005 * ppm);
        let upper = mz + (0.00005 * ppm);
        let analyte = Analyte::new("test", mz, mz, mz, tolerance(), tolerance());

        for contains in [
            Analyte::precursor_contains,
            Analyte::quantifier_contains,
            Analyte::qualifier_contains,
        ] {
            assert!(!contains(&analyte, lower - 0.00001));
            assert!(contains(&analyte, lower));
            assert!(contains(&analyte, mz));
            assert!(contains(&analyte, upper));
            assert!(!contains(&analyte, upper + 0.00001));
        }
    }

    #[test_log::test]
    fn test_separate_tolerances() {
        let analyte = Analyte::new(
            "caffeine",
            195.0877,
            138.0662,
            110.0713,
            PpmTolerance::new(10.0, 10.0),
            PpmTolerance::new(0.0, 0.0),
        );
        assert!(analyte.precursor_contains(195.0878));
        assert!(analyte.quantifier_contains(138.0662));
        assert!(!analyte.quantifier_contains(138.0663));
        assert_eq!(analyte.to_string(), "caffeine");
        assert_eq!(analyte.qualifier_mz(), 110.0713);
    }

    #[test_log::test]
    fn test_from_reader() -> Result<(), InspectError> {
        let text = "name\tprecursor_mz\tquantifier_mz\tqualifier_mz\n\
                    alpha\t100.0\t50.0\t60.0\n\
                    beta\t200.5\t120.25\t80.125\n";
        let analytes = AnalyteList::from_reader(
            text.as_bytes(),
            b'\t',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Merge,
        )?;
        assert_eq!(analytes.len(), 2);
        assert_eq!(analytes[0].name(), "alpha");
        assert_eq!(analytes[1].precursor_mz(), 200.5);
        assert_eq!(analytes[1].quantifier_mz(), 120.25);
        assert_eq!(analytes[1].qualifier_mz(), 80.125);
        assert!(analytes.get_by_name("beta").is_some());
        Ok(())
    }

    #[test_log::test]
    fn test_header_reordered() -> Result<(), InspectError> {
        let text = "qualifier_mz,name,quantifier_mz,precursor_mz\n60.0,alpha,50.0,100.0\n";
        let analytes = AnalyteList::from_reader(
            text.as_bytes(),
            b',',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Merge,
        )?;
        assert_eq!(analytes[0].name(), "alpha");
        assert_eq!(analytes[0].precursor_mz(), 100.0);
        assert_eq!(analytes[0].quantifier_mz(), 50.0);
        assert_eq!(analytes[0].qualifier_mz(), 60.0);
        Ok(())
    }

    #[test_log::test]
    fn test_positional_fallback() -> Result<(), InspectError> {
        let text = "Compound\tPrecursor\tQuant\tQual\nalpha\t100.0\t50.0\t60.0\n";
        let analytes = AnalyteList::from_reader(
            text.as_bytes(),
            b'\t',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Merge,
        )?;
        assert_eq!(analytes[0].name(), "alpha");
        assert_eq!(analytes[0].qualifier_mz(), 60.0);
        Ok(())
    }

    #[test_log::test]
    fn test_malformed_number() {
        let text = "name\tprecursor_mz\tquantifier_mz\tqualifier_mz\nalpha\t100.0\tfifty\t60.0\n";
        let err = AnalyteList::from_reader(
            text.as_bytes(),
            b'\t',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Merge,
        )
        .unwrap_err();
        match err {
            InspectError::Configuration(ConfigurationError::MalformedTargetRow { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("quantifier_mz"), "{reason}");
            }
            err => panic!("Unexpected error {err}"),
        }
    }

    #[test_log::test]
    fn test_missing_column() {
        let text = "name\tprecursor_mz\tquantifier_mz\tqualifier_mz\nalpha\t100.0\t50.0\n";
        let err = AnalyteList::from_reader(
            text.as_bytes(),
            b'\t',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Merge,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InspectError::Configuration(ConfigurationError::MalformedTargetRow { .. })
        ));
    }

    #[test_log::test]
    fn test_duplicate_policy() -> Result<(), InspectError> {
        let text = "name\tprecursor_mz\tquantifier_mz\tqualifier_mz\n\
                    alpha\t100.0\t50.0\t60.0\n\
                    alpha\t101.0\t51.0\t61.0\n";
        let merged = AnalyteList::from_reader(
            text.as_bytes(),
            b'\t',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Merge,
        )?;
        assert_eq!(merged.len(), 2);

        let err = AnalyteList::from_reader(
            text.as_bytes(),
            b'\t',
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InspectError::Configuration(ConfigurationError::DuplicateAnalyte { name }) if name == "alpha"
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_open_gzipped_path() -> Result<(), InspectError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("targets.tsv.gz");
        let mut writer = GzEncoder::new(fs::File::create(&path)?, Compression::default());
        writer.write_all(b"name\tprecursor_mz\tquantifier_mz\tqualifier_mz\nalpha\t100.0\t50.0\t60.0\n")?;
        writer.finish()?;

        let analytes = AnalyteList::open_path(
            &path,
            tolerance(),
            tolerance(),
            DuplicateAnalytePolicy::Reject,
        )?;
        assert_eq!(analytes.len(), 1);
        assert_eq!(analytes[0].precursor_mz(), 100.0);
        Ok(())
    }
}
