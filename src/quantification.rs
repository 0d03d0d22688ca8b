//! Summarizing the quantifier signal of each analyte over all of its fragment matches.
use indexmap::IndexMap;

use crate::analyte::Analyte;
use crate::error::DomainInvariantError;
use crate::matches::{FragmentMatch, MatchBuckets, Peak};

/// The mean quantifier m/z and intensity of one analyte across its fragment matches
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyteQuantification<'a> {
    pub analyte: &'a Analyte,
    pub average_quantifier_mz: f64,
    pub average_quantifier_intensity: f64,
    pub count: usize,
}

impl<'a> AnalyteQuantification<'a> {
    /// Average the quantifier peaks of `batch`, which must be non-empty and belong to a
    /// single analyte.
    pub fn from_batch(batch: &[FragmentMatch<'a>]) -> Result<Self, DomainInvariantError> {
        let first = batch.first().ok_or(DomainInvariantError::EmptyBatch)?;
        let analyte = first.analyte;

        let mut total = Peak::default();
        for m in batch {
            if m.analyte.name() != analyte.name() {
                return Err(DomainInvariantError::InconsistentGrouping {
                    expected: analyte.name().to_string(),
                    found: m.analyte.name().to_string(),
                });
            }
            total += m.quantifier;
        }

        let count = batch.len();
        Ok(Self {
            analyte,
            average_quantifier_mz: total.mz / count as f64,
            average_quantifier_intensity: total.intensity / count as f64,
            count,
        })
    }

    /// Group `matches` by analyte name in first-seen order and summarize each group
    pub fn from_matches<'m, I>(matches: I) -> Vec<Self>
    where
        'a: 'm,
        I: IntoIterator<Item = &'m FragmentMatch<'a>>,
    {
        let mut groups: IndexMap<&'a str, (&'a Analyte, Peak, usize)> = IndexMap::new();
        for m in matches {
            let entry = groups
                .entry(m.analyte.name())
                .or_insert((m.analyte, Peak::default(), 0));
            entry.1 += m.quantifier;
            entry.2 += 1;
        }
        groups
            .into_values()
            .map(|(analyte, total, count)| Self {
                analyte,
                average_quantifier_mz: total.mz / count as f64,
                average_quantifier_intensity: total.intensity / count as f64,
                count,
            })
            .collect()
    }

    /// Summarize every analyte with at least one fragment match in `buckets`
    pub fn from_buckets(buckets: &MatchBuckets<'a>) -> Result<Vec<Self>, DomainInvariantError> {
        buckets
            .fragment_groups()
            .filter(|(_, group)| !group.is_empty())
            .map(|(_, group)| Self::from_batch(group))
            .collect()
    }

    pub fn name(&self) -> &'a str {
        self.analyte.name()
    }
}
