//! A set of traits that callers will want in scope.
pub use crate::spectrum::SpectrumView;
