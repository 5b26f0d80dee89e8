//! Results returned by search and enrollment operations

use std::fmt;

use crate::scan::ImageScan;

/// A match found in the module's flash library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Library slot of the matched template
    pub id: u16,

    /// Matching score reported by the module
    pub match_score: u16,
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Match[slot={}, score={}]", self.id, self.match_score)
    }
}

/// Everything captured by the data-returning enrollment workflow:
/// the two raw scans and the feature template combined from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentData {
    /// Feature template of the combined model
    pub features: Vec<u8>,

    /// First fingerprint scan
    pub scan1: ImageScan,

    /// Second fingerprint scan
    pub scan2: ImageScan,
}
