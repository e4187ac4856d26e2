//! Byte pattern matching for signature-based inspection.

/// Find every starting offset of `needle` in `haystack`.
///
/// Matches may overlap: after a hit at offset `i` the search resumes at
/// `i + 1`, so `AA` in `AAA` is reported at 0 and 1. Offsets are ascending
/// and zero-based. An empty needle matches nowhere.
pub fn find_all_offsets(haystack: &[u8], needle: &[u8]) -> Vec<u64> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return Vec::new();
    }

    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(offset, _)| offset as u64)
        .collect()
}

/// Matcher bound to a single decoded pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pattern: Vec<u8>,
}

impl PatternMatcher {
    /// Create a matcher for the given byte pattern.
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// All offsets of the pattern in `content`.
    pub fn find_all(&self, content: &[u8]) -> Vec<u64> {
        find_all_offsets(content, &self.pattern)
    }
}
