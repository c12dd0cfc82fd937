use memchr::memmem::Finder;

use crate::errors::{SearchError, SearchResult};

/// Literal byte-substring matcher.
///
/// Matching is raw and case-sensitive: no word boundaries, no Unicode awareness.
/// Occurrences inside longer words count.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    finder: Finder<'static>,
}

impl PatternMatcher {
    /// Creates a matcher for `pattern`. An empty pattern is rejected.
    pub fn new(pattern: &str) -> SearchResult<Self> {
        if pattern.is_empty() {
            return Err(SearchError::EmptyPattern);
        }
        Ok(Self {
            finder: Finder::new(pattern.as_bytes()).into_owned(),
        })
    }

    /// The pattern bytes
    pub fn needle(&self) -> &[u8] {
        self.finder.needle()
    }

    /// Length of the pattern in bytes
    pub fn len(&self) -> usize {
        self.finder.needle().len()
    }

    /// Always false; empty patterns are rejected at construction.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Position of the next match starting at or after `from`
    pub fn find_from(&self, haystack: &[u8], from: usize) -> Option<usize> {
        if from >= haystack.len() {
            return None;
        }
        self.finder
            .find(&haystack[from..])
            .map(|offset| from + offset)
    }

    /// Counts non-overlapping occurrences, scanning left to right.
    ///
    /// Each match consumes its own length before the next search begins, so
    /// `"aaaa"` holds two `"aa"`, not three.
    pub fn count(&self, haystack: &[u8]) -> u64 {
        let mut count = 0;
        let mut cursor = 0;
        while let Some(pos) = self.find_from(haystack, cursor) {
            count += 1;
            cursor = pos + self.len();
        }
        count
    }
}

/// Counts non-overlapping occurrences of `pattern` in `buffer`
pub fn count_occurrences(buffer: &[u8], pattern: &str) -> SearchResult<u64> {
    Ok(PatternMatcher::new(pattern)?.count(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_overlapping_count() {
        let matcher = PatternMatcher::new("aa").unwrap();
        assert_eq!(matcher.count(b"aaaa"), 2);
        assert_eq!(matcher.count(b"aaa"), 1);
        assert_eq!(matcher.count(b"aaaaa"), 2);
    }

    #[test]
    fn test_matches_inside_words() {
        let matcher = PatternMatcher::new("at").unwrap();
        assert_eq!(matcher.count(b"the cat sat on the mat"), 3);
        assert_eq!(matcher.count(b"attic batch"), 2);
    }

    #[test]
    fn test_no_match_and_short_haystack() {
        let matcher = PatternMatcher::new("word").unwrap();
        assert_eq!(matcher.count(b""), 0);
        assert_eq!(matcher.count(b"wor"), 0);
        assert_eq!(matcher.count(b"Word WORD"), 0);
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert!(matches!(
            PatternMatcher::new(""),
            Err(SearchError::EmptyPattern)
        ));
        assert!(count_occurrences(b"anything", "").is_err());
    }

    #[test]
    fn test_find_from() {
        let matcher = PatternMatcher::new("ab").unwrap();
        let text = b"ab_ab_ab";
        assert_eq!(matcher.find_from(text, 0), Some(0));
        assert_eq!(matcher.find_from(text, 1), Some(3));
        assert_eq!(matcher.find_from(text, 7), None);
        assert_eq!(matcher.find_from(text, 100), None);
    }

    #[test]
    fn test_count_occurrences_helper() {
        assert_eq!(count_occurrences(b"aaaa", "aa").unwrap(), 2);
        assert_eq!(count_occurrences(b"TODO TODO", "TODO").unwrap(), 2);
    }

    #[test]
    fn test_non_ascii_bytes() {
        let matcher = PatternMatcher::new("é").unwrap();
        assert_eq!(matcher.count("café é".as_bytes()), 2);
        assert_eq!(matcher.count(&[0xff, 0xc3, 0xa9, 0x00]), 1);
    }
}
