//! Rules that mark regions to be dropped before imports are expanded.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::trace::Span;

/// A rule that marks regions of a file for removal.
///
/// Skip rules run on each file before its imports are located, so an import
/// inside a skipped region is never expanded. The returned spans of one
/// rule must be pairwise disjoint; spans of different rules are checked
/// against each other by the rewriter.
pub trait SkipRule {
    fn find_skips(&self, content: &str) -> Result<Vec<Span>>;
}

static SKIP_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*%%FLACHTEX-SKIP-START").unwrap());
static SKIP_STOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*%%FLACHTEX-SKIP-STOP").unwrap());

/// Skips regions delimited by marker lines:
///
/// ```tex
/// %%FLACHTEX-SKIP-START
/// ...
/// %%FLACHTEX-SKIP-STOP
/// ```
///
/// Each marker must be at the start of a line, after optional blanks. The
/// removed region runs from the start of the START marker to the end of the
/// STOP marker, so the line break behind the STOP marker survives. Nesting
/// is not supported: a second START before a STOP is an error, as are
/// unpaired markers.
pub struct SkipBlockRule;

impl SkipRule for SkipBlockRule {
    fn find_skips(&self, content: &str) -> Result<Vec<Span>> {
        let mut markers: Vec<(usize, usize, bool)> = Vec::new();
        for m in SKIP_START.find_iter(content) {
            markers.push((m.start(), m.end(), true));
        }
        for m in SKIP_STOP.find_iter(content) {
            markers.push((m.start(), m.end(), false));
        }
        markers.sort();

        let mut skips = Vec::new();
        let mut open: Option<usize> = None;
        for (start, end, is_start) in markers {
            match (is_start, open) {
                (true, None) => open = Some(start),
                (true, Some(_)) => {
                    return Err(Error::SkipMismatch {
                        source: None,
                        offset: start,
                        reason: "a second START marker before the previous block was stopped",
                    })
                }
                (false, Some(begin)) => {
                    skips.push(Span::new(begin, end));
                    open = None;
                }
                (false, None) => {
                    return Err(Error::SkipMismatch {
                        source: None,
                        offset: start,
                        reason: "a STOP marker has no preceding START",
                    })
                }
            }
        }
        if let Some(begin) = open {
            return Err(Error::SkipMismatch {
                source: None,
                offset: begin,
                reason: "a START marker has no matching STOP",
            });
        }
        Ok(skips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_block_is_skipped() {
        let content = "X\n%%FLACHTEX-SKIP-START\nHIDE\n%%FLACHTEX-SKIP-STOP\nY";
        let skips = SkipBlockRule.find_skips(content).unwrap();
        assert_eq!(skips, vec![Span::new(2, 49)]);
        assert_eq!(&content[49..], "\nY");
    }

    #[test]
    fn indented_markers_are_recognized() {
        let content = "A\n  %%FLACHTEX-SKIP-START\nB\n\t%%FLACHTEX-SKIP-STOP\nC";
        let skips = SkipBlockRule.find_skips(content).unwrap();
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].start, 2);
    }

    #[test]
    fn two_blocks() {
        let content = "%%FLACHTEX-SKIP-START\na\n%%FLACHTEX-SKIP-STOP\nkeep\n%%FLACHTEX-SKIP-START\nb\n%%FLACHTEX-SKIP-STOP\n";
        let skips = SkipBlockRule.find_skips(content).unwrap();
        assert_eq!(skips.len(), 2);
        assert!(skips[0].end <= skips[1].start);
    }

    #[test]
    fn mid_line_marker_is_ignored() {
        let content = "text %%FLACHTEX-SKIP-START more";
        assert_eq!(SkipBlockRule.find_skips(content).unwrap(), vec![]);
    }

    #[test]
    fn start_without_stop_is_an_error() {
        let content = "%%FLACHTEX-SKIP-START\nrest";
        assert!(matches!(
            SkipBlockRule.find_skips(content),
            Err(Error::SkipMismatch { .. })
        ));
    }

    #[test]
    fn stop_without_start_is_an_error() {
        let content = "%%FLACHTEX-SKIP-STOP\nrest";
        assert!(matches!(
            SkipBlockRule.find_skips(content),
            Err(Error::SkipMismatch { .. })
        ));
    }

    #[test]
    fn nested_start_is_an_error() {
        let content =
            "%%FLACHTEX-SKIP-START\n%%FLACHTEX-SKIP-START\n%%FLACHTEX-SKIP-STOP\n";
        assert!(matches!(
            SkipBlockRule.find_skips(content),
            Err(Error::SkipMismatch { .. })
        ));
    }
}
