//! The match-splicing rewriter.
//!
//! Every rule application funnels through [rewrite]: given the matches of
//! one rule pass, it verifies that they do not overlap and assembles the
//! output from the kept slices and the replacements. Because only
//! traceable-string slicing and concatenation are used, provenance is
//! preserved by construction.

use crate::error::{Error, Result};
use crate::trace::{Span, TraceableString};

/// One region to rewrite. `None` deletes the region.
#[derive(Debug, Clone)]
pub struct Match {
    pub span: Span,
    pub replacement: Option<TraceableString>,
}

impl Match {
    pub fn delete(span: Span) -> Match {
        Match {
            span,
            replacement: None,
        }
    }

    pub fn replace(span: Span, replacement: TraceableString) -> Match {
        Match {
            span,
            replacement: Some(replacement),
        }
    }
}

/// Apply the matches of one rule pass to `content`.
///
/// Matches are sorted by position and must be pairwise disjoint; the
/// rewriter refuses to pick a winner among overlapping matches. An empty
/// match list returns the input unchanged.
pub fn rewrite(content: &TraceableString, mut matches: Vec<Match>) -> Result<TraceableString> {
    if matches.is_empty() {
        return Ok(content.clone());
    }
    matches.sort_by_key(|m| (m.span.start, m.span.end));
    check_disjoint(matches.iter().map(|m| m.span))?;
    let mut result = TraceableString::empty();
    let mut cursor = 0;
    for m in &matches {
        result = result.concat(&content.slice(cursor, m.span.start)?);
        if let Some(replacement) = &m.replacement {
            result = result.concat(replacement);
        }
        cursor = m.span.end;
    }
    result = result.concat(&content.slice(cursor, content.len())?);
    Ok(result)
}

/// Remove all given spans from `content`.
pub fn delete(content: &TraceableString, spans: Vec<Span>) -> Result<TraceableString> {
    rewrite(content, spans.into_iter().map(Match::delete).collect())
}

/// Verify that a sorted sequence of spans is pairwise disjoint.
pub fn check_disjoint<I: Iterator<Item = Span>>(mut spans: I) -> Result<()> {
    let mut previous = match spans.next() {
        None => return Ok(()),
        Some(span) => span,
    };
    for span in spans {
        if previous.intersects(span) {
            return Err(Error::OverlappingMatches {
                first: previous,
                second: span,
            });
        }
        previous = span;
    }
    Ok(())
}
