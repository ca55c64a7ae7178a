//! Removal of LaTeX line comments.

use crate::rewrite;
use crate::trace::{Span, TraceableString};

/// Remove every line comment from the document.
///
/// A comment runs from an un-escaped `%` to the end of its line. The line
/// break itself is kept: dropping it would fuse the neighboring lines and
/// change how LaTeX tokenizes them. A `%` is un-escaped iff the run of
/// backslashes immediately before it has even length.
///
/// The removal is realized as a set of disjoint deletions through the
/// rewriter, so the provenance of every surviving character is untouched.
pub fn remove_comments(content: &TraceableString) -> TraceableString {
    let spans = comment_spans(content.as_str());
    rewrite::delete(content, spans).expect("comment spans are disjoint and in bounds")
}

fn comment_spans(text: &str) -> Vec<Span> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut escaped = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if !escaped => escaped = true,
            b'%' if !escaped => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                spans.push(Span::new(start, i));
                continue;
            }
            _ => escaped = false,
        }
        i += 1;
    }
    spans
}
