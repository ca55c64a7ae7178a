//! Provenance-aware strings.
//!
//! This module implements the data structure on which all rewriting happens:
//! a [TraceableString] is a flat piece of text together with an ordered list
//! of [Segments](Segment) recording, for every byte, the source and byte
//! offset it originated from.
//!
//! Rather than a per-byte parallel array, the provenance map is stored as a
//! run-length list of segments. A segment list costs memory proportional to
//! the number of edit boundaries, which after normal rewriting is orders of
//! magnitude smaller than the document itself. Every editing operation
//! (slicing, concatenation) maintains the segment list by construction, so
//! no per-character bookkeeping is ever needed.
//!
//! The segment list always forms an exact partition of the content: segments
//! are contiguous, non-overlapping, in ascending order, and never empty.
//! Adjacent segments that continue each other in the same source are merged,
//! keeping the list minimal.

use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canonical identifier for the provenance of a piece of text.
///
/// In practice this is the normalized path of a file, or an author-supplied
/// label such as `"<input>"`. Equality is byte-wise.
///
/// The identifier is reference counted, so cloning it (which happens for
/// every segment produced while rewriting) is cheap.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(Arc<str>);

impl SourceId {
    pub fn new<S: AsRef<str>>(id: S) -> SourceId {
        SourceId(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> SourceId {
        SourceId::new(id)
    }
}

impl From<String> for SourceId {
    fn from(id: String) -> SourceId {
        SourceId::new(id)
    }
}

impl Serialize for SourceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<SourceId, D::Error> {
        let id = String::deserialize(deserializer)?;
        Ok(SourceId::new(id))
    }
}

/// A half-open byte range `[start, end)` within a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Whether the two spans share at least one position.
    pub fn intersects(&self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}

/// The (source, offset) pair identifying where a character came from.
///
/// A `None` source denotes generated text that has no authoring origin, for
/// example bytes injected by a substitution rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub source: Option<SourceId>,
    pub offset: usize,
}

/// Immutable record mapping a half-open range `[begin, end)` of a traceable
/// string back to `(source, offset)`.
///
/// Position `begin + k` of the owning string originated at byte
/// `offset + k` of `source`. At the wire boundary the source field is
/// serialized under the name `origin`, with `null` for generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub begin: usize,
    pub end: usize,
    #[serde(rename = "origin")]
    pub source: Option<SourceId>,
    pub offset: usize,
}

impl Segment {
    fn new(begin: usize, end: usize, source: Option<SourceId>, offset: usize) -> Segment {
        Segment {
            begin,
            end,
            source,
            offset,
        }
    }

    fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Clip this segment to `[a, b)` and re-base it so that the result is a
    /// valid segment of the sliced string. Returns `None` when nothing of the
    /// segment survives.
    fn clip(&self, a: usize, b: usize) -> Option<Segment> {
        let begin = self.begin.max(a);
        let end = self.end.min(b);
        if begin >= end {
            return None;
        }
        Some(Segment::new(
            begin - a,
            end - a,
            self.source.clone(),
            self.offset + (begin - self.begin),
        ))
    }

    /// The merge rule: `next` may be absorbed into this segment iff it is
    /// adjacent and continues the same source at the following offset.
    fn mergeable(&self, next: &Segment) -> bool {
        self.end == next.begin
            && self.source == next.source
            && self.offset + self.len() == next.offset
    }
}

/// Drop empty segments and merge adjacent ones wherever the merge rule holds.
fn coalesce(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if segment.begin >= segment.end {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.mergeable(&segment) {
                last.end = segment.end;
                continue;
            }
        }
        out.push(segment);
    }
    out
}

fn compute_line_index(content: &str) -> Vec<usize> {
    let mut index = vec![0];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            index.push(i + 1);
        }
    }
    index
}

/// Serialized form of a traceable string.
#[derive(Serialize, Deserialize)]
struct Envelope {
    content: String,
    origins: Vec<Segment>,
}

/// A string that knows, for every byte, where it came from.
///
/// All editing operations produce a new value; a traceable string is
/// logically immutable once returned to the caller.
///
/// ```
/// use texflat::trace::{SourceId, TraceableString};
/// let ts = TraceableString::from_source("hello", SourceId::new("main.tex"), 0);
/// let tail = ts.slice(3, 5).unwrap();
/// assert_eq!(tail.as_str(), "lo");
/// assert_eq!(tail.get_origin(0).unwrap().offset, 3);
/// ```
#[derive(Debug, Clone)]
pub struct TraceableString {
    content: String,
    segments: Vec<Segment>,
    line_index: OnceCell<Vec<usize>>,
}

impl TraceableString {
    /// A traceable string whose every byte originated from `source`,
    /// starting at the given byte offset into it.
    pub fn from_source<S: Into<String>>(content: S, source: SourceId, offset: usize) -> TraceableString {
        let content = content.into();
        let segments = if content.is_empty() {
            Vec::new()
        } else {
            vec![Segment::new(0, content.len(), Some(source), offset)]
        };
        TraceableString {
            content,
            segments,
            line_index: OnceCell::new(),
        }
    }

    /// A traceable string of generated text with no authoring origin.
    pub fn generated<S: Into<String>>(content: S) -> TraceableString {
        let content = content.into();
        let segments = if content.is_empty() {
            Vec::new()
        } else {
            vec![Segment::new(0, content.len(), None, 0)]
        };
        TraceableString {
            content,
            segments,
            line_index: OnceCell::new(),
        }
    }

    pub fn empty() -> TraceableString {
        TraceableString {
            content: String::new(),
            segments: Vec::new(),
            line_index: OnceCell::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// The segment list. Guaranteed to partition `[0, len)` in ascending
    /// order with no empty and no mergeable adjacent segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn byte_at(&self, index: usize) -> Result<u8> {
        self.content
            .as_bytes()
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// The sub-string `[begin, end)` together with its provenance.
    ///
    /// Parent segments are clipped to the range and re-based, so every byte
    /// of the result traces to exactly the same origin as it did in `self`.
    pub fn slice(&self, begin: usize, end: usize) -> Result<TraceableString> {
        if begin > end || end > self.len() {
            return Err(Error::IndexOutOfRange {
                index: begin.max(end),
                len: self.len(),
            });
        }
        let content = match self.content.get(begin..end) {
            Some(slice) => slice.to_string(),
            // not a character boundary
            None => {
                return Err(Error::IndexOutOfRange {
                    index: begin,
                    len: self.len(),
                })
            }
        };
        let segments = self
            .segments
            .iter()
            .filter_map(|segment| segment.clip(begin, end))
            .collect();
        Ok(TraceableString {
            content,
            segments: coalesce(segments),
            line_index: OnceCell::new(),
        })
    }

    /// Concatenation. Segments at the seam are merged when the merge rule
    /// holds, so `ts.slice(0, a)? ++ ts.slice(a, ts.len())?` is
    /// indistinguishable from `ts`.
    pub fn concat(&self, other: &TraceableString) -> TraceableString {
        let mut content = String::with_capacity(self.len() + other.len());
        content.push_str(&self.content);
        content.push_str(&other.content);
        let shift = self.len();
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().map(|segment| {
            Segment::new(
                segment.begin + shift,
                segment.end + shift,
                segment.source.clone(),
                segment.offset,
            )
        }));
        TraceableString {
            content,
            segments: coalesce(segments),
            line_index: OnceCell::new(),
        }
    }

    /// The origin of the byte at `index`, found by binary search over the
    /// segment list.
    pub fn get_origin(&self, index: usize) -> Result<Origin> {
        if index >= self.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        let at = self.segments.partition_point(|segment| segment.end <= index);
        let segment = &self.segments[at];
        Ok(Origin {
            source: segment.source.clone(),
            offset: segment.offset + (index - segment.begin),
        })
    }

    /// The origin of the byte at the given zero-based line and zero-based
    /// column, resolved through a lazily computed line index.
    pub fn get_origin_of_line(&self, line: usize, col: usize) -> Result<Origin> {
        let index = self.line_index();
        let line_start = index.get(line).copied().ok_or(Error::IndexOutOfRange {
            index: line,
            len: index.len(),
        })?;
        self.get_origin(line_start + col)
    }

    fn line_index(&self) -> &[usize] {
        self.line_index
            .get_or_init(|| compute_line_index(&self.content))
    }

    /// The canonical JSON envelope: the flat content plus the segment list,
    /// each segment serialized as `{"begin", "end", "origin", "offset"}`
    /// with `origin: null` for generated text.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "content": self.content,
            "origins": self.segments,
        })
    }

    /// Inverse of [to_json](TraceableString::to_json). Fails with
    /// [Error::MalformedEnvelope] when the envelope does not describe a
    /// valid partition of the content.
    pub fn from_json(value: &serde_json::Value) -> Result<TraceableString> {
        let envelope: Envelope = serde_json::from_value(value.clone())
            .map_err(|err| Error::MalformedEnvelope(err.to_string()))?;
        let mut cursor = 0;
        for segment in &envelope.origins {
            if segment.begin != cursor {
                return Err(Error::MalformedEnvelope(format!(
                    "segment starts at {} where {} was expected",
                    segment.begin, cursor
                )));
            }
            if segment.end <= segment.begin {
                return Err(Error::MalformedEnvelope(format!(
                    "empty segment at {}",
                    segment.begin
                )));
            }
            cursor = segment.end;
        }
        if cursor != envelope.content.len() {
            return Err(Error::MalformedEnvelope(format!(
                "segments cover {} bytes but the content has {}",
                cursor,
                envelope.content.len()
            )));
        }
        Ok(TraceableString {
            content: envelope.content,
            segments: coalesce(envelope.origins),
            line_index: OnceCell::new(),
        })
    }
}

impl PartialEq for TraceableString {
    fn eq(&self, other: &TraceableString) -> bool {
        self.content == other.content && self.segments == other.segments
    }
}

impl Eq for TraceableString {}

impl fmt::Display for TraceableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}
