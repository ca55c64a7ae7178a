//! Error handling
//!
//! The engine surfaces errors; it does not swallow them. Every fatal error
//! carries enough context to be actionable: the reference and candidate list
//! for a failed resolution, the full path of an import cycle, the offending
//! spans of an overlap. The only non-fatal signal, the macro recursion
//! limit, is reported as a [Diagnostic](crate::expand::Diagnostic) instead
//! because the partial result remains valid.

use std::fmt;
use std::path::PathBuf;

use crate::trace::{SourceId, Span};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An import reference exhausted the resolution order without naming an
    /// existing file.
    FileNotFound {
        reference: String,
        tried: Vec<PathBuf>,
    },
    /// A file existed but could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A source on the ancestor stack was imported again. The cycle path
    /// starts at the root and ends with the repeated source.
    ImportCycle { cycle: Vec<SourceId> },
    /// Two matches of one rule pass share at least one byte. The engine
    /// refuses to pick a winner.
    OverlappingMatches { first: Span, second: Span },
    /// A JSON envelope did not describe a valid traceable string.
    MalformedEnvelope(String),
    /// An index or slice bound lay outside the string.
    IndexOutOfRange { index: usize, len: usize },
    /// Unbalanced skip markers.
    SkipMismatch {
        source: Option<SourceId>,
        offset: usize,
        reason: &'static str,
    },
}

impl Error {
    /// Attach the source a per-file rule pass was running on. Only variants
    /// that are raised without knowledge of their file are annotated.
    pub(crate) fn for_source(mut self, id: &SourceId) -> Error {
        if let Error::SkipMismatch { source, .. } = &mut self {
            source.get_or_insert_with(|| id.clone());
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileNotFound { reference, tried } => {
                write!(f, "no file found for reference `{reference}`; tried: ")?;
                for (i, path) in tried.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", path.display())?;
                }
                Ok(())
            }
            Error::Io { path, source } => {
                write!(f, "could not read {}: {source}", path.display())
            }
            Error::ImportCycle { cycle } => {
                write!(f, "cyclic imports: ")?;
                for (i, id) in cycle.iter().enumerate() {
                    if i > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{id}")?;
                }
                Ok(())
            }
            Error::OverlappingMatches { first, second } => {
                write!(f, "rule matches {first} and {second} overlap")
            }
            Error::MalformedEnvelope(reason) => {
                write!(f, "malformed envelope: {reason}")
            }
            Error::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for a string of {len} bytes")
            }
            Error::SkipMismatch {
                source,
                offset,
                reason,
            } => {
                match source {
                    Some(id) => write!(f, "unbalanced skip markers in {id}: ")?,
                    None => write!(f, "unbalanced skip markers: ")?,
                }
                write!(f, "{reason} (byte {offset})")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
