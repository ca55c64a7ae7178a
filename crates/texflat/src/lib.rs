//! # Texflat: traceable LaTeX flattening.
//!
//! Texflat flattens a multi-file LaTeX document tree into a single string
//! while keeping, for every byte of the output, the file and byte offset it
//! originated from. Downstream tools (linters, grammar checkers) report
//! findings against the flat document; the provenance map takes them back
//! to the authoring source.
//!
//! The engine is built from a handful of pieces:
//!
//! - [trace::TraceableString], the provenance-preserving string all editing
//!   happens on;
//! - [rules], pattern rules that skip, import or substitute regions;
//! - [rewrite], which applies the matches of one rule pass;
//! - [expand::Expander], the recursive driver over the file graph.
//!
//! Texflat is not a LaTeX parser: it never builds a syntax tree and
//! understands no semantics beyond the patterns its rules match. It does
//! not render, typeset or validate anything.

pub mod comments;
pub mod error;
pub mod expand;
pub mod finder;
pub mod newcommand;
pub mod rewrite;
pub mod rules;
pub mod scanner;
pub mod trace;

pub use error::{Error, Result};
pub use expand::{expand, Diagnostic, Expander, Expansion, Structure};
pub use finder::FileFinder;
pub use trace::{Origin, SourceId, TraceableString};
