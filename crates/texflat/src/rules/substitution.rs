//! Rules that replace regions with computed text.

use crate::error::Result;
use crate::scanner::CommandScanner;
use crate::trace::{Span, TraceableString};

/// One region to replace. `None` deletes the region.
///
/// A replacement that is sliced out of the matched content keeps its
/// provenance; freshly generated replacement text carries no origin.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub span: Span,
    pub replacement: Option<TraceableString>,
}

/// A rule that replaces regions of the flattened document.
///
/// Substitution rules run last, over the fully import-expanded document, so
/// that material imported from sub-files is visible to them. They are
/// re-applied until no rule finds a match, which lets one substitution
/// uncover another (for example a `\added` nested inside a `\replaced`
/// argument).
pub trait SubstitutionRule {
    fn find_substitutions(&mut self, content: &TraceableString) -> Result<Vec<Substitution>>;
}

/// Substitutes the markup of the changes package
/// (`\usepackage{changes}`): the revision markers are resolved to the text
/// of the current revision.
///
/// `\added[..]{X}` and `\highlight[..]{X}` become `X`, `\deleted[..]{X}`
/// and `\comment[..]{X}` are removed, `\replaced[..]{X}{Y}` becomes `X`.
/// Kept arguments are slices of the input and keep their provenance.
pub struct ChangesRule {
    added: String,
    deleted: String,
    replaced: String,
    highlight: String,
    comment: String,
}

impl ChangesRule {
    /// With `prefix`, the rule matches the command names produced by the
    /// package's prefix option (`\chadded` etc.) instead of the plain ones.
    pub fn new(prefix: bool) -> ChangesRule {
        let name = |base: &str| {
            if prefix {
                format!("ch{base}")
            } else {
                base.to_string()
            }
        };
        ChangesRule {
            added: name("added"),
            deleted: name("deleted"),
            replaced: name("replaced"),
            highlight: name("highlight"),
            comment: name("comment"),
        }
    }

    fn scanner(&self) -> CommandScanner {
        CommandScanner::new()
            .command(&self.added, 1, 1)
            .command(&self.deleted, 1, 1)
            .command(&self.replaced, 2, 1)
            .command(&self.highlight, 1, 1)
            .command(&self.comment, 1, 1)
    }
}

impl SubstitutionRule for ChangesRule {
    fn find_substitutions(&mut self, content: &TraceableString) -> Result<Vec<Substitution>> {
        let mut substitutions = Vec::new();
        for m in self.scanner().find_all(content.as_str()) {
            let replacement = if m.name == self.deleted || m.name == self.comment {
                None
            } else {
                let kept = m.args[0];
                Some(content.slice(kept.start, kept.end)?)
            };
            substitutions.push(Substitution {
                span: m.span,
                replacement,
            });
        }
        Ok(substitutions)
    }
}

/// Removes `\todo[..]{...}` notes of the todonotes package.
pub struct TodoRule;

impl SubstitutionRule for TodoRule {
    fn find_substitutions(&mut self, content: &TraceableString) -> Result<Vec<Substitution>> {
        let scanner = CommandScanner::new().command("todo", 1, 1);
        Ok(scanner
            .find_all(content.as_str())
            .into_iter()
            .map(|m| Substitution {
                span: m.span,
                replacement: None,
            })
            .collect())
    }
}
