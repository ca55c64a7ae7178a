//! Substitution of user-defined macros.
//!
//! LaTeX authors define shorthands with `\newcommand`; for tools that read
//! the flat document those shorthands are noise. This module scans the
//! fully expanded document for definitions and rewrites every call site
//! with the definition body, substituting arguments.
//!
//! The expanded text is generated: it carries no origin, because its bytes
//! never existed in any input file. Tools that want definition-site
//! attribution have to perform a secondary lookup.

use std::collections::HashMap;

use crate::error::Result;
use crate::expand::Diagnostic;
use crate::rules::{Substitution, SubstitutionRule};
use crate::scanner::{CommandMatch, CommandScanner};
use crate::trace::{Span, TraceableString};

/// How many levels of macro-in-macro expansion are attempted before a call
/// site is given up on.
pub const MAX_EXPANSION_DEPTH: usize = 16;

/// A macro collected from a `\newcommand`-style definition.
#[derive(Debug, Clone)]
pub struct MacroDefinition {
    /// Macro name without the leading backslash.
    pub name: String,
    /// Number of mandatory parameters.
    pub arity: usize,
    /// The definition body, with `#k` parameter markers.
    pub body: String,
    /// The whole definition in the scanned document.
    pub span: Span,
}

/// Scan for `\newcommand`/`\renewcommand` definitions and their starred
/// variants. Definitions with a malformed name or parameter count are
/// ignored.
pub fn find_macro_definitions(content: &str) -> Vec<MacroDefinition> {
    let scanner = CommandScanner::new()
        .command("newcommand", 2, 1)
        .command("renewcommand", 2, 1);
    scanner
        .find_all(content)
        .iter()
        .filter_map(|m| definition_from_match(content, m))
        .collect()
}

fn definition_from_match(content: &str, m: &CommandMatch) -> Option<MacroDefinition> {
    let raw_name = content[m.args[0].start..m.args[0].end].trim();
    let name = raw_name.strip_prefix('\\').unwrap_or(raw_name);
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let arity = match m.opt_args[0] {
        None => 0,
        Some(span) => content[span.start..span.end].trim().parse().ok()?,
    };
    Some(MacroDefinition {
        name: name.to_string(),
        arity,
        body: content[m.args[1].start..m.args[1].end].to_string(),
        span: m.span,
    })
}

/// Replace `#1` … `#9` in a definition body with the given arguments.
/// A marker whose digit exceeds the argument count is kept verbatim.
fn substitute_parameters(body: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if c == '#' {
            if let Some(&(_, digit)) = chars.peek() {
                if let Some(k) = digit.to_digit(10) {
                    let k = k as usize;
                    if (1..=args.len()).contains(&k) {
                        chars.next();
                        out.push_str(args[k - 1]);
                        continue;
                    }
                }
            }
        }
        out.push(c);
    }
    out
}

/// Substitution rule that rewrites macro call sites with their definition.
///
/// The rule collects the definitions present in the document it is handed
/// (a later definition overrides an earlier one), removes the definitions
/// from the output, and replaces every call site outside a definition with
/// the instantiated body. Unknown macros and call sites with missing
/// arguments are left untouched.
///
/// A call site that cannot be fully expanded within
/// [MAX_EXPANSION_DEPTH] levels is left untouched and recorded as a
/// non-fatal [Diagnostic::MacroRecursionLimit].
#[derive(Default)]
pub struct NewCommandSubstitution {
    definitions: HashMap<String, MacroDefinition>,
    scanner: CommandScanner,
    diagnostics: Vec<Diagnostic>,
}

impl NewCommandSubstitution {
    pub fn new() -> NewCommandSubstitution {
        Default::default()
    }

    /// Register a definition. A later definition overrides an earlier one.
    pub fn define(&mut self, definition: MacroDefinition) {
        self.scanner =
            std::mem::take(&mut self.scanner).command(&definition.name, definition.arity, 0);
        self.definitions.insert(definition.name.clone(), definition);
    }

    /// Drain the diagnostics collected so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Fully expand one call. `None` when the depth limit is exceeded; the
    /// caller then leaves the call site untouched.
    fn expand_call(&self, name: &str, args: &[&str], depth: usize) -> Option<String> {
        if depth >= MAX_EXPANSION_DEPTH {
            return None;
        }
        let definition = self.definitions.get(name)?;
        let instantiated = substitute_parameters(&definition.body, args);
        self.expand_text(&instantiated, depth + 1)
    }

    /// Expand every known call site in `text`, recursing into the
    /// replacements.
    fn expand_text(&self, text: &str, depth: usize) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in self.scanner.find_all(text) {
            let args: Vec<&str> = m
                .args
                .iter()
                .map(|span| &text[span.start..span.end])
                .collect();
            let replacement = self.expand_call(&m.name, &args, depth)?;
            out.push_str(&text[cursor..m.span.start]);
            out.push_str(&replacement);
            cursor = m.span.end;
        }
        out.push_str(&text[cursor..]);
        Some(out)
    }
}

impl SubstitutionRule for NewCommandSubstitution {
    fn find_substitutions(&mut self, content: &TraceableString) -> Result<Vec<Substitution>> {
        let text = content.as_str();
        let mut substitutions = Vec::new();
        let mut definition_spans = Vec::new();
        for definition in find_macro_definitions(text) {
            definition_spans.push(definition.span);
            substitutions.push(Substitution {
                span: definition.span,
                replacement: None,
            });
            self.define(definition);
        }
        if self.definitions.is_empty() {
            return Ok(substitutions);
        }
        for m in self.scanner.find_all(text) {
            // a call site inside a removed definition dies with it
            if definition_spans.iter().any(|span| span.contains(m.span.start)) {
                continue;
            }
            let args: Vec<&str> = m
                .args
                .iter()
                .map(|span| &text[span.start..span.end])
                .collect();
            match self.expand_call(&m.name, &args, 0) {
                Some(replacement) => substitutions.push(Substitution {
                    span: m.span,
                    replacement: Some(TraceableString::generated(replacement)),
                }),
                None => {
                    // one report per macro; later passes and further call
                    // sites of the same macro add nothing new
                    let already_reported = self.diagnostics.iter().any(|diagnostic| {
                        matches!(diagnostic, Diagnostic::MacroRecursionLimit { name, .. } if *name == m.name)
                    });
                    if !already_reported {
                        self.diagnostics.push(Diagnostic::MacroRecursionLimit {
                            name: m.name.clone(),
                            offset: m.span.start,
                        });
                    }
                }
            }
        }
        Ok(substitutions)
    }
}
