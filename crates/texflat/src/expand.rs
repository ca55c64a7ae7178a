//! The import expander.
//!
//! Drives the whole flattening: load the root file, strip skip regions,
//! repeatedly apply the import rules by loading referenced files and
//! recursing, then apply the substitution rules to the fully expanded
//! document. Along the way the discovered file graph is recorded.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::finder::FileFinder;
use crate::newcommand::NewCommandSubstitution;
use crate::rewrite::{self, Match};
use crate::rules::{Import, RuleSet, SubstitutionRule};
use crate::trace::{SourceId, TraceableString};

/// Substitution passes are repeated until no rule matches; this bounds the
/// repetition for rule sets that never reach a fixpoint.
const MAX_SUBSTITUTION_PASSES: usize = 10;

/// What is known about one source after expansion: its raw content and the
/// set of sources it directly includes.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    pub content: String,
    pub includes: BTreeSet<SourceId>,
}

/// The discovered file graph, keyed by canonical source identifier.
///
/// The import relation is a DAG, not a tree: a source imported from two
/// places contributes two occurrences to the flat document but has exactly
/// one entry here.
pub type Structure = BTreeMap<SourceId, SourceRecord>;

/// A non-fatal finding of an expansion run. The flattened document is valid
/// despite these; they are reported so the author can act on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A macro call site could not be fully expanded within the depth limit
    /// and was left untouched.
    MacroRecursionLimit { name: String, offset: usize },
    /// The substitution rules were still producing matches when the pass
    /// limit was reached.
    SubstitutionPassLimit { passes: usize },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MacroRecursionLimit { name, offset } => write!(
                f,
                "\\{name} (byte {offset}) exceeded the expansion depth and was left untouched"
            ),
            Diagnostic::SubstitutionPassLimit { passes } => write!(
                f,
                "substitution rules kept matching after {passes} passes; giving up"
            ),
        }
    }
}

/// The result of expanding a document tree.
#[derive(Debug)]
pub struct Expansion {
    /// The flat document, every byte traceable to its origin.
    pub document: TraceableString,
    /// The file graph that was walked to produce it.
    pub structure: Structure,
    pub diagnostics: Vec<Diagnostic>,
}

/// Flattens a document tree.
///
/// ```no_run
/// use texflat::{Expander, FileFinder};
/// let mut expander = Expander::new(FileFinder::new("paper"));
/// let expansion = expander.expand(std::path::Path::new("paper/main.tex"))?;
/// println!("{}", expansion.document);
/// # Ok::<(), texflat::Error>(())
/// ```
pub struct Expander {
    rules: RuleSet,
    finder: FileFinder,
    substitute_newcommands: bool,
}

#[derive(Default)]
struct RunState {
    /// Fully expanded contents, one entry per source id. A file imported
    /// twice is loaded once and spliced twice; each occurrence is
    /// independently traceable to the same source.
    cache: HashMap<SourceId, TraceableString>,
    /// The sources currently being expanded, root first.
    ancestors: Vec<SourceId>,
    structure: Structure,
}

impl Expander {
    /// An expander with the canonical rule set.
    pub fn new(finder: FileFinder) -> Expander {
        Expander::with_rules(finder, RuleSet::new())
    }

    pub fn with_rules(finder: FileFinder, rules: RuleSet) -> Expander {
        Expander {
            rules,
            finder,
            substitute_newcommands: false,
        }
    }

    /// The rule set consulted by this expander.
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Whether user-defined macros are substituted at their call sites
    /// (off by default).
    pub fn substitute_newcommands(&mut self, enabled: bool) -> &mut Expander {
        self.substitute_newcommands = enabled;
        self
    }

    /// Flatten the document tree rooted at `root`.
    pub fn expand(&mut self, root: &Path) -> Result<Expansion> {
        let (root_id, raw) = self.finder.read_root(root)?;
        let mut state = RunState::default();
        let document = self.expand_source(&mut state, root_id, raw)?;
        let mut diagnostics = Vec::new();
        let document = self.apply_substitution_rules(document, &mut diagnostics)?;
        Ok(Expansion {
            document,
            structure: state.structure,
            diagnostics,
        })
    }

    /// Recursively expand one source: strip its skip regions, then splice
    /// in the fully expanded contents of everything it imports, in source
    /// order.
    fn expand_source(
        &self,
        state: &mut RunState,
        source_id: SourceId,
        raw: String,
    ) -> Result<TraceableString> {
        state
            .structure
            .entry(source_id.clone())
            .or_insert_with(|| SourceRecord {
                content: raw.clone(),
                includes: BTreeSet::new(),
            });
        let mut content = TraceableString::from_source(raw, source_id.clone(), 0);
        // skip regions are dropped before imports are located, so an import
        // inside a skipped block is never expanded
        content = self
            .apply_skip_rules(&content)
            .map_err(|err| err.for_source(&source_id))?;
        state.ancestors.push(source_id.clone());
        loop {
            let imports = self.find_imports(content.as_str())?;
            if imports.is_empty() {
                break;
            }
            let mut matches = Vec::with_capacity(imports.len());
            for import in imports {
                let (target_id, target_raw) = self.finder.fetch(&import.path, &source_id)?;
                if state.ancestors.contains(&target_id) {
                    let mut cycle = state.ancestors.clone();
                    cycle.push(target_id);
                    return Err(Error::ImportCycle { cycle });
                }
                state
                    .structure
                    .get_mut(&source_id)
                    .expect("the calling source was recorded when it was loaded")
                    .includes
                    .insert(target_id.clone());
                let replacement = match state.cache.get(&target_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let expanded = self.expand_source(state, target_id.clone(), target_raw)?;
                        state.cache.insert(target_id, expanded.clone());
                        expanded
                    }
                };
                matches.push(Match::replace(import.span, replacement));
            }
            content = rewrite::rewrite(&content, matches)?;
        }
        state.ancestors.pop();
        Ok(content)
    }

    fn apply_skip_rules(&self, content: &TraceableString) -> Result<TraceableString> {
        let mut spans = Vec::new();
        for rule in &self.rules.skip_rules {
            spans.extend(rule.find_skips(content.as_str())?);
        }
        rewrite::delete(content, spans)
    }

    /// All import matches of one pass, in source order. Overlaps are
    /// rejected before anything is fetched.
    fn find_imports(&self, content: &str) -> Result<Vec<Import>> {
        let mut imports = Vec::new();
        for rule in &self.rules.import_rules {
            imports.extend(rule.find_imports(content));
        }
        imports.sort_by_key(|import| (import.span.start, import.span.end));
        rewrite::check_disjoint(imports.iter().map(|import| import.span))?;
        Ok(imports)
    }

    /// Substitution rules run last, over the whole document, so that
    /// definitions imported from sub-files are visible to them. Passes are
    /// repeated until no rule matches.
    fn apply_substitution_rules(
        &mut self,
        mut document: TraceableString,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<TraceableString> {
        let mut newcommands = self
            .substitute_newcommands
            .then(NewCommandSubstitution::new);
        for pass in 0.. {
            let mut substitutions = Vec::new();
            for rule in self.rules.substitution_rules.iter_mut() {
                substitutions.extend(rule.find_substitutions(&document)?);
            }
            if let Some(rule) = newcommands.as_mut() {
                substitutions.extend(rule.find_substitutions(&document)?);
            }
            if substitutions.is_empty() {
                break;
            }
            if pass == MAX_SUBSTITUTION_PASSES {
                diagnostics.push(Diagnostic::SubstitutionPassLimit { passes: pass });
                break;
            }
            let matches = substitutions
                .into_iter()
                .map(|s| Match {
                    span: s.span,
                    replacement: s.replacement,
                })
                .collect();
            document = rewrite::rewrite(&document, matches)?;
        }
        if let Some(mut rule) = newcommands {
            diagnostics.extend(rule.take_diagnostics());
        }
        Ok(document)
    }
}

/// Flatten with the canonical rules over the real file system, rooted at
/// the directory of `root`.
pub fn expand<P: AsRef<Path>>(root: P) -> Result<(TraceableString, Structure)> {
    let root = root.as_ref();
    let root_dir = root.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
    let mut expander = Expander::new(FileFinder::new(root_dir));
    let expansion = expander.expand(root)?;
    Ok((expansion.document, expansion.structure))
}
