//! The pattern rules that drive the rewriter.
//!
//! A rule is a value with two faculties: find all matches of its pattern in
//! a content string, and (for import and substitution rules) say what each
//! match is replaced with. Rules come in three categories:
//!
//! - *skip rules* delete a region,
//! - *import rules* replace a region with the contents of another file,
//! - *substitution rules* replace a region with computed text.
//!
//! A rule is a pure function of the content it is handed, not of a running
//! cursor: all matches of one pass are computed up front and applied
//! together by the rewriter, which rejects overlapping matches.

mod import;
mod skip;
mod substitution;

pub use import::{ExplicitImportRule, Import, ImportRule, NativeImportRule, SubimportRule};
pub use skip::{SkipBlockRule, SkipRule};
pub use substitution::{ChangesRule, Substitution, SubstitutionRule, TodoRule};

/// The three ordered rule lists consulted by the expander.
pub struct RuleSet {
    pub skip_rules: Vec<Box<dyn SkipRule>>,
    pub import_rules: Vec<Box<dyn ImportRule>>,
    pub substitution_rules: Vec<Box<dyn SubstitutionRule>>,
}

impl RuleSet {
    /// The canonical rules: marker-based skips and the
    /// `\input`/`\include`, `\subimport` and explicit-marker import family.
    /// No substitution rules are enabled by default.
    pub fn new() -> RuleSet {
        RuleSet {
            skip_rules: vec![Box::new(SkipBlockRule)],
            import_rules: vec![
                Box::new(NativeImportRule),
                Box::new(SubimportRule),
                Box::new(ExplicitImportRule),
            ],
            substitution_rules: Vec::new(),
        }
    }

    /// A rule set with no rules at all.
    pub fn bare() -> RuleSet {
        RuleSet {
            skip_rules: Vec::new(),
            import_rules: Vec::new(),
            substitution_rules: Vec::new(),
        }
    }
}

impl Default for RuleSet {
    fn default() -> RuleSet {
        RuleSet::new()
    }
}
