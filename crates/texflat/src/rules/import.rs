//! Rules that locate references to other files.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::trace::Span;

/// A located reference to another file.
///
/// `span` covers the text to be replaced by the referenced file's contents;
/// `path` is the reference exactly as the author wrote it (resolution is the
/// file finder's job).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub span: Span,
    pub path: String,
}

/// A rule that locates references to other files.
pub trait ImportRule {
    fn find_imports(&self, content: &str) -> Vec<Import>;
}

// The prefix guard `(?:[^%\n]|\\%)*?` lets a match start anywhere on a line
// except behind an unescaped %, so commented-out imports are not expanded.
static NATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:[^%\n]|\\%)*?(\\(?:input|include)\{([^}]*)\})").unwrap()
});
static SUBIMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:[^%\n]|\\%)*?(\\subimport\*?\{([^}]*)\}\{([^}]*)\})").unwrap()
});
static EXPLICIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*(%%FLACHTEX-EXPLICIT-IMPORT\[([^\]]*)\])").unwrap());

/// Detects inclusions of the form `\input{path}` and `\include{path}`,
/// where `path` may omit the `.tex` suffix.
pub struct NativeImportRule;

impl ImportRule for NativeImportRule {
    fn find_imports(&self, content: &str) -> Vec<Import> {
        NATIVE
            .captures_iter(content)
            .map(|captures| {
                let command = captures.get(1).unwrap();
                Import {
                    span: Span::new(command.start(), command.end()),
                    path: captures[2].trim().to_string(),
                }
            })
            .collect()
    }
}

/// Detects imports by the subimport package, `\subimport{dir}{file}` and
/// `\subimport*{dir}{file}`. The effective reference is `dir/file`.
pub struct SubimportRule;

impl ImportRule for SubimportRule {
    fn find_imports(&self, content: &str) -> Vec<Import> {
        SUBIMPORT
            .captures_iter(content)
            .map(|captures| {
                let command = captures.get(1).unwrap();
                let path: PathBuf = PathBuf::from(captures[2].trim()).join(captures[3].trim());
                Import {
                    span: Span::new(command.start(), command.end()),
                    path: path.to_string_lossy().into_owned(),
                }
            })
            .collect()
    }
}

/// Detects the marker form `%%FLACHTEX-EXPLICIT-IMPORT[path]` at the start
/// of a line. The marker lets authors make an inclusion visible to the
/// flattener that their build performs through some other mechanism.
pub struct ExplicitImportRule;

impl ImportRule for ExplicitImportRule {
    fn find_imports(&self, content: &str) -> Vec<Import> {
        EXPLICIT
            .captures_iter(content)
            .map(|captures| {
                let command = captures.get(1).unwrap();
                Import {
                    span: Span::new(command.start(), command.end()),
                    path: captures[2].trim().to_string(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_and_include() {
        let content = "a\n\\input{b}\nc\n\\include{d.tex}\n";
        let imports = NativeImportRule.find_imports(content);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "b");
        assert_eq!(
            &content[imports[0].span.start..imports[0].span.end],
            "\\input{b}"
        );
        assert_eq!(imports[1].path, "d.tex");
    }

    #[test]
    fn import_after_text_on_the_same_line() {
        let content = "intro text \\input{b} trailing";
        let imports = NativeImportRule.find_imports(content);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].span, Span::new(11, 20));
    }

    #[test]
    fn commented_import_is_ignored() {
        let content = "text % \\input{b}\n";
        assert_eq!(NativeImportRule.find_imports(content), vec![]);
    }

    #[test]
    fn import_behind_escaped_percent() {
        let content = "100\\% sure \\input{b}\n";
        let imports = NativeImportRule.find_imports(content);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].path, "b");
    }

    #[test]
    fn subimport_joins_directory_and_file() {
        let content = "\\subimport{chapters}{one}\n\\subimport*{x}{y.tex}\n";
        let imports = SubimportRule.find_imports(content);
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].path, "chapters/one");
        assert_eq!(imports[1].path, "x/y.tex");
    }

    #[test]
    fn explicit_marker() {
        let content = "%%FLACHTEX-EXPLICIT-IMPORT[c.tex]\nrest";
        let imports = ExplicitImportRule.find_imports(content);
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].path, "c.tex");
        assert_eq!(imports[0].span, Span::new(0, 33));
    }

    #[test]
    fn explicit_marker_must_start_a_line() {
        let content = "text %%FLACHTEX-EXPLICIT-IMPORT[c.tex]\n";
        assert_eq!(ExplicitImportRule.find_imports(content), vec![]);
    }

    #[test]
    fn path_is_trimmed() {
        let content = "\\input{ b }\n";
        let imports = NativeImportRule.find_imports(content);
        assert_eq!(imports[0].path, "b");
    }
}
