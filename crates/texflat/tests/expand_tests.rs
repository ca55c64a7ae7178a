//! End-to-end tests driving the expander over an in-memory file tree.

use std::path::Path;

use texflat::error::Error;
use texflat::rules::{ChangesRule, RuleSet, SkipRule, TodoRule};
use texflat::trace::Span;
use texflat::{Diagnostic, Expander, Expansion, FileFinder, SourceId, TraceableString};
use texflat_common::InMemoryFileSystem;

fn expander(files: &[(&str, &str)]) -> Expander {
    let mut file_system = InMemoryFileSystem::default();
    for (path, content) in files {
        file_system.add_file(*path, *content);
    }
    Expander::new(FileFinder::with_file_system("", Box::new(file_system)))
}

fn expand(files: &[(&str, &str)], root: &str) -> Expansion {
    expander(files).expand(Path::new(root)).unwrap()
}

fn origin_of(document: &TraceableString, index: usize) -> (Option<String>, usize) {
    let origin = document.get_origin(index).unwrap();
    (origin.source.map(|id| id.to_string()), origin.offset)
}

#[test]
fn simple_input_chain() {
    let expansion = expand(
        &[("main.tex", "A\n\\input{b}\nC"), ("b.tex", "B")],
        "main.tex",
    );
    let document = &expansion.document;
    assert_eq!(document.as_str(), "A\nB\nC");
    assert_eq!(origin_of(document, 0), (Some("main.tex".into()), 0));
    assert_eq!(origin_of(document, 2), (Some("b.tex".into()), 0));
    assert_eq!(origin_of(document, 4), (Some("main.tex".into()), 12));
}

#[test]
fn every_byte_traces_to_its_source() {
    let expansion = expand(
        &[
            ("main.tex", "A\n\\input{b}\nC\n\\input{dir/d}\n"),
            ("b.tex", "B line\n"),
            ("dir/d.tex", "D"),
        ],
        "main.tex",
    );
    let document = &expansion.document;
    for i in 0..document.len() {
        let origin = document.get_origin(i).unwrap();
        let source = origin.source.expect("nothing here is generated");
        let raw = &expansion.structure[&source].content;
        assert_eq!(raw.as_bytes()[origin.offset], document.byte_at(i).unwrap());
    }
}

#[test]
fn skip_region() {
    let expansion = expand(
        &[(
            "main.tex",
            "X\n%%FLACHTEX-SKIP-START\nHIDE\n%%FLACHTEX-SKIP-STOP\nY",
        )],
        "main.tex",
    );
    let document = &expansion.document;
    assert_eq!(document.as_str(), "X\n\nY");
    for i in 0..document.len() {
        let (source, offset) = origin_of(document, i);
        assert_eq!(source, Some("main.tex".into()));
        // nothing surviving originates from inside the skipped block
        assert!(offset < 2 || offset >= 49);
    }
}

#[test]
fn imports_inside_skipped_blocks_are_not_expanded() {
    // the skipped import would not even resolve
    let expansion = expand(
        &[(
            "main.tex",
            "A\n%%FLACHTEX-SKIP-START\n\\input{ghost}\n%%FLACHTEX-SKIP-STOP\nB",
        )],
        "main.tex",
    );
    assert_eq!(expansion.document.as_str(), "A\n\nB");
}

#[test]
fn cycle_detection() {
    let err = expander(&[("a.tex", "\\input{b}"), ("b.tex", "\\input{a}")])
        .expand(Path::new("a.tex"))
        .unwrap_err();
    match err {
        Error::ImportCycle { cycle } => {
            let cycle: Vec<&str> = cycle.iter().map(SourceId::as_str).collect();
            assert_eq!(cycle, vec!["a.tex", "b.tex", "a.tex"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn self_import_is_a_cycle() {
    let err = expander(&[("a.tex", "\\input{a}")])
        .expand(Path::new("a.tex"))
        .unwrap_err();
    assert!(matches!(err, Error::ImportCycle { .. }));
}

#[test]
fn explicit_import_with_skip() {
    let expansion = expand(
        &[
            (
                "main.tex",
                "%%FLACHTEX-EXPLICIT-IMPORT[c.tex]\n%%FLACHTEX-SKIP-START\nstuff\n%%FLACHTEX-SKIP-STOP",
            ),
            ("c.tex", "HI"),
        ],
        "main.tex",
    );
    let document = &expansion.document;
    assert!(document.as_str().starts_with("HI"));
    assert!(!document.as_str().contains("stuff"));
    assert_eq!(origin_of(document, 0), (Some("c.tex".into()), 0));
}

#[test]
fn newcommand_substitution() {
    let mut expander = expander(&[("main.tex", "\\newcommand{\\t}{T}\nUse \\t here.")]);
    expander.substitute_newcommands(true);
    let expansion = expander.expand(Path::new("main.tex")).unwrap();
    let document = &expansion.document;
    assert_eq!(document.as_str(), "\nUse T here.");
    let t = document.as_str().find('T').unwrap();
    assert_eq!(document.get_origin(t).unwrap().source, None);
    assert_eq!(origin_of(document, 1), (Some("main.tex".into()), 19));
    assert_eq!(origin_of(document, t + 1), (Some("main.tex".into()), 25));
    assert!(expansion.diagnostics.is_empty());
}

#[test]
fn newcommand_definitions_from_imports_are_visible() {
    let files = &[
        ("main.tex", "\\input{defs}\\shout{x}"),
        ("defs.tex", "\\newcommand{\\shout}[1]{#1!}\n"),
    ];
    let mut expander = expander(files);
    expander.substitute_newcommands(true);
    let expansion = expander.expand(Path::new("main.tex")).unwrap();
    assert_eq!(expansion.document.as_str(), "\nx!");
}

#[test]
fn recursive_macro_reports_a_diagnostic() {
    let mut expander = expander(&[("main.tex", "\\newcommand{\\me}{\\me}go \\me now")]);
    expander.substitute_newcommands(true);
    let expansion = expander.expand(Path::new("main.tex")).unwrap();
    assert_eq!(expansion.document.as_str(), "go \\me now");
    assert!(matches!(
        expansion.diagnostics[..],
        [Diagnostic::MacroRecursionLimit { .. }]
    ));
}

struct FixedSkips(Vec<Span>);

impl SkipRule for FixedSkips {
    fn find_skips(&self, _: &str) -> texflat::Result<Vec<Span>> {
        Ok(self.0.clone())
    }
}

#[test]
fn overlapping_rules_are_rejected() {
    let mut rules = RuleSet::bare();
    rules
        .skip_rules
        .push(Box::new(FixedSkips(vec![Span::new(0, 5)])));
    rules
        .skip_rules
        .push(Box::new(FixedSkips(vec![Span::new(3, 8)])));
    let mut file_system = InMemoryFileSystem::default();
    file_system.add_file("main.tex", "0123456789");
    let mut expander = Expander::with_rules(
        FileFinder::with_file_system("", Box::new(file_system)),
        rules,
    );
    let err = expander.expand(Path::new("main.tex")).unwrap_err();
    assert!(matches!(err, Error::OverlappingMatches { .. }));
}

#[test]
fn diamond_imports_are_loaded_once_and_spliced_twice() {
    let expansion = expand(
        &[
            ("main.tex", "\\input{left}\\input{right}"),
            ("left.tex", "[\\input{shared}]"),
            ("right.tex", "(\\input{shared})"),
            ("shared.tex", "S"),
        ],
        "main.tex",
    );
    let document = &expansion.document;
    assert_eq!(document.as_str(), "[S](S)");
    // both occurrences trace back to the one shared source
    assert_eq!(origin_of(document, 1), (Some("shared.tex".into()), 0));
    assert_eq!(origin_of(document, 4), (Some("shared.tex".into()), 0));
    // one structure entry, reachable from two parents
    assert_eq!(expansion.structure.len(), 4);
    assert!(expansion.structure[&SourceId::new("left.tex")]
        .includes
        .contains(&SourceId::new("shared.tex")));
    assert!(expansion.structure[&SourceId::new("right.tex")]
        .includes
        .contains(&SourceId::new("shared.tex")));
}

#[test]
fn structure_records_raw_content_and_includes() {
    let expansion = expand(
        &[
            ("main.tex", "A\\input{sub}"),
            ("sub.tex", "%%FLACHTEX-SKIP-START\nraw stays raw\n%%FLACHTEX-SKIP-STOP\nS"),
        ],
        "main.tex",
    );
    let main = &expansion.structure[&SourceId::new("main.tex")];
    assert_eq!(main.content, "A\\input{sub}");
    assert!(main.includes.contains(&SourceId::new("sub.tex")));
    // the recorded content is the raw file, before any rule ran
    let sub = &expansion.structure[&SourceId::new("sub.tex")];
    assert!(sub.content.contains("raw stays raw"));
    assert!(sub.includes.is_empty());
}

#[test]
fn relative_import_from_a_subdirectory() {
    let expansion = expand(
        &[
            ("main.tex", "0\n\\input{dir/sub.tex}\n4\n"),
            ("dir/sub.tex", "2\n\\include{sub2}"),
            ("dir/sub2.tex", "3"),
        ],
        "main.tex",
    );
    assert_eq!(expansion.document.as_str(), "0\n2\n3\n4\n");
    assert_eq!(
        origin_of(&expansion.document, 4),
        (Some("dir/sub2.tex".into()), 0)
    );
}

#[test]
fn changes_and_todos_are_substituted_after_imports() {
    let files = &[
        ("main.tex", "\\input{sub} \\added[id]{kept}\n"),
        ("sub.tex", "a\\todo{drop me}b"),
    ];
    let mut expander = expander(files);
    expander
        .rules_mut()
        .substitution_rules
        .push(Box::new(TodoRule));
    expander
        .rules_mut()
        .substitution_rules
        .push(Box::new(ChangesRule::new(false)));
    let expansion = expander.expand(Path::new("main.tex")).unwrap();
    let document = &expansion.document;
    assert_eq!(document.as_str(), "ab kept\n");
    // the kept argument still traces into main.tex
    let k = document.as_str().find("kept").unwrap();
    assert_eq!(origin_of(document, k), (Some("main.tex".into()), 23));
}

#[test]
fn missing_import_reports_the_tried_paths() {
    let err = expander(&[("main.tex", "\\input{ghost}")])
        .expand(Path::new("main.tex"))
        .unwrap_err();
    match err {
        Error::FileNotFound { reference, tried } => {
            assert_eq!(reference, "ghost");
            assert!(!tried.is_empty());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unbalanced_skip_markers_name_the_file() {
    let err = expander(&[("main.tex", "%%FLACHTEX-SKIP-START\nnever stopped")])
        .expand(Path::new("main.tex"))
        .unwrap_err();
    match err {
        Error::SkipMismatch { source, .. } => {
            assert_eq!(source, Some(SourceId::new("main.tex")));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn two_imports_on_one_line_are_both_expanded() {
    let expansion = expand(
        &[
            ("main.tex", "\\input{a} and \\input{b}"),
            ("a.tex", "A"),
            ("b.tex", "B"),
        ],
        "main.tex",
    );
    assert_eq!(expansion.document.as_str(), "A and B");
}

#[test]
fn expansion_result_round_trips_through_json() {
    let expansion = expand(
        &[("main.tex", "A\n\\input{b}\nC"), ("b.tex", "B")],
        "main.tex",
    );
    let value = expansion.document.to_json();
    let restored = TraceableString::from_json(&value).unwrap();
    assert_eq!(restored, expansion.document);
}
