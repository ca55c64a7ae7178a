use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use texflat::comments::remove_comments;
use texflat::error::Error;
use texflat::rules::{ChangesRule, TodoRule};
use texflat::{Expander, FileFinder};

/// Flatten a multi-file LaTeX document into a single string while keeping,
/// for every character, the file and byte offset it came from.
///
/// By default the flat text is printed as-is; with --to_json an envelope is
/// printed that carries the provenance map alongside the content.
#[derive(Parser)]
#[clap(version)]
struct Cli {
    /// Path to the root file, e.g. main.tex
    path: PathBuf,

    /// Emit a JSON envelope instead of the raw flat text
    #[clap(long = "to_json")]
    to_json: bool,

    /// Remove LaTeX line comments from the flattened document
    #[clap(long = "comments", alias = "remove_comments")]
    comments: bool,

    /// Attach the raw content of every source to the JSON envelope
    #[clap(long = "attach")]
    attach: bool,

    /// Substitute the commands of the changes package
    #[clap(long = "changes")]
    changes: bool,

    /// Match the prefixed command names of the changes package
    #[clap(long = "changes_prefix")]
    changes_prefix: bool,

    /// Remove todo notes
    #[clap(long = "todos")]
    todos: bool,

    /// Substitute user-defined macros at their call sites
    #[clap(long = "newcommand")]
    newcommand: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(3);
        }
    };
    if let Err(err) = run(&cli) {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &Error) -> i32 {
    match err {
        Error::FileNotFound { .. } | Error::Io { .. } => 1,
        _ => 2,
    }
}

fn run(cli: &Cli) -> Result<(), Error> {
    let root_dir = cli.path.parent().unwrap_or_else(|| Path::new(""));
    let mut expander = Expander::new(FileFinder::new(root_dir));
    if cli.todos {
        expander
            .rules_mut()
            .substitution_rules
            .push(Box::new(TodoRule));
    }
    if cli.changes {
        expander
            .rules_mut()
            .substitution_rules
            .push(Box::new(ChangesRule::new(cli.changes_prefix)));
    }
    expander.substitute_newcommands(cli.newcommand);

    let expansion = expander.expand(&cli.path)?;
    for diagnostic in &expansion.diagnostics {
        eprintln!("{} {diagnostic}", "warning:".yellow().bold());
    }

    let mut document = expansion.document;
    if cli.comments {
        document = remove_comments(&document);
    }

    if cli.to_json {
        let mut envelope = document.to_json();
        if cli.attach {
            let sources: serde_json::Map<String, serde_json::Value> = expansion
                .structure
                .iter()
                .map(|(id, record)| {
                    (
                        id.to_string(),
                        serde_json::Value::String(record.content.clone()),
                    )
                })
                .collect();
            envelope["sources"] = serde_json::Value::Object(sources);
        }
        println!("{envelope}");
    } else {
        println!("{document}");
    }
    Ok(())
}
