//! Scanner for LaTeX commands and their arguments.
//!
//! Rule finders that only need to locate a marker or a simple command form
//! use regular expressions. Commands with arguments cannot be found that
//! way: braces nest, braces may be escaped, and a `%` comments out the rest
//! of its line including any brackets on it. The scanner in this module
//! walks the text once, tracking escaping and comment state, and hands back
//! command matches with the exact byte ranges of their brace-balanced
//! arguments.
//!
//! The scanner is deliberately not a LaTeX parser: it knows nothing about
//! the meaning of commands beyond the argument counts it was given.

use std::collections::HashMap;

use crate::trace::Span;

/// A located command together with the ranges of its arguments.
///
/// Argument spans exclude the surrounding brackets. Absent optional
/// arguments are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMatch {
    /// Command name without the leading backslash.
    pub name: String,
    /// The whole command, from its backslash to the end of its last
    /// argument.
    pub span: Span,
    pub args: Vec<Span>,
    pub opt_args: Vec<Option<Span>>,
}

#[derive(Debug, Clone, Copy)]
struct Arity {
    args: usize,
    opt_args: usize,
}

/// Finds occurrences of registered commands in a string.
///
/// `\newcommand` and `\renewcommand` receive special treatment: when
/// registered, a match carries the defined name and the definition body as
/// its two argument spans and the parameter count as its optional argument;
/// when not registered, the defined name is skipped over so that it is never
/// mistaken for a call site.
#[derive(Debug, Default)]
pub struct CommandScanner {
    commands: HashMap<String, Arity>,
}

impl CommandScanner {
    pub fn new() -> CommandScanner {
        Default::default()
    }

    /// Register a command by name (without backslash) with the given number
    /// of mandatory and optional arguments.
    pub fn command(mut self, name: &str, args: usize, opt_args: usize) -> CommandScanner {
        self.commands
            .insert(name.to_string(), Arity { args, opt_args });
        self
    }

    /// Find the first occurrence of a registered command at or after `from`.
    ///
    /// A registered command whose mandatory arguments are not all present
    /// (missing braces, unterminated argument) is not a match; scanning
    /// continues behind it.
    pub fn find(&self, text: &str, from: usize) -> Option<CommandMatch> {
        let mut cursor = Cursor::new(text, from);
        while cursor.has_next() {
            if cursor.peek_pure() != Some(b'\\') {
                cursor.next();
                continue;
            }
            let begin = cursor.pos();
            let name = read_command_name(&mut cursor);
            if name.is_empty() {
                // a control symbol such as \% or \{; the escape state makes
                // the loop step over the symbol
                continue;
            }
            if name == "newcommand" || name == "renewcommand" {
                if cursor.peek() == Some(b'*') {
                    cursor.next();
                }
                if self.commands.contains_key(&name) {
                    if let Some(found) = read_definition(&mut cursor, begin, &name) {
                        return Some(found);
                    }
                } else {
                    // skip the defined name so call sites are not reported
                    // at definition sites
                    read_parameter(&mut cursor, b'{', b'}');
                }
            } else if let Some(&arity) = self.commands.get(&name) {
                if let Some(found) = read_call(&mut cursor, begin, &name, arity) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// All matches, left to right, each search resuming after the end of
    /// the previous match.
    pub fn find_all(&self, text: &str) -> Vec<CommandMatch> {
        let mut matches = Vec::new();
        let mut begin = 0;
        while let Some(found) = self.find(text, begin) {
            begin = found.span.end;
            matches.push(found);
        }
        matches
    }
}

fn read_command_name(cursor: &mut Cursor) -> String {
    let mut name = String::new();
    cursor.next(); // the backslash
    while let Some(c) = cursor.peek() {
        if !c.is_ascii_alphabetic() {
            break;
        }
        name.push(c as char);
        cursor.next();
    }
    name
}

fn read_call(cursor: &mut Cursor, begin: usize, name: &str, arity: Arity) -> Option<CommandMatch> {
    let mut opt_args = Vec::with_capacity(arity.opt_args);
    for _ in 0..arity.opt_args {
        opt_args.push(read_parameter(cursor, b'[', b']'));
    }
    let mut args = Vec::with_capacity(arity.args);
    for _ in 0..arity.args {
        args.push(read_parameter(cursor, b'{', b'}')?);
    }
    Some(CommandMatch {
        name: name.to_string(),
        span: Span::new(begin, cursor.pos()),
        args,
        opt_args,
    })
}

/// Parse `{\name}[n]{body}` behind `\newcommand`.
fn read_definition(cursor: &mut Cursor, begin: usize, name: &str) -> Option<CommandMatch> {
    let defined_name = read_parameter(cursor, b'{', b'}')?;
    let parameter_count = read_parameter(cursor, b'[', b']');
    let body = read_parameter(cursor, b'{', b'}')?;
    Some(CommandMatch {
        name: name.to_string(),
        span: Span::new(begin, cursor.pos()),
        args: vec![defined_name, body],
        opt_args: vec![parameter_count],
    })
}

/// Read one bracketed parameter, honoring nesting. Escaped brackets and
/// brackets inside comments do not count toward the nesting depth. Returns
/// the range between the brackets, or `None` when the parameter is absent
/// or unterminated.
fn read_parameter(cursor: &mut Cursor, open: u8, close: u8) -> Option<Span> {
    cursor.skip_whitespace_and_comments();
    if cursor.peek_pure() != Some(open) {
        return None;
    }
    cursor.next();
    let start = cursor.pos();
    let mut depth = 1usize;
    while depth > 0 {
        match cursor.peek_pure() {
            Some(c) if c == open => depth += 1,
            Some(c) if c == close => depth -= 1,
            _ => {}
        }
        cursor.next()?;
    }
    Some(Span::new(start, cursor.pos() - 1))
}

/// Byte cursor that keeps track of whether the current position is escaped
/// or inside a line comment.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    in_comment: bool,
    // the byte at `pos` is preceded by an unescaped backslash
    pending_escape: bool,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, pos: usize) -> Cursor<'a> {
        Cursor {
            bytes: text.as_bytes(),
            pos,
            in_comment: false,
            pending_escape: false,
        }
    }

    fn has_next(&self) -> bool {
        self.pos < self.bytes.len()
    }

    fn pos(&self) -> usize {
        self.pos
    }

    /// Consume and return the next byte, updating the comment and escape
    /// state.
    fn next(&mut self) -> Option<u8> {
        let c = *self.bytes.get(self.pos)?;
        self.pos += 1;
        let escaped = self.pending_escape;
        self.pending_escape = false;
        if !escaped && c == b'%' {
            self.in_comment = true;
        }
        if c == b'\n' {
            self.in_comment = false;
        }
        if !self.in_comment && !escaped && c == b'\\' {
            self.pending_escape = true;
        }
        Some(c)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Like [peek](Cursor::peek), but `None` when the byte is escaped or
    /// commented out.
    fn peek_pure(&self) -> Option<u8> {
        if self.pending_escape || self.in_comment {
            return None;
        }
        self.peek()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if self.in_comment || (c.is_ascii_whitespace() && !self.pending_escape) {
                self.next();
            } else {
                break;
            }
        }
    }
}
