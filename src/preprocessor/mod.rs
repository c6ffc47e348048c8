//! Miniature C preprocessor
//!
//! Flattens header source into a stream of logical lines:
//!
//! - `//` and `/* */` comments are stripped first (block comments become a
//!   single space so adjacent tokens stay separated)
//! - `#include "path"` is resolved against the include root, recursively
//!   preprocessed, and spliced in place
//! - `#define NAME [text]` feeds the macro table; a bare `#define NAME` is a
//!   flag macro (visible to `#ifdef`, never substituted)
//! - `#ifdef` / `#ifndef` / `#else` / `#endif` select branches on macro
//!   *presence*, not value; both branches are always scanned structurally so
//!   nested conditionals inside a dead branch cannot leak an `#endif`
//! - every other directive passes through untouched
//!
//! Macros with a non-empty replacement are substituted as whole words into
//! each active line, in definition order, before the line is classified.

use rustc_hash::FxHashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Preprocessing failure. A missing include aborts the whole header load;
/// there is no partial flattening.
#[derive(Debug)]
pub enum PreprocessError {
    Include {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::Include { path, source } => {
                write!(f, "cannot read include '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for PreprocessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PreprocessError::Include { source, .. } => Some(source),
        }
    }
}

/// How a conditional block stopped.
enum BlockEnd {
    Else,
    Endif,
    Eof,
}

/// Line-oriented preprocessor with a persistent macro table.
///
/// One instance accumulates macros across all headers of a load session, so
/// a macro defined in the first header is visible in the last.
pub struct Preprocessor {
    include_root: PathBuf,
    macros: FxHashMap<String, String>,
    /// Names in first-definition order; substitution follows this, not the
    /// map's iteration order.
    order: Vec<String>,
}

impl Preprocessor {
    pub fn new(include_root: impl Into<PathBuf>) -> Self {
        Self {
            include_root: include_root.into(),
            macros: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Register a macro by hand, as the configuration layer does for the
    /// export tag. An empty value makes a flag macro.
    pub fn define(&mut self, name: &str, value: &str) {
        self.insert_macro(name, value.trim());
    }

    fn insert_macro(&mut self, name: &str, value: &str) {
        if self
            .macros
            .insert(name.to_string(), value.to_string())
            .is_none()
        {
            self.order.push(name.to_string());
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Current replacement text for a macro, if defined.
    pub fn macro_value(&self, name: &str) -> Option<&str> {
        self.macros.get(name).map(|s| s.as_str())
    }

    /// Read and flatten a header file.
    pub fn preprocess_file(&mut self, path: &Path) -> Result<Vec<String>, PreprocessError> {
        let source = fs::read_to_string(path).map_err(|source| PreprocessError::Include {
            path: path.to_path_buf(),
            source,
        })?;
        self.preprocess(&source)
    }

    /// Flatten header source text into logical lines.
    pub fn preprocess(&mut self, source: &str) -> Result<Vec<String>, PreprocessError> {
        let stripped = strip_comments(source);
        let lines: Vec<&str> = stripped.lines().collect();
        let mut out = Vec::new();
        let _ = self.process_block(&lines, 0, true, &mut out)?;
        Ok(out)
    }

    /// Process lines starting at `i` until an unmatched `#else`/`#endif` or
    /// end of input. When `active` is false the block is scanned only for
    /// structure: nothing is emitted, no directive takes effect.
    fn process_block(
        &mut self,
        lines: &[&str],
        mut i: usize,
        active: bool,
        out: &mut Vec<String>,
    ) -> Result<(usize, BlockEnd), PreprocessError> {
        while i < lines.len() {
            // Conditional directives are classified on the raw line: `#ifdef`
            // tests presence in the macro table, and substituting the tested
            // name away first would defeat that.
            let mut raw_words = lines[i].split_whitespace();
            match raw_words.next() {
                None => {
                    i += 1;
                    continue;
                }
                Some(first @ ("#ifdef" | "#ifndef")) => {
                    let name = raw_words.next().unwrap_or("");
                    let defined = self.is_defined(name);
                    let taken = if first == "#ifdef" { defined } else { !defined };

                    let (next, end) =
                        self.process_block(lines, i + 1, active && taken, out)?;
                    i = next;
                    if let BlockEnd::Else = end {
                        let (next, _) =
                            self.process_block(lines, i, active && !taken, out)?;
                        i = next;
                    }
                    continue;
                }
                Some("#else") => return Ok((i + 1, BlockEnd::Else)),
                Some("#endif") => return Ok((i + 1, BlockEnd::Endif)),
                Some(_) => {}
            }

            if !active {
                i += 1;
                continue;
            }

            let line = self.substitute(lines[i]);
            let mut words = line.split_whitespace();
            let first = words.next().unwrap_or("");

            match first {
                "#include" => {
                    let target = words.next().unwrap_or("");
                    // Strip the surrounding quotes or angle brackets.
                    let target = target
                        .trim_matches(|c| c == '"' || c == '<' || c == '>')
                        .to_string();
                    let path = self.include_root.join(target);
                    let included = self.preprocess_file(&path)?;
                    out.extend(included);
                    i += 1;
                }
                "#define" => {
                    if let Some(name) = words.next() {
                        // Everything after the macro name is the replacement.
                        let rest = line
                            .find("#define")
                            .map(|p| &line[p + "#define".len()..])
                            .unwrap_or("");
                        let value = match rest.find(name) {
                            Some(pos) => rest[pos + name.len()..].trim(),
                            None => "",
                        };
                        self.insert_macro(name, value);
                    }
                    i += 1;
                }
                _ => {
                    // Unknown directives pass through with ordinary lines.
                    out.push(line);
                    i += 1;
                }
            }
        }
        Ok((i, BlockEnd::Eof))
    }

    /// Substitute every macro with a non-empty replacement into `line`, as a
    /// whole-word match, oldest definition first. Flag macros are never
    /// substituted. A replacement that names a later-defined macro is itself
    /// expanded by the passes that follow it.
    fn substitute(&self, line: &str) -> String {
        let mut line = line.to_string();
        for name in &self.order {
            let value = &self.macros[name];
            if value.is_empty() {
                continue;
            }
            line = replace_word(&line, name, value);
        }
        line
    }
}

/// Replace whole-word occurrences of `word` in `text` with `value`.
pub(crate) fn replace_word(text: &str, word: &str, value: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(word) {
        let before_ok = pos == 0
            || !rest[..pos]
                .chars()
                .next_back()
                .map(is_ident_char)
                .unwrap_or(false);
        let after = &rest[pos + word.len()..];
        let after_ok = !after.chars().next().map(is_ident_char).unwrap_or(false);

        out.push_str(&rest[..pos]);
        if before_ok && after_ok {
            out.push_str(value);
        } else {
            out.push_str(word);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Strip `//` and `/* */` comments from the whole source. Block comments
/// collapse to a single space so `a/**/b` stays two tokens.
pub fn strip_comments(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if chars[i] == '/' && i + 1 < chars.len() && chars[i + 1] == '*' {
            i += 2;
            while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            out.push(' ');
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
