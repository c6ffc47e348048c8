//! Declaration span extraction
//!
//! Scans flattened, comment-free header text and cuts out the raw textual
//! spans of the four declaration classes. No AST is built here; each span is
//! handed to the resolver as-is. Scanning is heuristic: a keyword counts only
//! when it starts an actual declaration head (`struct X {`, `struct X;`,
//! `enum X {`), so type *usages* like `struct X *p;` inside a member list are
//! not picked up as declarations.

use crate::preprocessor::replace_word;

/// Raw declaration spans in source order, one list per class.
///
/// Loading order is fixed downstream: enums, then structs, then typedefs,
/// then functions, so each stage may forward-reference an earlier one.
#[derive(Debug, Default)]
pub struct Declarations {
    pub enums: Vec<String>,
    pub structs: Vec<String>,
    pub typedefs: Vec<String>,
    pub functions: Vec<String>,
}

/// Partition flattened header text into declaration spans.
///
/// `export_text` is the export-tag macro's *substituted* value; a function
/// declaration is any span starting with it and ending at the next `;`.
/// With no export text configured, no functions are extracted.
pub fn extract(text: &str, export_text: Option<&str>) -> Declarations {
    let mut decls = Declarations::default();

    for pos in word_positions(text, "enum") {
        if let Some(span) = aggregate_span(text, pos, "enum", false) {
            decls.enums.push(span);
        }
    }
    for pos in word_positions(text, "struct") {
        if let Some(span) = aggregate_span(text, pos, "struct", true) {
            decls.structs.push(span);
        }
    }
    for pos in word_positions(text, "typedef") {
        if let Some(span) = span_to_semicolon(text, pos) {
            decls.typedefs.push(span);
        }
    }
    if let Some(tag) = export_text {
        if !tag.is_empty() {
            let mut from = 0;
            while let Some(rel) = text[from..].find(tag) {
                let pos = from + rel;
                match span_to_semicolon(text, pos) {
                    Some(span) => {
                        from = pos + span.len();
                        decls.functions.push(span);
                    }
                    None => break,
                }
            }
        }
    }

    decls
}

/// Strip `const` and `volatile` everywhere; they carry no meaning for
/// layout or call binding.
pub fn strip_qualifiers(text: &str) -> String {
    let text = replace_word(text, "const", "");
    replace_word(&text, "volatile", "")
}

/// Positions where `word` occurs as a whole word.
fn word_positions(text: &str, word: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find(word) {
        let pos = from + rel;
        let before_ok = pos == 0
            || !text[..pos]
                .chars()
                .next_back()
                .map(is_ident_char)
                .unwrap_or(false);
        let after = &text[pos + word.len()..];
        let after_ok = !after.chars().next().map(is_ident_char).unwrap_or(false);
        if before_ok && after_ok {
            positions.push(pos);
        }
        from = pos + word.len();
    }
    positions
}

/// Cut a `struct`/`enum` declaration span starting at the keyword, or
/// return `None` when this occurrence is just a type usage.
///
/// Defining form runs non-greedily to the nearest `};`. The opaque form
/// (`struct NAME;`) is only accepted when `allow_opaque` is set; an opaque
/// enum is not part of the grammar.
fn aggregate_span(text: &str, key_pos: usize, keyword: &str, allow_opaque: bool) -> Option<String> {
    let mut rest = text[key_pos + keyword.len()..].char_indices();

    // Skip whitespace, then the aggregate name.
    let mut saw_name = false;
    let mut next_sig: Option<(usize, char)> = None;
    let mut in_name = false;
    for (off, c) in &mut rest {
        if c.is_whitespace() {
            if in_name {
                in_name = false;
            }
            continue;
        }
        if is_ident_char(c) {
            if saw_name && !in_name {
                // Two separate identifiers: `struct Foo bar` is a usage.
                return None;
            }
            saw_name = true;
            in_name = true;
            continue;
        }
        next_sig = Some((off, c));
        break;
    }
    let (sig_off, sig) = next_sig?;
    if !saw_name {
        return None;
    }
    let abs = key_pos + keyword.len() + sig_off;

    match sig {
        ';' if allow_opaque => Some(text[key_pos..=abs].to_string()),
        '{' => {
            let close = text[abs..].find("};")?;
            Some(text[key_pos..abs + close + 2].to_string())
        }
        _ => None,
    }
}

/// Span from `start` through the next `;`, inclusive.
fn span_to_semicolon(text: &str, start: usize) -> Option<String> {
    let end = text[start..].find(';')?;
    Some(text[start..start + end + 1].to_string())
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defined_and_opaque_structs() {
        let text = "struct Point { int x; int y; };\nstruct Opaque;\n";
        let decls = extract(text, None);
        assert_eq!(decls.structs.len(), 2);
        assert!(decls.structs[0].starts_with("struct Point {"));
        assert_eq!(decls.structs[1], "struct Opaque;");
    }

    #[test]
    fn test_struct_usage_is_not_a_declaration() {
        let text = "struct Node { struct Node *next; int v; };";
        let decls = extract(text, None);
        assert_eq!(decls.structs.len(), 1);
        assert!(decls.structs[0].starts_with("struct Node {"));
    }

    #[test]
    fn test_enum_span_and_enum_typed_field() {
        let text = "enum Color { RED, GREEN };\nstruct S { enum Color c; };";
        let decls = extract(text, None);
        assert_eq!(decls.enums.len(), 1);
        assert!(decls.enums[0].starts_with("enum Color {"));
        assert_eq!(decls.structs.len(), 1);
    }

    #[test]
    fn test_typedef_span() {
        let text = "typedef unsigned char byte;\ntypedef int (*Cmp)(int, int);";
        let decls = extract(text, None);
        assert_eq!(
            decls.typedefs,
            vec![
                "typedef unsigned char byte;".to_string(),
                "typedef int (*Cmp)(int, int);".to_string()
            ]
        );
    }

    #[test]
    fn test_function_spans_follow_the_export_text() {
        let text = "__declspec(dllexport) int add(int a, int b);\nint internal(void);\n__declspec(dllexport) void ping();";
        let decls = extract(text, Some("__declspec(dllexport)"));
        assert_eq!(decls.functions.len(), 2);
        assert!(decls.functions[0].ends_with("add(int a, int b);"));
        assert!(decls.functions[1].ends_with("void ping();"));
    }

    #[test]
    fn test_no_export_text_means_no_functions() {
        let text = "EXPORT int f(void);";
        assert!(extract(text, None).functions.is_empty());
        assert!(extract(text, Some("")).functions.is_empty());
    }

    #[test]
    fn test_strip_qualifiers() {
        assert_eq!(
            strip_qualifiers("const char *s; volatile int v;").replace("  ", " "),
            " char *s; int v;"
        );
    }
}
