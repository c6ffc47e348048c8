//! Raw type text → structured descriptors
//!
//! Resolution is staged text transformation, not grammar-driven parsing:
//!
//! 1. Declarator normalization moves `*` and `[N]` sigils off the variable
//!    name onto the type token, so `Foo *p`, `Foo* p` and `Foo p[4]` all
//!    resolve through the same path.
//! 2. Multi-word primitive spellings desugar to one canonical key.
//! 3. Lookup order: primitive, enum (a 4-byte signed int), typedef, struct.
//!    A total miss creates a forward placeholder in the symbol table.
//! 4. Pointer and array wrappers are re-applied outside-in; `void*`, `char*`
//!    and `wchar_t*` become their dedicated descriptor variants.
//!
//! Function-pointer shapes (`RET (*name)(ARGS)`) are parsed by splitting at
//! the first `(*`; their argument lists may not themselves contain
//! function-pointer types (known grammar limitation).

use super::DeclError;
use crate::symbols::ty::{
    desugar_primitive, is_primitive_word, PointerClass, PrimKind, TypeDescriptor,
};
use crate::symbols::SymbolTable;

/// Move pointer and array sigils from the declarator name onto the type
/// token. Must run before any lookup so sigil placement never affects
/// resolution.
pub fn normalize_declarator(type_str: &str, name_str: &str) -> (String, String) {
    let mut ty = type_str.trim().to_string();
    let mut name = name_str.trim().to_string();

    let stars = name.matches('*').count();
    if stars > 0 {
        name = name.replace('*', "");
        ty.push_str(&"*".repeat(stars));
    }

    if let (Some(open), Some(close)) = (name.find('['), name.rfind(']')) {
        if open < close {
            ty.push_str(&name[open..=close]);
            name.replace_range(open..=close, "");
        }
    }

    (ty, name.trim().to_string())
}

/// Resolve a raw type token (sigils already on the type, not the name) into
/// a descriptor, creating a forward placeholder for unknown aggregates.
pub fn resolve_type(table: &mut SymbolTable, raw: &str) -> Result<TypeDescriptor, DeclError> {
    let raw = raw.trim();
    if raw.contains('(') {
        let (desc, _) = parse_function_pointer(table, raw)?;
        return Ok(desc);
    }

    // (1) trailing array marker
    let mut s = raw.to_string();
    let mut array_len: Option<usize> = None;
    if let (Some(open), Some(close)) = (s.find('['), s.rfind(']')) {
        if open < close {
            let inner = s[open + 1..close].trim().to_string();
            let len = inner
                .parse::<usize>()
                .map_err(|_| DeclError::new(format!("bad array length in '{}'", raw)))?;
            array_len = Some(len);
            s.replace_range(open..=close, "");
        }
    }

    // (2) pointer arity
    let arity = s.matches('*').count();
    if arity > 0 {
        s = s.replace('*', "");
    }

    // (3) drop aggregate keywords, collapse whitespace
    let key = s
        .split_whitespace()
        .filter(|w| *w != "struct" && *w != "enum")
        .collect::<Vec<_>>()
        .join(" ");
    if key.is_empty() {
        return Err(DeclError::new(format!("empty type in '{}'", raw)));
    }

    // (4) primitive, enum, typedef, struct — in that order
    let (mut desc, primitive) = if let Some(kind) = desugar_primitive(&key) {
        (TypeDescriptor::Primitive(kind), Some(kind))
    } else if key.contains(char::is_whitespace) {
        return Err(DeclError::new(format!("unrecognized type '{}'", raw)));
    } else if table.enum_def(&key).is_some() {
        // Enums travel as plain 4-byte signed ints.
        (TypeDescriptor::Primitive(PrimKind::Int), None)
    } else if let Some(td) = table.typedef_def(&key) {
        (td.ty.clone(), None)
    } else {
        let id = table.declare_opaque(&key);
        (TypeDescriptor::AggregateRef(id), None)
    };

    if desc.is_void() && arity == 0 && array_len.is_none() {
        return Ok(desc);
    }

    // (5) pointer wrapping, special-casing the innermost level
    if arity > 0 {
        desc = match primitive {
            Some(PrimKind::Void) => TypeDescriptor::Pointer {
                to: Box::new(desc),
                class: PointerClass::OpaqueBytes,
            },
            Some(PrimKind::Char) => TypeDescriptor::Pointer {
                to: Box::new(desc),
                class: PointerClass::CString,
            },
            Some(PrimKind::WChar) => TypeDescriptor::Pointer {
                to: Box::new(desc),
                class: PointerClass::WideString,
            },
            _ => TypeDescriptor::Pointer {
                to: Box::new(desc),
                class: PointerClass::Plain,
            },
        };
        for _ in 1..arity {
            desc = TypeDescriptor::Pointer {
                to: Box::new(desc),
                class: PointerClass::Plain,
            };
        }
    }

    // (6) array wrapping, outermost
    if let Some(len) = array_len {
        desc = TypeDescriptor::Array {
            elem: Box::new(desc),
            len,
        };
    }

    Ok(desc)
}

/// Parse `RET (*NAME)(ARGS)` into a function-pointer descriptor plus the
/// declarator name. Argument lists are split on top-level commas; an
/// argument that is itself function-pointer shaped is rejected.
pub fn parse_function_pointer(
    table: &mut SymbolTable,
    raw: &str,
) -> Result<(TypeDescriptor, String), DeclError> {
    let raw = raw.trim();
    let inner_open = raw
        .find("(*")
        .ok_or_else(|| DeclError::new(format!("not a function pointer: '{}'", raw)))?;
    let ret_str = raw[..inner_open].trim();
    if ret_str.is_empty() {
        return Err(DeclError::new(format!("function pointer missing return type: '{}'", raw)));
    }

    let name_end = raw[inner_open..]
        .find(')')
        .map(|p| p + inner_open)
        .ok_or_else(|| DeclError::new(format!("unclosed declarator in '{}'", raw)))?;
    let name = raw[inner_open + 2..name_end].trim().to_string();

    let args_open = raw[name_end..]
        .find('(')
        .map(|p| p + name_end)
        .ok_or_else(|| DeclError::new(format!("missing argument list in '{}'", raw)))?;
    let args_close = raw
        .rfind(')')
        .filter(|&p| p > args_open)
        .ok_or_else(|| DeclError::new(format!("unclosed argument list in '{}'", raw)))?;
    let args_str = &raw[args_open + 1..args_close];

    let ret = resolve_type(table, ret_str)?;
    let ret = if ret.is_void() { None } else { Some(Box::new(ret)) };

    let mut params = Vec::new();
    let trimmed = args_str.trim();
    if !trimmed.is_empty() && trimmed != "void" {
        for entry in split_top_level(args_str) {
            if entry.contains('(') {
                return Err(DeclError::new(format!(
                    "nested function-pointer argument types are not supported: '{}'",
                    entry.trim()
                )));
            }
            let (desc, _) = reduce_plain_entry(table, entry)?;
            params.push(desc);
        }
    }

    Ok((TypeDescriptor::FunctionPointer { ret, params }, name))
}

/// Shared reduction for struct members and function parameters: one textual
/// entry becomes a descriptor plus an optional declarator name.
pub fn reduce_entry(
    table: &mut SymbolTable,
    entry: &str,
) -> Result<(TypeDescriptor, Option<String>), DeclError> {
    let entry = entry.trim();
    if entry.contains('(') {
        let (desc, name) = parse_function_pointer(table, entry)?;
        let name = if name.is_empty() { None } else { Some(name) };
        return Ok((desc, name));
    }
    reduce_plain_entry(table, entry)
}

/// Reduce a non-function-pointer entry. The final token is the declarator
/// name unless it is itself part of a primitive spelling (`unsigned long
/// long` has no name; `unsigned long long v` does).
fn reduce_plain_entry(
    table: &mut SymbolTable,
    entry: &str,
) -> Result<(TypeDescriptor, Option<String>), DeclError> {
    let tokens: Vec<&str> = entry.split_whitespace().collect();
    match tokens.len() {
        0 => Err(DeclError::new("empty declaration entry")),
        1 => Ok((resolve_type(table, tokens[0])?, None)),
        _ => {
            let last = tokens[tokens.len() - 1];
            let bare: String = last
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if is_primitive_word(&bare) {
                // Unnamed entry: the whole text is the type.
                Ok((resolve_type(table, entry)?, None))
            } else {
                let ty = tokens[..tokens.len() - 1].join(" ");
                let (ty, name) = normalize_declarator(&ty, last);
                let desc = resolve_type(table, &ty)?;
                let name = if name.is_empty() { None } else { Some(name) };
                Ok((desc, name))
            }
        }
    }
}

/// Split on commas at parenthesis depth zero.
pub fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        SymbolTable::new()
    }

    #[test]
    fn test_declarator_forms_resolve_identically() {
        let mut t = table();
        let (ty_a, name_a) = normalize_declarator("Foo", "*x");
        let (ty_b, name_b) = normalize_declarator("Foo*", "x");
        assert_eq!(name_a, "x");
        assert_eq!(name_b, "x");
        let a = resolve_type(&mut t, &ty_a).unwrap();
        let b = resolve_type(&mut t, &ty_b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_array_sigil_moves_to_the_type() {
        let mut t = table();
        let (ty, name) = normalize_declarator("int", "buf[8]");
        assert_eq!(name, "buf");
        let desc = resolve_type(&mut t, &ty).unwrap();
        assert_eq!(
            desc,
            TypeDescriptor::Array {
                elem: Box::new(TypeDescriptor::Primitive(PrimKind::Int)),
                len: 8
            }
        );
    }

    #[test]
    fn test_special_pointers() {
        let mut t = table();
        let s = resolve_type(&mut t, "char*").unwrap();
        assert!(matches!(
            s,
            TypeDescriptor::Pointer {
                class: PointerClass::CString,
                ..
            }
        ));
        let v = resolve_type(&mut t, "void*").unwrap();
        assert!(matches!(
            v,
            TypeDescriptor::Pointer {
                class: PointerClass::OpaqueBytes,
                ..
            }
        ));
        let w = resolve_type(&mut t, "wchar_t *").unwrap();
        assert!(matches!(
            w,
            TypeDescriptor::Pointer {
                class: PointerClass::WideString,
                ..
            }
        ));
    }

    #[test]
    fn test_pointer_of_pointer_wraps_outward() {
        let mut t = table();
        let desc = resolve_type(&mut t, "char**").unwrap();
        match desc {
            TypeDescriptor::Pointer { to, class } => {
                assert_eq!(class, PointerClass::Plain);
                assert!(matches!(
                    *to,
                    TypeDescriptor::Pointer {
                        class: PointerClass::CString,
                        ..
                    }
                ));
            }
            other => panic!("expected pointer, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_aggregate_creates_placeholder() {
        let mut t = table();
        let desc = resolve_type(&mut t, "struct Widget *").unwrap();
        assert!(matches!(desc, TypeDescriptor::Pointer { .. }));
        assert_eq!(t.unresolved_names(), vec!["Widget".to_string()]);
    }

    #[test]
    fn test_enum_resolves_to_int() {
        let mut t = table();
        t.define_enum("Color", vec![("RED".to_string(), 0)]);
        let desc = resolve_type(&mut t, "Color").unwrap();
        assert_eq!(desc, TypeDescriptor::Primitive(PrimKind::Int));
    }

    #[test]
    fn test_typedef_alias_resolution() {
        let mut t = table();
        t.define_typedef("byte", TypeDescriptor::Primitive(PrimKind::UChar));
        let desc = resolve_type(&mut t, "byte*").unwrap();
        assert_eq!(
            desc,
            TypeDescriptor::Pointer {
                to: Box::new(TypeDescriptor::Primitive(PrimKind::UChar)),
                class: PointerClass::Plain
            }
        );
    }

    #[test]
    fn test_function_pointer_shape() {
        let mut t = table();
        let (desc, name) = parse_function_pointer(&mut t, "int (*cmp)(int, int)").unwrap();
        assert_eq!(name, "cmp");
        match desc {
            TypeDescriptor::FunctionPointer { ret, params } => {
                assert_eq!(*ret.unwrap(), TypeDescriptor::Primitive(PrimKind::Int));
                assert_eq!(params.len(), 2);
                assert!(params
                    .iter()
                    .all(|p| *p == TypeDescriptor::Primitive(PrimKind::Int)));
            }
            other => panic!("expected function pointer, got {:?}", other),
        }
    }

    #[test]
    fn test_void_function_pointer_and_empty_args() {
        let mut t = table();
        let (desc, _) = parse_function_pointer(&mut t, "void (*cb)(void)").unwrap();
        match desc {
            TypeDescriptor::FunctionPointer { ret, params } => {
                assert!(ret.is_none());
                assert!(params.is_empty());
            }
            other => panic!("expected function pointer, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_function_pointer_args_are_rejected() {
        let mut t = table();
        let result = parse_function_pointer(&mut t, "int (*f)(int (*g)(int), int)");
        assert!(result.is_err());
    }

    #[test]
    fn test_reduce_entry_named_and_unnamed() {
        let mut t = table();
        let (desc, name) = reduce_entry(&mut t, "unsigned long long v").unwrap();
        assert_eq!(desc, TypeDescriptor::Primitive(PrimKind::ULongLong));
        assert_eq!(name.as_deref(), Some("v"));

        let (desc, name) = reduce_entry(&mut t, "unsigned long long").unwrap();
        assert_eq!(desc, TypeDescriptor::Primitive(PrimKind::ULongLong));
        assert!(name.is_none());
    }

    #[test]
    fn test_reduce_entry_function_pointer_param() {
        let mut t = table();
        let (desc, name) = reduce_entry(&mut t, "void (*on_event)(int, char*)").unwrap();
        assert_eq!(name.as_deref(), Some("on_event"));
        assert!(matches!(desc, TypeDescriptor::FunctionPointer { .. }));
    }

    #[test]
    fn test_split_top_level_ignores_commas_in_parens() {
        let parts = split_top_level("int (*cb)(int, int), int x");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].trim(), "int (*cb)(int, int)");
        assert_eq!(parts[1].trim(), "int x");
    }
}
