//! Python ctypes module generation
//!
//! Walks the finalized symbol table and renders one self-loading Python
//! module: enum constant groups, `ctypes.Structure` subclasses, typedef
//! aliases, and one wrapper per exported function. Field and parameter
//! order is emitted exactly as declared — that order is the ABI contract.
//! Offsets, padding and alignment are ctypes' job, not ours.
//!
//! Structure emission is two-phase: every class is declared first, then all
//! `_fields_` lists are assigned. Mutually referential and forward-declared
//! structs therefore render to valid Python regardless of declaration order.

use crate::symbols::ty::{PointerClass, TypeDescriptor};
use crate::symbols::{FunctionDecl, RetiredBy, SymbolTable};
use std::fmt::Write;
use std::path::Path;

/// Render one binding module for the given tables and native binary.
pub fn generate_module(table: &SymbolTable, bin_path: &Path) -> String {
    let mut out = String::new();
    out.push_str("# generated by ctypegen\n");
    out.push_str("import ctypes\n");
    out.push_str("import os.path\n\n");
    let _ = writeln!(
        out,
        "__bin_path = os.path.normpath(r'{}')",
        bin_path.display()
    );
    out.push_str("__clib = ctypes.CDLL(__bin_path)\n\n\n");

    render_enums(table, &mut out);
    // Typedef aliases sit between the two struct phases: an alias may name
    // a struct class, and a field list may name an alias.
    render_struct_classes(table, &mut out);
    render_typedefs(table, &mut out);
    render_struct_fields(table, &mut out);
    render_functions(table, &mut out);
    out
}

/// Recursive descriptor → ctypes expression. `AggregateRef`s render as the
/// struct's class name looked up in the table. A reference whose entry was
/// retired by an enum renders as the enum's integer carrier instead; the
/// bare name would be the constants class, which is not a ctypes type.
pub fn py_type(table: &SymbolTable, desc: &TypeDescriptor) -> String {
    match desc {
        TypeDescriptor::Primitive(kind) => kind.ctypes_name().unwrap_or("None").to_string(),
        TypeDescriptor::Pointer { to, class } => match class {
            PointerClass::OpaqueBytes => "ctypes.c_void_p".to_string(),
            PointerClass::CString => "ctypes.c_char_p".to_string(),
            PointerClass::WideString => "ctypes.c_wchar_p".to_string(),
            PointerClass::Plain => format!("ctypes.POINTER({})", py_type(table, to)),
        },
        TypeDescriptor::Array { elem, len } => format!("{} * {}", py_type(table, elem), len),
        TypeDescriptor::FunctionPointer { ret, params } => {
            let mut args = vec![match ret {
                Some(r) => py_type(table, r),
                None => "None".to_string(),
            }];
            args.extend(params.iter().map(|p| py_type(table, p)));
            format!("ctypes.CFUNCTYPE({})", args.join(", "))
        }
        TypeDescriptor::AggregateRef(id) => {
            let def = table.struct_def(*id);
            match def.retired {
                Some(RetiredBy::Enum) => "ctypes.c_int".to_string(),
                // Typedef-retired names render as the alias, live ones as
                // the structure class; both exist before any field list.
                _ => def.name.clone(),
            }
        }
    }
}

fn render_enums(table: &SymbolTable, out: &mut String) {
    for e in table.enums() {
        let _ = writeln!(out, "class {}:", e.name);
        if e.members.is_empty() {
            out.push_str("    pass\n");
        }
        for (name, value) in &e.members {
            let _ = writeln!(out, "    {} = {}", name, value);
        }
        out.push('\n');
    }
}

/// Phase one: bare classes, so any field may reference any struct.
fn render_struct_classes(table: &SymbolTable, out: &mut String) {
    for s in table.structs() {
        let _ = writeln!(out, "class {}(ctypes.Structure):", s.name);
        out.push_str("    pass\n\n");
    }
}

/// Phase two: field lists, declaration order preserved.
fn render_struct_fields(table: &SymbolTable, out: &mut String) {
    for s in table.structs() {
        if s.fields.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}._fields_ = [", s.name);
        for (name, desc) in &s.fields {
            let _ = writeln!(out, "    (\"{}\", {}),", name, py_type(table, desc));
        }
        out.push_str("]\n\n");
    }
}

fn render_typedefs(table: &SymbolTable, out: &mut String) {
    for td in table.typedefs() {
        let _ = writeln!(out, "{} = {}", td.name, py_type(table, &td.ty));
    }
    if !table.typedefs().is_empty() {
        out.push('\n');
    }
}

fn render_functions(table: &SymbolTable, out: &mut String) {
    for f in table.functions() {
        render_function(table, f, out);
        out.push('\n');
    }
}

/// One wrapper: foreign signature declaration plus a `def` forwarding its
/// arguments positionally. Void-returning wrappers call for effect only.
fn render_function(table: &SymbolTable, f: &FunctionDecl, out: &mut String) {
    let restype = match &f.ret {
        Some(ty) => py_type(table, ty),
        None => "None".to_string(),
    };
    let argtypes: Vec<String> = f.params.iter().map(|(_, ty)| py_type(table, ty)).collect();
    let argnames: Vec<&str> = f.params.iter().map(|(n, _)| n.as_str()).collect();

    let _ = writeln!(out, "__clib.{}.restype = {}", f.name, restype);
    let _ = writeln!(out, "__clib.{}.argtypes = [{}]", f.name, argtypes.join(", "));

    let _ = writeln!(out, "def {}({}):", f.name, argnames.join(", "));
    if f.ret.is_some() {
        let _ = writeln!(out, "    return __clib.{}({})", f.name, argnames.join(", "));
    } else {
        let _ = writeln!(out, "    __clib.{}({})", f.name, argnames.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::ty::{PointerClass, PrimKind, TypeDescriptor};

    #[test]
    fn test_enum_members_render_in_order() {
        let mut t = SymbolTable::new();
        t.define_enum(
            "E",
            vec![
                ("A".to_string(), 0),
                ("B".to_string(), 5),
                ("C".to_string(), 2),
            ],
        );
        let text = generate_module(&t, Path::new("lib.so"));
        let a = text.find("A = 0").unwrap();
        let b = text.find("B = 5").unwrap();
        let c = text.find("C = 2").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_struct_fields_render_in_order_after_class() {
        let mut t = SymbolTable::new();
        t.define_struct(
            "P",
            vec![
                ("y".to_string(), TypeDescriptor::Primitive(PrimKind::Int)),
                ("x".to_string(), TypeDescriptor::Primitive(PrimKind::Char)),
            ],
        );
        let text = generate_module(&t, Path::new("lib.so"));
        let class_pos = text.find("class P(ctypes.Structure):").unwrap();
        let fields_pos = text.find("P._fields_ = [").unwrap();
        assert!(class_pos < fields_pos);
        let y = text.find("(\"y\", ctypes.c_int)").unwrap();
        let x = text.find("(\"x\", ctypes.c_char)").unwrap();
        assert!(y < x);
    }

    #[test]
    fn test_mutually_referential_structs_render_two_phase() {
        let mut t = SymbolTable::new();
        let a = t.declare_opaque("A");
        let b = t.declare_opaque("B");
        t.define_struct(
            "A",
            vec![(
                "other".to_string(),
                TypeDescriptor::Pointer {
                    to: Box::new(TypeDescriptor::AggregateRef(b)),
                    class: PointerClass::Plain,
                },
            )],
        );
        t.define_struct(
            "B",
            vec![(
                "other".to_string(),
                TypeDescriptor::Pointer {
                    to: Box::new(TypeDescriptor::AggregateRef(a)),
                    class: PointerClass::Plain,
                },
            )],
        );
        let text = generate_module(&t, Path::new("lib.so"));
        // Both classes exist before either field list mentions the other.
        let last_class = text.rfind("(ctypes.Structure):").unwrap();
        let first_fields = text.find("._fields_").unwrap();
        assert!(last_class < first_fields);
        assert!(text.contains("ctypes.POINTER(B)"));
        assert!(text.contains("ctypes.POINTER(A)"));
    }

    #[test]
    fn test_enum_superseding_a_placeholder_renders_fields_as_int() {
        let mut t = SymbolTable::new();
        let color = t.declare_opaque("Color");
        t.define_struct(
            "S",
            vec![("c".to_string(), TypeDescriptor::AggregateRef(color))],
        );
        t.define_enum(
            "Color",
            vec![("RED".to_string(), 0), ("GREEN".to_string(), 1)],
        );

        let text = generate_module(&t, Path::new("lib.so"));
        assert!(text.contains("(\"c\", ctypes.c_int)"));
        // Color is the constants class only; no structure class remains.
        assert!(text.contains("class Color:"));
        assert!(!text.contains("class Color(ctypes.Structure)"));
    }

    #[test]
    fn test_void_function_wrapper_calls_for_effect() {
        let mut t = SymbolTable::new();
        t.define_function(FunctionDecl {
            name: "ping".to_string(),
            ret: None,
            params: vec![],
        });
        let text = generate_module(&t, Path::new("lib.so"));
        assert!(text.contains("__clib.ping.restype = None"));
        assert!(text.contains("def ping():\n    __clib.ping()"));
        assert!(!text.contains("return __clib.ping()"));
    }

    #[test]
    fn test_function_pointer_field_renders_cfunctype() {
        let mut t = SymbolTable::new();
        t.define_struct(
            "S",
            vec![(
                "cb".to_string(),
                TypeDescriptor::FunctionPointer {
                    ret: Some(Box::new(TypeDescriptor::Primitive(PrimKind::Int))),
                    params: vec![
                        TypeDescriptor::Primitive(PrimKind::Int),
                        TypeDescriptor::Primitive(PrimKind::Int),
                    ],
                },
            )],
        );
        let text = generate_module(&t, Path::new("lib.so"));
        assert!(text.contains(
            "(\"cb\", ctypes.CFUNCTYPE(ctypes.c_int, ctypes.c_int, ctypes.c_int))"
        ));
    }

    #[test]
    fn test_typedef_alias_renders() {
        let mut t = SymbolTable::new();
        t.define_typedef("byte", TypeDescriptor::Primitive(PrimKind::UChar));
        let text = generate_module(&t, Path::new("lib.so"));
        assert!(text.contains("byte = ctypes.c_ubyte"));
    }

    #[test]
    fn test_binary_path_is_embedded() {
        let t = SymbolTable::new();
        let text = generate_module(&t, Path::new("/opt/libdemo.so"));
        assert!(text.contains("os.path.normpath(r'/opt/libdemo.so')"));
        assert!(text.contains("ctypes.CDLL(__bin_path)"));
    }
}
