//! Resolved C type descriptors
//!
//! A [`TypeDescriptor`] is the structured form of a raw C type string after
//! declarator normalization and primitive desugaring. Aggregates are held as
//! [`StructId`] indexes into the symbol table rather than embedded copies, so
//! a forward-declared struct that is filled in later is visible to every
//! earlier holder of the reference.

use super::StructId;

/// Canonical primitive kinds, one per distinct `ctypes` scalar.
///
/// Multi-word C spellings (`unsigned long long int`, `signed char`, ...) are
/// desugared onto these by [`desugar_primitive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    WChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    SizeT,
    SSizeT,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl PrimKind {
    /// The `ctypes` scalar this kind maps to, or `None` for `void`.
    pub fn ctypes_name(self) -> Option<&'static str> {
        match self {
            PrimKind::Void => None,
            PrimKind::Bool => Some("ctypes.c_bool"),
            PrimKind::Char => Some("ctypes.c_char"),
            PrimKind::SChar => Some("ctypes.c_byte"),
            PrimKind::UChar => Some("ctypes.c_ubyte"),
            PrimKind::WChar => Some("ctypes.c_wchar"),
            PrimKind::Short => Some("ctypes.c_short"),
            PrimKind::UShort => Some("ctypes.c_ushort"),
            PrimKind::Int => Some("ctypes.c_int"),
            PrimKind::UInt => Some("ctypes.c_uint"),
            PrimKind::Long => Some("ctypes.c_long"),
            PrimKind::ULong => Some("ctypes.c_ulong"),
            PrimKind::LongLong => Some("ctypes.c_longlong"),
            PrimKind::ULongLong => Some("ctypes.c_ulonglong"),
            PrimKind::Float => Some("ctypes.c_float"),
            PrimKind::Double => Some("ctypes.c_double"),
            PrimKind::LongDouble => Some("ctypes.c_longdouble"),
            PrimKind::SizeT => Some("ctypes.c_size_t"),
            PrimKind::SSizeT => Some("ctypes.c_ssize_t"),
            PrimKind::Int8 => Some("ctypes.c_int8"),
            PrimKind::UInt8 => Some("ctypes.c_uint8"),
            PrimKind::Int16 => Some("ctypes.c_int16"),
            PrimKind::UInt16 => Some("ctypes.c_uint16"),
            PrimKind::Int32 => Some("ctypes.c_int32"),
            PrimKind::UInt32 => Some("ctypes.c_uint32"),
            PrimKind::Int64 => Some("ctypes.c_int64"),
            PrimKind::UInt64 => Some("ctypes.c_uint64"),
        }
    }
}

/// Pointer flavor. `void*`, `char*` and `wchar_t*` get dedicated `ctypes`
/// representations instead of a generic `POINTER(...)` wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerClass {
    Plain,
    OpaqueBytes,
    CString,
    WideString,
}

/// Structured representation of a resolved C type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Primitive(PrimKind),
    Pointer {
        to: Box<TypeDescriptor>,
        class: PointerClass,
    },
    Array {
        elem: Box<TypeDescriptor>,
        len: usize,
    },
    FunctionPointer {
        ret: Option<Box<TypeDescriptor>>,
        params: Vec<TypeDescriptor>,
    },
    /// Lazy by-index reference into the struct arena.
    AggregateRef(StructId),
}

impl TypeDescriptor {
    /// True for `void` proper (not `void*`).
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(PrimKind::Void))
    }
}

/// Words that can appear in a primitive type spelling. Used to decide
/// whether a trailing token is part of the type or a declarator name.
pub fn is_primitive_word(word: &str) -> bool {
    matches!(
        word,
        "void"
            | "bool"
            | "_Bool"
            | "char"
            | "wchar_t"
            | "short"
            | "int"
            | "long"
            | "float"
            | "double"
            | "signed"
            | "unsigned"
            | "size_t"
            | "ssize_t"
    ) || is_fixed_width_word(word)
}

fn is_fixed_width_word(word: &str) -> bool {
    matches!(
        word,
        "int8_t" | "uint8_t" | "int16_t" | "uint16_t" | "int32_t" | "uint32_t" | "int64_t"
            | "uint64_t"
    )
}

/// Desugar a whitespace-separated primitive spelling into its canonical kind.
///
/// Token order is irrelevant: `unsigned long long int` and
/// `long long unsigned` both canonicalize to [`PrimKind::ULongLong`].
/// Returns `None` when the spelling is not a primitive at all, leaving the
/// caller to try the enum/typedef/struct tables.
pub fn desugar_primitive(spelling: &str) -> Option<PrimKind> {
    let mut longs = 0usize;
    let mut unsigned = false;
    let mut signed = false;
    let mut base: Option<&str> = None;

    for word in spelling.split_whitespace() {
        match word {
            "long" => longs += 1,
            "unsigned" => unsigned = true,
            "signed" => signed = true,
            "int" => {
                // `int` is redundant next to long/short; only record it when
                // no other base word claims the slot.
                if base.is_none() {
                    base = Some("int");
                }
            }
            w if is_primitive_word(w) => {
                if base.is_none() || base == Some("int") {
                    base = Some(w);
                } else {
                    return None;
                }
            }
            _ => return None,
        }
    }

    let kind = match base {
        Some("double") if longs == 1 => PrimKind::LongDouble,
        Some("double") if longs == 0 => PrimKind::Double,
        Some("float") if longs == 0 => PrimKind::Float,
        Some("char") if longs == 0 => {
            if unsigned {
                PrimKind::UChar
            } else if signed {
                PrimKind::SChar
            } else {
                PrimKind::Char
            }
        }
        Some("short") if longs == 0 => {
            if unsigned {
                PrimKind::UShort
            } else {
                PrimKind::Short
            }
        }
        Some("int") | None => match longs {
            0 => {
                // A bare qualifier (`unsigned;`) still names a type in C.
                if base.is_none() && !unsigned && !signed {
                    return None;
                }
                if unsigned {
                    PrimKind::UInt
                } else {
                    PrimKind::Int
                }
            }
            1 => {
                if unsigned {
                    PrimKind::ULong
                } else {
                    PrimKind::Long
                }
            }
            _ => {
                if unsigned {
                    PrimKind::ULongLong
                } else {
                    PrimKind::LongLong
                }
            }
        },
        Some(other) if longs == 0 && !unsigned && !signed => match other {
            "void" => PrimKind::Void,
            "bool" | "_Bool" => PrimKind::Bool,
            "wchar_t" => PrimKind::WChar,
            "size_t" => PrimKind::SizeT,
            "ssize_t" => PrimKind::SSizeT,
            "int8_t" => PrimKind::Int8,
            "uint8_t" => PrimKind::UInt8,
            "int16_t" => PrimKind::Int16,
            "uint16_t" => PrimKind::UInt16,
            "int32_t" => PrimKind::Int32,
            "uint32_t" => PrimKind::UInt32,
            "int64_t" => PrimKind::Int64,
            "uint64_t" => PrimKind::UInt64,
            _ => return None,
        },
        _ => return None,
    };

    Some(kind)
}
