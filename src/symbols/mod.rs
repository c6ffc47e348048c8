//! Symbol table for one binding session
//!
//! Owns every name the header set introduces:
//!
//! - Structs live in an index-addressed arena so a forward placeholder can be
//!   filled in place later while every existing [`ty::TypeDescriptor::AggregateRef`]
//!   keeps pointing at the same entry.
//! - Enums, typedefs and functions are stored in registration order so that
//!   generation is reproducible.
//! - The unresolved set tracks aggregates that were referenced but never
//!   declared; it must be empty after a successful load.
//!
//! All names share one flat namespace per table, matching C's effective
//! behavior for the grammar subset this crate consumes.

pub mod ty;

use rustc_hash::FxHashMap;
use ty::TypeDescriptor;

/// Index of a struct in the arena. Stable for the lifetime of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(pub usize);

/// What displaced a struct placeholder: the name turned out to denote an
/// enum or a typedef alias instead. Generation needs the distinction, since
/// an enum-retired reference must render as the enum's integer carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetiredBy {
    Enum,
    Typedef,
}

/// A struct known to the table: a forward placeholder, an opaque
/// declaration, or a full definition.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    /// Field order is the ABI contract and is never reordered.
    pub fields: Vec<(String, TypeDescriptor)>,
    /// False while the struct is only known from a reference. An opaque
    /// `struct X;` declaration counts as resolved even with no fields.
    pub resolved: bool,
    /// Set when the name turned out to be an enum or typedef instead,
    /// recording which. Retired entries are skipped during generation.
    pub retired: Option<RetiredBy>,
}

/// An enum and its members in declaration order.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub members: Vec<(String, i64)>,
}

/// A `typedef` alias: plain primitive, struct reference, or a named
/// function-pointer type.
#[derive(Debug, Clone)]
pub struct TypedefDef {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// An exported function signature. `ret` is `None` for `void`.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub ret: Option<TypeDescriptor>,
    pub params: Vec<(String, TypeDescriptor)>,
}

/// All symbols accumulated over one header-set load.
#[derive(Debug, Default)]
pub struct SymbolTable {
    structs: Vec<StructDef>,
    struct_index: FxHashMap<String, StructId>,
    enums: Vec<EnumDef>,
    enum_index: FxHashMap<String, usize>,
    typedefs: Vec<TypedefDef>,
    typedef_index: FxHashMap<String, usize>,
    functions: Vec<FunctionDecl>,
    function_index: FxHashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a struct by name, live entries only.
    pub fn struct_id(&self, name: &str) -> Option<StructId> {
        self.struct_index.get(name).copied()
    }

    pub fn struct_def(&self, id: StructId) -> &StructDef {
        &self.structs[id.0]
    }

    /// Live structs in registration order.
    pub fn structs(&self) -> impl Iterator<Item = &StructDef> {
        self.structs.iter().filter(|s| s.retired.is_none())
    }

    pub fn enums(&self) -> &[EnumDef] {
        &self.enums
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enum_index.get(name).map(|&i| &self.enums[i])
    }

    pub fn typedefs(&self) -> &[TypedefDef] {
        &self.typedefs
    }

    pub fn typedef_def(&self, name: &str) -> Option<&TypedefDef> {
        self.typedef_index.get(name).map(|&i| &self.typedefs[i])
    }

    pub fn functions(&self) -> &[FunctionDecl] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.function_index.get(name).map(|&i| &self.functions[i])
    }

    /// Create a forward placeholder for `name` if it is not already known.
    /// Idempotent; returns the existing id otherwise.
    pub fn declare_opaque(&mut self, name: &str) -> StructId {
        if let Some(id) = self.struct_index.get(name) {
            return *id;
        }
        let id = StructId(self.structs.len());
        self.structs.push(StructDef {
            name: name.to_string(),
            fields: Vec::new(),
            resolved: false,
            retired: None,
        });
        self.struct_index.insert(name.to_string(), id);
        id
    }

    /// Record that `struct NAME;` was declared: the struct stays fieldless
    /// but is no longer a dangling reference.
    pub fn mark_declared(&mut self, name: &str) -> StructId {
        let id = self.declare_opaque(name);
        self.structs[id.0].resolved = true;
        id
    }

    /// Fill in a struct's field list. The placeholder is mutated in place so
    /// earlier `AggregateRef`s stay valid.
    pub fn define_struct(&mut self, name: &str, fields: Vec<(String, TypeDescriptor)>) -> StructId {
        let id = self.declare_opaque(name);
        let def = &mut self.structs[id.0];
        def.fields = fields;
        def.resolved = true;
        id
    }

    /// Register an enum. A same-named struct placeholder is discarded: the
    /// reference turned out to name an enum, so it is resolved as one.
    pub fn define_enum(&mut self, name: &str, members: Vec<(String, i64)>) {
        self.retire_struct(name, RetiredBy::Enum);
        if let Some(&i) = self.enum_index.get(name) {
            self.enums[i].members = members;
            return;
        }
        self.enum_index.insert(name.to_string(), self.enums.len());
        self.enums.push(EnumDef {
            name: name.to_string(),
            members,
        });
    }

    /// Register a typedef alias, superseding a same-named placeholder.
    ///
    /// `typedef struct Foo Foo;` is a no-op: the struct stays the canonical
    /// entry for the name and is not retired by its own alias.
    pub fn define_typedef(&mut self, name: &str, ty: TypeDescriptor) {
        if let TypeDescriptor::AggregateRef(id) = &ty {
            if self.structs[id.0].name == name {
                return;
            }
        }
        self.retire_struct(name, RetiredBy::Typedef);
        if let Some(&i) = self.typedef_index.get(name) {
            self.typedefs[i].ty = ty;
            return;
        }
        self.typedef_index.insert(name.to_string(), self.typedefs.len());
        self.typedefs.push(TypedefDef {
            name: name.to_string(),
            ty,
        });
    }

    pub fn define_function(&mut self, decl: FunctionDecl) {
        if let Some(&i) = self.function_index.get(&decl.name) {
            self.functions[i] = decl;
            return;
        }
        self.function_index.insert(decl.name.clone(), self.functions.len());
        self.functions.push(decl);
    }

    /// Names that were referenced as aggregates but never declared or
    /// defined. Non-empty after a load means the binding holds dangling
    /// opaque references.
    pub fn unresolved_names(&self) -> Vec<String> {
        self.structs
            .iter()
            .filter(|s| !s.resolved && s.retired.is_none())
            .map(|s| s.name.clone())
            .collect()
    }

    fn retire_struct(&mut self, name: &str, by: RetiredBy) {
        if let Some(id) = self.struct_index.remove(name) {
            let def = &mut self.structs[id.0];
            def.retired = Some(by);
            def.resolved = true;
        }
    }
}
