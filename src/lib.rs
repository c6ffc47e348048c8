//! # Introduction
//!
//! ctypegen ingests a set of C header files plus a compiled native library
//! and mechanically derives a Python `ctypes` binding module: per-enum
//! constant groups, per-struct layout declarations, and per-function call
//! wrappers with correctly typed foreign signatures.
//!
//! ## Pipeline
//!
//! ```text
//! Headers → Preprocessor → Extractor → Resolver → Symbol table → Generator
//! ```
//!
//! 1. [`preprocessor`] — flattens conditionals, macros, includes and
//!    comments into one logical line stream.
//! 2. [`parser`] — cuts declaration spans out of the flattened text and
//!    resolves raw type syntax into structured descriptors, creating
//!    forward placeholders for aggregates seen before their definition.
//! 3. [`symbols`] — the per-session tables: structs (arena-indexed so
//!    placeholders can be filled in place), enums, typedefs, functions,
//!    and the set of names still unresolved.
//! 4. [`binder`] — the engine instance driving one load session and
//!    surfacing its diagnostics.
//! 5. [`codegen`] — renders the finalized tables into one self-loading
//!    Python module.
//!
//! ## Supported C subset
//!
//! Directives: `#include "..."`, `#define`, `#ifdef`/`#ifndef`/`#else`/
//! `#endif`. Declarations: opaque and defining structs, enums, typedefs
//! (including function-pointer typedefs), and exported function
//! prototypes marked by a configurable export-tag macro. `const` and
//! `volatile` are stripped. This is not a full C parser: macro expression
//! evaluation, nested function-pointer argument types, and layout/padding
//! computation are out of scope.

pub mod binder;
pub mod codegen;
pub mod parser;
pub mod preprocessor;
pub mod symbols;
