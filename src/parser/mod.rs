//! Declaration scanning and type resolution
//!
//! Works on the preprocessor's flattened output:
//! - [`extract`]: partitions the text into raw declaration spans (enums,
//!   structs, typedefs, exported functions)
//! - [`resolver`]: turns raw C type + declarator text into structured
//!   [`crate::symbols::ty::TypeDescriptor`]s, creating forward placeholders
//!   in the symbol table as needed
//!
//! # Supported grammar subset
//!
//! This is deliberately not a full C parser. Declarations are located by
//! heuristic span scanning (delimiter and bracket matching), which covers:
//! `struct NAME;`, `struct NAME { ... };`, `enum NAME { ... };`,
//! `typedef TYPE NAME;`, `typedef RET (*NAME)(ARGS);`, and exported
//! function prototypes. A span that does not fit the subset is rejected as
//! a [`DeclError`] and skipped; it never aborts the load.

pub mod extract;
pub mod resolver;

use std::fmt;

/// A declaration span that does not match the supported grammar subset.
#[derive(Debug, Clone)]
pub struct DeclError {
    pub message: String,
}

impl DeclError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for DeclError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "declaration error: {}", self.message)
    }
}

impl std::error::Error for DeclError {}
