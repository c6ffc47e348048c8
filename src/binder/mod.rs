//! Binding engine
//!
//! [`CLibrary`] is one binding session for one native library: it owns the
//! macro table, the symbol table and the configuration, and drives the
//! pipeline stage by stage for each configured header. Instances share no
//! state; parallel sessions for different libraries need no synchronization,
//! while one instance must not be mutated from two callers at once.
//!
//! Within a header the loading order is fixed — enums, structs, typedefs,
//! functions — so every later stage can consume forward references created
//! by an earlier one.

pub mod errors;

use errors::BindError;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::parser::extract::{extract, strip_qualifiers};
use crate::parser::resolver::{
    normalize_declarator, parse_function_pointer, reduce_entry, resolve_type, split_top_level,
};
use crate::parser::DeclError;
use crate::preprocessor::Preprocessor;
use crate::symbols::{FunctionDecl, SymbolTable};

/// Configuration handed in by the CLI/config layer.
#[derive(Debug, Clone)]
pub struct BindConfig {
    /// Path of the compiled native library the generated module will load.
    pub bin_path: PathBuf,
    /// Root directory that `#include "..."` paths resolve against.
    pub include_root: PathBuf,
    /// Header file names under `include_root`, loaded in order.
    pub headers: Vec<String>,
    /// Macro name whose substituted text marks exported functions.
    pub export_tag: String,
    /// Replacement text to pre-seed for the export tag, for header sets
    /// that never `#define` the tag themselves. `None` leaves the tag to
    /// the headers, so `#ifndef` guards around its definition still work.
    pub export_value: Option<String>,
}

/// Outcome of a header-set load: what was skipped and what never resolved.
/// Neither aborts the load; both must be surfaced to the caller.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Per-declaration failures, each with its source span.
    pub skipped: Vec<BindError>,
    /// Aggregate names referenced but never declared. Dangerous only if a
    /// dangling name is used by value somewhere.
    pub unresolved: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.unresolved.is_empty()
    }
}

/// One native-library binding session.
pub struct CLibrary {
    config: BindConfig,
    pre: Preprocessor,
    symbols: SymbolTable,
}

impl CLibrary {
    pub fn new(config: BindConfig) -> Self {
        let mut pre = Preprocessor::new(config.include_root.clone());
        if let Some(value) = &config.export_value {
            pre.define(&config.export_tag, value);
        }
        Self {
            config,
            pre,
            symbols: SymbolTable::new(),
        }
    }

    /// Pre-seed a macro before loading, e.g. a platform switch or the
    /// export tag's replacement text.
    pub fn define(&mut self, name: &str, value: &str) {
        self.pre.define(name, value);
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn bin_path(&self) -> &Path {
        &self.config.bin_path
    }

    /// Load every configured header. An I/O failure (missing binary,
    /// missing include) aborts; everything else degrades to diagnostics in
    /// the returned report.
    pub fn load(&mut self) -> Result<LoadReport, BindError> {
        fs::metadata(&self.config.bin_path).map_err(|source| BindError::Io {
            path: self.config.bin_path.clone(),
            source,
        })?;

        let mut report = LoadReport::default();
        let headers = self.config.headers.clone();
        for header in &headers {
            let path = self.config.include_root.join(header);
            info!("loading header {}", path.display());
            self.load_header(&path, &mut report)?;
        }

        // The export tag only marks functions once it has substitution
        // text, either from a header's #define or a pre-seeded define().
        if self
            .pre
            .macro_value(&self.config.export_tag)
            .map(|v| v.is_empty())
            .unwrap_or(true)
        {
            warn!(
                "export tag '{}' has no substitution text; no functions were extracted",
                self.config.export_tag
            );
        }

        report.unresolved = self.symbols.unresolved_names();
        if !report.unresolved.is_empty() {
            warn!(
                "{}",
                BindError::Resolution {
                    names: report.unresolved.clone()
                }
            );
        }
        Ok(report)
    }

    /// Preprocess one header and feed its declarations into the tables.
    fn load_header(&mut self, path: &Path, report: &mut LoadReport) -> Result<(), BindError> {
        let lines = self.pre.preprocess_file(path)?;
        let text = strip_qualifiers(&lines.join("\n"));

        let export_text = self
            .pre
            .macro_value(&self.config.export_tag)
            .map(|s| s.to_string());
        let decls = extract(&text, export_text.as_deref());
        debug!(
            "{}: {} enums, {} structs, {} typedefs, {} functions",
            path.display(),
            decls.enums.len(),
            decls.structs.len(),
            decls.typedefs.len(),
            decls.functions.len()
        );

        for span in &decls.enums {
            self.isolated(span, report, Self::load_enum);
        }
        for span in &decls.structs {
            self.isolated(span, report, Self::load_struct);
        }
        for span in &decls.typedefs {
            self.isolated(span, report, Self::load_typedef);
        }
        for span in &decls.functions {
            let tag = export_text.as_deref().unwrap_or("");
            let result = self.load_func(span, tag);
            if let Err(e) = result {
                Self::record_skip(span, e, report);
            }
        }
        Ok(())
    }

    fn isolated(
        &mut self,
        span: &str,
        report: &mut LoadReport,
        f: fn(&mut Self, &str) -> Result<(), DeclError>,
    ) {
        if let Err(e) = f(self, span) {
            Self::record_skip(span, e, report);
        }
    }

    fn record_skip(span: &str, e: DeclError, report: &mut LoadReport) {
        let err = BindError::Declaration {
            decl: span.to_string(),
            message: e.message,
        };
        warn!("{}", err);
        report.skipped.push(err);
    }

    /// `enum NAME { A, B = 5, C };` — members keep declaration order. A
    /// member without `=` takes its zero-based position in the block, not
    /// previous-value-plus-one.
    fn load_enum(&mut self, span: &str) -> Result<(), DeclError> {
        let name = aggregate_name(span, "enum")?;
        let body = brace_body(span)
            .ok_or_else(|| DeclError::new(format!("enum '{}' has no body", name)))?;

        let mut members = Vec::new();
        for (i, entry) in body.split(',').enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some((member, value)) = entry.split_once('=') {
                let value: i64 = value.trim().parse().map_err(|_| {
                    DeclError::new(format!("bad enum value '{}' in '{}'", value.trim(), name))
                })?;
                members.push((member.trim().to_string(), value));
            } else {
                members.push((entry.to_string(), i as i64));
            }
        }
        self.symbols.define_enum(&name, members);
        Ok(())
    }

    /// Opaque `struct NAME;` or defining `struct NAME { members };`. A
    /// definition fills any existing placeholder in place.
    fn load_struct(&mut self, span: &str) -> Result<(), DeclError> {
        if !span.contains('{') {
            let name = span
                .trim_start()
                .trim_start_matches("struct")
                .trim()
                .trim_end_matches(';')
                .trim();
            if name.is_empty() {
                return Err(DeclError::new("opaque struct without a name"));
            }
            self.symbols.mark_declared(name);
            return Ok(());
        }

        let name = aggregate_name(span, "struct")?;
        let body = brace_body(span)
            .ok_or_else(|| DeclError::new(format!("struct '{}' has no body", name)))?;

        let mut fields = Vec::new();
        for member in body.split(';') {
            let member = member.trim();
            if member.is_empty() {
                continue;
            }
            let (desc, field_name) = reduce_entry(&mut self.symbols, member)?;
            let field_name = field_name
                .ok_or_else(|| DeclError::new(format!("member '{}' has no name", member)))?;
            fields.push((field_name, desc));
        }
        self.symbols.define_struct(&name, fields);
        Ok(())
    }

    /// `typedef TYPE NAME;` or `typedef RET (*NAME)(ARGS);`.
    fn load_typedef(&mut self, span: &str) -> Result<(), DeclError> {
        let body = span
            .trim()
            .trim_start_matches("typedef")
            .trim()
            .trim_end_matches(';')
            .trim();
        if body.is_empty() {
            return Err(DeclError::new("empty typedef"));
        }

        if body.contains('(') {
            let (desc, name) = parse_function_pointer(&mut self.symbols, body)?;
            if name.is_empty() {
                return Err(DeclError::new(format!("typedef without a name: '{}'", body)));
            }
            self.symbols.define_typedef(&name, desc);
            return Ok(());
        }

        let (ty, name) = match body.rsplit_once(char::is_whitespace) {
            Some((ty, name)) => (ty.to_string(), name.to_string()),
            None => return Err(DeclError::new(format!("typedef without a name: '{}'", body))),
        };
        let (ty, name) = normalize_declarator(&ty, &name);
        if name.is_empty() {
            return Err(DeclError::new(format!("typedef without a name: '{}'", body)));
        }
        let desc = resolve_type(&mut self.symbols, &ty)?;
        self.symbols.define_typedef(&name, desc);
        Ok(())
    }

    /// Exported function prototype: strip the export text, split the head
    /// into return type and name, reduce the parameter list.
    fn load_func(&mut self, span: &str, export_text: &str) -> Result<(), DeclError> {
        let cleaned = span.replace(export_text, "");
        let cleaned = cleaned.trim().trim_end_matches(';');

        let args_open = cleaned
            .find('(')
            .ok_or_else(|| DeclError::new("function declaration without an argument list"))?;
        let args_close = cleaned
            .rfind(')')
            .filter(|&p| p > args_open)
            .ok_or_else(|| DeclError::new("unclosed function argument list"))?;

        let head = cleaned[..args_open].trim();
        let (ret_str, name) = match head.rsplit_once(char::is_whitespace) {
            Some((ty, name)) => (ty.to_string(), name.to_string()),
            None => {
                return Err(DeclError::new(format!(
                    "function head '{}' has no return type",
                    head
                )))
            }
        };
        // `int *name` attaches the pointer to the name token.
        let (ret_str, name) = normalize_declarator(&ret_str, &name);
        if name.is_empty() {
            return Err(DeclError::new("function declaration without a name"));
        }

        let ret = resolve_type(&mut self.symbols, &ret_str)?;
        let ret = if ret.is_void() { None } else { Some(ret) };

        let args_str = cleaned[args_open + 1..args_close].trim();
        let mut params = Vec::new();
        if !args_str.is_empty() && args_str != "void" {
            for (i, entry) in split_top_level(args_str).iter().enumerate() {
                let (desc, param_name) = reduce_entry(&mut self.symbols, entry)?;
                let param_name = param_name.unwrap_or_else(|| format!("arg{}", i));
                params.push((param_name, desc));
            }
        }

        self.symbols.define_function(FunctionDecl { name, ret, params });
        Ok(())
    }

    /// Signature lookup for a bound function. Unknown names are a
    /// [`BindError::Call`], never a panic.
    pub fn function(&self, name: &str) -> Result<&FunctionDecl, BindError> {
        self.symbols.function(name).ok_or_else(|| BindError::Call {
            function: name.to_string(),
        })
    }

    /// Value of one enum member, if both exist.
    pub fn enum_value(&self, enum_name: &str, member: &str) -> Option<i64> {
        self.symbols
            .enum_def(enum_name)?
            .members
            .iter()
            .find(|(n, _)| n == member)
            .map(|(_, v)| *v)
    }

    /// Render the finalized tables into a Python ctypes module.
    pub fn generate_module(&self, module_name: &str) -> String {
        info!("generating module {}", module_name);
        crate::codegen::generate_module(&self.symbols, &self.config.bin_path)
    }
}

/// Name token between the aggregate keyword and the opening brace.
fn aggregate_name(span: &str, keyword: &str) -> Result<String, DeclError> {
    let rest = span
        .trim_start()
        .strip_prefix(keyword)
        .ok_or_else(|| DeclError::new(format!("expected '{}' declaration", keyword)))?;
    let name: String = rest
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        return Err(DeclError::new(format!("{} without a name", keyword)));
    }
    Ok(name)
}

/// Text between the first `{` and the last `}` of a span.
fn brace_body(span: &str) -> Option<&str> {
    let open = span.find('{')?;
    let close = span.rfind('}')?;
    if close > open {
        Some(&span[open + 1..close])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::ty::{PrimKind, TypeDescriptor};

    fn session() -> CLibrary {
        CLibrary::new(BindConfig {
            bin_path: PathBuf::from("libtest.so"),
            include_root: PathBuf::from("."),
            headers: Vec::new(),
            export_tag: "EXPORT".to_string(),
            export_value: None,
        })
    }

    #[test]
    fn test_enum_values_use_position_index() {
        let mut lib = session();
        lib.load_enum("enum E { A, B = 5, C };").unwrap();
        // Position-index rule: C is the third member, so C = 2 (not 6).
        assert_eq!(lib.enum_value("E", "A"), Some(0));
        assert_eq!(lib.enum_value("E", "B"), Some(5));
        assert_eq!(lib.enum_value("E", "C"), Some(2));
    }

    #[test]
    fn test_struct_fields_keep_declaration_order() {
        let mut lib = session();
        lib.load_struct("struct P { int y; char x; int z; };").unwrap();
        let id = lib.symbols().struct_id("P").unwrap();
        let names: Vec<&str> = lib
            .symbols()
            .struct_def(id)
            .fields
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(names, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_function_pointer_typedef_is_usable_as_field_type() {
        let mut lib = session();
        lib.load_typedef("typedef int (*Cmp)(int, int);").unwrap();
        lib.load_struct("struct Sorter { Cmp compare; int count; };")
            .unwrap();

        let id = lib.symbols().struct_id("Sorter").unwrap();
        let fields = &lib.symbols().struct_def(id).fields;
        assert!(matches!(
            fields[0].1,
            TypeDescriptor::FunctionPointer { .. }
        ));
    }

    #[test]
    fn test_load_func_void_return_and_params() {
        let mut lib = session();
        lib.load_func("DLLEXP void reset(int * state, unsigned flags);", "DLLEXP")
            .unwrap();
        let f = lib.function("reset").unwrap();
        assert!(f.ret.is_none());
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[0].0, "state");
        assert_eq!(f.params[1].1, TypeDescriptor::Primitive(PrimKind::UInt));
    }

    #[test]
    fn test_load_func_void_arg_list_means_no_params() {
        let mut lib = session();
        lib.load_func("DLLEXP int version(void);", "DLLEXP").unwrap();
        assert!(lib.function("version").unwrap().params.is_empty());
    }

    #[test]
    fn test_unknown_function_is_a_call_error() {
        let lib = session();
        assert!(matches!(
            lib.function("missing"),
            Err(BindError::Call { .. })
        ));
    }

    #[test]
    fn test_pointer_attached_to_function_name() {
        let mut lib = session();
        lib.load_func("DLLEXP char *version_string();", "DLLEXP")
            .unwrap();
        let f = lib.function("version_string").unwrap();
        assert!(matches!(
            f.ret,
            Some(TypeDescriptor::Pointer { .. })
        ));
    }
}
