// ctypegen: generate Python ctypes bindings from C headers and a native library

mod binder;
mod codegen;
mod parser;
mod preprocessor;
mod symbols;

use std::fs;
use std::path::{Path, PathBuf};

use binder::{BindConfig, CLibrary};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("ctypegen");

    if args.len() < 7 {
        eprintln!("Error: Missing arguments");
        eprintln!();
        eprintln!(
            "Usage: {} <binary> <include-root> <export-tag>[=<replacement>] <out-dir> <module-name> <header>...",
            program_name
        );
        eprintln!();
        eprintln!("Examples:");
        eprintln!(
            "  {} libdemo.so include DEMO_API out demo demo.h extras.h",
            program_name
        );
        eprintln!(
            "  {} libdemo.so include 'DEMO_API=__declspec(dllexport)' out demo demo.h",
            program_name
        );
        std::process::exit(1);
    }

    let bin_path = PathBuf::from(&args[1]);
    let include_root = PathBuf::from(&args[2]);
    // TAG alone defers to the headers' own #define; TAG=VALUE pre-seeds the
    // replacement text for header sets that never define the tag.
    let (export_tag, export_value) = match args[3].split_once('=') {
        Some((tag, value)) => (tag.to_string(), Some(value.to_string())),
        None => (args[3].clone(), None),
    };
    let out_dir = Path::new(&args[4]);
    let module_name = &args[5];
    let headers: Vec<String> = args[6..].to_vec();

    if !include_root.is_dir() {
        eprintln!(
            "Error: Include root '{}' is not a directory",
            include_root.display()
        );
        std::process::exit(1);
    }

    let mut lib = CLibrary::new(BindConfig {
        bin_path,
        include_root,
        headers,
        export_tag,
        export_value,
    });

    let report = match lib.load() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Load error: {}", e);
            std::process::exit(1);
        }
    };

    for err in &report.skipped {
        eprintln!("Warning: {}", err);
    }
    if !report.unresolved.is_empty() {
        eprintln!(
            "Warning: unresolved aggregate types: {}",
            report.unresolved.join(", ")
        );
    }

    let module = lib.generate_module(module_name);

    // Package as <out>/<name>/<name>.py with an empty __init__.py.
    let package_dir = out_dir.join(module_name);
    fs::create_dir_all(&package_dir)?;
    fs::write(package_dir.join(format!("{}.py", module_name)), module)?;
    fs::write(package_dir.join("__init__.py"), "")?;

    eprintln!(
        "Generated module '{}' in {}",
        module_name,
        package_dir.display()
    );
    Ok(())
}
