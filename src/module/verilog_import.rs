// SPDX-License-Identifier: Apache-2.0

//! Verilog import for the module catalog (§4.C): synthesizes a temporary
//! file list, drives the front-end, and merges extracted ports/parameters
//! into the target library.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Diagnostic, Result};
use crate::library::Catalog;
use crate::module::{ModuleDef, ModuleParameter, ModulePort};
use crate::project::ProjectContext;
use crate::selector::Selector;
use crate::verilog_front;

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub module_name: String,
    pub library: String,
}

/// Synthesizes a file list from an optional `file_list_path` plus explicit
/// `files`, runs the front-end, and extracts the first module matching
/// `name_regex` (or the first module parsed, when `name_regex` is `Any`).
pub fn import_from_file_list(
    catalog: &mut Catalog<ModuleDef>,
    project: &ProjectContext,
    library: Option<&str>,
    name_regex: &Selector,
    file_list_path: Option<&Path>,
    files: &[PathBuf],
) -> Result<ImportOutcome> {
    let temp_list_path = std::env::temp_dir().join(format!("socweave_import_{}.f", std::process::id()));
    let mut lines = Vec::new();
    if let Some(list_path) = file_list_path {
        let prepared = verilog_front::prepare_file_list(project, list_path, &[])?;
        lines.extend(prepared);
    }
    for file in files {
        if file.exists() {
            lines.push(file.to_string_lossy().into_owned());
        }
    }
    std::fs::write(&temp_list_path, lines.join("\n")).map_err(|e| Diagnostic::Other(e.to_string()))?;

    let prepared_sources = verilog_front::prepare_file_list(project, &temp_list_path, &[])?;
    let _ = std::fs::remove_file(&temp_list_path);
    let sources: Vec<&str> = prepared_sources.iter().map(|s| s.as_str()).collect();
    let extra_args = verilog_front::pinned_arguments();

    let cfg = slang_rs::SlangConfig {
        sources: &sources,
        tops: &[],
        incdirs: &[],
        defines: &[],
        parameters: &[],
        libfiles: &[],
        libdirs: &[],
        libexts: &[],
        ignore_unknown_modules: true,
        ignore_protected: true,
        timescale: Some("1ns/10ps"),
        extra_arguments: &extra_args,
    };

    let value = slang_rs::run_slang(&cfg).map_err(|e| Diagnostic::FrontEnd(e.to_string()))?;
    let hierarchy = slang_rs::extract_hierarchy_from_value(&value);
    let ports_by_module = slang_rs::extract_ports_from_value(&value, true);

    let module_name = match name_regex {
        Selector::Any => hierarchy.keys().next().cloned(),
        other => hierarchy.keys().find(|name| other.matches(name)).cloned(),
    }
    .ok_or_else(|| Diagnostic::NotFound { kind: "module", name: "<no match in parsed source>".to_string() })?;

    let ports = ports_by_module.get(&module_name).cloned().unwrap_or_default();
    let mut port_map = IndexMap::new();
    for port in ports {
        let direction = match port.dir {
            slang_rs::PortDir::Input => "input",
            slang_rs::PortDir::Output => "output",
            slang_rs::PortDir::InOut => "inout",
        };
        let width = port.ty.width().unwrap_or(1);
        port_map.insert(
            port.name.clone(),
            ModulePort {
                direction: direction.to_string(),
                type_name: Some(type_name(&port.ty)),
                width: Some(width as u32),
            },
        );
    }

    // slang_rs exposes module parameters alongside ports in the same
    // hierarchy walk; absent a dedicated accessor in the grounded API,
    // parameter extraction is left to hand-authored edits merged in by the
    // catalog's merge-preserving-unknown-keys discipline.
    let parameter_map: IndexMap<String, ModuleParameter> = IndexMap::new();

    let module = ModuleDef { port: port_map, parameter: parameter_map, bus: IndexMap::new() };

    let library_name = library
        .map(|s| s.to_string())
        .unwrap_or_else(|| module_name.to_lowercase());

    let mut incoming = IndexMap::new();
    incoming.insert(module_name.clone(), module);
    catalog.insert_merged(&library_name, incoming)?;

    Ok(ImportOutcome { module_name, library: library_name })
}

fn type_name(ty: &slang_rs::Type) -> String {
    match ty {
        slang_rs::Type::Logic { signed, .. } => {
            if *signed {
                "logic signed".to_string()
            } else {
                "logic".to_string()
            }
        }
        slang_rs::Type::Enum { name, .. } => name.clone(),
        _ => "logic".to_string(),
    }
}
