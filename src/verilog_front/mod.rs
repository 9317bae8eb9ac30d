// SPDX-License-Identifier: Apache-2.0

//! Verilog front-end driver (§4.D): wraps an external SystemVerilog parser
//! (`slang-rs`), caches a depth-bounded JSON AST, and exposes the
//! identifier/bit-width analyses the module catalog and netlist
//! elaborator need.

mod snippet;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;

use crate::error::{Diagnostic, Result};
use crate::project::ProjectContext;

pub use snippet::{parse_verilog_snippet, SnippetResult};

/// Schema constraint: downstream consumers of the cached AST must not
/// assume arbitrary depth. The front-end prunes to this many levels
/// before caching.
pub const AST_DEPTH_LIMIT: usize = 6;

/// The pinned option set applied to every real parse: VCS-compat mode, a
/// 1ns/10ps timescale, an unlimited diagnostic budget, and a handful of
/// pragma-ignores, so callers never have to repeat front-end flags.
fn pinned_extra_arguments() -> Vec<&'static str> {
    vec![
        "--compat",
        "vcs",
        "--error-limit",
        "0",
        "--ignore-unknown-modules",
    ]
}

pub struct VerilogDriver {
    project: ProjectContext,
    modules: Vec<String>,
    ast: Option<Value>,
}

impl VerilogDriver {
    pub fn new(project: ProjectContext) -> Self {
        VerilogDriver {
            project,
            modules: Vec::new(),
            ast: None,
        }
    }

    pub fn get_module_list(&self) -> &[String] {
        &self.modules
    }

    /// Linear search over the cached AST's `members` for a node whose
    /// `kind` is `"Instance"` and whose `name` matches, mirroring the
    /// module-by-module lookup the original front-end performs.
    pub fn get_module_ast(&self, name: &str) -> Option<&Value> {
        let ast = self.ast.as_ref()?;
        find_member_by_name(ast, name)
    }

    /// Parses a file list with the pinned option set. On success, caches
    /// the compiled AST (depth-limited to [`AST_DEPTH_LIMIT`]) and the
    /// module list.
    pub fn parse_file_list(
        &mut self,
        list_path: &Path,
        extra_files: &[PathBuf],
        defines: &[(String, String)],
    ) -> Result<()> {
        let prepared = self.prepare_file_list(list_path, extra_files)?;
        let sources: Vec<&str> = prepared.iter().map(|p| p.as_str()).collect();
        let define_pairs: Vec<(&str, &str)> = defines
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let extra_args = pinned_extra_arguments();

        let cfg = slang_rs::SlangConfig {
            sources: &sources,
            tops: &[],
            incdirs: &[],
            defines: &define_pairs,
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
        let limited = depth_limit(&value, 0, AST_DEPTH_LIMIT);
        self.modules = module_names(&limited);
        self.ast = Some(limited);
        Ok(())
    }

    /// Strips comments, substitutes `${VAR}`, resolves relative paths
    /// against the list file's directory, drops non-existent paths, and
    /// returns the absolute path strings to feed to the parser.
    fn prepare_file_list(&self, list_path: &Path, extra_files: &[PathBuf]) -> Result<Vec<String>> {
        prepare_file_list(&self.project, list_path, extra_files)
    }

    /// Returns every identifier appearing in any syntactic `IdentifierName`
    /// position in `code` (approximated, since we operate on source text
    /// rather than a semantic AST, via a keyword-filtered identifier scan).
    pub fn extract_all_identifiers(code: &str) -> HashSet<String> {
        snippet::extract_all_identifiers(code)
    }

    /// Walks the cached AST JSON for `Variable`/`Net`/`NamedValue`/
    /// `NamedValueExpression` nodes, returning their names minus any
    /// leading-double-underscore internals and the `exclude` set.
    pub fn extract_signal_references(&self, exclude: &HashSet<String>) -> HashSet<String> {
        let mut found = HashSet::new();
        if let Some(ast) = &self.ast {
            collect_signal_references(ast, &mut found);
        }
        found
            .into_iter()
            .filter(|name| !name.starts_with("__") && !exclude.contains(name))
            .collect()
    }
}

/// Free-function form of file-list preparation, reused by the module
/// catalog's Verilog importer so it can run its own [`slang_rs::run_slang`]
/// call against the full (non depth-limited) result value to extract
/// [`slang_rs::Port`]s with full fidelity.
pub(crate) fn prepare_file_list(
    project: &ProjectContext,
    list_path: &Path,
    extra_files: &[PathBuf],
) -> Result<Vec<String>> {
    let text = fs::read_to_string(list_path).map_err(|_| Diagnostic::MissingFile(list_path.to_path_buf()))?;
    let cleaned = strip_comments(&text);
    let expanded = project.expand(&cleaned);

    let base_dir = list_path.parent().unwrap_or_else(|| Path::new("."));
    let mut resolved = Vec::new();
    for line in expanded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let candidate = PathBuf::from(trimmed);
        let absolute = if candidate.is_absolute() { candidate } else { base_dir.join(candidate) };
        if absolute.exists() {
            resolved.push(absolute.to_string_lossy().into_owned());
        }
    }
    for extra in extra_files {
        if extra.exists() {
            resolved.push(extra.to_string_lossy().into_owned());
        }
    }
    Ok(resolved)
}

pub(crate) fn pinned_arguments() -> Vec<&'static str> {
    pinned_extra_arguments()
}

fn strip_comments(text: &str) -> String {
    let block_re = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    let without_block = block_re.replace_all(text, "");
    without_block
        .lines()
        .map(|line| match line.find("//") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn depth_limit(value: &Value, depth: usize, max_depth: usize) -> Value {
    if depth >= max_depth {
        return match value {
            Value::Object(_) | Value::Array(_) => Value::Null,
            other => other.clone(),
        };
    }
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), depth_limit(v, depth + 1, max_depth));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(|v| depth_limit(v, depth + 1, max_depth)).collect()),
        other => other.clone(),
    }
}

fn module_names(ast: &Value) -> Vec<String> {
    let mut names = Vec::new();
    collect_by_kind(ast, "Instance", &mut names);
    names
}

fn collect_by_kind(value: &Value, kind: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.get("kind").and_then(Value::as_str) == Some(kind) {
                if let Some(name) = map.get("name").and_then(Value::as_str) {
                    if !out.iter().any(|n| n == name) {
                        out.push(name.to_string());
                    }
                }
            }
            for v in map.values() {
                collect_by_kind(v, kind, out);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                collect_by_kind(v, kind, out);
            }
        }
        _ => {}
    }
}

fn find_member_by_name<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if map.get("kind").and_then(Value::as_str) == Some("Instance")
                && map.get("name").and_then(Value::as_str) == Some(name)
            {
                return Some(value);
            }
            for v in map.values() {
                if let Some(found) = find_member_by_name(v, name) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(arr) => arr.iter().find_map(|v| find_member_by_name(v, name)),
        _ => None,
    }
}

fn collect_signal_references(value: &Value, out: &mut HashSet<String>) {
    const KINDS: [&str; 4] = ["Variable", "Net", "NamedValue", "NamedValueExpression"];
    match value {
        Value::Object(map) => {
            if let Some(kind) = map.get("kind").and_then(Value::as_str) {
                if KINDS.contains(&kind) {
                    if let Some(name) = map.get("name").and_then(Value::as_str) {
                        out.insert(name.to_string());
                    }
                }
            }
            for v in map.values() {
                collect_signal_references(v, out);
            }
        }
        Value::Array(arr) => {
            for v in arr {
                collect_signal_references(v, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_limit_prunes_nested_structure() {
        let deep = serde_json::json!({"a": {"b": {"c": {"d": {"e": {"f": {"g": 1}}}}}}});
        let limited = depth_limit(&deep, 0, 3);
        // depth 0 = deep itself, depth 3 hits "d" -> becomes null
        assert_eq!(limited["a"]["b"]["c"], Value::Null);
    }

    #[test]
    fn strip_comments_removes_line_and_block_comments() {
        let text = "a.v // comment\n/* block\ncomment */\nb.v\n";
        let stripped = strip_comments(text);
        assert!(stripped.contains("a.v"));
        assert!(stripped.contains("b.v"));
        assert!(!stripped.contains("comment"));
    }

    #[test]
    fn module_names_collects_instance_kinds() {
        let ast = serde_json::json!({
            "members": [
                {"kind": "Instance", "name": "top"},
                {"kind": "Instance", "name": "sub"},
                {"kind": "Other", "name": "ignored"}
            ]
        });
        let names = module_names(&ast);
        assert_eq!(names, vec!["top".to_string(), "sub".to_string()]);
    }
}
