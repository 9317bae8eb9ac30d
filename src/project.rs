// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Resolves `${VAR}` references against the process environment plus a
/// project-scoped `QSOC_PROJECT_DIR` variable, and against an explicit
/// override map (populated by callers, e.g. in tests) that takes priority
/// over the process environment.
///
/// Library and elaborator code reads environment variables only through
/// this type; it never calls `std::env::var` directly.
#[derive(Clone, Debug, Default)]
pub struct ProjectContext {
    project_dir: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

impl ProjectContext {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        ProjectContext {
            project_dir: Some(project_dir.into()),
            overrides: HashMap::new(),
        }
    }

    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn project_dir(&self) -> Option<&Path> {
        self.project_dir.as_deref()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if key == "QSOC_PROJECT_DIR" {
            return self.project_dir.as_ref().map(|p| p.display().to_string());
        }
        if let Some(value) = self.overrides.get(key) {
            return Some(value.clone());
        }
        env::var(key).ok()
    }

    /// Substitutes every `${VAR}` occurrence in `input`. References to
    /// variables that are not set are left untouched so the caller can
    /// detect the miss downstream rather than silently dropping text.
    pub fn expand(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.lookup(key) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push_str("${");
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str("${");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_project_dir() {
        let ctx = ProjectContext::new("/proj");
        assert_eq!(
            ctx.expand("${QSOC_PROJECT_DIR}/rtl"),
            "/proj/rtl"
        );
    }

    #[test]
    fn expands_override_before_env() {
        let ctx = ProjectContext::default().with_override("FOO", "bar");
        assert_eq!(ctx.expand("x/${FOO}/y"), "x/bar/y");
    }

    #[test]
    fn leaves_unknown_vars_untouched() {
        let ctx = ProjectContext::default();
        assert_eq!(ctx.expand("${TOTALLY_UNSET_VAR_XYZ}"), "${TOTALLY_UNSET_VAR_XYZ}");
    }
}
