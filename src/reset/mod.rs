// SPDX-License-Identifier: Apache-2.0

//! Reset-controller primitive generator (§4.F): parses the `reset:`
//! sub-tree into typed records, then drives [`emit`], [`cells`] and
//! [`diagram`] to produce the module text, the shared cell-library file,
//! and a best-effort Typst diagram.

mod cells;
mod diagram;
mod emit;

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Diagnostic, Result};

pub use cells::write_reset_cell_file;
pub use emit::generate_module;

#[derive(Clone, Debug)]
pub struct ComponentConfig {
    pub clock: String,
    pub test_enable: Option<String>,
    /// `stage` for async/sync components, `cycle` for count components.
    pub shape: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ComponentChain {
    pub async_cfg: Option<ComponentConfig>,
    pub sync_cfg: Option<ComponentConfig>,
    pub count_cfg: Option<ComponentConfig>,
}

impl ComponentChain {
    fn is_empty(&self) -> bool {
        self.async_cfg.is_none() && self.sync_cfg.is_none() && self.count_cfg.is_none()
    }

    /// The chain's component configs in emission order (async, then sync,
    /// then count), tagged with their cell-instance kind.
    fn stages(&self) -> Vec<(&'static str, &ComponentConfig)> {
        let mut out = Vec::new();
        if let Some(c) = &self.async_cfg {
            out.push(("async", c));
        }
        if let Some(c) = &self.sync_cfg {
            out.push(("sync", c));
        }
        if let Some(c) = &self.count_cfg {
            out.push(("count", c));
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct ResetSource {
    pub name: String,
    pub active: String,
}

#[derive(Clone, Debug)]
pub struct ResetLink {
    pub source: String,
    pub chain: ComponentChain,
}

#[derive(Clone, Debug)]
pub struct ResetTarget {
    pub name: String,
    pub active: String,
    pub chain: ComponentChain,
    pub links: Vec<ResetLink>,
}

#[derive(Clone, Debug)]
pub struct ReasonConfig {
    pub clock: String,
    pub output: String,
    pub valid: String,
    pub clear: String,
    pub root_reset: String,
    /// Parsed and retained for round-trip fidelity; the clear-window state
    /// machine is a fixed two-cycle shift register regardless of this value.
    pub clear_cycles: Option<u32>,
    pub source_order: Vec<String>,
    pub vector_width: usize,
}

#[derive(Clone, Debug)]
pub struct ResetSpec {
    pub name: String,
    pub test_enable: Option<String>,
    pub sources: Vec<ResetSource>,
    pub targets: Vec<ResetTarget>,
    pub reason: Option<ReasonConfig>,
}

#[derive(Deserialize, Default)]
struct RawComponent {
    clock: Option<String>,
    test_enable: Option<String>,
    stage: Option<u32>,
    cycle: Option<u32>,
}

#[derive(Deserialize, Default)]
struct RawChain {
    #[serde(rename = "async")]
    async_cfg: Option<RawComponent>,
    sync: Option<RawComponent>,
    count: Option<RawComponent>,
}

#[derive(Deserialize, Default)]
struct RawSource {
    active: Option<String>,
}

#[derive(Deserialize)]
struct RawTarget {
    active: Option<String>,
    #[serde(rename = "async")]
    async_cfg: Option<RawComponent>,
    sync: Option<RawComponent>,
    count: Option<RawComponent>,
    #[serde(default)]
    link: IndexMap<String, Option<RawChain>>,
}

#[derive(Deserialize)]
struct RawReason {
    clock: Option<String>,
    output: Option<String>,
    valid: Option<String>,
    clear: Option<String>,
    root_reset: Option<String>,
    clear_cycles: Option<u32>,
}

#[derive(Deserialize)]
struct RawReset {
    name: Option<String>,
    test_enable: Option<String>,
    #[serde(default)]
    source: IndexMap<String, RawSource>,
    #[serde(default)]
    target: IndexMap<String, RawTarget>,
    reason: Option<RawReason>,
}

fn build_component(
    context: &str,
    kind: &'static str,
    raw: RawComponent,
    default_shape: u32,
    controller_test_enable: &Option<String>,
) -> Result<ComponentConfig> {
    let clock = raw.clock.ok_or_else(|| {
        log::error!("Error: 'clock' field is required for {kind} component in '{context}'");
        Diagnostic::ResetConfig { context: context.to_string(), field: "clock" }
    })?;
    let shape = match kind {
        "count" => raw.cycle.unwrap_or(default_shape),
        _ => raw.stage.unwrap_or(default_shape),
    };
    Ok(ComponentConfig {
        clock,
        test_enable: raw.test_enable.or_else(|| controller_test_enable.clone()),
        shape,
    })
}

fn build_chain(context: &str, raw: RawChain, controller_test_enable: &Option<String>) -> Result<ComponentChain> {
    Ok(ComponentChain {
        async_cfg: raw
            .async_cfg
            .map(|c| build_component(context, "async", c, 3, controller_test_enable))
            .transpose()?,
        sync_cfg: raw
            .sync
            .map(|c| build_component(context, "sync", c, 4, controller_test_enable))
            .transpose()?,
        count_cfg: raw
            .count
            .map(|c| build_component(context, "count", c, 16, controller_test_enable))
            .transpose()?,
    })
}

/// Parses a `reset:` sub-tree (already isolated from its surrounding
/// netlist or standalone file) into a validated [`ResetSpec`].
///
/// Required-field violations are logged at `error` level and returned as
/// [`Diagnostic::ResetConfig`]; callers treat this as fatal for the whole
/// controller, matching the grounding codebase's "empty config on error"
/// contract.
pub fn parse_reset_spec(value: &serde_yaml::Value) -> Result<ResetSpec> {
    let raw: RawReset = serde_yaml::from_value(value.clone())
        .map_err(|source| Diagnostic::YamlParse { path: "<reset spec>".into(), source })?;

    let name = raw.name.ok_or_else(|| {
        log::error!("Error: 'name' field is required in reset configuration");
        Diagnostic::ResetConfig { context: "reset".to_string(), field: "name" }
    })?;

    let mut sources = Vec::new();
    for (source_name, raw_source) in raw.source {
        let active = raw_source.active.ok_or_else(|| {
            log::error!("Error: 'active' field is required for source '{source_name}'");
            Diagnostic::ResetConfig { context: source_name.clone(), field: "active" }
        })?;
        sources.push(ResetSource { name: source_name, active });
    }

    let mut targets = Vec::new();
    for (target_name, raw_target) in raw.target {
        let active = raw_target.active.ok_or_else(|| {
            log::error!("Error: 'active' field is required for target '{target_name}'");
            Diagnostic::ResetConfig { context: target_name.clone(), field: "active" }
        })?;

        let chain = build_chain(
            &target_name,
            RawChain { async_cfg: raw_target.async_cfg, sync: raw_target.sync, count: raw_target.count },
            &raw.test_enable,
        )?;

        let mut links = Vec::new();
        for (link_source, raw_link) in raw_target.link {
            let context = format!("{target_name}.{link_source}");
            let chain = match raw_link {
                Some(raw_chain) => build_chain(&context, raw_chain, &raw.test_enable)?,
                None => ComponentChain::default(),
            };
            links.push(ResetLink { source: link_source, chain });
        }

        targets.push(ResetTarget { name: target_name, active, chain, links });
    }

    if targets.is_empty() {
        log::error!("Error: reset configuration must have at least one target");
        return Err(Diagnostic::ResetConfig { context: name, field: "target" });
    }

    let reason = match raw.reason {
        Some(raw_reason) => {
            let root_reset = raw_reason.root_reset.ok_or_else(|| {
                log::error!("Error: 'root_reset' field is required in reason configuration");
                Diagnostic::ResetConfig { context: "reason".to_string(), field: "root_reset" }
            })?;
            if !sources.iter().any(|s| s.name == root_reset) {
                log::error!("Error: specified root_reset '{root_reset}' not found in source list");
                return Err(Diagnostic::ResetConfig { context: "reason".to_string(), field: "root_reset" });
            }
            let source_order: Vec<String> =
                sources.iter().filter(|s| s.name != root_reset).map(|s| s.name.clone()).collect();
            let vector_width = source_order.len().max(1);
            Some(ReasonConfig {
                clock: raw_reason.clock.unwrap_or_else(|| "clk_32k".to_string()),
                output: raw_reason.output.unwrap_or_else(|| "reason".to_string()),
                valid: raw_reason.valid.unwrap_or_else(|| "reason_valid".to_string()),
                clear: raw_reason.clear.unwrap_or_else(|| "reason_clear".to_string()),
                root_reset,
                clear_cycles: raw_reason.clear_cycles,
                source_order,
                vector_width,
            })
        }
        None => None,
    };

    Ok(ResetSpec { name, test_enable: raw.test_enable, sources, targets, reason })
}

/// Full pipeline: parse, emit the controller module, write (or refresh)
/// the shared `reset_cell.v`, and best-effort emit a Typst diagram
/// alongside it. A diagram failure is logged and does not fail the call.
pub fn generate(value: &serde_yaml::Value, output_dir: &Path, force_overwrite: bool) -> Result<ResetOutput> {
    let spec = parse_reset_spec(value)?;
    let verilog = emit::generate_module(&spec);
    cells::write_reset_cell_file(output_dir, force_overwrite)?;

    let typst_path = output_dir.join(format!("{}.typ", spec.name));
    let typst_text = diagram::generate_typst(&spec);
    if let Err(e) = std::fs::write(&typst_path, typst_text) {
        log::warn!("Failed to generate Typst diagram (non-critical): {e}");
    }

    Ok(ResetOutput { module_name: spec.name.clone(), verilog })
}

pub struct ResetOutput {
    pub module_name: String,
    pub verilog: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> serde_yaml::Value {
        serde_yaml::from_str(
            r#"
name: rst_ctrl
source:
  por_rst_n: { active: low }
target:
  sys_rst_n:
    active: low
    link:
      por_rst_n:
        sync: { clock: clk_sys, stage: 4 }
reason:
  clock: clk_32k
  output: reason
  valid: reason_valid
  clear: reason_clear
  root_reset: por_rst_n
"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_minimal_spec() {
        let spec = parse_reset_spec(&minimal_yaml()).unwrap();
        assert_eq!(spec.name, "rst_ctrl");
        assert_eq!(spec.targets.len(), 1);
        assert_eq!(spec.targets[0].links.len(), 1);
        assert_eq!(spec.targets[0].links[0].chain.sync_cfg.as_ref().unwrap().shape, 4);
        let reason = spec.reason.unwrap();
        assert_eq!(reason.vector_width, 1);
        assert!(reason.source_order.is_empty());
    }

    #[test]
    fn missing_target_active_is_fatal() {
        let value: serde_yaml::Value = serde_yaml::from_str(
            r#"
name: bad
source:
  por_rst_n: { active: low }
target:
  sys_rst_n:
    link:
      por_rst_n: null
"#,
        )
        .unwrap();
        assert!(parse_reset_spec(&value).is_err());
    }

    #[test]
    fn missing_root_reset_in_sources_is_fatal() {
        let value: serde_yaml::Value = serde_yaml::from_str(
            r#"
name: bad
source:
  por_rst_n: { active: low }
target:
  sys_rst_n:
    active: low
    link:
      por_rst_n: null
reason:
  root_reset: nope
"#,
        )
        .unwrap();
        assert!(parse_reset_spec(&value).is_err());
    }

    #[test]
    fn no_targets_is_fatal() {
        let value: serde_yaml::Value = serde_yaml::from_str("name: bad\n").unwrap();
        assert!(parse_reset_spec(&value).is_err());
    }
}
