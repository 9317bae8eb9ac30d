// SPDX-License-Identifier: Apache-2.0

//! Reset-controller module body generation (§4.F "Module interface" /
//! "Body" / "Reset-reason recorder").

use std::fmt::Write as _;

use indexmap::IndexSet;

use crate::reset::{ComponentChain, ReasonConfig, ResetSpec};

/// `<target>_link<idx>_n`, with a trailing `_n` on the target name
/// stripped first so the generated name doesn't read `..._n_link0_n`.
fn link_wire_name(target_name: &str, link_idx: usize) -> String {
    let clean = target_name.strip_suffix("_n").unwrap_or(target_name);
    format!("{clean}_link{link_idx}_n")
}

fn component_instance_name(target_name: &str, link_idx: Option<usize>, kind: &str, stage: usize) -> String {
    let clean = target_name.strip_suffix("_n").unwrap_or(target_name);
    match link_idx {
        Some(idx) => format!("i_{clean}_link{idx}_{kind}_{stage}"),
        None => format!("i_{clean}_target_{kind}_{stage}"),
    }
}

fn normalized_source(source_name: &str, spec: &ResetSpec) -> String {
    match spec.sources.iter().find(|s| s.name == source_name) {
        Some(s) if s.active == "high" => format!("~{source_name}"),
        _ => source_name.to_string(),
    }
}

/// Collects clocks in the same order the grounding codebase does: per
/// target, each link's async/sync/count clocks, then the target's own,
/// then (last) the reason clock.
fn collect_clocks(spec: &ResetSpec) -> Vec<String> {
    let mut clocks = IndexSet::new();
    for target in &spec.targets {
        for link in &target.links {
            for (_, cfg) in link.chain.stages() {
                clocks.insert(cfg.clock.clone());
            }
        }
        for (_, cfg) in target.chain.stages() {
            clocks.insert(cfg.clock.clone());
        }
    }
    if let Some(reason) = &spec.reason {
        clocks.insert(reason.clock.clone());
    }
    clocks.into_iter().collect()
}

/// Source inputs, excluding any name that is also a target name
/// ("output-wins", §8 Output-wins rule), in first-appearance order.
fn collect_sources(spec: &ResetSpec) -> Vec<String> {
    let target_names: IndexSet<&str> = spec.targets.iter().map(|t| t.name.as_str()).collect();
    let mut sources = IndexSet::new();
    for target in &spec.targets {
        for link in &target.links {
            if !target_names.contains(link.source.as_str()) {
                sources.insert(link.source.clone());
            }
        }
    }
    sources.into_iter().collect()
}

fn emit_module_header(out: &mut String, spec: &ResetSpec) {
    let _ = writeln!(out, "module {} (", spec.name);

    let mut decls: Vec<(String, &'static str)> = Vec::new();

    for clock in collect_clocks(spec) {
        decls.push((format!("    input  wire {clock}"), "Clock inputs"));
    }
    for source in collect_sources(spec) {
        decls.push((format!("    input  wire {source}"), "Reset sources"));
    }
    if let Some(test_enable) = &spec.test_enable {
        decls.push((format!("    input  wire {test_enable}"), "Test enable signal"));
    }
    if let Some(reason) = &spec.reason {
        decls.push((format!("    input  wire {}", reason.clear), "Reset reason clear"));
    }
    for target in &spec.targets {
        decls.push((format!("    output wire {}", target.name), "Reset targets"));
    }
    if let Some(reason) = &spec.reason {
        let port = if reason.vector_width > 1 {
            format!("    output wire [{}:0] {}", reason.vector_width - 1, reason.output)
        } else {
            format!("    output wire {}", reason.output)
        };
        decls.push((port, "Reset reason outputs"));
        decls.push((format!("    output wire {}", reason.valid), "Reset reason outputs"));
    }

    for (idx, (decl, comment)) in decls.iter().enumerate() {
        let comma = if idx + 1 == decls.len() { "" } else { "," };
        let _ = writeln!(out, "{decl}{comma} /**< {comment} */");
    }
    let _ = writeln!(out, ");\n");
}

fn target_has_processing(chain: &ComponentChain) -> bool {
    !chain.is_empty()
}

fn emit_wire_declarations(out: &mut String, spec: &ResetSpec) {
    let _ = writeln!(out, "    /* Wire declarations */");
    for target in &spec.targets {
        for idx in 0..target.links.len() {
            let _ = writeln!(out, "    wire {};", link_wire_name(&target.name, idx));
        }
        if target_has_processing(&target.chain) {
            let _ = writeln!(out, "    wire {}_processed;", target.name);
        }
    }
    out.push('\n');
}

/// Emits a series chain for `chain`'s declared stages (async then sync
/// then count, any subset), wiring `input_signal` through each stage in
/// turn and returning the final stage's output wire. A chain with no
/// stages emits nothing and returns `input_signal` unchanged.
fn emit_chain(out: &mut String, target_name: &str, link_idx: Option<usize>, chain: &ComponentChain, input_signal: &str, final_wire: &str) {
    let stages = chain.stages();
    if stages.is_empty() {
        let _ = writeln!(out, "    assign {final_wire} = {input_signal};");
        return;
    }

    let mut current = input_signal.to_string();
    for (stage_idx, (kind, cfg)) in stages.iter().enumerate() {
        let is_last = stage_idx + 1 == stages.len();
        let output = if is_last { final_wire.to_string() } else { format!("{final_wire}_s{stage_idx}_n") };
        let instance_name = component_instance_name(target_name, link_idx, kind, stage_idx);
        let test_enable = cfg.test_enable.clone().unwrap_or_else(|| "1'b0".to_string());

        let (module, param) = match *kind {
            "async" => ("qsoc_rst_sync", "STAGE"),
            "sync" => ("qsoc_rst_pipe", "STAGE"),
            _ => ("qsoc_rst_count", "CYCLE"),
        };

        let _ = writeln!(out, "    {module} #(");
        let _ = writeln!(out, "        .{param}({})", cfg.shape);
        let _ = writeln!(out, "    ) {instance_name} (");
        let _ = writeln!(out, "        .clk({}),", cfg.clock);
        let _ = writeln!(out, "        .rst_in_n({current}),");
        let _ = writeln!(out, "        .test_enable({test_enable}),");
        let _ = writeln!(out, "        .rst_out_n({output})");
        let _ = writeln!(out, "    );");

        if !is_last {
            let _ = writeln!(out, "    wire {output};");
        }
        current = output;
    }
}

fn emit_reset_logic(out: &mut String, spec: &ResetSpec) {
    let _ = writeln!(out, "    /* Reset logic instances */");
    for target in &spec.targets {
        let _ = writeln!(out, "    /* Target: {} */", target.name);
        for (idx, link) in target.links.iter().enumerate() {
            let wire = link_wire_name(&target.name, idx);
            if link.chain.is_empty() {
                let source = normalized_source(&link.source, spec);
                let _ = writeln!(out, "    assign {wire} = {source};");
            } else {
                let source = normalized_source(&link.source, spec);
                emit_chain(out, &target.name, Some(idx), &link.chain, &source, &wire);
            }
        }
        out.push('\n');
    }
}

fn emit_output_assignments(out: &mut String, spec: &ResetSpec) {
    let _ = writeln!(out, "    /* Target output assignments */");
    for target in &spec.targets {
        let input_signal = match target.links.len() {
            0 => if target.active == "low" { "1'b1".to_string() } else { "1'b0".to_string() },
            1 => link_wire_name(&target.name, 0),
            _ => {
                let combined = format!("{}_combined", target.name);
                let wires: Vec<String> = (0..target.links.len()).map(|i| link_wire_name(&target.name, i)).collect();
                let _ = writeln!(out, "    wire {combined} = {};", wires.join(" & "));
                combined
            }
        };

        if target_has_processing(&target.chain) {
            let processed = format!("{}_processed", target.name);
            emit_chain(out, &target.name, None, &target.chain, &input_signal, &processed);
            let final_expr = if target.active == "low" { processed } else { format!("~{processed}") };
            let _ = writeln!(out, "    assign {} = {final_expr};", target.name);
        } else {
            let final_expr =
                if target.active == "low" { input_signal } else { format!("~{input_signal}") };
            let _ = writeln!(out, "    assign {} = {final_expr};", target.name);
        }
    }
    out.push('\n');
}

/// Sticky-flag reset-reason recorder (§4.F "Reset-reason recorder"): event
/// normalization, a 3-stage `reason_clear` synchronizer, a fixed 2-cycle
/// clear window keyed off the root reset's release edge, async-set/
/// sync-clear flags, and gated `reason`/`reason_valid` outputs.
fn emit_reset_reason(out: &mut String, reason: &ReasonConfig) {
    if reason.source_order.is_empty() {
        let _ = writeln!(out, "    /* Reset reason recording logic (no non-root sources to track) */");
        let _ = writeln!(out, "    assign {} = 1'b1;", reason.valid);
        let _ = writeln!(out, "    assign {} = 1'b0;", reason.output);
        out.push('\n');
        return;
    }

    let _ = writeln!(out, "    /* Reset reason recording logic (async-set, sync-clear sticky flags) */");
    let _ = writeln!(out, "    /* 2-cycle clear window after POR release or SW clear pulse */\n");

    let _ = writeln!(out, "    /* Event normalization: convert all sources to LOW-active format */");
    for name in &reason.source_order {
        let _ = writeln!(out, "    wire {name}_event_n = {name};");
    }
    out.push('\n');

    let _ = writeln!(out, "    /* Synchronize software clear and generate pulse */");
    let _ = writeln!(out, "    reg swc_d1, swc_d2, swc_d3;");
    let _ = writeln!(out, "    always @(posedge {} or negedge {}) begin", reason.clock, reason.root_reset);
    let _ = writeln!(out, "        if (!{}) begin", reason.root_reset);
    let _ = writeln!(out, "            swc_d1 <= 1'b0;");
    let _ = writeln!(out, "            swc_d2 <= 1'b0;");
    let _ = writeln!(out, "            swc_d3 <= 1'b0;");
    let _ = writeln!(out, "        end else begin");
    let _ = writeln!(out, "            swc_d1 <= {};", reason.clear);
    let _ = writeln!(out, "            swc_d2 <= swc_d1;");
    let _ = writeln!(out, "            swc_d3 <= swc_d2;");
    let _ = writeln!(out, "        end");
    let _ = writeln!(out, "    end");
    let _ = writeln!(out, "    wire sw_clear_pulse = swc_d2 & ~swc_d3;\n");

    let _ = writeln!(out, "    /* Fixed 2-cycle clear controller and valid-signal generation */");
    let _ = writeln!(out, "    reg       init_done;");
    let _ = writeln!(out, "    reg [1:0] clr_sr;");
    let _ = writeln!(out, "    reg       valid_q;\n");
    let _ = writeln!(out, "    wire clr_en = |clr_sr;\n");

    let _ = writeln!(out, "    always @(posedge {} or negedge {}) begin", reason.clock, reason.root_reset);
    let _ = writeln!(out, "        if (!{}) begin", reason.root_reset);
    let _ = writeln!(out, "            init_done <= 1'b0;");
    let _ = writeln!(out, "            clr_sr    <= 2'b00;");
    let _ = writeln!(out, "            valid_q   <= 1'b0;");
    let _ = writeln!(out, "        end else begin");
    let _ = writeln!(out, "            if (!init_done) begin");
    let _ = writeln!(out, "                init_done <= 1'b1;");
    let _ = writeln!(out, "                clr_sr    <= 2'b11;");
    let _ = writeln!(out, "                valid_q   <= 1'b0;");
    let _ = writeln!(out, "            end else if (sw_clear_pulse) begin");
    let _ = writeln!(out, "                clr_sr  <= 2'b11;");
    let _ = writeln!(out, "                valid_q <= 1'b0;");
    let _ = writeln!(out, "            end else if (clr_en) begin");
    let _ = writeln!(out, "                clr_sr <= {{1'b0, clr_sr[1]}};");
    let _ = writeln!(out, "            end else begin");
    let _ = writeln!(out, "                valid_q <= 1'b1;");
    let _ = writeln!(out, "            end");
    let _ = writeln!(out, "        end");
    let _ = writeln!(out, "    end\n");

    let width = reason.vector_width;
    let _ = writeln!(out, "    /* Sticky flags: async-set on event, sync-clear during clear window */");
    let _ = writeln!(out, "    reg [{}:0] flags;\n", width - 1);

    let _ = writeln!(out, "    wire [{}:0] src_event_n = {{", width - 1);
    for (idx, name) in reason.source_order.iter().enumerate().rev() {
        let comma = if idx == 0 { "" } else { "," };
        let _ = writeln!(out, "        {name}_event_n{comma}");
    }
    let _ = writeln!(out, "    }};\n");

    let _ = writeln!(out, "    genvar reason_idx;");
    let _ = writeln!(out, "    generate");
    let _ = writeln!(out, "        for (reason_idx = 0; reason_idx < {width}; reason_idx = reason_idx + 1) begin : gen_reason");
    let _ = writeln!(out, "            always @(posedge {} or negedge src_event_n[reason_idx]) begin", reason.clock);
    let _ = writeln!(out, "                if (!src_event_n[reason_idx]) begin");
    let _ = writeln!(out, "                    flags[reason_idx] <= 1'b1;");
    let _ = writeln!(out, "                end else if (clr_en) begin");
    let _ = writeln!(out, "                    flags[reason_idx] <= 1'b0;");
    let _ = writeln!(out, "                end");
    let _ = writeln!(out, "            end");
    let _ = writeln!(out, "        end");
    let _ = writeln!(out, "    endgenerate\n");

    let _ = writeln!(out, "    /* Output gating: zeros until valid */");
    let _ = writeln!(out, "    assign {} = valid_q;", reason.valid);
    let _ = writeln!(out, "    assign {} = {} ? flags : {width}'b0;\n", reason.output, reason.valid);
}

/// Emits the complete reset-controller module text.
pub fn generate_module(spec: &ResetSpec) -> String {
    let mut out = String::new();
    emit_module_header(&mut out, spec);
    emit_wire_declarations(&mut out, spec);
    emit_reset_logic(&mut out, spec);
    if let Some(reason) = &spec.reason {
        emit_reset_reason(&mut out, reason);
    }
    emit_output_assignments(&mut out, spec);
    out.push_str("endmodule\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reset::parse_reset_spec;

    fn smoke_spec() -> ResetSpec {
        let value: serde_yaml::Value = serde_yaml::from_str(
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
        .unwrap();
        parse_reset_spec(&value).unwrap()
    }

    #[test]
    fn smoke_ports_match_output_wins_rule() {
        let spec = smoke_spec();
        let module = generate_module(&spec);
        assert!(module.contains("input  wire clk_sys"));
        assert!(module.contains("input  wire clk_32k"));
        assert!(module.contains("input  wire por_rst_n"));
        assert!(module.contains("input  wire reason_clear"));
        assert!(module.contains("output wire sys_rst_n"));
        assert!(module.contains("output wire reason"));
        assert!(module.contains("output wire reason_valid"));
        assert!(module.contains("qsoc_rst_pipe"));
        assert!(!module.contains("output wire por_rst_n"));
    }

    #[test]
    fn multi_link_target_gets_combined_and_gate() {
        let value: serde_yaml::Value = serde_yaml::from_str(
            r#"
name: rst_ctrl
source:
  por_rst_n: { active: low }
  ext_rst_n: { active: low }
target:
  sys_rst_n:
    active: low
    link:
      por_rst_n: null
      ext_rst_n: null
"#,
        )
        .unwrap();
        let spec = parse_reset_spec(&value).unwrap();
        let module = generate_module(&spec);
        assert!(module.contains("sys_rst_n_combined"));
        assert!(module.contains("sys_rst_link0_n & sys_rst_link1_n"));
    }

    #[test]
    fn high_active_source_is_inverted_at_use_site() {
        let value: serde_yaml::Value = serde_yaml::from_str(
            r#"
name: rst_ctrl
source:
  ext_rst: { active: high }
target:
  sys_rst_n:
    active: low
    link:
      ext_rst: null
"#,
        )
        .unwrap();
        let spec = parse_reset_spec(&value).unwrap();
        let module = generate_module(&spec);
        assert!(module.contains("assign sys_rst_link0_n = ~ext_rst;"));
    }

    #[test]
    fn chained_components_wire_through_intermediate_stage() {
        let value: serde_yaml::Value = serde_yaml::from_str(
            r#"
name: rst_ctrl
source:
  por_rst_n: { active: low }
target:
  sys_rst_n:
    active: low
    link:
      por_rst_n:
        async: { clock: clk_a, stage: 2 }
        sync: { clock: clk_b, stage: 4 }
"#,
        )
        .unwrap();
        let spec = parse_reset_spec(&value).unwrap();
        let module = generate_module(&spec);
        assert!(module.contains("qsoc_rst_sync"));
        assert!(module.contains("qsoc_rst_pipe"));
        assert!(module.contains("sys_rst_link0_n_s0_n"));
    }
}
