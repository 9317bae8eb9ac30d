// SPDX-License-Identifier: Apache-2.0

//! `generateVerilog` (§4.E): writes the elaborated netlist as a single
//! Verilog-2001 module — ports, wires (with TODO comments for consistency
//! failures), instances, top-level assigns, and behavioral blocks.

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::module::ModuleCatalog;
use crate::netlist::check::{self, Direction, EndpointWidth, NetSummary};
use crate::netlist::NetlistDef;
use crate::number::NumberLiteral;
use crate::verilog_front::snippet::parse_verilog_snippet;

/// Per-net outcome of the consistency checks, carried alongside the net so
/// the wire-declaration pass can render its TODO comments.
pub struct NetReport {
    pub name: String,
    pub summary: NetSummary,
    pub width: usize,
    pub mismatches: Vec<String>,
}

/// Computes the effective width/direction for every endpoint of every net
/// (instance-side ports plus any top-level port with a matching `connect:`)
/// and classifies each net per §4.E / §8.
pub fn build_net_reports(def: &NetlistDef, modules: &ModuleCatalog) -> Vec<NetReport> {
    def.net
        .iter()
        .map(|(net_name, net)| {
            let mut directions = Vec::new();
            let mut widths = Vec::new();

            for (instance_name, conn) in &net.connection {
                if let Some((direction, width)) = instance_port_info(def, modules, instance_name, &conn.port) {
                    directions.push(direction);
                    widths.push(EndpointWidth {
                        instance: instance_name.clone(),
                        port: conn.port.clone(),
                        width: check::narrow_by_bits(width, conn.bits.as_deref()),
                    });
                }
            }

            for (top_name, top_port) in &def.port {
                if top_port.connect.as_deref() == Some(net_name.as_str()) {
                    let declared = check::parse_type_width(&top_port.type_name);
                    directions.push(Direction::from_str_loose(&top_port.direction).reversed());
                    widths.push(EndpointWidth { instance: "top".to_string(), port: top_name.clone(), width: declared });
                }
            }

            let summary = check::classify_net(&directions);
            let mismatches = check::width_mismatches(&widths);
            let width = widths.iter().map(|w| w.width).max().unwrap_or(1);

            NetReport { name: net_name.clone(), summary, width, mismatches }
        })
        .collect()
}

fn instance_port_info(
    def: &NetlistDef,
    modules: &ModuleCatalog,
    instance_name: &str,
    port_name: &str,
) -> Option<(Direction, usize)> {
    let instance = def.instance.get(instance_name)?;
    let module = modules.get_module(&instance.module)?;
    let port = module.port.get(port_name)?;
    let width = port
        .width
        .map(|w| w as usize)
        .unwrap_or_else(|| check::parse_type_width(port.type_name.as_deref().unwrap_or("logic")));
    Some((Direction::from_str_loose(&port.direction), width))
}

enum PortRef {
    Missing,
    Tieoff(String),
    Wire { net: String, bits: Option<String>, invert: bool },
}

/// Resolves how instance `inst_name`'s port `port_name` connects: an
/// instance-level `tieoff`/`link` override takes precedence over a `net:`
/// section lookup (§4.E generateVerilog item 4).
fn resolve_port_ref(def: &NetlistDef, inst_name: &str, port_name: &str) -> PortRef {
    let inst_spec = def.instance.get(inst_name).and_then(|i| i.port.get(port_name));

    if let Some(spec) = inst_spec {
        if let Some(tieoff) = &spec.tieoff {
            return PortRef::Tieoff(tieoff.clone());
        }
        if let Some(link) = &spec.link {
            return PortRef::Wire { net: link.clone(), bits: spec.bits.clone(), invert: spec.invert.unwrap_or(false) };
        }
    }

    for (net_name, net) in &def.net {
        if let Some(conn) = net.connection.get(inst_name) {
            if conn.port == port_name {
                let bits = inst_spec.and_then(|s| s.bits.clone()).or_else(|| conn.bits.clone());
                let invert = inst_spec.and_then(|s| s.invert).unwrap_or(false) || conn.invert.unwrap_or(false);
                return PortRef::Wire { net: net_name.clone(), bits, invert };
            }
        }
    }

    match inst_spec {
        Some(spec) if spec.bits.is_some() || spec.invert.is_some() => PortRef::Wire {
            net: port_name.to_string(),
            bits: spec.bits.clone(),
            invert: spec.invert.unwrap_or(false),
        },
        _ => PortRef::Missing,
    }
}

fn strip_logic(type_name: &str) -> String {
    type_name.replace("logic", "").trim().to_string()
}

/// Writes the complete `.v` text for `netlist_name`, honoring the net
/// reports computed by [`build_net_reports`].
pub fn generate_verilog(
    netlist_name: &str,
    def: &NetlistDef,
    modules: &ModuleCatalog,
    reports: &[NetReport],
) -> String {
    let mut out = String::new();
    let report_by_net: HashMap<&str, &NetReport> = reports.iter().map(|r| (r.name.as_str(), r)).collect();

    let _ = writeln!(out, "// {netlist_name}.v");
    let _ = writeln!(out, "// Generated by socweave - do not edit by hand.");
    out.push('\n');

    let mut header = format!("module {netlist_name}");
    if !def.parameter.is_empty() {
        let params: Vec<String> = def
            .parameter
            .iter()
            .map(|(name, p)| format!("parameter {} = {}", name, p.value.clone().unwrap_or_default()))
            .collect();
        let _ = write!(header, " #(\n    {}\n)", params.join(",\n    "));
    }
    out.push_str(&header);

    let port_lines: Vec<String> = def
        .port
        .iter()
        .map(|(name, p)| {
            let width = strip_logic(&p.type_name);
            if width.is_empty() {
                format!("    {} {}", p.direction, name)
            } else {
                format!("    {} {} {}", p.direction, width, name)
            }
        })
        .collect();
    if port_lines.is_empty() {
        out.push_str(" ();\n\n");
    } else {
        let _ = write!(out, " (\n{}\n);\n\n", port_lines.join(",\n"));
    }

    for (net_name, _) in &def.net {
        if let Some(report) = report_by_net.get(net_name.as_str()) {
            match report.summary {
                NetSummary::Undriven => {
                    let _ = writeln!(out, "    // TODO: net `{net_name}` is undriven");
                }
                NetSummary::Multidrive => {
                    let _ = writeln!(out, "    // TODO: net `{net_name}` has multiple drivers");
                }
                NetSummary::Valid => {}
            }
            for mismatch in &report.mismatches {
                let _ = writeln!(out, "    // TODO: net `{net_name}` width mismatch: {mismatch}");
            }
            let width = report.width;
            if width <= 1 {
                let _ = writeln!(out, "    wire {net_name};");
            } else {
                let _ = writeln!(out, "    wire [{}:0] {net_name};", width - 1);
            }
        }
    }
    out.push('\n');

    for (inst_name, inst) in &def.instance {
        let Some(module) = modules.get_module(&inst.module) else {
            let _ = writeln!(out, "    // TODO: instance `{inst_name}` references unknown module `{}`", inst.module);
            continue;
        };

        let mut line = format!("    {}", inst.module);
        if !inst.parameter.is_empty() {
            let overrides: Vec<String> =
                inst.parameter.iter().map(|(name, value)| format!("{name}({value})")).collect();
            let _ = write!(line, " #(.{})", overrides.join(", ."));
        }
        let _ = write!(line, " {inst_name} (\n");

        let conn_lines: Vec<String> = module
            .port
            .iter()
            .map(|(port_name, port)| {
                let conn_text = match resolve_port_ref(def, inst_name, port_name) {
                    PortRef::Missing => {
                        format!("/* TODO: {} {port_name} missing */", port.direction)
                    }
                    PortRef::Tieoff(literal) => {
                        let width = port
                            .width
                            .map(|w| w as usize)
                            .unwrap_or_else(|| check::parse_type_width(port.type_name.as_deref().unwrap_or("logic")));
                        let lit = NumberLiteral::parse(&literal);
                        let padded = format!("{width}'b0"); // fallback when literal is unparsable
                        if lit.error_detected() {
                            padded
                        } else {
                            lit.format_verilog_proper_width()
                        }
                    }
                    PortRef::Wire { net, bits, invert } => {
                        let base = match bits {
                            Some(b) => format!("{net}[{b}]"),
                            None => net,
                        };
                        if invert {
                            format!("~({base})")
                        } else {
                            base
                        }
                    }
                };
                format!("        .{port_name}({conn_text})")
            })
            .collect();
        line.push_str(&conn_lines.join(",\n"));
        line.push_str("\n    );\n");
        out.push_str(&line);
    }
    out.push('\n');

    for (top_name, top_port) in &def.port {
        let Some(net_name) = &top_port.connect else { continue };
        let direction = Direction::from_str_loose(&top_port.direction);
        let invert = top_port.invert.unwrap_or(false);
        let net_expr = if invert { format!("~({net_name})") } else { net_name.clone() };
        let port_expr = if invert { format!("~({top_name})") } else { top_name.clone() };
        match direction {
            Direction::Input => {
                let _ = writeln!(out, "    assign {net_name} = {port_expr};");
            }
            Direction::Output => {
                let _ = writeln!(out, "    assign {top_name} = {net_expr};");
            }
            Direction::Inout => {
                let _ = writeln!(out, "    // TODO: inout top-level port `{top_name}` connect not emitted");
            }
        }
    }

    emit_behavioral_blocks(&mut out, def);

    out.push_str("\nendmodule\n");
    out
}

fn known_top_names(def: &NetlistDef) -> std::collections::HashSet<String> {
    def.port
        .keys()
        .chain(def.net.keys())
        .chain(def.parameter.keys())
        .cloned()
        .collect()
}

fn target_width(def: &NetlistDef, target: &str) -> usize {
    def.port
        .get(target)
        .map(|p| check::parse_type_width(&p.type_name))
        .or_else(|| def.net.contains_key(target).then_some(1))
        .unwrap_or(1)
}

/// Emits `comb`/`seq`/`fsm` behavioral blocks (§4.E "Behavioral blocks").
/// Each target gets a shadow reg, a continuous assign from that reg, and a
/// procedural block whose body is the user's snippet text with the target
/// name rewritten to the reg name. Identifiers the snippet parser can't
/// resolve against existing top-level names become new auto-added module
/// inputs (their `logic` prelude is otherwise discarded).
fn emit_behavioral_blocks(out: &mut String, def: &NetlistDef) {
    let known = known_top_names(def);

    for target in def.comb.keys().chain(def.seq.keys()).chain(def.fsm.keys()) {
        let width = target_width(def, target);
        emit_reg_and_assign(out, target, width);
    }

    for (target, block) in &def.comb {
        let width = target_width(def, target);
        let mut widths = HashMap::new();
        widths.insert(target.clone(), width);
        if let Ok(result) = parse_verilog_snippet(&block.body, &widths) {
            for name in auto_added_inputs(&result.auto_declared, &known, target) {
                let _ = writeln!(out, "    // TODO: auto-added input `{name}` referenced by comb block `{target}`");
            }
        }
        let body = rewrite_target(&block.body, target);
        let _ = writeln!(out, "    always @(*) begin");
        let _ = writeln!(out, "{}", indent(&body, 8));
        let _ = writeln!(out, "    end");
    }

    for (target, block) in &def.seq {
        let width = target_width(def, target);
        let clk = block.clk.clone().unwrap_or_else(|| "clk".to_string());
        let rst = block.rst.clone().unwrap_or_else(|| "rst_n".to_string());
        let mut widths = HashMap::new();
        widths.insert(target.clone(), width);
        if let Ok(result) = parse_verilog_snippet(&block.body, &widths) {
            for name in auto_added_inputs(&result.auto_declared, &known, target) {
                let _ = writeln!(out, "    // TODO: auto-added input `{name}` referenced by seq block `{target}`");
            }
        }
        let body = rewrite_target(&block.body, target);
        let _ = writeln!(out, "    always @(posedge {clk} or negedge {rst}) begin");
        let _ = writeln!(out, "        if (!{rst}) begin");
        let _ = writeln!(out, "            {target}_reg <= {width}'b0;");
        let _ = writeln!(out, "        end else begin");
        let _ = writeln!(out, "{}", indent(&body, 12));
        let _ = writeln!(out, "        end");
        let _ = writeln!(out, "    end");
    }

    for (target, block) in &def.fsm {
        let width = target_width(def, target);
        let clk = block.clk.clone().unwrap_or_else(|| "clk".to_string());
        let rst = block.rst.clone().unwrap_or_else(|| "rst_n".to_string());
        if width <= 1 {
            let _ = writeln!(out, "    reg {target}_next;");
        } else {
            let _ = writeln!(out, "    reg [{}:0] {target}_next;", width - 1);
        }
        let body = rewrite_target(&block.body, target);
        let _ = writeln!(out, "    always @(*) begin");
        let _ = writeln!(out, "        {target}_next = {target}_reg;");
        let _ = writeln!(out, "{}", indent(&body, 8));
        let _ = writeln!(out, "    end");
        let _ = writeln!(out, "    always @(posedge {clk} or negedge {rst}) begin");
        let _ = writeln!(out, "        if (!{rst}) begin");
        let _ = writeln!(out, "            {target}_reg <= {width}'b0;");
        let _ = writeln!(out, "        end else begin");
        let _ = writeln!(out, "            {target}_reg <= {target}_next;");
        let _ = writeln!(out, "        end");
        let _ = writeln!(out, "    end");
    }
}

fn emit_reg_and_assign(out: &mut String, target: &str, width: usize) {
    if width <= 1 {
        let _ = writeln!(out, "    reg {target}_reg;");
    } else {
        let _ = writeln!(out, "    reg [{}:0] {target}_reg;", width - 1);
    }
    let _ = writeln!(out, "    assign {target} = {target}_reg;");
}

fn rewrite_target(body: &str, target: &str) -> String {
    let re = regex::Regex::new(&format!(r"\b{}\b", regex::escape(target))).unwrap();
    re.replace_all(body, format!("{target}_reg").as_str()).into_owned()
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines().map(|l| format!("{pad}{l}")).collect::<Vec<_>>().join("\n")
}

fn auto_added_inputs(auto_declared: &[String], known: &std::collections::HashSet<String>, target: &str) -> Vec<String> {
    auto_declared
        .iter()
        .filter(|n| n.as_str() != target && !known.contains(n.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleDef, ModulePort};
    use crate::netlist::{InstanceDef, NetConnection, NetDef, TopPort};

    fn tiny_module() -> ModuleDef {
        let mut ports = IndexMap::new();
        ports.insert("clk".to_string(), ModulePort { direction: "input".into(), type_name: None, width: Some(1) });
        ports.insert("d".to_string(), ModulePort { direction: "input".into(), type_name: None, width: Some(8) });
        ports.insert("q".to_string(), ModulePort { direction: "output".into(), type_name: None, width: Some(8) });
        ModuleDef { port: ports, parameter: IndexMap::new(), bus: IndexMap::new() }
    }

    #[test]
    fn generates_module_with_instance_and_wire() {
        let dir = tempfile::tempdir().unwrap();
        let mut modules = ModuleCatalog::new(dir.path());
        std::fs::write(
            dir.path().join("regs.soc_mod"),
            serde_yaml::to_string(&{
                let mut m = IndexMap::new();
                m.insert("reg8".to_string(), tiny_module());
                m
            })
            .unwrap(),
        )
        .unwrap();
        modules.load(&crate::selector::Selector::Any).unwrap();

        let mut def = NetlistDef::default();
        def.port.insert(
            "clk_i".to_string(),
            TopPort { direction: "input".into(), type_name: "logic".into(), connect: Some("clk_net".into()), invert: None },
        );
        def.instance.insert("u0".to_string(), InstanceDef { module: "reg8".to_string(), ..Default::default() });
        let mut net = NetDef::default();
        net.connection.insert("u0".to_string(), NetConnection { port: "clk".to_string(), bits: None, invert: None });
        def.net.insert("clk_net".to_string(), net);

        let reports = build_net_reports(&def, &modules);
        let verilog = generate_verilog("top", &def, &modules, &reports);
        assert!(verilog.contains("module top"));
        assert!(verilog.contains("wire clk_net;"));
        assert!(verilog.contains(".clk(clk_net)"));
        assert!(verilog.contains("assign clk_net = clk_i;"));
        assert!(verilog.contains("endmodule"));
    }

    #[test]
    fn missing_port_connection_emits_todo() {
        let dir = tempfile::tempdir().unwrap();
        let mut modules = ModuleCatalog::new(dir.path());
        std::fs::write(
            dir.path().join("regs.soc_mod"),
            serde_yaml::to_string(&{
                let mut m = IndexMap::new();
                m.insert("reg8".to_string(), tiny_module());
                m
            })
            .unwrap(),
        )
        .unwrap();
        modules.load(&crate::selector::Selector::Any).unwrap();

        let mut def = NetlistDef::default();
        def.instance.insert("u0".to_string(), InstanceDef { module: "reg8".to_string(), ..Default::default() });

        let reports = build_net_reports(&def, &modules);
        let verilog = generate_verilog("top", &def, &modules, &reports);
        assert!(verilog.contains("TODO: input clk missing") || verilog.contains("TODO: input d missing"));
    }

    #[test]
    fn undriven_net_gets_todo_comment() {
        let dir = tempfile::tempdir().unwrap();
        let modules = ModuleCatalog::new(dir.path());
        let mut def = NetlistDef::default();
        def.instance.insert("u0".to_string(), InstanceDef { module: "reg8".to_string(), ..Default::default() });
        let mut net = NetDef::default();
        net.connection.insert("u0".to_string(), NetConnection { port: "d".to_string(), bits: None, invert: None });
        def.net.insert("lonely".to_string(), net);

        let reports = build_net_reports(&def, &modules);
        assert_eq!(reports[0].summary, NetSummary::Undriven);
    }
}
