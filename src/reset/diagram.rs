// SPDX-License-Identifier: Apache-2.0

//! Best-effort Typst reset-tree diagram (§4.F "Diagram"). Generation never
//! fails outright — layout degrades gracefully for unusual specs — so the
//! caller treats a write failure, not a generation failure, as the only
//! non-fatal error case.

use std::fmt::Write as _;

use regex::Regex;

use crate::reset::{ResetSpec, ResetTarget};

fn escape_id(raw: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9_-]+").unwrap();
    re.replace_all(raw, "_").into_owned()
}

fn header(out: &mut String) {
    out.push_str("#import \"@preview/circuiteria:0.2.0\": *\n");
    out.push_str("#import \"@preview/cetz:0.3.2\": draw\n");
    out.push_str("#set page(width: auto, height: auto, margin: .5cm)\n");
    out.push_str("#set text(size: 10pt)\n");
    out.push_str("#align(center)[\n");
    out.push_str("  = Reset tree\n");
    out.push_str("]\n");
    out.push_str("#v(0.5cm)\n");
    out.push_str("#circuit({\n");
}

fn legend(out: &mut String) {
    out.push_str("  // === Legend ===\n");
    let entries = [("legend_or", "OR", "green", 0.0), ("legend_async", "ASYNC", "blue", 3.5),
        ("legend_sync", "SYNC", "yellow", 7.0), ("legend_count", "COUNT", "orange", 10.5)];
    for (id, label, color, x) in entries {
        let _ = writeln!(
            out,
            "  element.block(x: {x:.2}, y: -1.20, w: 1.0, h: 0.8, id: \"{id}\", name: \"{label}\", fill: util.colors.{color}, ports: (west: ((id: \"i\"),), east: ((id: \"o\"),)))"
        );
        let _ = writeln!(out, "  draw.content(({:.2}, -2.30), [{label}])", x + 0.5);
    }
    out.push('\n');
}

/// Source stubs, 4 per row. Returns the y-coordinate of the bottom of the
/// source grid so target rows can be stacked below it.
fn root_stubs(out: &mut String, spec: &ResetSpec) -> f32 {
    const PER_ROW: usize = 4;
    const Y0: f32 = -5.0;
    const DX: f32 = 4.0;
    const DY: f32 = 2.5;

    if spec.sources.is_empty() {
        return -5.0;
    }

    out.push_str("  // === Reset sources ===\n");
    let rows = spec.sources.len().div_ceil(PER_ROW);
    let bottom_y = Y0 - (rows.saturating_sub(1)) as f32 * DY - 3.5;

    for (idx, source) in spec.sources.iter().enumerate() {
        let row = idx / PER_ROW;
        let col = idx % PER_ROW;
        let x = col as f32 * DX;
        let y = Y0 - row as f32 * DY;
        let id = escape_id(&format!("SRC_{}", source.name));
        let _ = writeln!(
            out,
            "  element.block(x: {x:.2}, y: {y:.2}, w: .1, h: .1, id: \"{id}\", ports: (north: ((id: \"N\"),)))"
        );
        let _ = writeln!(out, "  wire.stub(\"{id}-port-N\", \"north\", name: \"{}\")", source.name);
    }
    out.push('\n');
    bottom_y
}

/// A single link's component kind, when every link on a target shares the
/// same kind and shape — drawn once and shared rather than once per link.
fn shared_component<'a>(target: &'a ResetTarget) -> Option<(&'static str, &'a crate::reset::ComponentConfig)> {
    let first = target.links.first()?;
    let stages = first.chain.stages();
    let (kind, cfg) = stages.first()?;
    if stages.len() != 1 {
        return None;
    }
    for link in &target.links[1..] {
        let other_stages = link.chain.stages();
        match other_stages.as_slice() {
            [(other_kind, other_cfg)] if *other_kind == *kind && other_cfg.clock == cfg.clock && other_cfg.shape == cfg.shape => {}
            _ => return None,
        }
    }
    Some((*kind, *cfg))
}

fn target_diagram(out: &mut String, target: &ResetTarget, x: f32, y: f32) {
    let tid = escape_id(&target.name);
    let _ = writeln!(out, "  // ---- {} ----", target.name);
    if target.links.is_empty() {
        return;
    }

    let shared = shared_component(target);
    let num_sources = target.links.len();
    let or_height = (1.5_f32).max(0.6 * num_sources as f32);
    let mut prev;

    if num_sources == 1 && shared.is_none() {
        let sid = escape_id(&format!("{tid}_SRC"));
        let _ = writeln!(
            out,
            "  element.block(x: {x:.2}, y: {:.2}, w: .8, h: .6, id: \"{sid}\", name: \"\", ports: (east: ((id: \"out\"),)))",
            y + 0.6
        );
        let _ = writeln!(out, "  wire.stub(\"{sid}-port-out\", \"west\", name: \"{}\")", target.links[0].source);
        prev = format!("{sid}-port-out");
    } else {
        let or_id = escape_id(&format!("{tid}_OR"));
        let _ = writeln!(out, "  element.block(");
        let _ = writeln!(out, "    x: {x:.2}, y: {:.2}, w: 1.2, h: {or_height:.2},", y + 0.3);
        let _ = writeln!(out, "    id: \"{or_id}\", name: \"OR\", fill: util.colors.green,");
        let ins: Vec<String> = (0..num_sources).map(|i| format!("(id: \"in{i}\")")).collect();
        let _ = writeln!(out, "    ports: (west: ({},), east: ((id: \"out\"),))", ins.join(", "));
        let _ = writeln!(out, "  )");
        for (i, link) in target.links.iter().enumerate() {
            let _ = writeln!(out, "  wire.stub(\"{or_id}-port-in{i}\", \"west\", name: \"{}\")", link.source);
        }
        prev = format!("{or_id}-port-out");
    }

    if let Some((kind, cfg)) = shared {
        let comp_y = y + or_height / 2.0 - 0.6;
        let (label, color) = match kind {
            "async" => ("ASYNC", "blue"),
            "sync" => ("SYNC", "yellow"),
            _ => ("COUNT", "orange"),
        };
        let comp_id = escape_id(&format!("{tid}_{}", label));
        let shape_label = if kind == "count" { format!("cycle:{}", cfg.shape) } else { format!("stage:{}", cfg.shape) };

        let _ = writeln!(out, "  element.block(");
        let _ = writeln!(out, "    x: {:.2}, y: {:.2}, w: 1.5, h: 1.2,", x + 2.5, comp_y + 0.3);
        let _ = writeln!(out, "    id: \"{comp_id}\", name: \"{label}\", fill: util.colors.{color},");
        let _ = writeln!(out, "    ports: (west: ((id: \"in\"),), east: ((id: \"out\"),))");
        let _ = writeln!(out, "  )");
        let _ = writeln!(out, "  draw.content(({:.2}, {:.2}), text(size: 6pt)[{}])", x + 3.25, comp_y - 0.3, cfg.clock);
        let _ = writeln!(out, "  draw.content(({:.2}, {:.2}), text(size: 6pt)[{shape_label}])", x + 3.25, comp_y - 0.7);
        let _ = writeln!(out, "  wire.wire(\"w_{tid}_or_comp\", (\"{prev}\", \"{comp_id}-port-in\"))");
        prev = format!("{comp_id}-port-out");
    }

    let oid = escape_id(&format!("{tid}_OUT"));
    let out_y = y + or_height / 2.0;
    let _ = writeln!(
        out,
        "  element.block(x: {:.2}, y: {out_y:.2}, w: .8, h: .6, id: \"{oid}\", name: \"\", ports: (east: ((id: \"E\"),)))",
        x + 5.5
    );
    let _ = writeln!(out, "  wire.wire(\"w_{tid}_to_out\", (\"{prev}\", \"{oid}-port-E\"))");
    let _ = writeln!(out, "  wire.stub(\"{oid}-port-E\", \"east\", name: \"{}\")", target.name);
    out.push('\n');
}

/// Draws the reset tree: a legend, the source grid, and one block per
/// target stacked vertically below it.
pub fn generate_typst(spec: &ResetSpec) -> String {
    let mut out = String::new();
    header(&mut out);
    legend(&mut out);
    let bottom_y = root_stubs(&mut out, spec);

    let y0 = bottom_y - 2.5;
    for (idx, target) in spec.targets.iter().enumerate() {
        let y = y0 - idx as f32 * 5.0;
        target_diagram(&mut out, target, 0.0, y);
    }

    out.push_str("})\n");
    out
}
