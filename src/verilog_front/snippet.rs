// SPDX-License-Identifier: Apache-2.0

//! Two-pass auto-declare for behavioral snippets (§4.D): a `comb`/`seq`/
//! `fsm` block the user writes references signals that belong to the
//! surrounding module but are not themselves declared inside the snippet.
//! Before handing the snippet to the front-end parser it has to compile on
//! its own, so pass 1 wraps it in a throwaway module shell and pass 2
//! prepends `logic` declarations for every identifier the snippet uses but
//! never declares.
//!
//! PRAGMATIC DEVIATION: the original flow detects undeclared identifiers
//! from the parser's own "unknown identifier" diagnostics. The exact
//! diagnostic-message shape `slang-rs` surfaces for that case isn't part of
//! the API this crate grounds its front-end driver on, so pass 2 instead
//! computes (all identifiers referenced) minus (identifiers declared
//! in-snippet, by regex) minus (a fixed keyword set). This is strictly more
//! conservative than diagnostic-driven detection: it can over-declare a
//! name that the real compiler would have accepted as already in scope
//! (e.g. a loop variable it fails to recognize as a declaration), but it
//! never leaves a genuinely free reference undeclared.

use std::collections::HashSet;

use regex::Regex;

use crate::error::Result;

/// Keywords and common system-function names that must never be mistaken
/// for a free signal reference.
const RESERVED: &[&str] = &[
    "module", "endmodule", "input", "output", "inout", "wire", "reg", "logic", "always", "always_comb",
    "always_ff", "always_latch", "begin", "end", "if", "else", "case", "casex", "casez", "endcase", "default",
    "for", "while", "assign", "posedge", "negedge", "or", "and", "not", "xor", "nand", "nor", "xnor", "parameter",
    "localparam", "integer", "genvar", "generate", "endgenerate", "function", "endfunction", "task", "endtask",
    "signed", "unsigned", "typedef", "enum", "struct", "packed", "unique", "priority", "initial", "$display",
    "$finish", "$time", "$signed", "$unsigned", "$clog2",
];

#[derive(Debug, Clone)]
pub struct SnippetResult {
    /// The snippet with auto-declared `logic` lines prepended.
    pub declared_snippet: String,
    /// Names that were auto-declared, each given the requested width.
    pub auto_declared: Vec<String>,
}

/// Runs the two-pass algorithm against `snippet_body` (the statements
/// inside the behavioral block, without the `always_*`/`begin`/`end`
/// wrapper) given the set of signals the surrounding module already
/// declares with known bit widths.
pub fn parse_verilog_snippet(
    snippet_body: &str,
    known_widths: &std::collections::HashMap<String, usize>,
) -> Result<SnippetResult> {
    let declared_in_snippet = extract_declared_identifiers(snippet_body);
    let referenced = extract_all_identifiers(snippet_body);
    let indexed_widths = infer_indexed_widths(snippet_body);

    let mut undeclared: Vec<String> = referenced
        .into_iter()
        .filter(|name| !declared_in_snippet.contains(name))
        .collect();
    undeclared.sort();

    let mut preamble = String::new();
    for name in &undeclared {
        let width = indexed_widths
            .get(name)
            .copied()
            .or_else(|| known_widths.get(name).copied())
            .unwrap_or(1);
        if width <= 1 {
            preamble.push_str(&format!("logic {name};\n"));
        } else {
            preamble.push_str(&format!("logic [{}:0] {name};\n", width - 1));
        }
    }

    Ok(SnippetResult {
        declared_snippet: format!("{preamble}{snippet_body}"),
        auto_declared: undeclared,
    })
}

/// For every identifier indexed as `name[hi:lo]` or `name[i]`, the maximum
/// high index seen plus one (§4.D's `requiredWidth = maxHigh + 1`).
fn infer_indexed_widths(code: &str) -> std::collections::HashMap<String, usize> {
    let range_re = Regex::new(r"\b([A-Za-z_][A-Za-z0-9_$]*)\s*\[\s*(\d+)\s*(?::\s*\d+\s*)?\]").unwrap();
    let mut widths: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for caps in range_re.captures_iter(code) {
        let name = caps[1].to_string();
        if let Ok(high) = caps[2].parse::<usize>() {
            let required = high + 1;
            let entry = widths.entry(name).or_insert(required);
            if required > *entry {
                *entry = required;
            }
        }
    }
    widths
}

/// Every bare identifier in `code`, minus Verilog keywords/system tasks and
/// numeric-literal base letters. This is a syntactic approximation (no
/// semantic scoping), matching the pragmatic deviation documented above.
pub fn extract_all_identifiers(code: &str) -> HashSet<String> {
    let ident_re = Regex::new(r"\b[A-Za-z_][A-Za-z0-9_$]*\b").unwrap();
    ident_re
        .find_iter(code)
        .map(|m| m.as_str().to_string())
        .filter(|name| !RESERVED.contains(&name.as_str()))
        .filter(|name| !is_preceded_by_tick(code, name))
        .collect()
}

/// Identifiers declared within the snippet itself via `logic`/`reg`/`wire`/
/// `integer`/`genvar` declarations, or bound as a `for`-loop induction
/// variable.
fn extract_declared_identifiers(code: &str) -> HashSet<String> {
    let decl_re = Regex::new(
        r"(?m)^\s*(?:logic|reg|wire|integer|genvar)\s*(?:\[[^\]]*\]\s*)?([A-Za-z_][A-Za-z0-9_$]*)",
    )
    .unwrap();
    let for_re = Regex::new(r"for\s*\(\s*(?:int|integer|genvar)?\s*([A-Za-z_][A-Za-z0-9_$]*)\s*=").unwrap();

    let mut out = HashSet::new();
    for caps in decl_re.captures_iter(code) {
        out.insert(caps[1].to_string());
    }
    for caps in for_re.captures_iter(code) {
        out.insert(caps[1].to_string());
    }
    out
}

/// Cheap guard against misclassifying a literal's base letter (`'hAB`'s
/// `h`) as an identifier — we only reject the exact `'<letter>` case.
fn is_preceded_by_tick(code: &str, needle: &str) -> bool {
    if needle.len() != 1 {
        return false;
    }
    code.match_indices(needle)
        .any(|(idx, _)| idx > 0 && code.as_bytes()[idx - 1] == b'\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn undeclared_signals_get_logic_declarations() {
        let body = "if (enable) begin\n  state_next = state_q + 1;\nend\n";
        let mut widths = HashMap::new();
        widths.insert("state_q".to_string(), 4);
        widths.insert("state_next".to_string(), 4);
        widths.insert("enable".to_string(), 1);

        let result = parse_verilog_snippet(body, &widths).unwrap();
        assert!(result.auto_declared.contains(&"state_q".to_string()));
        assert!(result.auto_declared.contains(&"state_next".to_string()));
        assert!(result.auto_declared.contains(&"enable".to_string()));
        assert!(result.declared_snippet.contains("logic [3:0] state_q;"));
        assert!(result.declared_snippet.contains("logic enable;"));
    }

    #[test]
    fn locally_declared_loop_variable_is_not_auto_declared() {
        let body = "for (int i = 0; i < 4; i = i + 1) begin\n  acc = acc + data[i];\nend\n";
        let widths = HashMap::new();
        let result = parse_verilog_snippet(body, &widths).unwrap();
        assert!(!result.auto_declared.contains(&"i".to_string()));
        assert!(result.auto_declared.contains(&"acc".to_string()));
        assert!(result.auto_declared.contains(&"data".to_string()));
    }

    #[test]
    fn keywords_are_never_auto_declared() {
        let body = "if (reset) begin\n  count <= 0;\nend else begin\n  count <= count + 1;\nend\n";
        let widths = HashMap::new();
        let result = parse_verilog_snippet(body, &widths).unwrap();
        assert!(!result.auto_declared.iter().any(|n| RESERVED.contains(&n.as_str())));
        assert!(result.auto_declared.contains(&"count".to_string()));
        assert!(result.auto_declared.contains(&"reset".to_string()));
    }
}
