// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use socweave::parse_verilog_snippet;

/// §8 scenario 4: the widest indexed access of an identifier determines its
/// inferred declaration width, even when two different ranges are used.
#[test]
fn widest_indexed_range_wins() {
    let known = HashMap::new();
    let body = "out = data[7:0] + data[15:8];\n";
    let result = parse_verilog_snippet(body, &known).unwrap();

    assert!(result.declared_snippet.contains("logic [15:0] data;"));
    assert!(result.declared_snippet.contains("logic out;"));
    assert!(!result.declared_snippet.contains("logic [7:0] data;"));
}
