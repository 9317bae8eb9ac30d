// SPDX-License-Identifier: Apache-2.0

use socweave::generate_reset_controller;

/// §8 scenario 6: a single target with one sync link and a reason section
/// emits the exact port set the spec names, plus a `qsoc_rst_pipe` instance
/// for the sync stage.
#[test]
fn single_target_sync_link_with_reason_emits_expected_ports() {
    let dir = tempfile::tempdir().unwrap();

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

    let output = generate_reset_controller(&value, dir.path(), false).unwrap();

    assert_eq!(output.module_name, "rst_ctrl");
    assert!(output.verilog.contains("module rst_ctrl"));

    for port in ["clk_sys", "clk_32k", "por_rst_n", "reason_clear", "sys_rst_n", "reason_valid"] {
        assert!(output.verilog.contains(port), "missing port `{port}` in:\n{}", output.verilog);
    }
    assert!(output.verilog.contains("reason[0:0]") || output.verilog.contains("reason"));
    assert!(output.verilog.contains("qsoc_rst_pipe"));

    assert!(dir.path().join("reset_cell.v").exists());
    assert!(dir.path().join("rst_ctrl.typ").exists());
}
