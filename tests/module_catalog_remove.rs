// SPDX-License-Identifier: Apache-2.0

use socweave::module::{ModuleDef, ModulePort};
use socweave::{ModuleCatalog, Selector};

/// §8 scenario 2: removing modules by a regex selector leaves the rest of
/// a library intact.
#[test]
fn remove_module_by_regex_keeps_survivors() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = ModuleCatalog::new(dir.path());

    let mut yaml = indexmap::IndexMap::new();
    for name in ["u_cpu_core", "u_cpu_dbg", "u_mem_ctrl"] {
        let mut ports = indexmap::IndexMap::new();
        ports.insert("clk_i".to_string(), ModulePort { direction: "input".to_string(), type_name: None, width: Some(1) });
        yaml.insert(name.to_string(), ModuleDef { port: ports, parameter: indexmap::IndexMap::new(), bus: indexmap::IndexMap::new() });
    }
    std::fs::write(dir.path().join("soc.soc_mod"), serde_yaml::to_string(&yaml).unwrap()).unwrap();
    catalog.load(&Selector::Any).unwrap();

    assert_eq!(catalog.list_module(&Selector::Any).len(), 3);

    catalog.remove_module(&Selector::pattern("u_cpu_.*").unwrap()).unwrap();

    let remaining = catalog.list_module(&Selector::Any);
    assert_eq!(remaining, vec!["u_mem_ctrl".to_string()]);
    assert!(!catalog.is_module_exist("u_cpu_core"));
    assert!(!catalog.is_module_exist("u_cpu_dbg"));
    assert!(catalog.is_module_exist("u_mem_ctrl"));
}
