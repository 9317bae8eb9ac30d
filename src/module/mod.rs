// SPDX-License-Identifier: Apache-2.0

//! Module catalog (§4.C): structurally identical to the bus catalog, plus
//! Verilog import and computed bus-interface attachment.

mod bus_attach;
mod verilog_import;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::Result;
use crate::library::Catalog;
use crate::selector::Selector;

pub use bus_attach::{AttachedBus, ModuleBusPort};
pub use verilog_import::ImportOutcome;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct ModulePort {
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct ModuleParameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct ModuleDef {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub port: IndexMap<String, ModulePort>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameter: IndexMap<String, ModuleParameter>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bus: IndexMap<String, AttachedBus>,
}

pub struct ModuleCatalog {
    catalog: Catalog<ModuleDef>,
}

impl ModuleCatalog {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        ModuleCatalog {
            catalog: Catalog::new(dir, ".soc_mod"),
        }
    }

    pub fn list(&self, selector: &Selector) -> Vec<String> {
        self.catalog.list(selector)
    }

    pub fn load(&mut self, selector: &Selector) -> Result<()> {
        self.catalog.load(selector)
    }

    pub fn save(&self, selector: &Selector) -> Result<()> {
        self.catalog.save(selector)
    }

    pub fn remove(&mut self, selector: &Selector) -> Result<()> {
        self.catalog.remove_library(selector)
    }

    pub fn is_module_exist(&self, name: &str) -> bool {
        self.catalog.exists(name)
    }

    pub fn get_module(&self, name: &str) -> Option<&ModuleDef> {
        self.catalog.get(name)
    }

    pub fn get_module_yaml(&self, name: &str) -> Option<Value> {
        self.catalog.get(name).and_then(|d| serde_yaml::to_value(d).ok())
    }

    pub fn get_module_library(&self, name: &str) -> Option<&str> {
        self.catalog.library_of(name)
    }

    pub fn list_module(&self, selector: &Selector) -> Vec<String> {
        self.catalog.list_entities(selector)
    }

    pub fn show_module(&self, selector: &Selector) -> Value {
        let mut map = serde_yaml::Mapping::new();
        for name in self.catalog.list_entities(selector) {
            if let Some(def) = self.catalog.get(&name) {
                if let Ok(v) = serde_yaml::to_value(def) {
                    map.insert(Value::String(name), v);
                }
            }
        }
        Value::Mapping(map)
    }

    pub fn remove_module(&mut self, selector: &Selector) -> Result<()> {
        self.catalog.remove_entities(selector)
    }

    /// Attaches a bus-interface stanza to `module` by computing a
    /// signal-to-port mapping (§4.C Bus attachment); stores the result
    /// under `bus.<interface_name>` without touching any module source.
    pub fn add_module_bus(
        &mut self,
        module: &str,
        bus: &crate::bus::BusDef,
        bus_name: &str,
        mode: &str,
        interface_name: &str,
    ) -> Result<()> {
        let def = self
            .catalog
            .get_mut(module)
            .ok_or_else(|| crate::error::Diagnostic::NotFound { kind: "module", name: module.to_string() })?;
        let attached = bus_attach::compute_attachment(def, bus, bus_name, mode, interface_name);
        def.bus.insert(interface_name.to_string(), attached);
        Ok(())
    }

    pub fn remove_module_bus(&mut self, module: &str, interface_regex: &Selector) -> Result<()> {
        let def = self
            .catalog
            .get_mut(module)
            .ok_or_else(|| crate::error::Diagnostic::NotFound { kind: "module", name: module.to_string() })?;
        let to_remove: Vec<String> = def
            .bus
            .keys()
            .filter(|name| interface_regex.matches(name))
            .cloned()
            .collect();
        for name in to_remove {
            def.bus.shift_remove(&name);
        }
        Ok(())
    }

    pub fn list_module_bus(&self, module: &str, interface_regex: &Selector) -> Vec<String> {
        match self.catalog.get(module) {
            Some(def) => def.bus.keys().filter(|n| interface_regex.matches(n)).cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn show_module_bus(&self, module: &str, interface_regex: &Selector) -> IndexMap<String, AttachedBus> {
        match self.catalog.get(module) {
            Some(def) => def
                .bus
                .iter()
                .filter(|(n, _)| interface_regex.matches(n))
                .map(|(n, b)| (n.clone(), b.clone()))
                .collect(),
            None => IndexMap::new(),
        }
    }

    /// Drives the Verilog front-end over a synthesized file list and
    /// merges extracted ports/parameters into the library.
    pub fn import_from_file_list(
        &mut self,
        project: &crate::project::ProjectContext,
        library: Option<&str>,
        name_regex: &Selector,
        file_list_path: Option<&std::path::Path>,
        files: &[std::path::PathBuf],
    ) -> Result<ImportOutcome> {
        verilog_import::import_from_file_list(
            &mut self.catalog,
            project,
            library,
            name_regex,
            file_list_path,
            files,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusDef, BusSignal, WidthSpec};

    fn sample_module() -> ModuleDef {
        let mut ports = IndexMap::new();
        for (name, dir, width) in [
            ("s_apb_paddr", "input", Some(32)),
            ("s_apb_pwdata", "input", Some(32)),
            ("s_apb_prdata", "output", Some(32)),
            ("clk_i", "input", Some(1)),
        ] {
            ports.insert(
                name.to_string(),
                ModulePort { direction: dir.to_string(), type_name: None, width },
            );
        }
        ModuleDef { port: ports, parameter: IndexMap::new(), bus: IndexMap::new() }
    }

    fn sample_bus() -> BusDef {
        let mut signals = IndexMap::new();
        for name in ["paddr", "pwdata", "prdata"] {
            signals.insert(
                name.to_string(),
                BusSignal { width: Some(WidthSpec::Bits(32)), ..Default::default() },
            );
        }
        BusDef(signals)
    }

    #[test]
    fn add_module_bus_maps_every_signal() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = ModuleCatalog::new(dir.path());
        catalog
            .catalog
            .insert_merged("regs", {
                let mut m = IndexMap::new();
                m.insert("regs".to_string(), sample_module());
                m
            })
            .unwrap();

        catalog.add_module_bus("regs", &sample_bus(), "apb", "slave", "s_apb").unwrap();
        let attached = catalog.get_module("regs").unwrap().bus.get("s_apb").unwrap();
        assert_eq!(attached.mapping.get("paddr").unwrap(), "s_apb_paddr");
        assert_eq!(attached.mapping.get("pwdata").unwrap(), "s_apb_pwdata");
        assert_eq!(attached.mapping.get("prdata").unwrap(), "s_apb_prdata");
        assert_eq!(attached.mode, "slave");
        assert_eq!(attached.bus, "apb");
    }

    #[test]
    fn remove_module_bus_by_regex() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = ModuleCatalog::new(dir.path());
        catalog
            .catalog
            .insert_merged("regs", {
                let mut m = IndexMap::new();
                m.insert("regs".to_string(), sample_module());
                m
            })
            .unwrap();
        catalog.add_module_bus("regs", &sample_bus(), "apb", "slave", "s_apb").unwrap();
        assert_eq!(catalog.list_module_bus("regs", &Selector::Any).len(), 1);
        catalog.remove_module_bus("regs", &Selector::pattern("s_apb").unwrap()).unwrap();
        assert!(catalog.list_module_bus("regs", &Selector::Any).is_empty());
    }
}
