// SPDX-License-Identifier: Apache-2.0

//! Netlist elaborator (§4.E): `load -> process_netlist -> generate_verilog`.

mod bus_expand;
mod check;
mod emit;

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bus::BusCatalog;
use crate::error::{Diagnostic, Result};
use crate::module::ModuleCatalog;

pub use check::{Direction, NetSummary};
pub use emit::generate_verilog;

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct TopPort {
    pub direction: String,
    #[serde(rename = "type", default)]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct TopParameter {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct InstancePortSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tieoff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct InstanceDef {
    pub module: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameter: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub port: IndexMap<String, InstancePortSpec>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct NetConnection {
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct NetDef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub connection: IndexMap<String, NetConnection>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct BusConnection {
    pub port: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct BehavioralBlock {
    #[serde(default)]
    pub clk: Option<String>,
    #[serde(default)]
    pub rst: Option<String>,
    /// Free-form Verilog expression text (`if/else`, `case`, state
    /// transitions) fed through the snippet parser before emission.
    pub body: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct NetlistDef {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub port: IndexMap<String, TopPort>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameter: IndexMap<String, TopParameter>,
    #[serde(default)]
    pub instance: IndexMap<String, InstanceDef>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub net: IndexMap<String, NetDef>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub bus: IndexMap<String, IndexMap<String, BusConnection>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub comb: IndexMap<String, BehavioralBlock>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub seq: IndexMap<String, BehavioralBlock>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fsm: IndexMap<String, BehavioralBlock>,
}

pub struct Netlist {
    pub name: String,
    pub def: NetlistDef,
}

impl Netlist {
    /// Reads a YAML file and validates that `instance:` is a non-empty map
    /// and `net:`/`bus:`, if present, are maps. Nothing else is enforced
    /// at load time.
    pub fn load(name: &str, path: &Path) -> Result<Netlist> {
        let text = fs::read_to_string(path).map_err(|_| Diagnostic::MissingFile(path.to_path_buf()))?;
        let def: NetlistDef =
            serde_yaml::from_str(&text).map_err(|source| Diagnostic::YamlParse { path: path.to_path_buf(), source })?;
        if def.instance.is_empty() {
            return Err(Diagnostic::Other(format!("netlist `{name}` has no instances")));
        }
        Ok(Netlist { name: name.to_string(), def })
    }

    /// Expands `bus:` into synthetic `net:` entries and erases the `bus:`
    /// section, then runs the width/direction consistency checks. Returns
    /// the set of nets with their summary and any width-mismatch text, for
    /// the generator to render as TODO comments.
    pub fn process_netlist(&mut self, modules: &ModuleCatalog, buses: &BusCatalog) -> Result<Vec<emit::NetReport>> {
        bus_expand::expand_bus_section(&mut self.def, modules, buses)?;
        Ok(emit::build_net_reports(&self.def, modules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_rejects_empty_instance_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.soc_net");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "instance: {{}}").unwrap();
        assert!(Netlist::load("empty", &path).is_err());
    }

    #[test]
    fn load_accepts_minimal_instance_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.soc_net");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "instance:\n  u0:\n    module: regs\n").unwrap();
        let netlist = Netlist::load("minimal", &path).unwrap();
        assert_eq!(netlist.def.instance.len(), 1);
    }
}
