// SPDX-License-Identifier: Apache-2.0

//! Bus catalog (§4.B): YAML libraries of bus definitions, a CSV importer,
//! and regex-selected read/write access built on [`crate::library::Catalog`].

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Diagnostic, Result};
use crate::library::Catalog;
use crate::selector::Selector;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(untagged)]
pub enum WidthSpec {
    Bits(u32),
    Expr(String),
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct BusSignalMode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<WidthSpec>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct BusSignal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<WidthSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "protocol_type")]
    pub protocol_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<Box<BusSignalMode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave: Option<Box<BusSignalMode>>,
}

/// A bus definition: a named bundle of signals. Transparent so a library
/// file's top level is directly `bus-name -> {signal-name -> BusSignal}`.
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
#[serde(transparent)]
pub struct BusDef(pub IndexMap<String, BusSignal>);

pub struct BusCatalog {
    catalog: Catalog<BusDef>,
}

impl BusCatalog {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        BusCatalog {
            catalog: Catalog::new(dir, ".soc_bus"),
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

    pub fn is_bus_exist(&self, name: &str) -> bool {
        self.catalog.exists(name)
    }

    pub fn get_bus(&self, name: &str) -> Option<&BusDef> {
        self.catalog.get(name)
    }

    pub fn get_bus_yaml(&self, name: &str) -> Option<Value> {
        self.catalog.get(name).and_then(|d| serde_yaml::to_value(d).ok())
    }

    pub fn list_bus(&self, selector: &Selector) -> Vec<String> {
        self.catalog.list_entities(selector)
    }

    pub fn show_bus(&self, selector: &Selector) -> Value {
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

    pub fn remove_bus(&mut self, selector: &Selector) -> Result<()> {
        self.catalog.remove_entities(selector)
    }

    /// Reads a semicolon-separated CSV table and merges the resulting bus
    /// definition into the target library (defaulting the library name to
    /// the CSV basename, and the bus name to the library name).
    pub fn import_from_csv(
        &mut self,
        library: Option<&str>,
        bus_name: Option<&str>,
        csv_path: &Path,
    ) -> Result<()> {
        let default_library = csv_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("bus")
            .to_string();
        let library = library.map(|s| s.to_string()).unwrap_or(default_library);
        let bus_name = bus_name.map(|s| s.to_string()).unwrap_or_else(|| library.clone());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_path(csv_path)
            .map_err(|_| Diagnostic::MissingFile(csv_path.to_path_buf()))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Diagnostic::Other(e.to_string()))?
            .iter()
            .map(normalize_header)
            .collect();

        let mut signals: IndexMap<String, BusSignal> = IndexMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| Diagnostic::Other(e.to_string()))?;
            let row: HashMap<&str, &str> = headers
                .iter()
                .map(String::as_str)
                .zip(record.iter())
                .collect();
            let name = row.get("name").copied().unwrap_or("").trim();
            if name.is_empty() {
                continue;
            }
            let mode = row.get("mode").copied().unwrap_or("").trim().to_lowercase();
            let entry = signals.entry(name.to_string()).or_default();
            apply_csv_row(entry, &mode, &row);
        }

        let mut incoming = IndexMap::new();
        incoming.insert(bus_name, BusDef(signals));
        self.catalog.insert_merged(&library, incoming)
    }
}

fn normalize_header(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

fn apply_csv_row(entry: &mut BusSignal, mode: &str, row: &HashMap<&str, &str>) {
    let direction = row.get("direction").map(|s| normalize_direction(s));
    let width = row.get("width").and_then(|s| parse_width(s));

    match mode {
        "master" => {
            let slot = entry.master.get_or_insert_with(Box::default);
            slot.direction = direction.clone().or(slot.direction.clone());
            slot.width = width.clone().or(slot.width.clone());
        }
        "slave" => {
            let slot = entry.slave.get_or_insert_with(Box::default);
            slot.direction = direction.clone().or(slot.direction.clone());
            slot.width = width.clone().or(slot.width.clone());
        }
        _ => {}
    }

    if entry.direction.is_none() {
        entry.direction = direction;
    }
    if entry.width.is_none() {
        entry.width = width;
    }
    if let Some(v) = row.get("kind") {
        if !v.is_empty() {
            entry.kind = Some(v.to_string());
        }
    }
    if let Some(v) = row.get("presence") {
        if !v.is_empty() {
            entry.presence = Some(v.to_string());
        }
    }
    if let Some(v) = row.get("initiative") {
        if !v.is_empty() {
            entry.initiative = Some(v.to_string());
        }
    }
    if let Some(v) = row.get("qualifier") {
        if !v.is_empty() {
            entry.qualifier = Some(v.to_string());
        }
    }
    if let Some(v) = row.get("protocoltype") {
        if !v.is_empty() {
            entry.protocol_type = Some(v.to_string());
        }
    }
    if let Some(v) = row.get("description") {
        if !v.is_empty() {
            entry.description = Some(v.to_string());
        }
    }
}

fn normalize_direction(raw: &str) -> String {
    match raw.trim().to_lowercase().as_str() {
        "in" | "input" => "in".to_string(),
        "out" | "output" => "out".to_string(),
        "inout" => "inout".to_string(),
        other => other.to_string(),
    }
}

fn parse_width(raw: &str) -> Option<WidthSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(bits) = trimmed.parse::<u32>() {
        Some(WidthSpec::Bits(bits))
    } else {
        Some(WidthSpec::Expr(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn apb_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("apb.csv");
        fs::write(
            &csv_path,
            "Name;Mode;Direction;Width;Qualifier;Description\n\
             pclk;system;in;1;control;APB clock\n\
             paddr;master;out;32;address;APB address\n\
             prdata;slave;out;32;data;APB read data\n",
        )
        .unwrap();

        let mut catalog = BusCatalog::new(dir.path());
        catalog.import_from_csv(Some("apb_lib"), Some("apb"), &csv_path).unwrap();
        catalog.save(&Selector::Exact("apb_lib".into())).unwrap();

        let mut reloaded = BusCatalog::new(dir.path());
        reloaded.load(&Selector::pattern("apb_lib").unwrap()).unwrap();
        assert!(reloaded.is_bus_exist("apb"));

        let def = reloaded.get_bus("apb").unwrap();
        let pclk = def.0.get("pclk").unwrap();
        assert_eq!(pclk.direction.as_deref(), Some("in"));
        assert_eq!(pclk.width, Some(WidthSpec::Bits(1)));

        let prdata = def.0.get("prdata").unwrap();
        assert_eq!(prdata.direction.as_deref(), Some("out"));
        assert_eq!(prdata.width, Some(WidthSpec::Bits(32)));
    }

    #[test]
    fn remove_by_regex_keeps_survivors() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = BusCatalog::new(dir.path());
        let mut apb_signals = IndexMap::new();
        apb_signals.insert(
            "pclk".to_string(),
            BusSignal {
                direction: Some("in".to_string()),
                width: Some(WidthSpec::Bits(1)),
                ..Default::default()
            },
        );
        let mut axi_signals = IndexMap::new();
        axi_signals.insert(
            "aclk".to_string(),
            BusSignal {
                direction: Some("in".to_string()),
                width: Some(WidthSpec::Bits(1)),
                ..Default::default()
            },
        );
        let mut incoming = IndexMap::new();
        incoming.insert("multi_apb".to_string(), BusDef(apb_signals));
        incoming.insert("multi_axi".to_string(), BusDef(axi_signals));

        catalog.catalog.insert_merged("shared_lib", incoming).unwrap();
        catalog.save(&Selector::Exact("shared_lib".into())).unwrap();

        catalog.remove_bus(&Selector::pattern("multi_apb").unwrap()).unwrap();
        assert!(!catalog.is_bus_exist("multi_apb"));
        assert!(catalog.is_bus_exist("multi_axi"));
        assert!(dir.path().join("shared_lib.soc_bus").exists());
    }
}
