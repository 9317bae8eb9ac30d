// SPDX-License-Identifier: Apache-2.0

//! Bus-section expansion (§4.E "processNetlist: bus expansion"): turns each
//! `bus:` alias into synthetic `net:` entries, then erases `bus:` entirely.

use indexmap::IndexMap;

use crate::bus::BusCatalog;
use crate::module::ModuleCatalog;
use crate::netlist::{NetConnection, NetDef, NetlistDef};

struct ValidatedConnection {
    instance: String,
    interface_name: String,
    bus_type: String,
}

/// Resolves `name` against `map`'s keys using the pad_-prefix fallback
/// heuristic (§9 open question): exact match first, then the name with a
/// leading `pad_` stripped, then the name with `pad_` prepended. First match
/// wins.
fn resolve_with_pad_fallback<'a, V>(map: &'a IndexMap<String, V>, name: &str) -> Option<&'a str> {
    if map.contains_key(name) {
        return Some(map.keys().find(|k| k.as_str() == name).unwrap().as_str());
    }
    if let Some(stripped) = name.strip_prefix("pad_") {
        if map.contains_key(stripped) {
            return Some(map.keys().find(|k| k.as_str() == stripped).unwrap().as_str());
        }
    }
    let padded = format!("pad_{name}");
    if map.contains_key(&padded) {
        return map.keys().find(|k| *k == &padded).map(|k| k.as_str());
    }
    None
}

/// Expands every `bus:` alias into `<alias>_<signal>` nets and deletes the
/// `bus:` section. Connections whose module or bus-interface can't be
/// resolved, or whose bus type disagrees with the alias's first validated
/// connection, are logged and skipped rather than failing the whole netlist.
pub fn expand_bus_section(def: &mut NetlistDef, modules: &ModuleCatalog, buses: &BusCatalog) -> crate::error::Result<()> {
    let aliases: Vec<String> = def.bus.keys().cloned().collect();

    for alias in aliases {
        let connections = def.bus.get(&alias).cloned().unwrap_or_default();
        let mut validated: Vec<ValidatedConnection> = Vec::new();
        let mut bus_type: Option<String> = None;

        for (instance_name, conn) in &connections {
            let Some(instance) = def.instance.get(instance_name) else {
                log::warn!("bus `{alias}`: instance `{instance_name}` not found, skipping connection");
                continue;
            };
            let Some(module) = modules.get_module(&instance.module) else {
                log::warn!(
                    "bus `{alias}`: module `{}` for instance `{instance_name}` not found, skipping connection",
                    instance.module
                );
                continue;
            };
            let Some(interface_name) = resolve_with_pad_fallback(&module.bus, &conn.port) else {
                log::warn!(
                    "bus `{alias}`: instance `{instance_name}` has no bus interface `{}` (module `{}`), skipping",
                    conn.port, instance.module
                );
                continue;
            };
            let attached = module.bus.get(interface_name).unwrap();

            match &bus_type {
                None => bus_type = Some(attached.bus.clone()),
                Some(expected) if expected != &attached.bus => {
                    log::warn!(
                        "bus `{alias}`: instance `{instance_name}` declares bus type `{}`, expected `{expected}`; skipping connection",
                        attached.bus
                    );
                    continue;
                }
                _ => {}
            }

            validated.push(ValidatedConnection {
                instance: instance_name.clone(),
                interface_name: interface_name.to_string(),
                bus_type: attached.bus.clone(),
            });
        }

        if let Some(bus_type) = validated.first().map(|v| v.bus_type.clone()) {
            if let Some(bus_def) = buses.get_bus(&bus_type) {
                for signal_name in bus_def.0.keys() {
                    let net_name = format!("{alias}_{signal_name}");
                    let mut net = NetDef::default();
                    for conn in &validated {
                        let module_name = &def.instance.get(&conn.instance).unwrap().module;
                        let Some(module) = modules.get_module(module_name) else { continue };
                        let Some(attached) = module.bus.get(&conn.interface_name) else { continue };
                        if let Some(mapped_port) = attached.mapping.get(signal_name) {
                            net.connection.insert(
                                conn.instance.clone(),
                                NetConnection { port: mapped_port.clone(), bits: None, invert: None },
                            );
                        }
                    }
                    if !net.connection.is_empty() {
                        def.net.insert(net_name, net);
                    }
                }
            } else {
                log::warn!("bus `{alias}`: bus type `{bus_type}` not found in catalog");
            }
        }
    }

    def.bus.clear();
    Ok(())
}
