// SPDX-License-Identifier: Apache-2.0

//! Computed bus-to-port attachment (§4.C step 2-4, using the clustering and
//! matching primitives in [`crate::weaver`]).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::bus::BusDef;
use crate::module::ModuleDef;
use crate::weaver;

/// A single mapped port within an attached bus interface.
pub type ModuleBusPort = String;

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct AttachedBus {
    pub bus: String,
    pub mode: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, ModuleBusPort>,
}

/// Clusters the module's ports, hint-matches `interface_name` against the
/// cluster markers, then runs the Hungarian-optimal LCS match between the
/// bus's signal names and the chosen cluster (falling back to the full
/// port list when the cluster is empty).
pub fn compute_attachment(
    module: &ModuleDef,
    bus: &BusDef,
    bus_name: &str,
    mode: &str,
    interface_name: &str,
) -> AttachedBus {
    let port_names: Vec<String> = module.port.keys().cloned().collect();
    let signal_names: Vec<String> = bus.0.keys().cloned().collect();

    let clusters = weaver::cluster_strings(&port_names);
    let markers: Vec<&String> = clusters.keys().collect();
    let best_marker = weaver::find_best_group_marker_for_hint(interface_name, markers.into_iter());

    let candidate_ports: Vec<String> = match best_marker.and_then(|m| clusters.get(m)) {
        Some(members) if !members.is_empty() => members.clone(),
        _ => port_names.clone(),
    };

    let marker_prefix = best_marker.map(|s| s.as_str()).unwrap_or("");
    let mapping = weaver::find_optimal_matching(&candidate_ports, &signal_names, marker_prefix);

    AttachedBus {
        bus: bus_name.to_string(),
        mode: mode.to_string(),
        mapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusSignal;
    use crate::module::ModulePort;

    #[test]
    fn falls_back_to_full_port_list_when_no_cluster_matches() {
        let mut ports = IndexMap::new();
        ports.insert(
            "paddr".to_string(),
            ModulePort { direction: "input".to_string(), type_name: None, width: Some(32) },
        );
        let module = ModuleDef { port: ports, parameter: IndexMap::new(), bus: IndexMap::new() };

        let mut signals = IndexMap::new();
        signals.insert("paddr".to_string(), BusSignal::default());
        let bus = BusDef(signals);

        let attached = compute_attachment(&module, &bus, "apb", "master", "m_apb");
        assert_eq!(attached.mapping.get("paddr"), Some(&"paddr".to_string()));
    }
}
