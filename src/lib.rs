// SPDX-License-Identifier: Apache-2.0

//! SoC design automation core: bus and module catalogs, a Verilog
//! front-end driver, a netlist elaborator, a reset-controller primitive
//! generator, and the string-matching helper bus attachment is built on.

pub mod error;
pub use error::{Diagnostic, Result};

pub mod selector;
pub use selector::Selector;

mod yaml_merge;
pub use yaml_merge::merge_preserving_unknown_keys;

mod library;
pub use library::Catalog;

pub mod project;
pub use project::ProjectContext;

pub mod number;
pub use number::{Base, NumberLiteral};

pub mod bus;
pub use bus::{BusCatalog, BusDef, BusSignal, WidthSpec};

pub mod module;
pub use module::{AttachedBus, ModuleCatalog, ModuleDef, ModulePort};

pub mod verilog_front;
pub use verilog_front::{parse_verilog_snippet, SnippetResult, VerilogDriver};

pub mod netlist;
pub use netlist::{generate_verilog, Netlist, NetlistDef};

pub mod weaver;

pub mod reset;
pub use reset::{generate as generate_reset_controller, parse_reset_spec, ResetSpec};
