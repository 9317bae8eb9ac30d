// SPDX-License-Identifier: Apache-2.0

//! A generic catalog abstraction shared by the bus and module catalogs
//! (§4.B, §4.C of the design): both are "a set of libraries (files) on
//! disk, indexed by basename, each contributing named entities to an
//! in-memory store", differing only in the entity type and file
//! extension. Implementing `list`/`load`/`save`/`remove` once here keeps
//! the two catalogs from re-deriving the same index-consistency
//! invariant twice.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::Value;

use crate::error::{Diagnostic, Result};
use crate::selector::Selector;
use crate::yaml_merge::merge_preserving_unknown_keys;

pub struct Catalog<T> {
    dir: PathBuf,
    extension: &'static str,
    entities: IndexMap<String, T>,
    library_of: HashMap<String, String>,
    library_index: IndexMap<String, IndexSet<String>>,
}

impl<T> Catalog<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    pub fn new(dir: impl Into<PathBuf>, extension: &'static str) -> Self {
        Catalog {
            dir: dir.into(),
            extension,
            entities: IndexMap::new(),
            library_of: HashMap::new(),
            library_index: IndexMap::new(),
        }
    }

    pub fn library_path(&self, library: &str) -> PathBuf {
        self.dir.join(format!("{library}{}", self.extension))
    }

    /// Library basenames on disk (not necessarily loaded) matching `selector`.
    pub fn list(&self, selector: &Selector) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if let Some(base) = name.strip_suffix(self.extension) {
                        if selector.matches(base) {
                            names.push(base.to_string());
                        }
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Loads every on-disk library matching `selector` into memory.
    pub fn load(&mut self, selector: &Selector) -> Result<()> {
        for library in self.list(selector) {
            let path = self.library_path(&library);
            let text = fs::read_to_string(&path).map_err(|_| Diagnostic::MissingFile(path.clone()))?;
            let map: IndexMap<String, T> = serde_yaml::from_str(&text)
                .map_err(|source| Diagnostic::YamlParse { path: path.clone(), source })?;
            for (name, entity) in map {
                self.entities.insert(name.clone(), entity);
                self.library_of.insert(name.clone(), library.clone());
                self.library_index.entry(library.clone()).or_default().insert(name);
            }
        }
        Ok(())
    }

    /// Libraries currently represented in memory, matching `selector`.
    fn loaded_libraries(&self, selector: &Selector) -> Vec<String> {
        self.library_index
            .keys()
            .filter(|lib| selector.matches(lib))
            .cloned()
            .collect()
    }

    /// Fully rewrites each matching in-memory library back to disk.
    pub fn save(&self, selector: &Selector) -> Result<()> {
        for library in self.loaded_libraries(selector) {
            let names = self.library_index.get(&library).cloned().unwrap_or_default();
            let mut map = serde_yaml::Mapping::new();
            for name in &names {
                if let Some(entity) = self.entities.get(name) {
                    let value = serde_yaml::to_value(entity)
                        .map_err(|source| Diagnostic::YamlParse { path: self.library_path(&library), source })?;
                    map.insert(Value::String(name.clone()), value);
                }
            }
            let text = serde_yaml::to_string(&Value::Mapping(map))
                .map_err(|source| Diagnostic::YamlParse { path: self.library_path(&library), source })?;
            fs::write(self.library_path(&library), text)
                .map_err(|_| Diagnostic::MissingFile(self.library_path(&library)))?;
        }
        Ok(())
    }

    /// Deletes the on-disk file and evicts the library's entities from
    /// memory and from the index.
    pub fn remove_library(&mut self, selector: &Selector) -> Result<()> {
        for library in self.loaded_libraries(selector) {
            if let Some(names) = self.library_index.shift_remove(&library) {
                for name in names {
                    self.entities.shift_remove(&name);
                    self.library_of.remove(&name);
                }
            }
            let _ = fs::remove_file(self.library_path(&library));
        }
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entities.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.entities.get_mut(name)
    }

    pub fn library_of(&self, name: &str) -> Option<&str> {
        self.library_of.get(name).map(|s| s.as_str())
    }

    pub fn list_entities(&self, selector: &Selector) -> Vec<String> {
        let mut names: Vec<String> = self
            .entities
            .keys()
            .filter(|name| selector.matches(name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Evicts entities matching `selector` from memory and from the index.
    /// A library that still has surviving entities is resaved; a library
    /// that loses its last entity is deleted from disk.
    pub fn remove_entities(&mut self, selector: &Selector) -> Result<()> {
        let names = self.list_entities(selector);
        let mut touched: IndexSet<String> = IndexSet::new();
        for name in &names {
            if let Some(lib) = self.library_of.remove(name) {
                if let Some(set) = self.library_index.get_mut(&lib) {
                    set.shift_remove(name);
                }
                touched.insert(lib);
            }
            self.entities.shift_remove(name);
        }
        for lib in touched {
            let remaining = self.library_index.get(&lib).map(IndexSet::len).unwrap_or(0);
            if remaining == 0 {
                self.library_index.shift_remove(&lib);
                let _ = fs::remove_file(self.library_path(&lib));
            } else {
                self.save(&Selector::Exact(lib))?;
            }
        }
        Ok(())
    }

    /// Inserts or merges entities into `library`, using
    /// [`merge_preserving_unknown_keys`] when an entity with the same name
    /// already exists. Used by the CSV and Verilog importers so re-running
    /// an import never clobbers hand-authored fields the importer doesn't
    /// know about.
    pub fn insert_merged(&mut self, library: &str, incoming: IndexMap<String, T>) -> Result<()> {
        for (name, new_entity) in incoming {
            let merged = if let Some(existing) = self.entities.get(&name) {
                let old_value = serde_yaml::to_value(existing)
                    .map_err(|source| Diagnostic::YamlParse { path: self.library_path(library), source })?;
                let new_value = serde_yaml::to_value(&new_entity)
                    .map_err(|source| Diagnostic::YamlParse { path: self.library_path(library), source })?;
                let merged_value = merge_preserving_unknown_keys(&old_value, &new_value);
                serde_yaml::from_value(merged_value)
                    .map_err(|source| Diagnostic::YamlParse { path: self.library_path(library), source })?
            } else {
                new_entity
            };
            self.entities.insert(name.clone(), merged);
            self.library_of.insert(name.clone(), library.to_string());
            self.library_index.entry(library.to_string()).or_default().insert(name);
        }
        Ok(())
    }

    pub fn entity_names_in_library(&self, library: &str) -> Vec<String> {
        self.library_index
            .get(library)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
    struct Widget {
        width: u32,
    }

    #[test]
    fn load_save_remove_keep_index_consistent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("lib_a.soc_test"),
            "foo:\n  width: 8\nbar:\n  width: 16\n",
        )
        .unwrap();

        let mut cat: Catalog<Widget> = Catalog::new(dir.path(), ".soc_test");
        cat.load(&Selector::Any).unwrap();
        assert!(cat.exists("foo"));
        assert!(cat.exists("bar"));
        assert_eq!(cat.library_of("foo"), Some("lib_a"));

        cat.remove_entities(&Selector::pattern("foo").unwrap()).unwrap();
        assert!(!cat.exists("foo"));
        assert!(cat.exists("bar"));
        // library file should still exist since bar survives
        assert!(dir.path().join("lib_a.soc_test").exists());

        cat.remove_entities(&Selector::pattern("bar").unwrap()).unwrap();
        assert!(!dir.path().join("lib_a.soc_test").exists());
    }

    #[test]
    fn insert_merged_preserves_unknown_fields_via_null() {
        let dir = tempfile::tempdir().unwrap();
        let mut cat: Catalog<serde_yaml::Value> = Catalog::new(dir.path(), ".soc_test");
        let mut incoming = IndexMap::new();
        incoming.insert(
            "apb".to_string(),
            serde_yaml::from_str("{width: 8, note: hand-authored}").unwrap(),
        );
        cat.insert_merged("lib", incoming).unwrap();

        let mut update = IndexMap::new();
        update.insert("apb".to_string(), serde_yaml::from_str("{width: 32}").unwrap());
        cat.insert_merged("lib", update).unwrap();

        let merged = cat.get("apb").unwrap();
        assert_eq!(merged.get("width").unwrap(), &serde_yaml::Value::from(32));
        assert_eq!(merged.get("note").unwrap(), &serde_yaml::Value::from("hand-authored"));
    }
}
