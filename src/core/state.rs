//! MG-006: Tag state — persistent type → stable integer registry.
//!
//! File format: `{"Types": {"full/pkg.Type": 1, ...}}`, indented JSON.
//! IDs are unique and positive; new IDs are `max + 1` and never reused.

use super::types::TypeName;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(rename = "Types", default)]
    types: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    types: BTreeMap<TypeName, u32>,
    next_id: u64,
    is_new: bool,
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

impl State {
    /// An empty registry not backed by any file.
    pub fn new() -> Self {
        State {
            types: BTreeMap::new(),
            next_id: 1,
            is_new: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: StateFile =
            serde_json::from_str(json).map_err(|e| format!("invalid state: {}", e))?;
        let mut types = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut max = 0u32;
        for (name, id) in file.types {
            let tn = TypeName::parse(&name)?;
            let id = u32::try_from(id)
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| format!("invalid ID {} for {}", id, name))?;
            if !seen.insert(id) {
                return Err(format!("duplicate ID {}", id));
            }
            max = max.max(id);
            types.insert(tn, id);
        }
        Ok(State {
            types,
            next_id: u64::from(max) + 1,
            is_new: false,
        })
    }

    /// Load a state file. A missing file yields an empty, new registry.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(State::new());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        State::from_json(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn to_json(&self) -> Result<String, String> {
        let file = StateFile {
            types: self
                .types
                .iter()
                .map(|(tn, id)| (tn.to_string(), i64::from(*id)))
                .collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| format!("serialize error: {}", e))
    }

    /// Save atomically (write to temp, then rename).
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create dir {}: {}", parent.display(), e))?;
        }
        let json = self.to_json()?;
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = std::path::PathBuf::from(tmp_name);
        std::fs::write(&tmp_path, json)
            .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
        std::fs::rename(&tmp_path, path).map_err(|e| {
            format!("cannot rename {} → {}: {}", tmp_path.display(), path.display(), e)
        })?;
        Ok(())
    }

    /// Existing ID of `tn`, or the next free one.
    pub fn ensure_type(&mut self, tn: &TypeName) -> Result<u32, String> {
        if let Some(id) = self.types.get(tn) {
            return Ok(*id);
        }
        let id = u32::try_from(self.next_id)
            .map_err(|_| format!("ID space exhausted, cannot assign a tag to {}", tn))?;
        self.types.insert(tn.clone(), id);
        self.next_id += 1;
        Ok(id)
    }

    pub fn id(&self, tn: &TypeName) -> Option<u32> {
        self.types.get(tn).copied()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// True if no state file existed when loaded.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Entries ordered by ID.
    pub fn entries_by_id(&self) -> Vec<(&TypeName, u32)> {
        let mut entries: Vec<(&TypeName, u32)> = self.types.iter().map(|(t, i)| (t, *i)).collect();
        entries.sort_by_key(|(_, id)| *id);
        entries
    }
}
