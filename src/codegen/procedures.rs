//! Compiled procedure bodies, keyed by their symbol-table entries.

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};

use crate::symtab::EntryId;

use super::code::Code;

/// Insertion order is preserved so output is reproducible: the program entry
/// comes first, nested procedures follow depth-first in declaration order.
/// The VM loader binds final code addresses from this table.
#[derive(Debug, Clone, Default)]
pub struct Procedures {
    procedures: IndexMap<EntryId, Code>,
}

impl Procedures {
    pub fn new() -> Procedures {
        Procedures::default()
    }

    /// Inserting an already present entry replaces its code but keeps its
    /// position.
    pub fn insert(&mut self, entry: EntryId, code: Code) {
        self.procedures.insert(entry, code);
    }

    pub fn get(&self, entry: EntryId) -> Option<&Code> {
        self.procedures.get(&entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Code)> {
        self.procedures.iter().map(|(entry, code)| (*entry, code))
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl Serialize for Procedures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.procedures.iter())
    }
}
