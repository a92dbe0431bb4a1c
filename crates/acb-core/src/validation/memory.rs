//! In-memory [`ReferenceLookup`] for deterministic validation.

use std::collections::{HashMap, HashSet};

use crate::collection::{Collection, VersionFamily};
use crate::error::AcbResult;
use crate::id::DocId;
use crate::validation::{ReferenceLookup, VersionLink};

/// A fixed set of known records, mutated explicitly between checks.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLookup {
    records: HashMap<Collection, HashSet<DocId>>,
    links: HashMap<(VersionFamily, DocId), VersionLink>,
}

impl InMemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: Collection, id: DocId) {
        self.records.entry(collection).or_default().insert(id);
    }

    /// Register a record under a freshly generated id.
    pub fn insert_new(&mut self, collection: Collection) -> DocId {
        let id = DocId::generate();
        self.insert(collection, id.clone());
        id
    }

    /// Register a version record together with its chain pointers.
    pub fn insert_version(&mut self, family: VersionFamily, id: DocId, link: VersionLink) {
        self.insert(family.versions(), id.clone());
        self.links.insert((family, id), link);
    }

    /// Returns whether the record was present.
    pub fn remove(&mut self, collection: Collection, id: &DocId) -> bool {
        for family in [VersionFamily::Templates, VersionFamily::Bulletins] {
            if family.versions() == collection {
                self.links.remove(&(family, id.clone()));
            }
        }
        self.records
            .get_mut(&collection)
            .is_some_and(|ids| ids.remove(id))
    }
}

impl ReferenceLookup for InMemoryLookup {
    async fn exists(&self, collection: Collection, id: &DocId) -> AcbResult<bool> {
        Ok(self
            .records
            .get(&collection)
            .is_some_and(|ids| ids.contains(id)))
    }

    async fn version_link(
        &self,
        family: VersionFamily,
        id: &DocId,
    ) -> AcbResult<Option<VersionLink>> {
        Ok(self.links.get(&(family, id.clone())).cloned())
    }
}
