//! Multi-document hosting: routes operations to per-document sequences and
//! tracks which documents changed since the consumer last asked.
//!
//! This is the session/server role: it has no site of its own and performs
//! no echo suppression, every operation routed here is integrated on its
//! merits. Persistence is the consumer's business; the registry only says
//! which documents are worth snapshotting.

use crate::core::{DocumentId, Integration, Sequence};
use crate::sync::{Operation, Snapshot};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone)]
pub struct DocumentRegistry {
    documents: BTreeMap<DocumentId, Sequence>,
    dirty: BTreeSet<DocumentId>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sequence for `document`, created empty on first use.
    pub fn open(&mut self, document: impl Into<DocumentId>) -> &mut Sequence {
        self.documents.entry(document.into()).or_default()
    }

    /// Install an authoritative snapshot, replacing any sequence already
    /// held for that document.
    pub fn hydrate(&mut self, snapshot: Snapshot) {
        self.open(snapshot.document_id)
            .load_snapshot(snapshot.elements);
    }

    /// Route an operation to its document and integrate it. Documents are
    /// created on demand, so an insert can arrive before any explicit open.
    pub fn apply(&mut self, op: &Operation) -> Integration {
        let document = op.document_id().clone();
        let sequence = self.open(document.clone());
        let outcome = match op {
            Operation::Insert { character, .. } => sequence.insert(character.clone()),
            Operation::Delete { character, .. } => sequence.delete(&character.id),
        };
        if outcome.changed() {
            self.dirty.insert(document);
        }
        outcome
    }

    pub fn get(&self, document: &str) -> Option<&Sequence> {
        self.documents.get(document)
    }

    pub fn text(&self, document: &str) -> Option<String> {
        self.documents.get(document).map(Sequence::text)
    }

    /// Full element state for initial transfer to a joining participant.
    pub fn snapshot(&self, document: &str) -> Option<Snapshot> {
        self.documents.get(document).map(|sequence| Snapshot {
            document_id: document.to_string(),
            elements: sequence.iter_all().cloned().collect(),
        })
    }

    /// Documents whose state changed since the last call. What to do with
    /// them (snapshot, persist, broadcast) is up to the consumer.
    pub fn take_dirty(&mut self) -> Vec<DocumentId> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
