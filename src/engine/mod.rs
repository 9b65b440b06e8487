//! Per-participant engine: one document sequence, the local Lamport clock,
//! and the site identity. Local edits mutate the sequence and produce wire
//! operations; remote operations are integrated and reported as changed or
//! not so the consumer knows when to re-render.
//!
//! The engine is single-owner: one logical actor drives all calls for a
//! given document, so no internal locking is needed and every operation is
//! synchronous and bounded by the sequence length.

use crate::core::{DocumentId, Element, ElementId, Integration, Sequence, SiteId};
use crate::sync::Operation;

/// What [`Engine::apply_remote`] did with an inbound operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The visible text changed; consumers should re-render.
    Changed,
    /// Echo of a local edit, duplicate delivery, or already-tombstoned
    /// target; nothing moved.
    Unchanged,
    /// Parked until its causal dependency arrives.
    Buffered,
    /// Discarded because the pending buffer is full; redelivery will retry.
    Dropped,
}

impl ApplyOutcome {
    pub fn changed(self) -> bool {
        matches!(self, ApplyOutcome::Changed)
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    site: SiteId,
    document: DocumentId,
    clock: u64,
    sequence: Sequence,
}

impl Engine {
    /// New empty engine for one document. The logical clock starts at zero
    /// and only advances through local generation and remote observation.
    pub fn new(site: SiteId, document: impl Into<DocumentId>) -> Self {
        Self {
            site,
            document: document.into(),
            clock: 0,
            sequence: Sequence::new(),
        }
    }

    pub fn with_pending_limit(site: SiteId, document: impl Into<DocumentId>, limit: usize) -> Self {
        Self {
            site,
            document: document.into(),
            clock: 0,
            sequence: Sequence::with_pending_limit(limit),
        }
    }

    pub fn site(&self) -> &SiteId {
        &self.site
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Local user typed `value` after visible position `after` (`None`
    /// inserts at the start; an index past the end also resolves to the
    /// start, matching the editor protocol). Mutates local state and
    /// returns the operation to broadcast.
    pub fn generate_insert(&mut self, value: char, after: Option<usize>) -> Operation {
        self.clock += 1;

        let parent_id = after
            .and_then(|idx| self.sequence.iter_visible().nth(idx))
            .map(|elem| elem.id.clone());

        let element = Element {
            id: ElementId::new(self.site.clone(), self.clock),
            value,
            parent_id,
            clock: self.clock,
            site_id: self.site.clone(),
            tombstone: false,
        };

        // A fresh id with a parent taken from the live projection always
        // integrates.
        let applied = self.sequence.insert(element.clone());
        debug_assert_eq!(applied, Integration::Applied);

        Operation::Insert {
            character: element,
            document_id: self.document.clone(),
            site_id: self.site.clone(),
            clock: self.clock,
        }
    }

    /// Local user deleted the character at visible position `index`.
    /// Returns `None`, with no mutation, when the index is outside the
    /// visible range. The operation is attributed to this site: deletion
    /// attribution tracks who removed the character, not who wrote it.
    pub fn generate_delete(&mut self, index: usize) -> Option<Operation> {
        let target = self.sequence.iter_visible().nth(index)?.clone();
        self.sequence.delete(&target.id);

        let mut character = target;
        character.tombstone = true;
        Some(Operation::Delete {
            character,
            document_id: self.document.clone(),
            site_id: self.site.clone(),
            clock: self.clock,
        })
    }

    /// Integrate an operation produced by another replica. Echoes of this
    /// site's own operations are discarded before the clock is touched;
    /// otherwise the clock synchronizes to `max(local, observed)` so every
    /// id generated from here on is causally after everything observed.
    pub fn apply_remote(&mut self, op: &Operation) -> ApplyOutcome {
        if op.site_id() == &self.site {
            return ApplyOutcome::Unchanged;
        }

        self.clock = self.clock.max(op.clock());

        let outcome = match op {
            Operation::Insert { character, .. } => self.sequence.insert(character.clone()),
            Operation::Delete { character, .. } => self.sequence.delete(&character.id),
        };

        match outcome {
            Integration::Applied => ApplyOutcome::Changed,
            Integration::Duplicate => ApplyOutcome::Unchanged,
            Integration::Deferred => ApplyOutcome::Buffered,
            Integration::Dropped => ApplyOutcome::Dropped,
        }
    }

    /// Replace local state with an authoritative snapshot. The snapshot is
    /// already globally ordered, so its elements are not re-integrated; the
    /// clock advances past everything the snapshot contains.
    pub fn load_from_state(&mut self, elements: Vec<Element>) {
        self.sequence.load_snapshot(elements);
        self.clock = self.clock.max(self.sequence.max_clock());
    }

    /// The text a user sees: values of non-tombstoned elements in order.
    pub fn text(&self) -> String {
        self.sequence.text()
    }

    /// Ordered non-tombstoned elements, for translating UI-visible indices
    /// into element identities.
    pub fn visible_elements(&self) -> Vec<&Element> {
        self.sequence.iter_visible().collect()
    }
}
