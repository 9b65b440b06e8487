//! A naive, simple oracle implementation for differential testing.
//!
//! State is bare maps and the visible text is derived from scratch on every
//! query, so delivery order and duplicate delivery trivially cannot affect
//! the result. The real engine must agree with this on every history.

use seq_crdt::{Element, ElementId, Operation};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NaiveReplica {
    elements: BTreeMap<ElementId, Element>,
    deleted: BTreeSet<ElementId>,
}

impl NaiveReplica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Insert { character, .. } => {
                self.elements
                    .entry(character.id.clone())
                    .or_insert_with(|| character.clone());
            }
            Operation::Delete { character, .. } => {
                self.deleted.insert(character.id.clone());
            }
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Derive the text from scratch: group elements under their parents,
    /// sort siblings higher-clock-first (greater site on ties), walk the
    /// tree depth-first.
    pub fn text(&self) -> String {
        let mut children: BTreeMap<Option<ElementId>, Vec<&Element>> = BTreeMap::new();
        for elem in self.elements.values() {
            children
                .entry(elem.parent_id.clone())
                .or_default()
                .push(elem);
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| {
                b.clock
                    .cmp(&a.clock)
                    .then_with(|| b.site_id.cmp(&a.site_id))
            });
        }

        // Iterative walk: causal chains make the tree as deep as the
        // document is long.
        let mut out = String::new();
        let mut stack: Vec<&Element> = Vec::new();
        if let Some(roots) = children.get(&None) {
            stack.extend(roots.iter().rev().copied());
        }
        while let Some(elem) = stack.pop() {
            if !elem.tombstone && !self.deleted.contains(&elem.id) {
                out.push(elem.value);
            }
            if let Some(kids) = children.get(&Some(elem.id.clone())) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        out
    }
}
