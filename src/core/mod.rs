//! Core sequence CRDT: identifiers, elements, and the integration algorithm.
//!
//! A document is an ordered sequence of uniquely identified single-character
//! elements. Deletion tombstones an element in place rather than removing it,
//! so later-arriving operations can still resolve parent/child relationships
//! against it. The sequence order is canonical: a depth-first walk of the
//! parent tree with concurrent siblings sorted by `(clock, site)`, which
//! makes the order a pure function of the element set and therefore
//! identical on every replica that holds the same elements.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

pub type DocumentId = String;

/// Fresh random document identifier.
pub fn new_document_id() -> DocumentId {
    uuid::Uuid::new_v4().to_string()
}

/// Default cap on operations parked while their causal dependency is in
/// flight. Beyond this, out-of-order operations are dropped and must be
/// redelivered by the transport.
pub const DEFAULT_PENDING_LIMIT: usize = 100_000;

/// Identifier of the replica (browser session, server process) that
/// originates operations. Lexicographic order is the final tie-breaker for
/// concurrent inserts, so it must compare identically everywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random site identity, one per editing session.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally unique element identifier: the originating site plus that site's
/// sequence number. The wire form is the joined string `"<site>-<seq>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId {
    pub site: SiteId,
    pub seq: u64,
}

impl ElementId {
    pub fn new(site: SiteId, seq: u64) -> Self {
        Self { site, seq }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.site, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseElementIdError {
    #[error("missing `-` separator in element id")]
    MissingSeparator,
    #[error("empty site identifier in element id")]
    EmptySite,
    #[error("invalid sequence number `{0}` in element id")]
    InvalidSeq(String),
}

impl FromStr for ElementId {
    type Err = ParseElementIdError;

    // Site identifiers may themselves contain `-` (uuids do), so the
    // sequence number is whatever follows the last separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (site, seq) = s
            .rsplit_once('-')
            .ok_or(ParseElementIdError::MissingSeparator)?;
        if site.is_empty() {
            return Err(ParseElementIdError::EmptySite);
        }
        let seq = seq
            .parse::<u64>()
            .map_err(|_| ParseElementIdError::InvalidSeq(seq.to_string()))?;
        Ok(Self {
            site: SiteId::new(site),
            seq,
        })
    }
}

impl Serialize for ElementId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One unit of sequence content: a single character plus the metadata the
/// integration algorithm needs.
///
/// `parent_id: None` marks an insert at the start of the document. The
/// absence is explicit on the wire (`"parentId": null`) and is never
/// conflated with an empty identifier. `tombstone` is monotonic: it flips
/// false to true exactly once and is never reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub value: char,
    pub parent_id: Option<ElementId>,
    pub clock: u64,
    pub site_id: SiteId,
    pub tombstone: bool,
}

impl Element {
    pub fn is_visible(&self) -> bool {
        !self.tombstone
    }
}

/// What a [`Sequence`] did with one operation. No variant is an error:
/// missing causal dependencies are an expected effect of network reordering,
/// and the sequence is never left partially mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    /// The element was spliced in, or its tombstone newly set.
    Applied,
    /// Already known; idempotent no-op.
    Duplicate,
    /// Causal dependency not yet arrived; parked for replay.
    Deferred,
    /// Pending buffer at capacity; discarded, the transport's at-least-once
    /// redelivery will retry it.
    Dropped,
}

impl Integration {
    /// True when the visible projection changed.
    pub fn changed(self) -> bool {
        matches!(self, Integration::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Insert(Element),
    Delete(ElementId),
}

/// Ordered element sequence with tombstones, an id index, and buffers for
/// operations that arrived before their causal dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    elements: Vec<Element>,
    index: BTreeMap<ElementId, usize>,
    pending_inserts: BTreeMap<ElementId, Vec<Element>>,
    pending_deletes: BTreeSet<ElementId>,
    pending_count: usize,
    pending_limit: usize,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self::with_pending_limit(DEFAULT_PENDING_LIMIT)
    }

    pub fn with_pending_limit(limit: usize) -> Self {
        Self {
            elements: Vec::new(),
            index: BTreeMap::new(),
            pending_inserts: BTreeMap::new(),
            pending_deletes: BTreeSet::new(),
            pending_count: 0,
            pending_limit: limit,
        }
    }

    /// Build a sequence from an already globally ordered snapshot. The
    /// elements are taken as-is; replaying them through per-element
    /// integration would be redundant, the snapshot already reflects
    /// resolved conflicts.
    pub fn from_snapshot(elements: Vec<Element>) -> Self {
        let mut seq = Self::new();
        seq.load_snapshot(elements);
        seq
    }

    /// Replace the whole sequence with a snapshot, keeping the configured
    /// pending limit. Parked operations are discarded with the old state.
    pub fn load_snapshot(&mut self, elements: Vec<Element>) {
        self.elements = elements;
        self.pending_inserts.clear();
        self.pending_deletes.clear();
        self.pending_count = 0;
        self.rebuild_index();
    }

    /// Integrate an insert. Duplicate ids are a no-op; an unknown parent
    /// parks the element until that parent arrives.
    pub fn insert(&mut self, element: Element) -> Integration {
        if self.index.contains_key(&element.id) {
            return Integration::Duplicate;
        }
        if let Some(parent) = element.parent_id.clone()
            && !self.index.contains_key(&parent)
        {
            return self.park_insert(parent, element);
        }

        let id = element.id.clone();
        self.elements.push(element);
        self.rebuild_order();
        self.replay_pending(id);
        Integration::Applied
    }

    /// Tombstone the element with the given id. An unknown target parks the
    /// delete until the target's insert arrives.
    pub fn delete(&mut self, target: &ElementId) -> Integration {
        let Some(idx) = self.index.get(target).copied() else {
            return self.park_delete(target);
        };
        let Some(elem) = self.elements.get_mut(idx) else {
            return Integration::Duplicate;
        };
        if elem.tombstone {
            return Integration::Duplicate;
        }
        elem.tombstone = true;
        Integration::Applied
    }

    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.index.get(id).and_then(|&idx| self.elements.get(idx))
    }

    /// The visible projection: non-tombstoned elements in sequence order.
    pub fn iter_visible(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|elem| elem.is_visible())
    }

    /// Every element, tombstones included.
    pub fn iter_all(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn text(&self) -> String {
        self.iter_visible().map(|elem| elem.value).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.iter_visible().count()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element_ids(&self) -> Vec<ElementId> {
        self.elements.iter().map(|elem| elem.id.clone()).collect()
    }

    /// Number of operations currently parked for missing dependencies.
    pub fn pending_len(&self) -> usize {
        self.pending_count
    }

    /// Highest logical clock observable in the sequence. Considers both the
    /// element clocks and the per-site sequence numbers so a hydrating site
    /// can never reuse one of its own ids.
    pub fn max_clock(&self) -> u64 {
        self.elements
            .iter()
            .map(|elem| elem.clock.max(elem.id.seq))
            .max()
            .unwrap_or(0)
    }

    fn park_insert(&mut self, parent: ElementId, element: Element) -> Integration {
        // At-least-once redelivery can re-park the same insert while its
        // parent is still in flight; duplicates must not consume budget.
        if self
            .pending_inserts
            .get(&parent)
            .is_some_and(|parked| parked.iter().any(|p| p.id == element.id))
        {
            return Integration::Deferred;
        }
        if self.pending_count >= self.pending_limit {
            tracing::warn!(id = %element.id, %parent, "pending buffer full, dropping insert");
            return Integration::Dropped;
        }
        tracing::debug!(id = %element.id, %parent, "parking insert until parent arrives");
        self.pending_inserts.entry(parent).or_default().push(element);
        self.pending_count += 1;
        Integration::Deferred
    }

    fn park_delete(&mut self, target: &ElementId) -> Integration {
        if self.pending_deletes.contains(target) {
            return Integration::Deferred;
        }
        if self.pending_count >= self.pending_limit {
            tracing::warn!(%target, "pending buffer full, dropping delete");
            return Integration::Dropped;
        }
        tracing::debug!(%target, "parking delete until target arrives");
        self.pending_deletes.insert(target.clone());
        self.pending_count += 1;
        Integration::Deferred
    }

    /// Drain operations that were waiting on `root`, transitively: a parked
    /// insert that lands can itself unblock further parked operations. The
    /// canonical order is re-derived once at the end of the cascade.
    fn replay_pending(&mut self, root: ElementId) {
        let mut queue = VecDeque::new();
        self.take_pending(&root, &mut queue);

        let mut inserted = false;
        while let Some(op) = queue.pop_front() {
            match op {
                Pending::Insert(element) => {
                    if self.index.contains_key(&element.id) {
                        continue;
                    }
                    let id = element.id.clone();
                    let idx = self.elements.len();
                    self.elements.push(element);
                    self.index.insert(id.clone(), idx);
                    inserted = true;
                    self.take_pending(&id, &mut queue);
                }
                Pending::Delete(target) => {
                    if let Some(&idx) = self.index.get(&target)
                        && let Some(elem) = self.elements.get_mut(idx)
                    {
                        elem.tombstone = true;
                    }
                }
            }
        }

        if inserted {
            self.rebuild_order();
        }
    }

    fn take_pending(&mut self, id: &ElementId, queue: &mut VecDeque<Pending>) {
        if let Some(ops) = self.pending_inserts.remove(id) {
            self.pending_count -= ops.len();
            queue.extend(ops.into_iter().map(Pending::Insert));
        }
        if self.pending_deletes.remove(id) {
            self.pending_count -= 1;
            queue.push_back(Pending::Delete(id.clone()));
        }
    }

    /// Re-derive the canonical order from element parentage: siblings under
    /// the same parent sort higher-clock-first, ties broken by the greater
    /// site identifier, and every subtree stays contiguous under its parent.
    fn rebuild_order(&mut self) {
        let mut element_map: BTreeMap<ElementId, Element> = BTreeMap::new();
        for elem in self.elements.drain(..) {
            element_map.insert(elem.id.clone(), elem);
        }

        let mut children: BTreeMap<Option<ElementId>, Vec<ElementId>> = BTreeMap::new();
        for elem in element_map.values() {
            children
                .entry(elem.parent_id.clone())
                .or_default()
                .push(elem.id.clone());
        }

        for ids in children.values_mut() {
            ids.sort_by(|a, b| {
                let elem_a = element_map
                    .get(a)
                    .expect("child id must exist in element map during rebuild");
                let elem_b = element_map
                    .get(b)
                    .expect("child id must exist in element map during rebuild");
                elem_b
                    .clock
                    .cmp(&elem_a.clock)
                    .then_with(|| elem_b.site_id.cmp(&elem_a.site_id))
            });
        }

        let mut ordered_ids = Vec::with_capacity(element_map.len());
        Self::walk_children(&children, &mut ordered_ids);

        self.elements = ordered_ids
            .into_iter()
            .filter_map(|id| element_map.remove(&id))
            .collect();
        self.rebuild_index();
    }

    // Iterative depth-first walk. Sequential typing parents each character
    // on the previous one, so tree depth can equal document length and the
    // walk must not recurse.
    fn walk_children(
        children: &BTreeMap<Option<ElementId>, Vec<ElementId>>,
        out: &mut Vec<ElementId>,
    ) {
        let mut stack: Vec<&ElementId> = Vec::new();
        if let Some(roots) = children.get(&None) {
            stack.extend(roots.iter().rev());
        }
        while let Some(id) = stack.pop() {
            out.push(id.clone());
            if let Some(kids) = children.get(&Some(id.clone())) {
                stack.extend(kids.iter().rev());
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (idx, elem) in self.elements.iter().enumerate() {
            self.index.insert(elem.id.clone(), idx);
        }
    }
}
