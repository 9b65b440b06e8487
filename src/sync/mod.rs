//! Wire-level operation and snapshot shapes plus inbound validation.
//!
//! The JSON format is the session protocol's: operations are tagged
//! `INSERT`/`DELETE` and carry the full element, the owning document, the
//! originating site, and that site's logical clock. A start-of-document
//! parent serializes as an explicit `null`, never as an empty string.

use crate::core::{DEFAULT_PENDING_LIMIT, DocumentId, Element, ElementId, SiteId};
use serde::{Deserialize, Serialize};

/// The unit exchanged with other replicas. Immutable once created.
///
/// A `Delete` carries a tombstoned copy of its target for wire completeness;
/// only the id is needed to integrate it. Its `site_id` is the deleting
/// site, which may differ from the element's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE", rename_all_fields = "camelCase")]
pub enum Operation {
    Insert {
        character: Element,
        document_id: DocumentId,
        site_id: SiteId,
        clock: u64,
    },
    Delete {
        character: Element,
        document_id: DocumentId,
        site_id: SiteId,
        clock: u64,
    },
}

impl Operation {
    pub fn character(&self) -> &Element {
        match self {
            Operation::Insert { character, .. } | Operation::Delete { character, .. } => character,
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        match self {
            Operation::Insert { document_id, .. } | Operation::Delete { document_id, .. } => {
                document_id
            }
        }
    }

    /// Site the operation is attributed to: the author for inserts, the
    /// deleter for deletes.
    pub fn site_id(&self) -> &SiteId {
        match self {
            Operation::Insert { site_id, .. } | Operation::Delete { site_id, .. } => site_id,
        }
    }

    pub fn clock(&self) -> u64 {
        match self {
            Operation::Insert { clock, .. } | Operation::Delete { clock, .. } => *clock,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Operation::Insert { .. })
    }
}

/// Full document state for initial transfer to a joining participant,
/// tombstones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub document_id: DocumentId,
    pub elements: Vec<Element>,
}

pub fn encode_operation(op: &Operation) -> Result<String, serde_json::Error> {
    serde_json::to_string(op)
}

pub fn decode_operation(raw: &str) -> Result<Operation, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Resource limits applied to inbound traffic before it reaches a sequence.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub max_ops_per_batch: usize,
    pub max_pending: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_ops_per_batch: 10_000,
            max_pending: DEFAULT_PENDING_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed element {id}: {reason}")]
    MalformedElement { id: ElementId, reason: &'static str },
    #[error("operation for document `{actual}` routed to `{expected}`")]
    DocumentMismatch {
        expected: DocumentId,
        actual: DocumentId,
    },
    #[error("batch of {actual} operations exceeds limit of {limit}")]
    BatchTooLarge { limit: usize, actual: usize },
    #[error("pending buffer at {pending} cannot absorb {incoming} more operations (limit {limit})")]
    BufferFull {
        limit: usize,
        pending: usize,
        incoming: usize,
    },
}

/// Check a single inbound operation against the document it was routed to.
/// Validation is advisory: a sequence fed a malformed operation still stays
/// consistent, this just lets the session layer reject garbage early.
pub fn validate_operation(op: &Operation, expected: &DocumentId) -> Result<(), ValidationError> {
    if op.document_id() != expected {
        return Err(ValidationError::DocumentMismatch {
            expected: expected.clone(),
            actual: op.document_id().clone(),
        });
    }

    let character = op.character();
    if character.id.seq == 0 {
        return Err(ValidationError::MalformedElement {
            id: character.id.clone(),
            reason: "sequence numbers start at 1",
        });
    }
    if character.site_id != character.id.site {
        return Err(ValidationError::MalformedElement {
            id: character.id.clone(),
            reason: "element site does not match its id",
        });
    }

    if let Operation::Insert {
        character, site_id, ..
    } = op
    {
        if site_id != &character.site_id {
            return Err(ValidationError::MalformedElement {
                id: character.id.clone(),
                reason: "insert not attributed to the element author",
            });
        }
        if character.tombstone {
            return Err(ValidationError::MalformedElement {
                id: character.id.clone(),
                reason: "insert carries a tombstoned element",
            });
        }
    }

    Ok(())
}

/// Validate a batch against count and backpressure limits, then each
/// operation individually. `pending` is the receiving sequence's current
/// parked-operation count.
pub fn validate_batch(
    ops: &[Operation],
    expected: &DocumentId,
    limits: &ValidationLimits,
    pending: usize,
) -> Result<(), ValidationError> {
    if ops.len() > limits.max_ops_per_batch {
        return Err(ValidationError::BatchTooLarge {
            limit: limits.max_ops_per_batch,
            actual: ops.len(),
        });
    }
    if pending + ops.len() > limits.max_pending {
        return Err(ValidationError::BufferFull {
            limit: limits.max_pending,
            pending,
            incoming: ops.len(),
        });
    }
    for op in ops {
        validate_operation(op, expected)?;
    }
    Ok(())
}
