//! seq-crdt: a sequence CRDT engine for real-time collaborative plain-text
//! editing.
//!
//! Multiple participants edit the same document concurrently; operations
//! arrive in any order, possibly duplicated, and every replica converges to
//! byte-identical text without a central lock. The crate provides:
//!
//! - **Core sequence** - tombstoned element sequence with deterministic
//!   conflict resolution ([`Sequence`])
//! - **Engine** - per-participant state: Lamport clock, site identity,
//!   local edit generation and remote integration ([`Engine`])
//! - **Wire layer** - JSON operation/snapshot shapes and inbound validation
//! - **Registry** - multi-document hosting for the session/server role
//!
//! # Quick start
//!
//! ```rust
//! use seq_crdt::{Engine, SiteId};
//!
//! let mut alice = Engine::new(SiteId::new("alice"), "doc-1");
//! let mut bob = Engine::new(SiteId::new("bob"), "doc-1");
//!
//! // Alice types "hi"; the returned operations go out over the transport.
//! let op_h = alice.generate_insert('h', None);
//! let op_i = alice.generate_insert('i', Some(0));
//!
//! // Delivery order does not matter.
//! bob.apply_remote(&op_i);
//! bob.apply_remote(&op_h);
//!
//! assert_eq!(alice.text(), "hi");
//! assert_eq!(bob.text(), "hi");
//! ```

// Core CRDT types and the integration algorithm
pub mod core;

// Per-participant engine
pub mod engine;

// Multi-document hosting
pub mod registry;

// Wire shapes and validation
pub mod sync;

pub use crate::core::{
    DEFAULT_PENDING_LIMIT, DocumentId, Element, ElementId, Integration, ParseElementIdError,
    Sequence, SiteId, new_document_id,
};
pub use engine::{ApplyOutcome, Engine};
pub use registry::DocumentRegistry;
pub use sync::{
    Operation, Snapshot, ValidationError, ValidationLimits, decode_operation, encode_operation,
    validate_batch, validate_operation,
};
