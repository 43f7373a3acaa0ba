//! Core types for scenesync.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the wire codec and the reconciliation engine:
//! entity/component identifiers, the CRDT message model, reconciliation
//! outcomes, shared error types, and the storage trait the host engine
//! implements.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod message;
pub mod outcome;
pub mod traits;

pub use error::{IngressError, LifecycleError};
pub use id::{ComponentId, EntityId, Payload, Timestamp};
pub use message::{CrdtMessage, MessageType};
pub use outcome::{ProcessedMessage, ReconciliationEffect, RejectReason, StateDelta};
pub use traits::ComponentStorage;
