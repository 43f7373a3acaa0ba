//! Reconciliation engine for scenesync.
//!
//! Provides the [`Session`] that owns the authoritative entity/component
//! state of one scene and reconciles every inbound CRDT message against
//! it with last-write-wins semantics, generational entity tracking and
//! bounded append logs.
//!
//! # Architecture
//!
//! - [`Session`] applies messages one at a time (`&mut self`, single
//!   writer) and produces a [`ProcessedMessage`](scenesync_core::ProcessedMessage)
//!   per message
//! - [`Ingress`] merges batches from several producer threads into one
//!   arrival-ordered stream
//! - [`SyncBuffer`] folds one tick of applied deltas into net storage
//!   operations for a [`ComponentStorage`](scenesync_core::ComponentStorage)
//! - [`state_hash`] fingerprints a session for convergence checks
//!
//! ```text
//! producers ─► Ingress ─► Session::receive ─► SyncBuffer ─► ComponentStorage
//!                              │
//!                              └─► state_messages ─► late-joining peer
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
mod entity;
pub mod hash;
pub mod ingress;
pub mod metrics;
pub mod session;
mod store;
pub mod sync_buffer;

pub use config::{ConfigError, EngineConfig, EntityAdmission};
pub use hash::state_hash;
pub use ingress::{InboundBatch, Ingress, IngressSender, ProducerId};
pub use metrics::ReconcileMetrics;
pub use session::{ReceiveReport, Session};
pub use sync_buffer::{merge_effects, FlushStats, SyncBuffer};
