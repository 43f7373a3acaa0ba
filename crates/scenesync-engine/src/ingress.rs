//! Multi-producer ingress queue.
//!
//! Inbound batches from several producers (the local scene runtime,
//! remote peers relayed by the transport) are merged into one ordered
//! stream before they reach the single-writer [`Session`](crate::Session).
//! The merge order is arrival order; nothing here looks at timestamps.
//!
//! ```text
//!   producer A ──┐
//!   producer B ──┼─[bounded(capacity)]──► Ingress::drain() ──► Session
//!   producer C ──┘
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError};
use scenesync_core::IngressError;

use crate::config::EngineConfig;

/// Identifies the producer of a batch, for diagnostics.
pub type ProducerId = u32;

/// One complete encoded batch from one producer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundBatch {
    /// Who sent it.
    pub producer: ProducerId,
    /// Encoded messages.
    pub bytes: Vec<u8>,
}

/// Producer handle. Cheap to clone; one per producer thread.
#[derive(Clone, Debug)]
pub struct IngressSender {
    tx: Sender<InboundBatch>,
}

impl IngressSender {
    /// Enqueue a batch without blocking.
    pub fn try_submit(&self, batch: InboundBatch) -> Result<(), IngressError> {
        let producer = batch.producer;
        self.tx.try_send(batch).map_err(|e| match e {
            TrySendError::Full(_) => {
                tracing::warn!(producer, "ingress queue full, batch refused");
                IngressError::QueueFull
            }
            TrySendError::Disconnected(_) => IngressError::Disconnected,
        })
    }
}

/// Consumer side of the queue, held next to the session.
///
/// Dropping it disconnects every [`IngressSender`].
#[derive(Debug)]
pub struct Ingress {
    tx: Sender<InboundBatch>,
    rx: Receiver<InboundBatch>,
}

impl Ingress {
    /// Create a queue holding at most `capacity` batches.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; `EngineConfig::validate` rejects that.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ingress capacity must be at least 1");
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Create the queue sized by `config.ingress_capacity`.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero, which a validated config never has.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.ingress_capacity)
    }

    /// A new producer handle.
    pub fn sender(&self) -> IngressSender {
        IngressSender {
            tx: self.tx.clone(),
        }
    }

    /// Batches waiting to be drained.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no batches are waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Take every queued batch, in arrival order.
    pub fn drain(&self) -> Vec<InboundBatch> {
        self.rx.try_iter().collect()
    }
}
