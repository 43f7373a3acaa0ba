//! Session configuration, validation, and error types.
//!
//! [`EngineConfig`] is the input for constructing a [`Session`](crate::Session).
//! [`validate()`](EngineConfig::validate) checks structural invariants at
//! construction; nothing is re-checked on the hot path.

use scenesync_wire::codec::PAYLOAD_HEADER_LEN;
use scenesync_wire::{DecodeLimits, MAX_PAYLOAD_LEN};
use thiserror::Error;

// ── EntityAdmission ────────────────────────────────────────────────

/// How the session learns which entity generations are alive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EntityAdmission {
    /// Generations must be reported through
    /// [`Session::register_entity`](crate::Session::register_entity)
    /// before messages for them are accepted. Anything else is
    /// `Rejected(EntityDead)`.
    #[default]
    Registered,
    /// The first message seen for an index admits it, and a message
    /// carrying a higher generation recycles the slot. For peers that
    /// never see the authoritative lifecycle, such as a late joiner
    /// rebuilding state from a snapshot.
    Implicit,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_entities` is zero.
    #[error("max_entities must be at least 1")]
    NoEntities,
    /// `max_append_entries` is zero.
    #[error("max_append_entries must be at least 1")]
    AppendLogZero,
    /// `max_payload_len` is zero.
    #[error("max_payload_len must be at least 1")]
    PayloadLimitZero,
    /// `max_payload_len` admits payloads the wire format cannot frame.
    #[error("max_payload_len {configured} exceeds the wire limit of {maximum}")]
    PayloadLimitTooLarge {
        /// The configured limit.
        configured: usize,
        /// Largest payload a message can carry.
        maximum: usize,
    },
    /// `ingress_capacity` is zero.
    #[error("ingress_capacity must be at least 1")]
    IngressQueueZero,
    /// The decoder limit cannot hold even an empty payload message.
    #[error("max_message_len {configured} is below the minimum of {minimum}")]
    MessageLimitTooSmall {
        /// The configured limit.
        configured: usize,
        /// Smallest usable limit.
        minimum: usize,
    },
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for one synchronization session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Entity admission policy. Default: [`EntityAdmission::Registered`].
    pub entity_admission: EntityAdmission,
    /// Exclusive upper bound on entity indices. Messages beyond it are
    /// `Rejected(Malformed)`. Bounds the dense entity table. Default: 65 536.
    pub max_entities: u32,
    /// Entries kept per append log before the oldest is evicted. Default: 100.
    pub max_append_entries: usize,
    /// Largest accepted payload in bytes, at most
    /// [`MAX_PAYLOAD_LEN`](scenesync_wire::MAX_PAYLOAD_LEN). Default: 1 MiB.
    pub max_payload_len: usize,
    /// Batches buffered by [`Ingress::from_config`](crate::Ingress::from_config).
    /// Default: 64.
    pub ingress_capacity: usize,
    /// Limits applied when decoding inbound batches.
    pub decode: DecodeLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_admission: EntityAdmission::Registered,
            max_entities: 65_536,
            max_append_entries: 100,
            max_payload_len: 1024 * 1024,
            ingress_capacity: 64,
            decode: DecodeLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities == 0 {
            return Err(ConfigError::NoEntities);
        }
        if self.max_append_entries == 0 {
            return Err(ConfigError::AppendLogZero);
        }
        if self.max_payload_len == 0 {
            return Err(ConfigError::PayloadLimitZero);
        }
        if self.max_payload_len > MAX_PAYLOAD_LEN {
            return Err(ConfigError::PayloadLimitTooLarge {
                configured: self.max_payload_len,
                maximum: MAX_PAYLOAD_LEN,
            });
        }
        if self.ingress_capacity == 0 {
            return Err(ConfigError::IngressQueueZero);
        }
        if self.decode.max_message_len < PAYLOAD_HEADER_LEN {
            return Err(ConfigError::MessageLimitTooSmall {
                configured: self.decode.max_message_len,
                minimum: PAYLOAD_HEADER_LEN,
            });
        }
        Ok(())
    }
}
