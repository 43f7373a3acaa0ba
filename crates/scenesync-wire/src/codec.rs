//! Binary encode/decode for CRDT messages.
//!
//! All integers are little-endian `u32`. A batch is a plain concatenation
//! of messages; each message starts with its own total length, so the
//! decoder can bound-check a message before touching its payload and can
//! step over anything it fails to understand.
//!
//! ```text
//! length      u32   total message length, including this field
//! type        u32   PUT=0, DELETE_COMPONENT=1, DELETE_ENTITY=2, APPEND=3
//! entity_idx  u32
//! entity_gen  u32
//! component   u32   PUT, DELETE_COMPONENT, APPEND
//! timestamp   u32   PUT, DELETE_COMPONENT, APPEND
//! data_len    u32   PUT, APPEND
//! data        [u8]  PUT, APPEND
//! ```
//!
//! Every function here is pure: no captured state, safe to call from any
//! thread concurrently with reconciliation.

use scenesync_core::{ComponentId, CrdtMessage, EntityId, MessageType, Payload, Timestamp};

use crate::error::DecodeError;
use crate::types::{DecodeLimits, DecodedBatch, SkippedMessage};

/// Size of the `length` field.
pub const LENGTH_FIELD_LEN: usize = 4;
/// Fixed layout of `DELETE_ENTITY`: length, type, entity index, generation.
pub const ENTITY_HEADER_LEN: usize = 16;
/// Fixed layout of `DELETE_COMPONENT`: entity header, component, timestamp.
pub const COMPONENT_HEADER_LEN: usize = 24;
/// Fixed layout of `PUT` and `APPEND`: component header, data length.
pub const PAYLOAD_HEADER_LEN: usize = 28;
/// Largest payload whose message length still fits the `u32` length field.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize - PAYLOAD_HEADER_LEN;

/// Minimum encoded size of a message of type `ty`.
pub fn min_len(ty: MessageType) -> usize {
    match ty {
        MessageType::DeleteEntity => ENTITY_HEADER_LEN,
        MessageType::DeleteComponent => COMPONENT_HEADER_LEN,
        MessageType::PutComponent | MessageType::AppendValue => PAYLOAD_HEADER_LEN,
    }
}

// ── Primitives ──────────────────────────────────────────────────

/// Append a little-endian u32.
#[inline]
fn write_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Read a little-endian u32 at `offset`, or `None` if it does not fit.
#[inline]
fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

// ── Encoder ─────────────────────────────────────────────────────

/// Exact number of bytes [`encode`] produces for `msg`.
pub fn encoded_len(msg: &CrdtMessage) -> usize {
    min_len(msg.message_type()) + msg.data().map_or(0, <[u8]>::len)
}

/// Encode one message into a fresh buffer.
///
/// # Examples
///
/// ```
/// use scenesync_core::{CrdtMessage, EntityId};
/// use scenesync_wire::{decode_batch, encode};
///
/// let msg = CrdtMessage::DeleteEntity { entity: EntityId::new(3, 1) };
/// let bytes = encode(&msg);
/// assert_eq!(bytes.len(), 16);
///
/// let batch = decode_batch(&bytes);
/// assert_eq!(batch.messages, vec![msg]);
/// assert_eq!(batch.bytes_consumed, 16);
/// ```
pub fn encode(msg: &CrdtMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(msg));
    encode_into(msg, &mut buf);
    buf
}

/// Append the encoding of `msg` to `buf`.
///
/// # Panics
///
/// Panics if the payload is longer than [`MAX_PAYLOAD_LEN`]; the `u32`
/// length field cannot express such a message. A session never produces
/// one, since its configured payload limit is capped at that bound.
pub fn encode_into(msg: &CrdtMessage, buf: &mut Vec<u8>) {
    let len = encoded_len(msg);
    let Ok(frame_len) = u32::try_from(len) else {
        panic!("message of {len} bytes does not fit the u32 length field");
    };
    buf.reserve(len);

    let entity = msg.entity();
    write_u32_le(buf, frame_len);
    write_u32_le(buf, msg.message_type().to_wire());
    write_u32_le(buf, entity.index);
    write_u32_le(buf, entity.generation);

    match msg {
        CrdtMessage::DeleteEntity { .. } => {}
        CrdtMessage::DeleteComponent {
            component,
            timestamp,
            ..
        } => {
            write_u32_le(buf, component.0);
            write_u32_le(buf, timestamp.0);
        }
        CrdtMessage::PutComponent {
            component,
            timestamp,
            data,
            ..
        }
        | CrdtMessage::AppendValue {
            component,
            timestamp,
            data,
            ..
        } => {
            write_u32_le(buf, component.0);
            write_u32_le(buf, timestamp.0);
            // Bounded by `frame_len`, so it fits.
            write_u32_le(buf, frame_len - PAYLOAD_HEADER_LEN as u32);
            buf.extend_from_slice(data);
        }
    }
}

/// Encode a sequence of messages as one batch.
pub fn encode_batch<'a, I>(messages: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a CrdtMessage>,
{
    let mut buf = Vec::new();
    for msg in messages {
        encode_into(msg, &mut buf);
    }
    buf
}

// ── Decoder ─────────────────────────────────────────────────────

/// Decode a single, already-delimited message.
///
/// `frame` must be exactly the bytes covered by the message's `length`
/// field. Bytes after the payload but inside `length` are ignored, which
/// leaves room for forward-compatible trailing fields.
pub fn decode_message(frame: &[u8]) -> Result<CrdtMessage, DecodeError> {
    let length = frame.len() as u32;

    let raw_type = read_u32_le(frame, LENGTH_FIELD_LEN).ok_or(DecodeError::LengthTooSmall {
        length,
        minimum: ENTITY_HEADER_LEN as u32,
    })?;
    let ty = MessageType::from_wire(raw_type).ok_or(DecodeError::UnknownType { raw: raw_type })?;

    let minimum = min_len(ty);
    if frame.len() < minimum {
        return Err(DecodeError::LengthTooSmall {
            length,
            minimum: minimum as u32,
        });
    }

    // Lengths were checked against `minimum` above; the fallbacks below
    // are unreachable but keep this path free of panics.
    let field = |offset: usize| {
        read_u32_le(frame, offset).ok_or(DecodeError::LengthTooSmall {
            length,
            minimum: minimum as u32,
        })
    };

    let entity = EntityId::new(field(8)?, field(12)?);
    if ty == MessageType::DeleteEntity {
        return Ok(CrdtMessage::DeleteEntity { entity });
    }

    let component = ComponentId(field(16)?);
    let timestamp = Timestamp(field(20)?);
    if ty == MessageType::DeleteComponent {
        return Ok(CrdtMessage::DeleteComponent {
            entity,
            component,
            timestamp,
        });
    }

    let data_len = field(24)?;
    let available = frame.len() - PAYLOAD_HEADER_LEN;
    let data = frame
        .get(PAYLOAD_HEADER_LEN..PAYLOAD_HEADER_LEN + data_len as usize)
        .ok_or(DecodeError::DataLengthOverflow {
            data_len,
            available: available as u32,
        })?;
    let data = Payload::from(data);

    Ok(match ty {
        MessageType::AppendValue => CrdtMessage::AppendValue {
            entity,
            component,
            timestamp,
            data,
        },
        _ => CrdtMessage::PutComponent {
            entity,
            component,
            timestamp,
            data,
        },
    })
}

/// Decode as many complete messages as `buffer` holds, with default limits.
///
/// See [`decode_batch_with`].
pub fn decode_batch(buffer: &[u8]) -> DecodedBatch {
    decode_batch_with(buffer, &DecodeLimits::default())
}

/// Decode as many complete messages as `buffer` holds.
///
/// Never fails and never blocks:
/// - fewer than 4 trailing bytes, or a declared length that runs past the
///   end of the buffer, stops decoding and leaves those bytes unconsumed;
/// - a message that is delimited but undecodable (unknown type, length
///   below its type's minimum, payload overflow) is skipped and reported;
/// - a length field that cannot delimit anything discards the remainder
///   of the buffer, since no later message boundary can be trusted.
pub fn decode_batch_with(buffer: &[u8], limits: &DecodeLimits) -> DecodedBatch {
    let mut batch = DecodedBatch::default();
    let mut offset = 0usize;

    while let Some(length) = read_u32_le(buffer, offset) {
        let len = length as usize;
        let remaining = buffer.len() - offset;

        if len < LENGTH_FIELD_LEN || len > limits.max_message_len {
            let error = DecodeError::Unframeable { length };
            tracing::warn!(offset, length, %error, "discarding unframeable tail of batch");
            batch.skipped.push(SkippedMessage {
                offset,
                len: remaining,
                error,
            });
            offset = buffer.len();
            break;
        }

        if len > remaining {
            // Mid-stream: the rest of this message has not arrived yet.
            break;
        }

        match decode_message(&buffer[offset..offset + len]) {
            Ok(msg) => batch.messages.push(msg),
            Err(error) => {
                tracing::warn!(offset, length, %error, "skipping malformed message");
                batch.skipped.push(SkippedMessage { offset, len, error });
            }
        }
        offset += len;
    }

    batch.bytes_consumed = offset;
    batch
}
