//! Frame-channel packet framing.
//!
//! Two packet shapes share the wire, distinguished by the `slice_count`
//! field that follows the session id:
//!
//! ```text
//! keyframe: id(16) || 0u32 || body_size(4) || h(4) || w(4) || 0u32 || 0u32 || body
//! delta:    id(16) || N u32 || { body_size(4) || h(4) || w(4) || x(4) || y(4) } * N || body * N
//! ```
//!
//! All integers are 4-byte big-endian. Descriptors for every slice precede
//! all slice bodies; callers must not interleave them.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const SESSION_ID_LEN: usize = 16;
const DESCRIPTOR_LEN: usize = 20; // body_size, h, w, x, y

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    #[error("slice count {0} exceeds declared descriptor bytes")]
    Truncated(u32),
}

/// One dirty-region slice: its bounding rectangle and already-encoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaSlice {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub body: Vec<u8>,
}

impl DeltaSlice {
    #[must_use]
    pub fn new(x: u32, y: u32, width: u32, height: u32, body: Vec<u8>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            body,
        }
    }
}

/// A decoded frame-channel packet, either a keyframe or a set of slices.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePacket {
    Keyframe {
        width: u32,
        height: u32,
        body: Vec<u8>,
    },
    Delta {
        slices: Vec<DeltaSlice>,
    },
}

/// Encode a keyframe packet. `session_id` is copied verbatim as the prefix.
#[must_use]
pub fn encode_keyframe(session_id: [u8; SESSION_ID_LEN], width: u32, height: u32, body: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(SESSION_ID_LEN + 4 + DESCRIPTOR_LEN + body.len());
    buf.put_slice(&session_id);
    buf.put_u32(0); // slice_count = 0 marks a keyframe
    buf.put_u32(body.len() as u32);
    buf.put_u32(height);
    buf.put_u32(width);
    buf.put_u32(0); // x
    buf.put_u32(0); // y
    buf.put_slice(body);
    buf.freeze()
}

/// Encode a delta packet from one or more dirty-region slices.
///
/// Descriptors for all slices precede all bodies, in slice order.
#[must_use]
pub fn encode_delta(session_id: [u8; SESSION_ID_LEN], slices: &[DeltaSlice]) -> Bytes {
    let body_len: usize = slices.iter().map(|s| s.body.len()).sum();
    let mut buf = BytesMut::with_capacity(
        SESSION_ID_LEN + 4 + slices.len() * DESCRIPTOR_LEN + body_len,
    );
    buf.put_slice(&session_id);
    buf.put_u32(slices.len() as u32);
    for slice in slices {
        buf.put_u32(slice.body.len() as u32);
        buf.put_u32(slice.height);
        buf.put_u32(slice.width);
        buf.put_u32(slice.x);
        buf.put_u32(slice.y);
    }
    for slice in slices {
        buf.put_slice(&slice.body);
    }
    buf.freeze()
}

/// Decode a frame-channel packet, returning the session id and the payload.
///
/// Used by tests and by any counterpart decoder; the agent itself only
/// writes packets, it never reads them back.
pub fn decode_frame_packet(mut data: &[u8]) -> Result<([u8; SESSION_ID_LEN], FramePacket), ProtoError> {
    if data.len() < SESSION_ID_LEN + 4 {
        return Err(ProtoError::ShortRead {
            expected: SESSION_ID_LEN + 4,
            actual: data.len(),
        });
    }
    let mut session_id = [0u8; SESSION_ID_LEN];
    session_id.copy_from_slice(&data[..SESSION_ID_LEN]);
    data.advance(SESSION_ID_LEN);
    let slice_count = data.get_u32();

    if slice_count == 0 {
        if data.len() < DESCRIPTOR_LEN {
            return Err(ProtoError::ShortRead {
                expected: DESCRIPTOR_LEN,
                actual: data.len(),
            });
        }
        let body_size = data.get_u32() as usize;
        let height = data.get_u32();
        let width = data.get_u32();
        let _x = data.get_u32();
        let _y = data.get_u32();
        if data.len() < body_size {
            return Err(ProtoError::ShortRead {
                expected: body_size,
                actual: data.len(),
            });
        }
        let body = data[..body_size].to_vec();
        return Ok((
            session_id,
            FramePacket::Keyframe {
                width,
                height,
                body,
            },
        ));
    }

    let descriptors_len = slice_count as usize * DESCRIPTOR_LEN;
    if data.len() < descriptors_len {
        return Err(ProtoError::Truncated(slice_count));
    }

    let mut descriptors = Vec::with_capacity(slice_count as usize);
    for _ in 0..slice_count {
        let body_size = data.get_u32() as usize;
        let height = data.get_u32();
        let width = data.get_u32();
        let x = data.get_u32();
        let y = data.get_u32();
        descriptors.push((body_size, width, height, x, y));
    }

    let mut slices = Vec::with_capacity(descriptors.len());
    for (body_size, width, height, x, y) in descriptors {
        if data.len() < body_size {
            return Err(ProtoError::ShortRead {
                expected: body_size,
                actual: data.len(),
            });
        }
        let body = data[..body_size].to_vec();
        data.advance(body_size);
        slices.push(DeltaSlice::new(x, y, width, height, body));
    }

    Ok((session_id, FramePacket::Delta { slices }))
}
