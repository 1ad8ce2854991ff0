//! Command-channel framing: inbound input commands from the controller.
//!
//! ```text
//! header: controller_id(16) || cmd_type(4) || body_size(4)   (24 bytes)
//! body:   body_size bytes, shape depends on cmd_type
//! ```
//!
//! The body length is always known from the header, so an unrecognized
//! `cmd_type` can still be skipped correctly by the caller without any
//! per-type knowledge — see [`CommandKind::Unknown`].

use bytes::Buf;
use thiserror::Error;

use crate::packet::{ProtoError, SESSION_ID_LEN};

pub const HEADER_LEN: usize = SESSION_ID_LEN + 4 + 4;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error("command body too short for type {cmd_type}: expected {expected}, got {actual}")]
    BodyTooShort {
        cmd_type: u32,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// The 24-byte command header, parsed but not yet dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub controller_id: [u8; SESSION_ID_LEN],
    pub cmd_type: u32,
    pub body_size: u32,
}

/// Parse a fixed 24-byte command header.
pub fn parse_header(bytes: &[u8]) -> Result<CommandHeader, ProtoError> {
    if bytes.len() != HEADER_LEN {
        return Err(ProtoError::ShortRead {
            expected: HEADER_LEN,
            actual: bytes.len(),
        });
    }
    let mut rest = bytes;
    let mut controller_id = [0u8; SESSION_ID_LEN];
    controller_id.copy_from_slice(&rest[..SESSION_ID_LEN]);
    rest.advance(SESSION_ID_LEN);
    let cmd_type = rest.get_u32();
    let body_size = rest.get_u32();
    Ok(CommandHeader {
        controller_id,
        cmd_type,
        body_size,
    })
}

/// A fully decoded command, exhaustively matched by the command loop.
///
/// Type 1 moves, 2–4/5–7 press/release, 8–10 double-click, 11 scrolls,
/// 20/21 toggle the streaming gate. Any other `cmd_type` decodes to
/// `Unknown` — its body has already been consumed by the header's
/// `body_size`, so skipping it never desynchronizes the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    MovePointer { x: i32, y: i32 },
    Press { button: MouseButton, x: i32, y: i32 },
    Release { button: MouseButton, x: i32, y: i32 },
    DoubleClick { button: MouseButton, x: i32, y: i32 },
    Scroll { x: i32, y: i32, amount: i32 },
    SetStreaming(bool),
    Unknown(u32),
}

const SCROLL_UNITS: i32 = 5;

/// Decode a command body given its already-parsed `cmd_type`.
///
/// `body` must be exactly `body_size` bytes, as read from the wire.
pub fn decode_command(cmd_type: u32, body: &[u8]) -> Result<CommandKind, CommandError> {
    fn xy(cmd_type: u32, body: &[u8]) -> Result<(i32, i32), CommandError> {
        if body.len() < 8 {
            return Err(CommandError::BodyTooShort {
                cmd_type,
                expected: 8,
                actual: body.len(),
            });
        }
        let x = i32::from_be_bytes(body[0..4].try_into().unwrap());
        let y = i32::from_be_bytes(body[4..8].try_into().unwrap());
        Ok((x, y))
    }

    Ok(match cmd_type {
        1 => {
            let (x, y) = xy(cmd_type, body)?;
            CommandKind::MovePointer { x, y }
        }
        2 | 3 | 4 => {
            let (x, y) = xy(cmd_type, body)?;
            let button = match cmd_type {
                2 => MouseButton::Left,
                3 => MouseButton::Right,
                _ => MouseButton::Middle,
            };
            CommandKind::Press { button, x, y }
        }
        5 | 6 | 7 => {
            let (x, y) = xy(cmd_type, body)?;
            let button = match cmd_type {
                5 => MouseButton::Left,
                6 => MouseButton::Right,
                _ => MouseButton::Middle,
            };
            CommandKind::Release { button, x, y }
        }
        8 | 9 | 10 => {
            let (x, y) = xy(cmd_type, body)?;
            let button = match cmd_type {
                8 => MouseButton::Left,
                9 => MouseButton::Right,
                _ => MouseButton::Middle,
            };
            CommandKind::DoubleClick { button, x, y }
        }
        11 => {
            let (x, y) = xy(cmd_type, body)?;
            CommandKind::Scroll {
                x,
                y,
                amount: SCROLL_UNITS,
            }
        }
        20 => CommandKind::SetStreaming(true),
        21 => CommandKind::SetStreaming(false),
        other => CommandKind::Unknown(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_parses_24_bytes() {
        let mut bytes = vec![7u8; SESSION_ID_LEN];
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&8u32.to_be_bytes());
        let header = parse_header(&bytes).unwrap();
        assert_eq!(header.controller_id, [7u8; SESSION_ID_LEN]);
        assert_eq!(header.cmd_type, 1);
        assert_eq!(header.body_size, 8);
    }

    #[test]
    fn move_dispatch_decodes_header_and_body_together() {
        // header id || 0x00000001 || 0x00000008, body 0x000001f4 || 0x000000c8
        let body = [500i32.to_be_bytes(), 200i32.to_be_bytes()].concat();
        let cmd = decode_command(1, &body).unwrap();
        assert_eq!(cmd, CommandKind::MovePointer { x: 500, y: 200 });
    }

    #[test]
    fn gate_commands_carry_no_body() {
        assert_eq!(decode_command(20, &[]).unwrap(), CommandKind::SetStreaming(true));
        assert_eq!(decode_command(21, &[]).unwrap(), CommandKind::SetStreaming(false));
    }

    #[test]
    fn scroll_is_fixed_five_units() {
        let body = [0i32.to_be_bytes(), 0i32.to_be_bytes()].concat();
        let cmd = decode_command(11, &body).unwrap();
        assert_eq!(
            cmd,
            CommandKind::Scroll {
                x: 0,
                y: 0,
                amount: 5
            }
        );
    }

    #[test]
    fn unknown_type_decodes_without_error() {
        assert_eq!(decode_command(99, &[1, 2, 3]).unwrap(), CommandKind::Unknown(99));
    }

    #[test]
    fn short_body_is_an_error() {
        assert!(decode_command(1, &[0, 0]).is_err());
    }
}
