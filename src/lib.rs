//! Lottery bet submission protocol
//!
//! This crate implements the client side of a binary bet submission protocol:
//! bets are serialized as TLV (Type-Length-Value) fields, packed into
//! size-bounded batches of length-prefixed sub-packets, and sent to the
//! aggregation service inside a typed message envelope. Once submission
//! finishes, the client polls the service for winner results with
//! exponential backoff.

use thiserror::Error;

pub mod batch;
pub mod bet;
pub mod client;
pub mod framing;
pub mod message;

pub use batch::*;
pub use bet::*;
pub use client::*;
pub use framing::*;
pub use message::*;

/// Maximum size of one frame on the wire, headers included
pub const MAX_FRAME_SIZE: usize = 8 * 1024;

/// Length prefix of a framed packet (u32 big-endian)
pub const PACKET_HEADER_SIZE: usize = 4;

/// Message envelope header: 1 byte type + u32 big-endian payload length
pub const MESSAGE_HEADER_SIZE: usize = 5;

/// Agency identifier prefix of a batch payload (u32 big-endian)
pub const AGENCY_ID_SIZE: usize = 4;

/// Byte budget for the framed records of one batch. Headers and the agency
/// id prefix are subtracted so the outer Message + Packet framing never
/// exceeds [`MAX_FRAME_SIZE`]. The same value bounds a single framed record.
pub const MAX_BATCH_PAYLOAD: usize =
    MAX_FRAME_SIZE - PACKET_HEADER_SIZE - AGENCY_ID_SIZE - MESSAGE_HEADER_SIZE;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Unexpected message type: {0}")]
    UnexpectedMessage(u8),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
