//! Typed message envelope
//!
//! Every client/service exchange is one message: type (u8), payload length
//! (u32 big-endian), payload. There is no behavioral polymorphism between
//! message kinds, so they share a single tagged struct with one constructor
//! per kind.

use crate::{CodecError, ProtocolError, Result, AGENCY_ID_SIZE, MESSAGE_HEADER_SIZE};
use byteorder::{BigEndian, ByteOrder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

/// Wire values for the message type byte. Shared contract with the
/// aggregation service; both peers must agree on the assignment.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive)]
pub enum MessageType {
    BatchBet = 1,
    Consulta = 2,
    RespuestaWinner = 3,
    RespuestaWait = 4,
}

/// One message envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: u8,
    pub payload: Vec<u8>,
}

impl Message {
    /// Build a batch-bet message around an already assembled batch payload.
    pub fn batch(payload: Vec<u8>) -> Self {
        Self {
            msg_type: MessageType::BatchBet as u8,
            payload,
        }
    }

    /// Build a winner-query message for the given agency. A non-numeric id
    /// falls back to agency 0 so the query is always sent.
    pub fn consulta(agency_id: &str) -> Self {
        Self {
            msg_type: MessageType::Consulta as u8,
            payload: encode_agency_id(agency_id).to_vec(),
        }
    }

    /// Header plus payload as they appear on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MESSAGE_HEADER_SIZE + self.payload.len());
        buf.push(self.msg_type);
        let mut len_bytes = [0u8; 4];
        BigEndian::write_u32(&mut len_bytes, self.payload.len() as u32);
        buf.extend_from_slice(&len_bytes);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Read one message, awaiting the full 5-byte header and then exactly
    /// the declared payload length.
    pub async fn read<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; MESSAGE_HEADER_SIZE];
        stream.read_exact(&mut header).await?;
        let msg_type = header[0];
        let payload_len = BigEndian::read_u32(&header[1..]) as usize;

        let mut payload = vec![0u8; payload_len];
        stream.read_exact(&mut payload).await?;
        Ok(Self { msg_type, payload })
    }

    /// Write the whole message, retrying partial writes.
    pub async fn write<W>(&self, stream: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all(&self.to_bytes()).await?;
        stream.flush().await.map_err(ProtocolError::Transport)
    }
}

/// Encode an agency id as u32 big-endian, substituting 0 when the
/// configured id does not parse as an integer.
pub fn encode_agency_id(agency_id: &str) -> [u8; AGENCY_ID_SIZE] {
    let id: u32 = match agency_id.parse() {
        Ok(id) => id,
        Err(_) => {
            warn!("Agency id {:?} is not numeric, substituting 0", agency_id);
            0
        }
    };
    id.to_be_bytes()
}

/// Parse a RespuestaWinner payload into the list of winning documents.
/// An empty payload means the draw finished with no winners for this agency.
pub fn parse_winners(payload: &[u8]) -> std::result::Result<Vec<u32>, CodecError> {
    if payload.len() % 4 != 0 {
        return Err(CodecError::InvalidWinnerPayload(payload.len()));
    }
    Ok(payload
        .chunks_exact(4)
        .map(BigEndian::read_u32)
        .collect())
}
