//! Length-prefixed packet framing
//!
//! A packet is an opaque payload prefixed with its length as a u32
//! big-endian. Reads block until the full header and the full payload have
//! arrived; a short read, including a clean end-of-stream mid-packet, is an
//! error and never surfaces as a truncated packet.

use crate::{ProtocolError, Result, PACKET_HEADER_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// One framed packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Header plus payload as they appear on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PACKET_HEADER_SIZE + self.data.len());
        buf.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Total wire size of this packet, header included.
    pub fn wire_len(&self) -> usize {
        PACKET_HEADER_SIZE + self.data.len()
    }

    /// Read one packet, awaiting exactly the declared number of bytes.
    pub async fn read<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; PACKET_HEADER_SIZE];
        stream.read_exact(&mut header).await?;
        let length = u32::from_be_bytes(header) as usize;

        let mut data = vec![0u8; length];
        stream.read_exact(&mut data).await?;
        Ok(Self { data })
    }

    /// Write the whole packet, retrying partial writes.
    pub async fn write<W>(&self, stream: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        stream.write_all(&self.to_bytes()).await?;
        stream.flush().await.map_err(ProtocolError::Transport)
    }
}
