//! Transport seam: length-prefixed frames over a byte stream.
//!
//! The core only consumes the [`FrameReader`] / [`FrameWriter`] traits; the
//! TCP implementation below is the minimal transport the server binary needs.
//! Frames are a 4-byte little-endian payload length followed by the JSON
//! payload.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Upper bound on a single frame payload. A whole-floor snapshot is well
/// under this.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Inbound half of a client transport.
#[async_trait]
pub trait FrameReader: Send {
    /// Read one frame. `Ok(None)` signals a clean close.
    async fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Outbound half of a client transport.
#[async_trait]
pub trait FrameWriter: Send {
    async fn write_frame(&mut self, payload: &[u8]) -> io::Result<()>;
}

pub struct TcpFrameReader {
    inner: OwnedReadHalf,
}

pub struct TcpFrameWriter {
    inner: OwnedWriteHalf,
}

/// Split a TCP stream into framed halves.
pub fn split_stream(stream: TcpStream) -> (TcpFrameReader, TcpFrameWriter) {
    let (read, write) = stream.into_split();
    (TcpFrameReader { inner: read }, TcpFrameWriter { inner: write })
}

#[async_trait]
impl FrameReader for TcpFrameReader {
    async fn read_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut header = [0u8; 4];
        match self.inner.read_exact(&mut header).await {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err),
        }

        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds limit"),
            ));
        }

        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).await?;
        Ok(Some(payload))
    }
}

#[async_trait]
impl FrameWriter for TcpFrameWriter {
    async fn write_frame(&mut self, payload: &[u8]) -> io::Result<()> {
        let header = (payload.len() as u32).to_le_bytes();
        self.inner.write_all(&header).await?;
        self.inner.write_all(payload).await?;
        self.inner.flush().await
    }
}
