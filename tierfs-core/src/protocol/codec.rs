//! Length-prefixed framing: a 4-byte big-endian body length, then the body.

use crate::{Result, TierError};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const FRAME_HEADER_LEN: usize = 4;

/// Read one frame. Returns `None` when the peer closed the stream cleanly
/// between frames.
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: u32) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TierError::Protocol(format!(
                "stream closed inside frame header ({} of {} bytes)",
                filled, FRAME_HEADER_LEN
            )));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header);
    if len > max_frame_bytes {
        return Err(TierError::Protocol(format!(
            "frame of {} bytes exceeds limit of {} bytes",
            len, max_frame_bytes
        )));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            TierError::Protocol(format!("stream closed inside {} byte frame", len))
        } else {
            TierError::Io(e)
        }
    })?;

    Ok(Some(Bytes::from(body)))
}

pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len()).map_err(|_| {
        TierError::Protocol(format!("frame of {} bytes is too large", body.len()))
    })?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}
