//! Duplex channel adapter: one framed request in, one framed response out.

use crate::protocol::{Response, read_frame, write_frame};
use crate::{Dispatcher, Result};
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

pub struct DuplexChannel<R, W> {
    reader: R,
    writer: W,
    max_frame_bytes: u32,
}

impl<R, W> DuplexChannel<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, max_frame_bytes: u32) -> Self {
        Self {
            reader,
            writer,
            max_frame_bytes,
        }
    }

    /// Next request body, or `None` once the supervisor closed the channel.
    pub async fn recv_frame(&mut self) -> Result<Option<Bytes>> {
        read_frame(&mut self.reader, self.max_frame_bytes).await
    }

    pub async fn send(&mut self, response: &Response) -> Result<()> {
        let body = serde_json::to_vec(response)?;
        write_frame(&mut self.writer, &body).await
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

/// Serve requests strictly one at a time until the channel closes. Returns the
/// number of requests answered.
pub async fn serve<R, W>(channel: &mut DuplexChannel<R, W>, dispatcher: &mut Dispatcher) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut served = 0u64;
    while let Some(body) = channel.recv_frame().await? {
        let response = dispatcher.handle_frame(&body).await;
        channel.send(&response).await?;
        served += 1;
    }

    tracing::info!(
        "Channel for tier {} closed after {} requests",
        dispatcher.tier().config().name,
        served
    );
    Ok(served)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Payload;
    use crate::{DriveConfig, ErrorKind, Tier, TierConfig, TierError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn framed(body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    fn dispatcher(root: &std::path::Path) -> Dispatcher {
        let tier = Tier::builder()
            .config(TierConfig::new("chan"))
            .drive(DriveConfig::new("a", root))
            .build()
            .unwrap();
        Dispatcher::new(tier).unwrap()
    }

    #[tokio::test]
    async fn test_serve_answers_each_frame() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());

        let mut input = framed(br#"["STARTUP"]"#);
        input.extend(framed(br#"["GET_DRIVE_NAMES"]"#));
        input.extend(framed(b"garbage"));

        let (mut client, server) = tokio::io::duplex(64 * 1024);
        client.write_all(&input).await.unwrap();
        client.shutdown().await.unwrap();

        let (reader, writer) = tokio::io::split(server);
        let mut channel = DuplexChannel::new(reader, writer, 1024);
        let served = serve(&mut channel, &mut dispatcher).await.unwrap();
        assert_eq!(served, 3);
        drop(channel);

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        let mut reader = output.as_slice();
        let mut responses = Vec::new();
        while let Some(body) = read_frame(&mut reader, 1024).await.unwrap() {
            responses.push(serde_json::from_slice::<Response>(&body).unwrap());
        }

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0], Response::ok(Payload::None));
        assert_eq!(
            responses[1],
            Response::ok(Payload::DriveNames(vec!["a".to_string()]))
        );
        assert_eq!(responses[2].error_kind(), Some(ErrorKind::MalformedCommand));
    }

    #[tokio::test]
    async fn test_oversized_frame_ends_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(temp_dir.path());

        let mock = tokio_test::io::Builder::new()
            .read(&4096u32.to_be_bytes())
            .build();
        let mut channel = DuplexChannel::new(mock, tokio::io::sink(), 1024);
        let result = serve(&mut channel, &mut dispatcher).await;
        assert!(matches!(result, Err(TierError::Protocol(_))));
    }
}
