use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::TransportError;
use crate::consensus::message::Envelope;

/// Upper bound on one encoded envelope; a DECISION carries the whole chain.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// How long an accepted connection may take to deliver its frame.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, TransportError> {
    Ok(serde_json::to_vec(envelope)?)
}

pub fn decode(bytes: &[u8]) -> Result<Envelope, TransportError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Writes a 4-byte big-endian length followed by the payload.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(payload.len()));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// `read_frame` bounded by `limit`, so a silent peer cannot hold up an accept loop.
pub async fn read_frame_within<R>(reader: &mut R, limit: Duration) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    tokio::time::timeout(limit, read_frame(reader))
        .await
        .map_err(|_| TransportError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ballot::Ballot, block::mine, block::Transaction, message::*};

    #[tokio::test]
    async fn test_frame_carries_envelope() {
        let block = mine(&[], &[Transaction::new("1", "2", 5)], "1");
        let envelope = Envelope::new(
            "1",
            "2",
            Message::Decision(Decision {
                ballot: Ballot::new(0, "1", 0),
                chain: vec![block],
            }),
        );
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);

        write_frame(&mut client, &encode(&envelope).unwrap()).await.unwrap();
        let payload = read_frame(&mut server).await.unwrap();

        assert_eq!(decode(&payload).unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_u32((MAX_FRAME_LEN + 1) as u32).await.unwrap();

        assert!(matches!(
            read_frame(&mut server).await,
            Err(TransportError::FrameTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let (_client, mut server) = tokio::io::duplex(64);

        assert!(matches!(
            read_frame_within(&mut server, Duration::from_millis(50)).await,
            Err(TransportError::Timeout(_))
        ));
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(matches!(decode(b"not json"), Err(TransportError::Codec(_))));
    }
}
