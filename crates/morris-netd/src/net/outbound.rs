use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use morris_netproto::codec::encode_packet;
use morris_netproto::error::ProtoError;
use morris_netproto::header::Header;
use morris_netproto::packet_type::PacketType;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Outbound channel sender type.
/// Data must already be framed (header + payload).
pub type OutboundTx = mpsc::Sender<Bytes>;

#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Proto(#[from] ProtoError),
    #[error("connection closed")]
    Closed,
}

/// Spawn a writer task that writes framed bytes to the socket.
///
/// Current behavior:
/// - Exits when the channel is closed.
/// - Returns an error if the socket write fails.
pub fn spawn_writer<W>(
    mut write: W,
    mut rx: mpsc::Receiver<Bytes>,
) -> tokio::task::JoinHandle<std::io::Result<()>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            write.write_all(&frame).await?;
        }
        Ok(())
    })
}

/// Stamp the header with the current wall clock.
///
/// Every outbound packet carries a fresh timestamp; receivers do not
/// validate it, but existing clients expect the fields to be populated.
fn stamp(header: &mut Header) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    header.timestamp_sec = now.as_secs() as u32;
    header.timestamp_nsec = now.subsec_nanos();
}

/// Frame one packet and queue it on the connection's outbound channel.
///
/// The writer task drains the channel in order, so all packets to one
/// client are serialized by construction. `send(..).await` applies
/// backpressure when the queue is full.
pub async fn send_packet(
    tx: &OutboundTx,
    mut header: Header,
    payload: &[u8],
) -> Result<(), SendError> {
    stamp(&mut header);
    let frame = encode_packet(header, payload)?;
    tx.send(Bytes::from(frame))
        .await
        .map_err(|_| SendError::Closed)
}

/// Send an ACK, optionally with a payload.
pub async fn send_ack(tx: &OutboundTx, payload: &[u8]) -> Result<(), SendError> {
    send_packet(tx, Header::new(PacketType::Ack), payload).await
}

/// Send an empty NACK.
pub async fn send_nack(tx: &OutboundTx) -> Result<(), SendError> {
    send_packet(tx, Header::new(PacketType::Nack), &[]).await
}
