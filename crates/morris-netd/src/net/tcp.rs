use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::framing::TcpFramer;
use super::inbound::{ConnId, InboundEvent, next_conn_id};
use super::outbound::spawn_writer;

/// Outbound queue depth per connection.
const OUTBOUND_QUEUE: usize = 1024;

/// Start a TCP listener. All decoded packets and connection events are sent
/// to `tx`.
pub async fn run_listener(
    bind: SocketAddr,
    tx: mpsc::Sender<InboundEvent>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    run_with_listener(listener, tx).await
}

/// Run the accept loop on an existing listener.
pub async fn run_with_listener(
    listener: TcpListener,
    tx: mpsc::Sender<InboundEvent>,
) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let conn_id = next_conn_id();

        let tx_clone = tx.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer, conn_id, tx_clone).await;
        });
    }
}

/// Handle a single TCP connection.
///
/// Reads and frames packets until EOF, a read error, or cancellation, then
/// reports `Disconnected` with a reason that distinguishes the three. The
/// writer task exits once the outbound channel is dropped.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn_id: ConnId,
    tx: mpsc::Sender<InboundEvent>,
) {
    let _ = stream.set_nodelay(true);
    let (mut read, write) = stream.into_split();

    // Outbound queue (framed bytes).
    let (out_tx, out_rx) = mpsc::channel::<bytes::Bytes>(OUTBOUND_QUEUE);
    let writer = spawn_writer(write, out_rx);

    let cancel = CancellationToken::new();

    // Notify upper layer that a connection is established.
    if tx
        .send(InboundEvent::Connected {
            conn_id,
            peer,
            outbound: out_tx.clone(),
            cancel: cancel.clone(),
        })
        .await
        .is_err()
    {
        return;
    }

    // Framer keeps bytes across reads.
    let mut framer = TcpFramer::new(8 * 1024);

    let mut disconnect_reason = "eof".to_string();

    loop {
        framer.buf_mut().reserve(4096);
        let read_res = tokio::select! {
            res = read.read_buf(framer.buf_mut()) => res,
            _ = cancel.cancelled() => {
                disconnect_reason = "cancelled by server".to_string();
                break;
            }
        };

        match read_res {
            Ok(0) => {
                // EOF mid-frame means the peer died between header and
                // payload; report it differently from a clean close.
                if !framer.is_empty() {
                    disconnect_reason = "truncated packet at eof".to_string();
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                disconnect_reason = format!("read error: {}", e);
                break;
            }
        }

        let mut closed = false;
        for packet in framer.drain_packets() {
            // Forward decoded packets to the upper layer.
            if tx
                .send(InboundEvent::Packet { conn_id, packet })
                .await
                .is_err()
            {
                // Upper layer is gone -> stop connection task.
                disconnect_reason = "inbound channel closed".to_string();
                closed = true;
                break;
            }
        }
        if closed {
            break;
        }
    }

    // Notify disconnect (best-effort).
    let _ = tx
        .send(InboundEvent::Disconnected {
            conn_id,
            peer,
            reason: disconnect_reason,
        })
        .await;

    // Close outbound channel so the writer can exit.
    drop(out_tx);

    // Await writer task; ignore errors here (connection is closing anyway).
    let _ = writer.await;
}
