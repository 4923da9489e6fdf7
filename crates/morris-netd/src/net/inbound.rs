use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::framing::PacketOwned;

/// Unique connection identifier assigned by the server.
pub type ConnId = u64;

/// Sender used by upper layers to write bytes to a connection.
/// The payload is already framed and ready to write.
pub type OutboundTx = mpsc::Sender<bytes::Bytes>;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Inbound events produced by the network layer.
///
/// Current behavior:
/// - `Connected` is emitted once per accepted connection, with an
///   `OutboundTx` for writing back and a `CancellationToken` the server can
///   use to force the read loop to exit (the read-shutdown analogue).
/// - `Packet` is emitted for every decoded packet.
/// - `Disconnected` is emitted when the connection handler exits.
#[derive(Debug)]
pub enum InboundEvent {
    Connected {
        conn_id: ConnId,
        peer: SocketAddr,
        outbound: OutboundTx,
        cancel: CancellationToken,
    },

    Packet {
        conn_id: ConnId,
        packet: PacketOwned,
    },

    Disconnected {
        conn_id: ConnId,
        peer: SocketAddr,
        /// Best-effort human-readable reason (logging/debug).
        reason: String,
    },
}
