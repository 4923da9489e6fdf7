//! Server library - main loop logic extracted for testing.
//!
//! All mutable state (sessions, players, invitations) is owned by the
//! single task running [`run_server`]; the network layer feeds it events
//! over a channel. Processing events one at a time is what makes every
//! cross-session transition (an invitation entering two slot tables, a
//! game ending for both players) atomic from any connection's view.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatch::handlers::{HandlerContext, dispatch_packet};
use crate::invite::InviteTable;
use crate::net::inbound::InboundEvent;
use crate::player::PlayerRegistry;
use crate::registry::SessionRegistry;
use crate::session::Session;

// Export modules publicly for testing.
pub mod dispatch;
pub mod game;
pub mod invite;
pub mod net;
pub mod player;
pub mod registry;
pub mod session;

/// Run the server main loop until `shutdown` fires and the last connection
/// drains, or the event channel closes.
///
/// On shutdown every connection's token is cancelled; the read tasks exit
/// as if their peers had closed, their `Disconnected` events log the
/// players out (resigning games, withdrawing invitations), and once the
/// registry is empty the loop returns.
pub async fn run_server(
    mut rx: mpsc::Receiver<InboundEvent>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut sessions = SessionRegistry::new();
    let mut players = PlayerRegistry::new();
    let mut invites = InviteTable::new();
    let mut draining = false;

    info!("server main loop started");

    loop {
        let ev = tokio::select! {
            ev = rx.recv() => ev,
            _ = shutdown.cancelled(), if !draining => {
                info!(connections = sessions.len(), "shutdown requested, draining connections");
                sessions.shutdown_all();
                draining = true;
                if sessions.is_empty() {
                    break;
                }
                continue;
            }
        };
        let Some(ev) = ev else {
            break;
        };

        match ev {
            InboundEvent::Connected {
                conn_id,
                peer,
                outbound,
                cancel,
            } => {
                // A connection that races the shutdown is torn down at once.
                if draining {
                    cancel.cancel();
                }
                sessions.register(Session::new(conn_id, peer, outbound, cancel));
                debug!(conn_id, %peer, "client connected");
            }

            InboundEvent::Packet { conn_id, packet } => {
                if sessions.get(conn_id).is_none() {
                    continue;
                }
                let mut ctx = HandlerContext {
                    sessions: &mut sessions,
                    players: &mut players,
                    invites: &mut invites,
                    conn_id,
                };
                dispatch_packet(&mut ctx, &packet).await;
            }

            InboundEvent::Disconnected {
                conn_id,
                peer,
                reason,
            } => {
                // Best-effort logout; a connection that never logged in is
                // not an error worth more than a debug line.
                if let Err(e) =
                    session::logout(&mut sessions, &mut players, &mut invites, conn_id).await
                {
                    debug!(conn_id, error = %e, "logout on disconnect");
                }
                sessions.unregister(conn_id);
                info!(conn_id, %peer, %reason, "client disconnected");

                if draining && sessions.is_empty() {
                    break;
                }
            }
        }
    }

    info!("server main loop stopped");
    Ok(())
}
