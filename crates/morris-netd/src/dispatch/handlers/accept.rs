//! ACCEPT - accept an open invitation as its target, starting the game.
//!
//! Whichever side moves first is shown the initial board: it rides the
//! ACCEPTED packet when the source plays FIRST, otherwise the accepter's
//! own ACK.

use tracing::info;

use super::{HandlerContext, HandlerError};
use crate::dispatch::error::HandlerResult;
use crate::net::framing::PacketOwned;
use crate::net::outbound::send_ack;
use crate::session;

pub(crate) async fn handle(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) -> HandlerResult {
    let slot = packet.header.id;
    let state =
        session::accept_invitation(ctx.sessions, ctx.invites, ctx.conn_id, slot).await?;

    info!(conn_id = ctx.conn_id, slot, "invitation accepted");

    let tx = ctx.outbound().ok_or(HandlerError::SessionGone)?;
    match state {
        Some(board) => {
            let _ = send_ack(&tx, board.as_bytes()).await;
        }
        None => {
            let _ = send_ack(&tx, &[]).await;
        }
    }
    Ok(())
}
