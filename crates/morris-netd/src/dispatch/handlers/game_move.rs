//! MOVE - play a move in an accepted invitation's game.
//!
//! A move that ends the game is answered with ENDED to both participants
//! instead of an ACK; see the session operation.

use tracing::debug;

use super::{HandlerContext, HandlerError};
use crate::dispatch::error::HandlerResult;
use crate::net::framing::PacketOwned;
use crate::net::outbound::send_ack;
use crate::session;

pub(crate) async fn handle(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) -> HandlerResult {
    let slot = packet.header.id;
    let move_str = ctx.payload_str(packet)?;

    let ended = session::make_move(
        ctx.sessions,
        ctx.players,
        ctx.invites,
        ctx.conn_id,
        slot,
        move_str,
    )
    .await?;

    debug!(conn_id = ctx.conn_id, slot, mv = move_str, ended, "move applied");

    if !ended {
        let tx = ctx.outbound().ok_or(HandlerError::SessionGone)?;
        let _ = send_ack(&tx, &[]).await;
    }
    Ok(())
}
