//! REVOKE - withdraw an open invitation as its source.

use tracing::info;

use super::{HandlerContext, HandlerError};
use crate::dispatch::error::HandlerResult;
use crate::net::framing::PacketOwned;
use crate::net::outbound::send_ack;
use crate::session;

pub(crate) async fn handle(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) -> HandlerResult {
    let slot = packet.header.id;
    session::revoke_invitation(ctx.sessions, ctx.invites, ctx.conn_id, slot).await?;

    info!(conn_id = ctx.conn_id, slot, "invitation revoked");

    let tx = ctx.outbound().ok_or(HandlerError::SessionGone)?;
    let _ = send_ack(&tx, &[]).await;
    Ok(())
}
