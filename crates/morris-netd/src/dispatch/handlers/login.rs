//! LOGIN - claim a username for this connection.

use tracing::info;

use super::{HandlerContext, HandlerError};
use crate::dispatch::error::HandlerResult;
use crate::net::framing::PacketOwned;
use crate::net::outbound::send_ack;
use crate::session;

pub(crate) async fn handle(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) -> HandlerResult {
    let name = ctx.payload_str(packet)?;
    session::login(ctx.sessions, ctx.players, ctx.conn_id, name)?;

    info!(conn_id = ctx.conn_id, name, "player logged in");

    let tx = ctx.outbound().ok_or(HandlerError::SessionGone)?;
    let _ = send_ack(&tx, &[]).await;
    Ok(())
}
