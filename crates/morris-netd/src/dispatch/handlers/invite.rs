//! INVITE - offer a game to another logged-in player.
//!
//! The header's role byte names the role the *source* will play; the target
//! gets the complement. The ACK back to the source carries the source's
//! local id for the new invitation.

use morris_netproto::header::Header;
use morris_netproto::packet_type::PacketType;
use morris_netproto::role::Role;
use tracing::info;

use super::{HandlerContext, HandlerError};
use crate::dispatch::error::HandlerResult;
use crate::net::framing::PacketOwned;
use crate::net::outbound::send_packet;
use crate::session;

pub(crate) async fn handle(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) -> HandlerResult {
    let source_role = match packet.header.role() {
        Some(role @ (Role::First | Role::Second)) => role,
        _ => return Err(HandlerError::BadPayload),
    };
    let name = ctx.payload_str(packet)?;
    let target = ctx.sessions.lookup(name).ok_or(HandlerError::UnknownUser)?;

    let slot =
        session::make_invitation(ctx.sessions, ctx.invites, ctx.conn_id, target, source_role)
            .await?;

    info!(
        conn_id = ctx.conn_id,
        target = name,
        slot,
        role = ?source_role,
        "invitation sent"
    );

    let tx = ctx.outbound().ok_or(HandlerError::SessionGone)?;
    let mut header = Header::new(PacketType::Ack);
    header.id = slot;
    let _ = send_packet(&tx, header, &[]).await;
    Ok(())
}
