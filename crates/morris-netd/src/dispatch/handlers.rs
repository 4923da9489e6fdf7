//! Packet dispatch: the per-connection protocol state machine.
//!
//! A logged-out connection gets exactly one verb, LOGIN; a logged-in one
//! gets everything except LOGIN. Each honored packet type has its own
//! handler module. Handlers send their own ACKs (payloads differ per
//! request); any failure maps to a single empty NACK here, and never
//! touches the connection itself.

use tracing::{debug, warn};

use morris_netproto::packet_type::PacketType;

pub(crate) use super::error::{HandlerError, HandlerResult};
use crate::invite::InviteTable;
use crate::net::framing::PacketOwned;
use crate::net::inbound::ConnId;
use crate::net::outbound::{OutboundTx, send_nack};
use crate::player::PlayerRegistry;
use crate::registry::SessionRegistry;

mod accept;
mod decline;
mod game_move;
mod invite;
mod login;
mod resign;
mod revoke;
mod users;

/// Context passed to message handlers.
pub(crate) struct HandlerContext<'a> {
    /// Live connections, including the requester's session.
    pub(crate) sessions: &'a mut SessionRegistry,
    /// Every player ever seen, with ratings.
    pub(crate) players: &'a mut PlayerRegistry,
    /// Arena of live invitations.
    pub(crate) invites: &'a mut InviteTable,
    /// The requesting connection.
    pub(crate) conn_id: ConnId,
}

impl HandlerContext<'_> {
    /// The requester's outbound channel, if it is still registered.
    fn outbound(&self) -> Option<OutboundTx> {
        self.sessions
            .get(self.conn_id)
            .map(|s| s.outbound().clone())
    }

    /// The packet payload as a non-empty UTF-8 string.
    fn payload_str<'p>(&self, packet: &'p PacketOwned) -> Result<&'p str, HandlerError> {
        let s = std::str::from_utf8(&packet.payload).map_err(|_| HandlerError::BadPayload)?;
        if s.is_empty() {
            return Err(HandlerError::BadPayload);
        }
        Ok(s)
    }
}

/// Dispatch one inbound packet, answering NACK on any failure.
pub(crate) async fn dispatch_packet(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) {
    if let Err(e) = route_packet(ctx, packet).await {
        debug!(
            conn_id = ctx.conn_id,
            ptype = packet.header.ptype,
            error = %e,
            "request refused"
        );
        if let Some(tx) = ctx.outbound() {
            let _ = send_nack(&tx).await;
        }
    }
}

async fn route_packet(ctx: &mut HandlerContext<'_>, packet: &PacketOwned) -> HandlerResult {
    let Some(ptype) = packet.packet_type() else {
        warn!(
            conn_id = ctx.conn_id,
            ptype = packet.header.ptype,
            "unknown packet type"
        );
        return Err(HandlerError::UnexpectedType);
    };

    let logged_in = ctx
        .sessions
        .get(ctx.conn_id)
        .is_some_and(|s| s.is_logged_in());

    match (logged_in, ptype) {
        (false, PacketType::Login) => login::handle(ctx, packet).await,
        (false, _) => Err(HandlerError::NotLoggedIn),
        (true, PacketType::Login) => Err(HandlerError::AlreadyLoggedIn),
        (true, PacketType::Users) => users::handle(ctx, packet).await,
        (true, PacketType::Invite) => invite::handle(ctx, packet).await,
        (true, PacketType::Revoke) => revoke::handle(ctx, packet).await,
        (true, PacketType::Accept) => accept::handle(ctx, packet).await,
        (true, PacketType::Decline) => decline::handle(ctx, packet).await,
        (true, PacketType::Move) => game_move::handle(ctx, packet).await,
        (true, PacketType::Resign) => resign::handle(ctx, packet).await,
        // Server-to-client types arriving at the server.
        (true, _) => Err(HandlerError::UnexpectedType),
    }
}
