//! Per-connection session state and the operations that cross sessions.
//!
//! A session is one TCP connection: its outbound channel, cancellation
//! token, optional bound player, and a fixed-capacity slot table mapping
//! the small ids used on the wire to invitation arena ids. The operations
//! here (invite, revoke, decline, accept, resign, move, logout) mutate two
//! sessions plus the invitation table; the server loop runs them one at a
//! time, which is what makes each transition atomic for every other
//! connection.

use std::net::SocketAddr;

use morris_netproto::header::Header;
use morris_netproto::packet_type::PacketType;
use morris_netproto::role::Role;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dispatch::error::HandlerError;
use crate::invite::{InviteId, InviteState, InviteTable};
use crate::net::inbound::ConnId;
use crate::net::outbound::{OutboundTx, send_packet};
use crate::player::{MatchOutcome, PlayerRegistry};
use crate::registry::SessionRegistry;

/// Capacity of each session's invitation slot table.
pub const MAX_INVITATIONS: usize = 64;

pub struct Session {
    conn_id: ConnId,
    peer: SocketAddr,
    outbound: OutboundTx,
    cancel: CancellationToken,
    /// Bound player name; present iff logged in.
    player: Option<String>,
    /// Wire-visible invitation ids: slot index -> arena id.
    slots: [Option<InviteId>; MAX_INVITATIONS],
}

impl Session {
    pub fn new(
        conn_id: ConnId,
        peer: SocketAddr,
        outbound: OutboundTx,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            conn_id,
            peer,
            outbound,
            cancel,
            player: None,
            slots: [None; MAX_INVITATIONS],
        }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn outbound(&self) -> &OutboundTx {
        &self.outbound
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.player.is_some()
    }

    pub fn bind_player(&mut self, name: String) {
        self.player = Some(name);
    }

    pub fn clear_player(&mut self) -> Option<String> {
        self.player.take()
    }

    /// Place an invitation in the lowest-indexed free slot.
    pub fn add_invitation(&mut self, id: InviteId) -> Option<u8> {
        let slot = self.slots.iter().position(Option::is_none)?;
        self.slots[slot] = Some(id);
        Some(slot as u8)
    }

    /// Clear the slot holding `id`, returning its index.
    pub fn remove_invitation(&mut self, id: InviteId) -> Option<u8> {
        let slot = self.slots.iter().position(|s| *s == Some(id))?;
        self.slots[slot] = None;
        Some(slot as u8)
    }

    pub fn invitation_at(&self, slot: u8) -> Option<InviteId> {
        self.slots.get(slot as usize).copied().flatten()
    }

    pub fn slot_of(&self, id: InviteId) -> Option<u8> {
        self.slots
            .iter()
            .position(|s| *s == Some(id))
            .map(|i| i as u8)
    }

    pub fn occupied_slots(&self) -> Vec<(u8, InviteId)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|id| (i as u8, id)))
            .collect()
    }
}

fn slot_invite(
    sessions: &SessionRegistry,
    conn: ConnId,
    slot: u8,
) -> Result<InviteId, HandlerError> {
    sessions
        .get(conn)
        .ok_or(HandlerError::SessionGone)?
        .invitation_at(slot)
        .ok_or(HandlerError::BadSlot)
}

fn player_name(sessions: &SessionRegistry, conn: ConnId) -> Option<String> {
    sessions
        .get(conn)
        .and_then(|s| s.player())
        .map(str::to_string)
}

/// Send an event packet carrying only a local invitation id.
async fn notify(sessions: &SessionRegistry, conn: ConnId, ptype: PacketType, id: u8) {
    if let Some(session) = sessions.get(conn) {
        let mut header = Header::new(ptype);
        header.id = id;
        // Delivery failures surface on the peer's own teardown path.
        let _ = send_packet(session.outbound(), header, &[]).await;
    }
}

/// Bind `name` to the connection.
///
/// Fails if the connection is already logged in or another connection is
/// logged in under the same name. The player record is created (or found)
/// regardless, matching first-login-creates semantics.
pub(crate) fn login(
    sessions: &mut SessionRegistry,
    players: &mut PlayerRegistry,
    conn: ConnId,
    name: &str,
) -> Result<(), HandlerError> {
    let session = sessions.get(conn).ok_or(HandlerError::SessionGone)?;
    if session.is_logged_in() {
        return Err(HandlerError::AlreadyLoggedIn);
    }
    players.register(name);
    if sessions.lookup(name).is_some() {
        return Err(HandlerError::NameInUse);
    }
    sessions
        .get_mut(conn)
        .ok_or(HandlerError::SessionGone)?
        .bind_player(name.to_string());
    Ok(())
}

/// Create an Open invitation from `source` to `target`, occupying a slot in
/// both tables, and send INVITED to the target with the target's local id.
/// Returns the source's local id.
pub(crate) async fn make_invitation(
    sessions: &mut SessionRegistry,
    invites: &mut InviteTable,
    source: ConnId,
    target: ConnId,
    source_role: Role,
) -> Result<u8, HandlerError> {
    if source == target {
        return Err(HandlerError::SelfInvite);
    }
    let inv_id = invites.create(source, target, source_role);

    let Some(src_session) = sessions.get_mut(source) else {
        invites.remove(inv_id);
        return Err(HandlerError::SessionGone);
    };
    let Some(src_slot) = src_session.add_invitation(inv_id) else {
        invites.remove(inv_id);
        return Err(HandlerError::TableFull);
    };

    let tgt_slot = sessions
        .get_mut(target)
        .and_then(|s| s.add_invitation(inv_id));
    let Some(tgt_slot) = tgt_slot else {
        if let Some(src_session) = sessions.get_mut(source) {
            src_session.remove_invitation(inv_id);
        }
        invites.remove(inv_id);
        return Err(HandlerError::TableFull);
    };

    if let Some(tgt_session) = sessions.get(target) {
        let mut header = Header::new(PacketType::Invited);
        header.id = tgt_slot;
        header.role = source_role.opponent() as u8;
        let _ = send_packet(tgt_session.outbound(), header, &[]).await;
    }

    Ok(src_slot)
}

/// Close an Open invitation and clear it from both tables, then notify the
/// peer with its own local id.
async fn withdraw_invitation(
    sessions: &mut SessionRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
    inv_id: InviteId,
    peer: ConnId,
    notify_type: PacketType,
) -> Result<(), HandlerError> {
    invites
        .get_mut(inv_id)
        .ok_or(HandlerError::BadSlot)?
        .close(Role::None)
        .map_err(|_| HandlerError::WrongState)?;

    if let Some(session) = sessions.get_mut(conn) {
        session.remove_invitation(inv_id);
    }
    let peer_slot = sessions
        .get_mut(peer)
        .and_then(|s| s.remove_invitation(inv_id));
    invites.remove(inv_id);

    if let Some(peer_slot) = peer_slot {
        notify(sessions, peer, notify_type, peer_slot).await;
    }
    Ok(())
}

/// Source-side withdrawal of an Open invitation; REVOKED goes to the target.
pub(crate) async fn revoke_invitation(
    sessions: &mut SessionRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
    slot: u8,
) -> Result<(), HandlerError> {
    let inv_id = slot_invite(sessions, conn, slot)?;
    let target = {
        let inv = invites.get(inv_id).ok_or(HandlerError::BadSlot)?;
        if inv.state() != InviteState::Open {
            return Err(HandlerError::WrongState);
        }
        if inv.source() != conn {
            return Err(HandlerError::WrongSide);
        }
        inv.target()
    };
    withdraw_invitation(sessions, invites, conn, inv_id, target, PacketType::Revoked).await
}

/// Target-side withdrawal of an Open invitation; DECLINED goes to the source.
pub(crate) async fn decline_invitation(
    sessions: &mut SessionRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
    slot: u8,
) -> Result<(), HandlerError> {
    let inv_id = slot_invite(sessions, conn, slot)?;
    let source = {
        let inv = invites.get(inv_id).ok_or(HandlerError::BadSlot)?;
        if inv.state() != InviteState::Open {
            return Err(HandlerError::WrongState);
        }
        if inv.target() != conn {
            return Err(HandlerError::WrongSide);
        }
        inv.source()
    };
    withdraw_invitation(sessions, invites, conn, inv_id, source, PacketType::Declined).await
}

/// Accept an Open invitation as its target, creating the game.
///
/// The side that moves first gets the initial board: when the source plays
/// FIRST the ACCEPTED packet to the source carries it and this returns
/// `None`; otherwise ACCEPTED is empty and the board is returned for the
/// accepter's ACK payload.
pub(crate) async fn accept_invitation(
    sessions: &mut SessionRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
    slot: u8,
) -> Result<Option<String>, HandlerError> {
    let inv_id = slot_invite(sessions, conn, slot)?;

    let inv = invites.get_mut(inv_id).ok_or(HandlerError::BadSlot)?;
    if inv.state() != InviteState::Open {
        return Err(HandlerError::WrongState);
    }
    if inv.target() != conn {
        return Err(HandlerError::WrongSide);
    }
    inv.accept().map_err(|_| HandlerError::WrongState)?;

    let source = inv.source();
    let source_role = inv.source_role();
    let state = inv.game().map(|g| g.unparse_state()).unwrap_or_default();

    let src_session = sessions.get(source).ok_or(HandlerError::SessionGone)?;
    let src_slot = src_session.slot_of(inv_id).ok_or(HandlerError::BadSlot)?;

    let mut header = Header::new(PacketType::Accepted);
    header.id = src_slot;
    if source_role == Role::First {
        let _ = send_packet(src_session.outbound(), header, state.as_bytes()).await;
        Ok(None)
    } else {
        let _ = send_packet(src_session.outbound(), header, &[]).await;
        Ok(Some(state))
    }
}

/// Resign an Accepted invitation's game from either side.
///
/// The opponent wins and both ratings are updated, the invitation closes
/// (which resigns the game), both slots clear, and the opponent is sent
/// RESIGNED with its own local id.
pub(crate) async fn resign_game(
    sessions: &mut SessionRegistry,
    players: &mut PlayerRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
    slot: u8,
) -> Result<(), HandlerError> {
    let inv_id = slot_invite(sessions, conn, slot)?;
    let (my_role, peer) = {
        let inv = invites.get(inv_id).ok_or(HandlerError::BadSlot)?;
        if inv.state() != InviteState::Accepted {
            return Err(HandlerError::WrongState);
        }
        let role = inv.role_of(conn).ok_or(HandlerError::WrongSide)?;
        let peer = inv.peer_of(conn).ok_or(HandlerError::WrongSide)?;
        (role, peer)
    };

    if let (Some(opponent), Some(resigner)) = (player_name(sessions, peer), player_name(sessions, conn))
    {
        players.post_result(&opponent, &resigner, MatchOutcome::Player1Won);
    }

    invites
        .get_mut(inv_id)
        .ok_or(HandlerError::BadSlot)?
        .close(my_role)
        .map_err(|_| HandlerError::WrongState)?;

    if let Some(session) = sessions.get_mut(conn) {
        session.remove_invitation(inv_id);
    }
    let peer_slot = sessions
        .get_mut(peer)
        .and_then(|s| s.remove_invitation(inv_id));
    invites.remove(inv_id);

    if let Some(peer_slot) = peer_slot {
        notify(sessions, peer, PacketType::Resigned, peer_slot).await;
    }
    Ok(())
}

/// Parse and apply a move in an Accepted invitation's game.
///
/// Returns `true` if the move ended the game: ratings are posted, the
/// invitation leaves both tables, and both participants get ENDED with
/// their own local ids (and no ACK). Otherwise the opponent gets MOVED
/// with the new board and the caller ACKs the mover.
pub(crate) async fn make_move(
    sessions: &mut SessionRegistry,
    players: &mut PlayerRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
    slot: u8,
    move_str: &str,
) -> Result<bool, HandlerError> {
    let inv_id = slot_invite(sessions, conn, slot)?;
    let (my_role, source, target, source_role) = {
        let inv = invites.get(inv_id).ok_or(HandlerError::BadSlot)?;
        if inv.state() != InviteState::Accepted {
            return Err(HandlerError::WrongState);
        }
        let role = inv.role_of(conn).ok_or(HandlerError::WrongSide)?;
        (role, inv.source(), inv.target(), inv.source_role())
    };

    let (over, winner, state) = {
        let inv = invites.get_mut(inv_id).ok_or(HandlerError::BadSlot)?;
        let game = inv.game_mut().ok_or(HandlerError::WrongState)?;
        let mv = game.parse_move(my_role, move_str)?;
        game.apply(&mv)?;
        (game.is_over(), game.winner(), game.unparse_state())
    };

    if over {
        let (first_conn, second_conn) = if source_role == Role::First {
            (source, target)
        } else {
            (target, source)
        };
        if let (Some(p1), Some(p2)) = (
            player_name(sessions, first_conn),
            player_name(sessions, second_conn),
        ) {
            let outcome = match winner {
                Role::None => MatchOutcome::Draw,
                Role::First => MatchOutcome::Player1Won,
                Role::Second => MatchOutcome::Player2Won,
            };
            players.post_result(&p1, &p2, outcome);
        }

        let src_slot = sessions
            .get_mut(source)
            .and_then(|s| s.remove_invitation(inv_id));
        let tgt_slot = sessions
            .get_mut(target)
            .and_then(|s| s.remove_invitation(inv_id));
        invites.remove(inv_id);

        for (side, side_slot) in [(source, src_slot), (target, tgt_slot)] {
            if let Some(side_slot) = side_slot {
                notify(sessions, side, PacketType::Ended, side_slot).await;
            }
        }
        Ok(true)
    } else {
        let peer = if conn == source { target } else { source };
        let peer_slot = sessions.get(peer).and_then(|s| s.slot_of(inv_id));
        if let Some(peer_slot) = peer_slot
            && let Some(peer_session) = sessions.get(peer)
        {
            let mut header = Header::new(PacketType::Moved);
            header.id = peer_slot;
            let _ = send_packet(peer_session.outbound(), header, state.as_bytes()).await;
        }
        Ok(false)
    }
}

/// Release the bound player and clean every invitation slot.
///
/// Accepted games are resigned (the staying player wins and is sent
/// RESIGNED); open invitations are closed and the peer notified with
/// REVOKED or DECLINED depending on which side we held. Fails only if the
/// session was not logged in.
pub(crate) async fn logout(
    sessions: &mut SessionRegistry,
    players: &mut PlayerRegistry,
    invites: &mut InviteTable,
    conn: ConnId,
) -> Result<(), HandlerError> {
    let occupied = {
        let session = sessions.get(conn).ok_or(HandlerError::SessionGone)?;
        if !session.is_logged_in() {
            return Err(HandlerError::NotLoggedIn);
        }
        session.occupied_slots()
    };

    for (slot, inv_id) in occupied {
        let disposition = invites
            .get(inv_id)
            .map(|inv| (inv.state(), inv.source() == conn));
        let cleanup = match disposition {
            Some((InviteState::Accepted, _)) => {
                resign_game(sessions, players, invites, conn, slot).await
            }
            Some((_, true)) => revoke_invitation(sessions, invites, conn, slot).await,
            Some((_, false)) => decline_invitation(sessions, invites, conn, slot).await,
            None => {
                // Stale slot; just drop the local entry.
                if let Some(session) = sessions.get_mut(conn) {
                    session.remove_invitation(inv_id);
                }
                Ok(())
            }
        };
        if let Err(e) = cleanup {
            debug!(conn_id = conn, slot, error = %e, "logout cleanup failed");
        }
    }

    if let Some(session) = sessions.get_mut(conn) {
        session.clear_player();
    }
    Ok(())
}
