//! Invitation state and the process-wide invitation table.
//!
//! An invitation is a two-party offer of one game. Both peers' slot tables
//! refer to the same arena entry by id; ids are never reused, so a stale
//! slot can never alias a newer invitation. The entry is removed only after
//! both slot tables have dropped it.

use morris_netproto::role::Role;
use std::collections::HashMap;
use thiserror::Error;

use crate::game::Game;
use crate::net::inbound::ConnId;

/// Arena id of an invitation. Monotonically assigned, never recycled.
pub type InviteId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteState {
    Open,
    Accepted,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    #[error("invitation in wrong state")]
    WrongState,
}

/// A two-party invitation, owning its game once accepted.
///
/// State transitions are monotone: Open -> Accepted -> Closed, or
/// Open -> Closed. Closed is terminal.
#[derive(Debug)]
pub struct Invitation {
    source: ConnId,
    target: ConnId,
    source_role: Role,
    target_role: Role,
    state: InviteState,
    game: Option<Game>,
}

impl Invitation {
    fn new(source: ConnId, target: ConnId, source_role: Role, target_role: Role) -> Self {
        debug_assert_ne!(source, target);
        debug_assert_eq!(source_role.opponent(), target_role);
        debug_assert_ne!(source_role, Role::None);
        Self {
            source,
            target,
            source_role,
            target_role,
            state: InviteState::Open,
            game: None,
        }
    }

    pub fn source(&self) -> ConnId {
        self.source
    }

    pub fn target(&self) -> ConnId {
        self.target
    }

    pub fn source_role(&self) -> Role {
        self.source_role
    }

    pub fn target_role(&self) -> Role {
        self.target_role
    }

    pub fn state(&self) -> InviteState {
        self.state
    }

    /// The game, present iff the invitation has been accepted
    /// (and still present briefly after a closing resignation).
    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn game_mut(&mut self) -> Option<&mut Game> {
        self.game.as_mut()
    }

    /// The role played by `conn`, if it is a participant.
    pub fn role_of(&self, conn: ConnId) -> Option<Role> {
        if conn == self.source {
            Some(self.source_role)
        } else if conn == self.target {
            Some(self.target_role)
        } else {
            None
        }
    }

    /// The other participant, if `conn` is one.
    pub fn peer_of(&self, conn: ConnId) -> Option<ConnId> {
        if conn == self.source {
            Some(self.target)
        } else if conn == self.target {
            Some(self.source)
        } else {
            None
        }
    }

    /// Open -> Accepted, creating the game.
    pub fn accept(&mut self) -> Result<(), InviteError> {
        if self.state != InviteState::Open {
            return Err(InviteError::WrongState);
        }
        self.state = InviteState::Accepted;
        self.game = Some(Game::new());
        Ok(())
    }

    /// Close the invitation.
    ///
    /// From Open only `role == None` is legal; from Accepted a non-None
    /// `role` resigns the game on that role's behalf. Closed is terminal.
    pub fn close(&mut self, role: Role) -> Result<(), InviteError> {
        match (self.state, role) {
            (InviteState::Closed, _) => Err(InviteError::WrongState),
            (InviteState::Open, Role::None) => {
                self.state = InviteState::Closed;
                Ok(())
            }
            (InviteState::Open, _) => Err(InviteError::WrongState),
            (InviteState::Accepted, Role::None) => Err(InviteError::WrongState),
            (InviteState::Accepted, role) => {
                let game = self.game.as_mut().ok_or(InviteError::WrongState)?;
                game.resign(role).map_err(|_| InviteError::WrongState)?;
                self.state = InviteState::Closed;
                Ok(())
            }
        }
    }
}

/// Arena of live invitations.
#[derive(Debug, Default)]
pub struct InviteTable {
    invites: HashMap<InviteId, Invitation>,
    next_id: InviteId,
}

impl InviteTable {
    pub fn new() -> Self {
        Self {
            invites: HashMap::new(),
            next_id: 1,
        }
    }

    /// Create an Open invitation from `source` to `target`.
    ///
    /// `target` plays the complement of `source_role`. The caller has
    /// already ruled out self-invitations and a None role.
    pub fn create(&mut self, source: ConnId, target: ConnId, source_role: Role) -> InviteId {
        let id = self.next_id;
        self.next_id += 1;
        self.invites.insert(
            id,
            Invitation::new(source, target, source_role, source_role.opponent()),
        );
        id
    }

    pub fn get(&self, id: InviteId) -> Option<&Invitation> {
        self.invites.get(&id)
    }

    pub fn get_mut(&mut self, id: InviteId) -> Option<&mut Invitation> {
        self.invites.get_mut(&id)
    }

    /// Drop an invitation after both peers' slots have been cleared.
    pub fn remove(&mut self, id: InviteId) -> Option<Invitation> {
        self.invites.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.invites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{InviteError, InviteState, InviteTable};
    use morris_netproto::role::Role;

    #[test]
    fn accept_moves_open_to_accepted_and_creates_the_game() {
        let mut table = InviteTable::new();
        let id = table.create(1, 2, Role::First);

        let inv = table.get_mut(id).unwrap();
        assert_eq!(inv.state(), InviteState::Open);
        assert!(inv.game().is_none());

        inv.accept().unwrap();
        assert_eq!(inv.state(), InviteState::Accepted);
        assert!(inv.game().is_some());

        // Accept is not idempotent.
        assert_eq!(inv.accept(), Err(InviteError::WrongState));
    }

    #[test]
    fn close_transitions_follow_the_state_table() {
        let mut table = InviteTable::new();

        // Open + None -> Closed.
        let id = table.create(1, 2, Role::First);
        let inv = table.get_mut(id).unwrap();
        inv.close(Role::None).unwrap();
        assert_eq!(inv.state(), InviteState::Closed);
        // Closed is terminal.
        assert_eq!(inv.close(Role::None), Err(InviteError::WrongState));
        assert_eq!(inv.accept(), Err(InviteError::WrongState));

        // Open + role -> error.
        let id = table.create(1, 2, Role::First);
        let inv = table.get_mut(id).unwrap();
        assert_eq!(inv.close(Role::First), Err(InviteError::WrongState));

        // Accepted + None -> error; Accepted + role resigns the game.
        inv.accept().unwrap();
        assert_eq!(inv.close(Role::None), Err(InviteError::WrongState));
        inv.close(Role::Second).unwrap();
        assert_eq!(inv.state(), InviteState::Closed);
        let game = inv.game().unwrap();
        assert!(game.is_over());
        assert_eq!(game.winner(), Role::First);
    }

    #[test]
    fn roles_and_peers_resolve_per_side() {
        let mut table = InviteTable::new();
        let id = table.create(7, 9, Role::Second);
        let inv = table.get(id).unwrap();

        assert_eq!(inv.source_role(), Role::Second);
        assert_eq!(inv.target_role(), Role::First);
        assert_eq!(inv.role_of(7), Some(Role::Second));
        assert_eq!(inv.role_of(9), Some(Role::First));
        assert_eq!(inv.role_of(8), None);
        assert_eq!(inv.peer_of(7), Some(9));
        assert_eq!(inv.peer_of(9), Some(7));
        assert_eq!(inv.peer_of(8), None);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut table = InviteTable::new();
        let a = table.create(1, 2, Role::First);
        table.remove(a);
        let b = table.create(1, 2, Role::First);
        assert_ne!(a, b);
        assert!(table.get(a).is_none());
    }

    #[test]
    fn concurrent_invitations_between_the_same_peers_are_distinct() {
        let mut table = InviteTable::new();
        let a = table.create(1, 2, Role::First);
        let b = table.create(2, 1, Role::First);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }
}
