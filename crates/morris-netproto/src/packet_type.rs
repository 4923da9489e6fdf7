use strum::FromRepr;

/// Wire packet types.
///
/// The discriminants are fixed by the deployed client population; value 0 is
/// unassigned. `Login..=Resign` are client-to-server requests, the rest are
/// server-to-client replies and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr)]
#[repr(u8)]
pub enum PacketType {
    Login = 1,
    Users = 2,
    Invite = 3,
    Revoke = 4,
    Accept = 5,
    Decline = 6,
    Move = 7,
    Resign = 8,

    Ack = 9,
    Nack = 10,
    Invited = 11,
    Revoked = 12,
    Accepted = 13,
    Declined = 14,
    Moved = 15,
    Resigned = 16,
    Ended = 17,
}

#[cfg(test)]
mod tests {
    use super::PacketType;

    #[test]
    fn discriminants_are_locked() {
        assert_eq!(PacketType::Login as u8, 1);
        assert_eq!(PacketType::Resign as u8, 8);
        assert_eq!(PacketType::Ack as u8, 9);
        assert_eq!(PacketType::Ended as u8, 17);
    }

    #[test]
    fn from_repr_rejects_unassigned_values() {
        assert_eq!(PacketType::from_repr(0), None);
        assert_eq!(PacketType::from_repr(18), None);
        assert_eq!(PacketType::from_repr(7), Some(PacketType::Move));
    }
}
