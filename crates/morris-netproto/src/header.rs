use crate::{
    constants::HEADER_LEN,
    error::ProtoError,
    packet_type::PacketType,
    role::Role,
};

/// Packet header (wire format).
///
/// Encoding rules:
/// - Fixed size: exactly `HEADER_LEN` bytes.
/// - Multi-byte integer fields are big-endian.
/// - Layout is defined by `encode_into()` / `decode()` offsets below.
///
/// Decode rules (current implementation):
/// - Requires `buf.len() >= HEADER_LEN`.
/// - Requires `buf.len() == HEADER_LEN + size`.
/// - The type and role bytes are carried through undecoded; upper layers
///   convert them with [`Header::packet_type`] / [`Header::role`] so an
///   unknown value can be answered with a NACK instead of dropping the
///   connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct Header {
    /// Packet type byte. See [`PacketType`] for assigned values.
    pub ptype: u8,

    /// Local invitation id; meaning depends on the packet type.
    pub id: u8,

    /// Role byte. See [`Role`] for assigned values.
    pub role: u8,

    /// Payload length in bytes.
    pub size: u16,

    /// Sender wall-clock timestamp, seconds since the Unix epoch.
    pub timestamp_sec: u32,

    /// Sender wall-clock timestamp, nanoseconds part.
    pub timestamp_nsec: u32,
}

impl Header {
    /// Header size in bytes for the current wire layout.
    pub const LEN: usize = HEADER_LEN;

    /// Create a header with default values and a specific packet type.
    pub fn new(ptype: PacketType) -> Self {
        Self {
            ptype: ptype as u8,
            ..Self::default()
        }
    }

    /// Decoded packet type, or `None` for an unassigned type byte.
    pub fn packet_type(&self) -> Option<PacketType> {
        PacketType::from_repr(self.ptype)
    }

    /// Decoded role, or `None` for an unassigned role byte.
    pub fn role(&self) -> Option<Role> {
        Role::from_repr(self.role)
    }

    /// Encode this header into `out` using the current fixed wire layout.
    ///
    /// Offsets (bytes):
    /// - 0      type
    /// - 1      id
    /// - 2      role
    /// - 3      reserved (zero)
    /// - 4..6   size (u16 BE)
    /// - 6..8   reserved (zero)
    /// - 8..12  timestamp_sec (u32 BE)
    /// - 12..16 timestamp_nsec (u32 BE)
    pub fn encode_into(&self, out: &mut [u8; HEADER_LEN]) {
        out[0] = self.ptype;
        out[1] = self.id;
        out[2] = self.role;
        out[3] = 0;
        out[4..6].copy_from_slice(&self.size.to_be_bytes());
        out[6..8].copy_from_slice(&[0, 0]);
        out[8..12].copy_from_slice(&self.timestamp_sec.to_be_bytes());
        out[12..16].copy_from_slice(&self.timestamp_nsec.to_be_bytes());
    }

    /// Read a header from the first `HEADER_LEN` bytes of `buf`.
    ///
    /// The caller must have checked the length; reserved bytes are ignored.
    pub(crate) fn from_prefix(buf: &[u8]) -> Self {
        Self {
            ptype: buf[0],
            id: buf[1],
            role: buf[2],
            size: u16::from_be_bytes([buf[4], buf[5]]),
            timestamp_sec: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            timestamp_nsec: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        }
    }

    /// Decode a buffer that contains exactly `[Header][Payload]`.
    ///
    /// - If `buf.len() < HEADER_LEN`, returns `TooShort`.
    /// - Reads `size` from the header and requires
    ///   `buf.len() == HEADER_LEN + size`.
    /// - On success, returns `(Header, payload_slice)`.
    pub fn decode(buf: &[u8]) -> Result<(Header, &[u8]), ProtoError> {
        if buf.len() < HEADER_LEN {
            return Err(ProtoError::TooShort);
        }
        let h = Header::from_prefix(buf);
        if buf.len() != HEADER_LEN + h.size as usize {
            return Err(ProtoError::LengthMismatch);
        }
        Ok((h, &buf[HEADER_LEN..]))
    }
}

#[cfg(test)]
mod tests {
    use super::Header;
    use crate::constants::HEADER_LEN;
    use crate::packet_type::PacketType;
    use crate::role::Role;

    #[test]
    fn header_len_is_locked() {
        assert_eq!(Header::LEN, HEADER_LEN);
        assert_eq!(Header::LEN, 16);
    }

    #[test]
    fn header_encode_offsets_are_locked() {
        let h = Header {
            ptype: PacketType::Invited as u8,
            id: 3,
            role: Role::Second as u8,
            size: 0x1234,
            timestamp_sec: 0x0102_0304,
            timestamp_nsec: 0x0506_0708,
        };

        let mut buf = [0u8; HEADER_LEN];
        h.encode_into(&mut buf);

        assert_eq!(buf[0], h.ptype);
        assert_eq!(buf[1], 3);
        assert_eq!(buf[2], 2);
        assert_eq!(buf[3], 0);
        assert_eq!(&buf[4..6], &[0x12, 0x34]);
        assert_eq!(&buf[6..8], &[0, 0]);
        assert_eq!(&buf[8..12], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&buf[12..16], &[0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn header_decode_requires_exact_total_length() {
        let mut h = Header::new(PacketType::Login);
        h.size = 3;

        let mut packet = vec![0u8; HEADER_LEN + 3];
        let mut hbuf = [0u8; HEADER_LEN];
        h.encode_into(&mut hbuf);

        packet[..HEADER_LEN].copy_from_slice(&hbuf);
        packet[HEADER_LEN..].copy_from_slice(b"bob");

        let (decoded, payload) = Header::decode(&packet).unwrap();
        assert_eq!(decoded.size, 3);
        assert_eq!(decoded.packet_type(), Some(PacketType::Login));
        assert_eq!(payload, b"bob");

        let mut too_long = packet.clone();
        too_long.push(9);
        assert!(Header::decode(&too_long).is_err());

        let too_short = &packet[..packet.len() - 1];
        assert!(Header::decode(too_short).is_err());
    }

    #[test]
    fn unknown_type_and_role_bytes_survive_decode() {
        let h = Header {
            ptype: 0xEE,
            role: 0x77,
            ..Header::default()
        };
        let mut buf = [0u8; HEADER_LEN];
        h.encode_into(&mut buf);

        let (decoded, _) = Header::decode(&buf).unwrap();
        assert_eq!(decoded.ptype, 0xEE);
        assert_eq!(decoded.packet_type(), None);
        assert_eq!(decoded.role(), None);
    }
}
