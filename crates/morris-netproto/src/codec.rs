use crate::{
    constants::{HEADER_LEN, MAX_PAYLOAD},
    error::ProtoError,
    header::Header,
    packet::PacketView,
};

/// Encode one packet as `[Header][Payload]`, setting the header's size field.
pub fn encode_packet(mut header: Header, payload: &[u8]) -> Result<Vec<u8>, ProtoError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ProtoError::PayloadTooLarge(payload.len()));
    }
    header.size = payload.len() as u16;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    let mut hbuf = [0u8; HEADER_LEN];
    header.encode_into(&mut hbuf);
    out.extend_from_slice(&hbuf);
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decode as many complete packets as `in_buf` holds.
///
/// Returns the decoded views and the number of bytes consumed; a trailing
/// partial packet is left for the next read. This cannot fail: the header is
/// fixed-size, the size field bounds the payload, and unassigned type bytes
/// are carried through for the dispatcher to reject.
pub fn try_decode_packets(in_buf: &[u8]) -> (Vec<PacketView<'_>>, usize) {
    let mut packets = Vec::new();
    let mut offset = 0usize;

    loop {
        let rest = &in_buf[offset..];
        if rest.len() < HEADER_LEN {
            break;
        }
        let size = u16::from_be_bytes([rest[4], rest[5]]) as usize;
        let total = HEADER_LEN + size;
        if rest.len() < total {
            break;
        }

        // Length was checked above, so decode cannot fail.
        if let Ok((header, payload)) = Header::decode(&rest[..total]) {
            packets.push(PacketView::new(header, payload));
        }
        offset += total;
    }

    (packets, offset)
}

#[cfg(test)]
mod tests {
    use super::{encode_packet, try_decode_packets};
    use crate::constants::HEADER_LEN;
    use crate::header::Header;
    use crate::packet_type::PacketType;

    #[test]
    fn encode_sets_size_from_payload() {
        let frame = encode_packet(Header::new(PacketType::Login), b"alice").unwrap();
        assert_eq!(frame.len(), HEADER_LEN + 5);
        assert_eq!(&frame[4..6], &[0, 5]);
        assert_eq!(&frame[HEADER_LEN..], b"alice");
    }

    #[test]
    fn decode_one_packet_with_and_without_payload() {
        let frame = encode_packet(Header::new(PacketType::Users), b"").unwrap();
        let (packets, consumed) = try_decode_packets(&frame);
        assert_eq!(packets.len(), 1);
        assert_eq!(consumed, frame.len());
        assert_eq!(packets[0].header.packet_type(), Some(PacketType::Users));
        assert!(packets[0].payload.is_empty());

        let frame = encode_packet(Header::new(PacketType::Move), b"5").unwrap();
        let (packets, _) = try_decode_packets(&frame);
        assert_eq!(packets[0].payload, b"5");
    }

    #[test]
    fn decode_leaves_partial_trailing_packet() {
        let mut buf = encode_packet(Header::new(PacketType::Login), b"alice").unwrap();
        let second = encode_packet(Header::new(PacketType::Users), b"").unwrap();
        buf.extend_from_slice(&second[..second.len() - 4]);

        let (packets, consumed) = try_decode_packets(&buf);
        assert_eq!(packets.len(), 1);
        assert_eq!(consumed, HEADER_LEN + 5);
    }

    #[test]
    fn decode_drains_back_to_back_packets() {
        let mut buf = encode_packet(Header::new(PacketType::Login), b"alice").unwrap();
        buf.extend(encode_packet(Header::new(PacketType::Users), b"").unwrap());
        buf.extend(encode_packet(Header::new(PacketType::Move), b"5<-X").unwrap());

        let (packets, consumed) = try_decode_packets(&buf);
        assert_eq!(packets.len(), 3);
        assert_eq!(consumed, buf.len());
        assert_eq!(packets[2].payload, b"5<-X");
    }

    #[test]
    fn oversized_payload_is_rejected_at_encode() {
        let big = vec![0u8; u16::MAX as usize + 1];
        assert!(encode_packet(Header::new(PacketType::Users), &big).is_err());
    }
}
