use bytes::{Buf, Bytes, BytesMut};
use morris_netproto::codec::try_decode_packets;
use morris_netproto::header::Header;
use morris_netproto::packet_type::PacketType;

/// A single decoded packet that owns its payload bytes.
/// This is safe to move across tasks/channels.
#[derive(Debug, Clone)]
pub struct PacketOwned {
    pub header: Header,
    pub payload: Bytes,
}

impl PacketOwned {
    /// Decoded packet type, or `None` for an unassigned type byte.
    pub fn packet_type(&self) -> Option<PacketType> {
        self.header.packet_type()
    }
}

/// A small framing helper:
/// - keeps an internal receive buffer (`BytesMut`)
/// - decodes as many packets as possible
/// - keeps the remaining bytes for the next read
pub struct TcpFramer {
    buf: BytesMut,
}

impl TcpFramer {
    /// Create a framer with an initial buffer capacity.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(initial_capacity),
        }
    }

    /// Get mutable access to the internal buffer for socket reads.
    ///
    /// Typical usage:
    /// - `framer.buf_mut().reserve(n)`
    /// - `socket.read_buf(framer.buf_mut()).await?`
    pub fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// True if no partial packet is pending in the buffer.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Decode as many complete packets as the current buffer holds.
    ///
    /// Payloads are copied into owned bytes so the packets can outlive the
    /// buffer; the consumed prefix is dropped. A trailing partial packet
    /// stays buffered for the next read, so this cannot fail.
    pub fn drain_packets(&mut self) -> Vec<PacketOwned> {
        let (views, consumed) = try_decode_packets(&self.buf);

        let mut out = Vec::with_capacity(views.len());
        for v in views {
            out.push(PacketOwned {
                header: v.header,
                payload: Bytes::copy_from_slice(v.payload),
            });
        }

        self.buf.advance(consumed);
        out
    }
}
