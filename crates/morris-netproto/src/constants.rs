//! Protocol constants for morris-netproto.

/// Fixed header length in bytes (wire format).
///
/// There is no magic or version field: the layout is fixed by the existing
/// client population, and the header's size field alone delimits frames.
pub const HEADER_LEN: usize = 16;

/// Maximum payload length in bytes.
///
/// The size field is an unsigned 16-bit integer, so this bound is inherent
/// to the wire format rather than a tunable.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;
