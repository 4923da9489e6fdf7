pub mod codec;
pub mod constants;
pub mod error;
pub mod header;
pub mod packet;
pub mod packet_type;
pub mod role;
