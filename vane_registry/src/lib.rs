//! Packet definitions for Minecraft Java Edition protocol revision 772
//! (client 1.21.7/8): serverbound decode enums per phase, clientbound
//! packet structs with their id mappings, and the buffer assembly that
//! turns a packet into `(id, body)` bytes ready for framing.

pub mod client_bound;
pub mod error;
pub mod mappings;
pub mod server_bound;
pub mod shared;

pub use error::{Error, ProtocolState, Result};
pub use mappings::{packet_buffer, ClientboundPacket, RawNbt};

/// The protocol revision this crate speaks.
pub const PROTOCOL_VERSION: i32 = 772;
/// The client version string paired with [`PROTOCOL_VERSION`].
pub const VERSION_NAME: &str = "1.21.8";
