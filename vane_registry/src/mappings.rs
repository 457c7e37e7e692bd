use crate::Result;
use std::io::Write;
use vane_serializer::{Serialize, VarInt};

/// A clientbound packet: a serializable body with a fixed id in its phase.
pub trait ClientboundPacket: Serialize {
    const ID: i32;
}

/// Assembles `(id, body)` bytes for a packet. Length prefixing and
/// encryption happen at the transport, which sees only this buffer.
pub fn packet_buffer<P: ClientboundPacket>(packet: &P) -> Result<Vec<u8>> {
    let id = VarInt::from(P::ID);
    let mut buffer = Vec::with_capacity((id.size()? + packet.size()?) as usize);
    id.serialize(&mut buffer)?;
    packet.serialize(&mut buffer)?;
    Ok(buffer)
}

/// A pre-encoded nameless-root NBT payload carried verbatim inside a
/// packet body (registry entries, play-phase text components).
#[derive(Clone, Debug)]
pub struct RawNbt(pub Vec<u8>);

impl RawNbt {
    pub fn from_tag(tag: &vane_nbt::Tag) -> Result<RawNbt> {
        Ok(RawNbt(vane_nbt::encode_nameless(tag)?))
    }
}

impl Serialize for RawNbt {
    fn serialize<W: Write>(&self, writer: &mut W) -> vane_serializer::Result<()> {
        writer.write_all(&self.0)?;
        Ok(())
    }

    fn size(&self) -> vane_serializer::Result<i32> {
        Ok(self.0.len() as i32)
    }
}

/// Declares the id mapping for a batch of clientbound packets.
macro_rules! packet_ids {
    ($($packet:ty = $id:literal;)*) => {
        $(
            impl $crate::mappings::ClientboundPacket for $packet {
                const ID: i32 = $id;
            }
        )*
    };
}

pub(crate) use packet_ids;
