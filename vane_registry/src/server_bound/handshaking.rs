use crate::{Error, ProtocolState, Result};
use std::io::Read;
use vane_serializer::{Deserialize, VarInt};

pub const INTENTION: i32 = 0x00;

/// Where the client intends to go after the handshake.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NextState {
    Status,
    Login,
    /// Any other discriminant; treated as a transfer attempt and refused.
    Transfer(i32),
}

impl NextState {
    fn from_wire(value: i32) -> NextState {
        match value {
            1 => NextState::Status,
            2 => NextState::Login,
            other => NextState::Transfer(other),
        }
    }
}

/// The single handshake packet. Address and port are informational; the
/// client repeats whatever it dialed.
#[derive(Clone, Debug)]
pub struct Intention {
    pub protocol_version: i32,
    pub host_name: String,
    pub port: u16,
    pub next_state: NextState,
}

impl Deserialize for Intention {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(Intention {
            protocol_version: VarInt::deserialize(reader)?.val(),
            host_name: String::deserialize(reader)?,
            port: u16::deserialize(reader)?,
            next_state: NextState::from_wire(VarInt::deserialize(reader)?.val()),
        })
    }
}

#[derive(Debug)]
pub enum ServerboundHandshake {
    Intention(Intention),
}

impl ServerboundHandshake {
    pub fn decode<R: Read>(id: VarInt, reader: &mut R) -> Result<Self> {
        match id.val() {
            INTENTION => Ok(Self::Intention(Intention::deserialize(reader)?)),
            other => Err(Error::UnexpectedPacket(ProtocolState::Handshake, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use vane_serializer::Serialize;

    #[test]
    fn intention_decodes_all_fields() {
        let mut body = Vec::new();
        VarInt::from(772).serialize(&mut body).unwrap();
        "localhost".serialize(&mut body).unwrap();
        25565u16.serialize(&mut body).unwrap();
        VarInt::from(2).serialize(&mut body).unwrap();

        let packet =
            ServerboundHandshake::decode(VarInt::from(0x00), &mut Cursor::new(body)).unwrap();
        let ServerboundHandshake::Intention(intention) = packet;
        assert_eq!(intention.protocol_version, 772);
        assert_eq!(intention.host_name, "localhost");
        assert_eq!(intention.port, 25565);
        assert_eq!(intention.next_state, NextState::Login);
    }

    #[test]
    fn unknown_ids_are_rejected_with_state_and_id() {
        let result = ServerboundHandshake::decode(VarInt::from(0x63), &mut Cursor::new(vec![]));
        assert!(matches!(
            result,
            Err(Error::UnexpectedPacket(ProtocolState::Handshake, 0x63))
        ));
    }
}
