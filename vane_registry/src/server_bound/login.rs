use crate::{Error, ProtocolState, Result};
use std::io::Read;
use uuid::Uuid;
use vane_serializer::ext::read_byte_array;
use vane_serializer::{Deserialize, VarInt};

pub const HELLO: i32 = 0x00;
pub const KEY: i32 = 0x01;
pub const LOGIN_ACKNOWLEDGED: i32 = 0x03;

/// Login start: the client's claimed username plus whatever uuid it has
/// cached. In online mode both are replaced by the session server's
/// answer.
#[derive(Clone, Debug)]
pub struct Hello {
    pub name: String,
    pub profile_id: Uuid,
}

impl Deserialize for Hello {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(Hello {
            name: String::deserialize(reader)?,
            profile_id: Uuid::deserialize(reader)?,
        })
    }
}

/// Encryption response: the shared secret and our verify token, both
/// RSA-encrypted against the server's public key.
#[derive(Clone, Debug)]
pub struct Key {
    pub shared_secret: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl Deserialize for Key {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(Key {
            shared_secret: read_byte_array(reader)?,
            verify_token: read_byte_array(reader)?,
        })
    }
}

#[derive(Debug)]
pub enum ServerboundLogin {
    Hello(Hello),
    Key(Key),
    LoginAcknowledged,
}

impl ServerboundLogin {
    pub fn decode<R: Read>(id: VarInt, reader: &mut R) -> Result<Self> {
        match id.val() {
            HELLO => Ok(Self::Hello(Hello::deserialize(reader)?)),
            KEY => Ok(Self::Key(Key::deserialize(reader)?)),
            LOGIN_ACKNOWLEDGED => Ok(Self::LoginAcknowledged),
            other => Err(Error::UnexpectedPacket(ProtocolState::Login, other)),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::Hello(_) => HELLO,
            Self::Key(_) => KEY,
            Self::LoginAcknowledged => LOGIN_ACKNOWLEDGED,
        }
    }
}
