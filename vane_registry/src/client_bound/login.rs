use crate::mappings::packet_ids;
use crate::shared::GameProfile;
use std::io::Write;
use vane_serializer::ext::write_byte_array;
use vane_serializer::{Result, Serialize};

/// Login-phase disconnects carry a JSON text component; only after
/// configuration does the NBT form take over.
#[derive(Clone, Debug)]
pub struct LoginDisconnect {
    pub reason_json: String,
}

impl Serialize for LoginDisconnect {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.reason_json.serialize(writer)
    }
}

/// Encryption request: empty server id, our DER public key, and a fresh
/// 4-byte verify token.
#[derive(Clone, Debug)]
pub struct Hello {
    pub server_id: String,
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
    pub should_authenticate: bool,
}

impl Serialize for Hello {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.server_id.serialize(writer)?;
        write_byte_array(writer, &self.public_key)?;
        write_byte_array(writer, &self.verify_token)?;
        self.should_authenticate.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct LoginFinished {
    pub profile: GameProfile,
}

impl Serialize for LoginFinished {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.profile.serialize(writer)
    }
}

packet_ids! {
    LoginDisconnect = 0x00;
    Hello = 0x01;
    LoginFinished = 0x02;
}
