use crate::shared::KnownPack;
use crate::{Error, ProtocolState, Result};
use std::io::Read;
use vane_serializer::ext::read_remaining;
use vane_serializer::{Deserialize, Identifier, VarInt};

pub const CLIENT_INFORMATION: i32 = 0x00;
pub const CUSTOM_PAYLOAD: i32 = 0x02;
pub const FINISH_CONFIGURATION: i32 = 0x03;
pub const KEEP_ALIVE: i32 = 0x04;
pub const SELECT_KNOWN_PACKS: i32 = 0x07;

/// Client settings. Shared verbatim with the play phase (same body,
/// different id space).
#[derive(Clone, Debug)]
pub struct ClientInformation {
    pub locale: String,
    pub view_distance: i8,
    pub chat_mode: i32,
    pub chat_colors: bool,
    pub skin_layers: u8,
    pub main_hand: i32,
    pub text_filtering: bool,
    pub allow_listing: bool,
    pub particle_status: i32,
}

impl ClientInformation {
    /// Skin layer bits past the seventh are reserved; strip them.
    pub fn masked_layers(&self) -> u8 {
        self.skin_layers & 0x7F
    }

    /// Main hand normalized to 0 (left) or 1 (right).
    pub fn normalized_hand(&self) -> u8 {
        if self.main_hand == 0 {
            0
        } else {
            1
        }
    }
}

impl Deserialize for ClientInformation {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(ClientInformation {
            locale: String::deserialize(reader)?,
            view_distance: i8::deserialize(reader)?,
            chat_mode: VarInt::deserialize(reader)?.val(),
            chat_colors: bool::deserialize(reader)?,
            skin_layers: u8::deserialize(reader)?,
            main_hand: VarInt::deserialize(reader)?.val(),
            text_filtering: bool::deserialize(reader)?,
            allow_listing: bool::deserialize(reader)?,
            particle_status: VarInt::deserialize(reader)?.val(),
        })
    }
}

/// A plugin channel message; opaque to the core.
#[derive(Clone, Debug)]
pub struct CustomPayload {
    pub channel: Identifier,
    pub data: Vec<u8>,
}

impl Deserialize for CustomPayload {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(CustomPayload {
            channel: Identifier::deserialize(reader)?,
            data: read_remaining(reader)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct SelectKnownPacks {
    pub packs: Vec<KnownPack>,
}

impl Deserialize for SelectKnownPacks {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        let (_, packs): (VarInt, Vec<KnownPack>) = Deserialize::deserialize(reader)?;
        Ok(SelectKnownPacks { packs })
    }
}

#[derive(Debug)]
pub enum ServerboundConfiguration {
    ClientInformation(ClientInformation),
    CustomPayload(CustomPayload),
    FinishConfiguration,
    KeepAlive { id: i64 },
    SelectKnownPacks(SelectKnownPacks),
}

impl ServerboundConfiguration {
    pub fn decode<R: Read>(id: VarInt, reader: &mut R) -> Result<Self> {
        match id.val() {
            CLIENT_INFORMATION => Ok(Self::ClientInformation(ClientInformation::deserialize(
                reader,
            )?)),
            CUSTOM_PAYLOAD => Ok(Self::CustomPayload(CustomPayload::deserialize(reader)?)),
            FINISH_CONFIGURATION => Ok(Self::FinishConfiguration),
            KEEP_ALIVE => Ok(Self::KeepAlive {
                id: i64::deserialize(reader)?,
            }),
            SELECT_KNOWN_PACKS => Ok(Self::SelectKnownPacks(SelectKnownPacks::deserialize(
                reader,
            )?)),
            other => Err(Error::UnexpectedPacket(ProtocolState::Configuration, other)),
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::ClientInformation(_) => CLIENT_INFORMATION,
            Self::CustomPayload(_) => CUSTOM_PAYLOAD,
            Self::FinishConfiguration => FINISH_CONFIGURATION,
            Self::KeepAlive { .. } => KEEP_ALIVE,
            Self::SelectKnownPacks(_) => SELECT_KNOWN_PACKS,
        }
    }
}
