use crate::server_bound::configuration::{ClientInformation, CustomPayload};
use crate::{Error, ProtocolState, Result};
use std::io::Read;
use vane_serializer::ext::read_remaining;
use vane_serializer::{BlockPos, Deserialize, VarInt};

pub const ACCEPT_TELEPORTATION: i32 = 0x00;
pub const CHAT_COMMAND: i32 = 0x06;
pub const CHAT: i32 = 0x08;
pub const CLIENT_INFORMATION: i32 = 0x0D;
pub const CUSTOM_PAYLOAD: i32 = 0x15;
pub const KEEP_ALIVE: i32 = 0x1B;
pub const MOVE_PLAYER_POS: i32 = 0x1D;
pub const MOVE_PLAYER_POS_ROT: i32 = 0x1E;
pub const MOVE_PLAYER_ROT: i32 = 0x1F;
pub const MOVE_PLAYER_STATUS_ONLY: i32 = 0x20;
pub const PING_REQUEST: i32 = 0x25;
pub const PLAYER_ABILITIES: i32 = 0x27;
pub const PLAYER_ACTION: i32 = 0x28;
pub const PLAYER_COMMAND: i32 = 0x29;
pub const SET_CARRIED_ITEM: i32 = 0x34;
pub const SET_CREATIVE_MODE_SLOT: i32 = 0x37;
pub const SWING: i32 = 0x3C;
pub const USE_ITEM_ON: i32 = 0x3E;
pub const USE_ITEM: i32 = 0x3F;

/// Movement flag bits shared by the four move_player variants.
pub const FLAG_ON_GROUND: u8 = 0x01;
pub const FLAG_AGAINST_WALL: u8 = 0x02;

const CHAT_SIGNATURE_BYTES: usize = 256;

/// A chat message. The signature and acknowledgment tail exists on the
/// wire whether or not secure chat is in use; the core carries it opaquely.
#[derive(Clone, Debug)]
pub struct Chat {
    pub message: String,
    pub timestamp: i64,
    pub salt: i64,
    pub signature: Option<Vec<u8>>,
    pub acknowledgment: Vec<u8>,
}

impl Deserialize for Chat {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        let message = String::deserialize(reader)?;
        let timestamp = i64::deserialize(reader)?;
        let salt = i64::deserialize(reader)?;
        let signature = if bool::deserialize(reader)? {
            let mut bytes = vec![0u8; CHAT_SIGNATURE_BYTES];
            reader.read_exact(&mut bytes)?;
            Some(bytes)
        } else {
            None
        };
        Ok(Chat {
            message,
            timestamp,
            salt,
            signature,
            acknowledgment: read_remaining(reader)?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PlayerAction {
    pub action: i32,
    pub pos: BlockPos,
    pub face: i8,
    pub sequence: i32,
}

impl Deserialize for PlayerAction {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(PlayerAction {
            action: VarInt::deserialize(reader)?.val(),
            pos: BlockPos::deserialize(reader)?,
            face: i8::deserialize(reader)?,
            sequence: VarInt::deserialize(reader)?.val(),
        })
    }
}

pub mod player_action {
    pub const START_DESTROY_BLOCK: i32 = 0;
    pub const ABORT_DESTROY_BLOCK: i32 = 1;
    pub const STOP_DESTROY_BLOCK: i32 = 2;
}

pub mod player_command {
    pub const PRESS_SHIFT_KEY: i32 = 0;
    pub const RELEASE_SHIFT_KEY: i32 = 1;
    pub const START_SPRINTING: i32 = 3;
    pub const STOP_SPRINTING: i32 = 4;
}

#[derive(Clone, Debug)]
pub struct UseItemOn {
    pub hand: i32,
    pub pos: BlockPos,
    pub face: i32,
    pub cursor_x: f32,
    pub cursor_y: f32,
    pub cursor_z: f32,
    pub inside_block: bool,
    pub world_border_hit: bool,
    pub sequence: i32,
}

impl Deserialize for UseItemOn {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(UseItemOn {
            hand: VarInt::deserialize(reader)?.val(),
            pos: BlockPos::deserialize(reader)?,
            face: VarInt::deserialize(reader)?.val(),
            cursor_x: f32::deserialize(reader)?,
            cursor_y: f32::deserialize(reader)?,
            cursor_z: f32::deserialize(reader)?,
            inside_block: bool::deserialize(reader)?,
            world_border_hit: bool::deserialize(reader)?,
            sequence: VarInt::deserialize(reader)?.val(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct UseItem {
    pub hand: i32,
    pub sequence: i32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Deserialize for UseItem {
    fn deserialize<R: Read>(reader: &mut R) -> vane_serializer::Result<Self> {
        Ok(UseItem {
            hand: VarInt::deserialize(reader)?.val(),
            sequence: VarInt::deserialize(reader)?.val(),
            yaw: f32::deserialize(reader)?,
            pitch: f32::deserialize(reader)?,
        })
    }
}

#[derive(Debug)]
pub enum ServerboundPlay {
    AcceptTeleportation {
        id: i32,
    },
    Chat(Chat),
    ChatCommand {
        command: String,
    },
    ClientInformation(ClientInformation),
    CustomPayload(CustomPayload),
    KeepAlive {
        id: i64,
    },
    MovePlayerPos {
        x: f64,
        y: f64,
        z: f64,
        flags: u8,
    },
    MovePlayerPosRot {
        x: f64,
        y: f64,
        z: f64,
        yaw: f32,
        pitch: f32,
        flags: u8,
    },
    MovePlayerRot {
        yaw: f32,
        pitch: f32,
        flags: u8,
    },
    MovePlayerStatusOnly {
        flags: u8,
    },
    PingRequest {
        payload: i64,
    },
    PlayerAbilities {
        flags: u8,
    },
    PlayerAction(PlayerAction),
    PlayerCommand {
        entity_id: i32,
        action: i32,
        data: i32,
    },
    SetCarriedItem {
        slot: i16,
    },
    SetCreativeModeSlot {
        slot: i16,
        item: Vec<u8>,
    },
    Swing {
        hand: i32,
    },
    UseItemOn(UseItemOn),
    UseItem(UseItem),
}

impl ServerboundPlay {
    pub fn decode<R: Read>(id: VarInt, reader: &mut R) -> Result<Self> {
        match id.val() {
            ACCEPT_TELEPORTATION => Ok(Self::AcceptTeleportation {
                id: VarInt::deserialize(reader)?.val(),
            }),
            CHAT => Ok(Self::Chat(Chat::deserialize(reader)?)),
            CHAT_COMMAND => Ok(Self::ChatCommand {
                command: String::deserialize(reader)?,
            }),
            CLIENT_INFORMATION => Ok(Self::ClientInformation(ClientInformation::deserialize(
                reader,
            )?)),
            CUSTOM_PAYLOAD => Ok(Self::CustomPayload(CustomPayload::deserialize(reader)?)),
            KEEP_ALIVE => Ok(Self::KeepAlive {
                id: i64::deserialize(reader)?,
            }),
            MOVE_PLAYER_POS => Ok(Self::MovePlayerPos {
                x: f64::deserialize(reader)?,
                y: f64::deserialize(reader)?,
                z: f64::deserialize(reader)?,
                flags: u8::deserialize(reader)?,
            }),
            MOVE_PLAYER_POS_ROT => Ok(Self::MovePlayerPosRot {
                x: f64::deserialize(reader)?,
                y: f64::deserialize(reader)?,
                z: f64::deserialize(reader)?,
                yaw: f32::deserialize(reader)?,
                pitch: f32::deserialize(reader)?,
                flags: u8::deserialize(reader)?,
            }),
            MOVE_PLAYER_ROT => Ok(Self::MovePlayerRot {
                yaw: f32::deserialize(reader)?,
                pitch: f32::deserialize(reader)?,
                flags: u8::deserialize(reader)?,
            }),
            MOVE_PLAYER_STATUS_ONLY => Ok(Self::MovePlayerStatusOnly {
                flags: u8::deserialize(reader)?,
            }),
            PING_REQUEST => Ok(Self::PingRequest {
                payload: i64::deserialize(reader)?,
            }),
            PLAYER_ABILITIES => Ok(Self::PlayerAbilities {
                flags: u8::deserialize(reader)?,
            }),
            PLAYER_ACTION => Ok(Self::PlayerAction(PlayerAction::deserialize(reader)?)),
            PLAYER_COMMAND => Ok(Self::PlayerCommand {
                entity_id: VarInt::deserialize(reader)?.val(),
                action: VarInt::deserialize(reader)?.val(),
                data: VarInt::deserialize(reader)?.val(),
            }),
            SET_CARRIED_ITEM => Ok(Self::SetCarriedItem {
                slot: i16::deserialize(reader)?,
            }),
            SET_CREATIVE_MODE_SLOT => Ok(Self::SetCreativeModeSlot {
                slot: i16::deserialize(reader)?,
                item: read_remaining(reader)?,
            }),
            SWING => Ok(Self::Swing {
                hand: VarInt::deserialize(reader)?.val(),
            }),
            USE_ITEM_ON => Ok(Self::UseItemOn(UseItemOn::deserialize(reader)?)),
            USE_ITEM => Ok(Self::UseItem(UseItem::deserialize(reader)?)),
            other => Err(Error::UnexpectedPacket(ProtocolState::Play, other)),
        }
    }
}
