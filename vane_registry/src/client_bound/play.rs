use crate::mappings::{packet_ids, RawNbt};
use crate::shared::ProfileProperty;
use std::io::Write;
use uuid::Uuid;
use vane_serializer::{BlockPos, Identifier, Result, Serialize, VarInt, Vec3};

#[derive(Clone, Debug)]
pub struct KeepAlive {
    pub id: i64,
}

impl Serialize for KeepAlive {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.id.serialize(writer)
    }
}

/// Play-phase disconnects carry an NBT text component.
#[derive(Clone, Debug)]
pub struct Disconnect {
    pub reason: RawNbt,
}

impl Serialize for Disconnect {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.reason.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct GameEvent {
    pub event: u8,
    pub param: f32,
}

/// "Start waiting for level chunks", sent right after the play login.
pub const GAME_EVENT_WAIT_FOR_CHUNKS: u8 = 13;

impl Serialize for GameEvent {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.event.serialize(writer)?;
        self.param.serialize(writer)
    }
}

/// The play-phase login. Most fields are fixed for a virtual server; the
/// dimension identity and registry id come from the joining dimension.
#[derive(Clone, Debug)]
pub struct Login {
    pub entity_id: i32,
    pub hardcore: bool,
    pub dimensions: Vec<Identifier>,
    pub max_players: i32,
    pub view_distance: i32,
    pub simulation_distance: i32,
    pub reduced_debug_info: bool,
    pub show_death_screen: bool,
    pub do_limited_crafting: bool,
    pub dimension_type: i32,
    pub dimension: Identifier,
    pub seed: i64,
    pub game_mode: u8,
    pub previous_game_mode: i8,
    pub is_debug: bool,
    pub is_flat: bool,
    pub portal_cooldown: i32,
    pub sea_level: i32,
    pub enforces_secure_chat: bool,
}

impl Serialize for Login {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.entity_id.serialize(writer)?;
        self.hardcore.serialize(writer)?;
        VarInt::try_from(self.dimensions.len())?.serialize(writer)?;
        for dimension in &self.dimensions {
            dimension.serialize(writer)?;
        }
        VarInt::from(self.max_players).serialize(writer)?;
        VarInt::from(self.view_distance).serialize(writer)?;
        VarInt::from(self.simulation_distance).serialize(writer)?;
        self.reduced_debug_info.serialize(writer)?;
        self.show_death_screen.serialize(writer)?;
        self.do_limited_crafting.serialize(writer)?;
        VarInt::from(self.dimension_type).serialize(writer)?;
        self.dimension.serialize(writer)?;
        self.seed.serialize(writer)?;
        self.game_mode.serialize(writer)?;
        self.previous_game_mode.serialize(writer)?;
        self.is_debug.serialize(writer)?;
        self.is_flat.serialize(writer)?;
        false.serialize(writer)?; // no last death location
        VarInt::from(self.portal_cooldown).serialize(writer)?;
        VarInt::from(self.sea_level).serialize(writer)?;
        self.enforces_secure_chat.serialize(writer)
    }
}

/// Synchronize the client to an absolute position. Velocity zero, all
/// fields absolute (flags 0); the client must echo the teleport id.
#[derive(Clone, Debug)]
pub struct PlayerPosition {
    pub teleport_id: i32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub flags: i32,
}

impl Serialize for PlayerPosition {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.teleport_id).serialize(writer)?;
        self.position.serialize(writer)?;
        self.velocity.serialize(writer)?;
        self.yaw.serialize(writer)?;
        self.pitch.serialize(writer)?;
        self.flags.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct SetChunkCacheCenter {
    pub cx: i32,
    pub cz: i32,
}

impl Serialize for SetChunkCacheCenter {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.cx).serialize(writer)?;
        VarInt::from(self.cz).serialize(writer)
    }
}

/// A full chunk column. `sections` is the pre-serialized block/biome
/// payload out of the chunk store; heightmaps, block entities, and light
/// all travel empty (the client computes its own light for virtual
/// worlds).
#[derive(Clone, Debug)]
pub struct LevelChunkWithLight {
    pub cx: i32,
    pub cz: i32,
    pub sections: Vec<u8>,
}

impl Serialize for LevelChunkWithLight {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.cx.serialize(writer)?;
        self.cz.serialize(writer)?;
        VarInt::from(0).serialize(writer)?; // heightmaps
        VarInt::try_from(self.sections.len())?.serialize(writer)?;
        writer.write_all(&self.sections)?;
        VarInt::from(0).serialize(writer)?; // block entities
        for _ in 0..4 {
            VarInt::from(0).serialize(writer)?; // empty light bitsets
        }
        VarInt::from(0).serialize(writer)?; // sky light sections
        VarInt::from(0).serialize(writer) // block light sections
    }
}

#[derive(Clone, Debug)]
pub struct BlockUpdate {
    pub pos: BlockPos,
    pub state_id: i32,
}

impl Serialize for BlockUpdate {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.pos.serialize(writer)?;
        VarInt::from(self.state_id).serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct BlockChangedAck {
    pub sequence: i32,
}

impl Serialize for BlockChangedAck {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.sequence).serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct AddEntity {
    pub entity_id: i32,
    pub uuid: Uuid,
    pub entity_type: i32,
    pub position: Vec3,
    pub pitch: u8,
    pub yaw: u8,
    pub head_yaw: u8,
    pub data: i32,
    pub velocity: (i16, i16, i16),
}

impl Serialize for AddEntity {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.entity_id).serialize(writer)?;
        self.uuid.serialize(writer)?;
        VarInt::from(self.entity_type).serialize(writer)?;
        self.position.serialize(writer)?;
        self.pitch.serialize(writer)?;
        self.yaw.serialize(writer)?;
        self.head_yaw.serialize(writer)?;
        VarInt::from(self.data).serialize(writer)?;
        self.velocity.0.serialize(writer)?;
        self.velocity.1.serialize(writer)?;
        self.velocity.2.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct RemoveEntities {
    pub entity_ids: Vec<i32>,
}

impl Serialize for RemoveEntities {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.entity_ids.len())?.serialize(writer)?;
        for id in &self.entity_ids {
            VarInt::from(*id).serialize(writer)?;
        }
        Ok(())
    }
}

/// Tab-list install: always sent with add-player and update-listed
/// together, which is all a virtual server needs.
#[derive(Clone, Debug)]
pub struct PlayerInfoUpdate {
    pub entries: Vec<PlayerInfoEntry>,
}

#[derive(Clone, Debug)]
pub struct PlayerInfoEntry {
    pub uuid: Uuid,
    pub name: String,
    pub properties: Vec<ProfileProperty>,
    pub listed: bool,
}

const ACTION_ADD_PLAYER: u8 = 0x01;
const ACTION_UPDATE_LISTED: u8 = 0x08;

impl Serialize for PlayerInfoUpdate {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        (ACTION_ADD_PLAYER | ACTION_UPDATE_LISTED).serialize(writer)?;
        VarInt::try_from(self.entries.len())?.serialize(writer)?;
        for entry in &self.entries {
            entry.uuid.serialize(writer)?;
            entry.name.serialize(writer)?;
            VarInt::try_from(entry.properties.len())?.serialize(writer)?;
            for property in &entry.properties {
                property.name.serialize(writer)?;
                property.value.serialize(writer)?;
                (property.signature.is_some(), property.signature.clone()).serialize(writer)?;
            }
            entry.listed.serialize(writer)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PlayerInfoRemove {
    pub uuids: Vec<Uuid>,
}

impl Serialize for PlayerInfoRemove {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::try_from(self.uuids.len())?.serialize(writer)?;
        for uuid in &self.uuids {
            uuid.serialize(writer)?;
        }
        Ok(())
    }
}

/// Entity metadata; `data` is the already-built entry list including the
/// 0xFF terminator.
#[derive(Clone, Debug)]
pub struct SetEntityData {
    pub entity_id: i32,
    pub data: Vec<u8>,
}

impl Serialize for SetEntityData {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.entity_id).serialize(writer)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

/// Absolute entity position sync, the 772-era replacement for the old
/// delta-teleport packet.
#[derive(Clone, Debug)]
pub struct TeleportEntity {
    pub entity_id: i32,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Serialize for TeleportEntity {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.entity_id).serialize(writer)?;
        self.position.serialize(writer)?;
        self.velocity.serialize(writer)?;
        self.yaw.serialize(writer)?;
        self.pitch.serialize(writer)?;
        self.on_ground.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct RotateHead {
    pub entity_id: i32,
    pub head_yaw: u8,
}

impl Serialize for RotateHead {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.entity_id).serialize(writer)?;
        self.head_yaw.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct Animate {
    pub entity_id: i32,
    pub action: u8,
}

pub const ANIMATE_SWING_MAIN_ARM: u8 = 0;
pub const ANIMATE_SWING_OFFHAND: u8 = 3;

impl Serialize for Animate {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.entity_id).serialize(writer)?;
        self.action.serialize(writer)
    }
}

#[derive(Clone, Debug)]
pub struct SystemChat {
    pub content: RawNbt,
    pub overlay: bool,
}

impl Serialize for SystemChat {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.content.serialize(writer)?;
        self.overlay.serialize(writer)
    }
}

/// Player chat relayed without signature verification.
#[derive(Clone, Debug)]
pub struct DisguisedChat {
    pub message: RawNbt,
    pub chat_type: i32,
    pub sender_name: RawNbt,
}

impl Serialize for DisguisedChat {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.message.serialize(writer)?;
        VarInt::from(self.chat_type).serialize(writer)?;
        self.sender_name.serialize(writer)?;
        false.serialize(writer) // no target name
    }
}

#[derive(Clone, Debug)]
pub struct Respawn {
    pub dimension_type: i32,
    pub dimension: Identifier,
    pub seed: i64,
    pub game_mode: u8,
    pub previous_game_mode: i8,
    pub is_debug: bool,
    pub is_flat: bool,
    pub portal_cooldown: i32,
    pub sea_level: i32,
    pub data_kept: u8,
}

/// Keep attributes and metadata across the respawn.
pub const RESPAWN_KEEP_ALL_DATA: u8 = 0x03;

impl Serialize for Respawn {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        VarInt::from(self.dimension_type).serialize(writer)?;
        self.dimension.serialize(writer)?;
        self.seed.serialize(writer)?;
        self.game_mode.serialize(writer)?;
        self.previous_game_mode.serialize(writer)?;
        self.is_debug.serialize(writer)?;
        self.is_flat.serialize(writer)?;
        false.serialize(writer)?; // no last death location
        VarInt::from(self.portal_cooldown).serialize(writer)?;
        VarInt::from(self.sea_level).serialize(writer)?;
        self.data_kept.serialize(writer)
    }
}

packet_ids! {
    AddEntity = 0x01;
    Animate = 0x02;
    BlockChangedAck = 0x04;
    BlockUpdate = 0x08;
    Disconnect = 0x1C;
    DisguisedChat = 0x1D;
    TeleportEntity = 0x1F;
    GameEvent = 0x22;
    KeepAlive = 0x26;
    LevelChunkWithLight = 0x27;
    Login = 0x2B;
    PongResponse = 0x37;
    PlayerInfoRemove = 0x3E;
    PlayerInfoUpdate = 0x3F;
    PlayerPosition = 0x41;
    RemoveEntities = 0x46;
    Respawn = 0x4B;
    RotateHead = 0x4C;
    SetChunkCacheCenter = 0x57;
    SetEntityData = 0x5C;
    SystemChat = 0x72;
}

/// Play-phase pong shares its body with the status pong but has its own
/// id space.
#[derive(Clone, Debug)]
pub struct PongResponse {
    pub payload: i64,
}

impl Serialize for PongResponse {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.payload.serialize(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet_buffer;

    #[test]
    fn player_position_packs_absolute_sync() {
        let packet = PlayerPosition {
            teleport_id: 7,
            position: Vec3::new(8.5, 65.0, 8.5),
            velocity: Vec3::default(),
            yaw: 0.0,
            pitch: 0.0,
            flags: 0,
        };
        let buffer = packet_buffer(&packet).unwrap();
        assert_eq!(buffer[0], 0x41);
        assert_eq!(buffer[1], 7);
        // id + teleport id + 6 doubles + 2 floats + flags int
        assert_eq!(buffer.len(), 1 + 1 + 48 + 8 + 4);
    }

    #[test]
    fn block_update_carries_packed_position() {
        let packet = BlockUpdate {
            pos: BlockPos::new(3, 64, 5),
            state_id: 0,
        };
        let buffer = packet_buffer(&packet).unwrap();
        assert_eq!(buffer[0], 0x08);
        assert_eq!(buffer.len(), 1 + 8 + 1);
    }

    #[test]
    fn chunk_packet_wraps_section_payload() {
        let packet = LevelChunkWithLight {
            cx: 1,
            cz: -1,
            sections: vec![0xAB; 10],
        };
        let buffer = packet_buffer(&packet).unwrap();
        assert_eq!(buffer[0], 0x27);
        // id + 2 ints + heightmaps(1) + len(1) + 10 + block entities(1)
        // + 4 bitsets + 2 light arrays
        assert_eq!(buffer.len(), 1 + 8 + 1 + 1 + 10 + 1 + 4 + 2);
    }
}
