use crate::metadata::player_metadata;
use crate::sink::PacketSink;
use std::collections::HashMap;
use std::sync::Weak;
use tokio::sync::Mutex;
use uuid::Uuid;
use vane_registry::client_bound::play::PlayerPosition;
use vane_registry::shared::GameProfile;
use vane_serializer::{BlockPos, Identifier, Vec3};

/// Skin presentation, from the session-server textures property plus the
/// client's own settings packet.
#[derive(Clone, Debug, Default)]
pub struct Skin {
    pub texture: Option<String>,
    pub texture_signature: Option<String>,
    /// Displayed skin layer bits, masked to 7 bits.
    pub layers: u8,
    /// 0 = left, 1 = right.
    pub main_hand: u8,
}

/// An inventory slot payload, opaque to the core.
#[derive(Clone, Debug)]
pub struct Item(pub Vec<u8>);

/// Mutable per-player state, guarded by the player's lock. Shadows are
/// the last values the movement path acted on, used to detect block- and
/// chunk-crossing transitions.
#[derive(Debug)]
pub struct PlayerState {
    pub entity_id: i32,
    pub dimension: Identifier,
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub against_wall: bool,
    pub sneaking: bool,
    pub sprinting: bool,
    pub skin: Skin,
    pub inventory: HashMap<i16, Item>,
    pub selected_slot: u8,
    pub block_pos: BlockPos,
    pub chunk: (i32, i32),
    pub current_teleport_id: i32,
    pub teleport_acknowledged: bool,
}

impl PlayerState {
    pub fn chunk_of(position: Vec3) -> (i32, i32) {
        let block = position.block_pos();
        (block.x >> 4, block.z >> 4)
    }

    pub fn metadata(&self) -> Vec<u8> {
        player_metadata(
            self.skin.layers,
            self.skin.main_hand,
            self.sneaking,
            self.sprinting,
        )
    }
}

/// A connected, configured player. The sink is shared with the
/// connection's tasks; dimension fan-out clones it freely. Listener
/// links are weak: a dropped peer upgrades to nothing and is pruned on
/// the next fan-out.
pub struct Player {
    pub uuid: Uuid,
    pub username: String,
    pub profile: GameProfile,
    pub sink: PacketSink,
    pub state: Mutex<PlayerState>,
    pub listeners: Mutex<Vec<Weak<Player>>>,
}

impl Player {
    pub fn new(profile: GameProfile, skin: Skin, sink: PacketSink, dimension: Identifier) -> Player {
        Player {
            uuid: profile.id,
            username: profile.name.clone(),
            profile,
            sink,
            state: Mutex::new(PlayerState {
                entity_id: 0,
                dimension,
                position: Vec3::default(),
                yaw: 0.0,
                pitch: 0.0,
                on_ground: false,
                against_wall: false,
                sneaking: false,
                sprinting: false,
                skin,
                inventory: HashMap::new(),
                selected_slot: 0,
                block_pos: BlockPos::default(),
                chunk: (0, 0),
                current_teleport_id: 0,
                teleport_acknowledged: false,
            }),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Allocates a fresh teleport id, clears the acknowledgment, and
    /// sends an absolute position sync. The client must echo the id
    /// before its own movement is trusted again.
    pub async fn synchronize_position(&self) -> anyhow::Result<()> {
        let packet = {
            let mut state = self.state.lock().await;
            state.current_teleport_id += 1;
            state.teleport_acknowledged = false;
            PlayerPosition {
                teleport_id: state.current_teleport_id,
                position: state.position,
                velocity: Vec3::default(),
                yaw: state.yaw,
                pitch: state.pitch,
                flags: 0,
            }
        };
        self.sink.send(&packet).await
    }

    pub async fn add_listener(&self, peer: Weak<Player>) {
        self.listeners.lock().await.push(peer);
    }

    pub async fn remove_listener(&self, peer_uuid: Uuid) {
        self.listeners
            .lock()
            .await
            .retain(|weak| match weak.upgrade() {
                Some(player) => player.uuid != peer_uuid,
                None => false,
            });
    }

    /// Eagerly delivers `(id, body)` buffers to every live listener,
    /// pruning dropped ones.
    pub async fn send_to_listeners(&self, buffers: &[Vec<u8>]) {
        let listeners: Vec<_> = {
            let mut guard = self.listeners.lock().await;
            guard.retain(|weak| weak.strong_count() > 0);
            guard.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            for buffer in buffers {
                if let Err(err) = listener.sink.send_raw(buffer).await {
                    log::debug!(
                        "Dropping listener update for {}: {}",
                        listener.username,
                        err
                    );
                    break;
                }
            }
        }
    }
}
