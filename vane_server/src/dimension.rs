use crate::entity::EntityState;
use crate::player::{Player, PlayerState};
use crate::text::Text;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vane_gamedata::{BlockStates, Registry};
use vane_level::{Chunk, ChunkProvider};
use vane_registry::client_bound::play::{
    AddEntity, BlockUpdate, DisguisedChat, LevelChunkWithLight, PlayerInfoEntry, PlayerInfoRemove,
    PlayerInfoUpdate, RemoveEntities, SetChunkCacheCenter, SetEntityData, SystemChat,
};
use vane_registry::server_bound::play::{UseItem, UseItemOn};
use vane_registry::{packet_buffer, ClientboundPacket};
use vane_serializer::{quantize_angle, BlockPos, Identifier, Vec3};

/// The chat-type holder the core uses when relaying player chat;
/// `minecraft:chat` sits at registry id 0, carried as id + 1.
const CHAT_TYPE_CHAT: i32 = 1;

/// What to do with an incoming chat message.
pub enum ChatAction {
    Broadcast,
    Suppress,
}

/// The overridable per-dimension decision hooks. Defaults implement the
/// stock behavior; embedders override what they need. Hooks decide; the
/// core does the asynchronous fan-out.
pub trait DimensionBehavior: Send + Sync {
    /// Where a joining player materializes. Defaults to the spawnpoint.
    fn on_player_joined(&self, config: &DimensionConfig) -> Vec3 {
        config.spawnpoint
    }

    fn on_player_changed_position(&self, _player: Uuid, _new_pos: BlockPos) {}

    /// The state to write when a player breaks a block. `None` leaves
    /// the world untouched.
    fn on_break_block(&self, _player: Uuid, _pos: BlockPos) -> Option<Identifier> {
        Some(Identifier::minecraft("air"))
    }

    fn on_use_item_on_block(&self, _player: Uuid, _packet: &UseItemOn) {}

    fn on_use_item(&self, _player: Uuid, _packet: &UseItem) {}

    fn on_chat_message(&self, _player: &str, _message: &str) -> ChatAction {
        ChatAction::Broadcast
    }

    fn on_command(&self, player: &str, command: &str) {
        log::info!("{} issued unhandled command /{}", player, command);
    }

    fn on_set_slot(&self, _player: Uuid, _slot: i16) {}

    fn on_select_hotbar_slot(&self, _player: Uuid, _slot: u8) {}

    /// 20 Hz dimension tick; reserved for entity motion synchronization.
    fn on_tick(&self) {}
}

/// The stock behavior: spawnpoint joins, air on break, chat broadcast.
pub struct DefaultBehavior;

impl DimensionBehavior for DefaultBehavior {}

#[derive(Clone, Debug)]
pub struct DimensionConfig {
    pub name: Identifier,
    /// The dimension-type data-pack identifier.
    pub kind: Identifier,
    /// Chunk radius streamed around each player.
    pub view_distance: i32,
    pub spawnpoint: Vec3,
    pub is_flat: bool,
    pub sea_level: i32,
    pub section_count: usize,
    pub min_y: i32,
}

impl DimensionConfig {
    pub fn overworld_like(name: Identifier, kind: Identifier) -> DimensionConfig {
        DimensionConfig {
            name,
            kind,
            view_distance: 4,
            spawnpoint: Vec3::new(8.5, 65.0, 8.5),
            is_flat: false,
            sea_level: 63,
            section_count: 24,
            min_y: -64,
        }
    }
}

enum EntityRecord {
    Npc(EntityState),
    PlayerRef(Uuid),
}

struct DimensionState {
    chunks: HashMap<(i32, i32), Option<Chunk>>,
    provider: Box<dyn ChunkProvider>,
    players: Vec<Arc<Player>>,
    entities: HashMap<i32, EntityRecord>,
    next_entity_id: i32,
}

struct DimensionWire {
    biome_id: i32,
    empty_chunk: Vec<u8>,
}

/// A self-contained world: chunk cache + provider, players, entities,
/// and the streaming/fan-out logic that keeps clients in sync.
pub struct Dimension {
    pub config: DimensionConfig,
    behavior: Box<dyn DimensionBehavior>,
    states: Arc<BlockStates>,
    air_state: i32,
    player_entity_type: i32,
    state: Mutex<DimensionState>,
    wire: OnceLock<DimensionWire>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

impl Dimension {
    pub fn new(
        config: DimensionConfig,
        behavior: Box<dyn DimensionBehavior>,
        provider: Box<dyn ChunkProvider>,
        registry: &Registry,
    ) -> Arc<Dimension> {
        let states = registry.shared_block_states();
        let air_state = states
            .default_state(&Identifier::minecraft("air"))
            .unwrap_or(0);
        let player_entity_type = registry
            .id_of(
                &Identifier::minecraft("entity_type"),
                &Identifier::minecraft("player"),
            )
            .unwrap_or(0);
        Arc::new(Dimension {
            config,
            behavior,
            states,
            air_state,
            player_entity_type,
            state: Mutex::new(DimensionState {
                chunks: HashMap::new(),
                provider,
                players: Vec::new(),
                entities: HashMap::new(),
                next_entity_id: 1,
            }),
            wire: OnceLock::new(),
            tick_task: Mutex::new(None),
        })
    }

    /// Resolves post-finalize registry ids (the plains biome) and builds
    /// the reusable empty-chunk payload. Called by the server before
    /// listening.
    pub fn finish_setup(&self, registry: &Registry) {
        let biome_id = registry
            .id_of(
                &Identifier::new("minecraft:worldgen/biome").expect("static identifier"),
                &Identifier::minecraft("plains"),
            )
            .unwrap_or(0);
        let empty_chunk =
            Chunk::new(self.config.section_count, self.config.min_y, self.air_state)
                .to_wire(biome_id);
        let _ = self.wire.set(DimensionWire {
            biome_id,
            empty_chunk,
        });
    }

    fn wire(&self) -> &DimensionWire {
        self.wire.get_or_init(|| DimensionWire {
            biome_id: 0,
            empty_chunk: Chunk::new(self.config.section_count, self.config.min_y, self.air_state)
                .to_wire(0),
        })
    }

    pub async fn allocate_entity_id(&self) -> i32 {
        let mut state = self.state.lock().await;
        let id = state.next_entity_id;
        state.next_entity_id += 1;
        id
    }

    pub async fn player_count(&self) -> usize {
        self.state.lock().await.players.len()
    }

    pub async fn players(&self) -> Vec<Arc<Player>> {
        self.state.lock().await.players.clone()
    }

    /// The §4.6 join sequence: introduce peers, replay entities, spawn,
    /// fan out, synchronize around the initial chunk burst.
    pub async fn add_player(self: &Arc<Self>, player: Arc<Player>) -> anyhow::Result<()> {
        let existing = self.players().await;

        // Existing players' tab entries and metadata, plus listener
        // registration so their updates reach us.
        self.introduce_players(&player, &existing).await?;

        // Existing entities, peer players included once we are in the
        // map ourselves; here that is every current record.
        let entity_buffers = self.entity_spawn_buffers().await?;
        for buffer in &entity_buffers {
            player.sink.send_raw(buffer).await?;
        }

        {
            let mut state = self.state.lock().await;
            state.players.push(player.clone());
        }
        let entity_id = { player.state.lock().await.entity_id };
        {
            let mut state = self.state.lock().await;
            state.entities.insert(entity_id, EntityRecord::PlayerRef(player.uuid));
        }

        let spawn = self.behavior.on_player_joined(&self.config);
        {
            let mut state = player.state.lock().await;
            state.position = spawn;
            state.block_pos = spawn.block_pos();
            state.chunk = PlayerState::chunk_of(spawn);
        }

        // Every player (self included, for its own tab entry) learns the
        // joiner; peers additionally get the entity spawn.
        let everyone = self.players().await;
        let add_entity = self.player_spawn_buffer(&player).await?;
        for peer in &everyone {
            self.introduce_players(peer, &[player.clone()]).await?;
            if peer.uuid != player.uuid {
                peer.sink.send_raw(&add_entity).await?;
            }
        }

        player.synchronize_position().await?;

        let chunk = { player.state.lock().await.chunk };
        self.on_player_changed_chunk(&player, chunk.0, chunk.1, true)
            .await?;

        // Guard against the client sliding into the void while the
        // chunk burst streamed.
        player.synchronize_position().await?;
        Ok(())
    }

    /// Tab entry + entity metadata for each of `list`, delivered to
    /// `target`; also registers `target` as a listener on each peer so
    /// peer movement reaches it.
    async fn introduce_players(
        &self,
        target: &Arc<Player>,
        list: &[Arc<Player>],
    ) -> anyhow::Result<()> {
        for peer in list {
            let (entity_id, metadata) = {
                let state = peer.state.lock().await;
                (state.entity_id, state.metadata())
            };
            let info = PlayerInfoUpdate {
                entries: vec![PlayerInfoEntry {
                    uuid: peer.uuid,
                    name: peer.username.clone(),
                    properties: peer.profile.properties.clone(),
                    listed: true,
                }],
            };
            target.sink.send(&info).await?;
            target
                .sink
                .send(&SetEntityData {
                    entity_id,
                    data: metadata,
                })
                .await?;
            if peer.uuid != target.uuid {
                peer.add_listener(Arc::downgrade(target)).await;
            }
        }
        Ok(())
    }

    async fn player_spawn_buffer(&self, player: &Arc<Player>) -> anyhow::Result<Vec<u8>> {
        let state = player.state.lock().await;
        Ok(packet_buffer(&AddEntity {
            entity_id: state.entity_id,
            uuid: player.uuid,
            entity_type: self.player_entity_type,
            position: state.position,
            pitch: quantize_angle(state.pitch),
            yaw: quantize_angle(state.yaw),
            head_yaw: quantize_angle(state.yaw),
            data: 0,
            velocity: (0, 0, 0),
        })?)
    }

    async fn entity_spawn_buffers(&self) -> anyhow::Result<Vec<Vec<u8>>> {
        let records: Vec<(i32, Option<Uuid>)> = {
            let state = self.state.lock().await;
            state
                .entities
                .iter()
                .map(|(id, record)| match record {
                    EntityRecord::Npc(_) => (*id, None),
                    EntityRecord::PlayerRef(uuid) => (*id, Some(*uuid)),
                })
                .collect()
        };

        let mut buffers = Vec::with_capacity(records.len());
        for (entity_id, player_uuid) in records {
            match player_uuid {
                Some(uuid) => {
                    let peer = {
                        let state = self.state.lock().await;
                        state.players.iter().find(|p| p.uuid == uuid).cloned()
                    };
                    if let Some(peer) = peer {
                        buffers.push(self.player_spawn_buffer(&peer).await?);
                    }
                }
                None => {
                    let state = self.state.lock().await;
                    if let Some(EntityRecord::Npc(entity)) = state.entities.get(&entity_id) {
                        buffers.push(packet_buffer(&AddEntity {
                            entity_id,
                            uuid: entity.uuid,
                            entity_type: entity.entity_type,
                            position: entity.position,
                            pitch: quantize_angle(entity.pitch),
                            yaw: quantize_angle(entity.yaw),
                            head_yaw: quantize_angle(entity.yaw),
                            data: 0,
                            velocity: (0, 0, 0),
                        })?);
                    }
                }
            }
        }
        Ok(buffers)
    }

    pub async fn remove_player(&self, player: &Arc<Player>) -> anyhow::Result<()> {
        let entity_id = { player.state.lock().await.entity_id };
        let remaining = {
            let mut state = self.state.lock().await;
            state.players.retain(|p| p.uuid != player.uuid);
            state.entities.remove(&entity_id);
            state.players.clone()
        };

        let info_remove = packet_buffer(&PlayerInfoRemove {
            uuids: vec![player.uuid],
        })?;
        let remove_entities = packet_buffer(&RemoveEntities {
            entity_ids: vec![entity_id],
        })?;
        for peer in &remaining {
            let _ = peer.sink.send_raw(&info_remove).await;
            let _ = peer.sink.send_raw(&remove_entities).await;
            // Scrub the weak listening links in both directions.
            peer.remove_listener(player.uuid).await;
            player.remove_listener(peer.uuid).await;
        }

        player.state.lock().await.entity_id = 0;
        Ok(())
    }

    /// Movement bookkeeping: block transition, then chunk transition,
    /// then shadow update.
    pub async fn on_player_moved(&self, player: &Arc<Player>) -> anyhow::Result<()> {
        let (new_block, old_block, old_chunk) = {
            let state = player.state.lock().await;
            (state.position.block_pos(), state.block_pos, state.chunk)
        };
        if new_block == old_block {
            return Ok(());
        }
        self.behavior.on_player_changed_position(player.uuid, new_block);

        let new_chunk = (new_block.x >> 4, new_block.z >> 4);
        if new_chunk != old_chunk {
            self.on_player_changed_chunk(player, new_chunk.0, new_chunk.1, false)
                .await?;
        }

        let mut state = player.state.lock().await;
        state.block_pos = new_block;
        state.chunk = new_chunk;
        Ok(())
    }

    /// Streams the view-distance square around the new center chunk,
    /// skipping chunks the previous square already delivered. The client
    /// accepts a `2r+7` window, hence the +3 margin.
    pub async fn on_player_changed_chunk(
        &self,
        player: &Arc<Player>,
        cx: i32,
        cz: i32,
        load_all: bool,
    ) -> anyhow::Result<()> {
        player.sink.send(&SetChunkCacheCenter { cx, cz }).await?;

        let radius = self.config.view_distance + 3;
        let previous = { player.state.lock().await.chunk };
        for x in (cx - radius)..=(cx + radius) {
            for z in (cz - radius)..=(cz + radius) {
                let newly_entered =
                    load_all || (x - previous.0).abs() > radius || (z - previous.1).abs() > radius;
                if !newly_entered {
                    continue;
                }
                let sections = self.chunk_wire(x, z).await?;
                player
                    .sink
                    .send(&LevelChunkWithLight {
                        cx: x,
                        cz: z,
                        sections,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    /// Cache-through chunk fetch; provider misses are cached as absent
    /// so the provider is asked exactly once per coordinate.
    async fn chunk_wire(&self, cx: i32, cz: i32) -> anyhow::Result<Vec<u8>> {
        let biome_id = self.wire().biome_id;
        let mut state = self.state.lock().await;
        if !state.chunks.contains_key(&(cx, cz)) {
            let loaded = state.provider.load(cx, cz)?;
            state.chunks.insert((cx, cz), loaded);
        }
        Ok(match state.chunks.get(&(cx, cz)).and_then(Option::as_ref) {
            Some(chunk) => chunk.to_wire(biome_id),
            None => self.wire().empty_chunk.clone(),
        })
    }

    /// Resolves a block identifier to its default state and writes it,
    /// fanning `block_update` out to every player in the dimension.
    pub async fn set_block(&self, pos: BlockPos, block: &Identifier) -> anyhow::Result<()> {
        let state_id = self
            .states
            .default_state(block)
            .ok_or_else(|| anyhow::anyhow!("unknown block {}", block))?;
        self.set_block_state(pos, state_id).await
    }

    pub async fn set_block_state(&self, pos: BlockPos, state_id: i32) -> anyhow::Result<()> {
        let (cx, cz) = (pos.x >> 4, pos.z >> 4);
        {
            let mut state = self.state.lock().await;
            if !state.chunks.contains_key(&(cx, cz)) {
                let loaded = state.provider.load(cx, cz)?;
                state.chunks.insert((cx, cz), loaded);
            }
            let slot = state.chunks.get_mut(&(cx, cz)).expect("just inserted");
            let chunk = slot.get_or_insert_with(|| {
                Chunk::new(self.config.section_count, self.config.min_y, self.air_state)
            });
            chunk.set_block(pos, state_id)?;
        }

        let buffer = packet_buffer(&BlockUpdate { pos, state_id })?;
        self.broadcast_raw(&buffer).await;
        Ok(())
    }

    pub fn behavior(&self) -> &dyn DimensionBehavior {
        self.behavior.as_ref()
    }

    pub fn block_states(&self) -> &Arc<BlockStates> {
        &self.states
    }

    async fn broadcast_raw(&self, buffer: &[u8]) {
        for peer in self.players().await {
            if let Err(err) = peer.sink.send_raw(buffer).await {
                log::debug!("Dropping broadcast to {}: {}", peer.username, err);
            }
        }
    }

    pub async fn broadcast_packet<P: ClientboundPacket>(&self, packet: &P) -> anyhow::Result<()> {
        let buffer = packet_buffer(packet)?;
        self.broadcast_raw(&buffer).await;
        Ok(())
    }

    pub async fn broadcast_system_message(&self, text: &Text) -> anyhow::Result<()> {
        self.broadcast_packet(&SystemChat {
            content: text.to_raw_nbt(),
            overlay: false,
        })
        .await
    }

    pub async fn broadcast_chat(&self, sender: &str, message: &str) -> anyhow::Result<()> {
        self.broadcast_chat_typed(sender, message, CHAT_TYPE_CHAT).await
    }

    /// Relays chat under an arbitrary chat-type holder id (registry id
    /// plus one).
    pub async fn broadcast_chat_typed(
        &self,
        sender: &str,
        message: &str,
        chat_type: i32,
    ) -> anyhow::Result<()> {
        self.broadcast_packet(&DisguisedChat {
            message: Text::literal(message).to_raw_nbt(),
            chat_type,
            sender_name: Text::literal(sender).to_raw_nbt(),
        })
        .await
    }

    /// Spawns a non-player entity and announces it to every player.
    pub async fn spawn_entity(
        &self,
        kind: Identifier,
        entity_type: i32,
        position: Vec3,
    ) -> anyhow::Result<i32> {
        let entity_id = self.allocate_entity_id().await;
        let entity = EntityState::new(entity_id, kind, entity_type, position);
        let buffer = packet_buffer(&AddEntity {
            entity_id,
            uuid: entity.uuid,
            entity_type,
            position,
            pitch: 0,
            yaw: 0,
            head_yaw: 0,
            data: 0,
            velocity: (0, 0, 0),
        })?;
        {
            let mut state = self.state.lock().await;
            state.entities.insert(entity_id, EntityRecord::Npc(entity));
        }
        self.broadcast_raw(&buffer).await;
        Ok(entity_id)
    }

    /// The 20 Hz tick. Player positions arrive via movement packets and
    /// are deliberately not advanced here.
    pub fn start_tick(self: &Arc<Self>) {
        let dimension = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(50));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                dimension.behavior.on_tick();
            }
        });
        if let Ok(mut slot) = self.tick_task.try_lock() {
            *slot = Some(handle);
        }
    }

    pub async fn stop_tick(&self) {
        if let Some(handle) = self.tick_task.lock().await.take() {
            handle.abort();
        }
    }
}
