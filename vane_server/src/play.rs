//! Play-phase serverbound handlers.

use crate::connection::Connection;
use crate::dimension::{ChatAction, Dimension};
use crate::player::{Item, Player};
use std::sync::Arc;
use vane_registry::client_bound::play::{
    Animate, BlockChangedAck, PongResponse, RotateHead, SetEntityData, TeleportEntity,
    ANIMATE_SWING_MAIN_ARM, ANIMATE_SWING_OFFHAND,
};
use vane_registry::packet_buffer;
use vane_registry::server_bound::configuration::ClientInformation;
use vane_registry::server_bound::play::{
    player_action, player_command, PlayerAction, ServerboundPlay, UseItem, UseItemOn,
    FLAG_AGAINST_WALL, FLAG_ON_GROUND,
};
use vane_serializer::{clamp_pitch, quantize_angle, wrap_yaw, Vec3};

const MAX_CHAT_LENGTH: usize = 256;
const MAX_COMMAND_LENGTH: usize = 32767;

impl Connection {
    pub(crate) async fn handle_play(&mut self, packet: ServerboundPlay) -> anyhow::Result<()> {
        match packet {
            ServerboundPlay::KeepAlive { id } => {
                let mut tracker = self.keepalive.lock().await;
                if id == tracker.id {
                    tracker.received = true;
                } else {
                    log::debug!(
                        "Dropping keep-alive {} while waiting for {}",
                        id,
                        tracker.id
                    );
                }
                Ok(())
            }
            ServerboundPlay::AcceptTeleportation { id } => {
                let player = self.require_player()?;
                let mut state = player.state.lock().await;
                if id == state.current_teleport_id {
                    state.teleport_acknowledged = true;
                }
                Ok(())
            }
            ServerboundPlay::Chat(chat) => {
                if chat.message.len() > MAX_CHAT_LENGTH {
                    anyhow::bail!("chat message over {} bytes", MAX_CHAT_LENGTH);
                }
                let player = self.require_player()?;
                let dimension = self.current_dimension().await?;
                match dimension.behavior().on_chat_message(&player.username, &chat.message) {
                    ChatAction::Broadcast => {
                        dimension.broadcast_chat(&player.username, &chat.message).await
                    }
                    ChatAction::Suppress => Ok(()),
                }
            }
            ServerboundPlay::ChatCommand { command } => {
                if command.len() > MAX_COMMAND_LENGTH {
                    anyhow::bail!("command over {} bytes", MAX_COMMAND_LENGTH);
                }
                let player = self.require_player()?;
                let dimension = self.current_dimension().await?;
                dimension.behavior().on_command(&player.username, &command);
                Ok(())
            }
            ServerboundPlay::ClientInformation(info) => self.handle_client_information(info).await,
            ServerboundPlay::CustomPayload(payload) => {
                log::trace!("Play plugin message on {}", payload.channel);
                Ok(())
            }
            ServerboundPlay::MovePlayerPos { x, y, z, flags } => {
                self.handle_movement(Some(Vec3::new(x, y, z)), None, flags)
                    .await
            }
            ServerboundPlay::MovePlayerPosRot {
                x,
                y,
                z,
                yaw,
                pitch,
                flags,
            } => {
                self.handle_movement(Some(Vec3::new(x, y, z)), Some((yaw, pitch)), flags)
                    .await
            }
            ServerboundPlay::MovePlayerRot { yaw, pitch, flags } => {
                self.handle_movement(None, Some((yaw, pitch)), flags).await
            }
            ServerboundPlay::MovePlayerStatusOnly { flags } => {
                let player = self.require_player()?;
                let mut state = player.state.lock().await;
                state.on_ground = flags & FLAG_ON_GROUND != 0;
                state.against_wall = flags & FLAG_AGAINST_WALL != 0;
                Ok(())
            }
            ServerboundPlay::PingRequest { payload } => {
                self.sink.send(&PongResponse { payload }).await
            }
            ServerboundPlay::PlayerAbilities { flags } => {
                log::debug!("Player abilities flags {:#04x}", flags);
                Ok(())
            }
            ServerboundPlay::PlayerAction(action) => self.handle_player_action(action).await,
            ServerboundPlay::PlayerCommand { action, .. } => {
                self.handle_player_command(action).await
            }
            ServerboundPlay::SetCarriedItem { slot } => {
                let player = self.require_player()?;
                let dimension = self.current_dimension().await?;
                let slot = slot.clamp(0, 8) as u8;
                player.state.lock().await.selected_slot = slot;
                dimension.behavior().on_select_hotbar_slot(player.uuid, slot);
                Ok(())
            }
            ServerboundPlay::SetCreativeModeSlot { slot, item } => {
                let player = self.require_player()?;
                let dimension = self.current_dimension().await?;
                player.state.lock().await.inventory.insert(slot, Item(item));
                dimension.behavior().on_set_slot(player.uuid, slot);
                Ok(())
            }
            ServerboundPlay::Swing { hand } => {
                let player = self.require_player()?;
                let entity_id = { player.state.lock().await.entity_id };
                let action = if hand == 0 {
                    ANIMATE_SWING_MAIN_ARM
                } else {
                    ANIMATE_SWING_OFFHAND
                };
                let buffer = packet_buffer(&Animate { entity_id, action })?;
                player.send_to_listeners(&[buffer]).await;
                Ok(())
            }
            ServerboundPlay::UseItemOn(packet) => self.handle_use_item_on(packet).await,
            ServerboundPlay::UseItem(packet) => self.handle_use_item(packet).await,
        }
    }

    /// Shared body of the four movement packets. Movement before the
    /// pending teleport acknowledgment is dropped wholesale.
    async fn handle_movement(
        &mut self,
        new_position: Option<Vec3>,
        rotation: Option<(f32, f32)>,
        flags: u8,
    ) -> anyhow::Result<()> {
        let player = self.require_player()?;
        let (teleport, rotate) = {
            let mut state = player.state.lock().await;
            if !state.teleport_acknowledged {
                return Ok(());
            }
            if let Some(position) = new_position {
                state.position = position;
            }
            if let Some((yaw, pitch)) = rotation {
                state.yaw = wrap_yaw(yaw);
                state.pitch = clamp_pitch(pitch);
            }
            state.on_ground = flags & FLAG_ON_GROUND != 0;
            state.against_wall = flags & FLAG_AGAINST_WALL != 0;
            (
                TeleportEntity {
                    entity_id: state.entity_id,
                    position: state.position,
                    velocity: Vec3::default(),
                    yaw: state.yaw,
                    pitch: state.pitch,
                    on_ground: state.on_ground,
                },
                RotateHead {
                    entity_id: state.entity_id,
                    head_yaw: quantize_angle(state.yaw),
                },
            )
        };

        let buffers = vec![packet_buffer(&teleport)?, packet_buffer(&rotate)?];
        player.send_to_listeners(&buffers).await;

        if new_position.is_some() {
            let dimension = self.current_dimension().await?;
            dimension.on_player_moved(&player).await?;
        }
        Ok(())
    }

    async fn handle_client_information(&mut self, info: ClientInformation) -> anyhow::Result<()> {
        let player = self.require_player()?;
        let (changed, entity_id, metadata) = {
            let mut state = player.state.lock().await;
            let layers = info.masked_layers();
            let hand = info.normalized_hand();
            let changed = state.skin.layers != layers || state.skin.main_hand != hand;
            state.skin.layers = layers;
            state.skin.main_hand = hand;
            (changed, state.entity_id, state.metadata())
        };
        if changed {
            let buffer = packet_buffer(&SetEntityData {
                entity_id,
                data: metadata.clone(),
            })?;
            player.send_to_listeners(&[buffer]).await;
            // The client addresses its own entity as id 0.
            player
                .sink
                .send(&SetEntityData {
                    entity_id: 0,
                    data: metadata,
                })
                .await?;
        }
        Ok(())
    }

    async fn handle_player_action(&mut self, action: PlayerAction) -> anyhow::Result<()> {
        let player = self.require_player()?;
        let dimension = self.current_dimension().await?;
        if action.action == player_action::START_DESTROY_BLOCK {
            if let Some(block) = dimension.behavior().on_break_block(player.uuid, action.pos) {
                dimension.set_block(action.pos, &block).await?;
            }
        }
        self.sink
            .send(&BlockChangedAck {
                sequence: action.sequence,
            })
            .await
    }

    async fn handle_player_command(&mut self, action: i32) -> anyhow::Result<()> {
        let player = self.require_player()?;
        let (entity_id, metadata) = {
            let mut state = player.state.lock().await;
            match action {
                player_command::PRESS_SHIFT_KEY => state.sneaking = true,
                player_command::RELEASE_SHIFT_KEY => state.sneaking = false,
                player_command::START_SPRINTING => state.sprinting = true,
                player_command::STOP_SPRINTING => state.sprinting = false,
                other => {
                    log::debug!("Unhandled player command action {}", other);
                    return Ok(());
                }
            }
            (state.entity_id, state.metadata())
        };
        let buffer = packet_buffer(&SetEntityData {
            entity_id,
            data: metadata,
        })?;
        player.send_to_listeners(&[buffer]).await;
        Ok(())
    }

    async fn handle_use_item_on(&mut self, packet: UseItemOn) -> anyhow::Result<()> {
        let player = self.require_player()?;
        let dimension = self.current_dimension().await?;
        dimension.behavior().on_use_item_on_block(player.uuid, &packet);
        self.sink
            .send(&BlockChangedAck {
                sequence: packet.sequence,
            })
            .await
    }

    async fn handle_use_item(&mut self, packet: UseItem) -> anyhow::Result<()> {
        let player = self.require_player()?;
        let dimension = self.current_dimension().await?;
        dimension.behavior().on_use_item(player.uuid, &packet);
        self.sink
            .send(&BlockChangedAck {
                sequence: packet.sequence,
            })
            .await
    }

    fn require_player(&self) -> anyhow::Result<Arc<Player>> {
        self.player
            .clone()
            .ok_or_else(|| anyhow::anyhow!("play packet before the player exists"))
    }

    async fn current_dimension(&self) -> anyhow::Result<Arc<Dimension>> {
        let player = self.require_player()?;
        let name = { player.state.lock().await.dimension.clone() };
        self.shared
            .dimension(&name)
            .ok_or_else(|| anyhow::anyhow!("player in unknown dimension {}", name))
    }
}
