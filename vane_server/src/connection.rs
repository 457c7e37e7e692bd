use crate::auth::{self, AuthError};
use crate::player::{Player, Skin};
use crate::server::{JoinDecision, LoginDecision, ServerShared, StatusContext};
use crate::sink::PacketSink;
use crate::text::Text;
use rand::RngCore;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vane_buffer::{PacketBuffer, ReadOutcome};
use vane_registry::client_bound::configuration as cb_config;
use vane_registry::client_bound::login as cb_login;
use vane_registry::client_bound::play as cb_play;
use vane_registry::client_bound::status as cb_status;
use vane_registry::server_bound::configuration::{
    ClientInformation, ServerboundConfiguration,
};
use vane_registry::server_bound::handshaking::{Intention, NextState, ServerboundHandshake};
use vane_registry::server_bound::login::{Hello, Key, ServerboundLogin};
use vane_registry::server_bound::play::ServerboundPlay;
use vane_registry::server_bound::status::ServerboundStatus;
use vane_registry::shared::{GameProfile, KnownPack};
use vane_registry::{Error as PacketError, ProtocolState, PROTOCOL_VERSION, VERSION_NAME};
use vane_serializer::{Deserialize, Identifier, Serialize, VarInt};

const KEEP_ALIVE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15);
const LEGACY_PING_OPENER: u8 = 0xFE;

/// The per-connection protocol states. The wait-ack refinements accept a
/// single acknowledgment packet and reject everything else.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum ConnectionState {
    Handshake,
    Status,
    Login,
    LoginWaitEncrypt,
    LoginWaitAck,
    Configuration,
    ConfigurationWaitAck,
    Play,
    Closed,
}

/// Keep-alive bookkeeping shared with the timer task. `pending` is false
/// only before the first keep-alive goes out.
pub(crate) struct KeepAliveTracker {
    pub id: i64,
    pub received: bool,
    pub pending: bool,
}

pub(crate) struct Connection {
    pub(crate) shared: Arc<ServerShared>,
    addr: SocketAddr,
    read: tokio::net::tcp::OwnedReadHalf,
    pub(crate) buffer: PacketBuffer,
    pub(crate) sink: PacketSink,
    pub(crate) state: ConnectionState,
    protocol_version: i32,
    verify_token: Option<[u8; 4]>,
    pending_login: Option<String>,
    profile: Option<GameProfile>,
    client_info: Option<ClientInformation>,
    pub(crate) player: Option<Arc<Player>>,
    pub(crate) keepalive: Arc<Mutex<KeepAliveTracker>>,
    keepalive_task: Option<JoinHandle<()>>,
}

impl Connection {
    /// Drives one socket from accept to close. Never returns an error;
    /// failures are logged, answered with a best-effort disconnect, and
    /// end in cleanup.
    pub(crate) async fn run(shared: Arc<ServerShared>, stream: TcpStream, addr: SocketAddr) {
        let (read, write) = stream.into_split();
        let sink = PacketSink::new(write);
        shared.sinks.lock().await.push(sink.clone());

        let mut connection = Connection {
            shared,
            addr,
            read,
            buffer: PacketBuffer::new(),
            sink,
            state: ConnectionState::Handshake,
            protocol_version: 0,
            verify_token: None,
            pending_login: None,
            profile: None,
            client_info: None,
            player: None,
            keepalive: Arc::new(Mutex::new(KeepAliveTracker {
                id: 0,
                received: false,
                pending: false,
            })),
            keepalive_task: None,
        };

        if let Err(err) = connection.drive().await {
            log::error!("Connection error for {}: {:#}", connection.addr, err);
            connection.disconnect_internal_error().await;
        }
        connection.cleanup().await;
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        // The legacy 1.6 ping opens with 0xFE, which never forms a valid
        // frame; sniff the first byte before waiting for one.
        loop {
            if self.buffer.decoded_len() > 0 {
                break;
            }
            if self.buffer.read_some(&mut self.read).await? == 0 {
                return Ok(());
            }
        }
        if self.buffer.first_byte() == Some(LEGACY_PING_OPENER) {
            return self.handle_legacy_ping().await;
        }

        loop {
            match self.buffer.read_to_next_packet(&mut self.read).await? {
                ReadOutcome::Closed => return Ok(()),
                ReadOutcome::PacketReady => {}
            }
            let mut reader = self.buffer.packet_reader()?;
            let id = VarInt::deserialize(&mut reader)?;
            self.handle_packet(id, &mut reader).await?;
            if self.state == ConnectionState::Closed {
                return Ok(());
            }
        }
    }

    async fn handle_packet(
        &mut self,
        id: VarInt,
        reader: &mut Cursor<Vec<u8>>,
    ) -> anyhow::Result<()> {
        match self.state {
            ConnectionState::Handshake => {
                let ServerboundHandshake::Intention(intention) =
                    ServerboundHandshake::decode(id, reader)?;
                self.handle_intention(intention).await
            }
            ConnectionState::Status => match ServerboundStatus::decode(id, reader)? {
                ServerboundStatus::StatusRequest(_) => self.handle_status_request().await,
                ServerboundStatus::PingRequest(ping) => {
                    self.sink
                        .send(&cb_status::PongResponse {
                            payload: ping.payload,
                        })
                        .await
                }
            },
            ConnectionState::Login => match ServerboundLogin::decode(id, reader)? {
                ServerboundLogin::Hello(hello) => self.handle_hello(hello).await,
                other => Err(unexpected(ProtocolState::Login, other.id())),
            },
            ConnectionState::LoginWaitEncrypt => match ServerboundLogin::decode(id, reader)? {
                ServerboundLogin::Key(key) => self.handle_key(key).await,
                other => Err(unexpected(ProtocolState::Login, other.id())),
            },
            ConnectionState::LoginWaitAck => match ServerboundLogin::decode(id, reader)? {
                ServerboundLogin::LoginAcknowledged => self.handle_login_acknowledged().await,
                other => Err(unexpected(ProtocolState::Login, other.id())),
            },
            ConnectionState::Configuration => {
                match ServerboundConfiguration::decode(id, reader)? {
                    ServerboundConfiguration::ClientInformation(info) => {
                        self.client_info = Some(info);
                        Ok(())
                    }
                    ServerboundConfiguration::CustomPayload(payload) => {
                        log::trace!("Configuration plugin message on {}", payload.channel);
                        Ok(())
                    }
                    ServerboundConfiguration::KeepAlive { .. } => Ok(()),
                    ServerboundConfiguration::SelectKnownPacks(packs) => {
                        self.handle_select_known_packs(packs.packs).await
                    }
                    other @ ServerboundConfiguration::FinishConfiguration => {
                        Err(unexpected(ProtocolState::Configuration, other.id()))
                    }
                }
            }
            ConnectionState::ConfigurationWaitAck => {
                match ServerboundConfiguration::decode(id, reader)? {
                    ServerboundConfiguration::FinishConfiguration => {
                        self.handle_finish_configuration().await
                    }
                    other => Err(unexpected(ProtocolState::Configuration, other.id())),
                }
            }
            ConnectionState::Play => {
                let packet = ServerboundPlay::decode(id, reader)?;
                self.handle_play(packet).await
            }
            ConnectionState::Closed => Ok(()),
        }
    }

    // ── Handshake ───────────────────────────────────────────────────

    async fn handle_intention(&mut self, intention: Intention) -> anyhow::Result<()> {
        log::debug!(
            "Handshake from {}: protocol {}, {}:{}, next {:?}",
            self.addr,
            intention.protocol_version,
            intention.host_name,
            intention.port,
            intention.next_state
        );
        self.protocol_version = intention.protocol_version;
        match intention.next_state {
            NextState::Status => {
                self.state = ConnectionState::Status;
                Ok(())
            }
            NextState::Login => {
                self.state = ConnectionState::Login;
                if intention.protocol_version != PROTOCOL_VERSION {
                    self.disconnect_login(&Text::translate(
                        "multiplayer.disconnect.outdated_client",
                    ))
                    .await?;
                }
                Ok(())
            }
            NextState::Transfer(_) => {
                self.state = ConnectionState::Login;
                self.disconnect_login(&Text::translate(
                    "multiplayer.disconnect.transfers_disabled",
                ))
                .await
            }
        }
    }

    // ── Status ──────────────────────────────────────────────────────

    async fn handle_status_request(&mut self) -> anyhow::Result<()> {
        let context = StatusContext {
            protocol_version: self.protocol_version,
            online_players: self.shared.online_count().await,
            max_players: self.shared.properties.max_players,
        };
        let status = (self.shared.callbacks.get_status)(&context);
        self.sink
            .send(&cb_status::StatusResponse {
                json: status.to_json(),
            })
            .await
    }

    /// The pre-framing 1.6 server-list ping: consume the fixed opener,
    /// answer with the `§1`-separated UTF-16BE kick string, close.
    async fn handle_legacy_ping(&mut self) -> anyhow::Result<()> {
        let consumed = self.buffer.drain_raw(self.buffer.decoded_len());
        log::debug!(
            "Legacy ping from {} ({} bytes)",
            self.addr,
            consumed.len()
        );

        let motd = self
            .shared
            .properties
            .motd
            .text
            .clone()
            .unwrap_or_else(|| "A Minecraft Server".to_string());
        let online = self.shared.online_count().await;
        let payload = [
            "§1".to_string(),
            "127".to_string(),
            VERSION_NAME.to_string(),
            motd,
            online.to_string(),
            self.shared.properties.max_players.to_string(),
        ]
        .join("\0");

        let units: Vec<u16> = payload.encode_utf16().collect();
        let mut response = vec![0xFFu8];
        response.extend_from_slice(&(units.len() as u16).to_be_bytes());
        for unit in units {
            response.extend_from_slice(&unit.to_be_bytes());
        }
        self.sink.send_unframed(&response).await?;
        self.close().await;
        Ok(())
    }

    // ── Login ───────────────────────────────────────────────────────

    async fn handle_hello(&mut self, hello: Hello) -> anyhow::Result<()> {
        log::info!(
            "Login start from {}: {} ({})",
            self.addr,
            hello.name,
            hello.profile_id
        );

        if !self.shared.properties.online_mode {
            match (self.shared.callbacks.on_login)(&hello.name, None) {
                LoginDecision::Deny(reason) => return self.disconnect_login(&reason).await,
                LoginDecision::Allow => {}
            }
            let profile = GameProfile::offline(Uuid::new_v4(), hello.name);
            return self.finish_login(profile).await;
        }

        let key = self
            .shared
            .key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("online mode without a server key"))?;

        let mut verify_token = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut verify_token);
        self.verify_token = Some(verify_token);
        self.pending_login = Some(hello.name);

        self.sink
            .send(&cb_login::Hello {
                server_id: String::new(),
                public_key: key.public_der.clone(),
                verify_token: verify_token.to_vec(),
                should_authenticate: true,
            })
            .await?;
        self.state = ConnectionState::LoginWaitEncrypt;
        Ok(())
    }

    async fn handle_key(&mut self, key: Key) -> anyhow::Result<()> {
        let server_key = self
            .shared
            .key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("encryption response without a server key"))?;

        let echoed_token = vane_crypto::decrypt(&server_key.private, &key.verify_token)?;
        let expected = self
            .verify_token
            .take()
            .ok_or_else(|| anyhow::anyhow!("encryption response without a pending token"))?;
        if echoed_token != expected {
            log::warn!("Verify token mismatch from {}", self.addr);
            return self
                .disconnect_login(&Text::literal("Invalid verify token"))
                .await;
        }

        let shared_secret = vane_crypto::decrypt(&server_key.private, &key.shared_secret)?;
        let (encrypt, decrypt) = vane_buffer::cipher_pair(&shared_secret)?;
        self.sink.enable_encryption(encrypt).await;
        self.buffer.enable_decryption(decrypt);

        let server_hash = vane_crypto::login_digest(&shared_secret, &server_key.public_der);
        let username = self
            .pending_login
            .take()
            .ok_or_else(|| anyhow::anyhow!("encryption response without a pending login"))?;

        match auth::has_joined(&username, &server_hash).await {
            Ok(profile) => {
                match (self.shared.callbacks.on_login)(&profile.name, Some(profile.id)) {
                    LoginDecision::Deny(reason) => self.disconnect_login(&reason).await,
                    LoginDecision::Allow => self.finish_login(profile).await,
                }
            }
            Err(AuthError::Failed) => {
                self.disconnect_login(&Text::literal("Authentication failed"))
                    .await
            }
            Err(AuthError::Unavailable(detail)) => {
                log::warn!("Session server unavailable: {}", detail);
                self.disconnect_login(&Text::translate(
                    "disconnect.loginFailedInfo.serversUnavailable",
                ))
                .await
            }
        }
    }

    async fn finish_login(&mut self, profile: GameProfile) -> anyhow::Result<()> {
        self.sink
            .send(&cb_login::LoginFinished {
                profile: profile.clone(),
            })
            .await?;
        self.profile = Some(profile);
        self.state = ConnectionState::LoginWaitAck;
        Ok(())
    }

    async fn handle_login_acknowledged(&mut self) -> anyhow::Result<()> {
        self.state = ConnectionState::Configuration;

        let mut brand = Vec::new();
        self.shared.properties.brand.serialize(&mut brand)?;
        self.sink
            .send(&cb_config::CustomPayload {
                channel: Identifier::minecraft("brand"),
                data: brand,
            })
            .await?;
        self.sink
            .send(&cb_config::CustomReportDetails::default())
            .await?;
        self.sink.send(&cb_config::ServerLinks::default()).await?;
        self.sink
            .send(&cb_config::UpdateEnabledFeatures {
                features: vec![Identifier::minecraft("vanilla")],
            })
            .await?;
        self.sink
            .send(&cb_config::SelectKnownPacks {
                packs: vec![KnownPack::core(VERSION_NAME)],
            })
            .await
    }

    // ── Configuration ───────────────────────────────────────────────

    async fn handle_select_known_packs(&mut self, packs: Vec<KnownPack>) -> anyhow::Result<()> {
        let core = KnownPack::core(VERSION_NAME);
        if !packs.contains(&core) {
            return self
                .disconnect_config(&Text::translate("multiplayer.disconnect.outdated_client"))
                .await;
        }

        for buffer in self.shared.registry.network_data()? {
            self.sink.send_raw(buffer).await?;
        }
        self.sink.send_raw(self.shared.registry.network_tags()?).await?;
        self.sink.send(&cb_config::FinishConfiguration).await?;
        self.state = ConnectionState::ConfigurationWaitAck;
        Ok(())
    }

    async fn handle_finish_configuration(&mut self) -> anyhow::Result<()> {
        let profile = self
            .profile
            .clone()
            .ok_or_else(|| anyhow::anyhow!("configuration finished without a profile"))?;

        let dimension_name = match (self.shared.callbacks.on_join)(&profile) {
            JoinDecision::Deny(reason) => return self.disconnect_config(&reason).await,
            JoinDecision::Allow { dimension } => {
                dimension.unwrap_or_else(|| self.shared.default_dimension.clone())
            }
        };
        let dimension = self
            .shared
            .dimension(&dimension_name)
            .ok_or_else(|| anyhow::anyhow!("unknown dimension {}", dimension_name))?;

        let mut skin = Skin {
            layers: 0x7F,
            main_hand: 1,
            ..Skin::default()
        };
        if let Some(info) = &self.client_info {
            skin.layers = info.masked_layers();
            skin.main_hand = info.normalized_hand();
        }
        if let Some(textures) = profile.textures() {
            skin.texture = Some(textures.value.clone());
            skin.texture_signature = textures.signature.clone();
        }

        let player = Arc::new(Player::new(
            profile,
            skin,
            self.sink.clone(),
            dimension_name.clone(),
        ));
        let entity_id = dimension.allocate_entity_id().await;
        player.state.lock().await.entity_id = entity_id;

        self.shared
            .players
            .lock()
            .await
            .insert(player.uuid, Arc::clone(&player));
        self.player = Some(Arc::clone(&player));

        let dimension_type = self
            .shared
            .registry
            .id_of(
                &Identifier::minecraft("dimension_type"),
                &dimension.config.kind,
            )
            .unwrap_or(0);
        self.sink
            .send(&cb_play::Login {
                entity_id,
                hardcore: false,
                dimensions: self.shared.dimensions.keys().cloned().collect(),
                max_players: self.shared.properties.max_players,
                view_distance: dimension.config.view_distance,
                simulation_distance: dimension.config.view_distance,
                reduced_debug_info: false,
                show_death_screen: true,
                do_limited_crafting: false,
                dimension_type,
                dimension: dimension_name,
                seed: 0,
                game_mode: 1,
                previous_game_mode: -1,
                is_debug: false,
                is_flat: dimension.config.is_flat,
                portal_cooldown: 0,
                sea_level: dimension.config.sea_level,
                enforces_secure_chat: false,
            })
            .await?;
        self.sink
            .send(&cb_play::GameEvent {
                event: cb_play::GAME_EVENT_WAIT_FOR_CHUNKS,
                param: 0.0,
            })
            .await?;

        dimension.add_player(Arc::clone(&player)).await?;

        self.start_keepalive();
        self.state = ConnectionState::Play;
        log::info!("{} joined {}", player.username, self.addr);
        Ok(())
    }

    /// First keep-alive immediately, then every 15 seconds; a cycle that
    /// passes without the previous id being echoed disconnects.
    fn start_keepalive(&mut self) {
        let sink = self.sink.clone();
        let tracker = Arc::clone(&self.keepalive);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(KEEP_ALIVE_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let next_id = {
                    let mut state = tracker.lock().await;
                    if state.pending && !state.received {
                        log::info!("Keep-alive timeout; disconnecting");
                        drop(state);
                        let reason = Text::translate("disconnect.timeout");
                        let _ = sink
                            .send(&cb_play::Disconnect {
                                reason: reason.to_raw_nbt(),
                            })
                            .await;
                        sink.shutdown().await;
                        return;
                    }
                    state.id += 1;
                    state.received = false;
                    state.pending = true;
                    state.id
                };
                if sink.send(&cb_play::KeepAlive { id: next_id }).await.is_err() {
                    return;
                }
            }
        });
        self.keepalive_task = Some(handle);
    }

    // ── Disconnect and teardown ─────────────────────────────────────

    pub(crate) async fn disconnect_login(&mut self, reason: &Text) -> anyhow::Result<()> {
        let _ = self
            .sink
            .send(&cb_login::LoginDisconnect {
                reason_json: reason.to_json(),
            })
            .await;
        self.close().await;
        Ok(())
    }

    pub(crate) async fn disconnect_config(&mut self, reason: &Text) -> anyhow::Result<()> {
        let _ = self
            .sink
            .send(&cb_config::Disconnect {
                reason: reason.to_raw_nbt(),
            })
            .await;
        self.close().await;
        Ok(())
    }

    pub(crate) async fn disconnect_play(&mut self, reason: &Text) -> anyhow::Result<()> {
        let _ = self
            .sink
            .send(&cb_play::Disconnect {
                reason: reason.to_raw_nbt(),
            })
            .await;
        self.close().await;
        Ok(())
    }

    /// Handler failures end here: a best-effort phase-appropriate
    /// disconnect before the socket drops.
    async fn disconnect_internal_error(&mut self) {
        let reason = Text::literal("Internal server error");
        let result = match self.state {
            ConnectionState::Handshake
            | ConnectionState::Status
            | ConnectionState::Login
            | ConnectionState::LoginWaitEncrypt
            | ConnectionState::LoginWaitAck => self.disconnect_login(&reason).await,
            ConnectionState::Configuration | ConnectionState::ConfigurationWaitAck => {
                self.disconnect_config(&reason).await
            }
            ConnectionState::Play => self.disconnect_play(&reason).await,
            ConnectionState::Closed => Ok(()),
        };
        if let Err(err) = result {
            log::debug!("Best-effort disconnect failed: {}", err);
        }
    }

    async fn close(&mut self) {
        self.state = ConnectionState::Closed;
        self.sink.shutdown().await;
    }

    async fn cleanup(&mut self) {
        if let Some(task) = self.keepalive_task.take() {
            task.abort();
        }
        if let Some(player) = self.player.take() {
            let dimension_name = { player.state.lock().await.dimension.clone() };
            if let Some(dimension) = self.shared.dimension(&dimension_name) {
                if let Err(err) = dimension.remove_player(&player).await {
                    log::warn!("Failed to remove {} from {}: {}", player.username, dimension_name, err);
                }
            }
            self.shared.players.lock().await.remove(&player.uuid);
            log::info!("{} left", player.username);
        }
        self.sink.shutdown().await;
        let mut sinks = self.shared.sinks.lock().await;
        let own = &self.sink;
        sinks.retain(|sink| !sink.same(own));
    }
}

fn unexpected(state: ProtocolState, id: i32) -> anyhow::Error {
    PacketError::UnexpectedPacket(state, id).into()
}
