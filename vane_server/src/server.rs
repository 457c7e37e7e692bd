use crate::connection::Connection;
use crate::dimension::Dimension;
use crate::player::Player;
use crate::sink::PacketSink;
use crate::status::StatusResponse;
use crate::text::Text;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;
use vane_crypto::ServerPrivateKey;
use vane_gamedata::Registry;
use vane_registry::client_bound::play::{Disconnect, Respawn, RESPAWN_KEEP_ALL_DATA};
use vane_registry::packet_buffer;
use vane_registry::shared::GameProfile;
use vane_serializer::Identifier;

/// Process-wide properties the embedder sets before listening.
pub struct ServerProperties {
    pub online_mode: bool,
    pub motd: Text,
    pub max_players: i32,
    pub brand: String,
}

impl Default for ServerProperties {
    fn default() -> Self {
        ServerProperties {
            online_mode: true,
            motd: Text::literal("A vane server"),
            max_players: 20,
            brand: "vane".to_string(),
        }
    }
}

pub enum LoginDecision {
    Allow,
    Deny(Text),
}

pub enum JoinDecision {
    /// Proceed; `dimension` overrides the default when set.
    Allow { dimension: Option<Identifier> },
    Deny(Text),
}

/// What the status callback gets to look at.
pub struct StatusContext {
    pub protocol_version: i32,
    pub online_players: i32,
    pub max_players: i32,
}

pub type LoginCallback = Box<dyn Fn(&str, Option<Uuid>) -> LoginDecision + Send + Sync>;
pub type JoinCallback = Box<dyn Fn(&GameProfile) -> JoinDecision + Send + Sync>;
pub type StatusCallback = Box<dyn Fn(&StatusContext) -> StatusResponse + Send + Sync>;

pub(crate) struct Callbacks {
    pub on_login: LoginCallback,
    pub on_join: JoinCallback,
    pub get_status: StatusCallback,
}

pub(crate) struct ServerKey {
    pub private: ServerPrivateKey,
    pub public_der: Vec<u8>,
}

/// Everything the per-connection tasks share.
pub(crate) struct ServerShared {
    pub registry: Registry,
    pub properties: ServerProperties,
    pub dimensions: HashMap<Identifier, Arc<Dimension>>,
    pub default_dimension: Identifier,
    pub key: Option<ServerKey>,
    pub players: Mutex<HashMap<Uuid, Arc<Player>>>,
    pub sinks: Mutex<Vec<PacketSink>>,
    pub callbacks: Callbacks,
}

impl ServerShared {
    pub fn dimension(&self, name: &Identifier) -> Option<Arc<Dimension>> {
        self.dimensions.get(name).cloned()
    }

    pub async fn online_count(&self) -> i32 {
        self.players.lock().await.len() as i32
    }
}

/// The embedding surface: load a registry, add dimensions, install
/// callbacks, listen.
pub struct Server {
    registry: Registry,
    properties: ServerProperties,
    dimensions: HashMap<Identifier, Arc<Dimension>>,
    default_dimension: Option<Identifier>,
    callbacks: Callbacks,
}

impl Server {
    pub fn new(registry: Registry, properties: ServerProperties) -> Server {
        let motd = properties.motd.clone();
        let max_players = properties.max_players;
        Server {
            registry,
            properties,
            dimensions: HashMap::new(),
            default_dimension: None,
            callbacks: Callbacks {
                on_login: Box::new(|_, _| LoginDecision::Allow),
                on_join: Box::new(|_| JoinDecision::Allow { dimension: None }),
                get_status: Box::new(move |context| {
                    let mut status =
                        StatusResponse::basic(motd.clone(), context.online_players, max_players);
                    status.players.max = context.max_players;
                    status
                }),
            },
        }
    }

    /// Registers a dimension; the first one becomes the default.
    pub fn add_dimension(&mut self, dimension: Arc<Dimension>) {
        let name = dimension.config.name.clone();
        if self.default_dimension.is_none() {
            self.default_dimension = Some(name.clone());
        }
        self.dimensions.insert(name, dimension);
    }

    pub fn set_default_dimension(&mut self, name: Identifier) {
        self.default_dimension = Some(name);
    }

    pub fn on_login(&mut self, callback: LoginCallback) {
        self.callbacks.on_login = callback;
    }

    pub fn on_join(&mut self, callback: JoinCallback) {
        self.callbacks.on_join = callback;
    }

    pub fn get_status(&mut self, callback: StatusCallback) {
        self.callbacks.get_status = callback;
    }

    /// Finalizes the registry, generates the RSA key (online mode),
    /// binds, and starts accepting. Connections drive themselves on
    /// spawned tasks until `RunningServer::close`.
    pub async fn listen(mut self, bind: &str) -> anyhow::Result<RunningServer> {
        self.registry.finalize()?;

        let default_dimension = self
            .default_dimension
            .clone()
            .ok_or_else(|| anyhow::anyhow!("at least one dimension must be added before listen"))?;

        for dimension in self.dimensions.values() {
            dimension.finish_setup(&self.registry);
            dimension.start_tick();
        }

        let key = if self.properties.online_mode {
            let private = vane_crypto::new_key()?;
            let public_der = vane_crypto::public_key_to_der(&private);
            Some(ServerKey { private, public_der })
        } else {
            None
        };

        let listener = TcpListener::bind(bind).await?;
        let local_addr = listener.local_addr()?;
        log::info!("Listening on {}", local_addr);

        let shared = Arc::new(ServerShared {
            registry: self.registry,
            properties: self.properties,
            dimensions: self.dimensions,
            default_dimension,
            key,
            players: Mutex::new(HashMap::new()),
            sinks: Mutex::new(Vec::new()),
            callbacks: self.callbacks,
        });

        let accept_shared = Arc::clone(&shared);
        let accept = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        log::debug!("Accepted connection from {}", addr);
                        let shared = Arc::clone(&accept_shared);
                        tokio::spawn(Connection::run(shared, stream, addr));
                    }
                    Err(err) => {
                        log::warn!("Accept failed: {}", err);
                    }
                }
            }
        });

        Ok(RunningServer {
            shared,
            accept,
            local_addr,
        })
    }
}

/// A listening server. Dropping it leaves the tasks running; call
/// `close` to tear everything down.
pub struct RunningServer {
    pub(crate) shared: Arc<ServerShared>,
    accept: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn dimension(&self, name: &Identifier) -> Option<Arc<Dimension>> {
        self.shared.dimension(name)
    }

    pub async fn player(&self, uuid: Uuid) -> Option<Arc<Player>> {
        self.shared.players.lock().await.get(&uuid).cloned()
    }

    pub async fn player_count(&self) -> i32 {
        self.shared.online_count().await
    }

    /// Moves a player across dimensions: removal, respawn with kept
    /// data, then the full join sequence in the target.
    pub async fn transfer_dimension(
        &self,
        player: &Arc<Player>,
        target: &Arc<Dimension>,
    ) -> anyhow::Result<()> {
        let old_name = { player.state.lock().await.dimension.clone() };
        if let Some(old) = self.shared.dimension(&old_name) {
            old.remove_player(player).await?;
        }
        {
            player.state.lock().await.dimension = target.config.name.clone();
        }

        let dimension_type = self
            .shared
            .registry
            .id_of(
                &Identifier::minecraft("dimension_type"),
                &target.config.kind,
            )
            .unwrap_or(0);
        player
            .sink
            .send(&Respawn {
                dimension_type,
                dimension: target.config.name.clone(),
                seed: 0,
                game_mode: 1,
                previous_game_mode: -1,
                is_debug: false,
                is_flat: target.config.is_flat,
                portal_cooldown: 0,
                sea_level: target.config.sea_level,
                data_kept: RESPAWN_KEEP_ALL_DATA,
            })
            .await?;

        target.add_player(Arc::clone(player)).await
    }

    /// Stops accepting, disconnects every live connection with the
    /// shutdown reason, and cancels the dimension tick timers.
    pub async fn close(self) {
        self.accept.abort();

        let reason = Text::translate("multiplayer.disconnect.server_shutdown");
        let sinks: Vec<PacketSink> = self.shared.sinks.lock().await.clone();
        if let Ok(buffer) = packet_buffer(&Disconnect {
            reason: reason.to_raw_nbt(),
        }) {
            for sink in &sinks {
                let _ = sink.send_raw(&buffer).await;
                sink.shutdown().await;
            }
        }

        for dimension in self.shared.dimensions.values() {
            dimension.stop_tick().await;
        }
        log::info!("Server on {} closed", self.local_addr);
    }
}
