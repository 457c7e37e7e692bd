//! End-to-end protocol exchanges against a listening server: a raw
//! tokio TCP client drives the handshake/status/login/configuration/play
//! phases the way a vanilla 1.21.8 client would (offline mode).

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;
use vane_gamedata::Registry;
use vane_level::SuperflatGenerator;
use vane_registry::{client_bound, server_bound, ClientboundPacket};
use vane_serializer::{BlockPos, Identifier, Serialize, VarInt, Vec3};
use vane_server::{
    DefaultBehavior, Dimension, DimensionConfig, RunningServer, Server, ServerProperties, Text,
};

const DATA_FILE: &str = r#"{
    "maps": {
        "minecraft:entity_type": ["minecraft:player"],
        "minecraft:block": [
            "minecraft:air", "minecraft:bedrock", "minecraft:dirt",
            "minecraft:grass_block"
        ]
    },
    "block_states": [
        {"name": "minecraft:air", "default": true},
        {"name": "minecraft:bedrock", "default": true},
        {"name": "minecraft:dirt", "default": true},
        {"name": "minecraft:grass_block", "default": true, "properties": {"snowy": "false"}}
    ],
    "datapack": {
        "minecraft:dimension_type": ["minecraft:overworld"],
        "minecraft:worldgen/biome": ["minecraft:plains"]
    },
    "tags": {
        "minecraft:block": {
            "minecraft:dirt_like": ["minecraft:dirt", "minecraft:grass_block"]
        }
    }
}"#;

async fn start_server() -> RunningServer {
    let mut registry = Registry::new();
    registry.load_data_file(DATA_FILE).unwrap();

    let layers = vec![
        (Identifier::minecraft("bedrock"), 1u32),
        (Identifier::minecraft("dirt"), 2),
        (Identifier::minecraft("grass_block"), 1),
    ];
    let provider =
        SuperflatGenerator::new(&layers, registry.block_states(), 24, -64).unwrap();

    let mut config = DimensionConfig::overworld_like(
        Identifier::minecraft("lobby"),
        Identifier::minecraft("overworld"),
    );
    config.spawnpoint = Vec3::new(8.5, -59.0, 8.5);
    config.is_flat = true;

    let dimension = Dimension::new(
        config,
        Box::new(DefaultBehavior),
        Box::new(provider),
        &registry,
    );

    let mut server = Server::new(
        registry,
        ServerProperties {
            online_mode: false,
            motd: Text::literal("vane test server"),
            max_players: 20,
            brand: "vane".to_string(),
        },
    );
    server.add_dimension(dimension);
    server.listen("127.0.0.1:0").await.unwrap()
}

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn connect(server: &RunningServer) -> TestClient {
        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        TestClient { stream }
    }

    async fn send_packet(&mut self, id: i32, body: &[u8]) {
        let mut packet = Vec::new();
        VarInt::from(id).serialize(&mut packet).unwrap();
        packet.extend_from_slice(body);
        let mut framed = Vec::new();
        VarInt::try_from(packet.len())
            .unwrap()
            .serialize(&mut framed)
            .unwrap();
        framed.extend_from_slice(&packet);
        self.stream.write_all(&framed).await.unwrap();
    }

    async fn read_varint(&mut self) -> i32 {
        let mut value = 0u32;
        for i in 0..5 {
            let byte = self.stream.read_u8().await.unwrap();
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return value as i32;
            }
        }
        panic!("malformed varint from server");
    }

    /// Reads one frame, returning `(packet_id, body)`.
    async fn read_frame(&mut self) -> (i32, Vec<u8>) {
        let read = async {
            let length = self.read_varint().await as usize;
            let mut body = vec![0u8; length];
            self.stream.read_exact(&mut body).await.unwrap();
            let (id, id_size) = VarInt::try_peek(&body).unwrap().unwrap();
            (id.val(), body[id_size..].to_vec())
        };
        // Generous hang guard; the keep-alive test legitimately waits
        // out a full 15-second cycle.
        tokio::time::timeout(Duration::from_secs(30), read)
            .await
            .expect("timed out waiting for a frame")
    }

    /// Keep-alives arrive on their own timer and may interleave with
    /// anything; skip them when a test is asserting order.
    async fn read_frame_skipping_keepalive(&mut self) -> (i32, Vec<u8>) {
        loop {
            let (id, body) = self.read_frame().await;
            if id != client_bound::play::KeepAlive::ID {
                return (id, body);
            }
        }
    }

    async fn handshake(&mut self, next_state: i32) {
        let mut body = Vec::new();
        VarInt::from(vane_registry::PROTOCOL_VERSION)
            .serialize(&mut body)
            .unwrap();
        "localhost".serialize(&mut body).unwrap();
        25565u16.serialize(&mut body).unwrap();
        VarInt::from(next_state).serialize(&mut body).unwrap();
        self.send_packet(server_bound::handshaking::INTENTION, &body)
            .await;
    }

    /// Runs login and configuration to completion; returns once the
    /// serverbound finish_configuration is on the wire.
    async fn login_through_configuration(&mut self, name: &str) {
        self.handshake(2).await;

        let mut hello = Vec::new();
        name.to_string().serialize(&mut hello).unwrap();
        Uuid::new_v4().serialize(&mut hello).unwrap();
        self.send_packet(server_bound::login::HELLO, &hello).await;

        let (id, body) = self.read_frame().await;
        assert_eq!(id, 0x02, "expected login_finished");
        // 16 uuid bytes, then the varint-prefixed name.
        let name_length = body[16] as usize;
        assert_eq!(&body[17..17 + name_length], name.as_bytes());

        self.send_packet(server_bound::login::LOGIN_ACKNOWLEDGED, &[])
            .await;

        // brand payload, report details, server links, enabled features,
        // then the known-packs prompt.
        let mut saw_known_packs = false;
        for _ in 0..8 {
            let (id, _) = self.read_frame().await;
            if id == client_bound::configuration::SelectKnownPacks::ID {
                saw_known_packs = true;
                break;
            }
        }
        assert!(saw_known_packs, "never received select_known_packs");

        let mut packs = Vec::new();
        VarInt::from(1).serialize(&mut packs).unwrap();
        "minecraft".serialize(&mut packs).unwrap();
        "core".serialize(&mut packs).unwrap();
        vane_registry::VERSION_NAME.serialize(&mut packs).unwrap();
        self.send_packet(server_bound::configuration::SELECT_KNOWN_PACKS, &packs)
            .await;

        // Registry burst: data packets, the tag packet, then finish.
        let mut registry_packets = 0;
        let mut saw_tags = false;
        loop {
            let (id, _) = self.read_frame().await;
            if id == client_bound::configuration::RegistryData::ID {
                registry_packets += 1;
            } else if id == client_bound::configuration::UpdateTags::ID {
                saw_tags = true;
            } else if id == client_bound::configuration::FinishConfiguration::ID {
                break;
            } else {
                panic!("unexpected configuration packet {:#04x}", id);
            }
        }
        assert_eq!(registry_packets, 2);
        assert!(saw_tags);

        self.send_packet(server_bound::configuration::FINISH_CONFIGURATION, &[])
            .await;
    }

    /// Consumes the play-phase join burst; returns the second teleport
    /// id and the number of chunk packets.
    async fn consume_join_burst(&mut self) -> (i32, usize) {
        let (id, _) = self.read_frame_skipping_keepalive().await;
        assert_eq!(id, client_bound::play::Login::ID, "expected play login");
        let (id, _) = self.read_frame_skipping_keepalive().await;
        assert_eq!(id, client_bound::play::GameEvent::ID);

        let mut chunks = 0usize;
        let mut teleport_id = 0;
        let mut positions = 0;
        loop {
            let (id, body) = self.read_frame_skipping_keepalive().await;
            if id == client_bound::play::LevelChunkWithLight::ID {
                chunks += 1;
            } else if id == client_bound::play::PlayerPosition::ID {
                positions += 1;
                teleport_id = VarInt::try_peek(&body).unwrap().unwrap().0.val();
                if positions == 2 {
                    break;
                }
            }
        }
        (teleport_id, chunks)
    }

    async fn accept_teleport(&mut self, teleport_id: i32) {
        let mut body = Vec::new();
        VarInt::from(teleport_id).serialize(&mut body).unwrap();
        self.send_packet(server_bound::play::ACCEPT_TELEPORTATION, &body)
            .await;
    }
}

#[tokio::test]
async fn status_ping_round_trip() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.handshake(1).await;
    client.send_packet(server_bound::status::STATUS_REQUEST, &[]).await;

    let (id, body) = client.read_frame().await;
    assert_eq!(id, 0x00);
    let json = String::from_utf8_lossy(&body);
    assert!(json.contains("\"protocol\":772"));
    assert!(json.contains("vane test server"));

    let payload = 0x0102030405060708i64;
    let mut ping = Vec::new();
    payload.serialize(&mut ping).unwrap();
    client.send_packet(server_bound::status::PING_REQUEST, &ping).await;

    let (id, body) = client.read_frame().await;
    assert_eq!(id, 0x01);
    assert_eq!(body, payload.to_be_bytes());

    server.close().await;
}

#[tokio::test]
async fn legacy_ping_gets_the_utf16_kick_string() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.stream.write_all(&[0xFE, 0x01, 0xFA]).await.unwrap();

    let opener = client.stream.read_u8().await.unwrap();
    assert_eq!(opener, 0xFF);
    let units = client.stream.read_u16().await.unwrap() as usize;
    let mut payload = vec![0u8; units * 2];
    client.stream.read_exact(&mut payload).await.unwrap();

    let decoded: String = payload
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect::<Vec<u16>>()
        .iter()
        .map(|unit| char::from_u32(*unit as u32).unwrap_or('?'))
        .collect();
    assert!(decoded.starts_with("§1"));
    assert!(decoded.contains("vane test server"));

    server.close().await;
}

#[tokio::test]
async fn offline_login_streams_the_initial_square() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.login_through_configuration("Alex").await;
    let (teleport_id, chunks) = client.consume_join_burst().await;

    // view distance 4 → R = 7 → a 15×15 square.
    assert_eq!(chunks, 15 * 15);
    assert!(teleport_id > 0);
    assert_eq!(server.player_count().await, 1);

    server.close().await;
}

#[tokio::test]
async fn moving_across_a_chunk_border_streams_one_column() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.login_through_configuration("Mover").await;
    let (teleport_id, _) = client.consume_join_burst().await;
    client.accept_teleport(teleport_id).await;

    // Spawn chunk is (0, 0); step into chunk (1, 0).
    let mut body = Vec::new();
    24.5f64.serialize(&mut body).unwrap();
    (-59.0f64).serialize(&mut body).unwrap();
    8.5f64.serialize(&mut body).unwrap();
    1u8.serialize(&mut body).unwrap();
    client.send_packet(server_bound::play::MOVE_PLAYER_POS, &body).await;

    let (id, body) = client.read_frame_skipping_keepalive().await;
    assert_eq!(id, client_bound::play::SetChunkCacheCenter::ID);
    assert_eq!(VarInt::try_peek(&body).unwrap().unwrap().0.val(), 1);

    let mut columns = Vec::new();
    for _ in 0..15 {
        let (id, body) = client.read_frame_skipping_keepalive().await;
        assert_eq!(id, client_bound::play::LevelChunkWithLight::ID);
        let cx = i32::from_be_bytes(body[0..4].try_into().unwrap());
        let cz = i32::from_be_bytes(body[4..8].try_into().unwrap());
        columns.push((cx, cz));
    }
    // Exactly the newly entered column x = 1 + 7, z ∈ [-7, 7].
    for (cx, cz) in &columns {
        assert_eq!(*cx, 8);
        assert!((-7..=7).contains(cz));
    }
    let mut zs: Vec<i32> = columns.iter().map(|(_, cz)| *cz).collect();
    zs.sort_unstable();
    zs.dedup();
    assert_eq!(zs.len(), 15);

    server.close().await;
}

#[tokio::test]
async fn breaking_a_block_updates_and_acknowledges() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.login_through_configuration("Miner").await;
    let (teleport_id, _) = client.consume_join_burst().await;
    client.accept_teleport(teleport_id).await;

    let target = BlockPos::new(3, -61, 5); // the grass layer
    let mut body = Vec::new();
    VarInt::from(0).serialize(&mut body).unwrap(); // start destroy
    target.serialize(&mut body).unwrap();
    1i8.serialize(&mut body).unwrap();
    VarInt::from(42).serialize(&mut body).unwrap();
    client.send_packet(server_bound::play::PLAYER_ACTION, &body).await;

    let (id, body) = client.read_frame_skipping_keepalive().await;
    assert_eq!(id, client_bound::play::BlockUpdate::ID);
    let mut reader = std::io::Cursor::new(body);
    let pos = <BlockPos as vane_serializer::Deserialize>::deserialize(&mut reader).unwrap();
    assert_eq!(pos, target);
    let state = <VarInt as vane_serializer::Deserialize>::deserialize(&mut reader).unwrap();
    assert_eq!(state.val(), 0); // air

    let (id, body) = client.read_frame_skipping_keepalive().await;
    assert_eq!(id, client_bound::play::BlockChangedAck::ID);
    assert_eq!(VarInt::try_peek(&body).unwrap().unwrap().0.val(), 42);

    server.close().await;
}

// Slow by nature: the keep-alive cycle is a fixed 15 seconds and the
// timeout only fires on the cycle after the missed echo.
#[tokio::test]
#[ignore]
async fn unanswered_keep_alive_times_out() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.login_through_configuration("Idler").await;
    let _ = client.consume_join_burst().await;

    // Echo a wrong id; the tracker must not count it.
    let (id, body) = client.read_frame().await;
    assert_eq!(id, client_bound::play::KeepAlive::ID);
    let sent = i64::from_be_bytes(body[..8].try_into().unwrap());
    let mut wrong = Vec::new();
    (sent + 1).serialize(&mut wrong).unwrap();
    client.send_packet(server_bound::play::KEEP_ALIVE, &wrong).await;

    // Next cycle: the server gives up with disconnect.timeout.
    let deadline = Duration::from_secs(40);
    let disconnect = tokio::time::timeout(deadline, async {
        loop {
            let (id, body) = client.read_frame().await;
            if id == client_bound::play::Disconnect::ID {
                return body;
            }
        }
    })
    .await
    .expect("no disconnect before the deadline");
    let text = String::from_utf8_lossy(&disconnect);
    assert!(text.contains("disconnect.timeout"));

    server.close().await;
}

#[tokio::test]
async fn unknown_play_packet_disconnects_the_connection() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.login_through_configuration("Weird").await;
    let _ = client.consume_join_burst().await;

    // No handler is registered for this id in the play state.
    client.send_packet(0x7D, &[1, 2, 3]).await;

    // The server answers with a best-effort play disconnect, then drops
    // the socket.
    let (id, _) = client.read_frame_skipping_keepalive().await;
    assert_eq!(id, client_bound::play::Disconnect::ID);

    server.close().await;
}
