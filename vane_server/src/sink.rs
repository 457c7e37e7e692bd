use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use vane_buffer::{encrypt_in_place, Aes128Cfb8Enc};
use vane_registry::{packet_buffer, ClientboundPacket};
use vane_serializer::{Serialize, VarInt};

/// The clientbound half of a connection: the write half, the optional
/// encrypt cipher, and framing. Cloneable so dimensions and timers can
/// fan packets out; each frame is written atomically under the lock.
#[derive(Clone)]
pub struct PacketSink {
    inner: Arc<Mutex<SinkInner>>,
}

struct SinkInner {
    write: OwnedWriteHalf,
    cipher: Option<Aes128Cfb8Enc>,
    closed: bool,
}

impl PacketSink {
    pub fn new(write: OwnedWriteHalf) -> PacketSink {
        PacketSink {
            inner: Arc::new(Mutex::new(SinkInner {
                write,
                cipher: None,
                closed: false,
            })),
        }
    }

    pub async fn enable_encryption(&self, cipher: Aes128Cfb8Enc) {
        self.inner.lock().await.cipher = Some(cipher);
    }

    pub async fn send<P: ClientboundPacket>(&self, packet: &P) -> anyhow::Result<()> {
        let buffer = packet_buffer(packet)?;
        self.send_raw(&buffer).await
    }

    /// Frames `(id, body)` bytes: prepends the total-length varint and
    /// runs the encrypt cipher when enabled.
    pub async fn send_raw(&self, id_and_body: &[u8]) -> anyhow::Result<()> {
        let mut framed = Vec::with_capacity(id_and_body.len() + VarInt::MAX_BYTES);
        VarInt::try_from(id_and_body.len())?.serialize(&mut framed)?;
        framed.extend_from_slice(id_and_body);

        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Ok(());
        }
        if let Some(cipher) = inner.cipher.as_mut() {
            encrypt_in_place(cipher, &mut framed);
        }
        inner.write.write_all(&framed).await?;
        Ok(())
    }

    /// Unframed write for the legacy ping response, which predates the
    /// length-prefixed transport.
    pub async fn send_unframed(&self, bytes: &[u8]) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Ok(());
        }
        inner.write.write_all(bytes).await?;
        Ok(())
    }

    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.closed {
            inner.closed = true;
            let _ = inner.write.shutdown().await;
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// Identity comparison for the live-connection registry.
    pub fn same(&self, other: &PacketSink) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
