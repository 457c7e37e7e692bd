use crate::encryption::{decrypt_in_place, Aes128Cfb8Dec};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use vane_serializer::VarInt;

pub enum BufferState {
    Waiting,
    PacketReady,
    Error(String),
}

/// What `read_to_next_packet` observed on the socket.
pub enum ReadOutcome {
    PacketReady,
    /// The peer closed the stream with no partial frame left behind.
    Closed,
}

const BUFFER_CAPACITY: usize = 2097154; // protocol maximum frame + prefix

/// The receive side of a connection. Raw socket bytes land in `bytes`;
/// `poll` moves them (through the decrypt cipher once enabled) into
/// `decoded`, where whole frames are carved off. Keeping the two queues
/// separate is what lets encryption switch on mid-stream at an exact
/// packet boundary.
pub struct PacketBuffer {
    bytes: BytesMut,
    decoded: BytesMut,
    decryption: Option<Aes128Cfb8Dec>,
}

impl PacketBuffer {
    pub fn new() -> Self {
        PacketBuffer {
            bytes: BytesMut::with_capacity(BUFFER_CAPACITY),
            decoded: BytesMut::with_capacity(BUFFER_CAPACITY),
            decryption: None,
        }
    }

    pub fn enable_decryption(&mut self, cipher: Aes128Cfb8Dec) {
        self.decryption = Some(cipher);
    }

    /// Suspends on the socket until a whole frame is buffered, or the
    /// stream ends.
    pub async fn read_to_next_packet(
        &mut self,
        read: &mut OwnedReadHalf,
    ) -> anyhow::Result<ReadOutcome> {
        loop {
            match self.poll() {
                BufferState::PacketReady => return Ok(ReadOutcome::PacketReady),
                BufferState::Waiting => {
                    let count = read.read_buf(&mut self.bytes).await?;
                    if count == 0 {
                        if self.decoded.is_empty() && self.bytes.is_empty() {
                            return Ok(ReadOutcome::Closed);
                        }
                        anyhow::bail!("Connection closed mid-frame.");
                    }
                }
                BufferState::Error(error) => {
                    anyhow::bail!("Found error {} while polling buffer.", error)
                }
            }
        }
    }

    /// One socket read followed by a poll, without waiting for a whole
    /// frame. The connection uses this before its first packet to sniff
    /// the legacy ping, whose `0xFE` opener never frames.
    pub async fn read_some(&mut self, read: &mut OwnedReadHalf) -> anyhow::Result<usize> {
        let count = read.read_buf(&mut self.bytes).await?;
        self.poll();
        Ok(count)
    }

    /// First byte of the decoded stream, if any. A `0xFE` here before any
    /// frame has been consumed is the legacy 1.6 server-list ping.
    pub fn first_byte(&self) -> Option<u8> {
        self.decoded.first().copied()
    }

    pub fn decoded_len(&self) -> usize {
        self.decoded.len()
    }

    /// Drains `count` decoded bytes without framing; used only by the
    /// legacy-ping path, which predates length prefixes.
    pub fn drain_raw(&mut self, count: usize) -> Vec<u8> {
        let count = count.min(self.decoded.len());
        let drained = self.decoded.split_to(count);
        drained.to_vec()
    }

    fn is_packet_available(&self) -> bool {
        match VarInt::try_peek(self.decoded.chunk()) {
            Ok(Some((length, prefix_size))) => {
                length.val() >= 0 && (length.val() as usize + prefix_size) <= self.decoded.len()
            }
            Ok(None) => false,
            // A malformed prefix surfaces as an error from `poll`.
            Err(_) => false,
        }
    }

    fn is_prefix_malformed(&self) -> bool {
        VarInt::try_peek(self.decoded.chunk()).is_err()
    }

    pub fn poll(&mut self) -> BufferState {
        let size_read = self
            .bytes
            .len()
            .min(self.decoded.capacity() - self.decoded.len());

        if size_read == 0 {
            return if self.is_prefix_malformed() {
                BufferState::Error(String::from("Malformed length prefix."))
            } else if self.is_packet_available() {
                BufferState::PacketReady
            } else if self.decoded.capacity() == self.decoded.len() {
                log::debug!(
                    "Frame overflow at capacity {}, length {}",
                    self.decoded.capacity(),
                    self.decoded.len()
                );
                BufferState::Error(String::from(
                    "Next packet was too big to decode, something went wrong.",
                ))
            } else {
                BufferState::Waiting
            };
        }

        let mut staged = self.bytes.split_to(size_read);
        if let Some(decryption) = &mut self.decryption {
            decrypt_in_place(decryption, &mut staged);
        }
        self.decoded.put_slice(&staged);
        self.bytes
            .reserve(BUFFER_CAPACITY.saturating_sub(self.bytes.len()));

        if self.is_prefix_malformed() {
            BufferState::Error(String::from("Malformed length prefix."))
        } else if self.is_packet_available() {
            BufferState::PacketReady
        } else {
            BufferState::Waiting
        }
    }

    /// Carves the next frame off the decoded queue and returns a cursor
    /// bounded to exactly that packet's bytes (id varint first). The
    /// bound is the "end boundary": handlers cannot read past their own
    /// packet, and leftovers are simply dropped with the cursor.
    pub fn packet_reader(&mut self) -> anyhow::Result<Cursor<Vec<u8>>> {
        let (length, prefix_size) = VarInt::try_peek(self.decoded.chunk())?
            .ok_or_else(|| anyhow::anyhow!("packet_reader called without a buffered frame"))?;
        let length = usize::try_from(length)?;
        self.decoded.advance(prefix_size);
        let body = self.decoded.split_to(length);
        self.decoded
            .reserve(BUFFER_CAPACITY.saturating_sub(self.decoded.len()));
        Ok(Cursor::new(body.to_vec()))
    }

    /// Test/loopback entry: feed raw bytes as if they arrived on the wire.
    pub fn feed(&mut self, data: &[u8]) {
        self.bytes.put_slice(data);
    }
}

impl Default for PacketBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::{cipher_pair, encrypt_in_place};
    use vane_serializer::Serialize;

    fn frame(id: i32, body: &[u8]) -> Vec<u8> {
        let mut packet = Vec::new();
        VarInt::from(id).serialize(&mut packet).unwrap();
        packet.extend_from_slice(body);
        let mut framed = Vec::new();
        VarInt::try_from(packet.len())
            .unwrap()
            .serialize(&mut framed)
            .unwrap();
        framed.extend_from_slice(&packet);
        framed
    }

    #[test]
    fn whole_frames_become_ready() {
        let mut buffer = PacketBuffer::new();
        buffer.feed(&frame(0x00, &[1, 2, 3]));
        assert!(matches!(buffer.poll(), BufferState::PacketReady));

        let reader = buffer.packet_reader().unwrap();
        assert_eq!(reader.into_inner(), vec![0x00, 1, 2, 3]);
    }

    #[test]
    fn partial_frames_wait_for_more_bytes() {
        let framed = frame(0x05, &[9; 20]);
        let mut buffer = PacketBuffer::new();
        buffer.feed(&framed[..4]);
        assert!(matches!(buffer.poll(), BufferState::Waiting));
        buffer.feed(&framed[4..]);
        assert!(matches!(buffer.poll(), BufferState::PacketReady));
    }

    #[test]
    fn consecutive_frames_are_carved_in_order() {
        let mut buffer = PacketBuffer::new();
        buffer.feed(&frame(0x01, b"one"));
        buffer.feed(&frame(0x02, b"two"));
        assert!(matches!(buffer.poll(), BufferState::PacketReady));

        assert_eq!(buffer.packet_reader().unwrap().into_inner(), b"\x01one");
        assert!(matches!(buffer.poll(), BufferState::PacketReady));
        assert_eq!(buffer.packet_reader().unwrap().into_inner(), b"\x02two");
    }

    #[test]
    fn decryption_applies_to_fed_bytes() {
        let secret = [3u8; 16];
        let (mut encrypt, decrypt) = cipher_pair(&secret).unwrap();

        let mut wire = frame(0x07, b"secret payload");
        let expected = {
            let mut clear = Vec::new();
            VarInt::from(0x07).serialize(&mut clear).unwrap();
            clear.extend_from_slice(b"secret payload");
            clear
        };
        encrypt_in_place(&mut encrypt, &mut wire);

        let mut buffer = PacketBuffer::new();
        buffer.enable_decryption(decrypt);
        buffer.feed(&wire);
        assert!(matches!(buffer.poll(), BufferState::PacketReady));
        assert_eq!(buffer.packet_reader().unwrap().into_inner(), expected);
    }

    #[test]
    fn legacy_ping_first_byte_is_visible() {
        let mut buffer = PacketBuffer::new();
        buffer.feed(&[0xFE, 0x01, 0xFA]);
        buffer.poll();
        assert_eq!(buffer.first_byte(), Some(0xFE));
        assert_eq!(buffer.drain_raw(2), vec![0xFE, 0x01]);
    }

    #[test]
    fn malformed_length_prefix_is_an_error() {
        let mut buffer = PacketBuffer::new();
        buffer.feed(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(buffer.poll(), BufferState::Error(_)));
    }
}
