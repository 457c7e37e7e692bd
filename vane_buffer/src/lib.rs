pub mod buffer;
pub mod encryption;

pub use buffer::{BufferState, PacketBuffer, ReadOutcome};
pub use encryption::{
    cipher_pair, decrypt_in_place, encrypt_in_place, Aes128Cfb8Dec, Aes128Cfb8Enc,
};
