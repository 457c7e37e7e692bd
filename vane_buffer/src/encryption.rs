use aes::cipher::inout::InOutBuf;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

pub type Aes128Cfb8Enc = cfb8::Encryptor<aes::Aes128>;
pub type Aes128Cfb8Dec = cfb8::Decryptor<aes::Aes128>;

/// Builds the encrypt/decrypt cipher pair from one 16-byte shared secret.
/// The protocol uses the secret as both key and IV, one fresh cipher per
/// direction.
pub fn cipher_pair(shared_secret: &[u8]) -> anyhow::Result<(Aes128Cfb8Enc, Aes128Cfb8Dec)> {
    let encrypt = Aes128Cfb8Enc::new_from_slices(shared_secret, shared_secret)
        .map_err(|err| anyhow::anyhow!("Failed to create encrypt stream: {}.", err))?;
    let decrypt = Aes128Cfb8Dec::new_from_slices(shared_secret, shared_secret)
        .map_err(|err| anyhow::anyhow!("Failed to create decrypt stream: {}.", err))?;
    Ok((encrypt, decrypt))
}

/// CFB8 works byte-at-a-time, so any slice splits into whole blocks.
pub fn encrypt_in_place(cipher: &mut Aes128Cfb8Enc, data: &mut [u8]) {
    let (blocks, rest) = InOutBuf::from(data).into_chunks();
    debug_assert!(rest.is_empty());
    cipher.encrypt_blocks_inout_mut(blocks);
}

pub fn decrypt_in_place(cipher: &mut Aes128Cfb8Dec, data: &mut [u8]) {
    let (blocks, rest) = InOutBuf::from(data).into_chunks();
    debug_assert!(rest.is_empty());
    cipher.decrypt_blocks_inout_mut(blocks);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_is_identity() {
        let secret = [7u8; 16];
        let (mut encrypt, mut decrypt) = cipher_pair(&secret).unwrap();

        let mut data = b"framed packet bytes".to_vec();
        let original = data.clone();
        encrypt_in_place(&mut encrypt, &mut data);
        assert_ne!(data, original);
        decrypt_in_place(&mut decrypt, &mut data);
        assert_eq!(data, original);
    }

    #[test]
    fn cipher_state_runs_across_calls() {
        let secret = [42u8; 16];
        let (mut encrypt, mut decrypt) = cipher_pair(&secret).unwrap();

        let mut first = vec![1u8, 2, 3];
        let mut second = vec![4u8, 5, 6];
        encrypt_in_place(&mut encrypt, &mut first);
        encrypt_in_place(&mut encrypt, &mut second);

        let mut combined = [first, second].concat();
        decrypt_in_place(&mut decrypt, &mut combined);
        assert_eq!(combined, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn wrong_length_secret_is_rejected() {
        assert!(cipher_pair(&[1u8; 8]).is_err());
    }
}
