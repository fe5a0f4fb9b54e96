//! Hub payload encryption and decryption.
//! AES-128-CBC with a random IV carried in front of the ciphertext.

use crate::error::{Ics2000Error, Result};
use aes::Aes128;
use base64::{Engine as _, engine::general_purpose};
use cbc::{Decryptor, Encryptor};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

pub const BLOCK_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;

/// HubCipher encrypts command bodies and decrypts cloud records with the account AES key.
#[derive(Clone)]
pub struct HubCipher {
    /// 16-byte account key
    key: [u8; 16],
}

impl std::fmt::Debug for HubCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubCipher").finish_non_exhaustive()
    }
}

impl HubCipher {
    /// Create a new HubCipher with a 16-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 16 {
            return Err(Ics2000Error::InvalidKey);
        }
        let mut k = [0u8; 16];
        k.copy_from_slice(key);
        Ok(Self { key: k })
    }

    /// Create a HubCipher from the hex key string returned at login.
    pub fn from_hex(key: &str) -> Result<Self> {
        let bytes = hex::decode(key.trim()).map_err(|_| Ics2000Error::InvalidKey)?;
        Self::new(&bytes)
    }

    /// Encrypt data with a fresh random IV. Output is `IV + ciphertext`.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut iv = [0u8; IV_SIZE];
        rand::rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(data, &iv)
    }

    /// Encrypt data under the given IV. Plaintext is zero padded to the block size.
    pub fn encrypt_with_iv(&self, data: &[u8], iv: &[u8; IV_SIZE]) -> Result<Vec<u8>> {
        let padded_len = data.len().div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE;
        let mut body = data.to_vec();
        body.resize(padded_len, 0);

        let mut encryptor = Encryptor::<Aes128>::new(&self.key.into(), iv.into());
        for chunk in body.chunks_mut(BLOCK_SIZE) {
            let block = cipher::generic_array::GenericArray::from_mut_slice(chunk);
            encryptor.encrypt_block_mut(block);
        }

        let mut result = Vec::with_capacity(IV_SIZE + body.len());
        result.extend_from_slice(iv);
        result.append(&mut body);
        Ok(result)
    }

    /// Decrypt `IV + ciphertext` and strip trailing padding.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < IV_SIZE + BLOCK_SIZE || (data.len() - IV_SIZE) % BLOCK_SIZE != 0 {
            return Err(Ics2000Error::DecryptionFailed);
        }
        let (iv, ciphertext) = data.split_at(IV_SIZE);

        let mut decryptor = Decryptor::<Aes128>::new_from_slices(&self.key, iv)
            .map_err(|_| Ics2000Error::DecryptionFailed)?;
        let mut plaintext = ciphertext.to_vec();
        for chunk in plaintext.chunks_mut(BLOCK_SIZE) {
            let block = cipher::generic_array::GenericArray::from_mut_slice(chunk);
            decryptor.decrypt_block_mut(block);
        }

        strip_padding(&mut plaintext);
        Ok(plaintext)
    }

    /// Decrypt a base64 blob from the cloud into UTF-8 text.
    pub fn decrypt_base64(&self, data: &str) -> Result<String> {
        let raw = general_purpose::STANDARD.decode(data.trim())?;
        let plaintext = self.decrypt(&raw)?;
        String::from_utf8(plaintext).map_err(|_| Ics2000Error::DecryptionFailed)
    }

    /// Encrypt text and encode it as base64, the form the cloud stores.
    pub fn encrypt_base64(&self, data: &str) -> Result<String> {
        let encrypted = self.encrypt(data.as_bytes())?;
        Ok(general_purpose::STANDARD.encode(encrypted))
    }
}

/// Removes zero padding, or PKCS7 padding when the tail is a valid PKCS7 run.
fn strip_padding(plaintext: &mut Vec<u8>) {
    while plaintext.last() == Some(&0) {
        plaintext.pop();
    }
    if let Some(&last) = plaintext.last() {
        let pad_len = last as usize;
        if (1..=BLOCK_SIZE).contains(&pad_len)
            && pad_len <= plaintext.len()
            && plaintext[plaintext.len() - pad_len..]
                .iter()
                .all(|&b| b == last)
        {
            plaintext.truncate(plaintext.len() - pad_len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn rejects_bad_keys() {
        assert!(matches!(HubCipher::new(&[0u8; 8]), Err(Ics2000Error::InvalidKey)));
        assert!(matches!(HubCipher::from_hex("zz"), Err(Ics2000Error::InvalidKey)));
    }

    #[test]
    fn matches_known_cbc_vector() {
        // NIST SP 800-38A F.2.1, first block
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv: [u8; 16] = hex::decode("000102030405060708090a0b0c0d0e0f")
            .unwrap()
            .try_into()
            .unwrap();
        let plain = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        let cipher = HubCipher::new(&key).unwrap();
        let out = cipher.encrypt_with_iv(&plain, &iv).unwrap();
        assert_eq!(
            hex::encode(&out[IV_SIZE..]),
            "7649abac8119b246cee98e9b12e9197d"
        );
    }

    #[test]
    fn chains_blocks_both_ways() {
        // NIST SP 800-38A F.2.1, first two blocks
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let iv: [u8; 16] = hex::decode("000102030405060708090a0b0c0d0e0f")
            .unwrap()
            .try_into()
            .unwrap();
        let plain = hex::decode(
            "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51",
        )
        .unwrap();
        let cipher = HubCipher::new(&key).unwrap();
        let out = cipher.encrypt_with_iv(&plain, &iv).unwrap();
        assert_eq!(
            hex::encode(&out[IV_SIZE..]),
            "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2"
        );
        assert_eq!(cipher.decrypt(&out).unwrap(), plain);
    }

    #[test]
    fn decrypts_what_it_encrypts() {
        let cipher = HubCipher::from_hex(KEY_HEX).unwrap();
        let text = r#"{"module":{"id":7,"function":0,"value":1}}"#;
        let encrypted = cipher.encrypt(text.as_bytes()).unwrap();
        assert_eq!((encrypted.len() - IV_SIZE) % BLOCK_SIZE, 0);
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), text.as_bytes());

        let b64 = cipher.encrypt_base64(text).unwrap();
        assert_eq!(cipher.decrypt_base64(&b64).unwrap(), text);
    }

    #[test]
    fn strips_pkcs7_padding() {
        let mut data = b"{}".to_vec();
        data.extend_from_slice(&[14u8; 14]);
        strip_padding(&mut data);
        assert_eq!(data, b"{}");
    }

    #[test]
    fn rejects_truncated_ciphertext() {
        let cipher = HubCipher::from_hex(KEY_HEX).unwrap();
        assert!(matches!(
            cipher.decrypt(&[0u8; 20]),
            Err(Ics2000Error::DecryptionFailed)
        ));
    }
}
