//! AES-CBC credential tickets.
//!
//! A ticket is `base64(json{iv, value, mac})` where `value` is the PKCS7-padded
//! AES-CBC ciphertext and `mac` is the hex HMAC-SHA256 over the base64 `iv`
//! followed by the base64 `value`. The key size picks AES-128, AES-192 or AES-256.
//!
//! `decrypt` does not check the MAC. Callers that want integrity checking call
//! [`CredentialCipher::verify_mac`] first.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::CipherError;

const BLOCK_SIZE: usize = 16;

type HmacSha256 = Hmac<Sha256>;

/// Decoded ticket envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub iv: String,
    pub value: String,
    #[serde(default)]
    pub mac: String,
}

impl Ticket {
    /// Decode the outer base64 layer and the JSON envelope.
    pub fn parse(encoded: &str) -> Result<Self, CipherError> {
        let json = BASE64
            .decode(encoded.trim())
            .map_err(|e| CipherError::base64("ticket", e))?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Encode the envelope as JSON wrapped in base64.
    pub fn encode(&self) -> Result<String, CipherError> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }
}

/// Symmetric cipher bound to a single tenant passphrase.
#[derive(Clone)]
pub struct CredentialCipher {
    key: Vec<u8>,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("key_len", &self.key.len())
            .finish()
    }
}

impl CredentialCipher {
    /// Build a cipher from raw key bytes.
    pub fn new(key: Vec<u8>) -> Result<Self, CipherError> {
        match key.len() {
            16 | 24 | 32 => Ok(Self { key }),
            n => Err(CipherError::KeyLength(n)),
        }
    }

    /// Build a cipher from a base64 encoded passphrase.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CipherError> {
        let key = BASE64
            .decode(passphrase.trim())
            .map_err(|e| CipherError::base64("passphrase", e))?;
        Self::new(key)
    }

    /// Encrypt `plaintext` into a ticket with a fresh random IV.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let iv: [u8; BLOCK_SIZE] = rand::random();
        let ciphertext = self.encrypt_block_aligned(&iv, plaintext.as_bytes())?;

        let iv = BASE64.encode(iv);
        let value = BASE64.encode(&ciphertext);
        let mac = hex::encode(self.compute_mac(&iv, &value)?);

        Ticket { iv, value, mac }.encode()
    }

    /// Decrypt a ticket back into its plaintext.
    pub fn decrypt(&self, ticket: &str) -> Result<String, CipherError> {
        let ticket = Ticket::parse(ticket)?;

        let iv = BASE64
            .decode(&ticket.iv)
            .map_err(|e| CipherError::base64("iv", e))?;
        if iv.len() != BLOCK_SIZE {
            return Err(CipherError::IvLength(iv.len()));
        }

        let ciphertext = BASE64
            .decode(&ticket.value)
            .map_err(|e| CipherError::base64("value", e))?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::BlockAlignment(ciphertext.len()));
        }

        let plaintext = match self.key.len() {
            16 => cbc::Decryptor::<Aes128>::new_from_slices(&self.key, &iv)
                .map_err(|_| CipherError::KeyLength(self.key.len()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
            24 => cbc::Decryptor::<Aes192>::new_from_slices(&self.key, &iv)
                .map_err(|_| CipherError::KeyLength(self.key.len()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
            _ => cbc::Decryptor::<Aes256>::new_from_slices(&self.key, &iv)
                .map_err(|_| CipherError::KeyLength(self.key.len()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
        }
        .map_err(|_| CipherError::Padding)?;

        Ok(String::from_utf8(plaintext)?)
    }

    /// Check the ticket's MAC in constant time.
    pub fn verify_mac(&self, ticket: &str) -> Result<(), CipherError> {
        let ticket = Ticket::parse(ticket)?;
        let expected = hex::decode(&ticket.mac).map_err(|_| CipherError::Mac)?;

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| CipherError::KeyLength(self.key.len()))?;
        mac.update(ticket.iv.as_bytes());
        mac.update(ticket.value.as_bytes());
        mac.verify_slice(&expected).map_err(|_| CipherError::Mac)
    }

    fn encrypt_block_aligned(
        &self,
        iv: &[u8; BLOCK_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CipherError> {
        let ciphertext = match self.key.len() {
            16 => cbc::Encryptor::<Aes128>::new_from_slices(&self.key, iv)
                .map_err(|_| CipherError::KeyLength(self.key.len()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            24 => cbc::Encryptor::<Aes192>::new_from_slices(&self.key, iv)
                .map_err(|_| CipherError::KeyLength(self.key.len()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
            _ => cbc::Encryptor::<Aes256>::new_from_slices(&self.key, iv)
                .map_err(|_| CipherError::KeyLength(self.key.len()))?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        };

        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::BlockAlignment(ciphertext.len()));
        }
        Ok(ciphertext)
    }

    fn compute_mac(&self, iv: &str, value: &str) -> Result<Vec<u8>, CipherError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| CipherError::KeyLength(self.key.len()))?;
        mac.update(iv.as_bytes());
        mac.update(value.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Decrypt `ticket` with a base64 passphrase.
pub fn decrypt(passphrase: &str, ticket: &str) -> Result<String, CipherError> {
    CredentialCipher::from_passphrase(passphrase)?.decrypt(ticket)
}

/// Encrypt `plaintext` with a base64 passphrase.
pub fn encrypt(passphrase: &str, plaintext: &str) -> Result<String, CipherError> {
    CredentialCipher::from_passphrase(passphrase)?.encrypt(plaintext)
}
