use crate::crypto::{CipherError, CredentialCipher};

/// Turns the password stored in a tenant sub-config into plaintext.
///
/// With an empty passphrase key the stored password is used verbatim.
#[derive(Debug, Clone, Default)]
pub struct SecretResolver {
    cipher: Option<CredentialCipher>,
    verify_mac: bool,
}

impl SecretResolver {
    pub fn new(passphrase_key: &str, verify_mac: bool) -> Result<Self, CipherError> {
        let cipher = if passphrase_key.is_empty() {
            None
        } else {
            Some(CredentialCipher::from_passphrase(passphrase_key)?)
        };
        Ok(Self { cipher, verify_mac })
    }

    pub fn plaintext() -> Self {
        Self::default()
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn reveal(&self, stored: &str) -> Result<String, CipherError> {
        let Some(cipher) = &self.cipher else {
            return Ok(stored.to_string());
        };
        if stored.is_empty() {
            return Ok(String::new());
        }
        if self.verify_mac {
            cipher.verify_mac(stored)?;
        }
        cipher.decrypt(stored)
    }
}
