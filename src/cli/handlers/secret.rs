//! Secret command handler
//!
//! Encrypts and decrypts tenant passwords in the ticket format stored in the
//! tenant table.

use crate::cli::parser::SecretAction;
use crate::config::{ConfigError, Settings};
use crate::crypto::CredentialCipher;
use crate::error::AppResult;

/// Handler for the secret command
pub struct SecretCommandHandler {
    config: Settings,
}

impl SecretCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    pub fn execute(&self, action: &SecretAction) -> AppResult<()> {
        println!("{}", self.run(action)?);
        Ok(())
    }

    /// Returns the ticket or plaintext produced by `action`.
    pub fn run(&self, action: &SecretAction) -> AppResult<String> {
        let cipher = self.cipher()?;
        let output = match action {
            SecretAction::Encrypt { text } => cipher.encrypt(text)?,
            SecretAction::Decrypt { ticket } => {
                if self.config.tenancy.verify_mac {
                    cipher.verify_mac(ticket)?;
                }
                cipher.decrypt(ticket)?
            }
        };
        Ok(output)
    }

    fn cipher(&self) -> AppResult<CredentialCipher> {
        let key = &self.config.tenancy.passphrase_key;
        if key.is_empty() {
            return Err(ConfigError::validation(
                "tenancy.passphrase_key",
                "a passphrase key is required, set it in the config or pass --key",
            )
            .into());
        }
        Ok(CredentialCipher::from_passphrase(key)?)
    }
}
