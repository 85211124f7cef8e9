//! Cipher error types.

use thiserror::Error;

/// Errors raised while encrypting or decrypting a credential ticket.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Invalid base64 in {field}: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Malformed ticket envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("Invalid key length {0}: expected 16, 24 or 32 bytes")]
    KeyLength(usize),

    #[error("Invalid IV length {0}: expected 16 bytes")]
    IvLength(usize),

    #[error("Ciphertext length {0} is not a multiple of the block size")]
    BlockAlignment(usize),

    #[error("Invalid padding")]
    Padding,

    #[error("Decrypted value is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("MAC verification failed")]
    Mac,
}

impl CipherError {
    pub(crate) fn base64(field: &'static str, source: base64::DecodeError) -> Self {
        CipherError::Base64 { field, source }
    }
}
