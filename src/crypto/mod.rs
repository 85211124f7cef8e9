//! Tenant credential encryption.
//!
//! Tenant passwords are stored as base64 "tickets": a JSON envelope holding the
//! IV, the AES-CBC ciphertext and an HMAC-SHA256 tag, all wrapped in base64.

mod cipher;
mod error;

pub use cipher::{CredentialCipher, Ticket, decrypt, encrypt};
pub use error::CipherError;
