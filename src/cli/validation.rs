//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

use crate::crypto::CredentialCipher;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate an alternate host key name (letters, digits, `_` and `-`)
pub fn validate_host_param(param: &str) -> Result<String, String> {
    let param = param.trim();

    if param.is_empty() {
        return Err("Host parameter cannot be empty".to_string());
    }

    if param.len() > 64 {
        return Err("Host parameter is too long (maximum 64 characters)".to_string());
    }

    if !param
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(format!(
            "Host parameter may only contain letters, digits, '_' and '-', got: '{}'",
            param
        ));
    }

    Ok(param.to_string())
}

/// Validate that a passphrase key is base64 of a 16, 24 or 32 byte AES key
pub fn validate_passphrase_key(key: &str) -> Result<String, String> {
    let key = key.trim();
    CredentialCipher::from_passphrase(key)
        .map(|_| key.to_string())
        .map_err(|e| format!("Invalid passphrase key: {}", e))
}
