use thiserror::Error;

use super::config::Engine;

/// Errors raised while decoding a tenant's connections blob.
#[derive(Error, Debug)]
pub enum TenantConfigError {
    #[error("tenant {tenant_id} ({code}): connections column is not a JSON object")]
    Malformed {
        tenant_id: i64,
        code: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("tenant {tenant_id} ({code}): cannot decode {engine} config: {source}")]
    Decode {
        tenant_id: i64,
        code: String,
        engine: Engine,
        #[source]
        source: serde_json::Error,
    },

    #[error("tenant {tenant_id} ({code}): invalid {engine} config: {source}")]
    Invalid {
        tenant_id: i64,
        code: String,
        engine: Engine,
        #[source]
        source: validator::ValidationErrors,
    },
}

impl TenantConfigError {
    pub fn tenant_id(&self) -> i64 {
        match self {
            Self::Malformed { tenant_id, .. }
            | Self::Decode { tenant_id, .. }
            | Self::Invalid { tenant_id, .. } => *tenant_id,
        }
    }
}
