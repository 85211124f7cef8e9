//! Tenant connection directory.
//!
//! Every tenant owns one row in the master `tenant_connections` table. The
//! row's `connections` column is a JSON object keyed by engine name; each
//! entry describes how to reach that tenant's MySQL, MongoDB or Redis backend.

mod config;
mod error;
mod model;
mod secrets;
mod store;

pub use config::{DatabaseTenantConfig, Engine, MongoTenantConfig, RedisTenantConfig, SqlTenantConfig};
pub use error::TenantConfigError;
pub use model::{TenantConnection, TenantConnectionRow};
pub use secrets::SecretResolver;
pub use store::{CREATE_TABLE_SQL, TenantConfigStore};
