//! tenant-fabric
//!
//! Multi-tenant connection and cache fabric: master and per-tenant MySQL,
//! MongoDB and Redis connections built from the tenant table, plus the
//! tenant-scoped Redis cache facade.

use shadow_rs::shadow;
shadow!(build);

pub mod cache;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;
pub mod deps;
pub mod error;
pub mod logger;
pub mod schema;
pub mod tenant;

pub use deps::DbDeps;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
