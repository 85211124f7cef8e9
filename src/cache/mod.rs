//! Redis side of the fabric.
//!
//! ```text
//! RedisTopology --connect--> RedisNode(s) --> RedisDbConn --> TenantCache / MasterCache
//!                                             (replica routing, pipelines)
//! ```
//!
//! [`factory`] builds one [`RedisDbConn`] per tenant (and one for the master).
//! Reads are routed to replicas with a single fallback to the primary, writes
//! always go to the primary, and multi-key operations are sent as one pipeline
//! of single-key commands so they also work across cluster slots.

mod command;
mod error;
mod facade;
pub mod factory;
mod node;
mod pipeline;
mod reply;
mod router;
mod selector;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use command::Command;
pub use error::CacheError;
pub use facade::{MASTER_TENANT_ID, MasterCache, TenantCache, TenantRedisMap};
pub use factory::RedisTopology;
pub use node::{ClusterNode, PooledNode, RedisNode};
pub use router::RedisDbConn;
pub use selector::{RandomSelector, ReplicaSelector, RoundRobinSelector};
pub use types::{FieldValuePair, KeyFieldPair, MSetArgs};
