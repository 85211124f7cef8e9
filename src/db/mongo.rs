//! MongoDB connection factory.
//!
//! The driver keeps its own connection pool per client; each client is
//! verified with a `ping` against its database before it is handed out.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::event::EventHandler;
use mongodb::event::command::CommandEvent;
use mongodb::options::{ClientOptions, Credential, ServerAddress};
use mongodb::Client;
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::db::{AsyncDbPool, Closer, MasterConn, TenantConns, with_port};
use crate::error::AppError;
use crate::tenant::{Engine, MongoTenantConfig, SecretResolver, TenantConfigStore, TenantConnection};

/// Endpoint description shared by master and tenant clients.
struct Endpoint<'a> {
    hosts: &'a str,
    port: u16,
    username: &'a str,
    password: String,
    database: &'a str,
}

/// Connects to the master MongoDB deployment.
pub async fn init_master_conn(config: &MongoConfig) -> Result<MasterConn<Client>, AppError> {
    let master = &config.master;
    if !master.is_configured() {
        info!("MongoDB master is not configured, skipping");
        return Ok(MasterConn::absent("mongodb master"));
    }

    let endpoint = Endpoint {
        hosts: &master.host,
        port: master.port,
        username: &master.username,
        password: master.password.clone(),
        database: &master.database,
    };
    let client = connect(&endpoint, config)
        .await
        .map_err(|e| AppError::master(Engine::Mongodb, e))?;

    info!(host = %master.host, database = %master.database, "MongoDB master connected");
    Ok(MasterConn {
        closer: shutdown_closer("mongodb master", &client),
        client: Some(client),
        database: master.database.clone(),
    })
}

/// Connects every tenant listed in the master tenant table that declares MongoDB.
pub async fn init_tenant_conns(
    config: &MongoConfig,
    master: &AsyncDbPool,
    host_override_param: &str,
    secrets: &SecretResolver,
) -> Result<TenantConns<Client>, AppError> {
    let tenants = TenantConfigStore::new(master.clone()).list_tenants().await?;
    connect_tenants(config, &tenants, host_override_param, secrets).await
}

/// Connects the MongoDB endpoint of each tenant in `tenants`.
pub async fn connect_tenants(
    config: &MongoConfig,
    tenants: &[TenantConnection],
    host_override_param: &str,
    secrets: &SecretResolver,
) -> Result<TenantConns<Client>, AppError> {
    let mut conns = TenantConns::default();

    for tenant in tenants {
        let Some(tenant_config) = tenant.engine::<MongoTenantConfig>(Engine::Mongodb)? else {
            debug!(tenant_id = tenant.tenant_id, "Tenant declares no MongoDB connection");
            conns.insert_absent(tenant.tenant_id);
            continue;
        };

        let password = secrets
            .reveal(&tenant_config.password)
            .map_err(|e| AppError::tenant(Engine::Mongodb, tenant, e))?;
        let endpoint = Endpoint {
            hosts: tenant_config.host_for(host_override_param),
            port: tenant_config.port,
            username: &tenant_config.username,
            password,
            database: &tenant_config.database,
        };
        let client = connect(&endpoint, config)
            .await
            .map_err(|e| AppError::tenant(Engine::Mongodb, tenant, e))?;

        debug!(tenant_id = tenant.tenant_id, database = %tenant_config.database, "Tenant MongoDB connected");
        let closer = shutdown_closer(format!("mongodb tenant {}", tenant.tenant_id), &client);
        conns.insert(tenant.tenant_id, client, tenant_config.database.clone(), closer);
    }

    info!(
        tenants = tenants.len(),
        connected = conns.connected(),
        "MongoDB tenant connections ready"
    );
    Ok(conns)
}

fn client_options(endpoint: &Endpoint<'_>, config: &MongoConfig) -> mongodb::error::Result<ClientOptions> {
    let hosts = endpoint
        .hosts
        .split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(|host| ServerAddress::parse(with_port(host, endpoint.port)))
        .collect::<mongodb::error::Result<Vec<_>>>()?;

    let mut options = ClientOptions::default();
    options.hosts = hosts;
    options.default_database = Some(endpoint.database.to_string());
    if !endpoint.username.is_empty() {
        options.credential = Some(
            Credential::builder()
                .username(endpoint.username.to_string())
                .password(endpoint.password.clone())
                .source(endpoint.database.to_string())
                .build(),
        );
    }
    options.connect_timeout = Some(Duration::from_secs(config.connect_timeout));
    options.server_selection_timeout = Some(Duration::from_secs(config.connect_timeout));
    options.max_pool_size = Some(config.max_connection_pool_size);
    options.min_pool_size = Some(config.min_connection_pool_size);
    if config.max_idle_connection_lifetime > 0 {
        options.max_idle_time = Some(Duration::from_secs(config.max_idle_connection_lifetime));
    }
    if config.debug {
        options.command_event_handler = Some(EventHandler::callback(log_command));
    }
    Ok(options)
}

async fn connect(endpoint: &Endpoint<'_>, config: &MongoConfig) -> mongodb::error::Result<Client> {
    let options = client_options(endpoint, config)?;
    let client = Client::with_options(options)?;
    client
        .database(endpoint.database)
        .run_command(doc! { "ping": 1 })
        .await?;
    Ok(client)
}

fn shutdown_closer(label: impl Into<String>, client: &Client) -> Closer {
    let client = client.clone();
    Closer::new(label, async move {
        client.shutdown().await;
    })
}

fn log_command(event: CommandEvent) {
    match event {
        CommandEvent::Started(started) => {
            debug!(target: "mongodb", command = %started.command_name, db = %started.db, "Executing command");
        }
        CommandEvent::Failed(failed) => {
            debug!(target: "mongodb", command = %failed.command_name, error = %failed.failure, "Command failed");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MasterEndpoint;

    fn endpoint<'a>(hosts: &'a str, username: &'a str) -> Endpoint<'a> {
        Endpoint {
            hosts,
            port: 27017,
            username,
            password: "pw".to_string(),
            database: "tenant_db",
        }
    }

    #[test]
    fn test_options_expand_host_list() {
        let options = client_options(&endpoint("m1, m2:27018", "app"), &MongoConfig::default()).unwrap();
        let hosts: Vec<String> = options.hosts.iter().map(ToString::to_string).collect();
        assert_eq!(hosts, vec!["m1:27017".to_string(), "m2:27018".to_string()]);

        let credential = options.credential.unwrap();
        assert_eq!(credential.username.as_deref(), Some("app"));
        assert_eq!(credential.source.as_deref(), Some("tenant_db"));
    }

    #[test]
    fn test_options_without_username_skip_auth() {
        let options = client_options(&endpoint("m1", ""), &MongoConfig::default()).unwrap();
        assert!(options.credential.is_none());
        assert_eq!(options.max_pool_size, Some(MongoConfig::default().max_connection_pool_size));
    }

    #[tokio::test]
    async fn test_unconfigured_master_is_absent() {
        let config = MongoConfig {
            master: MasterEndpoint::default(),
            ..MongoConfig::default()
        };
        let master = init_master_conn(&config).await.unwrap();
        assert!(!master.is_connected());
    }

    #[tokio::test]
    async fn test_tenants_without_mongodb_are_recorded_absent() {
        let tenants = vec![TenantConnection::new(
            1,
            "alpha",
            r#"{"mysql":{"username":"u","host":"h","port":3306,"database":"d"}}"#,
        )];
        let conns = connect_tenants(&MongoConfig::default(), &tenants, "", &SecretResolver::plaintext())
            .await
            .unwrap();
        assert_eq!(conns.clients.len(), 1);
        assert!(conns.clients[&1].is_none());
    }
}
