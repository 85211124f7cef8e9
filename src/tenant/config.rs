use std::fmt;

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

/// Backend engines a tenant may declare in its connections blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Mysql,
    Mongodb,
    Redis,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Mysql, Engine::Mongodb, Engine::Redis];

    /// Key of this engine inside the connections JSON object.
    pub fn key(&self) -> &'static str {
        match self {
            Engine::Mysql => "mysql",
            Engine::Mongodb => "mongodb",
            Engine::Redis => "redis",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Relational or document database endpoint of a tenant.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DatabaseTenantConfig {
    #[serde(default)]
    pub username: String,

    /// Plain or encrypted password, see [`SecretResolver`](super::SecretResolver).
    #[serde(default)]
    pub password: String,

    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    #[serde(deserialize_with = "port_from_any")]
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: u16,

    #[validate(length(min = 1, message = "database must not be empty"))]
    pub database: String,

    /// Unknown keys, including any alternate host key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type SqlTenantConfig = DatabaseTenantConfig;
pub type MongoTenantConfig = DatabaseTenantConfig;

impl DatabaseTenantConfig {
    pub fn host_for(&self, param: &str) -> &str {
        override_host(&self.extra, param).unwrap_or(&self.host)
    }
}

/// Redis endpoint of a tenant. A comma separated `host` selects cluster mode.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedisTenantConfig {
    #[serde(default)]
    pub password: String,

    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    #[serde(deserialize_with = "port_from_any")]
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: u16,

    #[serde(default, deserialize_with = "index_from_any")]
    #[validate(range(min = 0, message = "database index must not be negative"))]
    pub database: Option<i64>,

    /// Read replica hosts, with or without an explicit port.
    #[serde(default)]
    pub read: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RedisTenantConfig {
    pub fn host_for(&self, param: &str) -> &str {
        override_host(&self.extra, param).unwrap_or(&self.host)
    }

    pub fn database_index(&self) -> i64 {
        self.database.unwrap_or(0)
    }
}

fn override_host<'a>(extra: &'a Map<String, Value>, param: &str) -> Option<&'a str> {
    if param.is_empty() {
        return None;
    }
    extra
        .get(param)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|host| !host.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

fn port_from_any<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let port = match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n,
        NumberOrText::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid port '{text}'")))?,
    };
    u16::try_from(port).map_err(|_| de::Error::custom(format!("port {port} out of range")))
}

fn index_from_any<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid database index '{text}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_accepts_string_and_number() {
        let a: SqlTenantConfig =
            serde_json::from_str(r#"{"username":"u","host":"h","port":"3307","database":"d"}"#).unwrap();
        let b: SqlTenantConfig =
            serde_json::from_str(r#"{"username":"u","host":"h","port":3307,"database":"d"}"#).unwrap();
        assert_eq!(a.port, 3307);
        assert_eq!(b.port, 3307);
    }

    #[test]
    fn test_port_out_of_range_rejected() {
        let result: Result<SqlTenantConfig, _> =
            serde_json::from_str(r#"{"host":"h","port":70000,"database":"d"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_redis_database_index_forms() {
        let cases = [
            (r#"{"host":"r","port":6379}"#, 0),
            (r#"{"host":"r","port":6379,"database":""}"#, 0),
            (r#"{"host":"r","port":6379,"database":"4"}"#, 4),
            (r#"{"host":"r","port":6379,"database":5}"#, 5),
            (r#"{"host":"r","port":6379,"database":null}"#, 0),
        ];
        for (raw, expected) in cases {
            let cfg: RedisTenantConfig = serde_json::from_str(raw).unwrap();
            assert_eq!(cfg.database_index(), expected, "{raw}");
        }
    }

    #[test]
    fn test_host_override() {
        let cfg: RedisTenantConfig = serde_json::from_str(
            r#"{"host":"public.example","port":6379,"internal_host":"10.1.0.4","read":["r1"]}"#,
        )
        .unwrap();
        assert_eq!(cfg.host_for("internal_host"), "10.1.0.4");
        assert_eq!(cfg.host_for(""), "public.example");
        assert_eq!(cfg.host_for("vpc_host"), "public.example");
        assert_eq!(cfg.read, vec!["r1".to_string()]);
    }

    #[test]
    fn test_blank_override_falls_back() {
        let cfg: SqlTenantConfig =
            serde_json::from_str(r#"{"host":"db","port":1,"database":"d","internal_host":" "}"#).unwrap();
        assert_eq!(cfg.host_for("internal_host"), "db");
    }

    #[test]
    fn test_engine_keys() {
        assert_eq!(Engine::Mongodb.to_string(), "mongodb");
        assert_eq!(Engine::ALL.map(|e| e.key()), ["mysql", "mongodb", "redis"]);
    }
}
