//! In-memory Redis node for unit tests.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{RedisError, RedisResult, Value};

use crate::cache::{Command, RedisNode, ReplicaSelector};

#[derive(Debug, Clone)]
enum Data {
    Text(String),
    Hash(BTreeMap<String, String>),
    List(Vec<String>),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

/// Keyspace shared by every node cloned from it.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    /// Remaining time to live of `key`, `None` when unset or missing.
    pub(crate) fn ttl(&self, key: &str) -> Option<Duration> {
        let map = self.inner.lock().unwrap();
        map.get(key)
            .and_then(|e| e.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.inner.lock().unwrap().contains_key(key)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Fake node answering the subset of commands the cache issues.
#[derive(Debug)]
pub(crate) struct MemoryNode {
    addr: String,
    store: MemoryStore,
    calls: AtomicUsize,
    failing: bool,
}

impl MemoryNode {
    pub(crate) fn new(addr: &str) -> Self {
        Self::with_store(addr, MemoryStore::default())
    }

    pub(crate) fn with_store(addr: &str, store: MemoryStore) -> Self {
        Self {
            addr: addr.to_string(),
            store,
            calls: AtomicUsize::new(0),
            failing: false,
        }
    }

    /// A node whose every call fails with a connection error.
    pub(crate) fn failing(addr: &str) -> Self {
        Self {
            failing: true,
            ..Self::new(addr)
        }
    }

    /// Number of `query` plus `query_pipeline` invocations.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn refuse(&self) -> RedisError {
        RedisError::from(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("{} is down", self.addr),
        ))
    }

    fn apply(&self, cmd: &Command) -> RedisResult<Value> {
        let args: Vec<String> = cmd
            .args()
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        let mut map = self.store.inner.lock().unwrap();
        let now = Instant::now();
        map.retain(|_, e| e.expires_at.is_none_or(|at| at > now));

        let value = match (cmd.name(), args.as_slice()) {
            ("PING", _) => Value::SimpleString("PONG".to_string()),
            ("GET", [key]) => match map.get(key).map(|e| &e.data) {
                Some(Data::Text(v)) => bulk(v),
                Some(_) => return Err(wrong_type()),
                None => Value::Nil,
            },
            ("SET", [key, value, rest @ ..]) => {
                let expires_at = match rest {
                    [] => None,
                    [unit, amount] => {
                        let amount: u64 = amount.parse().map_err(|_| syntax())?;
                        match unit.as_str() {
                            "EX" => Some(now + Duration::from_secs(amount)),
                            "PX" => Some(now + Duration::from_millis(amount)),
                            _ => return Err(syntax()),
                        }
                    }
                    _ => return Err(syntax()),
                };
                map.insert(
                    key.clone(),
                    Entry {
                        data: Data::Text(value.clone()),
                        expires_at,
                    },
                );
                Value::Okay
            }
            ("DEL", keys) => Value::Int(keys.iter().filter(|k| map.remove(*k).is_some()).count() as i64),
            ("EXPIRE" | "PEXPIRE", [key, amount]) => {
                let amount: u64 = amount.parse().map_err(|_| syntax())?;
                let ttl = if cmd.name() == "EXPIRE" {
                    Duration::from_secs(amount)
                } else {
                    Duration::from_millis(amount)
                };
                if ttl.is_zero() {
                    Value::Int(i64::from(map.remove(key).is_some()))
                } else if let Some(entry) = map.get_mut(key) {
                    entry.expires_at = Some(now + ttl);
                    Value::Int(1)
                } else {
                    Value::Int(0)
                }
            }
            ("INCRBY", [key, delta]) => {
                let delta: i64 = delta.parse().map_err(|_| syntax())?;
                let entry = map.entry(key.clone()).or_insert_with(|| Entry {
                    data: Data::Text("0".to_string()),
                    expires_at: None,
                });
                let Data::Text(current) = &mut entry.data else {
                    return Err(wrong_type());
                };
                let next = current.parse::<i64>().map_err(|_| syntax())? + delta;
                *current = next.to_string();
                Value::Int(next)
            }
            ("HGET", [key, field]) => match map.get(key).map(|e| &e.data) {
                Some(Data::Hash(h)) => h.get(field).map_or(Value::Nil, |v| bulk(v)),
                Some(_) => return Err(wrong_type()),
                None => Value::Nil,
            },
            ("HSET", [key, pairs @ ..]) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
                let entry = map.entry(key.clone()).or_insert_with(|| Entry {
                    data: Data::Hash(BTreeMap::new()),
                    expires_at: None,
                });
                let Data::Hash(hash) = &mut entry.data else {
                    return Err(wrong_type());
                };
                let added = pairs
                    .chunks(2)
                    .filter(|p| hash.insert(p[0].clone(), p[1].clone()).is_none())
                    .count();
                Value::Int(added as i64)
            }
            ("RPUSH", [key, values @ ..]) if !values.is_empty() => {
                let entry = map.entry(key.clone()).or_insert_with(|| Entry {
                    data: Data::List(Vec::new()),
                    expires_at: None,
                });
                let Data::List(list) = &mut entry.data else {
                    return Err(wrong_type());
                };
                list.extend(values.iter().cloned());
                Value::Int(list.len() as i64)
            }
            ("LRANGE", [key, start, stop]) => {
                let start: i64 = start.parse().map_err(|_| syntax())?;
                let stop: i64 = stop.parse().map_err(|_| syntax())?;
                match map.get(key).map(|e| &e.data) {
                    Some(Data::List(list)) => Value::Array(range(list, start, stop).iter().map(|v| bulk(v)).collect()),
                    Some(_) => return Err(wrong_type()),
                    None => Value::Array(Vec::new()),
                }
            }
            ("SADD", [key, members @ ..]) if !members.is_empty() => {
                let entry = map.entry(key.clone()).or_insert_with(|| Entry {
                    data: Data::Set(BTreeSet::new()),
                    expires_at: None,
                });
                let Data::Set(set) = &mut entry.data else {
                    return Err(wrong_type());
                };
                Value::Int(members.iter().filter(|m| set.insert((*m).clone())).count() as i64)
            }
            ("SREM", [key, members @ ..]) if !members.is_empty() => match map.get_mut(key).map(|e| &mut e.data) {
                Some(Data::Set(set)) => Value::Int(members.iter().filter(|m| set.remove(*m)).count() as i64),
                Some(_) => return Err(wrong_type()),
                None => Value::Int(0),
            },
            ("SMEMBERS", [key]) => match map.get(key).map(|e| &e.data) {
                Some(Data::Set(set)) => Value::Array(set.iter().map(|v| bulk(v)).collect()),
                Some(_) => return Err(wrong_type()),
                None => Value::Array(Vec::new()),
            },
            ("SISMEMBER", [key, member]) => match map.get(key).map(|e| &e.data) {
                Some(Data::Set(set)) => Value::Int(i64::from(set.contains(member))),
                Some(_) => return Err(wrong_type()),
                None => Value::Int(0),
            },
            ("SRANDMEMBER", [key, count]) => {
                let count: i64 = count.parse().map_err(|_| syntax())?;
                match map.get(key).map(|e| &e.data) {
                    Some(Data::Set(set)) => {
                        let take = if count < 0 { set.len() } else { count as usize };
                        Value::Array(set.iter().take(take).map(|v| bulk(v)).collect())
                    }
                    Some(_) => return Err(wrong_type()),
                    None => Value::Array(Vec::new()),
                }
            }
            _ => return Err(syntax()),
        };
        Ok(value)
    }
}

#[async_trait]
impl RedisNode for MemoryNode {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn query(&self, cmd: &Command) -> RedisResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(self.refuse());
        }
        self.apply(cmd)
    }

    async fn query_pipeline(&self, cmds: &[Command]) -> RedisResult<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(self.refuse());
        }
        cmds.iter().map(|cmd| self.apply(cmd)).collect()
    }
}

/// Always picks the same replica index.
#[derive(Debug)]
pub(crate) struct FixedSelector(pub usize);

impl ReplicaSelector for FixedSelector {
    fn select(&self, _replicas: usize) -> usize {
        self.0
    }
}

fn bulk(text: &str) -> Value {
    Value::BulkString(text.as_bytes().to_vec())
}

fn range(list: &[String], start: i64, stop: i64) -> &[String] {
    let len = list.len() as i64;
    let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
    let (start, stop) = (norm(start), norm(stop).min(len - 1));
    if len == 0 || start > stop {
        return &[];
    }
    &list[start as usize..=stop as usize]
}

fn syntax() -> RedisError {
    RedisError::from(io::Error::new(io::ErrorKind::InvalidInput, "syntax error"))
}

fn wrong_type() -> RedisError {
    RedisError::from(io::Error::new(
        io::ErrorKind::InvalidData,
        "WRONGTYPE Operation against a key holding the wrong kind of value",
    ))
}
