use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Tipo do valor armazenado.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    List(VecDeque<String>),
}

impl Value {
    pub fn kind(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
        }
    }
}

/// Tag de tipo exposta pelo TYPE.
///
/// `Set` e `Hash` são reservados: nenhuma operação cria valores desses tipos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    List,
    Set,
    Hash,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Set => "set",
            ValueType::Hash => "hash",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entrada no store: valor + expiração opcional (timestamp Unix, segundos).
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub value: Value,
    pub expires_at: Option<u64>,
}

impl Entry {
    pub fn new(value: Value, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    pub fn is_expired(&self) -> bool {
        is_expired_at(self.expires_at, unix_now())
    }
}

/// Predicado único de expiração, usado pela leitura, pelo sweep e pelo replay.
pub fn is_expired_at(expires_at: Option<u64>, now: u64) -> bool {
    matches!(expires_at, Some(t) if t > 0 && now > t)
}

/// Segundos desde a época Unix.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Instante absoluto de expiração para um TTL; TTL zero não expira.
///
/// TTLs além do representável saturam em `u64::MAX`.
pub fn expiry_from_ttl(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        return None;
    }
    let deadline = SystemTime::now()
        .checked_add(ttl)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(u64::MAX, |d| d.as_secs());
    Some(deadline)
}
