use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as Slot;
use tokio::sync::Notify;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use emberkv_common::{SWEEP_INTERVAL_SECS, StorageError};

use crate::aof::{AppendLog, LogOp, LogRecord, replay};
use crate::entry::{Entry, Value, ValueType, expiry_from_ttl, is_expired_at, unix_now};

/// Período mínimo do sweep; `interval` não aceita zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Configuração do Db.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Arquivo AOF. `None` mantém o store apenas em memória.
    pub aof_path: Option<PathBuf>,
    /// Período da varredura de chaves expiradas.
    pub sweep_interval: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            aof_path: None,
            sweep_interval: Duration::from_secs(SWEEP_INTERVAL_SECS),
        }
    }
}

/// Estado compartilhado entre todas as conexões.
struct SharedState {
    data: DashMap<String, Entry>,
    aof: Option<AppendLog>,
    shutdown: Arc<Notify>,
}

impl SharedState {
    /// Remove todas as chaves expiradas. Retorna quantas saíram.
    fn sweep(&self) -> usize {
        let now = unix_now();
        let mut removed = 0;
        self.data.retain(|key, entry| {
            let keep = !is_expired_at(entry.expires_at, now);
            if !keep {
                debug!("key expirada removida: {key}");
                removed += 1;
            }
            keep
        });
        removed
    }
}

impl Drop for SharedState {
    fn drop(&mut self) {
        self.shutdown.notify_one();
    }
}

/// Handle para o banco de dados in-memory.
///
/// Clonar é barato: todos os clones compartilham o mesmo keyspace. A task de
/// sweep termina quando o último handle é descartado ou em `shutdown()`.
#[derive(Clone)]
pub struct Db {
    shared: Arc<SharedState>,
}

impl Db {
    /// Store apenas em memória, sem AOF.
    pub fn new() -> Self {
        Self::from_parts(DashMap::new(), None, DbConfig::default().sweep_interval)
    }

    /// Store persistido em `path`: faz o replay do log antes de aceitar operações.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_config(DbConfig {
            aof_path: Some(path.into()),
            ..DbConfig::default()
        })
        .await
    }

    pub async fn with_config(config: DbConfig) -> Self {
        let (data, aof) = match config.aof_path {
            Some(path) => {
                let data = match replay(&path).await {
                    Ok(keyspace) => keyspace.into_iter().collect(),
                    Err(e) => {
                        warn!("falha no replay do AOF {path:?}: {e}; iniciando sem dados");
                        DashMap::new()
                    }
                };
                let aof = AppendLog::new(path);
                info!("AOF ativo: {:?}", aof.path());
                (data, Some(aof))
            }
            None => (DashMap::new(), None),
        };

        Self::from_parts(data, aof, config.sweep_interval)
    }

    fn from_parts(data: DashMap<String, Entry>, aof: Option<AppendLog>, every: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let db = Db {
            shared: Arc::new(SharedState {
                data,
                aof,
                shutdown: shutdown.clone(),
            }),
        };

        // Spawn background task para purgar keys expiradas
        let shared = Arc::downgrade(&db.shared);
        tokio::spawn(async move {
            sweep_expired_keys(shared, shutdown, every).await;
        });

        db
    }

    /// Interrompe a task de sweep. As operações continuam funcionando.
    pub fn shutdown(&self) {
        self.shared.shutdown.notify_one();
    }

    /// Número de chaves no keyspace, incluindo expiradas ainda não removidas.
    pub fn len(&self) -> usize {
        self.shared.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.data.is_empty()
    }

    // --- String operations ---

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.shared.data.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.evict_expired(key);
            return None;
        }
        match &entry.value {
            Value::String(data) => Some(data.clone()),
            Value::List(_) => None,
        }
    }

    /// Sobrescreve incondicionalmente. TTL ausente ou zero não expira.
    pub fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(expiry_from_ttl);
        let slot = self
            .shared
            .data
            .entry(key)
            .insert(Entry::new(Value::String(value), expires_at));

        // Ainda com o shard travado: a ordem no AOF segue a ordem de aplicação
        if let Value::String(data) = &slot.value {
            self.log(LogOp::Set, slot.key(), data, expires_at);
        }
    }

    /// Remove a chave sem olhar tipo nem expiração. Retorna 1 ou 0.
    pub fn delete(&self, key: &str) -> usize {
        usize::from(self.shared.data.remove(key).is_some())
    }

    pub fn exists(&self, key: &str) -> bool {
        let Some(entry) = self.shared.data.get(key) else {
            return false;
        };
        if entry.is_expired() {
            drop(entry);
            self.evict_expired(key);
            return false;
        }
        true
    }

    pub fn get_type(&self, key: &str) -> Option<ValueType> {
        let entry = self.shared.data.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.evict_expired(key);
            return None;
        }
        Some(entry.value.kind())
    }

    // --- List operations ---

    /// Insere na cabeça da lista, criando-a se a chave não existir.
    pub fn lpush(&self, key: &str, value: String) -> Result<usize, StorageError> {
        let mut slot = self
            .shared
            .data
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::List(VecDeque::new()), None));

        if slot.is_expired() {
            *slot = Entry::new(Value::List(VecDeque::new()), None);
        }

        let Entry {
            value: stored,
            expires_at,
        } = &mut *slot;

        match stored {
            Value::List(list) => {
                self.log(LogOp::LPush, key, &value, *expires_at);
                list.push_front(value);
                Ok(list.len())
            }
            Value::String(_) => Err(StorageError::WrongType),
        }
    }

    /// Remove e retorna a cabeça da lista. A chave some quando a lista esvazia.
    pub fn lpop(&self, key: &str) -> Option<String> {
        // Lock exclusivo do shard do início ao fim: ninguém vê a lista vazia
        let Slot::Occupied(mut slot) = self.shared.data.entry(key.to_string()) else {
            return None;
        };
        if slot.get().is_expired() {
            slot.remove();
            debug!("key expirada removida: {key}");
            return None;
        }

        let Entry { value, expires_at } = slot.get_mut();
        let Value::List(list) = value else {
            return None;
        };
        let popped = list.pop_front()?;
        self.log(LogOp::LPop, key, &popped, *expires_at);

        if list.is_empty() {
            slot.remove();
        }
        Some(popped)
    }

    /// Fatia da lista com índices inclusivos; negativos contam do fim.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Option<Vec<String>> {
        let entry = self.shared.data.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.evict_expired(key);
            return None;
        }

        match &entry.value {
            Value::List(list) => Some(match list_range(list.len(), start, stop) {
                Some(range) => list.range(range).cloned().collect(),
                None => Vec::new(),
            }),
            Value::String(_) => None,
        }
    }

    /// Remoção lazy. Revalida sob o lock exclusivo do shard, pois outra
    /// escrita pode ter substituído a entrada depois da leitura.
    fn evict_expired(&self, key: &str) {
        if self
            .shared
            .data
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some()
        {
            debug!("key expirada removida: {key}");
        }
    }

    fn log(&self, op: LogOp, key: &str, value: &str, expires_at: Option<u64>) {
        let Some(aof) = &self.shared.aof else {
            return;
        };
        let record = LogRecord {
            op,
            key,
            value,
            expires_at,
        };
        // Best-effort: a mutação em memória já foi aplicada
        if let Err(e) = aof.append(&record) {
            warn!("falha ao gravar no AOF ({record}): {e}");
        }
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

/// Normaliza índices estilo Redis para um intervalo válido de `0..len`.
fn list_range(len: usize, start: i64, stop: i64) -> Option<RangeInclusive<usize>> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let start = (if start < 0 { len + start } else { start }).max(0);
    let stop = (if stop < 0 { len + stop } else { stop }).min(len - 1);

    if start > stop {
        return None;
    }
    Some(start as usize..=stop as usize)
}

/// Background task que purga chaves expiradas periodicamente.
async fn sweep_expired_keys(shared: Weak<SharedState>, shutdown: Arc<Notify>, every: Duration) {
    let mut tick = interval(every.max(MIN_SWEEP_INTERVAL));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick.tick().await; // o primeiro tick é imediato

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = shutdown.notified() => {
                debug!("sweep de expiração encerrado");
                return;
            }
        }

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let removed = shared.sweep();
        if removed > 0 {
            debug!("sweep: {removed} chaves expiradas removidas");
        }
    }
}
