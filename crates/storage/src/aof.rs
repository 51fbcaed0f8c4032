//! Log de persistência append-only.
//!
//! Um registro por linha: `OPERACAO CHAVE VALOR EXPIRACAO`, campos separados
//! por espaço e sem escape. EXPIRACAO é um timestamp Unix em segundos (0 =
//! nunca). Valores com espaço ou quebra de linha geram linhas que o replay
//! não consegue ler e descarta.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use emberkv_common::PersistenceError;

use crate::entry::{Entry, Value, is_expired_at, unix_now};

/// Operações registradas no log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOp {
    Set,
    LPush,
    LPop,
}

impl LogOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogOp::Set => "SET",
            LogOp::LPush => "LPUSH",
            LogOp::LPop => "LPOP",
        }
    }

    fn from_token(token: &str) -> Option<LogOp> {
        match token {
            "SET" => Some(LogOp::Set),
            "LPUSH" => Some(LogOp::LPush),
            "LPOP" => Some(LogOp::LPop),
            _ => None,
        }
    }
}

/// Um registro do log, emprestando chave e valor de quem o produziu.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord<'a> {
    pub op: LogOp,
    pub key: &'a str,
    pub value: &'a str,
    pub expires_at: Option<u64>,
}

impl<'a> LogRecord<'a> {
    /// Faz o parse de uma linha do log.
    ///
    /// `Ok(None)` indica operação desconhecida (linha bem formada, ignorada).
    /// Campos além do quarto são ignorados.
    pub fn parse(line: &'a str) -> Result<Option<LogRecord<'a>>, PersistenceError> {
        let mut fields = line.split_whitespace();
        let (Some(op), Some(key), Some(value), Some(expiration)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(PersistenceError::MalformedRecord(line.to_string()));
        };

        let expiration: u64 = expiration
            .parse()
            .map_err(|_| PersistenceError::MalformedRecord(line.to_string()))?;

        Ok(LogOp::from_token(op).map(|op| LogRecord {
            op,
            key,
            value,
            expires_at: (expiration > 0).then_some(expiration),
        }))
    }
}

impl fmt::Display for LogRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.op.as_str(),
            self.key,
            self.value,
            self.expires_at.unwrap_or(0)
        )
    }
}

/// Dono do arquivo de log. Cada append abre, escreve uma linha e fecha.
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    // Serializa appends vindos de shards diferentes do keyspace
    lock: Mutex<()>,
}

impl AppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grava um registro no final do arquivo, criando-o se necessário.
    pub fn append(&self, record: &LogRecord<'_>) -> Result<(), PersistenceError> {
        let line = format!("{record}\n");

        let _guard = self.lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Lê o arquivo de log e reconstrói o keyspace.
///
/// Arquivo inexistente significa keyspace vazio. Linhas malformadas são
/// puladas com um aviso; operações desconhecidas são ignoradas.
pub async fn replay(path: &Path) -> Result<HashMap<String, Entry>, PersistenceError> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("arquivo AOF não encontrado, iniciando sem dados");
            return Ok(HashMap::new());
        }
        Err(e) => return Err(e.into()),
    };

    let text = String::from_utf8_lossy(&data);
    let now = unix_now();
    let mut keyspace = HashMap::new();
    let mut applied = 0usize;
    let mut skipped = 0usize;

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record = match LogRecord::parse(line) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("AOF linha {}: operação desconhecida ignorada", idx + 1);
                continue;
            }
            Err(e) => {
                warn!("AOF linha {}: {e}", idx + 1);
                skipped += 1;
                continue;
            }
        };

        apply_record(&mut keyspace, &record);

        // Registro já expirado: a chave que ele produziu também expirou
        if is_expired_at(record.expires_at, now) {
            keyspace.remove(record.key);
            skipped += 1;
        } else {
            applied += 1;
        }
    }

    info!(
        "AOF replay completo: {applied} registros aplicados, {skipped} descartados, {} chaves",
        keyspace.len()
    );
    Ok(keyspace)
}

/// Aplica um registro ao keyspace em reconstrução.
fn apply_record(keyspace: &mut HashMap<String, Entry>, record: &LogRecord<'_>) {
    match record.op {
        LogOp::Set => {
            keyspace.insert(
                record.key.to_string(),
                Entry::new(Value::String(record.value.to_string()), record.expires_at),
            );
        }
        LogOp::LPush => {
            let entry = keyspace
                .entry(record.key.to_string())
                .or_insert_with(|| Entry::new(Value::List(VecDeque::new()), record.expires_at));
            match &mut entry.value {
                Value::List(list) => list.push_front(record.value.to_string()),
                Value::String(_) => {
                    debug!("AOF: LPUSH em string ignorado: {}", record.key);
                }
            }
        }
        LogOp::LPop => {
            let drained = match keyspace.get_mut(record.key) {
                Some(Entry {
                    value: Value::List(list),
                    ..
                }) => {
                    list.pop_front();
                    list.is_empty()
                }
                _ => false,
            };
            if drained {
                keyspace.remove(record.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record<'a>(op: LogOp, key: &'a str, value: &'a str, expires_at: Option<u64>) -> LogRecord<'a> {
        LogRecord {
            op,
            key,
            value,
            expires_at,
        }
    }

    #[test]
    fn record_line_format() {
        let rec = record(LogOp::LPush, "list", "a", None);
        assert_eq!(rec.to_string(), "LPUSH list a 0");

        let rec = record(LogOp::Set, "k", "v", Some(1_700_000_000));
        assert_eq!(rec.to_string(), "SET k v 1700000000");
    }

    #[test]
    fn parse_record() {
        let rec = LogRecord::parse("SET key value 0").unwrap().unwrap();
        assert_eq!(rec, record(LogOp::Set, "key", "value", None));

        let rec = LogRecord::parse("LPOP list x 42").unwrap().unwrap();
        assert_eq!(rec.expires_at, Some(42));
    }

    #[test]
    fn parse_malformed_record() {
        assert!(matches!(
            LogRecord::parse("SET key 0"),
            Err(PersistenceError::MalformedRecord(_))
        ));
        assert!(matches!(
            LogRecord::parse("SET key value soon"),
            Err(PersistenceError::MalformedRecord(_))
        ));
        assert!(matches!(
            LogRecord::parse("SET key value -5"),
            Err(PersistenceError::MalformedRecord(_))
        ));
    }

    #[test]
    fn parse_unknown_operation() {
        assert!(LogRecord::parse("HSET key value 0").unwrap().is_none());
    }

    #[test]
    fn append_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.aof");
        let log = AppendLog::new(&path);

        log.append(&record(LogOp::Set, "k", "v", None)).unwrap();
        log.append(&record(LogOp::LPush, "l", "x", None)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "SET k v 0\nLPUSH l x 0\n");
    }

    #[test]
    fn append_to_directory_fails() {
        let dir = tempdir().unwrap();
        let log = AppendLog::new(dir.path());
        assert!(matches!(
            log.append(&record(LogOp::Set, "k", "v", None)),
            Err(PersistenceError::Io(_))
        ));
    }

    #[tokio::test]
    async fn replay_nonexistent() {
        let dir = tempdir().unwrap();
        let keyspace = replay(&dir.path().join("missing.aof")).await.unwrap();
        assert!(keyspace.is_empty());
    }

    #[tokio::test]
    async fn replay_applies_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("replay.aof");
        std::fs::write(
            &path,
            "SET key1 value1 0\n\
             LPUSH list a 0\n\
             LPUSH list b 0\n\
             LPUSH list c 0\n\
             LPOP list c 0\n\
             SET key1 value2 0\n",
        )
        .unwrap();

        let keyspace = replay(&path).await.unwrap();
        assert_eq!(keyspace.len(), 2);
        assert_eq!(keyspace["key1"].value, Value::String("value2".into()));
        assert_eq!(
            keyspace["list"].value,
            Value::List(VecDeque::from(vec!["b".to_string(), "a".to_string()]))
        );
    }

    #[tokio::test]
    async fn replay_skips_bad_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupted.aof");
        std::fs::write(
            &path,
            "SET good v 0\n\
             garbage\n\
             SET spaced hello world 0\n\
             \n\
             INCR counter 1 0\n\
             SET other v 0\n",
        )
        .unwrap();

        let keyspace = replay(&path).await.unwrap();
        assert_eq!(keyspace.len(), 2);
        assert!(keyspace.contains_key("good"));
        assert!(keyspace.contains_key("other"));
        assert!(!keyspace.contains_key("spaced"));
        assert!(!keyspace.contains_key("counter"));
    }

    #[tokio::test]
    async fn replay_drops_expired() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("expired.aof");
        let future = unix_now() + 3_600;
        std::fs::write(
            &path,
            format!(
                "SET old v 1\n\
                 SET alive v {future}\n\
                 SET k first 0\n\
                 SET k second 1\n"
            ),
        )
        .unwrap();

        let keyspace = replay(&path).await.unwrap();
        assert!(!keyspace.contains_key("old"));
        assert!(!keyspace.contains_key("k"));
        assert_eq!(keyspace["alive"].expires_at, Some(future));
    }

    #[tokio::test]
    async fn replay_lpush_on_string_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wrongtype.aof");
        std::fs::write(&path, "SET k v 0\nLPUSH k x 0\nLPOP missing x 0\n").unwrap();

        let keyspace = replay(&path).await.unwrap();
        assert_eq!(keyspace.len(), 1);
        assert_eq!(keyspace["k"].value, Value::String("v".into()));
    }

    #[tokio::test]
    async fn whitespace_value_is_lost_on_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ws.aof");
        let log = AppendLog::new(&path);
        log.append(&record(LogOp::Set, "k", "two words", None)).unwrap();

        let keyspace = replay(&path).await.unwrap();
        assert!(!keyspace.contains_key("k"));
    }
}
