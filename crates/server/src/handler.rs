use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::debug;

use emberkv_common::{ConnectionError, StorageError};
use emberkv_protocol::{Command, Frame};
use emberkv_storage::Db;

use crate::Connection;

/// Loop principal de tratamento de uma conexão.
///
/// Termina no EOF, em erro de protocolo/escrita ou no shutdown do servidor.
pub async fn handle_connection(
    mut conn: Connection,
    db: Db,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let args = tokio::select! {
            result = conn.read_command() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let args = match args {
            Some(args) => args,
            None => return Ok(()), // EOF
        };

        if args.is_empty() {
            continue;
        }

        let response = match Command::from_args(args) {
            Ok(cmd) => {
                debug!("comando recebido: {cmd:?}");
                execute_command(cmd, &db)
            }
            Err(e) => Frame::Error(format!("ERR {e}")),
        };

        conn.write_frame(&response).await?;
    }
}

/// Executa um comando e retorna o Frame de resposta.
fn execute_command(cmd: Command, db: &Db) -> Frame {
    match cmd {
        Command::Ping => Frame::Simple("PONG".into()),
        Command::Get(key) => match db.get(&key) {
            Some(value) => Frame::bulk_or_null(value),
            None => Frame::Null,
        },
        Command::Set { key, value } => {
            db.set(key, value, None);
            Frame::Simple("OK".into())
        }
        Command::Del(keys) => {
            let count: usize = keys.iter().map(|key| db.delete(key)).sum();
            Frame::Integer(count as i64)
        }
        Command::Exists(keys) => {
            let count = keys.iter().filter(|key| db.exists(key)).count();
            Frame::Integer(count as i64)
        }
        Command::Type(key) => {
            let tag = db.get_type(&key).map_or("none", |kind| kind.as_str());
            Frame::Simple(tag.into())
        }
        Command::LPush { key, value } => match db.lpush(&key, value) {
            Ok(len) => Frame::Integer(len as i64),
            // Chave com string: nada é inserido e o tamanho reportado é 0
            Err(StorageError::WrongType) => Frame::Integer(0),
        },
        Command::LPop(key) => match db.lpop(&key) {
            Some(value) => Frame::bulk_or_null(value),
            None => Frame::Null,
        },
        Command::LRange { key, start, stop } => {
            let items = db.lrange(&key, start, stop).unwrap_or_default();
            Frame::Array(
                items
                    .into_iter()
                    .map(|item| Frame::Bulk(Bytes::from(item)))
                    .collect(),
            )
        }
        Command::Unknown(name) => Frame::Error(format!("ERR unknown command '{name}'")),
    }
}
