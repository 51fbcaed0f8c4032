use std::future::Future;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info};

use emberkv_common::{EmberResult, MAX_CONNECTIONS};
use emberkv_storage::Db;

use crate::{Connection, handle_connection};

/// Faz o bind em `addr` e atende conexões indefinidamente.
///
/// Só retorna se o bind falhar.
pub async fn start(addr: impl ToSocketAddrs, db: Db) -> EmberResult<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("EmberKV escutando em {}", listener.local_addr()?);
    serve(listener, db, MAX_CONNECTIONS, std::future::pending::<()>()).await;
    Ok(())
}

/// Loop de accept: uma task por conexão, no máximo `max_connections` simultâneas.
///
/// Quando `shutdown` completa, para de aceitar e avisa as conexões abertas.
pub async fn serve(listener: TcpListener, db: Db, max_connections: usize, shutdown: impl Future) {
    let semaphore = Arc::new(Semaphore::new(max_connections));
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    tokio::pin!(shutdown);

    loop {
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = &mut shutdown => {
                info!("shutdown signal recebido");
                break;
            }
        };

        let (socket, addr) = tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok(v) => v,
                    Err(e) => {
                        error!("erro ao aceitar conexão: {e}");
                        continue;
                    }
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal recebido");
                break;
            }
        };

        info!("nova conexão: {addr}");
        let db = db.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let conn = Connection::new(socket);
            if let Err(e) = handle_connection(conn, db, &mut shutdown_rx).await {
                error!("erro na conexão {addr}: {e}");
            }
            info!("conexão encerrada: {addr}");
            drop(permit);
        });
    }

    // Fecha o canal: conexões abertas recebem o sinal e encerram
    drop(shutdown_tx);
}
