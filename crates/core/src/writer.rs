use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep, sleep_until};
use tracing::{debug, error, warn};

use galecache_common::{APPEND_MAX_ATTEMPTS, APPEND_RETRY_BASE_MS, StoreError};
use galecache_store::StoreClient;

/// Escritor de um registro: única consumidora da fila, encaminha cada
/// mensagem ao backend na ordem de chegada.
///
/// Caminhos de saída, todos limitados no tempo:
/// - canal fechado (entrada removida do registry);
/// - deadline atingido, com a fila vazia ou não;
/// - falha de escrita persistente — o registro é marcado degradado e só
///   este escritor termina.
pub(crate) async fn drain_record<C: StoreClient>(
    store: Arc<C>,
    key: String,
    deadline: Instant,
    mut rx: mpsc::Receiver<String>,
    degraded: Arc<AtomicBool>,
) {
    loop {
        let message = tokio::select! {
            msg = rx.recv() => match msg {
                Some(m) => m,
                None => {
                    debug!("fila fechada, encerrando escritor de {key}");
                    return;
                }
            },
            _ = sleep_until(deadline) => {
                debug!("ttl atingido, encerrando escritor de {key}");
                return;
            }
        };

        // Mensagem que chega depois do deadline não é escrita.
        if Instant::now() >= deadline {
            debug!("ttl atingido, encerrando escritor de {key}");
            return;
        }

        if let Err(e) = append_with_retry(&*store, &key, &message).await {
            error!("escrita em {key} falhou após {APPEND_MAX_ATTEMPTS} tentativas: {e}");
            degraded.store(true, Ordering::Relaxed);
            return;
        }
    }
}

async fn append_with_retry<C: StoreClient>(
    store: &C,
    key: &str,
    message: &str,
) -> Result<(), StoreError> {
    let mut attempt = 1;
    loop {
        match store.append(key, message).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < APPEND_MAX_ATTEMPTS => {
                warn!("escrita em {key} falhou (tentativa {attempt}): {e}");
                sleep(Duration::from_millis(
                    APPEND_RETRY_BASE_MS * u64::from(attempt),
                ))
                .await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
