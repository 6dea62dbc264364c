use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};
use tracing::{error, info, warn};

use galecache_common::{GaleError, GaleResult, QUEUE_CAPACITY, RecordError, StoreError};
use galecache_store::{StoreClient, StoreStats};

use crate::registry::{Record, Registry};
use crate::sweeper::run_sweeper;
use crate::writer::drain_record;

/// Fachada do ciclo de vida de registros: criação, append com backpressure,
/// leitura e estatísticas. Todo acesso ao registry passa por aqui.
///
/// Clonável e barato de clonar; os clones compartilham registry e store.
pub struct Controller<C: StoreClient> {
    store: Arc<C>,
    registry: Arc<Registry>,
}

impl<C: StoreClient> Clone for Controller<C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<C: StoreClient> Controller<C> {
    /// Cria o controller e inicia a varredura de expiração em background.
    /// A varredura encerra quando o canal de shutdown sinaliza.
    pub fn new(store: C, sweep_period: Duration, shutdown: broadcast::Receiver<()>) -> Self {
        let registry = Arc::new(Registry::new());
        tokio::spawn(run_sweeper(registry.clone(), sweep_period, shutdown));
        Self {
            store: Arc::new(store),
            registry,
        }
    }

    /// Cria um registro com TTL em segundos e inicia seu escritor.
    ///
    /// A chamada ao backend fica fora do lock do registry: checagem rápida
    /// de duplicata antes, registro (re-checado) depois. Se dois CREATE
    /// concorrentes passarem pela checagem inicial, o perdedor recebe
    /// DuplicateKey; como a criação no backend é um reset (a lista renasce
    /// só com o sentinela), a transação do perdedor deixa exatamente o
    /// estado que o vencedor acabou de criar.
    pub async fn create_record(&self, key: &str, ttl: u32) -> GaleResult<(String, u32)> {
        if self.registry.is_live(key) {
            return Err(RecordError::DuplicateKey.into());
        }

        self.store.create_record(key, ttl).await?;

        let deadline = Instant::now() + Duration::from_secs(u64::from(ttl));
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let degraded = Arc::new(AtomicBool::new(false));

        self.registry.insert(
            key,
            Record {
                deadline,
                tx,
                degraded: degraded.clone(),
            },
        )?;

        tokio::spawn(drain_record(
            self.store.clone(),
            key.to_string(),
            deadline,
            rx,
            degraded,
        ));

        info!("registro criado: {key} (ttl {ttl}s)");
        Ok((key.to_string(), ttl))
    }

    /// Enfileira uma mensagem em um registro vivo. Fila cheia bloqueia o
    /// chamador até o escritor drenar; o cancelamento fica a cargo do
    /// transporte (deadline da requisição, shutdown da conexão).
    pub async fn store_message(&self, key: &str, message: String) -> GaleResult<()> {
        let (tx, degraded) = self
            .registry
            .sender(key)
            .ok_or(RecordError::ExpiredOrUnknown)?;

        if degraded.load(Ordering::Relaxed) {
            warn!("append rejeitado, registro degradado: {key}");
            return Err(StoreError::OperationFailed(format!(
                "registro degradado por falhas de escrita: {key}"
            ))
            .into());
        }

        // O send bloqueia fora do lock. Canal fechado durante a espera
        // significa que a varredura removeu o registro.
        tx.send(message)
            .await
            .map_err(|_| GaleError::from(RecordError::ExpiredOrUnknown))?;
        Ok(())
    }

    /// Lê a sequência acumulada, do mais antigo ao mais novo, direto do
    /// backend (a fila não participa). O sentinela nunca aparece.
    pub async fn read_record(&self, key: &str) -> GaleResult<Vec<String>> {
        if !self.registry.is_live(key) {
            return Err(RecordError::ExpiredOrUnknown.into());
        }

        let messages = self.store.read_record(key).await.map_err(|e| {
            error!("leitura de {key} no backend falhou: {e}");
            e
        })?;
        Ok(messages)
    }

    /// Estatísticas reportadas pelo backend (não o tamanho do registry).
    pub async fn statistics(&self) -> GaleResult<StoreStats> {
        match self.store.stats().await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                error!("coleta de estatísticas do backend falhou: {e}");
                Err(RecordError::StatisticsUnavailable.into())
            }
        }
    }

    /// Registros vivos no registry em memória. Exposto para observabilidade
    /// e testes; as estatísticas da API vêm do backend.
    pub fn live_records(&self) -> usize {
        self.registry.len()
    }
}
