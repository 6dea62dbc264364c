use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Instant;

use galecache_common::RecordError;

/// Metadados de um registro vivo. A fila em si vive no escritor; aqui fica
/// apenas o Sender — quando a entrada é removida do registry e os clones
/// transitórios somem, o canal fecha e o escritor encerra.
#[derive(Debug)]
pub(crate) struct Record {
    pub deadline: Instant,
    pub tx: mpsc::Sender<String>,
    pub degraded: Arc<AtomicBool>,
}

/// Mapa de chaves vivas, guardado por um único mutex. O lock cobre somente
/// operações de mapa; nunca é segurado através de I/O.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    records: Mutex<HashMap<String, Record>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Registra um novo Record. Política reject-if-live: chave já viva
    /// falha com DuplicateKey. Uma entrada já vencida mas ainda não varrida
    /// conta como ausente e é substituída.
    pub fn insert(&self, key: &str, record: Record) -> Result<(), RecordError> {
        let mut records = self.lock();
        if let Some(existing) = records.get(key)
            && Instant::now() < existing.deadline
        {
            return Err(RecordError::DuplicateKey);
        }
        records.insert(key.to_string(), record);
        Ok(())
    }

    /// Vivacidade = presença no mapa. A janela entre o deadline e a próxima
    /// varredura é aceita por contrato (folga de um período de sweep).
    pub fn is_live(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Clona o handle da fila de um registro vivo, sob o lock.
    pub fn sender(&self, key: &str) -> Option<(mpsc::Sender<String>, Arc<AtomicBool>)> {
        let records = self.lock();
        records
            .get(key)
            .map(|r| (r.tx.clone(), r.degraded.clone()))
    }

    /// Remove todas as entradas com deadline atingido; retorna as chaves
    /// removidas. Usado só pela varredura. Puro bookkeeping em memória.
    pub fn evict_expired(&self, now: Instant) -> Vec<String> {
        let mut records = self.lock();
        let expired: Vec<String> = records
            .iter()
            .filter(|(_, r)| r.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            records.remove(key);
        }
        expired
    }

    /// Remove uma entrada específica. Sem efeito na fila além do drop do
    /// Sender.
    pub fn evict(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Record>> {
        // Poison só acontece com panic sob o lock; as operações aqui não
        // fazem panic, então propagar o inner é seguro.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galecache_common::QUEUE_CAPACITY;
    use tokio::time::Duration;

    fn record(deadline: Instant) -> (Record, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        (
            Record {
                deadline,
                tx,
                degraded: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn insert_and_lookup() {
        let registry = Registry::new();
        let (rec, _rx) = record(Instant::now() + Duration::from_secs(10));
        registry.insert("a", rec).unwrap();
        assert!(registry.is_live("a"));
        assert!(!registry.is_live("b"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let registry = Registry::new();
        let (r1, _rx1) = record(Instant::now() + Duration::from_secs(10));
        let (r2, _rx2) = record(Instant::now() + Duration::from_secs(10));
        registry.insert("a", r1).unwrap();
        assert!(matches!(
            registry.insert("a", r2),
            Err(RecordError::DuplicateKey)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_can_be_replaced() {
        let registry = Registry::new();
        let (r1, _rx1) = record(Instant::now() + Duration::from_secs(1));
        registry.insert("a", r1).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let (r2, _rx2) = record(Instant::now() + Duration::from_secs(10));
        registry.insert("a", r2).unwrap();
        assert!(registry.is_live("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn evict_expired_returns_keys() {
        let registry = Registry::new();
        let (r1, _rx1) = record(Instant::now() + Duration::from_secs(1));
        let (r2, _rx2) = record(Instant::now() + Duration::from_secs(60));
        registry.insert("velho", r1).unwrap();
        registry.insert("novo", r2).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        let evicted = registry.evict_expired(Instant::now());
        assert_eq!(evicted, vec!["velho".to_string()]);
        assert!(!registry.is_live("velho"));
        assert!(registry.is_live("novo"));
    }

    #[tokio::test]
    async fn eviction_closes_channel() {
        let registry = Registry::new();
        let (rec, mut rx) = record(Instant::now() + Duration::from_secs(10));
        registry.insert("a", rec).unwrap();
        assert!(registry.evict("a"));
        // Sender dropado junto com a entrada: canal fecha.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn queue_capacity_blocks_extra_append() {
        let registry = Registry::new();
        let (rec, mut rx) = record(Instant::now() + Duration::from_secs(10));
        registry.insert("a", rec).unwrap();

        let (tx, _) = registry.sender("a").unwrap();
        for i in 0..QUEUE_CAPACITY {
            tx.try_send(format!("m{i}")).unwrap();
        }
        // Fila cheia: a 25ª mensagem não entra.
        assert!(tx.try_send("extra".into()).is_err());

        // Drenar uma libera espaço.
        rx.recv().await.unwrap();
        tx.try_send("extra".into()).unwrap();
    }
}
