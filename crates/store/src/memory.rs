use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

use galecache_common::{SENTINEL, StoreError};

use crate::client::{StoreClient, StoreStats, unix_now};

/// Lista ordenada com TTL nativo.
#[derive(Debug)]
struct StoredList {
    items: VecDeque<String>,
    expires_at: Instant,
}

impl StoredList {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Backend em memória com a mesma semântica do backend RESP: lista semeada
/// com sentinela, TTL por chave, leitura pulando o sentinela. Usado nos
/// testes e no modo de desenvolvimento `--store memory`.
///
/// A expiração é preguiçosa: chaves expiradas são removidas quando tocadas
/// ou durante a contagem de registros. O TTL aqui é rede de segurança — a
/// fonte de verdade de vivacidade é o registry do núcleo.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<DashMap<String, StoredList>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    fn drop_if_expired(&self, key: &str) {
        if let Some(entry) = self.data.get(key)
            && entry.is_expired()
        {
            drop(entry);
            self.data.remove(key);
            debug!("chave expirada removida do backend: {key}");
        }
    }
}

impl StoreClient for MemoryStore {
    async fn create_record(&self, key: &str, ttl_seconds: u32) -> Result<(), StoreError> {
        self.drop_if_expired(key);
        let mut items = VecDeque::new();
        items.push_back(SENTINEL.to_string());
        self.data.insert(
            key.to_string(),
            StoredList {
                items,
                expires_at: Instant::now() + Duration::from_secs(u64::from(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn append(&self, key: &str, message: &str) -> Result<(), StoreError> {
        self.drop_if_expired(key);
        let mut entry = self
            .data
            .get_mut(key)
            .ok_or_else(|| StoreError::OperationFailed(format!("chave inexistente: {key}")))?;
        entry.items.push_back(message.to_string());
        Ok(())
    }

    async fn read_record(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.drop_if_expired(key);
        match self.data.get(key) {
            // skip(1) pula o sentinela, como o LRANGE key 1 -1
            Some(entry) => Ok(entry.items.iter().skip(1).cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.drop_if_expired(key);
        Ok(self.data.contains_key(key))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.data.retain(|_, list| !list.is_expired());
        Ok(StoreStats {
            record_count: self.data.len() as i64,
            active_connections: 1,
            timestamp: unix_now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_append_read() {
        let store = MemoryStore::new();
        store.create_record("k", 30).await.unwrap();
        store.append("k", "x").await.unwrap();
        store.append("k", "y").await.unwrap();
        assert_eq!(store.read_record("k").await.unwrap(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn sentinel_never_surfaces() {
        let store = MemoryStore::new();
        store.create_record("k", 30).await.unwrap();
        assert_eq!(store.read_record("k").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn append_unknown_key_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.append("nada", "x").await,
            Err(StoreError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn read_unknown_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.read_record("nada").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_key() {
        let store = MemoryStore::new();
        store.create_record("k", 2).await.unwrap();
        assert!(store.exists("k").await.unwrap());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!store.exists("k").await.unwrap());
        assert!(store.read_record("k").await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stats_counts_live_records() {
        let store = MemoryStore::new();
        store.create_record("a", 1).await.unwrap();
        store.create_record("b", 10).await.unwrap();
        assert_eq!(store.stats().await.unwrap().record_count, 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.stats().await.unwrap().record_count, 1);
    }

    #[tokio::test]
    async fn recreate_resets_list() {
        let store = MemoryStore::new();
        store.create_record("k", 30).await.unwrap();
        store.append("k", "velho").await.unwrap();
        store.create_record("k", 30).await.unwrap();
        assert!(store.read_record("k").await.unwrap().is_empty());
    }
}
