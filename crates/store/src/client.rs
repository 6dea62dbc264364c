use std::future::Future;

use galecache_common::StoreError;

/// Métricas reportadas pelo backend de armazenamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Número de registros vivos no backend.
    pub record_count: i64,
    /// Conexões abertas contra o backend (ativas + ociosas no pool).
    pub active_connections: i64,
    /// Timestamp unix (segundos) da coleta.
    pub timestamp: i64,
}

/// Contrato estreito consumido pelo núcleo: quatro operações contra um
/// armazenamento durável de listas ordenadas, mais um probe de existência.
///
/// Os futures exigem Send porque o escritor de cada registro roda em uma
/// task separada.
pub trait StoreClient: Send + Sync + 'static {
    /// Cria atomicamente a lista para `key`, semeada com o sentinela,
    /// e aplica um TTL nativo no backend.
    fn create_record(
        &self,
        key: &str,
        ttl_seconds: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Acrescenta um elemento ao final da lista de `key`.
    fn append(
        &self,
        key: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Lê todos os elementos após o sentinela, do mais antigo ao mais novo.
    fn read_record(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Probe de existência da chave no backend.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Estatísticas do backend e do pool de conexões.
    fn stats(&self) -> impl Future<Output = Result<StoreStats, StoreError>> + Send;
}

/// Timestamp unix em segundos.
pub(crate) fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
