#![forbid(unsafe_code)]

mod error;

pub use error::*;

pub const DEFAULT_PORT: u16 = 9099;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_STORE_ADDR: &str = "127.0.0.1:6379";
pub const MAX_CONNECTIONS: usize = 1024;
pub const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// Capacidade da fila de mensagens pendentes por registro.
pub const QUEUE_CAPACITY: usize = 24;
/// Período da varredura de expiração, em milissegundos.
pub const SWEEP_INTERVAL_MS: u64 = 1000;
/// Primeiro elemento da lista no backend, marca a criação do registro.
/// Nunca é devolvido em leituras.
pub const SENTINEL: &str = "BEGIN";
/// Conexões ociosas mantidas no pool do cliente de armazenamento.
pub const POOL_MAX_IDLE: usize = 5;
/// Tentativas de escrita no backend antes de degradar o registro.
pub const APPEND_MAX_ATTEMPTS: u32 = 3;
/// Base do backoff entre tentativas de escrita, em milissegundos.
pub const APPEND_RETRY_BASE_MS: u64 = 100;
