use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::net::TcpStream;
use tracing::{debug, warn};

use galecache_common::{POOL_MAX_IDLE, SENTINEL, StoreError};
use galecache_protocol::{Connection, Frame};

use crate::client::{StoreClient, StoreStats, unix_now};

/// Cliente RESP/TCP para um backend compatível com Redis, com um pool
/// pequeno de conexões ociosas.
///
/// O registro é uma lista: `DEL` + `LPUSH key BEGIN` + `EXPIRE` na criação
/// (dentro de MULTI/EXEC — a criação é um reset, como no MemoryStore),
/// `RPUSH` por mensagem, `LRANGE key 1 -1` na leitura — o índice 1 pula o
/// sentinela.
pub struct RespStore {
    addr: String,
    idle: Mutex<Vec<Connection>>,
    /// Conexões atualmente emprestadas do pool.
    checked_out: AtomicUsize,
}

impl RespStore {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            idle: Mutex::new(Vec::new()),
            checked_out: AtomicUsize::new(0),
        }
    }

    async fn checkout(&self) -> Result<Connection, StoreError> {
        let reused = self.idle.lock().map(|mut v| v.pop()).unwrap_or(None);
        let conn = match reused {
            Some(conn) => conn,
            None => {
                let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
                    warn!("falha ao conectar no backend {}: {e}", self.addr);
                    StoreError::Unavailable(format!("{}: {e}", self.addr))
                })?;
                debug!("nova conexão com o backend {}", self.addr);
                Connection::new(stream)
            }
        };
        self.checked_out.fetch_add(1, Ordering::Relaxed);
        Ok(conn)
    }

    /// Devolve uma conexão saudável ao pool. Conexões que viram erro de I/O
    /// são simplesmente dropadas pelo chamador.
    fn checkin(&self, conn: Connection) {
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
        if let Ok(mut idle) = self.idle.lock()
            && idle.len() < POOL_MAX_IDLE
        {
            idle.push(conn);
        }
    }

    fn discard(&self) {
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
    }

    /// Executa uma sequência de comandos na mesma conexão e devolve as
    /// respostas, uma por comando.
    async fn pipeline(&self, commands: &[Frame]) -> Result<Vec<Frame>, StoreError> {
        let mut conn = self.checkout().await?;
        let mut responses = Vec::with_capacity(commands.len());

        for cmd in commands {
            match conn.round_trip(cmd).await {
                Ok(frame) => responses.push(frame),
                Err(e) => {
                    self.discard();
                    return Err(StoreError::Unavailable(e.to_string()));
                }
            }
        }

        self.checkin(conn);

        for frame in &responses {
            if let Frame::Error(msg) = frame {
                return Err(StoreError::OperationFailed(msg.clone()));
            }
        }
        Ok(responses)
    }

    async fn command(&self, cmd: Frame) -> Result<Frame, StoreError> {
        let mut responses = self.pipeline(std::slice::from_ref(&cmd)).await?;
        Ok(responses.remove(0))
    }

    /// Conexões abertas: emprestadas + ociosas.
    fn connection_count(&self) -> i64 {
        let idle = self.idle.lock().map(|v| v.len()).unwrap_or(0);
        (self.checked_out.load(Ordering::Relaxed) + idle) as i64
    }
}

impl StoreClient for RespStore {
    async fn create_record(&self, key: &str, ttl_seconds: u32) -> Result<(), StoreError> {
        // O DEL dentro da transação garante que a lista sempre nasce só com
        // o sentinela: um LPUSH em lista preexistente empilharia um segundo
        // BEGIN, que vazaria como mensagem na leitura.
        let ttl = ttl_seconds.to_string();
        let commands = [
            Frame::array_from_strs(&["MULTI"]),
            Frame::array_from_strs(&["DEL", key]),
            Frame::array_from_strs(&["LPUSH", key, SENTINEL]),
            Frame::array_from_strs(&["EXPIRE", key, &ttl]),
            Frame::array_from_strs(&["EXEC"]),
        ];
        let responses = self.pipeline(&commands).await?;
        // EXEC devolve Null quando a transação foi abortada.
        if matches!(responses.last(), Some(Frame::Null)) {
            return Err(StoreError::UnexpectedResponse("EXEC abortado".into()));
        }
        Ok(())
    }

    async fn append(&self, key: &str, message: &str) -> Result<(), StoreError> {
        let response = self
            .command(Frame::array_from_strs(&["RPUSH", key, message]))
            .await?;
        response
            .as_integer()
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
        Ok(())
    }

    async fn read_record(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let response = self
            .command(Frame::array_from_strs(&["LRANGE", key, "1", "-1"]))
            .await?;
        response
            .into_strings()
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let response = self
            .command(Frame::array_from_strs(&["EXISTS", key]))
            .await?;
        let n = response
            .as_integer()
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
        Ok(n == 1)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let response = self.command(Frame::array_from_strs(&["DBSIZE"])).await?;
        let record_count = response
            .as_integer()
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
        Ok(StoreStats {
            record_count,
            active_connections: self.connection_count(),
            timestamp: unix_now(),
        })
    }
}
