/// Erros de parsing do protocolo RESP.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame incompleto")]
    Incomplete,
    #[error("byte de tipo inválido: {0:#x}")]
    InvalidFrameType(u8),
    #[error("inteiro inválido: {0}")]
    InvalidInteger(String),
    #[error("comprimento de bulk inválido: {0}")]
    InvalidBulkLength(i64),
    #[error("frame excede tamanho máximo ({0} bytes)")]
    FrameTooLarge(usize),
    #[error("encoding inválido: {0}")]
    InvalidEncoding(String),
}

/// Erros de parsing/validação de requisições.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("operação desconhecida: {0}")]
    Unknown(String),
    #[error("número errado de argumentos para '{0}'")]
    WrongArity(String),
    #[error("argumento inválido: {0}")]
    InvalidArgument(String),
}

/// Erros de conexão TCP.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("conexão resetada pelo peer")]
    ConnectionReset,
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("servidor em shutdown")]
    Shutdown,
}

/// Erros do cliente de armazenamento durável.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("backend de armazenamento indisponível: {0}")]
    Unavailable(String),
    #[error("operação no backend falhou: {0}")]
    OperationFailed(String),
    #[error("resposta inesperada do backend: {0}")]
    UnexpectedResponse(String),
}

/// Erros do ciclo de vida de registros.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("registro expirado ou inexistente")]
    ExpiredOrUnknown,
    #[error("registro já existe")]
    DuplicateKey,
    #[error("estatísticas indisponíveis")]
    StatisticsUnavailable,
}

/// Erro top-level do GaleCache.
#[derive(Debug, thiserror::Error)]
pub enum GaleError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Result type alias.
pub type GaleResult<T> = Result<T, GaleError>;

// Conversão implícita de io::Error → GaleError (via ConnectionError)
impl From<std::io::Error> for GaleError {
    fn from(e: std::io::Error) -> Self {
        GaleError::Connection(ConnectionError::Io(e))
    }
}
