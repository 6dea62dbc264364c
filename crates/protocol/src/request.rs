use bytes::Bytes;
use galecache_common::RequestError;

use crate::{Frame, Parse};

/// As quatro operações da superfície RPC, mais PING para health-check.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Cria um registro com TTL em segundos.
    Create { key: String, ttl: u32 },
    /// Enfileira uma mensagem em um registro vivo.
    Append { key: String, message: String },
    /// Lê a sequência acumulada de um registro, do mais antigo ao mais novo.
    Read { key: String },
    /// Estatísticas do backend de armazenamento.
    Stats,
    Ping(Option<Bytes>),
}

impl Request {
    /// Faz o parse de um Frame em um Request.
    pub fn from_frame(frame: Frame) -> Result<Request, RequestError> {
        let mut parse = Parse::new(frame)?;
        let op = parse.next_string()?.to_uppercase();

        let req = match op.as_str() {
            "CREATE" => {
                let key = parse.next_string()?;
                let ttl = parse.next_int()?;
                parse.finish()?;
                if key.is_empty() {
                    return Err(RequestError::InvalidArgument("chave vazia".into()));
                }
                let ttl = u32::try_from(ttl).map_err(|_| {
                    RequestError::InvalidArgument(format!("ttl inválido: {ttl}"))
                })?;
                if ttl == 0 {
                    return Err(RequestError::InvalidArgument("ttl deve ser > 0".into()));
                }
                Request::Create { key, ttl }
            }
            "APPEND" => {
                let key = parse.next_string()?;
                let message = parse.next_string()?;
                parse.finish()?;
                Request::Append { key, message }
            }
            "READ" => {
                let key = parse.next_string()?;
                parse.finish()?;
                Request::Read { key }
            }
            "STATS" => {
                parse.finish()?;
                Request::Stats
            }
            "PING" => {
                let msg = if parse.has_remaining() {
                    Some(parse.next_bytes()?)
                } else {
                    None
                };
                parse.finish()?;
                Request::Ping(msg)
            }
            _ => return Err(RequestError::Unknown(op)),
        };

        Ok(req)
    }

    /// Encoda a requisição como Frame para envio.
    pub fn to_frame(&self) -> Frame {
        match self {
            Request::Create { key, ttl } => Frame::Array(vec![
                Frame::bulk("CREATE"),
                Frame::bulk(key),
                Frame::bulk(&ttl.to_string()),
            ]),
            Request::Append { key, message } => Frame::Array(vec![
                Frame::bulk("APPEND"),
                Frame::bulk(key),
                Frame::bulk(message),
            ]),
            Request::Read { key } => {
                Frame::Array(vec![Frame::bulk("READ"), Frame::bulk(key)])
            }
            Request::Stats => Frame::Array(vec![Frame::bulk("STATS")]),
            Request::Ping(None) => Frame::Array(vec![Frame::bulk("PING")]),
            Request::Ping(Some(msg)) => {
                Frame::Array(vec![Frame::bulk("PING"), Frame::Bulk(msg.clone())])
            }
        }
    }
}
