use bytes::Bytes;
use galecache_common::RequestError;

use crate::Frame;

/// Cursor sobre um Frame::Array para extrair argumentos sequencialmente.
pub struct Parse {
    parts: Vec<Frame>,
    pos: usize,
}

impl Parse {
    /// Cria um Parse a partir de um Frame. O frame deve ser Array.
    pub fn new(frame: Frame) -> Result<Parse, RequestError> {
        match frame {
            Frame::Array(parts) => Ok(Parse { parts, pos: 0 }),
            _ => Err(RequestError::InvalidArgument("esperado array".into())),
        }
    }

    /// Retorna o próximo elemento como String (de Bulk ou Simple).
    pub fn next_string(&mut self) -> Result<String, RequestError> {
        match self.next()? {
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(data) => String::from_utf8(data.to_vec())
                .map_err(|_| RequestError::InvalidArgument("string UTF-8 inválida".into())),
            _ => Err(RequestError::InvalidArgument(
                "esperado string ou bulk".into(),
            )),
        }
    }

    /// Retorna o próximo elemento como Bytes (de Bulk).
    pub fn next_bytes(&mut self) -> Result<Bytes, RequestError> {
        match self.next()? {
            Frame::Bulk(data) => Ok(data),
            Frame::Simple(s) => Ok(Bytes::from(s)),
            _ => Err(RequestError::InvalidArgument("esperado bulk".into())),
        }
    }

    /// Retorna o próximo elemento como i64.
    pub fn next_int(&mut self) -> Result<i64, RequestError> {
        match self.next()? {
            Frame::Integer(n) => Ok(n),
            Frame::Bulk(data) => {
                let s = std::str::from_utf8(&data)
                    .map_err(|_| RequestError::InvalidArgument("inteiro inválido".into()))?;
                s.parse::<i64>()
                    .map_err(|_| RequestError::InvalidArgument(format!("'{s}' não é um inteiro")))
            }
            Frame::Simple(s) => s
                .parse::<i64>()
                .map_err(|_| RequestError::InvalidArgument(format!("'{s}' não é um inteiro"))),
            _ => Err(RequestError::InvalidArgument("esperado inteiro".into())),
        }
    }

    /// Verifica se todos os argumentos foram consumidos.
    pub fn finish(&self) -> Result<(), RequestError> {
        if self.pos < self.parts.len() {
            Err(RequestError::InvalidArgument(
                "argumentos extras não esperados".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// Verifica se ainda há argumentos restantes.
    pub fn has_remaining(&self) -> bool {
        self.pos < self.parts.len()
    }

    fn next(&mut self) -> Result<Frame, RequestError> {
        if self.pos >= self.parts.len() {
            return Err(RequestError::InvalidArgument(
                "argumentos insuficientes".into(),
            ));
        }
        let frame = self.parts[self.pos].clone();
        self.pos += 1;
        Ok(frame)
    }
}
