use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use galecache_common::{MAX_FRAME_SIZE, ProtocolError};

/// Representação de um frame RESP2. Usado nos dois lados: na superfície RPC
/// do serviço e no cliente do backend de armazenamento.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Verifica se um frame completo está disponível no buffer sem alocar.
    /// Retorna Ok(()) se completo, Err(Incomplete) se precisa mais dados.
    pub fn check(src: &mut Cursor<&[u8]>) -> Result<(), ProtocolError> {
        match get_u8(src)? {
            b'+' | b'-' => {
                get_line(src)?;
                Ok(())
            }
            b':' => {
                get_line(src)?;
                Ok(())
            }
            b'$' => {
                let len = get_decimal(src)?;
                if len == -1 {
                    return Ok(());
                }
                if len < 0 {
                    return Err(ProtocolError::InvalidBulkLength(len));
                }
                let len = len as usize;
                if len > MAX_FRAME_SIZE {
                    return Err(ProtocolError::FrameTooLarge(len));
                }
                skip(src, len + 2)?; // data + \r\n
                Ok(())
            }
            b'*' => {
                let count = get_decimal(src)?;
                if count == -1 {
                    return Ok(());
                }
                if count < 0 {
                    return Err(ProtocolError::InvalidBulkLength(count));
                }
                for _ in 0..count {
                    Frame::check(src)?;
                }
                Ok(())
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Faz o parse de um frame completo a partir do cursor.
    /// Deve ser chamado apenas após `check()` retornar Ok.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, ProtocolError> {
        match get_u8(src)? {
            b'+' => {
                let line = get_line(src)?;
                let s = String::from_utf8(line.to_vec())
                    .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
                Ok(Frame::Simple(s))
            }
            b'-' => {
                let line = get_line(src)?;
                let s = String::from_utf8(line.to_vec())
                    .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
                Ok(Frame::Error(s))
            }
            b':' => {
                let n = get_decimal(src)?;
                Ok(Frame::Integer(n))
            }
            b'$' => {
                let len = get_decimal(src)?;
                if len == -1 {
                    return Ok(Frame::Null);
                }
                let len = len as usize;
                if src.remaining() < len + 2 {
                    return Err(ProtocolError::Incomplete);
                }
                let data = Bytes::copy_from_slice(&src.get_ref()[src.position() as usize..][..len]);
                src.set_position(src.position() + len as u64 + 2);
                Ok(Frame::Bulk(data))
            }
            b'*' => {
                let count = get_decimal(src)?;
                if count == -1 {
                    return Ok(Frame::Null);
                }
                let count = count as usize;
                let mut frames = Vec::with_capacity(count);
                for _ in 0..count {
                    frames.push(Frame::parse(src)?);
                }
                Ok(Frame::Array(frames))
            }
            byte => Err(ProtocolError::InvalidFrameType(byte)),
        }
    }

    /// Encoda o frame no buffer de saída em formato RESP2.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(b'+');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Error(s) => {
                dst.put_u8(b'-');
                dst.put(s.as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                dst.put(n.to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put(data.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                dst.put(data.as_ref());
                dst.put(&b"\r\n"[..]);
            }
            Frame::Null => {
                dst.put(&b"$-1\r\n"[..]);
            }
            Frame::Array(frames) => {
                dst.put_u8(b'*');
                dst.put(frames.len().to_string().as_bytes());
                dst.put(&b"\r\n"[..]);
                for frame in frames {
                    frame.encode(dst);
                }
            }
        }
    }

    /// Helper: cria um Frame::Bulk a partir de &str.
    pub fn bulk(s: &str) -> Frame {
        Frame::Bulk(Bytes::from(s.to_string()))
    }

    /// Helper: cria um Array de Bulk strings a partir de &[&str].
    pub fn array_from_strs(strs: &[&str]) -> Frame {
        Frame::Array(strs.iter().map(|s| Frame::bulk(s)).collect())
    }

    // --- Acessores para o lado cliente (interpretação de respostas) ---

    /// Interpreta o frame como inteiro (Integer, ou Bulk/Simple numérico).
    pub fn as_integer(&self) -> Result<i64, ProtocolError> {
        match self {
            Frame::Integer(n) => Ok(*n),
            Frame::Simple(s) => s
                .parse::<i64>()
                .map_err(|_| ProtocolError::InvalidInteger(s.clone())),
            Frame::Bulk(data) => {
                let s = std::str::from_utf8(data)
                    .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?;
                s.parse::<i64>()
                    .map_err(|_| ProtocolError::InvalidInteger(s.into()))
            }
            other => Err(ProtocolError::InvalidEncoding(format!(
                "esperado inteiro, veio {other:?}"
            ))),
        }
    }

    /// Consome um Array de Bulk/Simple em um Vec<String>. Null vira vec vazio.
    pub fn into_strings(self) -> Result<Vec<String>, ProtocolError> {
        let frames = match self {
            Frame::Array(frames) => frames,
            Frame::Null => return Ok(Vec::new()),
            other => {
                return Err(ProtocolError::InvalidEncoding(format!(
                    "esperado array, veio {other:?}"
                )));
            }
        };
        let mut out = Vec::with_capacity(frames.len());
        for frame in frames {
            match frame {
                Frame::Bulk(data) => out.push(
                    String::from_utf8(data.to_vec())
                        .map_err(|e| ProtocolError::InvalidEncoding(e.to_string()))?,
                ),
                Frame::Simple(s) => out.push(s),
                other => {
                    return Err(ProtocolError::InvalidEncoding(format!(
                        "elemento não-string no array: {other:?}"
                    )));
                }
            }
        }
        Ok(out)
    }

    /// True se o frame é um erro de protocolo/aplicação.
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }
}

fn get_u8(src: &mut Cursor<&[u8]>) -> Result<u8, ProtocolError> {
    if !src.has_remaining() {
        return Err(ProtocolError::Incomplete);
    }
    Ok(src.get_u8())
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], ProtocolError> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    for i in start..end.saturating_sub(1) {
        if src.get_ref()[i] == b'\r' && src.get_ref()[i + 1] == b'\n' {
            src.set_position((i + 2) as u64);
            return Ok(&src.get_ref()[start..i]);
        }
    }

    Err(ProtocolError::Incomplete)
}

fn get_decimal(src: &mut Cursor<&[u8]>) -> Result<i64, ProtocolError> {
    let line = get_line(src)?;
    let s = std::str::from_utf8(line).map_err(|e| ProtocolError::InvalidInteger(e.to_string()))?;
    s.parse::<i64>()
        .map_err(|e| ProtocolError::InvalidInteger(e.to_string()))
}

fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        return Err(ProtocolError::Incomplete);
    }
    src.set_position(src.position() + n as u64);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: &Frame) {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        let bytes = buf.freeze();
        let mut cursor = Cursor::new(bytes.as_ref());
        Frame::check(&mut cursor).unwrap();
        cursor.set_position(0);
        let parsed = Frame::parse(&mut cursor).unwrap();
        assert_eq!(&parsed, frame);
    }

    #[test]
    fn roundtrip_simple_string() {
        roundtrip(&Frame::Simple("PONG".into()));
    }

    #[test]
    fn roundtrip_error() {
        roundtrip(&Frame::Error("EXPIRED registro expirado ou inexistente".into()));
    }

    #[test]
    fn roundtrip_integer() {
        roundtrip(&Frame::Integer(42));
        roundtrip(&Frame::Integer(-1));
        roundtrip(&Frame::Integer(0));
    }

    #[test]
    fn roundtrip_bulk() {
        roundtrip(&Frame::Bulk(Bytes::from("hello world")));
        roundtrip(&Frame::Bulk(Bytes::new())); // empty bulk
    }

    #[test]
    fn roundtrip_null() {
        roundtrip(&Frame::Null);
    }

    #[test]
    fn roundtrip_array() {
        let frame = Frame::Array(vec![
            Frame::Simple("OK".into()),
            Frame::Integer(42),
            Frame::Bulk(Bytes::from("data")),
            Frame::Null,
        ]);
        roundtrip(&frame);
    }

    #[test]
    fn roundtrip_create_request() {
        let frame = Frame::array_from_strs(&["CREATE", "sessao-1", "30"]);
        roundtrip(&frame);
    }

    #[test]
    fn incomplete_frame() {
        let data = b"+PONG\r"; // missing \n
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(ProtocolError::Incomplete)
        ));
    }

    #[test]
    fn incomplete_bulk() {
        let data = b"$5\r\nhel"; // missing data
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(ProtocolError::Incomplete)
        ));
    }

    #[test]
    fn invalid_frame_type() {
        let data = b"?invalid\r\n";
        let mut cursor = Cursor::new(&data[..]);
        assert!(matches!(
            Frame::check(&mut cursor),
            Err(ProtocolError::InvalidFrameType(b'?'))
        ));
    }

    #[test]
    fn as_integer_from_variants() {
        assert_eq!(Frame::Integer(7).as_integer().unwrap(), 7);
        assert_eq!(Frame::bulk("13").as_integer().unwrap(), 13);
        assert_eq!(Frame::Simple("-2".into()).as_integer().unwrap(), -2);
        assert!(Frame::bulk("abc").as_integer().is_err());
        assert!(Frame::Null.as_integer().is_err());
    }

    #[test]
    fn into_strings_from_array() {
        let frame = Frame::array_from_strs(&["x", "y", "z"]);
        assert_eq!(frame.into_strings().unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn into_strings_null_is_empty() {
        assert!(Frame::Null.into_strings().unwrap().is_empty());
    }

    #[test]
    fn into_strings_rejects_nested_array() {
        let frame = Frame::Array(vec![Frame::Array(vec![])]);
        assert!(frame.into_strings().is_err());
    }
}
