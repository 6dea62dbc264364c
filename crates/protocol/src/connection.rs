use bytes::BytesMut;
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use galecache_common::{ConnectionError, INITIAL_BUFFER_CAPACITY};

use crate::Frame;

/// Wrapper sobre TcpStream com buffer para leitura/escrita de frames RESP.
/// Compartilhado pelo servidor, pelo cliente do backend e pelo CLI.
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Lê um frame completo do stream. Retorna None no EOF.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(ConnectionError::ConnectionReset);
            }
        }
    }

    /// Escreve um frame no stream e dá flush.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        self.buffer_frame(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Escreve um frame sem flush. Usado para streaming elemento a elemento:
    /// o chamador decide quando dar flush.
    pub async fn buffer_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        let mut buf = BytesMut::new();
        frame.encode(&mut buf);
        self.stream.write_all(&buf).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), ConnectionError> {
        self.stream.flush().await?;
        Ok(())
    }

    /// Escreve só o cabeçalho de um array RESP. Os elementos vêm depois,
    /// um a um, via `buffer_frame` — é assim que o servidor faz streaming
    /// de uma leitura.
    pub async fn write_array_header(&mut self, len: usize) -> Result<(), ConnectionError> {
        use bytes::BufMut;
        let mut buf = BytesMut::new();
        buf.put_u8(b'*');
        buf.put(len.to_string().as_bytes());
        buf.put(&b"\r\n"[..]);
        self.stream.write_all(&buf).await?;
        Ok(())
    }

    /// Envia uma requisição e espera um frame de resposta. Lado cliente.
    pub async fn round_trip(&mut self, frame: &Frame) -> Result<Frame, ConnectionError> {
        self.write_frame(frame).await?;
        match self.read_frame().await? {
            Some(response) => Ok(response),
            None => Err(ConnectionError::ConnectionReset),
        }
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match Frame::check(&mut cursor) {
            Ok(()) => {
                let len = cursor.position() as usize;
                cursor.set_position(0);
                let frame = Frame::parse(&mut cursor).map_err(|e| {
                    ConnectionError::Io(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e.to_string(),
                    ))
                })?;
                self.buffer = self.buffer.split_off(len);
                Ok(Some(frame))
            }
            Err(galecache_common::ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(ConnectionError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))),
        }
    }
}
