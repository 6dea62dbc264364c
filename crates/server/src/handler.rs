use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tracing::debug;

use galecache_common::{ConnectionError, GaleError, RecordError};
use galecache_core::Controller;
use galecache_protocol::{Connection, Frame, Request};
use galecache_store::StoreClient;

/// Loop principal de tratamento de uma conexão.
pub async fn handle_connection<C: StoreClient>(
    mut conn: Connection,
    ctlr: Controller<C>,
    shutdown: &mut broadcast::Receiver<()>,
) -> Result<(), ConnectionError> {
    loop {
        let frame = tokio::select! {
            result = conn.read_frame() => result?,
            _ = shutdown.recv() => {
                return Ok(());
            }
        };

        let frame = match frame {
            Some(f) => f,
            None => return Ok(()), // EOF
        };

        let req = match Request::from_frame(frame) {
            Ok(req) => req,
            Err(e) => {
                let response = Frame::Error(format!("ERR {e}"));
                conn.write_frame(&response).await?;
                continue;
            }
        };

        debug!("requisição recebida: {req:?}");

        match req {
            Request::Read { key } => {
                stream_record(&mut conn, &ctlr, &key).await?;
            }
            other => {
                let response = execute_request(&ctlr, other).await;
                conn.write_frame(&response).await?;
            }
        }
    }
}

async fn execute_request<C: StoreClient>(ctlr: &Controller<C>, req: Request) -> Frame {
    match req {
        Request::Create { key, ttl } => match ctlr.create_record(&key, ttl).await {
            Ok((key, ttl)) => {
                Frame::Array(vec![Frame::bulk(&key), Frame::Integer(i64::from(ttl))])
            }
            Err(e) => error_frame(&e),
        },
        Request::Append { key, message } => match ctlr.store_message(&key, message).await {
            Ok(()) => Frame::Integer(1),
            Err(e) => error_frame(&e),
        },
        Request::Stats => match ctlr.statistics().await {
            Ok(stats) => Frame::Array(vec![
                Frame::Integer(stats.record_count),
                Frame::Integer(stats.active_connections),
                Frame::Integer(stats.timestamp),
            ]),
            Err(e) => error_frame(&e),
        },
        Request::Ping(None) => Frame::Simple("PONG".into()),
        Request::Ping(Some(msg)) => Frame::Bulk(msg),
        Request::Read { .. } => unreachable!("tratado no handle_connection"),
    }
}

/// Emite a sequência acumulada elemento a elemento: cabeçalho de array,
/// depois um bulk por mensagem com flush individual. Uma falha de socket no
/// meio aborta apenas este stream (a conexão cai, o processo segue).
async fn stream_record<C: StoreClient>(
    conn: &mut Connection,
    ctlr: &Controller<C>,
    key: &str,
) -> Result<(), ConnectionError> {
    let messages = match ctlr.read_record(key).await {
        Ok(messages) => messages,
        Err(e) => {
            conn.write_frame(&error_frame(&e)).await?;
            return Ok(());
        }
    };

    conn.write_array_header(messages.len()).await?;
    let mut stream = tokio_stream::iter(messages);
    while let Some(message) = stream.next().await {
        conn.buffer_frame(&Frame::bulk(&message)).await?;
        conn.flush().await?;
    }
    Ok(())
}

/// Mapeia a taxonomia de erros para códigos estáveis na wire.
fn error_frame(e: &GaleError) -> Frame {
    match e {
        GaleError::Record(RecordError::ExpiredOrUnknown) => {
            Frame::Error("EXPIRED registro expirado ou inexistente".into())
        }
        GaleError::Record(RecordError::DuplicateKey) => {
            Frame::Error("DUPLICATE registro já existe".into())
        }
        GaleError::Record(RecordError::StatisticsUnavailable) => {
            Frame::Error("STATS estatísticas indisponíveis".into())
        }
        GaleError::Store(e) => Frame::Error(format!("STORE falha no backend: {e}")),
        other => Frame::Error(format!("ERR {other}")),
    }
}
