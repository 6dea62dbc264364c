use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tokio::time::Duration;
use tracing::{error, info};

use galecache_common::{
    DEFAULT_HOST, DEFAULT_PORT, DEFAULT_STORE_ADDR, MAX_CONNECTIONS, SWEEP_INTERVAL_MS,
};
use galecache_core::Controller;
use galecache_protocol::Connection;
use galecache_server::handle_connection;
use galecache_store::{MemoryStore, RespStore, StoreClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Resp,
    Memory,
}

#[derive(Parser, Debug)]
#[command(name = "galecache-server", about = "GaleCache — buffers append-only com TTL")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Endereço do backend de armazenamento (RESP/Redis-compatível).
    #[arg(long, default_value = DEFAULT_STORE_ADDR)]
    store_addr: String,
    /// Backend: "resp" (durável, remoto) ou "memory" (desenvolvimento).
    #[arg(long, default_value = "resp", value_parser = parse_backend)]
    store: Backend,
    #[arg(long, default_value_t = SWEEP_INTERVAL_MS)]
    sweep_interval_ms: u64,
    #[arg(long, default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    match s.to_lowercase().as_str() {
        "resp" => Ok(Backend::Resp),
        "memory" => Ok(Backend::Memory),
        _ => Err(format!("valor inválido: '{s}'. Use: resp, memory")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "galecache_server=info".into()),
        )
        .init();

    let args = Args::parse();

    match args.store {
        Backend::Resp => {
            let store = RespStore::new(args.store_addr.clone());
            info!("backend RESP em {}", args.store_addr);
            serve(store, args).await
        }
        Backend::Memory => {
            info!("backend em memória (sem durabilidade)");
            serve(MemoryStore::new(), args).await
        }
    }
}

async fn serve<C: StoreClient>(store: C, args: Args) -> anyhow::Result<()> {
    let addr = format!("{}:{}", args.host, args.port);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let ctlr = Controller::new(
        store,
        Duration::from_millis(args.sweep_interval_ms),
        shutdown_tx.subscribe(),
    );

    let listener = TcpListener::bind(&addr).await?;
    info!("GaleCache escutando em {addr}");

    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(args.max_connections));

    loop {
        let permit = tokio::select! {
            permit = semaphore.clone().acquire_owned() => permit.unwrap(),
            _ = signal::ctrl_c() => {
                info!("shutdown signal recebido");
                drop(shutdown_tx);
                break;
            }
        };

        let (socket, addr) = tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok(v) => v,
                    Err(e) => {
                        error!("erro ao aceitar conexão: {e}");
                        continue;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutdown signal recebido");
                drop(shutdown_tx);
                break;
            }
        };

        info!("nova conexão: {addr}");
        let ctlr = ctlr.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        tokio::spawn(async move {
            let conn = Connection::new(socket);
            if let Err(e) = handle_connection(conn, ctlr, &mut shutdown_rx).await {
                error!("erro na conexão {addr}: {e}");
            }
            info!("conexão encerrada: {addr}");
            drop(permit);
        });
    }

    Ok(())
}
