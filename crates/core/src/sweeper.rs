use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{Duration, Instant, interval};
use tracing::{debug, info};

use crate::registry::Registry;

/// Loop de varredura: a cada tick remove do registry as entradas vencidas.
/// Cancelável via canal de shutdown; nunca faz I/O sob o lock do registry.
pub(crate) async fn run_sweeper(
    registry: Arc<Registry>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(period);
    // O primeiro tick é imediato; não há entradas ainda, tanto faz.
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.recv() => {
                debug!("varredura encerrada por shutdown");
                return;
            }
        }

        for key in registry.evict_expired(Instant::now()) {
            info!("registro expirado: {key}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Record;
    use galecache_common::QUEUE_CAPACITY;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::mpsc;

    fn insert(registry: &Registry, key: &str, ttl_secs: u64) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        registry
            .insert(
                key,
                Record {
                    deadline: Instant::now() + Duration::from_secs(ttl_secs),
                    tx,
                    degraded: Arc::new(AtomicBool::new(false)),
                },
            )
            .unwrap();
        rx
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_expired_entries() {
        let registry = Arc::new(Registry::new());
        let _rx1 = insert(&registry, "curto", 2);
        let _rx2 = insert(&registry, "longo", 60);

        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(run_sweeper(
            registry.clone(),
            Duration::from_secs(1),
            shutdown_tx.subscribe(),
        ));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!registry.is_live("curto"));
        assert!(registry.is_live("longo"));
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_stops_on_shutdown() {
        let registry = Arc::new(Registry::new());
        let (shutdown_tx, _) = broadcast::channel(1);
        let handle = tokio::spawn(run_sweeper(
            registry.clone(),
            Duration::from_secs(1),
            shutdown_tx.subscribe(),
        ));

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_bounded_by_one_period() {
        let registry = Arc::new(Registry::new());
        let _rx = insert(&registry, "a", 3);

        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(run_sweeper(
            registry.clone(),
            Duration::from_secs(1),
            shutdown_tx.subscribe(),
        ));

        // Antes do deadline: vivo.
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert!(registry.is_live("a"));

        // deadline + um período de varredura: removido.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(!registry.is_live("a"));
    }
}
