//! Periodic purge of old execution history

use crate::config::RetentionConfig;
use autoflow_engine::Orchestrator;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Runs `Orchestrator::cleanup` on a fixed cadence
pub struct RetentionSweeper {
    config: RetentionConfig,
    orchestrator: Orchestrator,
    running: Arc<RwLock<bool>>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetentionSweeper {
    pub fn new(config: RetentionConfig, orchestrator: Orchestrator) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            config,
            orchestrator,
            running: Arc::new(RwLock::new(false)),
            shutdown,
            handle: Mutex::new(None),
        })
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Start the sweep loop; the first sweep runs one interval after start
    pub async fn start(self: &Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                return;
            }
            *running = true;
        }
        self.shutdown.send_replace(false);

        let period = self.config.sweep_interval();
        let sweeper = Arc::clone(self);
        let mut shutdown_rx = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = sweeper.orchestrator.cleanup(sweeper.config.days).await;
                        tracing::debug!(
                            ledger_removed = report.ledger_removed,
                            completed_removed = report.completed_removed,
                            "Retention sweep finished"
                        );
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        });

        *self.handle.lock().await = Some(handle);
        tracing::info!(
            days = self.config.days,
            interval_secs = self.config.sweep_interval_secs,
            "Retention sweeper started"
        );
    }

    pub async fn stop(&self) {
        {
            let mut running = self.running.write().await;
            if !*running {
                return;
            }
            *running = false;
        }
        self.shutdown.send_replace(true);

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Retention sweeper task failed");
            }
        }
        tracing::info!("Retention sweeper stopped");
    }
}
