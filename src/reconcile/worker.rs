//! Periodic reconciliation

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use super::Reconciler;
use crate::config::ReconcileConfig;

pub struct ReconcileWorker {
    reconciler: Arc<Reconciler>,
    scan_interval: Duration,
}

impl ReconcileWorker {
    pub fn new(reconciler: Arc<Reconciler>, config: &ReconcileConfig) -> Self {
        Self {
            reconciler,
            scan_interval: Duration::from_secs(config.scan_interval_secs.max(1)),
        }
    }

    /// Scan forever; a failed scan is logged and retried next round
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.scan_interval.as_secs(),
            "Starting reconciliation worker"
        );

        loop {
            tokio::time::sleep(self.scan_interval).await;
            self.run_once().await;
        }
    }

    /// Returns the number of discrepancies found
    pub async fn run_once(&self) -> usize {
        match self.reconciler.scan().await {
            Ok(found) if found.is_empty() => {
                debug!("No wallet drift found");
                0
            }
            Ok(found) => found.len(),
            Err(e) => {
                error!(error = %e, "Reconciliation scan failed");
                0
            }
        }
    }
}
