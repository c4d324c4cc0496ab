use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::info;

use crate::modules::shader::repository::JobTable;

/// Periodically evicts finished jobs older than `retention`. Returns `None`
/// when retention is disabled (zero).
pub fn start_job_reaper(
    jobs: Arc<JobTable>,
    retention: Duration,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if retention.is_zero() || every.is_zero() {
        info!("🧹 Job reaper disabled, jobs are kept for the process lifetime");
        return None;
    }

    info!(?retention, ?every, "🧹 Starting job reaper");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let evicted = jobs.evict_finished(retention, Instant::now());
            if evicted > 0 {
                info!(evicted, remaining = jobs.len(), "🧹 Evicted finished jobs");
            }
        }
    }))
}
