use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use docfind_content_store::FileStore;

/// Remove expired uploads once; returns how many were dropped.
pub fn sweep_once(store: &FileStore, retention: Duration) -> usize {
    let removed = store.sweep_expired(retention);
    if removed > 0 {
        tracing::info!("swept {removed} expired file(s), {} remaining", store.len());
    } else {
        tracing::debug!("sweep found nothing to remove");
    }
    removed
}

/// Start the retention sweeper. The first tick fires immediately, so a
/// sweep also runs at startup.
pub fn spawn(store: Arc<FileStore>, retention: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("starting retention sweeper: retention={retention:?}, every={every:?}");
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            sweep_once(&store, retention);
        }
    })
}
