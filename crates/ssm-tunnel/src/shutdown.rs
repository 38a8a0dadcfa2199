//! Cooperative cancellation over a `watch` channel.

use tokio::sync::watch;

/// Resolve once `true` is observed on `shutdown`.
///
/// A dropped sender can never signal, so the future then stays pending.
pub async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Whether cancellation has already been requested.
pub fn is_cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}
