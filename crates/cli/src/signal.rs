//! Ctrl-C handling for long order searches.

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// A token cancelled when the process receives Ctrl-C.
pub fn spawn_ctrl_c_canceller() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling order search");
            child.cancel();
        }
    });
    token
}
