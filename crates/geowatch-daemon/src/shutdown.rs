use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative stop request shared between the signal listener and the scheduler.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that flipped the flag.
    pub fn request(&self) -> bool {
        !self.requested.swap(true, Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Translates SIGINT / SIGTERM into a shutdown request. Both signals take the same path.
pub fn listen_for_signals(shutdown: Shutdown) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        if shutdown.request() {
            tracing::info!(signal, "termination requested; draining");
        }
    });
}

/// Resolves when `signal` fires. A listener that cannot be installed never resolves, so an
/// install failure is not mistaken for a delivered signal.
async fn delivered<F>(name: &'static str, signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(err) = signal.await {
        tracing::warn!(%err, signal = name, "failed to listen for signal; ignoring it");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let sigterm = async {
        let mut term = signal(SignalKind::terminate())?;
        term.recv().await;
        Ok::<(), std::io::Error>(())
    };

    tokio::select! {
        _ = delivered("SIGINT", tokio::signal::ctrl_c()) => "SIGINT",
        _ = delivered("SIGTERM", sigterm) => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    delivered("SIGINT", tokio::signal::ctrl_c()).await;
    "SIGINT"
}
