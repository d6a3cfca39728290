use super::orchestrator::ScanCoordinator;
use super::types::{ScanCommand, ScanOutcome, ScanState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl ScanCoordinator {
    /// Drive the coordinator from `commands` until the view ends.
    ///
    /// The view ends when navigation fires, a `Shutdown` command arrives, the
    /// command channel closes, or the cancellation token is cancelled.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<ScanCommand>) -> ScanOutcome {
        info!("Scanner view is running");
        let cancel = self.cancellation_token.clone();

        loop {
            let navigation = self.navigation_deadline();

            tokio::select! {
                _ = cancel.cancelled() => {
                    return self.finish("cancelled");
                }
                command = commands.recv() => match command {
                    Some(ScanCommand::Start) => self.start().await,
                    Some(ScanCommand::Stop) => self.stop(),
                    Some(ScanCommand::Retry) => self.retry().await,
                    Some(ScanCommand::Manual(entry)) => self.submit_manual(entry).await,
                    Some(ScanCommand::Shutdown) => return self.finish("shutdown requested"),
                    None => return self.finish("command channel closed"),
                },
                Some(tick) = self.tick_receiver.recv() => {
                    self.handle_tick(tick).await;
                }
                _ = sleep_until_deadline(navigation), if navigation.is_some() => {
                    if let Some(target) = self.fire_navigation() {
                        self.shutdown("navigated away");
                        return ScanOutcome::Navigated(target);
                    }
                }
            }
        }
    }

    fn finish(&mut self, reason: &str) -> ScanOutcome {
        let outcome = match (self.state, self.last_error.clone()) {
            (ScanState::Error, Some(message)) => ScanOutcome::Failed(message),
            _ => ScanOutcome::Closed,
        };
        self.shutdown(reason);
        debug!("Scanner view finished: {:?} ({})", outcome, self.stats);
        outcome
    }
}

async fn sleep_until_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cancel `token` on SIGINT or SIGTERM
pub fn spawn_signal_handlers(token: CancellationToken) {
    #[cfg(unix)]
    {
        let token = token.clone();
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    if sigterm.recv().await.is_some() {
                        info!("Received SIGTERM signal");
                        token.cancel();
                    }
                }
                Err(e) => tracing::warn!("Failed to register SIGTERM handler: {}", e),
            }
        });
    }

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received SIGINT signal (Ctrl+C)");
            token.cancel();
        }
    });
}
