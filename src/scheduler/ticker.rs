//! Stoppable fixed-period background task.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs a task every `period`, starting immediately, until stopped or dropped.
///
/// A run that is in progress when the ticker is stopped completes; no further
/// runs start. Ticks missed while a run is in progress are skipped.
pub struct Ticker {
    stop: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, _) = broadcast::channel(1);
        let mut stop_rx = stop.subscribe();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => break,
                    _ = interval.tick() => task().await,
                }
            }

            tracing::debug!("Ticker {} stopped", name);
        });

        tracing::debug!("Ticker {} started with period {:?}", name, period);

        Self { stop, handle }
    }

    /// Ask the loop to exit after any in-progress run.
    pub fn stop(&self) {
        let _ = self.stop.send(());
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
