//! Control handle for a spawned engine

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;

use pixel_pricer_core::{PricerError, PricerResult};

use crate::engine::EngineState;

/// Stops and awaits an engine started with `PricingEngine::spawn`
pub struct EngineHandle {
    shutdown: Option<oneshot::Sender<()>>,
    state: watch::Receiver<EngineState>,
    task: JoinHandle<PricerResult<()>>,
}

impl EngineHandle {
    pub(crate) fn new(
        shutdown: oneshot::Sender<()>,
        state: watch::Receiver<EngineState>,
        task: JoinHandle<PricerResult<()>>,
    ) -> Self {
        Self {
            shutdown: Some(shutdown),
            state,
            task,
        }
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the engine to stop after the round in flight, if any
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            info!("Stopping pricing engine");
            let _ = tx.send(());
        }
    }

    /// Wait for the engine to exit. Must not be called again after it has
    /// returned.
    pub async fn wait(&mut self) -> PricerResult<()> {
        (&mut self.task)
            .await
            .map_err(|e| PricerError::Task(e.to_string()))?
    }

    pub async fn join(mut self) -> PricerResult<()> {
        self.wait().await
    }

    /// Stop, then wait for the engine to finish
    pub async fn shutdown(mut self) -> PricerResult<()> {
        self.stop();
        self.wait().await
    }
}
