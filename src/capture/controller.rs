use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::archive::{ArchiveStore, Capture};
use crate::error::{CaptureError, CaptureResult};
use crate::pipeline::{capture_selection, run_rolling_capture};
use crate::settings::SettingsStore;

use super::command::CaptureCommand;
use super::page::PageSurface;

struct ActiveRun {
    kind: &'static str,
    handle: JoinHandle<CaptureResult<Capture>>,
    cancel_token: CancellationToken,
}

/// Owns the page and archive and runs at most one capture at a time.
pub struct CaptureController<P, S> {
    page: Arc<P>,
    store: Arc<S>,
    settings: Arc<SettingsStore>,
    active: Option<ActiveRun>,
}

impl<P, S> CaptureController<P, S>
where
    P: PageSurface + 'static,
    S: ArchiveStore + 'static,
{
    pub fn new(page: Arc<P>, store: Arc<S>, settings: Arc<SettingsStore>) -> Self {
        Self {
            page,
            store,
            settings,
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// Starts or cancels a run. Start commands return as soon as the run is
    /// spawned; its result is collected with [`finish`](Self::finish).
    pub fn dispatch(&mut self, command: CaptureCommand) -> CaptureResult<()> {
        let name = command.name();
        match command {
            CaptureCommand::StartRollingCapture(request) => {
                self.ensure_idle()?;
                let (page, store) = (Arc::clone(&self.page), Arc::clone(&self.store));
                let settings = self.settings.capture();
                self.spawn(name, move |token| async move {
                    run_rolling_capture(page.as_ref(), store.as_ref(), &settings, request, token).await
                });
                Ok(())
            }
            CaptureCommand::CaptureSelection(request) => {
                self.ensure_idle()?;
                let (page, store) = (Arc::clone(&self.page), Arc::clone(&self.store));
                let settings = self.settings.capture();
                self.spawn(name, move |token| async move {
                    capture_selection(page.as_ref(), store.as_ref(), &settings, request, token).await
                });
                Ok(())
            }
            CaptureCommand::Cancel => {
                let run = self
                    .active
                    .as_ref()
                    .filter(|run| !run.handle.is_finished())
                    .ok_or(CaptureError::NoActiveRun)?;
                info!("Cancelling {} capture", run.kind);
                run.cancel_token.cancel();
                Ok(())
            }
        }
    }

    /// Waits for the current run and returns its result, or `None` when no
    /// run was started since the last call.
    pub async fn finish(&mut self) -> Option<CaptureResult<Capture>> {
        let run = self.active.take()?;
        let result = run
            .handle
            .await
            .context("capture task failed to join")
            .map_err(CaptureError::from)
            .and_then(|result| result);
        Some(result)
    }

    /// Cancels any running capture and waits for it to wind down.
    pub async fn shutdown(&mut self) {
        if let Some(run) = &self.active {
            run.cancel_token.cancel();
        }
        if let Some(Err(err)) = self.finish().await {
            if !matches!(err, CaptureError::Cancelled) {
                warn!("Capture ended with error during shutdown: {err}");
            }
        }
    }

    fn ensure_idle(&mut self) -> CaptureResult<()> {
        if self.is_running() {
            return Err(CaptureError::AlreadyRunning);
        }
        if let Some(stale) = self.active.take() {
            warn!("Discarding uncollected result of previous {} capture", stale.kind);
        }
        Ok(())
    }

    fn spawn<F, Fut>(&mut self, kind: &'static str, run: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = CaptureResult<Capture>> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(run(cancel_token.clone()));
        info!("Started {kind} capture");
        self.active = Some(ActiveRun {
            kind,
            handle,
            cancel_token,
        });
    }
}
