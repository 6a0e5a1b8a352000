//! Local capture archive backed by SQLite.
//!
//! All statements run on one dedicated thread that owns the connection;
//! async callers hand it closures and await the reply.

use std::{
    future::Future,
    path::PathBuf,
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod captures;
mod helpers;
mod migrations;
mod models;

use migrations::run_migrations;

pub use captures::STORAGE_FULL_MESSAGE;
pub use models::{Capture, CaptureSummary};

/// Where assembled captures are appended.
pub trait ArchiveStore: Send + Sync {
    fn append_capture(&self, capture: &Capture) -> impl Future<Output = Result<()>> + Send;
}

type ArchiveJob = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// The connection-owning thread. Dropping the last handle closes the job
/// queue, which ends the thread, and then joins it.
struct ArchiveWorker {
    jobs: Option<mpsc::Sender<ArchiveJob>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for ArchiveWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Archive worker panicked");
            }
        }
    }
}

/// Handle to the capture archive. Clones share one worker.
#[derive(Clone)]
pub struct Database {
    worker: Arc<ArchiveWorker>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create archive directory {}", parent.display())
            })?;
        }

        let label = db_path.display().to_string();
        let database = Self::spawn(move || {
            Connection::open(&db_path).context("failed to open SQLite archive")
        })?;

        info!("Archive opened at {label}");
        Ok(database)
    }

    /// Archive that lives only as long as this handle.
    pub fn in_memory() -> Result<Self> {
        Self::spawn(|| Connection::open_in_memory().context("failed to open in-memory archive"))
    }

    fn spawn<F>(open: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Connection> + Send + 'static,
    {
        let (jobs_tx, jobs_rx) = mpsc::channel::<ArchiveJob>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        let thread = thread::Builder::new()
            .name("rollcap-archive".into())
            .spawn(move || {
                let mut conn = match open().and_then(prepare_connection) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }

                let mut handled = 0usize;
                for job in jobs_rx {
                    job(&mut conn);
                    handled += 1;
                }
                debug!("Archive worker stopped after {handled} jobs");
            })
            .context("failed to spawn archive worker thread")?;

        ready_rx
            .recv()
            .context("archive worker exited before it was ready")??;

        Ok(Self {
            worker: Arc::new(ArchiveWorker {
                jobs: Some(jobs_tx),
                thread: Some(thread),
            }),
        })
    }

    /// Runs `task` on the archive thread and returns its result.
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("archive is closed"))?;
        let (reply_tx, reply_rx) = oneshot::channel();

        jobs.send(Box::new(move |conn| {
            // The caller may have been cancelled; its result is simply dropped.
            let _ = reply_tx.send(task(conn));
        }))
        .map_err(|_| anyhow!("archive worker is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("archive worker dropped the request"))?
    }
}

/// WAL journaling, a busy timeout for concurrent readers, then migrations.
fn prepare_connection(mut conn: Connection) -> Result<Connection> {
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Archive stays in rollback journal mode: {err}");
    }
    conn.busy_timeout(Duration::from_secs(5))
        .context("failed to set archive busy timeout")?;
    run_migrations(&mut conn).context("failed to run archive migrations")?;
    Ok(conn)
}

impl ArchiveStore for Database {
    async fn append_capture(&self, capture: &Capture) -> Result<()> {
        self.insert_capture(capture).await
    }
}
