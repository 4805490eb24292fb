use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::oneshot;

use super::{migrations::run_migrations, KeyValueStore};

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum Request {
    Run(Job),
    Close,
}

/// The thread that owns the connection. Dropping the last handle closes the
/// queue and joins the thread.
struct Worker {
    queue: mpsc::Sender<Request>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let thread = match self.thread.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(thread) = thread else {
            return;
        };

        if self.queue.send(Request::Close).is_err() {
            debug!("kv worker already gone before close");
        }
        if thread.join().is_err() {
            error!("kv worker panicked");
        }
    }
}

fn prepare_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("cannot open sqlite file {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("WAL unavailable for {}: {err}", path.display());
    }
    run_migrations(&mut conn).context("kv schema upgrade failed")?;
    Ok(conn)
}

fn serve_requests(mut conn: Connection, requests: mpsc::Receiver<Request>) {
    for request in requests {
        match request {
            Request::Run(job) => job(&mut conn),
            Request::Close => break,
        }
    }
    debug!("kv worker stopped");
}

/// SQLite-backed [`KeyValueStore`]. One connection lives on its own thread;
/// async callers queue closures and await a oneshot reply.
#[derive(Clone)]
pub struct SqliteStore {
    worker: Arc<Worker>,
}

impl SqliteStore {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create directory {}", dir.display()))?;
        }

        let (queue, requests) = mpsc::channel::<Request>();
        let (opened_tx, opened_rx) = mpsc::channel::<Result<()>>();
        let thread_path = db_path.clone();

        let thread = thread::Builder::new()
            .name("leadwatch-kv".into())
            .spawn(move || match prepare_connection(&thread_path) {
                Ok(conn) => {
                    if opened_tx.send(Ok(())).is_ok() {
                        serve_requests(conn, requests);
                    }
                }
                Err(err) => {
                    let _ = opened_tx.send(Err(err));
                }
            })
            .context("cannot start kv worker thread")?;

        let opened = opened_rx
            .recv()
            .map_err(|_| anyhow!("kv worker exited during startup"))
            .and_then(|outcome| outcome);
        if let Err(err) = opened {
            let _ = thread.join();
            return Err(err);
        }

        info!("Store opened at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(Worker {
                queue,
                thread: Mutex::new(Some(thread)),
            }),
        })
    }

    async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let request = Request::Run(Box::new(move |conn| {
            // The caller may have been cancelled; nothing to report then.
            let _ = reply.send(job(conn));
        }));

        self.worker
            .queue
            .send(request)
            .map_err(|_| anyhow!("kv worker is no longer running"))?;

        outcome
            .await
            .map_err(|_| anyhow!("kv worker dropped the request"))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let key = key.to_string();
        self.run(move |conn| {
            let raw: Option<String> = conn
                .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                    row.get(0)
                })
                .optional()
                .with_context(|| format!("failed to read key '{key}'"))?;

            raw.map(|text| {
                serde_json::from_str(&text)
                    .with_context(|| format!("stored value for '{key}' is not valid JSON"))
            })
            .transpose()
        })
        .await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let key = key.to_string();
        let encoded = serde_json::to_string(&value)?;
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, encoded, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write key '{key}'"))?;
            Ok(())
        })
        .await
    }
}
