use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations::run_migrations, KeyValueStore};

enum StoreCommand {
    Get {
        key: String,
        reply: mpsc::Sender<Result<Option<String>>>,
    },
    Set {
        key: String,
        value: String,
    },
}

struct StoreWorker {
    commands: Option<mpsc::Sender<StoreCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl StoreWorker {
    fn send(&self, command: StoreCommand) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or_else(|| anyhow!("store thread already stopped"))?
            .send(command)
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))
    }
}

impl Drop for StoreWorker {
    // Closing the channel lets the worker drain queued writes and exit.
    fn drop(&mut self) {
        self.commands.take();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.join() {
                error!("Failed to join store thread: {err:?}");
            }
        }
    }
}

/// Key-value table in a SQLite file, served by a dedicated thread.
///
/// Writes are queued and return once accepted; the worker applies them in
/// order and logs failures. Reads wait for the worker, so they observe every
/// write queued before them.
#[derive(Clone)]
pub struct SqliteStore {
    worker: Arc<StoreWorker>,
    db_path: Arc<PathBuf>,
}

impl SqliteStore {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = open_connection(&db_path)?;
        let (commands_tx, commands_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("study-pal-store".into())
            .spawn(move || serve(conn, commands_rx))
            .context("failed to spawn store worker thread")?;

        info!("SQLite store initialized at {}", db_path.display());

        Ok(Self {
            worker: Arc::new(StoreWorker {
                commands: Some(commands_tx),
                handle: Some(handle),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        error!("Failed to enable WAL mode: {err}");
    }
    run_migrations(&mut conn).context("failed to run store migrations")?;
    Ok(conn)
}

fn serve(conn: Connection, commands: mpsc::Receiver<StoreCommand>) {
    for command in commands {
        match command {
            StoreCommand::Get { key, reply } => {
                if reply.send(read_value(&conn, &key)).is_err() {
                    error!("Store caller dropped before receiving {key}");
                }
            }
            StoreCommand::Set { key, value } => {
                if let Err(err) = write_value(&conn, &key, &value) {
                    error!("{err:#}");
                }
            }
        }
    }
    info!("Store thread shutting down");
}

fn read_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
    .with_context(|| format!("failed to read key {key}"))
}

fn write_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )
    .with_context(|| format!("failed to write key {key}"))?;
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let (reply, response) = mpsc::channel();
        self.worker.send(StoreCommand::Get {
            key: key.to_string(),
            reply,
        })?;
        response
            .recv()
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))?
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.worker.send(StoreCommand::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
