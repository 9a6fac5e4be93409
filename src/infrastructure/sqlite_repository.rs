// SQLite repository implementation
use crate::application::cook_repository::CookRepository;
use crate::domain::error::TelemetryError;
use crate::domain::reading::Reading;
use crate::domain::session::{Session, SessionMeta};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct RepositoryInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for RepositoryInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(e) = self.sender.send(DbCommand::Shutdown) {
                tracing::error!("Failed to send shutdown to database thread: {}", e);
            }
            if let Err(e) = handle.join() {
                tracing::error!("Failed to join database thread: {:?}", e);
            }
        }
    }
}

/// Cook session store over a single SQLite connection. The connection lives
/// on a dedicated worker thread; callers send closures to it and await the
/// reply, so every operation runs to completion in submission order.
#[derive(Clone)]
pub struct SqliteRepository {
    inner: Arc<RepositoryInner>,
    db_path: Arc<PathBuf>,
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("invalid datetime '{}': {}", value, e))
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            start_time TEXT NOT NULL,
            end_time TEXT,
            duration_secs REAL,
            grill_setpoint REAL,
            probe_setpoint REAL,
            ambient_temp REAL,
            notes TEXT
        );
        CREATE TABLE IF NOT EXISTS cook_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at TEXT NOT NULL,
            grill_temp REAL NOT NULL,
            probe_temp REAL NOT NULL,
            grill_setpoint REAL,
            probe_setpoint REAL,
            ambient_temp REAL,
            connected INTEGER NOT NULL,
            last_connected TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_cook_log_recorded_at ON cook_log(recorded_at);",
    )
    .context("failed to create schema")?;
    Ok(())
}

fn session_from_row(row: &rusqlite::Row<'_>) -> Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        start: parse_datetime(&row.get::<_, String>(1)?)?,
        end: row
            .get::<_, Option<String>>(2)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        duration_secs: row.get(3)?,
        grill_setpoint: row.get(4)?,
        probe_setpoint: row.get(5)?,
        ambient_temp: row.get(6)?,
        notes: row.get(7)?,
    })
}

const SESSION_COLUMNS: &str =
    "id, start_time, end_time, duration_secs, grill_setpoint, probe_setpoint, ambient_temp, notes";

impl SqliteRepository {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("grill-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(e) => {
                        let _ = ready_tx.send(Err(
                            anyhow::Error::new(e).context("failed to open SQLite database")
                        ));
                        return;
                    }
                };

                if let Err(e) = conn.pragma_update(None, "journal_mode", "WAL") {
                    tracing::error!("Failed to enable WAL mode: {}", e);
                }

                let init_result = init_schema(&mut conn);
                if ready_tx.send(init_result).is_err() {
                    tracing::error!("Database initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => task(&mut conn),
                        DbCommand::Shutdown => break,
                    }
                }

                tracing::info!("Database thread shutting down");
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        tracing::info!("Database ready at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(RepositoryInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn execute<F, T>(&self, operation: &'static str, task: F) -> Result<T, TelemetryError>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                tracing::error!("Database caller dropped before receiving result");
            }
        }));

        self.inner.sender.send(command).map_err(|e| {
            TelemetryError::persistence(operation, anyhow!("database thread unavailable: {}", e))
        })?;

        reply_rx
            .await
            .map_err(|_| {
                TelemetryError::persistence(
                    operation,
                    anyhow!("database thread terminated unexpectedly"),
                )
            })?
            .map_err(|e| TelemetryError::persistence(operation, e))
    }
}

#[async_trait]
impl CookRepository for SqliteRepository {
    async fn create_session(
        &self,
        start: DateTime<Utc>,
        meta: &SessionMeta,
    ) -> Result<i64, TelemetryError> {
        let meta = meta.clone();
        self.execute("create_session", move |conn| {
            conn.execute(
                "INSERT INTO sessions (start_time, grill_setpoint, probe_setpoint, ambient_temp)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    start.to_rfc3339(),
                    meta.grill_setpoint,
                    meta.probe_setpoint,
                    meta.ambient_temp,
                ],
            )
            .context("failed to insert session")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    async fn update_session(
        &self,
        id: i64,
        end: DateTime<Utc>,
        duration_secs: f64,
    ) -> Result<(), TelemetryError> {
        self.execute("update_session", move |conn| {
            let updated = conn
                .execute(
                    "UPDATE sessions SET end_time = ?1, duration_secs = ?2 WHERE id = ?3",
                    params![end.to_rfc3339(), duration_secs, id],
                )
                .context("failed to update session")?;
            if updated == 0 {
                anyhow::bail!("session {} not found", id);
            }
            Ok(())
        })
        .await
    }

    async fn find_most_recent_session(&self) -> Result<Option<Session>, TelemetryError> {
        self.execute("find_most_recent_session", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sessions ORDER BY id DESC LIMIT 1",
                SESSION_COLUMNS
            ))?;

            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(Some(session_from_row(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, TelemetryError> {
        self.execute("list_sessions", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sessions ORDER BY id ASC",
                SESSION_COLUMNS
            ))?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(session_from_row(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    async fn append_cook_log(&self, reading: &Reading) -> Result<(), TelemetryError> {
        let record = reading.clone();
        self.execute("append_cook_log", move |conn| {
            conn.execute(
                "INSERT INTO cook_log (recorded_at, grill_temp, probe_temp, grill_setpoint,
                                       probe_setpoint, ambient_temp, connected, last_connected)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.timestamp.to_rfc3339(),
                    record.grill_temp,
                    record.probe_temp,
                    record.grill_setpoint,
                    record.probe_setpoint,
                    record.ambient_temp,
                    record.connected,
                    record.last_connected,
                ],
            )
            .context("failed to append cook log entry")?;
            Ok(())
        })
        .await
    }
}
