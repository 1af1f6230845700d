//! SQLite-based execution store

use crate::core::{Execution, ExecutionEvent, NotifierError, OutputFile, Step};
use crate::persistence::EventNotifier;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// SQLite execution store
///
/// Steps and output files are kept as JSON columns. Writes are serialized
/// through one writer and run in `BEGIN IMMEDIATE` transactions, so
/// concurrent executions never race on a read-then-write upgrade.
pub struct SqliteExecutionStore {
    pool: SqlitePool,
    writer: Mutex<()>,
}

/// How long a write waits for another process holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

impl SqliteExecutionStore {
    /// Create a new SQLite store
    pub async fn new(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))
            .context("Invalid database path")?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        // Each connection to `:memory:` opens its own database.
        let max_connections = if db_path == ":memory:" { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let store = Self {
            pool,
            writer: Mutex::new(()),
        };
        store.init().await?;

        Ok(store)
    }

    /// Create store with default path
    pub async fn with_default_path() -> Result<Self> {
        let data_dir = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = data_dir.join("workload");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("executions.db");
        let db_path = db_path
            .to_str()
            .context("Database path is not valid UTF-8")?;
        Self::new(db_path).await
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS executions (
                id TEXT PRIMARY KEY,
                engine TEXT NOT NULL,
                steps TEXT NOT NULL,
                output_files TEXT NOT NULL,
                current_status TEXT,
                terminated INTEGER NOT NULL DEFAULT 0,
                created TEXT NOT NULL,
                last_updated TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_engine ON executions(engine)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Most recent executions, optionally filtered by engine
    pub async fn list_executions(&self, engine: Option<&str>, limit: usize) -> Result<Vec<Execution>> {
        let rows = match engine {
            Some(engine) => {
                sqlx::query(
                    r#"
                    SELECT id, engine, steps, output_files, created, last_updated
                    FROM executions
                    WHERE engine = ?1
                    ORDER BY created DESC
                    LIMIT ?2
                    "#,
                )
                .bind(engine)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, engine, steps, output_files, created, last_updated
                    FROM executions
                    ORDER BY created DESC
                    LIMIT ?1
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list executions")?;

        rows.iter()
            .map(|row| Self::from_row(row).map_err(anyhow::Error::from))
            .collect()
    }

    /// Transaction holding the database write lock from its first statement
    async fn begin_write(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>, NotifierError> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(storage)
    }

    async fn save(&self, conn: &mut sqlx::SqliteConnection, exec: &Execution, insert: bool) -> Result<(), NotifierError> {
        let steps = serde_json::to_string(&exec.steps).map_err(storage)?;
        let outputs = serde_json::to_string(&exec.output_files).map_err(storage)?;
        let status = exec.current_step().map(Step::status_label);

        let sql = if insert {
            r#"
            INSERT INTO executions
            (id, engine, steps, output_files, current_status, terminated, created, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#
        } else {
            r#"
            UPDATE executions
            SET engine = ?2, steps = ?3, output_files = ?4, current_status = ?5,
                terminated = ?6, created = ?7, last_updated = ?8
            WHERE id = ?1
            "#
        };

        sqlx::query(sql)
            .bind(exec.id.to_string())
            .bind(&exec.engine)
            .bind(steps)
            .bind(outputs)
            .bind(status)
            .bind(exec.is_terminated())
            .bind(Self::to_naive(exec.created))
            .bind(Self::to_naive(exec.last_updated))
            .execute(&mut *conn)
            .await
            .map_err(storage)?;

        Ok(())
    }

    async fn load(conn: &mut sqlx::SqliteConnection, id: Uuid) -> Result<Option<Execution>, NotifierError> {
        let row = sqlx::query(
            r#"
            SELECT id, engine, steps, output_files, created, last_updated
            FROM executions
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage)?;

        row.as_ref().map(Self::from_row).transpose()
    }

    fn from_row(row: &SqliteRow) -> Result<Execution, NotifierError> {
        let steps: Vec<Step> = serde_json::from_str(&row.get::<String, _>("steps")).map_err(storage)?;
        let output_files: Vec<OutputFile> =
            serde_json::from_str(&row.get::<String, _>("output_files")).map_err(storage)?;

        Ok(Execution {
            id: Uuid::parse_str(&row.get::<String, _>("id")).map_err(storage)?,
            engine: row.get("engine"),
            steps,
            output_files,
            created: Self::from_naive(row.get("created")),
            last_updated: Self::from_naive(row.get("last_updated")),
        })
    }

    /// Convert DateTime<Utc> to NaiveDateTime for SQLite
    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    /// Convert NaiveDateTime to DateTime<Utc>
    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }
}

fn storage<E: std::fmt::Display>(e: E) -> NotifierError {
    NotifierError::Storage(e.to_string())
}

#[async_trait::async_trait]
impl EventNotifier for SqliteExecutionStore {
    async fn register(&self, execution: Execution) -> Result<Execution, NotifierError> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin_write().await?;
        if Self::load(&mut tx, execution.id).await?.is_some() {
            return Err(NotifierError::DuplicateExecution(execution.id));
        }
        self.save(&mut tx, &execution, true).await?;
        tx.commit().await.map_err(storage)?;

        debug!("Stored new execution {}", execution.id);
        Ok(execution)
    }

    async fn notify_event(
        &self,
        execution_id: Uuid,
        event: ExecutionEvent,
    ) -> Result<Execution, NotifierError> {
        let _writer = self.writer.lock().await;
        let mut tx = self.begin_write().await?;
        let mut exec = Self::load(&mut tx, execution_id)
            .await?
            .ok_or(NotifierError::UnknownExecution(execution_id))?;

        exec.apply(event)?;
        self.save(&mut tx, &exec, false).await?;
        tx.commit().await.map_err(storage)?;

        Ok(exec)
    }

    async fn find(&self, execution_id: Uuid) -> Result<Option<Execution>, NotifierError> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        Self::load(&mut conn, execution_id).await
    }
}
