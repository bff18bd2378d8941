//! Embedded migrations for the §6.4 schema: `tasks` and `agent_events`.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to execute migration {version}: {source}")]
    Execution {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to get schema version: {0}")]
    VersionCheck(#[source] sqlx::Error),
}

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

fn embedded_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "create tasks table",
            sql: "CREATE TABLE IF NOT EXISTS tasks (
                task_id TEXT PRIMARY KEY,
                trace_id TEXT NOT NULL,
                prompt TEXT NOT NULL,
                status TEXT NOT NULL,
                current_phase TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                cost_estimate REAL
            )",
        },
        Migration {
            version: 2,
            description: "create agent_events table",
            sql: "CREATE TABLE IF NOT EXISTS agent_events (
                event_id TEXT PRIMARY KEY,
                event_type TEXT NOT NULL,
                task_id TEXT NOT NULL,
                trace_id TEXT NOT NULL,
                actor TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                payload_digest TEXT NOT NULL,
                FOREIGN KEY (task_id) REFERENCES tasks(task_id)
            )",
        },
        Migration {
            version: 3,
            description: "index agent_events by task for history loads",
            sql: "CREATE INDEX IF NOT EXISTS idx_agent_events_task_id
                ON agent_events(task_id, timestamp)",
        },
    ]
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run(&self) -> Result<usize, MigrationError> {
        self.ensure_migrations_table().await?;
        let current_version = self.get_current_version().await?;
        let pending: Vec<_> = embedded_migrations()
            .into_iter()
            .filter(|m| m.version > current_version)
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }
        let applied = pending.len();
        for migration in pending {
            self.apply_migration(&migration).await?;
        }
        Ok(applied)
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                description TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MigrationError::Execution { version: 0, source: e })?;
        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(version) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::VersionCheck)?;
        Ok(row.0.unwrap_or(0))
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), MigrationError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MigrationError::Execution { version: migration.version, source: e })?;

        sqlx::query(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Execution { version: migration.version, source: e })?;

        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| MigrationError::Execution { version: migration.version, source: e })?;

        tx.commit()
            .await
            .map_err(|e| MigrationError::Execution { version: migration.version, source: e })?;
        Ok(())
    }
}
