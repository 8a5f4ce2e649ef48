//! Schema migrations
//!
//! Migrations are declared as data and applied in order by [`MigrationRunner`].
//! Applied migrations are recorded in the `schema_migrations` ledger so that
//! re-running is a no-op. Each migration runs inside a single transaction.

use crate::error::{LocalizationError, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info, warn};

/// What happens to a referencing row when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    SetNull,
    Cascade,
    Restrict,
}

impl OnDelete {
    fn as_sql(self) -> &'static str {
        match self {
            OnDelete::SetNull => "SET NULL",
            OnDelete::Cascade => "CASCADE",
            OnDelete::Restrict => "RESTRICT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Add a nullable foreign-key column.
    AddForeignKey {
        table: &'static str,
        column: &'static str,
        references_table: &'static str,
        references_column: &'static str,
        on_delete: OnDelete,
    },
}

impl Operation {
    fn apply(&self, tx: &Transaction<'_>) -> Result<()> {
        match self {
            Operation::AddForeignKey {
                table,
                column,
                references_table,
                references_column,
                on_delete,
            } => {
                if column_exists(tx, table, column)? {
                    warn!("Column {}.{} already exists, skipping", table, column);
                    return Ok(());
                }

                let sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} INTEGER NULL REFERENCES {}({}) ON DELETE {}",
                    table,
                    column,
                    references_table,
                    references_column,
                    on_delete.as_sql()
                );
                tx.execute(&sql, []).map_err(|e| {
                    LocalizationError::Migration(format!("Failed to add {}.{}: {}", table, column, e))
                })?;
                info!("Added column {}.{} -> {}", table, column, references_table);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub app: &'static str,
    pub name: &'static str,
    /// (app, name) pairs that must be applied first
    pub dependencies: &'static [(&'static str, &'static str)],
    pub operations: Vec<Operation>,
}

/// Every migration this service knows about, in application order.
pub fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        app: "workbench",
        name: "0005_dataset_agents",
        dependencies: &[("specify", "__first__"), ("workbench", "0004_auto_20210219_1131")],
        operations: vec![
            Operation::AddForeignKey {
                table: "spdataset",
                column: "createdbyagent_id",
                references_table: "agent",
                references_column: "agentid",
                on_delete: OnDelete::SetNull,
            },
            Operation::AddForeignKey {
                table: "spdataset",
                column: "modifiedbyagent_id",
                references_table: "agent",
                references_column: "agentid",
                on_delete: OnDelete::SetNull,
            },
        ],
    }]
}

const LEDGER_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        app TEXT NOT NULL,
        name TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        UNIQUE(app, name)
    )
"#;

pub struct MigrationRunner<'conn> {
    conn: &'conn mut Connection,
    migrations: Vec<Migration>,
}

impl<'conn> MigrationRunner<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self::with_migrations(conn, all_migrations())
    }

    pub fn with_migrations(conn: &'conn mut Connection, migrations: Vec<Migration>) -> Self {
        Self { conn, migrations }
    }

    /// Apply every migration not yet in the ledger; returns the names applied
    pub fn apply_pending(&mut self) -> Result<Vec<String>> {
        self.conn
            .execute(LEDGER_SQL, [])
            .map_err(|e| LocalizationError::Migration(format!("Failed to create migration ledger: {}", e)))?;

        let mut applied = Vec::new();
        for migration in &self.migrations {
            if is_applied(self.conn, migration.app, migration.name)? {
                debug!("Migration {}.{} already applied", migration.app, migration.name);
                continue;
            }

            self.check_dependencies(migration)?;

            let tx = self
                .conn
                .transaction()
                .map_err(|e| LocalizationError::Migration(format!("Failed to start transaction: {}", e)))?;

            for operation in &migration.operations {
                operation.apply(&tx)?;
            }

            tx.execute(
                "INSERT INTO schema_migrations (app, name, applied_at) VALUES (?1, ?2, ?3)",
                params![migration.app, migration.name, Utc::now().to_rfc3339()],
            )
            .map_err(|e| LocalizationError::Migration(format!("Failed to record migration: {}", e)))?;

            tx.commit()
                .map_err(|e| LocalizationError::Migration(format!("Failed to commit migration: {}", e)))?;

            info!("Applied migration {}.{}", migration.app, migration.name);
            applied.push(format!("{}.{}", migration.app, migration.name));
        }

        Ok(applied)
    }

    // Dependencies outside this runner's list belong to the externally managed schema.
    fn check_dependencies(&self, migration: &Migration) -> Result<()> {
        for (app, name) in migration.dependencies {
            let known = self
                .migrations
                .iter()
                .any(|m| m.app == *app && m.name == *name);
            if known && !is_applied(self.conn, app, name)? {
                return Err(LocalizationError::Migration(format!(
                    "{}.{} depends on unapplied {}.{}",
                    migration.app, migration.name, app, name
                )));
            }
        }
        Ok(())
    }
}

fn is_applied(conn: &Connection, app: &str, name: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM schema_migrations WHERE app = ?1 AND name = ?2",
        params![app, name],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
    .map_err(|e| LocalizationError::Migration(format!("Failed to read migration ledger: {}", e)))
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .map_err(|e| LocalizationError::Migration(format!("Failed to inspect {}: {}", table, e)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
        .map_err(|e| LocalizationError::Migration(format!("Failed to inspect {}: {}", table, e)))?;
    Ok(names.iter().any(|name| name.eq_ignore_ascii_case(column)))
}
