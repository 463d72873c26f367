//! # Megafarm Ledger
//!
//! Durable per-wallet task completion state. A `(wallet, task)` pair
//! moves pending → completed exactly once; completed tasks are never
//! handed out again, so an interrupted run resumes without repeating
//! side-effecting on-chain operations.
//!
//! SQLite persistence, migrated on open, with all access serialized
//! behind one async mutex: runners for different wallets may complete
//! tasks concurrently and their writes must not race on the file.
//! An unopenable store is a fatal, non-retryable error for the run —
//! without completion state the engine cannot safely execute anything.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::Mutex;

use megafarm_core::error::{MegafarmError, Result};
use megafarm_tasks::TaskName;

fn db_err(e: rusqlite::Error) -> MegafarmError {
    MegafarmError::Ledger(e.to_string())
}

/// Row counts reported by the `status` command.
#[derive(Debug, Clone, Default)]
pub struct LedgerStats {
    pub wallets: usize,
    pub pending: usize,
    pub completed: usize,
}

/// SQLite-backed task ledger.
pub struct TaskLedger {
    conn: Mutex<rusqlite::Connection>,
}

impl TaskLedger {
    /// Open or create the ledger database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)
            .map_err(|e| MegafarmError::Ledger(format!("DB open {}: {e}", path.display())))?;
        Self::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory ledger, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(db_err)?;
        Self::migrate(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Default database location (~/.megafarm/ledger.db).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".megafarm")
            .join("ledger.db")
    }

    fn migrate(conn: &rusqlite::Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS wallet_tasks (
                wallet_key TEXT NOT NULL,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                completed_at TEXT,
                PRIMARY KEY (wallet_key, name)
            );
            CREATE INDEX IF NOT EXISTS idx_wallet_tasks_status
                ON wallet_tasks (wallet_key, status);
            ",
        )
        .map_err(|e| MegafarmError::Ledger(format!("Migration: {e}")))
    }

    /// Persist a freshly resolved plan for a wallet seen for the first
    /// time. Existing rows win (INSERT OR IGNORE): re-running with the
    /// same or a changed plan never resets completion state, it only
    /// adds tasks the wallet has not seen. The `skip` sentinel is never
    /// written.
    pub async fn ensure_plan(&self, wallet_key: &str, plan: &[TaskName]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction().map_err(db_err)?;
        let now = Utc::now().to_rfc3339();
        for (position, task) in plan.iter().filter(|t| !t.is_skip()).enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO wallet_tasks
                     (wallet_key, position, name, status, created_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4)",
                rusqlite::params![wallet_key, position as i64, task.as_str(), now],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)
    }

    /// The wallet's plan with completed tasks removed, preserving
    /// relative order. Empty both for a finished wallet and for one
    /// the ledger has never seen.
    pub async fn pending_tasks(&self, wallet_key: &str) -> Result<Vec<TaskName>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM wallet_tasks
                 WHERE wallet_key = ?1 AND status = 'pending'
                 ORDER BY position",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([wallet_key], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(TaskName::new(&row.map_err(db_err)?));
        }
        Ok(tasks)
    }

    /// Mark one task completed. Idempotent: marking an already
    /// completed task changes nothing.
    pub async fn mark_completed(&self, wallet_key: &str, task: &TaskName) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE wallet_tasks
             SET status = 'completed', completed_at = ?1
             WHERE wallet_key = ?2 AND name = ?3 AND status != 'completed'",
            rusqlite::params![Utc::now().to_rfc3339(), wallet_key, task.as_str()],
        )
        .map_err(db_err)?;
        Ok(())
    }

    /// True if the wallet has any rows at all (completed or pending).
    pub async fn has_wallet(&self, wallet_key: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM wallet_tasks WHERE wallet_key = ?1",
                [wallet_key],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Administrative: delete one wallet's rows. Returns rows removed.
    pub async fn reset_wallet(&self, wallet_key: &str) -> Result<usize> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM wallet_tasks WHERE wallet_key = ?1", [wallet_key])
            .map_err(db_err)
    }

    /// Administrative: wipe the ledger. Returns rows removed.
    pub async fn reset_all(&self) -> Result<usize> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM wallet_tasks", []).map_err(db_err)
    }

    /// Row counts for reporting.
    pub async fn stats(&self) -> Result<LedgerStats> {
        let conn = self.conn.lock().await;
        let wallets: i64 = conn
            .query_row("SELECT COUNT(DISTINCT wallet_key) FROM wallet_tasks", [], |r| r.get(0))
            .map_err(db_err)?;
        let pending: i64 = conn
            .query_row("SELECT COUNT(*) FROM wallet_tasks WHERE status = 'pending'", [], |r| {
                r.get(0)
            })
            .map_err(db_err)?;
        let completed: i64 = conn
            .query_row("SELECT COUNT(*) FROM wallet_tasks WHERE status = 'completed'", [], |r| {
                r.get(0)
            })
            .map_err(db_err)?;
        Ok(LedgerStats {
            wallets: wallets as usize,
            pending: pending as usize,
            completed: completed as usize,
        })
    }
}
