use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;

use crate::models::{StoredTransaction, TransactionDraft};
use crate::utils::now_rfc3339;

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(db_path: impl AsRef<Path>) -> SqlResult<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> SqlResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let mut db = Database { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&mut self) -> SqlResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let migrations = vec![(
            "001_create_transactions.sql",
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/migrations/001_create_transactions.sql"
            )),
        )];

        for (name, sql) in migrations {
            let applied: Option<String> = self
                .conn
                .query_row(
                    "SELECT name FROM schema_migrations WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            if applied.is_none() {
                let tx = self.conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute(
                    "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, datetime('now'))",
                    params![name],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    }

    pub fn insert_transaction(&self, draft: &TransactionDraft) -> SqlResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO transactions (
                id, description, amount, category, date,
                transaction_type, payment_method, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                draft.description,
                draft.amount,
                draft.category,
                draft.date,
                draft.transaction_type.as_str(),
                draft.payment_method,
                now_rfc3339()
            ],
        )?;
        Ok(id)
    }

    pub fn get_transactions(&self) -> SqlResult<Vec<StoredTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, description, amount, category, date,
                    transaction_type, payment_method, created_at
             FROM transactions
             ORDER BY date DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(StoredTransaction {
                id: row.get(0)?,
                description: row.get(1)?,
                amount: row.get(2)?,
                category: row.get(3)?,
                date: row.get(4)?,
                transaction_type: row.get(5)?,
                payment_method: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        rows.collect()
    }
}
