use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

use crate::{error::StoreError, session::store::SessionStore};

const TABLE_NAME: &str = "session_store";

/// Durable key/value storage for the admin session, one row per key.
#[derive(Clone)]
pub struct SqliteStore {
    connection_pool: Arc<Pool<SqliteConnectionManager>>,
}

impl SqliteStore {
    /// Wraps the pool and makes sure the backing table exists.
    pub fn setup(connection_pool: Arc<Pool<SqliteConnectionManager>>) -> Result<Self, StoreError> {
        let store = Self { connection_pool };
        store.create_table()?;
        Ok(store)
    }

    /// Opens (or creates) a database file and sets the store up on it.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().build(manager)?;
        Self::setup(Arc::new(pool))
    }

    fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.connection_pool.get()?)
    }

    fn create_table(&self) -> Result<(), StoreError> {
        let connection = self.get_connection()?;
        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
                TABLE_NAME
            ),
            (),
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let connection = self.get_connection()?;
        let mut statement =
            connection.prepare(&format!("SELECT value FROM {} WHERE key = ?1", TABLE_NAME))?;
        let mut rows = statement.query(rusqlite::params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let connection = self.get_connection()?;
        connection.execute(
            &format!(
                "INSERT INTO {} (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                TABLE_NAME
            ),
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let connection = self.get_connection()?;
        connection.execute(
            &format!("DELETE FROM {} WHERE key = ?1", TABLE_NAME),
            rusqlite::params![key],
        )?;
        Ok(())
    }
}
