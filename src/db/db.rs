use crate::db::migrations::init_with_migrations;
use crate::libs::data_storage::DataStorage;
use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "dwellsync.db";

pub struct Db {
    pub conn: Connection,
}

impl Db {
    /// Opens the store in the platform data directory.
    pub fn new() -> Result<Db> {
        let db_file_path = DataStorage::new().get_path(DB_FILE_NAME)?;
        Self::open(db_file_path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Db> {
        let mut conn = Connection::open(path)?;
        init_with_migrations(&mut conn)?;
        Ok(Db { conn })
    }

    /// Throwaway store for tests and dry runs.
    pub fn in_memory() -> Result<Db> {
        let mut conn = Connection::open_in_memory()?;
        init_with_migrations(&mut conn)?;
        Ok(Db { conn })
    }
}
