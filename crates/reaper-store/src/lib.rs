pub mod builds;
pub mod error;
pub mod keys;

pub use builds::{BuildRepository, ExportEntry, StoredBuild};
pub use error::{Result, StoreError};

use redb::Database;
use redb::backends::InMemoryBackend;
use std::path::Path;
use std::sync::Arc;

pub const DATABASE_FILE: &str = "reaper.redb";

pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Opens (or creates) the database file inside `data_directory`.
    pub fn open(data_directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_directory)?;
        let db = Database::create(data_directory.join(DATABASE_FILE))?;
        Self::init(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> Result<Self> {
        // Read transactions fail on a table that has never been written.
        let txn = db.begin_write()?;
        txn.open_table(keys::BUILDS)?;
        txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn builds(&self) -> BuildRepository<'_> {
        BuildRepository::new(&self.db)
    }
}
