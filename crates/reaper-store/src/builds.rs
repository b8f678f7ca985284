use crate::error::{Result, StoreError};
use crate::keys::{self, BUILDS};
use entity::Build;
use redb::{Database, ReadableTable, Table};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// A build decoded from one index entry.
#[derive(Debug, Clone)]
pub struct StoredBuild {
    pub key: String,
    pub build: Build,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportEntry {
    pub key: String,
    pub value: serde_json::Value,
}

pub struct BuildRepository<'a> {
    db: &'a Arc<Database>,
}

impl<'a> BuildRepository<'a> {
    pub fn new(db: &'a Arc<Database>) -> Self {
        Self { db }
    }

    /// Writes the build under its full key set in one transaction.
    ///
    /// Keys left behind by a previous version of the same build (a changed
    /// `createdAt`, branch or organization) are removed in the same batch.
    pub async fn put(&self, build: &Build) -> Result<()> {
        let value = serde_json::to_vec(build).map_err(|source| StoreError::Encode {
            id: build.id.clone(),
            source,
        })?;
        let new_keys = keys::build_keys(build);
        let id_key = keys::build_key(&build.id);
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(BUILDS)?;
                for stale in stored_keys(&table, &id_key)? {
                    if !new_keys.contains(&stale) {
                        table.remove(stale.as_str())?;
                    }
                }
                for key in &new_keys {
                    table.insert(key.as_str(), value.as_slice())?;
                }
            }
            txn.commit()?;
            Ok(())
        })
        .await?
    }

    /// Removes the build's full key set in one transaction. Deleting a build
    /// that is not stored is a no-op.
    pub async fn delete(&self, build: &Build) -> Result<()> {
        let mut doomed = keys::build_keys(build);
        let id_key = keys::build_key(&build.id);
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(BUILDS)?;
                for key in stored_keys(&table, &id_key)? {
                    if !doomed.contains(&key) {
                        doomed.push(key);
                    }
                }
                for key in &doomed {
                    table.remove(key.as_str())?;
                }
            }
            txn.commit()?;
            Ok(())
        })
        .await?
    }

    /// Every record whose key starts with `prefix`, in ascending key order.
    pub async fn scan(&self, prefix: &str) -> Result<Vec<StoredBuild>> {
        self.scan_raw(prefix)
            .await?
            .into_iter()
            .map(|(key, value)| {
                let build = serde_json::from_slice(&value)
                    .map_err(|source| StoreError::Decode {
                        key: key.clone(),
                        source,
                    })?;
                Ok(StoredBuild { key, build })
            })
            .collect()
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Build>> {
        let key = keys::build_key(id);
        let db = self.db.clone();

        let value = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
            let txn = db.begin_read()?;
            let table = txn.open_table(BUILDS)?;
            Ok(table.get(key.as_str())?.map(|v| v.value().to_vec()))
        })
        .await??;

        value
            .map(|value| {
                serde_json::from_slice(&value).map_err(|source| StoreError::Decode {
                    key: keys::build_key(id),
                    source,
                })
            })
            .transpose()
    }

    pub async fn list_all(&self) -> Result<Vec<Build>> {
        self.list(&keys::build_prefix()).await
    }

    /// All builds of an organization, oldest first.
    pub async fn list_by_organization(&self, organization_id: &str) -> Result<Vec<Build>> {
        self.list(&keys::organization_prefix(organization_id)).await
    }

    /// All builds on one branch of a project, oldest first.
    pub async fn list_by_project_branch(
        &self,
        project_id: &str,
        branch: &str,
    ) -> Result<Vec<Build>> {
        self.list(&keys::project_branch_prefix(project_id, branch)).await
    }

    /// Every entry in the store, values decoded as plain JSON.
    pub async fn export(&self) -> Result<Vec<ExportEntry>> {
        self.scan_raw("")
            .await?
            .into_iter()
            .map(|(key, value)| {
                let value = serde_json::from_slice(&value).map_err(|source| {
                    StoreError::Decode {
                        key: key.clone(),
                        source,
                    }
                })?;
                Ok(ExportEntry { key, value })
            })
            .collect()
    }

    async fn list(&self, prefix: &str) -> Result<Vec<Build>> {
        Ok(self
            .scan(prefix)
            .await?
            .into_iter()
            .map(|stored| stored.build)
            .collect())
    }

    async fn scan_raw(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let prefix = prefix.to_string();
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<(String, Vec<u8>)>> {
            let txn = db.begin_read()?;
            let table = txn.open_table(BUILDS)?;
            let mut entries = Vec::new();

            for entry in table.range(prefix.as_str()..)? {
                let (key, value) = entry?;
                if !key.value().starts_with(prefix.as_str()) {
                    break;
                }
                entries.push((key.value().to_string(), value.value().to_vec()));
            }

            Ok(entries)
        })
        .await?
    }
}

/// The key set of the record currently stored under `build!!{id}`, if any.
fn stored_keys(
    table: &Table<'_, &'static str, &'static [u8]>,
    id_key: &str,
) -> Result<Vec<String>> {
    let Some(guard) = table.get(id_key)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_slice::<Build>(guard.value()) {
        Ok(previous) => Ok(keys::build_keys(&previous)),
        Err(e) => {
            warn!("Ignoring undecodable record at {}: {}", id_key, e);
            Ok(Vec::new())
        }
    }
}
