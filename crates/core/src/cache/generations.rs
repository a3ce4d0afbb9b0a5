//! Cache generation lifecycle: create, list, delete, evict.

use super::connection::CacheDb;
use crate::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// What a generation holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    /// App shell and static assets, populated at install.
    Shell,
    /// Copies of API responses and navigations.
    Dynamic,
    /// The foreground-supplied orders snapshot.
    OfflineData,
}

impl Purpose {
    pub const ALL: [Purpose; 3] = [Purpose::Shell, Purpose::Dynamic, Purpose::OfflineData];

    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Shell => "shell",
            Purpose::Dynamic => "dynamic",
            Purpose::OfflineData => "offline-data",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shell" => Some(Purpose::Shell),
            "dynamic" => Some(Purpose::Dynamic),
            "offline-data" => Some(Purpose::OfflineData),
            _ => None,
        }
    }
}

/// Handle to an opened generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationHandle {
    pub name: String,
    pub purpose: Purpose,
}

/// Entry count of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStats {
    pub name: String,
    pub purpose: Purpose,
    pub entries: u64,
    pub created_at: String,
}

fn parse_purpose(raw: &str) -> Result<Purpose, Error> {
    Purpose::parse(raw).ok_or_else(|| Error::Serialization(format!("unknown generation purpose: {raw}")))
}

impl CacheDb {
    /// Open a generation, creating it if it doesn't exist.
    ///
    /// Idempotent: a second call with the same name returns the existing
    /// generation unchanged, with the purpose it was created with.
    pub async fn ensure_generation(&self, name: &str, purpose: Purpose) -> Result<GenerationHandle, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("generation name cannot be empty".into()));
        }
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<GenerationHandle, Error> {
                conn.execute(
                    "INSERT INTO generations (name, purpose, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, purpose.as_str(), created_at],
                )?;
                let stored: String =
                    conn.query_row("SELECT purpose FROM generations WHERE name = ?1", params![name], |row| row.get(0))?;
                let purpose = parse_purpose(&stored)?;
                Ok(GenerationHandle { name, purpose })
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an existing generation without creating it.
    pub async fn generation(&self, name: &str) -> Result<Option<GenerationHandle>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<GenerationHandle>, Error> {
                let result =
                    conn.query_row("SELECT purpose FROM generations WHERE name = ?1", params![name], |row| {
                        row.get::<_, String>(0)
                    });
                match result {
                    Ok(raw) => {
                        let purpose = parse_purpose(&raw)?;
                        Ok(Some(GenerationHandle { name, purpose }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every known generation, oldest first.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every generation with its entry count.
    pub async fn generation_stats(&self) -> Result<Vec<GenerationStats>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationStats>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.purpose, g.created_at, COUNT(e.key_hash)
                     FROM generations g LEFT JOIN entries e ON e.generation = g.name
                     GROUP BY g.name ORDER BY g.created_at ASC, g.name ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(name, purpose, created_at, entries)| {
                        let purpose = parse_purpose(&purpose)?;
                        Ok(GenerationStats { name, purpose, entries: entries as u64, created_at })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one generation and all of its entries.
    ///
    /// Returns false if the generation did not exist.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation whose name is not in `keep`.
    ///
    /// Runs as a single transaction on the connection thread, so no lookup
    /// can observe a half-evicted registry. Returns the deleted names.
    pub async fn evict_except(&self, keep: &[String]) -> Result<Vec<String>, Error> {
        let keep = keep.to_vec();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let tx = conn.transaction()?;
                let names = {
                    let mut stmt = tx.prepare("SELECT name FROM generations ORDER BY name ASC")?;
                    let names = stmt
                        .query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<String>, _>>()?;
                    names
                };

                let mut deleted = Vec::new();
                for name in names {
                    if keep.contains(&name) {
                        continue;
                    }
                    tx.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                    deleted.push(name);
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let first = db.ensure_generation("dashboard-shell-v1", Purpose::Shell).await.unwrap();
        let second = db.ensure_generation("dashboard-shell-v1", Purpose::Shell).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(db.generation_names().await.unwrap(), vec!["dashboard-shell-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_ensure_keeps_original_purpose() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_generation("shared", Purpose::Shell).await.unwrap();
        let reopened = db.ensure_generation("shared", Purpose::Dynamic).await.unwrap();
        assert_eq!(reopened.purpose, Purpose::Shell);
    }

    #[tokio::test]
    async fn test_ensure_rejects_empty_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.ensure_generation("  ", Purpose::Shell).await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_generation_lookup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.generation("dashboard-dynamic-v1").await.unwrap().is_none());

        db.ensure_generation("dashboard-dynamic-v1", Purpose::Dynamic).await.unwrap();
        let handle = db.generation("dashboard-dynamic-v1").await.unwrap().unwrap();
        assert_eq!(handle.purpose, Purpose::Dynamic);
    }

    #[tokio::test]
    async fn test_evict_except_keeps_only_current() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["dashboard-shell-v1", "dashboard-dynamic-v1", "dashboard-shell-v2", "dashboard-dynamic-v2"] {
            db.ensure_generation(name, Purpose::Shell).await.unwrap();
        }

        let keep = vec!["dashboard-shell-v2".to_string(), "dashboard-dynamic-v2".to_string()];
        let deleted = db.evict_except(&keep).await.unwrap();

        assert_eq!(deleted, vec!["dashboard-dynamic-v1".to_string(), "dashboard-shell-v1".to_string()]);
        let mut remaining = db.generation_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["dashboard-dynamic-v2".to_string(), "dashboard-shell-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_generation("old", Purpose::Dynamic).await.unwrap();
        assert!(db.delete_generation("old").await.unwrap());
        assert!(!db.delete_generation("old").await.unwrap());
    }

    #[test]
    fn test_purpose_names() {
        for purpose in Purpose::ALL {
            assert_eq!(Purpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(Purpose::parse("search"), None);
    }
}
