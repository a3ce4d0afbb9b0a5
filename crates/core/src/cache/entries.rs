//! Stored response snapshots: put, match, delete.
//!
//! A snapshot is an immutable capture of a response's status, headers and
//! body at the moment it was stored. `put` overwrites by key, so concurrent
//! writers of the same URL resolve to whichever statement ran last.

use super::connection::CacheDb;
use super::generations::GenerationHandle;
use super::hash::compute_entry_key;
use crate::Error;
use crate::http::{Headers, Response, ResponseSource, ResponseType};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Which eligibility rule a `put` is held to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Runtime strategies: only 200 responses of type `basic`.
    Strategy,
    /// Install-time bulk population: additionally accepts opaque responses,
    /// whose status cannot be inspected, and 200 CORS responses.
    BulkInstall,
}

impl PutMode {
    /// Whether a response may be stored under this mode.
    pub fn accepts(self, response: &Response) -> bool {
        match (self, response.response_type) {
            (_, ResponseType::Synthetic) => false,
            (PutMode::Strategy, ResponseType::Basic) => response.status == 200,
            (PutMode::Strategy, _) => false,
            (PutMode::BulkInstall, ResponseType::Opaque) => true,
            (PutMode::BulkInstall, _) => response.status == 200,
        }
    }
}

/// A response snapshot as stored in a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredResponse {
    pub generation: String,
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredResponse {
    /// Rebuild a response served from cache.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(self.status, self.status_text, self.response_type, self.body)
            .with_source(ResponseSource::Cache);
        response.headers = self.headers;
        response
    }
}

const SELECT_COLUMNS: &str =
    "generation, url, status, status_text, response_type, headers_json, body, stored_at FROM entries";

fn row_to_stored(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredResponse, String, String)> {
    let stored = StoredResponse {
        generation: row.get(0)?,
        url: row.get(1)?,
        status: row.get(2)?,
        status_text: row.get(3)?,
        response_type: ResponseType::Basic,
        headers: Headers::new(),
        body: row.get(6)?,
        stored_at: row.get(7)?,
    };
    Ok((stored, row.get(4)?, row.get(5)?))
}

/// Decode the text columns that `row_to_stored` leaves raw.
fn finish_stored(raw: (StoredResponse, String, String)) -> Result<StoredResponse, Error> {
    let (mut stored, response_type, headers_json) = raw;
    stored.response_type = ResponseType::parse(&response_type)
        .ok_or_else(|| Error::Serialization(format!("unknown response type: {response_type}")))?;
    stored.headers = serde_json::from_str(&headers_json)?;
    Ok(stored)
}

impl CacheDb {
    /// Store a response under `key` in `generation`.
    ///
    /// Returns `Ok(false)` without writing when the response is not eligible
    /// under `mode`. An existing entry for the key is overwritten.
    pub async fn put_entry(
        &self, generation: &GenerationHandle, key: &str, response: Response, mode: PutMode,
    ) -> Result<bool, Error> {
        if !mode.accepts(&response) {
            tracing::debug!(
                key,
                status = response.status,
                response_type = response.response_type.as_str(),
                "response not eligible for caching"
            );
            return Ok(false);
        }

        let key_hash = compute_entry_key(&generation.name, key);
        let generation = generation.name.clone();
        let url = key.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let status = response.status;
        let status_text = response.status_text.clone();
        let response_type = response.response_type.as_str();
        let body = response.into_body().to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        key_hash, generation, url, status, status_text, response_type,
                        headers_json, body, stored_at, write_seq
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                              (SELECT COALESCE(MAX(write_seq), 0) + 1 FROM entries))
                    ON CONFLICT(key_hash) DO UPDATE SET
                        status = excluded.status,
                        status_text = excluded.status_text,
                        response_type = excluded.response_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at,
                        write_seq = excluded.write_seq",
                    params![
                        key_hash,
                        generation,
                        url,
                        status,
                        status_text,
                        response_type,
                        headers_json,
                        body,
                        stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(true)
    }

    /// Look up `key` in one generation.
    pub async fn match_entry(
        &self, generation: &GenerationHandle, key: &str,
    ) -> Result<Option<StoredResponse>, Error> {
        let key_hash = compute_entry_key(&generation.name, key);
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let sql = format!("SELECT {SELECT_COLUMNS} WHERE key_hash = ?1");
                match conn.query_row(&sql, params![key_hash], row_to_stored) {
                    Ok(raw) => Ok(Some(finish_stored(raw)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` across every known generation.
    ///
    /// When several generations hold the key, the most recent write wins.
    pub async fn match_any(&self, key: &str) -> Result<Option<StoredResponse>, Error> {
        let url = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredResponse>, Error> {
                let sql = format!("SELECT {SELECT_COLUMNS} WHERE url = ?1 ORDER BY write_seq DESC LIMIT 1");
                match conn.query_row(&sql, params![url], row_to_stored) {
                    Ok(raw) => Ok(Some(finish_stored(raw)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it did not exist.
    pub async fn delete_entry(&self, generation: &GenerationHandle, key: &str) -> Result<bool, Error> {
        let key_hash = compute_entry_key(&generation.name, key);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE key_hash = ?1", params![key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Keys (request URLs) stored in a generation, sorted.
    pub async fn entry_keys(&self, generation: &GenerationHandle) -> Result<Vec<String>, Error> {
        let name = generation.name.clone();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE generation = ?1 ORDER BY url ASC")?;
                let keys = stmt
                    .query_map(params![name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}
