//! Partition CRUD operations and the storage-provider seam.
//!
//! A partition is a named, durable key → response store. The resolution
//! engine never talks to SQLite directly; it holds a `dyn CacheStorage`,
//! which keeps the engine free of global state and lets tests inject fakes.

use async_trait::async_trait;
use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use crate::Error;
use crate::resource::{CapturedResponse, ResponseKind};

/// A response captured into a partition, keyed by request identity.
///
/// Immutable once stored; a later put for the same key fully replaces it.
#[derive(Debug, Clone)]
pub struct CachedResource {
    pub key: String,
    pub url: String,
    pub method: String,
    pub status: u16,
    pub kind: ResponseKind,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub stored_at: String,
}

impl CachedResource {
    /// Capture a response under the given request identity.
    ///
    /// Takes the response by value: the caller clones first if it still
    /// needs to hand the original to a consumer.
    pub fn capture(key: String, url: &Url, method: &str, response: CapturedResponse) -> Self {
        Self {
            key,
            url: url.to_string(),
            method: method.to_string(),
            status: response.status,
            kind: response.kind,
            headers: response.headers,
            body: response.body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rehydrate the stored entry as a servable response.
    pub fn into_response(self) -> CapturedResponse {
        CapturedResponse { status: self.status, kind: self.kind, headers: self.headers, body: self.body }
    }
}

/// Storage provider for named cache partitions.
///
/// Contract (the engine and generation manager rely on all of these):
/// - `open_partition` is idempotent; opening an existing name is a no-op.
/// - `put` into an existing partition overwrites on key collision and never
///   disturbs other keys (merge, not replace).
/// - `delete_partition` removes the partition and all entries atomically.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if absent.
    async fn open_partition(&self, name: &str) -> Result<(), Error>;

    /// Names of every existing partition.
    async fn partition_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and its entries. Returns whether it existed.
    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;

    /// Insert or overwrite one entry.
    async fn put(&self, partition: &str, entry: CachedResource) -> Result<(), Error>;

    /// Look up one entry by request identity.
    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedResource>, Error>;

    /// All entry keys in a partition.
    async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open_partition(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                // single statement; cascading entry deletes run in the same
                // implicit transaction
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, partition: &str, entry: CachedResource) -> Result<(), Error> {
        let partition = partition.to_string();
        let headers_json = serde_json::to_string(&entry.headers)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        partition, key, url, method, status, kind,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(partition, key) DO UPDATE SET
                        url = excluded.url,
                        method = excluded.method,
                        status = excluded.status,
                        kind = excluded.kind,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        partition,
                        entry.key,
                        entry.url,
                        entry.method,
                        entry.status as i64,
                        entry.kind.as_str(),
                        headers_json,
                        entry.body.as_ref(),
                        entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedResource>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedResource>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, url, method, status, kind, headers_json, body, stored_at
                     FROM entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Vec<u8>>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                });

                match result {
                    Ok((key, url, method, status, kind, headers_json, body, stored_at)) => {
                        let kind = ResponseKind::parse(&kind)
                            .ok_or_else(|| Error::MalformedEntry(format!("unknown response kind: {kind}")))?;
                        let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                        Ok(Some(CachedResource {
                            key,
                            url,
                            method,
                            status: status as u16,
                            kind,
                            headers,
                            body: Bytes::from(body),
                            stored_at,
                        }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_keys(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE partition = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(params![partition], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::identity_key;

    fn make_entry(url: &str, body: &str) -> CachedResource {
        let parsed = Url::parse(url).unwrap();
        let response = CapturedResponse {
            status: 200,
            kind: ResponseKind::Basic,
            headers: vec![("Content-Type".to_string(), "text/html".to_string())],
            body: Bytes::copy_from_slice(body.as_bytes()),
        };
        CachedResource::capture(identity_key("GET", parsed.as_str()), &parsed, "GET", response)
    }

    #[tokio::test]
    async fn test_open_partition_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();
        db.open_partition("static-v1").await.unwrap();

        let names = db.partition_names().await.unwrap();
        assert_eq!(names, vec!["static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();

        let entry = make_entry("https://example.com/", "<html>shell</html>");
        let key = entry.key.clone();
        db.put("static-v1", entry).await.unwrap();

        let stored = db.get("static-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.url, "https://example.com/");
        assert_eq!(stored.status, 200);
        assert_eq!(stored.kind, ResponseKind::Basic);
        assert_eq!(stored.body.as_ref(), b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();
        let result = db.get("static-v1", "nonexistent").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_on_key_collision() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("dynamic-v1").await.unwrap();

        let first = make_entry("https://example.com/app.js", "v1()");
        let key = first.key.clone();
        db.put("dynamic-v1", first).await.unwrap();
        db.put("dynamic-v1", make_entry("https://example.com/app.js", "v2()"))
            .await
            .unwrap();

        let stored = db.get("dynamic-v1", &key).await.unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), b"v2()");

        let keys = db.entry_keys("dynamic-v1").await.unwrap();
        assert_eq!(keys.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_partition_removes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();

        let entry = make_entry("https://example.com/", "<html></html>");
        let key = entry.key.clone();
        db.put("static-v1", entry).await.unwrap();

        let existed = db.delete_partition("static-v1").await.unwrap();
        assert!(existed);
        assert!(db.partition_names().await.unwrap().is_empty());

        // recreate: old entries must not resurface
        db.open_partition("static-v1").await.unwrap();
        assert!(db.get("static-v1", &key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let existed = db.delete_partition("static-v0").await.unwrap();
        assert!(!existed);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("static-v1").await.unwrap();
        db.open_partition("dynamic-v1").await.unwrap();

        let entry = make_entry("https://example.com/a.css", "body{}");
        let key = entry.key.clone();
        db.put("static-v1", entry).await.unwrap();

        assert!(db.get("static-v1", &key).await.unwrap().is_some());
        assert!(db.get("dynamic-v1", &key).await.unwrap().is_none());
    }
}
