use std::path::Path;

use redis::aio::ConnectionManager;
use redis::Commands;

use crate::error::StorageError;

/// Remote artifact storage: uploads one local file and returns the
/// identifier it can later be fetched by.
pub trait ArtifactStorage: Send + Sync {
    fn insert(
        &self,
        bucket: &str,
        remote_name: &str,
        local_path: &Path,
    ) -> Result<String, StorageError>;
}

/// Stores artifact bytes in Redis under `<bucket>/<remote_name>`.
///
/// Uses a fresh blocking connection per upload; uploads only happen once
/// the sweep has finished, so there is nothing to amortise.
pub struct RedisArtifactStorage {
    client: redis::Client,
}

impl RedisArtifactStorage {
    pub fn open(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(|e| StorageError::Rejected {
            remote_name: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { client })
    }

    /// Round-trips a PING through an auto-reconnecting async connection so
    /// a bad URL or a stopped server shows up at startup, not at upload.
    pub async fn ping(&self) -> Result<(), StorageError> {
        let mut conn = ConnectionManager::new(self.client.clone())
            .await
            .map_err(|e| classify("PING", e))?;
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(|e| classify("PING", e))?;
        Ok(())
    }
}

impl ArtifactStorage for RedisArtifactStorage {
    fn insert(
        &self,
        bucket: &str,
        remote_name: &str,
        local_path: &Path,
    ) -> Result<String, StorageError> {
        let bytes = std::fs::read(local_path).map_err(|e| {
            StorageError::Transient(format!("{}: {e}", local_path.display()))
        })?;

        let key = format!("{bucket}/{remote_name}");
        let mut conn = self.client.get_connection().map_err(|e| classify(&key, e))?;
        conn.set::<_, _, ()>(&key, bytes)
            .map_err(|e| classify(&key, e))?;

        Ok(format!("redis://{key}"))
    }
}

/// Connection trouble is worth retrying; anything the server refused for
/// `key` is not.
fn classify(key: &str, e: redis::RedisError) -> StorageError {
    if e.is_io_error()
        || e.is_timeout()
        || e.is_connection_dropped()
        || e.is_connection_refusal()
    {
        StorageError::Transient(e.to_string())
    } else {
        StorageError::Rejected {
            remote_name: key.to_string(),
            message: e.to_string(),
        }
    }
}
