use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::schema::Database;

/// Persistent key-value store for session credentials.
///
/// Keys are short identifiers such as `userToken`. Values are opaque strings.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns `None` when the key has never been set or was removed.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite the value for `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

impl Database {
    // ========================================================================
    // Credential Operations
    // ========================================================================

    pub async fn get_credential(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM credentials WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Set a credential value (UPSERT).
    pub async fn set_credential(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credentials (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_credential(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM credentials WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_credential(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_credential(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.remove_credential(key).await
    }
}

/// Process-local credential store, for tests and one-shot commands that must
/// not touch disk.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }
}
