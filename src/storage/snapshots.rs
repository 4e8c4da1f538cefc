use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::schema::Database;
use super::types::{DatabaseError, SnapshotInfo};
use crate::collection::CollectionSnapshot;

impl Database {
    // ========================================================================
    // Collection Snapshot Operations
    // ========================================================================

    /// Store the snapshot of a listing, replacing any previous one.
    ///
    /// The items are stored as a JSON payload; page counters are mirrored into
    /// their own columns so [`snapshot_info`](Self::snapshot_info) does not
    /// need to decode the payload.
    pub async fn save_snapshot<T: Serialize>(
        &self,
        list_id: &str,
        snapshot: &CollectionSnapshot<T>,
    ) -> Result<()> {
        let payload = serde_json::to_string(snapshot).map_err(DatabaseError::Serialization)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO collection_snapshots
                (list_id, payload, current_page, total_pages, saved_at)
            VALUES (?, ?, ?, ?, datetime('now'))
        "#,
        )
        .bind(list_id)
        .bind(&payload)
        .bind(i64::from(snapshot.current_page))
        .bind(i64::from(snapshot.total_pages))
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            list_id,
            items = snapshot.items.len(),
            current_page = snapshot.current_page,
            bytes = payload.len(),
            "Saved collection snapshot"
        );
        Ok(())
    }

    /// Load the stored snapshot of a listing.
    ///
    /// A payload that no longer decodes (older format, manual edits) is
    /// deleted and reported as absent.
    pub async fn load_snapshot<T: DeserializeOwned>(
        &self,
        list_id: &str,
    ) -> Result<Option<CollectionSnapshot<T>>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM collection_snapshots WHERE list_id = ?")
                .bind(list_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some((payload,)) = row else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(list_id, error = %e, "Discarding unreadable collection snapshot");
                self.delete_snapshot(list_id).await?;
                Ok(None)
            }
        }
    }

    /// Metadata of every stored snapshot, ordered by list id.
    pub async fn snapshot_info(&self) -> Result<Vec<SnapshotInfo>> {
        let rows: Vec<(String, i64, i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT list_id,
                   COALESCE(json_array_length(payload, '$.items'), 0),
                   current_page, total_pages, saved_at
            FROM collection_snapshots
            ORDER BY list_id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(list_id, item_count, current_page, total_pages, saved_at)| SnapshotInfo {
                    list_id,
                    item_count: item_count.max(0) as usize,
                    current_page: current_page.clamp(0, i64::from(u32::MAX)) as u32,
                    total_pages: total_pages.clamp(0, i64::from(u32::MAX)) as u32,
                    saved_at,
                },
            )
            .collect())
    }

    pub async fn delete_snapshot(&self, list_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM collection_snapshots WHERE list_id = ?")
            .bind(list_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete all stored snapshots.
    ///
    /// # Returns
    ///
    /// The number of snapshots removed.
    pub async fn clear_snapshots(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM collection_snapshots")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
