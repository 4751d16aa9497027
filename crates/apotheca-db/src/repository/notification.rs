//! # Notification Repository
//!
//! Database operations for persisted notifications.
//!
//! ## Read Tracking
//! `mark_read` is idempotent by construction: the UPDATE sets
//! `is_read = 1` unconditionally, so a second call is a no-op that still
//! reports the row as found.
//!
//! `mark_read_by_content` resolves an ephemeral toast dismissal back to
//! its persisted record without the UI holding a notification id: it
//! marks the newest unread notification of the given kind whose title or
//! message contains the keyword (case-insensitive).

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use apotheca_core::{Notification, NotificationKind, Priority};

const NOTIFICATION_COLS: &str =
    "id, recipient_id, kind, priority, title, message, is_read, created_at";

/// Filters for listing a user's notifications. `None` means "any".
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    pub kind: Option<NotificationKind>,
    pub priority: Option<Priority>,
    pub unread_only: bool,
}

/// Repository for notification database operations.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Creates a new NotificationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        NotificationRepository { pool }
    }

    /// Gets a notification by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLS} FROM notifications WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Persists a notification.
    pub async fn insert(&self, notification: &Notification) -> DbResult<()> {
        debug!(
            id = %notification.id,
            recipient = %notification.recipient_id,
            kind = notification.kind.as_str(),
            "Inserting notification"
        );

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, recipient_id, kind, priority, title, message, is_read, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.recipient_id)
        .bind(notification.kind)
        .bind(notification.priority)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks a notification as read. Idempotent; returns whether the id
    /// exists.
    pub async fn mark_read(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks the newest unread notification of `kind` for `recipient_id`
    /// whose title or message contains `keyword` (case-insensitive) as
    /// read. Returns whether a match was found; no match is not an error.
    pub async fn mark_read_by_content(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        keyword: &str,
    ) -> DbResult<bool> {
        let pattern = format!("%{}%", keyword.to_lowercase());

        let result = sqlx::query(
            r#"
            UPDATE notifications SET is_read = 1
            WHERE id = (
                SELECT id FROM notifications
                WHERE recipient_id = ?1
                  AND kind = ?2
                  AND is_read = 0
                  AND (LOWER(title) LIKE ?3 OR LOWER(message) LIKE ?3)
                ORDER BY created_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(recipient_id)
        .bind(kind)
        .bind(&pattern)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lists a user's notifications, newest first, with optional
    /// kind/priority/read-state filters.
    pub async fn list_for_user(
        &self,
        recipient_id: &str,
        filter: NotificationFilter,
    ) -> DbResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLS} FROM notifications
            WHERE recipient_id = ?1
              AND (?2 IS NULL OR kind = ?2)
              AND (?3 IS NULL OR priority = ?3)
              AND (?4 = 0 OR is_read = 0)
            ORDER BY created_at DESC
            "#
        ))
        .bind(recipient_id)
        .bind(filter.kind)
        .bind(filter.priority)
        .bind(filter.unread_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Deletes a notification. Returns whether the id existed.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Counts a user's unread notifications (badge counter).
    pub async fn count_unread(&self, recipient_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Helper to generate a new notification ID.
pub fn generate_notification_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;

    fn notification(id: &str, recipient: &str, kind: NotificationKind, title: &str) -> Notification {
        Notification {
            id: id.to_string(),
            recipient_id: recipient.to_string(),
            kind,
            priority: Priority::Medium,
            title: title.to_string(),
            message: format!("{title} message body"),
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_mark_read_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.notifications();
        repo.insert(&notification("n1", "u1", NotificationKind::SystemAlert, "Alert"))
            .await
            .unwrap();

        assert!(repo.mark_read("n1").await.unwrap());
        assert!(repo.mark_read("n1").await.unwrap()); // second call, no error

        let stored = repo.get_by_id("n1").await.unwrap().unwrap();
        assert!(stored.is_read);

        assert!(!repo.mark_read("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_read_by_content_picks_newest_unread() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.notifications();

        let mut older = notification("n1", "u1", NotificationKind::LowStock, "Low stock: Aspirin");
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        repo.insert(&older).await.unwrap();
        repo.insert(&notification("n2", "u1", NotificationKind::LowStock, "Low stock: Aspirin"))
            .await
            .unwrap();

        // Case-insensitive substring match resolves to the newest unread.
        assert!(repo
            .mark_read_by_content("u1", NotificationKind::LowStock, "ASPIRIN")
            .await
            .unwrap());
        assert!(repo.get_by_id("n2").await.unwrap().unwrap().is_read);
        assert!(!repo.get_by_id("n1").await.unwrap().unwrap().is_read);

        // No match: silent no-op.
        assert!(!repo
            .mark_read_by_content("u1", NotificationKind::LowStock, "ibuprofen")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.notifications();

        repo.insert(&notification("n1", "u1", NotificationKind::LowStock, "Low stock"))
            .await
            .unwrap();
        let mut critical = notification("n2", "u1", NotificationKind::ExpiryAlert, "Expired batch");
        critical.priority = Priority::Critical;
        repo.insert(&critical).await.unwrap();
        repo.insert(&notification("n3", "u2", NotificationKind::LowStock, "Other user"))
            .await
            .unwrap();

        let all = repo.list_for_user("u1", NotificationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let low_stock_only = repo
            .list_for_user(
                "u1",
                NotificationFilter {
                    kind: Some(NotificationKind::LowStock),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(low_stock_only.len(), 1);
        assert_eq!(low_stock_only[0].id, "n1");

        repo.mark_read("n1").await.unwrap();
        let unread = repo
            .list_for_user(
                "u1",
                NotificationFilter {
                    unread_only: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, "n2");
    }
}
