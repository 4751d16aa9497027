//! # Notification Dispatcher
//!
//! Turns domain events into persisted notifications and owns the
//! read/delete surface.
//!
//! ## Fan-out
//! One event produces one notification row per resolved recipient:
//! `Audience::User` is a single row, `Audience::Staff` and
//! `Audience::Admins` fan out through the [`StaffDirectory`].
//!
//! ## Bulk Operations
//! `bulk_mark_read` and `bulk_delete` are per-id: one bad id does not
//! abort the rest, and the outcome reports both sides.

use chrono::Utc;
use tracing::{debug, info};

use apotheca_core::{Notification, NotificationKind};
use apotheca_db::repository::notification::generate_notification_id;
use apotheca_db::{Database, NotificationFilter};

use crate::context::StaffDirectory;
use crate::error::{EngineError, EngineResult};
use crate::events::{Audience, DomainEvent};

/// Result of a bulk notification operation.
#[derive(Debug, Clone, Default)]
pub struct BulkOutcome {
    /// Ids that were updated/deleted.
    pub succeeded: Vec<String>,
    /// Ids that did not exist.
    pub missing: Vec<String>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Persists and manages notifications.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    db: Database,
    staff: StaffDirectory,
}

impl NotificationDispatcher {
    pub fn new(db: Database, staff: StaffDirectory) -> Self {
        NotificationDispatcher { db, staff }
    }

    /// Resolves the event's audience to concrete recipient ids.
    fn recipients(&self, event: &DomainEvent) -> Vec<String> {
        match event.audience() {
            Audience::User(id) => vec![id],
            Audience::Staff => self.staff.staff(),
            Audience::Admins => self.staff.admin_recipients(),
        }
    }

    /// Dispatches a domain event: one persisted notification per
    /// recipient. Returns the created rows.
    pub async fn dispatch(&self, event: &DomainEvent) -> EngineResult<Vec<Notification>> {
        let recipients = self.recipients(event);
        debug!(
            kind = event.kind().as_str(),
            recipients = recipients.len(),
            "Dispatching event"
        );

        let repo = self.db.notifications();
        let mut created = Vec::with_capacity(recipients.len());
        for recipient_id in recipients {
            let notification = Notification {
                id: generate_notification_id(),
                recipient_id,
                kind: event.kind(),
                priority: event.priority(),
                title: event.title(),
                message: event.message(),
                is_read: false,
                created_at: Utc::now(),
            };
            repo.insert(&notification).await?;
            created.push(notification);
        }

        info!(
            kind = event.kind().as_str(),
            count = created.len(),
            "Event dispatched"
        );
        Ok(created)
    }

    /// Marks a notification read. Idempotent for already-read rows;
    /// a missing id is `NotFound`.
    pub async fn mark_read(&self, id: &str) -> EngineResult<()> {
        if self.db.notifications().mark_read(id).await? {
            Ok(())
        } else {
            Err(EngineError::not_found("Notification", id))
        }
    }

    /// Marks the newest unread notification of `kind` matching `keyword`
    /// (case-insensitive, title or message) as read. No match is a
    /// silent no-op; returns whether a row was marked.
    pub async fn mark_read_by_content(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        keyword: &str,
    ) -> EngineResult<bool> {
        Ok(self
            .db
            .notifications()
            .mark_read_by_content(recipient_id, kind, keyword)
            .await?)
    }

    /// Lists a user's notifications, newest first.
    pub async fn list_for_user(
        &self,
        recipient_id: &str,
        filter: NotificationFilter,
    ) -> EngineResult<Vec<Notification>> {
        Ok(self.db.notifications().list_for_user(recipient_id, filter).await?)
    }

    /// Unread badge counter.
    pub async fn count_unread(&self, recipient_id: &str) -> EngineResult<i64> {
        Ok(self.db.notifications().count_unread(recipient_id).await?)
    }

    /// Marks many notifications read. Partial success: missing ids are
    /// reported, not fatal.
    pub async fn bulk_mark_read(&self, ids: &[String]) -> EngineResult<BulkOutcome> {
        let repo = self.db.notifications();
        let mut outcome = BulkOutcome::default();
        for id in ids {
            if repo.mark_read(id).await? {
                outcome.succeeded.push(id.clone());
            } else {
                outcome.missing.push(id.clone());
            }
        }
        Ok(outcome)
    }

    /// Deletes many notifications. Partial success, as above.
    pub async fn bulk_delete(&self, ids: &[String]) -> EngineResult<BulkOutcome> {
        let repo = self.db.notifications();
        let mut outcome = BulkOutcome::default();
        for id in ids {
            if repo.delete(id).await? {
                outcome.succeeded.push(id.clone());
            } else {
                outcome.missing.push(id.clone());
            }
        }
        Ok(outcome)
    }
}
