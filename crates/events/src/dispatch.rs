//! Background dispatchers that deliver event side effects.
//!
//! Each dispatcher owns one bus subscription and one collaborator. A failure
//! is retried per [`RetryPolicy`] and then logged; it never reaches the
//! request that published the event. Both loops exit when the
//! [`EventBus`](crate::bus::EventBus) is dropped.

use std::sync::Arc;

use estate_core::ports::{AuditSink, Notifier};
use tokio::sync::broadcast;

use crate::bus::{CatalogEvent, Recipient};
use crate::retry::RetryPolicy;

/// Delivers audit records to the audit collaborator.
pub struct AuditDispatcher;

impl AuditDispatcher {
    pub async fn run(
        sink: Arc<dyn AuditSink>,
        mut receiver: broadcast::Receiver<CatalogEvent>,
        policy: RetryPolicy,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(record) = &event.audit else {
                        continue;
                    };
                    if let Err(e) = policy.run("audit", || sink.record(record)).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            listing_id = event.listing_id,
                            action = %record.action,
                            "Failed to record audit entry"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Audit dispatcher lagged, entries were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, audit dispatcher shutting down");
                    break;
                }
            }
        }
    }
}

/// Delivers notifications to a single user or to all administrators.
pub struct NotificationDispatcher;

impl NotificationDispatcher {
    pub async fn run(
        notifier: Arc<dyn Notifier>,
        mut receiver: broadcast::Receiver<CatalogEvent>,
        policy: RetryPolicy,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(target) = &event.notification else {
                        continue;
                    };
                    let message = &target.message;
                    let result = match target.recipient {
                        Recipient::User(user_id) => {
                            policy
                                .run("notify_user", || notifier.notify_user(user_id, message))
                                .await
                        }
                        Recipient::Admins => {
                            policy
                                .run("notify_admins", || notifier.notify_admins(message))
                                .await
                        }
                    };
                    if let Err(e) = result {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            listing_id = event.listing_id,
                            kind = %message.kind,
                            "Failed to deliver notification"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Notification dispatcher lagged, notifications were dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
    }
}
