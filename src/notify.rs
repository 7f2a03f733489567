//! Outbound notification hook. Delivery is best effort: the message is
//! logged and the caller never waits on or fails because of it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use strum_macros::Display;
use tracing::info;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    RoleChanged,
    ComplaintUpdated,
    BookingReviewed,
    AttendanceMarked,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub to: u64,
    pub subject: String,
    pub message: String,
    pub kind: NotificationKind,
}

#[derive(Default)]
pub struct Notifier {
    sent: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&self, notification: Notification) {
        info!(
            to = notification.to,
            kind = %notification.kind,
            subject = %notification.subject,
            message = %notification.message,
            sent_at = %Utc::now(),
            "Notification logged"
        );
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }
}
