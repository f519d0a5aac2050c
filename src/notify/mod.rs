//! User-facing transaction notifications
//!
//! A notification is a single mutable status indicator (a toast in a UI). The
//! sender creates one per submission and drives it to a terminal state.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Opaque handle to a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Pending,
    Success,
    Error,
    Warning,
}

impl Variant {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Variant::Pending)
    }
}

/// What a notification currently shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub description: String,
    pub variant: Variant,
    /// Icon key; `None` lets the renderer pick one from the variant
    pub icon: Option<String>,
    /// Explorer link the notification opens when clicked
    pub link: Option<String>,
    /// `None` keeps the notification until it is updated or closed
    pub auto_close: Option<Duration>,
}

impl Notification {
    pub fn pending(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            variant: Variant::Pending,
            icon: None,
            link: None,
            auto_close: None,
        }
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::pending(description).with_variant(Variant::Success)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::pending(description).with_variant(Variant::Error)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::pending(description).with_variant(Variant::Warning)
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn auto_close(mut self, after: Duration) -> Self {
        self.auto_close = Some(after);
        self
    }
}

/// Where notifications are rendered
pub trait NotificationSink: Send + Sync {
    fn create(&self, notification: Notification) -> NotificationId;

    fn update(&self, id: NotificationId, notification: Notification);

    /// Remove the notification without showing a result
    fn close(&self, id: NotificationId);
}

/// Renders notifications as log lines, for headless use
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    fn emit(&self, id: NotificationId, notification: &Notification) {
        let link = notification.link.as_deref().unwrap_or("-");
        let icon = notification.icon.as_deref().unwrap_or("-");
        match notification.variant {
            Variant::Pending | Variant::Success => info!(
                notification = %id,
                variant = ?notification.variant,
                icon,
                link,
                "{}",
                notification.description
            ),
            Variant::Warning => {
                warn!(notification = %id, icon, link, "{}", notification.description)
            }
            Variant::Error => {
                error!(notification = %id, icon, link, "{}", notification.description)
            }
        }
    }
}

impl NotificationSink for LogNotifier {
    fn create(&self, notification: Notification) -> NotificationId {
        let id = NotificationId::new();
        self.emit(id, &notification);
        id
    }

    fn update(&self, id: NotificationId, notification: Notification) {
        self.emit(id, &notification);
    }

    fn close(&self, id: NotificationId) {
        info!(notification = %id, "Dismissed");
    }
}
