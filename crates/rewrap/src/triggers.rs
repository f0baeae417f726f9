//! What starts a pass.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The source of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// A periodic timer fired.
    Timer,
    /// A push notification announced pending work.
    Notification,
    /// An operator asked for a pass.
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Timer => write!(f, "timer"),
            Trigger::Notification => write!(f, "notification"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// A push notification from the directory's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub ip_address: Option<String>,
}

impl NotificationEvent {
    /// The event name announcing a device that waits for approval.
    pub const DEVICE_APPROVAL_REQUEST: &'static str = "request_device_admin_approval";

    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            email: None,
            ip_address: None,
        }
    }

    /// Parse a notification payload.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Whether this event should start a device pass. The name is matched
    /// case-insensitively.
    pub fn is_device_approval_request(&self) -> bool {
        self.event
            .eq_ignore_ascii_case(Self::DEVICE_APPROVAL_REQUEST)
    }
}
