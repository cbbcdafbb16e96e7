use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A notification shown to one user until they dismiss it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageForUser {
    pub username: String,
    pub message: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp::option")]
    pub dismissed_at: Option<OffsetDateTime>,
}

impl MessageForUser {
    pub fn new(username: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            message: message.into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            dismissed_at: None,
        }
    }

    #[inline]
    pub fn is_dismissed(&self) -> bool {
        self.dismissed_at.is_some()
    }
}
