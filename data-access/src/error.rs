use cache::CacheError;
use model::EntityKey;

#[derive(thiserror::Error, Debug)]
pub enum DataAccessError {
    #[error("idiom not found :: {0}")]
    IdiomNotFound(i64),

    #[error("implementation not found :: {0}")]
    ImplementationNotFound(i64),

    #[error("idiom version not found :: idiom {idiom_id} :: version {version}")]
    VersionNotFound { idiom_id: i64, version: i32 },

    #[error("message not found :: {0}")]
    MessageNotFound(EntityKey),

    #[error("conflict :: {0}")]
    Conflict(String),

    #[error("database :: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization :: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp :: {0}")]
    Timestamp(#[from] time::error::ComponentRange),

    #[error("cache unavailable :: {0}")]
    CacheUnavailable(#[from] CacheError),
}

impl DataAccessError {
    /// `true` for the "entity does not exist" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DataAccessError::IdiomNotFound(_)
                | DataAccessError::ImplementationNotFound(_)
                | DataAccessError::VersionNotFound { .. }
                | DataAccessError::MessageNotFound(_)
        )
    }
}
