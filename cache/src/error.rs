use request_context::Interrupted;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("cache backend :: {0}")]
    Backend(String),

    #[error("cache call timed out")]
    Timeout,

    #[error("cache call cancelled")]
    Cancelled,

    #[error("{0}")]
    Codec(#[from] CodecError),
}

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("encode cache payload :: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("decode cache payload :: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("unexpected cache payload shape :: expected {expected} :: found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cache payload shape not registered :: {0}")]
    UnregisteredShape(&'static str),
}

impl From<Interrupted> for CacheError {
    fn from(value: Interrupted) -> Self {
        match value {
            Interrupted::Cancelled => CacheError::Cancelled,
            Interrupted::DeadlineExceeded => CacheError::Timeout,
        }
    }
}
