mod accessor;
mod cached;
mod error;
mod keys;
mod payload;
mod policy;
mod sqlite;

pub use accessor::DataAccessor;
pub use cached::CachedDataAccess;
pub use error::DataAccessError;
pub use keys::{CacheKey, idiom_fanout};
pub use payload::{Cacheable, CachedValue, KeyAndEntity, Pair};
pub use policy::CachePolicy;
pub use request_context::RequestContext;
pub use sqlite::SqliteDataAccessor;
