mod cache;
mod cache_registry;
mod codec;
mod dashcache;
mod error;
mod tag;

pub use cache::CacheClient;
pub use cache_registry::{ShapeRegistry, ShapeRegistryBuilder};
pub use codec::Codec;
pub use dashcache::DashCache;
pub use error::{CacheError, CodecError};
pub use tag::Shaped;
