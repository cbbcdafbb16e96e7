use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use request_context::RequestContext;

use crate::CacheError;

/// Shared key/value cache with per-entry expiration.
///
/// A lookup that finds nothing is `Ok(None)`, never an error. Writes are
/// unconditional (last writer wins). Deleting an absent key succeeds.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// A zero `ttl`, or one too long for the clock, stores the entry without
    /// expiration.
    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError>;

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError>;

    async fn delete_multi(&self, ctx: &RequestContext, keys: &[String]) -> Result<(), CacheError>;

    async fn flush_all(&self, ctx: &RequestContext) -> Result<(), CacheError>;
}

#[async_trait]
impl<C> CacheClient for Arc<C>
where
    C: CacheClient + ?Sized,
{
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        (**self).get(ctx, key).await
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        (**self).set(ctx, key, value, ttl).await
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError> {
        (**self).delete(ctx, key).await
    }

    async fn delete_multi(&self, ctx: &RequestContext, keys: &[String]) -> Result<(), CacheError> {
        (**self).delete_multi(ctx, keys).await
    }

    async fn flush_all(&self, ctx: &RequestContext) -> Result<(), CacheError> {
        (**self).flush_all(ctx).await
    }
}
