use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use cache::{CacheClient, CacheError, DashCache};
use request_context::RequestContext;

/// [`DashCache`] with switchable failures, counting calls that reach it.
#[derive(Clone, Default)]
pub struct FaultyCache {
    pub inner: DashCache,
    faults: Arc<Faults>,
}

#[derive(Default)]
struct Faults {
    get: AtomicBool,
    set: AtomicBool,
    delete: AtomicBool,
    flush: AtomicBool,
    stall: AtomicBool,
    sets: AtomicUsize,
}

fn fail(on: &AtomicBool, op: &str) -> Result<(), CacheError> {
    match on.load(Ordering::SeqCst) {
        true => Err(CacheError::Backend(format!("{op} :: connection refused"))),
        false => Ok(()),
    }
}

impl FaultyCache {
    /// Fails every call.
    pub fn broken() -> Self {
        let cache = Self::default();
        cache.fail_gets(true);
        cache.fail_sets(true);
        cache.fail_deletes(true);
        cache.fail_flushes(true);
        cache
    }

    pub fn fail_gets(&self, on: bool) {
        self.faults.get.store(on, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, on: bool) {
        self.faults.set.store(on, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, on: bool) {
        self.faults.delete.store(on, Ordering::SeqCst);
    }

    pub fn fail_flushes(&self, on: bool) {
        self.faults.flush.store(on, Ordering::SeqCst);
    }

    /// Makes `get` hang well past any sensible timeout.
    pub fn stall_gets(&self, on: bool) {
        self.faults.stall.store(on, Ordering::SeqCst);
    }

    /// Number of `set` calls, failed ones included.
    pub fn sets(&self) -> usize {
        self.faults.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheClient for FaultyCache {
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        fail(&self.faults.get, "get")?;
        if self.faults.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.inner.get(ctx, key).await
    }

    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.faults.sets.fetch_add(1, Ordering::SeqCst);
        fail(&self.faults.set, "set")?;
        self.inner.set(ctx, key, value, ttl).await
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError> {
        fail(&self.faults.delete, "delete")?;
        self.inner.delete(ctx, key).await
    }

    async fn delete_multi(&self, ctx: &RequestContext, keys: &[String]) -> Result<(), CacheError> {
        fail(&self.faults.delete, "delete_multi")?;
        self.inner.delete_multi(ctx, keys).await
    }

    async fn flush_all(&self, ctx: &RequestContext) -> Result<(), CacheError> {
        fail(&self.faults.flush, "flush_all")?;
        self.inner.flush_all(ctx).await
    }
}
