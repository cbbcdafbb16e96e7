use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use request_context::RequestContext;
use tokio::time::Instant;

use crate::{CacheClient, CacheError};

/// In-process [`CacheClient`] backed by a concurrent map.
///
/// Clones share the same entries. Expired entries read as misses and are
/// dropped on access.
#[derive(Clone, Default)]
pub struct DashCache {
    entries: Arc<DashMap<String, Entry>>,
}

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

impl DashCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when `key` holds an unexpired entry.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Number of stored entries, expired ones included until touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheClient for DashCache {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%key), skip_all)
    )]
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if ctx.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        }

        if self
            .entries
            .remove_if(key, |_, entry| entry.is_expired(now))
            .is_some()
        {
            #[cfg(feature = "tracing")]
            tracing::trace!("evicted expired entry");
        }

        Ok(None)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%key, ?ttl), skip_all)
    )]
    async fn set(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ctx.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        // a ttl past what the clock can represent never expires either
        let expires_at = match ttl.is_zero() {
            true => None,
            false => Instant::now().checked_add(ttl),
        };
        self.entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%key), skip_all)
    )]
    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<(), CacheError> {
        if ctx.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        self.entries.remove(key);
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(?keys), skip_all)
    )]
    async fn delete_multi(&self, ctx: &RequestContext, keys: &[String]) -> Result<(), CacheError> {
        if ctx.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        for key in keys {
            self.entries.remove(key);
        }
        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    async fn flush_all(&self, ctx: &RequestContext) -> Result<(), CacheError> {
        if ctx.is_cancelled() {
            return Err(CacheError::Cancelled);
        }

        self.entries.clear();
        Ok(())
    }
}
