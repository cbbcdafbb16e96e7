use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use cache::{CacheClient, CacheError, Codec, CodecError, ShapeRegistry, Shaped};
use model::{AppConfigProperty, ApplicationConfig, EntityKey, Idiom, IdiomOrder, MessageForUser};
use request_context::RequestContext;

use crate::{
    CacheKey, CachePolicy, CachedValue, DataAccessError, DataAccessor, idiom_fanout,
    payload::Cacheable,
};

/// Cache-aside decorator over a [`DataAccessor`].
///
/// Reads look in the cache first and populate it on a miss. Writes go to the
/// store, then refresh or drop the entries they make stale. A misbehaving
/// cache never fails a call: the error is logged and the call carries on
/// against the store. The only exceptions are config writes, which refuse to
/// proceed when the cache cannot be flushed first, and [`clear_cache`].
///
/// [`clear_cache`]: DataAccessor::clear_cache
pub struct CachedDataAccess<S, C> {
    store: S,
    cache: C,
    codec: Codec<CachedValue>,
    policy: CachePolicy,
}

/// What a successful write does to the cache.
enum Invalidation {
    /// Overwrite every key with the same fresh value.
    Refresh {
        keys: Vec<CacheKey>,
        value: CachedValue,
        ttl: Duration,
    },
    Remove(Vec<CacheKey>),
    FlushAll,
}

impl<S, C> CachedDataAccess<S, C>
where
    S: DataAccessor,
    C: CacheClient,
{
    pub fn new(store: S, cache: C) -> Result<Self, CodecError> {
        Self::with_policy(store, cache, CachePolicy::default())
    }

    pub fn with_policy(store: S, cache: C, policy: CachePolicy) -> Result<Self, CodecError> {
        let registry = ShapeRegistry::builder()
            .register_all::<CachedValue>()
            .build();

        Ok(Self {
            store,
            cache,
            codec: Codec::new(registry)?,
            policy,
        })
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn cache(&self) -> &C {
        &self.cache
    }

    #[inline]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    async fn lookup<V: Cacheable>(
        &self,
        ctx: &RequestContext,
        key: &CacheKey,
    ) -> Result<Option<V>, CacheError> {
        let scoped = ctx.with_timeout(self.policy.operation_timeout);
        let Some(bytes) = scoped.run(self.cache.get(&scoped, key.as_str())).await?? else {
            return Ok(None);
        };

        let value = self.codec.decode(&bytes)?;
        Ok(Some(V::from_cached(value)?))
    }

    async fn put(
        &self,
        ctx: &RequestContext,
        key: &CacheKey,
        bytes: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let scoped = ctx.with_timeout(self.policy.operation_timeout);
        Ok(scoped
            .run(self.cache.set(&scoped, key.as_str(), bytes, ttl))
            .await??)
    }

    async fn remove(&self, ctx: &RequestContext, keys: Vec<CacheKey>) -> Result<(), CacheError> {
        let keys = keys.into_iter().map(String::from).collect::<Vec<_>>();
        let scoped = ctx.with_timeout(self.policy.operation_timeout);
        Ok(scoped
            .run(self.cache.delete_multi(&scoped, &keys))
            .await??)
    }

    async fn flush(&self, ctx: &RequestContext) -> Result<(), CacheError> {
        let scoped = ctx.with_timeout(self.policy.operation_timeout);
        Ok(scoped.run(self.cache.flush_all(&scoped)).await??)
    }

    /// Applies `invalidation`, logging instead of returning any failure.
    async fn apply(&self, ctx: &RequestContext, invalidation: Invalidation) {
        match invalidation {
            Invalidation::Refresh { keys, value, ttl } => {
                let bytes = match self.codec.encode(&value) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::error!(shape = value.shape(), "encode for cache :: {err}");
                        return;
                    }
                };

                // every key is attempted, even after a failure
                for key in keys {
                    if let Err(err) = self.put(ctx, &key, bytes.clone(), ttl).await {
                        tracing::error!(%key, "refresh cache entry :: {err}");
                    }
                }
            }
            Invalidation::Remove(keys) => {
                let count = keys.len();
                if let Err(err) = self.remove(ctx, keys).await {
                    tracing::error!(count, "remove cache entries :: {err}");
                }
            }
            Invalidation::FlushAll => {
                if let Err(err) = self.flush(ctx).await {
                    tracing::error!("flush cache :: {err}");
                }
            }
        }
    }

    /// Read-aside under `key`; on a miss the fetched value is stored under
    /// `key` only.
    async fn read<V, Fut>(
        &self,
        ctx: &RequestContext,
        key: CacheKey,
        ttl: Duration,
        fetch: Fut,
    ) -> Result<V, DataAccessError>
    where
        V: Cacheable,
        Fut: Future<Output = Result<V, DataAccessError>> + Send,
    {
        let fill = key.clone();
        self.read_with(ctx, key, ttl, fetch, move |_: &V| vec![fill])
            .await
    }

    /// Read-aside under `key`; on a miss the fetched value is stored under
    /// every key `fill` returns for it.
    ///
    /// A cache error (as opposed to a miss) sends the call straight to the
    /// store and leaves the cache alone.
    async fn read_with<V, Fut, F>(
        &self,
        ctx: &RequestContext,
        key: CacheKey,
        ttl: Duration,
        fetch: Fut,
        fill: F,
    ) -> Result<V, DataAccessError>
    where
        V: Cacheable,
        Fut: Future<Output = Result<V, DataAccessError>> + Send,
        F: FnOnce(&V) -> Vec<CacheKey> + Send,
    {
        match self.lookup::<V>(ctx, &key).await {
            Ok(Some(value)) => {
                tracing::trace!(%key, "cache hit");
                Ok(value)
            }
            Ok(None) => {
                tracing::debug!(%key, "cache miss");
                let value = fetch.await?;
                let invalidation = Invalidation::Refresh {
                    keys: fill(&value),
                    value: value.clone().into_cached(),
                    ttl,
                };
                self.apply(ctx, invalidation).await;
                Ok(value)
            }
            Err(err) => {
                tracing::error!(%key, "read cache, falling back to store :: {err}");
                fetch.await
            }
        }
    }

    /// Runs the store `mutation`, then applies the invalidation derived from
    /// its result. Store errors skip the cache entirely.
    async fn write<V, Fut, F>(
        &self,
        ctx: &RequestContext,
        mutation: Fut,
        invalidation: F,
    ) -> Result<V, DataAccessError>
    where
        V: Send,
        Fut: Future<Output = Result<V, DataAccessError>> + Send,
        F: FnOnce(&V) -> Invalidation + Send,
    {
        let value = mutation.await?;
        self.apply(ctx, invalidation(&value)).await;
        Ok(value)
    }

    /// Flushes the whole cache, then runs `mutation`. A failed flush aborts
    /// before the store is touched.
    async fn flush_then<V, Fut>(&self, ctx: &RequestContext, mutation: Fut) -> Result<V, DataAccessError>
    where
        Fut: Future<Output = Result<V, DataAccessError>> + Send,
    {
        if let Err(err) = self.flush(ctx).await {
            tracing::error!("flush cache before config write, write aborted :: {err}");
            return Err(DataAccessError::CacheUnavailable(err));
        }
        mutation.await
    }

    fn recache_idiom(&self, key: EntityKey, idiom: &Idiom) -> Invalidation {
        Invalidation::Refresh {
            keys: idiom_fanout(idiom),
            value: (key, idiom.clone()).into_cached(),
            ttl: self.policy.idiom_ttl,
        }
    }

    /// Drops the cached views of the idiom as currently stored. Failing to
    /// load it is logged and the cache is left as is.
    async fn uncache_stored_idiom(&self, ctx: &RequestContext, idiom_id: i64) {
        match self.store.get_idiom(ctx, idiom_id).await {
            Ok((_, idiom)) => {
                self.apply(ctx, Invalidation::Remove(idiom_fanout(&idiom)))
                    .await
            }
            Err(err) => tracing::error!("load idiom #{idiom_id} to uncache :: {err}"),
        }
    }
}

#[async_trait]
impl<S, C> DataAccessor for CachedDataAccess<S, C>
where
    S: DataAccessor,
    C: CacheClient,
{
    async fn get_idiom(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
    ) -> Result<(EntityKey, Idiom), DataAccessError> {
        self.read_with(
            ctx,
            CacheKey::idiom(idiom_id),
            self.policy.idiom_ttl,
            self.store.get_idiom(ctx, idiom_id),
            |(_, idiom): &(EntityKey, Idiom)| idiom_fanout(idiom),
        )
        .await
    }

    async fn get_idiom_by_impl_id(
        &self,
        ctx: &RequestContext,
        impl_id: i64,
    ) -> Result<(EntityKey, Idiom), DataAccessError> {
        self.read(
            ctx,
            CacheKey::idiom_by_impl_id(impl_id),
            self.policy.idiom_ttl,
            self.store.get_idiom_by_impl_id(ctx, impl_id),
        )
        .await
    }

    async fn save_new_idiom(
        &self,
        ctx: &RequestContext,
        idiom: &mut Idiom,
    ) -> Result<EntityKey, DataAccessError> {
        let key = self.store.save_new_idiom(ctx, idiom).await?;
        self.apply(ctx, self.recache_idiom(key, idiom)).await;
        Ok(key)
    }

    async fn save_existing_idiom(
        &self,
        ctx: &RequestContext,
        key: &EntityKey,
        idiom: &mut Idiom,
    ) -> Result<(), DataAccessError> {
        self.store.save_existing_idiom(ctx, key, idiom).await?;
        self.apply(ctx, self.recache_idiom(*key, idiom)).await;
        Ok(())
    }

    async fn get_all_idioms(
        &self,
        ctx: &RequestContext,
        limit: usize,
        order: IdiomOrder,
    ) -> Result<(Vec<EntityKey>, Vec<Idiom>), DataAccessError> {
        self.read(
            ctx,
            CacheKey::all_idioms(limit, order),
            self.policy.all_idioms_ttl,
            self.store.get_all_idioms(ctx, limit, order),
        )
        .await
    }

    async fn delete_all_idioms(&self, ctx: &RequestContext) -> Result<(), DataAccessError> {
        self.write(ctx, self.store.delete_all_idioms(ctx), |_| {
            Invalidation::FlushAll
        })
        .await
    }

    async fn delete_idiom(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        why: &str,
    ) -> Result<(), DataAccessError> {
        self.uncache_stored_idiom(ctx, idiom_id).await;
        self.store.delete_idiom(ctx, idiom_id, why).await
    }

    async fn delete_impl(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        impl_id: i64,
        why: &str,
    ) -> Result<(), DataAccessError> {
        self.uncache_stored_idiom(ctx, idiom_id).await;
        self.store.delete_impl(ctx, idiom_id, impl_id, why).await
    }

    async fn search_idioms_by_words_with_favorites(
        &self,
        ctx: &RequestContext,
        typed_words: &[String],
        typed_langs: &[String],
        favorite_langs: &[String],
        see_non_favorite: bool,
        limit: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        // personalized, not cached
        self.store
            .search_idioms_by_words_with_favorites(
                ctx,
                typed_words,
                typed_langs,
                favorite_langs,
                see_non_favorite,
                limit,
            )
            .await
    }

    async fn search_impl_ids(
        &self,
        ctx: &RequestContext,
        words: &[String],
        langs: &[String],
    ) -> Result<HashMap<String, bool>, DataAccessError> {
        self.store.search_impl_ids(ctx, words, langs).await
    }

    async fn search_idioms_by_langs(
        &self,
        ctx: &RequestContext,
        langs: &[String],
        limit: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        self.read(
            ctx,
            CacheKey::idioms_by_langs(langs, limit),
            self.policy.search_ttl,
            self.store.search_idioms_by_langs(ctx, langs, limit),
        )
        .await
    }

    async fn languages_having_impl(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<String>, DataAccessError> {
        self.read(
            ctx,
            CacheKey::languages_having_impl(),
            self.policy.languages_ttl,
            self.store.languages_having_impl(ctx),
        )
        .await
    }

    async fn recent_idioms(
        &self,
        ctx: &RequestContext,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        self.read(
            ctx,
            CacheKey::recent_idioms(favorite_langs, show_other, n),
            self.policy.listing_ttl,
            self.store.recent_idioms(ctx, favorite_langs, show_other, n),
        )
        .await
    }

    async fn popular_idioms(
        &self,
        ctx: &RequestContext,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        self.read(
            ctx,
            CacheKey::popular_idioms(favorite_langs, show_other, n),
            self.policy.listing_ttl,
            self.store.popular_idioms(ctx, favorite_langs, show_other, n),
        )
        .await
    }

    // TODO: cache per (favorite_langs, limit_each_lang, show_other, order) once the
    // home page stops computing it per request
    async fn idioms_filter_order(
        &self,
        ctx: &RequestContext,
        favorite_langs: &[String],
        limit_each_lang: usize,
        show_other: bool,
        order: IdiomOrder,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        self.store
            .idioms_filter_order(ctx, favorite_langs, limit_each_lang, show_other, order)
            .await
    }

    async fn get_app_config(
        &self,
        ctx: &RequestContext,
    ) -> Result<ApplicationConfig, DataAccessError> {
        self.read(
            ctx,
            CacheKey::app_config(),
            self.policy.app_config_ttl,
            self.store.get_app_config(ctx),
        )
        .await
    }

    async fn save_app_config(
        &self,
        ctx: &RequestContext,
        config: &ApplicationConfig,
    ) -> Result<(), DataAccessError> {
        self.flush_then(ctx, self.store.save_app_config(ctx, config))
            .await
    }

    async fn save_app_config_property(
        &self,
        ctx: &RequestContext,
        property: &AppConfigProperty,
    ) -> Result<(), DataAccessError> {
        self.flush_then(ctx, self.store.save_app_config_property(ctx, property))
            .await
    }

    async fn clear_cache(&self, ctx: &RequestContext) -> Result<(), DataAccessError> {
        self.flush(ctx).await?;
        self.store.clear_cache(ctx).await
    }

    async fn revert(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        version: i32,
    ) -> Result<Idiom, DataAccessError> {
        self.write(ctx, self.store.revert(ctx, idiom_id, version), |idiom: &Idiom| {
            Invalidation::Remove(idiom_fanout(idiom))
        })
        .await
    }

    async fn history_restore(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        version: i32,
    ) -> Result<Idiom, DataAccessError> {
        self.write(
            ctx,
            self.store.history_restore(ctx, idiom_id, version),
            |idiom: &Idiom| Invalidation::Remove(idiom_fanout(idiom)),
        )
        .await
    }

    async fn save_new_message(
        &self,
        ctx: &RequestContext,
        message: &MessageForUser,
    ) -> Result<EntityKey, DataAccessError> {
        self.write(ctx, self.store.save_new_message(ctx, message), |_| {
            Invalidation::Remove(vec![CacheKey::messages_for_user(&message.username)])
        })
        .await
    }

    async fn get_messages_for_user(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<(Vec<EntityKey>, Vec<MessageForUser>), DataAccessError> {
        self.read(
            ctx,
            CacheKey::messages_for_user(username),
            self.policy.messages_ttl,
            self.store.get_messages_for_user(ctx, username),
        )
        .await
    }

    async fn dismiss_message(
        &self,
        ctx: &RequestContext,
        key: &EntityKey,
    ) -> Result<MessageForUser, DataAccessError> {
        self.write(
            ctx,
            self.store.dismiss_message(ctx, key),
            |message: &MessageForUser| {
                Invalidation::Remove(vec![CacheKey::messages_for_user(&message.username)])
            },
        )
        .await
    }
}

impl<S, C> Clone for CachedDataAccess<S, C>
where
    S: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            codec: self.codec.clone(),
            policy: self.policy.clone(),
        }
    }
}
