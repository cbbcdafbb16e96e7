use std::sync::Once;

use cache::{CacheClient, DashCache};
use data_access::{CachePolicy, CachedDataAccess, RequestContext, SqliteDataAccessor};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub type TestDataAccess<C = DashCache> = CachedDataAccess<SqliteDataAccessor, C>;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub async fn pool() -> SqlitePool {
    // every connection to `sqlite::memory:` opens its own database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("unable to connect to test db");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("unable to run migrations");

    pool
}

pub async fn store() -> SqliteDataAccessor {
    init_tracing();
    SqliteDataAccessor::new(pool().await)
}

pub async fn data_access() -> TestDataAccess {
    data_access_with(DashCache::new(), CachePolicy::default()).await
}

pub async fn data_access_with<C: CacheClient>(cache: C, policy: CachePolicy) -> TestDataAccess<C> {
    CachedDataAccess::with_policy(store().await, cache, policy)
        .expect("every cached shape is registered")
}

pub fn ctx() -> RequestContext {
    RequestContext::new()
}
