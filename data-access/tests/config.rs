mod shared;

use data_access::{CacheKey, CachePolicy, DataAccessError, DataAccessor};
use model::{AppConfigProperty, ApplicationConfig};
use shared::{
    faulty::FaultyCache,
    fixture::hello,
    setup::{ctx, data_access, data_access_with},
};

fn search_enabled() -> AppConfigProperty {
    AppConfigProperty::Toggle {
        name: "Search".into(),
        enabled: true,
    }
}

#[tokio::test]
async fn app_config_is_cached() {
    let ctx = ctx();
    let data_access = data_access().await;

    let config = data_access.get_app_config(&ctx).await.unwrap();
    assert_eq!(config, ApplicationConfig::default());
    assert!(data_access.cache().contains_key(CacheKey::app_config().as_str()));

    data_access
        .store()
        .save_app_config_property(&ctx, &search_enabled())
        .await
        .unwrap();
    assert_eq!(data_access.get_app_config(&ctx).await.unwrap(), config);
}

#[tokio::test]
async fn config_writes_flush_everything_first() {
    let ctx = ctx();
    let data_access = data_access().await;

    data_access.save_new_idiom(&ctx, &mut hello()).await.unwrap();
    data_access.get_app_config(&ctx).await.unwrap();
    assert!(!data_access.cache().is_empty());

    data_access
        .save_app_config_property(&ctx, &search_enabled())
        .await
        .unwrap();
    assert!(data_access.cache().is_empty());
    assert!(data_access.get_app_config(&ctx).await.unwrap().is_enabled("Search"));

    let mut config = ApplicationConfig::default();
    config
        .properties
        .insert("Banner".into(), "Down for maintenance".into());
    data_access.save_app_config(&ctx, &config).await.unwrap();

    let stored = data_access.get_app_config(&ctx).await.unwrap();
    assert_eq!(stored, config);
    assert!(!stored.is_enabled("Search"));
}

#[tokio::test]
async fn config_write_is_refused_when_flush_fails() {
    let ctx = ctx();
    let cache = FaultyCache::default();
    let data_access = data_access_with(cache.clone(), CachePolicy::default()).await;

    let before = data_access.get_app_config(&ctx).await.unwrap();

    cache.fail_flushes(true);
    let err = data_access
        .save_app_config_property(&ctx, &search_enabled())
        .await
        .unwrap_err();
    assert!(matches!(err, DataAccessError::CacheUnavailable(_)));

    let mut config = ApplicationConfig::default();
    config.apply(search_enabled());
    let err = data_access.save_app_config(&ctx, &config).await.unwrap_err();
    assert!(matches!(err, DataAccessError::CacheUnavailable(_)));

    assert_eq!(data_access.store().get_app_config(&ctx).await.unwrap(), before);

    cache.fail_flushes(false);
    data_access.save_app_config(&ctx, &config).await.unwrap();
    assert_eq!(data_access.store().get_app_config(&ctx).await.unwrap(), config);
}

#[tokio::test]
async fn clear_cache_empties_the_cache() {
    let ctx = ctx();
    let data_access = data_access().await;

    data_access.save_new_idiom(&ctx, &mut hello()).await.unwrap();
    data_access.languages_having_impl(&ctx).await.unwrap();
    assert!(!data_access.cache().is_empty());

    data_access.clear_cache(&ctx).await.unwrap();
    assert!(data_access.cache().is_empty());
}
