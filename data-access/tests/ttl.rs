mod shared;

use std::time::Duration;

use cache::DashCache;
use data_access::{CacheKey, CachePolicy, DataAccessor};
use model::IdiomOrder;
use shared::{
    fixture::{hello, reverse_list},
    setup::{ctx, data_access, data_access_with},
};

const EPSILON: Duration = Duration::from_secs(1);

// The store runs on its own thread and must see a running clock, so time is
// only frozen while the cache alone answers.

#[tokio::test]
async fn idiom_is_served_until_its_ttl_runs_out() {
    let ctx = ctx();
    let data_access = data_access().await;
    let ttl = data_access.policy().idiom_ttl;

    let mut idiom = hello();
    let key = data_access
        .store()
        .save_new_idiom(&ctx, &mut idiom)
        .await
        .unwrap();
    let (_, cached) = data_access.get_idiom(&ctx, 1).await.unwrap();

    idiom.title = "Print Hello World!".into();
    data_access
        .store()
        .save_existing_idiom(&ctx, &key, &mut idiom)
        .await
        .unwrap();

    tokio::time::pause();
    tokio::time::advance(ttl - EPSILON).await;
    let (_, before) = data_access.get_idiom(&ctx, 1).await.unwrap();
    assert_eq!(before, cached);

    tokio::time::advance(EPSILON * 2).await;
    tokio::time::resume();
    let (_, after) = data_access.get_idiom(&ctx, 1).await.unwrap();
    assert_eq!(after, idiom);
}

#[tokio::test]
async fn each_read_family_expires_on_its_own() {
    let ctx = ctx();
    let data_access = data_access().await;
    let all_idioms_ttl = data_access.policy().all_idioms_ttl;
    assert!(all_idioms_ttl < data_access.policy().languages_ttl);

    data_access
        .store()
        .save_new_idiom(&ctx, &mut hello())
        .await
        .unwrap();
    data_access
        .get_all_idioms(&ctx, 10, IdiomOrder::Id)
        .await
        .unwrap();
    data_access.languages_having_impl(&ctx).await.unwrap();

    data_access
        .store()
        .save_new_idiom(&ctx, &mut reverse_list())
        .await
        .unwrap();

    tokio::time::pause();
    tokio::time::advance(all_idioms_ttl - EPSILON).await;
    let (_, all) = data_access
        .get_all_idioms(&ctx, 10, IdiomOrder::Id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    tokio::time::advance(EPSILON * 2).await;
    assert!(
        !data_access
            .cache()
            .contains_key(CacheKey::all_idioms(10, IdiomOrder::Id).as_str())
    );
    assert_eq!(
        data_access.languages_having_impl(&ctx).await.unwrap().len(),
        2
    );

    tokio::time::resume();
    let (_, all) = data_access
        .get_all_idioms(&ctx, 10, IdiomOrder::Id)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn unrepresentable_ttl_keeps_the_entry() {
    let ctx = ctx();
    let policy = CachePolicy {
        idiom_ttl: Duration::MAX,
        operation_timeout: Duration::MAX,
        ..CachePolicy::default()
    };
    let data_access = data_access_with(DashCache::new(), policy).await;

    let mut idiom = hello();
    let key = data_access.save_new_idiom(&ctx, &mut idiom).await.unwrap();
    assert!(data_access.cache().contains_key(CacheKey::idiom(1).as_str()));

    let found = data_access.get_idiom(&ctx, 1).await.unwrap();
    assert_eq!(found, (key, idiom));
}
