mod shared;

use data_access::{CacheKey, DataAccessError, DataAccessor};
use model::{EntityKey, EntityKind};
use shared::{
    fixture::welcome,
    setup::{ctx, data_access},
};

#[tokio::test]
async fn new_message_invalidates_the_recipient_only() {
    let ctx = ctx();
    let data_access = data_access().await;

    data_access
        .save_new_message(&ctx, &welcome("alice"))
        .await
        .unwrap();
    let (_, alice) = data_access.get_messages_for_user(&ctx, "alice").await.unwrap();
    let (_, bob) = data_access.get_messages_for_user(&ctx, "bob").await.unwrap();
    assert_eq!(alice.len(), 1);
    assert!(bob.is_empty());

    data_access
        .save_new_message(&ctx, &welcome("alice"))
        .await
        .unwrap();
    let cache = data_access.cache();
    assert!(!cache.contains_key(CacheKey::messages_for_user("alice").as_str()));
    assert!(cache.contains_key(CacheKey::messages_for_user("bob").as_str()));

    let (keys, messages) = data_access.get_messages_for_user(&ctx, "alice").await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(messages.iter().all(|message| message.username == "alice"));
}

#[tokio::test]
async fn messages_are_cached() {
    let ctx = ctx();
    let data_access = data_access().await;

    data_access
        .save_new_message(&ctx, &welcome("alice"))
        .await
        .unwrap();
    let first = data_access.get_messages_for_user(&ctx, "alice").await.unwrap();

    data_access
        .store()
        .save_new_message(&ctx, &welcome("alice"))
        .await
        .unwrap();
    let second = data_access.get_messages_for_user(&ctx, "alice").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn dismissed_message_disappears() {
    let ctx = ctx();
    let data_access = data_access().await;

    let key = data_access
        .save_new_message(&ctx, &welcome("alice"))
        .await
        .unwrap();
    let (keys, _) = data_access.get_messages_for_user(&ctx, "alice").await.unwrap();
    assert_eq!(keys, vec![key]);

    let dismissed = data_access.dismiss_message(&ctx, &key).await.unwrap();
    assert_eq!(dismissed.username, "alice");
    assert!(dismissed.is_dismissed());

    let (keys, messages) = data_access.get_messages_for_user(&ctx, "alice").await.unwrap();
    assert!(keys.is_empty());
    assert!(messages.is_empty());
}

#[tokio::test]
async fn dismissing_unknown_message_fails() {
    let ctx = ctx();
    let data_access = data_access().await;

    let unknown = EntityKey::new(EntityKind::Message, 404);
    let err = data_access.dismiss_message(&ctx, &unknown).await.unwrap_err();
    assert!(matches!(err, DataAccessError::MessageNotFound(key) if key == unknown));

    let wrong_kind = EntityKey::new(EntityKind::Idiom, 1);
    let err = data_access
        .dismiss_message(&ctx, &wrong_kind)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
