use std::collections::HashMap;

use async_trait::async_trait;
use model::{AppConfigProperty, ApplicationConfig, EntityKey, Idiom, IdiomOrder, MessageForUser};
use request_context::RequestContext;

use crate::DataAccessError;

/// CRUD and search over idioms, user messages and the application config.
///
/// Implemented by the persistent store and by the caching decorator in front
/// of it, so either can be handed to callers.
#[async_trait]
pub trait DataAccessor: Send + Sync {
    async fn get_idiom(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
    ) -> Result<(EntityKey, Idiom), DataAccessError>;

    async fn get_idiom_by_impl_id(
        &self,
        ctx: &RequestContext,
        impl_id: i64,
    ) -> Result<(EntityKey, Idiom), DataAccessError>;

    /// Stores a brand new idiom. On success `idiom` carries the version and
    /// date it was stored with.
    async fn save_new_idiom(
        &self,
        ctx: &RequestContext,
        idiom: &mut Idiom,
    ) -> Result<EntityKey, DataAccessError>;

    /// Stores `idiom` as the next version of an existing idiom.
    /// `idiom.version` must be the version currently stored, otherwise the
    /// save is a [`DataAccessError::Conflict`]. On success `idiom` carries the
    /// new version.
    async fn save_existing_idiom(
        &self,
        ctx: &RequestContext,
        key: &EntityKey,
        idiom: &mut Idiom,
    ) -> Result<(), DataAccessError>;

    async fn get_all_idioms(
        &self,
        ctx: &RequestContext,
        limit: usize,
        order: IdiomOrder,
    ) -> Result<(Vec<EntityKey>, Vec<Idiom>), DataAccessError>;

    async fn delete_all_idioms(&self, ctx: &RequestContext) -> Result<(), DataAccessError>;

    async fn delete_idiom(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        why: &str,
    ) -> Result<(), DataAccessError>;

    async fn delete_impl(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        impl_id: i64,
        why: &str,
    ) -> Result<(), DataAccessError>;

    async fn search_idioms_by_words_with_favorites(
        &self,
        ctx: &RequestContext,
        typed_words: &[String],
        typed_langs: &[String],
        favorite_langs: &[String],
        see_non_favorite: bool,
        limit: usize,
    ) -> Result<Vec<Idiom>, DataAccessError>;

    /// Ids (as strings) of the implementations matching every word, as a set.
    async fn search_impl_ids(
        &self,
        ctx: &RequestContext,
        words: &[String],
        langs: &[String],
    ) -> Result<HashMap<String, bool>, DataAccessError>;

    async fn search_idioms_by_langs(
        &self,
        ctx: &RequestContext,
        langs: &[String],
        limit: usize,
    ) -> Result<Vec<Idiom>, DataAccessError>;

    async fn languages_having_impl(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<String>, DataAccessError>;

    async fn recent_idioms(
        &self,
        ctx: &RequestContext,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError>;

    async fn popular_idioms(
        &self,
        ctx: &RequestContext,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError>;

    async fn idioms_filter_order(
        &self,
        ctx: &RequestContext,
        favorite_langs: &[String],
        limit_each_lang: usize,
        show_other: bool,
        order: IdiomOrder,
    ) -> Result<Vec<Idiom>, DataAccessError>;

    async fn get_app_config(
        &self,
        ctx: &RequestContext,
    ) -> Result<ApplicationConfig, DataAccessError>;

    async fn save_app_config(
        &self,
        ctx: &RequestContext,
        config: &ApplicationConfig,
    ) -> Result<(), DataAccessError>;

    async fn save_app_config_property(
        &self,
        ctx: &RequestContext,
        property: &AppConfigProperty,
    ) -> Result<(), DataAccessError>;

    /// Drops every cached entry. Nothing to do for an uncached accessor.
    async fn clear_cache(&self, _ctx: &RequestContext) -> Result<(), DataAccessError> {
        Ok(())
    }

    /// Makes `version` the current version again, forgetting later ones.
    async fn revert(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        version: i32,
    ) -> Result<Idiom, DataAccessError>;

    /// Saves the content of `version` as a new version on top of history.
    async fn history_restore(
        &self,
        ctx: &RequestContext,
        idiom_id: i64,
        version: i32,
    ) -> Result<Idiom, DataAccessError>;

    async fn save_new_message(
        &self,
        ctx: &RequestContext,
        message: &MessageForUser,
    ) -> Result<EntityKey, DataAccessError>;

    /// Messages of `username` that were not dismissed yet, oldest first.
    async fn get_messages_for_user(
        &self,
        ctx: &RequestContext,
        username: &str,
    ) -> Result<(Vec<EntityKey>, Vec<MessageForUser>), DataAccessError>;

    async fn dismiss_message(
        &self,
        ctx: &RequestContext,
        key: &EntityKey,
    ) -> Result<MessageForUser, DataAccessError>;
}
