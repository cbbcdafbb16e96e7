use std::{
    collections::{HashMap, HashSet},
    slice,
};

use async_trait::async_trait;
use model::{
    AppConfigProperty, ApplicationConfig, EntityKey, EntityKind, Idiom, IdiomOrder,
    Implementation, MessageForUser,
};
use request_context::RequestContext;
use sqlx::{Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;

use crate::{DataAccessError, DataAccessor};

/// [`DataAccessor`] persisting to SQLite.
///
/// Idioms are stored whole as a JSON body next to a few columns used for
/// lookups and ordering. Every stored version is kept in `idiom_history`.
/// Text search is a plain case-insensitive substring match.
#[derive(Clone)]
pub struct SqliteDataAccessor {
    pool: SqlitePool,
}

type MessageRow = (i64, String, String, i64, Option<i64>);

impl SqliteDataAccessor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[inline]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_idiom(&self, idiom_id: i64) -> Result<(EntityKey, Idiom), DataAccessError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT key, body FROM idioms WHERE id = ?")
                .bind(idiom_id)
                .fetch_optional(&self.pool)
                .await?;

        let (key, body) = row.ok_or(DataAccessError::IdiomNotFound(idiom_id))?;
        Ok((idiom_key(key), serde_json::from_str(&body)?))
    }

    async fn load_idioms(
        &self,
        order: IdiomOrder,
        limit: Option<usize>,
    ) -> Result<(Vec<EntityKey>, Vec<Idiom>), DataAccessError> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let sql = format!(
            "SELECT key, body FROM idioms ORDER BY {} LIMIT ?",
            order_by(order)
        );
        let rows: Vec<(i64, String)> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut keys = Vec::with_capacity(rows.len());
        let mut idioms = Vec::with_capacity(rows.len());
        for (key, body) in rows {
            keys.push(idiom_key(key));
            idioms.push(serde_json::from_str(&body)?);
        }
        Ok((keys, idioms))
    }

    async fn filtered(
        &self,
        order: IdiomOrder,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        let (_, idioms) = self.load_idioms(order, None).await?;
        Ok(idioms
            .into_iter()
            .filter(|idiom| {
                show_other || favorite_langs.is_empty() || idiom.has_impl_in(favorite_langs)
            })
            .take(n)
            .collect())
    }

    /// Replaces the stored idiom with `next`, provided the stored version is
    /// still `expected_version`.
    async fn commit_next_version(
        &self,
        key: &EntityKey,
        expected_version: i32,
        next: &Idiom,
    ) -> Result<(), DataAccessError> {
        let body = serde_json::to_string(next)?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE idioms SET title = ?, version = ?, rating = ?, version_date = ?, body = ?
            WHERE key = ? AND id = ? AND version = ?
            "#,
        )
        .bind(&next.title)
        .bind(next.version)
        .bind(next.rating)
        .bind(next.version_date.unix_timestamp())
        .bind(&body)
        .bind(key.id())
        .bind(next.id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            let stored: Option<(i64, i32)> =
                sqlx::query_as("SELECT key, version FROM idioms WHERE id = ?")
                    .bind(next.id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match stored {
                None => DataAccessError::IdiomNotFound(next.id),
                Some((stored_key, _)) if stored_key != key.id() => DataAccessError::Conflict(
                    format!("{key} does not hold idiom {}", next.id),
                ),
                Some((_, stored_version)) => DataAccessError::Conflict(format!(
                    "idiom {} was modified concurrently :: stored version {stored_version} :: submitted version {expected_version}",
                    next.id
                )),
            });
        }

        replace_implementations(&mut tx, next).await?;
        insert_history(&mut tx, next, &body).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn history_body(&self, idiom_id: i64, version: i32) -> Result<String, DataAccessError> {
        sqlx::query_scalar("SELECT body FROM idiom_history WHERE idiom_id = ? AND version = ?")
            .bind(idiom_id)
            .bind(version)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DataAccessError::VersionNotFound { idiom_id, version })
    }
}

#[async_trait]
impl DataAccessor for SqliteDataAccessor {
    async fn get_idiom(
        &self,
        _ctx: &RequestContext,
        idiom_id: i64,
    ) -> Result<(EntityKey, Idiom), DataAccessError> {
        self.fetch_idiom(idiom_id).await
    }

    async fn get_idiom_by_impl_id(
        &self,
        _ctx: &RequestContext,
        impl_id: i64,
    ) -> Result<(EntityKey, Idiom), DataAccessError> {
        let row: Option<(i64, String)> = sqlx::query_as(
            r#"
            SELECT i.key, i.body FROM idioms i
            INNER JOIN implementations m ON m.idiom_id = i.id
            WHERE m.id = ?
            "#,
        )
        .bind(impl_id)
        .fetch_optional(&self.pool)
        .await?;

        let (key, body) = row.ok_or(DataAccessError::ImplementationNotFound(impl_id))?;
        Ok((idiom_key(key), serde_json::from_str(&body)?))
    }

    async fn save_new_idiom(
        &self,
        _ctx: &RequestContext,
        idiom: &mut Idiom,
    ) -> Result<EntityKey, DataAccessError> {
        tracing::info!("saving new idiom #{} :: {}", idiom.id, idiom.title);

        let mut saved = idiom.clone();
        saved.version = 1;
        saved.version_date = now()?;
        let body = serde_json::to_string(&saved)?;

        let mut tx = self.pool.begin().await?;
        let key = sqlx::query(
            r#"
            INSERT INTO idioms (id, title, version, rating, version_date, body)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(saved.id)
        .bind(&saved.title)
        .bind(saved.version)
        .bind(saved.rating)
        .bind(saved.version_date.unix_timestamp())
        .bind(&body)
        .execute(&mut *tx)
        .await
        .map_err(conflict(|| format!("idiom {} already exists", saved.id)))?
        .last_insert_rowid();

        insert_implementations(&mut tx, &saved).await?;
        insert_history(&mut tx, &saved, &body).await?;
        tx.commit().await?;

        *idiom = saved;
        Ok(idiom_key(key))
    }

    async fn save_existing_idiom(
        &self,
        _ctx: &RequestContext,
        key: &EntityKey,
        idiom: &mut Idiom,
    ) -> Result<(), DataAccessError> {
        tracing::info!("saving idiom #{} :: {}", idiom.id, idiom.title);

        let mut next = idiom.clone();
        next.version += 1;
        next.version_date = now()?;
        self.commit_next_version(key, idiom.version, &next).await?;

        tracing::info!("saved idiom #{} :: version {}", next.id, next.version);
        *idiom = next;
        Ok(())
    }

    async fn get_all_idioms(
        &self,
        _ctx: &RequestContext,
        limit: usize,
        order: IdiomOrder,
    ) -> Result<(Vec<EntityKey>, Vec<Idiom>), DataAccessError> {
        self.load_idioms(order, Some(limit)).await
    }

    async fn delete_all_idioms(&self, _ctx: &RequestContext) -> Result<(), DataAccessError> {
        tracing::warn!("deleting all idioms");

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM implementations")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM idiom_history")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM idioms").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_idiom(
        &self,
        _ctx: &RequestContext,
        idiom_id: i64,
        why: &str,
    ) -> Result<(), DataAccessError> {
        tracing::info!("deleting idiom #{idiom_id} :: {why}");

        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM idioms WHERE id = ?")
            .bind(idiom_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(DataAccessError::IdiomNotFound(idiom_id));
        }

        sqlx::query("DELETE FROM implementations WHERE idiom_id = ?")
            .bind(idiom_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM idiom_history WHERE idiom_id = ?")
            .bind(idiom_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_impl(
        &self,
        _ctx: &RequestContext,
        idiom_id: i64,
        impl_id: i64,
        why: &str,
    ) -> Result<(), DataAccessError> {
        tracing::info!("deleting implementation {impl_id} of idiom #{idiom_id} :: {why}");

        let (key, current) = self.fetch_idiom(idiom_id).await?;
        if current.implementation(impl_id).is_none() {
            return Err(DataAccessError::ImplementationNotFound(impl_id));
        }

        let mut next = current.clone();
        next.implementations
            .retain(|implementation| implementation.id != impl_id);
        next.version += 1;
        next.version_date = now()?;
        self.commit_next_version(&key, current.version, &next).await
    }

    async fn search_idioms_by_words_with_favorites(
        &self,
        _ctx: &RequestContext,
        typed_words: &[String],
        typed_langs: &[String],
        favorite_langs: &[String],
        see_non_favorite: bool,
        limit: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        let (_, idioms) = self.load_idioms(IdiomOrder::Rating, None).await?;
        let mut found = idioms
            .into_iter()
            .filter(|idiom| idiom.matches_words(typed_words))
            .filter(|idiom| typed_langs.is_empty() || idiom.has_impl_in(typed_langs))
            .filter(|idiom| {
                see_non_favorite || favorite_langs.is_empty() || idiom.has_impl_in(favorite_langs)
            })
            .collect::<Vec<_>>();

        // stable: keeps the rating order within each group
        found.sort_by_key(|idiom| !idiom.has_impl_in(favorite_langs));
        found.truncate(limit);
        Ok(found)
    }

    async fn search_impl_ids(
        &self,
        _ctx: &RequestContext,
        words: &[String],
        langs: &[String],
    ) -> Result<HashMap<String, bool>, DataAccessError> {
        let (_, idioms) = self.load_idioms(IdiomOrder::Id, None).await?;

        let mut found = HashMap::new();
        for idiom in &idioms {
            for implementation in &idiom.implementations {
                let lang_ok = langs.is_empty()
                    || langs
                        .iter()
                        .any(|lang| lang.eq_ignore_ascii_case(&implementation.lang));
                if lang_ok && impl_matches(idiom, implementation, words) {
                    found.insert(implementation.id.to_string(), true);
                }
            }
        }
        Ok(found)
    }

    async fn search_idioms_by_langs(
        &self,
        _ctx: &RequestContext,
        langs: &[String],
        limit: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        let (_, idioms) = self.load_idioms(IdiomOrder::Rating, None).await?;
        Ok(idioms
            .into_iter()
            .filter(|idiom| idiom.has_impl_in(langs))
            .take(limit)
            .collect())
    }

    async fn languages_having_impl(
        &self,
        _ctx: &RequestContext,
    ) -> Result<Vec<String>, DataAccessError> {
        Ok(
            sqlx::query_scalar("SELECT DISTINCT lang FROM implementations ORDER BY lang")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn recent_idioms(
        &self,
        _ctx: &RequestContext,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        self.filtered(IdiomOrder::Recent, favorite_langs, show_other, n)
            .await
    }

    async fn popular_idioms(
        &self,
        _ctx: &RequestContext,
        favorite_langs: &[String],
        show_other: bool,
        n: usize,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        self.filtered(IdiomOrder::Rating, favorite_langs, show_other, n)
            .await
    }

    async fn idioms_filter_order(
        &self,
        _ctx: &RequestContext,
        favorite_langs: &[String],
        limit_each_lang: usize,
        show_other: bool,
        order: IdiomOrder,
    ) -> Result<Vec<Idiom>, DataAccessError> {
        let (_, idioms) = self.load_idioms(order, None).await?;

        let mut seen = HashSet::new();
        let mut picked = Vec::new();
        for lang in favorite_langs {
            for idiom in idioms
                .iter()
                .filter(|idiom| idiom.has_impl_in(slice::from_ref(lang)))
                .take(limit_each_lang)
            {
                if seen.insert(idiom.id) {
                    picked.push(idiom.clone());
                }
            }
        }

        if show_other || favorite_langs.is_empty() {
            picked.extend(idioms.into_iter().filter(|idiom| !seen.contains(&idiom.id)));
        }

        order.sort(&mut picked);
        Ok(picked)
    }

    async fn get_app_config(
        &self,
        _ctx: &RequestContext,
    ) -> Result<ApplicationConfig, DataAccessError> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT kind, name, value FROM app_config")
                .fetch_all(&self.pool)
                .await?;

        let mut config = ApplicationConfig::default();
        for (kind, name, value) in rows {
            match kind.as_str() {
                "toggle" => {
                    config.toggles.insert(name, value == "true");
                }
                _ => {
                    config.properties.insert(name, value);
                }
            }
        }
        Ok(config)
    }

    async fn save_app_config(
        &self,
        _ctx: &RequestContext,
        config: &ApplicationConfig,
    ) -> Result<(), DataAccessError> {
        tracing::info!(
            "saving application config :: {} toggles :: {} properties",
            config.toggles.len(),
            config.properties.len()
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM app_config")
            .execute(&mut *tx)
            .await?;
        for (name, enabled) in &config.toggles {
            upsert_property(&mut tx, "toggle", name, &enabled.to_string()).await?;
        }
        for (name, value) in &config.properties {
            upsert_property(&mut tx, "text", name, value).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn save_app_config_property(
        &self,
        _ctx: &RequestContext,
        property: &AppConfigProperty,
    ) -> Result<(), DataAccessError> {
        tracing::info!("saving application config property :: {}", property.name());

        let mut tx = self.pool.begin().await?;
        match property {
            AppConfigProperty::Toggle { name, enabled } => {
                upsert_property(&mut tx, "toggle", name, &enabled.to_string()).await?
            }
            AppConfigProperty::Text { name, value } => {
                upsert_property(&mut tx, "text", name, value).await?
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn revert(
        &self,
        _ctx: &RequestContext,
        idiom_id: i64,
        version: i32,
    ) -> Result<Idiom, DataAccessError> {
        tracing::info!("reverting idiom #{idiom_id} to version {version}");

        let body = self.history_body(idiom_id, version).await?;
        let idiom: Idiom = serde_json::from_str(&body)?;

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE idioms SET title = ?, version = ?, rating = ?, version_date = ?, body = ?
            WHERE id = ?
            "#,
        )
        .bind(&idiom.title)
        .bind(idiom.version)
        .bind(idiom.rating)
        .bind(idiom.version_date.unix_timestamp())
        .bind(&body)
        .bind(idiom_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(DataAccessError::IdiomNotFound(idiom_id));
        }

        replace_implementations(&mut tx, &idiom).await?;
        sqlx::query("DELETE FROM idiom_history WHERE idiom_id = ? AND version > ?")
            .bind(idiom_id)
            .bind(version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(idiom)
    }

    async fn history_restore(
        &self,
        _ctx: &RequestContext,
        idiom_id: i64,
        version: i32,
    ) -> Result<Idiom, DataAccessError> {
        tracing::info!("restoring idiom #{idiom_id} from version {version}");

        let (key, current) = self.fetch_idiom(idiom_id).await?;
        let body = self.history_body(idiom_id, version).await?;

        let mut restored: Idiom = serde_json::from_str(&body)?;
        restored.version = current.version + 1;
        restored.version_date = now()?;
        self.commit_next_version(&key, current.version, &restored)
            .await?;
        Ok(restored)
    }

    async fn save_new_message(
        &self,
        _ctx: &RequestContext,
        message: &MessageForUser,
    ) -> Result<EntityKey, DataAccessError> {
        let key = sqlx::query(
            r#"
            INSERT INTO messages (username, message, created_at, dismissed_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&message.username)
        .bind(&message.message)
        .bind(message.created_at.unix_timestamp())
        .bind(message.dismissed_at.map(OffsetDateTime::unix_timestamp))
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(EntityKey::new(EntityKind::Message, key))
    }

    async fn get_messages_for_user(
        &self,
        _ctx: &RequestContext,
        username: &str,
    ) -> Result<(Vec<EntityKey>, Vec<MessageForUser>), DataAccessError> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT key, username, message, created_at, dismissed_at FROM messages
            WHERE username = ? AND dismissed_at IS NULL
            ORDER BY key
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        let mut keys = Vec::with_capacity(rows.len());
        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let (key, message) = message_from_row(row)?;
            keys.push(key);
            messages.push(message);
        }
        Ok((keys, messages))
    }

    async fn dismiss_message(
        &self,
        _ctx: &RequestContext,
        key: &EntityKey,
    ) -> Result<MessageForUser, DataAccessError> {
        if key.kind() != EntityKind::Message {
            return Err(DataAccessError::MessageNotFound(*key));
        }

        let row: Option<MessageRow> = sqlx::query_as(
            r#"
            UPDATE messages SET dismissed_at = ? WHERE key = ?
            RETURNING key, username, message, created_at, dismissed_at
            "#,
        )
        .bind(now()?.unix_timestamp())
        .bind(key.id())
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(DataAccessError::MessageNotFound(*key))?;
        Ok(message_from_row(row)?.1)
    }
}

#[inline]
fn idiom_key(key: i64) -> EntityKey {
    EntityKey::new(EntityKind::Idiom, key)
}

fn order_by(order: IdiomOrder) -> &'static str {
    match order {
        IdiomOrder::Id => "id ASC",
        IdiomOrder::Title => "title ASC, id ASC",
        IdiomOrder::Rating => "rating DESC, id ASC",
        IdiomOrder::Recent => "version_date DESC, id ASC",
    }
}

/// Current time, truncated to the second precision idioms are stored with.
fn now() -> Result<OffsetDateTime, DataAccessError> {
    Ok(OffsetDateTime::from_unix_timestamp(
        OffsetDateTime::now_utc().unix_timestamp(),
    )?)
}

fn impl_matches(idiom: &Idiom, implementation: &Implementation, words: &[String]) -> bool {
    let title = idiom.title.to_lowercase();
    let lead = idiom.lead_paragraph.to_lowercase();
    words.iter().all(|word| {
        let word_lower = word.to_lowercase();
        title.contains(&word_lower)
            || lead.contains(&word_lower)
            || implementation.matches_words(slice::from_ref(word))
    })
}

fn message_from_row(
    (key, username, message, created_at, dismissed_at): MessageRow,
) -> Result<(EntityKey, MessageForUser), DataAccessError> {
    Ok((
        EntityKey::new(EntityKind::Message, key),
        MessageForUser {
            username,
            message,
            created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
            dismissed_at: dismissed_at
                .map(OffsetDateTime::from_unix_timestamp)
                .transpose()?,
        },
    ))
}

fn conflict(describe: impl FnOnce() -> String) -> impl FnOnce(sqlx::Error) -> DataAccessError {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DataAccessError::Conflict(describe());
            }
        }
        DataAccessError::Database(err)
    }
}

async fn insert_implementations(
    tx: &mut Transaction<'_, Sqlite>,
    idiom: &Idiom,
) -> Result<(), DataAccessError> {
    for implementation in &idiom.implementations {
        sqlx::query("INSERT INTO implementations (id, idiom_id, lang) VALUES (?, ?, ?)")
            .bind(implementation.id)
            .bind(idiom.id)
            .bind(&implementation.lang)
            .execute(&mut **tx)
            .await
            .map_err(conflict(|| {
                format!("implementation {} already exists", implementation.id)
            }))?;
    }
    Ok(())
}

async fn replace_implementations(
    tx: &mut Transaction<'_, Sqlite>,
    idiom: &Idiom,
) -> Result<(), DataAccessError> {
    sqlx::query("DELETE FROM implementations WHERE idiom_id = ?")
        .bind(idiom.id)
        .execute(&mut **tx)
        .await?;
    insert_implementations(tx, idiom).await
}

async fn insert_history(
    tx: &mut Transaction<'_, Sqlite>,
    idiom: &Idiom,
    body: &str,
) -> Result<(), DataAccessError> {
    sqlx::query("INSERT OR REPLACE INTO idiom_history (idiom_id, version, body) VALUES (?, ?, ?)")
        .bind(idiom.id)
        .bind(idiom.version)
        .bind(body)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn upsert_property(
    tx: &mut Transaction<'_, Sqlite>,
    kind: &str,
    name: &str,
    value: &str,
) -> Result<(), DataAccessError> {
    sqlx::query(
        r#"
        INSERT INTO app_config (kind, name, value) VALUES (?, ?, ?)
        ON CONFLICT (kind, name) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(kind)
    .bind(name)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
