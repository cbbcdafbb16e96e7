use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use cache::DashCache;
use clap::{Args as ClapArgs, Parser, Subcommand};
use data_access::{
    CachePolicy, CachedDataAccess, DataAccessor, RequestContext, SqliteDataAccessor,
};
use model::{AppConfigProperty, EntityKey, EntityKind, Idiom, IdiomOrder};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[derive(Debug, Parser)]
#[command(name = "idioms", about = "Administer the idioms store through its cache")]
struct Args {
    /// The database connection URL.
    /// Example: `sqlite:///tmp/data/data.db` (or) `sqlite://./data.db`
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Maximum time a single cache call may take before the store is used instead.
    #[arg(long, env = "CACHE_TIMEOUT_MS", default_value_t = 500)]
    cache_timeout_ms: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending database migrations.
    Migrate,

    /// Show an idiom by id.
    Idiom { id: i64 },

    /// Show the idiom holding an implementation.
    Implementation { impl_id: i64 },

    /// Store a new idiom read from a JSON file.
    Import { file: PathBuf },

    /// List idioms.
    List {
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// One of `id`, `title`, `-rating`, `-versionDate`.
        #[arg(long, default_value = "id")]
        order: IdiomOrder,
    },

    /// Search idioms by words, favorite languages first.
    Search {
        words: Vec<String>,

        #[command(flatten)]
        favorites: Favorites,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Languages having at least one implementation.
    Languages,

    /// Most recently edited idioms.
    Recent {
        #[command(flatten)]
        favorites: Favorites,

        #[arg(short, default_value_t = 10)]
        n: usize,
    },

    /// Best rated idioms.
    Popular {
        #[command(flatten)]
        favorites: Favorites,

        #[arg(short, default_value_t = 10)]
        n: usize,
    },

    /// Revert an idiom to one of its versions.
    Revert { id: i64, version: i32 },

    /// Save the content of an old version as the newest version.
    Restore { id: i64, version: i32 },

    DeleteIdiom {
        id: i64,

        #[arg(long)]
        why: String,
    },

    DeleteImpl {
        idiom_id: i64,
        impl_id: i64,

        #[arg(long)]
        why: String,
    },

    /// Unread messages of a user.
    Messages { username: String },

    Dismiss { message_id: i64 },

    #[command(subcommand)]
    Config(ConfigCommand),

    /// Flush the cache of this invocation.
    ///
    /// Every invocation starts with an empty in-process cache, so nothing
    /// outlives a single command and this only checks the flush path.
    ClearCache,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    Show,

    Toggle {
        name: String,

        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    Set { name: String, value: String },
}

#[derive(Debug, ClapArgs)]
struct Favorites {
    /// Favorite languages, may be repeated.
    #[arg(long = "lang")]
    langs: Vec<String>,

    /// Also show idioms without an implementation in a favorite language.
    #[arg(long)]
    show_other: bool,
}

fn print(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let connect_options = SqliteConnectOptions::from_str(&args.database_url)
        .context(format!("parse database url :: {}", args.database_url))?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await
        .context(format!("connect database :: {}", args.database_url))?;
    let store = SqliteDataAccessor::new(pool);

    if let Command::Migrate = args.cmd {
        store.migrate().await.context("run migrations")?;
        tracing::info!("migrations applied");
        return Ok(());
    }

    let policy = CachePolicy {
        operation_timeout: Duration::from_millis(args.cache_timeout_ms),
        ..CachePolicy::default()
    };
    let data_access = CachedDataAccess::with_policy(store, DashCache::new(), policy)
        .context("initialize cache codec")?;

    run(&data_access, &RequestContext::new(), args.cmd).await
}

async fn run(
    data_access: &impl DataAccessor,
    ctx: &RequestContext,
    cmd: Command,
) -> anyhow::Result<()> {
    match cmd {
        Command::Migrate => Ok(()),
        Command::Idiom { id } => print(&data_access.get_idiom(ctx, id).await?),
        Command::Implementation { impl_id } => {
            print(&data_access.get_idiom_by_impl_id(ctx, impl_id).await?)
        }
        Command::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .context(format!("read idiom :: {}", file.display()))?;
            let mut idiom: Idiom = serde_json::from_str(&json)
                .context(format!("parse idiom :: {}", file.display()))?;
            let key = data_access.save_new_idiom(ctx, &mut idiom).await?;
            print(&(key, idiom))
        }
        Command::List { limit, order } => {
            let (_, idioms) = data_access.get_all_idioms(ctx, limit, order).await?;
            print(&idioms)
        }
        Command::Search {
            words,
            favorites,
            limit,
        } => print(
            &data_access
                .search_idioms_by_words_with_favorites(
                    ctx,
                    &words,
                    &[],
                    &favorites.langs,
                    favorites.show_other,
                    limit,
                )
                .await?,
        ),
        Command::Languages => print(&data_access.languages_having_impl(ctx).await?),
        Command::Recent { favorites, n } => print(
            &data_access
                .recent_idioms(ctx, &favorites.langs, favorites.show_other, n)
                .await?,
        ),
        Command::Popular { favorites, n } => print(
            &data_access
                .popular_idioms(ctx, &favorites.langs, favorites.show_other, n)
                .await?,
        ),
        Command::Revert { id, version } => print(&data_access.revert(ctx, id, version).await?),
        Command::Restore { id, version } => {
            print(&data_access.history_restore(ctx, id, version).await?)
        }
        Command::DeleteIdiom { id, why } => Ok(data_access.delete_idiom(ctx, id, &why).await?),
        Command::DeleteImpl {
            idiom_id,
            impl_id,
            why,
        } => Ok(data_access
            .delete_impl(ctx, idiom_id, impl_id, &why)
            .await?),
        Command::Messages { username } => {
            let (_, messages) = data_access.get_messages_for_user(ctx, &username).await?;
            print(&messages)
        }
        Command::Dismiss { message_id } => {
            let key = EntityKey::new(EntityKind::Message, message_id);
            print(&data_access.dismiss_message(ctx, &key).await?)
        }
        Command::Config(ConfigCommand::Show) => print(&data_access.get_app_config(ctx).await?),
        Command::Config(ConfigCommand::Toggle { name, enabled }) => Ok(data_access
            .save_app_config_property(ctx, &AppConfigProperty::Toggle { name, enabled })
            .await?),
        Command::Config(ConfigCommand::Set { name, value }) => Ok(data_access
            .save_app_config_property(ctx, &AppConfigProperty::Text { name, value })
            .await?),
        Command::ClearCache => Ok(data_access.clear_cache(ctx).await?),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn arguments_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn clear_cache_help_says_the_cache_is_per_invocation() {
        let mut command = Args::command();
        let clear_cache = command.find_subcommand_mut("clear-cache").unwrap();
        let help = clear_cache.render_long_help().to_string();
        assert!(help.contains("empty in-process cache"));

        let args = Args::try_parse_from([
            "idioms",
            "--database-url",
            "sqlite::memory:",
            "--cache-timeout-ms",
            "100",
            "clear-cache",
        ])
        .unwrap();
        assert!(matches!(args.cmd, Command::ClearCache));
        assert_eq!(args.cache_timeout_ms, 100);
    }
}
