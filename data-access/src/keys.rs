use std::fmt::Display;

use model::{Idiom, IdiomOrder};

/// Cache key of one accessor operation and its arguments.
///
/// The operation name is the prefix, so keys of different operations never
/// collide. List arguments are rendered in the order given; callers wanting
/// a shared entry must pass them in a canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn idiom(idiom_id: i64) -> Self {
        Self(format!("getIdiom({idiom_id})"))
    }

    pub fn idiom_by_impl_id(impl_id: i64) -> Self {
        Self(format!("getIdiomByImplID({impl_id})"))
    }

    pub fn all_idioms(limit: usize, order: IdiomOrder) -> Self {
        Self(format!("getAllIdioms({limit},{order})"))
    }

    pub fn idioms_by_langs(langs: &[String], limit: usize) -> Self {
        Self(format!("searchIdiomsByLangs({langs:?},{limit})"))
    }

    pub fn languages_having_impl() -> Self {
        Self("languagesHavingImpl()".to_string())
    }

    pub fn recent_idioms(favorite_langs: &[String], show_other: bool, n: usize) -> Self {
        Self(format!("recentIdioms({favorite_langs:?},{show_other},{n})"))
    }

    pub fn popular_idioms(favorite_langs: &[String], show_other: bool, n: usize) -> Self {
        Self(format!("popularIdioms({favorite_langs:?},{show_other},{n})"))
    }

    pub fn messages_for_user(username: &str) -> Self {
        Self(format!("getMessagesForUser({username})"))
    }

    pub fn app_config() -> Self {
        Self("getAppConfig()".to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(value: CacheKey) -> Self {
        value.0
    }
}

/// Every key under which `idiom` may be cached: its own, then one per
/// implementation.
///
/// Keys of implementations removed from an earlier version are not part of
/// the set; those entries age out with their TTL.
pub fn idiom_fanout(idiom: &Idiom) -> Vec<CacheKey> {
    std::iter::once(CacheKey::idiom(idiom.id))
        .chain(idiom.impl_ids().map(CacheKey::idiom_by_impl_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use model::Implementation;

    use super::*;

    fn langs(langs: &[&str]) -> Vec<String> {
        langs.iter().map(|lang| lang.to_string()).collect()
    }

    #[test]
    fn equal_arguments_give_equal_keys() {
        assert_eq!(
            CacheKey::recent_idioms(&langs(&["go", "rust"]), true, 20),
            CacheKey::recent_idioms(&langs(&["go", "rust"]), true, 20)
        );
        assert_eq!(
            CacheKey::all_idioms(10, IdiomOrder::Rating).as_str(),
            "getAllIdioms(10,-rating)"
        );
    }

    #[test]
    fn list_order_matters() {
        assert_ne!(
            CacheKey::idioms_by_langs(&langs(&["go", "rust"]), 5),
            CacheKey::idioms_by_langs(&langs(&["rust", "go"]), 5)
        );
    }

    #[test]
    fn list_items_cannot_bleed_into_each_other() {
        assert_ne!(
            CacheKey::idioms_by_langs(&langs(&["a,b"]), 5),
            CacheKey::idioms_by_langs(&langs(&["a", "b"]), 5)
        );
    }

    #[test]
    fn operation_name_namespaces_keys() {
        let favorites = langs(&["go"]);
        assert_ne!(
            CacheKey::recent_idioms(&favorites, false, 3),
            CacheKey::popular_idioms(&favorites, false, 3)
        );
        assert_ne!(CacheKey::idiom(7), CacheKey::idiom_by_impl_id(7));
    }

    #[test]
    fn fanout_covers_idiom_and_every_implementation() {
        let idiom = Idiom::new(42, "swap")
            .with_implementation(Implementation::new(5, "go", ""))
            .with_implementation(Implementation::new(7, "rust", ""));

        assert_eq!(
            idiom_fanout(&idiom),
            vec![
                CacheKey::idiom(42),
                CacheKey::idiom_by_impl_id(5),
                CacheKey::idiom_by_impl_id(7),
            ]
        );
    }
}
