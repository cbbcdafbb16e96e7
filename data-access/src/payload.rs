use std::collections::HashMap;

use cache::{CodecError, Shaped};
use model::{ApplicationConfig, EntityKey, Idiom, MessageForUser};
use serde::{Deserialize, Serialize};

/// A store key cached together with the entity it designates, so a hit has
/// the same shape as a store read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAndEntity<E> {
    pub key: EntityKey,
    pub entity: E,
}

/// Two correlated collections cached as one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair<A, B> {
    pub first: A,
    pub second: B,
}

/// Everything the cache-aside accessor ever writes to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    KeyedIdiom(KeyAndEntity<Idiom>),
    IdiomPage(Pair<Vec<EntityKey>, Vec<Idiom>>),
    Idioms(Vec<Idiom>),
    Strings(Vec<String>),
    /// A set of strings, members mapped to `true`.
    StringSet(HashMap<String, bool>),
    Messages(Pair<Vec<EntityKey>, Vec<MessageForUser>>),
    AppConfig(ApplicationConfig),
}

impl Shaped for CachedValue {
    const SHAPES: &'static [&'static str] = &[
        "keyed-idiom",
        "idiom-page",
        "idioms",
        "strings",
        "string-set",
        "messages",
        "app-config",
    ];

    fn shape(&self) -> &'static str {
        match self {
            CachedValue::KeyedIdiom(_) => "keyed-idiom",
            CachedValue::IdiomPage(_) => "idiom-page",
            CachedValue::Idioms(_) => "idioms",
            CachedValue::Strings(_) => "strings",
            CachedValue::StringSet(_) => "string-set",
            CachedValue::Messages(_) => "messages",
            CachedValue::AppConfig(_) => "app-config",
        }
    }
}

/// Result types of cached store reads, and how each maps onto a
/// [`CachedValue`] variant.
pub trait Cacheable: Clone + Send + Sync + Sized + 'static {
    const SHAPE: &'static str;

    fn into_cached(self) -> CachedValue;

    fn from_cached(value: CachedValue) -> Result<Self, CodecError>;
}

fn unexpected(expected: &'static str, found: CachedValue) -> CodecError {
    CodecError::UnexpectedShape {
        expected,
        found: found.shape(),
    }
}

impl Cacheable for (EntityKey, Idiom) {
    const SHAPE: &'static str = "keyed-idiom";

    fn into_cached(self) -> CachedValue {
        let (key, entity) = self;
        CachedValue::KeyedIdiom(KeyAndEntity { key, entity })
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::KeyedIdiom(KeyAndEntity { key, entity }) => Ok((key, entity)),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

impl Cacheable for (Vec<EntityKey>, Vec<Idiom>) {
    const SHAPE: &'static str = "idiom-page";

    fn into_cached(self) -> CachedValue {
        let (first, second) = self;
        CachedValue::IdiomPage(Pair { first, second })
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::IdiomPage(Pair { first, second }) => Ok((first, second)),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

impl Cacheable for Vec<Idiom> {
    const SHAPE: &'static str = "idioms";

    fn into_cached(self) -> CachedValue {
        CachedValue::Idioms(self)
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::Idioms(idioms) => Ok(idioms),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

impl Cacheable for Vec<String> {
    const SHAPE: &'static str = "strings";

    fn into_cached(self) -> CachedValue {
        CachedValue::Strings(self)
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::Strings(strings) => Ok(strings),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

impl Cacheable for HashMap<String, bool> {
    const SHAPE: &'static str = "string-set";

    fn into_cached(self) -> CachedValue {
        CachedValue::StringSet(self)
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::StringSet(set) => Ok(set),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

impl Cacheable for (Vec<EntityKey>, Vec<MessageForUser>) {
    const SHAPE: &'static str = "messages";

    fn into_cached(self) -> CachedValue {
        let (first, second) = self;
        CachedValue::Messages(Pair { first, second })
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::Messages(Pair { first, second }) => Ok((first, second)),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

impl Cacheable for ApplicationConfig {
    const SHAPE: &'static str = "app-config";

    fn into_cached(self) -> CachedValue {
        CachedValue::AppConfig(self)
    }

    fn from_cached(value: CachedValue) -> Result<Self, CodecError> {
        match value {
            CachedValue::AppConfig(config) => Ok(config),
            other => Err(unexpected(Self::SHAPE, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use cache::{Codec, ShapeRegistry};
    use model::{EntityKind, Implementation};

    use super::*;

    fn codec() -> Codec<CachedValue> {
        Codec::new(ShapeRegistry::builder().register_all::<CachedValue>().build()).unwrap()
    }

    #[test]
    fn shape_names_match_variants() {
        for value in [
            CachedValue::Idioms(vec![]),
            CachedValue::Strings(vec![]),
            CachedValue::StringSet(HashMap::new()),
            CachedValue::AppConfig(ApplicationConfig::default()),
        ] {
            assert!(CachedValue::SHAPES.contains(&value.shape()));
        }
    }

    #[test]
    fn keyed_idiom_survives_the_codec() {
        let key = EntityKey::new(EntityKind::Idiom, 3);
        let idiom = Idiom::new(42, "swap").with_implementation(Implementation::new(
            100,
            "go",
            "a, b = b, a",
        ));
        let codec = codec();

        let bytes = codec
            .encode(&(key, idiom.clone()).into_cached())
            .unwrap();
        let decoded = <(EntityKey, Idiom)>::from_cached(codec.decode(&bytes).unwrap()).unwrap();

        assert_eq!(decoded, (key, idiom));
    }

    #[test]
    fn string_set_survives_the_codec() {
        let impl_ids = HashMap::from([("5".to_string(), true), ("7".to_string(), true)]);
        let codec = codec();

        let bytes = codec.encode(&impl_ids.clone().into_cached()).unwrap();
        let value = codec.decode(&bytes).unwrap();
        assert_eq!(value.shape(), "string-set");
        assert_eq!(HashMap::<String, bool>::from_cached(value).unwrap(), impl_ids);

        let err = Vec::<String>::from_cached(CachedValue::StringSet(impl_ids)).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnexpectedShape {
                expected: "strings",
                found: "string-set"
            }
        ));
    }

    #[test]
    fn wrong_variant_is_rejected() {
        let err = Vec::<Idiom>::from_cached(CachedValue::Strings(vec!["go".into()])).unwrap_err();
        assert!(matches!(
            err,
            CodecError::UnexpectedShape {
                expected: "idioms",
                found: "strings"
            }
        ));
    }
}
