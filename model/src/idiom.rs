use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A programming task together with its per-language implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idiom {
    pub id: i64,
    pub title: String,
    pub lead_paragraph: String,
    pub version: i32,
    #[serde(with = "time::serde::timestamp")]
    pub version_date: OffsetDateTime,
    pub rating: i32,
    pub implementations: Vec<Implementation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub id: i64,
    pub lang: String,
    pub code: String,
}

impl Idiom {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            lead_paragraph: String::new(),
            version: 0,
            version_date: OffsetDateTime::UNIX_EPOCH,
            rating: 0,
            implementations: vec![],
        }
    }

    pub fn with_implementation(mut self, implementation: Implementation) -> Self {
        self.implementations.push(implementation);
        self
    }

    pub fn impl_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.implementations.iter().map(|implementation| implementation.id)
    }

    pub fn implementation(&self, impl_id: i64) -> Option<&Implementation> {
        self.implementations
            .iter()
            .find(|implementation| implementation.id == impl_id)
    }

    /// `true` when at least one implementation is written in one of `langs`.
    /// Language tags compare case-insensitively.
    pub fn has_impl_in(&self, langs: &[String]) -> bool {
        self.implementations.iter().any(|implementation| {
            langs
                .iter()
                .any(|lang| lang.eq_ignore_ascii_case(&implementation.lang))
        })
    }

    /// `true` when every word occurs in the title, the lead paragraph or the
    /// code of some implementation.
    pub fn matches_words(&self, words: &[String]) -> bool {
        let title = self.title.to_lowercase();
        let lead = self.lead_paragraph.to_lowercase();
        words.iter().map(|word| word.to_lowercase()).all(|word| {
            title.contains(&word)
                || lead.contains(&word)
                || self
                    .implementations
                    .iter()
                    .any(|implementation| implementation.matches_word(&word))
        })
    }
}

impl Implementation {
    pub fn new(id: i64, lang: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id,
            lang: lang.into(),
            code: code.into(),
        }
    }

    fn matches_word(&self, lowercase_word: &str) -> bool {
        self.code.to_lowercase().contains(lowercase_word)
            || self.lang.eq_ignore_ascii_case(lowercase_word)
    }

    pub fn matches_words(&self, words: &[String]) -> bool {
        words
            .iter()
            .all(|word| self.matches_word(&word.to_lowercase()))
    }
}

/// Sort order of idiom listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdiomOrder {
    #[default]
    Id,
    Title,
    /// Highest rating first.
    Rating,
    /// Most recently edited first.
    Recent,
}

impl IdiomOrder {
    pub fn sort(self, idioms: &mut [Idiom]) {
        match self {
            IdiomOrder::Id => idioms.sort_by_key(|idiom| idiom.id),
            IdiomOrder::Title => idioms.sort_by(|a, b| a.title.cmp(&b.title)),
            IdiomOrder::Rating => {
                idioms.sort_by(|a, b| b.rating.cmp(&a.rating).then(a.id.cmp(&b.id)))
            }
            IdiomOrder::Recent => idioms.sort_by(|a, b| {
                b.version_date.cmp(&a.version_date).then(a.id.cmp(&b.id))
            }),
        }
    }
}

impl Display for IdiomOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IdiomOrder::Id => "id",
            IdiomOrder::Title => "title",
            IdiomOrder::Rating => "-rating",
            IdiomOrder::Recent => "-versionDate",
        };
        f.write_str(s)
    }
}

impl FromStr for IdiomOrder {
    type Err = ParseIdiomOrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "id" | "Id" => Ok(IdiomOrder::Id),
            "title" | "Title" => Ok(IdiomOrder::Title),
            "-rating" | "-Rating" | "rating" => Ok(IdiomOrder::Rating),
            "-versionDate" | "-VersionDate" | "recent" => Ok(IdiomOrder::Recent),
            _ => Err(ParseIdiomOrderError(s.to_string())),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error(r#"invalid idiom order :: {0} :: expected "id", "title", "-rating", "-versionDate""#)]
pub struct ParseIdiomOrderError(String);
