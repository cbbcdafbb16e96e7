use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Opaque handle the persistent store hands out for an entity.
///
/// Callers treat it as a token: they get it from a read or a save and pass it
/// back to later writes. Only the store interprets `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    kind: EntityKind,
    id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Idiom,
    Message,
}

impl EntityKey {
    pub fn new(kind: EntityKind, id: i64) -> Self {
        Self { kind, id }
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    #[inline]
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            EntityKind::Idiom => write!(f, "idiom/{}", self.id),
            EntityKind::Message => write!(f, "message/{}", self.id),
        }
    }
}
