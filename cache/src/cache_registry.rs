use std::collections::BTreeSet;

use crate::Shaped;

/// Payload shapes a [`crate::Codec`] is allowed to carry.
///
/// Built once with [`ShapeRegistry::builder`] and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct ShapeRegistry {
    shapes: BTreeSet<&'static str>,
}

impl ShapeRegistry {
    pub fn builder() -> ShapeRegistryBuilder {
        ShapeRegistryBuilder {
            shapes: BTreeSet::new(),
        }
    }

    #[inline]
    pub fn contains(&self, shape: &str) -> bool {
        self.shapes.contains(shape)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.shapes.iter().copied()
    }

    /// The first shape of `P` missing from this registry, if any.
    pub fn missing<P: Shaped>(&self) -> Option<&'static str> {
        P::SHAPES
            .iter()
            .copied()
            .find(|shape| !self.contains(shape))
    }
}

pub struct ShapeRegistryBuilder {
    shapes: BTreeSet<&'static str>,
}

impl ShapeRegistryBuilder {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%shape), skip_all)
    )]
    pub fn register(mut self, shape: &'static str) -> Self {
        if !self.shapes.insert(shape) {
            #[cfg(feature = "tracing")]
            tracing::debug!("shape already registered");
        }
        self
    }

    pub fn register_all<P: Shaped>(self) -> Self {
        P::SHAPES
            .iter()
            .copied()
            .fold(self, |builder, shape| builder.register(shape))
    }

    pub fn build(self) -> ShapeRegistry {
        ShapeRegistry {
            shapes: self.shapes,
        }
    }
}
