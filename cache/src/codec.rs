use std::{marker::PhantomData, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};

use crate::{CodecError, ShapeRegistry, Shaped};

/// Turns cache payloads into opaque bytes (MessagePack) and back.
///
/// A codec can only be built over a registry that knows every shape of `P`,
/// so an unregistered payload is reported once, at construction, instead of
/// on some later cache write.
pub struct Codec<P> {
    registry: Arc<ShapeRegistry>,
    _payload: PhantomData<fn() -> P>,
}

impl<P> Codec<P>
where
    P: Shaped + Serialize + DeserializeOwned,
{
    pub fn new(registry: ShapeRegistry) -> Result<Self, CodecError> {
        if let Some(shape) = registry.missing::<P>() {
            return Err(CodecError::UnregisteredShape(shape));
        }

        Ok(Self {
            registry: Arc::new(registry),
            _payload: PhantomData,
        })
    }

    #[inline]
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    pub fn encode(&self, value: &P) -> Result<Vec<u8>, CodecError> {
        debug_assert!(self.registry.contains(value.shape()));
        Ok(rmp_serde::to_vec_named(value)?)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<P, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl<P> Clone for Codec<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            _payload: PhantomData,
        }
    }
}
