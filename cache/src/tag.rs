/// A closed set of payload variants that can be stored in the cache.
///
/// Every variant reports a stable shape name. The names double as the
/// discriminator checked by [`crate::Codec`] against its
/// [`crate::ShapeRegistry`].
pub trait Shaped {
    /// Shape names of every variant, in declaration order.
    const SHAPES: &'static [&'static str];

    fn shape(&self) -> &'static str;
}
