/// Error returned by the checked [`StaticFunctor`] calls.
///
/// [`StaticFunctor`]: struct.StaticFunctor.html
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FunctorError {
    /// The functor holds no callable.
    #[error("tried to call an empty `StaticFunctor`")]
    Empty,
}
