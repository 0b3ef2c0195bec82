//! Compile-time capacity assertions.
//!
//! Both assertions are associated constants which only fire when referenced
//! with concrete parameters, i.e. at monomorphization or during const evaluation:
//!
//! ```ignore
//! let () = <T as AssertFits<SIZE>>::ASSERT;
//! ```

use std::mem::size_of;

/// Asserts that a type is *within* a number of bytes (i.e. `size_of::<T>() <= SIZE`).
///
/// # Safety
///
/// The assertion **does not trigger** unless the `ASSERT` associated constant is used.
pub(crate) unsafe trait AssertFits<const SIZE: usize>: Sized {
    const ASSERT: () = assert!(
        size_of::<Self>() <= SIZE,
        "callable does not fit into the `StaticFunctor` storage (check its capacity)"
    );
}

unsafe impl<T: Sized, const SIZE: usize> AssertFits<SIZE> for T {}

/// Asserts that a functor with capacity `FROM` may be copied into one with capacity `TO`.
pub(crate) struct AssertCapacity<const FROM: usize, const TO: usize>;

impl<const FROM: usize, const TO: usize> AssertCapacity<FROM, TO> {
    pub(crate) const ASSERT: () = assert!(
        FROM <= TO,
        "cannot copy a larger `StaticFunctor` into a smaller one"
    );
}
