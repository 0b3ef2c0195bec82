//! Fixed-capacity, allocation-free callable wrapper.
//!
//! A [`StaticFunctor<N, S>`] stores any `Copy` closure, function item or function pointer
//! with call signature `S` whose captured state fits in `N` bytes,
//! and calls it through a single trampoline function pointer.
//! No heap allocation, no `dyn` vtable, no type tag.
//!
//! ```
//! use static_functor::{Null, StaticFunctor};
//!
//! let mut f = StaticFunctor::<16, fn(i32) -> i32>::new();
//! assert!(f == Null);
//!
//! let offset = 5;
//! f.set(move |x: i32| x + offset);
//! assert_eq!(f.call(10), 15);
//!
//! f.clear();
//! assert!(f.try_call(10).is_err());
//! ```
//!
//! Features:
//! - `reentrant`: assignment resets the trampoline to empty before copying the new bytes.
//! - `trace`: logs assignments via the `log` facade at `trace` level.
//!
//! [`StaticFunctor<N, S>`]: struct.StaticFunctor.html

#[macro_use]
extern crate static_assertions;

// Compiled in every build, emitted only with the `trace` feature.
macro_rules! trace {
    ($($arg:tt)*) => {
        if cfg!(feature = "trace") {
            log::trace!($($arg)*);
        }
    };
}

mod assert;
mod error;
mod functor;
mod signature;

pub use {
    error::FunctorError,
    functor::{Null, StaticFunctor},
    signature::{Callable, Signature},
};

assert_eq_size!(<fn(u32) -> u32 as Signature>::Trampoline, usize);
// `None` is the empty state; it costs no extra tag.
assert_eq_size!(Option<<fn(u32) -> u32 as Signature>::Trampoline>, usize);
assert_eq_size!(Null, ());

// Trampoline followed by exactly `N` storage bytes.
const_assert_eq!(
    std::mem::size_of::<StaticFunctor<16, fn(i32) -> i32>>(),
    std::mem::size_of::<usize>() + 16
);

assert_impl_all!(StaticFunctor<16, fn(i32) -> i32>: Copy, Send, Sync, Default);
assert_impl_all!(FunctorError: std::error::Error, Send, Sync);
