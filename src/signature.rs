use crate::{error::FunctorError, functor::StaticFunctor};

mod private {
    pub trait Sealed {}
}

/// Call signature of a [`StaticFunctor`], written as the plain function pointer type
/// of that signature, e.g. `fn(i32) -> i32`.
///
/// Implemented for function pointer types with up to 8 arguments.
/// Argument types must be nameable without a higher-ranked lifetime,
/// i.e. `fn(&'static str)` works, `fn(&str)` does not.
///
/// # Safety
///
/// Sealed. [`dispatch`] forwards the arguments to the trampoline verbatim,
/// and [`FN_POINTER`] is the trampoline [`StaticFunctor`] relies on for function pointers.
///
/// [`StaticFunctor`]: struct.StaticFunctor.html
/// [`dispatch`]: #tymethod.dispatch
/// [`FN_POINTER`]: #associatedconstant.FN_POINTER
pub unsafe trait Signature: Copy + private::Sealed {
    /// Argument types as a tuple.
    type Args;
    /// Return type.
    type Output;
    /// `unsafe fn(*const u8, A1, .., Ak) -> R`.
    ///
    /// Gets passed the address of the functor's storage buffer and the call arguments.
    type Trampoline: Copy;

    /// Trampoline which reads a `Self` function pointer out of the storage buffer
    /// and calls it, dropping the storage argument.
    const FN_POINTER: Self::Trampoline;

    /// Calls `trampoline` with `data` and the unpacked `args`.
    ///
    /// # Safety
    ///
    /// `data` must point to the storage `trampoline` was installed for.
    unsafe fn dispatch(trampoline: Self::Trampoline, data: *const u8, args: Self::Args) -> Self::Output;
}

/// A callable value a [`StaticFunctor`] with signature `S` may store.
///
/// Implemented for every `Copy` closure, function item and function pointer
/// whose `Fn` signature matches `S`.
///
/// # Safety
///
/// [`TRAMPOLINE`] must read a `Self` from the (possibly unaligned) storage address
/// it's passed, and invoke it with the forwarded arguments.
///
/// [`StaticFunctor`]: struct.StaticFunctor.html
/// [`TRAMPOLINE`]: #associatedconstant.TRAMPOLINE
pub unsafe trait Callable<S: Signature>: Copy {
    const TRAMPOLINE: S::Trampoline;
}

macro_rules! signature {
    ($arity:ident; $($a:ident: $A:ident),*) => {
        mod $arity {
            use std::ptr;

            pub(super) unsafe fn invoke<F, R, $($A),*>(data: *const u8, $($a: $A),*) -> R
            where
                F: Fn($($A),*) -> R + Copy,
            {
                // Storage is a plain byte buffer, so `F` may be misaligned in it.
                let f = ptr::read_unaligned(data.cast::<F>());
                f($($a),*)
            }

            pub(super) unsafe fn fn_pointer<R, $($A),*>(data: *const u8, $($a: $A),*) -> R {
                let f = ptr::read_unaligned(data.cast::<fn($($A),*) -> R>());
                f($($a),*)
            }
        }

        impl<R, $($A),*> private::Sealed for fn($($A),*) -> R {}

        unsafe impl<R, $($A),*> Signature for fn($($A),*) -> R {
            type Args = ($($A,)*);
            type Output = R;
            type Trampoline = unsafe fn(*const u8, $($A),*) -> R;

            const FN_POINTER: Self::Trampoline = $arity::fn_pointer::<R, $($A),*>;

            #[inline]
            unsafe fn dispatch(trampoline: Self::Trampoline, data: *const u8, args: Self::Args) -> R {
                let ($($a,)*) = args;
                trampoline(data, $($a),*)
            }
        }

        unsafe impl<F, R, $($A),*> Callable<fn($($A),*) -> R> for F
        where
            F: Fn($($A),*) -> R + Copy,
        {
            const TRAMPOLINE: unsafe fn(*const u8, $($A),*) -> R = $arity::invoke::<F, R, $($A),*>;
        }

        impl<const N: usize, R, $($A),*> StaticFunctor<N, fn($($A),*) -> R> {
            /// Calls the stored callable with the passed arguments.
            ///
            /// # Panics
            ///
            /// Panics if the functor is empty.
            #[inline]
            pub fn call(&self, $($a: $A),*) -> R {
                self.call_with(($($a,)*))
            }

            /// Calls the stored callable with the passed arguments,
            /// or returns [`FunctorError::Empty`] if the functor is empty.
            ///
            /// [`FunctorError::Empty`]: enum.FunctorError.html#variant.Empty
            #[inline]
            pub fn try_call(&self, $($a: $A),*) -> Result<R, FunctorError> {
                self.try_call_with(($($a,)*))
            }
        }
    };
}

signature!(arity0;);
signature!(arity1; a1: A1);
signature!(arity2; a1: A1, a2: A2);
signature!(arity3; a1: A1, a2: A2, a3: A3);
signature!(arity4; a1: A1, a2: A2, a3: A3, a4: A4);
signature!(arity5; a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
signature!(arity6; a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
signature!(arity7; a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
signature!(arity8; a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7, a8: A8);

#[cfg(test)]
mod tests {
    use {super::*, std::ptr};

    fn trampoline_of<S: Signature, F: Callable<S>>(_f: &F) -> S::Trampoline {
        F::TRAMPOLINE
    }

    fn add(lhs: u32, rhs: u32) -> u32 {
        lhs + rhs
    }

    #[test]
    fn fn_pointer_trampoline() {
        let f: fn(u32, u32) -> u32 = add;

        let result = unsafe {
            <fn(u32, u32) -> u32 as Signature>::dispatch(
                <fn(u32, u32) -> u32 as Signature>::FN_POINTER,
                &f as *const _ as *const u8,
                (3, 4),
            )
        };

        assert_eq!(result, 7);
    }

    #[test]
    fn callable_trampoline() {
        let base = 10u32;
        let f = move |arg: u32| base * arg;

        let trampoline = trampoline_of::<fn(u32) -> u32, _>(&f);

        let result = unsafe { trampoline(&f as *const _ as *const u8, 5) };

        assert_eq!(result, 50);
    }

    #[test]
    fn unaligned_storage() {
        // One leading byte pushes the `u64` capture off its natural alignment.
        let base = 0x0102_0304_0506_0708u64;
        let f = move || base;

        let mut bytes = [0u8; 1 + std::mem::size_of::<u64>()];

        unsafe {
            ptr::copy_nonoverlapping(
                &f as *const _ as *const u8,
                bytes.as_mut_ptr().add(1),
                std::mem::size_of_val(&f),
            );
        }

        let trampoline = trampoline_of::<fn() -> u64, _>(&f);

        assert_eq!(unsafe { trampoline(bytes.as_ptr().add(1)) }, base);
    }
}
