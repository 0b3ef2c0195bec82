use {
    crate::{
        assert::{AssertCapacity, AssertFits},
        error::FunctorError,
        signature::{Callable, Signature},
    },
    std::{
        any::type_name,
        fmt,
        marker::PhantomData,
        mem::{size_of, MaybeUninit},
        ptr,
        sync::atomic::{compiler_fence, Ordering},
    },
};

/// The "no value" marker.
///
/// Storing it [`clears`] a [`StaticFunctor`]; comparing a functor against it checks [`is_clear`].
///
/// [`clears`]: struct.StaticFunctor.html#method.set_null
/// [`StaticFunctor`]: struct.StaticFunctor.html
/// [`is_clear`]: struct.StaticFunctor.html#method.is_clear
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Null;

/// Fixed-capacity, allocation-free wrapper for a callable with signature `S`.
///
/// Stores a byte-for-byte copy of a `Copy` closure / function pointer whose size is
/// at most `N` bytes, next to a trampoline function pointer which knows how to
/// read it back out of the buffer and call it.
///
/// The functor itself is `Copy`; copies never alias.
///
/// ```
/// use static_functor::StaticFunctor;
///
/// fn double_it(x: i32) -> i32 {
///     x * 2
/// }
///
/// let offset = 5;
/// let mut f = StaticFunctor::<16, fn(i32) -> i32>::from_callable(move |x: i32| x + offset);
/// assert_eq!(f.call(10), 15);
///
/// f.set_fn(double_it);
/// assert_eq!(f.call(10), 20);
/// ```
///
/// Closure argument types must be annotated, they are not inferred from `S`.
///
/// # Capacity
///
/// Storing a callable larger than `N` bytes fails to compile:
///
/// ```compile_fail
/// use static_functor::StaticFunctor;
///
/// const TOO_LARGE: StaticFunctor<4, fn(u8) -> u8> = {
///     let bytes = [1u8; 5];
///     StaticFunctor::from_callable(move |x: u8| x.wrapping_add(bytes[0]))
/// };
///
/// let _f = TOO_LARGE;
/// ```
///
/// A callable of exactly `N` bytes is fine:
///
/// ```
/// use static_functor::StaticFunctor;
///
/// const EXACT: StaticFunctor<4, fn(u8) -> u8> = {
///     let bytes = [1u8; 4];
///     StaticFunctor::from_callable(move |x: u8| x.wrapping_add(bytes[3]))
/// };
///
/// assert_eq!(EXACT.call(1), 2);
/// ```
///
/// # Panics
///
/// Calling an empty functor via [`call`] / [`call_with`] panics;
/// use [`try_call`] / [`try_call_with`] or check [`is_clear`] first.
///
/// [`call`]: #method.call
/// [`call_with`]: #method.call_with
/// [`try_call`]: #method.try_call
/// [`try_call_with`]: #method.try_call_with
/// [`is_clear`]: #method.is_clear
#[repr(C)]
pub struct StaticFunctor<const N: usize, S: Signature> {
    trampoline: Option<S::Trampoline>, // offs 0b          size 4b / 8b
    storage: MaybeUninit<[u8; N]>,     // offs 4b / 8b     size N
    _signature: PhantomData<S>,
}

impl<const N: usize, S: Signature> StaticFunctor<N, S> {
    /// Storage capacity in bytes.
    pub const CAPACITY: usize = N;

    /// Creates an empty [`StaticFunctor`].
    ///
    /// [`StaticFunctor`]: struct.StaticFunctor.html
    pub const fn new() -> Self {
        Self {
            trampoline: None,
            storage: MaybeUninit::uninit(),
            _signature: PhantomData,
        }
    }

    /// Creates a functor which contains the callable `f`.
    ///
    /// Fails to compile if `f` is larger than `N` bytes.
    pub const fn from_callable<F>(f: F) -> Self
    where
        F: Callable<S> + Send + Sync + 'static,
    {
        let () = <F as AssertFits<N>>::ASSERT;

        Self {
            trampoline: Some(F::TRAMPOLINE),
            storage: Self::copy_value(&f),
            _signature: PhantomData,
        }
    }

    /// Creates a functor which contains the function pointer `f`.
    pub const fn from_fn(f: S) -> Self {
        let () = <S as AssertFits<N>>::ASSERT;

        Self {
            trampoline: Some(S::FN_POINTER),
            storage: Self::copy_value(&f),
            _signature: PhantomData,
        }
    }

    /// Creates a functor which behaves exactly like `other`.
    ///
    /// Fails to compile if `other`'s capacity `M` is larger than `N`:
    ///
    /// ```compile_fail
    /// use static_functor::StaticFunctor;
    ///
    /// const LARGE: StaticFunctor<16, fn() -> u8> = StaticFunctor::new();
    /// const SMALL: StaticFunctor<8, fn() -> u8> = StaticFunctor::from_functor(&LARGE);
    ///
    /// let _f = SMALL;
    /// ```
    ///
    /// ```
    /// use static_functor::StaticFunctor;
    ///
    /// const SMALL: StaticFunctor<8, fn() -> u8> = StaticFunctor::from_callable(|| 7u8);
    /// const LARGE: StaticFunctor<16, fn() -> u8> = StaticFunctor::from_functor(&SMALL);
    ///
    /// assert_eq!(LARGE.call(), 7);
    /// ```
    pub const fn from_functor<const M: usize>(other: &StaticFunctor<M, S>) -> Self {
        let () = AssertCapacity::<M, N>::ASSERT;

        let mut storage = MaybeUninit::<[u8; N]>::uninit();

        unsafe {
            ptr::copy_nonoverlapping(
                other.storage.as_ptr().cast::<u8>(),
                storage.as_mut_ptr().cast::<u8>(),
                M,
            );
        }

        Self {
            trampoline: other.trampoline,
            storage,
            _signature: PhantomData,
        }
    }

    /// Storage capacity in bytes.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Stores the callable `f`, replacing the previous one, if any.
    ///
    /// Fails to compile if `f` is larger than `N` bytes.
    pub fn set<F>(&mut self, f: F)
    where
        F: Callable<S> + Send + Sync + 'static,
    {
        unsafe { self.set_unbounded(f) }
    }

    /// Stores the callable `f`, replacing the previous one, if any.
    ///
    /// Unlike [`set`], accepts callables with any lifetime and without `Send` / `Sync`.
    ///
    /// Fails to compile if `f` is larger than `N` bytes.
    ///
    /// # Safety
    ///
    /// The caller guarantees that the callable's borrows, if any,
    /// outlive every following call to the functor and to all copies of it.
    /// The caller guarantees the functor is not shared / sent across threads
    /// unless the callable may be.
    ///
    /// [`set`]: #method.set
    pub unsafe fn set_unbounded<F: Callable<S>>(&mut self, f: F) {
        let () = <F as AssertFits<N>>::ASSERT;

        trace!(
            "storing `{}` ({}b) in a {}b `StaticFunctor`",
            type_name::<F>(),
            size_of::<F>(),
            N
        );

        self.store(&f as *const F as *const u8, size_of::<F>(), Some(F::TRAMPOLINE));
    }

    /// Stores the function pointer `f`, replacing the previous callable, if any.
    ///
    /// The pointer itself is stored; calls go through one extra trampoline
    /// which strips the storage argument.
    pub fn set_fn(&mut self, f: S) {
        let () = <S as AssertFits<N>>::ASSERT;

        trace!("storing a function pointer in a {}b `StaticFunctor`", N);

        unsafe {
            self.store(&f as *const S as *const u8, size_of::<S>(), Some(S::FN_POINTER));
        }
    }

    /// Replaces the trampoline with `trampoline`, leaving the storage as is.
    ///
    /// # Safety
    ///
    /// The caller guarantees that `trampoline` may be called with the address of
    /// the current storage contents, whatever they are.
    pub unsafe fn set_trampoline(&mut self, trampoline: S::Trampoline) {
        trace!("installing a raw trampoline in a {}b `StaticFunctor`", N);

        self.trampoline = Some(trampoline);
    }

    /// Clears the functor; same as [`clear`].
    ///
    /// [`clear`]: #method.clear
    pub fn set_null(&mut self, _null: Null) {
        self.clear();
    }

    /// Makes the functor behave exactly like `other`.
    ///
    /// Copies all `M` bytes of `other`'s storage and its trampoline.
    /// Fails to compile if `M` is larger than `N`.
    pub fn copy_from<const M: usize>(&mut self, other: &StaticFunctor<M, S>) {
        let () = AssertCapacity::<M, N>::ASSERT;

        trace!(
            "copying a {}b `StaticFunctor` into a {}b `StaticFunctor`",
            M,
            N
        );

        unsafe {
            self.store(other.storage.as_ptr().cast::<u8>(), M, other.trampoline);
        }
    }

    /// Clears the functor.
    ///
    /// Only the trampoline is reset; storage bytes are left as is.
    pub fn clear(&mut self) {
        trace!("clearing a {}b `StaticFunctor`", N);

        self.trampoline = None;
    }

    /// If the functor holds no callable, returns `true`; otherwise returns `false`.
    pub fn is_clear(&self) -> bool {
        self.trampoline.is_none()
    }

    /// Calls the stored callable with the `args` tuple.
    ///
    /// # Panics
    ///
    /// Panics if the functor is empty.
    #[inline]
    pub fn call_with(&self, args: S::Args) -> S::Output {
        match self.trampoline {
            Some(trampoline) => unsafe {
                S::dispatch(trampoline, self.storage.as_ptr().cast::<u8>(), args)
            },
            None => called_empty(),
        }
    }

    /// Calls the stored callable with the `args` tuple,
    /// or returns [`FunctorError::Empty`] if the functor is empty.
    ///
    /// [`FunctorError::Empty`]: enum.FunctorError.html#variant.Empty
    pub fn try_call_with(&self, args: S::Args) -> Result<S::Output, FunctorError> {
        match self.trampoline {
            Some(trampoline) => Ok(unsafe {
                S::dispatch(trampoline, self.storage.as_ptr().cast::<u8>(), args)
            }),
            None => Err(FunctorError::Empty),
        }
    }

    const fn copy_value<T>(value: &T) -> MaybeUninit<[u8; N]> {
        let mut storage = MaybeUninit::<[u8; N]>::uninit();

        unsafe {
            ptr::copy_nonoverlapping(
                value as *const T as *const u8,
                storage.as_mut_ptr().cast::<u8>(),
                size_of::<T>(),
            );
        }

        storage
    }

    unsafe fn store(&mut self, src: *const u8, len: usize, trampoline: Option<S::Trampoline>) {
        debug_assert!(len <= N);

        // Never leave a stale trampoline pointing at half-copied bytes.
        if cfg!(feature = "reentrant") {
            ptr::write_volatile(&mut self.trampoline, None);
            compiler_fence(Ordering::SeqCst);
        }

        ptr::copy_nonoverlapping(src, self.storage.as_mut_ptr().cast::<u8>(), len);

        if cfg!(feature = "reentrant") {
            compiler_fence(Ordering::Release);
        }

        self.trampoline = trampoline;
    }
}

#[cold]
#[inline(never)]
fn called_empty() -> ! {
    panic!("tried to call an empty `StaticFunctor`")
}

impl<const N: usize, S: Signature> Clone for StaticFunctor<N, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<const N: usize, S: Signature> Copy for StaticFunctor<N, S> {}

impl<const N: usize, S: Signature> Default for StaticFunctor<N, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, S: Signature> From<Null> for StaticFunctor<N, S> {
    fn from(_null: Null) -> Self {
        Self::new()
    }
}

impl<const N: usize, S: Signature> PartialEq<Null> for StaticFunctor<N, S> {
    fn eq(&self, _null: &Null) -> bool {
        self.is_clear()
    }
}

impl<const N: usize, S: Signature> PartialEq<StaticFunctor<N, S>> for Null {
    fn eq(&self, functor: &StaticFunctor<N, S>) -> bool {
        functor.is_clear()
    }
}

impl<const N: usize, S: Signature> fmt::Debug for StaticFunctor<N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFunctor")
            .field("capacity", &N)
            .field("is_clear", &self.is_clear())
            .finish()
    }
}
