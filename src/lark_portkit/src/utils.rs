//! Utility
use core::cell::{Cell, UnsafeCell};

/// Trait for types having a constant default value. This is essentially a
/// constant version of `Default`.
pub trait Init {
    /// The default value.
    const INIT: Self;
}

impl<T> Init for Option<T> {
    const INIT: Self = None;
}

impl Init for bool {
    const INIT: Self = false;
}

impl Init for u32 {
    const INIT: Self = 0;
}

impl<T> Init for *const T {
    const INIT: Self = core::ptr::null();
}

impl<T> Init for *mut T {
    const INIT: Self = core::ptr::null_mut();
}

impl<T: Init> Init for Cell<T> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Cell::new(T::INIT);
}

impl<T: Init> Init for UnsafeCell<T> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = UnsafeCell::new(T::INIT);
}

impl<T: Init, const LEN: usize> Init for [T; LEN] {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = [const { T::INIT }; LEN];
}
