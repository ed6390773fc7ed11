//! Reentrant critical sections built on a nesting counter.
//!
//! The hardware interrupt mask is only touched when the nesting depth crosses
//! [`NO_CRITICAL_NESTING`]. Nested regions, whether opened by task code or by
//! a handler of a nestable interrupt, only move the counter. The counter is
//! part of every saved task context, so each task carries its own depth
//! across context switches.
use core::cell::UnsafeCell;

use crate::utils::Init;

/// The nesting depth meaning "not inside a critical section". Interrupts are
/// enabled whenever the counter holds this value.
pub const NO_CRITICAL_NESTING: u32 = 0;

/// The boot value of the counter. Interrupts are not managed by the counter
/// yet (they stay masked until the first task is dispatched with a saved
/// depth of [`NO_CRITICAL_NESTING`]).
pub const UNMANAGED_CRITICAL_NESTING: u32 = 9999;

/// Privileged access to a processor's interrupt mask.
///
/// Both interrupt classes (normal and fast) are affected by every method.
pub trait InterruptMask {
    /// The mask bits observed by [`Self::disable_interrupts`].
    type Prior: Copy;

    /// Mask both interrupt classes and return the previous mask bits.
    fn disable_interrupts(&self) -> Self::Prior;

    /// Write back mask bits returned by [`Self::disable_interrupts`]
    /// verbatim.
    fn restore_interrupts(&self, prior: Self::Prior);

    /// Unmask both interrupt classes.
    fn enable_interrupts(&self);
}

/// The process-wide critical section nesting counter.
///
/// This type is `#[repr(transparent)]` so that context switch code written in
/// assembly can load and store it as a plain `u32`.
#[repr(transparent)]
pub struct CriticalNesting {
    depth: UnsafeCell<u32>,
}

// Safety: The counter is only modified with interrupts masked or by its
//         owner's exception entry/exit code on the single core.
unsafe impl Sync for CriticalNesting {}

impl Init for CriticalNesting {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();
}

impl CriticalNesting {
    /// Construct a counter holding [`UNMANAGED_CRITICAL_NESTING`].
    pub const fn new() -> Self {
        Self {
            depth: UnsafeCell::new(UNMANAGED_CRITICAL_NESTING),
        }
    }

    /// Get the current depth.
    #[inline]
    pub fn depth(&self) -> u32 {
        // Safety: Single core, and writers never leave a torn value
        unsafe { *self.depth.get() }
    }

    /// Overwrite the depth. Used when restoring a saved context.
    ///
    /// # Safety
    ///
    /// Interrupts must be masked, and the new depth must be consistent with
    /// the interrupt mask that will be in effect when the caller returns.
    #[inline]
    pub unsafe fn set_depth(&self, depth: u32) {
        unsafe { *self.depth.get() = depth };
    }

    /// Get a raw pointer to the stored depth.
    #[inline]
    pub const fn as_ptr(&self) -> *mut u32 {
        self.depth.get()
    }

    /// Return `true` if the counter reports an open critical section.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.depth() != NO_CRITICAL_NESTING
    }

    /// Open a critical section.
    ///
    /// Interrupts are masked only on the transition out of
    /// [`NO_CRITICAL_NESTING`]. The counter is read while interrupts might
    /// still be enabled, which is fine because any interrupt taken at this
    /// point restores the depth it found before returning.
    #[inline]
    pub fn enter<M: InterruptMask>(&self, mask: &M) {
        let depth = self.depth();
        if depth == NO_CRITICAL_NESTING {
            mask.disable_interrupts();
        }
        debug_assert!(depth < u32::MAX, "critical section nesting overflow");

        // Safety: Interrupts are masked
        unsafe { self.set_depth(depth + 1) };
    }

    /// Close a critical section opened by [`Self::enter`].
    ///
    /// An unbalanced call at [`NO_CRITICAL_NESTING`] does nothing.
    #[inline]
    pub fn exit<M: InterruptMask>(&self, mask: &M) {
        let depth = self.depth();
        if depth > NO_CRITICAL_NESTING {
            // Safety: Interrupts are masked
            unsafe { self.set_depth(depth - 1) };

            if depth - 1 == NO_CRITICAL_NESTING {
                mask.enable_interrupts();
            }
        }
    }
}
