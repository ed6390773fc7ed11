//! Interrupt handler table
use core::{cell::Cell, fmt};

/// An interrupt service routine object.
///
/// Drivers with per-instance state (e.g., a UART channel and its buffers)
/// implement this trait and install a reference to themselves with
/// [`Handler::Isr`].
pub trait Isr {
    /// Service the interrupt. Called in an interrupt context.
    fn service(&self);
}

/// The handler installed for an interrupt source.
#[derive(Clone, Copy)]
pub enum Handler {
    /// No handler is installed.
    Unhandled,
    /// A plain function.
    Fn(fn()),
    /// A driver object.
    Isr(&'static (dyn Isr + Sync)),
}

impl Handler {
    /// Return `true` if this is [`Handler::Unhandled`].
    #[inline]
    pub fn is_unhandled(&self) -> bool {
        matches!(self, Self::Unhandled)
    }

    /// Call the handler. Returns `false` if this is [`Handler::Unhandled`].
    #[inline]
    pub fn call(&self) -> bool {
        match self {
            Self::Unhandled => false,
            Self::Fn(f) => {
                f();
                true
            }
            Self::Isr(isr) => {
                isr.service();
                true
            }
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unhandled => f.write_str("Unhandled"),
            Self::Fn(x) => f.debug_tuple("Fn").field(&(*x as *const ())).finish(),
            Self::Isr(x) => f
                .debug_tuple("Isr")
                .field(&(*x as *const (dyn Isr + Sync) as *const ()))
                .finish(),
        }
    }
}

/// A table mapping `N` interrupt sources to [`Handler`]s.
///
/// Entries are never removed, only replaced; the last write wins.
pub struct HandlerTable<const N: usize> {
    handlers: [Cell<Handler>; N],
}

// Safety: Entries are `Copy` and replaced by single word-sized stores, and
//         handlers are installed by initialization code before the
//         corresponding source is enabled.
unsafe impl<const N: usize> Sync for HandlerTable<N> {}

impl<const N: usize> HandlerTable<N> {
    /// The number of interrupt sources.
    pub const LEN: usize = N;

    /// Construct a table in which every entry is [`Handler::Unhandled`].
    pub const fn new() -> Self {
        Self {
            handlers: [const { Cell::new(Handler::Unhandled) }; N],
        }
    }

    /// Install `handler` for `source`.
    ///
    /// # Panics
    ///
    /// Panics if `source >= N`.
    #[inline]
    pub fn set(&self, source: usize, handler: Handler) {
        self.handlers[source].set(handler);
    }

    /// Get the handler installed for `source`, or [`Handler::Unhandled`] if
    /// `source` is out of range.
    #[inline]
    pub fn get(&self, source: usize) -> Handler {
        self.handlers
            .get(source)
            .map_or(Handler::Unhandled, Cell::get)
    }

    /// Call the handler installed for `source`. Returns `false` if there is
    /// none.
    #[inline]
    pub fn dispatch(&self, source: usize) -> bool {
        self.get(source).call()
    }
}

impl<const N: usize> Default for HandlerTable<N> {
    fn default() -> Self {
        Self::new()
    }
}
