use core::alloc::Layout;
use core::fmt;

/// Error returned by [`MoveOnlyFn::try_call()`] when the wrapper holds no callable.
///
/// [`MoveOnlyFn::try_call()`]: crate::MoveOnlyFn::try_call()
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EmptyError;

impl fmt::Display for EmptyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("called an empty `MoveOnlyFn`")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EmptyError {}

/// Error returned when the heap allocation for a large callable fails.
///
/// The callable that could not be stored is handed back, see [`AllocError::into_inner()`].
pub struct AllocError<F> {
    callable: F,
    layout: Layout,
}

impl<F> AllocError<F> {
    pub(crate) fn new(callable: F, layout: Layout) -> Self {
        AllocError { callable, layout }
    }

    /// The layout of the allocation that failed.
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Gives back the callable that could not be stored.
    pub fn into_inner(self) -> F {
        self.callable
    }
}

impl<F> fmt::Debug for AllocError<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocError")
            .field("callable", &core::any::type_name::<F>())
            .field("layout", &self.layout)
            .finish()
    }
}

impl<F> fmt::Display for AllocError<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate {} bytes aligned to {} for a callable",
            self.layout.size(),
            self.layout.align()
        )
    }
}

#[cfg(feature = "std")]
impl<F> std::error::Error for AllocError<F> {}
