use core::ptr::{self, NonNull};

use crate::callable::Callable;
use crate::space::Space;

/// The dispatch interface of a stored callable once its concrete type is forgotten.
///
/// There is exactly one implementation, the blanket one below, so every concrete callable type
/// gets a single set of these operations.
pub(crate) trait Erased<Args, R> {
    fn invoke(&mut self, args: Args) -> R;

    /// Moves the payload into `dst`.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of the concrete type and must not overlap `self`. The
    /// payload at `self` is vacated: it must not be used or dropped afterwards.
    unsafe fn relocate(&mut self, dst: NonNull<Space>);

    /// Drops the payload in place.
    ///
    /// # Safety
    ///
    /// The payload must not be used or dropped again. Only valid for payloads that do not own
    /// their allocation, i.e. inline ones.
    unsafe fn destroy(&mut self);
}

impl<F, Args, R> Erased<Args, R> for F
where
    F: Callable<Args, R>,
{
    #[inline]
    fn invoke(&mut self, args: Args) -> R {
        self.call_mut(args)
    }

    unsafe fn relocate(&mut self, dst: NonNull<Space>) {
        // SAFETY: caller guarantees `dst` is writable and disjoint.
        unsafe { ptr::copy_nonoverlapping(ptr::from_mut(self), dst.cast::<F>().as_ptr(), 1) }
    }

    unsafe fn destroy(&mut self) {
        // SAFETY: caller guarantees the payload is live and never touched again.
        unsafe { ptr::drop_in_place(ptr::from_mut(self)) }
    }
}

/// Turns the address of an inline buffer holding an `F` into a dispatch pointer.
///
/// An inline handle stores this function instead of a pointer, so the wrapper can be moved
/// around freely without its handle going stale.
pub(crate) type Locate<'a, Args, R> = fn(NonNull<Space>) -> NonNull<dyn Erased<Args, R> + 'a>;

pub(crate) fn locate<'a, F, Args, R>(space: NonNull<Space>) -> NonNull<dyn Erased<Args, R> + 'a>
where
    F: Callable<Args, R> + 'a,
{
    space.cast::<F>()
}
