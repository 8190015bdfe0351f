use core::fmt;
use core::mem::{self, MaybeUninit};
use core::ptr::NonNull;

use alloc::alloc::{alloc as allocate, Layout};
use alloc::boxed::Box;

use crate::callable::Callable;
use crate::erased::{locate, Erased, Locate};
use crate::error::{AllocError, EmptyError};
use crate::space::{fits_inline, Space};

/// Where the callable of a [`MoveOnlyFn`] currently lives.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Storage {
    /// No callable is held.
    Empty,
    /// The callable lives inside the wrapper.
    Inline,
    /// The callable lives in its own heap allocation.
    Heap,
}

enum Handle<'a, Args, R> {
    Empty,
    Inline(Locate<'a, Args, R>),
    Heap(Box<dyn Erased<Args, R> + 'a>),
}

/// A move-only, type-erased callable that stores small callables inline and falls back to the
/// heap for large ones.
///
/// `Args` is the tuple of parameter types and `R` the return type, so
/// `MoveOnlyFn<(i32, i32), i32>` holds anything callable as `FnMut(i32, i32) -> i32`. A callable
/// is stored inline when [`fits_inline`] says so; see the [`space`](crate::space) module.
///
/// The wrapper is neither `Clone`, `Send` nor `Sync`.
///
/// # Example
///
/// ```
/// use move_only_fn::MoveOnlyFn;
///
/// let offset = 10;
/// let mut add: MoveOnlyFn<(i32,), i32> = MoveOnlyFn::new(move |x: i32| x + offset);
/// assert!(add.is_inline());
/// assert_eq!(add.call((5,)), 15);
///
/// let table = [offset; 16];
/// let mut lookup: MoveOnlyFn<(usize,), i32> = MoveOnlyFn::new(move |i: usize| table[i]);
/// assert!(lookup.is_heap());
/// assert_eq!(lookup.call((3,)), 10);
/// ```
pub struct MoveOnlyFn<'a, Args = (), R = ()> {
    space: MaybeUninit<Space>,
    handle: Handle<'a, Args, R>,
}

impl<'a, Args, R> MoveOnlyFn<'a, Args, R> {
    /// A wrapper that holds no callable.
    pub const EMPTY: Self = MoveOnlyFn {
        space: MaybeUninit::uninit(),
        handle: Handle::Empty,
    };

    /// Stores `callable` inline or on the heap depending on its size and alignment.
    ///
    /// # Example
    ///
    /// ```
    /// use move_only_fn::MoveOnlyFn;
    ///
    /// let mut hello: MoveOnlyFn<(&str,), String> = MoveOnlyFn::new(|name: &str| format!("hello {name}"));
    /// assert_eq!(hello.call(("world",)), "hello world");
    /// ```
    pub fn new<F>(callable: F) -> Self
    where
        F: Callable<Args, R> + 'a,
    {
        if fits_inline::<F>() {
            Self::new_inline(callable)
        } else {
            trace!(
                callable = core::any::type_name::<F>(),
                size = mem::size_of::<F>(),
                align = mem::align_of::<F>(),
                "storing callable on the heap"
            );
            Self::boxed(Box::new(callable))
        }
    }

    /// Like [`new()`](Self::new), but reports a failed heap allocation instead of aborting.
    ///
    /// Callables that fit inline never fail.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`], which gives the callable back, if the allocator is out of memory.
    pub fn try_new<F>(callable: F) -> Result<Self, AllocError<F>>
    where
        F: Callable<Args, R> + 'a,
    {
        if fits_inline::<F>() {
            return Ok(Self::new_inline(callable));
        }

        // Only over-aligned zero-sized types get here without a size; `Box` never allocates
        // for them.
        if mem::size_of::<F>() == 0 {
            return Ok(Self::boxed(Box::new(callable)));
        }

        let layout = Layout::new::<F>();
        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { allocate(layout) }.cast::<F>();
        match NonNull::new(raw) {
            None => {
                debug!(
                    callable = core::any::type_name::<F>(),
                    size = layout.size(),
                    "allocation for callable failed"
                );
                Err(AllocError::new(callable, layout))
            }
            // SAFETY: `ptr` was allocated with the layout of `F`, which `Box` uses as well.
            Some(ptr) => unsafe {
                ptr.as_ptr().write(callable);
                Ok(Self::boxed(Box::from_raw(ptr.as_ptr())))
            },
        }
    }

    /// Adopts a callable that is already on the heap.
    ///
    /// The allocation is reused as is, even if the callable would fit inline.
    ///
    /// # Example
    ///
    /// ```
    /// use move_only_fn::MoveOnlyFn;
    ///
    /// let boxed = Box::new(|| 42);
    /// let mut answer: MoveOnlyFn<(), i32> = MoveOnlyFn::from_box(boxed);
    /// assert!(answer.is_heap());
    /// assert_eq!(answer.call(()), 42);
    /// ```
    pub fn from_box<F>(boxed: Box<F>) -> Self
    where
        F: Callable<Args, R> + 'a,
    {
        trace!(callable = core::any::type_name::<F>(), "adopting boxed callable");
        Self::boxed(boxed)
    }

    fn boxed<F>(boxed: Box<F>) -> Self
    where
        F: Callable<Args, R> + 'a,
    {
        MoveOnlyFn {
            space: MaybeUninit::uninit(),
            handle: Handle::Heap(boxed),
        }
    }

    fn new_inline<F>(callable: F) -> Self
    where
        F: Callable<Args, R> + 'a,
    {
        debug_assert!(fits_inline::<F>());

        let mut this = Self::EMPTY;
        // SAFETY: `fits_inline` guarantees the buffer is large and aligned enough for `F`.
        unsafe { this.space_ptr().cast::<F>().as_ptr().write(callable) };
        this.handle = Handle::Inline(locate::<F, Args, R>);
        this
    }

    /// Calls the held callable.
    ///
    /// # Panics
    ///
    /// Panics if the wrapper is empty. Any panic raised by the callable itself propagates
    /// unchanged and leaves the wrapper holding the same callable.
    #[inline]
    pub fn call(&mut self, args: Args) -> R {
        match self.payload() {
            Some(payload) => payload.invoke(args),
            None => called_empty(),
        }
    }

    /// Calls the held callable, or reports that there is none.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyError`] if the wrapper is empty; `args` are dropped.
    pub fn try_call(&mut self, args: Args) -> Result<R, EmptyError> {
        match self.payload() {
            Some(payload) => Ok(payload.invoke(args)),
            None => Err(EmptyError),
        }
    }

    /// Returns `true` if no callable is held.
    pub fn is_empty(&self) -> bool {
        matches!(self.handle, Handle::Empty)
    }

    /// Returns `true` if the callable lives inside the wrapper.
    pub fn is_inline(&self) -> bool {
        matches!(self.handle, Handle::Inline(_))
    }

    /// Returns true if the callable is heap-allocated
    pub fn is_heap(&self) -> bool {
        matches!(self.handle, Handle::Heap(_))
    }

    /// Reports where the callable currently lives.
    pub fn storage(&self) -> Storage {
        match self.handle {
            Handle::Empty => Storage::Empty,
            Handle::Inline(_) => Storage::Inline,
            Handle::Heap(_) => Storage::Heap,
        }
    }

    /// Drops the held callable, if any, leaving the wrapper empty.
    pub fn reset(&mut self) {
        match mem::replace(&mut self.handle, Handle::Empty) {
            Handle::Empty => {}
            Handle::Inline(locate) => {
                // SAFETY: the tag said the buffer is occupied, and it is already marked empty.
                unsafe { locate(self.space_ptr()).as_mut().destroy() }
            }
            Handle::Heap(boxed) => drop(boxed),
        }
    }

    /// Moves the callable out into a new wrapper, leaving `self` empty.
    ///
    /// An inline callable is relocated into the new wrapper's buffer; a heap callable keeps its
    /// allocation.
    ///
    /// # Example
    ///
    /// ```
    /// use move_only_fn::MoveOnlyFn;
    ///
    /// let mut first: MoveOnlyFn<(), i32> = MoveOnlyFn::new(|| 42);
    /// let mut second = first.take();
    /// assert!(first.is_empty());
    /// assert_eq!(second.call(()), 42);
    /// ```
    pub fn take(&mut self) -> Self {
        let mut taken = Self::EMPTY;
        taken.transfer_from(self);
        taken
    }

    /// Replaces the held callable with the one in `source`, leaving `source` empty.
    ///
    /// The callable previously held by `self` is dropped first.
    pub fn take_from(&mut self, source: &mut Self) {
        self.reset();
        self.transfer_from(source);
    }

    /// Replaces the held callable with `callable`.
    ///
    /// The replacement is fully built before the old callable is touched, so a failure while
    /// building it leaves `self` unchanged.
    pub fn set<F>(&mut self, callable: F)
    where
        F: Callable<Args, R> + 'a,
    {
        let mut replacement = Self::new(callable);
        self.swap(&mut replacement);
    }

    /// Like [`set()`](Self::set), but reports a failed heap allocation.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the allocation fails, in which case `self` still holds, and can
    /// still call, its previous callable.
    ///
    /// # Example
    ///
    /// ```
    /// use move_only_fn::MoveOnlyFn;
    ///
    /// let mut f: MoveOnlyFn<(), i32> = MoveOnlyFn::new(|| 1);
    /// f.try_set(|| 2).unwrap();
    /// assert_eq!(f.call(()), 2);
    /// ```
    pub fn try_set<F>(&mut self, callable: F) -> Result<(), AllocError<F>>
    where
        F: Callable<Args, R> + 'a,
    {
        let mut replacement = Self::try_new(callable)?;
        self.swap(&mut replacement);
        Ok(())
    }

    /// Exchanges the callables of `self` and `other`.
    ///
    /// Never allocates. Inline callables are relocated between the two buffers, heap callables
    /// only change owner.
    ///
    /// # Example
    ///
    /// ```
    /// use move_only_fn::MoveOnlyFn;
    ///
    /// let big = [7usize; 8];
    /// let mut small: MoveOnlyFn<(), usize> = MoveOnlyFn::new(|| 42);
    /// let mut large: MoveOnlyFn<(), usize> = MoveOnlyFn::new(move || big[0]);
    ///
    /// small.swap(&mut large);
    /// assert!(small.is_heap() && large.is_inline());
    /// assert_eq!(small.call(()), 7);
    /// assert_eq!(large.call(()), 42);
    /// ```
    pub fn swap(&mut self, other: &mut Self) {
        match (self.inline_locate(), other.inline_locate()) {
            (Some(mine), Some(theirs)) => {
                let mut temp = MaybeUninit::<Space>::uninit();
                let temp_ptr = NonNull::from(&mut temp).cast::<Space>();

                // SAFETY: each relocation reads an occupied buffer and writes a vacated one;
                // the vacated side is marked before anything else is dispatched.
                unsafe {
                    mine(self.space_ptr()).as_mut().relocate(temp_ptr);
                    self.handle = Handle::Empty;

                    theirs(other.space_ptr()).as_mut().relocate(self.space_ptr());
                    other.handle = Handle::Empty;
                    self.handle = Handle::Inline(theirs);

                    mine(temp_ptr).as_mut().relocate(other.space_ptr());
                    other.handle = Handle::Inline(mine);
                }
            }
            (Some(_), None) => {
                let saved = mem::replace(&mut other.handle, Handle::Empty);
                other.transfer_from(self);
                self.handle = saved;
            }
            (None, Some(_)) => {
                let saved = mem::replace(&mut self.handle, Handle::Empty);
                self.transfer_from(other);
                other.handle = saved;
            }
            (None, None) => mem::swap(&mut self.handle, &mut other.handle),
        }
    }

    /// Moves `source`'s callable into `self`, whose buffer must be vacant.
    fn transfer_from(&mut self, source: &mut Self) {
        debug_assert!(!self.is_inline());

        match mem::replace(&mut source.handle, Handle::Empty) {
            Handle::Empty => {}
            Handle::Inline(locate) => {
                // SAFETY: `source` held an inline callable and is already marked empty, and
                // `self` has no inline callable to overwrite.
                unsafe { locate(source.space_ptr()).as_mut().relocate(self.space_ptr()) };
                self.handle = Handle::Inline(locate);
            }
            Handle::Heap(boxed) => self.handle = Handle::Heap(boxed),
        }
    }

    fn payload(&mut self) -> Option<&mut (dyn Erased<Args, R> + 'a)> {
        match &mut self.handle {
            Handle::Empty => None,
            Handle::Inline(locate) => {
                let locate = *locate;
                let space = NonNull::from(&mut self.space).cast::<Space>();
                // SAFETY: the tag says the buffer holds the callable `locate` was made for.
                Some(unsafe { locate(space).as_mut() })
            }
            Handle::Heap(boxed) => Some(&mut **boxed),
        }
    }

    fn inline_locate(&self) -> Option<Locate<'a, Args, R>> {
        match self.handle {
            Handle::Inline(locate) => Some(locate),
            _ => None,
        }
    }

    fn space_ptr(&mut self) -> NonNull<Space> {
        NonNull::from(&mut self.space).cast::<Space>()
    }
}

/// Exchanges the callables of two wrappers, see [`MoveOnlyFn::swap()`].
pub fn swap<'a, Args, R>(lhs: &mut MoveOnlyFn<'a, Args, R>, rhs: &mut MoveOnlyFn<'a, Args, R>) {
    lhs.swap(rhs);
}

#[cold]
#[inline(never)]
#[track_caller]
fn called_empty() -> ! {
    panic!("called `MoveOnlyFn::call()` on an empty `MoveOnlyFn`")
}

impl<Args, R> Default for MoveOnlyFn<'_, Args, R> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<'a, Args, R, F> From<Option<F>> for MoveOnlyFn<'a, Args, R>
where
    F: Callable<Args, R> + 'a,
{
    fn from(callable: Option<F>) -> Self {
        match callable {
            Some(callable) => Self::new(callable),
            None => Self::EMPTY,
        }
    }
}

impl<Args, R> Drop for MoveOnlyFn<'_, Args, R> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<Args, R> fmt::Debug for MoveOnlyFn<'_, Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MoveOnlyFn").field(&self.storage()).finish()
    }
}
