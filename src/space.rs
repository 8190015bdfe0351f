//! Inline storage used by [`MoveOnlyFn`](crate::MoveOnlyFn).
//!
//! A callable is stored inline when it fits in [`CAPACITY`] bytes and needs no more than
//! [`ALIGN`] bytes of alignment. Everything else goes to the heap.
//!
//! A heap-stored callable costs exactly one allocation, with one exception: a zero-sized callable
//! that is aligned more strictly than [`ALIGN`] is reported as heap-stored but, like any
//! zero-sized `Box`, never touches the allocator.

use core::mem::{self, MaybeUninit};

/// Number of bytes available for an inline callable: three machine words.
pub const CAPACITY: usize = 3 * mem::size_of::<usize>();

/// Strictest alignment an inline callable may require.
pub const ALIGN: usize = mem::align_of::<Space>();

/// The raw, uninitialized buffer an inline callable lives in.
///
/// The buffer may be larger than [`CAPACITY`] because of alignment padding; only the first
/// [`CAPACITY`] bytes are ever used.
#[repr(C, align(16))]
pub struct Space {
    _inner: [MaybeUninit<usize>; 3],
}

/// Returns `true` if a callable of type `F` is stored inline.
///
/// The answer depends only on the type, never on the contents of a particular wrapper.
///
/// # Example
///
/// ```
/// use move_only_fn::space::{self, fits_inline};
///
/// assert!(fits_inline::<fn(u32) -> u32>());
/// assert!(fits_inline::<[usize; 3]>());
/// assert!(!fits_inline::<[usize; 4]>());
///
/// #[repr(align(32))]
/// struct OverAligned(u8);
/// assert!(!fits_inline::<OverAligned>());
/// assert_eq!(space::ALIGN, 16);
/// ```
pub const fn fits_inline<F>() -> bool {
    mem::size_of::<F>() <= CAPACITY && mem::align_of::<F>() <= ALIGN
}
