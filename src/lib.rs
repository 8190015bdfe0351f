//! # MoveOnlyFn: Small Callables Without Allocation
//!
//! [`MoveOnlyFn`] is a move-only alternative to `Box<dyn FnMut>` that stores small callables
//! inside the wrapper itself and only falls back to a heap allocation for callables that are too
//! large or too strictly aligned.
//!
//! ## Core Concept
//!
//! A `Box<dyn FnMut(..)>` always heap-allocates, even for a function pointer or a closure that
//! captures a single integer. [`MoveOnlyFn`] reserves three machine words of suitably aligned
//! inline space and only allocates when a callable does not fit.
//!
//! The call signature is part of the type: `Args` is the tuple of parameter types and `R` the
//! return type.
//!
//! ```rust
//! use move_only_fn::MoveOnlyFn;
//!
//! // Small callables are stored inline
//! let mut add: MoveOnlyFn<(i32, i32), i32> = MoveOnlyFn::new(|a: i32, b: i32| a + b);
//! assert!(add.is_inline());
//! assert_eq!(add.call((2, 3)), 5);
//!
//! // Large callables automatically use a heap allocation
//! let weights = [0.5f64; 8];
//! let mut score: MoveOnlyFn<(usize,), f64> = MoveOnlyFn::new(move |i: usize| weights[i] * 2.0);
//! assert!(score.is_heap());
//! assert_eq!(score.call((1,)), 1.0);
//! ```
//!
//! ## Move-only
//!
//! The wrapper never copies its callable, so callables that own resources work as expected:
//!
//! ```rust
//! use move_only_fn::MoveOnlyFn;
//!
//! let owned = Box::new(5);
//! let mut f: MoveOnlyFn<(i32,), i32> = MoveOnlyFn::new(move |a: i32| a + *owned);
//!
//! let mut g = f.take();
//! assert!(f.is_empty());
//! assert_eq!(g.call((10,)), 15);
//! ```
//!
//! Calling an empty wrapper is a programming error and panics; use
//! [`MoveOnlyFn::try_call()`] when emptiness is expected.
//!
//! ## Configuration
//!
//! ### Feature Flags
//!
//! - **`std`** (enabled by default)
//!   - Implements `std::error::Error` for the error types
//!   - Disable for `#![no_std]` environments: `default-features = false`
//!
//! - **`tracing`** (optional)
//!   - Emits `tracing` events when a callable falls back to the heap or an allocation fails
//!
//! ### Inline Space
//!
//! The inline capacity and alignment are fixed, see the [`space`] module. A callable whose
//! alignment exceeds [`space::ALIGN`] is heap-allocated regardless of its size.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::as_conversions)]

extern crate alloc;

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($arg)*);
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::debug!($($arg)*);
    };
}

mod callable;
mod erased;
mod error;
mod move_only_fn;
pub mod space;

pub use crate::callable::Callable;
pub use crate::error::{AllocError, EmptyError};
pub use crate::move_only_fn::{swap, MoveOnlyFn, Storage};
