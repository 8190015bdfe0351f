//! Allocation behavior, observed through a counting global allocator.
//!
//! Counters are thread-local, so tests running in parallel do not see each other's allocations.

extern crate move_only_fn;

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use move_only_fn::{space, MoveOnlyFn};

struct CountingAlloc;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static DEALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static FAIL_NEXT: Cell<bool> = const { Cell::new(false) };
    static ZERO_SIZED: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == 0 {
            let _ = ZERO_SIZED.try_with(|count| count.set(count.get() + 1));
        }
        if FAIL_NEXT.try_with(|fail| fail.replace(false)).unwrap_or(false) {
            return std::ptr::null_mut();
        }
        let _ = ALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = DEALLOCATIONS.try_with(|count| count.set(count.get() + 1));
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Counts {
    allocations: usize,
    deallocations: usize,
    zero_sized: usize,
}

fn counts() -> Counts {
    Counts {
        allocations: ALLOCATIONS.with(Cell::get),
        deallocations: DEALLOCATIONS.with(Cell::get),
        zero_sized: ZERO_SIZED.with(Cell::get),
    }
}

/// Runs `f` and returns how many allocations and deallocations it performed.
fn measure<T>(f: impl FnOnce() -> T) -> (T, Counts) {
    let before = counts();
    let out = f();
    let after = counts();
    let delta = Counts {
        allocations: after.allocations - before.allocations,
        deallocations: after.deallocations - before.deallocations,
        zero_sized: after.zero_sized - before.zero_sized,
    };
    (out, delta)
}

fn fail_next_allocation() {
    FAIL_NEXT.with(|fail| fail.set(true));
}

fn fits<F>(_: &F) -> bool {
    space::fits_inline::<F>()
}

const NONE: Counts = Counts {
    allocations: 0,
    deallocations: 0,
    zero_sized: 0,
};

#[test]
fn function_pointer_does_not_allocate() {
    let pointer: fn(i32) -> i32 = |x| x * 2;
    let (result, delta) = measure(|| {
        let mut f: MoveOnlyFn<(i32,), i32> = MoveOnlyFn::new(pointer);
        f.call((5,))
    });
    assert_eq!(result, 10);
    assert_eq!(delta, NONE);
}

#[test]
fn small_captures_do_not_allocate() {
    let value = 42;
    let (result, delta) = measure(|| {
        let mut f: MoveOnlyFn<(i32,), i32> = MoveOnlyFn::new(move |x: i32| x + value);
        f.call((8,))
    });
    assert_eq!(result, 50);
    assert_eq!(delta, NONE);
}

#[test]
fn exact_capacity_stays_inline() {
    let words = [1usize, 2, 3];
    let closure = move || words[0] + words[1] + words[2];
    assert!(fits(&closure));

    let (result, delta) = measure(move || {
        let mut f: MoveOnlyFn<(), usize> = MoveOnlyFn::new(closure);
        assert!(f.is_inline());
        f.call(())
    });
    assert_eq!(result, 6);
    assert_eq!(delta, NONE);
}

#[test]
fn one_byte_over_capacity_allocates_once() {
    let words = [1usize, 2, 3];
    let extra = 4u8;
    let closure = move || words[2] + usize::from(extra);
    assert!(!fits(&closure));

    let (result, delta) = measure(move || {
        let mut f: MoveOnlyFn<(), usize> = MoveOnlyFn::new(closure);
        assert!(f.is_heap());
        f.call(())
    });
    assert_eq!(result, 7);
    assert_eq!(
        delta,
        Counts {
            allocations: 1,
            deallocations: 1,
            zero_sized: 0,
        }
    );
}

#[test]
fn over_aligned_allocates_once() {
    #[repr(align(32))]
    struct Wide(u8);

    let wide = Wide(42);
    let closure = move || {
        let wide = &wide;
        wide.0
    };
    assert!(!fits(&closure));

    let (result, delta) = measure(move || {
        let mut f: MoveOnlyFn<(), u8> = MoveOnlyFn::new(closure);
        assert!(f.is_heap());
        f.call(())
    });
    assert_eq!(result, 42);
    assert_eq!(
        delta,
        Counts {
            allocations: 1,
            deallocations: 1,
            zero_sized: 0,
        }
    );
}

#[test]
fn moves_of_inline_do_not_allocate() {
    let mut f1: MoveOnlyFn<(i32,), i32> = MoveOnlyFn::new(|x: i32| x * 4);
    let mut f2: MoveOnlyFn<(i32,), i32> = MoveOnlyFn::new(|x: i32| x * 5);

    let (_, delta) = measure(|| {
        let mut taken = f1.take();
        f2.take_from(&mut taken);
        let moved = f2.take();
        f1 = moved;
    });
    assert_eq!(delta, NONE);
    assert!(f2.is_empty());
    assert_eq!(f1.call((3,)), 12);
}

#[test]
fn moves_of_heap_keep_the_allocation() {
    let big = [9i64; 8];
    let (_, delta) = measure(|| {
        let mut f: MoveOnlyFn<(), i64> = MoveOnlyFn::new(move || big[0]);
        let mut g = f.take();
        let mut h = MoveOnlyFn::EMPTY;
        h.take_from(&mut g);
        assert!(f.is_empty() && g.is_empty());
        assert_eq!(h.call(()), 9);
    });
    assert_eq!(
        delta,
        Counts {
            allocations: 1,
            deallocations: 1,
            zero_sized: 0,
        }
    );
}

#[test]
fn swaps_do_not_allocate() {
    let big = [100i32; 16];
    let mut inline_a: MoveOnlyFn<(), i32> = MoveOnlyFn::new(|| 1);
    let mut inline_b: MoveOnlyFn<(), i32> = MoveOnlyFn::new(|| 2);
    let mut heap_a: MoveOnlyFn<(), i32> = MoveOnlyFn::new(move || big[0]);
    let mut heap_b: MoveOnlyFn<(), i32> = MoveOnlyFn::new(move || big[1] + 1);

    let (_, delta) = measure(|| {
        inline_a.swap(&mut inline_b);
        inline_a.swap(&mut heap_a);
        heap_a.swap(&mut heap_b);
        heap_b.swap(&mut inline_b);
    });
    assert_eq!(delta, NONE);

    assert_eq!(inline_a.call(()), 100);
    assert_eq!(inline_b.call(()), 2);
    assert_eq!(heap_a.call(()), 101);
    assert_eq!(heap_b.call(()), 1);
    assert!(inline_a.is_heap() && heap_a.is_heap());
    assert!(inline_b.is_inline() && heap_b.is_inline());
}

#[test]
fn from_box_reuses_allocation() {
    let three = 3;
    let boxed = Box::new(move || three);
    let (result, delta) = measure(move || {
        let mut f: MoveOnlyFn<(), i32> = MoveOnlyFn::from_box(boxed);
        f.call(())
    });
    assert_eq!(result, 3);
    assert_eq!(
        delta,
        Counts {
            allocations: 0,
            deallocations: 1,
            zero_sized: 0,
        }
    );
}

#[test]
fn try_new_reports_allocation_failure() {
    let big = [5u32; 16];
    fail_next_allocation();
    let err = MoveOnlyFn::<(), u32>::try_new(move || big[0]).unwrap_err();
    assert_eq!(err.layout().size(), std::mem::size_of::<[u32; 16]>());

    let recovered = err.into_inner();
    assert_eq!(recovered(), 5);
}

#[test]
fn try_new_inline_ignores_allocator() {
    fail_next_allocation();
    let mut f = MoveOnlyFn::<(), u32>::try_new(|| 1).unwrap();
    assert_eq!(f.call(()), 1);
    FAIL_NEXT.with(|fail| fail.set(false));
}

#[test]
fn failed_try_set_keeps_previous_callable() {
    let mut f: MoveOnlyFn<(), i32> = MoveOnlyFn::new(|| 42);
    let big = [7i32; 16];

    fail_next_allocation();
    let err = f.try_set(move || big[3]).unwrap_err();
    assert!(f.is_inline());
    assert_eq!(f.call(()), 42);

    f.set(err.into_inner());
    assert!(f.is_heap());
    assert_eq!(f.call(()), 7);
}

#[test]
fn over_aligned_zero_sized_never_allocates() {
    #[derive(Clone, Copy)]
    #[repr(align(32))]
    struct Marker;

    let marker = Marker;
    let closure = move || {
        let _ = &marker;
        5u8
    };
    assert_eq!(std::mem::size_of_val(&closure), 0);
    assert!(!fits(&closure));

    let (result, delta) = measure(move || {
        let mut f: MoveOnlyFn<(), u8> = MoveOnlyFn::new(closure);
        assert!(f.is_heap());
        f.call(())
    });
    assert_eq!(result, 5);
    assert_eq!(delta, NONE);

    let (result, delta) = measure(move || {
        // The allocator is never consulted, so an armed failure cannot reach `try_new`.
        fail_next_allocation();
        let mut f = MoveOnlyFn::<(), u8>::try_new(closure).unwrap();
        FAIL_NEXT.with(|fail| fail.set(false));
        assert!(f.is_heap());
        f.call(())
    });
    assert_eq!(result, 5);
    assert_eq!(delta, NONE);

    let (result, delta) = measure(move || {
        let mut f: MoveOnlyFn<(), u8> = MoveOnlyFn::new(|| 1);
        fail_next_allocation();
        f.try_set(closure).unwrap();
        FAIL_NEXT.with(|fail| fail.set(false));
        assert!(f.is_heap());
        f.call(())
    });
    assert_eq!(result, 5);
    assert_eq!(delta, NONE);
}
