/// A call signature: something that can be called with the tuple `Args` and returns `R`.
///
/// This is implemented for every [`FnMut`] of up to eight parameters, with the parameters
/// written as a tuple: `FnMut(u8, &str) -> bool` is `Callable<(u8, &str), bool>` and
/// `FnMut()` is `Callable<(), ()>`.
///
/// [`MoveOnlyFn`](crate::MoveOnlyFn) deliberately does not implement this trait, so a wrapper
/// can only be built from the callable it should hold, never from another wrapper.
pub trait Callable<Args, R> {
    /// Calls `self` with the unpacked `args`.
    fn call_mut(&mut self, args: Args) -> R;
}

macro_rules! impl_callable {
    {$(
        ($($argument:ident: $param:ident),*);
    )*} => {$(
        impl<Func, R $(, $param)*> Callable<($($param,)*), R> for Func
        where
            Func: FnMut($($param),*) -> R,
        {
            #[inline]
            fn call_mut(&mut self, ($($argument,)*): ($($param,)*)) -> R {
                (self)($($argument),*)
            }
        }
    )*};
}

impl_callable! {
    ();
    (a0: A0);
    (a0: A0, a1: A1);
    (a0: A0, a1: A1, a2: A2);
    (a0: A0, a1: A1, a2: A2, a3: A3);
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4);
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5);
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6);
    (a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7);
}
