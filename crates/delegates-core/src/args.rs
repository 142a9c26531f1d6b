//! Argument-list plumbing shared by every callable variant
//!
//! Delegate signatures are written as tuples: a delegate taking `(f32, i32)`
//! is executed with `execute((1.0, 2))`. A binding may carry a payload tuple
//! of extra arguments that is appended after the caller's arguments on every
//! call:
//!
//! ```text
//! caller args (A1, A2) ++ payload (P1,)  ->  target(A1, A2, P1)
//! ```
//!
//! [`Append`] joins the two tuples, [`Invoke`] calls a function or closure
//! with a joined tuple, and [`InvokeMethod`] / [`InvokeMethodMut`] do the same
//! for functions whose first parameter is a receiver.
//!
//! Caller lists and payloads each go up to four elements, and targets up to
//! eight parameters (plus the receiver for methods).

/// Concatenate `self` with a payload tuple
pub trait Append<P> {
    type Output;

    fn append(self, payload: P) -> Self::Output;
}

/// Call `self` with the elements of `Args` as separate arguments
pub trait Invoke<Args, R> {
    fn invoke(&mut self, args: Args) -> R;
}

/// Call `self` with a shared receiver followed by the elements of `Args`
///
/// Implemented by any `Fn(&T, A1, ..) -> R`, so both method paths
/// (`Counter::get`) and closures taking the receiver first work.
pub trait InvokeMethod<T: ?Sized, Args, R> {
    fn invoke_method(&self, receiver: &T, args: Args) -> R;
}

/// Like [`InvokeMethod`] with an exclusive receiver (`Fn(&mut T, A1, ..)`)
pub trait InvokeMethodMut<T: ?Sized, Args, R> {
    fn invoke_method_mut(&self, receiver: &mut T, args: Args) -> R;
}

macro_rules! impl_invoke {
    ($($arg:ident),*) => {
        impl<Func, Ret, $($arg,)*> Invoke<($($arg,)*), Ret> for Func
        where
            Func: FnMut($($arg),*) -> Ret,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn invoke(&mut self, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)($($arg),*)
            }
        }

        impl<Func, Recv: ?Sized, Ret, $($arg,)*> InvokeMethod<Recv, ($($arg,)*), Ret> for Func
        where
            Func: Fn(&Recv, $($arg),*) -> Ret,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn invoke_method(&self, receiver: &Recv, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)(receiver, $($arg),*)
            }
        }

        impl<Func, Recv: ?Sized, Ret, $($arg,)*> InvokeMethodMut<Recv, ($($arg,)*), Ret> for Func
        where
            Func: Fn(&mut Recv, $($arg),*) -> Ret,
        {
            #[inline]
            #[allow(non_snake_case)]
            fn invoke_method_mut(&self, receiver: &mut Recv, ($($arg,)*): ($($arg,)*)) -> Ret {
                (self)(receiver, $($arg),*)
            }
        }
    };
}

impl_invoke!();
impl_invoke!(A1);
impl_invoke!(A1, A2);
impl_invoke!(A1, A2, A3);
impl_invoke!(A1, A2, A3, A4);
impl_invoke!(A1, A2, A3, A4, A5);
impl_invoke!(A1, A2, A3, A4, A5, A6);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7);
impl_invoke!(A1, A2, A3, A4, A5, A6, A7, A8);

macro_rules! impl_append {
    ([$($a:ident),*] [$($p:ident),*]) => {
        impl<$($a,)* $($p,)*> Append<($($p,)*)> for ($($a,)*) {
            type Output = ($($a,)* $($p,)*);

            #[inline]
            #[allow(non_snake_case, clippy::unused_unit)]
            fn append(self, ($($p,)*): ($($p,)*)) -> Self::Output {
                let ($($a,)*) = self;
                ($($a,)* $($p,)*)
            }
        }
    };
}

macro_rules! impl_append_payloads {
    ($([$($a:ident),*]),* $(,)?) => {
        $(
            impl_append!([$($a),*] []);
            impl_append!([$($a),*] [P1]);
            impl_append!([$($a),*] [P1, P2]);
            impl_append!([$($a),*] [P1, P2, P3]);
            impl_append!([$($a),*] [P1, P2, P3, P4]);
        )*
    };
}

impl_append_payloads!([], [A1], [A1, A2], [A1, A2, A3], [A1, A2, A3, A4]);

/// Joined argument tuple for caller args `Args` and payload `P`
pub type Joined<Args, P> = <Args as Append<P>>::Output;
