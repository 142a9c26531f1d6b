//! The four binding strategies behind one call contract
//!
//! | Variant          | Target                         | Owner identity |
//! |------------------|--------------------------------|----------------|
//! | [`FreeFunction`] | `fn`-like, no state            | none           |
//! | [`RawMethod`]    | `Fn(&T, ..)` on a borrowed `T` | receiver addr  |
//! | [`RawMethodMut`] | `Fn(&mut T, ..)` on a raw `T`  | receiver addr  |
//! | [`SharedMethod`] | `Fn(&T, ..)` on `Rc<T>`/`Arc<T>` | receiver addr |
//! | [`Closure`]      | any `FnMut(..)` with captures  | none           |
//!
//! Every variant stores a payload tuple by value and appends a clone of it to
//! the caller's arguments on each call, so repeated calls see the same bound
//! values.
//!
//! # Raw receivers
//!
//! The raw variants hold a bare pointer and never keep the receiver alive.
//! Executing one after its receiver is dropped or moved is undefined
//! behaviour, which is why they can only be built through `unsafe`
//! constructors. Prefer [`SharedMethod`] unless the receiver's lifetime is
//! scoped around the binding.

use core::mem;
use core::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;

use crate::args::{Append, Invoke, InvokeMethod, InvokeMethodMut, Joined};
use crate::owner::OwnerId;

/// Uniform call contract: invocable with `Args`, returns `R`
pub trait Callable<Args, R> {
    /// Call the target with `args` followed by the bound payload.
    fn execute(&mut self, args: Args) -> R;

    /// Address of the bound receiver; `OwnerId::NONE` for non-method bindings.
    fn owner(&self) -> OwnerId {
        OwnerId::NONE
    }
}

/// Free function binding
#[derive(Clone, Copy)]
pub struct FreeFunction<F, P> {
    function: F,
    payload: P,
}

impl<F: Copy, P> FreeFunction<F, P> {
    pub fn new(function: F, payload: P) -> Self {
        Self { function, payload }
    }
}

impl<Args, R, F, P> Callable<Args, R> for FreeFunction<F, P>
where
    Args: Append<P>,
    P: Clone,
    F: Invoke<Joined<Args, P>, R>,
{
    #[inline]
    fn execute(&mut self, args: Args) -> R {
        self.function.invoke(args.append(self.payload.clone()))
    }
}

/// Zero-sized values do not get distinct addresses, so two of them would
/// report the same owner.
///
/// # Safety
///
/// `receiver` must point to a live value.
unsafe fn assert_addressable<T: ?Sized>(receiver: NonNull<T>) {
    assert!(
        mem::size_of_val(receiver.as_ref()) != 0,
        "zero-sized receiver has no distinct owner identity"
    );
}

/// Method binding on a receiver that is borrowed, not owned
pub struct RawMethod<T: ?Sized, M, P> {
    receiver: NonNull<T>,
    method: M,
    payload: P,
}

impl<T: ?Sized, M, P> RawMethod<T, M, P> {
    /// # Safety
    ///
    /// `receiver` must stay valid for shared access, and must not be mutably
    /// borrowed elsewhere while the binding executes, for as long as this
    /// binding (or any clone of it) can still be executed.
    ///
    /// # Panics
    ///
    /// Panics if the receiver is zero-sized.
    pub unsafe fn new(receiver: NonNull<T>, method: M, payload: P) -> Self {
        assert_addressable(receiver);
        Self {
            receiver,
            method,
            payload,
        }
    }
}

impl<T: ?Sized, M: Clone, P: Clone> Clone for RawMethod<T, M, P> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver,
            method: self.method.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<Args, R, T, M, P> Callable<Args, R> for RawMethod<T, M, P>
where
    T: ?Sized,
    Args: Append<P>,
    P: Clone,
    M: InvokeMethod<T, Joined<Args, P>, R>,
{
    #[inline]
    fn execute(&mut self, args: Args) -> R {
        // SAFETY: the receiver outlives the binding per the contract of `new`.
        let receiver = unsafe { self.receiver.as_ref() };
        self.method
            .invoke_method(receiver, args.append(self.payload.clone()))
    }

    fn owner(&self) -> OwnerId {
        OwnerId::from_ptr(self.receiver.as_ptr() as *const T)
    }
}

/// Method binding that mutates a receiver it does not own
pub struct RawMethodMut<T: ?Sized, M, P> {
    receiver: NonNull<T>,
    method: M,
    payload: P,
}

impl<T: ?Sized, M, P> RawMethodMut<T, M, P> {
    /// # Safety
    ///
    /// `receiver` must stay valid for exclusive access for as long as this
    /// binding (or any clone of it) can still be executed, and no other
    /// reference to it may be live while the binding executes.
    ///
    /// # Panics
    ///
    /// Panics if the receiver is zero-sized.
    pub unsafe fn new(receiver: NonNull<T>, method: M, payload: P) -> Self {
        assert_addressable(receiver);
        Self {
            receiver,
            method,
            payload,
        }
    }
}

impl<T: ?Sized, M: Clone, P: Clone> Clone for RawMethodMut<T, M, P> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver,
            method: self.method.clone(),
            payload: self.payload.clone(),
        }
    }
}

impl<Args, R, T, M, P> Callable<Args, R> for RawMethodMut<T, M, P>
where
    T: ?Sized,
    Args: Append<P>,
    P: Clone,
    M: InvokeMethodMut<T, Joined<Args, P>, R>,
{
    #[inline]
    fn execute(&mut self, args: Args) -> R {
        // SAFETY: exclusive access to a live receiver per the contract of `new`.
        let receiver = unsafe { self.receiver.as_mut() };
        self.method
            .invoke_method_mut(receiver, args.append(self.payload.clone()))
    }

    fn owner(&self) -> OwnerId {
        OwnerId::from_ptr(self.receiver.as_ptr() as *const T)
    }
}

/// Reference-counted pointer a [`SharedMethod`] can hold its receiver by
pub trait SharedReceiver: Clone {
    type Target: ?Sized;

    fn receiver(&self) -> &Self::Target;
}

impl<T: ?Sized> SharedReceiver for Rc<T> {
    type Target = T;

    #[inline]
    fn receiver(&self) -> &T {
        self
    }
}

impl<T: ?Sized> SharedReceiver for Arc<T> {
    type Target = T;

    #[inline]
    fn receiver(&self) -> &T {
        self
    }
}

/// Method binding that keeps its receiver alive
///
/// Cloning the binding clones the `Rc`/`Arc`: both bindings share the same
/// receiver.
#[derive(Clone)]
pub struct SharedMethod<S, M, P> {
    receiver: S,
    method: M,
    payload: P,
}

impl<S: SharedReceiver, M, P> SharedMethod<S, M, P> {
    pub fn new(receiver: S, method: M, payload: P) -> Self {
        Self {
            receiver,
            method,
            payload,
        }
    }
}

impl<Args, R, S, M, P> Callable<Args, R> for SharedMethod<S, M, P>
where
    S: SharedReceiver,
    Args: Append<P>,
    P: Clone,
    M: InvokeMethod<S::Target, Joined<Args, P>, R>,
{
    #[inline]
    fn execute(&mut self, args: Args) -> R {
        self.method
            .invoke_method(self.receiver.receiver(), args.append(self.payload.clone()))
    }

    fn owner(&self) -> OwnerId {
        OwnerId::of(self.receiver.receiver())
    }
}

/// Closure binding with its own captured state
#[derive(Clone)]
pub struct Closure<F, P> {
    closure: F,
    payload: P,
}

impl<F, P> Closure<F, P> {
    pub fn new(closure: F, payload: P) -> Self {
        Self { closure, payload }
    }
}

impl<Args, R, F, P> Callable<Args, R> for Closure<F, P>
where
    Args: Append<P>,
    P: Clone,
    F: Invoke<Joined<Args, P>, R>,
{
    #[inline]
    fn execute(&mut self, args: Args) -> R {
        self.closure.invoke(args.append(self.payload.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Foo {
        hits: Cell<u32>,
    }

    impl Foo {
        fn new() -> Self {
            Self { hits: Cell::new(0) }
        }

        fn bar(&self, a: f32) -> f32 {
            self.hits.set(self.hits.get() + 1);
            a
        }

        fn bar_mut(&mut self, a: f32) -> f32 {
            *self.hits.get_mut() += 1;
            a
        }

        fn bar_static(a: f32) -> f32 {
            a
        }
    }

    fn execute<C: Callable<(f32,), f32>>(callable: &mut C, a: f32) -> f32 {
        callable.execute((a,))
    }

    #[test]
    fn test_free_function() {
        let mut del = FreeFunction::new(Foo::bar_static as fn(f32) -> f32, ());
        assert_eq!(execute(&mut del, 10.0), 10.0);
        assert!(Callable::<(f32,), f32>::owner(&del).is_none());
    }

    #[test]
    fn test_closure() {
        let mut del = Closure::new(|a: f32| a, ());
        assert_eq!(execute(&mut del, 10.0), 10.0);
        assert!(Callable::<(f32,), f32>::owner(&del).is_none());
    }

    #[test]
    fn test_raw_method() {
        let foo = Foo::new();
        let mut del = unsafe { RawMethod::new(NonNull::from(&foo), Foo::bar, ()) };
        assert_eq!(execute(&mut del, 10.0), 10.0);
        assert_eq!(Callable::<(f32,), f32>::owner(&del), OwnerId::of(&foo));
        assert_eq!(foo.hits.get(), 1);
    }

    #[test]
    fn test_raw_method_mut() {
        let mut foo = Foo::new();
        let receiver = NonNull::from(&mut foo);
        {
            let mut del = unsafe { RawMethodMut::new(receiver, Foo::bar_mut, ()) };
            assert_eq!(execute(&mut del, 10.0), 10.0);
            assert_eq!(execute(&mut del, 11.0), 11.0);
            assert_eq!(
                Callable::<(f32,), f32>::owner(&del),
                OwnerId::from_ptr(receiver.as_ptr() as *const Foo)
            );
        }
        assert_eq!(foo.hits.get(), 2);
    }

    struct Marker;

    impl Marker {
        fn hit(&self, a: f32) -> f32 {
            a
        }

        fn hit_mut(&mut self, a: f32) -> f32 {
            a
        }
    }

    #[test]
    #[should_panic(expected = "zero-sized receiver")]
    fn test_raw_method_rejects_zero_sized_receiver() {
        let marker = Box::new(Marker);
        let _ = unsafe { RawMethod::new(NonNull::from(&*marker), Marker::hit, ()) };
    }

    #[test]
    #[should_panic(expected = "zero-sized receiver")]
    fn test_raw_method_mut_rejects_zero_sized_receiver() {
        let mut marker = Box::new(Marker);
        let _ = unsafe { RawMethodMut::new(NonNull::from(&mut *marker), Marker::hit_mut, ()) };
    }

    #[test]
    fn test_shared_zero_sized_receivers_are_distinct() {
        let a = Rc::new(Marker);
        let b = Rc::new(Marker);
        let del_a = SharedMethod::new(Rc::clone(&a), Marker::hit, ());
        let del_b = SharedMethod::new(Rc::clone(&b), Marker::hit, ());
        assert_ne!(
            Callable::<(f32,), f32>::owner(&del_a),
            Callable::<(f32,), f32>::owner(&del_b)
        );
    }

    #[test]
    fn test_shared_method() {
        let foo = Rc::new(Foo::new());
        let mut del = SharedMethod::new(Rc::clone(&foo), Foo::bar, ());
        assert_eq!(execute(&mut del, 10.0), 10.0);
        assert_eq!(Callable::<(f32,), f32>::owner(&del), OwnerId::of(&*foo));
        assert_eq!(Rc::strong_count(&foo), 2);

        let copy = del.clone();
        assert_eq!(Rc::strong_count(&foo), 3);
        drop(copy);
        drop(del);
        assert_eq!(Rc::strong_count(&foo), 1);
    }

    #[test]
    fn test_shared_method_over_arc() {
        let foo = Arc::new(7i32);
        let mut del = SharedMethod::new(Arc::clone(&foo), |v: &i32, a: i32| *v + a, ());
        assert_eq!(del.execute((3,)), 10);
        assert_eq!(Callable::<(i32,), i32>::owner(&del), OwnerId::of(&*foo));
    }

    #[test]
    fn test_payload_appended_and_reused() {
        let mut del = Closure::new(|a: i32, b: i32| a + b, (5,));
        assert_eq!(del.execute((10,)), 15);
        assert_eq!(del.execute((10,)), 15);

        let mut tagged = FreeFunction::new(
            |a: i32, label: String, scale: i32| format!("{label}:{}", a * scale),
            (String::from("x"), 3),
        );
        assert_eq!(tagged.execute((2,)), "x:6");
        assert_eq!(tagged.execute((4,)), "x:12");
    }

    #[test]
    fn test_closure_state_persists_between_calls() {
        let mut total = 0;
        let mut del = Closure::new(
            move |a: i32| {
                total += a;
                total
            },
            (),
        );
        assert_eq!(del.execute((2,)), 2);
        assert_eq!(del.execute((3,)), 5);
    }
}
