//! Single-subscriber delegate
//!
//! A [`Delegate<Args, R>`] holds at most one bound callable in an
//! [`InlineStorage`] next to a small table of type-erased entry points. The
//! table is filled in by `bind`, when the concrete variant type is still
//! known, and is what lets the delegate execute, query and deep-copy the
//! callable afterwards without knowing its type.
//!
//! ```
//! use delegates_core::Delegate;
//!
//! let mut on_value: Delegate<(i32,), i32> = Delegate::new();
//! on_value.bind_lambda(|a: i32, b: i32| a + b, (5,));
//! assert_eq!(on_value.execute((10,)), 15);
//! ```

use core::fmt;
use core::ptr::NonNull;

use crate::callable::{
    Callable, Closure, FreeFunction, RawMethod, RawMethodMut, SharedMethod, SharedReceiver,
};
use crate::error::{DelegateError, DelegateResult};
use crate::klog_error;
use crate::owner::OwnerId;
use crate::storage::InlineStorage;

/// Entry points for one concrete callable type
///
/// Every function expects a pointer to a live, initialised object of the
/// type the table was built for.
pub struct CallableVTable<Args, R> {
    execute: unsafe fn(*mut u8, Args) -> R,
    owner: unsafe fn(*const u8) -> OwnerId,
    clone_into: unsafe fn(*const u8, &mut InlineStorage),
}

impl<Args, R> CallableVTable<Args, R> {
    pub fn of<C>() -> Self
    where
        C: Callable<Args, R> + Clone,
    {
        Self {
            execute: execute_erased::<C, Args, R>,
            owner: owner_erased::<C, Args, R>,
            clone_into: clone_erased::<C>,
        }
    }
}

impl<Args, R> Clone for CallableVTable<Args, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Args, R> Copy for CallableVTable<Args, R> {}

unsafe fn execute_erased<C: Callable<Args, R>, Args, R>(ptr: *mut u8, args: Args) -> R {
    (*ptr.cast::<C>()).execute(args)
}

unsafe fn owner_erased<C: Callable<Args, R>, Args, R>(ptr: *const u8) -> OwnerId {
    (*ptr.cast::<C>()).owner()
}

unsafe fn clone_erased<C: Clone>(src: *const u8, dst: &mut InlineStorage) {
    dst.emplace((*src.cast::<C>()).clone());
}

/// Type-erased binding to one function, method or closure
///
/// `Args` is the caller's argument list written as a tuple; `R` is the
/// return type. Cloning a delegate deep-copies the bound callable, so the
/// copy can be rebound or cleared independently.
pub struct Delegate<Args, R = ()> {
    storage: InlineStorage,
    vtable: Option<CallableVTable<Args, R>>,
}

impl<Args, R> Delegate<Args, R> {
    pub const fn new() -> Self {
        Self {
            storage: InlineStorage::new(),
            vtable: None,
        }
    }

    /// Bind an arbitrary callable variant, replacing any existing binding.
    pub fn bind<C>(&mut self, callable: C)
    where
        C: Callable<Args, R> + Clone + 'static,
    {
        // Unbound while the old callable is dropped and the new one placed.
        self.vtable = None;
        self.storage.emplace(callable);
        self.vtable = Some(CallableVTable::of::<C>());
    }

    /// Bind a free function (any `Copy` function item, pointer or
    /// non-capturing closure).
    pub fn bind_fn<F, P>(&mut self, function: F, payload: P)
    where
        F: Copy + 'static,
        P: Clone + 'static,
        FreeFunction<F, P>: Callable<Args, R>,
    {
        self.bind(FreeFunction::new(function, payload));
    }

    /// Bind `method` on a receiver the delegate does not own.
    ///
    /// # Safety
    ///
    /// `receiver` must outlive this binding and every clone made of it, and
    /// must not be mutably borrowed while the delegate executes. Executing
    /// after the receiver is dropped or moved is undefined behaviour. Use
    /// [`bind_shared`](Self::bind_shared) when the lifetime is not scoped.
    ///
    /// # Panics
    ///
    /// Panics if the receiver is zero-sized, since such receivers have no
    /// distinct owner identity.
    pub unsafe fn bind_raw<T, M, P>(&mut self, receiver: &T, method: M, payload: P)
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethod<T, M, P>: Callable<Args, R>,
    {
        self.bind(RawMethod::new(NonNull::from(receiver), method, payload));
    }

    /// Bind a mutating `method` on a receiver the delegate does not own.
    ///
    /// # Safety
    ///
    /// As [`bind_raw`](Self::bind_raw), and additionally no other reference
    /// to `receiver` may be live while the delegate executes.
    ///
    /// # Panics
    ///
    /// Panics if the receiver is zero-sized.
    pub unsafe fn bind_raw_mut<T, M, P>(&mut self, receiver: &mut T, method: M, payload: P)
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethodMut<T, M, P>: Callable<Args, R>,
    {
        self.bind(RawMethodMut::new(NonNull::from(receiver), method, payload));
    }

    /// Bind `method` on a reference-counted receiver, keeping it alive for
    /// as long as the binding exists.
    pub fn bind_shared<S, M, P>(&mut self, receiver: S, method: M, payload: P)
    where
        S: SharedReceiver + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        SharedMethod<S, M, P>: Callable<Args, R>,
    {
        self.bind(SharedMethod::new(receiver, method, payload));
    }

    /// Bind a closure; its captured state moves into the delegate.
    pub fn bind_lambda<F, P>(&mut self, closure: F, payload: P)
    where
        F: Clone + 'static,
        P: Clone + 'static,
        Closure<F, P>: Callable<Args, R>,
    {
        self.bind(Closure::new(closure, payload));
    }

    pub fn from_fn<F, P>(function: F, payload: P) -> Self
    where
        F: Copy + 'static,
        P: Clone + 'static,
        FreeFunction<F, P>: Callable<Args, R>,
    {
        let mut delegate = Self::new();
        delegate.bind_fn(function, payload);
        delegate
    }

    /// # Safety
    ///
    /// See [`bind_raw`](Self::bind_raw).
    pub unsafe fn from_raw<T, M, P>(receiver: &T, method: M, payload: P) -> Self
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethod<T, M, P>: Callable<Args, R>,
    {
        let mut delegate = Self::new();
        delegate.bind_raw(receiver, method, payload);
        delegate
    }

    /// # Safety
    ///
    /// See [`bind_raw_mut`](Self::bind_raw_mut).
    pub unsafe fn from_raw_mut<T, M, P>(receiver: &mut T, method: M, payload: P) -> Self
    where
        T: ?Sized + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        RawMethodMut<T, M, P>: Callable<Args, R>,
    {
        let mut delegate = Self::new();
        delegate.bind_raw_mut(receiver, method, payload);
        delegate
    }

    pub fn from_shared<S, M, P>(receiver: S, method: M, payload: P) -> Self
    where
        S: SharedReceiver + 'static,
        M: Clone + 'static,
        P: Clone + 'static,
        SharedMethod<S, M, P>: Callable<Args, R>,
    {
        let mut delegate = Self::new();
        delegate.bind_shared(receiver, method, payload);
        delegate
    }

    pub fn from_lambda<F, P>(closure: F, payload: P) -> Self
    where
        F: Clone + 'static,
        P: Clone + 'static,
        Closure<F, P>: Callable<Args, R>,
    {
        let mut delegate = Self::new();
        delegate.bind_lambda(closure, payload);
        delegate
    }

    /// Call the bound target.
    ///
    /// # Panics
    ///
    /// Panics if nothing is bound. Use [`try_execute`](Self::try_execute) or
    /// [`execute_if_bound`](Self::execute_if_bound) when that is expected.
    pub fn execute(&mut self, args: Args) -> R {
        match self.try_execute(args) {
            Ok(result) => result,
            Err(err) => {
                klog_error!("delegate", "execute failed: {}", err);
                panic!("{}", err);
            }
        }
    }

    pub fn try_execute(&mut self, args: Args) -> DelegateResult<R> {
        let vtable = self.vtable.ok_or(DelegateError::NotBound)?;
        // SAFETY: the vtable was built for the type held in storage.
        Ok(unsafe { (vtable.execute)(self.storage.as_mut_ptr(), args) })
    }

    /// Call the bound target, or do nothing and return `None` when unbound.
    pub fn execute_if_bound(&mut self, args: Args) -> Option<R> {
        self.try_execute(args).ok()
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.vtable.is_some()
    }

    /// True iff a method binding on `owner` is held. `OwnerId::NONE` never
    /// matches.
    pub fn is_bound_to(&self, owner: OwnerId) -> bool {
        self.owner().matches(owner)
    }

    /// Receiver of the current method binding, `OwnerId::NONE` otherwise
    pub fn owner(&self) -> OwnerId {
        match self.vtable {
            // SAFETY: the vtable was built for the type held in storage.
            Some(vtable) => unsafe { (vtable.owner)(self.storage.as_ptr()) },
            None => OwnerId::NONE,
        }
    }

    /// Bytes the bound callable occupies (0 when unbound)
    #[inline]
    pub fn size(&self) -> usize {
        self.storage.size()
    }

    /// Whether the bound callable was too large for the inline buffer
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.storage.is_heap()
    }

    pub fn clear(&mut self) {
        self.vtable = None;
        self.storage.release();
    }

    /// Clear the binding if it is a method binding on `owner`; returns
    /// whether anything was cleared.
    pub fn clear_if_bound_to(&mut self, owner: OwnerId) -> bool {
        if self.is_bound_to(owner) {
            self.clear();
            true
        } else {
            false
        }
    }

    /// Move the binding out, leaving this delegate unbound.
    pub fn take(&mut self) -> Self {
        Self {
            storage: self.storage.take(),
            vtable: self.vtable.take(),
        }
    }
}

impl<Args, R> Clone for Delegate<Args, R> {
    fn clone(&self) -> Self {
        let mut copy = Self::new();
        if let Some(vtable) = self.vtable {
            // SAFETY: the vtable was built for the type held in storage.
            unsafe { (vtable.clone_into)(self.storage.as_ptr(), &mut copy.storage) };
            copy.vtable = Some(vtable);
        }
        copy
    }
}

impl<Args, R> Default for Delegate<Args, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, R> fmt::Debug for Delegate<Args, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("bound", &self.is_bound())
            .field("owner", &self.owner())
            .field("size", &self.size())
            .field("heap", &self.is_heap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::INLINE_CAPACITY;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::Arc;

    struct Foo {
        calls: Cell<u32>,
    }

    impl Foo {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
            }
        }

        fn bar(&self, a: f32) -> f32 {
            self.calls.set(self.calls.get() + 1);
            a
        }

        fn bar_mut(&mut self, a: f32) -> f32 {
            *self.calls.get_mut() += 1;
            a
        }

        fn bar_static(a: f32) -> f32 {
            a
        }
    }

    type FloatDelegate = Delegate<(f32,), f32>;

    #[test]
    fn test_identity_free_function() {
        let mut del = FloatDelegate::new();
        del.bind_fn(Foo::bar_static, ());
        assert_eq!(del.execute((10.0,)), 10.0);
        assert!(del.owner().is_none());
    }

    #[test]
    fn test_identity_raw_method() {
        let foo = Foo::new();
        let mut del = FloatDelegate::new();
        unsafe { del.bind_raw(&foo, Foo::bar, ()) };
        assert_eq!(del.execute((10.0,)), 10.0);
        assert!(del.is_bound_to(OwnerId::of(&foo)));
        assert_eq!(foo.calls.get(), 1);
    }

    #[test]
    fn test_identity_raw_method_mut() {
        let mut foo = Foo::new();
        let owner = OwnerId::of(&foo);
        let mut del = unsafe { FloatDelegate::from_raw_mut(&mut foo, Foo::bar_mut, ()) };
        assert_eq!(del.execute((10.0,)), 10.0);
        assert!(del.is_bound_to(owner));
        drop(del);
        assert_eq!(foo.calls.get(), 1);
    }

    #[test]
    fn test_identity_shared_method() {
        let foo = Rc::new(Foo::new());
        let mut del = FloatDelegate::from_shared(Rc::clone(&foo), Foo::bar, ());
        assert_eq!(del.execute((10.0,)), 10.0);
        assert!(del.is_bound_to(OwnerId::of(&*foo)));
    }

    #[test]
    fn test_identity_lambda() {
        let mut del = FloatDelegate::from_lambda(|a: f32| a, ());
        assert_eq!(del.execute((10.0,)), 10.0);
        assert!(del.owner().is_none());
    }

    #[test]
    fn test_payload_is_stable() {
        let mut del: Delegate<(i32,), i32> = Delegate::from_lambda(|a: i32, b: i32| a + b, (5,));
        assert_eq!(del.execute((10,)), 15);
        assert_eq!(del.execute((10,)), 15);

        fn add(a: i32, b: i32) -> i32 {
            a + b
        }
        let mut del: Delegate<(i32,), i32> = Delegate::from_fn(add, (5,));
        assert_eq!(del.execute((10,)), 15);
        assert_eq!(del.execute((10,)), 15);
    }

    #[test]
    fn test_payload_with_owned_values() {
        let mut del: Delegate<(u32,), String> = Delegate::new();
        del.bind_lambda(
            |n: u32, name: String| format!("{name}#{n}"),
            (String::from("click"),),
        );
        assert_eq!(del.execute((1,)), "click#1");
        assert_eq!(del.execute((2,)), "click#2");
    }

    #[test]
    fn test_bind_clear_lifecycle() {
        let mut del = FloatDelegate::new();
        assert!(!del.is_bound());
        assert_eq!(del.size(), 0);

        del.bind_lambda(|a: f32| a * 2.0, ());
        assert!(del.is_bound());

        del.clear();
        assert!(!del.is_bound());
        assert_eq!(del.execute_if_bound((1.0,)), None);
    }

    #[test]
    fn test_rebind_replaces_and_drops_previous() {
        let tracker = Rc::new(());
        let held = Rc::clone(&tracker);

        let mut del: Delegate<(), usize> = Delegate::new();
        del.bind_lambda(move || Rc::strong_count(&held), ());
        assert_eq!(Rc::strong_count(&tracker), 2);

        del.bind_lambda(|| 0usize, ());
        assert_eq!(Rc::strong_count(&tracker), 1);
        assert_eq!(del.execute(()), 0);
    }

    #[test]
    fn test_execute_if_bound() {
        let mut del = FloatDelegate::new();
        assert_eq!(del.execute_if_bound((3.0,)), None);
        del.bind_fn(Foo::bar_static, ());
        assert_eq!(del.execute_if_bound((3.0,)), Some(3.0));
    }

    #[test]
    fn test_try_execute_unbound() {
        let mut del = FloatDelegate::new();
        assert_eq!(del.try_execute((1.0,)), Err(DelegateError::NotBound));
    }

    #[test]
    #[should_panic(expected = "delegate is not bound")]
    fn test_execute_unbound_panics() {
        let mut del = FloatDelegate::new();
        del.execute((1.0,));
    }

    #[test]
    fn test_clone_is_independent() {
        let hits = Rc::new(Cell::new(0));
        let counted = Rc::clone(&hits);
        let mut original: Delegate<(i32,), i32> = Delegate::from_lambda(
            move |a: i32| {
                counted.set(counted.get() + 1);
                a
            },
            (),
        );

        let mut copy = original.clone();
        assert!(copy.is_bound());
        assert_eq!(copy.execute((4,)), 4);
        assert_eq!(original.execute((5,)), 5);
        assert_eq!(hits.get(), 2);

        copy.clear();
        assert!(!copy.is_bound());
        assert!(original.is_bound());

        drop(original);
        assert_eq!(Rc::strong_count(&hits), 1);
    }

    #[test]
    fn test_clone_of_unbound_is_unbound() {
        let del = FloatDelegate::new();
        assert!(!del.clone().is_bound());
    }

    #[test]
    fn test_clone_closure_state_is_copied() {
        let mut counter: Delegate<(), i32> = Delegate::new();
        let mut n = 0;
        counter.bind_lambda(
            move || {
                n += 1;
                n
            },
            (),
        );
        assert_eq!(counter.execute(()), 1);

        let mut copy = counter.clone();
        assert_eq!(copy.execute(()), 2);
        assert_eq!(counter.execute(()), 2);
    }

    #[test]
    fn test_take_leaves_source_unbound() {
        let mut source = FloatDelegate::from_lambda(|a: f32| a + 1.0, ());
        let mut dest = source.take();

        assert!(!source.is_bound());
        assert!(dest.is_bound());
        assert_eq!(dest.execute((1.0,)), 2.0);
    }

    #[test]
    fn test_take_heap_binding() {
        let big = [3u8; 512];
        let mut source: Delegate<(usize,), u8> = Delegate::from_lambda(move |i: usize| big[i], ());
        assert!(source.is_heap());

        let mut dest = source.take();
        assert!(!source.is_bound());
        assert!(dest.is_heap());
        assert_eq!(dest.execute((511,)), 3);
    }

    #[test]
    fn test_large_capture_round_trips() {
        let mut big = [0u8; 1024];
        for (i, byte) in big.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        let mut del: Delegate<(usize,), u8> = Delegate::new();
        del.bind_lambda(move |i: usize| big[i], ());
        assert!(del.is_heap());
        assert!(del.size() > INLINE_CAPACITY);
        assert_eq!(del.execute((0,)), 0);
        assert_eq!(del.execute((300,)), (300 % 251) as u8);
        assert_eq!(del.execute((1023,)), (1023 % 251) as u8);

        let mut copy = del.clone();
        del.clear();
        assert_eq!(copy.execute((1023,)), (1023 % 251) as u8);
    }

    #[test]
    fn test_small_binding_stays_inline() {
        let del = FloatDelegate::from_fn(Foo::bar_static, ());
        assert!(!del.is_heap());
        assert!(del.size() <= INLINE_CAPACITY);
    }

    #[test]
    fn test_shared_binding_keeps_receiver_alive() {
        let foo = Rc::new(Foo::new());
        let weak = Rc::downgrade(&foo);

        let mut del = FloatDelegate::new();
        del.bind_shared(Rc::clone(&foo), Foo::bar, ());
        assert_eq!(Rc::strong_count(&foo), 2);

        drop(foo);
        assert!(weak.upgrade().is_some());
        assert_eq!(del.execute((10.0,)), 10.0);

        let copy = del.clone();
        del.clear();
        assert!(weak.upgrade().is_some());
        drop(copy);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_shared_binding_over_arc() {
        let total = Arc::new(std::sync::atomic::AtomicI32::new(0));
        let mut del: Delegate<(i32,)> = Delegate::new();
        del.bind_shared(
            Arc::clone(&total),
            |t: &std::sync::atomic::AtomicI32, a: i32| {
                t.fetch_add(a, std::sync::atomic::Ordering::Relaxed);
            },
            (),
        );
        del.execute((3,));
        del.execute((4,));
        assert_eq!(total.load(std::sync::atomic::Ordering::Relaxed), 7);
    }

    #[test]
    fn test_clear_if_bound_to() {
        let foo = Foo::new();
        let other = Foo::new();
        let mut del = FloatDelegate::new();
        unsafe { del.bind_raw(&foo, Foo::bar, ()) };

        assert!(!del.clear_if_bound_to(OwnerId::of(&other)));
        assert!(del.is_bound());
        assert!(!del.clear_if_bound_to(OwnerId::NONE));
        assert!(del.is_bound());
        assert!(del.clear_if_bound_to(OwnerId::of(&foo)));
        assert!(!del.is_bound());
    }

    #[test]
    fn test_absent_owner_never_matches_unowned_binding() {
        let mut del = FloatDelegate::from_fn(Foo::bar_static, ());
        assert!(!del.is_bound_to(OwnerId::NONE));
        assert!(!del.clear_if_bound_to(OwnerId::NONE));
        assert!(del.is_bound());
    }

    #[test]
    fn test_custom_callable() {
        #[derive(Clone)]
        struct Doubler;

        impl Callable<(i32,), i32> for Doubler {
            fn execute(&mut self, (a,): (i32,)) -> i32 {
                a * 2
            }
        }

        let mut del: Delegate<(i32,), i32> = Delegate::new();
        del.bind(Doubler);
        assert_eq!(del.execute((21,)), 42);
        assert_eq!(del.size(), 0);
        assert!(del.is_bound());
    }

    #[test]
    fn test_multi_argument_signature() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let mut del: Delegate<(i32, &'static str)> = Delegate::new();
        del.bind_lambda(
            move |code: i32, text: &'static str, tag: char| {
                sink.borrow_mut().push(format!("{tag}{code}:{text}"));
            },
            ('E',),
        );
        del.execute((404, "missing"));
        assert_eq!(*log.borrow(), vec![String::from("E404:missing")]);
    }

    #[test]
    fn test_debug_output() {
        let del = FloatDelegate::new();
        let text = format!("{:?}", del);
        assert!(text.contains("bound: false"));
    }
}
